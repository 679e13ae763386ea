pub(crate) mod probe;
pub(crate) mod video;

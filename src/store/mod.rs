pub(crate) mod backend;
pub(crate) mod config_store;

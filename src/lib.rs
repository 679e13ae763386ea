//! zopmark applies branded watermarks to generated images and videos.
//!
//! Two pieces make up the public API:
//!
//! - A [`WatermarkConfigStore`] that keeps named [`WatermarkConfig`]s plus an active selection,
//!   persisted through a [`ConfigBackend`]
//! - A [`Compositor`] that maps an [`Artifact`] and an optional config to a new artifact
//!
//! Watermarking is optional: a missing or fully transparent config hands the artifact back
//! untouched, and [`Compositor::composite_or_original`] turns degradable failures into a
//! fallback to the original.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod assets;
mod compositor;
mod effects;
mod foundation;
mod media;
mod model;
mod render;
mod settings;
mod store;

pub use crate::compositor::{Compositor, CompositorOpts};
pub use crate::foundation::cancel::CancelToken;
pub use crate::foundation::error::{FailureKind, WatermarkError, WmResult};
pub use crate::foundation::geometry::{
    DEFAULT_MARGIN_RATIO, PixelRect, WatermarkLayout, layout_watermark,
};
pub use crate::media::probe::{is_ffmpeg_on_path, is_ffprobe_on_path};
pub use crate::model::artifact::{Artifact, EncodedMedia};
pub use crate::model::watermark::{
    DEFAULT_OPACITY, DEFAULT_SCALE, ImageOverlay, Overlay, Position, TextOverlay,
    WatermarkConfig, WatermarkKind,
};
pub use crate::settings::Settings;
pub use crate::store::backend::{
    ConfigBackend, DEFAULT_STORAGE_KEY, InMemoryBackend, JsonFileBackend,
};
pub use crate::store::config_store::{PersistStatus, WatermarkConfigStore};

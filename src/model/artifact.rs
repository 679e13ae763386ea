use std::sync::Arc;

use crate::foundation::error::{WatermarkError, WmResult};

/// Immutable encoded media bytes plus their declared MIME type.
///
/// Cloning shares the underlying buffer.
#[derive(Clone, PartialEq, Eq)]
pub struct EncodedMedia {
    bytes: Arc<[u8]>,
    mime: String,
}

impl EncodedMedia {
    /// Wrap encoded bytes with a declared MIME type (normalized to lowercase, parameters dropped).
    pub fn new(bytes: impl Into<Arc<[u8]>>, mime: impl AsRef<str>) -> Self {
        Self {
            bytes: bytes.into(),
            mime: essence(mime.as_ref()),
        }
    }

    /// Encoded bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Declared MIME type, e.g. `image/png`.
    pub fn mime(&self) -> &str {
        &self.mime
    }

    /// Return `true` when both values share the same buffer allocation.
    pub fn shares_buffer_with(&self, other: &EncodedMedia) -> bool {
        Arc::ptr_eq(&self.bytes, &other.bytes)
    }
}

impl std::fmt::Debug for EncodedMedia {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncodedMedia")
            .field("mime", &self.mime)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// A generated still image or video, as handed over by the generation layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Artifact {
    /// Encoded still image.
    Image(EncodedMedia),
    /// Encoded video container.
    Video(EncodedMedia),
}

impl Artifact {
    /// Classify encoded bytes by their declared MIME family (`image/*` or `video/*`).
    pub fn from_mime(bytes: impl Into<Arc<[u8]>>, mime: impl AsRef<str>) -> WmResult<Self> {
        let media = EncodedMedia::new(bytes, mime);
        match media.mime.split('/').next() {
            Some("image") => Ok(Self::Image(media)),
            Some("video") => Ok(Self::Video(media)),
            _ => Err(WatermarkError::decode(format!(
                "unsupported artifact MIME type '{}'",
                media.mime
            ))),
        }
    }

    /// Borrow the encoded media.
    pub fn media(&self) -> &EncodedMedia {
        match self {
            Self::Image(m) | Self::Video(m) => m,
        }
    }

    /// Encoded bytes.
    pub fn bytes(&self) -> &[u8] {
        self.media().bytes()
    }

    /// Declared MIME type.
    pub fn mime(&self) -> &str {
        self.media().mime()
    }

    /// Return `true` for [`Artifact::Video`].
    pub fn is_video(&self) -> bool {
        matches!(self, Self::Video(_))
    }
}

fn essence(mime: &str) -> String {
    mime.split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

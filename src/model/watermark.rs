use serde::{Deserialize, Serialize};

use crate::foundation::error::{WatermarkError, WmResult};

/// Opacity given to configs built with [`WatermarkConfig::text`] / [`WatermarkConfig::image`].
pub const DEFAULT_OPACITY: f32 = 0.8;
/// Scale given to configs built with [`WatermarkConfig::text`] / [`WatermarkConfig::image`].
pub const DEFAULT_SCALE: f32 = 0.25;

/// A named, persistable watermark definition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WatermarkConfig {
    /// Unique id, stable across sessions.
    pub id: String,
    /// Display label. Empty means "use the id".
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// What gets drawn.
    pub overlay: Overlay,
    /// Where the box sits inside the bottom-right safe zone.
    #[serde(default)]
    pub position: Position,
    /// Blend opacity in `[0, 1]`. `0` disables the watermark.
    pub opacity: f32,
    /// Box side as a fraction of the host's shorter dimension.
    pub scale: f32,
}

/// Overlay payload, tagged by `kind`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Overlay {
    /// Rendered text.
    Text(TextOverlay),
    /// An encoded raster image.
    Image(ImageOverlay),
}

/// Text overlay payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextOverlay {
    /// The text to render. Must be non-empty.
    pub text: String,
    /// Straight-alpha RGBA fill color.
    #[serde(default = "default_text_color")]
    pub color: [u8; 4],
    /// Preferred font family; falls back to any sans-serif face.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
}

/// Image overlay payload.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageOverlay {
    /// Encoded overlay image (PNG, WebP, ...). Serialized as base64.
    #[serde(with = "base64_bytes")]
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for ImageOverlay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageOverlay")
            .field("bytes", &format_args!("<{} bytes>", self.bytes.len()))
            .finish()
    }
}

/// Discriminant of [`Overlay`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WatermarkKind {
    /// [`Overlay::Text`].
    Text,
    /// [`Overlay::Image`].
    Image,
}

/// Placement of the watermark box inside the bottom-right safe zone.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "anchor", rename_all = "snake_case")]
pub enum Position {
    /// Flush against the bottom-right margin.
    #[default]
    BottomRight,
    /// Normalized coordinate inside the bottom-right quadrant; `(1, 1)` equals `BottomRight`.
    SafeZone {
        /// Horizontal position, `0` = leftmost allowed, `1` = flush right.
        x: f32,
        /// Vertical position, `0` = topmost allowed, `1` = flush bottom.
        y: f32,
    },
}

fn default_text_color() -> [u8; 4] {
    [255, 255, 255, 255]
}

impl WatermarkConfig {
    /// Text watermark with default opacity, scale and position.
    pub fn text(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            overlay: Overlay::Text(TextOverlay {
                text: text.into(),
                color: default_text_color(),
                font_family: None,
            }),
            position: Position::BottomRight,
            opacity: DEFAULT_OPACITY,
            scale: DEFAULT_SCALE,
        }
    }

    /// Image watermark with default opacity, scale and position.
    pub fn image(id: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            overlay: Overlay::Image(ImageOverlay {
                bytes: bytes.into(),
            }),
            position: Position::BottomRight,
            opacity: DEFAULT_OPACITY,
            scale: DEFAULT_SCALE,
        }
    }

    /// Set the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the opacity.
    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self
    }

    /// Set the scale.
    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    /// Set the position.
    pub fn with_position(mut self, position: Position) -> Self {
        self.position = position;
        self
    }

    /// Display label, falling back to the id.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }

    /// The overlay discriminant.
    pub fn kind(&self) -> WatermarkKind {
        match self.overlay {
            Overlay::Text(_) => WatermarkKind::Text,
            Overlay::Image(_) => WatermarkKind::Image,
        }
    }

    /// Return `true` when applying this config cannot change any pixel.
    pub fn is_noop(&self) -> bool {
        self.opacity <= 0.0
    }

    /// Check field ranges and payload presence.
    pub fn validate(&self) -> WmResult<()> {
        if self.id.trim().is_empty() {
            return Err(WatermarkError::validation("watermark id must be non-empty"));
        }
        if !self.opacity.is_finite() || !(0.0..=1.0).contains(&self.opacity) {
            return Err(WatermarkError::validation(format!(
                "watermark '{}' opacity must be in [0, 1], got {}",
                self.id, self.opacity
            )));
        }
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(WatermarkError::validation(format!(
                "watermark '{}' scale must be finite and > 0, got {}",
                self.id, self.scale
            )));
        }
        if let Position::SafeZone { x, y } = self.position
            && !((0.0..=1.0).contains(&x) && (0.0..=1.0).contains(&y))
        {
            return Err(WatermarkError::validation(format!(
                "watermark '{}' safe-zone coordinates must be in [0, 1]",
                self.id
            )));
        }
        match &self.overlay {
            Overlay::Text(t) if t.text.trim().is_empty() => Err(WatermarkError::validation(
                format!("watermark '{}' text must be non-empty", self.id),
            )),
            Overlay::Image(i) if i.bytes.is_empty() => Err(WatermarkError::validation(format!(
                "watermark '{}' image bytes must be non-empty",
                self.id
            ))),
            _ => Ok(()),
        }
    }
}

mod base64_bytes {
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&STANDARD.encode(bytes))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(d)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/model/watermark.rs"]
mod tests;

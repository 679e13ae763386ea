use std::path::PathBuf;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::assets::decode::{decode_host_image, encode_host_image};
use crate::assets::fonts::FontSet;
use crate::effects::composite::blend_overlay_into_image;
use crate::foundation::cancel::CancelToken;
use crate::foundation::error::{WatermarkError, WmResult};
use crate::foundation::geometry::{DEFAULT_MARGIN_RATIO, WatermarkLayout, layout_watermark};
use crate::media::video::watermark_video;
use crate::model::artifact::{Artifact, EncodedMedia};
use crate::model::watermark::WatermarkConfig;
use crate::render::overlay::build_overlay;

/// Options for [`Compositor`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositorOpts {
    /// Margin kept free around the watermark box, as a fraction of the shorter host dimension.
    pub margin_ratio: f32,
    /// JPEG quality used when the host image is re-encoded as JPEG (1..=100).
    pub jpeg_quality: u8,
    /// Load the platform's installed fonts for text watermarks.
    pub load_system_fonts: bool,
    /// Additional directories scanned for font files.
    pub font_dirs: Vec<PathBuf>,
    /// Family tried first for text watermarks that name none.
    pub default_font_family: Option<String>,
}

impl Default for CompositorOpts {
    fn default() -> Self {
        Self {
            margin_ratio: DEFAULT_MARGIN_RATIO,
            jpeg_quality: 95,
            load_system_fonts: true,
            font_dirs: Vec::new(),
            default_font_family: None,
        }
    }
}

impl CompositorOpts {
    /// Check option ranges.
    pub fn validate(&self) -> WmResult<()> {
        if !self.margin_ratio.is_finite() || !(0.0..0.5).contains(&self.margin_ratio) {
            return Err(WatermarkError::validation(format!(
                "margin_ratio must be in [0, 0.5), got {}",
                self.margin_ratio
            )));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(WatermarkError::validation(format!(
                "jpeg_quality must be in 1..=100, got {}",
                self.jpeg_quality
            )));
        }
        Ok(())
    }
}

/// Applies a watermark config to generated artifacts.
///
/// A compositor holds only immutable options and a font database, so one instance can serve
/// any number of concurrent calls. Each call maps `(artifact, config)` to a new artifact and
/// never mutates its inputs.
pub struct Compositor {
    opts: CompositorOpts,
    fonts: FontSet,
}

impl Compositor {
    /// Validate `opts` and load the font database.
    pub fn new(opts: CompositorOpts) -> WmResult<Self> {
        opts.validate()?;
        let fonts = FontSet::load(
            opts.load_system_fonts,
            &opts.font_dirs,
            opts.default_font_family.clone(),
        );
        Ok(Self { opts, fonts })
    }

    /// Options this compositor was built with.
    pub fn opts(&self) -> &CompositorOpts {
        &self.opts
    }

    /// Number of font faces available to text watermarks.
    pub fn font_face_count(&self) -> usize {
        self.fonts.face_count()
    }

    /// Where `config` would be placed on a `width` x `height` host.
    pub fn layout_for(
        &self,
        width: u32,
        height: u32,
        config: &WatermarkConfig,
    ) -> WmResult<WatermarkLayout> {
        layout_watermark(
            width,
            height,
            config.scale,
            config.position,
            self.opts.margin_ratio,
        )
    }

    /// Watermark `artifact` with `config`.
    ///
    /// `None` or a zero-opacity config returns the input unchanged, sharing its buffer.
    pub fn composite(
        &self,
        artifact: &Artifact,
        config: Option<&WatermarkConfig>,
    ) -> WmResult<Artifact> {
        self.composite_with_cancel(artifact, config, &CancelToken::new())
    }

    /// Like [`Compositor::composite`], aborting with [`WatermarkError::Cancelled`] once `cancel`
    /// fires. No partial output is returned.
    #[tracing::instrument(
        skip_all,
        fields(
            mime = artifact.mime(),
            config = config.map(|c| c.id.as_str()).unwrap_or("none")
        )
    )]
    pub fn composite_with_cancel(
        &self,
        artifact: &Artifact,
        config: Option<&WatermarkConfig>,
        cancel: &CancelToken,
    ) -> WmResult<Artifact> {
        if let Some(config) = config {
            config.validate()?;
        }
        let Some(config) = config.filter(|c| !c.is_noop()) else {
            tracing::debug!("no effective watermark, passing artifact through");
            return Ok(artifact.clone());
        };
        cancel.check()?;

        match artifact {
            Artifact::Image(media) => self.composite_image(media, config).map(Artifact::Image),
            Artifact::Video(media) => {
                let out = watermark_video(media, cancel, config.opacity, |w, h| {
                    let layout = self.layout_for(w, h, config)?;
                    build_overlay(&config.overlay, layout.watermark_box, &self.fonts)
                })?;
                Ok(Artifact::Video(out))
            }
        }
    }

    /// Watermark `artifact`, falling back to the original when the failure is degradable.
    ///
    /// The error that triggered the fallback is returned alongside so callers can surface it.
    /// Non-degradable errors (invalid config, ...) are still returned as `Err`.
    pub fn composite_or_original(
        &self,
        artifact: &Artifact,
        config: Option<&WatermarkConfig>,
    ) -> WmResult<(Artifact, Option<WatermarkError>)> {
        match self.composite(artifact, config) {
            Ok(out) => Ok((out, None)),
            Err(e) if e.is_degradable() => {
                tracing::warn!(error = %e, "watermarking failed, delivering original artifact");
                Ok((artifact.clone(), Some(e)))
            }
            Err(e) => Err(e),
        }
    }

    /// Watermark independent artifacts in parallel. Results keep the input order.
    pub fn composite_batch(
        &self,
        artifacts: &[Artifact],
        config: Option<&WatermarkConfig>,
    ) -> Vec<WmResult<Artifact>> {
        artifacts
            .par_iter()
            .map(|artifact| self.composite(artifact, config))
            .collect()
    }

    fn composite_image(
        &self,
        media: &EncodedMedia,
        config: &WatermarkConfig,
    ) -> WmResult<EncodedMedia> {
        let mut host = decode_host_image(media.bytes(), media.mime())?;
        let (width, height) = (host.image.width(), host.image.height());
        let layout = self.layout_for(width, height, config)?;
        tracing::debug!(
            width,
            height,
            margin = layout.margin,
            side = layout.watermark_box.width,
            "watermark layout"
        );

        let overlay = build_overlay(&config.overlay, layout.watermark_box, &self.fonts)?;
        blend_overlay_into_image(&mut host.image, &overlay, config.opacity)?;
        encode_host_image(&host.image, host.format, self.opts.jpeg_quality)
    }
}

#[cfg(test)]
#[path = "../tests/unit/compositor.rs"]
mod tests;

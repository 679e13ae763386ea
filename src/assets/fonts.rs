use std::path::PathBuf;
use std::sync::Arc;

use usvg::fontdb;

/// Immutable font database used to shape text watermarks.
#[derive(Clone)]
pub(crate) struct FontSet {
    db: Arc<fontdb::Database>,
    default_family: Option<String>,
}

impl FontSet {
    pub(crate) fn load(
        load_system_fonts: bool,
        font_dirs: &[PathBuf],
        default_family: Option<String>,
    ) -> Self {
        let mut db = fontdb::Database::new();
        if load_system_fonts {
            db.load_system_fonts();
        }
        for dir in font_dirs {
            if dir.is_dir() {
                db.load_fonts_dir(dir);
            } else {
                tracing::warn!(dir = %dir.display(), "font directory not found");
            }
        }
        tracing::debug!(faces = db.len(), "font database loaded");

        Self {
            db: Arc::new(db),
            default_family,
        }
    }

    pub(crate) fn database(&self) -> Arc<fontdb::Database> {
        Arc::clone(&self.db)
    }

    pub(crate) fn face_count(&self) -> usize {
        self.db.len()
    }

    pub(crate) fn default_family(&self) -> Option<&str> {
        self.default_family.as_deref()
    }
}

/// Resolve requested families first, then generic families, then any face at all, so a host
/// with a single odd font still renders text.
pub(crate) fn make_font_resolver() -> usvg::FontResolver<'static> {
    usvg::FontResolver {
        select_font: Box::new(|font, db| {
            let mut families = Vec::<fontdb::Family<'_>>::new();
            for family in font.families() {
                families.push(match family {
                    usvg::FontFamily::Serif => fontdb::Family::Serif,
                    usvg::FontFamily::SansSerif => fontdb::Family::SansSerif,
                    usvg::FontFamily::Cursive => fontdb::Family::Cursive,
                    usvg::FontFamily::Fantasy => fontdb::Family::Fantasy,
                    usvg::FontFamily::Monospace => fontdb::Family::Monospace,
                    usvg::FontFamily::Named(s) => fontdb::Family::Name(s),
                });
            }
            families.push(fontdb::Family::SansSerif);
            families.push(fontdb::Family::Serif);

            let query = fontdb::Query {
                families: &families,
                weight: fontdb::Weight(font.weight()),
                stretch: fontdb::Stretch::Normal,
                style: fontdb::Style::Normal,
            };
            db.query(&query)
                .or_else(|| db.faces().next().map(|f| f.id))
        }),
        select_fallback: usvg::FontResolver::default_fallback_selector(),
    }
}

// genpdf needs real TrueType files for glyph metrics, so the certificate font
// family is read from disk once at startup and shared read-only afterwards.
use genpdf::fonts::{FontData, FontFamily};
use std::path::{Path, PathBuf};

use super::RenderError;

const FONT_DIRS: &[&str] = &[
    "/usr/share/fonts/truetype/liberation",
    "/usr/share/fonts/liberation",
    "/usr/share/fonts/truetype/dejavu",
    "/usr/share/fonts/dejavu",
    "/usr/share/fonts/TTF",
    "/System/Library/Fonts/Supplemental",
    "/Library/Fonts",
];

/// File names of one family, in regular, bold, italic, bold-italic order.
struct KnownFamily {
    name: &'static str,
    files: [&'static str; 4],
}

const KNOWN_FAMILIES: &[KnownFamily] = &[
    KnownFamily {
        name: "LiberationSerif",
        files: [
            "LiberationSerif-Regular.ttf",
            "LiberationSerif-Bold.ttf",
            "LiberationSerif-Italic.ttf",
            "LiberationSerif-BoldItalic.ttf",
        ],
    },
    KnownFamily {
        name: "DejaVuSerif",
        files: [
            "DejaVuSerif.ttf",
            "DejaVuSerif-Bold.ttf",
            "DejaVuSerif-Italic.ttf",
            "DejaVuSerif-BoldItalic.ttf",
        ],
    },
    KnownFamily {
        name: "LiberationSans",
        files: [
            "LiberationSans-Regular.ttf",
            "LiberationSans-Bold.ttf",
            "LiberationSans-Italic.ttf",
            "LiberationSans-BoldItalic.ttf",
        ],
    },
    KnownFamily {
        name: "DejaVuSans",
        files: [
            "DejaVuSans.ttf",
            "DejaVuSans-Bold.ttf",
            "DejaVuSans-Oblique.ttf",
            "DejaVuSans-BoldOblique.ttf",
        ],
    },
];

#[derive(Clone)]
pub struct FontAssets {
    family: FontFamily<FontData>,
    source: PathBuf,
}

impl FontAssets {
    /// Loads fonts from `dir`. With a `family` name the files must follow the
    /// `<family>-Regular.ttf` / `-Bold` / `-Italic` / `-BoldItalic` convention;
    /// without one, the first known family present in `dir` is used.
    pub fn load(dir: &Path, family: Option<&str>) -> Result<Self, RenderError> {
        if let Some(name) = family {
            let family = genpdf::fonts::from_files(dir, name, None).map_err(|source| {
                RenderError::FontLoad {
                    path: dir.join(format!("{}-Regular.ttf", name)),
                    source,
                }
            })?;
            return Ok(Self {
                family,
                source: dir.to_path_buf(),
            });
        }

        let known = KNOWN_FAMILIES
            .iter()
            .find(|known| known.files.iter().all(|file| dir.join(file).is_file()))
            .ok_or_else(|| RenderError::FontsNotFound {
                searched: dir.display().to_string(),
            })?;

        let load = |file: &str| {
            let path = dir.join(file);
            FontData::load(&path, None).map_err(|source| RenderError::FontLoad { path, source })
        };

        let [regular, bold, italic, bold_italic] = known.files;
        let family = FontFamily {
            regular: load(regular)?,
            bold: load(bold)?,
            italic: load(italic)?,
            bold_italic: load(bold_italic)?,
        };

        tracing::debug!("Loaded {} fonts from {}", known.name, dir.display());

        Ok(Self {
            family,
            source: dir.to_path_buf(),
        })
    }

    /// Loads from `preferred` when given, otherwise tries the standard system
    /// font directories in order.
    pub fn discover(preferred: Option<&Path>, family: Option<&str>) -> Result<Self, RenderError> {
        if let Some(dir) = preferred {
            return Self::load(dir, family);
        }

        FONT_DIRS
            .iter()
            .map(Path::new)
            .filter(|dir| dir.is_dir())
            .find_map(|dir| Self::load(dir, family).ok())
            .ok_or_else(|| RenderError::FontsNotFound {
                searched: FONT_DIRS.join(", "),
            })
    }

    pub fn family(&self) -> FontFamily<FontData> {
        self.family.clone()
    }

    pub fn source(&self) -> &Path {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_directory_is_a_load_error() {
        let result = FontAssets::load(Path::new("/nonexistent/fonts"), None);
        assert!(matches!(result, Err(RenderError::FontsNotFound { .. })));
    }

    #[test]
    fn missing_named_family_reports_the_regular_file() {
        match FontAssets::load(Path::new("/nonexistent/fonts"), Some("Roboto")) {
            Err(RenderError::FontLoad { path, .. }) => {
                assert!(path.ends_with("Roboto-Regular.ttf"));
            }
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("fonts loaded from a missing directory"),
        }
    }
}

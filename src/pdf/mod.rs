// Certificate PDF generation
// Uses genpdf - the page is laid out by `layout::compose` and painted here
mod fonts;
pub mod layout;

use genpdf::fonts::FontCache;
use genpdf::render::Area;
use genpdf::style::{Color, Style};
use genpdf::{Context, Element, Mm, RenderResult};
use std::cell::RefCell;
use std::rc::Rc;
use thiserror::Error;

use crate::certificate::{CertificateRequest, LayoutConfig, ProgramContent};

pub use fonts::FontAssets;
pub use layout::{compose, CertificateLayout, Face, Rgb, Role, TextMeasure};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("no usable certificate font family found (searched: {searched})")]
    FontsNotFound { searched: String },

    #[error("failed to load font {}: {source}", path.display())]
    FontLoad {
        path: std::path::PathBuf,
        #[source]
        source: genpdf::error::Error,
    },

    #[error("PDF rendering failed: {0}")]
    Pdf(#[from] genpdf::error::Error),

    #[error("certificate text did not fit on the page: {roles:?}")]
    TextDropped { roles: Vec<Role> },
}

/// Turns one certificate request into PDF bytes.
pub trait RenderCertificate: Send + Sync {
    fn render(
        &self,
        request: &CertificateRequest,
        layout: &LayoutConfig,
        content: &ProgramContent,
    ) -> Result<Vec<u8>, RenderError>;
}

impl RenderCertificate for CertificateRenderer {
    fn render(
        &self,
        request: &CertificateRequest,
        layout: &LayoutConfig,
        content: &ProgramContent,
    ) -> Result<Vec<u8>, RenderError> {
        CertificateRenderer::render(self, request, layout, content)
    }
}

/// Renders certificates with a font family loaded once at startup.
///
/// Rendering holds no state between calls, so one renderer is shared by all
/// requests.
#[derive(Clone)]
pub struct CertificateRenderer {
    fonts: FontAssets,
}

impl CertificateRenderer {
    pub fn new(fonts: FontAssets) -> Self {
        Self { fonts }
    }

    pub fn fonts(&self) -> &FontAssets {
        &self.fonts
    }

    pub fn render(
        &self,
        request: &CertificateRequest,
        layout: &LayoutConfig,
        content: &ProgramContent,
    ) -> Result<Vec<u8>, RenderError> {
        self.render_with_report(request, layout, content).map(|(bytes, _)| bytes)
    }

    fn render_with_report(
        &self,
        request: &CertificateRequest,
        layout: &LayoutConfig,
        content: &ProgramContent,
    ) -> Result<(Vec<u8>, PaintReport), RenderError> {
        let report = Rc::new(RefCell::new(PaintReport::default()));

        let mut doc = genpdf::Document::new(self.fonts.family());
        doc.set_title(format!("{} - {}", layout.title, request.recipient_name()));
        doc.set_paper_size(layout::page_size(layout.orientation));
        doc.push(CertificatePage {
            request: request.clone(),
            layout: layout.clone(),
            content: content.clone(),
            report: report.clone(),
        });

        let mut bytes = Vec::new();
        doc.render(&mut bytes)?;

        let report = report.take();
        if !report.dropped.is_empty() {
            tracing::warn!(
                "Certificate {} lost text runs: {:?}",
                request.certificate_id(),
                report.dropped
            );
            return Err(RenderError::TextDropped {
                roles: report.dropped,
            });
        }

        tracing::debug!(
            "Rendered certificate {} ({} runs, {} bytes)",
            request.certificate_id(),
            report.printed,
            bytes.len()
        );
        Ok((bytes, report))
    }
}

/// What the painter actually put on the page.
#[derive(Debug, Default)]
struct PaintReport {
    printed: usize,
    dropped: Vec<Role>,
}

fn text_style(face: Face, size: u8, color: Rgb) -> Style {
    let style = Style::new()
        .with_font_size(size)
        .with_color(Color::Rgb(color.0, color.1, color.2));
    match face {
        Face::Regular => style,
        Face::Bold => style.bold(),
        Face::Italic => style.italic(),
    }
}

/// Measures with the same font metrics the document prints with.
struct FontCacheMeasure<'a> {
    cache: &'a FontCache,
}

impl TextMeasure for FontCacheMeasure<'_> {
    fn text_width(&self, text: &str, face: Face, size: u8) -> Mm {
        text_style(face, size, layout::BLACK).str_width(self.cache, text)
    }
}

/// A full-page element that paints the composed certificate layout.
struct CertificatePage {
    request: CertificateRequest,
    layout: LayoutConfig,
    content: ProgramContent,
    report: Rc<RefCell<PaintReport>>,
}

impl Element for CertificatePage {
    fn render(
        &mut self,
        context: &Context,
        area: Area<'_>,
        _style: Style,
    ) -> Result<RenderResult, genpdf::error::Error> {
        let measure = FontCacheMeasure {
            cache: &context.font_cache,
        };
        let plan = compose(&self.request, &self.layout, &self.content, &measure);

        for stroke in &plan.strokes {
            let line = Style::new()
                .with_color(Color::Rgb(stroke.color.0, stroke.color.1, stroke.color.2));
            area.draw_line(stroke.points.clone(), line);
        }

        let mut report = self.report.borrow_mut();
        *report = PaintReport::default();
        for run in plan.texts.iter().filter(|run| !run.text.is_empty()) {
            let style = text_style(run.face, run.size, run.color);
            // `false` means the run fell outside the printable area.
            if area.print_str(&context.font_cache, run.position, style, &run.text)? {
                report.printed += 1;
            } else {
                report.dropped.push(run.role);
            }
        }

        Ok(RenderResult {
            size: area.size(),
            has_more: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::certificate::{Orientation, SignatureCount};

    fn renderer(test: &str) -> Option<CertificateRenderer> {
        match FontAssets::discover(None, None) {
            Ok(fonts) => Some(CertificateRenderer::new(fonts)),
            Err(e) => {
                eprintln!("skipping {}: no certificate fonts installed ({})", test, e);
                None
            }
        }
    }

    /// Width only affects placement, never which runs exist.
    struct FixedMeasure;

    impl TextMeasure for FixedMeasure {
        fn text_width(&self, text: &str, _face: Face, size: u8) -> Mm {
            Mm::from(text.chars().count() as f64 * f64::from(size) * 0.2)
        }
    }

    fn planned_runs(
        request: &CertificateRequest,
        layout: &LayoutConfig,
        content: &ProgramContent,
    ) -> usize {
        compose(request, layout, content, &FixedMeasure)
            .texts
            .iter()
            .filter(|run| !run.text.is_empty())
            .count()
    }

    fn media_boxes(pdf: &[u8]) -> Vec<(f64, f64)> {
        let text = String::from_utf8_lossy(pdf);
        text.match_indices("/MediaBox")
            .filter_map(|(at, _)| {
                let rest = &text[at..];
                let open = rest.find('[')?;
                let close = rest.find(']')?;
                let numbers: Vec<f64> = rest[open + 1..close]
                    .split_whitespace()
                    .filter_map(|n| n.parse().ok())
                    .collect();
                match numbers.as_slice() {
                    [x0, y0, x1, y1] => Some((x1 - x0, y1 - y0)),
                    _ => None,
                }
            })
            .collect()
    }

    /// Largest `/Count` in the file, which is the page tree's page count.
    fn page_count(pdf: &[u8]) -> Option<u32> {
        let text = String::from_utf8_lossy(pdf);
        text.match_indices("/Count")
            .filter_map(|(at, key)| {
                let digits: String = text[at + key.len()..]
                    .trim_start()
                    .chars()
                    .take_while(|c| c.is_ascii_digit())
                    .collect();
                digits.parse().ok()
            })
            .max()
    }

    fn example() -> (CertificateRequest, LayoutConfig, ProgramContent) {
        (
            CertificateRequest::new("Jane Doe", "CERT-0001", "01/01/2025"),
            LayoutConfig {
                title: "Certificate of Participation".to_string(),
                event_kind: "Workshop".to_string(),
                orientation: Orientation::Landscape,
                signature_count: SignatureCount::Two,
                watermark_enabled: false,
                ..LayoutConfig::default()
            },
            ProgramContent {
                program_name: "Intro to Testing".to_string(),
                program_dates: "01 Jan 2025".to_string(),
                department: "CS Dept".to_string(),
                faculty: "Faculty of Engineering".to_string(),
                institution: "Example University".to_string(),
                location: "Example City".to_string(),
                coordinator_name: None,
                hod_name: None,
            },
        )
    }

    #[test]
    fn renders_a_single_landscape_page() {
        let Some(renderer) = renderer("renders_a_single_landscape_page") else { return };
        let (request, layout, content) = example();

        let pdf = renderer.render(&request, &layout, &content).unwrap();
        assert!(pdf.starts_with(b"%PDF-"));

        assert_eq!(page_count(&pdf), Some(1));
        let (width, height) = media_boxes(&pdf)[0];
        assert!(width > height);
    }

    #[test]
    fn portrait_page_is_taller_than_wide() {
        let Some(renderer) = renderer("portrait_page_is_taller_than_wide") else { return };
        let (request, layout, content) = example();
        let layout = LayoutConfig {
            orientation: Orientation::Portrait,
            signature_count: SignatureCount::One,
            watermark_enabled: true,
            ..layout
        };

        let pdf = renderer.render(&request, &layout, &content).unwrap();
        assert_eq!(page_count(&pdf), Some(1));
        let (width, height) = media_boxes(&pdf)[0];
        assert!(height > width);
    }

    #[test]
    fn blank_content_and_absent_signatories_still_render() {
        let Some(renderer) = renderer("blank_content_and_absent_signatories_still_render") else {
            return;
        };
        let (request, layout, _) = example();

        let pdf = renderer
            .render(&request, &layout, &ProgramContent::default())
            .unwrap();
        assert!(pdf.starts_with(b"%PDF-"));
        assert_eq!(page_count(&pdf), Some(1));
    }

    #[test]
    fn concurrent_renders_share_one_renderer() {
        let Some(renderer) = renderer("concurrent_renders_share_one_renderer") else { return };
        let renderer = std::sync::Arc::new(renderer);

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let renderer = renderer.clone();
                std::thread::spawn(move || {
                    let (_, layout, content) = example();
                    let request = CertificateRequest::new(
                        format!("Recipient {}", i),
                        format!("CERT-{:04}", i),
                        "01/01/2025",
                    );
                    renderer.render(&request, &layout, &content)
                })
            })
            .collect();

        for handle in handles {
            let pdf = handle.join().unwrap().unwrap();
            assert_eq!(page_count(&pdf), Some(1));
        }
    }

    #[test]
    fn every_planned_run_is_painted() {
        let Some(renderer) = renderer("every_planned_run_is_painted") else { return };
        let (request, base, content) = example();

        for orientation in [Orientation::Landscape, Orientation::Portrait] {
            for signature_count in [
                SignatureCount::Zero,
                SignatureCount::One,
                SignatureCount::Two,
            ] {
                let layout = LayoutConfig {
                    orientation,
                    signature_count,
                    watermark_enabled: true,
                    ..base.clone()
                };
                let (pdf, report) = renderer
                    .render_with_report(&request, &layout, &content)
                    .unwrap();

                assert!(pdf.starts_with(b"%PDF-"));
                assert!(report.dropped.is_empty(), "{:?}", report.dropped);
                assert_eq!(
                    report.printed,
                    planned_runs(&request, &layout, &content),
                    "{:?} with {:?} signatures",
                    orientation,
                    signature_count
                );
            }
        }
    }
}

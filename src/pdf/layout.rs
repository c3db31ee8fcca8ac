//! Certificate page layout.
//!
//! `compose` turns the three certificate inputs into a flat drawing plan:
//! the page size, the strokes (borders and rules) and every positioned text
//! run. It only needs a way to measure text, so the same plan is painted onto
//! a PDF page in production and inspected directly in tests.
//!
//! Coordinates are millimetres from the top-left corner of the page. A text
//! run's position is the top-left corner of its line box.

use genpdf::{Mm, Position, Size};

use crate::certificate::{
    CertificateRequest, LayoutConfig, Orientation, ProgramContent, SignatureCount,
    DEFAULT_BORDER_COLOR, DEFAULT_TITLE_COLOR,
};

const A4_SHORT_EDGE: f64 = 210.0;
const A4_LONG_EDGE: f64 = 297.0;

const OUTER_INSET: f64 = 12.0;
const INNER_INSET: f64 = 16.0;
const CONTENT_PADDING: f64 = 10.0;

const MIN_FONT_SIZE: u8 = 8;

const SIGNATURE_RULE_WIDTH: f64 = 60.0;

pub const INTRO_TEXT: &str = "This is to certify that";

pub const BLACK: Rgb = Rgb(0, 0, 0);
pub const DARK_GRAY: Rgb = Rgb(51, 51, 51);
pub const WATERMARK_GRAY: Rgb = Rgb(235, 235, 235);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Parses `#RRGGBB` (the leading `#` is optional).
    pub fn from_hex(value: &str) -> Option<Rgb> {
        let hex = value.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Rgb(channel(0)?, channel(2)?, channel(4)?))
    }

    fn from_hex_or(value: &str, fallback: &str) -> Rgb {
        Rgb::from_hex(value)
            .or_else(|| Rgb::from_hex(fallback))
            .unwrap_or(BLACK)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Face {
    Regular,
    Bold,
    Italic,
}

/// What a text run is on the certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Watermark,
    Title,
    EventKind,
    Intro,
    Recipient,
    Body,
    IssuedAt,
    CertificateId,
    SignatureLabel,
}

#[derive(Debug, Clone)]
pub struct TextRun {
    pub role: Role,
    pub text: String,
    pub position: Position,
    pub face: Face,
    pub size: u8,
    pub color: Rgb,
    pub width: Mm,
}

#[derive(Debug, Clone)]
pub struct Stroke {
    pub points: Vec<Position>,
    pub color: Rgb,
}

/// Everything drawn on a certificate page, in paint order.
#[derive(Debug, Clone)]
pub struct CertificateLayout {
    pub page: Size,
    pub strokes: Vec<Stroke>,
    pub texts: Vec<TextRun>,
}

impl CertificateLayout {
    pub fn runs(&self, role: Role) -> impl Iterator<Item = &TextRun> + '_ {
        self.texts.iter().filter(move |run| run.role == role)
    }

    /// All text on the page, one run per line, in paint order.
    pub fn plain_text(&self) -> String {
        self.texts
            .iter()
            .map(|run| run.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub trait TextMeasure {
    fn text_width(&self, text: &str, face: Face, size: u8) -> Mm;
}

pub fn page_size(orientation: Orientation) -> Size {
    match orientation {
        Orientation::Landscape => Size::new(A4_LONG_EDGE, A4_SHORT_EDGE),
        Orientation::Portrait => Size::new(A4_SHORT_EDGE, A4_LONG_EDGE),
    }
}

fn page_extent(orientation: Orientation) -> (f64, f64) {
    match orientation {
        Orientation::Landscape => (A4_LONG_EDGE, A4_SHORT_EDGE),
        Orientation::Portrait => (A4_SHORT_EDGE, A4_LONG_EDGE),
    }
}

/// Height of a line box for a font size in points.
fn line_height(size: u8) -> f64 {
    f64::from(size) * 0.3528 * 1.2
}

pub fn compose(
    request: &CertificateRequest,
    layout: &LayoutConfig,
    content: &ProgramContent,
    measure: &dyn TextMeasure,
) -> CertificateLayout {
    let (width, height) = page_extent(layout.orientation);
    let border = Rgb::from_hex_or(&layout.border_color, DEFAULT_BORDER_COLOR);
    let accent = Rgb::from_hex_or(&layout.title_color, DEFAULT_TITLE_COLOR);

    let mut page = Composer {
        width,
        height,
        measure,
        strokes: Vec::new(),
        texts: Vec::new(),
    };

    page.frame(OUTER_INSET, border);
    page.frame(INNER_INSET, border);

    if layout.watermark_enabled && !content.institution.trim().is_empty() {
        let y = height / 2.0 - line_height(48) / 2.0;
        page.centered(Role::Watermark, &content.institution, Face::Bold, 48, y, WATERMARK_GRAY);
    }

    let top = height * 0.16;

    page.centered(Role::Title, &layout.title, Face::Bold, 30, top, accent);
    let rule_y = top + line_height(30) + 1.5;
    page.rule(width / 2.0 - 35.0, width / 2.0 + 35.0, rule_y, border);

    page.centered(Role::EventKind, &layout.event_kind, Face::Italic, 16, top + 17.0, DARK_GRAY);

    page.centered(Role::Intro, INTRO_TEXT, Face::Regular, 14, top + 33.0, BLACK);

    let name_y = top + 43.0;
    let (name_x, name_width) = page.centered(
        Role::Recipient,
        request.recipient_name(),
        Face::Bold,
        28,
        name_y,
        accent,
    );
    if name_width > Mm::from(0.0) {
        let underline_y = Mm::from(name_y + line_height(28));
        page.stroke(
            vec![
                Position::new(name_x, underline_y),
                Position::new(name_x + name_width, underline_y),
            ],
            DARK_GRAY,
        );
    }

    let body_y = top + 62.0;
    let lines = [
        (
            "has successfully participated in the program titled".to_string(),
            Face::Regular,
            13,
        ),
        (content.program_name.clone(), Face::Bold, 15),
        (
            format!(
                "conducted by the {}, {}, {}",
                content.department, content.faculty, content.institution
            ),
            Face::Regular,
            13,
        ),
        (
            format!("from {} at {}.", content.program_dates, content.location),
            Face::Regular,
            13,
        ),
    ];
    for (i, (text, face, size)) in lines.iter().enumerate() {
        page.centered(Role::Body, text, *face, *size, body_y + 8.0 * i as f64, BLACK);
    }

    match layout.signature_count {
        SignatureCount::Zero => {}
        SignatureCount::One => {
            page.signature(width / 2.0, content.coordinator_label());
        }
        SignatureCount::Two => {
            page.signature(width * 0.27, content.coordinator_label());
            page.signature(width * 0.73, content.hod_label());
        }
    }

    let footer_y = height - INNER_INSET - 9.0;
    let left = INNER_INSET + 8.0;
    let right = width - INNER_INSET - 8.0;
    page.left_aligned(
        Role::IssuedAt,
        &format!("Issued on: {}", request.issued_at()),
        left,
        footer_y,
    );
    page.right_aligned(
        Role::CertificateId,
        &format!("Certificate ID: {}", request.certificate_id()),
        right,
        footer_y,
    );

    CertificateLayout {
        page: page_size(layout.orientation),
        strokes: page.strokes,
        texts: page.texts,
    }
}

struct Composer<'a> {
    width: f64,
    height: f64,
    measure: &'a dyn TextMeasure,
    strokes: Vec<Stroke>,
    texts: Vec<TextRun>,
}

impl Composer<'_> {
    fn printable_width(&self) -> f64 {
        self.width - 2.0 * (INNER_INSET + CONTENT_PADDING)
    }

    /// Largest size not above `size` at which `text` fits in `max_width`.
    fn fit(&self, text: &str, face: Face, size: u8, max_width: f64) -> (u8, Mm) {
        let limit = Mm::from(max_width);
        let mut size = size;
        let mut width = self.measure.text_width(text, face, size);
        while width > limit && size > MIN_FONT_SIZE {
            size -= 1;
            width = self.measure.text_width(text, face, size);
        }
        (size, width)
    }

    #[allow(clippy::too_many_arguments)]
    fn push_text(
        &mut self,
        role: Role,
        text: &str,
        face: Face,
        size: u8,
        x: Mm,
        y: f64,
        color: Rgb,
        width: Mm,
    ) {
        self.texts.push(TextRun {
            role,
            text: text.to_string(),
            position: Position::new(x, Mm::from(y)),
            face,
            size,
            color,
            width,
        });
    }

    /// Centers `text` on the page and returns its left edge and width.
    fn centered(
        &mut self,
        role: Role,
        text: &str,
        face: Face,
        size: u8,
        y: f64,
        color: Rgb,
    ) -> (Mm, Mm) {
        let max = self.printable_width();
        self.centered_on(role, text, face, size, self.width / 2.0, max, y, color)
    }

    #[allow(clippy::too_many_arguments)]
    fn centered_on(
        &mut self,
        role: Role,
        text: &str,
        face: Face,
        size: u8,
        center: f64,
        max_width: f64,
        y: f64,
        color: Rgb,
    ) -> (Mm, Mm) {
        let (size, width) = self.fit(text, face, size, max_width);
        let x = Mm::from(center) - width / 2.0;
        self.push_text(role, text, face, size, x, y, color, width);
        (x, width)
    }

    fn left_aligned(&mut self, role: Role, text: &str, x: f64, y: f64) {
        let max = self.printable_width() / 2.0;
        let (size, width) = self.fit(text, Face::Regular, 10, max);
        self.push_text(role, text, Face::Regular, size, Mm::from(x), y, DARK_GRAY, width);
    }

    fn right_aligned(&mut self, role: Role, text: &str, right: f64, y: f64) {
        let max = self.printable_width() / 2.0;
        let (size, width) = self.fit(text, Face::Regular, 10, max);
        let x = Mm::from(right) - width;
        self.push_text(role, text, Face::Regular, size, x, y, DARK_GRAY, width);
    }

    fn signature(&mut self, center: f64, label: &str) {
        let rule_y = self.height - 50.0;
        let half = SIGNATURE_RULE_WIDTH / 2.0;
        self.rule(center - half, center + half, rule_y, BLACK);
        self.centered_on(
            Role::SignatureLabel,
            label,
            Face::Regular,
            11,
            center,
            SIGNATURE_RULE_WIDTH + 10.0,
            rule_y + 2.0,
            BLACK,
        );
    }

    fn rule(&mut self, x1: f64, x2: f64, y: f64, color: Rgb) {
        self.stroke(vec![Position::new(x1, y), Position::new(x2, y)], color);
    }

    fn frame(&mut self, inset: f64, color: Rgb) {
        let (left, top) = (inset, inset);
        let (right, bottom) = (self.width - inset, self.height - inset);
        self.stroke(
            vec![
                Position::new(left, top),
                Position::new(right, top),
                Position::new(right, bottom),
                Position::new(left, bottom),
                Position::new(left, top),
            ],
            color,
        );
    }

    fn stroke(&mut self, points: Vec<Position>, color: Rgb) {
        self.strokes.push(Stroke { points, color });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Fixed advance per character, proportional to the font size.
    struct MonospaceMeasure;

    impl TextMeasure for MonospaceMeasure {
        fn text_width(&self, text: &str, face: Face, size: u8) -> Mm {
            let advance = match face {
                Face::Bold => 0.22,
                Face::Regular | Face::Italic => 0.2,
            };
            Mm::from(text.chars().count() as f64 * f64::from(size) * advance)
        }
    }

    fn request() -> CertificateRequest {
        CertificateRequest::new("Jane Doe", "CERT-0001", "01/01/2025")
    }

    fn layout() -> LayoutConfig {
        LayoutConfig {
            title: "Certificate of Participation".to_string(),
            event_kind: "Workshop".to_string(),
            orientation: Orientation::Landscape,
            signature_count: SignatureCount::Two,
            watermark_enabled: false,
            ..LayoutConfig::default()
        }
    }

    fn content() -> ProgramContent {
        ProgramContent {
            program_name: "Intro to Testing".to_string(),
            program_dates: "01 Jan 2025".to_string(),
            department: "CS Dept".to_string(),
            faculty: "Faculty of Engineering".to_string(),
            institution: "Example University".to_string(),
            location: "Example City".to_string(),
            coordinator_name: None,
            hod_name: None,
        }
    }

    fn close(a: Mm, b: Mm) -> bool {
        let drift = if a > b { a - b } else { b - a };
        drift < Mm::from(0.001)
    }

    fn labels(plan: &CertificateLayout) -> Vec<String> {
        plan.runs(Role::SignatureLabel)
            .map(|run| run.text.clone())
            .collect()
    }

    #[test]
    fn end_to_end_example_has_every_required_string() {
        let plan = compose(&request(), &layout(), &content(), &MonospaceMeasure);
        let text = plan.plain_text();

        for expected in [
            "Jane Doe",
            "CERT-0001",
            "01/01/2025",
            "Intro to Testing",
            "Example University",
            "Example City",
            "CS Dept",
            "Faculty of Engineering",
            "01 Jan 2025",
            "Certificate of Participation",
            "Workshop",
            "This is to certify that",
            "Coordinator",
            "Head of Department",
        ] {
            assert!(text.contains(expected), "missing {:?} in:\n{}", expected, text);
        }
        assert!(plan.page.width > plan.page.height);
    }

    #[test]
    fn orientation_sets_page_aspect() {
        let landscape = compose(&request(), &layout(), &content(), &MonospaceMeasure);
        assert_eq!(landscape.page.width, Mm::from(297.0));
        assert_eq!(landscape.page.height, Mm::from(210.0));

        let portrait_layout = LayoutConfig {
            orientation: Orientation::Portrait,
            ..layout()
        };
        let portrait = compose(&request(), &portrait_layout, &content(), &MonospaceMeasure);
        assert!(portrait.page.height > portrait.page.width);
        assert_eq!(portrait.page.width, Mm::from(210.0));
    }

    #[test]
    fn signature_count_controls_labels() {
        let none = compose(
            &request(),
            &LayoutConfig { signature_count: SignatureCount::Zero, ..layout() },
            &content(),
            &MonospaceMeasure,
        );
        assert!(labels(&none).is_empty());
        assert!(!none.plain_text().contains("Coordinator"));
        assert!(!none.plain_text().contains("Head of Department"));

        let one = compose(
            &request(),
            &LayoutConfig { signature_count: SignatureCount::One, ..layout() },
            &content(),
            &MonospaceMeasure,
        );
        assert_eq!(labels(&one), vec!["Coordinator".to_string()]);

        let two = compose(&request(), &layout(), &content(), &MonospaceMeasure);
        assert_eq!(
            labels(&two),
            vec!["Coordinator".to_string(), "Head of Department".to_string()]
        );
    }

    #[test]
    fn named_signatories_replace_fallback_labels() {
        let named = ProgramContent {
            coordinator_name: Some("Dr. A. Kumar".to_string()),
            hod_name: Some("Prof. B. Iyer".to_string()),
            ..content()
        };
        let plan = compose(&request(), &layout(), &named, &MonospaceMeasure);
        assert_eq!(
            labels(&plan),
            vec!["Dr. A. Kumar".to_string(), "Prof. B. Iyer".to_string()]
        );

        let single = compose(
            &request(),
            &LayoutConfig { signature_count: SignatureCount::One, ..layout() },
            &named,
            &MonospaceMeasure,
        );
        assert_eq!(labels(&single), vec!["Dr. A. Kumar".to_string()]);
    }

    #[test]
    fn two_signatures_sit_left_and_right_of_center() {
        let plan = compose(&request(), &layout(), &content(), &MonospaceMeasure);
        let runs: Vec<&TextRun> = plan.runs(Role::SignatureLabel).collect();
        let center = plan.page.width / 2.0;
        assert!(runs[0].position.x + runs[0].width < center);
        assert!(runs[1].position.x > center);
    }

    #[test]
    fn centered_runs_are_centered_on_measured_width() {
        let plan = compose(&request(), &layout(), &content(), &MonospaceMeasure);
        for role in [Role::Title, Role::EventKind, Role::Intro, Role::Recipient, Role::Body] {
            for run in plan.runs(role) {
                let expected = (plan.page.width - run.width) / 2.0;
                assert!(
                    close(run.position.x, expected),
                    "{:?} {:?} is off center",
                    role,
                    run.text
                );
            }
        }
    }

    #[test]
    fn footer_is_split_left_and_right() {
        let plan = compose(&request(), &layout(), &content(), &MonospaceMeasure);
        let issued = plan.runs(Role::IssuedAt).next().unwrap();
        let id = plan.runs(Role::CertificateId).next().unwrap();
        assert_eq!(issued.text, "Issued on: 01/01/2025");
        assert_eq!(id.text, "Certificate ID: CERT-0001");
        assert_eq!(issued.position.y, id.position.y);
        assert!(issued.position.x < plan.page.width / 2.0);
        assert!(id.position.x > plan.page.width / 2.0);
        assert!(close(id.position.x + id.width, Mm::from(297.0 - INNER_INSET - 8.0)));
    }

    #[test]
    fn empty_content_still_lays_out_a_full_page() {
        let plan = compose(
            &request(),
            &layout(),
            &ProgramContent::default(),
            &MonospaceMeasure,
        );
        assert_eq!(plan.runs(Role::Body).count(), 4);
        assert_eq!(plan.runs(Role::SignatureLabel).count(), 2);
        assert!(plan.plain_text().contains("Jane Doe"));
        assert_eq!(plan.strokes.len(), 2 + 1 + 1 + 2);
    }

    #[test]
    fn overlong_lines_shrink_instead_of_overflowing() {
        let long_title = LayoutConfig {
            title: "A".repeat(200),
            ..layout()
        };
        let plan = compose(&request(), &long_title, &content(), &MonospaceMeasure);
        let title = plan.runs(Role::Title).next().unwrap();
        assert!(title.size < 30);
        assert!(title.size >= MIN_FONT_SIZE);
        assert_eq!(title.text, "A".repeat(200));
    }

    #[test]
    fn watermark_is_painted_first_and_only_when_enabled() {
        let plain = compose(&request(), &layout(), &content(), &MonospaceMeasure);
        assert_eq!(plain.runs(Role::Watermark).count(), 0);

        let marked = compose(
            &request(),
            &LayoutConfig { watermark_enabled: true, ..layout() },
            &content(),
            &MonospaceMeasure,
        );
        assert_eq!(marked.texts[0].role, Role::Watermark);
        assert_eq!(marked.texts[0].color, WATERMARK_GRAY);

        let plain_title = plain.runs(Role::Title).next().unwrap();
        let marked_title = marked.runs(Role::Title).next().unwrap();
        assert_eq!(plain_title.position.y, marked_title.position.y);
    }

    #[test]
    fn composing_twice_is_identical() {
        let first = compose(&request(), &layout(), &content(), &MonospaceMeasure);
        let second = compose(&request(), &layout(), &content(), &MonospaceMeasure);
        assert_eq!(format!("{:?}", first), format!("{:?}", second));
    }

    #[test]
    fn bad_colors_fall_back_to_defaults() {
        assert_eq!(Rgb::from_hex("#1e3a8a"), Some(Rgb(30, 58, 138)));
        assert_eq!(Rgb::from_hex("DAA520"), Some(Rgb(218, 165, 32)));
        assert_eq!(Rgb::from_hex("#12345"), None);
        assert_eq!(Rgb::from_hex("#zzzzzz"), None);

        let plan = compose(
            &request(),
            &LayoutConfig { title_color: "teal".to_string(), ..layout() },
            &content(),
            &MonospaceMeasure,
        );
        let title = plan.runs(Role::Title).next().unwrap();
        assert_eq!(title.color, Rgb(30, 58, 138));
    }
}

use std::sync::OnceLock;
use tera::Tera;

static TERA: OnceLock<Tera> = OnceLock::new();

// Templates are compiled into the binary so rendering does not depend on the
// working directory.
pub fn get_tera() -> &'static Tera {
    TERA.get_or_init(|| {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            (
                "certificate_email.html",
                include_str!("../templates/certificate_email.html"),
            ),
            ("verify.html", include_str!("../templates/verify.html")),
        ])
        .expect("Failed to load templates");
        tera
    })
}

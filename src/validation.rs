use regex::Regex;
use std::sync::OnceLock;

use crate::db::RegistrationForm;

static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
static NAME_RE: OnceLock<Regex> = OnceLock::new();
static PHONE_RE: OnceLock<Regex> = OnceLock::new();

fn email_re() -> &'static Regex {
    EMAIL_RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap())
}

fn name_re() -> &'static Regex {
    NAME_RE.get_or_init(|| Regex::new(r"^[A-Za-z .]{3,}$").unwrap())
}

// Indian mobile numbers: ten digits, leading 6-9.
fn phone_re() -> &'static Regex {
    PHONE_RE.get_or_init(|| Regex::new(r"^[6-9]\d{9}$").unwrap())
}

pub fn is_valid_email(email: &str) -> bool {
    email_re().is_match(email.trim())
}

/// Trims every field and checks it; the first problem found is returned.
pub fn validate_registration(form: &RegistrationForm) -> Result<RegistrationForm, String> {
    let form = form.trimmed();

    if form.title.is_empty() {
        return Err("Title is required".to_string());
    }
    if !name_re().is_match(&form.name) {
        return Err("Name must be at least 3 characters of letters, spaces or dots".to_string());
    }
    if !is_valid_email(&form.email) {
        return Err("Invalid email format".to_string());
    }
    if !phone_re().is_match(&form.phone) {
        return Err("Phone must be a valid 10-digit mobile number".to_string());
    }
    if form.organization.chars().count() < 3 {
        return Err("Organization must be at least 3 characters".to_string());
    }

    Ok(form)
}

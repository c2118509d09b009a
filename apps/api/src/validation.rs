//! Boundary validation for resume snapshots and onboarding input.
//!
//! Payloads are typed by serde; this pass only checks the rules the type
//! system cannot express (formats, lengths, date ranges, duplicate identities).

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::resume::{Item, Resume, SectionKind};

const MAX_SHORT_TEXT: usize = 200;
const MAX_LONG_TEXT: usize = 5_000;
const MAX_ITEMS_PER_SECTION: usize = 100;
const USERNAME_MIN: usize = 3;
const USERNAME_MAX: usize = 32;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub passed: bool,
    pub errors: Vec<FieldError>,
}

impl ValidationReport {
    fn from_errors(errors: Vec<FieldError>) -> Self {
        Self {
            passed: errors.is_empty(),
            errors,
        }
    }

    /// One-line summary suitable for an inline form message.
    pub fn summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

struct Collector {
    errors: Vec<FieldError>,
}

impl Collector {
    fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    fn required(&mut self, field: &str, value: &str) {
        if value.trim().is_empty() {
            self.push(field, "is required");
        } else {
            self.max_len(field, value, MAX_SHORT_TEXT);
        }
    }

    fn max_len(&mut self, field: &str, value: &str, max: usize) {
        if value.chars().count() > max {
            self.push(field, format!("must be at most {max} characters"));
        }
    }
}

/// Accepts `local@domain.tld` with no whitespace and a dotted domain.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2 && labels.iter().all(|l| !l.is_empty())
}

/// 3–32 characters of `[a-z0-9_-]`, starting with a letter or digit.
pub fn is_valid_username(username: &str) -> bool {
    let len = username.chars().count();
    if !(USERNAME_MIN..=USERNAME_MAX).contains(&len) {
        return false;
    }
    let mut chars = username.chars();
    let first_ok = chars
        .next()
        .map(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .unwrap_or(false);
    first_ok
        && username
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
}

pub fn is_http_url(url: &str) -> bool {
    (url.starts_with("https://") || url.starts_with("http://")) && !url.contains(char::is_whitespace)
}

pub fn validate_new_user(username: &str, email: &str) -> ValidationReport {
    let mut c = Collector { errors: Vec::new() };
    if !is_valid_username(username) {
        c.push(
            "username",
            "must be 3-32 lowercase letters, digits, '_' or '-', starting with a letter or digit",
        );
    }
    if !is_valid_email(email) {
        c.push("email", "is not a valid email address");
    }
    ValidationReport::from_errors(c.errors)
}

fn check_identities<T>(c: &mut Collector, section: SectionKind, items: &[Item<T>]) {
    if items.len() > MAX_ITEMS_PER_SECTION {
        c.push(
            section.as_str(),
            format!("at most {MAX_ITEMS_PER_SECTION} items allowed"),
        );
    }
    let mut seen: HashSet<Uuid> = HashSet::new();
    for item in items {
        if item.client_id.is_nil() {
            c.push(section.as_str(), "item is missing a client_id");
        } else if !seen.insert(item.client_id) {
            c.push(
                section.as_str(),
                format!("duplicate client_id {}", item.client_id),
            );
        }
    }
}

fn check_range<D: PartialOrd>(c: &mut Collector, field: String, start: Option<D>, end: Option<D>) {
    if let (Some(s), Some(e)) = (start, end) {
        if e < s {
            c.push(field, "end date is before start date");
        }
    }
}

/// Validates a full resume snapshot before it is persisted.
pub fn validate_resume(resume: &Resume) -> ValidationReport {
    let mut c = Collector { errors: Vec::new() };

    c.max_len("header.name", &resume.header.name, MAX_SHORT_TEXT);
    c.max_len("header.title", &resume.header.title, MAX_SHORT_TEXT);
    if !resume.header.email.is_empty() && !is_valid_email(&resume.header.email) {
        c.push("header.email", "is not a valid email address");
    }
    c.max_len("profile.bio", &resume.profile.bio, MAX_LONG_TEXT);
    for (i, link) in resume.profile.links.iter().enumerate() {
        c.required(&format!("profile.links[{i}].label"), &link.label);
        if !is_http_url(&link.url) {
            c.push(format!("profile.links[{i}].url"), "must be an http(s) URL");
        }
    }

    check_identities(&mut c, SectionKind::Experience, &resume.experiences);
    for (i, item) in resume.experiences.iter().enumerate() {
        let e = &item.data;
        c.required(&format!("experience[{i}].company"), &e.company);
        c.required(&format!("experience[{i}].role"), &e.role);
        c.max_len(&format!("experience[{i}].description"), &e.description, MAX_LONG_TEXT);
        check_range(&mut c, format!("experience[{i}]"), e.start_date, e.end_date);
        if e.current && e.end_date.is_some() {
            c.push(format!("experience[{i}]"), "current role cannot have an end date");
        }
    }

    check_identities(&mut c, SectionKind::Education, &resume.education);
    for (i, item) in resume.education.iter().enumerate() {
        let e = &item.data;
        c.required(&format!("education[{i}].institution"), &e.institution);
        c.required(&format!("education[{i}].degree"), &e.degree);
        check_range(&mut c, format!("education[{i}]"), e.start_date, e.end_date);
    }

    check_identities(&mut c, SectionKind::Skill, &resume.skills);
    for (i, item) in resume.skills.iter().enumerate() {
        c.required(&format!("skill[{i}].name"), &item.data.name);
    }

    check_identities(&mut c, SectionKind::Project, &resume.projects);
    for (i, item) in resume.projects.iter().enumerate() {
        let p = &item.data;
        c.required(&format!("project[{i}].name"), &p.name);
        if let Some(url) = &p.url {
            if !is_http_url(url) {
                c.push(format!("project[{i}].url"), "must be an http(s) URL");
            }
        }
        check_range(&mut c, format!("project[{i}]"), p.start_date, p.end_date);
    }

    check_identities(&mut c, SectionKind::Certification, &resume.certifications);
    for (i, item) in resume.certifications.iter().enumerate() {
        let cert = &item.data;
        c.required(&format!("certification[{i}].name"), &cert.name);
        c.required(&format!("certification[{i}].issuer"), &cert.issuer);
        check_range(&mut c, format!("certification[{i}]"), cert.issued_on, cert.expires_on);
    }

    check_identities(&mut c, SectionKind::Award, &resume.awards);
    for (i, item) in resume.awards.iter().enumerate() {
        c.required(&format!("award[{i}].title"), &item.data.title);
    }

    check_identities(&mut c, SectionKind::Recommendation, &resume.recommendations);
    for (i, item) in resume.recommendations.iter().enumerate() {
        c.required(&format!("recommendation[{i}].author"), &item.data.author);
        if item.data.text.trim().is_empty() {
            c.push(format!("recommendation[{i}].text"), "is required");
        }
        c.max_len(&format!("recommendation[{i}].text"), &item.data.text, MAX_LONG_TEXT);
    }

    check_identities(&mut c, SectionKind::Language, &resume.languages);
    for (i, item) in resume.languages.iter().enumerate() {
        c.required(&format!("language[{i}].name"), &item.data.name);
    }

    ValidationReport::from_errors(c.errors)
}

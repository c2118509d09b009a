//! Flattens a resume into the ordered blocks every export format draws.

use chrono::NaiveDate;

use crate::export::labels::{month_year, present, proficiency, section_title, skill_level};
use crate::export::templates::Template;
use crate::models::{Locale, Resume, SectionKind};

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Name(String),
    Headline(String),
    Contact(String),
    Paragraph(String),
    SectionHeading(String),
    /// Entry title with right-aligned metadata (usually dates).
    EntryHeading { title: String, meta: String },
    EntrySubheading(String),
    Bullet(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResumeDocument {
    pub title: String,
    pub blocks: Vec<Block>,
}

impl ResumeDocument {
    /// All visible text, in reading order.
    pub fn plain_text(&self) -> Vec<&str> {
        self.blocks
            .iter()
            .flat_map(|b| match b {
                Block::EntryHeading { title, meta } => vec![title.as_str(), meta.as_str()],
                Block::Name(s)
                | Block::Headline(s)
                | Block::Contact(s)
                | Block::Paragraph(s)
                | Block::SectionHeading(s)
                | Block::EntrySubheading(s)
                | Block::Bullet(s) => vec![s.as_str()],
            })
            .filter(|s| !s.is_empty())
            .collect()
    }
}

fn date_range(start: Option<NaiveDate>, end: Option<NaiveDate>, current: bool, locale: Locale) -> String {
    let end = if current {
        Some(present(locale).to_string())
    } else {
        end.map(|d| month_year(d, locale))
    };
    match (start.map(|d| month_year(d, locale)), end) {
        (Some(s), Some(e)) => format!("{s} - {e}"),
        (Some(s), None) => s,
        (None, Some(e)) => e,
        (None, None) => String::new(),
    }
}

fn join_non_empty(parts: &[&str], sep: &str) -> String {
    parts
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(sep)
}

/// Builds the export document. Sections without items are omitted.
pub fn build_document(resume: &Resume, template: &Template, locale: Locale) -> ResumeDocument {
    let mut blocks = Vec::new();
    let header = &resume.header;
    let profile = &resume.profile;

    blocks.push(Block::Name(header.name.trim().to_string()));
    if !header.title.trim().is_empty() {
        blocks.push(Block::Headline(header.title.trim().to_string()));
    }

    let contact = join_non_empty(
        &[
            header.email.as_str(),
            profile.phone.as_deref().unwrap_or_default(),
            profile.location.as_deref().unwrap_or_default(),
        ],
        "  |  ",
    );
    if !contact.is_empty() {
        blocks.push(Block::Contact(contact));
    }
    let links: Vec<&str> = profile.links.iter().map(|l| l.url.as_str()).collect();
    let links = join_non_empty(&links, "  |  ");
    if !links.is_empty() {
        blocks.push(Block::Contact(links));
    }
    if !profile.bio.trim().is_empty() {
        blocks.push(Block::Paragraph(profile.bio.trim().to_string()));
    }

    for kind in &template.sections {
        if resume.section_len(*kind) == 0 {
            continue;
        }
        blocks.push(Block::SectionHeading(section_title(*kind, locale).to_string()));
        push_section(&mut blocks, resume, *kind, locale);
    }

    ResumeDocument {
        title: header.name.trim().to_string(),
        blocks,
    }
}

fn push_section(blocks: &mut Vec<Block>, resume: &Resume, kind: SectionKind, locale: Locale) {
    match kind {
        SectionKind::Experience => {
            for item in &resume.experiences {
                let e = &item.data;
                blocks.push(Block::EntryHeading {
                    title: join_non_empty(&[&e.role, &e.company], ", "),
                    meta: date_range(e.start_date, e.end_date, e.current, locale),
                });
                if let Some(loc) = e.location.as_deref().filter(|l| !l.trim().is_empty()) {
                    blocks.push(Block::EntrySubheading(loc.trim().to_string()));
                }
                if !e.description.trim().is_empty() {
                    blocks.push(Block::Paragraph(e.description.trim().to_string()));
                }
                blocks.extend(
                    e.highlights
                        .iter()
                        .filter(|h| !h.trim().is_empty())
                        .map(|h| Block::Bullet(h.trim().to_string())),
                );
            }
        }
        SectionKind::Education => {
            for item in &resume.education {
                let e = &item.data;
                blocks.push(Block::EntryHeading {
                    title: e.institution.trim().to_string(),
                    meta: date_range(e.start_date, e.end_date, false, locale),
                });
                let degree = join_non_empty(
                    &[&e.degree, &e.field, e.grade.as_deref().unwrap_or_default()],
                    ", ",
                );
                if !degree.is_empty() {
                    blocks.push(Block::EntrySubheading(degree));
                }
                if !e.description.trim().is_empty() {
                    blocks.push(Block::Paragraph(e.description.trim().to_string()));
                }
            }
        }
        SectionKind::Skill => {
            let line = resume
                .skills
                .iter()
                .map(|s| match s.data.level {
                    Some(level) => format!("{} ({})", s.data.name.trim(), skill_level(level, locale)),
                    None => s.data.name.trim().to_string(),
                })
                .collect::<Vec<_>>()
                .join(", ");
            blocks.push(Block::Paragraph(line));
        }
        SectionKind::Project => {
            for item in &resume.projects {
                let p = &item.data;
                blocks.push(Block::EntryHeading {
                    title: p.name.trim().to_string(),
                    meta: date_range(p.start_date, p.end_date, false, locale),
                });
                if let Some(url) = p.url.as_deref().filter(|u| !u.trim().is_empty()) {
                    blocks.push(Block::EntrySubheading(url.trim().to_string()));
                }
                if !p.description.trim().is_empty() {
                    blocks.push(Block::Paragraph(p.description.trim().to_string()));
                }
                if !p.technologies.is_empty() {
                    blocks.push(Block::Bullet(p.technologies.join(", ")));
                }
            }
        }
        SectionKind::Certification => {
            for item in &resume.certifications {
                let c = &item.data;
                blocks.push(Block::EntryHeading {
                    title: join_non_empty(&[&c.name, &c.issuer], ", "),
                    meta: date_range(c.issued_on, c.expires_on, false, locale),
                });
                if let Some(url) = c.credential_url.as_deref().filter(|u| !u.trim().is_empty()) {
                    blocks.push(Block::EntrySubheading(url.trim().to_string()));
                }
            }
        }
        SectionKind::Award => {
            for item in &resume.awards {
                let a = &item.data;
                blocks.push(Block::EntryHeading {
                    title: join_non_empty(&[&a.title, &a.issuer], ", "),
                    meta: a.date.map(|d| month_year(d, locale)).unwrap_or_default(),
                });
                if let Some(d) = a.description.as_deref().filter(|d| !d.trim().is_empty()) {
                    blocks.push(Block::Paragraph(d.trim().to_string()));
                }
            }
        }
        SectionKind::Recommendation => {
            for item in &resume.recommendations {
                let r = &item.data;
                blocks.push(Block::Paragraph(format!("\"{}\"", r.text.trim())));
                blocks.push(Block::EntrySubheading(join_non_empty(
                    &[&r.author, &r.relationship],
                    ", ",
                )));
            }
        }
        SectionKind::Language => {
            let line = resume
                .languages
                .iter()
                .map(|l| format!("{} ({})", l.data.name.trim(), proficiency(l.data.proficiency, locale)))
                .collect::<Vec<_>>()
                .join(", ");
            blocks.push(Block::Paragraph(line));
        }
    }
}

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

// ────────────────────────────────────────────────────────────────────────────
// Section kinds
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Experience,
    Education,
    Skill,
    Project,
    Certification,
    Award,
    Recommendation,
    Language,
}

impl SectionKind {
    pub const ALL: [SectionKind; 8] = [
        SectionKind::Experience,
        SectionKind::Education,
        SectionKind::Skill,
        SectionKind::Project,
        SectionKind::Certification,
        SectionKind::Award,
        SectionKind::Recommendation,
        SectionKind::Language,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SectionKind::Experience => "experience",
            SectionKind::Education => "education",
            SectionKind::Skill => "skill",
            SectionKind::Project => "project",
            SectionKind::Certification => "certification",
            SectionKind::Award => "award",
            SectionKind::Recommendation => "recommendation",
            SectionKind::Language => "language",
        }
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SectionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SectionKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown section '{s}'"))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Section payloads
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experience {
    pub company: String,
    pub role: String,
    pub location: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub current: bool,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub highlights: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Education {
    pub institution: String,
    pub degree: String,
    #[serde(default)]
    pub field: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub grade: Option<String>,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillLevel {
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skill {
    pub name: String,
    pub level: Option<SkillLevel>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub url: Option<String>,
    #[serde(default)]
    pub technologies: Vec<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Certification {
    pub name: String,
    pub issuer: String,
    pub issued_on: Option<NaiveDate>,
    pub expires_on: Option<NaiveDate>,
    pub credential_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Award {
    pub title: String,
    #[serde(default)]
    pub issuer: String,
    pub date: Option<NaiveDate>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub author: String,
    #[serde(default)]
    pub relationship: String,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Proficiency {
    Native,
    Fluent,
    Professional,
    Conversational,
    Basic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Language {
    pub name: String,
    pub proficiency: Proficiency,
}

/// Payload types that can live in a resume section.
///
/// `start_date` breaks ordering ties (most recent first) for dated sections.
pub trait SectionEntry: Serialize + DeserializeOwned + Clone + PartialEq {
    const KIND: SectionKind;

    fn start_date(&self) -> Option<NaiveDate> {
        None
    }
}

impl SectionEntry for Experience {
    const KIND: SectionKind = SectionKind::Experience;

    fn start_date(&self) -> Option<NaiveDate> {
        self.start_date
    }
}

impl SectionEntry for Education {
    const KIND: SectionKind = SectionKind::Education;

    fn start_date(&self) -> Option<NaiveDate> {
        self.start_date
    }
}

impl SectionEntry for Skill {
    const KIND: SectionKind = SectionKind::Skill;
}

impl SectionEntry for Project {
    const KIND: SectionKind = SectionKind::Project;
}

impl SectionEntry for Certification {
    const KIND: SectionKind = SectionKind::Certification;
}

impl SectionEntry for Award {
    const KIND: SectionKind = SectionKind::Award;
}

impl SectionEntry for Recommendation {
    const KIND: SectionKind = SectionKind::Recommendation;
}

impl SectionEntry for Language {
    const KIND: SectionKind = SectionKind::Language;
}

// ────────────────────────────────────────────────────────────────────────────
// Items and the resume aggregate
// ────────────────────────────────────────────────────────────────────────────

/// One entry of a section.
///
/// `client_id` is generated by the editor and never changes; `id` is assigned
/// by the server on first save. `order` always equals the index in the section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item<T> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub client_id: Uuid,
    #[serde(default)]
    pub order: i32,
    #[serde(flatten)]
    pub data: T,
}

impl<T> Item<T> {
    pub fn new(data: T) -> Self {
        Self {
            id: None,
            client_id: Uuid::new_v4(),
            order: 0,
            data,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReorderError {
    #[error("index {index} out of bounds for section of length {len}")]
    OutOfBounds { index: usize, len: usize },
}

/// Renumbers `order` so it matches the position of each item.
pub fn renumber<T>(items: &mut [Item<T>]) {
    for (idx, item) in items.iter_mut().enumerate() {
        item.order = idx as i32;
    }
}

/// Moves the item at `from` to `to`, shifting the items in between.
pub fn move_item<T>(items: &mut Vec<Item<T>>, from: usize, to: usize) -> Result<(), ReorderError> {
    let len = items.len();
    for index in [from, to] {
        if index >= len {
            return Err(ReorderError::OutOfBounds { index, len });
        }
    }
    let item = items.remove(from);
    items.insert(to, item);
    renumber(items);
    Ok(())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Header {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileLink {
    pub label: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub bio: String,
    pub location: Option<String>,
    pub phone: Option<String>,
    #[serde(default)]
    pub links: Vec<ProfileLink>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resume {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub user_id: Uuid,
    #[serde(default)]
    pub header: Header,
    #[serde(default)]
    pub profile: Profile,
    #[serde(default)]
    pub experiences: Vec<Item<Experience>>,
    #[serde(default)]
    pub education: Vec<Item<Education>>,
    #[serde(default)]
    pub skills: Vec<Item<Skill>>,
    #[serde(default)]
    pub projects: Vec<Item<Project>>,
    #[serde(default)]
    pub certifications: Vec<Item<Certification>>,
    #[serde(default)]
    pub awards: Vec<Item<Award>>,
    #[serde(default)]
    pub recommendations: Vec<Item<Recommendation>>,
    #[serde(default)]
    pub languages: Vec<Item<Language>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Resume {
    pub fn empty(user_id: Uuid) -> Self {
        Self {
            user_id,
            ..Self::default()
        }
    }

    /// Renumbers every section so `order` matches the display position.
    pub fn normalize_order(&mut self) {
        renumber(&mut self.experiences);
        renumber(&mut self.education);
        renumber(&mut self.skills);
        renumber(&mut self.projects);
        renumber(&mut self.certifications);
        renumber(&mut self.awards);
        renumber(&mut self.recommendations);
        renumber(&mut self.languages);
    }

    pub fn reorder(&mut self, section: SectionKind, from: usize, to: usize) -> Result<(), ReorderError> {
        match section {
            SectionKind::Experience => move_item(&mut self.experiences, from, to),
            SectionKind::Education => move_item(&mut self.education, from, to),
            SectionKind::Skill => move_item(&mut self.skills, from, to),
            SectionKind::Project => move_item(&mut self.projects, from, to),
            SectionKind::Certification => move_item(&mut self.certifications, from, to),
            SectionKind::Award => move_item(&mut self.awards, from, to),
            SectionKind::Recommendation => move_item(&mut self.recommendations, from, to),
            SectionKind::Language => move_item(&mut self.languages, from, to),
        }
    }

    pub fn section_len(&self, section: SectionKind) -> usize {
        match section {
            SectionKind::Experience => self.experiences.len(),
            SectionKind::Education => self.education.len(),
            SectionKind::Skill => self.skills.len(),
            SectionKind::Project => self.projects.len(),
            SectionKind::Certification => self.certifications.len(),
            SectionKind::Award => self.awards.len(),
            SectionKind::Recommendation => self.recommendations.len(),
            SectionKind::Language => self.languages.len(),
        }
    }

    /// Flattens all sections into storage records (one per item).
    pub fn to_records(&self) -> Result<Vec<ItemRecord>, serde_json::Error> {
        let mut out = Vec::new();
        push_records(&self.experiences, &mut out)?;
        push_records(&self.education, &mut out)?;
        push_records(&self.skills, &mut out)?;
        push_records(&self.projects, &mut out)?;
        push_records(&self.certifications, &mut out)?;
        push_records(&self.awards, &mut out)?;
        push_records(&self.recommendations, &mut out)?;
        push_records(&self.languages, &mut out)?;
        Ok(out)
    }

    /// Rebuilds a resume from its scalar parts and item records.
    ///
    /// Sections are sorted by `order` ascending; ties fall back to
    /// `start_date` descending, then to `client_id` for determinism.
    pub fn from_records(mut shell: Resume, records: &[ItemRecord]) -> Result<Resume, serde_json::Error> {
        shell.experiences = collect_section(records)?;
        shell.education = collect_section(records)?;
        shell.skills = collect_section(records)?;
        shell.projects = collect_section(records)?;
        shell.certifications = collect_section(records)?;
        shell.awards = collect_section(records)?;
        shell.recommendations = collect_section(records)?;
        shell.languages = collect_section(records)?;
        Ok(shell)
    }
}

/// Storage shape of a single section item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub id: Option<Uuid>,
    pub section: SectionKind,
    pub client_id: Uuid,
    pub position: i32,
    pub start_date: Option<NaiveDate>,
    pub data: serde_json::Value,
}

fn push_records<T: SectionEntry>(items: &[Item<T>], out: &mut Vec<ItemRecord>) -> Result<(), serde_json::Error> {
    for item in items {
        out.push(ItemRecord {
            id: item.id,
            section: T::KIND,
            client_id: item.client_id,
            position: item.order,
            start_date: item.data.start_date(),
            data: serde_json::to_value(&item.data)?,
        });
    }
    Ok(())
}

fn collect_section<T: SectionEntry>(records: &[ItemRecord]) -> Result<Vec<Item<T>>, serde_json::Error> {
    let mut rows: Vec<&ItemRecord> = records.iter().filter(|r| r.section == T::KIND).collect();
    rows.sort_by(|a, b| {
        a.position
            .cmp(&b.position)
            .then_with(|| b.start_date.cmp(&a.start_date))
            .then_with(|| a.client_id.cmp(&b.client_id))
    });
    let mut items = Vec::with_capacity(rows.len());
    for row in rows {
        items.push(Item {
            id: row.id,
            client_id: row.client_id,
            order: row.position,
            data: serde_json::from_value(row.data.clone())?,
        });
    }
    renumber(&mut items);
    Ok(items)
}

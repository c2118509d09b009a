//! Resume export templates.
//!
//! Lookup is pure and total: an unknown or missing id resolves to the default
//! template rather than failing the export.

use serde::{Deserialize, Serialize};

use crate::export::font_metrics::FontFamily;
use crate::models::SectionKind;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateId {
    Classic,
    #[default]
    Modern,
    Compact,
}

/// Typography and section ordering for one template.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub id: TemplateId,
    pub font: FontFamily,
    pub body_size: f32,
    pub name_size: f32,
    pub heading_size: f32,
    /// Multiplier applied to font size to get baseline-to-baseline distance.
    pub line_height: f32,
    /// Section headings drawn in the palette accent color.
    pub accent_headings: bool,
    /// Horizontal rule under each section heading.
    pub heading_rule: bool,
    pub sections: Vec<SectionKind>,
}

const STANDARD_ORDER: [SectionKind; 8] = [
    SectionKind::Experience,
    SectionKind::Education,
    SectionKind::Project,
    SectionKind::Skill,
    SectionKind::Certification,
    SectionKind::Award,
    SectionKind::Language,
    SectionKind::Recommendation,
];

impl TemplateId {
    pub const ALL: [TemplateId; 3] = [TemplateId::Classic, TemplateId::Modern, TemplateId::Compact];

    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateId::Classic => "classic",
            TemplateId::Modern => "modern",
            TemplateId::Compact => "compact",
        }
    }

    /// Resolves a client-supplied template id. Never fails.
    pub fn lookup(id: Option<&str>) -> TemplateId {
        let Some(raw) = id.map(str::trim).filter(|s| !s.is_empty()) else {
            return TemplateId::default();
        };
        match Self::ALL.iter().find(|t| t.as_str().eq_ignore_ascii_case(raw)) {
            Some(t) => *t,
            None => {
                tracing::debug!(requested = raw, "Unknown template id, using default");
                TemplateId::default()
            }
        }
    }

    pub fn template(&self) -> Template {
        match self {
            TemplateId::Classic => Template {
                id: *self,
                font: FontFamily::Times,
                body_size: 11.0,
                name_size: 22.0,
                heading_size: 12.5,
                line_height: 1.25,
                accent_headings: false,
                heading_rule: true,
                sections: STANDARD_ORDER.to_vec(),
            },
            TemplateId::Modern => Template {
                id: *self,
                font: FontFamily::Helvetica,
                body_size: 10.0,
                name_size: 24.0,
                heading_size: 12.0,
                line_height: 1.3,
                accent_headings: true,
                heading_rule: true,
                sections: STANDARD_ORDER.to_vec(),
            },
            TemplateId::Compact => {
                let mut sections = vec![SectionKind::Skill];
                sections.extend(STANDARD_ORDER.iter().copied().filter(|s| *s != SectionKind::Skill));
                Template {
                    id: *self,
                    font: FontFamily::Helvetica,
                    body_size: 9.0,
                    name_size: 18.0,
                    heading_size: 10.5,
                    line_height: 1.2,
                    accent_headings: true,
                    heading_rule: false,
                    sections,
                }
            }
        }
    }
}

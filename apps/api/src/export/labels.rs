// Localized strings printed in exported documents.

use chrono::NaiveDate;

use crate::models::resume::{Proficiency, SkillLevel};
use crate::models::{Locale, SectionKind};

pub fn section_title(kind: SectionKind, locale: Locale) -> &'static str {
    use SectionKind::*;
    match (locale, kind) {
        (Locale::En, Experience) => "Experience",
        (Locale::En, Education) => "Education",
        (Locale::En, Skill) => "Skills",
        (Locale::En, Project) => "Projects",
        (Locale::En, Certification) => "Certifications",
        (Locale::En, Award) => "Awards",
        (Locale::En, Recommendation) => "Recommendations",
        (Locale::En, Language) => "Languages",

        (Locale::Es, Experience) => "Experiencia",
        (Locale::Es, Education) => "Educación",
        (Locale::Es, Skill) => "Habilidades",
        (Locale::Es, Project) => "Proyectos",
        (Locale::Es, Certification) => "Certificaciones",
        (Locale::Es, Award) => "Premios",
        (Locale::Es, Recommendation) => "Recomendaciones",
        (Locale::Es, Language) => "Idiomas",

        (Locale::Fr, Experience) => "Expérience",
        (Locale::Fr, Education) => "Formation",
        (Locale::Fr, Skill) => "Compétences",
        (Locale::Fr, Project) => "Projets",
        (Locale::Fr, Certification) => "Certifications",
        (Locale::Fr, Award) => "Distinctions",
        (Locale::Fr, Recommendation) => "Recommandations",
        (Locale::Fr, Language) => "Langues",

        (Locale::De, Experience) => "Berufserfahrung",
        (Locale::De, Education) => "Ausbildung",
        (Locale::De, Skill) => "Kenntnisse",
        (Locale::De, Project) => "Projekte",
        (Locale::De, Certification) => "Zertifikate",
        (Locale::De, Award) => "Auszeichnungen",
        (Locale::De, Recommendation) => "Empfehlungen",
        (Locale::De, Language) => "Sprachen",
    }
}

/// End-date label for ongoing roles.
pub fn present(locale: Locale) -> &'static str {
    match locale {
        Locale::En => "Present",
        Locale::Es => "Actualidad",
        Locale::Fr => "Présent",
        Locale::De => "Heute",
    }
}

/// Month and year as written in dates of the locale.
pub fn month_year(date: NaiveDate, locale: Locale) -> String {
    let pattern = match locale {
        Locale::De => "%m.%Y",
        Locale::En | Locale::Es | Locale::Fr => "%m/%Y",
    };
    date.format(pattern).to_string()
}

pub fn skill_level(level: SkillLevel, locale: Locale) -> &'static str {
    use SkillLevel::*;
    match (locale, level) {
        (Locale::En, Beginner) => "Beginner",
        (Locale::En, Intermediate) => "Intermediate",
        (Locale::En, Advanced) => "Advanced",
        (Locale::En, Expert) => "Expert",

        (Locale::Es, Beginner) => "Principiante",
        (Locale::Es, Intermediate) => "Intermedio",
        (Locale::Es, Advanced) => "Avanzado",
        (Locale::Es, Expert) => "Experto",

        (Locale::Fr, Beginner) => "Débutant",
        (Locale::Fr, Intermediate) => "Intermédiaire",
        (Locale::Fr, Advanced) => "Avancé",
        (Locale::Fr, Expert) => "Expert",

        (Locale::De, Beginner) => "Grundkenntnisse",
        (Locale::De, Intermediate) => "Fortgeschritten",
        (Locale::De, Advanced) => "Sehr gut",
        (Locale::De, Expert) => "Experte",
    }
}

pub fn proficiency(level: Proficiency, locale: Locale) -> &'static str {
    use Proficiency::*;
    match (locale, level) {
        (Locale::En, Native) => "Native",
        (Locale::En, Fluent) => "Fluent",
        (Locale::En, Professional) => "Professional",
        (Locale::En, Conversational) => "Conversational",
        (Locale::En, Basic) => "Basic",

        (Locale::Es, Native) => "Nativo",
        (Locale::Es, Fluent) => "Fluido",
        (Locale::Es, Professional) => "Profesional",
        (Locale::Es, Conversational) => "Conversacional",
        (Locale::Es, Basic) => "Básico",

        (Locale::Fr, Native) => "Langue maternelle",
        (Locale::Fr, Fluent) => "Courant",
        (Locale::Fr, Professional) => "Professionnel",
        (Locale::Fr, Conversational) => "Conversationnel",
        (Locale::Fr, Basic) => "Notions",

        (Locale::De, Native) => "Muttersprache",
        (Locale::De, Fluent) => "Fließend",
        (Locale::De, Professional) => "Verhandlungssicher",
        (Locale::De, Conversational) => "Konversationssicher",
        (Locale::De, Basic) => "Grundkenntnisse",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_titles_differ_by_locale() {
        assert_eq!(section_title(SectionKind::Skill, Locale::En), "Skills");
        assert_eq!(section_title(SectionKind::Skill, Locale::De), "Kenntnisse");
        assert_eq!(present(Locale::Es), "Actualidad");
    }

    #[test]
    fn test_levels_and_dates_follow_locale() {
        assert_eq!(skill_level(SkillLevel::Advanced, Locale::Fr), "Avancé");
        assert_eq!(proficiency(Proficiency::Native, Locale::De), "Muttersprache");
        let date = NaiveDate::from_ymd_opt(1843, 9, 1).unwrap();
        assert_eq!(month_year(date, Locale::En), "09/1843");
        assert_eq!(month_year(date, Locale::De), "09.1843");
    }
}

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::SyncError;

/// Reorderable resume sections. Personal info is always rendered first and is not listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionId {
    Summary,
    Experience,
    Leadership,
    Projects,
    Education,
    Skills,
    Publications,
}

impl SectionId {
    /// Canonical order, used for defaults and to fill in missing entries.
    pub const ALL: [SectionId; 7] = [
        SectionId::Summary,
        SectionId::Experience,
        SectionId::Leadership,
        SectionId::Projects,
        SectionId::Education,
        SectionId::Skills,
        SectionId::Publications,
    ];

    /// Sections stored as ordered lists of entries.
    pub const LISTS: [SectionId; 6] = [
        SectionId::Experience,
        SectionId::Leadership,
        SectionId::Projects,
        SectionId::Education,
        SectionId::Skills,
        SectionId::Publications,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SectionId::Summary => "summary",
            SectionId::Experience => "experience",
            SectionId::Leadership => "leadership",
            SectionId::Projects => "projects",
            SectionId::Education => "education",
            SectionId::Skills => "skills",
            SectionId::Publications => "publications",
        }
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SectionId {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SectionId::ALL
            .iter()
            .find(|id| id.as_str() == s)
            .copied()
            .ok_or_else(|| SyncError::NotFound(format!("section '{}'", s)))
    }
}

/// Turns an arbitrary list of section names into a permutation of [`SectionId::ALL`].
///
/// Unknown names and repeats are dropped; sections that never appeared are
/// appended in canonical order.
pub fn normalize_section_order<S: AsRef<str>>(raw: &[S]) -> Vec<SectionId> {
    let mut order: Vec<SectionId> = Vec::with_capacity(SectionId::ALL.len());
    for name in raw {
        if let Ok(id) = name.as_ref().parse::<SectionId>() {
            if !order.contains(&id) {
                order.push(id);
            }
        }
    }
    for id in SectionId::ALL {
        if !order.contains(&id) {
            order.push(id);
        }
    }
    order
}

pub(crate) fn deserialize_section_order<'de, D>(deserializer: D) -> Result<Vec<SectionId>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Vec<String>> = Option::deserialize(deserializer)?;
    Ok(normalize_section_order(&raw.unwrap_or_default()))
}

pub(crate) fn default_section_order() -> Vec<SectionId> {
    SectionId::ALL.to_vec()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersonalInfo {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub location: String,
    pub linkedin: String,
    pub github: String,
    pub website: String,
}

impl PersonalInfo {
    pub const FIELDS: [&'static str; 7] = [
        "name", "email", "phone", "location", "linkedin", "github", "website",
    ];

    pub fn field(&self, name: &str) -> Option<&str> {
        let value = match name {
            "name" => &self.name,
            "email" => &self.email,
            "phone" => &self.phone,
            "location" => &self.location,
            "linkedin" => &self.linkedin,
            "github" => &self.github,
            "website" => &self.website,
            _ => return None,
        };
        Some(value.as_str())
    }

    /// Returns false for an unknown field name.
    pub fn set_field(&mut self, name: &str, value: String) -> bool {
        let slot = match name {
            "name" => &mut self.name,
            "email" => &mut self.email,
            "phone" => &mut self.phone,
            "location" => &mut self.location,
            "linkedin" => &mut self.linkedin,
            "github" => &mut self.github,
            "website" => &mut self.website,
            _ => return false,
        };
        *slot = value;
        true
    }
}

/// Used for both the experience and leadership sections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Experience {
    pub company: String,
    pub position: String,
    pub location: String,
    pub start_date: String,
    pub end_date: String,
    pub description: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Project {
    pub name: String,
    pub technologies: String,
    pub link: String,
    pub start_date: String,
    pub end_date: String,
    pub description: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Education {
    pub institution: String,
    pub degree: String,
    pub location: String,
    pub start_date: String,
    pub end_date: String,
    pub gpa: String,
    pub details: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SkillGroup {
    pub category: String,
    pub items: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Publication {
    pub title: String,
    pub authors: String,
    pub venue: String,
    pub date: String,
    pub link: String,
}

/// Which optional sections are shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SectionVisibility {
    pub show_summary: bool,
    pub show_leadership: bool,
    pub show_projects: bool,
    pub show_publications: bool,
}

impl Default for SectionVisibility {
    fn default() -> Self {
        Self {
            show_summary: true,
            show_leadership: true,
            show_projects: true,
            show_publications: true,
        }
    }
}

impl SectionVisibility {
    /// Persisted checkbox states win; otherwise a section is shown iff it has content.
    pub fn derive(doc: &ResumeDocument) -> Self {
        doc.checkbox_states
            .unwrap_or_else(|| Self::from_content(doc))
    }

    pub fn from_content(doc: &ResumeDocument) -> Self {
        Self {
            show_summary: !doc.summary.trim().is_empty(),
            show_leadership: !doc.leadership.is_empty(),
            show_projects: !doc.projects.is_empty(),
            show_publications: !doc.publications.is_empty(),
        }
    }
}

/// The full editable resume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResumeDocument {
    pub personal_info: PersonalInfo,
    pub summary: String,
    pub experience: Vec<Experience>,
    pub leadership: Vec<Experience>,
    pub projects: Vec<Project>,
    pub education: Vec<Education>,
    pub skills: Vec<SkillGroup>,
    pub publications: Vec<Publication>,
    #[serde(deserialize_with = "deserialize_section_order")]
    pub section_order: Vec<SectionId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkbox_states: Option<SectionVisibility>,
}

impl Default for ResumeDocument {
    fn default() -> Self {
        Self {
            personal_info: PersonalInfo::default(),
            summary: String::new(),
            experience: Vec::new(),
            leadership: Vec::new(),
            projects: Vec::new(),
            education: Vec::new(),
            skills: Vec::new(),
            publications: Vec::new(),
            section_order: default_section_order(),
            checkbox_states: None,
        }
    }
}

impl ResumeDocument {
    /// The empty template shown after "start over".
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_name(name: &str) -> Self {
        let mut doc = Self::default();
        doc.personal_info.name = name.to_string();
        doc
    }

    /// Re-establish the permutation invariant after a direct field assignment.
    pub fn normalize(&mut self) {
        self.section_order = normalize_section_order(
            &self
                .section_order
                .iter()
                .map(SectionId::as_str)
                .collect::<Vec<_>>(),
        );
    }

    pub fn is_empty(&self) -> bool {
        self.personal_info == PersonalInfo::default()
            && self.summary.trim().is_empty()
            && self.experience.is_empty()
            && self.leadership.is_empty()
            && self.projects.is_empty()
            && self.education.is_empty()
            && self.skills.is_empty()
            && self.publications.is_empty()
    }

    pub fn section_len(&self, section: SectionId) -> usize {
        match section {
            SectionId::Summary => usize::from(!self.summary.is_empty()),
            SectionId::Experience => self.experience.len(),
            SectionId::Leadership => self.leadership.len(),
            SectionId::Projects => self.projects.len(),
            SectionId::Education => self.education.len(),
            SectionId::Skills => self.skills.len(),
            SectionId::Publications => self.publications.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_drops_unknown_and_duplicates() {
        let order = normalize_section_order(&["skills", "bogus", "skills", "summary"]);
        assert_eq!(order[0], SectionId::Skills);
        assert_eq!(order[1], SectionId::Summary);
        assert_eq!(order.len(), SectionId::ALL.len());
    }

    #[test]
    fn normalize_fills_missing_in_canonical_order() {
        let order = normalize_section_order(&["publications"]);
        assert_eq!(
            order,
            vec![
                SectionId::Publications,
                SectionId::Summary,
                SectionId::Experience,
                SectionId::Leadership,
                SectionId::Projects,
                SectionId::Education,
                SectionId::Skills,
            ]
        );
    }

    #[test]
    fn order_is_always_a_permutation() {
        let inputs: Vec<Vec<&str>> = vec![
            vec![],
            vec!["education", "education", "education"],
            vec!["x", "y", "z"],
            vec![
                "publications",
                "skills",
                "education",
                "projects",
                "leadership",
                "experience",
                "summary",
                "summary",
            ],
            vec!["Summary", "SKILLS", "skills"],
        ];
        for input in inputs {
            let order = normalize_section_order(&input);
            let mut sorted = order.clone();
            sorted.sort();
            let mut canonical = SectionId::ALL.to_vec();
            canonical.sort();
            assert_eq!(sorted, canonical, "input {:?}", input);
        }
    }

    #[test]
    fn deserialize_normalizes_section_order() {
        let doc: ResumeDocument =
            serde_json::from_str(r#"{"sectionOrder": ["skills", "hobbies", "skills"]}"#).unwrap();
        assert_eq!(doc.section_order[0], SectionId::Skills);
        assert_eq!(doc.section_order.len(), 7);
    }

    #[test]
    fn deserialize_tolerates_missing_fields() {
        let doc: ResumeDocument =
            serde_json::from_str(r#"{"personalInfo": {"name": "Jane Doe"}}"#).unwrap();
        assert_eq!(doc.personal_info.name, "Jane Doe");
        assert_eq!(doc.section_order, SectionId::ALL.to_vec());
        assert!(doc.experience.is_empty());
    }

    #[test]
    fn visibility_prefers_checkbox_states() {
        let mut doc = ResumeDocument::default();
        doc.summary = "Engineer".to_string();
        let stored = SectionVisibility {
            show_summary: false,
            show_leadership: true,
            show_projects: false,
            show_publications: false,
        };
        doc.checkbox_states = Some(stored);
        assert_eq!(SectionVisibility::derive(&doc), stored);
    }

    #[test]
    fn visibility_from_content_inspection() {
        let mut doc = ResumeDocument::default();
        doc.projects.push(Project {
            name: "resume-sync".into(),
            ..Default::default()
        });
        let vis = SectionVisibility::derive(&doc);
        assert!(vis.show_projects);
        assert!(!vis.show_summary);
        assert!(!vis.show_leadership);
        assert!(!vis.show_publications);
    }

    #[test]
    fn empty_template_is_empty() {
        assert!(ResumeDocument::empty().is_empty());
        assert!(!ResumeDocument::with_name("Jane Doe").is_empty());
    }
}

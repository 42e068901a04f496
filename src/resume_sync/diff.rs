//! # Field Diff
//!
//! Given two versions of a resume, [`diff_documents`] produces two parallel
//! sparse change sets: the fields as they were and the fields as they became.
//! Only entries that differ are present. This is the payload of the session
//! change log and the source of the editor's "changed fields" highlight.
//!
//! ## Granularity
//!
//! | Path | Compared as |
//! |------|-------------|
//! | `personalInfo.<field>` | scalar string |
//! | `summary` | scalar string |
//! | `<section>[i]` | whole entry, positionally by index |
//! | `sectionOrder` | the whole order, as a list of section names |
//! | `checkboxStates` | the saved visibility choices, `null` when unset |
//!
//! When one side has more entries than the other, the extra indices appear
//! with `null` on the side that lacks them. Replaying `after` onto the older
//! document therefore appends or truncates the list as needed.
//!
//! ## Symmetry
//!
//! For documents `a` and `b`, applying `diff(a, b).after` onto `a` yields `b`
//! for every field, and applying `before` onto `b` yields `a`. Fields missing
//! from the diff are deep-equal in both inputs.

use crate::error::{Result, SyncError};
use crate::model::{normalize_section_order, ResumeDocument, SectionId, SectionVisibility};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FieldPath {
    Personal(String),
    Summary,
    Entry { section: SectionId, index: usize },
    SectionOrder,
    CheckboxStates,
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldPath::Personal(field) => write!(f, "personalInfo.{}", field),
            FieldPath::Summary => f.write_str("summary"),
            FieldPath::Entry { section, index } => write!(f, "{}[{}]", section, index),
            FieldPath::SectionOrder => f.write_str("sectionOrder"),
            FieldPath::CheckboxStates => f.write_str("checkboxStates"),
        }
    }
}

impl FromStr for FieldPath {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "summary" => return Ok(FieldPath::Summary),
            "sectionOrder" => return Ok(FieldPath::SectionOrder),
            "checkboxStates" => return Ok(FieldPath::CheckboxStates),
            _ => {}
        }
        if let Some(field) = s.strip_prefix("personalInfo.") {
            return Ok(FieldPath::Personal(field.to_string()));
        }
        let invalid = || SyncError::Store(format!("Invalid field path: {}", s));
        let (name, rest) = s.split_once('[').ok_or_else(invalid)?;
        let index = rest
            .strip_suffix(']')
            .and_then(|i| i.parse::<usize>().ok())
            .ok_or_else(invalid)?;
        let section = name.parse::<SectionId>().map_err(|_| invalid())?;
        if section == SectionId::Summary {
            return Err(invalid());
        }
        Ok(FieldPath::Entry { section, index })
    }
}

impl Serialize for FieldPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FieldPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Sparse map from field path to that field's value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeSet(BTreeMap<FieldPath, Value>);

impl ChangeSet {
    pub fn get(&self, path: &FieldPath) -> Option<&Value> {
        self.0.get(path)
    }

    pub fn contains(&self, path: &FieldPath) -> bool {
        self.0.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &FieldPath> {
        self.0.keys()
    }

    /// Write every field of this change set into `doc`.
    pub fn apply_to(&self, doc: &mut ResumeDocument) -> Result<()> {
        // BTreeMap order: per section, ascending index, so appends happen in sequence.
        for (path, value) in &self.0 {
            match path {
                FieldPath::Personal(field) => {
                    let text = expect_str(path, value)?;
                    if !doc.personal_info.set_field(field, text) {
                        return Err(SyncError::Store(format!("Unknown field: {}", path)));
                    }
                }
                FieldPath::Summary => doc.summary = expect_str(path, value)?,
                FieldPath::Entry { section, index } => {
                    apply_entry_to(doc, *section, *index, value)?
                }
                FieldPath::SectionOrder => {
                    let names: Vec<String> = serde_json::from_value(value.clone())?;
                    doc.section_order = normalize_section_order(&names);
                }
                FieldPath::CheckboxStates => {
                    let states: Option<SectionVisibility> = serde_json::from_value(value.clone())?;
                    doc.checkbox_states = states;
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldDiff {
    pub before: ChangeSet,
    pub after: ChangeSet,
}

impl FieldDiff {
    pub fn is_empty(&self) -> bool {
        self.after.is_empty()
    }

    pub fn changed_fields(&self) -> Vec<String> {
        self.after.paths().map(ToString::to_string).collect()
    }

    fn record(&mut self, path: FieldPath, before: Value, after: Value) {
        self.before.0.insert(path.clone(), before);
        self.after.0.insert(path, after);
    }
}

pub fn diff_documents(a: &ResumeDocument, b: &ResumeDocument) -> Result<FieldDiff> {
    let mut diff = FieldDiff::default();

    for field in crate::model::PersonalInfo::FIELDS {
        let old = a.personal_info.field(field).unwrap_or_default();
        let new = b.personal_info.field(field).unwrap_or_default();
        if old != new {
            diff.record(
                FieldPath::Personal(field.to_string()),
                Value::String(old.to_string()),
                Value::String(new.to_string()),
            );
        }
    }

    if a.summary != b.summary {
        diff.record(
            FieldPath::Summary,
            Value::String(a.summary.clone()),
            Value::String(b.summary.clone()),
        );
    }

    diff_list(&mut diff, SectionId::Experience, &a.experience, &b.experience)?;
    diff_list(&mut diff, SectionId::Leadership, &a.leadership, &b.leadership)?;
    diff_list(&mut diff, SectionId::Projects, &a.projects, &b.projects)?;
    diff_list(&mut diff, SectionId::Education, &a.education, &b.education)?;
    diff_list(&mut diff, SectionId::Skills, &a.skills, &b.skills)?;
    diff_list(&mut diff, SectionId::Publications, &a.publications, &b.publications)?;

    if a.section_order != b.section_order {
        diff.record(
            FieldPath::SectionOrder,
            serde_json::to_value(&a.section_order)?,
            serde_json::to_value(&b.section_order)?,
        );
    }

    if a.checkbox_states != b.checkbox_states {
        diff.record(
            FieldPath::CheckboxStates,
            serde_json::to_value(a.checkbox_states)?,
            serde_json::to_value(b.checkbox_states)?,
        );
    }

    Ok(diff)
}

fn diff_list<T: Serialize + PartialEq>(
    diff: &mut FieldDiff,
    section: SectionId,
    old: &[T],
    new: &[T],
) -> Result<()> {
    for index in 0..old.len().max(new.len()) {
        let (before, after) = (old.get(index), new.get(index));
        if before != after {
            diff.record(
                FieldPath::Entry { section, index },
                serde_json::to_value(before)?,
                serde_json::to_value(after)?,
            );
        }
    }
    Ok(())
}

fn expect_str(path: &FieldPath, value: &Value) -> Result<String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| SyncError::Store(format!("Expected a string for {}", path)))
}

fn apply_entry_to(
    doc: &mut ResumeDocument,
    section: SectionId,
    index: usize,
    value: &Value,
) -> Result<()> {
    match section {
        SectionId::Experience => apply_entry(&mut doc.experience, section, index, value),
        SectionId::Leadership => apply_entry(&mut doc.leadership, section, index, value),
        SectionId::Projects => apply_entry(&mut doc.projects, section, index, value),
        SectionId::Education => apply_entry(&mut doc.education, section, index, value),
        SectionId::Skills => apply_entry(&mut doc.skills, section, index, value),
        SectionId::Publications => apply_entry(&mut doc.publications, section, index, value),
        SectionId::Summary => Err(SyncError::Store("summary has no entries".to_string())),
    }
}

/// `null` removes the entry and everything after it; otherwise the entry is
/// replaced, or appended when `index` is one past the end.
fn apply_entry<T: DeserializeOwned>(
    list: &mut Vec<T>,
    section: SectionId,
    index: usize,
    value: &Value,
) -> Result<()> {
    if value.is_null() {
        list.truncate(index);
        return Ok(());
    }

    let entry: T = serde_json::from_value(value.clone())?;
    match index.cmp(&list.len()) {
        std::cmp::Ordering::Less => list[index] = entry,
        std::cmp::Ordering::Equal => list.push(entry),
        std::cmp::Ordering::Greater => {
            return Err(SyncError::Store(format!(
                "Gap in {}: index {} but only {} entries",
                section,
                index,
                list.len()
            )))
        }
    }
    Ok(())
}

//! # Durable Document Store
//!
//! Holds the resume currently bound to the editor, plus a snapshot of the last
//! selected resume and its server id. Everything is persisted as a single JSON
//! object under one storage key, so a reload restores the editor exactly.
//!
//! ## Writes
//!
//! - **Field edits** are applied in memory and flushed after the debounce
//!   window ([`SyncConfig::debounce_ms`]). Rapid edits coalesce into one write.
//! - **Transitions** (selecting a resume, clearing the selection, starting
//!   over) are written immediately. The immediate write goes through the same
//!   adapter queue as the debounced one and replaces it, so a pending debounced
//!   flush can never overwrite a selection with older state.
//!
//! ## Selection
//!
//! `select_resume` replaces the active document and the snapshot together.
//! While a selection exists, every edit to the active document is mirrored
//! into the snapshot, so restoring after a reload brings back the edits.
//! `reset` ("start over") clears the active document and every derived flag
//! but keeps the snapshot, so the previously bound resume is still offered
//! after a reload.
//!
//! ## Failure Handling
//!
//! Storage failures are logged and absorbed: the in-memory state is always
//! correct for the running session. A missing or corrupt persisted entry loads
//! as the default state.
//!
//! [`SyncConfig::debounce_ms`]: crate::config::SyncConfig::debounce_ms

use crate::config::SyncConfig;
use crate::diff::{diff_documents, FieldDiff};
use crate::model::resume::{default_section_order, deserialize_section_order};
use crate::model::{normalize_section_order, ResumeDocument, SectionId, SectionVisibility};
use crate::store::{StorageAdapter, StorageBackend, WriteOutcome};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditorView {
    #[default]
    Edit,
    Optimize,
    Preview,
}

/// Everything the document store persists, in its on-disk layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DocumentState {
    pub resume_data: ResumeDocument,
    pub base_resume: Option<ResumeDocument>,
    pub show_leadership: bool,
    pub show_projects: bool,
    pub show_summary: bool,
    pub show_publications: bool,
    pub is_saved: bool,
    pub job_description: String,
    pub is_optimizing: bool,
    pub optimized_data: Option<ResumeDocument>,
    pub current_view: EditorView,
    pub show_changes: bool,
    pub changed_fields: Vec<String>,
    #[serde(deserialize_with = "deserialize_section_order")]
    pub section_order: Vec<SectionId>,
    pub last_selected_resume: Option<ResumeDocument>,
    pub last_selected_resume_id: Option<String>,
}

impl Default for DocumentState {
    fn default() -> Self {
        let visibility = SectionVisibility::default();
        Self {
            resume_data: ResumeDocument::empty(),
            base_resume: None,
            show_leadership: visibility.show_leadership,
            show_projects: visibility.show_projects,
            show_summary: visibility.show_summary,
            show_publications: visibility.show_publications,
            is_saved: false,
            job_description: String::new(),
            is_optimizing: false,
            optimized_data: None,
            current_view: EditorView::Edit,
            show_changes: false,
            changed_fields: Vec::new(),
            section_order: default_section_order(),
            last_selected_resume: None,
            last_selected_resume_id: None,
        }
    }
}

impl DocumentState {
    pub fn visibility(&self) -> SectionVisibility {
        SectionVisibility {
            show_summary: self.show_summary,
            show_leadership: self.show_leadership,
            show_projects: self.show_projects,
            show_publications: self.show_publications,
        }
    }

    fn set_visibility(&mut self, visibility: SectionVisibility) {
        self.show_summary = visibility.show_summary;
        self.show_leadership = visibility.show_leadership;
        self.show_projects = visibility.show_projects;
        self.show_publications = visibility.show_publications;
    }

    /// Keep the selection snapshot in step with the edited document, so a
    /// later `load_selection` restores the edits rather than older content.
    fn sync_snapshot(&mut self) {
        if self.last_selected_resume_id.is_some() {
            self.last_selected_resume = Some(self.resume_data.clone());
        }
    }

    /// Bind `doc` as the active document, deriving its order and visibility once.
    fn bind(&mut self, mut doc: ResumeDocument) {
        doc.normalize();
        self.set_visibility(SectionVisibility::derive(&doc));
        self.section_order = doc.section_order.clone();
        self.resume_data = doc;
    }
}

pub struct DocumentStore<B: StorageBackend> {
    adapter: StorageAdapter<B>,
    key: String,
    debounce: Duration,
    state: DocumentState,
}

impl<B: StorageBackend> DocumentStore<B> {
    /// Load the persisted state, falling back to defaults when it is missing or unreadable.
    pub fn open(adapter: StorageAdapter<B>, config: &SyncConfig) -> Self {
        let key = config.document_key.clone();
        let state = load_state(&adapter, &key);
        Self {
            adapter,
            key,
            debounce: config.debounce(),
            state,
        }
    }

    pub fn state(&self) -> &DocumentState {
        &self.state
    }

    pub fn active(&self) -> &ResumeDocument {
        &self.state.resume_data
    }

    pub fn last_selected(&self) -> Option<(&ResumeDocument, &str)> {
        match (
            &self.state.last_selected_resume,
            &self.state.last_selected_resume_id,
        ) {
            (Some(doc), Some(id)) => Some((doc, id.as_str())),
            _ => None,
        }
    }

    pub fn visibility(&self) -> SectionVisibility {
        self.state.visibility()
    }

    pub fn adapter(&self) -> &StorageAdapter<B> {
        &self.adapter
    }

    /// Replace the active document without touching the selection snapshot.
    pub fn set_active_document(&mut self, doc: ResumeDocument) {
        self.state.bind(doc);
        self.state.is_saved = false;
        self.persist_later();
    }

    /// Apply a field edit to the active document.
    pub fn update<F: FnOnce(&mut ResumeDocument)>(&mut self, edit: F) {
        edit(&mut self.state.resume_data);
        self.state.resume_data.normalize();
        self.state.section_order = self.state.resume_data.section_order.clone();
        self.state.is_saved = false;
        self.state.sync_snapshot();
        self.persist_later();
    }

    /// Bind `doc` as both the active document and the selection snapshot, and
    /// persist right away so the next load sees it.
    pub fn select_resume(&mut self, doc: ResumeDocument, id: &str) {
        self.state.bind(doc);
        self.state.last_selected_resume = Some(self.state.resume_data.clone());
        self.state.last_selected_resume_id = Some(id.to_string());
        self.state.is_saved = true;
        self.state.optimized_data = None;
        self.state.show_changes = false;
        self.state.changed_fields.clear();
        debug!(id, "resume selected");
        self.persist_now();
    }

    pub fn clear_selection(&mut self) {
        self.state.last_selected_resume = None;
        self.state.last_selected_resume_id = None;
        self.persist_now();
    }

    /// Restore the snapshot into the active slot.
    ///
    /// Returns false, leaving the active document untouched, unless both the
    /// snapshot and its id are present.
    pub fn load_selection(&mut self) -> bool {
        let Some((doc, _)) = self.last_selected() else {
            return false;
        };
        let doc = doc.clone();
        self.state.bind(doc);
        self.persist_later();
        true
    }

    /// Start over: empty template, derived flags cleared, selection snapshot kept.
    pub fn reset(&mut self) {
        let last_selected_resume = self.state.last_selected_resume.take();
        let last_selected_resume_id = self.state.last_selected_resume_id.take();
        self.state = DocumentState {
            last_selected_resume,
            last_selected_resume_id,
            ..DocumentState::default()
        };
        self.persist_now();
    }

    pub fn set_job_description(&mut self, description: &str) {
        self.state.job_description = description.to_string();
        self.persist_later();
    }

    pub fn set_current_view(&mut self, view: EditorView) {
        self.state.current_view = view;
        self.persist_later();
    }

    /// An explicit user choice; also recorded on the document so it travels with it.
    pub fn set_visibility(&mut self, visibility: SectionVisibility) {
        self.state.set_visibility(visibility);
        self.state.resume_data.checkbox_states = Some(visibility);
        self.state.is_saved = false;
        self.state.sync_snapshot();
        self.persist_later();
    }

    pub fn set_section_order<S: AsRef<str>>(&mut self, order: &[S]) {
        let order = normalize_section_order(order);
        self.state.resume_data.section_order = order.clone();
        self.state.section_order = order;
        self.state.is_saved = false;
        self.state.sync_snapshot();
        self.persist_later();
    }

    pub fn mark_saved(&mut self) {
        self.state.is_saved = true;
        self.persist_later();
    }

    /// Remember the pre-optimization document as the comparison base.
    pub fn begin_optimization(&mut self) {
        self.state.base_resume = Some(self.state.resume_data.clone());
        self.state.is_optimizing = true;
        self.state.current_view = EditorView::Optimize;
        self.persist_later();
    }

    /// Record the optimizer's output and the fields it changed.
    pub fn apply_optimization(&mut self, optimized: ResumeDocument) -> FieldDiff {
        let base = self
            .state
            .base_resume
            .clone()
            .unwrap_or_else(|| self.state.resume_data.clone());

        let diff = match diff_documents(&base, &optimized) {
            Ok(diff) => diff,
            Err(e) => {
                warn!(error = %e, "could not diff optimized document");
                FieldDiff::default()
            }
        };

        self.state.is_optimizing = false;
        self.state.changed_fields = diff.changed_fields();
        self.state.show_changes = !diff.is_empty();
        self.state.optimized_data = Some(optimized);
        self.persist_later();
        diff
    }

    /// Adopt the optimized document as the active one.
    pub fn accept_optimization(&mut self) -> bool {
        let Some(optimized) = self.state.optimized_data.take() else {
            return false;
        };
        self.state.resume_data = optimized;
        self.state.resume_data.normalize();
        self.state.section_order = self.state.resume_data.section_order.clone();
        self.state.is_saved = false;
        self.state.current_view = EditorView::Edit;
        self.state.sync_snapshot();
        self.persist_later();
        true
    }

    pub fn discard_optimization(&mut self) {
        self.state.is_optimizing = false;
        self.state.optimized_data = None;
        self.state.show_changes = false;
        self.state.changed_fields.clear();
        self.state.current_view = EditorView::Edit;
        self.persist_later();
    }

    /// Perform the debounced write if its time has come.
    pub fn flush_due(&self, now: DateTime<Utc>) {
        if let Err(e) = self.adapter.flush_due(now) {
            warn!(key = %self.key, error = %e, "debounced write failed");
        }
    }

    /// Write any pending state now (e.g. on shutdown).
    pub fn flush(&self) {
        if let Err(e) = self.adapter.flush_all() {
            warn!(key = %self.key, error = %e, "flush failed");
        }
    }

    fn encode(&self) -> Option<Vec<u8>> {
        match serde_json::to_vec(&self.state) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!(key = %self.key, error = %e, "could not serialize document state");
                None
            }
        }
    }

    fn persist_later(&self) {
        if let Some(bytes) = self.encode() {
            self.adapter
                .schedule(&self.key, bytes, Utc::now() + self.debounce);
        }
    }

    fn persist_now(&self) {
        let Some(bytes) = self.encode() else {
            return;
        };
        match self.adapter.set(&self.key, &bytes) {
            Ok(WriteOutcome::Written) => {}
            Ok(outcome) => warn!(key = %self.key, ?outcome, "document state stored degraded"),
            Err(e) => warn!(key = %self.key, error = %e, "document state not persisted"),
        }
    }
}

fn load_state<B: StorageBackend>(adapter: &StorageAdapter<B>, key: &str) -> DocumentState {
    let bytes = match adapter.get(key) {
        Ok(Some(bytes)) => bytes,
        Ok(None) => return DocumentState::default(),
        Err(e) => {
            warn!(key, error = %e, "could not read document state, starting empty");
            return DocumentState::default();
        }
    };

    match serde_json::from_slice::<DocumentState>(&bytes) {
        Ok(mut state) => {
            // The store-level order is authoritative; keep the document in step.
            state.resume_data.section_order = state.section_order.clone();
            state
        }
        Err(e) => {
            warn!(key, error = %e, "corrupt document state, starting empty");
            DocumentState::default()
        }
    }
}

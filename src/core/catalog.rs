//! The context catalog feeding the mention menu and the badge row.
//!
//! Four fixed workspace items plus whatever the file-search collaborator
//! returned last. Search-as-you-type is debounced with generation tokens:
//! every keystroke supersedes the previous pending request, and a result is
//! applied only if it belongs to the latest generation — stale responses are
//! ignored on arrival, not cancelled at the transport level.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::api::{drive, ApiError, DriveFile};
use crate::core::composer::MentionItem;

pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextKind {
    Tab,
    Url,
    DriveFile,
}

#[derive(Debug, Clone)]
pub struct ContextItem {
    pub value: String,
    pub label: String,
    pub kind: ContextKind,
    pub mime_type: Option<String>,
    pub web_view_link: Option<String>,
    pub modified_time: Option<DateTime<Utc>>,
}

impl ContextItem {
    fn fixed(value: &str, label: &str, kind: ContextKind) -> Self {
        Self {
            value: value.to_string(),
            label: label.to_string(),
            kind,
            mime_type: None,
            web_view_link: None,
            modified_time: None,
        }
    }
}

impl From<DriveFile> for ContextItem {
    fn from(file: DriveFile) -> Self {
        let label = file.label().to_string();
        Self {
            value: file.id,
            label,
            kind: ContextKind::DriveFile,
            mime_type: file.mime_type,
            web_view_link: file.web_view_link,
            modified_time: file.modified_time,
        }
    }
}

/// The fixed workspace entries every session starts with.
pub fn builtin_items() -> Vec<ContextItem> {
    vec![
        ContextItem::fixed("tab-1", "Tab 1", ContextKind::Tab),
        ContextItem::fixed("tab-2", "Tab 2", ContextKind::Tab),
        ContextItem::fixed("tab-3", "Tab 3", ContextKind::Tab),
        ContextItem::fixed("url", "Add URL", ContextKind::Url),
    ]
}

/// A search the debounce timer has released, ready to dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DueSearch {
    pub generation: u64,
    pub query: Option<String>,
}

#[derive(Debug)]
struct PendingSearch {
    generation: u64,
    query: Option<String>,
    fire_at: Instant,
}

/// Seam to the file-search collaborator; the production implementation is
/// [`DriveSource`], tests substitute their own.
#[async_trait]
pub trait ContextSource: Send + Sync {
    async fn search(&self, query: Option<&str>) -> Result<Vec<DriveFile>, ApiError>;
}

pub struct DriveSource {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl DriveSource {
    pub fn new(client: reqwest::Client, access_token: String) -> Self {
        Self {
            client,
            base_url: drive::DRIVE_BASE_URL.to_string(),
            access_token,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl ContextSource for DriveSource {
    async fn search(&self, query: Option<&str>) -> Result<Vec<DriveFile>, ApiError> {
        drive::search_files(&self.client, &self.base_url, &self.access_token, query).await
    }
}

#[derive(Debug)]
pub struct ContextCatalog {
    builtin: Vec<ContextItem>,
    drive_items: Vec<ContextItem>,
    /// Values the user attached, in attach order.
    selected: Vec<String>,
    /// Subset of `selected` that arrived via mention commits; removed again
    /// when the mention disappears from the document.
    mention_added: Vec<String>,
    generation: u64,
    pending: Option<PendingSearch>,
}

impl Default for ContextCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextCatalog {
    pub fn new() -> Self {
        Self {
            builtin: builtin_items(),
            drive_items: Vec::new(),
            selected: Vec::new(),
            mention_added: Vec::new(),
            generation: 0,
            pending: None,
        }
    }

    pub fn items(&self) -> impl Iterator<Item = &ContextItem> {
        self.builtin.iter().chain(self.drive_items.iter())
    }

    pub fn find(&self, value: &str) -> Option<&ContextItem> {
        self.items().find(|item| item.value == value)
    }

    /// The catalog as the composer's menu consumes it.
    pub fn mention_items(&self) -> Vec<MentionItem> {
        self.items()
            .map(|item| MentionItem::new(item.value.clone(), item.label.clone()))
            .collect()
    }

    // ---- debounced search ----

    /// A keystroke in the trigger: supersede any pending search and start a
    /// fresh debounce window. Returns the new generation token.
    pub fn schedule_search(&mut self, query: Option<String>, now: Instant) -> u64 {
        self.generation += 1;
        self.pending = Some(PendingSearch {
            generation: self.generation,
            query,
            fire_at: now + SEARCH_DEBOUNCE,
        });
        self.generation
    }

    /// Take the pending search once its debounce delay has elapsed.
    pub fn due_search(&mut self, now: Instant) -> Option<DueSearch> {
        if self.pending.as_ref().is_some_and(|p| p.fire_at <= now) {
            let pending = self.pending.take()?;
            return Some(DueSearch {
                generation: pending.generation,
                query: pending.query,
            });
        }
        None
    }

    /// Apply a search result. Only the most recently issued generation
    /// wins; anything older is discarded.
    pub fn apply_search_results(&mut self, generation: u64, files: Vec<DriveFile>) -> bool {
        if generation != self.generation {
            return false;
        }
        self.drive_items = files.into_iter().map(ContextItem::from).collect();
        true
    }

    pub fn clear_drive_items(&mut self) {
        self.drive_items.clear();
    }

    // ---- selected context ----

    pub fn toggle(&mut self, value: &str) {
        if let Some(pos) = self.selected.iter().position(|v| v == value) {
            self.selected.remove(pos);
            self.mention_added.retain(|v| v != value);
        } else {
            self.selected.push(value.to_string());
        }
    }

    pub fn remove(&mut self, value: &str) {
        self.selected.retain(|v| v != value);
        self.mention_added.retain(|v| v != value);
    }

    pub fn is_selected(&self, value: &str) -> bool {
        self.selected.iter().any(|v| v == value)
    }

    pub fn selected_values(&self) -> &[String] {
        &self.selected
    }

    pub fn selected_labels(&self) -> Vec<String> {
        self.selected
            .iter()
            .map(|value| {
                self.find(value)
                    .map(|item| item.label.clone())
                    .unwrap_or_else(|| value.clone())
            })
            .collect()
    }

    /// A mention was committed: attach the referenced item if it is not
    /// already attached, and remember that the mention did it.
    pub fn note_mention_committed(&mut self, value: &str) {
        if !self.is_selected(value) {
            self.selected.push(value.to_string());
            self.mention_added.push(value.to_string());
        }
    }

    /// Reconcile with the document's current mention identifier set:
    /// attachments that only existed because of a mention are dropped when
    /// that mention is deleted. Explicitly toggled items stay.
    pub fn reconcile_mentions(&mut self, present_ids: &[String]) {
        let dropped: Vec<String> = self
            .mention_added
            .iter()
            .filter(|value| !present_ids.contains(value))
            .cloned()
            .collect();
        for value in dropped {
            self.remove(&value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drive_file(id: &str, name: &str) -> DriveFile {
        serde_json::from_str(&format!(r#"{{"id":"{id}","name":"{name}"}}"#)).expect("drive file")
    }

    #[test]
    fn builtin_items_are_always_present() {
        let catalog = ContextCatalog::new();
        let values: Vec<&str> = catalog.items().map(|i| i.value.as_str()).collect();
        assert_eq!(values, vec!["tab-1", "tab-2", "tab-3", "url"]);
    }

    #[test]
    fn drive_results_append_after_builtins() {
        let mut catalog = ContextCatalog::new();
        let generation = catalog.schedule_search(Some("rep".into()), Instant::now());
        assert!(catalog.apply_search_results(generation, vec![drive_file("f1", "Report")]));

        let labels: Vec<&str> = catalog.items().map(|i| i.label.as_str()).collect();
        assert_eq!(labels, vec!["Tab 1", "Tab 2", "Tab 3", "Add URL", "Report"]);
        assert_eq!(catalog.find("f1").map(|i| i.kind), Some(ContextKind::DriveFile));
    }

    #[test]
    fn search_fires_only_after_debounce_delay() {
        let mut catalog = ContextCatalog::new();
        let start = Instant::now();
        catalog.schedule_search(Some("a".into()), start);

        assert_eq!(catalog.due_search(start), None);
        assert_eq!(
            catalog.due_search(start + Duration::from_millis(100)),
            None
        );
        let due = catalog
            .due_search(start + SEARCH_DEBOUNCE)
            .expect("due after delay");
        assert_eq!(due.query.as_deref(), Some("a"));
        // consumed
        assert_eq!(catalog.due_search(start + SEARCH_DEBOUNCE), None);
    }

    #[test]
    fn new_keystroke_supersedes_pending_search() {
        let mut catalog = ContextCatalog::new();
        let start = Instant::now();
        catalog.schedule_search(Some("a".into()), start);
        catalog.schedule_search(Some("ab".into()), start + Duration::from_millis(150));

        // the first window elapsing yields nothing; only the second query
        // ever fires
        assert_eq!(catalog.due_search(start + SEARCH_DEBOUNCE), None);
        let due = catalog
            .due_search(start + Duration::from_millis(150) + SEARCH_DEBOUNCE)
            .expect("second search due");
        assert_eq!(due.query.as_deref(), Some("ab"));
    }

    #[test]
    fn stale_generation_results_are_discarded() {
        let mut catalog = ContextCatalog::new();
        let now = Instant::now();
        let first = catalog.schedule_search(Some("a".into()), now);
        let second = catalog.schedule_search(Some("ab".into()), now);

        assert!(!catalog.apply_search_results(first, vec![drive_file("old", "Old")]));
        assert!(catalog.find("old").is_none());

        assert!(catalog.apply_search_results(second, vec![drive_file("new", "New")]));
        assert!(catalog.find("new").is_some());
    }

    #[test]
    fn toggle_attaches_and_detaches() {
        let mut catalog = ContextCatalog::new();
        catalog.toggle("tab-1");
        assert!(catalog.is_selected("tab-1"));
        catalog.toggle("tab-1");
        assert!(!catalog.is_selected("tab-1"));
    }

    #[test]
    fn mention_commit_attaches_once_and_reconciles_away() {
        let mut catalog = ContextCatalog::new();
        let generation = catalog.schedule_search(None, Instant::now());
        catalog.apply_search_results(generation, vec![drive_file("f1", "Report")]);

        catalog.note_mention_committed("f1");
        catalog.note_mention_committed("f1");
        assert_eq!(catalog.selected_values(), &["f1".to_string()]);

        // the mention disappears from the document
        catalog.reconcile_mentions(&[]);
        assert!(catalog.selected_values().is_empty());
    }

    #[test]
    fn reconcile_keeps_explicitly_toggled_items() {
        let mut catalog = ContextCatalog::new();
        catalog.toggle("tab-2");
        catalog.note_mention_committed("tab-1");
        catalog.reconcile_mentions(&[]);
        assert!(catalog.is_selected("tab-2"));
        assert!(!catalog.is_selected("tab-1"));
    }

    #[test]
    fn selected_labels_resolve_through_the_catalog() {
        let mut catalog = ContextCatalog::new();
        catalog.toggle("tab-1");
        catalog.toggle("gone");
        assert_eq!(
            catalog.selected_labels(),
            vec!["Tab 1".to_string(), "gone".to_string()]
        );
    }
}

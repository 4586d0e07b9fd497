//! The mention candidate menu.
//!
//! Derived state only: the list is recomputed from catalog × query on every
//! trigger change and the highlight resets to the top. Arrow keys clamp at
//! the ends rather than wrapping.

pub const MAX_CANDIDATES: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MentionItem {
    pub value: String,
    pub label: String,
    pub icon: Option<String>,
}

impl MentionItem {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
            icon: None,
        }
    }
}

#[derive(Debug, Default)]
pub struct MentionMenu {
    query: Option<String>,
    items: Vec<MentionItem>,
    selected: usize,
}

impl MentionMenu {
    /// Recompute candidates for the current trigger state. `None` means no
    /// live trigger: the menu disappears entirely.
    pub fn refresh(&mut self, query: Option<&str>, catalog: &[MentionItem]) {
        self.query = query.map(str::to_string);
        self.items = match query {
            None => Vec::new(),
            Some(q) => {
                let needle = q.to_lowercase();
                catalog
                    .iter()
                    .filter(|item| item.label.to_lowercase().contains(&needle))
                    .take(MAX_CANDIDATES)
                    .cloned()
                    .collect()
            }
        };
        self.selected = 0;
    }

    /// A trigger is live; the popup renders (possibly in its empty state).
    pub fn is_active(&self) -> bool {
        self.query.is_some()
    }

    /// The menu owns the keyboard: a live trigger with at least one
    /// candidate. The submission gate reads this before letting Enter
    /// through.
    pub fn is_open(&self) -> bool {
        self.query.is_some() && !self.items.is_empty()
    }

    pub fn move_down(&mut self) {
        if !self.items.is_empty() {
            self.selected = (self.selected + 1).min(self.items.len() - 1);
        }
    }

    pub fn move_up(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    /// Pointer hover: clamp into range.
    pub fn set_selected(&mut self, index: usize) {
        if !self.items.is_empty() {
            self.selected = index.min(self.items.len() - 1);
        }
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn selected_item(&self) -> Option<&MentionItem> {
        self.items.get(self.selected)
    }

    pub fn items(&self) -> &[MentionItem] {
        &self.items
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn close(&mut self) {
        self.query = None;
        self.items.clear();
        self.selected = 0;
    }
}

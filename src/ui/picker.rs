//! Modal pickers for the model and task selectors.

use crate::core::app::TaskMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickerKind {
    Model,
    Task,
}

#[derive(Debug, Clone)]
pub struct PickerItem {
    pub id: String,
    pub label: String,
    pub detail: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PickerState {
    pub kind: PickerKind,
    pub title: String,
    pub items: Vec<PickerItem>,
    pub selected: usize,
}

/// The model catalog offered by the picker: identifier, display label,
/// provider.
pub const MODELS: [(&str, &str, &str); 3] = [
    ("claude-sonnet-4-20250514", "Claude 4 Sonnet", "Anthropic"),
    ("gpt-4.1", "GPT-4.1", "OpenAI"),
    ("gemini-2.5-pro", "Gemini 2.5 Pro", "Google"),
];

impl PickerState {
    pub fn new<T: Into<String>>(kind: PickerKind, title: T, items: Vec<PickerItem>) -> Self {
        Self {
            kind,
            title: title.into(),
            items,
            selected: 0,
        }
    }

    pub fn for_models(current: &str) -> Self {
        let items = MODELS
            .iter()
            .map(|(id, label, provider)| PickerItem {
                id: id.to_string(),
                label: label.to_string(),
                detail: Some(provider.to_string()),
            })
            .collect();
        let mut picker = Self::new(PickerKind::Model, "Select model", items);
        picker.select_id(current);
        picker
    }

    pub fn for_tasks(current: TaskMode) -> Self {
        let items = TaskMode::ALL
            .iter()
            .map(|task| PickerItem {
                id: task.as_str().to_string(),
                label: task.label().to_string(),
                detail: None,
            })
            .collect();
        let mut picker = Self::new(PickerKind::Task, "Select task", items);
        picker.select_id(current.as_str());
        picker
    }

    fn select_id(&mut self, id: &str) {
        if let Some(pos) = self.items.iter().position(|item| item.id == id) {
            self.selected = pos;
        }
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.items.get(self.selected).map(|item| item.id.as_str())
    }

    // Pickers wrap around; the mention menu clamps instead.
    pub fn move_up(&mut self) {
        if !self.items.is_empty() {
            if self.selected == 0 {
                self.selected = self.items.len() - 1;
            } else {
                self.selected -= 1;
            }
        }
    }

    pub fn move_down(&mut self) {
        if !self.items.is_empty() {
            self.selected = (self.selected + 1) % self.items.len();
        }
    }
}

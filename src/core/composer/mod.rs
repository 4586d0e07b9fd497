//! The mention-aware message composer.
//!
//! A small document model sits under the input box: paragraphs of inline
//! nodes, where a node is either a plain text run or an atomic mention token
//! referencing an external file. [`trigger`] recognizes a live `@`-prefixed
//! run before the caret, [`menu`] turns it into a candidate list, and
//! [`document`] owns editing, token commits, and the dual (visible vs.
//! processed) serialization used when a message is sent.

pub mod document;
pub mod menu;
pub mod trigger;

pub use document::{Document, InlineNode};
pub use menu::{MentionItem, MentionMenu};
pub use trigger::{find_trigger, TriggerMatch};

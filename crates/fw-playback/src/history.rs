//! The append-only playthrough history log.
//!
//! The log only grows during forward traversal and is cleared exactly on a
//! restart to the story's start node.

use serde::{Deserialize, Serialize};

use fw_core::NodeId;

/// One entry in a playthrough's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HistoryEntry {
    /// The narrative text of a node the player passed through.
    Narrative {
        /// Joined segment text.
        text: String,
        /// The node the text came from.
        node: NodeId,
    },
    /// A choice the player selected.
    Choice {
        /// The choice text as shown.
        text: String,
    },
}

/// An ordered log of what the player read and chose.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryLog {
    entries: Vec<HistoryEntry>,
}

impl HistoryLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry.
    pub fn append(&mut self, entry: HistoryEntry) {
        self.entries.push(entry);
    }

    /// All entries, oldest first.
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Clear the log. Called exactly on restart-to-start.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Export the log as markdown.
    pub fn export_markdown(&self) -> String {
        let mut out = String::from("# Playthrough\n\n");
        for entry in &self.entries {
            match entry {
                HistoryEntry::Narrative { text, .. } => {
                    out.push_str(text);
                    out.push_str("\n\n");
                }
                HistoryEntry::Choice { text } => {
                    out.push_str(&format!("> **{text}**\n\n"));
                }
            }
        }
        out
    }

    /// Export the log as plain text.
    pub fn export_text(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            match entry {
                HistoryEntry::Narrative { text, .. } => {
                    out.push_str(text);
                    out.push('\n');
                }
                HistoryEntry::Choice { text } => {
                    out.push_str(&format!("  -> {text}\n"));
                }
            }
        }
        out
    }
}

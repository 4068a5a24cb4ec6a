//! Project data structure for grouping tasks.
//!
//! Projects nest through an optional `parent_id`, forming a forest. The store
//! keeps that forest acyclic; see [`crate::tree`] for the derived hierarchy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Colour given to projects created without one.
pub const DEFAULT_COLOR: &str = "#6366f1";

/// Suggested project colours, in picker order.
pub const PALETTE: [&str; 8] = [
    "#6366f1", "#8b5cf6", "#ec4899", "#ef4444", "#f59e0b", "#10b981", "#06b6d4", "#84cc16",
];

/// A named grouping of tasks, optionally nested under a parent project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "optional_text")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "optional_text")]
    pub parent_id: Option<String>,
    #[serde(default = "default_color")]
    pub color: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Fields supplied when creating a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectDraft {
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<String>,
    pub color: String,
}

impl ProjectDraft {
    pub fn new(name: impl Into<String>) -> Self {
        ProjectDraft {
            name: name.into(),
            description: None,
            parent_id: None,
            color: DEFAULT_COLOR.to_string(),
        }
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }
}

impl Default for ProjectDraft {
    fn default() -> Self {
        ProjectDraft::new(String::new())
    }
}

/// Partial update for a project; same conventions as [`crate::task::TaskPatch`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectPatch {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub parent_id: Option<Option<String>>,
    pub color: Option<String>,
}

/// Check for a `#rrggbb` colour string.
pub fn is_valid_color(color: &str) -> bool {
    color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit())
}

/// Normalise free text: trimmed, and `None` when nothing is left.
pub fn non_blank(text: Option<String>) -> Option<String> {
    text.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn default_color() -> String {
    DEFAULT_COLOR.to_string()
}

fn optional_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(non_blank(raw))
}

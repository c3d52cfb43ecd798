//! Template categories and the store contract.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Template category. Each category is an independent ordered list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Generic,
    Affection,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Generic => "generic",
            Self::Affection => "affection",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored message template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub id: i64,
    pub text: String,
}

impl Template {
    pub fn new(id: i64, text: impl Into<String>) -> Self {
        Self { id, text: text.into() }
    }
}

/// Persistence contract for templates.
///
/// `list` returns templates in creation order. `remove` is idempotent and
/// reports whether anything was deleted.
#[async_trait]
pub trait TemplateStore: Send + Sync {
    async fn add(&self, category: Category, text: &str) -> anyhow::Result<i64>;

    async fn list(&self, category: Category) -> anyhow::Result<Vec<Template>>;

    async fn remove(&self, category: Category, id: i64) -> anyhow::Result<bool>;
}

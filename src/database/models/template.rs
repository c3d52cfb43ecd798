//! Message template document.

use serde::{Deserialize, Serialize};

use crate::modes::{Category, Template};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TemplateDoc {
    /// Sequence id, unique across categories.
    pub id: i64,
    pub category: Category,
    pub text: String,
    /// Unix timestamp of creation.
    pub created_at: i64,
}

impl TemplateDoc {
    pub fn new(id: i64, category: Category, text: &str) -> Self {
        Self {
            id,
            category,
            text: text.to_string(),
            created_at: chrono::Utc::now().timestamp(),
        }
    }
}

impl From<TemplateDoc> for Template {
    fn from(doc: TemplateDoc) -> Self {
        Template::new(doc.id, doc.text)
    }
}

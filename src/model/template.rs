use serde::{Deserialize, Serialize};

/// Input widget kind of a template field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    TextArea,
    Select,
    Date,
    Tags,
}

impl FieldKind {
    /// Map the kind token printed by the store. Unknown kinds fall back to text.
    pub fn from_token(token: &str) -> FieldKind {
        match token.trim().to_lowercase().as_str() {
            "textarea" => FieldKind::TextArea,
            "select" | "secim" | "seçim" => FieldKind::Select,
            "date" | "tarih" => FieldKind::Date,
            "tags" | "etiketler" => FieldKind::Tags,
            _ => FieldKind::Text,
        }
    }
}

/// A single field of a task template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    pub required: bool,
    #[serde(default)]
    pub default: Option<String>,
    /// Choices for `Select` fields
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

/// A task template offered by the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub default_title_pattern: String,
    pub fields: Vec<FieldSpec>,
}

impl Template {
    pub fn required_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|f| f.required)
    }
}

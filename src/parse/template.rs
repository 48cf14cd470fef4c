use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::model::template::{FieldKind, FieldSpec, Template};
use crate::parse::line::{self, LineKind};

/// `` `name` (kind) rest `` inside the `**Alanlar:**` block
static FIELD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^`([^`]+)`\s*\(([^)]+)\)(.*)$").unwrap());

/// Parse a template listing: `###` category headings, `####` template
/// headings with bold label lines, and an indented field list.
pub fn parse_templates(text: &str) -> Vec<Template> {
    let mut templates = Vec::new();
    let mut category = String::new();
    let mut current: Option<Template> = None;
    let mut in_fields = false;

    for line in line::tokenize(text) {
        match line.kind {
            LineKind::Blank => in_fields = false,
            LineKind::Heading { level, text } if level <= 3 => {
                push(current.take(), &mut templates);
                category = text.to_string();
                in_fields = false;
            }
            LineKind::Heading { text, .. } => {
                push(current.take(), &mut templates);
                current = Some(Template {
                    id: String::new(),
                    name: text.to_string(),
                    category: category.clone(),
                    description: String::new(),
                    default_title_pattern: String::new(),
                    fields: Vec::new(),
                });
                in_fields = false;
            }
            LineKind::Bullet(item) if in_fields => {
                if let Some(template) = current.as_mut()
                    && let Some(field) = parse_field(item)
                {
                    template.fields.push(field);
                }
            }
            LineKind::Label { key, value } => {
                let Some(template) = current.as_mut() else {
                    continue;
                };
                match key.to_lowercase().as_str() {
                    "id" => template.id = line::unquote(value).to_string(),
                    "açıklama" => template.description = value.to_string(),
                    "başlık şablonu" => {
                        template.default_title_pattern = line::unquote(value).to_string()
                    }
                    "alanlar" => in_fields = true,
                    _ => {}
                }
            }
            _ => {}
        }
    }
    push(current.take(), &mut templates);
    templates
}

fn push(template: Option<Template>, templates: &mut Vec<Template>) {
    match template {
        Some(t) if !t.id.is_empty() => templates.push(t),
        Some(t) => debug!(name = %t.name, "dropping template without ID"),
        None => {}
    }
}

/// `` `priority` (select) *(zorunlu)* - varsayılan: orta - seçenekler: a, b ``
fn parse_field(item: &str) -> Option<FieldSpec> {
    let caps = FIELD.captures(item.trim())?;
    let rest = caps.get(3).map_or("", |m| m.as_str());

    let mut field = FieldSpec {
        name: caps[1].trim().to_string(),
        kind: FieldKind::from_token(&caps[2]),
        required: rest.contains("(zorunlu)"),
        default: None,
        options: Vec::new(),
    };

    for part in rest.split(" - ") {
        let part = part.trim();
        if let Some(default) = part.strip_prefix("varsayılan:") {
            let default = default.trim();
            field.default = (!default.is_empty()).then(|| default.to_string());
        } else if let Some(options) = part.strip_prefix("seçenekler:") {
            field.options = line::split_csv(options).collect();
        }
    }
    Some(field)
}

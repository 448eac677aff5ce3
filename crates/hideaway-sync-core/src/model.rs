use crate::normalize::Rejection;
use hideaway_config::MessageTypeCodes;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Message,
    System,
    Secret,
}

impl Category {
    pub fn classify(type_code: Option<i64>, codes: &MessageTypeCodes) -> Self {
        match type_code {
            Some(code) if code == codes.system => Self::System,
            Some(code) if code == codes.secret => Self::Secret,
            _ => Self::Message,
        }
    }

    pub fn file_tag(self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::System => "system",
            Self::Secret => "secret",
        }
    }

    /// Frontmatter `type:` value. Plain messages carry no label.
    pub fn label(self) -> Option<&'static str> {
        match self {
            Self::Message => None,
            Self::System => Some("system"),
            Self::Secret => Some("secret"),
        }
    }
}

fn scalar_text(value: Option<&Value>) -> Option<String> {
    let text = match value? {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// One Baserow row fetched with `user_field_names=true`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Map<String, Value>,
}

impl Record {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self::new(fields)),
            _ => None,
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn id(&self) -> Option<String> {
        let id = scalar_text(self.get("ID"))?;
        let id = id.trim();
        (!id.is_empty()).then(|| id.to_string())
    }

    /// Raw string content of a text field, untouched. Empty counts as absent.
    pub fn text(&self, field: &str) -> Option<&str> {
        self.get(field)
            .and_then(Value::as_str)
            .filter(|value| !value.is_empty())
    }

    /// Short scalar field (button labels, dates) as text, whitespace kept.
    pub fn scalar(&self, field: &str) -> Option<String> {
        scalar_text(self.get(field))
    }

    fn first_element(&self, field: &str) -> Option<&Map<String, Value>> {
        self.get(field)?.as_array()?.first()?.as_object()
    }

    /// `value` of the first entry of a link-row or lookup field.
    pub fn first_value(&self, field: &str) -> Option<String> {
        scalar_text(self.first_element(field)?.get("value"))
    }

    /// `url` of the first entry of a file field.
    pub fn first_url(&self, field: &str) -> Option<String> {
        scalar_text(self.first_element(field)?.get("url"))
    }

    /// `msgType.id`, accepting either a single-select object or a bare code.
    pub fn type_code(&self) -> Option<i64> {
        let raw = match self.get("msgType")? {
            Value::Object(select) => select.get("id")?,
            other => other,
        };
        match raw {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        }
    }

    /// First non-empty name across `fields`, in priority order.
    pub fn display_name(&self, fields: &[String]) -> Option<String> {
        fields.iter().find_map(|field| self.first_value(field))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: String,
    pub category: Category,
    pub content: String,
}

impl Document {
    pub fn file_name(&self) -> String {
        format!("{:0>5}-{}.md", self.id, self.category.file_tag())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRecord {
    pub id: Option<String>,
    pub reason: Rejection,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedWrite {
    pub file_name: String,
    pub error: String,
}

/// Manifest of a completed run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub fetched: usize,
    pub deleted: usize,
    pub written: Vec<String>,
    pub skipped: Vec<SkippedRecord>,
    pub failed: Vec<FailedWrite>,
}

impl RunReport {
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty() && self.failed.is_empty()
    }
}

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A display field value. Backends are inconsistent about numeric fields (age arrives as
/// either `34` or `"34"`), so both forms are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
}

impl FieldValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            FieldValue::Text(s) => s.trim().parse::<f64>().ok(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            FieldValue::Number(n) => write!(f, "{n}"),
            FieldValue::Text(s) => f.write_str(s),
        }
    }
}

/// One backend record visualized as an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub name: String,
    pub email: String,
    pub age: FieldValue,
    #[serde(flatten)]
    pub extra: BTreeMap<String, FieldValue>,
}

impl EntityRecord {
    pub fn new(name: impl Into<String>, email: impl Into<String>, age: u32) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            age: FieldValue::Number(age as f64),
            extra: BTreeMap::new(),
        }
    }

    /// Text shown on the entity's label overlay, one field per line.
    pub fn label_text(&self) -> String {
        let mut text = format!("{}\n{}\n{}", self.name, self.email, self.age);
        for (key, value) in &self.extra {
            text.push_str(&format!("\n{key}: {value}"));
        }
        text
    }
}

/// The backend answers the batch endpoint with a list and the single endpoint with one
/// object; either shape parses into a list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum RecordPayload {
    Many(Vec<EntityRecord>),
    One(EntityRecord),
}

impl RecordPayload {
    pub(crate) fn into_records(self) -> Vec<EntityRecord> {
        match self {
            RecordPayload::Many(records) => records,
            RecordPayload::One(record) => vec![record],
        }
    }
}

use super::record::{parse_timestamp_millis, FieldValue, Record};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "asc" => Some(SortDirection::Asc),
            "desc" => Some(SortDirection::Desc),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKind {
    Text,
    Number,
    Date,
    /// `true` ranks above `false`, so descending lists true first.
    Flag,
    /// Length of a list field.
    Count,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SortKey {
    pub key: &'static str,
    pub label: &'static str,
    pub field: &'static str,
    pub kind: SortKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortSpec {
    pub field: String,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn asc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            direction: SortDirection::Asc,
        }
    }
}

/// Collation close to a locale compare: case-folded first, raw text breaks ties.
pub fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

fn text_of(r: &Record, field: &str) -> String {
    match field {
        "id" => r.id.clone(),
        _ => match r.get(field) {
            Some(FieldValue::Text(s)) => s.clone(),
            Some(FieldValue::Number(n)) => n.to_string(),
            Some(FieldValue::Bool(b)) => b.to_string(),
            _ => String::new(),
        },
    }
}

fn number_of(r: &Record, field: &str) -> f64 {
    r.number(field).unwrap_or(0.0)
}

fn millis_of(r: &Record, field: &str) -> i64 {
    r.text(field).and_then(parse_timestamp_millis).unwrap_or(0)
}

fn flag_of(r: &Record, field: &str) -> bool {
    match r.get(field) {
        Some(FieldValue::Bool(b)) => *b,
        Some(FieldValue::Text(s)) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "yes" | "1"),
        Some(FieldValue::Number(n)) => *n != 0.0,
        _ => false,
    }
}

fn compare_by(kind: SortKind, field: &str, a: &Record, b: &Record) -> Ordering {
    match kind {
        SortKind::Text => compare_text(&text_of(a, field), &text_of(b, field)),
        SortKind::Number => number_of(a, field).total_cmp(&number_of(b, field)),
        SortKind::Date => millis_of(a, field).cmp(&millis_of(b, field)),
        SortKind::Flag => flag_of(a, field).cmp(&flag_of(b, field)),
        SortKind::Count => a.list_len(field).cmp(&b.list_len(field)),
    }
}

/// Stable sort by one of the declared keys. An unknown key leaves the order untouched.
pub fn sort_records(records: &mut [&Record], keys: &[SortKey], spec: &SortSpec) {
    let Some(key) = keys.iter().find(|k| k.key == spec.field) else {
        return;
    };
    records.sort_by(|a, b| {
        let ord = compare_by(key.kind, key.field, a, b);
        match spec.direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    });
}

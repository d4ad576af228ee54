use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Scalar or nested value held by a record field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<FieldValue>),
    Object(BTreeMap<String, FieldValue>),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Finite numbers only; "NaN" and "inf" text is not a number here.
    pub fn as_number(&self) -> Option<f64> {
        let n = match self {
            FieldValue::Number(n) => Some(*n),
            FieldValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            FieldValue::Text(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        n.filter(|v| v.is_finite())
    }

    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Null => true,
            FieldValue::Text(s) => s.trim().is_empty(),
            FieldValue::List(v) => v.is_empty(),
            FieldValue::Object(m) => m.is_empty(),
            _ => false,
        }
    }

    /// Lower-cased comparable key used for facet matching.
    pub fn facet_key(&self) -> Option<String> {
        match self {
            FieldValue::Null => None,
            FieldValue::Bool(b) => Some(if *b { "yes".into() } else { "no".into() }),
            FieldValue::Number(n) => Some(format_number(*n)),
            FieldValue::Text(s) => {
                let t = s.trim();
                if t.is_empty() {
                    None
                } else {
                    Some(t.to_lowercase())
                }
            }
            FieldValue::List(_) | FieldValue::Object(_) => None,
        }
    }
}

pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// Parses the date shapes the backend hands out: plain days, RFC 3339, or
/// `YYYY-MM-DD HH:MM:SS`. Returns milliseconds since the epoch.
pub fn parse_timestamp_millis(raw: &str) -> Option<i64> {
    let t = raw.trim();
    if t.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(t) {
        return Some(dt.timestamp_millis());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(t, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.and_utc().timestamp_millis());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(t, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt.and_utc().timestamp_millis());
    }
    parse_day(t).and_then(|d| d.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc().timestamp_millis()))
}

/// Day part of a date field, ignoring any time component.
pub fn parse_day(raw: &str) -> Option<NaiveDate> {
    let t = raw.trim();
    let day = t.get(..10).unwrap_or(t);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    #[serde(flatten)]
    pub fields: BTreeMap<String, FieldValue>,
}

impl Record {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with(mut self, field: &str, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(field.to_string(), value.into());
        self
    }

    /// Field lookup. `id` resolves to the record id; dotted paths walk nested objects.
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        let mut parts = field.split('.');
        let first = parts.next()?;
        let mut cur = self.fields.get(first)?;
        for part in parts {
            match cur {
                FieldValue::Object(m) => cur = m.get(part)?,
                _ => return None,
            }
        }
        Some(cur)
    }

    pub fn text(&self, field: &str) -> Option<&str> {
        if field == "id" {
            return Some(self.id.as_str());
        }
        self.get(field).and_then(|v| v.as_text())
    }

    pub fn number(&self, field: &str) -> Option<f64> {
        self.get(field).and_then(|v| v.as_number())
    }

    pub fn list_len(&self, field: &str) -> usize {
        match self.get(field) {
            Some(FieldValue::List(v)) => v.len(),
            _ => 0,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    pub fn from_json(id: &str, payload: &serde_json::Value) -> Result<Self, serde_json::Error> {
        let mut fields: BTreeMap<String, FieldValue> = serde_json::from_value(payload.clone())?;
        fields.remove("id");
        Ok(Self {
            id: id.to_string(),
            fields,
        })
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Number(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Number(v as f64)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<Vec<FieldValue>> for FieldValue {
    fn from(v: Vec<FieldValue>) -> Self {
        FieldValue::List(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_json_keeps_id_out_of_fields() {
        let payload = serde_json::json!({
            "id": "ignored",
            "name": "Physics",
            "faculty_count": 4,
            "programs_offered": ["BSc"],
            "metadata": { "hod": "Dr. Rao" }
        });
        let r = Record::from_json("d1", &payload).expect("record");
        assert_eq!(r.id, "d1");
        assert_eq!(r.text("name"), Some("Physics"));
        assert_eq!(r.number("faculty_count"), Some(4.0));
        assert_eq!(r.list_len("programs_offered"), 1);
        assert_eq!(r.text("metadata.hod"), Some("Dr. Rao"));
        assert!(r.get("id").is_none());
        assert_eq!(r.to_json()["id"], "d1");
    }

    #[test]
    fn timestamps_accept_day_and_rfc3339() {
        let day = parse_timestamp_millis("2025-06-10").expect("day");
        let full = parse_timestamp_millis("2025-06-10T00:00:00Z").expect("rfc3339");
        assert_eq!(day, full);
        assert!(parse_timestamp_millis("not a date").is_none());
        assert_eq!(
            parse_day("2025-06-10T08:30:00Z"),
            NaiveDate::from_ymd_opt(2025, 6, 10)
        );
    }
}

use super::record::{format_number, FieldValue, Record};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Inclusive numeric bucket. A missing bound is open.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bucket {
    pub value: &'static str,
    pub label: &'static str,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl Bucket {
    pub const fn new(value: &'static str, label: &'static str, min: Option<f64>, max: Option<f64>) -> Self {
        Self {
            value,
            label,
            min,
            max,
        }
    }

    pub fn contains(&self, v: f64) -> bool {
        self.min.map(|m| v >= m).unwrap_or(true) && self.max.map(|m| v <= m).unwrap_or(true)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FacetRule {
    /// Distinct values of a field; missing values fall back to `fallback`.
    Values {
        field: &'static str,
        fallback: Option<&'static str>,
    },
    /// Two options, `yes` and `no`, depending on whether the field holds something.
    Presence {
        field: &'static str,
        absent: &'static [&'static str],
        yes_label: &'static str,
        no_label: &'static str,
    },
    Buckets {
        field: &'static str,
        buckets: &'static [Bucket],
    },
    Range {
        field: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FacetDef {
    pub key: &'static str,
    pub label: &'static str,
    pub rule: FacetRule,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NumericRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl NumericRange {
    pub fn is_open(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    pub fn contains(&self, v: f64) -> bool {
        self.min.map(|m| v >= m).unwrap_or(true) && self.max.map(|m| v <= m).unwrap_or(true)
    }
}

/// Selected options per category plus numeric ranges.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterState {
    #[serde(default)]
    pub selected: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub ranges: BTreeMap<String, NumericRange>,
}

impl FilterState {
    pub fn selected_for(&self, key: &str) -> &[String] {
        self.selected.get(key).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn active_count(&self) -> usize {
        self.selected.values().map(|v| v.len()).sum::<usize>()
            + self.ranges.values().filter(|r| !r.is_open()).count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FacetOption {
    pub value: String,
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FacetOptions {
    pub key: String,
    pub label: String,
    pub kind: &'static str,
    pub options: Vec<FacetOption>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounds: Option<NumericRange>,
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Case-insensitive substring test over the search fields. A blank query passes everything.
pub fn matches_search(record: &Record, fields: &[&str], query: &str) -> bool {
    if query.trim().is_empty() {
        return true;
    }
    let q = query.to_lowercase();
    fields.iter().any(|f| {
        if *f == "id" {
            return record.id.to_lowercase().contains(&q);
        }
        match record.get(f) {
            Some(FieldValue::Text(s)) => s.to_lowercase().contains(&q),
            Some(FieldValue::Number(n)) => format_number(*n).contains(&q),
            Some(FieldValue::List(items)) => items
                .iter()
                .filter_map(|v| v.as_text())
                .any(|s| s.to_lowercase().contains(&q)),
            _ => false,
        }
    })
}

/// Display spelling of a value as stored, before case folding.
fn raw_label(v: &FieldValue) -> Option<String> {
    match v {
        FieldValue::Text(s) => Some(s.trim().to_string()),
        other => other.facet_key(),
    }
}

/// `(key, label)` pairs: the folded matching key and the raw spelling.
fn value_entries(record: &Record, field: &str, fallback: Option<&str>) -> Vec<(String, String)> {
    let entry = |v: &FieldValue| Some((v.facet_key()?, raw_label(v)?));
    let fallback_entry = || {
        fallback
            .map(|f| vec![(f.to_lowercase(), f.to_string())])
            .unwrap_or_default()
    };
    match record.get(field) {
        Some(FieldValue::List(items)) => items.iter().filter_map(entry).collect(),
        Some(v) => match entry(v) {
            Some(e) => vec![e],
            None => fallback_entry(),
        },
        None => fallback_entry(),
    }
}

fn value_keys(record: &Record, field: &str, fallback: Option<&str>) -> Vec<String> {
    value_entries(record, field, fallback)
        .into_iter()
        .map(|(k, _)| k)
        .collect()
}

fn is_present(record: &Record, field: &str, absent: &[&str]) -> bool {
    match record.get(field) {
        None | Some(FieldValue::Null) => false,
        Some(FieldValue::Bool(b)) => *b,
        Some(FieldValue::Number(n)) => *n != 0.0,
        Some(FieldValue::Text(s)) => {
            let t = s.trim();
            !t.is_empty() && !absent.iter().any(|a| a.eq_ignore_ascii_case(t))
        }
        Some(FieldValue::List(v)) => !v.is_empty(),
        Some(FieldValue::Object(m)) => !m.is_empty(),
    }
}

fn numeric(record: &Record, field: &str) -> f64 {
    match record.get(field) {
        Some(FieldValue::List(v)) => v.len() as f64,
        Some(v) => v.as_number().unwrap_or(0.0),
        None => 0.0,
    }
}

/// Whether a record passes one category. Empty selection means the category is unset.
pub fn passes_facet(record: &Record, facet: &FacetDef, filters: &FilterState) -> bool {
    if let FacetRule::Range { field } = facet.rule {
        return match filters.ranges.get(facet.key) {
            Some(range) if !range.is_open() => match record.get(field).and_then(|v| v.as_number()) {
                Some(v) => range.contains(v),
                None => false,
            },
            _ => true,
        };
    }

    let selected = filters.selected_for(facet.key);
    if selected.is_empty() {
        return true;
    }
    match &facet.rule {
        FacetRule::Values { field, fallback } => {
            let keys = value_keys(record, field, *fallback);
            keys.iter()
                .any(|k| selected.iter().any(|s| s.eq_ignore_ascii_case(k)))
        }
        FacetRule::Presence { field, absent, .. } => {
            let present = is_present(record, field, absent);
            (present && selected.iter().any(|s| s == "yes"))
                || (!present && selected.iter().any(|s| s == "no"))
        }
        FacetRule::Buckets { field, buckets } => {
            let v = numeric(record, field);
            buckets
                .iter()
                .filter(|b| selected.iter().any(|s| s == b.value))
                .any(|b| b.contains(v))
        }
        FacetRule::Range { .. } => true,
    }
}

/// AND across categories, OR within a category.
pub fn passes(record: &Record, facets: &[FacetDef], filters: &FilterState) -> bool {
    facets.iter().all(|f| passes_facet(record, f, filters))
}

/// Search, then category filters. Source order is preserved.
pub fn apply<'a>(
    records: &'a [Record],
    search_fields: &[&str],
    query: &str,
    facets: &[FacetDef],
    filters: &FilterState,
) -> Vec<&'a Record> {
    records
        .iter()
        .filter(|r| matches_search(r, search_fields, query))
        .filter(|r| passes(r, facets, filters))
        .collect()
}

/// Option counts over the full collection, never the filtered subset.
pub fn facet_options(records: &[Record], facet: &FacetDef) -> FacetOptions {
    let (kind, options, bounds) = match &facet.rule {
        FacetRule::Values { field, fallback } => {
            // First spelling seen labels the option.
            let mut counts: BTreeMap<String, (String, usize)> = BTreeMap::new();
            for r in records {
                for (k, raw) in value_entries(r, field, *fallback) {
                    counts.entry(k).or_insert((raw, 0)).1 += 1;
                }
            }
            let options = counts
                .into_iter()
                .map(|(value, (raw, count))| FacetOption {
                    label: capitalize(&raw),
                    value,
                    count,
                })
                .collect();
            ("values", options, None)
        }
        FacetRule::Presence {
            field,
            absent,
            yes_label,
            no_label,
        } => {
            let yes = records.iter().filter(|r| is_present(r, field, absent)).count();
            let options = vec![
                FacetOption {
                    value: "yes".into(),
                    label: yes_label.to_string(),
                    count: yes,
                },
                FacetOption {
                    value: "no".into(),
                    label: no_label.to_string(),
                    count: records.len() - yes,
                },
            ];
            ("presence", options, None)
        }
        FacetRule::Buckets { field, buckets } => {
            let options = buckets
                .iter()
                .map(|b| FacetOption {
                    value: b.value.to_string(),
                    label: b.label.to_string(),
                    count: records.iter().filter(|r| b.contains(numeric(r, field))).count(),
                })
                .filter(|o| o.count > 0)
                .collect();
            ("buckets", options, None)
        }
        FacetRule::Range { field } => {
            let mut bounds = NumericRange::default();
            for v in records.iter().filter_map(|r| r.get(field).and_then(|v| v.as_number())) {
                bounds.min = Some(bounds.min.map_or(v, |m: f64| m.min(v)));
                bounds.max = Some(bounds.max.map_or(v, |m: f64| m.max(v)));
            }
            ("range", Vec::new(), Some(bounds))
        }
    };
    FacetOptions {
        key: facet.key.to_string(),
        label: facet.label.to_string(),
        kind,
        options,
        bounds,
    }
}

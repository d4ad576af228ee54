use crate::view::record::{format_number, parse_day, FieldValue};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Field name to the first message raised for it.
pub type ErrorMap = BTreeMap<String, String>;

pub type Form = BTreeMap<String, FieldValue>;

#[derive(Debug, Clone, Copy)]
pub enum Check {
    Required {
        field: &'static str,
        label: &'static str,
    },
    /// Required only while `when_field` equals `when_value`.
    RequiredWhen {
        field: &'static str,
        label: &'static str,
        when_field: &'static str,
        when_value: &'static str,
    },
    NotPast {
        field: &'static str,
        label: &'static str,
    },
    After {
        field: &'static str,
        label: &'static str,
        other: &'static str,
        other_label: &'static str,
    },
    Between {
        field: &'static str,
        label: &'static str,
        min: f64,
        max: f64,
    },
    AtLeast {
        field: &'static str,
        label: &'static str,
        min: f64,
    },
    Email {
        field: &'static str,
        label: &'static str,
    },
    OneOf {
        field: &'static str,
        label: &'static str,
        allowed: &'static [&'static str],
    },
}

fn blank(form: &Form, field: &str) -> bool {
    form.get(field).map(|v| v.is_blank()).unwrap_or(true)
}

fn day_of(form: &Form, field: &str) -> Option<Result<NaiveDate, ()>> {
    if blank(form, field) {
        return None;
    }
    Some(
        form.get(field)
            .and_then(|v| v.as_text())
            .and_then(parse_day)
            .ok_or(()),
    )
}

fn number_of(form: &Form, field: &str) -> Option<Result<f64, ()>> {
    if blank(form, field) {
        return None;
    }
    Some(form.get(field).and_then(|v| v.as_number()).ok_or(()))
}

fn bad_date(label: &str) -> String {
    format!("{} must be a valid date (YYYY-MM-DD)", label)
}

fn run_check(check: &Check, form: &Form, today: NaiveDate) -> Option<(&'static str, String)> {
    match *check {
        Check::Required { field, label } => {
            blank(form, field).then(|| (field, format!("{} is required", label)))
        }
        Check::RequiredWhen {
            field,
            label,
            when_field,
            when_value,
        } => {
            let active = form
                .get(when_field)
                .and_then(|v| v.as_text())
                .map(|s| s.eq_ignore_ascii_case(when_value))
                .unwrap_or(false);
            (active && blank(form, field)).then(|| (field, format!("{} is required", label)))
        }
        Check::NotPast { field, label } => match day_of(form, field)? {
            Err(()) => Some((field, bad_date(label))),
            Ok(d) if d < today => Some((field, format!("{} cannot be in the past", label))),
            Ok(_) => None,
        },
        Check::After {
            field,
            label,
            other,
            other_label,
        } => {
            let d = match day_of(form, field)? {
                Ok(d) => d,
                Err(()) => return Some((field, bad_date(label))),
            };
            let Some(Ok(o)) = day_of(form, other) else {
                return None;
            };
            (d <= o).then(|| {
                (
                    field,
                    format!("{} must be after {}", label, other_label.to_lowercase()),
                )
            })
        }
        Check::Between {
            field,
            label,
            min,
            max,
        } => match number_of(form, field)? {
            Err(()) => Some((field, format!("{} must be a number", label))),
            Ok(v) if v < min || v > max => Some((
                field,
                format!(
                    "{} must be between {} and {}",
                    label,
                    format_number(min),
                    format_number(max)
                ),
            )),
            Ok(_) => None,
        },
        Check::AtLeast { field, label, min } => match number_of(form, field)? {
            Err(()) => Some((field, format!("{} must be a number", label))),
            Ok(v) if v < min => Some((
                field,
                format!("{} must be at least {}", label, format_number(min)),
            )),
            Ok(_) => None,
        },
        Check::Email { field, label } => {
            let raw = form.get(field).and_then(|v| v.as_text())?.trim();
            if raw.is_empty() {
                return None;
            }
            let ok = match raw.split_once('@') {
                Some((user, domain)) => {
                    !user.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
                }
                None => false,
            };
            (!ok).then(|| (field, format!("{} must be a valid email address", label)))
        }
        Check::OneOf {
            field,
            label,
            allowed,
        } => {
            let raw = form.get(field).and_then(|v| v.as_text())?.trim();
            if raw.is_empty() || allowed.iter().any(|a| a.eq_ignore_ascii_case(raw)) {
                return None;
            }
            Some((field, format!("{} must be one of: {}", label, allowed.join(", "))))
        }
    }
}

/// Runs the checks in order. The first failure per field wins.
pub fn validate(checks: &[Check], form: &Form, today: NaiveDate) -> ErrorMap {
    let mut errors = ErrorMap::new();
    for check in checks {
        if let Some((field, msg)) = run_check(check, form, today) {
            errors.entry(field.to_string()).or_insert(msg);
        }
    }
    errors
}

pub fn form_from_json(value: &serde_json::Value) -> Result<Form, serde_json::Error> {
    match value {
        serde_json::Value::Null => Ok(Form::new()),
        v => serde_json::from_value(v.clone()),
    }
}

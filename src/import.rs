//! CSV bulk import: header checks and per-row payloads. Validation and the
//! writes happen in the page session so a batch is all-or-nothing.

use crate::entities::EntityKind;
use crate::service::Payload;
use crate::validate::Check;
use crate::view::FieldValue;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("could not parse CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("the CSV has no data rows")]
    NoRows,
}

/// One data row. `row` is the 1-based line number, so the first row under
/// the header is row 2.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportRow {
    pub row: u64,
    pub fields: Payload,
}

/// `"Roll Number"` and `"roll-number"` both name the `roll_number` field.
pub fn column_name(header: &str) -> String {
    header
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .collect()
}

/// Columns a file must carry: every field with an unconditional required check.
pub fn required_columns(kind: EntityKind) -> Vec<&'static str> {
    let mut cols: Vec<&'static str> = Vec::new();
    for check in kind.checks() {
        if let Check::Required { field, .. } = check {
            if !cols.contains(field) {
                cols.push(*field);
            }
        }
    }
    cols
}

/// Splits `text` into rows keyed by normalised header. Empty cells are left
/// out so required checks see them as missing; kind defaults fill the rest.
pub fn parse_csv(kind: EntityKind, text: &str) -> Result<Vec<ImportRow>, ImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(text.as_bytes());
    let headers: Vec<String> = reader.headers()?.iter().map(column_name).collect();

    let missing: Vec<String> = required_columns(kind)
        .into_iter()
        .filter(|c| !headers.iter().any(|h| h == c))
        .map(str::to_string)
        .collect();
    if !missing.is_empty() {
        return Err(ImportError::MissingColumns(missing));
    }

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        if record.iter().all(|cell| cell.is_empty()) {
            continue;
        }
        let row = record.position().map(|p| p.line()).unwrap_or(rows.len() as u64 + 2);
        let mut fields = Payload::new();
        for (name, cell) in headers.iter().zip(record.iter()) {
            if name.is_empty() || name == "id" || cell.is_empty() {
                continue;
            }
            fields.insert(name.clone(), FieldValue::from(cell));
        }
        for (field, value) in kind.import_defaults() {
            fields
                .entry(field.to_string())
                .or_insert_with(|| FieldValue::from(*value));
        }
        rows.push(ImportRow { row, fields });
    }
    if rows.is_empty() {
        return Err(ImportError::NoRows);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_are_normalised_and_checked() {
        assert_eq!(column_name(" Roll Number "), "roll_number");
        assert_eq!(required_columns(EntityKind::Students), vec!["name", "email", "roll_number"]);

        let missing = parse_csv(EntityKind::Students, "Name,Email\nA,a@x.io\n");
        match missing {
            Err(ImportError::MissingColumns(cols)) => assert_eq!(cols, vec!["roll_number"]),
            other => panic!("expected missing columns, got {other:?}"),
        }
    }

    #[test]
    fn rows_carry_line_numbers_and_defaults() {
        let text = "Name,Email,Roll Number,Semester\n\
                    Asha Nair, asha@college.edu ,CS24001,3\n\
                    \n\
                    \"Menon, Ravi\",ravi@college.edu,CS24002,\n";
        let rows = parse_csv(EntityKind::Students, text).expect("parse");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].row, 2);
        assert_eq!(rows[0].fields.get("email"), Some(&FieldValue::from("asha@college.edu")));
        assert_eq!(rows[0].fields.get("semester"), Some(&FieldValue::from("3")));
        assert_eq!(rows[0].fields.get("status"), Some(&FieldValue::from("active")));
        assert_eq!(rows[1].row, 4);
        assert_eq!(rows[1].fields.get("name"), Some(&FieldValue::from("Menon, Ravi")));
        // Empty semester cell takes the default.
        assert_eq!(rows[1].fields.get("semester"), Some(&FieldValue::from("1")));
    }

    #[test]
    fn header_only_file_has_no_rows() {
        let err = parse_csv(EntityKind::Students, "name,email,roll_number\n").unwrap_err();
        assert!(matches!(err, ImportError::NoRows));
    }
}

// src/process/infer.rs

use arrow::{
    array::{ArrayRef, Date32Array, Float64Array, Int64Array, StringArray},
    datatypes::Date32Type,
};
use chrono::NaiveDate;
use std::sync::Arc;

use crate::schema::ColumnKind;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse an ISO `YYYY-MM-DD` date into days since the Unix epoch.
pub fn parse_date_days(s: &str) -> Option<i32> {
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .ok()
        .map(Date32Type::from_naive_date)
}

/// Pick the narrowest kind every non-empty value fits.
///
/// Order of preference: Int64, Float64, Date, Utf8. A column with no
/// non-empty values stays Utf8.
pub fn infer_kind<'a, I>(values: I) -> ColumnKind
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let mut seen = false;
    let (mut int, mut float, mut date) = (true, true, true);

    for v in values.into_iter().flatten() {
        seen = true;
        if int && v.parse::<i64>().is_err() {
            int = false;
        }
        // NaN and inf parse as f64 but are left as text
        if float && !v.parse::<f64>().is_ok_and(f64::is_finite) {
            float = false;
        }
        if date && parse_date_days(v).is_none() {
            date = false;
        }
        if !int && !float && !date {
            return ColumnKind::Utf8;
        }
    }

    match (seen, int, float, date) {
        (false, ..) => ColumnKind::Utf8,
        (_, true, ..) => ColumnKind::Int64,
        (_, _, true, _) => ColumnKind::Float64,
        (_, _, _, true) => ColumnKind::Date,
        _ => ColumnKind::Utf8,
    }
}

/// Build a typed Arrow array from trimmed cell values.
/// `None` (empty or missing cell) becomes null.
pub fn build_array(kind: ColumnKind, values: &[Option<String>]) -> ArrayRef {
    let cells = values.iter().map(|v| v.as_deref());
    match kind {
        ColumnKind::Int64 => Arc::new(
            cells
                .map(|v| v.and_then(|s| s.parse::<i64>().ok()))
                .collect::<Int64Array>(),
        ),
        ColumnKind::Float64 => Arc::new(
            cells
                .map(|v| v.and_then(|s| s.parse::<f64>().ok()))
                .collect::<Float64Array>(),
        ),
        ColumnKind::Date => Arc::new(
            cells
                .map(|v| v.and_then(parse_date_days))
                .collect::<Date32Array>(),
        ),
        ColumnKind::Utf8 => Arc::new(cells.collect::<StringArray>()),
    }
}

//! Per-cell coercion into [`CellValue`].
//!
//! Rules, first match wins:
//!   1. empty cell or null marker          → absent
//!   2. date-formatted cell                → `YYYY-MM-DD`
//!   3. text in a recognised date pattern  → `YYYY-MM-DD`
//!   4. text holding a serial day count    → `YYYY-MM-DD`
//!   5. numeric text or native number      → number (integer or fractional)
//!   6. anything else                      → trimmed text

use chrono::{Duration, NaiveDate, NaiveDateTime};
use roster_core::CellValue;
use thiserror::Error;

use crate::grid::Cell;

/// Canonical date format for every normalised date.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Text serials at or below this are numbers, not dates.
pub const SERIAL_DATE_THRESHOLD: f64 = 1000.0;

/// Text serials above this (2099-12-31) are numbers, not dates. Keeps
/// text-formatted employee numbers from turning into calendar dates.
pub const SERIAL_DATE_CEILING: f64 = 73_050.0;

const NULL_MARKERS: &[&str] = &["nan", "none", "null", "nat", "n/a", "#n/a"];

const DATE_PATTERNS: &[&str] =
  &["%Y-%m-%d", "%d.%m.%Y", "%Y/%m/%d", "%d/%m/%Y", "%d/%b/%Y"];

const DATETIME_PATTERNS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Why a cell could not be normalised.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NormalizeError {
  #[error("serial {0} is outside the representable date range")]
  DateOutOfRange(f64),

  #[error("number is not finite")]
  NonFinite,
}

/// The fixed epoch of spreadsheet serial dates.
pub fn serial_epoch() -> NaiveDate {
  NaiveDate::from_ymd_opt(1899, 12, 30).unwrap_or(NaiveDate::MIN)
}

/// Normalise a raw cell. Never fails: on any internal error the raw value's
/// string form is returned as text.
pub fn normalize(cell: &Cell) -> CellValue {
  try_normalize(cell).unwrap_or_else(|e| {
    tracing::debug!(error = %e, "cell kept as raw text");
    CellValue::Text(cell.to_raw_string())
  })
}

/// Normalise a raw cell, reporting why a fallback would be needed.
pub fn try_normalize(cell: &Cell) -> Result<CellValue, NormalizeError> {
  match cell {
    Cell::Empty | Cell::Error(_) => Ok(CellValue::Absent),
    Cell::DateTime(serial) => Ok(CellValue::Text(format_date(serial_to_date(*serial)?))),
    Cell::Number(n) if n.is_nan() => Ok(CellValue::Absent),
    Cell::Number(n) if !n.is_finite() => Err(NormalizeError::NonFinite),
    Cell::Number(n) => Ok(CellValue::from_f64(*n)),
    Cell::Int(n) => Ok(CellValue::Int(*n)),
    Cell::Bool(b) => Ok(CellValue::Text(if *b { "TRUE" } else { "FALSE" }.to_owned())),
    Cell::Text(s) => try_normalize_text(s),
  }
}

fn try_normalize_text(raw: &str) -> Result<CellValue, NormalizeError> {
  let s = raw.trim();
  if s.is_empty() || is_null_marker(s) {
    return Ok(CellValue::Absent);
  }

  if let Some(date) = parse_date_text(s) {
    return Ok(CellValue::Text(format_date(date)));
  }

  if let Some(n) = parse_number(s) {
    if is_text_serial(s, n) {
      return Ok(CellValue::Text(format_date(serial_to_date(n)?)));
    }
    return Ok(CellValue::from_f64(n));
  }

  Ok(CellValue::Text(s.to_owned()))
}

/// Convert a serial day count (relative to 1899-12-30) into a date.
/// Any fractional time-of-day part is dropped.
pub fn serial_to_date(serial: f64) -> Result<NaiveDate, NormalizeError> {
  if !serial.is_finite() {
    return Err(NormalizeError::NonFinite);
  }
  let days = serial.trunc();
  if days.abs() > 3_000_000.0 {
    return Err(NormalizeError::DateOutOfRange(serial));
  }
  serial_epoch()
    .checked_add_signed(Duration::days(days as i64))
    .ok_or(NormalizeError::DateOutOfRange(serial))
}

/// Try each recognised date and date-time pattern in turn.
pub fn parse_date_text(s: &str) -> Option<NaiveDate> {
  DATE_PATTERNS
    .iter()
    .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
    .or_else(|| {
      DATETIME_PATTERNS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|dt| dt.date())
    })
}

pub fn format_date(date: NaiveDate) -> String { date.format(DATE_FORMAT).to_string() }

// ─── Keys ────────────────────────────────────────────────────────────────────

/// Join-key form of a raw cell. Like [`normalize`] followed by
/// [`CellValue::to_key`], except that text is never reinterpreted as a date:
/// a text id `"4500"` keys as `4500`, the same as a numeric cell holding it.
pub fn cell_key(cell: &Cell) -> Option<String> {
  match cell {
    Cell::Empty | Cell::Error(_) => None,
    Cell::Text(raw) => {
      let s = raw.trim();
      if s.is_empty() || is_null_marker(s) {
        return None;
      }
      match parse_number(s) {
        Some(n) => CellValue::from_f64(n).to_key(),
        None => Some(s.to_owned()),
      }
    }
    Cell::Number(n) if n.is_finite() => CellValue::from_f64(*n).to_key(),
    Cell::Number(_) => None,
    Cell::Int(n) => Some(n.to_string()),
    Cell::Bool(_) | Cell::DateTime(_) => normalize(cell).to_key(),
  }
}

/// Numeric value of a raw cell, reading numeric text as a number even where
/// [`normalize`] would turn it into a date.
pub fn cell_number(cell: &Cell) -> Option<f64> {
  match cell {
    Cell::Number(n) => Some(*n).filter(|n| n.is_finite()),
    Cell::Int(n) => Some(*n as f64),
    Cell::Text(s) => parse_number(s.trim()),
    _ => None,
  }
}

/// Parse a finite number. Digit strings with a leading zero (`"007"`) are
/// identifiers, not numbers.
fn parse_number(s: &str) -> Option<f64> {
  let digits = s.strip_prefix(['-', '+']).unwrap_or(s);
  let mut chars = digits.chars();
  if let (Some('0'), Some(c)) = (chars.next(), chars.next())
    && c.is_ascii_digit()
  {
    return None;
  }
  if !digits.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
    return None;
  }
  s.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn is_text_serial(s: &str, n: f64) -> bool {
  s.bytes().all(|b| b.is_ascii_digit())
    && n > SERIAL_DATE_THRESHOLD
    && n <= SERIAL_DATE_CEILING
}

fn is_null_marker(s: &str) -> bool {
  NULL_MARKERS.iter().any(|m| s.eq_ignore_ascii_case(m))
}

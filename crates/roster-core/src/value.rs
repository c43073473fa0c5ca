//! The normalised value of a single spreadsheet cell.
//!
//! Every value that reaches the store is one of three shapes: absent, a
//! number, or a string. Dates are never a separate variant; they are
//! normalised to `YYYY-MM-DD` text before they get here.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A normalised cell value.
///
/// Serialises untagged: `null`, a JSON number, or a JSON string. Integral
/// numbers keep their integer form so `45` never round-trips as `45.0`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
  #[default]
  Absent,
  Int(i64),
  Float(f64),
  Text(String),
}

impl CellValue {
  /// Build a numeric value, collapsing integral floats to [`CellValue::Int`].
  pub fn from_f64(n: f64) -> Self {
    if n.fract() == 0.0 && n.abs() < 1e15 {
      Self::Int(n as i64)
    } else {
      Self::Float(n)
    }
  }

  pub fn is_absent(&self) -> bool { matches!(self, Self::Absent) }

  pub fn is_number(&self) -> bool {
    matches!(self, Self::Int(_) | Self::Float(_))
  }

  /// The numeric value, if this is a number.
  pub fn as_f64(&self) -> Option<f64> {
    match self {
      Self::Int(n) => Some(*n as f64),
      Self::Float(n) => Some(*n),
      _ => None,
    }
  }

  pub fn as_text(&self) -> Option<&str> {
    match self {
      Self::Text(s) => Some(s),
      _ => None,
    }
  }

  /// Stringified form for use as a natural key or free-text field.
  /// Absent values and blank strings yield `None`.
  pub fn to_key(&self) -> Option<String> {
    match self {
      Self::Absent => None,
      Self::Text(s) if s.trim().is_empty() => None,
      other => Some(other.to_string().trim().to_owned()),
    }
  }

  /// Numeric comparison treats `Int(5)` and `Float(5.0)` as equal; everything
  /// else compares structurally.
  pub fn loosely_eq(&self, other: &Self) -> bool {
    match (self.as_f64(), other.as_f64()) {
      (Some(a), Some(b)) => a == b,
      _ => self == other,
    }
  }
}

impl fmt::Display for CellValue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Absent => Ok(()),
      Self::Int(n) => write!(f, "{n}"),
      Self::Float(n) => write!(f, "{n}"),
      Self::Text(s) => f.write_str(s),
    }
  }
}

impl From<&str> for CellValue {
  fn from(s: &str) -> Self { Self::Text(s.to_owned()) }
}

impl From<String> for CellValue {
  fn from(s: String) -> Self { Self::Text(s) }
}

impl From<i64> for CellValue {
  fn from(n: i64) -> Self { Self::Int(n) }
}

impl From<f64> for CellValue {
  fn from(n: f64) -> Self { Self::from_f64(n) }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn integral_float_collapses_to_int() {
    assert_eq!(CellValue::from_f64(7.0), CellValue::Int(7));
    assert_eq!(CellValue::from_f64(131.5), CellValue::Float(131.5));
  }

  #[test]
  fn json_shapes() {
    let values = vec![
      CellValue::Absent,
      CellValue::Int(45),
      CellValue::Float(1.25),
      CellValue::Text("2025-03-01".into()),
    ];
    let json = serde_json::to_string(&values).unwrap();
    assert_eq!(json, r#"[null,45,1.25,"2025-03-01"]"#);

    let back: Vec<CellValue> = serde_json::from_str(&json).unwrap();
    assert_eq!(back, values);
  }

  #[test]
  fn key_form_of_numbers_has_no_fraction() {
    assert_eq!(CellValue::Int(905264).to_key().as_deref(), Some("905264"));
    assert_eq!(CellValue::Text("  ".into()).to_key(), None);
    assert_eq!(CellValue::Absent.to_key(), None);
  }

  #[test]
  fn loose_numeric_equality() {
    assert!(CellValue::Int(5).loosely_eq(&CellValue::Float(5.0)));
    assert!(!CellValue::Int(5).loosely_eq(&CellValue::Text("5".into())));
  }
}

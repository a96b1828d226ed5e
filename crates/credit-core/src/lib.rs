//! Core types and trait definitions for the credit store.
//!
//! This crate is deliberately free of database dependencies. It describes the
//! five entities of a company's credit lifecycle (company, filing, statement,
//! ratio, assessment) and the [`UnitOfWork`](store::UnitOfWork) interface that
//! storage backends implement.

#[macro_use]
mod macros;

pub mod assessment;
pub mod company;
pub mod error;
pub mod filing;
pub mod period;
pub mod ratio;
pub mod statement;
pub mod store;

use chrono::{DateTime, Datelike as _, Utc};

pub use error::{Error, Result};

/// Store-assigned surrogate identifier of a row.
///
/// Opaque to callers; identifiers are never reused, even after deletion.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
  serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct RecordId(pub i64);

impl std::fmt::Display for RecordId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "#{}", self.0)
  }
}

/// Maximum length of a ticker symbol, in characters.
pub const TICKER_MAX_LEN: usize = 10;

/// Check a ticker against the column constraints shared by every table.
pub fn validate_ticker(entity: &'static str, ticker: &str) -> Result<()> {
  error::require_text(entity, "ticker", ticker, TICKER_MAX_LEN)?;
  if ticker.chars().any(char::is_whitespace) {
    return Err(Error::validation(entity, "ticker", "must not contain whitespace"));
  }
  Ok(())
}

/// Years representable in the stored RFC 3339 timestamp text.
pub const TIMESTAMP_YEAR_RANGE: std::ops::RangeInclusive<i32> = 0..=9999;

/// Check a caller-supplied timestamp; `None` means "now" and always passes.
pub fn validate_timestamp(
  entity: &'static str,
  field: &'static str,
  value: Option<DateTime<Utc>>,
) -> Result<()> {
  match value {
    Some(ts) if !TIMESTAMP_YEAR_RANGE.contains(&ts.year()) => Err(Error::validation(
      entity,
      field,
      format!("year {} is outside 0000..=9999", ts.year()),
    )),
    _ => Ok(()),
  }
}

/// Decode a stored integer flag, which may only hold 0 or 1.
pub fn flag_from_int(entity: &'static str, field: &'static str, value: i64) -> Result<bool> {
  match value {
    0 => Ok(false),
    1 => Ok(true),
    other => Err(Error::validation(
      entity,
      field,
      format!("flag must be 0 or 1, got {other}"),
    )),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn flags_accept_only_zero_and_one() {
    assert!(!flag_from_int("filing", "processed", 0).unwrap());
    assert!(flag_from_int("filing", "processed", 1).unwrap());
    for bad in [-1, 2, 7] {
      let err = flag_from_int("filing", "processed", bad).unwrap_err();
      assert!(matches!(err, Error::Validation { field: "processed", .. }), "{err}");
    }
  }

  #[test]
  fn far_future_timestamp_is_rejected() {
    use chrono::TimeZone;
    let ok = Utc.with_ymd_and_hms(2024, 6, 30, 0, 0, 0).unwrap();
    assert!(validate_timestamp("ratio", "calculation_date", Some(ok)).is_ok());
    assert!(validate_timestamp("ratio", "calculation_date", None).is_ok());

    let far = Utc.with_ymd_and_hms(10_000, 1, 1, 0, 0, 0).unwrap();
    let err = validate_timestamp("ratio", "calculation_date", Some(far)).unwrap_err();
    assert!(matches!(err, Error::Validation { field: "calculation_date", .. }), "{err}");
  }

  #[test]
  fn ticker_rules() {
    assert!(validate_ticker("company", "AAPL").is_ok());
    assert!(validate_ticker("company", "BRK.B").is_ok());
    assert!(validate_ticker("company", "").is_err());
    assert!(validate_ticker("company", "   ").is_err());
    assert!(validate_ticker("company", "TOOLONGTICKER").is_err());
    assert!(validate_ticker("company", "AA PL").is_err());
  }
}

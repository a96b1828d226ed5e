//! Filing: metadata for one regulatory document (10-K, 10-Q, …), identified
//! by its SEC accession number.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  RecordId, Result,
  error::{optional_text, require_text},
  period::{FiscalPeriod, validate_fiscal_year},
  validate_ticker,
};

const ENTITY: &str = "filing";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filing {
  pub id:               RecordId,
  pub ticker:           String,
  pub filing_type:      String,
  pub fiscal_year:      i32,
  pub fiscal_period:    FiscalPeriod,
  pub filing_date:      NaiveDate,
  pub accession_number: String,
  pub document_url:     Option<String>,
  /// Whether downstream extraction has consumed this filing.
  pub processed:        bool,
  pub created_at:       DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewFiling {
  pub ticker:           String,
  pub filing_type:      String,
  pub fiscal_year:      i32,
  pub fiscal_period:    FiscalPeriod,
  pub filing_date:      NaiveDate,
  pub accession_number: String,
  pub document_url:     Option<String>,
  pub processed:        bool,
}

impl NewFiling {
  pub fn new(
    ticker: impl Into<String>,
    filing_type: impl Into<String>,
    fiscal_year: i32,
    fiscal_period: FiscalPeriod,
    filing_date: NaiveDate,
    accession_number: impl Into<String>,
  ) -> Self {
    Self {
      ticker: ticker.into(),
      filing_type: filing_type.into(),
      fiscal_year,
      fiscal_period,
      filing_date,
      accession_number: accession_number.into(),
      document_url: None,
      processed: false,
    }
  }

  pub fn validate(&self) -> Result<()> {
    validate_ticker(ENTITY, &self.ticker)?;
    require_text(ENTITY, "filing_type", &self.filing_type, 10)?;
    validate_fiscal_year(ENTITY, self.fiscal_year)?;
    require_text(ENTITY, "accession_number", &self.accession_number, 30)?;
    optional_text(ENTITY, "document_url", self.document_url.as_deref(), usize::MAX)
  }
}

/// Interpret an integer `processed` code supplied by a producer.
pub fn processed_from_code(code: i64) -> Result<bool> {
  crate::flag_from_int(ENTITY, "processed", code)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::Error;

  fn filing() -> NewFiling {
    NewFiling::new(
      "AAPL",
      "10-K",
      2023,
      FiscalPeriod::FY,
      NaiveDate::from_ymd_opt(2023, 11, 3).unwrap(),
      "0000320193-23-000106",
    )
  }

  #[test]
  fn valid_filing_passes() {
    assert!(filing().validate().is_ok());
  }

  #[test]
  fn missing_accession_number_is_rejected() {
    let mut f = filing();
    f.accession_number.clear();
    let err = f.validate().unwrap_err();
    assert!(matches!(err, Error::Validation { field: "accession_number", .. }));
  }

  #[test]
  fn out_of_range_year_is_rejected() {
    let mut f = filing();
    f.fiscal_year = 1850;
    assert!(f.validate().is_err());
  }

  #[test]
  fn processed_codes() {
    assert!(!processed_from_code(0).unwrap());
    assert!(processed_from_code(1).unwrap());
    assert!(processed_from_code(2).is_err());
  }
}

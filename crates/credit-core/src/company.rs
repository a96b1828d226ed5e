//! Company: the root of every lifecycle. All other rows associate with a
//! company through its ticker.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  RecordId, Result,
  error::{Error, optional_text, require_text},
  validate_ticker,
};

const ENTITY: &str = "company";

/// A persisted company row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
  pub id:         RecordId,
  pub ticker:     String,
  pub name:       String,
  /// SEC Central Index Key. Immutable once the row exists.
  pub cik:        String,
  pub sic_code:   Option<String>,
  pub industry:   Option<String>,
  pub sector:     Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// Input for creating a company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCompany {
  pub ticker:   String,
  pub name:     String,
  pub cik:      String,
  pub sic_code: Option<String>,
  pub industry: Option<String>,
  pub sector:   Option<String>,
}

impl NewCompany {
  pub fn new(
    ticker: impl Into<String>,
    name: impl Into<String>,
    cik: impl Into<String>,
  ) -> Self {
    Self {
      ticker:   ticker.into(),
      name:     name.into(),
      cik:      cik.into(),
      sic_code: None,
      industry: None,
      sector:   None,
    }
  }

  pub fn validate(&self) -> Result<()> {
    validate_ticker(ENTITY, &self.ticker)?;
    require_text(ENTITY, "name", &self.name, 255)?;
    validate_cik(&self.cik)?;
    validate_descriptors(
      self.sic_code.as_deref(),
      self.industry.as_deref(),
      self.sector.as_deref(),
    )
  }
}

impl Company {
  /// Re-check the mutable columns before an update is written.
  pub fn validate(&self) -> Result<()> {
    validate_ticker(ENTITY, &self.ticker)?;
    require_text(ENTITY, "name", &self.name, 255)?;
    validate_cik(&self.cik)?;
    validate_descriptors(
      self.sic_code.as_deref(),
      self.industry.as_deref(),
      self.sector.as_deref(),
    )
  }
}

/// A CIK is 1–10 ASCII digits; EDGAR zero-pads it to ten.
pub fn validate_cik(cik: &str) -> Result<()> {
  require_text(ENTITY, "cik", cik, 10)?;
  if !cik.bytes().all(|b| b.is_ascii_digit()) {
    return Err(Error::validation(ENTITY, "cik", "must contain only digits"));
  }
  Ok(())
}

fn validate_descriptors(
  sic_code: Option<&str>,
  industry: Option<&str>,
  sector: Option<&str>,
) -> Result<()> {
  optional_text(ENTITY, "sic_code", sic_code, 10)?;
  optional_text(ENTITY, "industry", industry, 255)?;
  optional_text(ENTITY, "sector", sector, 255)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn valid_company_passes() {
    let mut c = NewCompany::new("AAPL", "Apple Inc.", "0000320193");
    c.sic_code = Some("3571".into());
    assert!(c.validate().is_ok());
  }

  #[test]
  fn missing_name_is_rejected() {
    let c = NewCompany::new("AAPL", "  ", "0000320193");
    let err = c.validate().unwrap_err();
    assert!(matches!(err, Error::Validation { field: "name", .. }), "{err}");
  }

  #[test]
  fn cik_must_be_digits_and_short() {
    assert!(validate_cik("320193").is_ok());
    assert!(validate_cik("00003201930").is_err());
    assert!(validate_cik("CIK320193").is_err());
    assert!(validate_cik("").is_err());
  }

  #[test]
  fn empty_optional_descriptor_is_rejected() {
    let mut c = NewCompany::new("AAPL", "Apple Inc.", "0000320193");
    c.sector = Some(String::new());
    assert!(c.validate().is_err());
  }
}

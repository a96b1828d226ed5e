//! Fiscal reporting periods.
//!
//! Filings and statements carry a single categorical period: one of the four
//! fiscal quarters or `FY` for a full-year (annual) report. Whether a row is
//! annual, and which quarter it covers, are derived from that one value rather
//! than stored separately.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::{Error, Result};

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
  Serialize, Deserialize, Display, EnumString, EnumIter, IntoStaticStr,
)]
#[strum(ascii_case_insensitive)]
pub enum FiscalPeriod {
  Q1,
  Q2,
  Q3,
  Q4,
  /// Full fiscal year, as reported on a 10-K.
  FY,
}

impl FiscalPeriod {
  /// The stored text form (`"Q1"` … `"Q4"`, `"FY"`).
  pub fn as_code(self) -> &'static str { self.into() }

  pub fn from_code(code: &str) -> Result<Self> {
    code.parse().map_err(|_| Error::UnknownVariant {
      kind:  "fiscal period",
      value: code.to_owned(),
    })
  }

  pub fn is_annual(self) -> bool { self == FiscalPeriod::FY }

  /// Quarter number 1–4, or `None` for an annual period.
  pub fn quarter(self) -> Option<u8> {
    match self {
      FiscalPeriod::Q1 => Some(1),
      FiscalPeriod::Q2 => Some(2),
      FiscalPeriod::Q3 => Some(3),
      FiscalPeriod::Q4 => Some(4),
      FiscalPeriod::FY => None,
    }
  }
}

/// Inclusive range of fiscal years the store accepts.
pub const FISCAL_YEAR_RANGE: std::ops::RangeInclusive<i32> = 1900..=2100;

pub(crate) fn validate_fiscal_year(entity: &'static str, year: i32) -> Result<()> {
  if FISCAL_YEAR_RANGE.contains(&year) {
    Ok(())
  } else {
    Err(Error::validation(
      entity,
      "fiscal_year",
      format!("{year} is outside {}..={}", FISCAL_YEAR_RANGE.start(), FISCAL_YEAR_RANGE.end()),
    ))
  }
}

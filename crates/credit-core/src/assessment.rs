//! CreditAssessment: the terminal decision record for one evaluation date.
//!
//! The store records scores and ratings as produced by the scoring process. It
//! does not interpret them; the bounds below are column constraints only.

use std::ops::RangeInclusive;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::{
  Error, RecordId, Result, error::optional_text, validate_ticker, validate_timestamp,
};

const ENTITY: &str = "credit_assessment";

/// Bounds of the liquidity, leverage and profitability component scores.
pub const COMPONENT_SCORE_RANGE: RangeInclusive<u8> = 1..=10;

/// Bounds of the overall credit score.
pub const OVERALL_SCORE_RANGE: RangeInclusive<u8> = 1..=100;

/// Letter rating on the usual agency scale, best first.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
  Serialize, Deserialize, Display, EnumString, EnumIter, IntoStaticStr,
)]
pub enum CreditRating {
  AAA,
  AA,
  A,
  BBB,
  BB,
  B,
  CCC,
  CC,
  C,
  D,
}

impl CreditRating {
  pub fn as_code(self) -> &'static str { self.into() }

  pub fn from_code(code: &str) -> Result<Self> {
    code.parse().map_err(|_| Error::UnknownVariant {
      kind:  "credit rating",
      value: code.to_owned(),
    })
  }

  /// `BBB` and above.
  pub fn is_investment_grade(self) -> bool { self <= CreditRating::BBB }
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash,
  Serialize, Deserialize, Display, EnumString, EnumIter, IntoStaticStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
  Approve,
  ApproveWithConditions,
  Review,
  Decline,
}

impl Recommendation {
  pub fn as_code(self) -> &'static str { self.into() }

  pub fn from_code(code: &str) -> Result<Self> {
    code.parse().map_err(|_| Error::UnknownVariant {
      kind:  "recommendation",
      value: code.to_owned(),
    })
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditAssessment {
  pub id:                      RecordId,
  pub ticker:                  String,
  pub assessment_date:         DateTime<Utc>,
  pub liquidity_score:         Option<u8>,
  pub leverage_score:          Option<u8>,
  pub profitability_score:     Option<u8>,
  pub overall_credit_score:    Option<u8>,
  pub credit_rating:           Option<CreditRating>,
  pub recommendation:          Option<Recommendation>,
  pub risk_summary:            Option<String>,
  pub analyst_notes:           Option<String>,
  pub compliance_check_passed: bool,
  pub created_at:              DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewCreditAssessment {
  pub ticker:                  String,
  /// Defaults to the insertion time when `None`.
  pub assessment_date:         Option<DateTime<Utc>>,
  pub liquidity_score:         Option<u8>,
  pub leverage_score:          Option<u8>,
  pub profitability_score:     Option<u8>,
  pub overall_credit_score:    Option<u8>,
  pub credit_rating:           Option<CreditRating>,
  pub recommendation:          Option<Recommendation>,
  pub risk_summary:            Option<String>,
  pub analyst_notes:           Option<String>,
  pub compliance_check_passed: bool,
}

impl NewCreditAssessment {
  pub fn new(ticker: impl Into<String>) -> Self {
    Self { ticker: ticker.into(), ..Default::default() }
  }

  pub fn validate(&self) -> Result<()> {
    validate_ticker(ENTITY, &self.ticker)?;
    validate_timestamp(ENTITY, "assessment_date", self.assessment_date)?;
    optional_text(ENTITY, "risk_summary", self.risk_summary.as_deref(), usize::MAX)?;
    optional_text(ENTITY, "analyst_notes", self.analyst_notes.as_deref(), usize::MAX)
  }
}

//! Ratio: metrics derived from statement values for one fiscal year.
//!
//! A ratio row is associated with its company by ticker and year only; it does
//! not point at the statement row(s) it was computed from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{RecordId, Result, period::validate_fiscal_year, validate_ticker, validate_timestamp};

const ENTITY: &str = "ratio";

figure_set! {
  pub struct RatioFigures {
    // Liquidity
    current_ratio,
    quick_ratio,
    cash_ratio,
    // Leverage
    debt_to_equity,
    debt_to_assets,
    interest_coverage,
    // Profitability
    gross_margin,
    operating_margin,
    net_margin,
    roa,
    roe,
    // Credit
    altman_z_score,
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ratio {
  pub id:               RecordId,
  pub ticker:           String,
  pub fiscal_year:      i32,
  pub calculation_date: DateTime<Utc>,
  pub figures:          RatioFigures,
  pub created_at:       DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRatio {
  pub ticker:           String,
  pub fiscal_year:      i32,
  /// Defaults to the insertion time when `None`.
  pub calculation_date: Option<DateTime<Utc>>,
  pub figures:          RatioFigures,
}

impl NewRatio {
  pub fn new(ticker: impl Into<String>, fiscal_year: i32) -> Self {
    Self {
      ticker: ticker.into(),
      fiscal_year,
      calculation_date: None,
      figures: RatioFigures::default(),
    }
  }

  pub fn with_figures(mut self, figures: RatioFigures) -> Self {
    self.figures = figures;
    self
  }

  pub fn validate(&self) -> Result<()> {
    validate_ticker(ENTITY, &self.ticker)?;
    validate_fiscal_year(ENTITY, self.fiscal_year)?;
    validate_timestamp(ENTITY, "calculation_date", self.calculation_date)?;
    self.figures.validate_finite(ENTITY)
  }
}

//! Statement: numeric financial data extracted for one reporting period.
//!
//! Conceptually one row per `(ticker, fiscal_year, fiscal_period)`; the store
//! enforces that with a unique constraint.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  RecordId, Result,
  period::{FiscalPeriod, validate_fiscal_year},
  validate_ticker,
};

const ENTITY: &str = "statement";

figure_set! {
  /// Balance sheet, income, cash flow and debt figures. Any of them may be
  /// unavailable.
  pub struct StatementFigures {
    // Balance sheet
    total_assets,
    current_assets,
    total_liabilities,
    current_liabilities,
    shareholders_equity,
    retained_earnings,
    working_capital,
    // Income statement
    revenue,
    gross_profit,
    operating_income,
    ebit,
    net_income,
    // Cash flow
    operating_cash_flow,
    free_cash_flow,
    // Debt
    total_debt,
    short_term_debt,
    long_term_debt,
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
  pub id:            RecordId,
  pub ticker:        String,
  pub fiscal_year:   i32,
  pub fiscal_period: FiscalPeriod,
  pub filing_date:   NaiveDate,
  pub figures:       StatementFigures,
  pub created_at:    DateTime<Utc>,
  pub updated_at:    DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewStatement {
  pub ticker:        String,
  pub fiscal_year:   i32,
  pub fiscal_period: FiscalPeriod,
  pub filing_date:   NaiveDate,
  pub figures:       StatementFigures,
}

impl NewStatement {
  pub fn new(
    ticker: impl Into<String>,
    fiscal_year: i32,
    fiscal_period: FiscalPeriod,
    filing_date: NaiveDate,
  ) -> Self {
    Self {
      ticker: ticker.into(),
      fiscal_year,
      fiscal_period,
      filing_date,
      figures: StatementFigures::default(),
    }
  }

  pub fn with_figures(mut self, figures: StatementFigures) -> Self {
    self.figures = figures;
    self
  }

  pub fn validate(&self) -> Result<()> {
    validate_ticker(ENTITY, &self.ticker)?;
    validate_fiscal_year(ENTITY, self.fiscal_year)?;
    self.figures.validate_finite(ENTITY)
  }
}

impl Statement {
  pub fn validate(&self) -> Result<()> {
    validate_ticker(ENTITY, &self.ticker)?;
    validate_fiscal_year(ENTITY, self.fiscal_year)?;
    self.figures.validate_finite(ENTITY)
  }
}

//! The `UnitOfWork` trait and the read models it returns.
//!
//! A unit of work is one transactional session against a storage backend
//! (e.g. `credit-store-sqlite`). Pipeline consumers (ingestion, analytics,
//! scoring) are written against this trait, not against a concrete backend.
//!
//! Dependent rows are linked to their company by ticker only. Implementations
//! check that the ticker names an existing company when a dependent row is
//! added; the database itself carries no foreign keys.

use serde::{Deserialize, Serialize};

use crate::{
  RecordId,
  assessment::{CreditAssessment, NewCreditAssessment},
  company::{Company, NewCompany},
  filing::{Filing, NewFiling},
  period::FiscalPeriod,
  ratio::{NewRatio, Ratio},
  statement::{NewStatement, Statement},
};

// ─── Read models ─────────────────────────────────────────────────────────────

/// Everything the store holds for one company, each list in chronological
/// order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanySnapshot {
  pub company:     Company,
  pub filings:     Vec<Filing>,
  pub statements:  Vec<Statement>,
  pub ratios:      Vec<Ratio>,
  pub assessments: Vec<CreditAssessment>,
}

/// Row counts removed by [`UnitOfWork::delete_company`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedRows {
  pub companies:   usize,
  pub filings:     usize,
  pub statements:  usize,
  pub ratios:      usize,
  pub assessments: usize,
}

impl DeletedRows {
  pub fn total(&self) -> usize {
    self.companies + self.filings + self.statements + self.ratios + self.assessments
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Operations available inside one transactional session.
///
/// Every write is part of the surrounding transaction: nothing is visible to
/// other sessions until the session commits, and everything is discarded if
/// it rolls back.
pub trait UnitOfWork {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Companies ─────────────────────────────────────────────────────────

  /// Persist a new company. Fails if the ticker or CIK is already taken.
  fn add_company(&self, input: NewCompany) -> Result<Company, Self::Error>;

  fn company(&self, ticker: &str) -> Result<Option<Company>, Self::Error>;

  /// All companies, ordered by ticker.
  fn companies(&self) -> Result<Vec<Company>, Self::Error>;

  /// Write the mutable columns of `company` (matched by ticker) and bump
  /// `updated_at`. Changing the CIK is a constraint violation.
  fn update_company(&self, company: &Company) -> Result<Company, Self::Error>;

  /// Administrative delete of a company and every row associated with its
  /// ticker, dependents first.
  fn delete_company(&self, ticker: &str) -> Result<DeletedRows, Self::Error>;

  // ── Filings ───────────────────────────────────────────────────────────

  /// Persist a new filing. A duplicate accession number is a constraint
  /// violation.
  fn add_filing(&self, input: NewFiling) -> Result<Filing, Self::Error>;

  /// Insert, or update the metadata of the filing with the same accession
  /// number. The `processed` flag of an existing row is kept.
  fn upsert_filing(&self, input: NewFiling) -> Result<Filing, Self::Error>;

  fn filing(&self, accession_number: &str) -> Result<Option<Filing>, Self::Error>;

  fn filings_for(&self, ticker: &str) -> Result<Vec<Filing>, Self::Error>;

  /// Oldest unprocessed filings first.
  fn unprocessed_filings(&self, limit: usize) -> Result<Vec<Filing>, Self::Error>;

  fn set_filing_processed(
    &self,
    accession_number: &str,
    processed: bool,
  ) -> Result<Filing, Self::Error>;

  fn delete_filing(&self, accession_number: &str) -> Result<bool, Self::Error>;

  // ── Statements ────────────────────────────────────────────────────────

  fn add_statement(&self, input: NewStatement) -> Result<Statement, Self::Error>;

  fn statement(
    &self,
    ticker: &str,
    fiscal_year: i32,
    fiscal_period: FiscalPeriod,
  ) -> Result<Option<Statement>, Self::Error>;

  fn statements_for(&self, ticker: &str) -> Result<Vec<Statement>, Self::Error>;

  /// Correct the figures and filing date of an existing statement.
  fn update_statement(&self, statement: &Statement) -> Result<Statement, Self::Error>;

  fn delete_statement(&self, id: RecordId) -> Result<bool, Self::Error>;

  // ── Ratios ────────────────────────────────────────────────────────────

  fn add_ratio(&self, input: NewRatio) -> Result<Ratio, Self::Error>;

  fn ratios_for(&self, ticker: &str) -> Result<Vec<Ratio>, Self::Error>;

  /// The ratio row with the highest fiscal year, newest calculation first.
  fn latest_ratio(&self, ticker: &str) -> Result<Option<Ratio>, Self::Error>;

  fn delete_ratio(&self, id: RecordId) -> Result<bool, Self::Error>;

  // ── Assessments ───────────────────────────────────────────────────────

  fn add_assessment(
    &self,
    input: NewCreditAssessment,
  ) -> Result<CreditAssessment, Self::Error>;

  fn assessments_for(&self, ticker: &str) -> Result<Vec<CreditAssessment>, Self::Error>;

  fn latest_assessment(
    &self,
    ticker: &str,
  ) -> Result<Option<CreditAssessment>, Self::Error>;

  fn delete_assessment(&self, id: RecordId) -> Result<bool, Self::Error>;

  // ── Aggregate ─────────────────────────────────────────────────────────

  /// Everything stored for `ticker`, or `None` if no such company exists.
  fn snapshot(&self, ticker: &str) -> Result<Option<CompanySnapshot>, Self::Error>;
}

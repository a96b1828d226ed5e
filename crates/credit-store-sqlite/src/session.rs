//! [`Session`]: one transaction on one pooled connection, and its
//! [`UnitOfWork`] implementation.

use std::cell::RefCell;

use chrono::Utc;
use credit_core::{
  RecordId,
  assessment::{CreditAssessment, NewCreditAssessment},
  company::{Company, NewCompany},
  filing::{Filing, NewFiling},
  period::FiscalPeriod,
  ratio::{NewRatio, Ratio, RatioFigures},
  statement::{NewStatement, Statement, StatementFigures},
  store::{CompanySnapshot, DeletedRows, UnitOfWork},
};
use rusqlite::{OptionalExtension as _, Params, params, params_from_iter, types::Value};

use crate::{
  Error, Result,
  database::PooledConnection,
  encode::{
    ASSESSMENT_COLUMNS, COMPANY_COLUMNS, FILING_COLUMNS, RATIO_COLUMNS, RawAssessment,
    RawCompany, RawFiling, RawRatio, RawRow, RawStatement, STATEMENT_COLUMNS, encode_date,
    encode_dt, encode_flag, figure_values, placeholders,
  },
};

/// Chronological order of fiscal periods within a year: Q1..Q4, then FY.
const PERIOD_ORDER: &str =
  "CASE fiscal_period WHEN 'FY' THEN 5 ELSE CAST(substr(fiscal_period, 2) AS INTEGER) END";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
  Active,
  Committed,
  RolledBack,
}

/// A unit of work bound to exactly one pooled connection.
///
/// The transaction starts when the session is created (`BEGIN IMMEDIATE`) and
/// ends with [`commit`](Self::commit) or [`rollback`](Self::rollback), both of
/// which consume the session. Dropping an active session rolls it back. In
/// every case the connection goes back to the pool when the session is
/// dropped.
///
/// Once any operation fails the session is poisoned: `commit` rolls back
/// instead and reports the first failure.
pub struct Session {
  conn:    PooledConnection,
  id:      u64,
  state:   SessionState,
  failure: RefCell<Option<String>>,
}

impl std::fmt::Debug for Session {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Session")
      .field("id", &self.id)
      .field("state", &self.state)
      .field("failure", &self.failure.borrow())
      .finish()
  }
}

impl Session {
  /// Writers take the write lock up front so concurrent sessions queue on
  /// `busy_timeout` instead of failing at their first write. Read-only
  /// stores cannot take it and begin deferred.
  pub(crate) fn begin(conn: PooledConnection, id: u64, read_only: bool) -> Result<Self> {
    conn.execute_batch(if read_only { "BEGIN DEFERRED" } else { "BEGIN IMMEDIATE" })?;
    tracing::debug!(session = id, "session opened");
    Ok(Self { conn, id, state: SessionState::Active, failure: RefCell::new(None) })
  }

  pub fn id(&self) -> u64 { self.id }

  /// Make every write of this session durable and visible.
  pub fn commit(mut self) -> Result<()> {
    let failure = self.failure.borrow_mut().take();
    if let Some(reason) = failure {
      self.finish("ROLLBACK", SessionState::RolledBack)?;
      return Err(Error::SessionAborted(reason));
    }
    self.finish("COMMIT", SessionState::Committed)
  }

  /// Discard every write of this session.
  pub fn rollback(mut self) -> Result<()> { self.finish("ROLLBACK", SessionState::RolledBack) }

  /// The underlying connection, inside this session's transaction, for
  /// queries the typed operations do not cover.
  pub fn connection(&self) -> &rusqlite::Connection { &self.conn }

  fn finish(&mut self, sql: &str, next: SessionState) -> Result<()> {
    self.conn.execute_batch(sql)?;
    self.state = next;
    tracing::debug!(session = self.id, state = ?next, "session finished");
    Ok(())
  }

  /// Run one operation, remembering the first failure.
  fn track<T>(&self, op: impl FnOnce() -> Result<T>) -> Result<T> {
    let result = op();
    if let Err(e) = &result {
      let mut failure = self.failure.borrow_mut();
      if failure.is_none() {
        tracing::debug!(session = self.id, error = %e, "operation failed; session will roll back");
        *failure = Some(e.to_string());
      }
    }
    result
  }

  // ── Query helpers ─────────────────────────────────────────────────────

  fn fetch_one<R: RawRow>(&self, sql: &str, params: impl Params) -> Result<Option<R::Output>> {
    self
      .conn
      .query_row(sql, params, R::from_row)
      .optional()?
      .map(R::decode)
      .transpose()
  }

  fn fetch_all<R: RawRow>(&self, sql: &str, params: impl Params) -> Result<Vec<R::Output>> {
    let mut stmt = self.conn.prepare_cached(sql)?;
    let raws = stmt
      .query_map(params, R::from_row)?
      .collect::<rusqlite::Result<Vec<R>>>()?;
    raws.into_iter().map(R::decode).collect()
  }

  /// Soft reference check: dependent rows need an existing company.
  fn require_company(&self, ticker: &str) -> Result<()> {
    let exists: bool = self.conn.query_row(
      "SELECT EXISTS(SELECT 1 FROM companies WHERE ticker = ?1)",
      [ticker],
      |r| r.get(0),
    )?;
    if exists {
      Ok(())
    } else {
      Err(credit_core::Error::UnknownTicker(ticker.to_owned()).into())
    }
  }

  fn company_by_ticker(&self, ticker: &str) -> Result<Option<Company>> {
    self.fetch_one::<RawCompany>(
      &format!("SELECT {COMPANY_COLUMNS} FROM companies WHERE ticker = ?1"),
      [ticker],
    )
  }

  fn filing_by_accession(&self, accession_number: &str) -> Result<Option<Filing>> {
    self.fetch_one::<RawFiling>(
      &format!("SELECT {FILING_COLUMNS} FROM sec_filings WHERE accession_number = ?1"),
      [accession_number],
    )
  }

  fn statement_by_id(&self, id: i64) -> Result<Option<Statement>> {
    self.fetch_one::<RawStatement>(
      &format!("SELECT {} FROM financial_statements WHERE id = ?1", *STATEMENT_COLUMNS),
      [id],
    )
  }

  fn delete_where(&self, table: &str, column: &str, value: &dyn rusqlite::ToSql) -> Result<usize> {
    Ok(self.conn.execute(&format!("DELETE FROM {table} WHERE {column} = ?1"), [value])?)
  }

  fn loaded<T>(row: Option<T>, entity: &'static str, key: impl ToString) -> Result<T> {
    row.ok_or_else(|| Error::not_found(entity, key))
  }
}

impl Drop for Session {
  fn drop(&mut self) {
    if self.state != SessionState::Active || self.conn.is_autocommit() {
      return;
    }
    match self.conn.execute_batch("ROLLBACK") {
      Ok(()) => tracing::debug!(session = self.id, "uncommitted session rolled back on drop"),
      Err(e) => tracing::warn!(session = self.id, error = %e, "rollback on drop failed"),
    }
  }
}

// ─── UnitOfWork impl ─────────────────────────────────────────────────────────

impl UnitOfWork for Session {
  type Error = Error;

  // ── Companies ─────────────────────────────────────────────────────────

  fn add_company(&self, input: NewCompany) -> Result<Company> {
    self.track(|| {
      input.validate()?;
      let now = encode_dt(Utc::now());
      self.conn.execute(
        "INSERT INTO companies (
           ticker, name, cik, sic_code, industry, sector, created_at, updated_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
        params![
          input.ticker,
          input.name,
          input.cik,
          input.sic_code,
          input.industry,
          input.sector,
          now,
        ],
      )?;
      let company = self.company_by_ticker(&input.ticker)?;
      Self::loaded(company, "company", &input.ticker)
    })
  }

  fn company(&self, ticker: &str) -> Result<Option<Company>> {
    self.track(|| self.company_by_ticker(ticker))
  }

  fn companies(&self) -> Result<Vec<Company>> {
    self.track(|| {
      self.fetch_all::<RawCompany>(
        &format!("SELECT {COMPANY_COLUMNS} FROM companies ORDER BY ticker"),
        [],
      )
    })
  }

  fn update_company(&self, company: &Company) -> Result<Company> {
    self.track(|| {
      company.validate()?;
      let updated = self.conn.execute(
        "UPDATE companies
         SET name = ?2, cik = ?3, sic_code = ?4, industry = ?5, sector = ?6, updated_at = ?7
         WHERE ticker = ?1",
        params![
          company.ticker,
          company.name,
          company.cik,
          company.sic_code,
          company.industry,
          company.sector,
          encode_dt(Utc::now()),
        ],
      )?;
      if updated == 0 {
        return Err(Error::not_found("company", &company.ticker));
      }
      let company_row = self.company_by_ticker(&company.ticker)?;
      Self::loaded(company_row, "company", &company.ticker)
    })
  }

  fn delete_company(&self, ticker: &str) -> Result<DeletedRows> {
    self.track(|| {
      let deleted = DeletedRows {
        assessments: self.delete_where("credit_assessments", "ticker", &ticker)?,
        ratios:      self.delete_where("financial_ratios", "ticker", &ticker)?,
        statements:  self.delete_where("financial_statements", "ticker", &ticker)?,
        filings:     self.delete_where("sec_filings", "ticker", &ticker)?,
        companies:   self.delete_where("companies", "ticker", &ticker)?,
      };
      tracing::info!(ticker, rows = deleted.total(), "company deleted with dependents");
      Ok(deleted)
    })
  }

  // ── Filings ───────────────────────────────────────────────────────────

  fn add_filing(&self, input: NewFiling) -> Result<Filing> {
    self.track(|| {
      input.validate()?;
      self.require_company(&input.ticker)?;
      self.conn.execute(
        "INSERT INTO sec_filings (
           ticker, filing_type, fiscal_year, fiscal_period, filing_date,
           accession_number, document_url, processed, created_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
          input.ticker,
          input.filing_type,
          input.fiscal_year,
          input.fiscal_period.as_code(),
          encode_date(input.filing_date),
          input.accession_number,
          input.document_url,
          encode_flag(input.processed),
          encode_dt(Utc::now()),
        ],
      )?;
      let filing = self.filing_by_accession(&input.accession_number)?;
      Self::loaded(filing, "filing", &input.accession_number)
    })
  }

  fn upsert_filing(&self, input: NewFiling) -> Result<Filing> {
    self.track(|| {
      input.validate()?;
      self.require_company(&input.ticker)?;
      self.conn.execute(
        "INSERT INTO sec_filings (
           ticker, filing_type, fiscal_year, fiscal_period, filing_date,
           accession_number, document_url, processed, created_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
         ON CONFLICT (accession_number) DO UPDATE SET
           filing_type   = excluded.filing_type,
           fiscal_year   = excluded.fiscal_year,
           fiscal_period = excluded.fiscal_period,
           filing_date   = excluded.filing_date,
           document_url  = excluded.document_url
         WHERE sec_filings.ticker = excluded.ticker",
        params![
          input.ticker,
          input.filing_type,
          input.fiscal_year,
          input.fiscal_period.as_code(),
          encode_date(input.filing_date),
          input.accession_number,
          input.document_url,
          encode_flag(input.processed),
          encode_dt(Utc::now()),
        ],
      )?;
      let filing = Self::loaded(
        self.filing_by_accession(&input.accession_number)?,
        "filing",
        &input.accession_number,
      )?;
      if filing.ticker != input.ticker {
        return Err(Error::ConstraintViolation(format!(
          "accession number {} already belongs to {}",
          input.accession_number, filing.ticker
        )));
      }
      Ok(filing)
    })
  }

  fn filing(&self, accession_number: &str) -> Result<Option<Filing>> {
    self.track(|| self.filing_by_accession(accession_number))
  }

  fn filings_for(&self, ticker: &str) -> Result<Vec<Filing>> {
    self.track(|| {
      self.fetch_all::<RawFiling>(
        &format!(
          "SELECT {FILING_COLUMNS} FROM sec_filings WHERE ticker = ?1 ORDER BY filing_date, id"
        ),
        [ticker],
      )
    })
  }

  fn unprocessed_filings(&self, limit: usize) -> Result<Vec<Filing>> {
    self.track(|| {
      let limit = i64::try_from(limit).unwrap_or(i64::MAX);
      self.fetch_all::<RawFiling>(
        &format!(
          "SELECT {FILING_COLUMNS} FROM sec_filings WHERE processed = 0
           ORDER BY filing_date, id LIMIT ?1"
        ),
        [limit],
      )
    })
  }

  fn set_filing_processed(&self, accession_number: &str, processed: bool) -> Result<Filing> {
    self.track(|| {
      let updated = self.conn.execute(
        "UPDATE sec_filings SET processed = ?2 WHERE accession_number = ?1",
        params![accession_number, encode_flag(processed)],
      )?;
      if updated == 0 {
        return Err(Error::not_found("filing", accession_number));
      }
      Self::loaded(self.filing_by_accession(accession_number)?, "filing", accession_number)
    })
  }

  fn delete_filing(&self, accession_number: &str) -> Result<bool> {
    self.track(|| {
      Ok(self.delete_where("sec_filings", "accession_number", &accession_number)? > 0)
    })
  }

  // ── Statements ────────────────────────────────────────────────────────

  fn add_statement(&self, input: NewStatement) -> Result<Statement> {
    self.track(|| {
      input.validate()?;
      self.require_company(&input.ticker)?;
      let now = encode_dt(Utc::now());
      let fields = StatementFigures::FIELDS;
      let sql = format!(
        "INSERT INTO financial_statements (
           ticker, fiscal_year, fiscal_period, filing_date, {}, created_at, updated_at
         ) VALUES (?1, ?2, ?3, ?4, {}, ?{n}, ?{n})",
        fields.join(", "),
        placeholders(5, fields.len()),
        n = 5 + fields.len(),
      );

      let mut values = vec![
        Value::Text(input.ticker.clone()),
        Value::Integer(input.fiscal_year.into()),
        Value::Text(input.fiscal_period.as_code().to_owned()),
        Value::Text(encode_date(input.filing_date)),
      ];
      values.extend(figure_values(input.figures.values()));
      values.push(Value::Text(now));

      self.conn.execute(&sql, params_from_iter(values))?;
      let id = self.conn.last_insert_rowid();
      Self::loaded(self.statement_by_id(id)?, "statement", RecordId(id))
    })
  }

  fn statement(
    &self,
    ticker: &str,
    fiscal_year: i32,
    fiscal_period: FiscalPeriod,
  ) -> Result<Option<Statement>> {
    self.track(|| {
      self.fetch_one::<RawStatement>(
        &format!(
          "SELECT {} FROM financial_statements
           WHERE ticker = ?1 AND fiscal_year = ?2 AND fiscal_period = ?3",
          *STATEMENT_COLUMNS
        ),
        params![ticker, fiscal_year, fiscal_period.as_code()],
      )
    })
  }

  fn statements_for(&self, ticker: &str) -> Result<Vec<Statement>> {
    self.track(|| {
      self.fetch_all::<RawStatement>(
        &format!(
          "SELECT {} FROM financial_statements WHERE ticker = ?1
           ORDER BY fiscal_year, {PERIOD_ORDER}, id",
          *STATEMENT_COLUMNS
        ),
        [ticker],
      )
    })
  }

  fn update_statement(&self, statement: &Statement) -> Result<Statement> {
    self.track(|| {
      statement.validate()?;
      let fields = StatementFigures::FIELDS;
      let assignments = fields
        .iter()
        .enumerate()
        .map(|(i, f)| format!("{f} = ?{}", i + 3))
        .collect::<Vec<_>>()
        .join(", ");
      let sql = format!(
        "UPDATE financial_statements
         SET filing_date = ?2, {assignments}, updated_at = ?{}
         WHERE id = ?1",
        3 + fields.len()
      );

      let mut values = vec![
        Value::Integer(statement.id.0),
        Value::Text(encode_date(statement.filing_date)),
      ];
      values.extend(figure_values(statement.figures.values()));
      values.push(Value::Text(encode_dt(Utc::now())));

      if self.conn.execute(&sql, params_from_iter(values))? == 0 {
        return Err(Error::not_found("statement", statement.id));
      }
      Self::loaded(self.statement_by_id(statement.id.0)?, "statement", statement.id)
    })
  }

  fn delete_statement(&self, id: RecordId) -> Result<bool> {
    self.track(|| Ok(self.delete_where("financial_statements", "id", &id.0)? > 0))
  }

  // ── Ratios ────────────────────────────────────────────────────────────

  fn add_ratio(&self, input: NewRatio) -> Result<Ratio> {
    self.track(|| {
      input.validate()?;
      self.require_company(&input.ticker)?;
      let now = Utc::now();
      let fields = RatioFigures::FIELDS;
      let sql = format!(
        "INSERT INTO financial_ratios (
           ticker, fiscal_year, calculation_date, {}, created_at
         ) VALUES (?1, ?2, ?3, {}, ?{})",
        fields.join(", "),
        placeholders(4, fields.len()),
        4 + fields.len(),
      );

      let mut values = vec![
        Value::Text(input.ticker.clone()),
        Value::Integer(input.fiscal_year.into()),
        Value::Text(encode_dt(input.calculation_date.unwrap_or(now))),
      ];
      values.extend(figure_values(input.figures.values()));
      values.push(Value::Text(encode_dt(now)));

      self.conn.execute(&sql, params_from_iter(values))?;
      let id = self.conn.last_insert_rowid();
      let ratio = self.fetch_one::<RawRatio>(
        &format!("SELECT {} FROM financial_ratios WHERE id = ?1", *RATIO_COLUMNS),
        [id],
      )?;
      Self::loaded(ratio, "ratio", RecordId(id))
    })
  }

  fn ratios_for(&self, ticker: &str) -> Result<Vec<Ratio>> {
    self.track(|| {
      self.fetch_all::<RawRatio>(
        &format!(
          "SELECT {} FROM financial_ratios WHERE ticker = ?1
           ORDER BY fiscal_year, calculation_date, id",
          *RATIO_COLUMNS
        ),
        [ticker],
      )
    })
  }

  fn latest_ratio(&self, ticker: &str) -> Result<Option<Ratio>> {
    self.track(|| {
      self.fetch_one::<RawRatio>(
        &format!(
          "SELECT {} FROM financial_ratios WHERE ticker = ?1
           ORDER BY fiscal_year DESC, calculation_date DESC, id DESC LIMIT 1",
          *RATIO_COLUMNS
        ),
        [ticker],
      )
    })
  }

  fn delete_ratio(&self, id: RecordId) -> Result<bool> {
    self.track(|| Ok(self.delete_where("financial_ratios", "id", &id.0)? > 0))
  }

  // ── Assessments ───────────────────────────────────────────────────────

  fn add_assessment(&self, input: NewCreditAssessment) -> Result<CreditAssessment> {
    self.track(|| {
      input.validate()?;
      self.require_company(&input.ticker)?;
      let now = Utc::now();
      self.conn.execute(
        "INSERT INTO credit_assessments (
           ticker, assessment_date, liquidity_score, leverage_score,
           profitability_score, overall_credit_score, credit_rating, recommendation,
           risk_summary, analyst_notes, compliance_check_passed, created_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
          input.ticker,
          encode_dt(input.assessment_date.unwrap_or(now)),
          input.liquidity_score,
          input.leverage_score,
          input.profitability_score,
          input.overall_credit_score,
          input.credit_rating.map(|r| r.as_code()),
          input.recommendation.map(|r| r.as_code()),
          input.risk_summary,
          input.analyst_notes,
          encode_flag(input.compliance_check_passed),
          encode_dt(now),
        ],
      )?;
      let id = self.conn.last_insert_rowid();
      let assessment = self.fetch_one::<RawAssessment>(
        &format!("SELECT {ASSESSMENT_COLUMNS} FROM credit_assessments WHERE id = ?1"),
        [id],
      )?;
      Self::loaded(assessment, "credit assessment", RecordId(id))
    })
  }

  fn assessments_for(&self, ticker: &str) -> Result<Vec<CreditAssessment>> {
    self.track(|| {
      self.fetch_all::<RawAssessment>(
        &format!(
          "SELECT {ASSESSMENT_COLUMNS} FROM credit_assessments WHERE ticker = ?1
           ORDER BY assessment_date, id"
        ),
        [ticker],
      )
    })
  }

  fn latest_assessment(&self, ticker: &str) -> Result<Option<CreditAssessment>> {
    self.track(|| {
      self.fetch_one::<RawAssessment>(
        &format!(
          "SELECT {ASSESSMENT_COLUMNS} FROM credit_assessments WHERE ticker = ?1
           ORDER BY assessment_date DESC, id DESC LIMIT 1"
        ),
        [ticker],
      )
    })
  }

  fn delete_assessment(&self, id: RecordId) -> Result<bool> {
    self.track(|| Ok(self.delete_where("credit_assessments", "id", &id.0)? > 0))
  }

  // ── Aggregate ─────────────────────────────────────────────────────────

  fn snapshot(&self, ticker: &str) -> Result<Option<CompanySnapshot>> {
    let Some(company) = self.company(ticker)? else {
      return Ok(None);
    };
    Ok(Some(CompanySnapshot {
      company,
      filings: self.filings_for(ticker)?,
      statements: self.statements_for(ticker)?,
      ratios: self.ratios_for(ticker)?,
      assessments: self.assessments_for(ticker)?,
    }))
  }
}

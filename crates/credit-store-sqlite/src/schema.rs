//! SQL schema for the credit store, and the manager that applies it.
//!
//! Tables are linked by ticker only; there are no `REFERENCES` clauses. The
//! session layer checks that a ticker names a company before inserting a
//! dependent row.

use rusqlite::{Connection, TransactionBehavior};
use serde::Serialize;

use crate::{Database, Error, Result};

/// Current layout version, recorded in `PRAGMA user_version`.
pub const SCHEMA_VERSION: i64 = 1;

/// Tables in dependency order; teardown drops them in reverse.
pub const TABLES: [&str; 5] = [
  "companies",
  "sec_filings",
  "financial_statements",
  "financial_ratios",
  "credit_assessments",
];

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`. The layout version
/// is stamped separately by [`SchemaManager::provision`].
pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS companies (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    ticker      TEXT NOT NULL UNIQUE,
    name        TEXT NOT NULL,
    cik         TEXT NOT NULL UNIQUE,
    sic_code    TEXT,
    industry    TEXT,
    sector      TEXT,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

-- The CIK is issued by the SEC and never changes for a filer.
CREATE TRIGGER IF NOT EXISTS trg_company_cik_immutable
BEFORE UPDATE OF cik ON companies
FOR EACH ROW WHEN NEW.cik IS NOT OLD.cik
BEGIN
    SELECT RAISE(ABORT, 'companies.cik is immutable');
END;

CREATE TABLE IF NOT EXISTS sec_filings (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    ticker            TEXT NOT NULL,
    filing_type       TEXT NOT NULL,            -- '10-K', '10-Q', ...
    fiscal_year       INTEGER NOT NULL,
    fiscal_period     TEXT NOT NULL,            -- 'Q1'..'Q4' | 'FY'
    filing_date       TEXT NOT NULL,            -- YYYY-MM-DD
    accession_number  TEXT NOT NULL UNIQUE,
    document_url      TEXT,
    processed         INTEGER NOT NULL DEFAULT 0,
    created_at        TEXT NOT NULL,
    UNIQUE (ticker, fiscal_year, fiscal_period),
    CHECK (fiscal_year BETWEEN 1900 AND 2100),
    CHECK (fiscal_period IN ('Q1', 'Q2', 'Q3', 'Q4', 'FY')),
    CHECK (processed IN (0, 1))
);

CREATE TABLE IF NOT EXISTS financial_statements (
    id                   INTEGER PRIMARY KEY AUTOINCREMENT,
    ticker               TEXT NOT NULL,
    fiscal_year          INTEGER NOT NULL,
    fiscal_period        TEXT NOT NULL,
    filing_date          TEXT NOT NULL,
    -- balance sheet
    total_assets         REAL,
    current_assets       REAL,
    total_liabilities    REAL,
    current_liabilities  REAL,
    shareholders_equity  REAL,
    retained_earnings    REAL,
    working_capital      REAL,
    -- income statement
    revenue              REAL,
    gross_profit         REAL,
    operating_income     REAL,
    ebit                 REAL,
    net_income           REAL,
    -- cash flow
    operating_cash_flow  REAL,
    free_cash_flow       REAL,
    -- debt
    total_debt           REAL,
    short_term_debt      REAL,
    long_term_debt       REAL,
    created_at           TEXT NOT NULL,
    updated_at           TEXT NOT NULL,
    UNIQUE (ticker, fiscal_year, fiscal_period),
    CHECK (fiscal_year BETWEEN 1900 AND 2100),
    CHECK (fiscal_period IN ('Q1', 'Q2', 'Q3', 'Q4', 'FY'))
);

-- Derived from statements, but deliberately not linked to a statement row.
CREATE TABLE IF NOT EXISTS financial_ratios (
    id                 INTEGER PRIMARY KEY AUTOINCREMENT,
    ticker             TEXT NOT NULL,
    fiscal_year        INTEGER NOT NULL,
    calculation_date   TEXT NOT NULL,
    current_ratio      REAL,
    quick_ratio        REAL,
    cash_ratio         REAL,
    debt_to_equity     REAL,
    debt_to_assets     REAL,
    interest_coverage  REAL,
    gross_margin       REAL,
    operating_margin   REAL,
    net_margin         REAL,
    roa                REAL,
    roe                REAL,
    altman_z_score     REAL,
    created_at         TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS credit_assessments (
    id                       INTEGER PRIMARY KEY AUTOINCREMENT,
    ticker                   TEXT NOT NULL,
    assessment_date          TEXT NOT NULL,
    liquidity_score          INTEGER,
    leverage_score           INTEGER,
    profitability_score      INTEGER,
    overall_credit_score     INTEGER,
    credit_rating            TEXT,
    recommendation           TEXT,
    risk_summary             TEXT,
    analyst_notes            TEXT,
    compliance_check_passed  INTEGER NOT NULL DEFAULT 0,
    created_at               TEXT NOT NULL,
    CHECK (liquidity_score BETWEEN 1 AND 10),
    CHECK (leverage_score BETWEEN 1 AND 10),
    CHECK (profitability_score BETWEEN 1 AND 10),
    CHECK (overall_credit_score BETWEEN 1 AND 100),
    CHECK (compliance_check_passed IN (0, 1))
);

CREATE INDEX IF NOT EXISTS idx_company_ticker          ON companies(ticker);
CREATE INDEX IF NOT EXISTS idx_company_cik             ON companies(cik);
CREATE INDEX IF NOT EXISTS idx_filing_ticker_year      ON sec_filings(ticker, fiscal_year);
CREATE INDEX IF NOT EXISTS idx_filing_date             ON sec_filings(filing_date);
CREATE INDEX IF NOT EXISTS idx_statement_ticker_year   ON financial_statements(ticker, fiscal_year);
CREATE INDEX IF NOT EXISTS idx_ratio_ticker_year       ON financial_ratios(ticker, fiscal_year);
CREATE INDEX IF NOT EXISTS idx_assessment_ticker_date  ON credit_assessments(ticker, assessment_date);
";

/// One entry of `sqlite_master`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaObject {
  pub kind:  String,
  pub name:  String,
  pub table: String,
  pub sql:   Option<String>,
}

/// Proof that the caller means to drop every table of a specific database.
///
/// The name must equal [`StoreConfig::database_name`](crate::StoreConfig::database_name)
/// of the database being torn down.
#[derive(Debug, Clone)]
pub struct TeardownConfirmation {
  database: String,
}

impl TeardownConfirmation {
  pub fn for_database(name: impl Into<String>) -> Self {
    Self { database: name.into() }
  }
}

/// Creates, drops and inspects the physical layout of a [`Database`].
pub struct SchemaManager {
  db: Database,
}

impl SchemaManager {
  pub(crate) fn new(db: Database) -> Self { Self { db } }

  /// Create every table, index and trigger that does not exist yet, in one
  /// transaction. Running it against a provisioned database changes nothing.
  pub fn provision(&self) -> Result<()> {
    let sql = format!("{SCHEMA}\nPRAGMA user_version = {SCHEMA_VERSION};\n");
    self
      .apply(&sql)
      .map_err(|e| Error::schema("provision", e))?;
    tracing::info!(
      database = %self.db.config().database_name(),
      version = SCHEMA_VERSION,
      "schema provisioned"
    );
    Ok(())
  }

  /// Drop every table in one transaction. Irreversible.
  pub fn teardown(&self, confirmation: TeardownConfirmation) -> Result<()> {
    let expected = self.db.config().database_name();
    if confirmation.database != expected {
      return Err(Error::TeardownNotConfirmed {
        expected,
        given: confirmation.database,
      });
    }

    let mut sql: String = TABLES
      .iter()
      .rev()
      .map(|t| format!("DROP TABLE IF EXISTS {t};\n"))
      .collect();
    sql.push_str("PRAGMA user_version = 0;\n");

    self
      .apply(&sql)
      .map_err(|e| Error::schema("teardown", e))?;
    tracing::warn!(database = %expected, "all credit store tables dropped");
    Ok(())
  }

  /// Schema objects (tables, indexes, triggers), sorted by kind and name.
  pub fn describe(&self) -> Result<Vec<SchemaObject>> {
    let conn = self.db.connection()?;
    let mut stmt = conn.prepare(
      "SELECT type, name, tbl_name, sql FROM sqlite_master
       WHERE name NOT LIKE 'sqlite\\_%' ESCAPE '\\'
       ORDER BY type, name",
    )?;
    let objects = stmt
      .query_map([], |row| {
        Ok(SchemaObject {
          kind:  row.get(0)?,
          name:  row.get(1)?,
          table: row.get(2)?,
          sql:   row.get(3)?,
        })
      })?
      .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(objects)
  }

  /// The recorded layout version; 0 for an empty database.
  pub fn version(&self) -> Result<i64> {
    let conn = self.db.connection()?;
    Ok(conn.query_row("PRAGMA user_version", [], |r| r.get(0))?)
  }

  /// Whether every table exists.
  pub fn is_provisioned(&self) -> Result<bool> {
    let conn = self.db.connection()?;
    for table in TABLES {
      let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
        [table],
        |r| r.get(0),
      )?;
      if !exists {
        return Ok(false);
      }
    }
    Ok(true)
  }

  fn apply(&self, sql: &str) -> Result<()> {
    let mut conn = self.db.connection()?;
    run_in_transaction(&mut conn, sql)
  }
}

fn run_in_transaction(conn: &mut Connection, sql: &str) -> Result<()> {
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
  tx.execute_batch(sql)?;
  tx.commit()?;
  Ok(())
}

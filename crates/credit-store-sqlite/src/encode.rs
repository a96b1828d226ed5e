//! Encoding and decoding helpers between domain types and the plain values
//! stored in SQLite columns.
//!
//! Timestamps are RFC 3339 UTC strings with a fixed nine-digit fraction, so
//! lexical order in SQL equals chronological order. Calendar dates are
//! `YYYY-MM-DD`. Categorical values use their canonical codes.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use credit_core::{
  RecordId,
  assessment::{CreditAssessment, CreditRating, Recommendation},
  company::Company,
  filing::{Filing, processed_from_code},
  flag_from_int,
  period::FiscalPeriod,
  ratio::{Ratio, RatioFigures},
  statement::{Statement, StatementFigures},
};
use rusqlite::{Row, types::Value};

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

pub fn encode_flag(b: bool) -> i64 { i64::from(b) }

fn decode_score(field: &'static str, v: Option<i64>) -> Result<Option<u8>> {
  v.map(|n| {
    u8::try_from(n).map_err(|_| {
      credit_core::Error::validation("credit_assessment", field, format!("score {n} out of range"))
        .into()
    })
  })
  .transpose()
}

/// Bindable values for a block of nullable figures.
pub fn figure_values(values: Vec<Option<f64>>) -> impl Iterator<Item = Value> {
  values.into_iter().map(|v| v.map_or(Value::Null, Value::Real))
}

fn read_figures(row: &Row<'_>, fields: &[&str]) -> rusqlite::Result<Vec<Option<f64>>> {
  fields.iter().map(|f| row.get::<_, Option<f64>>(*f)).collect()
}

// ─── Column lists ────────────────────────────────────────────────────────────

pub const COMPANY_COLUMNS: &str =
  "id, ticker, name, cik, sic_code, industry, sector, created_at, updated_at";

pub const FILING_COLUMNS: &str = "id, ticker, filing_type, fiscal_year, fiscal_period, \
   filing_date, accession_number, document_url, processed, created_at";

pub const ASSESSMENT_COLUMNS: &str = "id, ticker, assessment_date, liquidity_score, \
   leverage_score, profitability_score, overall_credit_score, credit_rating, \
   recommendation, risk_summary, analyst_notes, compliance_check_passed, created_at";

pub static STATEMENT_COLUMNS: LazyLock<String> = LazyLock::new(|| {
  format!(
    "id, ticker, fiscal_year, fiscal_period, filing_date, {}, created_at, updated_at",
    StatementFigures::FIELDS.join(", ")
  )
});

pub static RATIO_COLUMNS: LazyLock<String> = LazyLock::new(|| {
  format!(
    "id, ticker, fiscal_year, calculation_date, {}, created_at",
    RatioFigures::FIELDS.join(", ")
  )
});

/// Numbered placeholders `?first, …` for `count` parameters.
pub fn placeholders(first: usize, count: usize) -> String {
  (first..first + count)
    .map(|i| format!("?{i}"))
    .collect::<Vec<_>>()
    .join(", ")
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// A row read verbatim from SQLite, decoded into a domain type afterwards so
/// decoding failures surface as store errors rather than rusqlite errors.
pub trait RawRow: Sized {
  type Output;

  fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;

  fn decode(self) -> Result<Self::Output>;
}

pub struct RawCompany {
  pub id:         i64,
  pub ticker:     String,
  pub name:       String,
  pub cik:        String,
  pub sic_code:   Option<String>,
  pub industry:   Option<String>,
  pub sector:     Option<String>,
  pub created_at: String,
  pub updated_at: String,
}

impl RawRow for RawCompany {
  type Output = Company;

  fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:         row.get("id")?,
      ticker:     row.get("ticker")?,
      name:       row.get("name")?,
      cik:        row.get("cik")?,
      sic_code:   row.get("sic_code")?,
      industry:   row.get("industry")?,
      sector:     row.get("sector")?,
      created_at: row.get("created_at")?,
      updated_at: row.get("updated_at")?,
    })
  }

  fn decode(self) -> Result<Company> {
    Ok(Company {
      id:         RecordId(self.id),
      ticker:     self.ticker,
      name:       self.name,
      cik:        self.cik,
      sic_code:   self.sic_code,
      industry:   self.industry,
      sector:     self.sector,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

pub struct RawFiling {
  pub id:               i64,
  pub ticker:           String,
  pub filing_type:      String,
  pub fiscal_year:      i32,
  pub fiscal_period:    String,
  pub filing_date:      String,
  pub accession_number: String,
  pub document_url:     Option<String>,
  pub processed:        i64,
  pub created_at:       String,
}

impl RawRow for RawFiling {
  type Output = Filing;

  fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:               row.get("id")?,
      ticker:           row.get("ticker")?,
      filing_type:      row.get("filing_type")?,
      fiscal_year:      row.get("fiscal_year")?,
      fiscal_period:    row.get("fiscal_period")?,
      filing_date:      row.get("filing_date")?,
      accession_number: row.get("accession_number")?,
      document_url:     row.get("document_url")?,
      processed:        row.get("processed")?,
      created_at:       row.get("created_at")?,
    })
  }

  fn decode(self) -> Result<Filing> {
    Ok(Filing {
      id:               RecordId(self.id),
      ticker:           self.ticker,
      filing_type:      self.filing_type,
      fiscal_year:      self.fiscal_year,
      fiscal_period:    FiscalPeriod::from_code(&self.fiscal_period)?,
      filing_date:      decode_date(&self.filing_date)?,
      accession_number: self.accession_number,
      document_url:     self.document_url,
      processed:        processed_from_code(self.processed)?,
      created_at:       decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawStatement {
  pub id:            i64,
  pub ticker:        String,
  pub fiscal_year:   i32,
  pub fiscal_period: String,
  pub filing_date:   String,
  pub figures:       Vec<Option<f64>>,
  pub created_at:    String,
  pub updated_at:    String,
}

impl RawRow for RawStatement {
  type Output = Statement;

  fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:            row.get("id")?,
      ticker:        row.get("ticker")?,
      fiscal_year:   row.get("fiscal_year")?,
      fiscal_period: row.get("fiscal_period")?,
      filing_date:   row.get("filing_date")?,
      figures:       read_figures(row, StatementFigures::FIELDS)?,
      created_at:    row.get("created_at")?,
      updated_at:    row.get("updated_at")?,
    })
  }

  fn decode(self) -> Result<Statement> {
    Ok(Statement {
      id:            RecordId(self.id),
      ticker:        self.ticker,
      fiscal_year:   self.fiscal_year,
      fiscal_period: FiscalPeriod::from_code(&self.fiscal_period)?,
      filing_date:   decode_date(&self.filing_date)?,
      figures:       StatementFigures::from_values(&self.figures),
      created_at:    decode_dt(&self.created_at)?,
      updated_at:    decode_dt(&self.updated_at)?,
    })
  }
}

pub struct RawRatio {
  pub id:               i64,
  pub ticker:           String,
  pub fiscal_year:      i32,
  pub calculation_date: String,
  pub figures:          Vec<Option<f64>>,
  pub created_at:       String,
}

impl RawRow for RawRatio {
  type Output = Ratio;

  fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:               row.get("id")?,
      ticker:           row.get("ticker")?,
      fiscal_year:      row.get("fiscal_year")?,
      calculation_date: row.get("calculation_date")?,
      figures:          read_figures(row, RatioFigures::FIELDS)?,
      created_at:       row.get("created_at")?,
    })
  }

  fn decode(self) -> Result<Ratio> {
    Ok(Ratio {
      id:               RecordId(self.id),
      ticker:           self.ticker,
      fiscal_year:      self.fiscal_year,
      calculation_date: decode_dt(&self.calculation_date)?,
      figures:          RatioFigures::from_values(&self.figures),
      created_at:       decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawAssessment {
  pub id:                      i64,
  pub ticker:                  String,
  pub assessment_date:         String,
  pub liquidity_score:         Option<i64>,
  pub leverage_score:          Option<i64>,
  pub profitability_score:     Option<i64>,
  pub overall_credit_score:    Option<i64>,
  pub credit_rating:           Option<String>,
  pub recommendation:          Option<String>,
  pub risk_summary:            Option<String>,
  pub analyst_notes:           Option<String>,
  pub compliance_check_passed: i64,
  pub created_at:              String,
}

impl RawRow for RawAssessment {
  type Output = CreditAssessment;

  fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                      row.get("id")?,
      ticker:                  row.get("ticker")?,
      assessment_date:         row.get("assessment_date")?,
      liquidity_score:         row.get("liquidity_score")?,
      leverage_score:          row.get("leverage_score")?,
      profitability_score:     row.get("profitability_score")?,
      overall_credit_score:    row.get("overall_credit_score")?,
      credit_rating:           row.get("credit_rating")?,
      recommendation:          row.get("recommendation")?,
      risk_summary:            row.get("risk_summary")?,
      analyst_notes:           row.get("analyst_notes")?,
      compliance_check_passed: row.get("compliance_check_passed")?,
      created_at:              row.get("created_at")?,
    })
  }

  fn decode(self) -> Result<CreditAssessment> {
    Ok(CreditAssessment {
      id:                      RecordId(self.id),
      ticker:                  self.ticker,
      assessment_date:         decode_dt(&self.assessment_date)?,
      liquidity_score:         decode_score("liquidity_score", self.liquidity_score)?,
      leverage_score:          decode_score("leverage_score", self.leverage_score)?,
      profitability_score:     decode_score("profitability_score", self.profitability_score)?,
      overall_credit_score:    decode_score("overall_credit_score", self.overall_credit_score)?,
      credit_rating:           self
        .credit_rating
        .as_deref()
        .map(CreditRating::from_code)
        .transpose()?,
      recommendation:          self
        .recommendation
        .as_deref()
        .map(Recommendation::from_code)
        .transpose()?,
      risk_summary:            self.risk_summary,
      analyst_notes:           self.analyst_notes,
      compliance_check_passed: flag_from_int(
        "credit_assessment",
        "compliance_check_passed",
        self.compliance_check_passed,
      )?,
      created_at:              decode_dt(&self.created_at)?,
    })
  }
}

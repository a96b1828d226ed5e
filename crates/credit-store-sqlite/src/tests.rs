//! Integration tests for `Database` and `Session` against real SQLite files
//! and in-memory databases.

use std::{
  sync::Arc,
  time::{Duration, Instant},
};

use chrono::{NaiveDate, TimeZone as _, Utc};
use credit_core::{
  assessment::{
    COMPONENT_SCORE_RANGE, CreditRating, NewCreditAssessment, OVERALL_SCORE_RANGE,
    Recommendation,
  },
  company::NewCompany,
  filing::{NewFiling, processed_from_code},
  period::FiscalPeriod,
  ratio::{NewRatio, RatioFigures},
  statement::{NewStatement, StatementFigures},
  store::UnitOfWork,
};
use tempfile::TempDir;

use crate::{Database, Error, HealthStatus, StoreConfig, TeardownConfirmation};

fn file_db() -> (TempDir, Database) {
  let dir = tempfile::tempdir().expect("tempdir");
  let db = Database::connect(StoreConfig::at(dir.path().join("credit.db"))).expect("connect");
  db.schema().provision().expect("provision");
  (dir, db)
}

fn memory_db() -> Database {
  let db = Database::open_in_memory().expect("in-memory store");
  db.schema().provision().expect("provision");
  db
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate { NaiveDate::from_ymd_opt(y, m, d).unwrap() }

fn apple() -> NewCompany {
  let mut c = NewCompany::new("AAPL", "Apple Inc.", "0000320193");
  c.sic_code = Some("3571".into());
  c.industry = Some("Electronic Computers".into());
  c.sector = Some("Technology".into());
  c
}

fn apple_10k() -> NewFiling {
  NewFiling::new(
    "AAPL",
    "10-K",
    2023,
    FiscalPeriod::FY,
    date(2023, 11, 3),
    "0000320193-23-000106",
  )
}

fn seed_apple(db: &Database) {
  db.transaction(|s| s.add_company(apple())).unwrap();
}

// ─── Companies ───────────────────────────────────────────────────────────────

#[test]
fn company_round_trip() {
  let (_dir, db) = file_db();

  let added = db.transaction(|s| s.add_company(apple())).unwrap();
  assert_eq!(added.ticker, "AAPL");
  assert_eq!(added.created_at, added.updated_at);

  let fetched = db.transaction(|s| s.company("AAPL")).unwrap().unwrap();
  assert_eq!(fetched, added);
  assert_eq!(fetched.name, "Apple Inc.");
  assert_eq!(fetched.cik, "0000320193");
  assert_eq!(fetched.sic_code.as_deref(), Some("3571"));
  assert_eq!(fetched.industry.as_deref(), Some("Electronic Computers"));
  assert_eq!(fetched.sector.as_deref(), Some("Technology"));
}

#[test]
fn missing_company_is_none() {
  let db = memory_db();
  assert!(db.transaction(|s| s.company("NOPE")).unwrap().is_none());
}

#[test]
fn invalid_company_is_rejected_before_the_engine() {
  let db = memory_db();
  let err = db
    .transaction(|s| s.add_company(NewCompany::new("AAPL", "Apple Inc.", "not-a-cik")))
    .unwrap_err();
  assert!(err.is_validation(), "{err}");
  assert!(db.transaction(|s| s.companies()).unwrap().is_empty());
}

#[test]
fn duplicate_ticker_is_a_constraint_violation() {
  let db = memory_db();
  seed_apple(&db);
  let err = db
    .transaction(|s| s.add_company(NewCompany::new("AAPL", "Other", "123")))
    .unwrap_err();
  assert!(err.is_constraint_violation(), "{err}");
}

#[test]
fn update_company_changes_descriptors() {
  let db = memory_db();
  seed_apple(&db);

  let updated = db
    .transaction(|s| {
      let mut c = s.company("AAPL")?.unwrap();
      c.sector = Some("Information Technology".into());
      s.update_company(&c)
    })
    .unwrap();
  assert_eq!(updated.sector.as_deref(), Some("Information Technology"));
  assert!(updated.updated_at >= updated.created_at);
}

#[test]
fn cik_is_immutable() {
  let db = memory_db();
  seed_apple(&db);

  let err = db
    .transaction(|s| {
      let mut c = s.company("AAPL")?.unwrap();
      c.cik = "999".into();
      s.update_company(&c)
    })
    .unwrap_err();
  assert!(err.is_constraint_violation(), "{err}");

  let stored = db.transaction(|s| s.company("AAPL")).unwrap().unwrap();
  assert_eq!(stored.cik, "0000320193");
}

#[test]
fn update_of_unknown_company_is_not_found() {
  let db = memory_db();
  seed_apple(&db);
  let mut ghost = db.transaction(|s| s.company("AAPL")).unwrap().unwrap();
  ghost.ticker = "MSFT".into();
  let err = db.transaction(|s| s.update_company(&ghost)).unwrap_err();
  assert!(matches!(err, Error::NotFound { entity: "company", .. }), "{err}");
}

#[test]
fn delete_company_removes_dependents() {
  let db = memory_db();
  seed_apple(&db);
  db.transaction(|s| {
    s.add_filing(apple_10k())?;
    s.add_statement(NewStatement::new("AAPL", 2023, FiscalPeriod::FY, date(2023, 11, 3)))?;
    s.add_statement(NewStatement::new("AAPL", 2023, FiscalPeriod::Q4, date(2023, 11, 3)))?;
    s.add_ratio(NewRatio::new("AAPL", 2023))?;
    s.add_assessment(NewCreditAssessment::new("AAPL"))
  })
  .unwrap();

  let deleted = db.transaction(|s| s.delete_company("AAPL")).unwrap();
  assert_eq!(deleted.companies, 1);
  assert_eq!(deleted.filings, 1);
  assert_eq!(deleted.statements, 2);
  assert_eq!(deleted.ratios, 1);
  assert_eq!(deleted.assessments, 1);
  assert_eq!(deleted.total(), 6);
  assert!(db.transaction(|s| s.snapshot("AAPL")).unwrap().is_none());
}

// ─── Filings ─────────────────────────────────────────────────────────────────

#[test]
fn duplicate_accession_number_is_rejected() {
  let (_dir, db) = file_db();
  seed_apple(&db);
  let first = db.transaction(|s| s.add_filing(apple_10k())).unwrap();

  let mut dup = apple_10k();
  dup.filing_type = "10-Q".into();
  dup.fiscal_period = FiscalPeriod::Q3;
  let err = db.transaction(|s| s.add_filing(dup)).unwrap_err();
  assert!(err.is_constraint_violation(), "{err}");
  assert!(!err.is_transient());

  let stored = db
    .transaction(|s| s.filing("0000320193-23-000106"))
    .unwrap()
    .unwrap();
  assert_eq!(stored, first);
  assert_eq!(stored.filing_type, "10-K");
}

#[test]
fn second_filing_for_the_same_period_is_rejected() {
  let db = memory_db();
  seed_apple(&db);

  let err = db
    .transaction(|s| {
      s.add_filing(apple_10k())?;
      s.add_filing(NewFiling::new(
        "AAPL",
        "10-K",
        2023,
        FiscalPeriod::FY,
        date(2023, 11, 10),
        "0000320193-23-000999",
      ))
    })
    .unwrap_err();
  assert!(err.is_constraint_violation(), "{err}");
  assert!(db.transaction(|s| s.filings_for("AAPL")).unwrap().is_empty());

  // Other periods of the same year are separate filings.
  db.transaction(|s| {
    s.add_filing(apple_10k())?;
    s.add_filing(NewFiling::new(
      "AAPL",
      "10-Q",
      2023,
      FiscalPeriod::Q3,
      date(2023, 8, 4),
      "0000320193-23-000077",
    ))
  })
  .unwrap();
  assert_eq!(db.transaction(|s| s.filings_for("AAPL")).unwrap().len(), 2);
}

#[test]
fn unknown_ticker_is_rejected() {
  let db = memory_db();
  let err = db.transaction(|s| s.add_filing(apple_10k())).unwrap_err();
  assert!(err.is_validation(), "{err}");
  assert!(matches!(err, Error::Validation(credit_core::Error::UnknownTicker(ref t)) if t == "AAPL"));

  let err = db.transaction(|s| s.add_ratio(NewRatio::new("AAPL", 2023))).unwrap_err();
  assert!(err.is_validation(), "{err}");
}

#[test]
fn processed_flag_is_zero_or_one() {
  let db = memory_db();
  seed_apple(&db);
  db.transaction(|s| s.add_filing(apple_10k())).unwrap();

  assert!(processed_from_code(2).is_err());

  let err = db
    .transaction(|s| {
      s.connection()
        .execute("UPDATE sec_filings SET processed = 2", [])
        .map_err(Error::from)
    })
    .unwrap_err();
  assert!(err.is_constraint_violation(), "{err}");

  let filing = db.transaction(|s| s.filing("0000320193-23-000106")).unwrap().unwrap();
  assert!(!filing.processed);
}

#[test]
fn processing_queue() {
  let db = memory_db();
  seed_apple(&db);
  db.transaction(|s| {
    s.add_filing(apple_10k())?;
    s.add_filing(NewFiling::new(
      "AAPL",
      "10-Q",
      2023,
      FiscalPeriod::Q3,
      date(2023, 8, 4),
      "0000320193-23-000077",
    ))
  })
  .unwrap();

  let queue = db.transaction(|s| s.unprocessed_filings(10)).unwrap();
  let order: Vec<_> = queue.iter().map(|f| f.filing_type.as_str()).collect();
  assert_eq!(order, ["10-Q", "10-K"]);

  let done = db
    .transaction(|s| s.set_filing_processed("0000320193-23-000077", true))
    .unwrap();
  assert!(done.processed);

  let queue = db.transaction(|s| s.unprocessed_filings(10)).unwrap();
  assert_eq!(queue.len(), 1);
  assert_eq!(queue[0].accession_number, "0000320193-23-000106");

  let err = db.transaction(|s| s.set_filing_processed("missing", true)).unwrap_err();
  assert!(matches!(err, Error::NotFound { .. }), "{err}");
}

#[test]
fn upsert_keeps_processed_flag() {
  let db = memory_db();
  seed_apple(&db);
  db.transaction(|s| {
    s.add_filing(apple_10k())?;
    s.set_filing_processed("0000320193-23-000106", true)
  })
  .unwrap();

  let mut revised = apple_10k();
  revised.document_url = Some("https://www.sec.gov/Archives/aapl-20230930.htm".into());
  let upserted = db.transaction(|s| s.upsert_filing(revised)).unwrap();
  assert!(upserted.processed);
  assert!(upserted.document_url.is_some());
  assert_eq!(db.transaction(|s| s.filings_for("AAPL")).unwrap().len(), 1);
}

#[test]
fn upsert_cannot_move_a_filing_to_another_company() {
  let db = memory_db();
  seed_apple(&db);
  db.transaction(|s| {
    s.add_company(NewCompany::new("MSFT", "Microsoft Corp.", "789019"))?;
    s.add_filing(apple_10k())
  })
  .unwrap();

  let mut stolen = apple_10k();
  stolen.ticker = "MSFT".into();
  let err = db.transaction(|s| s.upsert_filing(stolen)).unwrap_err();
  assert!(err.is_constraint_violation(), "{err}");
}

// ─── Statements, ratios, assessments ────────────────────────────────────────

#[test]
fn statements_are_ordered_within_a_year() {
  let db = memory_db();
  seed_apple(&db);
  db.transaction(|s| {
    for period in [FiscalPeriod::FY, FiscalPeriod::Q2, FiscalPeriod::Q1] {
      s.add_statement(NewStatement::new("AAPL", 2023, period, date(2023, 11, 3)))?;
    }
    s.add_statement(NewStatement::new("AAPL", 2022, FiscalPeriod::FY, date(2022, 10, 28)))
  })
  .unwrap();

  let periods: Vec<_> = db
    .transaction(|s| s.statements_for("AAPL"))
    .unwrap()
    .into_iter()
    .map(|st| (st.fiscal_year, st.fiscal_period))
    .collect();
  assert_eq!(periods, [
    (2022, FiscalPeriod::FY),
    (2023, FiscalPeriod::Q1),
    (2023, FiscalPeriod::Q2),
    (2023, FiscalPeriod::FY),
  ]);
}

#[test]
fn duplicate_statement_period_is_rejected() {
  let db = memory_db();
  seed_apple(&db);
  let statement = || NewStatement::new("AAPL", 2023, FiscalPeriod::FY, date(2023, 11, 3));
  db.transaction(|s| s.add_statement(statement())).unwrap();
  let err = db.transaction(|s| s.add_statement(statement())).unwrap_err();
  assert!(err.is_constraint_violation(), "{err}");
}

#[test]
fn statement_correction() {
  let db = memory_db();
  seed_apple(&db);
  let original = db
    .transaction(|s| {
      s.add_statement(
        NewStatement::new("AAPL", 2023, FiscalPeriod::FY, date(2023, 11, 3)).with_figures(
          StatementFigures { revenue: Some(383_285.0), ..Default::default() },
        ),
      )
    })
    .unwrap();

  let mut corrected = original.clone();
  corrected.figures.net_income = Some(96_995.0);
  let stored = db.transaction(|s| s.update_statement(&corrected)).unwrap();
  assert_eq!(stored.figures.revenue, Some(383_285.0));
  assert_eq!(stored.figures.net_income, Some(96_995.0));
  assert_eq!(stored.figures.populated(), 2);
  assert_eq!(stored.created_at, original.created_at);

  assert!(db.transaction(|s| s.delete_statement(stored.id)).unwrap());
  assert!(!db.transaction(|s| s.delete_statement(stored.id)).unwrap());
  let err = db.transaction(|s| s.update_statement(&corrected)).unwrap_err();
  assert!(matches!(err, Error::NotFound { .. }), "{err}");
}

#[test]
fn non_finite_figures_never_reach_the_engine() {
  let db = memory_db();
  seed_apple(&db);

  let err = db
    .transaction(|s| {
      s.add_statement(
        NewStatement::new("AAPL", 2023, FiscalPeriod::FY, date(2023, 11, 3)).with_figures(
          StatementFigures { revenue: Some(f64::NAN), ..Default::default() },
        ),
      )
    })
    .unwrap_err();
  assert!(err.is_validation(), "{err}");

  let err = db
    .transaction(|s| {
      s.add_ratio(NewRatio::new("AAPL", 2023).with_figures(RatioFigures {
        interest_coverage: Some(f64::INFINITY),
        ..Default::default()
      }))
    })
    .unwrap_err();
  assert!(err.is_validation(), "{err}");

  let mut statement = db
    .transaction(|s| {
      s.add_statement(NewStatement::new("AAPL", 2023, FiscalPeriod::FY, date(2023, 11, 3)))
    })
    .unwrap();
  statement.figures.ebit = Some(f64::NEG_INFINITY);
  let err = db.transaction(|s| s.update_statement(&statement)).unwrap_err();
  assert!(err.is_validation(), "{err}");
  let stored = db
    .transaction(|s| s.statement("AAPL", 2023, FiscalPeriod::FY))
    .unwrap()
    .unwrap();
  assert_eq!(stored.figures.populated(), 0);
}

#[test]
fn far_future_dates_are_rejected_before_insert() {
  let db = memory_db();
  seed_apple(&db);
  let far = Utc.with_ymd_and_hms(10_000, 1, 1, 0, 0, 0).unwrap();

  let mut assessment = NewCreditAssessment::new("AAPL");
  assessment.assessment_date = Some(far);
  let err = db.transaction(|s| s.add_assessment(assessment)).unwrap_err();
  assert!(err.is_validation(), "{err}");

  let mut ratio = NewRatio::new("AAPL", 2023);
  ratio.calculation_date = Some(far);
  let err = db.transaction(|s| s.add_ratio(ratio)).unwrap_err();
  assert!(err.is_validation(), "{err}");
}

#[test]
fn latest_ratio_prefers_highest_year() {
  let db = memory_db();
  seed_apple(&db);
  db.transaction(|s| {
    s.add_ratio(NewRatio::new("AAPL", 2023).with_figures(RatioFigures {
      current_ratio: Some(0.99),
      ..Default::default()
    }))?;
    s.add_ratio(NewRatio::new("AAPL", 2022).with_figures(RatioFigures {
      current_ratio: Some(0.88),
      ..Default::default()
    }))
  })
  .unwrap();

  let latest = db.transaction(|s| s.latest_ratio("AAPL")).unwrap().unwrap();
  assert_eq!(latest.fiscal_year, 2023);
  assert_eq!(latest.figures.current_ratio, Some(0.99));
  assert_eq!(db.transaction(|s| s.ratios_for("AAPL")).unwrap()[0].fiscal_year, 2022);
}

#[test]
fn score_bounds_are_enforced_by_the_engine() {
  let db = memory_db();
  seed_apple(&db);
  let mut assessment = NewCreditAssessment::new("AAPL");
  assessment.overall_credit_score = Some(OVERALL_SCORE_RANGE.end() + 1);
  let err = db.transaction(|s| s.add_assessment(assessment)).unwrap_err();
  assert!(err.is_constraint_violation(), "{err}");

  let mut assessment = NewCreditAssessment::new("AAPL");
  assessment.liquidity_score = Some(COMPONENT_SCORE_RANGE.start() - 1);
  let err = db.transaction(|s| s.add_assessment(assessment)).unwrap_err();
  assert!(err.is_constraint_violation(), "{err}");

  let mut assessment = NewCreditAssessment::new("AAPL");
  assessment.leverage_score = Some(COMPONENT_SCORE_RANGE.end() + 1);
  let err = db.transaction(|s| s.add_assessment(assessment)).unwrap_err();
  assert!(err.is_constraint_violation(), "{err}");

  let mut assessment = NewCreditAssessment::new("AAPL");
  assessment.liquidity_score = Some(*COMPONENT_SCORE_RANGE.end());
  assessment.overall_credit_score = Some(*OVERALL_SCORE_RANGE.start());
  assert!(db.transaction(|s| s.add_assessment(assessment)).is_ok());
}

// ─── Scenario ────────────────────────────────────────────────────────────────

#[test]
fn aapl_lifecycle_snapshot() {
  let (_dir, db) = file_db();

  db.transaction(|s| {
    s.add_company(apple())?;
    s.add_filing(apple_10k())?;
    s.add_statement(
      NewStatement::new("AAPL", 2023, FiscalPeriod::FY, date(2023, 11, 3)).with_figures(
        StatementFigures {
          total_assets: Some(352_583.0),
          total_liabilities: Some(290_437.0),
          shareholders_equity: Some(62_146.0),
          revenue: Some(383_285.0),
          net_income: Some(96_995.0),
          ..Default::default()
        },
      ),
    )?;
    s.add_ratio(NewRatio::new("AAPL", 2023).with_figures(RatioFigures {
      current_ratio: Some(0.99),
      debt_to_equity: Some(1.79),
      altman_z_score: Some(7.2),
      ..Default::default()
    }))?;
    let mut assessment = NewCreditAssessment::new("AAPL");
    assessment.liquidity_score = Some(6);
    assessment.leverage_score = Some(7);
    assessment.profitability_score = Some(10);
    assessment.overall_credit_score = Some(85);
    assessment.credit_rating = Some(CreditRating::AA);
    assessment.recommendation = Some(Recommendation::Approve);
    assessment.compliance_check_passed = true;
    s.add_assessment(assessment)
  })
  .unwrap();

  let snap = db.transaction(|s| s.snapshot("AAPL")).unwrap().unwrap();
  assert_eq!(snap.company.cik, "0000320193");
  assert_eq!(snap.filings.len(), 1);
  assert_eq!(snap.filings[0].accession_number, "0000320193-23-000106");
  assert!(!snap.filings[0].processed);
  assert_eq!(snap.statements.len(), 1);
  assert_eq!(snap.statements[0].figures.net_income, Some(96_995.0));
  assert_eq!(snap.statements[0].figures.ebit, None);
  assert_eq!(snap.ratios.len(), 1);
  assert_eq!(snap.ratios[0].figures.altman_z_score, Some(7.2));
  assert_eq!(snap.assessments.len(), 1);

  let assessment = &snap.assessments[0];
  assert_eq!(assessment.credit_rating, Some(CreditRating::AA));
  assert_eq!(assessment.recommendation, Some(Recommendation::Approve));
  assert_eq!(assessment.overall_credit_score, Some(85));
  assert!(assessment.compliance_check_passed);

  let latest = db.transaction(|s| s.latest_assessment("AAPL")).unwrap().unwrap();
  assert_eq!(&latest, assessment);
}

// ─── Sessions ────────────────────────────────────────────────────────────────

#[test]
fn failed_unit_of_work_leaves_nothing_behind() {
  let (_dir, db) = file_db();
  seed_apple(&db);
  db.transaction(|s| s.add_filing(apple_10k())).unwrap();

  let err = db
    .transaction(|s| {
      s.add_statement(NewStatement::new("AAPL", 2023, FiscalPeriod::FY, date(2023, 11, 3)))?;
      s.add_filing(apple_10k())
    })
    .unwrap_err();
  assert!(err.is_constraint_violation(), "{err}");
  assert!(db.transaction(|s| s.statements_for("AAPL")).unwrap().is_empty());
}

#[test]
fn swallowed_failure_still_aborts_commit() {
  let db = memory_db();
  seed_apple(&db);

  let session = db.get_session().unwrap();
  session
    .add_statement(NewStatement::new("AAPL", 2023, FiscalPeriod::FY, date(2023, 11, 3)))
    .unwrap();
  assert!(session.add_filing(NewFiling::new(
    "MSFT", "10-K", 2023, FiscalPeriod::FY, date(2023, 7, 27), "0000950170-23-035122",
  ))
  .is_err());

  let err = session.commit().unwrap_err();
  assert!(matches!(err, Error::SessionAborted(_)), "{err}");
  assert!(db.transaction(|s| s.statements_for("AAPL")).unwrap().is_empty());
}

#[test]
fn explicit_rollback_discards_writes() {
  let db = memory_db();
  let session = db.get_session().unwrap();
  session.add_company(apple()).unwrap();
  session.rollback().unwrap();
  assert!(db.transaction(|s| s.company("AAPL")).unwrap().is_none());
}

#[test]
fn dropped_session_rolls_back_and_releases_its_connection() {
  // The in-memory pool holds one connection, so a leaked session would make
  // every later acquisition time out.
  let db = memory_db();
  {
    let session = db.get_session().unwrap();
    session.add_company(apple()).unwrap();
  }
  assert!(db.transaction(|s| s.company("AAPL")).unwrap().is_none());

  let session = db.get_session().unwrap();
  session.add_company(apple()).unwrap();
  session.commit().unwrap();
  assert!(db.transaction(|s| s.company("AAPL")).unwrap().is_some());

  let status = db.pool_status();
  assert_eq!(status.max_connections, 1);
  assert_eq!(status.idle, 1);
}

#[test]
fn panic_inside_transaction_rolls_back() {
  let db = memory_db();
  let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
    db.transaction(|s| -> crate::Result<()> {
      s.add_company(apple())?;
      panic!("producer crashed")
    })
  }));
  assert!(result.is_err());
  assert!(db.transaction(|s| s.company("AAPL")).unwrap().is_none());
}

#[test]
fn concurrent_sessions_from_threads() {
  let (_dir, db) = file_db();
  let db = Arc::new(db);

  let handles: Vec<_> = (0..8)
    .map(|i| {
      let db = Arc::clone(&db);
      std::thread::spawn(move || {
        db.transaction(|s| {
          s.add_company(NewCompany::new(format!("T{i}"), format!("Company {i}"), format!("{}", 1000 + i)))
        })
      })
    })
    .collect();

  for handle in handles {
    handle.join().expect("thread panicked").expect("insert");
  }
  assert_eq!(db.transaction(|s| s.companies()).unwrap().len(), 8);
}

#[tokio::test]
async fn call_runs_off_the_runtime() {
  let db = memory_db();
  let added = db.call(|s| s.add_company(apple())).await.unwrap();
  let fetched = db.call(|s| s.company("AAPL")).await.unwrap();
  assert_eq!(fetched, Some(added));
}

#[test]
fn close_all_refuses_new_sessions() {
  let (_dir, db) = file_db();
  db.close_all();
  db.close_all();

  let err = db.get_session().unwrap_err();
  assert!(matches!(err, Error::PoolClosed), "{err}");
  assert!(err.is_connectivity());
  assert!(db.pool_status().closed);
  assert_eq!(db.health_check().status, HealthStatus::Unhealthy);
}

// ─── Health ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn healthy_store_reports_healthy() {
  let (_dir, db) = file_db();
  let report = db.health().await;
  assert!(report.is_healthy(), "{:?}", report.error);
  assert!(report.error.is_none());
}

#[test]
fn unreachable_store_is_unhealthy_within_timeout() {
  let dir = tempfile::tempdir().unwrap();
  let config = StoreConfig {
    health_timeout_ms: 300,
    connect_timeout_ms: 300,
    ..StoreConfig::at(dir.path().join("missing").join("credit.db"))
  };
  let db = Database::connect(config).expect("connect does not touch the file");

  let started = Instant::now();
  let report = db.health_check();
  assert_eq!(report.status, HealthStatus::Unhealthy);
  assert!(report.error.is_some());
  assert!(started.elapsed() < Duration::from_secs(5));

  let err = db.get_session().unwrap_err();
  assert!(err.is_transient(), "{err}");
}

// ─── Schema ──────────────────────────────────────────────────────────────────

#[test]
fn provision_is_idempotent() {
  let (_dir, db) = file_db();
  let schema = db.schema();
  let before = schema.describe().unwrap();
  schema.provision().unwrap();
  assert_eq!(schema.describe().unwrap(), before);
  assert_eq!(schema.version().unwrap(), crate::SCHEMA_VERSION);
  assert!(schema.is_provisioned().unwrap());

  let tables = before.iter().filter(|o| o.kind == "table").count();
  assert_eq!(tables, crate::TABLES.len());
  assert!(before.iter().any(|o| o.kind == "trigger"));
}

#[test]
fn provision_keeps_existing_rows() {
  let (_dir, db) = file_db();
  seed_apple(&db);
  db.schema().provision().unwrap();
  assert!(db.transaction(|s| s.company("AAPL")).unwrap().is_some());
}

#[test]
fn teardown_requires_matching_confirmation() {
  let (_dir, db) = file_db();
  let schema = db.schema();

  let err = schema
    .teardown(TeardownConfirmation::for_database("production.db"))
    .unwrap_err();
  assert!(matches!(err, Error::TeardownNotConfirmed { .. }), "{err}");
  assert!(schema.is_provisioned().unwrap());

  schema
    .teardown(TeardownConfirmation::for_database("credit.db"))
    .unwrap();
  assert!(!schema.is_provisioned().unwrap());
  assert_eq!(schema.version().unwrap(), 0);
}

#[test]
fn read_only_teardown_fails_and_keeps_schema() {
  let (dir, db) = file_db();
  seed_apple(&db);
  db.close_all();
  drop(db);

  let config = StoreConfig { read_only: true, ..StoreConfig::at(dir.path().join("credit.db")) };
  let ro = Database::connect(config).unwrap();
  let err = ro
    .schema()
    .teardown(TeardownConfirmation::for_database("credit.db"))
    .unwrap_err();
  assert!(matches!(err, Error::Schema { operation: "teardown", .. }), "{err}");

  assert!(ro.schema().is_provisioned().unwrap());
  assert!(ro.transaction(|s| s.company("AAPL")).unwrap().is_some());
}

//! Error type for `credit-store-sqlite`.

use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The store could not be reached: pool exhausted, file cannot be opened,
  /// engine busy. Safe for the caller to retry.
  #[error("connectivity error: {0}")]
  Connectivity(#[source] Box<dyn std::error::Error + Send + Sync>),

  /// [`Database::close_all`](crate::Database::close_all) has run.
  #[error("connection pool is closed")]
  PoolClosed,

  #[error("validation error: {0}")]
  Validation(#[from] credit_core::Error),

  /// Unique, check or immutability breach, with the engine's message.
  #[error("constraint violation: {0}")]
  ConstraintViolation(String),

  #[error("schema {operation} failed: {source}")]
  Schema {
    operation: &'static str,
    #[source]
    source:    Box<Error>,
  },

  #[error("teardown of {expected:?} not confirmed (confirmation named {given:?})")]
  TeardownNotConfirmed { expected: String, given: String },

  /// An operation inside the session failed earlier, so its commit was
  /// turned into a rollback.
  #[error("session rolled back after an earlier failure: {0}")]
  SessionAborted(String),

  #[error("{entity} not found: {key}")]
  NotFound { entity: &'static str, key: String },

  #[error("database error: {0}")]
  Database(#[source] rusqlite::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("blocking task failed: {0}")]
  Task(#[from] tokio::task::JoinError),
}

impl Error {
  /// Whether retrying the same unit of work might succeed.
  ///
  /// Only connectivity failures qualify; a constraint violation repeats on
  /// every identical attempt.
  pub fn is_transient(&self) -> bool { matches!(self, Error::Connectivity(_)) }

  /// Connectivity failures plus a closed pool.
  pub fn is_connectivity(&self) -> bool {
    matches!(self, Error::Connectivity(_) | Error::PoolClosed)
  }

  pub fn is_constraint_violation(&self) -> bool {
    matches!(self, Error::ConstraintViolation(_))
  }

  pub fn is_validation(&self) -> bool { matches!(self, Error::Validation(_)) }

  pub(crate) fn schema(operation: &'static str, source: Error) -> Self {
    Error::Schema { operation, source: Box::new(source) }
  }

  pub(crate) fn not_found(entity: &'static str, key: impl ToString) -> Self {
    Error::NotFound { entity, key: key.to_string() }
  }
}

impl From<rusqlite::Error> for Error {
  fn from(err: rusqlite::Error) -> Self {
    let code = match &err {
      rusqlite::Error::SqliteFailure(e, _) => e.code,
      _ => return Error::Database(err),
    };
    match code {
      ErrorCode::ConstraintViolation => Error::ConstraintViolation(err.to_string()),
      ErrorCode::CannotOpen
      | ErrorCode::DatabaseBusy
      | ErrorCode::DatabaseLocked
      | ErrorCode::SystemIoFailure
      | ErrorCode::NotADatabase => Error::Connectivity(Box::new(err)),
      _ => Error::Database(err),
    }
  }
}

impl From<r2d2::Error> for Error {
  fn from(err: r2d2::Error) -> Self { Error::Connectivity(Box::new(err)) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

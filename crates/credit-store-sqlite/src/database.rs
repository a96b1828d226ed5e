//! [`Database`]: the connection pool and the sessions it hands out.

use std::{
  sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
  },
  time::{Duration, Instant},
};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::OpenFlags;
use serde::{Serialize, Serializer};
use uuid::Uuid;

use crate::{Error, Result, Session, StoreConfig, schema::SchemaManager};

type SqlitePool = r2d2::Pool<SqliteConnectionManager>;
pub(crate) type PooledConnection = r2d2::PooledConnection<SqliteConnectionManager>;

// ─── Health ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
  Healthy,
  Unhealthy,
}

/// Outcome of [`Database::health_check`].
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
  pub status:     HealthStatus,
  /// Time spent acquiring a connection and running the probe.
  #[serde(rename = "latency_ms", serialize_with = "as_millis")]
  pub latency:    Duration,
  /// Why the probe failed, for unhealthy reports.
  pub error:      Option<String>,
  pub checked_at: DateTime<Utc>,
}

impl HealthReport {
  pub fn is_healthy(&self) -> bool { self.status == HealthStatus::Healthy }
}

fn as_millis<S: Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
  s.serialize_f64(d.as_secs_f64() * 1_000.0)
}

/// Snapshot of pool occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolStatus {
  pub connections:     u32,
  pub idle:            u32,
  pub max_connections: u32,
  pub closed:          bool,
}

// ─── Database ────────────────────────────────────────────────────────────────

/// Handle to a credit store: a pool of SQLite connections plus its
/// configuration.
///
/// Construct one at startup with [`Database::connect`] and pass it to whoever
/// needs sessions; there is no process-global instance. Cloning is cheap and
/// every clone shares the same pool. [`Database::close_all`] shuts the pool for
/// all clones.
#[derive(Clone)]
pub struct Database {
  inner: Arc<Inner>,
}

struct Inner {
  pool:         RwLock<Option<SqlitePool>>,
  config:       StoreConfig,
  next_session: AtomicU64,
}

impl Database {
  /// Build the connection pool for `config`.
  ///
  /// The database does not need to be reachable yet: connections are opened
  /// in the background and on demand, and failures surface from
  /// [`get_session`](Self::get_session) or [`health_check`](Self::health_check).
  pub fn connect(config: StoreConfig) -> Result<Self> {
    let max_size = if config.is_in_memory() { 1 } else { config.max_connections() };
    let min_idle = if config.is_in_memory() { 1 } else { config.pool_size.min(max_size) };

    // The in-memory database lives only as long as its one connection, so
    // that connection is never recycled.
    let (idle_timeout, max_lifetime) = if config.is_in_memory() {
      (None, None)
    } else {
      (Some(Duration::from_secs(600)), Some(Duration::from_secs(1800)))
    };

    let pool = r2d2::Pool::builder()
      .max_size(max_size)
      .idle_timeout(idle_timeout)
      .max_lifetime(max_lifetime)
      .min_idle(Some(min_idle))
      .connection_timeout(config.connect_timeout().max(Duration::from_millis(1)))
      .test_on_check_out(true)
      .build_unchecked(connection_manager(&config));

    tracing::info!(
      database = %config.database_name(),
      max_connections = max_size,
      read_only = config.read_only,
      "connection pool created"
    );

    Ok(Self {
      inner: Arc::new(Inner {
        pool: RwLock::new(Some(pool)),
        config,
        next_session: AtomicU64::new(1),
      }),
    })
  }

  /// Pool over a fresh private in-memory database. The pool holds a single
  /// connection, so sessions on it are strictly sequential.
  pub fn open_in_memory() -> Result<Self> { Self::connect(StoreConfig::in_memory()) }

  pub fn config(&self) -> &StoreConfig { &self.inner.config }

  pub fn schema(&self) -> SchemaManager { SchemaManager::new(self.clone()) }

  // ── Sessions ──────────────────────────────────────────────────────────

  /// Check out a connection and begin a transaction on it.
  ///
  /// Blocks for up to `connect_timeout` when every connection is in use. The
  /// session must be committed explicitly; dropping it rolls back.
  pub fn get_session(&self) -> Result<Session> {
    let conn = self.connection()?;
    let id = self.inner.next_session.fetch_add(1, Ordering::Relaxed);
    Session::begin(conn, id, self.inner.config.read_only)
  }

  /// Run `f` as one unit of work.
  ///
  /// Commits when `f` returns `Ok`; rolls back and returns the error from `f`
  /// otherwise. A panic inside `f` also rolls back.
  pub fn transaction<T, F>(&self, f: F) -> Result<T>
  where
    F: FnOnce(&Session) -> Result<T>,
  {
    let session = self.get_session()?;
    match f(&session) {
      Ok(value) => {
        session.commit()?;
        Ok(value)
      }
      Err(err) => {
        if let Err(rollback_err) = session.rollback() {
          tracing::warn!(error = %rollback_err, "rollback after failed unit of work also failed");
        }
        Err(err)
      }
    }
  }

  /// [`transaction`](Self::transaction) on tokio's blocking thread pool.
  pub async fn call<T, F>(&self, f: F) -> Result<T>
  where
    F: FnOnce(&Session) -> Result<T> + Send + 'static,
    T: Send + 'static,
  {
    let db = self.clone();
    tokio::task::spawn_blocking(move || db.transaction(f)).await?
  }

  // ── Health ────────────────────────────────────────────────────────────

  /// Round-trip `SELECT 1` against the store.
  ///
  /// Never fails: an unreachable or closed store yields an unhealthy report
  /// once `health_timeout` has elapsed.
  pub fn health_check(&self) -> HealthReport {
    let started = Instant::now();
    let outcome = self.probe();
    let latency = started.elapsed();

    match outcome {
      Ok(()) => HealthReport {
        status: HealthStatus::Healthy,
        latency,
        error: None,
        checked_at: Utc::now(),
      },
      Err(e) => {
        tracing::warn!(error = %e, latency_ms = latency.as_millis() as u64, "database health check failed");
        HealthReport {
          status: HealthStatus::Unhealthy,
          latency,
          error: Some(e.to_string()),
          checked_at: Utc::now(),
        }
      }
    }
  }

  /// [`health_check`](Self::health_check) on tokio's blocking thread pool.
  pub async fn health(&self) -> HealthReport {
    let db = self.clone();
    match tokio::task::spawn_blocking(move || db.health_check()).await {
      Ok(report) => report,
      Err(e) => HealthReport {
        status: HealthStatus::Unhealthy,
        latency: Duration::ZERO,
        error: Some(format!("health probe task failed: {e}")),
        checked_at: Utc::now(),
      },
    }
  }

  fn probe(&self) -> Result<()> {
    let pool = self.pool()?;
    let timeout = self.inner.config.health_timeout().max(Duration::from_millis(1));
    let conn = pool.get_timeout(timeout)?;
    let one: i64 = conn.query_row("SELECT 1", [], |r| r.get(0))?;
    if one != 1 {
      return Err(Error::Connectivity(format!("probe returned {one}").into()));
    }
    Ok(())
  }

  // ── Pool ──────────────────────────────────────────────────────────────

  pub fn pool_status(&self) -> PoolStatus {
    let max_connections = if self.inner.config.is_in_memory() {
      1
    } else {
      self.inner.config.max_connections()
    };
    match self.inner.pool.read().as_ref() {
      Some(pool) => {
        let state = pool.state();
        PoolStatus {
          connections: state.connections,
          idle: state.idle_connections,
          max_connections,
          closed: false,
        }
      }
      None => PoolStatus { connections: 0, idle: 0, max_connections, closed: true },
    }
  }

  /// Drain and close the pool. Later sessions fail with [`Error::PoolClosed`];
  /// sessions already checked out finish normally and their connections are
  /// closed when they are released. Idempotent.
  pub fn close_all(&self) {
    if let Some(pool) = self.inner.pool.write().take() {
      let state = pool.state();
      tracing::info!(
        database = %self.inner.config.database_name(),
        connections = state.connections,
        idle = state.idle_connections,
        "connection pool closed"
      );
    }
  }

  fn pool(&self) -> Result<SqlitePool> {
    self.inner.pool.read().clone().ok_or(Error::PoolClosed)
  }

  /// A bare pooled connection outside any session.
  pub(crate) fn connection(&self) -> Result<PooledConnection> {
    Ok(self.pool()?.get()?)
  }
}

fn connection_manager(config: &StoreConfig) -> SqliteConnectionManager {
  let mut flags = OpenFlags::SQLITE_OPEN_NO_MUTEX | OpenFlags::SQLITE_OPEN_URI;
  flags |= if config.read_only {
    OpenFlags::SQLITE_OPEN_READ_ONLY
  } else {
    OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE
  };

  let manager = if config.is_in_memory() {
    // A named shared-cache database lives as long as one connection is open.
    SqliteConnectionManager::file(format!(
      "file:credit-{}?mode=memory&cache=shared",
      Uuid::new_v4().simple()
    ))
  } else {
    SqliteConnectionManager::file(&config.path)
  };

  let busy_timeout = config.busy_timeout();
  manager
    .with_flags(flags)
    .with_init(move |conn| conn.busy_timeout(busy_timeout))
}

//! Store configuration.
//!
//! Deserialised by the caller (the admin binary uses the `config` crate); every
//! field except `path` has a default.

use std::{path::PathBuf, time::Duration};

use serde::Deserialize;

/// Path value selecting a private in-memory database instead of a file.
pub const IN_MEMORY: &str = ":memory:";

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
  /// SQLite file, or `:memory:`.
  #[serde(default = "default_path")]
  pub path:              PathBuf,
  /// Connections kept open while idle.
  #[serde(default = "default_pool_size")]
  pub pool_size:         u32,
  /// Extra connections opened under load, on top of `pool_size`.
  #[serde(default = "default_max_overflow")]
  pub max_overflow:      u32,
  /// How long session acquisition waits for a free connection.
  #[serde(default = "default_connect_timeout_ms")]
  pub connect_timeout_ms: u64,
  /// Upper bound on a health probe, acquisition included.
  #[serde(default = "default_health_timeout_ms")]
  pub health_timeout_ms: u64,
  /// How long a statement waits on another writer's lock.
  #[serde(default = "default_busy_timeout_ms")]
  pub busy_timeout_ms:   u64,
  /// Open connections read-only; every write fails.
  #[serde(default)]
  pub read_only:         bool,
}

fn default_path() -> PathBuf { PathBuf::from("credit_analyst.db") }
fn default_pool_size() -> u32 { 5 }
fn default_max_overflow() -> u32 { 10 }
fn default_connect_timeout_ms() -> u64 { 30_000 }
fn default_health_timeout_ms() -> u64 { 2_000 }
fn default_busy_timeout_ms() -> u64 { 5_000 }

impl Default for StoreConfig {
  fn default() -> Self {
    Self {
      path:               default_path(),
      pool_size:          default_pool_size(),
      max_overflow:       default_max_overflow(),
      connect_timeout_ms: default_connect_timeout_ms(),
      health_timeout_ms:  default_health_timeout_ms(),
      busy_timeout_ms:    default_busy_timeout_ms(),
      read_only:          false,
    }
  }
}

impl StoreConfig {
  pub fn at(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into(), ..Self::default() }
  }

  /// A private in-memory store, shared by all connections of one pool.
  pub fn in_memory() -> Self {
    Self::at(IN_MEMORY)
  }

  pub fn is_in_memory(&self) -> bool { self.path.as_os_str() == IN_MEMORY }

  /// Name an operator must repeat to confirm a teardown: the file name of
  /// the database, or `memory`.
  pub fn database_name(&self) -> String {
    if self.is_in_memory() {
      return "memory".to_owned();
    }
    self
      .path
      .file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .unwrap_or_else(|| self.path.to_string_lossy().into_owned())
  }

  /// Total connections the pool may hold.
  pub fn max_connections(&self) -> u32 {
    self.pool_size.saturating_add(self.max_overflow).max(1)
  }

  pub fn connect_timeout(&self) -> Duration { Duration::from_millis(self.connect_timeout_ms) }

  pub fn health_timeout(&self) -> Duration { Duration::from_millis(self.health_timeout_ms) }

  pub fn busy_timeout(&self) -> Duration { Duration::from_millis(self.busy_timeout_ms) }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_mirror_pool_sizing() {
    let cfg = StoreConfig::default();
    assert_eq!(cfg.max_connections(), 15);
    assert_eq!(cfg.database_name(), "credit_analyst.db");
    assert!(!cfg.is_in_memory());
  }

  #[test]
  fn in_memory_name() {
    let cfg = StoreConfig::in_memory();
    assert!(cfg.is_in_memory());
    assert_eq!(cfg.database_name(), "memory");
  }

  #[test]
  fn zero_sized_pool_still_allows_one_connection() {
    let cfg = StoreConfig { pool_size: 0, max_overflow: 0, ..StoreConfig::default() };
    assert_eq!(cfg.max_connections(), 1);
  }
}

//! Error types for `credit-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A field failed its structural checks (missing, too long, wrong shape).
  #[error("invalid {entity}.{field}: {reason}")]
  Validation {
    entity: &'static str,
    field:  &'static str,
    reason: String,
  },

  /// A dependent row names a ticker with no matching company.
  #[error("unknown ticker {0:?}: no company row exists")]
  UnknownTicker(String),

  /// Stored or supplied text does not name a known categorical value.
  #[error("unknown {kind} {value:?}")]
  UnknownVariant { kind: &'static str, value: String },
}

impl Error {
  pub fn validation(
    entity: &'static str,
    field: &'static str,
    reason: impl Into<String>,
  ) -> Self {
    Error::Validation { entity, field, reason: reason.into() }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Require a non-blank text value no longer than `max_len` characters.
pub(crate) fn require_text(
  entity: &'static str,
  field: &'static str,
  value: &str,
  max_len: usize,
) -> Result<()> {
  if value.trim().is_empty() {
    return Err(Error::validation(entity, field, "is required"));
  }
  let len = value.chars().count();
  if len > max_len {
    return Err(Error::validation(
      entity,
      field,
      format!("is {len} characters, limit is {max_len}"),
    ));
  }
  Ok(())
}

/// Like [`require_text`] but for optional columns: `None` always passes.
pub(crate) fn optional_text(
  entity: &'static str,
  field: &'static str,
  value: Option<&str>,
  max_len: usize,
) -> Result<()> {
  match value {
    Some(v) => require_text(entity, field, v, max_len),
    None => Ok(()),
  }
}

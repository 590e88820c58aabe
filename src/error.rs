use thiserror::Error;

/// Errors originated by the `futures_batch` pool itself.
///
/// Errors returned by submitted operations are never converted into this type;
/// they are stored verbatim in the run's [`ResultSet`](crate::ResultSet).
#[derive(Error, Debug, PartialEq, Eq)]
pub enum PoolError {
  #[error("Concurrency limit must be at least 1, got {0}")]
  InvalidConcurrencyLimit(usize),
}

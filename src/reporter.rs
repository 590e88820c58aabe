use crate::result_set::ResultSet;
use crate::task::Outcome;

use std::fmt::Display;
use std::hash::Hash;
use std::io::{self, Stderr, Stdout, Write};

use tracing::{debug, warn};

/// What a [`Reporter`] saw while walking a [`ResultSet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSummary<K> {
  /// Identities whose operation succeeded, in submission order.
  pub succeeded: Vec<K>,
  /// Identities that failed or were aborted, with the reported message, in submission order.
  pub failed: Vec<(K, String)>,
}

impl<K> Default for BatchSummary<K> {
  fn default() -> Self {
    Self {
      succeeded: Vec::new(),
      failed: Vec::new(),
    }
  }
}

impl<K> BatchSummary<K> {
  /// The aggregate failure signal: `true` if at least one unit did not succeed.
  pub fn any_failed(&self) -> bool {
    !self.failed.is_empty()
  }

  /// The message of the last failed unit in submission order.
  pub fn last_error(&self) -> Option<&str> {
    self.failed.last().map(|(_, message)| message.as_str())
  }
}

/// Prints per-unit outcomes and computes the batch's aggregate status.
///
/// Successes print the identity, failures print the operation's error text, both on `out`.
/// Problems found before a batch runs (e.g. a unit that could not be built) go to `err`.
#[derive(Debug)]
pub struct Reporter<O: Write, X: Write> {
  out: O,
  err: X,
}

impl Reporter<Stdout, Stderr> {
  pub fn stdio() -> Self {
    Self::new(io::stdout(), io::stderr())
  }
}

impl<O: Write, X: Write> Reporter<O, X> {
  pub fn new(out: O, err: X) -> Self {
    Self { out, err }
  }

  /// Writes one line per entry, in submission order. The result set is only read.
  pub fn report<K, E>(&mut self, results: &ResultSet<K, E>) -> io::Result<BatchSummary<K>>
  where
    K: Eq + Hash + Clone + Display,
    E: Display,
  {
    let mut summary = BatchSummary::default();

    for (identity, outcome) in results.iter_in_submission_order() {
      match outcome {
        Outcome::Success => {
          writeln!(self.out, "{}", identity)?;
          summary.succeeded.push(identity.clone());
        }
        Outcome::Failed(err) => {
          let message = err.to_string();
          writeln!(self.out, "{}", message)?;
          summary.failed.push((identity.clone(), message));
        }
        Outcome::Aborted(reason) => {
          let message = format!("{}: {}", identity, reason);
          writeln!(self.out, "{}", message)?;
          summary.failed.push((identity.clone(), message));
        }
      }
    }
    self.out.flush()?;

    if summary.any_failed() {
      warn!(
        succeeded = summary.succeeded.len(),
        failed = summary.failed.len(),
        "Batch finished with failures."
      );
    } else {
      debug!(succeeded = summary.succeeded.len(), "Batch finished without failures.");
    }
    Ok(summary)
  }

  pub fn report_error(&mut self, error: &dyn Display) -> io::Result<()> {
    writeln!(self.err, "{}", error)?;
    self.err.flush()
  }

  pub fn into_writers(self) -> (O, X) {
    (self.out, self.err)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::task::WorkUnit;
  use crate::WorkerPool;

  fn output(bytes: Vec<u8>) -> String {
    String::from_utf8(bytes).unwrap()
  }

  #[tokio::test]
  async fn reports_partial_failure_in_submission_order() {
    let pool = WorkerPool::new(2, tokio::runtime::Handle::current(), "reporter_partial_failure");
    let units = vec![
      WorkUnit::new("c1".to_string(), || async { Ok(()) }),
      WorkUnit::new("c2".to_string(), || async { Err("busy".to_string()) }),
      WorkUnit::new("c3".to_string(), || async { Ok(()) }),
    ];
    let results = pool.run(units).await;

    let mut reporter = Reporter::new(Vec::new(), Vec::new());
    let summary = reporter.report(&results).unwrap();
    let (out, err) = reporter.into_writers();

    assert_eq!(output(out), "c1\nbusy\nc3\n");
    assert!(err.is_empty());
    assert_eq!(summary.succeeded, vec!["c1".to_string(), "c3".to_string()]);
    assert_eq!(summary.failed, vec![("c2".to_string(), "busy".to_string())]);
    assert!(summary.any_failed());
    assert_eq!(summary.last_error(), Some("busy"));
  }

  #[tokio::test]
  async fn reporting_twice_is_identical_and_leaves_results_untouched() {
    let pool = WorkerPool::new(3, tokio::runtime::Handle::current(), "reporter_idempotent");
    let units = vec![
      WorkUnit::blocking("a".to_string(), || Ok(())),
      WorkUnit::blocking("b".to_string(), || Err("gone".to_string())),
    ];
    let results = pool.run(units).await;

    let mut first = Reporter::new(Vec::new(), Vec::new());
    let mut second = Reporter::new(Vec::new(), Vec::new());
    let first_summary = first.report(&results).unwrap();
    let second_summary = second.report(&results).unwrap();

    assert_eq!(first_summary, second_summary);
    assert_eq!(first.into_writers().0, second.into_writers().0);
    assert_eq!(results.len(), 2);
    assert_eq!(results.get("b"), Some(&Outcome::Failed("gone".to_string())));
  }

  #[test]
  fn empty_result_set_is_not_a_failure() {
    let results: ResultSet<String, String> = ResultSet::default();
    let mut reporter = Reporter::new(Vec::new(), Vec::new());
    let summary = reporter.report(&results).unwrap();

    assert!(!summary.any_failed());
    assert_eq!(summary.last_error(), None);
    assert!(reporter.into_writers().0.is_empty());
  }

  #[test]
  fn report_error_goes_to_error_writer() {
    let mut reporter = Reporter::new(Vec::new(), Vec::new());
    reporter.report_error(&"no such container: ghost").unwrap();
    let (out, err) = reporter.into_writers();
    assert!(out.is_empty());
    assert_eq!(output(err), "no such container: ghost\n");
  }
}

use crate::task::Outcome;

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

/// A unit's outcome as recorded by the worker that ran it, before the final merge.
#[derive(Debug)]
pub(crate) struct Completion<K, E> {
  pub(crate) index: usize,
  pub(crate) identity: K,
  pub(crate) outcome: Outcome<E>,
}

/// The mapping from identity to outcome produced by one [`WorkerPool::run`](crate::WorkerPool::run).
///
/// Holds exactly one entry per distinct submitted identity. It is built once, after every
/// worker of the run has finished, and is read-only from then on.
#[derive(Debug, Clone)]
pub struct ResultSet<K, E> {
  outcomes: HashMap<K, Outcome<E>>,
  submission_order: Vec<K>,
}

impl<K, E> Default for ResultSet<K, E> {
  fn default() -> Self {
    Self {
      outcomes: HashMap::new(),
      submission_order: Vec::new(),
    }
  }
}

impl<K: Eq + Hash + Clone, E> ResultSet<K, E> {
  /// Merges the per-worker buffers. Entries are applied in submission order, so for a duplicated
  /// identity the unit submitted last wins regardless of which worker finished first.
  pub(crate) fn merge(worker_buffers: Vec<Vec<Completion<K, E>>>) -> Self {
    let mut completions: Vec<Completion<K, E>> = worker_buffers.into_iter().flatten().collect();
    completions.sort_unstable_by_key(|completion| completion.index);

    let mut set = Self {
      outcomes: HashMap::with_capacity(completions.len()),
      submission_order: Vec::with_capacity(completions.len()),
    };
    for completion in completions {
      if set.outcomes.insert(completion.identity.clone(), completion.outcome).is_none() {
        set.submission_order.push(completion.identity);
      }
    }
    set
  }

  pub fn len(&self) -> usize {
    self.outcomes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.outcomes.is_empty()
  }

  pub fn get<Q>(&self, identity: &Q) -> Option<&Outcome<E>>
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
  {
    self.outcomes.get(identity)
  }

  pub fn contains_key<Q>(&self, identity: &Q) -> bool
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
  {
    self.outcomes.contains_key(identity)
  }

  /// Iterates all entries in no particular order.
  pub fn iter(&self) -> impl Iterator<Item = (&K, &Outcome<E>)> {
    self.outcomes.iter()
  }

  pub fn keys(&self) -> impl Iterator<Item = &K> {
    self.outcomes.keys()
  }

  /// Iterates all entries in the order their identity was first submitted.
  pub fn iter_in_submission_order(&self) -> impl Iterator<Item = (&K, &Outcome<E>)> {
    self
      .submission_order
      .iter()
      .filter_map(move |identity| self.outcomes.get(identity).map(|outcome| (identity, outcome)))
  }

  pub fn success_count(&self) -> usize {
    self.outcomes.values().filter(|outcome| outcome.is_success()).count()
  }

  pub fn failure_count(&self) -> usize {
    self.len() - self.success_count()
  }

  /// `true` if at least one unit failed or was aborted.
  pub fn any_failed(&self) -> bool {
    self.outcomes.values().any(Outcome::is_failure)
  }

  pub fn into_map(self) -> HashMap<K, Outcome<E>> {
    self.outcomes
  }
}

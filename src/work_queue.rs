use crate::task::WorkUnit;

use std::collections::VecDeque;

use parking_lot::Mutex;

/// A unit waiting in the queue, tagged with its position in the submitted list.
pub(crate) struct QueuedUnit<K, E> {
  pub(crate) index: usize,
  pub(crate) unit: WorkUnit<K, E>,
}

/// The one structure shared by a run's workers.
///
/// It is filled once before any worker starts and only ever drained afterwards, so the lock is
/// held for a single `pop_front` and never across an `.await`.
pub(crate) struct WorkQueue<K, E> {
  pending: Mutex<VecDeque<QueuedUnit<K, E>>>,
}

impl<K, E> WorkQueue<K, E> {
  pub(crate) fn new(units: Vec<WorkUnit<K, E>>) -> Self {
    let pending = units
      .into_iter()
      .enumerate()
      .map(|(index, unit)| QueuedUnit { index, unit })
      .collect();
    Self {
      pending: Mutex::new(pending),
    }
  }

  /// Takes the next unit, or `None` once the queue is drained.
  pub(crate) fn pop(&self) -> Option<QueuedUnit<K, E>> {
    self.pending.lock().pop_front()
  }

  /// Units not yet taken by a worker.
  pub(crate) fn len(&self) -> usize {
    self.pending.lock().len()
  }
}

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::future::BoxFuture;
use futures::FutureExt;

/// A zero-argument async operation. The future is only created once a worker picks the unit up.
pub(crate) type AsyncOperation<E> = Box<dyn FnOnce() -> BoxFuture<'static, Result<(), E>> + Send + 'static>;

/// A zero-argument blocking operation, run on the Tokio blocking thread pool.
pub(crate) type BlockingOperation<E> = Box<dyn FnOnce() -> Result<(), E> + Send + 'static>;

pub(crate) enum Operation<E> {
  Async(AsyncOperation<E>),
  Blocking(BlockingOperation<E>),
}

impl<E: Send + 'static> Operation<E> {
  /// Runs the operation to completion. Panics never escape: they are turned into `Outcome::Aborted`.
  pub(crate) async fn invoke(self) -> Outcome<E> {
    match self {
      Operation::Async(thunk) => {
        // The thunk itself may panic before returning a future, so it runs inside the guarded block.
        match AssertUnwindSafe(async move { thunk().await }).catch_unwind().await {
          Ok(result) => Outcome::from(result),
          Err(payload) => Outcome::Aborted(panic_message(payload)),
        }
      }
      Operation::Blocking(thunk) => match tokio::task::spawn_blocking(thunk).await {
        Ok(result) => Outcome::from(result),
        Err(join_error) if join_error.is_panic() => Outcome::Aborted(panic_message(join_error.into_panic())),
        Err(join_error) => Outcome::Aborted(format!("blocking operation did not complete: {}", join_error)),
      },
    }
  }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
  if let Some(msg) = payload.downcast_ref::<&'static str>() {
    format!("operation panicked: {}", msg)
  } else if let Some(msg) = payload.downcast_ref::<String>() {
    format!("operation panicked: {}", msg)
  } else {
    "operation panicked".to_string()
  }
}

/// One identity + fallible operation pair submitted to the [`WorkerPool`](crate::WorkerPool).
///
/// Identities must be unique within one run. The pool does not deduplicate them:
/// when two units share an identity, the one submitted later wins in the [`ResultSet`](crate::ResultSet).
pub struct WorkUnit<K, E> {
  pub(crate) identity: K,
  pub(crate) operation: Operation<E>,
}

impl<K, E: Send + 'static> WorkUnit<K, E> {
  /// Creates a unit whose operation is async.
  pub fn new<F, Fut>(identity: K, operation: F) -> Self
  where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
  {
    Self {
      identity,
      operation: Operation::Async(Box::new(move || operation().boxed())),
    }
  }

  /// Creates a unit whose operation blocks the calling thread (e.g. synchronous I/O).
  pub fn blocking<F>(identity: K, operation: F) -> Self
  where
    F: FnOnce() -> Result<(), E> + Send + 'static,
  {
    Self {
      identity,
      operation: Operation::Blocking(Box::new(operation)),
    }
  }

  pub fn identity(&self) -> &K {
    &self.identity
  }
}

impl<K: fmt::Debug, E> fmt::Debug for WorkUnit<K, E> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let kind = match self.operation {
      Operation::Async(_) => "async",
      Operation::Blocking(_) => "blocking",
    };
    f.debug_struct("WorkUnit")
      .field("identity", &self.identity)
      .field("operation", &kind)
      .finish()
  }
}

/// The outcome of a single unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<E> {
  /// The operation returned `Ok(())`.
  Success,
  /// The operation returned this error, untouched by the pool.
  Failed(E),
  /// The operation did not run to completion: it panicked, or the runtime dropped it.
  Aborted(String),
}

impl<E> Outcome<E> {
  pub fn is_success(&self) -> bool {
    matches!(self, Outcome::Success)
  }

  pub fn is_failure(&self) -> bool {
    !self.is_success()
  }

  /// The operation's own error, if it returned one.
  pub fn error(&self) -> Option<&E> {
    match self {
      Outcome::Failed(err) => Some(err),
      _ => None,
    }
  }
}

impl<E> From<Result<(), E>> for Outcome<E> {
  fn from(result: Result<(), E>) -> Self {
    match result {
      Ok(()) => Outcome::Success,
      Err(err) => Outcome::Failed(err),
    }
  }
}

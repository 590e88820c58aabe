//! Container removal built on top of the [`WorkerPool`].
//!
//! The container runtime is an external collaborator, expressed as the [`ContainerRuntime`] trait.
//! This module selects which containers to remove, turns each into a blocking [`WorkUnit`], runs
//! the batch and reports every container's outcome.

use crate::pool::WorkerPool;
use crate::reporter::{BatchSummary, Reporter};
use crate::result_set::ResultSet;
use crate::task::{Outcome, WorkUnit};

use std::error::Error as StdError;
use std::io::{self, Write};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, info};

type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// The container runtime the removal command drives.
pub trait ContainerRuntime: Send + Sync + 'static {
  type Container: Send + 'static;
  type Error: StdError + Send + Sync + 'static;

  /// Every container known to the runtime.
  fn containers(&self) -> Result<Vec<Self::Container>, Self::Error>;

  /// The most recently created container.
  fn latest_container(&self) -> Result<Self::Container, Self::Error>;

  /// Resolves a container by name or ID.
  fn lookup_container(&self, name_or_id: &str) -> Result<Self::Container, Self::Error>;

  fn container_id(&self, container: &Self::Container) -> String;

  /// Removes one container. May block.
  fn remove_container(&self, container: &Self::Container, force: bool) -> Result<(), Self::Error>;

  fn shutdown(&self, force: bool) -> Result<(), Self::Error>;
}

#[derive(Error, Debug)]
pub enum RemovalError {
  #[error("--all and --latest cannot be used together")]
  ConflictingSelection,

  #[error("specify one or more containers to remove")]
  NothingSelected,

  #[error("unable to get container list: {0}")]
  ListContainers(#[source] BoxError),

  #[error("unable to get latest container: {0}")]
  LatestContainer(#[source] BoxError),

  #[error("unable to find container {name}: {source}")]
  ContainerNotFound {
    name: String,
    #[source]
    source: BoxError,
  },

  #[error("{source}")]
  RemoveFailed {
    id: String,
    #[source]
    source: BoxError,
  },

  #[error("failed to write removal report: {0}")]
  Report(#[from] io::Error),
}

/// Which containers to remove, and how.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemovalRequest {
  /// Container names or IDs given explicitly.
  pub names: Vec<String>,
  /// Remove every container.
  pub all: bool,
  /// Remove the most recently created container.
  pub latest: bool,
  /// Remove running containers too.
  pub force: bool,
}

impl RemovalRequest {
  pub fn named<I, S>(names: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      names: names.into_iter().map(Into::into).collect(),
      ..Default::default()
    }
  }

  pub fn all() -> Self {
    Self {
      all: true,
      ..Default::default()
    }
  }

  pub fn latest() -> Self {
    Self {
      latest: true,
      ..Default::default()
    }
  }

  pub fn force(mut self, force: bool) -> Self {
    self.force = force;
    self
  }

  pub fn validate(&self) -> Result<(), RemovalError> {
    if self.all && self.latest {
      return Err(RemovalError::ConflictingSelection);
    }
    if self.names.is_empty() && !self.all && !self.latest {
      return Err(RemovalError::NothingSelected);
    }
    Ok(())
  }
}

/// Owns an acquired runtime and shuts it down when dropped, on every exit path.
#[derive(Debug)]
pub struct RuntimeGuard<R: ContainerRuntime> {
  runtime: Arc<R>,
}

impl<R: ContainerRuntime> RuntimeGuard<R> {
  pub fn new(runtime: Arc<R>) -> Self {
    Self { runtime }
  }

  pub fn runtime(&self) -> &Arc<R> {
    &self.runtime
  }
}

impl<R: ContainerRuntime> Drop for RuntimeGuard<R> {
  fn drop(&mut self) {
    match self.runtime.shutdown(false) {
      Ok(()) => debug!("Container runtime shut down."),
      Err(e) => error!("Container runtime shutdown failed: {}", e),
    }
  }
}

/// Builds one blocking unit per container, identified by container ID.
pub fn removal_units<R: ContainerRuntime>(
  runtime: &Arc<R>,
  containers: Vec<R::Container>,
  force: bool,
) -> Vec<WorkUnit<String, R::Error>> {
  containers
    .into_iter()
    .map(|container| {
      let id = runtime.container_id(&container);
      let runtime = runtime.clone();
      WorkUnit::blocking(id, move || runtime.remove_container(&container, force))
    })
    .collect()
}

/// The outcome of a removal command that got as far as running its batch.
#[derive(Debug)]
pub struct RemovalReport {
  pub summary: BatchSummary<String>,
  /// Requested names that could not be resolved. They were never submitted to the pool.
  pub lookup_failures: Vec<RemovalError>,
  /// The last failed removal in submission order, with the runtime's own error as its source.
  pub removal_failure: Option<RemovalError>,
}

impl RemovalReport {
  /// `true` if any lookup or any removal failed.
  pub fn failed(&self) -> bool {
    self.summary.any_failed() || !self.lookup_failures.is_empty()
  }

  /// Collapses the report into the command's exit status: the last removal failure wins, then
  /// the last lookup failure.
  pub fn into_result(mut self) -> Result<BatchSummary<String>, RemovalError> {
    if let Some(err) = self.removal_failure {
      return Err(err);
    }
    match self.lookup_failures.pop() {
      Some(err) => Err(err),
      None => Ok(self.summary),
    }
  }
}

/// Removes the requested containers with bounded parallelism.
///
/// Takes ownership of the acquired runtime and shuts it down before returning, whether the
/// command succeeded, partially failed or was rejected.
pub async fn remove_containers<R, O, X>(
  pool: &WorkerPool,
  runtime: Arc<R>,
  request: &RemovalRequest,
  reporter: &mut Reporter<O, X>,
) -> Result<RemovalReport, RemovalError>
where
  R: ContainerRuntime,
  O: Write,
  X: Write,
{
  let guard = RuntimeGuard::new(runtime);
  request.validate()?;
  let runtime = guard.runtime();

  let mut lookup_failures = Vec::new();
  let containers = if request.all {
    runtime
      .containers()
      .map_err(|e| RemovalError::ListContainers(Box::new(e)))?
  } else if request.latest {
    vec![runtime
      .latest_container()
      .map_err(|e| RemovalError::LatestContainer(Box::new(e)))?]
  } else {
    let mut found = Vec::with_capacity(request.names.len());
    for name in &request.names {
      match runtime.lookup_container(name) {
        Ok(container) => found.push(container),
        Err(e) => {
          reporter.report_error(&e)?;
          lookup_failures.push(RemovalError::ContainerNotFound {
            name: name.clone(),
            source: Box::new(e),
          });
        }
      }
    }
    found
  };

  info!(
    pool_name = %pool.name(),
    containers = containers.len(),
    force = request.force,
    "Removing containers."
  );
  let units = removal_units(runtime, containers, request.force);
  let results = pool.run(units).await;
  let summary = reporter.report(&results)?;

  Ok(RemovalReport {
    summary,
    lookup_failures,
    removal_failure: last_removal_failure(results),
  })
}

/// Takes the error of the last failed unit in submission order out of the result set.
fn last_removal_failure<E>(results: ResultSet<String, E>) -> Option<RemovalError>
where
  E: StdError + Send + Sync + 'static,
{
  let id = results
    .iter_in_submission_order()
    .filter(|(_, outcome)| outcome.is_failure())
    .map(|(id, _)| id.clone())
    .last()?;
  let source: BoxError = match results.into_map().remove(&id)? {
    Outcome::Failed(err) => Box::new(err),
    Outcome::Aborted(reason) => reason.into(),
    Outcome::Success => return None,
  };
  Some(RemovalError::RemoveFailed { id, source })
}

//! An `rm`-style command removing containers from an in-memory runtime.
//!
//! ```text
//! cargo run --example container_rm -- web db
//! cargo run --example container_rm -- --all --force
//! ```

use clap::Parser;
use futures_batch::removal::{remove_containers, ContainerRuntime, RemovalRequest};
use futures_batch::{default_concurrency_limit, Reporter, WorkerPool};
use std::collections::BTreeMap;
use std::fmt;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::info;

#[derive(Parser)]
#[command(name = "container_rm")]
#[command(about = "Remove one or more containers")]
struct Cli {
  /// Remove all containers
  #[arg(long, short)]
  all: bool,

  /// Force removal of a running container
  #[arg(long, short)]
  force: bool,

  /// Act on the latest container created
  #[arg(long, short)]
  latest: bool,

  /// Maximum number of removals in flight
  #[arg(long, default_value_t = default_concurrency_limit())]
  parallel: usize,

  /// Container names or IDs
  containers: Vec<String>,
}

#[derive(Debug)]
struct DemoError(String);

impl fmt::Display for DemoError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl std::error::Error for DemoError {}

/// Containers by name: (id, running). Names are created in alphabetical order.
struct DemoRuntime {
  containers: Mutex<BTreeMap<String, (String, bool)>>,
}

impl DemoRuntime {
  fn seeded() -> Self {
    let containers = [("cache", "3f1a", false), ("db", "9c2e", true), ("web", "b7d0", false)]
      .into_iter()
      .map(|(name, id, running)| (name.to_string(), (id.to_string(), running)))
      .collect();
    Self {
      containers: Mutex::new(containers),
    }
  }

  fn not_found(name_or_id: &str) -> DemoError {
    DemoError(format!("no container with name or ID {} found", name_or_id))
  }
}

impl ContainerRuntime for DemoRuntime {
  type Container = (String, String, bool);
  type Error = DemoError;

  fn containers(&self) -> Result<Vec<Self::Container>, Self::Error> {
    let guard = self.containers.lock().map_err(|_| DemoError("runtime state poisoned".into()))?;
    Ok(guard.iter().map(|(n, (id, r))| (n.clone(), id.clone(), *r)).collect())
  }

  fn latest_container(&self) -> Result<Self::Container, Self::Error> {
    self.containers()?.pop().ok_or_else(|| DemoError("no containers to remove".into()))
  }

  fn lookup_container(&self, name_or_id: &str) -> Result<Self::Container, Self::Error> {
    self
      .containers()?
      .into_iter()
      .find(|(name, id, _)| name == name_or_id || id == name_or_id)
      .ok_or_else(|| Self::not_found(name_or_id))
  }

  fn container_id(&self, container: &Self::Container) -> String {
    container.1.clone()
  }

  fn remove_container(&self, container: &Self::Container, force: bool) -> Result<(), Self::Error> {
    let (name, id, running) = container;
    std::thread::sleep(Duration::from_millis(200));
    if *running && !force {
      return Err(DemoError(format!("cannot remove container {} as it is running", id)));
    }
    let mut guard = self.containers.lock().map_err(|_| DemoError("runtime state poisoned".into()))?;
    guard.remove(name).map(|_| ()).ok_or_else(|| Self::not_found(id))
  }

  fn shutdown(&self, force: bool) -> Result<(), Self::Error> {
    info!(force, "Demo runtime shut down.");
    Ok(())
  }
}

#[tokio::main]
async fn main() -> ExitCode {
  tracing_subscriber::fmt()
    .with_env_filter(tracing_subscriber::EnvFilter::new("warn,futures_batch=info"))
    .with_target(false)
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();
  let request = RemovalRequest {
    names: cli.containers,
    all: cli.all,
    latest: cli.latest,
    force: cli.force,
  };

  let pool = WorkerPool::new(cli.parallel, Handle::current(), "container_rm");
  let runtime = Arc::new(DemoRuntime::seeded());
  let mut reporter = Reporter::stdio();

  match remove_containers(&pool, runtime, &request, &mut reporter).await.and_then(|r| r.into_result()) {
    Ok(_) => ExitCode::SUCCESS,
    Err(e) => {
      eprintln!("Error: {}", e);
      ExitCode::FAILURE
    }
  }
}

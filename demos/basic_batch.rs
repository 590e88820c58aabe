use futures_batch::{Reporter, WorkUnit, WorkerPool};
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::info;

async fn flaky_operation(id: usize) -> Result<(), String> {
  info!("Unit {} starting (takes 500ms)", id);
  tokio::time::sleep(Duration::from_millis(500)).await;
  if id % 3 == 0 {
    return Err(format!("unit-{}: resource busy", id));
  }
  Ok(())
}

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt()
    .with_max_level(tracing::Level::DEBUG)
    .with_target(false)
    .init();

  info!("--- Batch Example (Limit: 2) ---");

  let concurrency_limit = 2;
  let pool = WorkerPool::new(concurrency_limit, Handle::current(), "batch_pool");

  let num_units = 7;
  info!(
    "Submitting {} units, each takes 500ms. With concurrency {}, this should take ~{} ms.",
    num_units,
    concurrency_limit,
    (num_units as f32 / concurrency_limit as f32).ceil() * 500.0
  );

  let units: Vec<WorkUnit<String, String>> = (0..num_units)
    .map(|i| WorkUnit::new(format!("unit-{}", i), move || flaky_operation(i)))
    .collect();

  let results = pool.run(units).await;

  let mut reporter = Reporter::stdio();
  match reporter.report(&results) {
    Ok(summary) => info!(
      "{} succeeded, {} failed. Overall failed: {}",
      summary.succeeded.len(),
      summary.failed.len(),
      summary.any_failed()
    ),
    Err(e) => tracing::error!("Failed to write report: {}", e),
  }
  info!("--- Batch Example End ---");
}

//! A Tokio-based bounded worker pool for running batches of identified, fallible operations
//! and collecting one outcome per unit.

mod error;
mod pool;
pub mod removal;
mod reporter;
mod result_set;
mod task;
mod work_queue;

pub use error::PoolError;
pub use pool::{default_concurrency_limit, WorkerPool};
pub use reporter::{BatchSummary, Reporter};
pub use result_set::ResultSet;
pub use task::{Outcome, WorkUnit};

/*!
 * Lifecycle Monitoring
 * Counters and tracing for arena and object transitions
 */

mod stats;
mod tracer;

pub use stats::{LifecycleStats, StatsSnapshot};
pub use tracer::{init_tracing, DisposalSpan};

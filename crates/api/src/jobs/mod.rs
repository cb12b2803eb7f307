//! Background job scheduler and job implementations.

mod mail_outbox;
mod pool_metrics;
mod scheduler;

pub use mail_outbox::MailOutboxJob;
pub use pool_metrics::PoolMetricsJob;
pub use scheduler::{Job, JobFrequency, JobScheduler};

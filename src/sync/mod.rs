mod ingest;
mod last_run;
mod scheduler;

pub use ingest::{ingest_channel, ingest_items, run_ingest_cycle, CycleReport, IngestStats};
pub use last_run::LastRunRegistry;
pub use scheduler::{CleanupJob, IngestJob, Job, Scheduler, SchedulerSettings, CLEANUP_JOB};

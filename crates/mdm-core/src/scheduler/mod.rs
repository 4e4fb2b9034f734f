//! Download orchestration: movie pool → quality lanes → per-part transfers.

pub mod movie;
pub mod parts;
pub mod pool;

pub use movie::{process_movie, MovieOutcome, VariantRunner};
pub use parts::{folder_label, PartScheduler, VariantFailure};
pub use pool::run_pending;

//! CLI command handlers, one file per concern.

mod add;
mod list;
mod run;
mod status;

pub use add::{run_add_movie, run_add_release};
pub use list::{run_pending, run_recent};
pub use run::run_orchestrator;
pub use status::run_status;

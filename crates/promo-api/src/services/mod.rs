//! Business logic services.

pub mod card;
pub mod description;
pub mod output;
pub mod scheduler;

pub use card::CardService;
pub use description::DescriptionService;
pub use output::LocalOutput;
pub use scheduler::{RunStatus, RunSummary, SchedulerLoop, SchedulerService, SCHEDULER_LOCK};

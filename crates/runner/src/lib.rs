pub mod dry_run;
pub mod input;
pub mod version;

pub use dry_run::{DryRun, RunReport};
pub use input::InputRecord;

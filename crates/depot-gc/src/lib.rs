#![forbid(unsafe_code)]

pub mod collect;
pub mod error;
pub mod mark;
pub mod orphan;
pub mod scratch;
pub mod sweep;
pub mod usage;

pub use collect::{collect_garbage, GcInput};
pub use error::GcError;
pub use mark::{live_artifact_paths, live_clone_paths, live_package_paths};
pub use orphan::{OrphanLog, DEFAULT_COLLECT_DELAY};
pub use scratch::ScratchUsageLog;
pub use sweep::{candidate_paths, sweep, SweepConfig, SweepOutcome, SweepReport};
pub use usage::UsageLog;

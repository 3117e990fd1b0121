//! One-way mirroring engine.
//!
//! Leaf first: content comparison, tree diffing, action application, cycle
//! orchestration and periodic scheduling.

pub mod action;
pub mod apply;
pub mod compare;
pub mod diff;
pub mod engine;
pub mod exclude;
pub mod hash;
pub mod record;
pub mod scheduler;

pub use action::{ActionKind, SyncAction};
pub use apply::{ActionApplier, ActionOutcome};
pub use compare::ContentComparator;
pub use diff::{PlanIssue, SyncPlan, TreeDiffer};
pub use engine::{CycleFailure, CycleResult, SymlinkPolicy, SyncConfig, SyncEngine};
pub use exclude::ExcludePatterns;
pub use hash::{hash_bytes, hash_file, Fingerprint};
pub use record::{ChannelLogger, MultiLogger, RecordKind, SyncLogger, SyncRecord, TracingLogger};
pub use scheduler::{stop_channel, Scheduler, SchedulerReport, SchedulerState, StopHandle, StopSignal};

//! hive-services — the coordination core: connection registry, task
//! ledger, file store, and the per-job coordinator built on top of them.

pub mod coordinator;
pub mod files;
pub mod jobfile;
pub mod ledger;
pub mod registry;

pub use coordinator::{
    Coordinator, CoordinatorHooks, CoordinatorStatus, JobDescriptor, NoopHooks, TaskDispatch,
};
pub use files::{FileError, FileStore};
pub use jobfile::{JobSpec, JobfileError, TaskSpec};
pub use ledger::{CompletedTask, LedgerError, TaskCounts, TaskLedger};
pub use registry::{Connection, ConnectionInfo, ConnectionRegistry, ConnectionState};

//! Wire and data model shared by the fleetops crates.
//!
//! Everything here mirrors a resource (or a request for one) exchanged with the
//! remote fleet-management service. No I/O happens in this crate.

pub mod group;
pub mod job;
pub mod request;
pub mod resource;
pub mod schedule;

pub use group::{Group, GroupExecutionPlan};
pub use job::{Job, JobResult, JobState, ResultCode};
pub use request::{ExecutionMode, OperationRequest, ResourceTarget};
pub use resource::{JobHandle, RemoteResource};
pub use schedule::{Schedule, ScheduleDefinition, SchedulePayload, SchedulePurpose, ScheduledOperation};

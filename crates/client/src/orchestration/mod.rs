//! Submission, scheduling, polling and cancellation of remote jobs.

pub mod cancellation_guard;
pub mod group_planner;
pub mod job_poller;
pub mod orchestrator;
pub mod preflight;
pub mod request_builder;
pub mod retry_coordinator;
pub mod schedule_compiler;

pub use cancellation_guard::CancellationGuard;
pub use group_planner::plan as plan_group;
pub use job_poller::{JobPoller, WaitOptions};
pub use orchestrator::{ExecutionOutcome, Orchestrator, Submission};
pub use preflight::{PowerStatePreflight, Preflight};
pub use request_builder::{JobSubmission, RequestBuilder, SubmissionPayload};
pub use retry_coordinator::{CollectionRead, RetryCoordinator};
pub use schedule_compiler::ScheduleCompiler;

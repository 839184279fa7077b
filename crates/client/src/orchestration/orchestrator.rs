use fleetops_common::{
    GroupExecutionPlan, Job, JobResult, OperationRequest, ResultCode, Schedule,
};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, instrument};

use super::cancellation_guard::CancellationGuard;
use super::job_poller::{JobPoller, WaitOptions};
use super::preflight::Preflight;
use super::request_builder::{RequestBuilder, SubmissionPayload};
use super::retry_coordinator::{CollectionRead, RetryCoordinator};
use super::schedule_compiler::ScheduleCompiler;
use crate::clock::Clock;
use crate::config::ClientConfig;
use crate::error::{OrchestrationError, UnsupportedOperation};
use crate::templates::JobTemplateCatalog;
use crate::transport::Transport;

/// What the remote service created for a submitted request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "resource", rename_all = "camelCase")]
pub enum Submission {
    Job(Job),
    Schedule(Schedule),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum ExecutionOutcome {
    /// A preflight check found nothing to do. Nothing was submitted.
    #[serde(rename_all = "camelCase")]
    Skipped { message: String, result_code: ResultCode },
    Submitted { job: Job },
    Scheduled { schedule: Schedule },
    Completed { result: JobResult },
}

/// Wires the builder, poller, retry and cancellation components over one transport.
pub struct Orchestrator {
    transport: Arc<dyn Transport>,
    builder: RequestBuilder,
    poller: Arc<JobPoller>,
    retry: RetryCoordinator,
    cancellation: CancellationGuard,
    jobs_endpoint: String,
    schedules_endpoint: String,
    default_wait: WaitOptions,
}

impl Orchestrator {
    pub fn new(config: &ClientConfig, transport: Arc<dyn Transport>, clock: Arc<dyn Clock>) -> Self {
        Self::build(config, transport, clock, None)
    }

    /// Like [`Orchestrator::new`], with waits that end early once `shutdown_rx` fires.
    pub fn with_shutdown(
        config: &ClientConfig,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
        shutdown_rx: watch::Receiver<()>,
    ) -> Self {
        Self::build(config, transport, clock, Some(shutdown_rx))
    }

    fn build(
        config: &ClientConfig,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
        shutdown_rx: Option<watch::Receiver<()>>,
    ) -> Self {
        let mut poller = JobPoller::new(config, transport.clone(), clock.clone());
        if let Some(rx) = shutdown_rx {
            poller = poller.with_shutdown(rx);
        }
        let poller = Arc::new(poller);

        let builder = RequestBuilder::new(
            Arc::new(JobTemplateCatalog::from_config(config)),
            ScheduleCompiler::new(config.jobs_endpoint.clone()),
            clock.clone(),
        );

        Self {
            builder,
            retry: RetryCoordinator::new(clock, Duration::from_secs(config.collection_settle_seconds)),
            cancellation: CancellationGuard::new(transport.clone(), poller.clone()),
            poller,
            transport,
            jobs_endpoint: config.jobs_endpoint.clone(),
            schedules_endpoint: config.schedules_endpoint.clone(),
            default_wait: WaitOptions::from_config(config),
        }
    }

    pub fn poller(&self) -> &JobPoller {
        &self.poller
    }

    pub fn cancellation(&self) -> &CancellationGuard {
        &self.cancellation
    }

    pub fn default_wait(&self) -> WaitOptions {
        self.default_wait
    }

    /// Builds the payload for `request` and POSTs it to the jobs or schedules endpoint.
    #[instrument(skip(self, request), fields(template = %request.template_id, resource = %request.target.id))]
    pub async fn submit(&self, request: OperationRequest) -> Result<Submission, OrchestrationError> {
        match self.builder.build(request)? {
            SubmissionPayload::Job(payload) => {
                let body = serde_json::to_value(&payload)?;
                let job: Job = serde_json::from_value(self.transport.post(&self.jobs_endpoint, &body).await?)?;
                info!(job_uri = %job.resource_uri, "Job submitted.");
                Ok(Submission::Job(job))
            }
            SubmissionPayload::Schedule(payload) => {
                let body = serde_json::to_value(&payload)?;
                let schedule: Schedule =
                    serde_json::from_value(self.transport.post(&self.schedules_endpoint, &body).await?)?;
                info!(
                    schedule_uri = %schedule.resource_uri,
                    next_start_at = ?schedule.next_start_at,
                    "Schedule created."
                );
                Ok(Submission::Schedule(schedule))
            }
        }
    }

    /// Runs the full flow for one request: preflight, submit, then optionally wait.
    ///
    /// Waiting only applies to immediate requests; a schedule is returned as created.
    pub async fn execute(
        &self,
        request: OperationRequest,
        preflight: Option<&dyn Preflight>,
        wait: Option<WaitOptions>,
    ) -> Result<ExecutionOutcome, OrchestrationError> {
        if let Some(preflight) = preflight {
            if let Some(message) = preflight.check(&request).await? {
                return Ok(ExecutionOutcome::Skipped {
                    message,
                    result_code: ResultCode::Failure,
                });
            }
        }

        match (self.submit(request).await?, wait) {
            (Submission::Job(job), Some(options)) => {
                let result = self.poller.wait(&job, options).await?;
                Ok(ExecutionOutcome::Completed { result })
            }
            (Submission::Job(job), None) => Ok(ExecutionOutcome::Submitted { job }),
            (Submission::Schedule(schedule), _) => Ok(ExecutionOutcome::Scheduled { schedule }),
        }
    }

    /// Submits an immediate request and waits for the job it creates.
    pub async fn submit_and_wait(
        &self,
        request: OperationRequest,
        options: WaitOptions,
    ) -> Result<JobResult, OrchestrationError> {
        match self.submit(request).await? {
            Submission::Job(job) => self.poller.wait(&job, options).await,
            Submission::Schedule(schedule) => Err(UnsupportedOperation::WaitOnSchedule(schedule.resource_uri).into()),
        }
    }

    /// Runs a group-wide request under `plan`, waiting with the plan's total timeout.
    pub async fn run_group(
        &self,
        mut request: OperationRequest,
        plan: &GroupExecutionPlan,
        interval_seconds: u64,
    ) -> Result<ExecutionOutcome, OrchestrationError> {
        request.parameters = plan.merge_into(std::mem::take(&mut request.parameters));
        let wait = WaitOptions::new(plan.total_timeout_seconds(), interval_seconds);
        info!(
            template = %request.template_id,
            members = plan.member_ids.len(),
            parallel = plan.parallel,
            timeout = wait.timeout_seconds,
            "Running group operation."
        );
        self.execute(request, None, Some(wait)).await
    }

    /// Reads derived data, running `collection` once if the service says it was never collected.
    pub async fn read_with_collection<T, F, Fut>(
        &self,
        read: F,
        collection: OperationRequest,
    ) -> Result<CollectionRead<T>, OrchestrationError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, OrchestrationError>>,
    {
        self.retry
            .read_or_collect(&read, || self.submit_and_wait(collection, self.default_wait), &read)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::ServerDirectory;
    use crate::orchestration::group_planner;
    use crate::orchestration::preflight::PowerStatePreflight;
    use crate::test_support::{job_json, FakeTransport, ManualClock, JOB_URI};
    use chrono::Duration as ChronoDuration;
    use fleetops_common::{Group, ResourceTarget, SchedulePurpose};
    use reqwest::Method;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const JOBS: &str = "/compute-ops-mgmt/v1beta3/jobs";
    const SCHEDULES: &str = "/compute-ops-mgmt/v1beta2/schedules";

    fn config() -> ClientConfig {
        let mut config = ClientConfig::for_base_url("https://api.example.com", "token");
        for (name, id) in [
            ("PowerOn.New", "tpl-power-on"),
            ("FirmwareUpdate.New", "tpl-fw"),
            ("DataRoundupReportOrder.New", "tpl-storage"),
        ] {
            config.job_templates.insert(name.to_string(), id.to_string());
        }
        config.poll_interval_seconds = 0;
        config
    }

    fn server_x() -> ResourceTarget {
        ResourceTarget {
            id: "srv-x".to_string(),
            resource_type: "compute-ops-mgmt/server".to_string(),
            resource_uri: "/compute-ops-mgmt/v1beta2/servers/srv-x".to_string(),
            name: Some("ServerX".to_string()),
        }
    }

    fn orchestrator(transport: Arc<FakeTransport>, clock: Arc<ManualClock>) -> Orchestrator {
        Orchestrator::new(&config(), transport, clock)
    }

    #[tokio::test]
    async fn test_power_on_for_running_server_is_skipped_without_post() {
        let transport = Arc::new(FakeTransport::new());
        transport.push(
            Method::GET,
            &server_x().resource_uri,
            json!({ "hardware": { "powerState": "ON" } }),
        );
        let preflight = PowerStatePreflight::new(
            Arc::new(ServerDirectory::new(transport.clone(), "/compute-ops-mgmt/v1beta2/servers")),
            Arc::new(JobTemplateCatalog::from_config(&config())),
        );

        let outcome = orchestrator(transport.clone(), Arc::new(ManualClock::new()))
            .execute(
                OperationRequest::immediate("tpl-power-on", server_x()),
                Some(&preflight),
                Some(WaitOptions::default()),
            )
            .await
            .unwrap();

        match outcome {
            ExecutionOutcome::Skipped { message, result_code } => {
                assert!(message.contains("already on"));
                assert_eq!(result_code, ResultCode::Failure);
            }
            other => panic!("expected a skipped outcome, got {other:?}"),
        }
        assert_eq!(transport.count_method(Method::POST), 0);
    }

    #[tokio::test]
    async fn test_immediate_request_is_submitted_and_awaited() {
        let transport = Arc::new(FakeTransport::new());
        transport
            .push(Method::POST, JOBS, job_json(JOB_URI, "PENDING", None))
            .push(Method::GET, JOB_URI, job_json(JOB_URI, "RUNNING", None))
            .push(Method::GET, JOB_URI, job_json(JOB_URI, "COMPLETE", Some("SUCCESS")));

        let request = OperationRequest::immediate("FirmwareUpdate.New", server_x())
            .with_parameter("bundle_id", "bundle-2026.09");
        let outcome = orchestrator(transport.clone(), Arc::new(ManualClock::new()))
            .execute(request, None, Some(WaitOptions::new(300, 0)))
            .await
            .unwrap();

        let ExecutionOutcome::Completed { result } = outcome else {
            panic!("expected a completed outcome");
        };
        assert!(result.is_success());

        let post = &transport.calls()[0];
        assert_eq!(post.method, Method::POST);
        assert_eq!(
            post.body,
            Some(json!({
                "jobTemplate": "tpl-fw",
                "resourceId": "srv-x",
                "resourceType": "compute-ops-mgmt/server",
                "jobParams": { "bundle_id": "bundle-2026.09" }
            }))
        );
    }

    #[tokio::test]
    async fn test_scheduled_request_creates_schedule() {
        let transport = Arc::new(FakeTransport::new());
        transport.push(
            Method::POST,
            SCHEDULES,
            json!({
                "id": "sch-1",
                "resourceUri": "/compute-ops-mgmt/v1beta2/schedules/sch-1",
                "name": "ServerX_ServerPowerOn_Schedule_123456",
                "nextStartAt": "2026-10-19T02:00:00Z",
                "lastRun": null
            }),
        );
        let clock = Arc::new(ManualClock::new());
        let request = OperationRequest::scheduled(
            "PowerOn.New",
            server_x(),
            SchedulePurpose::ServerPowerOn,
            clock.now() + ChronoDuration::hours(14),
            Some("P1D".to_string()),
        );

        let outcome = orchestrator(transport.clone(), clock)
            .execute(request, None, Some(WaitOptions::default()))
            .await
            .unwrap();

        let ExecutionOutcome::Scheduled { schedule } = outcome else {
            panic!("expected a scheduled outcome");
        };
        assert_eq!(schedule.id, "sch-1");
        assert_eq!(transport.count(Method::POST, SCHEDULES), 1);
        assert_eq!(transport.count_method(Method::GET), 0);
    }

    #[tokio::test]
    async fn test_invalid_schedule_never_reaches_transport() {
        let transport = Arc::new(FakeTransport::new());
        let clock = Arc::new(ManualClock::new());
        let request = OperationRequest::scheduled(
            "PowerOn.New",
            server_x(),
            SchedulePurpose::ServerPowerOn,
            clock.now() - ChronoDuration::seconds(1),
            None,
        );

        let err = orchestrator(transport.clone(), clock).submit(request).await.unwrap_err();

        assert!(matches!(err, OrchestrationError::Validation(_)));
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_group_run_waits_with_plan_timeout() {
        let transport = Arc::new(FakeTransport::new());
        transport
            .push(Method::POST, JOBS, job_json(JOB_URI, "PENDING", None))
            .always(Method::GET, JOB_URI, job_json(JOB_URI, "RUNNING", None));
        let clock = Arc::new(ManualClock::new());
        let group = Group {
            id: "grp-1".to_string(),
            name: "web-tier".to_string(),
            resource_uri: "/compute-ops-mgmt/v1beta2/groups/grp-1".to_string(),
            member_ids: vec!["srv-1".to_string(), "srv-2".to_string()],
        };
        let plan = group_planner::plan(&group, None, false, true, 60).unwrap();
        let request = OperationRequest::immediate(
            "FirmwareUpdate.New",
            ResourceTarget {
                id: group.id.clone(),
                resource_type: "compute-ops-mgmt/group".to_string(),
                resource_uri: group.resource_uri.clone(),
                name: Some(group.name.clone()),
            },
        )
        .with_parameter("parallel", true);

        let err = orchestrator(transport.clone(), clock)
            .run_group(request, &plan, 30)
            .await
            .unwrap_err();

        assert!(matches!(err, OrchestrationError::Timeout { elapsed_seconds: 120, .. }));
        let body = transport.calls()[0].body.clone().unwrap();
        assert_eq!(body["jobParams"]["parallel"], json!(false));
        assert_eq!(body["jobParams"]["stopOnFailure"], json!(true));
        assert_eq!(body["jobParams"]["devices"], json!(["srv-1", "srv-2"]));
    }

    #[tokio::test]
    async fn test_read_with_collection_runs_one_collection_job() {
        let transport = Arc::new(FakeTransport::new());
        transport
            .push(Method::POST, JOBS, job_json(JOB_URI, "PENDING", None))
            .push(Method::GET, JOB_URI, job_json(JOB_URI, "COMPLETE", Some("SUCCESS")));
        let clock = Arc::new(ManualClock::new());
        let orchestrator = orchestrator(transport.clone(), clock.clone());
        let reads = AtomicUsize::new(0);

        let read = orchestrator
            .read_with_collection(
                || {
                    let attempt = reads.fetch_add(1, Ordering::SeqCst);
                    async move {
                        if attempt == 0 {
                            Err(OrchestrationError::from(crate::transport::TransportError::from_status(
                                404,
                                "Run external storage details job first".to_string(),
                            )))
                        } else {
                            Ok(vec!["vol-1", "vol-2"])
                        }
                    }
                },
                OperationRequest::immediate("DataRoundupReportOrder.New", server_x()),
            )
            .await
            .unwrap();

        assert_eq!(read.data(), Some(vec!["vol-1", "vol-2"]));
        assert_eq!(reads.load(Ordering::SeqCst), 2);
        assert_eq!(transport.count(Method::POST, JOBS), 1);
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(5)]);
    }

    #[tokio::test]
    async fn test_submit_rejects_unknown_template() {
        let transport = Arc::new(FakeTransport::new());

        let err = orchestrator(transport.clone(), Arc::new(ManualClock::new()))
            .submit(OperationRequest::immediate("Reboot.Now", server_x()))
            .await
            .unwrap_err();

        assert!(matches!(err, OrchestrationError::Validation(_)));
        assert!(transport.calls().is_empty());
    }
}

use fleetops_common::{Group, GroupExecutionPlan};
use tracing::{info, warn};

use crate::error::ValidationError;

/// Works out which members a group operation covers and how it runs remotely.
///
/// With an explicit subset, members outside the group are dropped with a warning.
/// Planning fails only when nothing eligible is left.
pub fn plan(
    group: &Group,
    explicit_members: Option<&[String]>,
    parallel: bool,
    stop_on_failure: bool,
    per_member_timeout_seconds: u64,
) -> Result<GroupExecutionPlan, ValidationError> {
    if per_member_timeout_seconds == 0 {
        return Err(ValidationError::InvalidTimeout);
    }
    let candidates: &[String] = explicit_members.unwrap_or(&group.member_ids);

    let mut member_ids: Vec<String> = Vec::with_capacity(candidates.len());
    for member_id in candidates {
        if member_ids.contains(member_id) {
            continue;
        }
        if explicit_members.is_some() && !group.contains(member_id) {
            warn!(group = %group.name, member = %member_id, "Server is not a member of the group, skipping.");
            continue;
        }
        member_ids.push(member_id.clone());
    }

    if member_ids.is_empty() {
        return Err(ValidationError::NoEligibleMembers(group.name.clone()));
    }

    if parallel && stop_on_failure {
        info!(group = %group.name, "stopOnFailure is ignored for parallel group operations.");
    }

    Ok(GroupExecutionPlan {
        parallel,
        batch_size: if parallel { member_ids.len() } else { 1 },
        stop_on_failure,
        member_ids,
        per_member_timeout_seconds,
    })
}

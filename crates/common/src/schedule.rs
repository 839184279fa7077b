use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::{fmt, str::FromStr};

/// Closed classification attached to every schedule the client creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SchedulePurpose {
    ServerPowerOn,
    ServerPowerOff,
    ServerRestart,
    ServerColdBoot,
    ServerFwUpdate,
    ServerExternalStorageDetails,
    GroupPowerOn,
    GroupPowerOff,
    GroupRestart,
    GroupFwUpdate,
    GroupBiosApplySettings,
    GroupIloApplySettings,
    GroupOsInstallation,
}

impl SchedulePurpose {
    pub fn as_str(self) -> &'static str {
        match self {
            SchedulePurpose::ServerPowerOn => "SERVER_POWER_ON",
            SchedulePurpose::ServerPowerOff => "SERVER_POWER_OFF",
            SchedulePurpose::ServerRestart => "SERVER_RESTART",
            SchedulePurpose::ServerColdBoot => "SERVER_COLD_BOOT",
            SchedulePurpose::ServerFwUpdate => "SERVER_FW_UPDATE",
            SchedulePurpose::ServerExternalStorageDetails => "SERVER_EXTERNAL_STORAGE_DETAILS",
            SchedulePurpose::GroupPowerOn => "GROUP_POWER_ON",
            SchedulePurpose::GroupPowerOff => "GROUP_POWER_OFF",
            SchedulePurpose::GroupRestart => "GROUP_RESTART",
            SchedulePurpose::GroupFwUpdate => "GROUP_FW_UPDATE",
            SchedulePurpose::GroupBiosApplySettings => "GROUP_BIOS_APPLY_SETTINGS",
            SchedulePurpose::GroupIloApplySettings => "GROUP_ILO_APPLY_SETTINGS",
            SchedulePurpose::GroupOsInstallation => "GROUP_OS_INSTALLATION",
        }
    }

    /// Fragment used when generating schedule names, e.g. `ServerPowerOn`.
    pub fn name_fragment(self) -> &'static str {
        match self {
            SchedulePurpose::ServerPowerOn => "ServerPowerOn",
            SchedulePurpose::ServerPowerOff => "ServerPowerOff",
            SchedulePurpose::ServerRestart => "ServerRestart",
            SchedulePurpose::ServerColdBoot => "ServerColdBoot",
            SchedulePurpose::ServerFwUpdate => "ServerFirmwareUpdate",
            SchedulePurpose::ServerExternalStorageDetails => "ServerExternalStorage",
            SchedulePurpose::GroupPowerOn => "GroupPowerOn",
            SchedulePurpose::GroupPowerOff => "GroupPowerOff",
            SchedulePurpose::GroupRestart => "GroupRestart",
            SchedulePurpose::GroupFwUpdate => "GroupFirmwareUpdate",
            SchedulePurpose::GroupBiosApplySettings => "GroupBiosSettings",
            SchedulePurpose::GroupIloApplySettings => "GroupIloSettings",
            SchedulePurpose::GroupOsInstallation => "GroupOSInstallation",
        }
    }
}

impl FromStr for SchedulePurpose {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SERVER_POWER_ON" => Ok(SchedulePurpose::ServerPowerOn),
            "SERVER_POWER_OFF" => Ok(SchedulePurpose::ServerPowerOff),
            "SERVER_RESTART" => Ok(SchedulePurpose::ServerRestart),
            "SERVER_COLD_BOOT" => Ok(SchedulePurpose::ServerColdBoot),
            "SERVER_FW_UPDATE" => Ok(SchedulePurpose::ServerFwUpdate),
            "SERVER_EXTERNAL_STORAGE_DETAILS" => Ok(SchedulePurpose::ServerExternalStorageDetails),
            "GROUP_POWER_ON" => Ok(SchedulePurpose::GroupPowerOn),
            "GROUP_POWER_OFF" => Ok(SchedulePurpose::GroupPowerOff),
            "GROUP_RESTART" => Ok(SchedulePurpose::GroupRestart),
            "GROUP_FW_UPDATE" => Ok(SchedulePurpose::GroupFwUpdate),
            "GROUP_BIOS_APPLY_SETTINGS" => Ok(SchedulePurpose::GroupBiosApplySettings),
            "GROUP_ILO_APPLY_SETTINGS" => Ok(SchedulePurpose::GroupIloApplySettings),
            "GROUP_OS_INSTALLATION" => Ok(SchedulePurpose::GroupOsInstallation),
            _ => Err(()),
        }
    }
}

impl fmt::Display for SchedulePurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn serialize_start_at<S: Serializer>(start_at: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&start_at.to_rfc3339_opts(SecondsFormat::Secs, true))
}

/// When a schedule first fires and, optionally, how often it repeats.
///
/// `interval` is an ISO-8601 period. `None` means a one-shot schedule and is
/// omitted from the wire body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleDefinition {
    #[serde(serialize_with = "serialize_start_at")]
    pub start_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<String>,
}

/// The REST call the remote scheduler performs each time the schedule fires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledOperation {
    #[serde(rename = "type")]
    pub kind: String,
    pub method: String,
    pub uri: String,
    #[serde(default)]
    pub body: Value,
}

/// Body POSTed to the schedules endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulePayload {
    pub name: String,
    pub description: String,
    pub purpose: SchedulePurpose,
    pub associated_resource_uri: String,
    pub schedule: ScheduleDefinition,
    pub operation: ScheduledOperation,
}

/// Schedule resource as returned by the remote service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    #[serde(default)]
    pub id: String,
    #[serde(alias = "uri")]
    pub resource_uri: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub purpose: Option<String>,
    #[serde(default)]
    pub associated_resource_uri: Option<String>,
    #[serde(default)]
    pub schedule: Option<ScheduleDefinition>,
    #[serde(default)]
    pub operation: Option<ScheduledOperation>,
    #[serde(default)]
    pub next_start_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_run: Option<Value>,
}

impl Schedule {
    pub fn purpose(&self) -> Option<SchedulePurpose> {
        self.purpose.as_deref().and_then(|p| p.parse().ok())
    }
}

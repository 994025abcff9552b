use serde::{Deserialize, Serialize};

use crate::range::Instant;

/// Lifecycle state of an application instance. Used only for display
/// classification by the renderer; layout math ignores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceState {
    Booting,
    Starting,
    Deploying,
    Up,
    Stopping,
    Deleted,
}

/// Snapshot of one application instance as supplied by the instances
/// feed. The engine treats the whole instance list as replaced on every
/// update; there is no incremental diffing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceRecord {
    pub id: String,
    /// Vertical slot; rows stack by this number.
    pub instance_number: u32,
    pub creation_date: Instant,
    /// Present only once the instance reached its terminal state.
    pub deletion_date: Option<Instant>,
    pub state: InstanceState,
    /// Not validated against known deployments; whatever the feed sends.
    pub deployment_id: Option<String>,
}

/// One deployment or scaling action on the timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub id: String,
    /// Instant the action was initiated.
    pub date: Instant,
    /// Cause tag, used by the renderer for icon selection only.
    pub action: String,
}

/// An incoming log line. The aggregation core reads none of these
/// fields; only the number of events per batch matters to it. The
/// payload is carried so collaborators (filter UI, detail views) can
/// work with the same objects.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogEvent {
    pub timestamp: Option<Instant>,
    pub message: String,
}

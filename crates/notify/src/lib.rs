//! caseflow_notify
//!
//! Notification dispatch collaborator. Runs AFTER a transition is committed and
//! can never influence it: a failed dispatch is logged, not propagated into the case.
//! No delivery mechanics here (push/email); dispatchers record who should hear
//! about what.

use async_trait::async_trait;
use caseflow_audit_spec::{ActorId, CaseId, CaseKind, Role, Visibility};
use caseflow_workflow::{Applied, SideEffectHint};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub role: Role,
    /// Present when the case binds an identity to the role.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ActorId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub case_id: CaseId,
    pub kind: CaseKind,
    pub event: String,
    pub seq: u64,
    pub status: String,
    pub visibility: Visibility,
    pub recipients: Vec<Recipient>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_case: Option<CaseId>,
    pub at: DateTime<Utc>,
}

impl Notification {
    /// Build the notification a committed transition calls for, keyed on the
    /// emitted event, the new status and the new assignees.
    pub fn from_applied(applied: &Applied) -> Option<Self> {
        let case = &applied.case;
        let parties = case.parties();
        let recipient = |role: Role| Recipient { role, id: parties.get(&role).cloned() };

        let mut recipients: Vec<Recipient> = match applied.side_effect {
            SideEffectHint::None => return None,
            SideEffectHint::NotifyAssignees if !case.is_terminal() => {
                case.assigned_to().iter().copied().map(recipient).collect()
            }
            // A case that just closed has nobody assigned; tell its parties instead.
            SideEffectHint::NotifyAssignees | SideEffectHint::NotifyParties => {
                let mut r: Vec<Recipient> = parties.keys().copied().map(recipient).collect();
                r.extend(case.assigned_to().iter().copied().map(recipient));
                r
            }
            SideEffectHint::SpawnRetaliationCase => applied
                .spawned
                .as_ref()
                .map(|child| child.assigned_to().iter().copied().map(recipient).collect())
                .unwrap_or_default(),
        };
        let mut seen = Vec::new();
        recipients.retain(|r| {
            let fresh = !seen.contains(&r.role);
            seen.push(r.role);
            fresh
        });
        if recipients.is_empty() {
            return None;
        }

        let ev = &applied.event;
        Some(Self {
            case_id: case.id().clone(),
            kind: case.kind(),
            event: ev.event.event.clone(),
            seq: ev.seq,
            status: case.status().code(),
            visibility: ev.event.visibility,
            recipients,
            linked_case: ev.event.outcome.linked_case.clone(),
            at: ev.event.timestamp,
        })
    }
}

#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn dispatch(&self, n: &Notification) -> Result<(), NotifyError>;
}

/// Appends notifications to a JSONL outbox for a delivery worker to drain.
pub struct OutboxDispatcher {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl OutboxDispatcher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), write_lock: Mutex::new(()) }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

#[async_trait]
impl NotificationDispatcher for OutboxDispatcher {
    async fn dispatch(&self, n: &Notification) -> Result<(), NotifyError> {
        let mut line = serde_json::to_vec(n)?;
        line.push(b'\n');

        let _guard = self.write_lock.lock().await;
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                tokio::fs::create_dir_all(dir).await?;
            }
        }
        let mut f = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        f.write_all(&line).await?;
        f.flush().await?;
        Ok(())
    }
}

/// Records notifications in the log only.
pub struct LogDispatcher;

#[async_trait]
impl NotificationDispatcher for LogDispatcher {
    async fn dispatch(&self, n: &Notification) -> Result<(), NotifyError> {
        let roles: Vec<&str> = n.recipients.iter().map(|r| r.role.label()).collect();
        info!(case_id = %n.case_id, event = %n.event, status = %n.status, recipients = ?roles, "notification");
        Ok(())
    }
}

/// Dispatch whatever `applied` calls for. Failures are logged and swallowed
/// because the transition is already committed.
pub async fn notify_committed(dispatcher: &dyn NotificationDispatcher, applied: &Applied) -> Option<Notification> {
    let n = Notification::from_applied(applied)?;
    if let Err(e) = dispatcher.dispatch(&n).await {
        warn!(case_id = %n.case_id, event = %n.event, error = %e, "notification dispatch failed");
    }
    Some(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use caseflow_audit_spec::{ActionKind, Actor, Satisfaction};
    use caseflow_workflow::{apply, open_case, ActionRequest, OpenCase, Payload};
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn at(min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 8, min, 0).unwrap()
    }

    fn responded() -> Applied {
        let case = open_case(OpenCase::critical_insight("sup-1", "emp-1", "Feedback", "Unclear goals"), at(0)).unwrap();
        apply(
            &case,
            ActionRequest::new(Actor::new(Role::Supervisor, "sup-1"), ActionKind::Respond, Payload::text("OKRs drafted")),
            at(1),
        )
        .unwrap()
    }

    #[test]
    fn response_notifies_the_bound_employee() {
        let n = Notification::from_applied(&responded()).unwrap();
        assert_eq!(n.event, "Supervisor Responded");
        assert_eq!(n.status, "pending_employee_acknowledgement");
        assert_eq!(n.recipients, vec![Recipient { role: Role::Employee, id: Some(ActorId::new("emp-1")) }]);
    }

    #[test]
    fn resolution_notifies_the_parties_of_a_closed_case() {
        let first = responded();
        let done = apply(
            &first.case,
            ActionRequest::new(
                Actor::new(Role::Employee, "emp-1"),
                ActionKind::Acknowledge,
                Payload::default().with_satisfaction(Satisfaction::Satisfied),
            ),
            at(2),
        )
        .unwrap();
        let n = Notification::from_applied(&done).unwrap();
        assert_eq!(n.status, "resolved");
        let roles: Vec<Role> = n.recipients.iter().map(|r| r.role).collect();
        assert_eq!(roles, vec![Role::Employee, Role::Supervisor]);
    }

    #[tokio::test]
    async fn outbox_appends_one_line_per_notification() {
        let td = TempDir::new().unwrap();
        let outbox = OutboxDispatcher::new(td.path().join("runtime").join("outbox.jsonl"));
        let applied = responded();

        notify_committed(&outbox, &applied).await.unwrap();
        notify_committed(&outbox, &applied).await.unwrap();

        let text = tokio::fs::read_to_string(outbox.path()).await.unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let back: Notification = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(back.case_id, *applied.case.id());
    }

    #[tokio::test]
    async fn log_dispatcher_never_fails() {
        assert!(notify_committed(&LogDispatcher, &responded()).await.is_some());
    }
}

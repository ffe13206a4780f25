//! Post-commit notifications.
//!
//! The service pushes a [`NotificationEvent`] onto a bounded channel after a
//! transition is persisted and returns without waiting. A dispatcher task
//! drains the channel into a [`Notifier`]. Delivery failures and a full queue
//! are logged and dropped; they never affect the committed transition.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use lifeline_core::{GrantId, UserId};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

use crate::error::CollaboratorError;

/// Who a notification is for.
#[derive(Clone, PartialEq, Eq)]
pub enum Recipient {
    /// An invitee without an account binding yet.
    Email(String),
    /// A known user; the delivery layer resolves the address.
    User(UserId),
}

impl fmt::Debug for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recipient::Email(_) => f.write_str("Email(<redacted>)"),
            Recipient::User(id) => write!(f, "User({})", id),
        }
    }
}

/// Message template to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Template {
    InvitationCreated,
    InvitationAccepted,
    InvitationDeclined,
    EscrowCompleted,
    AccessRequested,
    AccessApproved,
    AccessActivated,
    RequestRejected,
    EscrowInvalidated,
    GrantRevoked,
}

impl Template {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Template::InvitationCreated => "emergency-access-invitation",
            Template::InvitationAccepted => "emergency-access-accepted",
            Template::InvitationDeclined => "emergency-access-declined",
            Template::EscrowCompleted => "emergency-access-confirmed",
            Template::AccessRequested => "emergency-access-requested",
            Template::AccessApproved => "emergency-access-approved",
            Template::AccessActivated => "emergency-access-activated",
            Template::RequestRejected => "emergency-access-request-rejected",
            Template::EscrowInvalidated => "emergency-access-invalidated",
            Template::GrantRevoked => "emergency-access-revoked",
        }
    }
}

/// One outbound notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationEvent {
    pub recipient: Recipient,
    pub template: Template,
    pub vars: BTreeMap<String, String>,
}

impl NotificationEvent {
    pub fn new(recipient: Recipient, template: Template, grant_id: GrantId) -> Self {
        let mut vars = BTreeMap::new();
        vars.insert("grant_id".to_string(), grant_id.to_string());
        Self {
            recipient,
            template,
            vars,
        }
    }

    pub fn with(mut self, key: &str, value: impl ToString) -> Self {
        self.vars.insert(key.to_string(), value.to_string());
        self
    }
}

/// Delivers notifications (mail, push, ...).
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: &NotificationEvent) -> Result<(), CollaboratorError>;
}

/// Sending half held by the service.
#[derive(Debug, Clone)]
pub struct NotificationQueue {
    tx: Option<mpsc::Sender<NotificationEvent>>,
}

/// Receiving half, handed to [`spawn_dispatcher`].
#[derive(Debug)]
pub struct NotificationReceiver {
    rx: mpsc::Receiver<NotificationEvent>,
}

/// Create a bounded notification queue.
///
/// `capacity` must be non-zero; `AccessConfig::validate` enforces this.
pub fn channel(capacity: usize) -> (NotificationQueue, NotificationReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (NotificationQueue { tx: Some(tx) }, NotificationReceiver { rx })
}

impl NotificationQueue {
    /// A queue that discards everything.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Hand off without waiting.
    pub fn emit(&self, event: NotificationEvent) {
        let Some(tx) = &self.tx else {
            return;
        };
        match tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                tracing::warn!(
                    template = event.template.as_str(),
                    "notification queue full, dropping notification"
                );
            }
            Err(TrySendError::Closed(event)) => {
                tracing::warn!(
                    template = event.template.as_str(),
                    "notification dispatcher gone, dropping notification"
                );
            }
        }
    }
}

impl NotificationReceiver {
    /// Take everything currently queued without waiting.
    pub fn drain(&mut self) -> Vec<NotificationEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }
}

/// Run a task that forwards queued notifications to `notifier`.
///
/// The task ends when every [`NotificationQueue`] clone is dropped.
pub fn spawn_dispatcher(
    mut receiver: NotificationReceiver,
    notifier: Arc<dyn Notifier>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = receiver.rx.recv().await {
            if let Err(e) = notifier.notify(&event).await {
                tracing::warn!(
                    error = %e,
                    template = event.template.as_str(),
                    "notification delivery failed"
                );
            }
        }
        tracing::debug!("notification dispatcher stopped");
    })
}

/// Records notifications instead of sending them.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<NotificationEvent>>,
    failing: AtomicBool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later delivery fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn events(&self) -> Vec<NotificationEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, event: &NotificationEvent) -> Result<(), CollaboratorError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(CollaboratorError::new("notifier", "delivery refused"));
        }
        self.events
            .lock()
            .map_err(|_| CollaboratorError::new("notifier", "lock poisoned"))?
            .push(event.clone());
        Ok(())
    }
}

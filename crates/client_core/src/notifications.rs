//! Push-message fan-out and tap routing.

use async_trait::async_trait;
use shared::{
    domain::ReportId,
    protocol::{NotificationKind, PushData, PushMessage},
};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};

use crate::{error::ClientError, session::Session, PushTokenSink};

const DEFAULT_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    PetDetail { report_id: Option<ReportId> },
    Messages { report_id: Option<ReportId> },
    Home,
}

pub fn route(data: &PushData) -> Destination {
    let report_id = data.report_id.clone();
    match data.kind {
        NotificationKind::LostPetAlert
        | NotificationKind::SightingUpdate
        | NotificationKind::PetFound => Destination::PetDetail { report_id },
        NotificationKind::DirectMessage => Destination::Messages { report_id },
        NotificationKind::Other => Destination::Home,
    }
}

/// Delivers foreground push messages to every live [`Subscription`].
#[derive(Debug, Clone)]
pub struct NotificationHub {
    events: broadcast::Sender<PushMessage>,
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl NotificationHub {
    pub fn new(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity.max(1));
        Self { events }
    }

    pub fn publish(&self, message: PushMessage) -> usize {
        match self.events.send(message) {
            Ok(receivers) => receivers,
            Err(_) => {
                debug!("push message dropped: no subscribers");
                0
            }
        }
    }

    pub fn subscribe(&self) -> Subscription {
        Subscription {
            receiver: self.events.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.events.receiver_count()
    }
}

#[derive(Debug)]
pub struct Subscription {
    receiver: broadcast::Receiver<PushMessage>,
}

impl Subscription {
    /// Next message, or `None` once every hub handle is gone. Messages lost
    /// to lag are skipped.
    pub async fn recv(&mut self) -> Option<PushMessage> {
        loop {
            match self.receiver.recv().await {
                Ok(message) => return Some(message),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "notification subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    pub fn unsubscribe(self) {}
}

#[async_trait]
pub trait PushSource: Send + Sync {
    async fn request_permission(&self) -> Result<bool, ClientError>;
    async fn device_token(&self) -> Result<String, ClientError>;
}

#[derive(Debug, Clone)]
pub struct FixedToken(pub String);

#[async_trait]
impl PushSource for FixedToken {
    async fn request_permission(&self) -> Result<bool, ClientError> {
        Ok(true)
    }

    async fn device_token(&self) -> Result<String, ClientError> {
        Ok(self.0.clone())
    }
}

/// Asks for permission, fetches the device token and uploads it for the
/// session user. Never fails; returns the token only when it was stored.
pub async fn register_device(
    sink: &dyn PushTokenSink,
    session: &Session,
    source: &dyn PushSource,
) -> Option<String> {
    match source.request_permission().await {
        Ok(true) => {}
        Ok(false) => {
            info!("push permission not granted");
            return None;
        }
        Err(err) => {
            warn!(error = %err, "push permission request failed");
            return None;
        }
    }

    let token = match source.device_token().await {
        Ok(token) => token,
        Err(err) => {
            warn!(error = %err, "failed to obtain push token");
            return None;
        }
    };

    match sink.store_push_token(session.user_id(), &token).await {
        Ok(()) => {
            info!(user_id = %session.user_id(), "device registered for push");
            Some(token)
        }
        Err(err) => {
            warn!(user_id = %session.user_id(), error = %err, "failed to upload push token");
            None
        }
    }
}

#[cfg(test)]
#[path = "tests/notification_tests.rs"]
mod tests;

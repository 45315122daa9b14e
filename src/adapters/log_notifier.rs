//! Notifier that publishes alerts as log events.

use tracing::{info, warn};

use crate::domain::error::EngineError;
use crate::domain::events::{Notification, NotificationKind};
use crate::ports::notifier_port::NotifierPort;

#[derive(Debug, Default)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

impl NotifierPort for LogNotifier {
    fn notify(&self, notification: &Notification) -> Result<(), EngineError> {
        match notification.kind {
            NotificationKind::OrderFailed => {
                warn!(target: "crosstrader::alerts", kind = %notification.kind, "{}", notification.message)
            }
            _ => info!(target: "crosstrader::alerts", kind = %notification.kind, "{}", notification.message),
        }
        Ok(())
    }
}

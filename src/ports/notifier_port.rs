//! Notification port trait.

use crate::domain::error::EngineError;
use crate::domain::events::Notification;

pub trait NotifierPort {
    fn notify(&self, notification: &Notification) -> Result<(), EngineError>;
}

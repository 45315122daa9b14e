//! Order execution port trait.

use crate::domain::error::EngineError;
use crate::domain::order::{OrderConfirmation, OrderRequest};

pub trait OrderPort {
    /// Submit an order and wait for its fill. Rejections and timeouts come
    /// back as `OrderRejected` / `OrderTimeout`.
    fn submit_order(&self, request: &OrderRequest) -> Result<OrderConfirmation, EngineError>;
}

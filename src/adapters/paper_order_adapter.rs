//! Paper order adapter for mock trading.
//!
//! Intents are recorded and confirmed immediately at their reference price.
//! Nothing is routed to a venue.

use std::cell::{Cell, RefCell};

use tracing::info;

use crate::domain::error::EngineError;
use crate::domain::order::{OrderConfirmation, OrderRequest};
use crate::ports::order_port::OrderPort;

#[derive(Default)]
pub struct PaperOrderAdapter {
    next_id: Cell<u64>,
    submitted: RefCell<Vec<OrderRequest>>,
}

impl PaperOrderAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submitted(&self) -> Vec<OrderRequest> {
        self.submitted.borrow().clone()
    }
}

impl OrderPort for PaperOrderAdapter {
    fn submit_order(&self, request: &OrderRequest) -> Result<OrderConfirmation, EngineError> {
        if request.quantity == 0 {
            return Err(EngineError::OrderRejected {
                symbol: request.symbol.clone(),
                reason: "quantity must be at least 1".to_string(),
            });
        }

        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        self.submitted.borrow_mut().push(request.clone());

        let order_id = format!("PAPER-{id:06}");
        info!(
            order_id = %order_id,
            symbol = %request.symbol,
            side = %request.side,
            quantity = request.quantity,
            price = request.reference_price,
            "[MOCK] order filled"
        );

        Ok(OrderConfirmation {
            order_id,
            symbol: request.symbol.clone(),
            side: request.side,
            quantity: request.quantity,
            fill_price: request.reference_price,
        })
    }
}

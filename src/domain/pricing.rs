//! How much quota to buy for a given usage pattern.

use super::model::VirtualService;

/// Quota units bought per storage session when nothing smarter is known.
pub const DEFAULT_QUANTITY: u128 = 10_000_000;

pub trait BiddingAgent: Send + Sync {
    fn quantity(&self, service: &VirtualService) -> u128;
}

/// Bids the same quantity for every service.
#[derive(Debug, Clone, Copy)]
pub struct FixedQuantityAgent {
    quantity: u128,
}

impl FixedQuantityAgent {
    pub fn new(quantity: u128) -> Self {
        Self { quantity }
    }
}

impl Default for FixedQuantityAgent {
    fn default() -> Self {
        Self::new(DEFAULT_QUANTITY)
    }
}

impl BiddingAgent for FixedQuantityAgent {
    fn quantity(&self, _service: &VirtualService) -> u128 {
        self.quantity
    }
}

//! Mineral economy.
//!
//! The player has a single bounded mineral pool. Miners deposit into it and
//! building purchases draw from it. All amounts are integers.

use serde::{Deserialize, Serialize};

/// Cost of a building.
///
/// Gas is carried for data compatibility; only minerals are charged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Price {
    /// Mineral cost.
    pub minerals: i32,
    /// Gas cost (informational).
    pub gas: i32,
}

impl Price {
    /// Create a price.
    #[must_use]
    pub const fn new(minerals: i32, gas: i32) -> Self {
        Self { minerals, gas }
    }

    /// Minerals returned when a finished building is sold.
    #[must_use]
    pub const fn sell_refund(self) -> i32 {
        self.minerals
    }

    /// Minerals returned when construction is cancelled (80 %).
    #[must_use]
    pub const fn cancel_refund(self) -> i32 {
        self.minerals * 4 / 5
    }
}

/// Bounded mineral pool: `0 <= available <= max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourcePool {
    available: i32,
    max: i32,
}

impl Default for ResourcePool {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl ResourcePool {
    /// Create a full pool with capacity `max`.
    #[must_use]
    pub const fn new(max: i32) -> Self {
        let max = if max < 0 { 0 } else { max };
        Self {
            available: max,
            max,
        }
    }

    /// Create a pool holding `available` (clamped into `[0, max]`).
    #[must_use]
    pub fn with_available(available: i32, max: i32) -> Self {
        let max = max.max(0);
        Self {
            available: available.clamp(0, max),
            max,
        }
    }

    /// Minerals in the pool.
    #[must_use]
    pub const fn available(&self) -> i32 {
        self.available
    }

    /// Pool capacity.
    #[must_use]
    pub const fn max(&self) -> i32 {
        self.max
    }

    /// Add minerals, clamped to capacity. Returns the amount actually added.
    pub fn add(&mut self, amount: i32) -> i32 {
        let before = self.available;
        self.available = self.available.saturating_add(amount).clamp(0, self.max);
        self.available - before
    }

    /// Take up to `request` minerals. Returns the amount granted.
    pub fn consume(&mut self, request: i32) -> i32 {
        let granted = request.clamp(0, self.available);
        self.available -= granted;
        granted
    }

    /// Pay for `price` in full, or not at all.
    ///
    /// A partial grant is refunded and `false` returned, leaving the pool as
    /// it was.
    pub fn purchase(&mut self, price: Price) -> bool {
        let granted = self.consume(price.minerals);
        if granted < price.minerals {
            self.add(granted);
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consume_more_than_available() {
        let mut pool = ResourcePool::with_available(1000, 1000);
        assert_eq!(pool.consume(1500), 1000);
        assert_eq!(pool.available(), 0);
    }

    #[test]
    fn test_add_is_clamped() {
        let mut pool = ResourcePool::with_available(980, 1000);
        assert_eq!(pool.add(50), 20);
        assert_eq!(pool.available(), 1000);
    }

    #[test]
    fn test_negative_requests_are_ignored() {
        let mut pool = ResourcePool::with_available(10, 100);
        assert_eq!(pool.consume(-5), 0);
        assert_eq!(pool.add(-50), -10);
        assert_eq!(pool.available(), 0);
    }

    #[test]
    fn test_purchase_refunds_when_short() {
        let mut pool = ResourcePool::with_available(120, 1000);

        assert!(!pool.purchase(Price::new(150, 0)));
        assert_eq!(pool.available(), 120);

        assert!(pool.purchase(Price::new(100, 25)));
        assert_eq!(pool.available(), 20);
    }

    #[test]
    fn test_refund_amounts() {
        let price = Price::new(250, 0);
        assert_eq!(price.sell_refund(), 250);
        assert_eq!(price.cancel_refund(), 200);
    }

    #[test]
    fn test_new_pool_starts_full() {
        let pool = ResourcePool::new(500);
        assert_eq!(pool.available(), 500);
        assert_eq!(pool.max(), 500);
    }
}

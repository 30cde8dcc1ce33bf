use crate::error::OrderError;

/// Unique order identifier.
pub type OrderId = u64;

/// Price expressed in ticks (fixed-point, minimum-price-increment units).
///
/// Keying price levels on an exact integer avoids the rounding and
/// equality hazards of a float map key; converting to a display price
/// (ticks / ticks-per-unit) is a formatting concern left to callers.
pub type Price = i64;

/// Quantity of an order, always non-negative.
pub type Quantity = u64;

/// The side of the book an order rests on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// The opposite side, used to find the book an order can cross into.
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

/// Lifetime policy governing how an order is admitted and how its residue
/// (if any) is handled after matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderType {
    /// Rests indefinitely until filled or cancelled.
    GoodTillCancel,
    /// Matches as much as possible immediately; any remainder is cancelled.
    FillAndKill,
    /// Matches fully and immediately or is cancelled entirely; no partial fills rest.
    FillOrKill,
    /// Rests until the session-close boundary, then is cancelled by the pruner.
    GoodForDay,
    /// Matches immediately at the best available price(s); never rests.
    ///
    /// Wired at admission: the submitted price is rewritten to a
    /// side-dependent sentinel and the order is treated as `FillAndKill`
    /// for the remainder of admission.
    Market,
}

/// A resting or incoming order.
///
/// Identity (`id`, `side`, `order_type`, `price`) is immutable once
/// constructed; only `remaining_quantity` and `timestamp` change over the
/// order's life, and only via [`Order::fill`] and the book under the
/// engine lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub id: OrderId,
    pub side: Side,
    pub order_type: OrderType,
    pub price: Price,
    pub initial_quantity: Quantity,
    remaining_quantity: Quantity,
    /// Monotonically non-decreasing arrival order, assigned at admission.
    pub timestamp: u64,
}

impl Order {
    /// Construct a new order. `price` is validated as non-negative and
    /// `initial_quantity` as strictly positive; the `Market` sentinel
    /// rewrite happens at admission, not here.
    pub fn new(
        id: OrderId,
        side: Side,
        order_type: OrderType,
        price: Price,
        initial_quantity: Quantity,
        timestamp: u64,
    ) -> Result<Self, OrderError> {
        if initial_quantity == 0 {
            return Err(OrderError::NonPositiveQuantity);
        }
        if price < 0 {
            return Err(OrderError::NegativePrice);
        }
        Ok(Self {
            id,
            side,
            order_type,
            price,
            initial_quantity,
            remaining_quantity: initial_quantity,
            timestamp,
        })
    }

    pub fn remaining_quantity(&self) -> Quantity {
        self.remaining_quantity
    }

    pub fn filled_quantity(&self) -> Quantity {
        self.initial_quantity - self.remaining_quantity
    }

    pub fn is_filled(&self) -> bool {
        self.remaining_quantity == 0
    }

    /// Reduce the remaining quantity by `quantity`.
    ///
    /// Filling for more than what remains is an invariant violation — a
    /// bug in the matching loop, not a user-facing error — so it panics
    /// rather than returning `Result`.
    pub fn fill(&mut self, quantity: Quantity) {
        assert!(
            quantity <= self.remaining_quantity,
            "order {} filled for {} but only {} remains",
            self.id,
            quantity,
            self.remaining_quantity
        );
        self.remaining_quantity -= quantity;
    }

    /// Rewrite this order in place to the Market sentinel price for its
    /// side: the maximum representable price for `BUY`, zero for `SELL`.
    /// Admission then treats it as `FillAndKill`.
    pub fn normalize_market_price(&mut self) {
        debug_assert_eq!(self.order_type, OrderType::Market);
        self.price = match self.side {
            Side::Buy => Price::MAX,
            Side::Sell => 0,
        };
    }
}

/// Fields the caller supplies for a modification; the original order's
/// `order_type` is preserved by the engine and is not part of this
/// struct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderModify {
    pub order_id: OrderId,
    pub side: Side,
    pub price: Price,
    pub quantity: Quantity,
}

impl OrderModify {
    pub fn new(
        order_id: OrderId,
        side: Side,
        price: Price,
        quantity: Quantity,
    ) -> Result<Self, OrderError> {
        if quantity == 0 {
            return Err(OrderError::NonPositiveQuantity);
        }
        if price < 0 {
            return Err(OrderError::NegativePrice);
        }
        Ok(Self {
            order_id,
            side,
            price,
            quantity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_quantity() {
        let err = Order::new(1, Side::Buy, OrderType::GoodTillCancel, 100, 0, 0).unwrap_err();
        assert_eq!(err, OrderError::NonPositiveQuantity);
    }

    #[test]
    fn rejects_negative_price() {
        let err = Order::new(1, Side::Buy, OrderType::GoodTillCancel, -1, 10, 0).unwrap_err();
        assert_eq!(err, OrderError::NegativePrice);
    }

    #[test]
    fn fill_tracks_remaining_and_filled() {
        let mut order = Order::new(1, Side::Buy, OrderType::GoodTillCancel, 100, 10, 0).unwrap();
        order.fill(4);
        assert_eq!(order.remaining_quantity(), 6);
        assert_eq!(order.filled_quantity(), 4);
        assert!(!order.is_filled());
        order.fill(6);
        assert!(order.is_filled());
    }

    #[test]
    #[should_panic]
    fn fill_beyond_remaining_panics() {
        let mut order = Order::new(1, Side::Buy, OrderType::GoodTillCancel, 100, 10, 0).unwrap();
        order.fill(11);
    }

    #[test]
    fn market_sentinel_rewrite() {
        let mut buy = Order::new(1, Side::Buy, OrderType::Market, 50, 10, 0).unwrap();
        buy.normalize_market_price();
        assert_eq!(buy.price, Price::MAX);

        let mut sell = Order::new(2, Side::Sell, OrderType::Market, 50, 10, 0).unwrap();
        sell.normalize_market_price();
        assert_eq!(sell.price, 0);
    }
}

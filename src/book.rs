use std::collections::{BTreeMap, HashMap};

use crate::level::Level;
use crate::order::{Order, OrderId, Price, Side};

/// Price-keyed collection for one side of the book.
///
/// `BTreeMap` gives O(log n) best-price access and O(log n) per-price
/// lookup (O(1) is only achievable with a side-specific hash map in
/// addition, which isn't worth the bookkeeping at this scale). The BUY
/// side is read max-first (best bid = highest price); the SELL side
/// min-first (best ask = lowest price) — both achievable directly from
/// `BTreeMap`'s ordering without a `Reverse` wrapper, since we pick the
/// iteration direction per side instead.
pub type SideBook = BTreeMap<Price, Level>;

/// Where an order currently lives: which side and which price level. The
/// `OrderIndex` holds these as non-owning references into the `SideBook`s;
/// the invariant that an id appears in the index iff it appears in some
/// `LevelQueue` is maintained by always updating both together under the
/// engine lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderLocation {
    pub side: Side,
    pub price: Price,
}

pub type OrderIndex = HashMap<OrderId, OrderLocation>;

/// Aggregates both side books and the order index. The `Book` exclusively
/// owns every `Order`, `Level`, and its aggregate; the index is metadata
/// pointing back into the books.
#[derive(Debug, Default)]
pub struct Book {
    pub bids: SideBook,
    pub asks: SideBook,
    pub index: OrderIndex,
}

impl Book {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn side(&self, side: Side) -> &SideBook {
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        }
    }

    pub fn side_mut(&mut self, side: Side) -> &mut SideBook {
        match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        }
    }

    /// The best (highest) bid price, if any bids rest.
    pub fn best_bid(&self) -> Option<Price> {
        self.bids.keys().next_back().copied()
    }

    /// The best (lowest) ask price, if any asks rest.
    pub fn best_ask(&self) -> Option<Price> {
        self.asks.keys().next().copied()
    }

    pub fn size(&self) -> usize {
        self.index.len()
    }

    /// Look up a live order by id without removing it. O(1) to the level
    /// via the index, then O(k) within it — same cost profile as `remove`.
    pub fn get(&self, order_id: OrderId) -> Option<&Order> {
        let location = self.index.get(&order_id)?;
        self.side(location.side)
            .get(&location.price)?
            .iter()
            .find(|o| o.id == order_id)
    }

    /// Insert `order` at the tail of its `(side, price)` level, creating
    /// the level if absent, updating the aggregate, and registering the id
    /// in the index.
    pub fn insert(&mut self, order: Order) {
        let id = order.id;
        let side = order.side;
        let price = order.price;
        self.side_mut(side).entry(price).or_default().push_back(order);
        self.index.insert(id, OrderLocation { side, price });
    }

    /// Remove `order_id` from wherever it rests, dropping the level if it
    /// becomes empty. Returns the removed order.
    pub fn remove(&mut self, order_id: OrderId) -> Option<Order> {
        let location = self.index.remove(&order_id)?;
        let side_book = self.side_mut(location.side);
        let level = side_book.get_mut(&location.price)?;
        let order = level.remove(order_id);
        if level.should_drop() {
            side_book.remove(&location.price);
        }
        order
    }

    /// Fill the front order of `(side, price)` by `quantity`: decrements
    /// its remaining quantity, reduces the level's aggregate quantity, and
    /// — if the order is now fully filled — pops
    /// it and drops the level if it becomes empty. Returns the filled
    /// order's id. Panics if the level or its front order is absent; only
    /// called by the matching loop immediately after confirming both
    /// exist.
    pub fn fill_front(&mut self, side: Side, price: Price, quantity: crate::order::Quantity) -> OrderId {
        let side_book = self.side_mut(side);
        let level = side_book.get_mut(&price).expect("level must exist");
        let front = level.front_mut().expect("level must have a front order");
        front.fill(quantity);
        let id = front.id;
        let filled = front.is_filled();
        level.reduce_quantity(quantity);
        if filled {
            level.pop_filled_front();
            self.index.remove(&id);
        }
        if level.should_drop() {
            side_book.remove(&price);
        }
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::OrderType;

    fn order(id: u64, side: Side, price: Price, qty: u64) -> Order {
        Order::new(id, side, OrderType::GoodTillCancel, price, qty, id).unwrap()
    }

    #[test]
    fn best_bid_and_ask_track_extremes() {
        let mut book = Book::new();
        book.insert(order(1, Side::Buy, 100, 5));
        book.insert(order(2, Side::Buy, 105, 5));
        book.insert(order(3, Side::Sell, 110, 5));
        book.insert(order(4, Side::Sell, 108, 5));

        assert_eq!(book.best_bid(), Some(105));
        assert_eq!(book.best_ask(), Some(108));
    }

    #[test]
    fn insert_then_remove_restores_empty_book() {
        let mut book = Book::new();
        book.insert(order(1, Side::Buy, 100, 5));
        assert_eq!(book.size(), 1);

        let removed = book.remove(1).unwrap();
        assert_eq!(removed.id, 1);
        assert_eq!(book.size(), 0);
        assert!(book.bids.is_empty());
    }

    #[test]
    fn remove_unknown_id_is_none() {
        let mut book = Book::new();
        assert!(book.remove(999).is_none());
    }

    #[test]
    fn index_and_queue_stay_in_sync_across_multiple_levels() {
        let mut book = Book::new();
        book.insert(order(1, Side::Buy, 100, 5));
        book.insert(order(2, Side::Buy, 100, 5));
        book.insert(order(3, Side::Buy, 101, 5));

        book.remove(2);
        assert_eq!(book.bids.get(&100).unwrap().len(), 1);
        assert_eq!(book.index.len(), 2);
        assert!(book.index.contains_key(&1));
        assert!(book.index.contains_key(&3));
    }
}

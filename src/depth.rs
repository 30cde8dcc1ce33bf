use crate::book::Book;
use crate::order::{Price, Quantity};

/// One price level's aggregate depth, detached from the live book.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelInfo {
    pub price: Price,
    pub total_quantity: Quantity,
}

/// A consistent, read-only snapshot of both sides of the book.
///
/// This is a value, not a view: it is built once under the engine lock and
/// owns its data, so callers cannot observe further mutations to the live
/// book through it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBookLevelInfos {
    /// Sorted descending by price (best bid first).
    pub bids: Vec<LevelInfo>,
    /// Sorted ascending by price (best ask first).
    pub asks: Vec<LevelInfo>,
}

/// Build a depth snapshot from `book`. Must be called with the engine lock
/// held.
pub fn snapshot(book: &Book) -> OrderBookLevelInfos {
    let bids = book
        .bids
        .iter()
        .rev()
        .map(|(&price, level)| LevelInfo {
            price,
            total_quantity: level.aggregate.total_quantity,
        })
        .collect();

    let asks = book
        .asks
        .iter()
        .map(|(&price, level)| LevelInfo {
            price,
            total_quantity: level.aggregate.total_quantity,
        })
        .collect();

    OrderBookLevelInfos { bids, asks }
}

use crate::book::Book;
use crate::order::{OrderType, Price, Quantity, Side};
use crate::trade::{Trade, TradeInfo};

/// Whether an order on `side` at `price` would cross at all against the
/// opposite side's best price right now. Used to gate admission of
/// `FillAndKill`/`Market` orders that must cross immediately or be
/// rejected outright.
pub fn can_match(book: &Book, side: Side, price: Price) -> bool {
    match side {
        Side::Buy => book.best_ask().is_some_and(|ba| price >= ba),
        Side::Sell => book.best_bid().is_some_and(|bb| price <= bb),
    }
}

/// Whether `quantity` could be fully filled by walking the opposite side
/// from best price outward, staying within `price`. Used to gate
/// admission of `FillOrKill` orders, which must fill completely or not at
/// all. Uses the cached level aggregates rather than counting individual
/// orders.
pub fn can_fully_fill(book: &Book, side: Side, price: Price, quantity: Quantity) -> bool {
    let mut remaining = quantity;
    match side {
        Side::Buy => {
            for (&ask_price, level) in book.asks.iter() {
                if ask_price > price {
                    break;
                }
                let available = level.aggregate.total_quantity;
                if available >= remaining {
                    return true;
                }
                remaining -= available;
            }
        }
        Side::Sell => {
            for (&bid_price, level) in book.bids.iter().rev() {
                if bid_price < price {
                    break;
                }
                let available = level.aggregate.total_quantity;
                if available >= remaining {
                    return true;
                }
                remaining -= available;
            }
        }
    }
    false
}

/// Runs the matching loop to a fixed point.
///
/// Invariant on entry and exit: the best bid is ≤ the best ask, or one side
/// is empty. Returns the trades produced, in execution order.
///
/// `now` is the wall-clock timestamp (milliseconds since some epoch,
/// caller's choice) stamped onto every [`Trade`] this call produces.
pub fn run(book: &mut Book, now: u64) -> Vec<Trade> {
    let mut trades = Vec::new();

    loop {
        let (bb, ba) = match (book.best_bid(), book.best_ask()) {
            (Some(b), Some(a)) => (b, a),
            _ => break,
        };
        if bb < ba {
            break;
        }

        loop {
            let matched = {
                let bid_front = book.bids.get(&bb).and_then(|l| l.front());
                let ask_front = book.asks.get(&ba).and_then(|l| l.front());
                match (bid_front, ask_front) {
                    (Some(bid), Some(ask)) => Some((
                        bid.timestamp,
                        ask.timestamp,
                        bid.remaining_quantity().min(ask.remaining_quantity()),
                    )),
                    _ => None,
                }
            };
            let Some((bid_ts, ask_ts, quantity)) = matched else {
                break;
            };
            if quantity == 0 {
                break;
            }

            // Aggressor: later arrival; ties favor the bid.
            let aggressor_is_bid = bid_ts >= ask_ts;
            let maker_price = if aggressor_is_bid { ba } else { bb };

            let bid_order_id = book.fill_front(Side::Buy, bb, quantity);
            let ask_order_id = book.fill_front(Side::Sell, ba, quantity);

            trades.push(Trade {
                bid_trade: TradeInfo {
                    order_id: bid_order_id,
                    price: maker_price,
                    quantity,
                },
                ask_trade: TradeInfo {
                    order_id: ask_order_id,
                    price: maker_price,
                    quantity,
                },
                timestamp: now,
            });

            if book.bids.get(&bb).is_none() || book.asks.get(&ba).is_none() {
                break;
            }
        }

        // Top-of-book either emptied, or one side no longer has liquidity
        // at all — either way, re-evaluate best_bid/best_ask from scratch.
        if book.best_bid().is_none() || book.best_ask().is_none() {
            break;
        }
    }

    sweep_fak_residue(book);
    trades
}

/// Post-loop cleanup: a resting FillAndKill (or a Market order, rewritten
/// to FillAndKill at admission) that reached the top of book but could not
/// fill at all is cancelled. Deliberately inspects only the head order at
/// the top of book on each side — FAK orders resting deeper than the top
/// of book are not swept here.
fn sweep_fak_residue(book: &mut Book) {
    if let Some(price) = book.best_bid() {
        let is_fak = book
            .bids
            .get(&price)
            .and_then(|l| l.front())
            .map(|o| o.order_type == OrderType::FillAndKill)
            .unwrap_or(false);
        if is_fak {
            let id = book.bids[&price].front().unwrap().id;
            book.remove(id);
        }
    }
    if let Some(price) = book.best_ask() {
        let is_fak = book
            .asks
            .get(&price)
            .and_then(|l| l.front())
            .map(|o| o.order_type == OrderType::FillAndKill)
            .unwrap_or(false);
        if is_fak {
            let id = book.asks[&price].front().unwrap().id;
            book.remove(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::Order;

    fn order(id: u64, side: Side, order_type: OrderType, price: i64, qty: u64, ts: u64) -> Order {
        Order::new(id, side, order_type, price, qty, ts).unwrap()
    }

    #[test]
    fn simple_cross_matches_price_time_priority() {
        let mut book = Book::new();
        book.insert(order(1, Side::Sell, OrderType::GoodTillCancel, 48, 50, 0));
        book.insert(order(2, Side::Sell, OrderType::GoodTillCancel, 49, 40, 1));
        book.insert(order(3, Side::Buy, OrderType::GoodTillCancel, 50, 100, 2));

        let trades = run(&mut book, 1000);

        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].ask_trade.order_id, 1);
        assert_eq!(trades[0].bid_trade.order_id, 3);
        assert_eq!(trades[0].bid_trade.price, 48);
        assert_eq!(trades[0].bid_trade.quantity, 50);

        assert_eq!(trades[1].ask_trade.order_id, 2);
        assert_eq!(trades[1].bid_trade.price, 49);
        assert_eq!(trades[1].bid_trade.quantity, 40);

        assert_eq!(book.size(), 1);
        let resting = book.bids.get(&50).unwrap().front().unwrap();
        assert_eq!(resting.id, 3);
        assert_eq!(resting.remaining_quantity(), 10);
    }

    #[test]
    fn no_cross_when_best_bid_below_best_ask() {
        let mut book = Book::new();
        book.insert(order(1, Side::Sell, OrderType::GoodTillCancel, 51, 10, 0));
        book.insert(order(2, Side::Buy, OrderType::GoodTillCancel, 50, 10, 1));

        let trades = run(&mut book, 0);
        assert!(trades.is_empty());
        assert_eq!(book.size(), 2);
    }

    #[test]
    fn fak_residue_at_top_of_book_is_cancelled() {
        let mut book = Book::new();
        // Sell 5 @ 100 rests; FAK buy for 10 @ 100 partially fills, residue cancelled.
        book.insert(order(1, Side::Sell, OrderType::GoodTillCancel, 100, 5, 0));
        book.insert(order(2, Side::Buy, OrderType::FillAndKill, 100, 10, 1));

        let trades = run(&mut book, 0);
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].bid_trade.quantity, 5);
        assert_eq!(book.size(), 0);
    }

    #[test]
    fn tie_timestamp_breaks_to_bid_as_aggressor() {
        let mut book = Book::new();
        // Both orders already rest, crossing, with equal timestamps: the
        // tie makes the bid the aggressor, so the ask's price (50) is the
        // maker price, not the bid's (60).
        book.insert(order(1, Side::Sell, OrderType::GoodTillCancel, 50, 10, 5));
        book.insert(order(2, Side::Buy, OrderType::GoodTillCancel, 60, 10, 5));

        let trades = run(&mut book, 0);
        assert_eq!(trades[0].bid_trade.price, 50);
        assert_eq!(trades[0].ask_trade.price, 50);
    }

    #[test]
    fn can_match_requires_opposite_side_liquidity() {
        let mut book = Book::new();
        assert!(!can_match(&book, Side::Buy, 100));
        book.insert(order(1, Side::Sell, OrderType::GoodTillCancel, 101, 10, 0));
        assert!(!can_match(&book, Side::Buy, 100));
        assert!(can_match(&book, Side::Buy, 101));
        assert!(can_match(&book, Side::Sell, 101));
        assert!(!can_match(&book, Side::Sell, 102));
    }

    #[test]
    fn can_fully_fill_walks_depth_across_levels() {
        let mut book = Book::new();
        book.insert(order(1, Side::Sell, OrderType::GoodTillCancel, 100, 5, 0));
        book.insert(order(2, Side::Sell, OrderType::GoodTillCancel, 101, 5, 1));

        assert!(can_fully_fill(&book, Side::Buy, 101, 10));
        assert!(!can_fully_fill(&book, Side::Buy, 100, 10));
        assert!(!can_fully_fill(&book, Side::Buy, 101, 11));
    }
}

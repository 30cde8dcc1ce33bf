//! A single-instrument limit order book matching engine: price-time
//! priority matching, `GoodTillCancel` / `FillAndKill` / `FillOrKill` /
//! `GoodForDay` / `Market` order types, and a session-close pruner for
//! day orders — all behind one exclusive lock per [`engine::OrderBookEngine`].

pub mod book;
pub mod depth;
pub mod engine;
pub mod error;
pub mod level;
pub mod matching;
pub mod order;
pub mod pool;
pub mod pruner;
pub mod trade;

pub use engine::{EngineConfig, OrderBookEngine};
pub use error::OrderError;
pub use order::{Order, OrderId, OrderModify, OrderType, Price, Quantity, Side};
pub use trade::{Trade, TradeInfo};

use clap::Parser;
use order_book_engine::{EngineConfig, Order, OrderType, Side};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Minimal demo driver for the order book engine: seeds a handful of
/// resting orders, submits one that crosses, and prints the resulting
/// trades and depth snapshot before shutting down cleanly.
#[derive(Parser)]
#[command(name = "engine-demo")]
#[command(author = "Andrew Odiit", version = "0.1", about = "Limit order book engine demo")]
struct Cli {
    /// Spin up the background worker pool instead of running inline.
    #[arg(long)]
    threads: bool,
}

fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();
    let engine = order_book_engine::OrderBookEngine::new(EngineConfig {
        use_threads: cli.threads,
        ..EngineConfig::default()
    });

    engine.add_order(Order::new(1, Side::Sell, OrderType::GoodTillCancel, 101, 10, 0)?);
    engine.add_order(Order::new(2, Side::Buy, OrderType::GoodTillCancel, 99, 10, 0)?);
    info!(size = engine.size(), "seeded resting orders");

    let trades = engine.add_order(Order::new(3, Side::Buy, OrderType::GoodTillCancel, 101, 10, 0)?);
    for trade in &trades {
        info!(
            bid_order = trade.bid_trade.order_id,
            ask_order = trade.ask_trade.order_id,
            price = trade.bid_trade.price,
            quantity = trade.bid_trade.quantity,
            "trade executed"
        );
    }

    let depth = engine.get_order_infos();
    info!(bids = ?depth.bids, asks = ?depth.asks, "final depth");

    engine.shutdown();
    Ok(())
}

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{mpsc, Arc, Condvar, Mutex, Weak};
use std::thread::JoinHandle;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, info, warn};

use crate::book::Book;
use crate::depth::{self, OrderBookLevelInfos};
use crate::matching;
use crate::order::{Order, OrderId, OrderModify, OrderType};
use crate::pool::WorkerPool;
use crate::pruner;
use crate::trade::Trade;

/// Environment configuration the core consumes: the session-close
/// boundary the pruner cancels `GoodForDay` orders against, and the
/// worker-pool knobs a batch submitter can opt into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Run `submit_add_order`/`submit_cancel_order` on a background worker
    /// pool instead of the calling thread.
    pub use_threads: bool,
    /// Size of that pool, when `use_threads` is set.
    pub max_workers: usize,
    /// Local wall-clock time of day at which `GoodForDay` orders expire,
    /// as (hour, minute), 24-hour clock.
    pub session_close_local: (u32, u32),
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            use_threads: false,
            max_workers: 4,
            session_close_local: (16, 0),
        }
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Admission, run under the engine lock with a timestamp and wall-clock
/// stamp already assigned by the caller. Returns the trades produced,
/// empty if the order was rejected or rests without crossing.
fn admit(book: &mut Book, mut order: Order, timestamp: u64, now: u64) -> Vec<Trade> {
    if book.index.contains_key(&order.id) {
        debug!(order_id = order.id, "rejected: duplicate order id");
        return Vec::new();
    }

    if order.order_type == OrderType::Market {
        order.normalize_market_price();
        order.order_type = OrderType::FillAndKill;
    }

    if order.order_type == OrderType::FillAndKill
        && !matching::can_match(book, order.side, order.price)
    {
        debug!(order_id = order.id, "rejected: FillAndKill cannot cross");
        return Vec::new();
    }

    if order.order_type == OrderType::FillOrKill
        && !matching::can_fully_fill(book, order.side, order.price, order.remaining_quantity())
    {
        debug!(order_id = order.id, "rejected: FillOrKill cannot fully fill");
        return Vec::new();
    }

    order.timestamp = timestamp;
    book.insert(order);
    matching::run(book, now)
}

/// Cancel-then-resubmit: the original order's type is preserved, its
/// side/price/quantity are replaced by `modify`, and it receives a fresh
/// timestamp — it loses time priority at its new price, exactly as if the
/// caller had cancelled and placed a new order.
fn do_modify(book: &mut Book, modify: OrderModify, timestamp: u64, now: u64) -> Vec<Trade> {
    let Some(original) = book.get(modify.order_id) else {
        return Vec::new();
    };
    let order_type = original.order_type;
    book.remove(modify.order_id);

    // `modify`'s price/quantity were already validated by `OrderModify::new`
    // with the same rules `Order::new` checks, so this cannot fail.
    let replacement = Order::new(
        modify.order_id,
        modify.side,
        order_type,
        modify.price,
        modify.quantity,
        timestamp,
    )
    .expect("OrderModify's fields were already validated at construction");

    admit(book, replacement, timestamp, now)
}

pub(crate) struct Inner {
    book: Mutex<Book>,
    config: EngineConfig,
    next_timestamp: AtomicU64,
    shutdown: AtomicBool,
    wake_lock: Mutex<()>,
    wake: Condvar,
    pruner_handle: Mutex<Option<JoinHandle<()>>>,
    pool: Mutex<Option<WorkerPool>>,
}

/// A cheaply-cloneable handle onto the matching engine: the book, its
/// exclusive lock, the `GoodForDay` pruner thread, and an optional worker
/// pool for batch submitters. Every mutating call takes the lock once,
/// mutates the book, and (where relevant) runs the matching loop to a
/// fixed point before releasing it.
#[derive(Clone)]
pub struct OrderBookEngine(Arc<Inner>);

impl OrderBookEngine {
    pub fn new(config: EngineConfig) -> Self {
        let pool = config
            .use_threads
            .then(|| WorkerPool::new(config.max_workers.max(1)));

        let inner = Arc::new(Inner {
            book: Mutex::new(Book::new()),
            config,
            next_timestamp: AtomicU64::new(0),
            shutdown: AtomicBool::new(false),
            wake_lock: Mutex::new(()),
            wake: Condvar::new(),
            pruner_handle: Mutex::new(None),
            pool: Mutex::new(pool),
        });

        let engine = Self(inner);
        let handle = pruner::spawn(Arc::downgrade(&engine.0));
        *engine.0.pruner_handle.lock().unwrap() = Some(handle);
        let (hour, minute) = config.session_close_local;
        info!(hour, minute, "engine started");
        engine
    }

    /// Reconstruct a handle from a weak reference, for the pruner thread:
    /// it holds no strong reference of its own between wake-ups, so
    /// dropping every [`OrderBookEngine`] handle without calling
    /// [`OrderBookEngine::shutdown`] lets the pruner thread notice (the
    /// next `upgrade` fails) and exit instead of leaking forever.
    pub(crate) fn from_weak(weak: &Weak<Inner>) -> Option<Self> {
        weak.upgrade().map(Self)
    }

    fn next_timestamp(&self) -> u64 {
        self.0.next_timestamp.fetch_add(1, Ordering::SeqCst)
    }

    /// Submit a new order for admission. Returns the trades it produced,
    /// empty if it was rejected outright or simply rests.
    pub fn add_order(&self, order: Order) -> Vec<Trade> {
        let timestamp = self.next_timestamp();
        let now = now_millis();
        let mut book = self.0.book.lock().unwrap();
        admit(&mut book, order, timestamp, now)
    }

    /// Cancel a single resting order. Returns whether it was found.
    pub fn cancel_order(&self, order_id: OrderId) -> bool {
        let mut book = self.0.book.lock().unwrap();
        book.remove(order_id).is_some()
    }

    /// Cancel every id in `order_ids` under a single lock acquisition.
    /// Unknown ids are silently skipped.
    pub fn cancel_orders(&self, order_ids: &[OrderId]) {
        let mut book = self.0.book.lock().unwrap();
        for id in order_ids {
            book.remove(*id);
        }
    }

    /// Modify a resting order in place: equivalent to a cancel immediately
    /// followed by a fresh `add_order` with the original type.
    pub fn order_modify(&self, modify: OrderModify) -> Vec<Trade> {
        let timestamp = self.next_timestamp();
        let now = now_millis();
        let mut book = self.0.book.lock().unwrap();
        do_modify(&mut book, modify, timestamp, now)
    }

    /// Total number of resting orders across both sides.
    pub fn size(&self) -> usize {
        self.0.book.lock().unwrap().size()
    }

    /// A consistent depth snapshot.
    pub fn get_order_infos(&self) -> OrderBookLevelInfos {
        let book = self.0.book.lock().unwrap();
        depth::snapshot(&book)
    }

    /// Submit `add_order` through the worker pool when `use_threads` is
    /// configured, otherwise run it inline. The returned receiver yields
    /// exactly one result.
    pub fn submit_add_order(&self, order: Order) -> mpsc::Receiver<Vec<Trade>> {
        let (tx, rx) = mpsc::channel();
        let guard = self.0.pool.lock().unwrap();
        match &*guard {
            Some(pool) => {
                let engine = self.clone();
                pool.execute(move || {
                    let trades = engine.add_order(order);
                    let _ = tx.send(trades);
                });
            }
            None => {
                drop(guard);
                let _ = tx.send(self.add_order(order));
            }
        }
        rx
    }

    /// Submit `cancel_order` through the worker pool when configured,
    /// otherwise run it inline.
    pub fn submit_cancel_order(&self, order_id: OrderId) -> mpsc::Receiver<bool> {
        let (tx, rx) = mpsc::channel();
        let guard = self.0.pool.lock().unwrap();
        match &*guard {
            Some(pool) => {
                let engine = self.clone();
                pool.execute(move || {
                    let found = engine.cancel_order(order_id);
                    let _ = tx.send(found);
                });
            }
            None => {
                drop(guard);
                let _ = tx.send(self.cancel_order(order_id));
            }
        }
        rx
    }

    pub(crate) fn session_close_local(&self) -> (u32, u32) {
        self.0.config.session_close_local
    }

    pub(crate) fn wake_lock(&self) -> &Mutex<()> {
        &self.0.wake_lock
    }

    pub(crate) fn wake_condvar(&self) -> &Condvar {
        &self.0.wake
    }

    pub(crate) fn is_shutdown(&self) -> bool {
        self.0.shutdown.load(Ordering::SeqCst)
    }

    /// Ids of every resting `GoodForDay` order, snapshotted under the
    /// engine lock and released before the pruner cancels them one at a
    /// time — holding the lock across a potentially large cancellation
    /// sweep is exactly what this two-phase split avoids.
    pub(crate) fn snapshot_gfd_ids(&self) -> Vec<OrderId> {
        let book = self.0.book.lock().unwrap();
        book.bids
            .values()
            .chain(book.asks.values())
            .flat_map(|level| level.iter())
            .filter(|order| order.order_type == OrderType::GoodForDay)
            .map(|order| order.id)
            .collect()
    }

    /// Signal shutdown, wake the pruner and join it, then drain the worker
    /// pool (if any `use_threads` submitter ever used one). Idempotent: a
    /// second call finds no pruner handle and no pool left to tear down,
    /// and returns immediately.
    pub fn shutdown(&self) {
        self.0.shutdown.store(true, Ordering::SeqCst);
        {
            let _guard = self.0.wake_lock.lock().unwrap();
            self.0.wake.notify_all();
        }
        if let Some(handle) = self.0.pruner_handle.lock().unwrap().take() {
            if handle.join().is_err() {
                warn!("pruner thread panicked during shutdown");
            }
        }
        // Dropping the pool closes its job channel and joins every worker
        // thread, which is how `WorkerPool` drains in-flight submitters.
        drop(self.0.pool.lock().unwrap().take());
        info!("engine shut down");
    }
}

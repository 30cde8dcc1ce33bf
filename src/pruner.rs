use std::sync::Weak;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::{Local, NaiveTime};
use tracing::{info, warn};

use crate::engine::{Inner, OrderBookEngine};

/// How long to wait until the next session-close boundary, given the
/// configured `(hour, minute)` local time of day. If that time of day has
/// already passed today, the boundary rolls over to tomorrow.
fn time_until_next_close(session_close_local: (u32, u32)) -> Duration {
    let (hour, minute) = session_close_local;
    let now = Local::now();
    let close_time = NaiveTime::from_hms_opt(hour, minute, 0).expect("valid session close time");
    let today_close = now.date_naive().and_time(close_time);

    let next_close = if now.naive_local() >= today_close {
        today_close + chrono::Duration::days(1)
    } else {
        today_close
    };

    (next_close - now.naive_local())
        .to_std()
        .unwrap_or(Duration::from_secs(1))
}

/// Spawns the background thread that cancels every resting `GoodForDay`
/// order once per session-close boundary.
///
/// Holds only a [`Weak`] reference between wake-ups, not a full
/// [`OrderBookEngine`] handle: if every engine handle is dropped without an
/// explicit [`OrderBookEngine::shutdown`] call, the next `upgrade` fails and
/// this thread exits instead of keeping the engine alive forever.
///
/// Two-phase wake-up: wait on the condition variable until either the
/// computed duration elapses or `shutdown` notifies it early. On a timeout
/// (the boundary was actually reached, not a shutdown), snapshot every
/// `GoodForDay` id under the engine lock, release it, then cancel each id
/// individually — so the lock is never held across what could be an
/// unbounded cancellation sweep.
pub fn spawn(weak: Weak<Inner>) -> JoinHandle<()> {
    thread::spawn(move || loop {
        let Some(engine) = OrderBookEngine::from_weak(&weak) else {
            return;
        };

        // Check-then-wait under the same lock: if `shutdown` already ran
        // (and already dropped the lock) before we got here, we see the
        // flag now instead of waiting out the full duration obliviously.
        let guard = engine.wake_lock().lock().unwrap();
        if engine.is_shutdown() {
            info!("pruner stopping");
            return;
        }

        let wait = time_until_next_close(engine.session_close_local());
        let (_guard, wait_result) = engine.wake_condvar().wait_timeout(guard, wait).unwrap();

        if engine.is_shutdown() {
            info!("pruner stopping");
            return;
        }

        if !wait_result.timed_out() {
            // Woken early for a reason other than shutdown: recompute the
            // wait and loop back around rather than pruning prematurely.
            continue;
        }

        let gfd_ids = engine.snapshot_gfd_ids();
        if gfd_ids.is_empty() {
            continue;
        }
        info!(count = gfd_ids.len(), "pruning GoodForDay orders at session close");
        for id in gfd_ids {
            if !engine.cancel_order(id) {
                warn!(order_id = id, "GoodForDay order vanished before pruning");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn next_close_today_when_still_ahead() {
        let now = Local::now();
        let an_hour_from_now = (now.hour() + 1) % 24;
        let wait = time_until_next_close((an_hour_from_now, now.minute()));
        assert!(wait <= Duration::from_secs(3600 + 60));
    }

    #[test]
    fn next_close_rolls_to_tomorrow_when_passed() {
        let now = Local::now();
        let an_hour_ago = if now.hour() == 0 { 23 } else { now.hour() - 1 };
        let wait = time_until_next_close((an_hour_ago, now.minute()));
        // Should be roughly 23 hours, not a few minutes.
        assert!(wait > Duration::from_secs(20 * 3600));
    }
}

//! Bookkeeping for calls that completed without a recording reference.
//!
//! A call that ends this way may still produce a voicemail callback a few
//! seconds later, so the "treat as no voicemail" action is deferred for a
//! grace window and cancelled if the callback lands in time.  The tracker
//! also carries the per-call handled guard that makes the missed-call
//! follow-up idempotent across webhook retries.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task;
use tokio::time::{sleep, Instant};
use tracing::{debug, info};

struct PendingVoicemail {
    timer: task::JoinHandle<()>,
    /// For staleness inspection; entries normally live for one grace window.
    #[allow(dead_code)]
    since: Instant,
}

pub struct PendingCallTracker {
    grace: Duration,
    pending: Arc<Mutex<HashMap<String, PendingVoicemail>>>,
    handled: Mutex<HashSet<String>>,
}

impl PendingCallTracker {
    pub fn new(grace: Duration) -> Self {
        Self {
            grace,
            pending: Arc::new(Mutex::new(HashMap::new())),
            handled: Mutex::new(HashSet::new()),
        }
    }

    /// Record that `call_id` ended without a recording reference and defer
    /// `on_timeout` for the grace window.  At most one deferred action exists
    /// per call id; marking the same id again is a no-op.
    ///
    /// The fired task claims its own entry under the mutex before running, so
    /// a near-simultaneous `confirm_voicemail` and timer fire resolve to
    /// exactly one winner and the loser does nothing.
    pub fn mark_potential_voicemail<F>(&self, call_id: &str, on_timeout: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut pending = self.pending.lock().unwrap();
        if pending.contains_key(call_id) {
            debug!(call_id, "voicemail grace window already armed");
            return;
        }

        let entries = Arc::clone(&self.pending);
        let id = call_id.to_string();
        let grace = self.grace;
        let timer = tokio::spawn(async move {
            sleep(grace).await;
            let claimed = entries.lock().unwrap().remove(&id).is_some();
            if claimed {
                debug!(call_id = %id, "grace window elapsed with no voicemail");
                on_timeout.await;
            }
        });
        pending.insert(
            call_id.to_string(),
            PendingVoicemail {
                timer,
                since: Instant::now(),
            },
        );
    }

    /// The voicemail callback arrived in time: cancel and drop any deferred
    /// action for `call_id`.  Covers the race where the callback lands before
    /// the call-status event by being a no-op when nothing is pending.
    pub fn confirm_voicemail(&self, call_id: &str) {
        if let Some(entry) = self.pending.lock().unwrap().remove(call_id) {
            entry.timer.abort();
            debug!(call_id, "cancelled no-voicemail timer");
        }
    }

    /// Claim the one caller-visible follow-up for `call_id`.  Returns true
    /// exactly once per call id; webhook retries get false and must skip the
    /// send.  Check-and-set is a single locked operation so concurrent
    /// deliveries cannot both win.
    pub fn mark_handled(&self, call_id: &str) -> bool {
        let newly = self.handled.lock().unwrap().insert(call_id.to_string());
        if !newly {
            info!(call_id, "call already handled; absorbing duplicate event");
        }
        newly
    }

    pub fn is_handled(&self, call_id: &str) -> bool {
        self.handled.lock().unwrap().contains(call_id)
    }
}

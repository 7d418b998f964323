use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Sliding-window request counter keyed by client address.
///
/// Clients with no request inside the window are dropped on a sweep that
/// runs at most once per window.
#[derive(Debug, Clone)]
pub struct ClientRateLimiter {
    state: Arc<Mutex<LimiterState>>,
    window: Duration,
    max_requests: usize,
}

#[derive(Debug)]
struct LimiterState {
    clients: HashMap<String, VecDeque<Instant>>,
    last_sweep: Option<Instant>,
}

impl ClientRateLimiter {
    pub fn new(window: Duration, max_requests: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(LimiterState {
                clients: HashMap::new(),
                last_sweep: None,
            })),
            window,
            max_requests,
        }
    }

    /// Records a request for `client`, or returns how long until the oldest
    /// request in the window expires.
    pub fn check(&self, client: &str) -> Result<(), Duration> {
        self.check_at(client, Instant::now())
    }

    fn check_at(&self, client: &str, now: Instant) -> Result<(), Duration> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        self.sweep(state, now);

        let window = self.window;
        let requests = state.clients.entry(client.to_string()).or_default();
        while requests
            .front()
            .is_some_and(|stamp| now.saturating_duration_since(*stamp) >= window)
        {
            requests.pop_front();
        }

        if requests.len() < self.max_requests {
            requests.push_back(now);
            return Ok(());
        }

        let retry_after = match requests.front() {
            Some(oldest) => window.saturating_sub(now.saturating_duration_since(*oldest)),
            None => window,
        };
        if requests.is_empty() {
            state.clients.remove(client);
        }
        Err(retry_after)
    }

    fn sweep(&self, state: &mut LimiterState, now: Instant) {
        let due = state
            .last_sweep
            .map_or(true, |last| now.saturating_duration_since(last) >= self.window);
        if !due {
            return;
        }

        let window = self.window;
        state.clients.retain(|_, requests| {
            requests
                .back()
                .is_some_and(|newest| now.saturating_duration_since(*newest) < window)
        });
        state.last_sweep = Some(now);
    }

    #[cfg(test)]
    fn tracked_clients(&self) -> usize {
        self.state.lock().clients.len()
    }
}

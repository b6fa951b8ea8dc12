/// Deterministic cancellable one-shot timers.
///
/// The host platform's ad-hoc `setTimeout`/`clearTimeout` pairs become
/// explicit tokens here: `schedule` returns a token, a later `cancel` (or a
/// replacing `schedule` at the call site) invalidates it, and `advance`
/// fires due timers in a stable order.
///
/// Key properties:
/// - Single-threaded; driven by the frame tick, never by wall clock.
/// - Firing order is total: `(due time, token)`.
/// - Cancellation does not perturb the order of remaining timers.

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerToken(pub u64);

#[derive(Debug, Copy, Clone, PartialEq)]
struct Pending {
    token: TimerToken,
    due_s: f64,
}

#[derive(Debug, Default)]
pub struct Timers {
    now_s: f64,
    next_token: u64,
    pending: Vec<Pending>,
}

impl Timers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a one-shot timer `delay_s` seconds from now.
    pub fn schedule(&mut self, delay_s: f64) -> TimerToken {
        let token = TimerToken(self.next_token);
        self.next_token = self.next_token.wrapping_add(1);
        self.pending.push(Pending {
            token,
            due_s: self.now_s + delay_s.max(0.0),
        });
        token
    }

    /// Cancel a pending timer. Returns `true` if it had not fired yet.
    pub fn cancel(&mut self, token: TimerToken) -> bool {
        let before = self.pending.len();
        self.pending.retain(|p| p.token != token);
        self.pending.len() != before
    }

    pub fn is_pending(&self, token: TimerToken) -> bool {
        self.pending.iter().any(|p| p.token == token)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Advance time by `dt_s` and return every timer that came due,
    /// ordered by `(due time, token)`.
    pub fn advance(&mut self, dt_s: f64) -> Vec<TimerToken> {
        self.now_s += dt_s.max(0.0);
        let now = self.now_s;

        let mut fired: Vec<Pending> = Vec::new();
        self.pending.retain(|p| {
            if p.due_s <= now {
                fired.push(*p);
                false
            } else {
                true
            }
        });
        fired.sort_by(|a, b| {
            a.due_s
                .partial_cmp(&b.due_s)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.token.cmp(&b.token))
        });
        fired.into_iter().map(|p| p.token).collect()
    }
}

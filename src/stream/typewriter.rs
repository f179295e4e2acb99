use crate::ledger::MessageLedger;
use crate::models::chat::TurnId;
use log::debug;
use std::time::Duration;
use tokio::time::{ interval_at, Instant, Interval, MissedTickBehavior };

pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_millis(50);

/// Decouples how fast tokens arrive from how fast they are revealed.
///
/// Text pushed between two ticks is released to the ledger in one piece on the next
/// tick. The flush timer only exists while the turn is live: it is created on the
/// first push and dropped by `close` (or when the buffer itself is dropped).
#[derive(Debug)]
pub struct TypewriterBuffer {
    period: Duration,
    pending: String,
    timer: Option<Interval>,
    closed: bool,
}

impl TypewriterBuffer {
    pub fn new(period: Duration) -> Self {
        Self {
            // tokio intervals reject a zero period
            period: period.max(Duration::from_millis(1)),
            pending: String::new(),
            timer: None,
            closed: false,
        }
    }

    pub fn push(&mut self, text: &str) {
        if self.closed {
            debug!("Dropping {} bytes pushed after the turn ended", text.len());
            return;
        }
        self.pending.push_str(text);
        if self.timer.is_none() {
            let mut timer = interval_at(Instant::now() + self.period, self.period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            self.timer = Some(timer);
        }
    }

    /// Resolves on the next flush tick. Never resolves while no timer is running.
    /// Cancel-safe, so it can sit in a `select!` next to network reads.
    pub async fn tick(&mut self) {
        match self.timer.as_mut() {
            Some(timer) => {
                timer.tick().await;
            }
            None => std::future::pending::<()>().await,
        }
    }

    /// Moves all pending text into the turn's reply. Empty flushes do nothing.
    pub fn flush_into(&mut self, ledger: &mut MessageLedger, turn_id: TurnId) -> bool {
        if self.pending.is_empty() {
            return false;
        }
        let text = std::mem::take(&mut self.pending);
        ledger.append_reply(turn_id, &text)
    }

    /// Cancels the timer and discards any later pushes. Safe to call more than once.
    pub fn close(&mut self) {
        if self.timer.take().is_some() {
            debug!("Flush timer cancelled");
        }
        self.pending.clear();
        self.closed = true;
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn pending(&self) -> &str {
        &self.pending
    }
}

impl Default for TypewriterBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_FLUSH_INTERVAL)
    }
}

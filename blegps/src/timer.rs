//! Single-shot, re-armable deadline.
//!
//! A [`Deadline`] posts a message into its owner's mailbox when it elapses.
//! Every arm bumps a generation counter and the message carries the
//! generation it was armed with, so the owner can tell a live fire from one
//! that was already queued when the deadline was re-armed or cancelled.
//! Only [`Deadline::take_fire`] with the current generation is honoured, and
//! only once.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Re-armable one-shot timer backed by a spawned sleep.
#[derive(Debug)]
pub struct Deadline<M> {
    mailbox: mpsc::UnboundedSender<M>,
    message: fn(u64) -> M,
    generation: u64,
    due: Option<Instant>,
    cancel: Option<CancellationToken>,
}

impl<M: Send + 'static> Deadline<M> {
    /// Creates a dormant deadline that will post `message(generation)` to `mailbox`.
    pub fn new(mailbox: mpsc::UnboundedSender<M>, message: fn(u64) -> M) -> Self {
        Self {
            mailbox,
            message,
            generation: 0,
            due: None,
            cancel: None,
        }
    }

    /// Cancels any pending deadline and schedules a new one `after` from now.
    ///
    /// Must be called from within a tokio runtime.
    pub fn arm(&mut self, after: Duration) -> u64 {
        self.cancel();

        self.generation += 1;
        let generation = self.generation;
        let due = Instant::now() + after;
        let token = CancellationToken::new();

        let cancelled = token.clone();
        let mailbox = self.mailbox.clone();
        let message = (self.message)(generation);
        tokio::spawn(async move {
            tokio::select! {
                _ = cancelled.cancelled() => {}
                _ = tokio::time::sleep_until(due) => {
                    // Owner gone means nothing left to notify.
                    let _ = mailbox.send(message);
                }
            }
        });

        self.due = Some(due);
        self.cancel = Some(token);
        generation
    }

    /// Cancels the pending deadline, if any.
    pub fn cancel(&mut self) {
        if let Some(token) = self.cancel.take() {
            token.cancel();
        }
        self.due = None;
    }

    /// Accepts a fire message. Returns true only for the current generation
    /// of a still-armed deadline; the deadline is dormant afterwards.
    pub fn take_fire(&mut self, generation: u64) -> bool {
        if self.due.is_some() && generation == self.generation {
            self.due = None;
            self.cancel = None;
            true
        } else {
            false
        }
    }

    /// When the pending deadline elapses.
    pub fn due(&self) -> Option<Instant> {
        self.due
    }

    pub fn is_armed(&self) -> bool {
        self.due.is_some()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl<M> Drop for Deadline<M> {
    fn drop(&mut self) {
        if let Some(token) = self.cancel.take() {
            token.cancel();
        }
    }
}

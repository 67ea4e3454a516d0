//! AT dialogue state: which response kinds are currently awaited and since
//! when.
//!
//! At most one command expecting any given `+XXX` echo is ever in flight;
//! `OK` may be awaited alongside one `+XXX` expectation, because a
//! multi-stage action needs the closing `OK` separately. The aggregate
//! [`Dialogue::busy`] predicate gates every new outbound AT command and
//! every SMS send.

use embassy_time::Instant;

use crate::response::ResponseKind;
use crate::timing;

pub struct Dialogue {
    /// `Some(t)` is both the awaiting flag and the initiation stamp.
    awaiting: [Option<Instant>; ResponseKind::COUNT],
}

impl Dialogue {
    pub const fn new() -> Self {
        Self {
            awaiting: [None; ResponseKind::COUNT],
        }
    }

    /// Record that a command expecting `kind` went out at `now`.
    pub fn expect(&mut self, kind: ResponseKind, now: Instant) {
        self.awaiting[kind.index()] = Some(now);
    }

    /// Clear an expectation; returns whether it was set.
    pub fn clear(&mut self, kind: ResponseKind) -> bool {
        self.awaiting[kind.index()].take().is_some()
    }

    pub fn clear_all(&mut self) {
        self.awaiting = [None; ResponseKind::COUNT];
    }

    pub fn is_awaiting(&self, kind: ResponseKind) -> bool {
        self.awaiting[kind.index()].is_some()
    }

    /// A request is in flight; nothing new may be dispatched.
    pub fn busy(&self) -> bool {
        self.awaiting.iter().any(Option::is_some)
    }

    fn deadline(kind: ResponseKind) -> embassy_time::Duration {
        match kind {
            ResponseKind::Ok => timing::ok_deadline(),
            _ => timing::response_deadline(),
        }
    }

    /// Clear every expectation whose deadline has passed, reporting each
    /// expired kind to `on_expired`.
    pub fn expire(&mut self, now: Instant, mut on_expired: impl FnMut(ResponseKind)) {
        for kind in ALL_KINDS {
            if let Some(since) = self.awaiting[kind.index()] {
                let overdue = now
                    .checked_duration_since(since)
                    .map_or(false, |age| age >= Self::deadline(kind));
                if overdue {
                    self.awaiting[kind.index()] = None;
                    on_expired(kind);
                }
            }
        }
    }
}

impl Default for Dialogue {
    fn default() -> Self {
        Self::new()
    }
}

const ALL_KINDS: [ResponseKind; ResponseKind::COUNT] = [
    ResponseKind::Ok,
    ResponseKind::FinalError,
    ResponseKind::ServingCell,
    ResponseKind::Registration,
    ResponseKind::Storage,
    ResponseKind::SignalQuality,
    ResponseKind::SmsDelete,
    ResponseKind::SmsSent,
    ResponseKind::SmsIndication,
    ResponseKind::SmsRead,
    ResponseKind::CallList,
    ResponseKind::Unknown,
];

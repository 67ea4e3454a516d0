//! UART ingress: a lock-free single-producer single-consumer byte ring.
//!
//! The board's UART RX interrupt owns the [`RxSink`] half and appends every
//! byte it drains from the hardware FIFO; the control loop owns the
//! [`LineReader`] half and takes one complete line at a time. The two halves
//! synchronise through the entry and line-feed counters alone: the producer
//! publishes with release stores, the consumer observes with acquire loads
//! before touching the storage.
//!
//! There is no overflow check. Capacity is chosen to dwarf any credible
//! modem burst (16 KiB is plenty at 9600 baud); if overflow happened anyway
//! it would corrupt at most the oldest unread line.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicUsize, Ordering};

use heapless::Vec;

/// Longest line kept from the modem; bytes past this are dropped.
pub const MAX_LINE_LEN: usize = 200;

pub struct Ingress<const N: usize> {
    buf: UnsafeCell<[u8; N]>,
    /// Unread bytes currently buffered.
    used: AtomicUsize,
    /// Line feeds within the unread region; one per complete line.
    lines: AtomicUsize,
}

// The storage is only ever touched by the single producer and the single
// consumer, each on their own side of the published counters.
unsafe impl<const N: usize> Sync for Ingress<N> {}

impl<const N: usize> Ingress<N> {
    pub const fn new() -> Self {
        Self {
            buf: UnsafeCell::new([0; N]),
            used: AtomicUsize::new(0),
            lines: AtomicUsize::new(0),
        }
    }

    /// Split into the interrupt half and the loop half.
    pub fn split(&mut self) -> (RxSink<'_, N>, LineReader<'_, N>) {
        let this: &Self = self;
        (
            RxSink { ring: this, at: 0 },
            LineReader { ring: this, at: 0 },
        )
    }

    /// Unread bytes currently buffered.
    pub fn len(&self) -> usize {
        self.used.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<const N: usize> Default for Ingress<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Interrupt half: call [`RxSink::push`] for every byte drained from the
/// UART FIFO. Never blocks.
pub struct RxSink<'a, const N: usize> {
    ring: &'a Ingress<N>,
    at: usize,
}

impl<'a, const N: usize> RxSink<'a, N> {
    pub fn push(&mut self, byte: u8) {
        unsafe {
            (*self.ring.buf.get())[self.at] = byte;
        }
        self.at = (self.at + 1) % N;
        self.ring.used.fetch_add(1, Ordering::Release);
        if byte == b'\n' {
            self.ring.lines.fetch_add(1, Ordering::Release);
        }
    }
}

/// Loop half: yields one framed line at a time.
pub struct LineReader<'a, const N: usize> {
    ring: &'a Ingress<N>,
    at: usize,
}

impl<'a, const N: usize> LineReader<'a, N> {
    /// Whether a complete line is waiting.
    pub fn has_line(&self) -> bool {
        self.ring.lines.load(Ordering::Acquire) > 0
    }

    /// Unread bytes currently buffered, complete lines or not.
    pub fn buffered(&self) -> usize {
        self.ring.len()
    }

    /// Take the next complete line, consuming it from the ring.
    ///
    /// CR and LF bytes are stripped; the line is capped at
    /// [`MAX_LINE_LEN`] bytes with the excess dropped.
    pub fn next_line(&mut self) -> Option<Vec<u8, MAX_LINE_LEN>> {
        if self.ring.lines.load(Ordering::Acquire) == 0 {
            return None;
        }

        let mut line = Vec::new();
        let mut consumed = 0;
        loop {
            let byte = unsafe { (*self.ring.buf.get())[self.at] };
            self.at = (self.at + 1) % N;
            consumed += 1;
            if byte == b'\n' {
                break;
            }
            if byte != b'\r' {
                line.push(byte).ok();
            }
        }

        self.ring.used.fetch_sub(consumed, Ordering::Release);
        self.ring.lines.fetch_sub(1, Ordering::Release);
        Some(line)
    }
}

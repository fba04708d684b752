//! Decompression bomb protection.
//!
//! This module provides [`DecompressionGuard`], a reader wrapper that caps the
//! total number of decompressed bytes a run may consume, and
//! [`BudgetTracker`], a cloneable handle for inspecting the budget while the
//! guard itself is owned deep inside the tar reader.
//!
//! The guard never fails a read on its own. Once the budget is spent it
//! reports end-of-data, which the tar parser typically turns into an
//! "unexpected EOF" error. The digester consults the tracker afterwards and
//! reports [`Error::ResourceLimitExceeded`](crate::Error::ResourceLimitExceeded)
//! instead, so a budget cut-off is never misreported as a corrupt archive.

use std::io::{self, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Default decompressed byte budget (10 GB).
pub const DEFAULT_MAX_DECOMPRESSED_BYTES: u64 = 10_000_000_000;

#[derive(Debug)]
struct BudgetState {
    limit: u64,
    consumed: AtomicU64,
    exhausted: AtomicBool,
}

/// Shared view of a decompression budget.
///
/// Cloning is cheap; all clones observe the same counters.
#[derive(Debug, Clone)]
pub struct BudgetTracker {
    state: Arc<BudgetState>,
}

impl BudgetTracker {
    /// Creates a tracker with `limit` bytes available.
    pub fn new(limit: u64) -> Self {
        Self {
            state: Arc::new(BudgetState {
                limit,
                consumed: AtomicU64::new(0),
                exhausted: AtomicBool::new(false),
            }),
        }
    }

    /// Returns the configured budget.
    pub fn limit(&self) -> u64 {
        self.state.limit
    }

    /// Returns the number of bytes handed out so far.
    pub fn consumed(&self) -> u64 {
        self.state.consumed.load(Ordering::Relaxed)
    }

    /// Returns the bytes still available.
    pub fn remaining(&self) -> u64 {
        self.limit().saturating_sub(self.consumed())
    }

    /// Returns `true` once the source was found to hold more data than the
    /// budget allows.
    ///
    /// Consuming exactly `limit` bytes of a source that then ends is not
    /// exhaustion.
    pub fn is_exhausted(&self) -> bool {
        self.state.exhausted.load(Ordering::Relaxed)
    }

    fn consume(&self, n: u64) {
        self.state.consumed.fetch_add(n, Ordering::Relaxed);
    }

    fn mark_exhausted(&self) {
        if !self.state.exhausted.swap(true, Ordering::Relaxed) {
            log::debug!(
                "Decompressed data exceeds budget of {} bytes, cutting off input",
                self.limit()
            );
        }
    }
}

/// A reader wrapper that enforces a decompressed byte budget.
///
/// Reads are capped to the remaining budget. When the budget reaches zero the
/// guard probes the inner reader for a single byte: if one is available the
/// budget is marked exhausted. Either way the caller sees end-of-data from
/// then on.
pub struct DecompressionGuard<R> {
    inner: R,
    tracker: BudgetTracker,
}

impl<R> DecompressionGuard<R> {
    /// Wraps `inner` with a fresh budget of `limit` bytes.
    pub fn new(inner: R, limit: u64) -> Self {
        Self::with_tracker(inner, BudgetTracker::new(limit))
    }

    /// Wraps `inner` using an existing tracker.
    pub fn with_tracker(inner: R, tracker: BudgetTracker) -> Self {
        Self { inner, tracker }
    }

    /// Returns a handle to this guard's budget.
    pub fn tracker(&self) -> BudgetTracker {
        self.tracker.clone()
    }

    /// Returns the inner reader.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> DecompressionGuard<R> {
    fn probe(&mut self) -> io::Result<()> {
        let mut byte = [0u8; 1];
        loop {
            match self.inner.read(&mut byte) {
                Ok(0) => return Ok(()),
                Ok(_) => {
                    self.tracker.mark_exhausted();
                    return Ok(());
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

impl<R: Read> Read for DecompressionGuard<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() || self.tracker.is_exhausted() {
            return Ok(0);
        }

        let remaining = self.tracker.remaining();
        if remaining == 0 {
            self.probe()?;
            return Ok(0);
        }

        let cap = remaining.min(buf.len() as u64) as usize;
        let n = self.inner.read(&mut buf[..cap])?;
        self.tracker.consume(n as u64);
        Ok(n)
    }
}

impl<R> std::fmt::Debug for DecompressionGuard<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecompressionGuard")
            .field("limit", &self.tracker.limit())
            .field("consumed", &self.tracker.consumed())
            .field("exhausted", &self.tracker.is_exhausted())
            .finish_non_exhaustive()
    }
}

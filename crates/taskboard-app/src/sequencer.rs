//! Ordering of backend responses.
//!
//! Every request gets a [`RequestSeq`] when it is issued. Mutation responses
//! always apply; a list load only applies if nothing issued after it has been
//! applied in the meantime.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic request number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestSeq(u64);

impl RequestSeq {
    /// Raw counter value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestSeq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What happened to a list load when its response arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The load replaced the store contents.
    Applied,
    /// A newer request had already been applied; the load was discarded.
    Superseded,
}

/// Issues request numbers and arbitrates stale list loads.
#[derive(Debug, Default)]
pub struct RequestSequencer {
    issued: AtomicU64,
    applied: AtomicU64,
}

impl RequestSequencer {
    /// Create a sequencer with nothing issued.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next request number.
    pub fn issue(&self) -> RequestSeq {
        RequestSeq(self.issued.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Decide whether the list load `seq` may be applied, recording it when it is.
    pub fn admit_load(&self, seq: RequestSeq) -> LoadOutcome {
        let mut current = self.applied.load(Ordering::SeqCst);
        loop {
            if current > seq.0 {
                return LoadOutcome::Superseded;
            }
            match self
                .applied
                .compare_exchange(current, seq.0, Ordering::SeqCst, Ordering::SeqCst)
            {
                Ok(_) => return LoadOutcome::Applied,
                Err(actual) => current = actual,
            }
        }
    }

    /// Record that the mutation `seq` has been applied.
    pub fn record_mutation(&self, seq: RequestSeq) {
        self.applied.fetch_max(seq.0, Ordering::SeqCst);
    }

    /// Most recent request applied so far.
    #[must_use]
    pub fn last_applied(&self) -> Option<RequestSeq> {
        match self.applied.load(Ordering::SeqCst) {
            0 => None,
            value => Some(RequestSeq(value)),
        }
    }
}

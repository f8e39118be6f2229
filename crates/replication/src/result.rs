//! Outcome of a tailing or open-transaction call.

use marklog_core::{Error, ErrorKind, Tick};

/// Outcome of [`crate::WalAccess::tail`] or
/// [`crate::WalAccess::open_transactions`].
///
/// A failed call still carries its partial state: records already passed to
/// the callback stay delivered, and `last_included_tick` is the resumption
/// point for a retry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TailResult {
    /// Error that aborted the call, `None` on success
    pub error: Option<Error>,
    /// Whether log data at the requested start tick was still available
    pub from_tick_included: bool,
    /// Tick of the last emitted record (tail) or the safe tick
    /// (open transactions); `0` if nothing qualified
    pub last_included_tick: Tick,
    /// Log high-water mark when the call started
    pub last_committed_tick: Tick,
    /// Whether the call stopped on the chunk budget
    pub has_more: bool,
    /// Records passed to the callback
    pub records_emitted: usize,
    /// Bytes counted against the chunk budget
    pub bytes_emitted: usize,
}

impl TailResult {
    /// Result for a call that failed before scanning anything.
    pub fn failed(error: Error) -> Self {
        TailResult {
            error: Some(error),
            ..Default::default()
        }
    }

    /// Whether the call completed without error.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Kind of the aborting error, if any.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(Error::kind)
    }
}

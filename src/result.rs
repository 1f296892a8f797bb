//! Stable result codes returned to callers of the download and filter engines.
//!
//! External drivers (the CLI, the batch config runner) only ever look at the
//! integer code and the message, so the numeric values are part of the contract.

use std::fmt;

/// Message attached to every successful result.
pub const SUCCESS_MESSAGE: &str = "Success";

/// Outcome of a retrieval or filter call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultCode {
    /// The call completed; code `0`.
    Success,
    /// The call failed; code `-1`. The accompanying message says why.
    Failure,
}

impl ResultCode {
    /// Returns the integer code external callers depend on.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::Failure => -1,
        }
    }

    /// Returns `true` for [`ResultCode::Success`].
    #[must_use]
    pub fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_i32())
    }
}

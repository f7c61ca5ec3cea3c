//! Result pipeline helpers
//!
//! Every card step returns `Result<Response>`. Steps are chained with
//! `and_then`, so the first failure stops all further card traffic, and
//! `validate` turns an unexpected status into a failure of the chain.

use std::fmt::Debug;

use crate::card::Response;
use crate::error::{CardError, Result};
use crate::status::ResponseStatus;

/// Validation step for command results
pub trait Validate: Sized {
    /// Fail unless the response carries `expected`
    fn validate(self, expected: ResponseStatus) -> Result<Response>;
}

impl Validate for Result<Response> {
    fn validate(self, expected: ResponseStatus) -> Result<Response> {
        self.and_then(|response| response.expect_status(expected))
    }
}

/// Compare an actual state against the expected one, passing it through on a match.
pub fn expect_state<T: PartialEq + Debug>(expected: T, actual: T) -> Result<T> {
    if expected == actual {
        Ok(actual)
    } else {
        Err(CardError::StateMismatch {
            expected: format!("{:?}", expected),
            actual: format!("{:?}", actual),
        })
    }
}

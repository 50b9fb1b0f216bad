//! HTTP route handlers.

pub mod offers;
pub mod ops;
pub mod slots;
pub mod waitlist;
pub mod webhooks;

use std::str::FromStr;

use crate::error::ApiError;

/// Parses a path id, answering 400 on malformed input.
pub(crate) fn parse_id<T: FromStr>(kind: &str, raw: &str) -> Result<T, ApiError>
where
    T::Err: std::fmt::Display,
{
    raw.parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid {kind} id: {e}")))
}

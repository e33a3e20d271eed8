//! Remote asset conversion.
//!
//! Submitting a job and following it to completion:
//!
//! - [`ConversionRequest`] describes input and output locations, optionally
//!   with container SAS tokens
//! - [`ConversionClient`] posts requests and queries job status
//! - [`poll_conversion`] repeats status queries under a [`PollPolicy`]
//!
//! A job moves from running to exactly one of success or failure. The job id
//! returned by [`ConversionClient::create`] is the only handle kept.

mod client;
mod poll;
mod types;

pub use client::ConversionClient;
pub use poll::{poll_conversion, PollPolicy, DEFAULT_POLL_INTERVAL};
pub use types::{
    ConversionInput, ConversionOutcome, ConversionOutput, ConversionRequest, ConversionStatus,
    ConvertedAsset,
};

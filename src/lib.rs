//! arrconvert - upload 3D assets and drive remote rendering conversions
//!
//! This library crate exposes the workflow stages for the binary and for
//! integration testing.

pub mod auth;
pub mod config;
pub mod conversion;
pub mod error;
pub mod pipeline;
pub mod storage;
pub mod upload;

//! BANCA — bankroll risk-of-ruin and subscription entitlements
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod risk;
pub mod performance;
pub mod entitlement;
pub mod payments;
pub mod storage;
pub mod api;

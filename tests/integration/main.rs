//! Integration tests: the full router over an in-memory store.

mod api_flow;
mod harness;
mod payment_flow;

//! Core types and trait definitions for the boxoffice booking engine.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! Storage backends implement [`store::CatalogStore`] and
//! [`store::BookingLedger`]; the payment gateway and the HTTP layer depend on
//! those abstractions only.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod booking;
pub mod catalog;
pub mod clock;
pub mod error;
pub mod fulfilment;
pub mod money;
pub mod payment;
pub mod store;

pub use error::{Error, ErrorKind, Result};

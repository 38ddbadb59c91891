//! Payment reconciliation for the boxoffice booking engine.
//!
//! [`PaymentGateway`] opens hosted checkouts through a [`CheckoutProvider`]
//! and reconciles the provider's signed webhook callbacks against the
//! booking ledger. The shipped provider speaks the Stripe checkout API.

pub mod checkout;
pub mod error;
pub mod event;
pub mod gateway;
pub mod signature;
pub mod stripe;

pub use checkout::{CheckoutProvider, CheckoutRequest, CheckoutSession, LineItem};
pub use error::{Error, Result};
pub use gateway::{Fulfilment, GatewayConfig, PaymentGateway, Reconciliation};
pub use signature::{SignatureError, SignatureVerifier};
pub use stripe::StripeProvider;

#[cfg(test)]
mod tests;

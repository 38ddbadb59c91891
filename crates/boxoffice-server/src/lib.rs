//! Process wiring for the boxoffice server.
//!
//! Collects the pieces the binary needs: configuration, the expiry sweeper,
//! the filesystem ticket archive, the PDF renderer, the logging notifier and
//! catalog seeding. [`app`] builds the complete HTTP router.

pub mod archive;
pub mod config;
pub mod error;
pub mod notify;
pub mod pdf;
pub mod seed;
pub mod sweeper;

use std::sync::Arc;

use axum::Router;
use boxoffice_api::AppState;
use boxoffice_payments::{
  Fulfilment, GatewayConfig, PaymentGateway, StripeProvider,
};
use boxoffice_store_sqlite::SqliteStore;
use tower_http::trace::TraceLayer;

pub use config::ServerConfig;

use crate::{archive::FsTicketArchive, notify::LogNotifier, pdf::PdfTicketRenderer};

/// The production collaborators for `config`.
pub fn fulfilment(config: &ServerConfig) -> Fulfilment {
  Fulfilment {
    renderer: Arc::new(PdfTicketRenderer::new(&config.base_url)),
    archive:  Arc::new(FsTicketArchive::new(&config.tickets_dir)),
    notifier: Arc::new(LogNotifier::new(&config.base_url)),
  }
}

/// Build the payment gateway over `store` with the Stripe provider.
pub fn gateway(
  store: Arc<SqliteStore>,
  config: &ServerConfig,
) -> boxoffice_payments::Result<PaymentGateway<SqliteStore>> {
  let provider =
    StripeProvider::new(&config.payments.api_base, &config.payments.secret_key)?;
  PaymentGateway::new(
    store,
    Arc::new(provider),
    fulfilment(config),
    GatewayConfig::from(&config.payments),
  )
}

/// The full HTTP application: the JSON API under `/api`, traced.
pub fn app(state: AppState<SqliteStore>) -> Router {
  Router::new()
    .nest("/api", boxoffice_api::api_router(state))
    .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
  use axum::{
    body::Body,
    http::{Request, StatusCode},
  };
  use tower::ServiceExt as _;

  use super::*;

  fn config(dir: &std::path::Path) -> ServerConfig {
    let toml = format!(
      r#"
        base_url = "http://tickets.test"
        tickets_dir = "{}"

        [payments]
        secret_key = "sk_test"
        webhook_secret = "whsec_test"
      "#,
      dir.display()
    );
    let path = dir.join("config.toml");
    std::fs::write(&path, toml).unwrap();
    ServerConfig::load(&path).unwrap()
  }

  #[tokio::test]
  async fn api_is_mounted_under_prefix() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path());
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    let gateway = gateway(store.clone(), &cfg).unwrap();
    let router = app(AppState { store, gateway: Arc::new(gateway) });

    let resp = router
      .clone()
      .oneshot(
        Request::get("/api/sessions/1/occupancy")
          .body(Body::empty())
          .unwrap(),
      )
      .await
      .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = router
      .oneshot(
        Request::get(format!("/api/bookings/{}", uuid::Uuid::new_v4()))
          .body(Body::empty())
          .unwrap(),
      )
      .await
      .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }
}

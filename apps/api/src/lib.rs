//! # Stockbook API Library
//!
//! Router and handlers for the Stockbook HTTP server. `main.rs` only
//! loads configuration, opens the database and serves [`router`].
//!
//! ## Module Organization
//! ```text
//! stockbook_api/
//! ├── lib.rs          ◄─── You are here (router)
//! ├── config.rs       ◄─── AppConfig: defaults → TOML → env
//! ├── error.rs        ◄─── ApiError: status code + {code, message}
//! ├── state.rs        ◄─── AppState: shared Database
//! └── handlers/
//!     ├── mod.rs      ◄─── JSON/query extractors with ApiError rejections
//!     ├── health.rs
//!     ├── categories.rs
//!     ├── products.rs ◄─── Catalog + sell + bulk sell
//!     ├── services.rs
//!     ├── sell_history.rs
//!     ├── debits.rs
//!     ├── expenses.rs
//!     └── reports.rs
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod state;

use axum::routing::{delete, get, post, put};
use axum::Router;

pub use config::AppConfig;
pub use error::{ApiError, ErrorCode};
pub use state::AppState;

use handlers::{categories, debits, expenses, health, products, reports, sell_history, services};

/// Builds the full application router.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        // Categories
        .route("/categories", get(categories::list).post(categories::create))
        .route("/categories/{id}", put(categories::rename).delete(categories::remove))
        // Products
        .route("/products", get(products::list).post(products::create))
        .route("/products/sell", post(products::bulk_sell))
        .route(
            "/products/{id}",
            get(products::detail).put(products::update).delete(products::remove),
        )
        .route("/products/{id}/sell", post(products::sell))
        // Services
        .route("/services", get(services::list).post(services::create))
        .route(
            "/services/{id}",
            get(services::detail).put(services::update).delete(services::remove),
        )
        .route("/services/{id}/sell", post(services::sell))
        // Sell history
        .route("/sell-history", get(sell_history::list))
        .route("/sell-history/{id}", delete(sell_history::remove))
        // Debits
        .route("/debits", get(debits::list).post(debits::create))
        .route("/debits/{id}", get(debits::detail))
        .route("/debits/{id}/pay", post(debits::pay))
        // Expenses
        .route("/expenses/daily", get(expenses::list_daily).post(expenses::create_daily))
        .route("/expenses/daily/{id}", delete(expenses::delete_daily))
        .route("/expenses/supply", get(expenses::list_supply).post(expenses::create_supply))
        .route("/expenses/supply/{id}", delete(expenses::delete_supply))
        // Reports
        .route("/reports/summary", get(reports::summary));

    Router::new()
        .route("/health", get(health::health))
        .nest("/api", api)
        .with_state(state)
}

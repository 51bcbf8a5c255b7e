//! # ordena-db: Database Layer for Ordena
//!
//! This crate provides database access for the Ordena order-management
//! system. It uses SQLite for storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Ordena Data Flow                                 │
//! │                                                                         │
//! │  Caller (API layer, external)                                          │
//! │       │  place_order / update_order_status                             │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     ordena-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │ OrderService  │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │ (service.rs)  │───►│ product/client│    │  (embedded)  │  │   │
//! │  │   │ the commit    │    │ /order        │    │ 001_init.sql │  │   │
//! │  │   │ transaction   │    └───────────────┘    └──────────────┘  │   │
//! │  │   └───────────────┘            │                               │   │
//! │  └────────────────────────────────┼───────────────────────────────┘   │
//! │                                   ▼                                    │
//! │                           SQLite Database                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (product, client, order)
//! - [`service`] - `OrderService`: the transactional order committer
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ordena_core::LineRequest;
//! use ordena_db::{Database, DbConfig, OrderService};
//!
//! let db = Database::new(DbConfig::new("path/to/ordena.db")).await?;
//!
//! let service = db.orders_service();
//! let order = service
//!     .place_order("client-id", &[LineRequest::new("product-id", 3)], "seller-id")
//!     .await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod service;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::DbError;
pub use pool::{Database, DbConfig};
pub use service::OrderService;

// Repository re-exports for convenience
pub use repository::client::ClientRepository;
pub use repository::order::OrderRepository;
pub use repository::product::ProductRepository;

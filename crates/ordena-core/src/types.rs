//! # Domain Types
//!
//! Core domain types used throughout Ordena.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Order      │   │   OrderLine     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  code (unique)  │   │  client_id (FK) │   │  order_id (FK)  │       │
//! │  │  price_cents    │   │  seller_id (FK) │   │  quantity       │       │
//! │  │  stock          │   │  total_cents    │   │  unit_price ❄   │       │
//! │  └─────────────────┘   │  status         │   │  subtotal ❄     │       │
//! │                        └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ❄ = frozen at placement  │
//! │  │    Client       │   │      User       │                             │
//! │  │  name, email    │   │  name, role     │                             │
//! │  └─────────────────┘   └─────────────────┘                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! An order line carries the unit price **at the time the order was placed**.
//! Later product price changes never rewrite history: the stored line price,
//! subtotal, and order total are immutable after creation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::OrderError;
use crate::money::Money;

// =============================================================================
// Product
// =============================================================================

/// A product available for ordering.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Business code - human-readable unique identifier (e.g. "P001").
    pub code: String,

    /// Display name.
    pub name: String,

    /// Current unit price in cents. Non-negative.
    pub price_cents: i64,

    /// Units currently in stock. Never negative; mutated only by order
    /// commits (decrement) or administrative adjustments.
    pub stock: i64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the current price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Checks whether the requested quantity can be satisfied by current
    /// stock. This is a point-in-time answer; the commit transaction
    /// re-checks under isolation.
    #[inline]
    pub fn has_stock(&self, quantity: i64) -> bool {
        self.stock >= quantity
    }
}

// =============================================================================
// Client
// =============================================================================

/// A client (the party an order is placed for).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Client {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// User
// =============================================================================

/// Role of a system user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Seller,
}

/// A system user. The authenticated user placing an order is its seller.
///
/// Authentication itself (passwords, tokens) lives outside this system;
/// only the identity and display data are modeled here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Order Status
// =============================================================================

/// The lifecycle status of an order.
///
/// ## Lifecycle
/// ```text
/// pending ──► confirmed ──► shipped ──► delivered
///    │             │            │
///    └─────────────┴────────────┴──────► cancelled
/// ```
/// Orders are created `Pending` by the commit transaction. Status updates
/// never touch stock: cancelling an order does not restock its lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// All recognized statuses, in lifecycle order.
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    /// Returns the canonical lowercase name stored in the database.
    pub const fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Pending
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses a status string against the five recognized values.
///
/// Anything else is rejected with `OrderError::InvalidStatusTransition`,
/// so a stored status can never be corrupted by a bad request.
impl FromStr for OrderStatus {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(OrderStatus::Pending),
            "confirmed" => Ok(OrderStatus::Confirmed),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(OrderError::InvalidStatusTransition(other.to_string())),
        }
    }
}

// =============================================================================
// Order
// =============================================================================

/// A placed order.
///
/// Created once by the commit transaction; only `status` (and `updated_at`)
/// mutate afterward. `total_cents` equals the sum of the line subtotals at
/// creation time, permanently.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Order {
    pub id: String,
    pub client_id: String,
    /// The authenticated user who placed the order.
    pub seller_id: String,
    pub total_cents: i64,
    pub status: OrderStatus,
    pub placed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Returns the order total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

// =============================================================================
// Order Line
// =============================================================================

/// A line item within an order.
/// Uses the snapshot pattern to freeze pricing at placement time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct OrderLine {
    pub id: String,
    pub order_id: String,
    pub product_id: String,
    /// Quantity ordered. Positive.
    pub quantity: i64,
    /// Unit price in cents at time of order (frozen).
    pub unit_price_cents: i64,
    /// quantity × unit_price_cents (frozen).
    pub subtotal_cents: i64,
    pub created_at: DateTime<Utc>,
}

impl OrderLine {
    /// Returns the frozen unit price as Money.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Returns the frozen subtotal as Money.
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }
}

// =============================================================================
// Read-Back Aggregates
// =============================================================================
// The shapes a response layer works with: an order joined with the display
// data of its client, seller, and products. Produced by a read-back join
// after commit, never by recomputation.

/// Display reference to a client or seller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyRef {
    pub id: String,
    pub name: String,
    pub email: String,
}

/// Display reference to a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRef {
    pub id: String,
    pub code: String,
    pub name: String,
}

/// One line of a fully resolved order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineDetail {
    pub id: String,
    pub product: ProductRef,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub subtotal_cents: i64,
}

/// A fully resolved order: header plus related display data.
///
/// This is what `place_order` and the order queries return to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetail {
    pub id: String,
    pub client: PartyRef,
    pub seller: PartyRef,
    pub total_cents: i64,
    pub status: OrderStatus,
    pub placed_at: DateTime<Utc>,
    pub lines: Vec<OrderLineDetail>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip() {
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_status_parse_is_case_insensitive() {
        assert_eq!("Pending".parse::<OrderStatus>().unwrap(), OrderStatus::Pending);
        assert_eq!(" SHIPPED ".parse::<OrderStatus>().unwrap(), OrderStatus::Shipped);
    }

    #[test]
    fn test_status_parse_rejects_unknown() {
        let err = "refunded".parse::<OrderStatus>().unwrap_err();
        assert!(matches!(err, OrderError::InvalidStatusTransition(s) if s == "refunded"));
    }

    #[test]
    fn test_status_default() {
        assert_eq!(OrderStatus::default(), OrderStatus::Pending);
    }

    #[test]
    fn test_product_has_stock() {
        let now = Utc::now();
        let product = Product {
            id: "p1".to_string(),
            code: "P001".to_string(),
            name: "Balón de fútbol".to_string(),
            price_cents: 2550,
            stock: 10,
            created_at: now,
            updated_at: now,
        };

        assert!(product.has_stock(10));
        assert!(!product.has_stock(11));
    }
}

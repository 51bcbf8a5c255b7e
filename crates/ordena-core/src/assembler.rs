//! # Order Assembler
//!
//! The pure validation + pricing pass that turns a raw order request into
//! an immutable, commit-ready aggregate.
//!
//! ## Assembly Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Order Assembly                                   │
//! │                                                                         │
//! │  [{product_id, quantity}, ...]                                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  validate line count + each quantity ── fail ──► InvalidLineItem       │
//! │       │                                                                 │
//! │       ▼   (per line, in request order)                                 │
//! │  look up product ─────────── missing ──► ProductNotFound               │
//! │       │                                                                 │
//! │  quantity > stock? ───────────── yes ──► InsufficientStock             │
//! │       │                                                                 │
//! │  freeze unit price, subtotal = price × qty, total += subtotal          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  AssembledOrder (immutable) ──► handed to the transactional committer  │
//! │                                                                         │
//! │  Any failure fails the WHOLE assembly: no partial aggregate, and no    │
//! │  stock has been touched (assembly is side-effect free).                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Price Freezing
//! The unit price is captured here, at assembly time. The committer persists
//! exactly these numbers and never re-reads prices; only stock is
//! re-validated inside the transaction. Later product price changes can
//! never alter a placed order.

use serde::{Deserialize, Serialize};

use crate::error::{OrderError, OrderResult};
use crate::money::Money;
use crate::types::Product;
use crate::validation::{validate_line_count, validate_quantity};

// =============================================================================
// Line Request
// =============================================================================

/// One requested line of an order, as received from the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineRequest {
    pub product_id: String,
    pub quantity: i64,
}

impl LineRequest {
    pub fn new(product_id: impl Into<String>, quantity: i64) -> Self {
        LineRequest {
            product_id: product_id.into(),
            quantity,
        }
    }
}

// =============================================================================
// Assembled Line
// =============================================================================

/// A priced line with its product snapshot frozen at assembly time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssembledLine {
    pub product_id: String,
    /// Product code at assembly time (frozen, for display/audit).
    pub code: String,
    /// Product name at assembly time (frozen, for display/audit).
    pub name: String,
    /// Unit price in cents at assembly time (frozen).
    pub unit_price_cents: i64,
    pub quantity: i64,
    /// unit_price_cents × quantity.
    pub subtotal_cents: i64,
}

impl AssembledLine {
    /// Returns the frozen subtotal as Money.
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }
}

// =============================================================================
// Assembled Order
// =============================================================================

/// An immutable, commit-ready order aggregate.
///
/// ## Invariants (enforced by construction)
/// - at least one line; every quantity positive and within the cap
/// - every line references a product that existed at assembly time
/// - `total_cents` == Σ line subtotals, computed once with integer cents
///
/// Fields are private: once assembled, nothing can change the totals or
/// lines before commit.
#[derive(Debug, Clone, Serialize)]
pub struct AssembledOrder {
    client_id: String,
    seller_id: String,
    total_cents: i64,
    lines: Vec<AssembledLine>,
}

impl AssembledOrder {
    /// Assembles an order from requested lines against current product state.
    ///
    /// `lookup` resolves a product id to the product as currently known
    /// (typically a snapshot fetched just before assembly). Assembly itself
    /// performs no I/O and has no side effects.
    ///
    /// ## Errors
    /// - [`OrderError::InvalidLineItem`] - empty line list or bad quantity
    /// - [`OrderError::ProductNotFound`] - a product id does not resolve
    /// - [`OrderError::InsufficientStock`] - requested quantity exceeds the
    ///   product's stock as seen here (the committer re-checks under the
    ///   transaction; this is the early, side-effect-free rejection)
    ///
    /// ## Example
    /// ```rust
    /// use std::collections::HashMap;
    /// use chrono::Utc;
    /// use ordena_core::{AssembledOrder, LineRequest, Product};
    ///
    /// let now = Utc::now();
    /// let product = Product {
    ///     id: "p1".to_string(),
    ///     code: "P001".to_string(),
    ///     name: "Balón de fútbol".to_string(),
    ///     price_cents: 2550,
    ///     stock: 10,
    ///     created_at: now,
    ///     updated_at: now,
    /// };
    /// let products: HashMap<_, _> = [(product.id.clone(), product)].into();
    ///
    /// let order = AssembledOrder::assemble(
    ///     "client-1",
    ///     "seller-1",
    ///     &[LineRequest::new("p1", 3)],
    ///     |id| products.get(id),
    /// )
    /// .unwrap();
    ///
    /// assert_eq!(order.total_cents(), 7650); // $76.50
    /// ```
    pub fn assemble<'a, F>(
        client_id: &str,
        seller_id: &str,
        requests: &[LineRequest],
        lookup: F,
    ) -> OrderResult<Self>
    where
        F: Fn(&str) -> Option<&'a Product>,
    {
        validate_line_count(requests.len())?;

        let mut lines = Vec::with_capacity(requests.len());
        let mut total = Money::zero();

        // Lines are priced in request order so the first failing line is
        // the one reported.
        for request in requests {
            validate_quantity(request.quantity)?;

            let product = lookup(&request.product_id)
                .ok_or_else(|| OrderError::ProductNotFound(request.product_id.clone()))?;

            if !product.has_stock(request.quantity) {
                return Err(OrderError::InsufficientStock {
                    product_id: product.id.clone(),
                    available: product.stock,
                    requested: request.quantity,
                });
            }

            let unit_price = product.price();
            let subtotal = unit_price.multiply_quantity(request.quantity);
            total += subtotal;

            lines.push(AssembledLine {
                product_id: product.id.clone(),
                code: product.code.clone(),
                name: product.name.clone(),
                unit_price_cents: unit_price.cents(),
                quantity: request.quantity,
                subtotal_cents: subtotal.cents(),
            });
        }

        Ok(AssembledOrder {
            client_id: client_id.to_string(),
            seller_id: seller_id.to_string(),
            total_cents: total.cents(),
            lines,
        })
    }

    /// The client the order is for.
    #[inline]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// The authenticated user placing the order.
    #[inline]
    pub fn seller_id(&self) -> &str {
        &self.seller_id
    }

    /// Precomputed order total, Σ of line subtotals.
    #[inline]
    pub fn total_cents(&self) -> i64 {
        self.total_cents
    }

    /// The priced lines with frozen unit prices, in request order.
    #[inline]
    pub fn lines(&self) -> &[AssembledLine] {
        &self.lines
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

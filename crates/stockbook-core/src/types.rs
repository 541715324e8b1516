//! # Domain Types
//!
//! Core domain records used throughout Stockbook.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌──────────────┐    ┌──────────────────┐    ┌──────────────────┐      │
//! │  │  Category    │◄───│     Product      │    │     Service      │      │
//! │  └──────────────┘    │  quantity        │    │  default_price   │      │
//! │                      │  initial_price   │    │  total_sold      │      │
//! │                      │  revenue/profit  │    │  revenue         │      │
//! │                      └────────┬─────────┘    └────────┬─────────┘      │
//! │                               │ exactly one of        │                │
//! │                               ▼                       ▼                │
//! │                      ┌─────────────────────────────────────────┐       │
//! │                      │             SellHistory                 │       │
//! │                      │  amount, sold_price, total_price        │       │
//! │                      │  initial_price snapshot (products only) │       │
//! │                      └───────────┬───────────────┬─────────────┘       │
//! │                                  │               │                     │
//! │                    ┌─────────────▼───┐   ┌───────▼──────────┐          │
//! │                    │ SellTransaction │   │    DebitItem     │──► Debit │
//! │                    │ (bulk sell)     │   │                  │          │
//! │                    └─────────────────┘   └──────────────────┘          │
//! │                                                                         │
//! │  DailyExpense, SupplyExpense: standalone cost records                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All money fields are integer cents and carry a `_cents` suffix.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::{CoreResult, ValidationError};
use crate::ledger::{DebitBalance, ProductTotals, ServiceTotals};
use crate::money::Money;

// =============================================================================
// Category
// =============================================================================

/// A product grouping shown in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Category {
    pub id: String,
    pub name: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Product
// =============================================================================

/// A stocked item with a unit cost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name.
    pub name: String,

    /// Optional category.
    pub category_id: Option<String>,

    /// Units currently in stock.
    pub quantity: i64,

    /// Unit cost in cents.
    pub initial_price_cents: i64,

    /// Suggested unit price in cents (informational only).
    pub selling_price_cents: i64,

    /// Cumulative units sold.
    pub total_sold: i64,

    /// Cumulative money received in cents.
    pub revenue_cents: i64,

    /// `revenue - initial_price * total_sold`, rewritten on every sale.
    pub profit_cents: i64,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the unit cost as Money.
    #[inline]
    pub fn initial_price(&self) -> Money {
        Money::from_cents(self.initial_price_cents)
    }

    /// Returns the suggested price as Money.
    #[inline]
    pub fn selling_price(&self) -> Money {
        Money::from_cents(self.selling_price_cents)
    }

    /// Snapshot of the running totals the sell arithmetic works on.
    pub fn totals(&self) -> ProductTotals {
        ProductTotals {
            quantity: self.quantity,
            initial_price: self.initial_price(),
            total_sold: self.total_sold,
            revenue: Money::from_cents(self.revenue_cents),
        }
    }

    /// Writes new running totals back, recomputing the stored profit.
    /// Leaves `self` untouched when the profit does not fit.
    pub fn apply_totals(&mut self, totals: &ProductTotals) -> CoreResult<()> {
        let profit = totals.profit()?;
        self.quantity = totals.quantity;
        self.initial_price_cents = totals.initial_price.cents();
        self.total_sold = totals.total_sold;
        self.revenue_cents = totals.revenue.cents();
        self.profit_cents = profit.cents();
        Ok(())
    }
}

// =============================================================================
// Service
// =============================================================================

/// A sellable service. No stock and no unit cost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Service {
    pub id: String,
    pub name: String,
    pub default_price_cents: i64,
    pub total_sold: i64,
    pub revenue_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Service {
    /// Snapshot of the running totals.
    pub fn totals(&self) -> ServiceTotals {
        ServiceTotals {
            total_sold: self.total_sold,
            revenue: Money::from_cents(self.revenue_cents),
        }
    }

    /// Writes new running totals back.
    pub fn apply_totals(&mut self, totals: &ServiceTotals) {
        self.total_sold = totals.total_sold;
        self.revenue_cents = totals.revenue.cents();
    }
}

// =============================================================================
// Sell History
// =============================================================================

/// What a sell-history row was sold against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaleSubject {
    Product(String),
    Service(String),
}

/// One immutable sale record.
///
/// ## Snapshot Pattern
/// `initial_price_cents` freezes the product's unit cost at the moment of
/// sale. Service sales leave it null, which is also how shared history
/// queries tell the two apart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SellHistory {
    pub id: String,
    pub product_id: Option<String>,
    pub service_id: Option<String>,
    pub transaction_id: Option<String>,
    /// Units sold.
    pub amount: i64,
    /// Unit price actually charged.
    pub sold_price_cents: i64,
    /// `amount * sold_price`.
    pub total_price_cents: i64,
    /// Unit cost at sale time (product sales only).
    pub initial_price_cents: Option<i64>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl SellHistory {
    /// Builds the history row for a product sale.
    pub fn for_product(
        id: String,
        product: &Product,
        amount: i64,
        sold_price: Money,
        total_price: Money,
        transaction_id: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        SellHistory {
            id,
            product_id: Some(product.id.clone()),
            service_id: None,
            transaction_id,
            amount,
            sold_price_cents: sold_price.cents(),
            total_price_cents: total_price.cents(),
            initial_price_cents: Some(product.initial_price_cents),
            created_at,
        }
    }

    /// Builds the history row for a service sale.
    pub fn for_service(
        id: String,
        service: &Service,
        amount: i64,
        sold_price: Money,
        total_price: Money,
        created_at: DateTime<Utc>,
    ) -> Self {
        SellHistory {
            id,
            product_id: None,
            service_id: Some(service.id.clone()),
            transaction_id: None,
            amount,
            sold_price_cents: sold_price.cents(),
            total_price_cents: total_price.cents(),
            initial_price_cents: None,
            created_at,
        }
    }

    /// Returns the sale subject, or `None` for a malformed row.
    pub fn subject(&self) -> Option<SaleSubject> {
        match (&self.product_id, &self.service_id) {
            (Some(id), None) => Some(SaleSubject::Product(id.clone())),
            (None, Some(id)) => Some(SaleSubject::Service(id.clone())),
            _ => None,
        }
    }

    /// Returns the line total as Money.
    #[inline]
    pub fn total_price(&self) -> Money {
        Money::from_cents(self.total_price_cents)
    }
}

// =============================================================================
// Sell Transaction
// =============================================================================

/// Header row grouping the lines of one bulk sell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SellTransaction {
    pub id: String,
    pub total_price_cents: i64,
    pub item_count: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Debit Status
// =============================================================================

/// Payment state of a debit.
///
/// ## State Machine
/// ```text
/// PENDING ──pay──► PARTIAL ──pay (settles)──► PAID
///    │                                         ▲
///    └──────────────pay (settles)──────────────┘
/// ```
/// Never moves backward. Derived from `(paid, total)`, see
/// [`DebitStatus::derive`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
#[ts(export)]
pub enum DebitStatus {
    /// Nothing paid yet.
    Pending,
    /// Some, but not all, paid.
    Partial,
    /// Fully paid. Terminal.
    Paid,
}

impl Default for DebitStatus {
    fn default() -> Self {
        DebitStatus::Pending
    }
}

impl fmt::Display for DebitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DebitStatus::Pending => write!(f, "PENDING"),
            DebitStatus::Partial => write!(f, "PARTIAL"),
            DebitStatus::Paid => write!(f, "PAID"),
        }
    }
}

impl FromStr for DebitStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "PENDING" => Ok(DebitStatus::Pending),
            "PARTIAL" => Ok(DebitStatus::Partial),
            "PAID" => Ok(DebitStatus::Paid),
            _ => Err(ValidationError::NotAllowed {
                field: "status".to_string(),
                allowed: vec!["PENDING".into(), "PARTIAL".into(), "PAID".into()],
            }),
        }
    }
}

// =============================================================================
// Debit
// =============================================================================

/// A customer's deferred-payment obligation over one or more prior sales.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Debit {
    pub id: String,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub note: Option<String>,
    /// Sum of the items' total prices, fixed at creation.
    pub total_amount_cents: i64,
    /// Cumulative payments. Never decreases.
    pub paid_amount_cents: i64,
    /// Denormalized copy of `DebitStatus::derive(paid, total)`.
    pub status: DebitStatus,
    /// Set when the debit becomes PAID.
    #[ts(as = "Option<String>")]
    pub paid_at: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Debit {
    /// Snapshot of the payment state.
    pub fn balance(&self) -> DebitBalance {
        DebitBalance {
            total: Money::from_cents(self.total_amount_cents),
            paid: Money::from_cents(self.paid_amount_cents),
            paid_at: self.paid_at,
        }
    }

    /// Writes a new payment state back.
    pub fn apply_balance(&mut self, balance: &DebitBalance) {
        self.paid_amount_cents = balance.paid.cents();
        self.status = balance.status();
        self.paid_at = balance.paid_at;
    }

    /// Amount still owed.
    pub fn remaining(&self) -> Money {
        self.balance().remaining()
    }
}

/// Link between a debit and one sell-history row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DebitItem {
    pub id: String,
    pub debit_id: String,
    pub sell_history_id: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A debit item joined with the sale it covers.
///
/// Product sales carry `product_name` (and `category_name` when the product
/// has one); service sales carry `service_name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DebitLine {
    /// Debit item id.
    pub id: String,
    pub sell_history_id: String,
    pub amount: i64,
    pub sold_price_cents: i64,
    pub total_price_cents: i64,
    pub product_id: Option<String>,
    pub product_name: Option<String>,
    pub category_name: Option<String>,
    pub service_id: Option<String>,
    pub service_name: Option<String>,
    #[ts(as = "String")]
    pub sold_at: DateTime<Utc>,
}

// =============================================================================
// Aggregates returned by operations
// =============================================================================

/// A product with its category and sell history (newest first).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ProductDetail {
    pub product: Product,
    pub category: Option<Category>,
    pub history: Vec<SellHistory>,
}

/// A service with its sell history (newest first).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ServiceDetail {
    pub service: Service,
    pub history: Vec<SellHistory>,
}

/// A debit with its items and their sale context.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DebitDetail {
    pub debit: Debit,
    pub items: Vec<DebitLine>,
}

/// Result of a committed bulk sell.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct BulkSellOutcome {
    pub transaction: SellTransaction,
    /// Updated products, in order of first appearance in the request.
    pub products: Vec<Product>,
    pub history: Vec<SellHistory>,
}

// =============================================================================
// Expenses
// =============================================================================

/// A day-to-day running cost (rent, electricity, wages).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DailyExpense {
    pub id: String,
    pub title: String,
    pub amount_cents: i64,
    pub note: Option<String>,
    #[ts(as = "String")]
    pub spent_on: NaiveDate,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A purchase of stock or materials from a supplier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SupplyExpense {
    pub id: String,
    pub supplier: String,
    pub description: String,
    pub amount_cents: i64,
    pub quantity: Option<i64>,
    pub note: Option<String>,
    #[ts(as = "String")]
    pub spent_on: NaiveDate,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

//! # Ledger Arithmetic
//!
//! The pure part of selling and debt collection. The database layer loads a
//! row, calls into this module, and writes back whatever comes out, all
//! inside one transaction.
//!
//! ## Sell Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  sell_product(id, amount=3, sold_price=8)                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SaleLine::new(3, 8)          ← rejects amount ≤ 0, price ≤ 0           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ProductTotals::sell(line)    ← rejects amount > quantity               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  quantity 10 → 7, total_sold 0 → 3, revenue 0 → 24                     │
//! │  profit = 24 − 5 × 3 = 9   (recomputed, never incremented)             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Payment Flow
//! ```text
//! total=100  paid=0   PENDING
//!   pay 40 → paid=40  PARTIAL
//!   pay 60 → paid=100 PAID (paid_at stamped)
//!   pay 1  → ExceedsTotal { remaining: 0 }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::DebitStatus;
use crate::validation::{validate_payment_amount, validate_sell_amount, validate_sold_price_cents};

// =============================================================================
// Sale Line
// =============================================================================

/// A validated `(amount, sold_price)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaleLine {
    pub amount: i64,
    pub sold_price: Money,
}

impl SaleLine {
    /// Validates and builds a sale line.
    pub fn new(amount: i64, sold_price_cents: i64) -> CoreResult<Self> {
        validate_sell_amount(amount)?;
        validate_sold_price_cents(sold_price_cents)?;
        Ok(SaleLine {
            amount,
            sold_price: Money::from_cents(sold_price_cents),
        })
    }

    /// `amount * sold_price`.
    pub fn total(&self) -> CoreResult<Money> {
        self.sold_price
            .checked_multiply_quantity(self.amount)
            .ok_or_else(|| CoreError::Overflow("total price".to_string()))
    }
}

// =============================================================================
// Product Totals
// =============================================================================

/// The running counters of one product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductTotals {
    pub quantity: i64,
    pub initial_price: Money,
    pub total_sold: i64,
    pub revenue: Money,
}

impl ProductTotals {
    /// `revenue - initial_price * total_sold`.
    pub fn profit(&self) -> CoreResult<Money> {
        self.initial_price
            .checked_multiply_quantity(self.total_sold)
            .and_then(|cost| self.revenue.checked_sub(cost))
            .ok_or_else(|| CoreError::Overflow("profit".to_string()))
    }

    /// Returns `self` once its profit is known to fit.
    fn with_profit_in_range(self) -> CoreResult<ProductTotals> {
        self.profit()?;
        Ok(self)
    }

    /// Applies a sale. All-or-nothing: a short stock is an error, never a
    /// partial fill.
    pub fn sell(&self, product_id: &str, line: &SaleLine) -> CoreResult<ProductTotals> {
        if line.amount > self.quantity {
            return Err(CoreError::InsufficientStock {
                product_id: product_id.to_string(),
                available: self.quantity,
                requested: line.amount,
            });
        }

        let line_total = line.total()?;
        let revenue = self
            .revenue
            .checked_add(line_total)
            .ok_or_else(|| CoreError::Overflow("revenue".to_string()))?;
        let total_sold = self
            .total_sold
            .checked_add(line.amount)
            .ok_or_else(|| CoreError::Overflow("total sold".to_string()))?;

        ProductTotals {
            quantity: self.quantity - line.amount,
            initial_price: self.initial_price,
            total_sold,
            revenue,
        }
        .with_profit_in_range()
    }

    /// Reverses a recorded sale (history correction).
    pub fn unsell(&self, amount: i64, total_price: Money) -> CoreResult<ProductTotals> {
        if amount > self.total_sold {
            return Err(CoreError::Overflow("total sold".to_string()));
        }

        let quantity = self
            .quantity
            .checked_add(amount)
            .ok_or_else(|| CoreError::Overflow("quantity".to_string()))?;
        let revenue = self
            .revenue
            .checked_sub(total_price)
            .ok_or_else(|| CoreError::Overflow("revenue".to_string()))?;

        ProductTotals {
            quantity,
            initial_price: self.initial_price,
            total_sold: self.total_sold - amount,
            revenue,
        }
        .with_profit_in_range()
    }

    /// Changes the unit cost. Fails when the new cost times the units
    /// already sold no longer fits.
    pub fn reprice(&self, initial_price: Money) -> CoreResult<ProductTotals> {
        ProductTotals {
            initial_price,
            ..*self
        }
        .with_profit_in_range()
    }
}

// =============================================================================
// Service Totals
// =============================================================================

/// The running counters of one service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceTotals {
    pub total_sold: i64,
    pub revenue: Money,
}

impl ServiceTotals {
    /// Services carry no cost, so profit is revenue.
    pub fn profit(&self) -> Money {
        self.revenue
    }

    /// Applies a sale. Services have unlimited availability.
    pub fn sell(&self, line: &SaleLine) -> CoreResult<ServiceTotals> {
        let line_total = line.total()?;
        Ok(ServiceTotals {
            total_sold: self
                .total_sold
                .checked_add(line.amount)
                .ok_or_else(|| CoreError::Overflow("total sold".to_string()))?,
            revenue: self
                .revenue
                .checked_add(line_total)
                .ok_or_else(|| CoreError::Overflow("revenue".to_string()))?,
        })
    }

    /// Reverses a recorded sale (history correction).
    pub fn unsell(&self, amount: i64, total_price: Money) -> CoreResult<ServiceTotals> {
        if amount > self.total_sold {
            return Err(CoreError::Overflow("total sold".to_string()));
        }

        Ok(ServiceTotals {
            total_sold: self.total_sold - amount,
            revenue: self
                .revenue
                .checked_sub(total_price)
                .ok_or_else(|| CoreError::Overflow("revenue".to_string()))?,
        })
    }
}

// =============================================================================
// Debit Balance
// =============================================================================

impl DebitStatus {
    /// Derives the status from the payment state.
    ///
    /// ```rust
    /// use stockbook_core::{DebitStatus, Money};
    ///
    /// let total = Money::from_cents(100);
    /// assert_eq!(DebitStatus::derive(Money::zero(), total), DebitStatus::Pending);
    /// assert_eq!(DebitStatus::derive(Money::from_cents(40), total), DebitStatus::Partial);
    /// assert_eq!(DebitStatus::derive(total, total), DebitStatus::Paid);
    /// ```
    pub fn derive(paid: Money, total: Money) -> DebitStatus {
        if paid >= total {
            DebitStatus::Paid
        } else if paid.is_zero() {
            DebitStatus::Pending
        } else {
            DebitStatus::Partial
        }
    }
}

/// Payment state of one debit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebitBalance {
    pub total: Money,
    pub paid: Money,
    pub paid_at: Option<DateTime<Utc>>,
}

impl DebitBalance {
    /// A fresh, unpaid balance.
    pub fn open(total: Money) -> CoreResult<DebitBalance> {
        if !total.is_positive() {
            return Err(CoreError::InvalidDebitTotal {
                total_cents: total.cents(),
            });
        }
        Ok(DebitBalance {
            total,
            paid: Money::zero(),
            paid_at: None,
        })
    }

    /// Current status.
    pub fn status(&self) -> DebitStatus {
        DebitStatus::derive(self.paid, self.total)
    }

    /// Amount still owed.
    pub fn remaining(&self) -> Money {
        self.total - self.paid
    }

    /// Applies one payment.
    ///
    /// `paid_at` is stamped with `now` only on the transition into PAID.
    pub fn apply_payment(
        &self,
        debit_id: &str,
        amount_cents: i64,
        now: DateTime<Utc>,
    ) -> CoreResult<DebitBalance> {
        validate_payment_amount(amount_cents)?;
        let amount = Money::from_cents(amount_cents);

        let paid = self
            .paid
            .checked_add(amount)
            .ok_or_else(|| CoreError::Overflow("paid amount".to_string()))?;
        if paid > self.total {
            return Err(CoreError::ExceedsTotal {
                debit_id: debit_id.to_string(),
                remaining_cents: self.remaining().cents(),
            });
        }

        let became_paid = self.status() != DebitStatus::Paid && paid == self.total;
        let paid_at = if became_paid { Some(now) } else { self.paid_at };

        Ok(DebitBalance {
            total: self.total,
            paid,
            paid_at,
        })
    }
}

/// Sums the sale totals a new debit will cover.
pub fn debit_total(line_totals: impl IntoIterator<Item = Money>) -> CoreResult<Money> {
    let mut total = Money::zero();
    for line in line_totals {
        total = total
            .checked_add(line)
            .ok_or_else(|| CoreError::Overflow("debit total".to_string()))?;
    }
    DebitBalance::open(total).map(|b| b.total)
}

// =============================================================================
// Summary Report
// =============================================================================

/// Raw sums the report is computed from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportInputs {
    pub product_revenue: Money,
    /// Σ amount × cost snapshot over product sales.
    pub product_cost: Money,
    pub service_revenue: Money,
    pub daily_expenses: Money,
    pub supply_expenses: Money,
    pub outstanding_debits: Money,
}

/// Profit and expense overview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SummaryReport {
    pub product_revenue_cents: i64,
    pub product_cost_cents: i64,
    pub product_profit_cents: i64,
    pub service_revenue_cents: i64,
    pub service_profit_cents: i64,
    pub total_revenue_cents: i64,
    pub daily_expenses_cents: i64,
    pub supply_expenses_cents: i64,
    pub total_expenses_cents: i64,
    pub net_profit_cents: i64,
    pub outstanding_debits_cents: i64,
}

impl SummaryReport {
    /// Computes the report. Service profit is service revenue.
    pub fn compute(inputs: &ReportInputs) -> SummaryReport {
        let product_profit = inputs.product_revenue - inputs.product_cost;
        let service_profit = ServiceTotals {
            total_sold: 0,
            revenue: inputs.service_revenue,
        }
        .profit();
        let total_expenses = inputs.daily_expenses + inputs.supply_expenses;

        SummaryReport {
            product_revenue_cents: inputs.product_revenue.cents(),
            product_cost_cents: inputs.product_cost.cents(),
            product_profit_cents: product_profit.cents(),
            service_revenue_cents: inputs.service_revenue.cents(),
            service_profit_cents: service_profit.cents(),
            total_revenue_cents: (inputs.product_revenue + inputs.service_revenue).cents(),
            daily_expenses_cents: inputs.daily_expenses.cents(),
            supply_expenses_cents: inputs.supply_expenses.cents(),
            total_expenses_cents: total_expenses.cents(),
            net_profit_cents: (product_profit + service_profit - total_expenses).cents(),
            outstanding_debits_cents: inputs.outstanding_debits.cents(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

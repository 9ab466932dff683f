//! # Domain Types
//!
//! Business entities persisted locally and exchanged with the remote
//! snapshot store.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  Transaction    │──►│  CashMovement   │   │    Customer     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id "17"        │   │  id "mv_17"     │   │  id "4"         │       │
//! │  │  total          │   │  DEPOSIT 40.00  │   │  credit_limit   │       │
//! │  │  amount_paid    │   │  SALES          │   │  current_debt ◄─┼── sale │
//! │  │  payment_method │   └─────────────────┘   └─────────────────┘       │
//! │  └─────────────────┘                                                    │
//! │                                                                         │
//! │  Product · Supplier · Order · Purchase       → sequence ids ("1","2")  │
//! │  User · UserInvite · ActivityLog             → UUID v4 ids             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All types serialize with camelCase field names; that is the wire format of
//! the remote snapshot and of the persisted collections.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::{Money, MONEY_EPSILON};

// =============================================================================
// Payment Enums
// =============================================================================

/// How a sale was paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Physical cash into the drawer.
    #[default]
    Cash,
    /// Card on an external terminal.
    Card,
    /// Bank transfer.
    Transfer,
    /// Several instruments; see [`Transaction::split_parts`].
    Split,
    /// Store credit: the customer owes the amount.
    Credit,
}

impl PaymentMethod {
    /// Returns true for physical cash.
    #[inline]
    pub fn is_cash(&self) -> bool {
        matches!(self, PaymentMethod::Cash)
    }
}

/// Settlement state of a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Paid,
    Partial,
    #[default]
    Pending,
}

impl PaymentStatus {
    /// Derives the status from what was paid against what is owed.
    ///
    /// ```rust
    /// use tally_core::{Money, PaymentStatus};
    ///
    /// let total = Money::from_cents(10_000);
    /// assert_eq!(PaymentStatus::derive(total, total), PaymentStatus::Paid);
    /// assert_eq!(PaymentStatus::derive(total, Money::from_cents(9_999)), PaymentStatus::Paid);
    /// assert_eq!(PaymentStatus::derive(total, Money::from_cents(10)), PaymentStatus::Partial);
    /// assert_eq!(PaymentStatus::derive(total, Money::zero()), PaymentStatus::Pending);
    /// ```
    pub fn derive(total: Money, amount_paid: Money) -> Self {
        if amount_paid >= total - MONEY_EPSILON {
            PaymentStatus::Paid
        } else if amount_paid.is_positive() {
            PaymentStatus::Partial
        } else {
            PaymentStatus::Pending
        }
    }
}

/// Lifecycle of a sale. Sales are never physically deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    #[default]
    Completed,
    Cancelled,
    Returned,
}

// =============================================================================
// Line Items
// =============================================================================

/// A product line on a sale or order.
///
/// Name and price are frozen at the time of sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub product_id: String,
    #[serde(default)]
    pub name: String,
    pub quantity: i64,
    pub unit_price: Money,
    #[serde(default)]
    pub discount: Money,
}

impl LineItem {
    pub fn new(product_id: impl Into<String>, quantity: i64, unit_price: Money) -> Self {
        LineItem {
            product_id: product_id.into(),
            name: String::new(),
            quantity,
            unit_price,
            discount: Money::zero(),
        }
    }

    /// `unit_price × quantity − discount`, never negative.
    pub fn line_total(&self) -> Money {
        (self.unit_price.times(self.quantity) - self.discount).non_negative()
    }
}

/// One instrument of a split payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPart {
    pub method: PaymentMethod,
    pub amount: Money,
}

// =============================================================================
// Transaction (sale)
// =============================================================================

/// A committed sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    #[serde(default)]
    pub items: Vec<LineItem>,
    #[serde(default)]
    pub subtotal: Money,
    #[serde(default)]
    pub tax: Money,
    #[serde(default)]
    pub discount: Money,
    #[serde(default)]
    pub shipping: Money,
    #[serde(default)]
    pub total: Money,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    /// Instruments of a split payment; empty otherwise.
    #[serde(default)]
    pub split_parts: Vec<PaymentPart>,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub amount_paid: Money,
    /// What the customer handed over (cash sales may include change).
    #[serde(default)]
    pub tendered: Money,
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub status: TransactionStatus,
    #[serde(default)]
    pub is_return: bool,
    /// Debt put on the customer by the forward cascade.
    /// Reversal subtracts exactly this amount.
    #[serde(default)]
    pub debt_recorded: Option<Money>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Transaction {
    /// Builds a completed sale from line items; subtotal and total follow
    /// the items. The id is left empty for the sequence allocator.
    pub fn from_items(items: Vec<LineItem>, now: DateTime<Utc>) -> Self {
        let subtotal = items.iter().map(LineItem::line_total).sum();
        let mut tx = Transaction {
            id: String::new(),
            items,
            subtotal,
            tax: Money::zero(),
            discount: Money::zero(),
            shipping: Money::zero(),
            total: Money::zero(),
            payment_method: PaymentMethod::Cash,
            split_parts: Vec::new(),
            payment_status: PaymentStatus::Pending,
            amount_paid: Money::zero(),
            tendered: Money::zero(),
            customer_id: None,
            status: TransactionStatus::Completed,
            is_return: false,
            debt_recorded: None,
            user_id: None,
            notes: None,
            created_at: now,
            updated_at: None,
        };
        tx.normalize();
        tx
    }

    /// `subtotal + tax + shipping − discount`, clamped at zero.
    pub fn computed_total(&self) -> Money {
        (self.subtotal + self.tax + self.shipping - self.discount).non_negative()
    }

    /// What is still owed on this sale.
    pub fn outstanding(&self) -> Money {
        (self.total - self.amount_paid).non_negative()
    }

    /// Re-establishes the total/paid invariants and the payment status.
    pub fn normalize(&mut self) {
        self.total = self.computed_total();
        if self.status == TransactionStatus::Cancelled {
            self.amount_paid = Money::zero();
        } else if self.amount_paid > self.total {
            self.amount_paid = self.total;
        }
        self.amount_paid = self.amount_paid.non_negative();
        self.payment_status = PaymentStatus::derive(self.total, self.amount_paid);
    }

    /// Returns true once the sale was cancelled or returned.
    pub fn is_closed(&self) -> bool {
        matches!(
            self.status,
            TransactionStatus::Cancelled | TransactionStatus::Returned
        )
    }
}

// =============================================================================
// Cash Movements
// =============================================================================

/// Kind of drawer movement. The sign is implied by the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementType {
    Open,
    Close,
    Deposit,
    Expense,
    Withdrawal,
}

/// Which balance a movement affects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CashChannel {
    /// The physical drawer.
    #[default]
    Physical,
    /// Bank / virtual balance.
    Virtual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementCategory {
    Sales,
    Payment,
    Expense,
    Adjustment,
    #[default]
    Other,
}

/// A signed ledger entry of the cash drawer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashMovement {
    pub id: String,
    #[serde(rename = "type")]
    pub movement_type: MovementType,
    /// Always a non-negative magnitude.
    pub amount: Money,
    #[serde(default)]
    pub channel: CashChannel,
    #[serde(default)]
    pub category: MovementCategory,
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CashMovement {
    /// Signed effect of this movement on its channel balance.
    pub fn signed_amount(&self) -> Money {
        match self.movement_type {
            MovementType::Open | MovementType::Deposit => self.amount,
            MovementType::Expense | MovementType::Withdrawal => -self.amount,
            MovementType::Close => Money::zero(),
        }
    }
}

// =============================================================================
// Catalog and Parties
// =============================================================================

/// A product in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub barcode: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub price: Money,
    #[serde(default)]
    pub cost: Money,
    #[serde(default)]
    pub stock: i64,
    #[serde(default = "default_true")]
    pub track_inventory: bool,
    #[serde(default)]
    pub min_stock: i64,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_true() -> bool {
    true
}

impl Product {
    pub fn new(name: impl Into<String>, price: Money, stock: i64, now: DateTime<Utc>) -> Self {
        Product {
            id: String::new(),
            name: name.into(),
            sku: None,
            barcode: None,
            category: None,
            price,
            cost: Money::zero(),
            stock,
            track_inventory: true,
            min_stock: 0,
            is_active: true,
            created_at: now,
            updated_at: None,
        }
    }

    /// Returns true when stock fell to or below the reorder threshold.
    pub fn is_low_stock(&self) -> bool {
        self.track_inventory && self.stock <= self.min_stock
    }
}

/// A customer who may buy on credit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub credit_limit: Money,
    #[serde(default)]
    pub current_debt: Money,
    #[serde(default)]
    pub unlimited_credit: bool,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
}

impl Customer {
    pub fn new(name: impl Into<String>, credit_limit: Money, now: DateTime<Utc>) -> Self {
        Customer {
            id: String::new(),
            name: name.into(),
            phone: None,
            email: None,
            credit_limit,
            current_debt: Money::zero(),
            unlimited_credit: false,
            created_at: now,
        }
    }

    /// Returns true if `delta` more debt stays within the credit limit.
    pub fn can_take_on(&self, delta: Money) -> bool {
        self.unlimited_credit || self.current_debt + delta <= self.credit_limit + MONEY_EPSILON
    }

    /// Adds (or, for negative deltas, removes) debt; never below zero.
    pub fn adjust_debt(&mut self, delta: Money) {
        self.current_debt = (self.current_debt + delta).non_negative();
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Supplier {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub contact_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Orders and Purchases
// =============================================================================

/// Production pipeline state of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Pending,
    InProgress,
    Ready,
    Completed,
}

/// A made-to-order job; independent of the sale it may later become.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub items: Vec<LineItem>,
    #[serde(default)]
    pub total: Money,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseItem {
    pub product_id: String,
    #[serde(default)]
    pub name: String,
    pub quantity: i64,
    #[serde(default)]
    pub unit_cost: Money,
}

/// Stock bought from a supplier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Purchase {
    pub id: String,
    #[serde(default)]
    pub supplier_id: Option<String>,
    #[serde(default)]
    pub items: Vec<PurchaseItem>,
    #[serde(default)]
    pub total: Money,
    /// Stock was added to the catalog.
    #[serde(default)]
    pub received: bool,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Users and Audit
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Manager,
    #[default]
    Cashier,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default = "default_true")]
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInvite {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub accepted_at: Option<DateTime<Utc>>,
}

/// Audit trail entry. Recent entries also tell the push safety check that
/// an empty catalog is deliberate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLog {
    pub id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    pub action: String,
    #[serde(default)]
    pub details: Option<String>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn test_total_is_clamped_at_zero() {
        let mut tx = Transaction::from_items(vec![LineItem::new("1", 1, Money::from_cents(500))], now());
        tx.discount = Money::from_cents(900);
        tx.normalize();
        assert_eq!(tx.total, Money::zero());
    }

    #[test]
    fn test_total_includes_tax_and_shipping() {
        let mut tx = Transaction::from_items(vec![LineItem::new("1", 2, Money::from_cents(1000))], now());
        tx.tax = Money::from_cents(160);
        tx.shipping = Money::from_cents(500);
        tx.discount = Money::from_cents(60);
        tx.normalize();
        assert_eq!(tx.total.cents(), 2600);
    }

    #[test]
    fn test_amount_paid_capped_and_zeroed_when_cancelled() {
        let mut tx = Transaction::from_items(vec![LineItem::new("1", 1, Money::from_cents(1000))], now());
        tx.amount_paid = Money::from_cents(1500);
        tx.normalize();
        assert_eq!(tx.amount_paid.cents(), 1000);
        assert_eq!(tx.payment_status, PaymentStatus::Paid);

        tx.status = TransactionStatus::Cancelled;
        tx.normalize();
        assert_eq!(tx.amount_paid, Money::zero());
    }

    #[test]
    fn test_movement_sign_follows_type() {
        let mut mv = CashMovement {
            id: "1".into(),
            movement_type: MovementType::Expense,
            amount: Money::from_cents(300),
            channel: CashChannel::Physical,
            category: MovementCategory::Expense,
            transaction_id: None,
            description: None,
            user_id: None,
            created_at: now(),
        };
        assert_eq!(mv.signed_amount().cents(), -300);
        mv.movement_type = MovementType::Close;
        assert_eq!(mv.signed_amount(), Money::zero());
    }

    #[test]
    fn test_customer_credit_limit() {
        let mut customer = Customer::new("Ana", Money::from_cents(50_000), now());
        assert!(customer.can_take_on(Money::from_cents(50_000)));
        assert!(!customer.can_take_on(Money::from_cents(50_002)));

        customer.unlimited_credit = true;
        assert!(customer.can_take_on(Money::from_cents(1_000_000)));

        customer.adjust_debt(Money::from_cents(-10));
        assert_eq!(customer.current_debt, Money::zero());
    }

    #[test]
    fn test_wire_names() {
        let json = serde_json::json!({
            "id": "7",
            "type": "DEPOSIT",
            "amount": 4000,
            "category": "SALES",
            "transactionId": "3",
            "createdAt": "2026-01-05T10:00:00Z"
        });
        let mv: CashMovement = serde_json::from_value(json).unwrap();
        assert_eq!(mv.movement_type, MovementType::Deposit);
        assert_eq!(mv.channel, CashChannel::Physical);
        assert_eq!(mv.transaction_id.as_deref(), Some("3"));

        let status: OrderStatus = serde_json::from_str("\"IN_PROGRESS\"").unwrap();
        assert_eq!(status, OrderStatus::InProgress);
    }
}

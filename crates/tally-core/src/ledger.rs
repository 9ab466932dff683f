//! # Ledger Cascade
//!
//! Applies the derived effects of a sale, a cancellation or a later payment.
//!
//! ## Cascade
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          record_sale                                    │
//! │                                                                         │
//! │  Transaction ──┬──► stock      −qty per tracked line item               │
//! │                │                                                        │
//! │                ├──► CashMovement "mv_<txId>"  DEPOSIT  (cash portion)   │
//! │                │      only when the policy says the sale hits the       │
//! │                │      drawer                                            │
//! │                │                                                        │
//! │                └──► Customer.currentDebt  += total − amountPaid         │
//! │                       delta remembered on the transaction               │
//! │                                                                         │
//! │                          reverse_sale                                   │
//! │                                                                         │
//! │  exact inverse: remove "mv_<txId>", +qty, debt −= remembered delta      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every function validates first and mutates after, so a rejected call
//! leaves the dataset untouched.

use chrono::{DateTime, Local, Utc};

use crate::dataset::Dataset;
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::*;
use crate::validation::{validate_amount_bound, validate_sale};

/// Id of the drawer movement created for a sale.
pub fn sale_movement_id(transaction_id: &str) -> String {
    format!("mv_{transaction_id}")
}

// =============================================================================
// Policies and Outcomes
// =============================================================================

/// Whether a recorded sale may touch the cash drawer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CashAffect {
    /// Only paid, non-return sales dated today.
    #[default]
    Auto,
    /// Skip the paid/today heuristic (back-dated entry, manual correction).
    Always,
    /// Never create a movement.
    Never,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SaleOutcome {
    pub transaction_id: String,
    pub movement_id: Option<String>,
    pub cash_amount: Money,
    pub debt_delta: Money,
    /// Products of this sale now at or below their minimum stock.
    pub low_stock: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReversalOutcome {
    pub transaction_id: String,
    pub movement_removed: bool,
    pub debt_released: Money,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentOutcome {
    pub transaction_id: String,
    pub payment_status: PaymentStatus,
    pub movement_id: Option<String>,
}

// =============================================================================
// Helpers
// =============================================================================

/// The part of a sale that is physical cash.
///
/// Cash sales count `amountPaid` (change already handed back). Split sales
/// count their cash parts, never more than was paid in total.
pub fn cash_portion(tx: &Transaction) -> Money {
    match tx.payment_method {
        PaymentMethod::Cash => tx.amount_paid,
        PaymentMethod::Split => {
            let cash: Money = tx
                .split_parts
                .iter()
                .filter(|p| p.method.is_cash())
                .map(|p| p.amount)
                .sum();
            cash.min(tx.amount_paid).non_negative()
        }
        PaymentMethod::Card | PaymentMethod::Transfer | PaymentMethod::Credit => Money::zero(),
    }
}

fn is_same_local_day(a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
    a.with_timezone(&Local).date_naive() == b.with_timezone(&Local).date_naive()
}

fn affects_drawer(tx: &Transaction, policy: CashAffect, now: DateTime<Utc>) -> bool {
    if tx.is_return || tx.is_closed() {
        return false;
    }
    match policy {
        CashAffect::Never => false,
        CashAffect::Always => true,
        CashAffect::Auto => {
            tx.payment_status == PaymentStatus::Paid && is_same_local_day(tx.created_at, now)
        }
    }
}

/// Stock direction of a sale: sales consume, returns restock.
fn stock_sign(tx: &Transaction) -> i64 {
    if tx.is_return {
        1
    } else {
        -1
    }
}

fn low_stock_products(dataset: &Dataset, items: &[LineItem]) -> Vec<String> {
    let mut low: Vec<String> = Vec::new();
    for item in items {
        let is_low = dataset
            .find::<Product>(&item.product_id)
            .is_some_and(Product::is_low_stock);
        if is_low && !low.contains(&item.product_id) {
            low.push(item.product_id.clone());
        }
    }
    low
}

fn adjust_stock(dataset: &mut Dataset, items: &[LineItem], sign: i64) {
    for item in items {
        if let Some(product) = dataset.find_mut::<Product>(&item.product_id) {
            if product.track_inventory {
                product.stock = product.stock.saturating_add(sign * item.quantity);
            }
        }
    }
}

// =============================================================================
// Forward Cascade
// =============================================================================

/// Commits a sale and applies its drawer, stock and debt effects.
///
/// ## Errors
/// - `Validation` for malformed line items or out-of-range amounts
/// - `CustomerNotFound` for an unknown customer id
/// - `CreditLimitExceeded` when the unpaid remainder does not fit the limit
/// - `InvalidSaleStatus` when a transaction with the same id was already recorded
pub fn record_sale(
    dataset: &mut Dataset,
    mut tx: Transaction,
    policy: CashAffect,
    now: DateTime<Utc>,
) -> CoreResult<SaleOutcome> {
    validate_sale(&tx)?;
    tx.normalize();

    if !tx.id.is_empty() {
        if let Some(existing) = dataset.find::<Transaction>(&tx.id) {
            return Err(CoreError::InvalidSaleStatus {
                transaction_id: tx.id.clone(),
                status: existing.status,
                operation: "record again",
            });
        }
    }

    let unpaid = tx.outstanding();
    let mut debt_delta = Money::zero();
    if let Some(customer_id) = tx.customer_id.as_deref() {
        let customer = dataset
            .find::<Customer>(customer_id)
            .ok_or_else(|| CoreError::CustomerNotFound(customer_id.to_string()))?;

        if unpaid.exceeds_epsilon() && !tx.is_return && !tx.is_closed() {
            if !customer.can_take_on(unpaid) {
                return Err(CoreError::CreditLimitExceeded {
                    customer_id: customer.id.clone(),
                    available: (customer.credit_limit - customer.current_debt).non_negative(),
                    requested: unpaid,
                });
            }
            debt_delta = unpaid;
        }
    }

    // Validated: mutate from here on.
    if tx.id.is_empty() {
        tx.id = dataset.allocate_id::<Transaction>();
    }
    let tx_id = tx.id.clone();

    let mut low_stock = Vec::new();
    if !tx.is_closed() {
        adjust_stock(dataset, &tx.items, stock_sign(&tx));
        if !tx.is_return {
            low_stock = low_stock_products(dataset, &tx.items);
        }
    }

    let cash_amount = cash_portion(&tx);
    let mut movement_id = None;
    if cash_amount.is_positive() && affects_drawer(&tx, policy, now) {
        let id = sale_movement_id(&tx_id);
        dataset.cash_movements.retain(|m| m.id != id);
        dataset.cash_movements.push(CashMovement {
            id: id.clone(),
            movement_type: MovementType::Deposit,
            amount: cash_amount,
            channel: CashChannel::Physical,
            category: MovementCategory::Sales,
            transaction_id: Some(tx_id.clone()),
            description: Some(format!("Sale #{tx_id}")),
            user_id: tx.user_id.clone(),
            created_at: now,
        });
        movement_id = Some(id);
    }

    if debt_delta.is_positive() {
        if let Some(customer_id) = tx.customer_id.as_deref() {
            if let Some(customer) = dataset.find_mut::<Customer>(customer_id) {
                customer.adjust_debt(debt_delta);
            }
        }
        tx.debt_recorded = Some(debt_delta);
    } else {
        tx.debt_recorded = None;
    }

    dataset.transactions.push(tx);

    Ok(SaleOutcome {
        transaction_id: tx_id,
        movement_id,
        cash_amount: if cash_amount.is_positive() {
            cash_amount
        } else {
            Money::zero()
        },
        debt_delta,
        low_stock,
    })
}

// =============================================================================
// Reversal
// =============================================================================

/// Cancels a sale and undoes exactly what [`record_sale`] applied.
///
/// `line_items` are the items whose stock is restored, normally the
/// transaction's own items. The debt released is the delta recorded at sale
/// time, not recomputed from the current (possibly partially paid) state.
pub fn reverse_sale(
    dataset: &mut Dataset,
    transaction_id: &str,
    line_items: &[LineItem],
    now: DateTime<Utc>,
) -> CoreResult<ReversalOutcome> {
    let tx = dataset
        .find::<Transaction>(transaction_id)
        .ok_or_else(|| CoreError::TransactionNotFound(transaction_id.to_string()))?;

    if tx.status == TransactionStatus::Cancelled {
        return Err(CoreError::InvalidSaleStatus {
            transaction_id: transaction_id.to_string(),
            status: tx.status,
            operation: "reverse",
        });
    }

    let debt_delta = tx.debt_recorded.unwrap_or_default();
    let customer_id = tx.customer_id.clone();
    let sign = stock_sign(tx);
    let restock = tx.status == TransactionStatus::Completed;

    let movement_id = sale_movement_id(transaction_id);
    let before = dataset.cash_movements.len();
    dataset.cash_movements.retain(|m| m.id != movement_id);
    let movement_removed = dataset.cash_movements.len() != before;

    if restock {
        adjust_stock(dataset, line_items, -sign);
    }

    let mut debt_released = Money::zero();
    if debt_delta.is_positive() {
        if let Some(customer) = customer_id
            .as_deref()
            .and_then(|id| dataset.find_mut::<Customer>(id))
        {
            let before = customer.current_debt;
            customer.adjust_debt(-debt_delta);
            debt_released = before - customer.current_debt;
        }
    }

    if let Some(tx) = dataset.find_mut::<Transaction>(transaction_id) {
        tx.status = TransactionStatus::Cancelled;
        tx.amount_paid = Money::zero();
        tx.payment_status = PaymentStatus::Pending;
        tx.debt_recorded = None;
        tx.updated_at = Some(now);
    }

    Ok(ReversalOutcome {
        transaction_id: transaction_id.to_string(),
        movement_removed,
        debt_released,
    })
}

// =============================================================================
// Payments
// =============================================================================

/// Registers a later payment against an open sale.
///
/// The customer's debt goes down by `amount`, never below zero. Cash
/// payments get their own DEPOSIT movement with a sequence id, separate from
/// the sale movement.
pub fn register_payment(
    dataset: &mut Dataset,
    transaction_id: &str,
    amount: Money,
    method: PaymentMethod,
    now: DateTime<Utc>,
) -> CoreResult<PaymentOutcome> {
    if !amount.is_positive() {
        return Err(CoreError::InvalidPaymentAmount {
            reason: format!("payment must be positive, got {amount}"),
        });
    }
    validate_amount_bound("amount", amount)?;

    let tx = dataset
        .find::<Transaction>(transaction_id)
        .ok_or_else(|| CoreError::TransactionNotFound(transaction_id.to_string()))?;
    if tx.is_closed() {
        return Err(CoreError::InvalidSaleStatus {
            transaction_id: transaction_id.to_string(),
            status: tx.status,
            operation: "register a payment",
        });
    }
    let customer_id = tx.customer_id.clone();

    let movement_id = if method.is_cash() {
        let id = dataset.allocate_id::<CashMovement>();
        dataset.cash_movements.push(CashMovement {
            id: id.clone(),
            movement_type: MovementType::Deposit,
            amount,
            channel: CashChannel::Physical,
            category: MovementCategory::Payment,
            transaction_id: Some(transaction_id.to_string()),
            description: Some(format!("Payment on sale #{transaction_id}")),
            user_id: None,
            created_at: now,
        });
        Some(id)
    } else {
        None
    };

    if let Some(customer) = customer_id
        .as_deref()
        .and_then(|id| dataset.find_mut::<Customer>(id))
    {
        customer.adjust_debt(-amount);
    }

    let mut payment_status = PaymentStatus::Pending;
    if let Some(tx) = dataset.find_mut::<Transaction>(transaction_id) {
        tx.amount_paid = (tx.amount_paid + amount).min(tx.total);
        tx.payment_status = PaymentStatus::derive(tx.total, tx.amount_paid);
        tx.updated_at = Some(now);
        payment_status = tx.payment_status;
    }

    Ok(PaymentOutcome {
        transaction_id: transaction_id.to_string(),
        payment_status,
        movement_id,
    })
}

// =============================================================================
// Purchases and Drawer
// =============================================================================

/// Marks a purchase as received and adds its quantities to stock.
pub fn receive_purchase(
    dataset: &mut Dataset,
    purchase_id: &str,
) -> CoreResult<()> {
    let purchase = dataset
        .find::<Purchase>(purchase_id)
        .ok_or_else(|| CoreError::EntityNotFound {
            collection: "purchases",
            id: purchase_id.to_string(),
        })?;
    if purchase.received {
        return Err(CoreError::PurchaseAlreadyReceived(purchase_id.to_string()));
    }

    let items: Vec<LineItem> = purchase
        .items
        .iter()
        .map(|i| LineItem::new(i.product_id.clone(), i.quantity, i.unit_cost))
        .collect();
    adjust_stock(dataset, &items, 1);

    if let Some(purchase) = dataset.find_mut::<Purchase>(purchase_id) {
        purchase.received = true;
    }
    Ok(())
}

/// Balance of one drawer channel: OPEN + DEPOSIT − EXPENSE − WITHDRAWAL.
pub fn drawer_balance(movements: &[CashMovement], channel: CashChannel) -> Money {
    movements
        .iter()
        .filter(|m| m.channel == channel)
        .map(CashMovement::signed_amount)
        .sum()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    fn dataset_with_stock() -> Dataset {
        let mut ds = Dataset::new();
        ds.upsert(Product::new("Cola", Money::from_cents(2_500), 10, now()));
        ds.upsert(Product::new("Chips", Money::from_cents(5_000), 5, now()));
        ds
    }

    fn add_customer(ds: &mut Dataset, limit: i64) -> String {
        ds.upsert(Customer::new("Carla", Money::from_cents(limit), now()))
    }

    /// 2 × Cola (25.00) + 1 × Chips (50.00) = 100.00
    fn sale(method: PaymentMethod, paid: i64) -> Transaction {
        let mut tx = Transaction::from_items(
            vec![
                LineItem::new("1", 2, Money::from_cents(2_500)),
                LineItem::new("2", 1, Money::from_cents(5_000)),
            ],
            now(),
        );
        tx.payment_method = method;
        tx.amount_paid = Money::from_cents(paid);
        tx.normalize();
        tx
    }

    fn stock(ds: &Dataset, id: &str) -> i64 {
        ds.find::<Product>(id).map(|p| p.stock).unwrap()
    }

    fn debt(ds: &Dataset, id: &str) -> Money {
        ds.find::<Customer>(id).map(|c| c.current_debt).unwrap()
    }

    #[test]
    fn test_cash_sale_creates_one_deposit_and_cancel_removes_it() {
        let mut ds = dataset_with_stock();
        let out = record_sale(&mut ds, sale(PaymentMethod::Cash, 10_000), CashAffect::Auto, now()).unwrap();

        assert_eq!(out.transaction_id, "1");
        let deposits: Vec<_> = ds
            .cash_movements
            .iter()
            .filter(|m| m.movement_type == MovementType::Deposit)
            .collect();
        assert_eq!(deposits.len(), 1);
        assert_eq!(deposits[0].id, "mv_1");
        assert_eq!(deposits[0].amount.cents(), 10_000);
        assert_eq!(deposits[0].category, MovementCategory::Sales);
        assert_eq!(stock(&ds, "1"), 8);
        assert_eq!(stock(&ds, "2"), 4);

        let items = ds.transactions[0].items.clone();
        let rev = reverse_sale(&mut ds, "1", &items, now()).unwrap();
        assert!(rev.movement_removed);
        assert!(ds.cash_movements.is_empty());
        assert_eq!(stock(&ds, "1"), 10);
        assert_eq!(stock(&ds, "2"), 5);

        let tx = &ds.transactions[0];
        assert_eq!(tx.status, TransactionStatus::Cancelled);
        assert_eq!(tx.amount_paid, Money::zero());
        assert_eq!(tx.payment_status, PaymentStatus::Pending);
    }

    #[test]
    fn test_oversized_amounts_are_rejected_untouched() {
        let mut ds = dataset_with_stock();
        let before = ds.clone();

        let mut tx = sale(PaymentMethod::Cash, 10_000);
        tx.tax = Money::from_cents(i64::MAX);
        let err = record_sale(&mut ds, tx, CashAffect::Auto, now()).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));

        let mut tx = sale(PaymentMethod::Cash, 0);
        tx.items[0].unit_price = Money::from_cents(i64::MAX / 2);
        assert!(record_sale(&mut ds, tx, CashAffect::Auto, now()).is_err());
        assert_eq!(ds, before);

        record_sale(&mut ds, sale(PaymentMethod::Credit, 0), CashAffect::Auto, now()).unwrap();
        let err = register_payment(&mut ds, "1", Money::from_cents(i64::MAX), PaymentMethod::Cash, now())
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert!(ds.cash_movements.is_empty());
    }

    #[test]
    fn test_sale_reports_products_at_minimum_stock() {
        let mut ds = dataset_with_stock();
        if let Some(cola) = ds.find_mut::<Product>("1") {
            cola.min_stock = 8;
        }

        let out = record_sale(&mut ds, sale(PaymentMethod::Cash, 10_000), CashAffect::Auto, now()).unwrap();
        assert_eq!(out.low_stock, vec!["1".to_string()]);

        let mut returned = sale(PaymentMethod::Cash, 10_000);
        returned.is_return = true;
        let out = record_sale(&mut ds, returned, CashAffect::Auto, now()).unwrap();
        assert!(out.low_stock.is_empty());
    }

    #[test]
    fn test_split_sale_deposits_only_cash_part() {
        let mut ds = dataset_with_stock();
        let mut tx = sale(PaymentMethod::Split, 10_000);
        tx.split_parts = vec![
            PaymentPart { method: PaymentMethod::Cash, amount: Money::from_cents(4_000) },
            PaymentPart { method: PaymentMethod::Card, amount: Money::from_cents(6_000) },
        ];
        let out = record_sale(&mut ds, tx, CashAffect::Auto, now()).unwrap();

        assert_eq!(out.cash_amount.cents(), 4_000);
        assert_eq!(ds.cash_movements.len(), 1);
        assert_eq!(ds.cash_movements[0].amount.cents(), 4_000);
    }

    #[test]
    fn test_non_cash_methods_never_hit_the_drawer() {
        for method in [PaymentMethod::Card, PaymentMethod::Transfer, PaymentMethod::Credit] {
            let mut ds = dataset_with_stock();
            record_sale(&mut ds, sale(method, 10_000), CashAffect::Always, now()).unwrap();
            assert!(
                ds.cash_movements.iter().all(|m| m.amount.cents() != 10_000),
                "{method:?} created a drawer movement"
            );
        }
    }

    #[test]
    fn test_auto_policy_skips_unpaid_old_and_returns() {
        let mut ds = dataset_with_stock();

        let partial = sale(PaymentMethod::Cash, 5_000);
        record_sale(&mut ds, partial, CashAffect::Auto, now()).unwrap();
        assert!(ds.cash_movements.is_empty());

        let mut old = sale(PaymentMethod::Cash, 10_000);
        old.created_at = now() - Duration::days(3);
        record_sale(&mut ds, old.clone(), CashAffect::Auto, now()).unwrap();
        assert!(ds.cash_movements.is_empty());

        let mut returned = sale(PaymentMethod::Cash, 10_000);
        returned.is_return = true;
        record_sale(&mut ds, returned, CashAffect::Always, now()).unwrap();
        assert!(ds.cash_movements.is_empty());

        // The override bypasses the paid/today heuristic.
        record_sale(&mut ds, old, CashAffect::Always, now()).unwrap();
        assert_eq!(ds.cash_movements.len(), 1);
    }

    #[test]
    fn test_never_policy() {
        let mut ds = dataset_with_stock();
        record_sale(&mut ds, sale(PaymentMethod::Cash, 10_000), CashAffect::Never, now()).unwrap();
        assert!(ds.cash_movements.is_empty());
    }

    #[test]
    fn test_credit_sale_then_cash_payment() {
        let mut ds = dataset_with_stock();
        let customer = add_customer(&mut ds, 50_000);

        let mut tx = Transaction::from_items(vec![LineItem::new("1", 8, Money::from_cents(2_500))], now());
        tx.payment_method = PaymentMethod::Credit;
        tx.customer_id = Some(customer.clone());
        let out = record_sale(&mut ds, tx, CashAffect::Auto, now()).unwrap();

        assert_eq!(out.debt_delta.cents(), 20_000);
        assert_eq!(debt(&ds, &customer).cents(), 20_000);
        assert!(ds.cash_movements.is_empty());

        let pay = register_payment(
            &mut ds,
            &out.transaction_id,
            Money::from_cents(15_000),
            PaymentMethod::Cash,
            now(),
        )
        .unwrap();

        assert_eq!(debt(&ds, &customer).cents(), 5_000);
        assert_eq!(pay.payment_status, PaymentStatus::Partial);
        let movement_id = pay.movement_id.unwrap();
        assert_ne!(movement_id, sale_movement_id(&out.transaction_id));
        let mv = ds.find::<CashMovement>(&movement_id).unwrap();
        assert_eq!(mv.amount.cents(), 15_000);
        assert_eq!(mv.category, MovementCategory::Payment);
    }

    #[test]
    fn test_overpayment_never_drives_debt_negative() {
        let mut ds = dataset_with_stock();
        let customer = add_customer(&mut ds, 50_000);
        let mut tx = sale(PaymentMethod::Credit, 0);
        tx.customer_id = Some(customer.clone());
        let out = record_sale(&mut ds, tx, CashAffect::Auto, now()).unwrap();

        let pay = register_payment(
            &mut ds,
            &out.transaction_id,
            Money::from_cents(25_000),
            PaymentMethod::Card,
            now(),
        )
        .unwrap();

        assert_eq!(debt(&ds, &customer), Money::zero());
        assert_eq!(pay.payment_status, PaymentStatus::Paid);
        assert!(pay.movement_id.is_none());
        assert_eq!(ds.transactions[0].amount_paid.cents(), 10_000);
    }

    #[test]
    fn test_reversal_restores_debt_and_drawer_for_every_method() {
        let methods = [
            PaymentMethod::Cash,
            PaymentMethod::Card,
            PaymentMethod::Transfer,
            PaymentMethod::Split,
            PaymentMethod::Credit,
        ];
        for method in methods {
            for paid in [0, 4_000, 10_000] {
                let mut ds = dataset_with_stock();
                let customer = add_customer(&mut ds, 100_000);
                ds.find_mut::<Customer>(&customer).unwrap().current_debt = Money::from_cents(1_234);
                ds.cash_movements.push(CashMovement {
                    id: "1".into(),
                    movement_type: MovementType::Open,
                    amount: Money::from_cents(5_000),
                    channel: CashChannel::Physical,
                    category: MovementCategory::Other,
                    transaction_id: None,
                    description: None,
                    user_id: None,
                    created_at: now(),
                });
                let debt_before = debt(&ds, &customer);
                let drawer_before = drawer_balance(&ds.cash_movements, CashChannel::Physical);

                let mut tx = sale(method, paid);
                tx.customer_id = Some(customer.clone());
                tx.split_parts = vec![PaymentPart {
                    method: PaymentMethod::Cash,
                    amount: Money::from_cents(paid / 2),
                }];
                let items = tx.items.clone();
                let out = record_sale(&mut ds, tx, CashAffect::Always, now()).unwrap();
                reverse_sale(&mut ds, &out.transaction_id, &items, now()).unwrap();

                assert_eq!(debt(&ds, &customer), debt_before, "{method:?} paid {paid}");
                assert_eq!(
                    drawer_balance(&ds.cash_movements, CashChannel::Physical),
                    drawer_before,
                    "{method:?} paid {paid}"
                );
            }
        }
    }

    #[test]
    fn test_reversal_uses_recorded_delta_after_partial_payment() {
        let mut ds = dataset_with_stock();
        let customer = add_customer(&mut ds, 50_000);
        let mut tx = sale(PaymentMethod::Credit, 0);
        tx.customer_id = Some(customer.clone());
        let out = record_sale(&mut ds, tx, CashAffect::Auto, now()).unwrap();

        register_payment(&mut ds, &out.transaction_id, Money::from_cents(3_000), PaymentMethod::Card, now()).unwrap();
        assert_eq!(debt(&ds, &customer).cents(), 7_000);

        let rev = reverse_sale(&mut ds, &out.transaction_id, &[], now()).unwrap();
        assert_eq!(rev.debt_released.cents(), 7_000);
        assert_eq!(debt(&ds, &customer), Money::zero());
    }

    #[test]
    fn test_double_reversal_and_payment_on_cancelled_are_rejected() {
        let mut ds = dataset_with_stock();
        let out = record_sale(&mut ds, sale(PaymentMethod::Cash, 10_000), CashAffect::Auto, now()).unwrap();
        let items = ds.transactions[0].items.clone();
        reverse_sale(&mut ds, &out.transaction_id, &items, now()).unwrap();
        let stock_after = stock(&ds, "1");

        let err = reverse_sale(&mut ds, &out.transaction_id, &items, now()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidSaleStatus { .. }));
        assert_eq!(stock(&ds, "1"), stock_after);

        let err = register_payment(&mut ds, &out.transaction_id, Money::from_cents(100), PaymentMethod::Cash, now())
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidSaleStatus { .. }));
    }

    #[test]
    fn test_credit_limit_rejection_leaves_dataset_untouched() {
        let mut ds = dataset_with_stock();
        let customer = add_customer(&mut ds, 5_000);
        let mut tx = sale(PaymentMethod::Credit, 0);
        tx.customer_id = Some(customer.clone());
        let before = ds.clone();

        let err = record_sale(&mut ds, tx, CashAffect::Auto, now()).unwrap_err();
        assert!(matches!(err, CoreError::CreditLimitExceeded { .. }));
        assert_eq!(ds, before);
    }

    #[test]
    fn test_unlimited_credit_and_unknown_customer() {
        let mut ds = dataset_with_stock();
        let customer = add_customer(&mut ds, 0);
        ds.find_mut::<Customer>(&customer).unwrap().unlimited_credit = true;

        let mut tx = sale(PaymentMethod::Credit, 0);
        tx.customer_id = Some(customer.clone());
        record_sale(&mut ds, tx, CashAffect::Auto, now()).unwrap();
        assert_eq!(debt(&ds, &customer).cents(), 10_000);

        let mut tx = sale(PaymentMethod::Cash, 10_000);
        tx.customer_id = Some("404".into());
        let err = record_sale(&mut ds, tx, CashAffect::Auto, now()).unwrap_err();
        assert!(matches!(err, CoreError::CustomerNotFound(_)));
    }

    #[test]
    fn test_invalid_payment_amount() {
        let mut ds = dataset_with_stock();
        let out = record_sale(&mut ds, sale(PaymentMethod::Cash, 0), CashAffect::Auto, now()).unwrap();
        let err = register_payment(&mut ds, &out.transaction_id, Money::zero(), PaymentMethod::Cash, now())
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidPaymentAmount { .. }));
    }

    #[test]
    fn test_receive_purchase_adds_stock_once() {
        let mut ds = dataset_with_stock();
        let id = ds.upsert(Purchase {
            id: String::new(),
            supplier_id: None,
            items: vec![PurchaseItem {
                product_id: "2".into(),
                name: "Chips".into(),
                quantity: 12,
                unit_cost: Money::from_cents(3_000),
            }],
            total: Money::from_cents(36_000),
            received: false,
            created_at: now(),
        });

        receive_purchase(&mut ds, &id).unwrap();
        assert_eq!(stock(&ds, "2"), 17);
        assert!(matches!(
            receive_purchase(&mut ds, &id),
            Err(CoreError::PurchaseAlreadyReceived(_))
        ));
        assert_eq!(stock(&ds, "2"), 17);
    }

    #[test]
    fn test_drawer_balance_ignores_close_and_other_channel() {
        let mk = |t: MovementType, cents: i64, channel: CashChannel| CashMovement {
            id: String::new(),
            movement_type: t,
            amount: Money::from_cents(cents),
            channel,
            category: MovementCategory::Other,
            transaction_id: None,
            description: None,
            user_id: None,
            created_at: now(),
        };
        let movements = vec![
            mk(MovementType::Open, 10_000, CashChannel::Physical),
            mk(MovementType::Deposit, 2_500, CashChannel::Physical),
            mk(MovementType::Expense, 1_000, CashChannel::Physical),
            mk(MovementType::Withdrawal, 500, CashChannel::Physical),
            mk(MovementType::Close, 11_000, CashChannel::Physical),
            mk(MovementType::Deposit, 9_999, CashChannel::Virtual),
        ];
        assert_eq!(drawer_balance(&movements, CashChannel::Physical).cents(), 11_000);
        assert_eq!(drawer_balance(&movements, CashChannel::Virtual).cents(), 9_999);
    }
}

//! Expense-to-bank-transaction matching.
//!
//! Each expense resolves to `exact`, `likely` or `no_match` against a
//! per-request pool of transactions. An exact match claims its transaction:
//! "matched" is a one-time claim, first expense first served in processing
//! order. Claims are tracked in an explicit order-preserving id set; fetched
//! transaction records are never mutated.
//!
//! A likely match deliberately does NOT claim: overlapping expenses can be
//! offered the same candidate transaction. Reconciliation reports depend on
//! that behavior.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use super::bank_feed::BankTransaction;
use crate::models::enums::MatchConfidence;
use crate::models::Expense;

/// Exact tier: within this many days of the expense date.
const EXACT_WINDOW_DAYS: i64 = 2;

/// Exact tier: amount delta strictly below this.
const EXACT_AMOUNT_TOLERANCE: f64 = 0.01;

/// Likely tier: within this many days.
const LIKELY_WINDOW_DAYS: i64 = 3;

/// Likely tier: amount delta strictly below this.
const LIKELY_AMOUNT_TOLERANCE: f64 = 1.0;

/// One row of the reconciliation view, in expense order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationItem {
    pub expense: Expense,
    pub matching_transaction: Option<BankTransaction>,
    pub match_confidence: MatchConfidence,
}

/// Match every expense against the transaction pool. Output order mirrors
/// the input expense order.
pub fn reconcile(expenses: &[Expense], transactions: &[BankTransaction]) -> Vec<ReconciliationItem> {
    let mut claimed: IndexSet<String> = IndexSet::new();

    let items = expenses
        .iter()
        .map(|expense| match_one(expense, transactions, &mut claimed))
        .collect();

    tracing::info!(
        expenses = expenses.len(),
        transactions = transactions.len(),
        claimed = claimed.len(),
        "Reconciliation pass complete"
    );
    items
}

fn match_one(
    expense: &Expense,
    transactions: &[BankTransaction],
    claimed: &mut IndexSet<String>,
) -> ReconciliationItem {
    let mut likely: Option<&BankTransaction> = None;

    for txn in transactions {
        if claimed.contains(&txn.transaction_id) {
            continue;
        }

        if is_exact(expense, txn) {
            claimed.insert(txn.transaction_id.clone());
            return ReconciliationItem {
                expense: expense.clone(),
                matching_transaction: Some(txn.clone()),
                match_confidence: MatchConfidence::Exact,
            };
        }

        if is_likely(expense, txn) {
            // The last qualifying candidate wins.
            likely = Some(txn);
        }
    }

    match likely {
        Some(txn) => ReconciliationItem {
            expense: expense.clone(),
            matching_transaction: Some(txn.clone()),
            match_confidence: MatchConfidence::Likely,
        },
        None => ReconciliationItem {
            expense: expense.clone(),
            matching_transaction: None,
            match_confidence: MatchConfidence::NoMatch,
        },
    }
}

fn days_apart(expense: &Expense, txn: &BankTransaction) -> i64 {
    (txn.date - expense.date).num_days().abs()
}

fn is_exact(expense: &Expense, txn: &BankTransaction) -> bool {
    days_apart(expense, txn) <= EXACT_WINDOW_DAYS
        && (txn.amount - expense.amount).abs() < EXACT_AMOUNT_TOLERANCE
        && txn.currency == expense.currency
}

fn is_likely(expense: &Expense, txn: &BankTransaction) -> bool {
    days_apart(expense, txn) <= LIKELY_WINDOW_DAYS
        && (txn.amount - expense.amount).abs() < LIKELY_AMOUNT_TOLERANCE
        && txn.currency == expense.currency
}

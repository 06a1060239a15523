//! Bank transaction feed.
//!
//! The matcher treats the feed as an opaque source: `BankFeed` is the seam
//! where a real banking integration plugs in. The shipped implementation
//! synthesizes plausible transactions from the expense set for
//! demonstration and testing.

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::models::enums::Currency;
use crate::models::Expense;

/// A transaction as the bank reports it. Opaque to the matcher regardless
/// of where it came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankTransaction {
    pub transaction_id: String,
    pub date: NaiveDate,
    pub description: String,
    pub amount: f64,
    pub currency: Currency,
}

/// Source of bank transactions for a reconciliation pass.
pub trait BankFeed: Send + Sync {
    fn transactions_for(&self, expenses: &[Expense]) -> Vec<BankTransaction>;
}

/// Probability that an expense has a corresponding bank transaction.
const MATCH_PROBABILITY: f64 = 0.7;

/// Probability that a generated transaction's amount drifts from the expense.
const VARIANCE_PROBABILITY: f64 = 0.3;

/// Count of extra transactions with no corresponding expense.
const UNMATCHED_COUNT: usize = 3;

/// Demonstration feed: generates transactions that mostly line up with the
/// expense set, with realistic date and amount drift plus a few strays.
pub struct MockBankFeed {
    seed: Option<u64>,
}

impl MockBankFeed {
    pub fn new() -> Self {
        Self { seed: None }
    }

    /// Deterministic feed for tests.
    pub fn seeded(seed: u64) -> Self {
        Self { seed: Some(seed) }
    }

    fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

impl Default for MockBankFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl BankFeed for MockBankFeed {
    fn transactions_for(&self, expenses: &[Expense]) -> Vec<BankTransaction> {
        let mut rng = self.rng();
        let mut transactions = Vec::new();

        for expense in expenses {
            if rng.gen_range(0.0..1.0) >= MATCH_PROBABILITY {
                continue;
            }

            let days_offset = *[-2i64, -1, 0, 1, 2].choose(&mut rng).unwrap_or(&0);
            let date = expense.date + chrono::Duration::days(days_offset);

            let variance = if rng.gen_range(0.0..1.0) < VARIANCE_PROBABILITY {
                rng.gen_range(-0.5..0.5)
            } else {
                0.0
            };

            let description: String = expense.description.chars().take(50).collect();
            transactions.push(BankTransaction {
                transaction_id: format!("TXN-{}-{}", expense.id, transactions.len() + 1),
                date,
                description,
                amount: ((expense.amount + variance) * 100.0).round() / 100.0,
                currency: expense.currency,
            });
        }

        let anchor = expenses
            .first()
            .map(|e| e.date)
            .unwrap_or_else(|| chrono::Utc::now().date_naive());
        for i in 0..UNMATCHED_COUNT {
            let currency = if rng.gen_range(0.0..1.0) < 0.5 {
                Currency::Usd
            } else {
                Currency::Mxn
            };
            transactions.push(BankTransaction {
                transaction_id: format!("TXN-UNMATCHED-{i}"),
                date: anchor - chrono::Duration::days(i as i64),
                description: format!("Unmatched Transaction {}", i + 1),
                amount: (rng.gen_range(10.0_f64..200.0) * 100.0).round() / 100.0,
                currency,
            });
        }

        transactions.sort_by(|a, b| b.date.cmp(&a.date));
        transactions
    }
}

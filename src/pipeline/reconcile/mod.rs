pub mod bank_feed;
pub mod matcher;

pub use bank_feed::{BankFeed, BankTransaction, MockBankFeed};
pub use matcher::{reconcile, ReconciliationItem};

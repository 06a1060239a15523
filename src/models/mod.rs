pub mod company;
pub mod customs;
pub mod enums;
pub mod expense;
pub mod invoice;

pub use company::{Company, CompanyPatch, NewCompany};
pub use customs::{CustomsLog, CustomsLogPatch, NewCustomsLog};
pub use enums::*;
pub use expense::{Expense, ExpensePatch, NewExpense};
pub use invoice::{Invoice, InvoicePatch, NewInvoice};

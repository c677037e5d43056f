//! Contract and transaction records, and their file loaders

mod data;
pub mod loader;

pub use data::{
    Capitalization, Category, InterestRegime, LoanBook, LoanContract, RatePeriod, Transaction,
    TransactionKind,
};
pub use loader::{load_contract, load_manifest, load_transactions, load_transactions_from_reader};

//! Load contracts, transaction histories and portfolio manifests from files

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use csv::Reader;
use log::debug;
use serde::Deserialize;

use super::{LoanBook, LoanContract, Transaction, TransactionKind};
use crate::error::LoadError;

/// Raw CSV row: `date,kind,principal,interest,manual_rate`
#[derive(Debug, Deserialize)]
struct CsvRow {
    date: String,
    kind: String,
    principal: f64,
    #[serde(default)]
    interest: Option<f64>,
    #[serde(default)]
    manual_rate: Option<f64>,
}

impl CsvRow {
    fn to_transaction(self) -> Result<Transaction, LoadError> {
        let kind = match self.kind.trim().to_ascii_lowercase().as_str() {
            "addition" => TransactionKind::Addition,
            "payment" => TransactionKind::Payment,
            _ => {
                return Err(LoadError::UnknownValue {
                    field: "transaction kind",
                    value: self.kind,
                })
            }
        };

        Ok(Transaction {
            date: self.date,
            kind,
            principal: self.principal,
            interest: self.interest.unwrap_or(0.0),
            manual_rate: self.manual_rate,
        })
    }
}

/// Load a transaction history from a CSV file
pub fn load_transactions<P: AsRef<Path>>(path: P) -> Result<Vec<Transaction>, LoadError> {
    let file = File::open(path.as_ref())?;
    let transactions = load_transactions_from_reader(file)?;
    debug!("loaded {} transactions from {}", transactions.len(), path.as_ref().display());
    Ok(transactions)
}

/// Load a transaction history from any reader
pub fn load_transactions_from_reader<R: std::io::Read>(reader: R) -> Result<Vec<Transaction>, LoadError> {
    let mut csv_reader = Reader::from_reader(reader);
    let mut transactions = Vec::new();

    for result in csv_reader.deserialize() {
        let row: CsvRow = result?;
        transactions.push(row.to_transaction()?);
    }

    Ok(transactions)
}

/// Load a single contract from a JSON file
pub fn load_contract<P: AsRef<Path>>(path: P) -> Result<LoanContract, LoadError> {
    let file = File::open(path.as_ref())?;
    let contract: LoanContract = serde_json::from_reader(BufReader::new(file))?;
    debug!("loaded contract {} from {}", contract.id, path.as_ref().display());
    Ok(contract)
}

/// One manifest entry; the transaction path is relative to the manifest file
#[derive(Debug, Deserialize)]
struct ManifestEntry {
    contract: LoanContract,
    #[serde(default)]
    transactions: Option<PathBuf>,
}

/// Load a portfolio manifest: a JSON array of contracts with transaction CSV paths
pub fn load_manifest<P: AsRef<Path>>(path: P) -> Result<Vec<LoanBook>, LoadError> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let entries: Vec<ManifestEntry> = serde_json::from_reader(BufReader::new(file))?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));

    let mut books = Vec::with_capacity(entries.len());
    for entry in entries {
        let transactions = match entry.transactions {
            Some(tx_path) => load_transactions(base_dir.join(tx_path))?,
            None => Vec::new(),
        };
        books.push(LoanBook::new(entry.contract, transactions));
    }

    debug!("loaded {} loans from manifest {}", books.len(), path.display());
    Ok(books)
}

// 📊 Transaction Data Fetcher - one entry point per query
// Every call loads the full record set, runs one query, logs the answer.
// Load failures are logged and returned, never turned into a default value.

use crate::config::Config;
use crate::queries;
use crate::report::InsightReport;
use crate::source::{CachedSource, JsonFileSource, LoadError, RecordSource};
use crate::transaction::Transaction;
use log::{error, info};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

pub struct TransactionDataFetcher<S: RecordSource> {
    source: S,
}

impl TransactionDataFetcher<JsonFileSource> {
    /// Fetcher over a JSON file, re-read on every query
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        TransactionDataFetcher::new(JsonFileSource::new(path))
    }
}

impl TransactionDataFetcher<Box<dyn RecordSource>> {
    /// JSON file from the config, cached when `cache_records` is set
    pub fn from_config(config: &Config) -> Self {
        let file = JsonFileSource::new(&config.transactions_file);
        let source: Box<dyn RecordSource> = if config.cache_records {
            Box::new(CachedSource::new(file))
        } else {
            Box::new(file)
        };
        TransactionDataFetcher::new(source)
    }
}

impl<S: RecordSource> TransactionDataFetcher<S> {
    pub fn new(source: S) -> Self {
        TransactionDataFetcher { source }
    }

    /// Same queries, but the records are loaded once and reused
    pub fn with_cache(self) -> TransactionDataFetcher<CachedSource<S>> {
        TransactionDataFetcher::new(CachedSource::new(self.source))
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Full record set, in source order
    pub fn transactions(&self) -> Result<Vec<Transaction>, LoadError> {
        self.source.load().map_err(|e| {
            error!("Failed to load transactions from {}: {}", self.source.describe(), e);
            e
        })
    }

    // ========================================================================
    // AMOUNTS
    // ========================================================================

    /// Sum of the amounts of all clean transactions
    pub fn total_transaction_amount(&self) -> Result<f64, LoadError> {
        let total = queries::total_amount(&self.transactions()?);
        info!("Total transaction amount is {:.2}", total);
        Ok(total)
    }

    /// Sum of the amounts of all clean transactions sent by a client
    pub fn total_transaction_amount_sent_by(&self, sender_full_name: &str) -> Result<f64, LoadError> {
        let total = queries::total_amount_sent_by(&self.transactions()?, sender_full_name);
        info!("Total amount {:.2} sent by {}", total, sender_full_name);
        Ok(total)
    }

    /// Highest clean transaction amount
    pub fn max_transaction_amount(&self) -> Result<f64, LoadError> {
        let max = queries::max_amount(&self.transactions()?);
        info!("Highest transaction amount is {:.2}", max);
        Ok(max)
    }

    // ========================================================================
    // CLIENTS & COMPLIANCE
    // ========================================================================

    /// Number of distinct clients that sent or received a transaction
    pub fn count_unique_clients(&self) -> Result<usize, LoadError> {
        let count = queries::count_unique_clients(&self.transactions()?);
        info!("Unique clients: {}", count);
        Ok(count)
    }

    /// Whether a client (sender or beneficiary) has at least one unsolved issue
    pub fn has_open_compliance_issues(&self, client_full_name: &str) -> Result<bool, LoadError> {
        let open = queries::has_open_compliance_issue(&self.transactions()?, client_full_name);
        if open {
            info!("Client {} has an open compliance issue", client_full_name);
        } else {
            info!("Client {} has no open compliance issue", client_full_name);
        }
        Ok(open)
    }

    /// Clean transactions indexed by beneficiary name
    pub fn transactions_by_beneficiary_name(&self) -> Result<BTreeMap<String, Transaction>, LoadError> {
        let index = queries::transactions_by_beneficiary_name(&self.transactions()?);
        info!("Transactions indexed by {} beneficiary names", index.len());
        Ok(index)
    }

    /// Identifiers of all open compliance issues
    pub fn unsolved_issue_ids(&self) -> Result<BTreeSet<i64>, LoadError> {
        let ids = queries::unsolved_issue_ids(&self.transactions()?);
        info!("Open compliance issues: {}", ids.len());
        Ok(ids)
    }

    /// Messages of all solved issues, in source order
    pub fn all_solved_issue_messages(&self) -> Result<Vec<String>, LoadError> {
        let messages = queries::solved_issue_messages(&self.transactions()?);
        info!("Solved issue messages: {}", messages.len());
        Ok(messages)
    }

    // ========================================================================
    // RANKINGS
    // ========================================================================

    /// The 3 clean transactions with the highest amount, descending
    pub fn top3_transactions_by_amount(&self) -> Result<Vec<Transaction>, LoadError> {
        self.top_transactions_by_amount(3)
    }

    pub fn top_transactions_by_amount(&self, n: usize) -> Result<Vec<Transaction>, LoadError> {
        let top = queries::top_transactions_by_amount(&self.transactions()?, n);
        info!("Top {} transactions by amount: {} returned", n, top.len());
        Ok(top)
    }

    /// Sender of the largest clean transaction
    pub fn top_sender(&self) -> Result<Option<String>, LoadError> {
        let sender = queries::top_sender(&self.transactions()?);
        match &sender {
            Some(name) => info!("Top sender is {}", name),
            None => info!("No clean transactions, no top sender"),
        }
        Ok(sender)
    }

    /// Sender with the greatest total clean amount sent
    pub fn top_sender_by_total_sent(&self) -> Result<Option<String>, LoadError> {
        let sender = queries::top_sender_by_total_sent(&self.transactions()?);
        match &sender {
            Some(name) => info!("Top sender by total sent is {}", name),
            None => info!("No clean transactions, no top sender by total"),
        }
        Ok(sender)
    }

    // ========================================================================
    // REPORT
    // ========================================================================

    /// Every query over a single load
    pub fn report(&self, top_n: usize) -> Result<InsightReport, LoadError> {
        let transactions = self.transactions()?;
        let source_digest = self.source.digest()?;
        let report = InsightReport::build(&transactions, top_n, self.source.describe())
            .with_source_digest(source_digest);
        info!("{}", report.summary());
        Ok(report)
    }
}

// 📋 Insight Report - every query answered from a single load
// Used by the CLI `report` command and the API `/api/report` endpoint.

use crate::queries;
use crate::source::records_digest;
use crate::transaction::Transaction;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;

/// Column order for CSV listings (same names as the JSON input)
pub const CSV_HEADER: [&str; 9] = [
    "mtn",
    "amount",
    "senderFullName",
    "senderAge",
    "beneficiaryFullName",
    "beneficiaryAge",
    "issueId",
    "issueSolved",
    "issueMessage",
];

// ============================================================================
// REPORT
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightReport {
    pub generated_at: DateTime<Utc>,
    pub source: String,
    /// SHA-256 of the loaded records; equal digests = same data
    pub digest: String,
    /// SHA-256 of the raw source bytes, when the source has any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_digest: Option<String>,

    pub record_count: usize,
    pub clean_count: usize,

    pub total_amount: f64,
    pub max_amount: f64,
    pub unique_clients: usize,
    pub beneficiary_count: usize,

    pub unsolved_issue_ids: BTreeSet<i64>,
    pub solved_issue_messages: Vec<String>,
    /// Clients with at least one open issue
    pub flagged_clients: BTreeSet<String>,

    pub top_transactions: Vec<Transaction>,
    pub top_sender: Option<String>,
    pub top_sender_by_total: Option<String>,
    pub totals_by_sender: BTreeMap<String, f64>,
}

impl InsightReport {
    pub fn build(transactions: &[Transaction], top_n: usize, source: String) -> Self {
        let flagged_clients = transactions
            .iter()
            .filter(|tx| tx.has_open_issue())
            .flat_map(|tx| [tx.sender_full_name.clone(), tx.beneficiary_full_name.clone()])
            .collect();

        InsightReport {
            generated_at: Utc::now(),
            source,
            digest: records_digest(transactions),
            source_digest: None,
            record_count: transactions.len(),
            clean_count: queries::clean_transactions(transactions).count(),
            total_amount: queries::total_amount(transactions),
            max_amount: queries::max_amount(transactions),
            unique_clients: queries::count_unique_clients(transactions),
            beneficiary_count: queries::transactions_by_beneficiary_name(transactions).len(),
            unsolved_issue_ids: queries::unsolved_issue_ids(transactions),
            solved_issue_messages: queries::solved_issue_messages(transactions),
            flagged_clients,
            top_transactions: queries::top_transactions_by_amount(transactions, top_n),
            top_sender: queries::top_sender(transactions),
            top_sender_by_total: queries::top_sender_by_total_sent(transactions),
            totals_by_sender: queries::totals_by_sender(transactions),
        }
    }

    /// Builder pattern: attach the raw source digest
    pub fn with_source_digest(mut self, source_digest: Option<String>) -> Self {
        self.source_digest = source_digest;
        self
    }

    /// One-line summary for logs
    pub fn summary(&self) -> String {
        format!(
            "Records: {} ({} clean), Total: {:.2}, Max: {:.2}, Clients: {}, Open issues: {}",
            self.record_count,
            self.clean_count,
            self.total_amount,
            self.max_amount,
            self.unique_clients,
            self.unsolved_issue_ids.len()
        )
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Multi-line human-readable rendering
    pub fn render_text(&self) -> String {
        let mut out = String::new();

        out.push_str(&format!("Source:            {}\n", self.source));
        out.push_str(&format!("Digest:            {}\n", self.digest));
        if let Some(source_digest) = &self.source_digest {
            out.push_str(&format!("Source digest:     {}\n", source_digest));
        }
        out.push_str(&format!("Generated at:      {}\n", self.generated_at.to_rfc3339()));
        out.push_str(&format!("Records:           {} ({} clean)\n", self.record_count, self.clean_count));
        out.push_str(&format!("Total amount:      {:.2}\n", self.total_amount));
        out.push_str(&format!("Max amount:        {:.2}\n", self.max_amount));
        out.push_str(&format!("Unique clients:    {}\n", self.unique_clients));
        out.push_str(&format!("Beneficiaries:     {}\n", self.beneficiary_count));
        out.push_str(&format!(
            "Top sender:        {}\n",
            self.top_sender.as_deref().unwrap_or("-")
        ));
        out.push_str(&format!(
            "Top sender (sum):  {}\n",
            self.top_sender_by_total.as_deref().unwrap_or("-")
        ));

        let ids: Vec<String> = self.unsolved_issue_ids.iter().map(|id| id.to_string()).collect();
        out.push_str(&format!("Unsolved issues:   [{}]\n", ids.join(", ")));

        let flagged: Vec<&str> = self.flagged_clients.iter().map(String::as_str).collect();
        out.push_str(&format!("Flagged clients:   [{}]\n", flagged.join(", ")));

        out.push_str(&format!("\nTop {} transactions:\n", self.top_transactions.len()));
        for (rank, tx) in self.top_transactions.iter().enumerate() {
            out.push_str(&format!(
                "  {}. {:>10.2}  {} → {} (mtn {})\n",
                rank + 1,
                tx.amount,
                tx.sender_full_name,
                tx.beneficiary_full_name,
                tx.mtn
            ));
        }

        out.push_str(&format!("\nSolved issue messages ({}):\n", self.solved_issue_messages.len()));
        for message in &self.solved_issue_messages {
            out.push_str(&format!("  - {}\n", message));
        }

        out
    }
}

// ============================================================================
// CSV EXPORT
// ============================================================================

/// Write transactions as CSV; the header row is always written
pub fn write_transactions_csv<W: Write>(writer: W, transactions: &[Transaction]) -> csv::Result<()> {
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(writer);

    wtr.write_record(CSV_HEADER)?;
    for tx in transactions {
        wtr.serialize(tx)?;
    }
    wtr.flush()?;

    Ok(())
}

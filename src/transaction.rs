// 💸 Transaction - Value record loaded from the transactions file
// Immutable after load; every query reads it, none writes it.

use serde::{Deserialize, Serialize};

// ============================================================================
// CORE TYPE
// ============================================================================

/// Transaction - one money transfer between a sender and a beneficiary
///
/// Field names on the wire are camelCase (`senderFullName`, `issueId`, ...).
/// A compliance issue exists only when `issue_id` is present; `issue_solved`
/// means nothing without it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Money transfer number (transaction reference)
    pub mtn: i64,

    pub amount: f64,

    pub sender_full_name: String,
    pub sender_age: u32,

    pub beneficiary_full_name: String,
    pub beneficiary_age: u32,

    // ========================================================================
    // COMPLIANCE ISSUE (optional annotation)
    // ========================================================================
    /// `null` or missing key = no issue was ever raised.
    /// 0 and negative ids are real ids.
    #[serde(default)]
    pub issue_id: Option<i64>,

    pub issue_solved: bool,

    #[serde(default)]
    pub issue_message: Option<String>,
}

impl Transaction {
    /// Create a transaction without a compliance issue
    pub fn new(
        mtn: i64,
        amount: f64,
        sender_full_name: impl Into<String>,
        sender_age: u32,
        beneficiary_full_name: impl Into<String>,
        beneficiary_age: u32,
    ) -> Self {
        Transaction {
            mtn,
            amount,
            sender_full_name: sender_full_name.into(),
            sender_age,
            beneficiary_full_name: beneficiary_full_name.into(),
            beneficiary_age,
            issue_id: None,
            issue_solved: true,
            issue_message: None,
        }
    }

    /// Builder pattern: attach a compliance issue
    pub fn with_issue(mut self, issue_id: i64, solved: bool, message: impl Into<String>) -> Self {
        self.issue_id = Some(issue_id);
        self.issue_solved = solved;
        self.issue_message = Some(message.into());
        self
    }

    // ========================================================================
    // ISSUE RULES
    // ========================================================================

    /// Clean = no issue at all, or the issue was solved.
    ///
    /// Every issue-aware aggregation filters through this one rule.
    pub fn is_clean(&self) -> bool {
        self.issue_id.is_none() || self.issue_solved
    }

    /// Issue raised and still unsolved
    pub fn has_open_issue(&self) -> bool {
        self.issue_id.is_some() && !self.issue_solved
    }

    /// Issue raised and marked solved
    pub fn has_solved_issue(&self) -> bool {
        self.issue_id.is_some() && self.issue_solved
    }

    /// Client appears as sender or beneficiary (exact match)
    pub fn involves(&self, client_full_name: &str) -> bool {
        self.sender_full_name == client_full_name || self.beneficiary_full_name == client_full_name
    }
}

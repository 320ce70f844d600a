// 🔎 Query Engine - aggregate queries over a loaded record set
// Pure functions: same input slice, same answer. Nothing here touches I/O.

use crate::transaction::Transaction;
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Records eligible for issue-aware aggregations (see `Transaction::is_clean`)
pub fn clean_transactions(transactions: &[Transaction]) -> impl Iterator<Item = &Transaction> {
    transactions.iter().filter(|tx| tx.is_clean())
}

// ============================================================================
// AMOUNTS
// ============================================================================

/// Sum of clean amounts (0.0 when nothing qualifies)
pub fn total_amount(transactions: &[Transaction]) -> f64 {
    clean_transactions(transactions).map(|tx| tx.amount).sum()
}

/// Sum of clean amounts sent by one client
pub fn total_amount_sent_by(transactions: &[Transaction], sender_full_name: &str) -> f64 {
    clean_transactions(transactions)
        .filter(|tx| tx.sender_full_name == sender_full_name)
        .map(|tx| tx.amount)
        .sum()
}

/// Highest clean amount (0.0 when nothing qualifies)
pub fn max_amount(transactions: &[Transaction]) -> f64 {
    clean_transactions(transactions)
        .map(|tx| tx.amount)
        .reduce(f64::max)
        .unwrap_or(0.0)
}

// ============================================================================
// CLIENTS & COMPLIANCE
// ============================================================================

/// Distinct names across senders and beneficiaries, all records
pub fn count_unique_clients(transactions: &[Transaction]) -> usize {
    transactions
        .iter()
        .flat_map(|tx| [tx.sender_full_name.as_str(), tx.beneficiary_full_name.as_str()])
        .collect::<HashSet<_>>()
        .len()
}

/// True iff at least one record involving the client carries an open issue.
///
/// Looks at every record, clean or not. A client that appears nowhere has
/// no open issue.
pub fn has_open_compliance_issue(transactions: &[Transaction], client_full_name: &str) -> bool {
    transactions
        .iter()
        .filter(|tx| tx.involves(client_full_name))
        .any(Transaction::has_open_issue)
}

/// Clean records keyed by beneficiary; a later record replaces an earlier one
pub fn transactions_by_beneficiary_name(transactions: &[Transaction]) -> BTreeMap<String, Transaction> {
    let mut index = BTreeMap::new();
    for tx in clean_transactions(transactions) {
        index.insert(tx.beneficiary_full_name.clone(), tx.clone());
    }
    index
}

/// Ids of every issue still open
pub fn unsolved_issue_ids(transactions: &[Transaction]) -> BTreeSet<i64> {
    transactions
        .iter()
        .filter(|tx| tx.has_open_issue())
        .filter_map(|tx| tx.issue_id)
        .collect()
}

/// Messages of solved issues, in source order
///
/// A solved issue without a message contributes nothing.
pub fn solved_issue_messages(transactions: &[Transaction]) -> Vec<String> {
    transactions
        .iter()
        .filter(|tx| tx.has_solved_issue())
        .filter_map(|tx| tx.issue_message.clone())
        .collect()
}

// ============================================================================
// RANKINGS
// ============================================================================

/// The `n` largest clean transactions, descending by amount.
/// Equal amounts keep their source order (stable sort).
pub fn top_transactions_by_amount(transactions: &[Transaction], n: usize) -> Vec<Transaction> {
    let mut ranked: Vec<&Transaction> = clean_transactions(transactions).collect();
    ranked.sort_by(|a, b| b.amount.total_cmp(&a.amount));
    ranked.into_iter().take(n).cloned().collect()
}

pub fn top3_transactions_by_amount(transactions: &[Transaction]) -> Vec<Transaction> {
    top_transactions_by_amount(transactions, 3)
}

/// Sender of the largest clean transaction (first one wins a tie)
pub fn top_sender(transactions: &[Transaction]) -> Option<String> {
    clean_transactions(transactions)
        .fold(None, |best: Option<&Transaction>, tx| match best {
            Some(current) if current.amount >= tx.amount => Some(current),
            _ => Some(tx),
        })
        .map(|tx| tx.sender_full_name.clone())
}

/// Clean amount sent, per sender
pub fn totals_by_sender(transactions: &[Transaction]) -> BTreeMap<String, f64> {
    let mut totals = BTreeMap::new();
    for tx in clean_transactions(transactions) {
        *totals.entry(tx.sender_full_name.clone()).or_insert(0.0) += tx.amount;
    }
    totals
}

/// Sender with the greatest total clean amount sent.
/// Ties go to the alphabetically first name.
pub fn top_sender_by_total_sent(transactions: &[Transaction]) -> Option<String> {
    let mut best: Option<(String, f64)> = None;
    for (sender, total) in totals_by_sender(transactions) {
        match &best {
            Some((_, best_total)) if *best_total >= total => {}
            _ => best = Some((sender, total)),
        }
    }
    best.map(|(sender, _)| sender)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::parse_transactions;
    use proptest::prelude::*;

    const EPSILON: f64 = 1e-9;

    /// Bundled sample: 14 records, 8 clean
    fn fixture() -> Vec<Transaction> {
        parse_transactions(include_str!("../data/transactions.json")).unwrap()
    }

    fn tx(mtn: i64, amount: f64, sender: &str, beneficiary: &str) -> Transaction {
        Transaction::new(mtn, amount, sender, 30, beneficiary, 40)
    }

    // ========================================================================
    // FIXTURE EXPECTATIONS
    // ========================================================================

    #[test]
    fn test_total_amount() {
        assert!((total_amount(&fixture()) - 1485.75).abs() < EPSILON);
    }

    #[test]
    fn test_total_amount_sent_by() {
        let records = fixture();
        assert!((total_amount_sent_by(&records, "Grace Burgess") - 711.0).abs() < EPSILON);
        assert!((total_amount_sent_by(&records, "Tom Shelby") - 247.86).abs() < EPSILON);
        assert!((total_amount_sent_by(&records, "Billy Kimber") - 459.09).abs() < EPSILON);
        assert_eq!(total_amount_sent_by(&records, "Haider"), 0.0);
    }

    #[test]
    fn test_sent_by_ignores_open_issues() {
        // Arthur Shelby only sent 985.0 with an open issue
        assert_eq!(total_amount_sent_by(&fixture(), "Arthur Shelby"), 0.0);
    }

    #[test]
    fn test_max_amount_skips_open_issues() {
        // 985.0 exists but has an open issue
        assert_eq!(max_amount(&fixture()), 666.0);
    }

    #[test]
    fn test_count_unique_clients() {
        assert_eq!(count_unique_clients(&fixture()), 13);
    }

    #[test]
    fn test_has_open_compliance_issue() {
        let records = fixture();
        assert!(has_open_compliance_issue(&records, "Michael Gray"));
        assert!(has_open_compliance_issue(&records, "Arthur Shelby"));
        assert!(has_open_compliance_issue(&records, "Aunt Polly"));
        assert!(!has_open_compliance_issue(&records, "Oswald Mosley"));
        assert!(!has_open_compliance_issue(&records, "Luca Changretta"));
    }

    #[test]
    fn test_has_open_compliance_issue_unknown_client_is_false() {
        assert!(!has_open_compliance_issue(&fixture(), "Haider"));
        assert!(!has_open_compliance_issue(&[], "Haider"));
    }

    #[test]
    fn test_transactions_by_beneficiary_name() {
        let index = transactions_by_beneficiary_name(&fixture());

        assert_eq!(index.len(), 7);
        assert!(index.contains_key("Oswald Mosley"));
        assert!(!index.contains_key("Alfie Solomons"));
        assert!(!index.contains_key("Ben Younger"));
        assert!(!index.contains_key("Haider"));
    }

    #[test]
    fn test_beneficiary_index_keeps_last_entry() {
        let index = transactions_by_beneficiary_name(&fixture());
        assert_eq!(index["Oswald Mosley"].mtn, 1651666);
        assert_eq!(index["Oswald Mosley"].sender_full_name, "Grace Burgess");
    }

    #[test]
    fn test_beneficiary_index_ignores_later_unclean_records() {
        // Three "Michael Gray" rows; only issue 78 (the middle one) is solved
        let index = transactions_by_beneficiary_name(&fixture());
        assert_eq!(index["Michael Gray"].issue_id, Some(78));
        assert!(index["Michael Gray"].is_clean());
    }

    #[test]
    fn test_unsolved_issue_ids() {
        let ids = unsolved_issue_ids(&fixture());
        assert_eq!(ids.into_iter().collect::<Vec<_>>(), vec![1, 3, 15, 32, 54, 99]);
    }

    #[test]
    fn test_solved_issue_messages_in_source_order() {
        let messages = solved_issue_messages(&fixture());
        assert_eq!(
            messages,
            vec![
                "Never gonna give you up",
                "Never gonna let you down",
                "Never gonna run around and desert you",
            ]
        );
        assert!(!messages.contains(&"Something's fishy".to_string()));
    }

    #[test]
    fn test_top3_transactions_by_amount() {
        let top = top3_transactions_by_amount(&fixture());
        let amounts: Vec<f64> = top.iter().map(|tx| tx.amount).collect();
        assert_eq!(amounts, vec![666.0, 215.17, 154.15]);
    }

    #[test]
    fn test_top_sender() {
        assert_eq!(top_sender(&fixture()), Some("Grace Burgess".to_string()));
    }

    #[test]
    fn test_totals_by_sender() {
        let totals = totals_by_sender(&fixture());
        assert_eq!(totals.len(), 4);
        assert!(!totals.contains_key("Arthur Shelby"));
        assert!((totals["Billy Kimber"] - 459.09).abs() < EPSILON);
    }

    #[test]
    fn test_top_sender_by_total_sent() {
        assert_eq!(top_sender_by_total_sent(&fixture()), Some("Grace Burgess".to_string()));
    }

    // ========================================================================
    // EDGE CASES
    // ========================================================================

    #[test]
    fn test_empty_input_defaults() {
        let empty: Vec<Transaction> = Vec::new();

        assert_eq!(total_amount(&empty), 0.0);
        assert_eq!(total_amount_sent_by(&empty, "Tom Shelby"), 0.0);
        assert_eq!(max_amount(&empty), 0.0);
        assert_eq!(count_unique_clients(&empty), 0);
        assert!(transactions_by_beneficiary_name(&empty).is_empty());
        assert!(unsolved_issue_ids(&empty).is_empty());
        assert!(solved_issue_messages(&empty).is_empty());
        assert!(top3_transactions_by_amount(&empty).is_empty());
        assert_eq!(top_sender(&empty), None);
        assert_eq!(top_sender_by_total_sent(&empty), None);
    }

    #[test]
    fn test_only_open_issues_defaults() {
        let records = vec![tx(1, 50.0, "A", "B").with_issue(7, false, "open")];

        assert_eq!(total_amount(&records), 0.0);
        assert_eq!(max_amount(&records), 0.0);
        assert_eq!(top_sender(&records), None);
        assert_eq!(count_unique_clients(&records), 2);
        assert!(has_open_compliance_issue(&records, "B"));
    }

    #[test]
    fn test_top_n_fewer_than_requested() {
        let records = vec![tx(1, 5.0, "A", "B"), tx(2, 9.0, "C", "D")];
        let top = top3_transactions_by_amount(&records);

        assert_eq!(top.len(), 2);
        assert_eq!(top[0].mtn, 2);
        assert_eq!(top[1].mtn, 1);
    }

    #[test]
    fn test_top_n_ties_keep_source_order() {
        let records = vec![
            tx(1, 10.0, "A", "B"),
            tx(2, 20.0, "C", "D"),
            tx(3, 10.0, "E", "F"),
            tx(4, 10.0, "G", "H"),
        ];
        let mtns: Vec<i64> = top3_transactions_by_amount(&records).iter().map(|t| t.mtn).collect();
        assert_eq!(mtns, vec![2, 1, 3]);
    }

    #[test]
    fn test_top_sender_tie_first_wins() {
        let records = vec![tx(1, 10.0, "First", "X"), tx(2, 10.0, "Second", "Y")];
        assert_eq!(top_sender(&records), Some("First".to_string()));
    }

    #[test]
    fn test_top_sender_by_total_tie_alphabetical() {
        let records = vec![tx(1, 10.0, "Zed", "X"), tx(2, 10.0, "Amy", "Y")];
        assert_eq!(top_sender_by_total_sent(&records), Some("Amy".to_string()));
    }

    #[test]
    fn test_open_issue_uses_exists_not_all_solved() {
        // One solved and one open for the same client: exists-open must win
        let records = vec![
            tx(1, 10.0, "A", "B").with_issue(1, true, "solved"),
            tx(2, 10.0, "B", "C").with_issue(2, false, "open"),
        ];
        assert!(has_open_compliance_issue(&records, "B"));
        assert!(!has_open_compliance_issue(&records, "A"));
    }

    #[test]
    fn test_unsolved_flag_without_issue_is_not_open() {
        let mut record = tx(1, 10.0, "A", "B");
        record.issue_solved = false;
        let records = vec![record];

        assert!(!has_open_compliance_issue(&records, "A"));
        assert!(unsolved_issue_ids(&records).is_empty());
        assert_eq!(total_amount(&records), 10.0);
    }

    #[test]
    fn test_scenario_shared_beneficiary_and_single_open_issue() {
        let records = vec![
            tx(1, 100.0, "Tom Shelby", "Oswald Mosley"),
            tx(2, 250.0, "Grace Burgess", "Arthur Shelby"),
            tx(3, 900.0, "Billy Kimber", "Michael Gray").with_issue(54, false, "Something ain't right"),
            tx(4, 40.0, "Aunt Polly", "Oswald Mosley").with_issue(5, true, "Never gonna give you up"),
            tx(5, 75.0, "Tom Shelby", "Ada Thorne"),
            tx(6, 60.0, "John Shelby", "Esme Lee"),
            tx(7, 30.0, "Finn Shelby", "Polly Gray"),
            tx(8, 20.0, "Ada Thorne", "Tom Shelby"),
            tx(9, 10.0, "Esme Lee", "John Shelby"),
            tx(10, 5.0, "Linda Shelby", "Isaiah Jesus"),
        ];

        let index = transactions_by_beneficiary_name(&records);
        assert_eq!(index.len(), 8);
        assert_eq!(index["Oswald Mosley"].mtn, 4);
        assert!(!index.contains_key("Michael Gray"));

        assert_eq!(unsolved_issue_ids(&records), BTreeSet::from([54]));
        assert_eq!(top_sender(&records), Some("Grace Burgess".to_string()));
    }

    // ========================================================================
    // PROPERTIES
    // ========================================================================

    const NAMES: [&str; 6] = ["Tom", "Arthur", "Polly", "Grace", "Michael", "Ada"];

    fn arb_transaction() -> impl Strategy<Value = Transaction> {
        (
            0i64..10_000,
            0u32..100_000,
            0usize..NAMES.len(),
            0usize..NAMES.len(),
            proptest::option::of(0i64..20),
            any::<bool>(),
        )
            .prop_map(|(mtn, cents, s, b, issue_id, solved)| {
                let mut tx = Transaction::new(mtn, f64::from(cents) / 100.0, NAMES[s], 30, NAMES[b], 40);
                if let Some(id) = issue_id {
                    tx = tx.with_issue(id, solved, format!("issue {id}"));
                }
                tx
            })
    }

    fn arb_transactions() -> impl Strategy<Value = Vec<Transaction>> {
        proptest::collection::vec(arb_transaction(), 0..40)
    }

    proptest! {
        #[test]
        fn prop_sent_by_never_exceeds_total(records in arb_transactions(), s in 0usize..NAMES.len()) {
            let sent = total_amount_sent_by(&records, NAMES[s]);
            prop_assert!(sent <= total_amount(&records) + EPSILON);
        }

        #[test]
        fn prop_unique_clients_is_union_size(records in arb_transactions()) {
            let senders: HashSet<&str> = records.iter().map(|t| t.sender_full_name.as_str()).collect();
            let mut union = senders.clone();
            union.extend(records.iter().map(|t| t.beneficiary_full_name.as_str()));

            let count = count_unique_clients(&records);
            prop_assert!(count >= senders.len());
            prop_assert_eq!(count, union.len());
        }

        #[test]
        fn prop_top3_sorted_and_bounded(records in arb_transactions()) {
            let top = top3_transactions_by_amount(&records);
            let clean = clean_transactions(&records).count();

            prop_assert_eq!(top.len(), clean.min(3));
            prop_assert!(top.windows(2).all(|w| w[0].amount >= w[1].amount));
            prop_assert!(top.iter().all(Transaction::is_clean));
        }

        #[test]
        fn prop_open_issue_iff_some_involving_record_is_open(records in arb_transactions(), c in 0usize..NAMES.len()) {
            let client = NAMES[c];
            let expected = records
                .iter()
                .any(|t| t.involves(client) && t.issue_id.is_some() && !t.issue_solved);
            prop_assert_eq!(has_open_compliance_issue(&records, client), expected);
        }

        #[test]
        fn prop_absent_client_has_no_open_issue(records in arb_transactions()) {
            prop_assert!(!has_open_compliance_issue(&records, "Nobody At All"));
        }

        #[test]
        fn prop_max_matches_top_transaction(records in arb_transactions()) {
            let top = top_transactions_by_amount(&records, 1);
            let expected = top.first().map(|t| t.amount).unwrap_or(0.0);
            prop_assert_eq!(max_amount(&records), expected);
        }

        #[test]
        fn prop_beneficiary_index_keys_are_clean_beneficiaries(records in arb_transactions()) {
            let index = transactions_by_beneficiary_name(&records);
            let expected: BTreeSet<&str> = clean_transactions(&records)
                .map(|t| t.beneficiary_full_name.as_str())
                .collect();
            prop_assert!(index.keys().map(String::as_str).eq(expected.into_iter()));
        }

        #[test]
        fn prop_unsolved_and_solved_ids_disjoint(mut records in arb_transactions()) {
            // One id per issue, as in real data
            for (position, record) in records.iter_mut().enumerate() {
                if record.issue_id.is_some() {
                    record.issue_id = Some(position as i64);
                }
            }
            let solved: BTreeSet<i64> = records
                .iter()
                .filter(|t| t.has_solved_issue())
                .filter_map(|t| t.issue_id)
                .collect();

            prop_assert!(unsolved_issue_ids(&records).is_disjoint(&solved));
        }
    }
}

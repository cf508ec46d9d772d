//! Last-write-wins reconciliation of local and remote record sets

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::models::Transaction;

/// Which side each contested id was resolved to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Ids present on both sides where the local record was kept
    pub local_wins: usize,
    /// Ids present on both sides where the remote record was kept
    pub remote_wins: usize,
    /// Ids only present locally
    pub local_only: usize,
}

/// Merge `local` into `remote`, keeping the newer version of every id.
///
/// Remote records are the baseline. A local record replaces the remote one when
/// its version is greater than *or equal to* the remote version, so ties go to
/// the local side. Ids present on only one side are always kept. The result is
/// sorted by `date`, newest first.
pub fn merge(local: &[Transaction], remote: &[Transaction]) -> Vec<Transaction> {
    merge_with_report(local, remote).0
}

/// [`merge`], also reporting how contested ids were resolved
pub fn merge_with_report(
    local: &[Transaction],
    remote: &[Transaction],
) -> (Vec<Transaction>, MergeReport) {
    let mut report = MergeReport::default();
    let mut by_id: HashMap<&str, &Transaction> = remote
        .iter()
        .map(|record| (record.id.as_str(), record))
        .collect();

    for record in local {
        let remote_version = by_id
            .get(record.id.as_str())
            .map(|existing| existing.version());

        match remote_version {
            None => {
                report.local_only += 1;
                by_id.insert(record.id.as_str(), record);
            }
            Some(remote_version) if record.version() >= remote_version => {
                report.local_wins += 1;
                by_id.insert(record.id.as_str(), record);
            }
            Some(_) => report.remote_wins += 1,
        }
    }

    let mut merged: Vec<Transaction> = by_id.into_values().cloned().collect();
    sort_by_date_desc(&mut merged);
    (merged, report)
}

/// Newest `date` first; unparsable dates last; ties broken by id.
pub fn sort_by_date_desc(records: &mut [Transaction]) {
    records.sort_by(|a, b| compare_dates_desc(a, b).then_with(|| a.id.cmp(&b.id)));
}

fn compare_dates_desc(a: &Transaction, b: &Transaction) -> Ordering {
    match (a.date_millis(), b.date_millis()) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::transaction;
    use pretty_assertions::assert_eq;

    const T1: &str = "2024-03-01T10:00:00Z";
    const T2: &str = "2024-03-02T10:00:00Z";

    fn described(id: &str, updated_at: &str, description: &str) -> Transaction {
        let mut record = transaction(id, "2024-03-01", Some(updated_at));
        record.description = description.to_string();
        record
    }

    #[test]
    fn tie_goes_to_local() {
        let local = described("1", T1, "local");
        let remote = described("1", T1, "remote");

        let merged = merge(&[local.clone()], &[remote]);
        assert_eq!(merged, vec![local]);
    }

    #[test]
    fn newer_local_wins() {
        let local = described("1", T2, "local");
        let remote = described("1", T1, "remote");

        let (merged, report) = merge_with_report(&[local.clone()], &[remote]);
        assert_eq!(merged, vec![local]);
        assert_eq!(report.local_wins, 1);
    }

    #[test]
    fn older_local_loses() {
        let local = described("1", T1, "local");
        let remote = described("1", T2, "remote");

        let (merged, report) = merge_with_report(&[local], &[remote.clone()]);
        assert_eq!(merged, vec![remote]);
        assert_eq!(report.remote_wins, 1);
    }

    #[test]
    fn created_at_versions_records_without_updated_at() {
        let mut local = transaction("1", "2024-03-01", None);
        local.created_at = T1.to_string();
        local.description = "local".to_string();
        let remote = described("1", T2, "remote");

        assert_eq!(merge(&[local], &[remote.clone()]), vec![remote]);
    }

    #[test]
    fn unparsable_version_is_oldest() {
        let local = described("1", "not-a-timestamp", "local");
        let remote = described("1", T1, "remote");
        assert_eq!(merge(&[local], &[remote.clone()]), vec![remote]);

        // Both unparsable: equal versions, local wins the tie.
        let local = described("2", "???", "local");
        let remote = described("2", "!!!", "remote");
        assert_eq!(merge(&[local.clone()], &[remote]), vec![local]);
    }

    #[test]
    fn union_of_ids_each_exactly_once() {
        let local = vec![
            transaction("a", "2024-01-01", Some(T1)),
            transaction("shared", "2024-01-02", Some(T2)),
        ];
        let remote = vec![
            transaction("b", "2024-01-03", Some(T1)),
            transaction("shared", "2024-01-02", Some(T1)),
        ];

        let (merged, report) = merge_with_report(&local, &remote);
        let mut ids: Vec<&str> = merged.iter().map(|record| record.id.as_str()).collect();
        ids.sort_unstable();

        assert_eq!(ids, vec!["a", "b", "shared"]);
        assert_eq!(report.local_only, 1);
    }

    #[test]
    fn output_sorted_by_date_descending() {
        let local = vec![transaction("old", "2023-12-31", None)];
        let remote = vec![
            transaction("new", "2024-02-01", None),
            transaction("mid", "2024-01-15", None),
            transaction("undated", "someday", None),
        ];

        let ids: Vec<String> = merge(&local, &remote)
            .into_iter()
            .map(|record| record.id)
            .collect();
        assert_eq!(ids, vec!["new", "mid", "old", "undated"]);
    }

    #[test]
    fn merge_is_idempotent() {
        let local = vec![
            described("1", T2, "local newer"),
            described("2", T1, "local tie"),
            transaction("3", "2024-01-05", None),
        ];
        let remote = vec![
            described("1", T1, "remote older"),
            described("2", T1, "remote tie"),
            described("4", T2, "remote only"),
        ];

        let once = merge(&local, &remote);
        let twice = merge(&once, &remote);
        assert_eq!(once, twice);
    }

    #[test]
    fn empty_inputs() {
        assert!(merge(&[], &[]).is_empty());
        let only = vec![transaction("1", "2024-01-01", None)];
        assert_eq!(merge(&only, &[]), only);
        assert_eq!(merge(&[], &only), only);
    }
}

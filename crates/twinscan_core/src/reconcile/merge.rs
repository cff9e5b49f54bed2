//! Generic merge-by-recency and placeholder handling.

use crate::canonical::Canonicalizer;
use crate::model::date::ProvenanceDate;
use crate::model::record::{CanonicalRecord, RawCandidate};
use crate::model::sentinel::is_placeholder_text;
use chrono::NaiveDate;
use log::debug;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

/// Keeps, per key, the item with the greatest date.
///
/// Items for which `key_fn` returns `None` are dropped. Replacement requires
/// a strictly newer date, so ties keep the first item seen.
pub fn latest_by_key<T, K, FK, FD>(
    items: impl IntoIterator<Item = T>,
    mut key_fn: FK,
    mut date_fn: FD,
) -> BTreeMap<K, T>
where
    K: Ord,
    FK: FnMut(&T) -> Option<K>,
    FD: FnMut(&T) -> ProvenanceDate,
{
    let mut latest = BTreeMap::new();
    for item in items {
        let Some(key) = key_fn(&item) else {
            continue;
        };
        match latest.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(item);
            }
            Entry::Occupied(mut slot) => {
                if date_fn(&item) > date_fn(slot.get()) {
                    slot.insert(item);
                }
            }
        }
    }
    latest
}

/// Canonicalizes, validates and deduplicates candidates.
///
/// Output is sorted ascending by canonical key.
pub fn reconcile(
    candidates: impl IntoIterator<Item = RawCandidate>,
    canonicalizer: &dyn Canonicalizer,
    discovered: NaiveDate,
) -> Vec<CanonicalRecord> {
    let mut seen = 0usize;
    let records = candidates.into_iter().filter_map(|candidate| {
        seen += 1;
        to_record(&candidate, canonicalizer, discovered)
    });
    let latest = latest_by_key(
        records,
        |record| Some(record.key.clone()),
        |record| record.provenance_date,
    );

    debug!(
        "event=reconcile module=reconcile candidates={} survivors={}",
        seen,
        latest.len()
    );
    latest.into_values().collect()
}

/// Drops placeholder records (empty or sentinel display values).
pub fn retain_real(records: Vec<CanonicalRecord>) -> Vec<CanonicalRecord> {
    records
        .into_iter()
        .filter(|record| !record.is_placeholder())
        .collect()
}

/// Returns `records`, or exactly one placeholder when empty.
pub fn or_placeholder(
    records: Vec<CanonicalRecord>,
    discovered: NaiveDate,
) -> Vec<CanonicalRecord> {
    if records.is_empty() {
        vec![CanonicalRecord::placeholder(discovered)]
    } else {
        records
    }
}

/// `reconcile`, then `retain_real`, then `or_placeholder`.
pub fn reconcile_snapshot(
    candidates: impl IntoIterator<Item = RawCandidate>,
    canonicalizer: &dyn Canonicalizer,
    discovered: NaiveDate,
) -> Vec<CanonicalRecord> {
    or_placeholder(
        retain_real(reconcile(candidates, canonicalizer, discovered)),
        discovered,
    )
}

fn to_record(
    candidate: &RawCandidate,
    canonicalizer: &dyn Canonicalizer,
    discovered: NaiveDate,
) -> Option<CanonicalRecord> {
    if is_placeholder_text(candidate.identifier_raw()) {
        return None;
    }
    let canonical = canonicalizer.canonicalize(candidate.identifier_raw())?;
    if is_placeholder_text(&canonical) {
        return None;
    }
    Some(CanonicalRecord::new(
        canonical.clone(),
        canonical,
        candidate.provenance(),
        discovered,
    ))
}

#[cfg(test)]
mod tests {
    use super::{latest_by_key, or_placeholder, reconcile, reconcile_snapshot, retain_real};
    use crate::canonical::{EmailCanonicalizer, PhoneCanonicalizer};
    use crate::model::date::ProvenanceDate;
    use crate::model::record::{CanonicalRecord, RawCandidate, SourceTag};
    use crate::model::sentinel::NO_DATA_FOUND;
    use chrono::NaiveDate;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    fn email(addr: &str, date: &str, source: SourceTag) -> RawCandidate {
        RawCandidate::dated(addr, date, source)
    }

    #[test]
    fn newer_date_wins_in_either_order() {
        let older = email("x@example.com", "20200101", SourceTag::Whois);
        let newer = email("x@example.com", "20220101", SourceTag::Wayback);

        for batch in [
            vec![older.clone(), newer.clone()],
            vec![newer.clone(), older.clone()],
        ] {
            let out = reconcile(batch, &EmailCanonicalizer, today());
            assert_eq!(out.len(), 1);
            assert_eq!(out[0].provenance_date.to_string(), "2022-01-01");
        }
    }

    #[test]
    fn mixed_case_duplicates_collapse_to_latest() {
        let out = reconcile(
            vec![
                email("x@example.com", "20230101", SourceTag::Wayback),
                email("X@Example.com", "20230601", SourceTag::Whois),
            ],
            &EmailCanonicalizer,
            today(),
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].key, "x@example.com");
        assert_eq!(out[0].provenance_date.to_string(), "2023-06-01");
        assert_eq!(out[0].discovered_date, today());
    }

    #[test]
    fn unparseable_date_never_beats_valid_date() {
        let out = reconcile(
            vec![
                email("a@example.com", "2021-03-04", SourceTag::CertificateTransparency),
                email("a@example.com", "garbage", SourceTag::Whois),
                RawCandidate::new("a@example.com", None, SourceTag::Wayback),
            ],
            &EmailCanonicalizer,
            today(),
        );
        assert_eq!(out[0].provenance_date.to_string(), "2021-03-04");

        let reversed = reconcile(
            vec![
                email("a@example.com", "garbage", SourceTag::Whois),
                email("a@example.com", "2021-03-04", SourceTag::CertificateTransparency),
            ],
            &EmailCanonicalizer,
            today(),
        );
        assert_eq!(reversed[0].provenance_date.to_string(), "2021-03-04");
    }

    #[test]
    fn ties_keep_first_encountered() {
        let out = latest_by_key(
            vec![("k", 1, "20200101"), ("k", 2, "2020-01-01")],
            |item| Some(item.0),
            |item| ProvenanceDate::parse(item.2),
        );
        assert_eq!(out["k"].1, 1);
    }

    #[test]
    fn output_is_sorted_by_key_and_invalid_candidates_dropped() {
        let out = reconcile(
            vec![
                email("zeta@example.ch", "20200101", SourceTag::Whois),
                email("alpha@example.ch", "20200101", SourceTag::Whois),
                email("broken@example.notatld", "20200101", SourceTag::Whois),
            ],
            &EmailCanonicalizer,
            today(),
        );
        let keys: Vec<_> = out.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["alpha@example.ch", "zeta@example.ch"]);
    }

    #[test]
    fn phone_candidates_collapse_on_canonical_number() {
        let out = reconcile(
            vec![
                RawCandidate::dated("079 123 45 67", "20190101", SourceTag::Wayback),
                RawCandidate::dated("0041 79 123 45 67", "20210101", SourceTag::Whois),
                RawCandidate::dated("0041 00 123 45 67", "20210101", SourceTag::Whois),
            ],
            &PhoneCanonicalizer,
            today(),
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].display_value, "+41791234567");
        assert_eq!(out[0].provenance_date.to_string(), "2021-01-01");
    }

    #[test]
    fn sentinel_candidates_are_excluded_from_dedup() {
        let out = reconcile(
            vec![RawCandidate::dated(NO_DATA_FOUND, "20200101", SourceTag::Whois)],
            &EmailCanonicalizer,
            today(),
        );
        assert!(out.is_empty());
    }

    #[test]
    fn empty_input_yields_exactly_one_placeholder() {
        let out = reconcile_snapshot(Vec::new(), &EmailCanonicalizer, today());
        assert_eq!(out.len(), 1);
        assert!(out[0].is_placeholder());
        assert!(out[0].provenance_date.is_min());
    }

    #[test]
    fn placeholder_filter_drops_blank_and_sentinel_rows() {
        let rows = vec![
            CanonicalRecord::new("a", "a@b.ch", ProvenanceDate::MIN, today()),
            CanonicalRecord::new("", "", ProvenanceDate::MIN, today()),
            CanonicalRecord::placeholder(today()),
        ];
        let kept = retain_real(rows);
        assert_eq!(kept.len(), 1);
        assert_eq!(or_placeholder(kept.clone(), today()), kept);
    }
}

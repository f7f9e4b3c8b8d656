use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One shipment-tracking row from the technical sheet
///
/// The three phase fields are free-text cells. A phase is counting once its
/// cell is meaningful (non-empty after trimming and not `"-"`). `plane` is
/// historically a composite `dispatch/dealNumber` cell; `deal_number` is the
/// newer explicit column.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogisticRow {
    pub deal_number: String,
    pub plane: String,
    pub iran: String,
    pub customs: String,
}

/// Fixed per-phase countdown budgets, in days
pub const PLANE_LIMIT_DAYS: i64 = 60;
pub const IRAN_LIMIT_DAYS: i64 = 30;
pub const CUSTOMS_LIMIT_DAYS: i64 = 14;

const DAY_MS: i64 = 86_400_000;

/// Persisted countdown anchors for one row
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StatusEntry {
    pub plane_since: Option<i64>,
    pub iran_since: Option<i64>,
    pub customs_since: Option<i64>,
    pub updated_at: i64,
}

/// The whole persisted store: derived row key → countdown anchors
pub type StatusMap = HashMap<String, StatusEntry>;

/// Computed countdown state for one phase of one row
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PhaseStatus {
    pub active: bool,
    pub since: Option<i64>,
    pub age_days: Option<i64>,
    pub remaining_days: Option<i64>,
    pub overdue: bool,
}

impl PhaseStatus {
    fn inactive() -> Self {
        PhaseStatus {
            active: false,
            since: None,
            age_days: None,
            remaining_days: None,
            overdue: false,
        }
    }

    fn active(since: i64, limit_days: i64, now_ms: i64) -> Self {
        let age_days = (now_ms - since) / DAY_MS;
        let remaining_days = limit_days - age_days;
        PhaseStatus {
            active: true,
            since: Some(since),
            age_days: Some(age_days),
            remaining_days: Some(remaining_days),
            overdue: remaining_days <= 0,
        }
    }
}

/// Computed countdown state for one row
#[derive(Debug, Clone, Serialize)]
pub struct RowStatus {
    pub key: String,
    pub plane: PhaseStatus,
    pub iran: PhaseStatus,
    pub customs: PhaseStatus,
}

fn is_meaningful(value: &str) -> bool {
    let trimmed = value.trim();
    !trimmed.is_empty() && trimmed != "-"
}

// Row identity is unstable: the sheet gets edited in place and reordered.
// Candidate keys are tried in order against the persisted store; the first
// hit wins. The deal number is the most stable anchor when present, so the
// deal-only key is the last-resort match after the field-derived keys.

fn composite_key(row: &LogisticRow) -> Option<String> {
    Some(format!(
        "v2|{}|{}|{}|{}",
        row.deal_number, row.plane, row.iran, row.customs
    ))
}

// Key format used before the explicit deal-number column existed: the deal
// number was carried inside the plane cell as "dispatch/dealNumber".
fn legacy_key(row: &LogisticRow) -> Option<String> {
    if let Some((dispatch, deal)) = row.plane.split_once('/') {
        Some(format!("v1|{}|{}|{}|{}", deal, dispatch, row.iran, row.customs))
    } else {
        Some(format!("v1|{}|{}|{}", row.plane, row.iran, row.customs))
    }
}

fn deal_only_key(row: &LogisticRow) -> Option<String> {
    if row.deal_number.is_empty() {
        None
    } else {
        Some(format!("deal|{}", row.deal_number))
    }
}

/// Ordered key-extractor list. Stable contract: composite first, then the
/// legacy composite-cell form, then deal-number-only.
const KEY_EXTRACTORS: &[fn(&LogisticRow) -> Option<String>] =
    &[composite_key, legacy_key, deal_only_key];

/// All derivable candidate keys for a row, in lookup priority order
pub fn key_candidates(row: &LogisticRow) -> Vec<String> {
    KEY_EXTRACTORS
        .iter()
        .filter_map(|extract| extract(row))
        .collect()
}

fn find_prior<'a>(store: &'a StatusMap, candidates: &[String]) -> Option<&'a StatusEntry> {
    candidates.iter().find_map(|key| store.get(key))
}

/// Recompute countdown statuses for the current row list
///
/// Produces the per-row, per-phase statuses and the replacement store. The
/// store is rebuilt wholesale: each surviving row is written back under all
/// of its candidate keys (so a later edit can still re-match via the deal
/// number), and rows absent from `rows` simply drop out.
///
/// Phase transitions: a field becoming meaningful fixes `since` at the first
/// tick that saw it; reverting to empty/`"-"` clears it. A phase is overdue
/// once `remaining_days <= 0`.
///
/// # Arguments
/// * `rows` - Current logistics rows, in sheet order
/// * `prior` - The previously persisted store (empty map on first run)
/// * `now_ms` - Clock tick, milliseconds since the Unix epoch
///
/// # Returns
/// * `(Vec<RowStatus>, StatusMap)` - Statuses in row order, and the store to persist
pub fn recompute(
    rows: &[LogisticRow],
    prior: &StatusMap,
    now_ms: i64,
) -> (Vec<RowStatus>, StatusMap) {
    let mut statuses = Vec::with_capacity(rows.len());
    let mut next = StatusMap::new();

    for row in rows {
        let candidates = key_candidates(row);
        let previous = find_prior(prior, &candidates);

        let plane_since = phase_since(&row.plane, previous.and_then(|e| e.plane_since), now_ms);
        let iran_since = phase_since(&row.iran, previous.and_then(|e| e.iran_since), now_ms);
        let customs_since =
            phase_since(&row.customs, previous.and_then(|e| e.customs_since), now_ms);

        let entry = StatusEntry {
            plane_since,
            iran_since,
            customs_since,
            updated_at: now_ms,
        };
        for key in &candidates {
            next.insert(key.clone(), entry.clone());
        }

        statuses.push(RowStatus {
            key: candidates
                .first()
                .cloned()
                .unwrap_or_default(),
            plane: phase_status(plane_since, PLANE_LIMIT_DAYS, now_ms),
            iran: phase_status(iran_since, IRAN_LIMIT_DAYS, now_ms),
            customs: phase_status(customs_since, CUSTOMS_LIMIT_DAYS, now_ms),
        });
    }

    (statuses, next)
}

// Once meaningful, the anchor stays fixed at its first-seen tick; it only
// resets by the field reverting to empty.
fn phase_since(field: &str, prior_since: Option<i64>, now_ms: i64) -> Option<i64> {
    if is_meaningful(field) {
        Some(prior_since.unwrap_or(now_ms))
    } else {
        None
    }
}

fn phase_status(since: Option<i64>, limit_days: i64, now_ms: i64) -> PhaseStatus {
    match since {
        Some(since) => PhaseStatus::active(since, limit_days, now_ms),
        None => PhaseStatus::inactive(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(deal: &str, plane: &str, iran: &str, customs: &str) -> LogisticRow {
        LogisticRow {
            deal_number: deal.to_string(),
            plane: plane.to_string(),
            iran: iran.to_string(),
            customs: customs.to_string(),
        }
    }

    const T0: i64 = 1_700_000_000_000;

    #[test]
    fn first_sighting_anchors_since_at_now() {
        let rows = vec![row("D-1", "2024-02-01/D-1", "yes", "")];
        let (statuses, store) = recompute(&rows, &StatusMap::new(), T0);
        assert_eq!(statuses[0].plane.since, Some(T0));
        assert_eq!(statuses[0].iran.since, Some(T0));
        assert!(!statuses[0].customs.active);
        // Entry reachable under every candidate key
        assert!(store.contains_key("deal|D-1"));
    }

    #[test]
    fn customs_overdue_boundary() {
        let rows = vec![row("D-1", "", "", "at customs")];
        let mut prior = StatusMap::new();

        // Exactly 14 days old
        prior.insert(
            key_candidates(&rows[0])[0].clone(),
            StatusEntry {
                customs_since: Some(T0 - 14 * 86_400_000),
                ..Default::default()
            },
        );
        let (statuses, _) = recompute(&rows, &prior, T0);
        assert_eq!(statuses[0].customs.remaining_days, Some(0));
        assert!(statuses[0].customs.overdue);

        // 13 days old
        prior.insert(
            key_candidates(&rows[0])[0].clone(),
            StatusEntry {
                customs_since: Some(T0 - 13 * 86_400_000),
                ..Default::default()
            },
        );
        let (statuses, _) = recompute(&rows, &prior, T0);
        assert_eq!(statuses[0].customs.remaining_days, Some(1));
        assert!(!statuses[0].customs.overdue);
    }

    #[test]
    fn edited_field_keeps_other_anchors_via_deal_key() {
        let before = vec![row("D-7", "2024-02-01/D-7", "on the way", "")];
        let (_, store) = recompute(&before, &StatusMap::new(), T0);

        // Customs cell filled in a week later; composite and legacy keys
        // both change, the deal key still matches.
        let after = vec![row("D-7", "2024-02-01/D-7", "on the way", "cleared in")];
        let t1 = T0 + 7 * 86_400_000;
        let (statuses, _) = recompute(&after, &store, t1);

        assert_eq!(statuses[0].plane.since, Some(T0));
        assert_eq!(statuses[0].iran.since, Some(T0));
        assert_eq!(statuses[0].customs.since, Some(t1));
        assert_eq!(statuses[0].plane.age_days, Some(7));
    }

    #[test]
    fn legacy_store_entries_still_match() {
        let current = row("D-3", "2024-03-05/D-3", "", "");
        // Simulate a store written by the old key scheme only
        let mut prior = StatusMap::new();
        prior.insert(
            "v1|D-3|2024-03-05||".to_string(),
            StatusEntry {
                plane_since: Some(T0 - 3 * 86_400_000),
                ..Default::default()
            },
        );

        let (statuses, _) = recompute(&[current], &prior, T0);
        assert_eq!(statuses[0].plane.since, Some(T0 - 3 * 86_400_000));
        assert_eq!(statuses[0].plane.age_days, Some(3));
    }

    #[test]
    fn reverting_to_empty_clears_anchor() {
        let active = vec![row("D-9", "x", "", "")];
        let (_, store) = recompute(&active, &StatusMap::new(), T0);

        let reverted = vec![row("D-9", "-", "", "")];
        let (statuses, next) = recompute(&reverted, &store, T0 + DAY_MS);
        assert!(!statuses[0].plane.active);
        assert_eq!(statuses[0].plane.since, None);
        let entry = next.get("deal|D-9").unwrap();
        assert_eq!(entry.plane_since, None);
    }

    #[test]
    fn departed_rows_dropped_from_store() {
        let rows = vec![row("D-1", "a", "", ""), row("D-2", "b", "", "")];
        let (_, store) = recompute(&rows, &StatusMap::new(), T0);
        assert!(store.contains_key("deal|D-2"));

        let survivors = vec![row("D-1", "a", "", "")];
        let (_, next) = recompute(&survivors, &store, T0 + DAY_MS);
        assert!(next.contains_key("deal|D-1"));
        assert!(!next.contains_key("deal|D-2"));
    }

    #[test]
    fn dash_and_whitespace_not_meaningful() {
        assert!(!is_meaningful(""));
        assert!(!is_meaningful("  "));
        assert!(!is_meaningful("-"));
        assert!(!is_meaningful(" - "));
        assert!(is_meaningful("2024-02-01"));
    }

    #[test]
    fn plane_limit_is_sixty_days() {
        let rows = vec![row("D-1", "x", "", "")];
        let mut prior = StatusMap::new();
        prior.insert(
            key_candidates(&rows[0])[0].clone(),
            StatusEntry {
                plane_since: Some(T0 - 59 * 86_400_000),
                ..Default::default()
            },
        );
        let (statuses, _) = recompute(&rows, &prior, T0);
        assert_eq!(statuses[0].plane.remaining_days, Some(1));
        assert!(!statuses[0].plane.overdue);
    }
}

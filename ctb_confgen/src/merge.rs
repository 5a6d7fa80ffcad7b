//! Keyed merging of trigger lists.
//!
//! Trigger definitions live in ordered lists where each record carries a
//! unique `id`. The board schema supplies a default list; users override a
//! subset of it, redefine triggers in place, or add new ones. [`update_triggers`]
//! combines the two without disturbing the order of the defaults.

use std::collections::HashMap;

/// Records that can be merged by [`update_triggers`].
pub trait Keyed {
    /// Identifier unique within a list of records.
    fn key(&self) -> &str;
}

/// Overlay `overrides` onto `defaults`, matching records by [`Keyed::key`].
///
/// Behaviour:
/// - `None` returns `defaults` untouched.
/// - An override whose key matches a default replaces that record in place.
/// - An override with a new key is appended, in the order supplied.
/// - Repeated keys in `overrides` resolve to the last occurrence, kept at
///   the position of the first.
///
/// # Examples
///
/// ```rust
/// use ctb_confgen::{Keyed, update_triggers};
///
/// #[derive(Debug, Clone, PartialEq)]
/// struct Trig { id: &'static str, v: u8 }
///
/// impl Keyed for Trig {
///     fn key(&self) -> &str { self.id }
/// }
///
/// let defaults = vec![Trig { id: "A", v: 1 }, Trig { id: "B", v: 2 }];
/// let overrides = vec![Trig { id: "B", v: 9 }, Trig { id: "C", v: 3 }];
/// let merged = update_triggers(defaults, Some(overrides));
/// assert_eq!(
///     merged,
///     vec![Trig { id: "A", v: 1 }, Trig { id: "B", v: 9 }, Trig { id: "C", v: 3 }]
/// );
/// ```
#[must_use]
pub fn update_triggers<T: Keyed>(defaults: Vec<T>, overrides: Option<Vec<T>>) -> Vec<T> {
    let Some(replacements) = overrides else {
        return defaults;
    };

    let mut merged = defaults;
    let mut positions: HashMap<String, usize> = merged
        .iter()
        .enumerate()
        .map(|(idx, record)| (record.key().to_owned(), idx))
        .collect();

    for record in replacements {
        let slot = positions
            .get(record.key())
            .copied()
            .and_then(|idx| merged.get_mut(idx));
        if let Some(existing) = slot {
            tracing::debug!(id = record.key(), "redefining trigger");
            *existing = record;
        } else {
            tracing::debug!(id = record.key(), "adding trigger");
            positions.insert(record.key().to_owned(), merged.len());
            merged.push(record);
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::{Keyed, update_triggers};
    use rstest::{fixture, rstest};

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Record {
        id: String,
        v: u32,
    }

    impl Keyed for Record {
        fn key(&self) -> &str {
            &self.id
        }
    }

    fn rec(id: &str, v: u32) -> Record {
        Record {
            id: id.to_owned(),
            v,
        }
    }

    fn ids(records: &[Record]) -> Vec<&str> {
        records.iter().map(|r| r.id.as_str()).collect()
    }

    #[fixture]
    fn defaults() -> Vec<Record> {
        vec![rec("A", 1), rec("B", 2)]
    }

    #[rstest]
    fn absent_overrides_return_defaults(defaults: Vec<Record>) {
        assert_eq!(update_triggers(defaults.clone(), None), defaults);
    }

    #[rstest]
    fn empty_overrides_return_defaults(defaults: Vec<Record>) {
        assert_eq!(update_triggers(defaults.clone(), Some(Vec::new())), defaults);
    }

    #[rstest]
    fn replaces_in_place_and_appends_new(defaults: Vec<Record>) {
        let merged = update_triggers(defaults, Some(vec![rec("B", 9), rec("C", 3)]));
        assert_eq!(merged, vec![rec("A", 1), rec("B", 9), rec("C", 3)]);
    }

    #[rstest]
    fn new_records_keep_supplied_order(defaults: Vec<Record>) {
        let merged = update_triggers(defaults, Some(vec![rec("Z", 1), rec("M", 2), rec("Q", 3)]));
        assert_eq!(ids(&merged), vec!["A", "B", "Z", "M", "Q"]);
    }

    #[rstest]
    #[case::all_new(vec![rec("C", 0), rec("D", 0)], 4)]
    #[case::all_known(vec![rec("A", 0), rec("B", 0)], 2)]
    #[case::mixed(vec![rec("A", 0), rec("E", 0), rec("F", 0)], 4)]
    fn length_counts_only_new_ids(
        defaults: Vec<Record>,
        #[case] overrides: Vec<Record>,
        #[case] expected_len: usize,
    ) {
        assert_eq!(update_triggers(defaults, Some(overrides)).len(), expected_len);
    }

    #[rstest]
    fn last_duplicate_override_wins_for_known_id(defaults: Vec<Record>) {
        let merged = update_triggers(defaults, Some(vec![rec("A", 7), rec("A", 8)]));
        assert_eq!(merged, vec![rec("A", 8), rec("B", 2)]);
    }

    #[rstest]
    fn last_duplicate_override_wins_for_new_id(defaults: Vec<Record>) {
        let merged = update_triggers(
            defaults,
            Some(vec![rec("C", 1), rec("D", 4), rec("C", 2)]),
        );
        assert_eq!(merged, vec![rec("A", 1), rec("B", 2), rec("C", 2), rec("D", 4)]);
    }

    #[rstest]
    fn untouched_defaults_keep_relative_order() {
        let defaults = vec![rec("A", 1), rec("B", 2), rec("C", 3), rec("D", 4)];
        let merged = update_triggers(defaults, Some(vec![rec("C", 30), rec("X", 0)]));
        let untouched: Vec<&str> = merged
            .iter()
            .filter(|r| r.id != "C" && r.id != "X")
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(untouched, vec!["A", "B", "D"]);
        assert_eq!(merged.get(2), Some(&rec("C", 30)));
    }

    #[rstest]
    fn empty_defaults_take_every_override() {
        let merged = update_triggers(Vec::new(), Some(vec![rec("A", 1), rec("B", 2)]));
        assert_eq!(merged, vec![rec("A", 1), rec("B", 2)]);
    }
}

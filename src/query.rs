use crate::record::{stringify, Record};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Reserved query parameter naming the sort key; everything else is a filter.
pub const SORT_PARAM: &str = "sort";

/// Applies equality filters and the optional single-key sort to a snapshot of
/// a collection. The input is already a fresh Vec, stored state is untouched.
pub fn apply(mut records: Vec<Record>, params: &HashMap<String, String>) -> Vec<Record> {
    for (field, expected) in params {
        if field == SORT_PARAM {
            continue;
        }
        records.retain(|record| stringify(record.get(field)) == *expected);
    }
    if let Some(sort) = params.get(SORT_PARAM) {
        sort_records(&mut records, sort);
    }
    records
}

/// Ascending: nulls last, numbers numerically, otherwise case-insensitive
/// strings. Descending reverses the full ascending list, which also moves
/// null entries to the front; callers depend on that exact order.
pub fn sort_records(records: &mut [Record], sort: &str) {
    let (field, descending) = match sort.strip_prefix('-') {
        Some(stripped) => (stripped, true),
        None => (sort, false),
    };
    records.sort_by(|a, b| compare_fields(a.get(field), b.get(field)));
    if descending {
        records.reverse();
    }
}

fn compare_fields(a: Option<&serde_json::Value>, b: Option<&serde_json::Value>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(nx), Some(ny)) => nx.partial_cmp(&ny).unwrap_or(Ordering::Equal),
            _ => stringify(Some(x)).to_lowercase().cmp(&stringify(Some(y)).to_lowercase()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: serde_json::Value) -> Record {
        value.as_object().unwrap().clone()
    }

    fn names(records: &[Record]) -> Vec<String> {
        records.iter().map(|r| stringify(r.get("name"))).collect()
    }

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn sample() -> Vec<Record> {
        vec![
            record(json!({"name": "carol", "state": "PA", "rate": 70})),
            record(json!({"name": "Alice", "state": "IL", "rate": 55})),
            record(json!({"name": "bob", "state": "IL", "rate": 9})),
            record(json!({"name": "Dave", "state": "IL", "rate": null})),
        ]
    }

    #[test]
    fn it_should_filter_by_stringified_equality() {
        let out = apply(sample(), &params(&[("state", "IL")]));
        assert_eq!(out.len(), 3);
        assert!(out.iter().all(|r| stringify(r.get("state")) == "IL"));
    }

    #[test]
    fn it_should_filter_numbers_through_their_string_form() {
        let out = apply(sample(), &params(&[("rate", "55")]));
        assert_eq!(names(&out), vec!["Alice"]);
    }

    #[test]
    fn it_should_match_missing_fields_against_the_empty_string() {
        let rows = vec![
            record(json!({"name": "a", "notes": "x"})),
            record(json!({"name": "b"})),
            record(json!({"name": "c", "notes": null})),
        ];
        let out = apply(rows, &params(&[("notes", "")]));
        assert_eq!(names(&out), vec!["b", "c"]);
    }

    #[test]
    fn it_should_sort_case_insensitively_ascending() {
        let mut rows = sample();
        rows.retain(|r| !r.get("rate").map(|v| v.is_null()).unwrap_or(false));
        let out = apply(rows, &params(&[("sort", "name")]));
        assert_eq!(names(&out), vec!["Alice", "bob", "carol"]);
    }

    #[test]
    fn it_should_sort_numbers_numerically_not_lexically() {
        let out = apply(sample(), &params(&[("sort", "rate")]));
        let rates: Vec<String> = out.iter().map(|r| stringify(r.get("rate"))).collect();
        assert_eq!(rates, vec!["9", "55", "70", ""]);
    }

    #[test]
    fn it_should_put_nulls_last_when_ascending() {
        let out = apply(sample(), &params(&[("sort", "rate")]));
        assert_eq!(names(&out).last().unwrap(), "Dave");
    }

    #[test]
    fn it_should_make_descending_the_exact_reverse_of_ascending() {
        let ascending = apply(sample(), &params(&[("sort", "rate")]));
        let descending = apply(sample(), &params(&[("sort", "-rate")]));
        let mut reversed = ascending.clone();
        reversed.reverse();
        assert_eq!(descending, reversed);
        // The reversal moves the null entry to the front.
        assert_eq!(names(&descending).first().unwrap(), "Dave");
    }

    #[test]
    fn it_should_combine_filter_and_sort() {
        let out = apply(sample(), &params(&[("state", "IL"), ("sort", "name")]));
        assert_eq!(names(&out), vec!["Alice", "bob", "Dave"]);
    }
}

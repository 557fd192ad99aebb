use serde::Serialize;
use serde_json::Value;
use std::cmp::Ordering;

use super::aggregates::{AggregateMap, aggregate_map, compare_values};
use super::query_parser::{AggregateDescriptor, SortDescriptor, SortDirection};

/// A group in grouped grid data.
///
/// Leaf groups hold records in `Items`; inner groups hold their subgroups in
/// both `Items` and `Subgroups`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct GridGroup {
    pub key: Value,
    pub has_subgroups: bool,
    pub member: String,
    pub items: GroupItems,
    pub aggregates: AggregateMap,
    pub subgroups: Vec<GridGroup>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GroupItems {
    Records(Vec<Value>),
    Groups(Vec<GridGroup>),
}

fn key_order(a: &Value, b: &Value, direction: SortDirection) -> Ordering {
    let ordering = match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => compare_values(a, b).unwrap_or(Ordering::Equal),
    };
    match direction {
        SortDirection::Ascending => ordering,
        SortDirection::Descending => ordering.reverse(),
    }
}

/// Group records by the descriptors, outermost first.
///
/// Records keep their relative order inside a group. Group keys are ordered by
/// each descriptor's direction, with missing and null keys first when ascending.
#[must_use]
pub fn group_items(
    items: Vec<Value>,
    groups: &[SortDescriptor],
    aggregates: &[AggregateDescriptor],
) -> Vec<GridGroup> {
    let Some((descriptor, rest)) = groups.split_first() else {
        return Vec::new();
    };

    let mut buckets: Vec<(Value, Vec<Value>)> = Vec::new();
    for item in items {
        let key = item.get(&descriptor.member).cloned().unwrap_or(Value::Null);
        match buckets.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, bucket)) => bucket.push(item),
            None => buckets.push((key, vec![item])),
        }
    }
    buckets.sort_by(|(a, _), (b, _)| key_order(a, b, descriptor.direction));

    buckets
        .into_iter()
        .map(|(key, records)| {
            let aggregates_for_group = aggregate_map(aggregates, &records);
            if rest.is_empty() {
                GridGroup {
                    key,
                    has_subgroups: false,
                    member: descriptor.member.clone(),
                    items: GroupItems::Records(records),
                    aggregates: aggregates_for_group,
                    subgroups: Vec::new(),
                }
            } else {
                let subgroups = group_items(records, rest, aggregates);
                GridGroup {
                    key,
                    has_subgroups: true,
                    member: descriptor.member.clone(),
                    items: GroupItems::Groups(subgroups.clone()),
                    aggregates: aggregates_for_group,
                    subgroups,
                }
            }
        })
        .collect()
}

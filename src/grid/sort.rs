use sea_orm::{ColumnTrait, EntityTrait, Order, QueryOrder, Select};

use super::conditions::find_column;
use super::query_parser::{SortDescriptor, SortDirection};

/// Convert a grid sort direction to a query `Order`
#[must_use]
pub const fn to_order(direction: SortDirection) -> Order {
    match direction {
        SortDirection::Ascending => Order::Asc,
        SortDirection::Descending => Order::Desc,
    }
}

/// Resolve descriptors to `(column, order)` pairs, dropping unknown members.
pub fn parse_sorting<'a, C>(
    descriptors: impl IntoIterator<Item = &'a SortDescriptor>,
    columns: &[(&str, C)],
) -> Vec<(C, Order)>
where
    C: ColumnTrait,
{
    descriptors
        .into_iter()
        .filter_map(|descriptor| {
            let column = find_column(&descriptor.member, columns);
            if column.is_none() {
                tracing::warn!(member = %descriptor.member, "Ignoring sort on unknown grid member");
            }
            column.map(|column| (column, to_order(descriptor.direction)))
        })
        .collect()
}

/// Order a select by the group descriptors first, then the sort descriptors,
/// which is the order the grid expects grouped pages in.
pub fn apply_sorting<E, C>(
    mut select: Select<E>,
    groups: &[SortDescriptor],
    sorts: &[SortDescriptor],
    columns: &[(&str, C)],
) -> Select<E>
where
    E: EntityTrait,
    C: ColumnTrait,
{
    for (column, order) in parse_sorting(groups.iter().chain(sorts), columns) {
        select = select.order_by(column, order);
    }
    select
}

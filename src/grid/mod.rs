//! # Grid Data Source Protocol
//!
//! Reads the query a data grid sends with every read or edit and turns it into
//! query conditions, ordering and a page window. Also shapes the response
//! envelope the grid expects back.
//!
//! ## Request Parameters
//!
//! ```text
//! page=2&pageSize=20
//! sort=name-asc~price-desc
//! group=category-asc
//! aggregate=price-sum~price-average
//! filter=(name~contains~'saw'~or~name~startswith~'dr')~and~price~lt~100
//! ```
//!
//! ## Response Envelope
//!
//! ```json
//! { "Data": [...], "Total": 42, "AggregateResults": null, "Errors": null }
//! ```
//!
//! When groups are requested `Data` holds groups instead of records:
//!
//! ```json
//! { "Key": "tools", "HasSubgroups": false, "Member": "category",
//!   "Items": [...], "Aggregates": { "price": { "sum": 18 } }, "Subgroups": [] }
//! ```

pub mod aggregates;
pub mod conditions;
pub mod filter_parser;
pub mod grouping;
pub mod pagination;
pub mod query_parser;
pub mod result;
pub mod sort;

pub use aggregates::{
    AggregateMap, AggregateResult, aggregate_map, aggregate_results, query_aggregate_results,
};
pub use conditions::{apply_filters, find_column};
pub use filter_parser::{
    FilterDescriptor, FilterLogic, FilterNode, FilterOperator, FilterValue, MAX_FILTER_DEPTH,
    parse_filter,
};
pub use grouping::{GridGroup, GroupItems, group_items};
pub use pagination::parse_pagination;
pub use query_parser::{
    AggregateDescriptor, AggregateFunction, DataSourceRequest, GridParseError, GridQuery,
    SortDescriptor, SortDirection,
};
pub use result::{DataSourceResult, GridData};
pub use sort::{apply_sorting, parse_sorting};

pub use crate::validation::ModelState;

use serde::Deserialize;
use serde_with::{NoneAsEmptyString, serde_as};
use std::fmt;
use utoipa::IntoParams;

use super::filter_parser::{FilterNode, parse_filter};

/// Raw grid data source parameters, exactly as the grid sends them.
///
/// The grid posts every key on each request, empty ones included
/// (`page=1&pageSize=0&sort=&group=&filter=`), so empty strings read as absent.
///
/// # Sorting and grouping
/// `member-direction` pairs joined by `~`, for example `name-asc~price-desc`.
///
/// # Aggregates
/// `member-function` pairs joined by `~`, for example `price-sum~price-max`.
///
/// # Filtering
/// `member~operator~value` terms joined by `~and~` / `~or~`, grouped with
/// parentheses, for example `(name~contains~'saw'~or~name~contains~'drill')~and~price~lt~100`.
#[serde_as]
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
#[serde(rename_all = "camelCase")]
pub struct GridQuery {
    /// 1-based page number.
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    #[param(value_type = Option<u64>, example = 1)]
    pub page: Option<u64>,
    /// Items per page; `0` disables paging.
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    #[param(value_type = Option<u64>, example = 20)]
    pub page_size: Option<u64>,
    /// Sort descriptors.
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    #[param(value_type = Option<String>, example = "name-asc~price-desc")]
    pub sort: Option<String>,
    /// Group descriptors.
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    #[param(value_type = Option<String>, example = "category-asc")]
    pub group: Option<String>,
    /// Aggregate descriptors.
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    #[param(value_type = Option<String>, example = "price-sum~price-max")]
    pub aggregate: Option<String>,
    /// Filter expression.
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    #[param(value_type = Option<String>, example = "name~contains~'saw'~and~price~lt~100")]
    pub filter: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

/// One `member-direction` pair. Group descriptors use the same shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortDescriptor {
    pub member: String,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    Count,
    Sum,
    Average,
    Min,
    Max,
}

impl AggregateFunction {
    /// Wire name, as used in group aggregate maps.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Sum => "sum",
            Self::Average => "average",
            Self::Min => "min",
            Self::Max => "max",
        }
    }

    /// Method name reported in `AggregateResults`.
    #[must_use]
    pub const fn method_name(self) -> &'static str {
        match self {
            Self::Count => "Count",
            Self::Sum => "Sum",
            Self::Average => "Average",
            Self::Min => "Min",
            Self::Max => "Max",
        }
    }

    fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "count" => Some(Self::Count),
            "sum" => Some(Self::Sum),
            "average" | "avg" => Some(Self::Average),
            "min" => Some(Self::Min),
            "max" => Some(Self::Max),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateDescriptor {
    pub member: String,
    pub function: AggregateFunction,
}

/// Parsed grid request: paging, sorting, grouping, aggregates and the filter
/// that `select` applies.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataSourceRequest {
    /// 1-based; `0` is treated as `1`.
    pub page: u64,
    /// `0` means no paging.
    pub page_size: u64,
    pub sorts: Vec<SortDescriptor>,
    pub groups: Vec<SortDescriptor>,
    pub aggregates: Vec<AggregateDescriptor>,
    pub filter: Option<FilterNode>,
}

impl TryFrom<GridQuery> for DataSourceRequest {
    type Error = GridParseError;

    fn try_from(query: GridQuery) -> Result<Self, Self::Error> {
        Ok(Self {
            page: query.page.unwrap_or(1),
            page_size: query.page_size.unwrap_or(0),
            sorts: parse_sort_descriptors(query.sort.as_deref())?,
            groups: parse_sort_descriptors(query.group.as_deref())?,
            aggregates: parse_aggregate_descriptors(query.aggregate.as_deref())?,
            filter: query.filter.as_deref().map(parse_filter).transpose()?,
        })
    }
}

/// Errors raised while reading grid parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridParseError {
    InvalidSort(String),
    InvalidAggregate(String),
    UnknownAggregateFunction(String),
    UnknownFilterOperator(String),
    InvalidFilter { position: usize, message: String },
}

impl fmt::Display for GridParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSort(s) => write!(f, "Invalid sort descriptor '{s}'"),
            Self::InvalidAggregate(s) => write!(f, "Invalid aggregate descriptor '{s}'"),
            Self::UnknownAggregateFunction(s) => write!(f, "Unknown aggregate function '{s}'"),
            Self::UnknownFilterOperator(s) => write!(f, "Unknown filter operator '{s}'"),
            Self::InvalidFilter { position, message } => {
                write!(f, "Invalid filter at position {position}: {message}")
            }
        }
    }
}

impl std::error::Error for GridParseError {}

fn descriptor_parts(input: Option<&str>) -> impl Iterator<Item = &str> {
    input
        .unwrap_or_default()
        .split('~')
        .map(str::trim)
        .filter(|part| !part.is_empty())
}

fn parse_sort_descriptors(input: Option<&str>) -> Result<Vec<SortDescriptor>, GridParseError> {
    descriptor_parts(input)
        .map(|part| {
            let (member, direction) = match part.rsplit_once('-') {
                Some((member, dir)) if dir.eq_ignore_ascii_case("asc") => {
                    (member, SortDirection::Ascending)
                }
                Some((member, dir)) if dir.eq_ignore_ascii_case("desc") => {
                    (member, SortDirection::Descending)
                }
                Some(_) => return Err(GridParseError::InvalidSort(part.to_string())),
                None => (part, SortDirection::Ascending),
            };
            if member.is_empty() {
                return Err(GridParseError::InvalidSort(part.to_string()));
            }
            Ok(SortDescriptor {
                member: member.to_string(),
                direction,
            })
        })
        .collect()
}

fn parse_aggregate_descriptors(
    input: Option<&str>,
) -> Result<Vec<AggregateDescriptor>, GridParseError> {
    descriptor_parts(input)
        .map(|part| {
            let (member, function) = part
                .rsplit_once('-')
                .filter(|(member, _)| !member.is_empty())
                .ok_or_else(|| GridParseError::InvalidAggregate(part.to_string()))?;
            let function = AggregateFunction::parse(function)
                .ok_or_else(|| GridParseError::UnknownAggregateFunction(function.to_string()))?;
            Ok(AggregateDescriptor {
                member: member.to_string(),
                function,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(sort: &str) -> GridQuery {
        GridQuery {
            sort: Some(sort.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let request = DataSourceRequest::try_from(GridQuery::default()).unwrap();
        assert_eq!(request.page, 1);
        assert_eq!(request.page_size, 0);
        assert!(request.sorts.is_empty());
        assert!(request.groups.is_empty());
        assert!(request.aggregates.is_empty());
        assert!(request.filter.is_none());
    }

    #[test]
    fn test_sort_descriptors() {
        let request = DataSourceRequest::try_from(query("name-asc~price-DESC~category")).unwrap();
        assert_eq!(
            request.sorts,
            vec![
                SortDescriptor { member: "name".into(), direction: SortDirection::Ascending },
                SortDescriptor { member: "price".into(), direction: SortDirection::Descending },
                SortDescriptor { member: "category".into(), direction: SortDirection::Ascending },
            ]
        );
    }

    #[test]
    fn test_sort_member_with_dash() {
        let request = DataSourceRequest::try_from(query("unit-price-desc")).unwrap();
        assert_eq!(request.sorts[0].member, "unit-price");
        assert_eq!(request.sorts[0].direction, SortDirection::Descending);
    }

    #[test]
    fn test_invalid_sort_direction() {
        let err = DataSourceRequest::try_from(query("name-sideways")).unwrap_err();
        assert_eq!(err, GridParseError::InvalidSort("name-sideways".into()));
    }

    #[test]
    fn test_aggregate_descriptors() {
        let request = DataSourceRequest::try_from(GridQuery {
            aggregate: Some("price-sum~price-MAX~id-count".into()),
            ..Default::default()
        })
        .unwrap();
        let functions: Vec<_> = request.aggregates.iter().map(|a| a.function).collect();
        assert_eq!(
            functions,
            vec![AggregateFunction::Sum, AggregateFunction::Max, AggregateFunction::Count]
        );
    }

    #[test]
    fn test_unknown_aggregate_function() {
        let err = DataSourceRequest::try_from(GridQuery {
            aggregate: Some("price-median".into()),
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(err.to_string(), "Unknown aggregate function 'median'");
    }

    #[test]
    fn test_empty_keys_deserialize_as_absent() {
        let query: GridQuery =
            serde_json::from_value(serde_json::json!({
                "page": "", "pageSize": "", "sort": "", "group": "", "filter": ""
            }))
            .unwrap();
        assert_eq!(query.page, None);
        assert_eq!(query.page_size, None);
        assert_eq!(query.sort, None);
        assert_eq!(query.filter, None);
    }

    #[test]
    fn test_numeric_strings_deserialize() {
        let query: GridQuery =
            serde_json::from_value(serde_json::json!({ "page": "3", "pageSize": "25" })).unwrap();
        assert_eq!(query.page, Some(3));
        assert_eq!(query.page_size, Some(25));
    }
}

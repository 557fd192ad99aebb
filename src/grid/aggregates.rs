use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, ColumnType, ConnectionTrait, DatabaseConnection, EntityTrait, QueryResult,
    QuerySelect, QueryTrait, Select,
    sea_query::{Expr, Func, SimpleExpr},
};
use serde::Serialize;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use uuid::Uuid;

use super::conditions::find_column;
use super::query_parser::{AggregateDescriptor, AggregateFunction};
use crate::errors::ApiError;

/// One entry of the envelope's `AggregateResults`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AggregateResult {
    pub member: String,
    pub aggregate_method_name: String,
    pub value: Value,
}

/// Group aggregates, keyed `member -> function -> value`.
pub type AggregateMap = BTreeMap<String, BTreeMap<String, Value>>;

/// Order two JSON scalars of the same kind. Mixed kinds do not compare.
pub(crate) fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

fn extreme<'a>(values: impl Iterator<Item = &'a Value>, wanted: Ordering) -> Value {
    let mut best: Option<&Value> = None;
    for value in values.filter(|v| !v.is_null()) {
        best = match best {
            None => Some(value),
            Some(current) if compare_values(value, current) == Some(wanted) => Some(value),
            keep => keep,
        };
    }
    best.cloned().unwrap_or(Value::Null)
}

fn sum(values: &[&Value]) -> Option<Value> {
    let numbers: Vec<&serde_json::Number> = values.iter().filter_map(|v| v.as_number()).collect();
    if numbers.is_empty() {
        return None;
    }
    if let Some(integers) = numbers.iter().map(|n| n.as_i64()).collect::<Option<Vec<i64>>>()
        && let Some(total) = integers.iter().try_fold(0_i64, |acc, n| acc.checked_add(*n))
    {
        return Some(Value::from(total));
    }
    Some(Value::from(numbers.iter().filter_map(|n| n.as_f64()).sum::<f64>()))
}

impl AggregateFunction {
    /// Apply the function to `member` across `items`.
    #[must_use]
    pub fn apply(self, member: &str, items: &[Value]) -> Value {
        let values: Vec<&Value> = items.iter().filter_map(|item| item.get(member)).collect();
        match self {
            Self::Count => Value::from(items.len()),
            Self::Sum => sum(&values).unwrap_or_else(|| Value::from(0)),
            Self::Average => {
                let numbers: Vec<f64> = values.iter().filter_map(|v| v.as_f64()).collect();
                if numbers.is_empty() {
                    Value::Null
                } else {
                    #[allow(clippy::cast_precision_loss)]
                    let average = numbers.iter().sum::<f64>() / numbers.len() as f64;
                    Value::from(average)
                }
            }
            Self::Min => extreme(values.into_iter(), Ordering::Less),
            Self::Max => extreme(values.into_iter(), Ordering::Greater),
        }
    }
}

/// Compute top-level `AggregateResults`.
#[must_use]
pub fn aggregate_results(descriptors: &[AggregateDescriptor], items: &[Value]) -> Vec<AggregateResult> {
    descriptors
        .iter()
        .map(|descriptor| AggregateResult {
            member: descriptor.member.clone(),
            aggregate_method_name: descriptor.function.method_name().to_string(),
            value: descriptor.function.apply(&descriptor.member, items),
        })
        .collect()
}

/// SQL form of `function` over `column`. `count` needs no query.
fn sql_aggregate<C: ColumnTrait>(function: AggregateFunction, column: C) -> Option<SimpleExpr> {
    let call = match function {
        AggregateFunction::Count => return None,
        AggregateFunction::Sum => Func::sum(Expr::col(column)),
        AggregateFunction::Average => Func::avg(Expr::col(column)),
        AggregateFunction::Min => Func::min(Expr::col(column)),
        AggregateFunction::Max => Func::max(Expr::col(column)),
    };
    Some(SimpleExpr::FunctionCall(call))
}

fn is_integer(column_type: &ColumnType) -> bool {
    matches!(
        column_type,
        ColumnType::TinyInteger
            | ColumnType::SmallInteger
            | ColumnType::Integer
            | ColumnType::BigInteger
            | ColumnType::TinyUnsigned
            | ColumnType::SmallUnsigned
            | ColumnType::Unsigned
            | ColumnType::BigUnsigned
    )
}

/// Read one aggregate column, decoded by the aggregated column's type.
fn read_aggregate(
    row: &QueryResult,
    alias: &str,
    function: AggregateFunction,
    column_type: &ColumnType,
) -> Result<Value, ApiError> {
    let value = match function {
        AggregateFunction::Average => Value::from(row.try_get::<Option<f64>>("", alias)?),
        // SQL sums nothing to NULL
        AggregateFunction::Sum if is_integer(column_type) => {
            Value::from(row.try_get::<Option<i64>>("", alias)?.unwrap_or(0))
        }
        AggregateFunction::Sum => Value::from(row.try_get::<Option<f64>>("", alias)?.unwrap_or(0.0)),
        _ if is_integer(column_type) => Value::from(row.try_get::<Option<i64>>("", alias)?),
        _ => match column_type {
            ColumnType::Float | ColumnType::Double | ColumnType::Decimal(_) | ColumnType::Money(_) => {
                Value::from(row.try_get::<Option<f64>>("", alias)?)
            }
            ColumnType::Boolean => Value::from(row.try_get::<Option<bool>>("", alias)?),
            ColumnType::Uuid => serde_json::to_value(row.try_get::<Option<Uuid>>("", alias)?)?,
            ColumnType::TimestampWithTimeZone | ColumnType::DateTime | ColumnType::Timestamp => {
                serde_json::to_value(row.try_get::<Option<DateTime<Utc>>>("", alias)?)?
            }
            _ => Value::from(row.try_get::<Option<String>>("", alias)?),
        },
    };
    Ok(value)
}

/// Compute top-level `AggregateResults` over every row `filtered` selects.
///
/// Members mapped in `columns` aggregate in one SQL query and `count` is the
/// filtered `total`. Only when some member has no column are the filtered
/// rows loaded and run through `project`.
///
/// # Errors
/// Returns [`ApiError`] when a query or a projection fails.
pub async fn query_aggregate_results<E, F>(
    db: &DatabaseConnection,
    filtered: Select<E>,
    descriptors: &[AggregateDescriptor],
    columns: &[(&str, E::Column)],
    total: u64,
    project: F,
) -> Result<Vec<AggregateResult>, ApiError>
where
    E: EntityTrait,
    F: Fn(E::Model) -> Result<Value, serde_json::Error> + Send,
{
    let mut query = filtered.clone().select_only();
    let mut selected: Vec<Option<(String, ColumnType)>> = Vec::with_capacity(descriptors.len());
    for (index, descriptor) in descriptors.iter().enumerate() {
        let column = find_column(&descriptor.member, columns);
        match column.and_then(|column| sql_aggregate(descriptor.function, column).map(|call| (column, call))) {
            Some((column, call)) => {
                let alias = format!("aggregate_{index}");
                query = query.column_as(call, alias.as_str());
                selected.push(Some((alias, column.def().get_column_type().clone())));
            }
            None => selected.push(None),
        }
    }

    let in_memory = descriptors
        .iter()
        .zip(&selected)
        .any(|(descriptor, sql)| sql.is_none() && descriptor.function != AggregateFunction::Count);
    let items = if in_memory {
        filtered
            .all(db)
            .await?
            .into_iter()
            .map(project)
            .collect::<Result<Vec<_>, _>>()?
    } else {
        Vec::new()
    };

    let row = if selected.iter().any(Option::is_some) {
        db.query_one(query.build(db.get_database_backend())).await?
    } else {
        None
    };

    let mut results = Vec::with_capacity(descriptors.len());
    for (descriptor, sql) in descriptors.iter().zip(selected) {
        let value = match (descriptor.function, sql, &row) {
            (AggregateFunction::Count, _, _) => Value::from(total),
            (function, Some((alias, column_type)), Some(row)) => {
                read_aggregate(row, &alias, function, &column_type)?
            }
            (AggregateFunction::Sum, Some(_), None) => Value::from(0),
            (_, Some(_), None) => Value::Null,
            (function, None, _) => function.apply(&descriptor.member, &items),
        };
        results.push(AggregateResult {
            member: descriptor.member.clone(),
            aggregate_method_name: descriptor.function.method_name().to_string(),
            value,
        });
    }
    Ok(results)
}

/// Compute per-group aggregates.
#[must_use]
pub fn aggregate_map(descriptors: &[AggregateDescriptor], items: &[Value]) -> AggregateMap {
    let mut map = AggregateMap::new();
    for descriptor in descriptors {
        map.entry(descriptor.member.clone()).or_default().insert(
            descriptor.function.name().to_string(),
            descriptor.function.apply(&descriptor.member, items),
        );
    }
    map
}

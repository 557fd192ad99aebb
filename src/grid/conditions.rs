use chrono::{DateTime, NaiveDateTime, Utc};
use sea_orm::{
    ColumnTrait, ColumnType, Condition, Value,
    sea_query::{Expr, Func, LikeExpr, SimpleExpr},
};
use uuid::Uuid;

use super::filter_parser::{
    FilterDescriptor, FilterLogic, FilterNode, FilterOperator, FilterValue, parse_datetime,
};

// Longest literal a filter may compare against
const MAX_FIELD_VALUE_LENGTH: usize = 10_000;

// Backslash is itself an escape in some dialects' string literals
const LIKE_ESCAPE: char = '!';

/// Look a grid member up in the resource's member-to-column map.
pub fn find_column<C: ColumnTrait>(member: &str, columns: &[(&str, C)]) -> Option<C> {
    columns
        .iter()
        .find(|(name, _)| *name == member)
        .map(|&(_, column)| column)
}

/// Translate a parsed grid filter into a query condition.
///
/// Members missing from `columns` and literals that cannot be coerced to the
/// column's type are skipped with a warning. Returns `None` when nothing is
/// left to filter on.
pub fn apply_filters<C: ColumnTrait>(filter: &FilterNode, columns: &[(&str, C)]) -> Option<Condition> {
    match filter {
        FilterNode::Descriptor(descriptor) => {
            build_descriptor(descriptor, columns).map(|expr| Condition::all().add(expr))
        }
        FilterNode::Composite { logic, filters } => {
            let mut condition = match logic {
                FilterLogic::And => Condition::all(),
                FilterLogic::Or => Condition::any(),
            };
            let mut added = 0usize;
            for child in filters {
                if let Some(child) = apply_filters(child, columns) {
                    condition = condition.add(child);
                    added += 1;
                }
            }
            (added > 0).then_some(condition)
        }
    }
}

fn build_descriptor<C: ColumnTrait>(
    descriptor: &FilterDescriptor,
    columns: &[(&str, C)],
) -> Option<SimpleExpr> {
    let Some(column) = find_column(&descriptor.member, columns) else {
        tracing::warn!(member = %descriptor.member, "Ignoring filter on unknown grid member");
        return None;
    };
    let column_type = column.def().get_column_type().clone();

    match descriptor.operator {
        FilterOperator::IsNull => return Some(column.is_null()),
        FilterOperator::IsNotNull => return Some(column.is_not_null()),
        FilterOperator::IsEmpty => return Some(Expr::col(column).eq("")),
        FilterOperator::IsNotEmpty => return Some(Expr::col(column).ne("")),
        _ => {}
    }

    if descriptor.value == FilterValue::Null {
        return match descriptor.operator {
            FilterOperator::IsEqualTo => Some(column.is_null()),
            FilterOperator::IsNotEqualTo => Some(column.is_not_null()),
            _ => {
                tracing::warn!(member = %descriptor.member, "Ignoring null comparison");
                None
            }
        };
    }

    if let Some(pattern) = like_pattern(descriptor) {
        if !validate_field_value(&pattern) {
            return None;
        }
        let upper = Expr::expr(SimpleExpr::FunctionCall(Func::upper(Expr::col(column))));
        let like = LikeExpr::new(pattern).escape(LIKE_ESCAPE);
        return Some(match descriptor.operator {
            FilterOperator::DoesNotContain => upper.not_like(like),
            _ => upper.like(like),
        });
    }

    if is_text(&column_type) {
        let FilterValue::String(text) = &descriptor.value else {
            return compare(column, descriptor.operator, text_value(&descriptor.value));
        };
        if !validate_field_value(text) {
            return None;
        }
        let upper = Expr::expr(SimpleExpr::FunctionCall(Func::upper(Expr::col(column))));
        let value = text.to_uppercase();
        return Some(match descriptor.operator {
            FilterOperator::IsEqualTo => upper.eq(value),
            FilterOperator::IsNotEqualTo => upper.ne(value),
            FilterOperator::IsLessThan => upper.lt(value),
            FilterOperator::IsLessThanOrEqualTo => upper.lte(value),
            FilterOperator::IsGreaterThan => upper.gt(value),
            _ => upper.gte(value),
        });
    }

    let Some(value) = coerce_value(&descriptor.value, &column_type) else {
        tracing::warn!(
            member = %descriptor.member,
            value = ?descriptor.value,
            "Ignoring filter value that does not fit the column type"
        );
        return None;
    };
    compare(column, descriptor.operator, value)
}

fn compare<C: ColumnTrait>(column: C, operator: FilterOperator, value: Value) -> Option<SimpleExpr> {
    Some(match operator {
        FilterOperator::IsEqualTo => column.eq(value),
        FilterOperator::IsNotEqualTo => column.ne(value),
        FilterOperator::IsLessThan => column.lt(value),
        FilterOperator::IsLessThanOrEqualTo => column.lte(value),
        FilterOperator::IsGreaterThan => column.gt(value),
        FilterOperator::IsGreaterThanOrEqualTo => column.gte(value),
        _ => return None,
    })
}

/// Upper-cased `LIKE` pattern for the text-matching operators.
fn like_pattern(descriptor: &FilterDescriptor) -> Option<String> {
    let text = match &descriptor.value {
        FilterValue::String(text) => text.clone(),
        other => text_string(other),
    };
    let escaped = escape_like(&text.to_uppercase());
    match descriptor.operator {
        FilterOperator::StartsWith => Some(format!("{escaped}%")),
        FilterOperator::EndsWith => Some(format!("%{escaped}")),
        FilterOperator::Contains | FilterOperator::DoesNotContain => Some(format!("%{escaped}%")),
        _ => None,
    }
}

fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | LIKE_ESCAPE) {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(c);
    }
    escaped
}

const fn validate_field_value(value: &str) -> bool {
    value.len() <= MAX_FIELD_VALUE_LENGTH
}

fn is_text(column_type: &ColumnType) -> bool {
    matches!(
        column_type,
        ColumnType::Char(_) | ColumnType::String(_) | ColumnType::Text
    )
}

fn text_string(value: &FilterValue) -> String {
    match value {
        FilterValue::Null => String::new(),
        FilterValue::Bool(b) => b.to_string(),
        FilterValue::Integer(i) => i.to_string(),
        FilterValue::Float(f) => f.to_string(),
        FilterValue::String(s) => s.clone(),
        FilterValue::DateTime(dt) => dt.format("%Y-%m-%dT%H:%M:%S").to_string(),
    }
}

fn text_value(value: &FilterValue) -> Value {
    Value::from(text_string(value))
}

/// Convert a filter literal to a value of the column's declared type.
pub fn coerce_value(value: &FilterValue, column_type: &ColumnType) -> Option<Value> {
    match column_type {
        ColumnType::Uuid => match value {
            FilterValue::String(s) => Uuid::parse_str(s.trim()).ok().map(Value::from),
            _ => None,
        },
        ColumnType::Boolean => match value {
            FilterValue::Bool(b) => Some(Value::from(*b)),
            FilterValue::Integer(i) => Some(Value::from(*i != 0)),
            FilterValue::String(s) => s.trim().parse::<bool>().ok().map(Value::from),
            _ => None,
        },
        ColumnType::TinyInteger
        | ColumnType::SmallInteger
        | ColumnType::Integer
        | ColumnType::BigInteger
        | ColumnType::TinyUnsigned
        | ColumnType::SmallUnsigned
        | ColumnType::Unsigned
        | ColumnType::BigUnsigned => match value {
            FilterValue::Integer(i) => Some(Value::from(*i)),
            #[allow(clippy::cast_possible_truncation)]
            FilterValue::Float(f) if f.fract() == 0.0 => Some(Value::from(*f as i64)),
            FilterValue::String(s) => s.trim().parse::<i64>().ok().map(Value::from),
            _ => None,
        },
        ColumnType::Float | ColumnType::Double | ColumnType::Decimal(_) | ColumnType::Money(_) => {
            match value {
                #[allow(clippy::cast_precision_loss)]
                FilterValue::Integer(i) => Some(Value::from(*i as f64)),
                FilterValue::Float(f) => Some(Value::from(*f)),
                FilterValue::String(s) => s.trim().parse::<f64>().ok().map(Value::from),
                _ => None,
            }
        }
        ColumnType::TimestampWithTimeZone => datetime(value)
            .map(|dt| Value::from(DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc))),
        ColumnType::DateTime | ColumnType::Timestamp => datetime(value).map(Value::from),
        ColumnType::Date => datetime(value).map(|dt| Value::from(dt.date())),
        _ => Some(text_value(value)),
    }
}

fn datetime(value: &FilterValue) -> Option<NaiveDateTime> {
    match value {
        FilterValue::DateTime(dt) => Some(*dt),
        FilterValue::String(s) => parse_datetime(s.trim()),
        _ => None,
    }
}

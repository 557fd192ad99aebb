//! Model binding for grid edits.
//!
//! The grid posts its dirty rows as JSON, as a form whose `models` field
//! holds a JSON array (the usual `parameterMap`), or in the MVC form
//! encoding: `models[0].name=..` for batches and bare `name=..` fields for a
//! single row. Rows are bound one at a time so a bad row only records an
//! error against its own `models[i]` key and the rest of the batch still
//! binds.

use axum::{
    Form,
    body::Bytes,
    extract::{FromRequest, Request},
    http::header::CONTENT_TYPE,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::errors::ApiError;
use crate::validation::{ModelState, Validatable};

/// Form keys that belong to the grid request rather than to a row.
const GRID_REQUEST_KEYS: [&str; 6] = ["page", "pageSize", "sort", "group", "aggregate", "filter"];

/// A posted batch of view models and the state of binding it.
///
/// `models` is `None` when the request carried no collection at all; entries
/// are `None` for posted nulls and for rows that failed to bind.
#[derive(Debug)]
pub struct GridModels<VM> {
    pub models: Option<Vec<Option<VM>>>,
    pub model_state: ModelState,
}

/// A single posted view model and the state of binding it.
#[derive(Debug)]
pub struct GridModel<VM> {
    pub model: Option<VM>,
    pub model_state: ModelState,
}

enum Payload {
    /// A JSON body, or a form whose `models` field holds JSON.
    Json(Value),
    /// `models[i].field` form keys grouped by row index.
    IndexedForm(BTreeMap<usize, Vec<(String, String)>>),
    /// Top-level form fields of a single row.
    Form(Vec<(String, String)>),
}

/// One posted row before it is bound to a view model.
enum RawRow {
    Json(Value),
    Fields(Vec<(String, String)>),
}

impl RawRow {
    /// `None` for a posted null.
    fn decode<VM: DeserializeOwned>(self) -> Option<Result<VM, String>> {
        match self {
            Self::Json(Value::Null) => None,
            Self::Json(value) => Some(serde_json::from_value(value).map_err(|err| err.to_string())),
            Self::Fields(fields) => Some(decode_fields(&fields)),
        }
    }
}

/// Bind string form fields through the urlencoded deserializer, which parses
/// numbers and booleans for typed fields. Empty inputs bind as missing.
fn decode_fields<VM: DeserializeOwned>(fields: &[(String, String)]) -> Result<VM, String> {
    let present: Vec<(&str, &str)> = fields
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(key, value)| (key.as_str(), value.as_str()))
        .collect();
    let encoded = serde_urlencoded::to_string(&present).map_err(|err| err.to_string())?;
    serde_urlencoded::from_str(&encoded).map_err(|err| err.to_string())
}

fn is_form(req: &Request) -> bool {
    req.headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/x-www-form-urlencoded"))
}

/// Split `models[3].name` into `(3, "name")`.
fn indexed_field(key: &str) -> Option<(usize, &str)> {
    let (index, field) = key.strip_prefix("models[")?.split_once("].")?;
    Some((index.parse().ok()?, field))
}

fn read_form(pairs: Vec<(String, String)>) -> Result<Option<Payload>, ApiError> {
    if let Some((_, raw)) = pairs.iter().find(|(key, _)| key == "models") {
        let models: Value = serde_json::from_str(raw)
            .map_err(|err| ApiError::bad_request(format!("Invalid JSON in `models`: {err}")))?;
        return Ok(Some(Payload::Json(Value::Object(
            [("models".to_string(), models)].into_iter().collect(),
        ))));
    }

    let mut rows: BTreeMap<usize, Vec<(String, String)>> = BTreeMap::new();
    let mut fields = Vec::new();
    for (key, value) in pairs {
        if let Some((index, field)) = indexed_field(&key) {
            rows.entry(index).or_default().push((field.to_string(), value));
        } else if key.starts_with("models[") {
            return Err(ApiError::bad_request(format!("Unrecognized form key '{key}'")));
        } else if !GRID_REQUEST_KEYS.contains(&key.as_str()) {
            fields.push((key, value));
        }
    }

    if !rows.is_empty() {
        return Ok(Some(Payload::IndexedForm(rows)));
    }
    Ok((!fields.is_empty()).then_some(Payload::Form(fields)))
}

/// Read the body. An empty body, or a form with only grid request keys, is `None`.
async fn read_payload<S>(req: Request, state: &S) -> Result<Option<Payload>, ApiError>
where
    S: Send + Sync,
{
    if is_form(&req) {
        let Form(pairs) = Form::<Vec<(String, String)>>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
        return read_form(pairs);
    }

    let bytes = Bytes::from_request(req, state)
        .await
        .map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(&bytes)
        .map(|value| Some(Payload::Json(value)))
        .map_err(|err| ApiError::bad_request(format!("Invalid JSON body: {err}")))
}

/// Deserialize and validate one row, recording failures under `prefix`.
fn bind_one<VM>(row: RawRow, prefix: &str, model_state: &mut ModelState) -> Option<VM>
where
    VM: DeserializeOwned + Validatable,
{
    match row.decode::<VM>()? {
        Ok(view_model) => {
            if let Err(errors) = view_model.validate() {
                model_state.merge(prefix, &errors);
            }
            Some(view_model)
        }
        Err(message) => {
            let key = if prefix.is_empty() { "model" } else { prefix };
            model_state.add_error(key, message);
            None
        }
    }
}

/// Bind every element of a posted collection.
pub fn bind_models<VM>(values: Vec<Value>, model_state: &mut ModelState) -> Vec<Option<VM>>
where
    VM: DeserializeOwned + Validatable,
{
    values
        .into_iter()
        .enumerate()
        .map(|(index, value)| bind_one(RawRow::Json(value), &format!("models[{index}]"), model_state))
        .collect()
}

fn json_collection(value: Value) -> Result<Option<Vec<Value>>, ApiError> {
    match value {
        Value::Null => Ok(None),
        Value::Array(items) => Ok(Some(items)),
        Value::Object(mut fields) => match fields.remove("models") {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Array(items)) => Ok(Some(items)),
            Some(_) => Err(ApiError::bad_request("`models` must be an array")),
        },
        _ => Err(ApiError::bad_request("Expected a models collection")),
    }
}

/// The only element of a one-row collection.
fn single<T>(items: impl IntoIterator<Item = T>) -> Result<Option<T>, ApiError> {
    let mut items = items.into_iter();
    let first = items.next();
    if items.next().is_some() {
        return Err(ApiError::bad_request(
            "Expected a single model; use the batch endpoint for several",
        ));
    }
    Ok(first)
}

impl<S, VM> FromRequest<S> for GridModels<VM>
where
    S: Send + Sync,
    VM: DeserializeOwned + Validatable + Send,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let mut model_state = ModelState::new();
        let models = match read_payload(req, state).await? {
            None => None,
            Some(Payload::Json(value)) => {
                json_collection(value)?.map(|items| bind_models(items, &mut model_state))
            }
            Some(Payload::IndexedForm(rows)) => Some(
                rows.into_iter()
                    .map(|(index, fields)| {
                        bind_one(RawRow::Fields(fields), &format!("models[{index}]"), &mut model_state)
                    })
                    .collect(),
            ),
            Some(Payload::Form(_)) => {
                return Err(ApiError::bad_request(
                    "Expected `models` or `models[i].field` keys in the form body",
                ));
            }
        };

        Ok(Self {
            models,
            model_state,
        })
    }
}

impl<S, VM> FromRequest<S> for GridModel<VM>
where
    S: Send + Sync,
    VM: DeserializeOwned + Validatable + Send,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let row = match read_payload(req, state).await? {
            None => None,
            Some(Payload::Json(Value::Object(mut fields)))
                if fields.len() == 1 && fields.contains_key("models") =>
            {
                match fields.remove("models") {
                    Some(Value::Array(items)) => single(items)?.map(RawRow::Json),
                    other => other.map(RawRow::Json),
                }
            }
            Some(Payload::Json(value)) => Some(RawRow::Json(value)),
            Some(Payload::IndexedForm(rows)) => single(rows.into_values())?.map(RawRow::Fields),
            Some(Payload::Form(fields)) => Some(RawRow::Fields(fields)),
        };

        let mut model_state = ModelState::new();
        let model = row.and_then(|row| bind_one(row, "", &mut model_state));
        Ok(Self { model, model_state })
    }
}

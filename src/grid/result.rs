use serde::Serialize;

use super::aggregates::AggregateResult;
use super::grouping::GridGroup;
use crate::validation::ModelState;

/// The `Data` member of a grid response: a flat page or its groups.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum GridData<T> {
    Items(Vec<T>),
    Groups(Vec<GridGroup>),
}

/// Envelope every grid endpoint answers with.
///
/// Field names are PascalCase and absent members serialize as `null`, which is
/// what the grid's data source reads.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DataSourceResult<T> {
    pub data: Option<GridData<T>>,
    pub total: u64,
    pub aggregate_results: Option<Vec<AggregateResult>>,
    pub errors: Option<ModelState>,
}

impl<T> DataSourceResult<T> {
    /// A flat result whose total is the number of items.
    #[must_use]
    pub fn from_items(items: Vec<T>) -> Self {
        Self {
            total: items.len() as u64,
            data: Some(GridData::Items(items)),
            aggregate_results: None,
            errors: None,
        }
    }

    /// Attach the model state, but only when it carries errors.
    #[must_use]
    pub fn with_errors(mut self, model_state: ModelState) -> Self {
        if !model_state.is_valid() {
            self.errors = Some(model_state);
        }
        self
    }

    /// The result of an update or delete: no data, only validation errors.
    #[must_use]
    pub fn from_model_state(model_state: ModelState) -> Self {
        Self {
            data: None,
            total: 0,
            aggregate_results: None,
            errors: None,
        }
        .with_errors(model_state)
    }
}

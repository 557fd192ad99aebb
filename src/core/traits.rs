use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection,
    EntityTrait, FromQueryResult, IntoActiveModel, ModelTrait, PaginatorTrait, QueryFilter,
    QuerySelect,
};
use serde::{Serialize, de::DeserializeOwned};

use super::audit::{Auditable, stamp_insert, stamp_update};
use crate::context::{ObjectContext, clear_generated_keys};
use crate::errors::ApiError;
use crate::grid::{
    DataSourceRequest, DataSourceResult, GridData, apply_filters, apply_sorting, group_items,
    parse_pagination, query_aggregate_results,
};
use crate::identity::Identity;
use crate::validation::{ModelState, Validatable};

/// The shape a grid reads and posts, mapped to and from a stored model.
pub trait ViewModel<M, A>: Validatable {
    /// Copy stored values into the view model, after a save or for a read.
    fn copy_model(&mut self, model: &M);

    /// Write the view model's fields into an active model.
    fn update_model(&self, active_model: &mut A);

    /// View models carrying audit fields return themselves here so inserts
    /// and updates can stamp them.
    fn as_auditable_mut(&mut self) -> Option<&mut dyn Auditable> {
        None
    }
}

/// A grid-editable entity set.
///
/// Implementors name the entity, its active model and the view model the grid
/// sees, plus how rows project into view models and which view model members
/// map to columns. Every operation has a default body; override one to
/// customise a single resource.
#[async_trait]
pub trait GridResource: Sized + Send + Sync + 'static {
    type Entity: EntityTrait<Model = Self::Model, Column = Self::Column> + Sync;
    type Model: ModelTrait<Entity = Self::Entity>
        + FromQueryResult
        + IntoActiveModel<Self::ActiveModel>
        + Send
        + Sync;
    type ActiveModel: ActiveModelTrait<Entity = Self::Entity>
        + ActiveModelBehavior
        + Send
        + Sync
        + 'static;
    type Column: ColumnTrait + Send + Sync;
    type ViewModel: ViewModel<Self::Model, Self::ActiveModel>
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static;

    /// Name of the entity set, used in logs and route descriptions.
    const ENTITY_SET_NAME: &'static str;
    const RESOURCE_DESCRIPTION: &'static str = "";

    /// Rows outside this condition are invisible to `select`.
    #[must_use]
    fn where_condition() -> Condition {
        Condition::all()
    }

    /// Project a stored row into the view model the grid reads.
    fn initializer(model: Self::Model) -> Self::ViewModel;

    /// View model members the grid may filter, sort and group by.
    fn grid_columns() -> Vec<(&'static str, Self::Column)>;

    /// Read one page of grid data.
    ///
    /// Filters, counts, orders (groups first, then sorts), pages and projects
    /// the rows. Groups are formed from the page; top-level aggregates cover
    /// every filtered row and run in SQL for mapped members.
    async fn select(
        db: &DatabaseConnection,
        request: &DataSourceRequest,
    ) -> Result<DataSourceResult<Self::ViewModel>, ApiError> {
        let columns = Self::grid_columns();
        let mut condition = Self::where_condition();
        if let Some(filter) = &request.filter
            && let Some(grid_condition) = apply_filters(filter, &columns)
        {
            condition = condition.add(grid_condition);
        }

        let filtered = <Self::Entity as EntityTrait>::find().filter(condition);
        let total = filtered.clone().count(db).await?;

        let mut query = apply_sorting(filtered.clone(), &request.groups, &request.sorts, &columns);
        if let Some((offset, limit)) = parse_pagination(request) {
            query = query.offset(offset).limit(limit);
        }
        let page: Vec<Self::ViewModel> = query
            .all(db)
            .await?
            .into_iter()
            .map(Self::initializer)
            .collect();

        let aggregates = if request.aggregates.is_empty() {
            None
        } else {
            Some(
                query_aggregate_results(
                    db,
                    filtered,
                    &request.aggregates,
                    &columns,
                    total,
                    |model| serde_json::to_value(Self::initializer(model)),
                )
                .await?,
            )
        };

        let data = if request.groups.is_empty() {
            GridData::Items(page)
        } else {
            let records = page
                .iter()
                .map(serde_json::to_value)
                .collect::<Result<Vec<_>, _>>()?;
            GridData::Groups(group_items(records, &request.groups, &request.aggregates))
        };

        tracing::debug!(
            entity_set = Self::ENTITY_SET_NAME,
            total,
            grouped = !request.groups.is_empty(),
            "Selected grid page"
        );

        Ok(DataSourceResult {
            data: Some(data),
            total,
            aggregate_results: aggregates,
            errors: None,
        })
    }

    /// Insert a batch of view models in one save.
    ///
    /// Returns the view models as stored, generated keys included. With no
    /// collection or an invalid model state nothing is written and the data
    /// is empty.
    async fn insert_many(
        db: &DatabaseConnection,
        identity: &Identity,
        _request: &DataSourceRequest,
        models: Option<Vec<Option<Self::ViewModel>>>,
        model_state: ModelState,
    ) -> Result<DataSourceResult<Self::ViewModel>, ApiError> {
        let Some(view_models) = models.filter(|_| model_state.is_valid()) else {
            tracing::debug!(
                entity_set = Self::ENTITY_SET_NAME,
                errors = model_state.len(),
                "Insert skipped"
            );
            return Ok(DataSourceResult::from_items(Vec::new()).with_errors(model_state));
        };

        let mut view_models: Vec<Self::ViewModel> = view_models.into_iter().flatten().collect();
        let now = Utc::now();
        let mut context = ObjectContext::<Self::ActiveModel>::new(db);
        for view_model in &mut view_models {
            let mut active_model = context.create_object();
            stamp_insert(view_model.as_auditable_mut(), identity, now)?;
            view_model.update_model(&mut active_model);
            clear_generated_keys(&mut active_model);
            context.add_object(active_model);
        }

        let saved = context.save_changes().await?;
        for (view_model, model) in view_models.iter_mut().zip(&saved) {
            view_model.copy_model(model);
        }

        tracing::debug!(
            entity_set = Self::ENTITY_SET_NAME,
            count = view_models.len(),
            "Inserted grid rows"
        );
        Ok(DataSourceResult::from_items(view_models).with_errors(model_state))
    }

    /// Update the stored rows matching each view model's key in one save.
    ///
    /// Keys without a stored row are skipped.
    async fn update_many(
        db: &DatabaseConnection,
        identity: &Identity,
        _request: &DataSourceRequest,
        models: Option<Vec<Option<Self::ViewModel>>>,
        model_state: ModelState,
    ) -> Result<DataSourceResult<Self::ViewModel>, ApiError> {
        if let Some(view_models) = models
            && model_state.is_valid()
        {
            let now = Utc::now();
            let mut context = ObjectContext::<Self::ActiveModel>::new(db);
            for mut view_model in view_models.into_iter().flatten() {
                let mut transient = context.create_object();
                stamp_update(view_model.as_auditable_mut(), identity, now)?;
                view_model.update_model(&mut transient);

                let Some(key) = context.create_entity_key(&transient) else {
                    tracing::debug!(entity_set = Self::ENTITY_SET_NAME, "Update without key skipped");
                    continue;
                };
                if let Some(existing) = context.find_by_key(&key).await? {
                    context.apply_current_values(existing, &transient);
                } else {
                    tracing::debug!(entity_set = Self::ENTITY_SET_NAME, ?key, "No row to update");
                }
            }
            context.save_changes().await?;
        }

        Ok(DataSourceResult::from_model_state(model_state))
    }

    /// Delete the stored rows matching each view model's key in one save.
    ///
    /// Keys without a stored row are skipped.
    async fn delete_many(
        db: &DatabaseConnection,
        _identity: &Identity,
        _request: &DataSourceRequest,
        models: Option<Vec<Option<Self::ViewModel>>>,
        model_state: ModelState,
    ) -> Result<DataSourceResult<Self::ViewModel>, ApiError> {
        if let Some(view_models) = models
            && model_state.is_valid()
        {
            let mut context = ObjectContext::<Self::ActiveModel>::new(db);
            for view_model in view_models.into_iter().flatten() {
                let mut transient = context.create_object();
                view_model.update_model(&mut transient);

                let Some(key) = context.create_entity_key(&transient) else {
                    tracing::debug!(entity_set = Self::ENTITY_SET_NAME, "Delete without key skipped");
                    continue;
                };
                if let Some(existing) = context.find_by_key(&key).await? {
                    context.delete_object(existing);
                } else {
                    tracing::debug!(entity_set = Self::ENTITY_SET_NAME, ?key, "No row to delete");
                }
            }
            context.save_changes().await?;
        }

        Ok(DataSourceResult::from_model_state(model_state))
    }

    async fn insert(
        db: &DatabaseConnection,
        identity: &Identity,
        request: &DataSourceRequest,
        model: Option<Self::ViewModel>,
        model_state: ModelState,
    ) -> Result<DataSourceResult<Self::ViewModel>, ApiError> {
        Self::insert_many(db, identity, request, Some(vec![model]), model_state).await
    }

    async fn update(
        db: &DatabaseConnection,
        identity: &Identity,
        request: &DataSourceRequest,
        model: Option<Self::ViewModel>,
        model_state: ModelState,
    ) -> Result<DataSourceResult<Self::ViewModel>, ApiError> {
        Self::update_many(db, identity, request, Some(vec![model]), model_state).await
    }

    async fn delete(
        db: &DatabaseConnection,
        identity: &Identity,
        request: &DataSourceRequest,
        model: Option<Self::ViewModel>,
        model_state: ModelState,
    ) -> Result<DataSourceResult<Self::ViewModel>, ApiError> {
        Self::delete_many(db, identity, request, Some(vec![model]), model_state).await
    }
}

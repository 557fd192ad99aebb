use axum::{
    Form, Json, Router,
    extract::{Query, State},
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use utoipa::IntoParams;
use utoipa::openapi::path::{HttpMethod, OperationBuilder, ParameterIn, PathItem, PathsBuilder};
use utoipa::openapi::{InfoBuilder, OpenApi, OpenApiBuilder, ResponseBuilder};

use crate::binding::{GridModel, GridModels};
use crate::core::GridResource;
use crate::errors::ApiError;
use crate::grid::{DataSourceRequest, DataSourceResult, GridQuery};
use crate::identity::Identity;

type GridResponse<T> = Result<Json<DataSourceResult<<T as GridResource>::ViewModel>>, ApiError>;

/// Read grid data. Parameters come from the query string on `GET` and from
/// the form body on `POST`.
pub async fn select<T>(
    State(db): State<DatabaseConnection>,
    Form(query): Form<GridQuery>,
) -> GridResponse<T>
where
    T: GridResource,
{
    let request = DataSourceRequest::try_from(query)?;
    T::select(&db, &request).await.map(Json)
}

pub async fn insert<T>(
    State(db): State<DatabaseConnection>,
    identity: Identity,
    Query(query): Query<GridQuery>,
    GridModel { model, model_state }: GridModel<T::ViewModel>,
) -> GridResponse<T>
where
    T: GridResource,
{
    let request = DataSourceRequest::try_from(query)?;
    T::insert(&db, &identity, &request, model, model_state).await.map(Json)
}

pub async fn insert_many<T>(
    State(db): State<DatabaseConnection>,
    identity: Identity,
    Query(query): Query<GridQuery>,
    GridModels { models, model_state }: GridModels<T::ViewModel>,
) -> GridResponse<T>
where
    T: GridResource,
{
    let request = DataSourceRequest::try_from(query)?;
    T::insert_many(&db, &identity, &request, models, model_state).await.map(Json)
}

pub async fn update<T>(
    State(db): State<DatabaseConnection>,
    identity: Identity,
    Query(query): Query<GridQuery>,
    GridModel { model, model_state }: GridModel<T::ViewModel>,
) -> GridResponse<T>
where
    T: GridResource,
{
    let request = DataSourceRequest::try_from(query)?;
    T::update(&db, &identity, &request, model, model_state).await.map(Json)
}

pub async fn update_many<T>(
    State(db): State<DatabaseConnection>,
    identity: Identity,
    Query(query): Query<GridQuery>,
    GridModels { models, model_state }: GridModels<T::ViewModel>,
) -> GridResponse<T>
where
    T: GridResource,
{
    let request = DataSourceRequest::try_from(query)?;
    T::update_many(&db, &identity, &request, models, model_state).await.map(Json)
}

pub async fn delete<T>(
    State(db): State<DatabaseConnection>,
    identity: Identity,
    Query(query): Query<GridQuery>,
    GridModel { model, model_state }: GridModel<T::ViewModel>,
) -> GridResponse<T>
where
    T: GridResource,
{
    let request = DataSourceRequest::try_from(query)?;
    T::delete(&db, &identity, &request, model, model_state).await.map(Json)
}

pub async fn delete_many<T>(
    State(db): State<DatabaseConnection>,
    identity: Identity,
    Query(query): Query<GridQuery>,
    GridModels { models, model_state }: GridModels<T::ViewModel>,
) -> GridResponse<T>
where
    T: GridResource,
{
    let request = DataSourceRequest::try_from(query)?;
    T::delete_many(&db, &identity, &request, models, model_state).await.map(Json)
}

/// All grid endpoints of one resource, ready to be nested under a prefix.
///
/// ```rust,ignore
/// let app = Router::new()
///     .nest("/products", grid_router::<ProductGrid>())
///     .with_state(db);
/// ```
pub fn grid_router<T>() -> Router<DatabaseConnection>
where
    T: GridResource,
{
    Router::new()
        .route("/select", get(select::<T>).post(select::<T>))
        .route("/insert", post(insert::<T>))
        .route("/insert_many", post(insert_many::<T>))
        .route("/update", post(update::<T>))
        .route("/update_many", post(update_many::<T>))
        .route("/delete", post(delete::<T>))
        .route("/delete_many", post(delete_many::<T>))
}

/// OpenAPI description of the endpoints `grid_router::<T>()` serves when
/// nested under `base_path`.
#[must_use]
pub fn grid_openapi<T>(base_path: &str) -> OpenApi
where
    T: GridResource,
{
    let operation = |name: &str, summary: String| {
        OperationBuilder::new()
            .operation_id(Some(format!("{name}_{}", T::ENTITY_SET_NAME)))
            .summary(Some(summary))
            .description(Some(T::RESOURCE_DESCRIPTION))
            .tag(T::ENTITY_SET_NAME)
            .parameters(Some(GridQuery::into_params(|| Some(ParameterIn::Query))))
            .response(
                "200",
                ResponseBuilder::new()
                    .description("Grid data source result")
                    .build(),
            )
            .build()
    };

    let read = operation("select", format!("Read {} grid data", T::ENTITY_SET_NAME));
    let mut select_item = PathItem::new(HttpMethod::Get, read.clone());
    select_item.post = Some(read);

    let mut paths = PathsBuilder::new().path(format!("{base_path}/select"), select_item);
    for (name, verb) in [
        ("insert", "Insert"),
        ("update", "Update"),
        ("delete", "Delete"),
    ] {
        paths = paths
            .path(
                format!("{base_path}/{name}"),
                PathItem::new(
                    HttpMethod::Post,
                    operation(name, format!("{verb} one {} row", T::ENTITY_SET_NAME)),
                ),
            )
            .path(
                format!("{base_path}/{name}_many"),
                PathItem::new(
                    HttpMethod::Post,
                    operation(
                        &format!("{name}_many"),
                        format!("{verb} a batch of {} rows", T::ENTITY_SET_NAME),
                    ),
                ),
            );
    }

    OpenApiBuilder::new()
        .info(
            InfoBuilder::new()
                .title(format!("{} grid", T::ENTITY_SET_NAME))
                .version(env!("CARGO_PKG_VERSION"))
                .build(),
        )
        .paths(paths.build())
        .build()
}

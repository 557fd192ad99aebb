#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use gridcrate::{CurrentUser, grid_router};
use sea_orm::{Database, DatabaseConnection, DbErr};
use sea_orm_migration::prelude::*;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

pub mod product_entity;
pub mod tag_entity;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

pub async fn setup_test_db() -> Result<DatabaseConnection, DbErr> {
    init_tracing();
    let db = Database::connect("sqlite::memory:").await?;

    // Run migrations
    Migrator::up(&db, None).await?;

    Ok(db)
}

pub fn setup_test_app(db: DatabaseConnection) -> Router {
    Router::new()
        .nest("/products", grid_router::<product_entity::ProductGrid>())
        .nest("/tags", grid_router::<tag_entity::TagGrid>())
        .with_state(db)
}

/// POST a JSON body, as `user` when given.
pub async fn post_json(
    app: &Router,
    uri: &str,
    body: &Value,
    user: Option<Uuid>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(id) = user {
        builder = builder.extension(CurrentUser { id });
    }
    let request = builder
        .body(Body::from(serde_json::to_string(body).unwrap()))
        .unwrap();
    send(app, request).await
}

/// POST a form body, as `user` when given.
pub async fn post_form(app: &Router, uri: &str, body: String, user: Option<Uuid>) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/x-www-form-urlencoded");
    if let Some(id) = user {
        builder = builder.extension(CurrentUser { id });
    }
    send(app, builder.body(Body::from(body)).unwrap()).await
}

pub async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

/// Raw response body, for byte-level comparisons.
pub async fn post_json_raw(app: &Router, uri: &str, body: &Value, user: Option<Uuid>) -> (StatusCode, Vec<u8>) {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(id) = user {
        builder = builder.extension(CurrentUser { id });
    }
    let request = builder
        .body(Body::from(serde_json::to_string(body).unwrap()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body).into_owned()))
    };
    (status, json)
}

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(CreateProductTable), Box::new(CreateTagTable)]
    }
}

pub struct CreateProductTable;

#[async_trait::async_trait]
impl MigrationName for CreateProductTable {
    fn name(&self) -> &'static str {
        "m20240101_000001_create_product_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for CreateProductTable {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let table = Table::create()
            .table(Products::Table)
            .if_not_exists()
            .col(
                ColumnDef::new(Products::Id)
                    .integer()
                    .not_null()
                    .auto_increment()
                    .primary_key(),
            )
            .col(ColumnDef::new(Products::Name).string().not_null())
            .col(
                ColumnDef::new(Products::Category)
                    .string()
                    .not_null()
                    .default(""),
            )
            .col(ColumnDef::new(Products::Price).double().not_null())
            .col(
                ColumnDef::new(Products::Archived)
                    .boolean()
                    .not_null()
                    .default(false),
            )
            .col(ColumnDef::new(Products::CreatedBy).uuid().not_null())
            .col(
                ColumnDef::new(Products::CreatedOn)
                    .timestamp_with_time_zone()
                    .not_null(),
            )
            .col(ColumnDef::new(Products::ModifiedBy).uuid().not_null())
            .col(
                ColumnDef::new(Products::ModifiedOn)
                    .timestamp_with_time_zone()
                    .not_null(),
            )
            .to_owned();

        manager.create_table(table).await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Products::Table).to_owned())
            .await
    }
}

pub struct CreateTagTable;

#[async_trait::async_trait]
impl MigrationName for CreateTagTable {
    fn name(&self) -> &'static str {
        "m20240101_000002_create_tag_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for CreateTagTable {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let table = Table::create()
            .table(Tags::Table)
            .if_not_exists()
            .col(ColumnDef::new(Tags::Id).uuid().not_null().primary_key())
            .col(
                ColumnDef::new(Tags::Name)
                    .string()
                    .not_null()
                    .unique_key(),
            )
            .col(ColumnDef::new(Tags::Color).string().null())
            .to_owned();

        manager.create_table(table).await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Tags::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Products {
    Table,
    Id,
    Name,
    Category,
    Price,
    Archived,
    CreatedBy,
    CreatedOn,
    ModifiedBy,
    ModifiedOn,
}

#[derive(DeriveIden)]
enum Tags {
    Table,
    Id,
    Name,
    Color,
}

//! # gridcrate
//!
//! Generic create, read, update and delete endpoints for data grids that speak
//! the Kendo data source protocol, on top of Axum and Sea-ORM.
//!
//! Implement [`GridResource`] for an entity, give it a view model implementing
//! [`ViewModel`], and mount [`grid_router`]:
//!
//! ```rust,ignore
//! struct ProductGrid;
//!
//! impl GridResource for ProductGrid {
//!     type Entity = product::Entity;
//!     type Model = product::Model;
//!     type ActiveModel = product::ActiveModel;
//!     type Column = product::Column;
//!     type ViewModel = ProductViewModel;
//!
//!     const ENTITY_SET_NAME: &'static str = "products";
//!
//!     fn initializer(model: product::Model) -> ProductViewModel {
//!         ProductViewModel::from(model)
//!     }
//!
//!     fn grid_columns() -> Vec<(&'static str, product::Column)> {
//!         vec![("name", product::Column::Name), ("price", product::Column::Price)]
//!     }
//! }
//!
//! let app = Router::new()
//!     .nest("/products", grid_router::<ProductGrid>())
//!     .with_state(db);
//! ```

pub mod binding;
pub mod context;
pub mod core;
pub mod errors;
pub mod grid;
pub mod identity;
pub mod routes;
pub mod validation;

pub use binding::{GridModel, GridModels};
pub use context::{EntityKey, ObjectContext};
pub use crate::core::{Auditable, GridResource, ViewModel};
pub use errors::ApiError;
pub use grid::{DataSourceRequest, DataSourceResult, GridQuery};
pub use identity::{CurrentUser, Identity};
pub use routes::{grid_openapi, grid_router};
pub use validation::{ModelState, Validatable, ValidationError, ValidationErrors};

pub use serde_with;

use chrono::{DateTime, Utc};
use gridcrate::validation::{ValidationErrors, validators};
use gridcrate::{Auditable, GridResource, Validatable, ViewModel};
use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use sea_orm::{Condition, EntityTrait};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub category: String,
    pub price: f64,
    pub archived: bool,
    pub created_by: Uuid,
    pub created_on: DateTimeUtc,
    pub modified_by: Uuid,
    pub modified_on: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// What the product grid reads and posts. Audit fields are optional on the
/// way in; they are only written when set.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductViewModel {
    #[serde(default)]
    pub id: i32,
    pub name: String,
    #[serde(default)]
    pub category: String,
    pub price: f64,
    #[serde(default)]
    pub created_by: Option<Uuid>,
    #[serde(default)]
    pub created_on: Option<DateTime<Utc>>,
    #[serde(default)]
    pub modified_by: Option<Uuid>,
    #[serde(default)]
    pub modified_on: Option<DateTime<Utc>>,
}

impl From<Model> for ProductViewModel {
    fn from(model: Model) -> Self {
        let mut view_model = Self::default();
        view_model.copy_model(&model);
        view_model
    }
}

impl Validatable for ProductViewModel {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Err(e) = validators::validate_length("name", &self.name, Some(1), Some(100)) {
            errors.add(e);
        }
        if let Err(e) = validators::validate_range("price", self.price, Some(0.0), None) {
            errors.add(e);
        }
        errors.result()
    }
}

impl Auditable for ProductViewModel {
    fn set_created_by(&mut self, user: Uuid) {
        self.created_by = Some(user);
    }

    fn set_created_on(&mut self, at: DateTime<Utc>) {
        self.created_on = Some(at);
    }

    fn set_modified_by(&mut self, user: Uuid) {
        self.modified_by = Some(user);
    }

    fn set_modified_on(&mut self, at: DateTime<Utc>) {
        self.modified_on = Some(at);
    }
}

impl ViewModel<Model, ActiveModel> for ProductViewModel {
    fn copy_model(&mut self, model: &Model) {
        self.id = model.id;
        self.name.clone_from(&model.name);
        self.category.clone_from(&model.category);
        self.price = model.price;
        self.created_by = Some(model.created_by);
        self.created_on = Some(model.created_on);
        self.modified_by = Some(model.modified_by);
        self.modified_on = Some(model.modified_on);
    }

    fn update_model(&self, active_model: &mut ActiveModel) {
        active_model.id = Set(self.id);
        active_model.name = Set(self.name.clone());
        active_model.category = Set(self.category.clone());
        active_model.price = Set(self.price);
        if let Some(created_by) = self.created_by {
            active_model.created_by = Set(created_by);
        }
        if let Some(created_on) = self.created_on {
            active_model.created_on = Set(created_on);
        }
        if let Some(modified_by) = self.modified_by {
            active_model.modified_by = Set(modified_by);
        }
        if let Some(modified_on) = self.modified_on {
            active_model.modified_on = Set(modified_on);
        }
    }

    fn as_auditable_mut(&mut self) -> Option<&mut dyn Auditable> {
        Some(self)
    }
}

pub struct ProductGrid;

impl GridResource for ProductGrid {
    type Entity = Entity;
    type Model = Model;
    type ActiveModel = ActiveModel;
    type Column = Column;
    type ViewModel = ProductViewModel;

    const ENTITY_SET_NAME: &'static str = "products";
    const RESOURCE_DESCRIPTION: &'static str = "Products sold in the shop. Archived products are hidden.";

    fn where_condition() -> Condition {
        Condition::all().add(Column::Archived.eq(false))
    }

    fn initializer(model: Model) -> ProductViewModel {
        ProductViewModel::from(model)
    }

    fn grid_columns() -> Vec<(&'static str, Column)> {
        vec![
            ("id", Column::Id),
            ("name", Column::Name),
            ("category", Column::Category),
            ("price", Column::Price),
            ("created_on", Column::CreatedOn),
            ("modified_on", Column::ModifiedOn),
        ]
    }
}

/// Every stored product, archived ones included.
pub async fn all_rows(db: &DatabaseConnection) -> Vec<Model> {
    Entity::find().all(db).await.expect("Failed to load products")
}

use gridcrate::{GridResource, Validatable, ViewModel};
use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

// Keys are chosen by the client, so inserts must keep them.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "tags")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub name: String,
    pub color: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagViewModel {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
}

impl Validatable for TagViewModel {}

impl ViewModel<Model, ActiveModel> for TagViewModel {
    fn copy_model(&mut self, model: &Model) {
        self.id = model.id;
        self.name.clone_from(&model.name);
        self.color.clone_from(&model.color);
    }

    fn update_model(&self, active_model: &mut ActiveModel) {
        active_model.id = Set(self.id);
        active_model.name = Set(self.name.clone());
        active_model.color = Set(self.color.clone());
    }
}

pub struct TagGrid;

impl GridResource for TagGrid {
    type Entity = Entity;
    type Model = Model;
    type ActiveModel = ActiveModel;
    type Column = Column;
    type ViewModel = TagViewModel;

    const ENTITY_SET_NAME: &'static str = "tags";

    fn initializer(model: Model) -> TagViewModel {
        let mut view_model = TagViewModel::default();
        view_model.copy_model(&model);
        view_model
    }

    fn grid_columns() -> Vec<(&'static str, Column)> {
        vec![("name", Column::Name), ("color", Column::Color)]
    }
}

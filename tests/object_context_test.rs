use chrono::Utc;
use gridcrate::ObjectContext;
use gridcrate::context::clear_generated_keys;
use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::{DatabaseConnection, EntityTrait, Value};
use uuid::Uuid;

mod common;
use common::product_entity::{self, ActiveModel, Entity as Product};
use common::setup_test_db;
use common::tag_entity;

fn new_product(name: &str, price: f64) -> ActiveModel {
    let user = Uuid::new_v4();
    let now = Utc::now();
    ActiveModel {
        name: Set(name.to_string()),
        category: Set("tools".to_string()),
        price: Set(price),
        created_by: Set(user),
        created_on: Set(now),
        modified_by: Set(user),
        modified_on: Set(now),
        ..Default::default()
    }
}

async fn seed(db: &DatabaseConnection, names: &[&str]) -> Vec<product_entity::Model> {
    let mut context = ObjectContext::<ActiveModel>::new(db);
    for name in names {
        context.add_object(new_product(name, 1.0));
    }
    context.save_changes().await.expect("Failed to seed products")
}

#[tokio::test]
async fn test_empty_context_saves_nothing() {
    let db = setup_test_db().await.expect("Failed to setup test database");
    let context = ObjectContext::<ActiveModel>::new(&db);

    assert_eq!(context.pending_changes(), 0);
    assert!(context.save_changes().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_nothing_is_written_before_save() {
    let db = setup_test_db().await.expect("Failed to setup test database");
    let mut context = ObjectContext::<ActiveModel>::new(&db);
    context.add_object(new_product("Saw", 1.0));
    context.add_object(new_product("Rake", 2.0));

    assert_eq!(context.pending_changes(), 2);
    assert!(Product::find().all(&db).await.unwrap().is_empty());

    let inserted = context.save_changes().await.unwrap();
    let names: Vec<_> = inserted.iter().map(|model| model.name.as_str()).collect();
    assert_eq!(names, vec!["Saw", "Rake"]);
    assert!(inserted[0].id < inserted[1].id);
    assert_eq!(Product::find().all(&db).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_entity_key_requires_every_key_column() {
    let db = setup_test_db().await.expect("Failed to setup test database");
    let context = ObjectContext::<ActiveModel>::new(&db);

    let mut transient = context.create_object();
    assert!(context.create_entity_key(&transient).is_none());

    transient.id = Set(7);
    let key = context.create_entity_key(&transient).unwrap();
    assert_eq!(key.values(), vec![&Value::Int(Some(7))]);
}

#[tokio::test]
async fn test_find_by_key() {
    let db = setup_test_db().await.expect("Failed to setup test database");
    let seeded = seed(&db, &["Saw", "Rake"]).await;
    let context = ObjectContext::<ActiveModel>::new(&db);

    let mut transient = context.create_object();
    transient.id = Set(seeded[1].id);
    let key = context.create_entity_key(&transient).unwrap();
    assert_eq!(context.find_by_key(&key).await.unwrap(), Some(seeded[1].clone()));

    transient.id = Set(seeded[1].id + 100);
    let key = context.create_entity_key(&transient).unwrap();
    assert!(context.find_by_key(&key).await.unwrap().is_none());
}

#[tokio::test]
async fn test_apply_current_values_keeps_unset_columns() {
    let db = setup_test_db().await.expect("Failed to setup test database");
    let existing = seed(&db, &["Saw"]).await.remove(0);

    let mut context = ObjectContext::<ActiveModel>::new(&db);
    let mut transient = context.create_object();
    transient.id = Set(existing.id);
    transient.price = Set(9.5);
    context.apply_current_values(existing.clone(), &transient);
    context.save_changes().await.unwrap();

    let stored = Product::find_by_id(existing.id).one(&db).await.unwrap().unwrap();
    assert!((stored.price - 9.5).abs() < f64::EPSILON);
    assert_eq!(stored.name, existing.name);
    assert_eq!(stored.created_by, existing.created_by);
    assert_eq!(stored.modified_on, existing.modified_on);
}

#[tokio::test]
async fn test_unchanged_values_save_cleanly() {
    let db = setup_test_db().await.expect("Failed to setup test database");
    let existing = seed(&db, &["Saw"]).await.remove(0);

    let mut context = ObjectContext::<ActiveModel>::new(&db);
    let transient: ActiveModel = existing.clone().into();
    context.apply_current_values(existing.clone(), &transient);
    assert_eq!(context.pending_changes(), 1);
    assert!(context.save_changes().await.unwrap().is_empty());

    let stored = Product::find_by_id(existing.id).one(&db).await.unwrap().unwrap();
    assert_eq!(stored, existing);
}

#[tokio::test]
async fn test_delete_object() {
    let db = setup_test_db().await.expect("Failed to setup test database");
    let seeded = seed(&db, &["Saw", "Rake"]).await;

    let mut context = ObjectContext::<ActiveModel>::new(&db);
    context.delete_object(seeded[0].clone());
    context.save_changes().await.unwrap();

    let remaining = Product::find().all(&db).await.unwrap();
    assert_eq!(remaining, vec![seeded[1].clone()]);
}

#[tokio::test]
async fn test_failed_change_rolls_back_the_batch() {
    let db = setup_test_db().await.expect("Failed to setup test database");
    let mut context = ObjectContext::<tag_entity::ActiveModel>::new(&db);
    for name in ["sale", "new", "sale"] {
        context.add_object(tag_entity::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            color: Set(None),
        });
    }

    assert!(context.save_changes().await.is_err());
    assert!(tag_entity::Entity::find().all(&db).await.unwrap().is_empty());
}

#[test]
fn test_generated_keys_are_cleared_only_when_auto_increment() {
    let mut product = new_product("Saw", 1.0);
    product.id = Set(42);
    clear_generated_keys(&mut product);
    assert_eq!(product.id, NotSet);

    let id = Uuid::new_v4();
    let mut tag = tag_entity::ActiveModel {
        id: Set(id),
        name: Set("sale".to_string()),
        color: Set(None),
    };
    clear_generated_keys(&mut tag);
    assert_eq!(tag.id, Set(id));
}

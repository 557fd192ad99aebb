//! # Unit of Work
//!
//! An [`ObjectContext`] buffers inserts, updates and deletes for one entity
//! and writes them in a single transaction when [`ObjectContext::save_changes`]
//! is called. Nothing is written before that; a context that is dropped unsaved
//! leaves storage untouched.
//!
//! ```rust,ignore
//! let mut context = ObjectContext::<product::ActiveModel>::new(&db);
//! let mut active = context.create_object();
//! active.name = Set("Saw".to_owned());
//! context.add_object(active);
//! let inserted = context.save_changes().await?;
//! ```

use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ActiveValue, ColumnTrait, Condition,
    DatabaseConnection, DbErr, EntityTrait, IdenStatic, IntoActiveModel, Iterable, PrimaryKeyToColumn,
    PrimaryKeyTrait, QueryFilter, TransactionTrait, Value,
};
use std::fmt;

type ModelOf<A> = <<A as ActiveModelTrait>::Entity as EntityTrait>::Model;
type ColumnOf<A> = <<A as ActiveModelTrait>::Entity as EntityTrait>::Column;

/// Primary key values of one row, in primary key column order.
pub struct EntityKey<E: EntityTrait> {
    values: Vec<(E::Column, Value)>,
}

impl<E: EntityTrait> EntityKey<E> {
    #[must_use]
    pub fn values(&self) -> Vec<&Value> {
        self.values.iter().map(|(_, value)| value).collect()
    }

    /// Condition matching exactly the row this key identifies.
    #[must_use]
    pub fn condition(&self) -> Condition {
        self.values
            .iter()
            .fold(Condition::all(), |condition, (column, value)| {
                condition.add(column.eq(value.clone()))
            })
    }
}

impl<E: EntityTrait> fmt::Debug for EntityKey<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.values.iter().map(|(_, value)| value)).finish()
    }
}

fn is_key_column<A: ActiveModelTrait>(column: ColumnOf<A>) -> bool {
    <A::Entity as EntityTrait>::PrimaryKey::iter()
        .any(|key| key.into_column().as_str() == column.as_str())
}

/// Unset store-generated key columns so the database assigns them on insert.
///
/// Keys the client supplies (anything not auto-increment) are kept.
pub fn clear_generated_keys<A: ActiveModelTrait>(active_model: &mut A) {
    if <<A::Entity as EntityTrait>::PrimaryKey as PrimaryKeyTrait>::auto_increment() {
        for key in <A::Entity as EntityTrait>::PrimaryKey::iter() {
            active_model.not_set(key.into_column());
        }
    }
}

enum Change<A> {
    Added(A),
    Modified(A),
    Deleted(A),
}

/// Buffered changes to one entity set.
pub struct ObjectContext<'db, A> {
    db: &'db DatabaseConnection,
    changes: Vec<Change<A>>,
}

impl<'db, A> ObjectContext<'db, A>
where
    A: ActiveModelTrait + ActiveModelBehavior + Send + Sync + 'static,
    ModelOf<A>: IntoActiveModel<A> + Send + Sync,
{
    #[must_use]
    pub const fn new(db: &'db DatabaseConnection) -> Self {
        Self {
            db,
            changes: Vec::new(),
        }
    }

    /// A fresh active model with every column unset.
    #[must_use]
    pub fn create_object(&self) -> A {
        A::new()
    }

    /// Derive the key of `active_model`, or `None` when a key column is unset.
    #[must_use]
    pub fn create_entity_key(&self, active_model: &A) -> Option<EntityKey<A::Entity>> {
        let mut values = Vec::new();
        for key in <A::Entity as EntityTrait>::PrimaryKey::iter() {
            let column = key.into_column();
            match active_model.get(column) {
                ActiveValue::Set(value) | ActiveValue::Unchanged(value) => {
                    values.push((column, value));
                }
                ActiveValue::NotSet => return None,
            }
        }
        Some(EntityKey { values })
    }

    /// Look up the stored row for `key`.
    ///
    /// # Errors
    /// Returns the storage error if the lookup fails.
    pub async fn find_by_key(&self, key: &EntityKey<A::Entity>) -> Result<Option<ModelOf<A>>, DbErr> {
        <A::Entity as EntityTrait>::find()
            .filter(key.condition())
            .one(self.db)
            .await
    }

    /// Buffer an insert.
    pub fn add_object(&mut self, active_model: A) {
        self.changes.push(Change::Added(active_model));
    }

    /// Buffer an update of `existing` with every non-key column `current` sets.
    ///
    /// Columns `current` leaves unset keep their stored value. When nothing
    /// differs the row is not written.
    pub fn apply_current_values(&mut self, existing: ModelOf<A>, current: &A) {
        let mut target: A = existing.into_active_model();
        for column in ColumnOf::<A>::iter() {
            if is_key_column::<A>(column) {
                continue;
            }
            let value = match current.get(column) {
                ActiveValue::Set(value) | ActiveValue::Unchanged(value) => value,
                ActiveValue::NotSet => continue,
            };
            if target.get(column).into_value().as_ref() != Some(&value) {
                target.set(column, value);
            }
        }
        self.changes.push(Change::Modified(target));
    }

    /// Buffer a delete of `existing`.
    pub fn delete_object(&mut self, existing: ModelOf<A>) {
        self.changes.push(Change::Deleted(existing.into_active_model()));
    }

    #[must_use]
    pub fn pending_changes(&self) -> usize {
        self.changes.len()
    }

    /// Write every buffered change in one transaction, in the order buffered.
    ///
    /// Returns the inserted rows as stored, in insertion order, so generated
    /// keys and defaults can be copied back.
    ///
    /// # Errors
    /// Returns the first storage error; the transaction is rolled back and no
    /// change of the batch persists.
    pub async fn save_changes(self) -> Result<Vec<ModelOf<A>>, DbErr> {
        if self.changes.is_empty() {
            return Ok(Vec::new());
        }

        let txn = self.db.begin().await?;
        let mut inserted = Vec::new();
        let (mut updated, mut deleted) = (0_usize, 0_u64);
        for change in self.changes {
            match change {
                Change::Added(active_model) => inserted.push(active_model.insert(&txn).await?),
                Change::Modified(active_model) => {
                    if active_model.is_changed() {
                        active_model.update(&txn).await?;
                        updated += 1;
                    }
                }
                Change::Deleted(active_model) => {
                    deleted += active_model.delete(&txn).await?.rows_affected;
                }
            }
        }
        txn.commit().await?;

        tracing::debug!(
            inserted = inserted.len(),
            updated,
            deleted,
            "Saved object context"
        );
        Ok(inserted)
    }
}

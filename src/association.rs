use std::marker::PhantomData;

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel,
    ModelTrait, PaginatorTrait, QueryFilter, Value,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::error::RepoResult;
use crate::repository::primary_key_column;

/// Type-erased handle to one named relationship of `E`.
///
/// Related rows cross the boundary as JSON (a single object or an array
/// of objects in the related entity's shape); entity models in this
/// stack are serde-capable, so nothing extra is required of callers.
#[async_trait]
pub trait AssociationOps<E, C>: Send + Sync
where
    E: EntityTrait,
    C: ConnectionTrait,
{
    async fn append(&self, db: &C, owner: &E::Model, rows: JsonValue) -> RepoResult<()>;
    async fn replace(&self, db: &C, owner: &E::Model, rows: JsonValue) -> RepoResult<()>;
    async fn remove(&self, db: &C, owner: &E::Model, rows: JsonValue) -> RepoResult<()>;
    async fn clear(&self, db: &C, owner: &E::Model) -> RepoResult<()>;
    async fn count(&self, db: &C, owner: &E::Model) -> RepoResult<u64>;
    async fn find(&self, db: &C, owner: &E::Model) -> RepoResult<JsonValue>;
}

/// Registry of an entity's named relationships.
///
/// Implementations match relationship names to `static` descriptors,
/// which keeps the operate-by-name ergonomics without any runtime
/// reflection:
///
/// ```ignore
/// impl AssociatedEntity for user::Entity {
///     fn association<C: ConnectionTrait>(
///         name: &str,
///     ) -> Option<&'static dyn AssociationOps<Self, C>> {
///         static POSTS: Association<user::Entity, post::Entity, post::ActiveModel> =
///             Association::has_many(post::Column::UserId);
///         match name {
///             "posts" => Some(&POSTS),
///             _ => None,
///         }
///     }
/// }
/// ```
pub trait AssociatedEntity: EntityTrait {
    fn association<C: ConnectionTrait>(name: &str) -> Option<&'static dyn AssociationOps<Self, C>>;
}

#[derive(Debug, Clone, Copy)]
enum AssociationKind {
    HasOne,
    HasMany,
}

/// Descriptor for a has-one or has-many link from owner entity `E` to
/// child entity `R` (with active model `A`), keyed by the child's
/// foreign-key column back to the owner.
pub struct Association<E, R, A>
where
    E: EntityTrait,
    R: EntityTrait,
{
    kind: AssociationKind,
    foreign_key: R::Column,
    marker: PhantomData<(E, A)>,
}

impl<E, R, A> Association<E, R, A>
where
    E: EntityTrait,
    R: EntityTrait,
{
    pub const fn has_one(foreign_key: R::Column) -> Self {
        Self {
            kind: AssociationKind::HasOne,
            foreign_key,
            marker: PhantomData,
        }
    }

    pub const fn has_many(foreign_key: R::Column) -> Self {
        Self {
            kind: AssociationKind::HasMany,
            foreign_key,
            marker: PhantomData,
        }
    }
}

#[async_trait]
impl<E, R, A, C> AssociationOps<E, C> for Association<E, R, A>
where
    E: EntityTrait,
    E::Model: Sync,
    R: EntityTrait,
    R::Model: IntoActiveModel<A> + Serialize + DeserializeOwned + Send + Sync,
    A: ActiveModelTrait<Entity = R> + Send + Sync,
    C: ConnectionTrait,
{
    async fn append(&self, db: &C, owner: &E::Model, rows: JsonValue) -> RepoResult<()> {
        if matches!(self.kind, AssociationKind::HasOne) {
            // a has-one holds a single row; drop the current one first
            self.clear(db, owner).await?;
        }

        let models = parse_rows::<R>(rows)?;
        if models.is_empty() {
            return Ok(());
        }

        let owner_key = owner_key::<E>(owner);
        let child_pk = primary_key_column::<R>();
        let mut inserts = Vec::with_capacity(models.len());
        for model in models {
            let mut active = model.into_active_model();
            if pk_is_unset(&active.get(child_pk)) {
                // zero or absent child key: let the store assign one
                active.not_set(child_pk);
            }
            active.set(self.foreign_key, owner_key.clone());
            inserts.push(active);
        }

        R::insert_many(inserts).exec_without_returning(db).await?;
        Ok(())
    }

    async fn replace(&self, db: &C, owner: &E::Model, rows: JsonValue) -> RepoResult<()> {
        self.clear(db, owner).await?;
        self.append(db, owner, rows).await
    }

    async fn remove(&self, db: &C, owner: &E::Model, rows: JsonValue) -> RepoResult<()> {
        let models = parse_rows::<R>(rows)?;
        if models.is_empty() {
            return Ok(());
        }

        let child_pk = primary_key_column::<R>();
        let keys: Vec<Value> = models.iter().map(|model| model.get(child_pk)).collect();
        R::delete_many()
            .filter(child_pk.is_in(keys))
            .filter(self.foreign_key.eq(owner_key::<E>(owner)))
            .exec(db)
            .await?;
        Ok(())
    }

    async fn clear(&self, db: &C, owner: &E::Model) -> RepoResult<()> {
        R::delete_many()
            .filter(self.foreign_key.eq(owner_key::<E>(owner)))
            .exec(db)
            .await?;
        Ok(())
    }

    async fn count(&self, db: &C, owner: &E::Model) -> RepoResult<u64> {
        let total = R::find()
            .filter(self.foreign_key.eq(owner_key::<E>(owner)))
            .count(db)
            .await?;
        Ok(total)
    }

    async fn find(&self, db: &C, owner: &E::Model) -> RepoResult<JsonValue> {
        let rows = R::find()
            .filter(self.foreign_key.eq(owner_key::<E>(owner)))
            .all(db)
            .await?;
        match self.kind {
            AssociationKind::HasMany => Ok(serde_json::to_value(rows)?),
            AssociationKind::HasOne => match rows.into_iter().next() {
                Some(row) => Ok(serde_json::to_value(row)?),
                None => Ok(JsonValue::Null),
            },
        }
    }
}

fn owner_key<E: EntityTrait>(owner: &E::Model) -> Value {
    owner.get(primary_key_column::<E>())
}

fn parse_rows<R>(rows: JsonValue) -> RepoResult<Vec<R::Model>>
where
    R: EntityTrait,
    R::Model: DeserializeOwned,
{
    let models = match rows {
        JsonValue::Array(items) => items
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<_>, _>>()?,
        JsonValue::Null => Vec::new(),
        other => vec![serde_json::from_value(other)?],
    };
    Ok(models)
}

fn pk_is_unset(value: &ActiveValue<Value>) -> bool {
    match value {
        ActiveValue::Set(value) | ActiveValue::Unchanged(value) => zero_scalar(value),
        ActiveValue::NotSet => true,
    }
}

fn zero_scalar(value: &Value) -> bool {
    match value {
        Value::TinyInt(Some(0))
        | Value::SmallInt(Some(0))
        | Value::Int(Some(0))
        | Value::BigInt(Some(0))
        | Value::TinyUnsigned(Some(0))
        | Value::SmallUnsigned(Some(0))
        | Value::Unsigned(Some(0))
        | Value::BigUnsigned(Some(0)) => true,
        Value::String(Some(text)) => text.is_empty(),
        Value::Uuid(Some(id)) => id.is_nil(),
        other => *other == other.as_null(),
    }
}

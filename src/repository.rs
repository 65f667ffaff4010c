use std::collections::HashMap;
use std::marker::PhantomData;

use sea_orm::sea_query::{Alias, Expr, OnConflict};
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ActiveValue, ColumnTrait, ConnectionTrait,
    DatabaseConnection, EntityTrait, IdenStatic, IntoActiveModel, Iterable,
    PaginatorTrait, PrimaryKeyToColumn, QueryFilter, QueryOrder, QuerySelect, Select,
};
use serde_json::Value as JsonValue;

use crate::association::{AssociatedEntity, AssociationOps};
use crate::error::{RepoError, RepoResult};
use crate::filter::{json_scalar, OrderBy, Where};
use crate::paginator::Paginator;

mod sealed {
    pub trait Sealed {}

    impl Sealed for String {}
    impl Sealed for i32 {}
    impl Sealed for i64 {}
    impl Sealed for u32 {}
    impl Sealed for u64 {}
    impl Sealed for uuid::Uuid {}
}

/// Closed set of scalar kinds a primary key may carry: text, signed or
/// unsigned integers, and UUIDs.
pub trait PrimaryKeyScalar:
    sealed::Sealed + Into<sea_orm::Value> + Clone + Send + Sync
{
}

impl PrimaryKeyScalar for String {}
impl PrimaryKeyScalar for i32 {}
impl PrimaryKeyScalar for i64 {}
impl PrimaryKeyScalar for u32 {}
impl PrimaryKeyScalar for u64 {}
impl PrimaryKeyScalar for uuid::Uuid {}

/// First declared primary-key column of an entity.
///
/// `DeriveEntityModel` always emits at least one primary-key variant,
/// so the lookup cannot fail for derived entities.
pub(crate) fn primary_key_column<E: EntityTrait>() -> E::Column {
    E::PrimaryKey::iter()
        .next()
        .map(PrimaryKeyToColumn::into_column)
        .expect("entity declares no primary-key column")
}

/// Generic repository over one entity's table.
///
/// `E` is the entity, `K` the scalar kind of its primary key, and `C`
/// the connection handle. An instance is bound to a single handle for
/// its whole lifetime; to run inside a transaction, move the
/// transaction in and recover it with [`Self::into_conn`] when it is
/// time to commit or roll back. The repository itself is stateless per
/// call and safe to share wherever the handle is.
pub struct BaseRepository<E, K, C = DatabaseConnection>
where
    E: EntityTrait,
    K: PrimaryKeyScalar,
    C: ConnectionTrait,
{
    conn: C,
    entity: E,
    pk: E::Column,
    key: PhantomData<K>,
}

impl<E, K, C> BaseRepository<E, K, C>
where
    E: EntityTrait,
    E::Model: Send + Sync,
    K: PrimaryKeyScalar,
    C: ConnectionTrait,
{
    pub fn new(conn: C) -> Self {
        Self {
            conn,
            entity: E::default(),
            pk: primary_key_column::<E>(),
            key: PhantomData,
        }
    }

    /// The underlying connection handle.
    pub fn conn(&self) -> &C {
        &self.conn
    }

    /// Gives the handle back, e.g. to commit a transaction the
    /// repository was bound to.
    pub fn into_conn(self) -> C {
        self.conn
    }

    /// Physical table name of the bound entity.
    pub fn table_name(&self) -> &str {
        self.entity.table_name()
    }

    /// Physical primary-key column name of the bound entity.
    pub fn primary_key_name(&self) -> &str {
        self.pk.as_str()
    }

    fn logged<T, Err>(&self, op: &'static str, res: Result<T, Err>) -> RepoResult<T>
    where
        Err: Into<RepoError>,
    {
        res.map_err(|err| {
            let err = err.into();
            tracing::error!(table = self.table_name(), op, error = %err, "repository operation failed");
            err
        })
    }

    fn apply(&self, mut select: Select<E>, wheres: &[Where], orders: &[OrderBy]) -> Select<E> {
        for filter in wheres {
            select = select.filter(filter.to_expr());
        }
        for order in orders {
            if let Some((expr, direction)) = order.to_order() {
                select = select.order_by(expr, direction);
            }
        }
        select
    }

    /// Fetches one row by primary key. A missing row is `Ok(None)`.
    pub async fn detail(&self, id: K) -> RepoResult<Option<E::Model>> {
        let res = E::find().filter(self.pk.eq(id)).one(&self.conn).await;
        self.logged("detail", res)
    }

    /// Fetches the first row matching the conjunction of `wheres`.
    /// A missing row is `Ok(None)`.
    pub async fn wheres(&self, wheres: &[Where]) -> RepoResult<Option<E::Model>> {
        let res = self.apply(E::find(), wheres, &[]).one(&self.conn).await;
        self.logged("wheres", res)
    }

    /// Fetches all rows matching the conjunction of `wheres`, sorted by
    /// `orders` in sequence (later entries are secondary keys).
    pub async fn wheres_list(
        &self,
        orders: &[OrderBy],
        wheres: &[Where],
    ) -> RepoResult<Vec<E::Model>> {
        let res = self.apply(E::find(), wheres, orders).all(&self.conn).await;
        self.logged("wheres_list", res)
    }

    async fn paginate(
        &self,
        op: &'static str,
        select: Select<E>,
        page: u64,
        page_size: u64,
    ) -> RepoResult<(Vec<E::Model>, Paginator)> {
        let mut paginator = Paginator::new(page, page_size);
        paginator.total = self.logged(op, select.clone().count(&self.conn).await)?;
        if paginator.total == 0 {
            return Ok((Vec::new(), paginator));
        }

        let res = select
            .offset(paginator.offset())
            .limit(page_size)
            .all(&self.conn)
            .await;
        Ok((self.logged(op, res)?, paginator))
    }

    /// Paginated variant of [`Self::wheres_list`]: filters, then
    /// orders, counts the matches, and fetches one page. A zero count
    /// skips the fetch entirely.
    pub async fn list(
        &self,
        page: u64,
        page_size: u64,
        orders: &[OrderBy],
        wheres: &[Where],
    ) -> RepoResult<(Vec<E::Model>, Paginator)> {
        let select = self.apply(E::find(), wheres, orders);
        self.paginate("list", select, page, page_size).await
    }

    /// Like [`Self::list`], but the base query is first transformed by
    /// `customize` (joins, extra predicates, scoping) before filters,
    /// orders, and pagination are layered on.
    pub async fn list_custom<F>(
        &self,
        page: u64,
        page_size: u64,
        orders: &[OrderBy],
        wheres: &[Where],
        customize: F,
    ) -> RepoResult<(Vec<E::Model>, Paginator)>
    where
        F: FnOnce(Select<E>) -> Select<E>,
    {
        let select = self.apply(customize(E::find()), wheres, orders);
        self.paginate("list_custom", select, page, page_size).await
    }

    /// Inserts one row and returns it with store-generated fields
    /// populated. A duplicate key surfaces as a store error.
    pub async fn create<A>(&self, row: A) -> RepoResult<E::Model>
    where
        A: ActiveModelTrait<Entity = E> + ActiveModelBehavior + Send,
        E::Model: IntoActiveModel<A>,
    {
        let res = row.insert(&self.conn).await;
        self.logged("create", res)
    }

    /// Batch insert. Returns the stored rows and the affected count;
    /// empty input returns immediately without a store round-trip.
    pub async fn create_multiple<A>(&self, rows: Vec<A>) -> RepoResult<(Vec<E::Model>, u64)>
    where
        A: ActiveModelTrait<Entity = E> + Send,
        E::Model: IntoActiveModel<A>,
    {
        if rows.is_empty() {
            return Ok((Vec::new(), 0));
        }

        let res = E::insert_many(rows)
            .exec_with_returning_many(&self.conn)
            .await;
        let rows = self.logged("create_multiple", res)?;
        let affected = rows.len() as u64;
        Ok((rows, affected))
    }

    /// Updates the row addressed by `row`'s own primary key. A
    /// non-empty `columns` restricts the SET list to exactly those
    /// columns; the primary key is never part of it. Returns the
    /// affected-row count.
    pub async fn update<A>(&self, row: A, columns: &[&str]) -> RepoResult<u64>
    where
        A: ActiveModelTrait<Entity = E> + Send,
    {
        let mut row = row;
        let key = match row.get(self.pk) {
            ActiveValue::Set(value) | ActiveValue::Unchanged(value) => value,
            ActiveValue::NotSet => {
                return self.logged("update", Err(RepoError::PrimaryKeyNotSet));
            }
        };

        row.not_set(self.pk);
        if !columns.is_empty() {
            for column in E::Column::iter() {
                if column.as_str() != self.pk.as_str() && !columns.contains(&column.as_str()) {
                    row.not_set(column);
                }
            }
        }

        let res = E::update_many()
            .set(row)
            .filter(self.pk.eq(key))
            .exec(&self.conn)
            .await;
        Ok(self.logged("update", res)?.rows_affected)
    }

    /// Mass update: assigns `values` (column name to JSON scalar) on
    /// every row matching the conjunction of `wheres`. An empty filter
    /// set is refused rather than updating the whole table.
    pub async fn update_where(
        &self,
        wheres: &[Where],
        values: HashMap<String, JsonValue>,
    ) -> RepoResult<u64> {
        if wheres.is_empty() {
            return self.logged(
                "update_where",
                Err(RepoError::UnfilteredWrite(self.table_name().to_owned())),
            );
        }

        let mut update = E::update_many();
        for filter in wheres {
            update = update.filter(filter.to_expr());
        }
        for (column, value) in &values {
            update = update.col_expr(Alias::new(column.as_str()), Expr::value(json_scalar(value)));
        }

        let res = update.exec(&self.conn).await;
        Ok(self.logged("update_where", res)?.rows_affected)
    }

    /// Inserts `row`; on a primary-key conflict updates exactly
    /// `conflict_columns` instead. An empty column list degrades to
    /// do-nothing. The affected count is whatever the backend reports
    /// for the path taken.
    pub async fn upsert<A>(&self, row: A, conflict_columns: &[&str]) -> RepoResult<u64>
    where
        A: ActiveModelTrait<Entity = E> + Send,
        E::Model: IntoActiveModel<A>,
    {
        let mut conflict = OnConflict::column(self.pk);
        if conflict_columns.is_empty() {
            conflict.do_nothing();
        } else {
            conflict.update_columns(conflict_columns.iter().map(|column| Alias::new(*column)));
        }

        let res = E::insert(row)
            .on_conflict(conflict)
            .exec_without_returning(&self.conn)
            .await;
        self.logged("upsert", res)
    }

    /// Deletes the row with the given primary key. Returns the
    /// affected-row count (0 when nothing matched).
    pub async fn delete(&self, id: K) -> RepoResult<u64> {
        let res = E::delete_many()
            .filter(self.pk.eq(id))
            .exec(&self.conn)
            .await;
        Ok(self.logged("delete", res)?.rows_affected)
    }

    /// Deletes every row matching the conjunction of `wheres`. An empty
    /// filter set is refused rather than clearing the whole table.
    pub async fn delete_where(&self, wheres: &[Where]) -> RepoResult<u64> {
        if wheres.is_empty() {
            return self.logged(
                "delete_where",
                Err(RepoError::UnfilteredWrite(self.table_name().to_owned())),
            );
        }

        let mut delete = E::delete_many();
        for filter in wheres {
            delete = delete.filter(filter.to_expr());
        }

        let res = delete.exec(&self.conn).await;
        Ok(self.logged("delete_where", res)?.rows_affected)
    }
}

impl<E, K, C> BaseRepository<E, K, C>
where
    E: AssociatedEntity,
    E::Model: Send + Sync,
    K: PrimaryKeyScalar,
    C: ConnectionTrait + 'static,
{
    fn association(&self, field: &str) -> RepoResult<&'static dyn AssociationOps<E, C>> {
        E::association::<C>(field).ok_or_else(|| RepoError::UnknownAssociation {
            table: self.table_name().to_owned(),
            field: field.to_owned(),
        })
    }

    /// Appends related rows to the named relationship of `owner`.
    /// `rows` is a JSON object or array of objects in the related
    /// entity's shape.
    pub async fn append_association(
        &self,
        owner: &E::Model,
        field: &str,
        rows: JsonValue,
    ) -> RepoResult<()> {
        let link = self.logged("append_association", self.association(field))?;
        let res = link.append(&self.conn, owner, rows).await;
        self.logged("append_association", res)
    }

    /// Replaces the full related set of the named relationship.
    pub async fn replace_association(
        &self,
        owner: &E::Model,
        field: &str,
        rows: JsonValue,
    ) -> RepoResult<()> {
        let link = self.logged("replace_association", self.association(field))?;
        let res = link.replace(&self.conn, owner, rows).await;
        self.logged("replace_association", res)
    }

    /// Deletes the given related rows (matched by their primary keys)
    /// from the named relationship.
    pub async fn delete_association(
        &self,
        owner: &E::Model,
        field: &str,
        rows: JsonValue,
    ) -> RepoResult<()> {
        let link = self.logged("delete_association", self.association(field))?;
        let res = link.remove(&self.conn, owner, rows).await;
        self.logged("delete_association", res)
    }

    /// Removes every related row of the named relationship.
    pub async fn clear_association(&self, owner: &E::Model, field: &str) -> RepoResult<()> {
        let link = self.logged("clear_association", self.association(field))?;
        let res = link.clear(&self.conn, owner).await;
        self.logged("clear_association", res)
    }

    /// Counts the related rows of the named relationship.
    pub async fn count_association(&self, owner: &E::Model, field: &str) -> RepoResult<u64> {
        let link = self.logged("count_association", self.association(field))?;
        let res = link.count(&self.conn, owner).await;
        self.logged("count_association", res)
    }

    /// Loads the related rows of the named relationship: a JSON array
    /// for a has-many, an object or null for a has-one.
    pub async fn find_association(&self, owner: &E::Model, field: &str) -> RepoResult<JsonValue> {
        let link = self.logged("find_association", self.association(field))?;
        let res = link.find(&self.conn, owner).await;
        self.logged("find_association", res)
    }
}

//! SeaORM-backed implementation of the `Repository<T>` port, generic over
//! the record type. Per-entity column mapping lives in `mapper`.

use std::marker::PhantomData;

use anyhow::Context;
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, Condition, DatabaseConnection, DbErr, EntityTrait,
    IntoActiveModel, PrimaryKeyTrait, QueryFilter, QueryOrder,
};
use uuid::Uuid;

use crate::domain::repo::{Record, Repository};

/// Links a domain record to its SeaORM entity.
pub trait SeaRecord: Record {
    type Entity: EntityTrait;
    type ActiveModel: ActiveModelTrait<Entity = Self::Entity> + ActiveModelBehavior + Send + 'static;

    /// Every column `Set`, primary key included.
    fn into_active(self) -> Self::ActiveModel;
    fn from_model(model: <Self::Entity as EntityTrait>::Model) -> anyhow::Result<Self>;
    fn condition(filter: &Self::Filter) -> Condition;
    fn id_column() -> <Self::Entity as EntityTrait>::Column;
    fn created_at_column() -> <Self::Entity as EntityTrait>::Column;
}

/// Holds a pooled connection; cloning the connection is cheap.
pub struct SeaOrmRepository<T> {
    conn: DatabaseConnection,
    _marker: PhantomData<fn() -> T>,
}

impl<T> SeaOrmRepository<T> {
    pub fn new(conn: DatabaseConnection) -> Self {
        Self {
            conn,
            _marker: PhantomData,
        }
    }
}

#[async_trait::async_trait]
impl<T> Repository<T> for SeaOrmRepository<T>
where
    T: SeaRecord,
    <<T::Entity as EntityTrait>::PrimaryKey as PrimaryKeyTrait>::ValueType: From<Uuid>,
    <T::Entity as EntityTrait>::Model: IntoActiveModel<T::ActiveModel>,
{
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<T>> {
        let found = <T::Entity as EntityTrait>::find_by_id(id)
            .one(&self.conn)
            .await
            .with_context(|| format!("find {} by id failed", T::ENTITY))?;
        found.map(T::from_model).transpose()
    }

    async fn list(&self, filter: &T::Filter) -> anyhow::Result<Vec<T>> {
        let rows = <T::Entity as EntityTrait>::find()
            .filter(T::condition(filter))
            .order_by_asc(T::created_at_column())
            .order_by_asc(T::id_column())
            .all(&self.conn)
            .await
            .with_context(|| format!("list {} failed", T::ENTITY))?;
        rows.into_iter().map(T::from_model).collect()
    }

    async fn insert(&self, record: T) -> anyhow::Result<()> {
        let _ = record
            .into_active()
            .insert(&self.conn)
            .await
            .with_context(|| format!("insert {} failed", T::ENTITY))?;
        Ok(())
    }

    async fn update(&self, record: T) -> anyhow::Result<bool> {
        match record.into_active().update(&self.conn).await {
            Ok(_) => Ok(true),
            Err(DbErr::RecordNotUpdated) => Ok(false),
            Err(e) => Err(e).with_context(|| format!("update {} failed", T::ENTITY)),
        }
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let res = <T::Entity as EntityTrait>::delete_by_id(id)
            .exec(&self.conn)
            .await
            .with_context(|| format!("delete {} failed", T::ENTITY))?;
        Ok(res.rows_affected > 0)
    }
}

use base_repo::{AssociatedEntity, Association, AssociationOps};
use sea_orm::entity::prelude::*;
use sea_orm::ConnectionTrait;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "dummy_users")]
pub struct Model {
    #[sea_orm(primary_key)]
    #[serde(default)]
    pub id: i32,
    pub name: String,
    pub email: String,
    pub created_at: TimeDateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::profile::Entity")]
    Profile,
    #[sea_orm(has_many = "super::post::Entity")]
    Posts,
}

impl Related<super::profile::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Profile.def()
    }
}

impl Related<super::post::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Posts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl AssociatedEntity for Entity {
    fn association<C: ConnectionTrait>(name: &str) -> Option<&'static dyn AssociationOps<Self, C>> {
        static PROFILE: Association<Entity, super::profile::Entity, super::profile::ActiveModel> =
            Association::has_one(super::profile::Column::UserId);
        static POSTS: Association<Entity, super::post::Entity, super::post::ActiveModel> =
            Association::has_many(super::post::Column::UserId);

        match name {
            "profile" => Some(&PROFILE),
            "posts" => Some(&POSTS),
            _ => None,
        }
    }
}

//! Cover image entity. One row per post at most.

use sea_orm::entity::prelude::*;

use blog_core::domain::CoverImage;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "images")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub post_id: Uuid,
    /// Storage key of an uploaded file, or an external URL.
    pub path: String,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::post::Entity",
        from = "Column::PostId",
        to = "super::post::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Post,
}

impl Related<super::post::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Post.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for CoverImage {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            post_id: model.post_id,
            path: model.path,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

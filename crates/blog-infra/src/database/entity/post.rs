//! Post entity for SeaORM.

use sea_orm::Set;
use sea_orm::entity::prelude::*;

use blog_core::domain::{Lifecycle, Post, PostCounters, PostMeta, PublishState};

/// Stored form of [`PublishState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum PublishStatus {
    #[sea_orm(string_value = "draft")]
    Draft,
    #[sea_orm(string_value = "published")]
    Published,
}

impl From<PublishState> for PublishStatus {
    fn from(state: PublishState) -> Self {
        match state {
            PublishState::Draft => Self::Draft,
            PublishState::Published => Self::Published,
        }
    }
}

impl From<PublishStatus> for PublishState {
    fn from(status: PublishStatus) -> Self {
        match status {
            PublishStatus::Draft => Self::Draft,
            PublishStatus::Published => Self::Published,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "posts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    #[sea_orm(unique)]
    pub slug: String,
    #[sea_orm(column_type = "Text")]
    pub content: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub publish: PublishStatus,
    pub featured: bool,
    pub views: i64,
    pub shares: i64,
    pub favorites: i64,
    pub meta_title: Option<String>,
    #[sea_orm(column_type = "JsonBinary")]
    pub meta_keywords: Json,
    #[sea_orm(column_type = "Text", nullable)]
    pub meta_description: Option<String>,
    pub deleted_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    User,
    #[sea_orm(has_one = "super::image::Entity")]
    Image,
    #[sea_orm(has_many = "super::comment::Entity")]
    Comment,
    #[sea_orm(has_many = "super::taggable::Entity")]
    Taggable,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::image::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Image.def()
    }
}

impl Related<super::comment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comment.def()
    }
}

impl Related<super::tag::Entity> for Entity {
    fn to() -> RelationDef {
        super::taggable::Relation::Tag.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::taggable::Relation::Post.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}

fn counter(value: i64) -> u64 {
    u64::try_from(value).unwrap_or_default()
}

fn column(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Conversion from SeaORM Model to Domain Post.
impl From<Model> for Post {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            author_id: model.user_id,
            title: model.title,
            slug: model.slug,
            content: model.content,
            description: model.description,
            publish: model.publish.into(),
            featured: model.featured,
            counters: PostCounters {
                views: counter(model.views),
                shares: counter(model.shares),
                favorites: counter(model.favorites),
            },
            meta: PostMeta {
                title: model.meta_title,
                keywords: serde_json::from_value(model.meta_keywords).unwrap_or_default(),
                description: model.meta_description,
            },
            lifecycle: Lifecycle::from_deleted_at(model.deleted_at.map(Into::into)),
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

/// Conversion from Domain Post to SeaORM ActiveModel.
impl From<Post> for ActiveModel {
    fn from(post: Post) -> Self {
        Self {
            id: Set(post.id),
            user_id: Set(post.author_id),
            title: Set(post.title),
            slug: Set(post.slug),
            content: Set(post.content),
            description: Set(post.description),
            publish: Set(post.publish.into()),
            featured: Set(post.featured),
            views: Set(column(post.counters.views)),
            shares: Set(column(post.counters.shares)),
            favorites: Set(column(post.counters.favorites)),
            meta_title: Set(post.meta.title),
            meta_keywords: Set(Json::from(post.meta.keywords)),
            meta_description: Set(post.meta.description),
            deleted_at: Set(post.lifecycle.deleted_at().map(|at| at.fixed_offset())),
            created_at: Set(post.created_at.fixed_offset()),
            updated_at: Set(post.updated_at.fixed_offset()),
        }
    }
}

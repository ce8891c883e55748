//! PostgreSQL post repository.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::{Expr, Func, LikeExpr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseTransaction, DbConn, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, Set, SqlErr, TransactionTrait,
};
use uuid::Uuid;

use blog_core::domain::{
    Comment, CoverImage, Page, Post, PostDetails, PostQuery, SortOrder, Tag, User, Visibility,
};
use blog_core::error::RepoError;
use blog_core::ports::{PostRepository, PostTransaction};

use super::entity::{comment, image, post, tag, taggable, user};

fn db_err(e: DbErr) -> RepoError {
    match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(msg)) => return RepoError::Constraint(msg),
        Some(SqlErr::ForeignKeyConstraintViolation(msg)) => return RepoError::Constraint(msg),
        _ => {}
    }
    match e {
        DbErr::Conn(_) | DbErr::ConnectionAcquire(_) => RepoError::Connection(e.to_string()),
        DbErr::RecordNotFound(_) | DbErr::RecordNotUpdated => RepoError::NotFound,
        other => RepoError::Query(other.to_string()),
    }
}

fn visibility(visibility: Visibility) -> Condition {
    match visibility {
        Visibility::Public => Condition::all()
            .add(post::Column::Publish.eq(post::PublishStatus::Published))
            .add(post::Column::DeletedAt.is_null()),
        Visibility::WithTrashed => Condition::all(),
    }
}

/// `%term%` with LIKE wildcards in the term escaped.
fn contains_pattern(term: &str) -> String {
    let escaped = term
        .to_lowercase()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// PostgreSQL post repository.
pub struct PostgresPostRepository {
    db: Arc<DbConn>,
}

impl PostgresPostRepository {
    pub fn new(db: impl Into<Arc<DbConn>>) -> Self {
        Self { db: db.into() }
    }

    fn published() -> Select<post::Entity> {
        post::Entity::find().filter(visibility(Visibility::Public))
    }

    /// Attach authors, covers, tags and top-level comment counts to `posts`,
    /// keeping their order. Comments themselves only when `with_comments`.
    async fn hydrate(
        &self,
        posts: Vec<Post>,
        with_comments: bool,
    ) -> Result<Vec<PostDetails>, RepoError> {
        if posts.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = posts.iter().map(|p| p.id).collect();
        let author_ids: Vec<Uuid> = posts.iter().map(|p| p.author_id).collect();

        let authors: HashMap<Uuid, User> = user::Entity::find()
            .filter(user::Column::Id.is_in(author_ids))
            .all(self.db.as_ref())
            .await
            .map_err(db_err)?
            .into_iter()
            .map(|m| (m.id, User::from(m)))
            .collect();

        let mut covers: HashMap<Uuid, CoverImage> = image::Entity::find()
            .filter(image::Column::PostId.is_in(ids.clone()))
            .all(self.db.as_ref())
            .await
            .map_err(db_err)?
            .into_iter()
            .map(|m| (m.post_id, CoverImage::from(m)))
            .collect();

        let mut tags: HashMap<Uuid, Vec<Tag>> = HashMap::new();
        for (link, tag) in taggable::Entity::find()
            .filter(taggable::Column::PostId.is_in(ids.clone()))
            .order_by_asc(taggable::Column::OrderColumn)
            .find_also_related(tag::Entity)
            .all(self.db.as_ref())
            .await
            .map_err(db_err)?
        {
            if let Some(tag) = tag {
                tags.entry(link.post_id).or_default().push(tag.into());
            }
        }

        let counts: HashMap<Uuid, i64> = comment::Entity::find()
            .select_only()
            .column(comment::Column::PostId)
            .column_as(Expr::col(comment::Column::Id).count(), "total")
            .filter(comment::Column::PostId.is_in(ids.clone()))
            .filter(comment::Column::ParentId.is_null())
            .group_by(comment::Column::PostId)
            .into_tuple::<(Uuid, i64)>()
            .all(self.db.as_ref())
            .await
            .map_err(db_err)?
            .into_iter()
            .collect();

        let mut comments: HashMap<Uuid, Vec<Comment>> = HashMap::new();
        if with_comments {
            for model in comment::Entity::find()
                .filter(comment::Column::PostId.is_in(ids))
                .filter(comment::Column::ParentId.is_null())
                .order_by_desc(comment::Column::CreatedAt)
                .all(self.db.as_ref())
                .await
                .map_err(db_err)?
            {
                comments.entry(model.post_id).or_default().push(model.into());
            }
        }

        Ok(posts
            .into_iter()
            .map(|post| {
                // Authors may write several posts in one page
                let author = authors.get(&post.author_id).cloned();
                let id = post.id;
                PostDetails {
                    author,
                    cover: covers.remove(&id),
                    tags: tags.remove(&id).unwrap_or_default(),
                    total_comments: counts
                        .get(&id)
                        .and_then(|n| u64::try_from(*n).ok())
                        .unwrap_or(0),
                    comments: with_comments.then(|| comments.remove(&id).unwrap_or_default()),
                    post,
                }
            })
            .collect())
    }

    async fn fetch(&self, select: Select<post::Entity>) -> Result<Vec<PostDetails>, RepoError> {
        let posts = select
            .all(self.db.as_ref())
            .await
            .map_err(db_err)?
            .into_iter()
            .map(Post::from)
            .collect();
        self.hydrate(posts, false).await
    }
}

#[async_trait]
impl PostRepository for PostgresPostRepository {
    async fn find(&self, id: Uuid, scope: Visibility) -> Result<Option<Post>, RepoError> {
        let result = post::Entity::find_by_id(id)
            .filter(visibility(scope))
            .one(self.db.as_ref())
            .await
            .map_err(db_err)?;

        Ok(result.map(Into::into))
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Post>, RepoError> {
        tracing::debug!(slug = %slug, "Finding post by slug");

        let result = Self::published()
            .filter(post::Column::Slug.eq(slug))
            .one(self.db.as_ref())
            .await
            .map_err(db_err)?;

        Ok(result.map(Into::into))
    }

    async fn slug_exists(&self, slug: &str, except: Option<Uuid>) -> Result<bool, RepoError> {
        let mut select = post::Entity::find().filter(post::Column::Slug.eq(slug));
        if let Some(id) = except {
            select = select.filter(post::Column::Id.ne(id));
        }

        let count = select.count(self.db.as_ref()).await.map_err(db_err)?;
        Ok(count > 0)
    }

    async fn cover(&self, post_id: Uuid) -> Result<Option<CoverImage>, RepoError> {
        let result = image::Entity::find()
            .filter(image::Column::PostId.eq(post_id))
            .one(self.db.as_ref())
            .await
            .map_err(db_err)?;

        Ok(result.map(Into::into))
    }

    async fn load_details(&self, post: Post) -> Result<PostDetails, RepoError> {
        self.hydrate(vec![post], true)
            .await?
            .pop()
            .ok_or(RepoError::NotFound)
    }

    async fn list(&self, query: &PostQuery) -> Result<Page<PostDetails>, RepoError> {
        let mut select = post::Entity::find().filter(visibility(query.visibility));
        if let Some(state) = query.publish {
            select = select.filter(post::Column::Publish.eq(post::PublishStatus::from(state)));
        }
        select = match query.sort {
            SortOrder::NewestFirst => select.order_by_desc(post::Column::CreatedAt),
            SortOrder::OldestFirst => select.order_by_asc(post::Column::CreatedAt),
        };

        let paginator = select.paginate(self.db.as_ref(), query.per_page);
        let total = paginator.num_items().await.map_err(db_err)?;
        let posts = paginator
            .fetch_page(query.page.saturating_sub(1))
            .await
            .map_err(db_err)?
            .into_iter()
            .map(Post::from)
            .collect();

        Ok(Page {
            items: self.hydrate(posts, false).await?,
            page: query.page,
            per_page: query.per_page,
            total,
        })
    }

    async fn featured(&self, limit: u64) -> Result<Vec<PostDetails>, RepoError> {
        self.fetch(
            Self::published()
                .filter(post::Column::Featured.eq(true))
                .order_by_desc(post::Column::CreatedAt)
                .limit(limit),
        )
        .await
    }

    async fn latest(&self, limit: u64) -> Result<Vec<PostDetails>, RepoError> {
        self.fetch(
            Self::published()
                .order_by_desc(post::Column::CreatedAt)
                .limit(limit),
        )
        .await
    }

    async fn search(&self, term: &str) -> Result<Vec<PostDetails>, RepoError> {
        let title = Expr::expr(Func::lower(Expr::col(post::Column::Title)));
        self.fetch(
            Self::published()
                .filter(title.like(LikeExpr::new(contains_pattern(term)).escape('\\')))
                .order_by_desc(post::Column::CreatedAt),
        )
        .await
    }

    async fn tags(&self) -> Result<Vec<Tag>, RepoError> {
        let result = tag::Entity::find()
            .order_by_asc(tag::Column::Name)
            .all(self.db.as_ref())
            .await
            .map_err(db_err)?;

        Ok(result.into_iter().map(Into::into).collect())
    }

    async fn begin(&self) -> Result<Box<dyn PostTransaction>, RepoError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        Ok(Box::new(SeaPostTransaction { txn }))
    }
}

/// Write transaction over a SeaORM `DatabaseTransaction`.
///
/// Dropping it without `commit` rolls back.
pub struct SeaPostTransaction {
    txn: DatabaseTransaction,
}

#[async_trait]
impl PostTransaction for SeaPostTransaction {
    async fn insert_post(&mut self, post: &Post) -> Result<(), RepoError> {
        post::ActiveModel::from(post.clone())
            .insert(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn update_post(&mut self, post: &Post) -> Result<(), RepoError> {
        post::ActiveModel::from(post.clone())
            .update(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn save_cover(&mut self, post_id: Uuid, path: &str) -> Result<(), RepoError> {
        let now = Utc::now().fixed_offset();
        let row = image::ActiveModel {
            id: Set(Uuid::new_v4()),
            post_id: Set(post_id),
            path: Set(path.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        };

        image::Entity::insert(row)
            .on_conflict(
                OnConflict::column(image::Column::PostId)
                    .update_columns([image::Column::Path, image::Column::UpdatedAt])
                    .to_owned(),
            )
            .exec_without_returning(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn delete_cover(&mut self, post_id: Uuid) -> Result<(), RepoError> {
        image::Entity::delete_many()
            .filter(image::Column::PostId.eq(post_id))
            .exec(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn sync_tags(&mut self, post_id: Uuid, names: &[String]) -> Result<(), RepoError> {
        taggable::Entity::delete_many()
            .filter(taggable::Column::PostId.eq(post_id))
            .exec(&self.txn)
            .await
            .map_err(db_err)?;

        if names.is_empty() {
            return Ok(());
        }

        let mut known: HashMap<String, Uuid> = tag::Entity::find()
            .filter(tag::Column::Name.is_in(names.iter().cloned()))
            .all(&self.txn)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(|m| (m.name, m.id))
            .collect();

        let missing: Vec<Tag> = names
            .iter()
            .filter(|name| !known.contains_key(*name))
            .map(|name| Tag::new(name))
            .collect();
        if !missing.is_empty() {
            known.extend(missing.iter().map(|t| (t.name.clone(), t.id)));
            tag::Entity::insert_many(missing.into_iter().map(tag::ActiveModel::from))
                .exec_without_returning(&self.txn)
                .await
                .map_err(db_err)?;
        }

        let links: Vec<taggable::ActiveModel> = names
            .iter()
            .enumerate()
            .filter_map(|(position, name)| {
                known.get(name).map(|tag_id| taggable::ActiveModel {
                    post_id: Set(post_id),
                    tag_id: Set(*tag_id),
                    order_column: Set(i32::try_from(position).unwrap_or(i32::MAX)),
                })
            })
            .collect();
        taggable::Entity::insert_many(links)
            .exec_without_returning(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn soft_delete(&mut self, post_id: Uuid, at: DateTime<Utc>) -> Result<(), RepoError> {
        let result = post::Entity::update_many()
            .col_expr(post::Column::DeletedAt, Expr::value(Some(at.fixed_offset())))
            .col_expr(post::Column::UpdatedAt, Expr::value(at.fixed_offset()))
            .filter(post::Column::Id.eq(post_id))
            .exec(&self.txn)
            .await
            .map_err(db_err)?;

        if result.rows_affected == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn restore(&mut self, post_id: Uuid) -> Result<(), RepoError> {
        let result = post::Entity::update_many()
            .col_expr(
                post::Column::DeletedAt,
                Expr::value(Option::<DateTimeWithTimeZone>::None),
            )
            .col_expr(post::Column::UpdatedAt, Expr::value(Utc::now().fixed_offset()))
            .filter(post::Column::Id.eq(post_id))
            .exec(&self.txn)
            .await
            .map_err(db_err)?;

        if result.rows_affected == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn purge(&mut self, post_id: Uuid) -> Result<(), RepoError> {
        taggable::Entity::delete_many()
            .filter(taggable::Column::PostId.eq(post_id))
            .exec(&self.txn)
            .await
            .map_err(db_err)?;
        comment::Entity::delete_many()
            .filter(comment::Column::PostId.eq(post_id))
            .exec(&self.txn)
            .await
            .map_err(db_err)?;
        image::Entity::delete_many()
            .filter(image::Column::PostId.eq(post_id))
            .exec(&self.txn)
            .await
            .map_err(db_err)?;

        let result = post::Entity::delete_by_id(post_id)
            .exec(&self.txn)
            .await
            .map_err(db_err)?;
        if result.rows_affected == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), RepoError> {
        self.txn.commit().await.map_err(db_err)
    }

    async fn rollback(self: Box<Self>) -> Result<(), RepoError> {
        self.txn.rollback().await.map_err(db_err)
    }
}

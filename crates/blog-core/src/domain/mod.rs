//! Domain entities - the core business objects.

mod comment;
mod cover;
mod listing;
pub mod policy;
mod post;
mod read_time;
pub mod slug;
mod tag;
mod user;

pub use comment::Comment;
pub use cover::{
    COVER_UPLOAD_DIR, CoverImage, CoverInput, CoverPlan, CoverSource, CoverUpload,
    InvalidCoverUrl, is_external_url, is_uploaded_cover_path, plan_cover,
};
pub use listing::{
    HIGHLIGHT_LIMIT, PAGE_SIZE, Page, PostDetails, PostQuery, SortOrder, Visibility,
};
pub use policy::{Actor, PostAction};
pub use post::{
    Lifecycle, Post, PostChanges, PostCounters, PostDraft, PostMeta, PublishState,
};
pub use read_time::{DEFAULT_WORDS_PER_MINUTE, ReadTime};
pub use tag::{Tag, normalize_tag_names};
pub use user::User;

//! Cover image records and the decision of what to do with an incoming cover.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Directory (relative to the blob store root) holding uploaded covers.
pub const COVER_UPLOAD_DIR: &str = "uploads/post/cover";

/// The single cover attached to a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverImage {
    pub id: Uuid,
    pub post_id: Uuid,
    /// Either a path inside blob storage or an absolute external URL.
    pub path: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CoverImage {
    pub fn new(post_id: Uuid, path: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            post_id,
            path,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the path is an upload this service stored itself.
    pub fn is_stored_locally(&self) -> bool {
        is_uploaded_cover_path(&self.path)
    }
}

/// An uploaded file as received at the HTTP boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverUpload {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub content_type: Option<String>,
}

impl CoverUpload {
    /// Lower-cased extension of the client filename, if any.
    pub fn extension(&self) -> Option<String> {
        std::path::Path::new(&self.filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.trim_matches('.').to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
    }

    /// Collision-resistant storage filename: `<slugified stem>_<uuid>.<ext>`.
    pub fn unique_filename(&self) -> String {
        let stem = std::path::Path::new(&self.filename)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .map(slug::slugify)
            .filter(|stem| !stem.is_empty())
            .unwrap_or_else(|| "cover".to_string());
        let id = Uuid::new_v4().simple();

        match self.extension() {
            Some(ext) => format!("{stem}_{id}.{ext}"),
            None => format!("{stem}_{id}"),
        }
    }
}

/// Incoming cover value, decided once when the request is parsed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CoverInput {
    #[default]
    NoChange,
    SetUrl(String),
    SetUpload(CoverUpload),
}

/// What the service has to do to bring the cover in line with the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoverPlan<'a> {
    Keep,
    Replace {
        /// Previously stored local file to remove, if any.
        discard: Option<&'a str>,
        source: CoverSource<'a>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoverSource<'a> {
    Url(&'a str),
    Upload(&'a CoverUpload),
}

/// A `coverUrl` that is neither the current cover nor an absolute http(s) URL.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("The cover url must be a valid http or https URL.")]
pub struct InvalidCoverUrl;

/// Decide how to reconcile `existing` with `input`.
///
/// `existing_url` is the public URL the current cover is served under; a
/// client echoing it back keeps the cover as it is.
pub fn plan_cover<'a>(
    existing: Option<&'a CoverImage>,
    existing_url: Option<&str>,
    input: &'a CoverInput,
) -> Result<CoverPlan<'a>, InvalidCoverUrl> {
    let discard = existing
        .filter(|cover| cover.is_stored_locally())
        .map(|cover| cover.path.as_str());

    let plan = match input {
        CoverInput::NoChange => CoverPlan::Keep,
        CoverInput::SetUrl(url)
            if existing.is_some_and(|cover| &cover.path == url)
                || existing_url == Some(url.as_str()) =>
        {
            CoverPlan::Keep
        }
        CoverInput::SetUrl(url) if !is_external_url(url) => return Err(InvalidCoverUrl),
        CoverInput::SetUrl(url) => CoverPlan::Replace {
            discard,
            source: CoverSource::Url(url),
        },
        CoverInput::SetUpload(upload) => CoverPlan::Replace {
            discard,
            source: CoverSource::Upload(upload),
        },
    };
    Ok(plan)
}

/// True for absolute http(s) URLs with a host.
pub fn is_external_url(path: &str) -> bool {
    let lower = path.trim().to_ascii_lowercase();
    ["http://", "https://"].iter().any(|scheme| {
        lower
            .strip_prefix(scheme)
            .is_some_and(|rest| rest.split('/').next().is_some_and(|host| !host.is_empty()))
    })
}

/// True for `COVER_UPLOAD_DIR/<file>` with a single, plain file segment.
pub fn is_uploaded_cover_path(path: &str) -> bool {
    path.strip_prefix(COVER_UPLOAD_DIR)
        .and_then(|rest| rest.strip_prefix('/'))
        .is_some_and(|file| {
            !file.is_empty()
                && file != "."
                && file != ".."
                && !file.contains(['/', '\\'])
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cover(path: &str) -> CoverImage {
        CoverImage::new(Uuid::new_v4(), path.to_string())
    }

    fn upload(name: &str) -> CoverUpload {
        CoverUpload {
            bytes: vec![1, 2, 3],
            filename: name.to_string(),
            content_type: Some("image/png".to_string()),
        }
    }

    #[test]
    fn test_same_url_is_a_no_op() {
        let existing = cover("https://cdn.example.com/a.png");
        let input = CoverInput::SetUrl("https://cdn.example.com/a.png".to_string());
        assert_eq!(plan_cover(Some(&existing), None, &input), Ok(CoverPlan::Keep));
    }

    #[test]
    fn test_public_url_of_local_cover_is_a_no_op() {
        let existing = cover("uploads/post/cover/a.png");
        let input = CoverInput::SetUrl("/storage/uploads/post/cover/a.png".to_string());
        assert_eq!(
            plan_cover(
                Some(&existing),
                Some("/storage/uploads/post/cover/a.png"),
                &input
            ),
            Ok(CoverPlan::Keep)
        );
    }

    #[test]
    fn test_relative_url_is_rejected() {
        let own = cover("uploads/post/cover/mine.png");
        for url in [
            "uploads/post/cover/someone-else.png",
            "/storage/uploads/post/cover/someone-else.png",
            "//cdn.example.com/a.png",
            "https://",
            "javascript:alert(1)",
        ] {
            let input = CoverInput::SetUrl(url.to_string());
            assert_eq!(
                plan_cover(Some(&own), None, &input),
                Err(InvalidCoverUrl),
                "{url}"
            );
            assert_eq!(plan_cover(None, None, &input), Err(InvalidCoverUrl), "{url}");
        }
    }

    #[test]
    fn test_only_upload_dir_paths_are_discarded() {
        let foreign = cover("other/dir/a.png");
        let input = CoverInput::SetUrl("https://cdn.example.com/b.png".to_string());
        match plan_cover(Some(&foreign), None, &input) {
            Ok(CoverPlan::Replace { discard, .. }) => assert_eq!(discard, None),
            other => panic!("unexpected plan {other:?}"),
        }

        assert!(is_uploaded_cover_path("uploads/post/cover/a_1.png"));
        assert!(!is_uploaded_cover_path("uploads/post/cover/../../secret"));
        assert!(!is_uploaded_cover_path("uploads/post/cover/.."));
        assert!(!is_uploaded_cover_path("uploads/post/cover/"));
        assert!(!is_uploaded_cover_path("uploads/post/coverx/a.png"));
        assert!(!is_uploaded_cover_path("/uploads/post/cover/a.png"));
    }

    #[test]
    fn test_absent_input_keeps_cover() {
        let existing = cover("uploads/post/cover/a.png");
        assert_eq!(
            plan_cover(Some(&existing), None, &CoverInput::NoChange),
            Ok(CoverPlan::Keep)
        );
    }

    #[test]
    fn test_new_url_discards_local_file() {
        let existing = cover("uploads/post/cover/a.png");
        let input = CoverInput::SetUrl("https://cdn.example.com/b.png".to_string());
        assert_eq!(
            plan_cover(Some(&existing), None, &input),
            Ok(CoverPlan::Replace {
                discard: Some("uploads/post/cover/a.png"),
                source: CoverSource::Url("https://cdn.example.com/b.png"),
            })
        );
    }

    #[test]
    fn test_external_cover_is_never_discarded() {
        let existing = cover("https://cdn.example.com/a.png");
        let input = CoverInput::SetUpload(upload("b.png"));
        match plan_cover(Some(&existing), None, &input) {
            Ok(CoverPlan::Replace { discard, .. }) => assert_eq!(discard, None),
            other => panic!("unexpected plan {other:?}"),
        }
    }

    #[test]
    fn test_upload_without_existing_cover() {
        let input = CoverInput::SetUpload(upload("b.png"));
        assert!(matches!(
            plan_cover(None, None, &input),
            Ok(CoverPlan::Replace {
                discard: None,
                source: CoverSource::Upload(_)
            })
        ));
    }

    #[test]
    fn test_unique_filename_keeps_stem_and_extension() {
        let first = upload("My Holiday.JPG").unique_filename();
        let second = upload("My Holiday.JPG").unique_filename();
        assert!(first.starts_with("my-holiday_"));
        assert!(first.ends_with(".jpg"));
        assert_ne!(first, second);
    }

    #[test]
    fn test_external_url_detection() {
        assert!(is_external_url("https://example.com/a.png"));
        assert!(is_external_url("HTTP://example.com/a.png"));
        assert!(!is_external_url("uploads/post/cover/a.png"));
        assert!(!is_external_url("//example.com/a.png"));
    }
}

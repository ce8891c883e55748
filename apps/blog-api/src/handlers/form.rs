//! Post write requests, accepted as JSON or `multipart/form-data`.

use actix_multipart::{Multipart, MultipartError};
use actix_web::{HttpMessage, HttpRequest, web};
use futures::TryStreamExt;
use serde::{Deserialize, Deserializer, de::Error as _};

use blog_core::PostAttachments;
use blog_core::domain::{CoverInput, CoverUpload, PostChanges, PostDraft, PostMeta, PublishState};

use crate::middleware::error::AppError;

/// Largest accepted JSON body or text field.
pub const MAX_BODY_BYTES: usize = 256 * 1024;
/// Largest accepted cover upload.
pub const MAX_COVER_BYTES: usize = 10 * 1024 * 1024;

const MAX_TITLE_CHARS: usize = 255;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostForm {
    pub title: Option<String>,
    pub content: Option<String>,
    pub description: Option<String>,
    pub publish: Option<String>,
    #[serde(default, deserialize_with = "flexible_bool")]
    pub featured: Option<bool>,
    #[serde(alias = "meta_title")]
    pub meta_title: Option<String>,
    #[serde(alias = "meta_keywords")]
    pub meta_keywords: Option<Vec<String>>,
    #[serde(alias = "meta_description")]
    pub meta_description: Option<String>,
    pub tags: Option<Vec<String>>,
    #[serde(alias = "cover_url")]
    pub cover_url: Option<String>,
    #[serde(skip)]
    pub cover_upload: Option<CoverUpload>,
}

impl PostForm {
    /// Read the request body according to its content type.
    pub async fn read(req: &HttpRequest, payload: web::Payload) -> Result<Self, AppError> {
        if req.content_type() == "multipart/form-data" {
            Self::from_multipart(Multipart::new(req.headers(), payload)).await
        } else {
            Self::from_json(&read_body(payload).await?)
        }
    }

    fn from_json(body: &[u8]) -> Result<Self, AppError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body)
            .map_err(|e| AppError::Validation(format!("The given data was invalid: {e}")))
    }

    async fn from_multipart(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = Self::default();

        while let Some(mut field) = multipart.try_next().await.map_err(malformed)? {
            let name = field.name().unwrap_or_default().to_string();
            let filename = field
                .content_disposition()
                .and_then(|cd| cd.get_filename())
                .map(str::to_string);
            let content_type = field.content_type().map(|mime| mime.to_string());
            let limit = if filename.is_some() {
                MAX_COVER_BYTES
            } else {
                MAX_BODY_BYTES
            };

            let mut bytes = Vec::new();
            while let Some(chunk) = field.try_next().await.map_err(malformed)? {
                if bytes.len() + chunk.len() > limit {
                    return Err(AppError::Validation(format!(
                        "The {name} field is too large."
                    )));
                }
                bytes.extend_from_slice(&chunk);
            }

            match filename {
                Some(filename) if is_cover_field(&name) => {
                    if !bytes.is_empty() {
                        form.cover_upload = Some(CoverUpload {
                            bytes,
                            filename,
                            content_type,
                        });
                    }
                }
                Some(_) => tracing::debug!(field = %name, "Ignoring unexpected file part"),
                None => {
                    let value = String::from_utf8(bytes).map_err(|_| {
                        AppError::Validation(format!("The {name} field must be UTF-8 text."))
                    })?;
                    form.set_text(&name, value)?;
                }
            }
        }

        Ok(form)
    }

    fn set_text(&mut self, name: &str, value: String) -> Result<(), AppError> {
        match name {
            "title" => self.title = Some(value),
            "content" => self.content = Some(value),
            "description" => self.description = Some(value),
            "publish" => self.publish = Some(value),
            "featured" => {
                self.featured = Some(parse_bool(&value).ok_or_else(|| {
                    AppError::Validation("The featured field must be true or false.".to_string())
                })?)
            }
            "metaTitle" | "meta_title" => self.meta_title = Some(value),
            "metaDescription" | "meta_description" => self.meta_description = Some(value),
            "metaKeywords" | "metaKeywords[]" | "meta_keywords" | "meta_keywords[]" => {
                self.meta_keywords.get_or_insert_with(Vec::new).push(value)
            }
            "tags" | "tags[]" => self.tags.get_or_insert_with(Vec::new).push(value),
            name if is_cover_field(name) => self.cover_url = Some(value),
            other => tracing::debug!(field = %other, "Ignoring unknown form field"),
        }
        Ok(())
    }

    /// Loggable view of the request. Upload bytes are summarized.
    pub fn log_payload(&self) -> serde_json::Value {
        serde_json::json!({
            "title": self.title,
            "description": self.description,
            "publish": self.publish,
            "featured": self.featured,
            "metaTitle": self.meta_title,
            "metaKeywords": self.meta_keywords,
            "metaDescription": self.meta_description,
            "tags": self.tags,
            "coverUrl": self.cover_upload.as_ref().map_or_else(
                || serde_json::json!(self.cover_url),
                |upload| serde_json::json!({
                    "filename": upload.filename,
                    "size": upload.bytes.len(),
                }),
            ),
        })
    }

    /// Validate as a new post.
    pub fn into_draft(self) -> Result<(PostDraft, PostAttachments), AppError> {
        let title = required("title", self.title)?;
        check_title(&title)?;
        let content = required("content", self.content)?;
        let publish = parse_publish(self.publish.as_deref())?.unwrap_or_default();

        let draft = PostDraft {
            title,
            content,
            description: self.description,
            publish,
            featured: self.featured.unwrap_or(false),
            meta: PostMeta {
                title: self.meta_title,
                keywords: self.meta_keywords.unwrap_or_default(),
                description: self.meta_description,
            },
        };
        let attachments = attachments(self.tags, self.cover_upload, self.cover_url);

        Ok((draft, attachments))
    }

    /// Validate as a partial update.
    pub fn into_changes(self) -> Result<(PostChanges, PostAttachments), AppError> {
        let title = self.title.map(|t| required("title", Some(t))).transpose()?;
        if let Some(title) = &title {
            check_title(title)?;
        }
        let content = self
            .content
            .map(|c| required("content", Some(c)))
            .transpose()?;

        let changes = PostChanges {
            title,
            content,
            description: self.description,
            publish: parse_publish(self.publish.as_deref())?,
            featured: self.featured,
            meta_title: self.meta_title,
            meta_keywords: self.meta_keywords,
            meta_description: self.meta_description,
        };
        let attachments = attachments(self.tags, self.cover_upload, self.cover_url);

        Ok((changes, attachments))
    }
}

fn attachments(
    tags: Option<Vec<String>>,
    upload: Option<CoverUpload>,
    url: Option<String>,
) -> PostAttachments {
    let cover = match (upload, url) {
        (Some(upload), _) => CoverInput::SetUpload(upload),
        (None, Some(url)) if !url.trim().is_empty() => CoverInput::SetUrl(url.trim().to_string()),
        _ => CoverInput::NoChange,
    };

    PostAttachments {
        tags: tags.unwrap_or_default(),
        cover,
    }
}

fn required(field: &str, value: Option<String>) -> Result<String, AppError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AppError::Validation(format!("The {field} field is required.")))
}

fn check_title(title: &str) -> Result<(), AppError> {
    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(AppError::Validation(format!(
            "The title field must not be greater than {MAX_TITLE_CHARS} characters."
        )));
    }
    Ok(())
}

fn parse_publish(value: Option<&str>) -> Result<Option<PublishState>, AppError> {
    value
        .map(|v| {
            v.trim()
                .parse::<PublishState>()
                .map_err(|_| AppError::Validation("The selected publish is invalid.".to_string()))
        })
        .transpose()
}

fn is_cover_field(name: &str) -> bool {
    matches!(name, "coverUrl" | "cover_url")
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" | "" => Some(false),
        _ => None,
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BoolLike {
    Bool(bool),
    Int(i64),
    Text(String),
}

fn flexible_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
    match Option::<BoolLike>::deserialize(deserializer)? {
        None => Ok(None),
        Some(BoolLike::Bool(b)) => Ok(Some(b)),
        Some(BoolLike::Int(0)) => Ok(Some(false)),
        Some(BoolLike::Int(1)) => Ok(Some(true)),
        Some(BoolLike::Int(n)) => Err(D::Error::custom(format!("invalid boolean `{n}`"))),
        Some(BoolLike::Text(s)) => parse_bool(&s)
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("invalid boolean `{s}`"))),
    }
}

async fn read_body(mut payload: web::Payload) -> Result<web::Bytes, AppError> {
    let mut body = web::BytesMut::new();
    while let Some(chunk) = payload
        .try_next()
        .await
        .map_err(|e| AppError::Validation(format!("Unreadable request body: {e}")))?
    {
        if body.len() + chunk.len() > MAX_BODY_BYTES {
            return Err(AppError::Validation("The request body is too large.".to_string()));
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body.freeze())
}

fn malformed(err: MultipartError) -> AppError {
    AppError::Validation(format!("Malformed multipart body: {err}"))
}

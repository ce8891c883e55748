//! Slug generation for post titles.
//!
//! Slugs are ASCII (`slug` crate), at most [`MAX_SLUG_LEN`] characters, and
//! made unique by a numeric suffix (`-2`, `-3`, ...) that still fits the limit.

use std::future::Future;

use slug::slugify;
use thiserror::Error;

pub const MAX_SLUG_LEN: usize = 50;
const MAX_SUFFIX_ATTEMPTS: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlugError {
    #[error("slug source text is empty")]
    EmptyInput,
    #[error("failed to derive slug from `{input}`")]
    Unrepresentable { input: String },
    #[error("exhausted attempts to find a unique slug for `{base}`")]
    Exhausted { base: String },
}

#[derive(Debug, Error)]
pub enum SlugAsyncError<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    #[error(transparent)]
    Slug(#[from] SlugError),
    #[error(transparent)]
    Predicate(E),
}

/// Derive the base slug for a title.
pub fn derive_slug(input: &str) -> Result<String, SlugError> {
    if input.trim().is_empty() {
        return Err(SlugError::EmptyInput);
    }

    let candidate = truncate(&slugify(input), MAX_SLUG_LEN);
    if candidate.is_empty() {
        return Err(SlugError::Unrepresentable {
            input: input.to_string(),
        });
    }

    Ok(candidate)
}

/// Find a slug for `input` for which `is_taken` resolves to `false`.
pub async fn generate_unique_slug<F, Fut, E>(
    input: &str,
    mut is_taken: F,
) -> Result<String, SlugAsyncError<E>>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<bool, E>>,
    E: std::error::Error + Send + Sync + 'static,
{
    let base = derive_slug(input)?;

    if !is_taken(base.clone())
        .await
        .map_err(SlugAsyncError::Predicate)?
    {
        return Ok(base);
    }

    for attempt in 2..=MAX_SUFFIX_ATTEMPTS + 1 {
        let candidate = with_suffix(&base, attempt);
        if !is_taken(candidate.clone())
            .await
            .map_err(SlugAsyncError::Predicate)?
        {
            return Ok(candidate);
        }
    }

    Err(SlugAsyncError::Slug(SlugError::Exhausted { base }))
}

fn with_suffix(base: &str, attempt: usize) -> String {
    let suffix = format!("-{attempt}");
    let head = truncate(base, MAX_SLUG_LEN - suffix.len());
    format!("{head}{suffix}")
}

// slugify output is ASCII, so byte and char boundaries coincide.
fn truncate(slug: &str, max: usize) -> String {
    let cut = if slug.len() > max { &slug[..max] } else { slug };
    cut.trim_end_matches('-').to_string()
}

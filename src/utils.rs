use std::{
    path::{Component, Path},
    sync::LazyLock,
};

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::Rng;
use regex::Regex;
use sha2::{Digest, Sha256};

use crate::{
    error::UrlError,
    types::{CollectionRef, CollectionType},
};

const RESERVED_NAMES: [&str; 22] = [
    "con", "prn", "aux", "nul", "com1", "com2", "com3", "com4", "com5", "com6", "com7", "com8",
    "com9", "lpt1", "lpt2", "lpt3", "lpt4", "lpt5", "lpt6", "lpt7", "lpt8", "lpt9",
];

static CATALOG_PATH: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"/(\w+)/(\d+)").ok());

/// Extracts `{type, id}` from the first `/<type>/<id>` pair of a catalog URL.
pub fn parse_catalog_url(url: &str) -> Result<CollectionRef, UrlError> {
    let Some(captures) = CATALOG_PATH
        .as_ref()
        .and_then(|pattern| pattern.captures(url.trim()))
    else {
        return Err(UrlError::Unrecognized(url.to_string()));
    };

    let kind: CollectionType = captures[1].parse()?;
    Ok(CollectionRef::new(kind, &captures[2]))
}

/// Placeholder ids (user uploads) start with a minus sign and have no durable
/// catalog entry.
pub fn is_placeholder_id(id: &str) -> bool {
    id.starts_with('-')
}

/// Makes `name` safe as a single path component.
///
/// Slashes become dashes, characters illegal on common file systems are
/// removed, and reserved device names are blanked.
pub fn sanitize_filename(name: &str) -> String {
    let replaced = name.replace('/', "-");
    let cleaned: String = replaced
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | ':' | '"' | '\\' | '|' | '?' | '*'))
        .filter(|c| !c.is_control())
        .collect();

    if cleaned == "." || cleaned == ".." {
        return String::new();
    }

    let stem = cleaned.split('.').next().unwrap_or_default().to_lowercase();
    if RESERVED_NAMES.contains(&stem.as_str()) {
        return String::new();
    }

    let trimmed = cleaned.trim_end_matches(['.', ' ']);
    truncate_utf8(trimmed, 255).to_string()
}

/// Collapses every run of spaces, underscores and commas into one space.
pub fn collapse_separators(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut in_run = false;
    for c in value.chars() {
        if matches!(c, ' ' | '_' | ',') {
            if !in_run {
                out.push(' ');
            }
            in_run = true;
        } else {
            out.push(c);
            in_run = false;
        }
    }
    out
}

/// `sanitize_filename` followed by `collapse_separators`, with a literal
/// fallback for names that end up blank.
pub fn clean_component(value: &str, fallback: &str) -> String {
    let cleaned = collapse_separators(&sanitize_filename(value));
    if cleaned.trim().is_empty() {
        fallback.to_string()
    } else {
        cleaned
    }
}

pub fn two_digits(number: u32) -> String {
    format!("{number:02}")
}

/// Key used to compare titles when looking for an alternative track:
/// letters and digits only, lowercased.
pub fn normalize_title(title: &str) -> String {
    title
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// `clamp(floor((free - 300) / approx), 1, 20)`
pub fn concurrency_width(free_memory_mb: u64, approx_max_payload_mb: u64) -> usize {
    let budget = free_memory_mb as i64 - 300;
    let per_item = approx_max_payload_mb.max(1) as i64;
    budget.div_euclid(per_item).clamp(1, 20) as usize
}

/// Random correlation id sent with every gateway call.
pub fn correlation_id() -> u32 {
    rand::rng().random_range(0..1_000_000_000)
}

/// Digest identifying a cacheable request.
pub fn request_signature(target: &str, body: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(target.as_bytes());
    hasher.update([0u8]);
    hasher.update(body.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

/// Joins a relative path with forward slashes regardless of platform.
pub fn to_slash_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            Component::ParentDir => Some("..".to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn truncate_utf8(value: &str, max_bytes: usize) -> &str {
    if value.len() <= max_bytes {
        return value;
    }
    let mut end = max_bytes;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    &value[..end]
}

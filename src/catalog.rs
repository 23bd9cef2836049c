//! Filename codec for generated audio.
//!
//! The output directory is the catalog: each file name carries the voice,
//! a short preview of the text and the creation time in epoch milliseconds,
//! e.g. `Xiaoxiao_Hello_world_1700000000000.mp3`. Older files may use any of
//! the shorter layouts accepted by `decode_stem`.

use crate::error::CatalogError;
use chrono::{DateTime, Local, TimeZone, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const DEFAULT_PREVIEW_LENGTH: usize = 15;
pub const UNKNOWN_VOICE: &str = "Unknown";
pub const NO_PREVIEW: &str = "No preview";
const EMPTY_PLACEHOLDER: &str = "Empty";

/// Characters no file name may contain on any supported platform.
const RESERVED: &[char] = &['"', '<', '>', '|', ':', '*', '?', '\\', '/'];

lazy_static! {
    static ref UNDERSCORES: Regex = Regex::new(r"_+").unwrap();
    // Matched in this order; the first hit wins.
    static ref VOICE_TEXT_TIME: Regex = Regex::new(r"^([^_]+)_(.+)_(\d{13,17})$").unwrap();
    static ref LABEL_TIME: Regex = Regex::new(r"^(.+?)_(\d{13,17})$").unwrap();
    static ref TEXT_TIME: Regex = Regex::new(r"^([^_]+?)_(\d{13,17})$").unwrap();
    static ref TIME_ONLY: Regex = Regex::new(r"^(\d{13,17})$").unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub path: PathBuf,
    pub file_name: String,
    pub voice: String,
    pub preview: String,
    pub created_at: DateTime<Local>,
}

/// What a file name alone says about an entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedName {
    pub voice: Option<String>,
    pub preview: Option<String>,
    pub timestamp_millis: Option<i64>,
}

fn is_reserved(c: char) -> bool {
    c.is_control() || RESERVED.contains(&c)
}

/// Make text safe for use inside a file name.
///
/// Whitespace becomes `_`, reserved characters are dropped, runs of `_`
/// collapse and the result is trimmed of `_`. Never returns an empty string.
pub fn sanitize(text: &str) -> String {
    let replaced: String = text
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .filter(|c| !is_reserved(*c))
        .collect();

    let collapsed = UNDERSCORES.replace_all(&replaced, "_");
    let trimmed = collapsed.trim_matches('_');

    if trimmed.is_empty() {
        EMPTY_PLACEHOLDER.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Keep at most `limit` characters.
pub fn truncate_preview(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

pub fn preview(text: &str, limit: usize) -> String {
    truncate_preview(&sanitize(text), limit)
}

pub fn encode_stem_at(voice: &str, text: &str, limit: usize, timestamp_millis: i64) -> String {
    format!("{}_{}_{}", voice, preview(text, limit), timestamp_millis)
}

/// File name stem for a new artifact, stamped with the current time.
pub fn encode_stem(voice: &str, text: &str, limit: usize) -> String {
    encode_stem_at(voice, text, limit, Utc::now().timestamp_millis())
}

// Names written by the encoder pass through unchanged.
fn strip_reserved(segment: &str) -> Option<String> {
    let kept: String = segment.chars().filter(|c| !is_reserved(*c)).collect();
    if kept.is_empty() {
        None
    } else {
        Some(kept)
    }
}

/// Recover voice, preview and timestamp from a file stem.
///
/// Reserved characters in a hand-named file are dropped from the decoded
/// fields; a field left empty counts as missing.
pub fn decode_stem(stem: &str) -> DecodedName {
    let millis = |s: &str| s.parse::<i64>().ok();

    if let Some(caps) = VOICE_TEXT_TIME.captures(stem) {
        return DecodedName {
            voice: strip_reserved(&caps[1]),
            preview: strip_reserved(&caps[2]),
            timestamp_millis: millis(&caps[3]),
        };
    }
    if let Some(caps) = LABEL_TIME.captures(stem) {
        return DecodedName {
            voice: strip_reserved(&caps[1]),
            preview: None,
            timestamp_millis: millis(&caps[2]),
        };
    }
    // Same shape as LABEL_TIME; kept so historical files classify exactly as before.
    if let Some(caps) = TEXT_TIME.captures(stem) {
        return DecodedName {
            voice: None,
            preview: strip_reserved(&caps[1]),
            timestamp_millis: millis(&caps[2]),
        };
    }
    if let Some(caps) = TIME_ONLY.captures(stem) {
        return DecodedName {
            timestamp_millis: millis(&caps[1]),
            ..Default::default()
        };
    }
    DecodedName::default()
}

/// Epoch milliseconds (UTC) to local time. `None` when out of range.
pub fn local_time_from_millis(millis: i64) -> Option<DateTime<Local>> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .map(|utc| utc.with_timezone(&Local))
}

fn file_time(path: &Path) -> Result<DateTime<Local>, CatalogError> {
    let io_err = |source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    };
    let metadata = fs::metadata(path).map_err(io_err)?;
    // Not every filesystem records a birth time.
    let time = metadata
        .created()
        .or_else(|_| metadata.modified())
        .map_err(io_err)?;
    Ok(DateTime::<Local>::from(time))
}

/// Build a catalog entry for an existing file from its name, falling back to
/// file metadata for the time when the name has none.
pub fn decode_entry(path: &Path) -> Result<CatalogEntry, CatalogError> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| CatalogError::InvalidName(path.to_path_buf()))?;
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| CatalogError::InvalidName(path.to_path_buf()))?;

    let decoded = decode_stem(stem);
    let created_at = match decoded.timestamp_millis.and_then(local_time_from_millis) {
        Some(time) => time,
        None => file_time(path)?,
    };

    Ok(CatalogEntry {
        path: path.to_path_buf(),
        file_name: file_name.to_string(),
        voice: decoded.voice.unwrap_or_else(|| UNKNOWN_VOICE.to_string()),
        preview: decoded.preview.unwrap_or_else(|| NO_PREVIEW.to_string()),
        created_at,
    })
}

/// Rebuild the catalog from every `*.{extension}` file in `dir`, newest first.
///
/// Entries that fail to decode are logged and skipped.
pub fn load_catalog(dir: &Path, extension: &str) -> Result<Vec<CatalogEntry>, CatalogError> {
    let read_dir = fs::read_dir(dir).map_err(|source| CatalogError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut entries = Vec::new();
    for item in read_dir.flatten() {
        let path = item.path();
        let matches_ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case(extension))
            .unwrap_or(false);
        if !matches_ext || !path.is_file() {
            continue;
        }

        match decode_entry(&path) {
            Ok(entry) => entries.push(entry),
            Err(e) => warn!(error = %e, "skipping catalog entry"),
        }
    }

    entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    debug!(dir = %dir.display(), count = entries.len(), "catalog loaded");
    Ok(entries)
}

//! Transcript archives: one pretty-printed JSON array per saved conversation.
//!
//! Files are named `[ID-<id>-]<YYYY-MM-DD-HH-MM-SS>.json`. When that name is
//! already taken the writer claims `<stem>-1.json`, `<stem>-2.json`, and so on.
//! Each file is written to a temp file in the target directory and then
//! persisted without clobbering, so a reader never sees a partial archive.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tempfile::NamedTempFile;
use tracing::info;

use crate::domains::message::Message;
use crate::error::{ParleyError, Result};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";
const MAX_COLLISION_SUFFIX: u32 = 10_000;

pub fn save(messages: &[Message], conversation_id: Option<&str>, dir: &Path) -> Result<PathBuf> {
    save_at(messages, conversation_id, dir, Local::now())
}

pub fn save_at(
    messages: &[Message],
    conversation_id: Option<&str>,
    dir: &Path,
    now: DateTime<Local>,
) -> Result<PathBuf> {
    if messages.is_empty() {
        return Err(ParleyError::EmptyTranscript);
    }

    fs::create_dir_all(dir)
        .map_err(|e| ParleyError::Directory(format!("{}: {e}", dir.display())))?;

    let mut body = serde_json::to_string_pretty(messages)
        .map_err(|e| ParleyError::Serialization(e.to_string()))?;
    body.push('\n');

    let mut staged = NamedTempFile::new_in(dir).map_err(|e| ParleyError::Write(e.to_string()))?;
    staged
        .write_all(body.as_bytes())
        .map_err(|e| ParleyError::Write(e.to_string()))?;
    staged
        .as_file()
        .sync_all()
        .map_err(|e| ParleyError::Write(e.to_string()))?;

    let stem = file_stem(conversation_id, now);
    let mut suffix = 0;
    let path = loop {
        let candidate = dir.join(candidate_name(&stem, suffix));
        match staged.persist_noclobber(&candidate) {
            Ok(_) => break candidate,
            Err(err) if err.error.kind() == ErrorKind::AlreadyExists => {
                staged = err.file;
                suffix += 1;
                if suffix > MAX_COLLISION_SUFFIX {
                    return Err(ParleyError::Write(format!(
                        "no free archive name for {stem}"
                    )));
                }
            }
            Err(err) => return Err(ParleyError::Write(err.error.to_string())),
        }
    };

    let path = absolute_path(&path)?;
    info!(path = %path.display(), messages = messages.len(), "Saved conversation archive");
    Ok(path)
}

// Symlinks are resolved when possible; the lexical fallback still anchors a
// relative archive dir at the working directory.
fn absolute_path(path: &Path) -> Result<PathBuf> {
    fs::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .map_err(|e| ParleyError::Write(format!("{}: {e}", path.display())))
}

/// `ID-<id>-<timestamp>` or just `<timestamp>` when no usable id is given.
pub fn file_stem(conversation_id: Option<&str>, now: DateTime<Local>) -> String {
    let timestamp = now.format(TIMESTAMP_FORMAT).to_string();
    match conversation_id.map(sanitize_id).filter(|id| !id.is_empty()) {
        Some(id) => format!("ID-{id}-{timestamp}"),
        None => timestamp,
    }
}

fn candidate_name(stem: &str, suffix: u32) -> String {
    if suffix == 0 {
        format!("{stem}.json")
    } else {
        format!("{stem}-{suffix}.json")
    }
}

// Keeps ids from introducing path separators or other surprises into file names.
fn sanitize_id(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.') {
                ch
            } else {
                '_'
            }
        })
        .collect::<String>()
        .trim_matches('.')
        .to_string()
}

pub fn load(path: &Path) -> Result<Vec<Message>> {
    let raw = fs::read_to_string(path).map_err(|e| ParleyError::Runtime(e.to_string()))?;
    serde_json::from_str(&raw).map_err(|e| ParleyError::Serialization(e.to_string()))
}

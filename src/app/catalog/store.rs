use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::app::catalog::format::{format_entry, parse_line_bytes, validate_entry, ParsedLine};
use crate::app::error::AppError;
use crate::app::models::{CommandEntry, CommandKind};

const UTF8_BOM: &[u8] = b"\xef\xbb\xbf";

/// Line-oriented command catalogs, one file per [`CommandKind`].
///
/// The file is the source of truth: every operation re-reads it, and writes go
/// straight through. Nothing locks the file, so a hand edit racing a `remove`
/// rewrite can be lost.
#[derive(Debug, Clone)]
pub struct CatalogStore {
    dir: PathBuf,
}

impl CatalogStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, kind: CommandKind) -> PathBuf {
        self.dir.join(kind.catalog_file_name())
    }

    /// Reads the catalog for `kind` in file order. A missing file is an empty catalog.
    pub fn load(&self, kind: CommandKind, trace_id: &str) -> Result<Vec<CommandEntry>, AppError> {
        let raw = read_catalog(&self.path_for(kind), trace_id)?;
        Ok(parse_catalog(kind, &raw, trace_id))
    }

    pub fn refresh(&self, kind: CommandKind, trace_id: &str) -> Result<Vec<CommandEntry>, AppError> {
        self.load(kind, trace_id)
    }

    /// Appends one line for `entry` and returns the catalog as now stored.
    pub fn append(
        &self,
        kind: CommandKind,
        entry: &CommandEntry,
        trace_id: &str,
    ) -> Result<Vec<CommandEntry>, AppError> {
        ensure_kind(kind, entry, trace_id)?;
        validate_entry(entry).map_err(|message| AppError::validation(message, trace_id))?;

        let path = self.path_for(kind);
        fs::create_dir_all(&self.dir).map_err(|err| {
            AppError::io(
                format!("Failed to create catalog dir {}: {err}", self.dir.display()),
                trace_id,
            )
        })?;

        let existing = read_catalog(&path, trace_id)?;
        let needs_newline = existing.last().is_some_and(|byte| *byte != b'\n');

        let mut line = String::new();
        if needs_newline {
            line.push('\n');
        }
        line.push_str(&format_entry(entry));
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|err| {
                AppError::io(
                    format!("Failed to open catalog {} for writing: {err}", path.display()),
                    trace_id,
                )
            })?;
        file.write_all(line.as_bytes()).map_err(|err| {
            AppError::io(
                format!("Failed to write catalog {}: {err}", path.display()),
                trace_id,
            )
        })?;

        info!(trace_id = %trace_id, kind = %kind, title = %entry.title, "catalog entry appended");
        self.load(kind, trace_id)
    }

    /// Rewrites the catalog without the first line that parses to `entry`.
    ///
    /// Every other line, malformed or undecodable ones included, is written back
    /// byte-for-byte with its original line ending.
    pub fn remove(
        &self,
        kind: CommandKind,
        entry: &CommandEntry,
        trace_id: &str,
    ) -> Result<Vec<CommandEntry>, AppError> {
        ensure_kind(kind, entry, trace_id)?;
        let path = self.path_for(kind);
        let raw = read_catalog(&path, trace_id)?;
        let (bom, body) = split_bom(&raw);

        let lines: Vec<&[u8]> = body.split_inclusive(|byte| *byte == b'\n').collect();
        let Some(index) = lines.iter().position(|line| {
            parse_line_bytes(kind, strip_terminator(line)) == ParsedLine::Entry(entry.clone())
        }) else {
            return Err(AppError::not_found(
                format!("No {kind} catalog entry matches \"{}\"", format_entry(entry)),
                trace_id,
            ));
        };

        let mut payload = bom.to_vec();
        for (line_index, line) in lines.iter().enumerate() {
            if line_index != index {
                payload.extend_from_slice(line);
            }
        }
        fs::write(&path, payload).map_err(|err| {
            AppError::io(
                format!("Failed to rewrite catalog {}: {err}", path.display()),
                trace_id,
            )
        })?;

        info!(trace_id = %trace_id, kind = %kind, title = %entry.title, "catalog entry removed");
        self.load(kind, trace_id)
    }

    /// First entry with the given title. Titles are not unique; file order wins.
    pub fn find_by_title(
        &self,
        kind: CommandKind,
        title: &str,
        trace_id: &str,
    ) -> Result<CommandEntry, AppError> {
        let wanted = title.trim();
        self.load(kind, trace_id)?
            .into_iter()
            .find(|entry| entry.title == wanted)
            .ok_or_else(|| {
                AppError::not_found(format!("No {kind} catalog entry titled \"{wanted}\""), trace_id)
            })
    }
}

pub fn parse_catalog(kind: CommandKind, raw: &[u8], trace_id: &str) -> Vec<CommandEntry> {
    let (_, body) = split_bom(raw);
    body.split_inclusive(|byte| *byte == b'\n')
        .enumerate()
        .filter_map(|(index, line)| match parse_line_bytes(kind, strip_terminator(line)) {
            ParsedLine::Entry(entry) => Some(entry),
            ParsedLine::Skip(reason) => {
                debug!(
                    trace_id = %trace_id,
                    kind = %kind,
                    line = index + 1,
                    reason = reason.as_str(),
                    "skipping catalog line"
                );
                None
            }
        })
        .collect()
}

/// Raw catalog bytes; a missing file reads as empty.
fn read_catalog(path: &Path, trace_id: &str) -> Result<Vec<u8>, AppError> {
    match fs::read(path) {
        Ok(raw) => Ok(raw),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(Vec::new()),
        Err(err) => Err(AppError::io(
            format!("Failed to read catalog {}: {err}", path.display()),
            trace_id,
        )),
    }
}

/// Editors on Windows may prefix the file with a UTF-8 byte order mark.
fn split_bom(raw: &[u8]) -> (&[u8], &[u8]) {
    if raw.starts_with(UTF8_BOM) {
        raw.split_at(UTF8_BOM.len())
    } else {
        (&raw[..0], raw)
    }
}

fn strip_terminator(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

fn ensure_kind(kind: CommandKind, entry: &CommandEntry, trace_id: &str) -> Result<(), AppError> {
    if entry.kind != kind {
        return Err(AppError::validation(
            format!("{} entry cannot be stored in the {kind} catalog", entry.kind),
            trace_id,
        ));
    }
    Ok(())
}

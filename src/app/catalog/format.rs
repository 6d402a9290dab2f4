use crate::app::models::{CommandEntry, CommandKind};

const TITLE_MARKER: &str = "TITLE:";
const FIELD_DELIMITER: char = ';';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Blank,
    MissingTitle,
    MissingDelimiter,
    EmptyTitle,
    KindMismatch,
    InvalidUtf8,
}

impl SkipReason {
    pub fn as_str(self) -> &'static str {
        match self {
            SkipReason::Blank => "blank",
            SkipReason::MissingTitle => "missing TITLE field",
            SkipReason::MissingDelimiter => "missing ';' delimiter",
            SkipReason::EmptyTitle => "empty title",
            SkipReason::KindMismatch => "command field does not match catalog kind",
            SkipReason::InvalidUtf8 => "not valid UTF-8",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLine {
    Entry(CommandEntry),
    Skip(SkipReason),
}

/// Parses `TITLE: <title>; <KIND>_COMMAND: <template>` for the given kind.
///
/// The title runs up to the first `;`, the template is the rest of the line.
/// Whitespace around each field is trimmed.
pub fn parse_line(kind: CommandKind, line: &str) -> ParsedLine {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return ParsedLine::Skip(SkipReason::Blank);
    }
    let Some(rest) = trimmed.strip_prefix(TITLE_MARKER) else {
        return ParsedLine::Skip(SkipReason::MissingTitle);
    };
    let Some((title, command_part)) = rest.split_once(FIELD_DELIMITER) else {
        return ParsedLine::Skip(SkipReason::MissingDelimiter);
    };
    let title = title.trim();
    if title.is_empty() {
        return ParsedLine::Skip(SkipReason::EmptyTitle);
    }
    let Some(template) = command_part
        .trim_start()
        .strip_prefix(kind.marker())
        .and_then(|tail| tail.strip_prefix(':'))
    else {
        return ParsedLine::Skip(SkipReason::KindMismatch);
    };
    ParsedLine::Entry(CommandEntry {
        title: title.to_string(),
        kind,
        template: template.trim().to_string(),
    })
}

/// Byte-level variant of [`parse_line`]; undecodable lines are skipped, not fatal.
pub fn parse_line_bytes(kind: CommandKind, line: &[u8]) -> ParsedLine {
    match std::str::from_utf8(line) {
        Ok(line) => parse_line(kind, line),
        Err(_) => ParsedLine::Skip(SkipReason::InvalidUtf8),
    }
}

pub fn format_entry(entry: &CommandEntry) -> String {
    let template = entry.template.trim();
    if template.is_empty() {
        format!("{TITLE_MARKER} {}; {}:", entry.title.trim(), entry.kind.marker())
    } else {
        format!(
            "{TITLE_MARKER} {}; {}: {}",
            entry.title.trim(),
            entry.kind.marker(),
            template
        )
    }
}

/// Rejects entries whose serialized line would not parse back to themselves.
pub fn validate_entry(entry: &CommandEntry) -> Result<(), String> {
    if entry.title.trim().is_empty() {
        return Err("title is required".to_string());
    }
    if entry.title.contains(FIELD_DELIMITER) {
        return Err("title must not contain ';'".to_string());
    }
    if entry.title.contains(['\n', '\r']) || entry.template.contains(['\n', '\r']) {
        return Err("title and template must be single-line".to_string());
    }
    Ok(())
}

//! M3U playlist decoding
//!
//! Content is split on `#EXTINF:` markers. Each entry carries an attribute
//! block and a title on the marker line, optional directive lines such as
//! `#EXTGRP:`, and the stream URL on the first line that is not a directive.

use std::collections::HashMap;

use tracing::trace;

use crate::errors::ParseSkip;
use crate::ingestor::url_filter::UrlFilter;
use crate::models::{ParseOutcome, RawRecord};

const ENTRY_MARKER: &str = "#EXTINF:";
const GROUP_DIRECTIVE: &str = "#EXTGRP:";

/// Decode M3U text into records, skipping malformed or filtered entries
pub fn parse_m3u(content: &str, filter: &UrlFilter) -> ParseOutcome {
    let mut outcome = ParseOutcome::default();

    // The chunk before the first marker is the `#EXTM3U` header
    for entry in content.split(ENTRY_MARKER).skip(1) {
        match parse_entry(entry) {
            Ok(record) => match filter.check(&record.stream_url) {
                Ok(()) => outcome.records.push(record),
                Err(reason) => {
                    trace!("Skipping '{}': {}", record.channel_name, reason);
                    outcome.record_skip(reason);
                }
            },
            Err(reason) => {
                trace!("Skipping M3U entry: {}", reason);
                outcome.record_skip(reason);
            }
        }
    }

    outcome
}

fn parse_entry(entry: &str) -> Result<RawRecord, ParseSkip> {
    let mut lines = entry.lines();
    let info = lines.next().unwrap_or_default().trim();

    let (attribute_block, title) = split_title(info).ok_or(ParseSkip::MissingAttributes)?;
    let attributes = parse_attributes(attribute_block);

    let mut group = attributes.get("group-title").cloned().unwrap_or_default();
    let mut stream_url = None;
    for line in lines.map(str::trim).filter(|l| !l.is_empty()) {
        if let Some(extgrp) = line.strip_prefix(GROUP_DIRECTIVE) {
            if group.is_empty() {
                group = extgrp.trim().to_string();
            }
        } else if !line.starts_with('#') {
            stream_url = Some(line);
            break;
        }
    }

    let name = match title.trim() {
        "" => attributes
            .get("tvg-name")
            .map(|n| n.trim())
            .unwrap_or_default(),
        t => t,
    };
    if name.is_empty() {
        return Err(ParseSkip::EmptyName);
    }

    let stream_url = stream_url.ok_or(ParseSkip::MissingUrl)?;
    Ok(RawRecord::new(group, name, stream_url))
}

/// Split `<attributes>,<title>` at the first comma outside double quotes
fn split_title(info: &str) -> Option<(&str, &str)> {
    let mut in_quotes = false;
    for (i, ch) in info.char_indices() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => return Some((&info[..i], &info[i + 1..])),
            _ => {}
        }
    }
    None
}

/// Parse `key="value"` and `key=value` pairs, ignoring bare tokens such as the
/// leading duration. Keys are lower-cased; the first occurrence wins.
fn parse_attributes(block: &str) -> HashMap<String, String> {
    let mut attributes = HashMap::new();
    let mut chars = block.chars().peekable();

    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}

        let mut key = String::new();
        while let Some(ch) = chars.next_if(|c| *c != '=' && !c.is_whitespace()) {
            key.push(ch);
        }

        if chars.next_if_eq(&'=').is_none() {
            if chars.peek().is_none() {
                break;
            }
            continue;
        }

        let value: String = if chars.next_if_eq(&'"').is_some() {
            chars.by_ref().take_while(|c| *c != '"').collect()
        } else {
            let mut value = String::new();
            while let Some(ch) = chars.next_if(|c| !c.is_whitespace()) {
                value.push(ch);
            }
            value
        };

        if !key.is_empty() {
            attributes.entry(key.to_lowercase()).or_insert(value);
        }
    }

    attributes
}

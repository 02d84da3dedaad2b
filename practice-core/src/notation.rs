//! # Notation Module
//!
//! Parser for the compact plaintext score format used by the practice
//! session. A score is line oriented: metadata lines (`T:` title, `C:`
//! composer, `K:` key, `M:` time signature), `%` comment lines, and note
//! lines. Note lines are split into measures on `|`, and each token names
//! one pitch with an optional duration suffix.
//!
//! The parser is lenient: tokens it cannot resolve are dropped silently,
//! and an input with no notes at all parses to an empty sheet rather than
//! an error.

use once_cell::sync::Lazy;
use std::collections::BTreeMap;

/// A single parsed note.
///
/// `index` is the note's position in the flattened whole-piece sequence
/// and is the handle the navigator moves over.
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    /// Note name, e.g. "G4" or "C#5".
    pub pitch: String,
    /// Length in quarter-note beats.
    pub duration: f32,
    /// Zero-based measure this note belongs to.
    pub measure: usize,
    /// Position in the flattened piece-wide sequence.
    pub index: usize,
}

/// One measure of a parsed sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct Measure {
    pub number: usize,
    pub notes: Vec<Note>,
    /// Set on the first measure only; the signature is global.
    pub time_signature: Option<String>,
}

/// A fully parsed score.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub title: String,
    pub composer: Option<String>,
    pub key: String,
    pub time_signature: String,
    pub measures: Vec<Measure>,
    /// Concatenation of all measure note lists; `all_notes[i].index == i`.
    pub all_notes: Vec<Note>,
}

/// Fixed table mapping pitch symbols to note names.
///
/// Uppercase letters are octave 4, lowercase octave 5. A leading `^` marks
/// a sharp on the five letters that have one. A leading `_` is accepted as
/// a flat marker but resolves to the natural pitch of the same letter.
static PITCH_SYMBOLS: Lazy<BTreeMap<String, String>> = Lazy::new(|| {
    const LETTERS: [char; 7] = ['C', 'D', 'E', 'F', 'G', 'A', 'B'];
    const SHARPABLE: [char; 5] = ['C', 'D', 'F', 'G', 'A'];
    let mut table = BTreeMap::new();
    for letter in LETTERS {
        let lower = letter.to_ascii_lowercase();
        table.insert(letter.to_string(), format!("{letter}4"));
        table.insert(lower.to_string(), format!("{letter}5"));
        table.insert(format!("_{letter}"), format!("{letter}4"));
        table.insert(format!("_{lower}"), format!("{letter}5"));
    }
    for letter in SHARPABLE {
        let lower = letter.to_ascii_lowercase();
        table.insert(format!("^{letter}"), format!("{letter}#4"));
        table.insert(format!("^{lower}"), format!("{letter}#5"));
    }
    table
});

/// Parses compact notation text into a `Sheet`.
///
/// Never fails: malformed tokens are skipped and missing metadata falls
/// back to defaults (title "Untitled", key "C", 4/4 time). An input with
/// no note tokens produces a sheet with empty measures.
pub fn parse_notation(text: &str) -> Sheet {
    let mut title: Option<String> = None;
    let mut composer: Option<String> = None;
    let mut key: Option<String> = None;
    let mut time_signature: Option<String> = None;
    let mut token_lines: Vec<&str> = Vec::new();

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('%') {
            continue;
        }
        if let Some(value) = trimmed.strip_prefix("T:") {
            title = Some(value.trim().to_string());
        } else if let Some(value) = trimmed.strip_prefix("C:") {
            composer = Some(value.trim().to_string());
        } else if let Some(value) = trimmed.strip_prefix("K:") {
            key = Some(value.trim().to_string());
        } else if let Some(value) = trimmed.strip_prefix("M:") {
            time_signature = Some(value.trim().to_string());
        } else {
            token_lines.push(trimmed);
        }
    }

    let time_signature = time_signature.unwrap_or_else(|| "4/4".to_string());
    let token_buffer = token_lines.join(" ");

    let mut measures = Vec::new();
    let mut all_notes: Vec<Note> = Vec::new();
    for segment in token_buffer.split('|') {
        if segment.trim().is_empty() {
            continue;
        }
        let number = measures.len();
        let mut notes = Vec::new();
        for token in segment.split_whitespace() {
            if let Some(note) = resolve_token(token, number, all_notes.len()) {
                notes.push(note.clone());
                all_notes.push(note);
            }
        }
        measures.push(Measure {
            number,
            notes,
            time_signature: (number == 0).then(|| time_signature.clone()),
        });
    }

    Sheet {
        title: title.unwrap_or_else(|| "Untitled".to_string()),
        composer,
        key: key.unwrap_or_else(|| "C".to_string()),
        time_signature,
        measures,
        all_notes,
    }
}

/// Resolves one token into a note.
///
/// A token is a pitch symbol followed by an optional duration suffix (the
/// maximal trailing run of digits, `/` and `.`). Tokens whose symbol is
/// not in the table yield `None` and are dropped whole, suffix included.
fn resolve_token(token: &str, measure: usize, index: usize) -> Option<Note> {
    let symbol = token.trim_end_matches(|c: char| c.is_ascii_digit() || c == '/' || c == '.');
    let suffix = &token[symbol.len()..];
    let pitch = PITCH_SYMBOLS.get(symbol)?.clone();
    let duration = if suffix.is_empty() {
        1.0
    } else {
        parse_duration(suffix).unwrap_or(1.0)
    };
    Some(Note {
        pitch,
        duration,
        measure,
        index,
    })
}

/// Parses a duration suffix: "a/b" as a rational, a bare numeral as its
/// decimal value.
fn parse_duration(suffix: &str) -> Option<f32> {
    if let Some((numerator, denominator)) = suffix.split_once('/') {
        let numerator: f32 = numerator.parse().ok()?;
        let denominator: f32 = denominator.parse().ok()?;
        if denominator == 0.0 {
            return None;
        }
        Some(numerator / denominator)
    } else {
        suffix.parse().ok()
    }
}

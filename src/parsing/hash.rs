use crate::error::{Error, Result};
use crate::parsing::bpm::normalize_float_digits;
use once_cell::sync::Lazy;
use regex::Regex;
use sha1::{Digest, Sha1};

static LINE_ENDINGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\r\n?").unwrap());
static COMMENTS: Lazy<Regex> = Lazy::new(|| Regex::new(r"//[^\n]*").unwrap());
static SPACING: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\r\t\f\v ]+").unwrap());

#[inline]
fn is_all_zero(row: &str) -> bool {
    row.bytes().all(|c| c == b'0')
}

/// Halves a measure while every odd row is empty, so the same rhythm written
/// at a finer resolution minimizes to the same rows.
pub fn minimize_measure(mut measure: Vec<&str>) -> Result<Vec<&str>> {
    if measure.is_empty() {
        return Err(Error::MalformedChart("empty measure".to_string()));
    }
    while measure.len() % 2 == 0 {
        if measure.iter().skip(1).step_by(2).any(|row| !is_all_zero(row)) {
            break;
        }
        measure = measure.into_iter().step_by(2).collect();
    }
    Ok(measure)
}

/// Minimizes every measure of cleaned note text. Measures are closed by
/// `,` rows; the rows of the result are joined with `\n`.
pub fn minimize_chart(text: &str) -> Result<String> {
    let mut rows: Vec<&str> = Vec::new();
    let mut measure: Vec<&str> = Vec::new();
    for line in text.split('\n') {
        if line == "," {
            rows.extend(minimize_measure(std::mem::take(&mut measure))?);
            rows.push(",");
        } else {
            measure.push(line);
        }
    }
    if !measure.is_empty() {
        rows.extend(minimize_measure(measure)?);
    }
    Ok(rows.join("\n"))
}

/// Strips line-ending, comment and spacing differences from note text.
pub fn clean_notes(notes: &str) -> String {
    let text = LINE_ENDINGS.replace_all(notes, "\n");
    let text = COMMENTS.replace_all(text.trim(), "");
    SPACING.replace_all(&text, "").into_owned()
}

/// Content hash of a chart: SHA-1 of its minimized notes followed by its
/// normalized BPMs, as lowercase hex.
pub fn chart_hash(notes: &str, bpms: &str) -> Result<String> {
    let notes = minimize_chart(&clean_notes(notes))?;
    let bpms = normalize_float_digits(bpms)?;
    let mut hasher = Sha1::new();
    hasher.update(notes.as_bytes());
    hasher.update(bpms.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

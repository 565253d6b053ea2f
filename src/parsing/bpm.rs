use crate::error::{Error, Result};
use crate::game::timing::{Segment, beat_to_f64, snap_to_row};
use num_rational::Ratio;
use serde::Serialize;
use std::fmt::{self, Write as FmtWrite};

/// Digits after the decimal point kept when reading a number exactly.
const MAX_FRACTION_DIGITS: usize = 6;

/// Reads a decimal such as `"-12.5"` as an exact fraction. Exponent forms
/// fall back to the nearest small fraction of the float value.
pub fn parse_rational(text: &str) -> Option<Ratio<i64>> {
    let s = text.trim_matches(|c: char| c.is_whitespace() || c.is_control());
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits, ""));
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    let all_digits = |part: &str| part.bytes().all(|c| c.is_ascii_digit());
    if !all_digits(int_part) || !all_digits(frac_part) {
        return s
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .and_then(Ratio::<i64>::approximate_float);
    }

    let frac = &frac_part[..frac_part.len().min(MAX_FRACTION_DIGITS)];
    let denom = 10i64.pow(frac.len() as u32);
    let whole: i64 = if int_part.is_empty() { 0 } else { int_part.parse().ok()? };
    let fraction: i64 = if frac.is_empty() { 0 } else { frac.parse().ok()? };
    let numer = whole.checked_mul(denom)?.checked_add(fraction)?;
    Some(Ratio::new(if negative { -numer } else { numer }, denom))
}

/// Parses `beat=value,beat=value,...` tag text. Beats snap to the 48-rows-per-beat
/// grid; values are kept exact. The result is sorted by beat.
pub fn parse_segments(text: &str, tag: &str) -> Result<Vec<Segment>> {
    let mut segments = Vec::new();
    for pair in text.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (beat_str, value_str) = pair.rsplit_once('=').ok_or_else(|| Error::timing(tag, pair))?;
        let beat = parse_rational(beat_str).ok_or_else(|| Error::timing(tag, pair))?;
        let value = parse_rational(value_str).ok_or_else(|| Error::timing(tag, pair))?;
        segments.push(Segment::new(snap_to_row(beat), value));
    }
    segments.sort_by(|a, b| a.beat.cmp(&b.beat));
    Ok(segments)
}

/// Rewrites `beat=bpm` pairs with three decimals each, so equivalent BPM text
/// compares equal.
pub fn normalize_float_digits(param: &str) -> Result<String> {
    let mut output = String::with_capacity(param.len());
    let mut first = true;
    for beat_bpm in param.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if !first {
            output.push(',');
        } else {
            first = false;
        }

        let (beat_str, bpm_str) = beat_bpm
            .rsplit_once('=')
            .ok_or_else(|| Error::timing("BPMS", beat_bpm))?;
        let beat_str = beat_str.trim_matches(|c: char| c.is_whitespace() || c.is_control());
        let bpm_str = bpm_str.trim_matches(|c: char| c.is_whitespace() || c.is_control());

        match (beat_str.parse::<f64>(), bpm_str.parse::<f64>()) {
            // `{:.3}` rounds once, from the exact binary value.
            (Ok(beat_val), Ok(bpm_val)) => {
                let _ = write!(&mut output, "{:.3}={:.3}", beat_val, bpm_val);
            }
            _ => return Err(Error::timing("BPMS", beat_bpm)),
        }
    }
    Ok(output)
}

/// Lowest and highest BPM, ignoring zero-BPM segments.
pub fn bpm_range(bpms: &[Segment]) -> Option<(f64, f64)> {
    bpms.iter()
        .filter(|seg| *seg.value.numer() != 0)
        .map(|seg| beat_to_f64(seg.value))
        .fold(None, |acc, bpm| match acc {
            None => Some((bpm, bpm)),
            Some((lo, hi)) => Some((lo.min(bpm), hi.max(bpm))),
        })
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DisplayBpm {
    Static { bpm: f64 },
    Range { min: f64, max: f64 },
    Random,
}

impl DisplayBpm {
    /// Reads `#DISPLAYBPM`, falling back to the actual BPM range when the tag
    /// is absent or unreadable.
    pub fn resolve(display_tag: Option<&str>, bpms: &[Segment]) -> Option<DisplayBpm> {
        let tag = display_tag.map(str::trim).filter(|s| !s.is_empty());
        if let Some(tag) = tag {
            if tag == "*" {
                return Some(DisplayBpm::Random);
            }
            if let Some((lo, hi)) = tag.split_once(':') {
                if let (Ok(lo), Ok(hi)) = (lo.trim().parse::<f64>(), hi.trim().parse::<f64>()) {
                    return Some(DisplayBpm::from_bounds(lo.min(hi), lo.max(hi)));
                }
            } else if let Ok(bpm) = tag.parse::<f64>() {
                return Some(DisplayBpm::Static { bpm });
            }
            log::warn!("Unreadable #DISPLAYBPM '{}', using actual BPMs.", tag);
        }
        bpm_range(bpms).map(|(lo, hi)| DisplayBpm::from_bounds(lo, hi))
    }

    fn from_bounds(min: f64, max: f64) -> DisplayBpm {
        if (max - min).abs() < 1e-6 {
            DisplayBpm::Static { bpm: min }
        } else {
            DisplayBpm::Range { min, max }
        }
    }
}

impl fmt::Display for DisplayBpm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            DisplayBpm::Static { bpm } => write!(f, "{}", bpm.round() as i64),
            DisplayBpm::Range { min, max } => {
                let (lo, hi) = (min.round() as i64, max.round() as i64);
                if lo == hi {
                    write!(f, "{}", lo)
                } else {
                    write!(f, "{} - {}", lo, hi)
                }
            }
            DisplayBpm::Random => f.write_str("???"),
        }
    }
}

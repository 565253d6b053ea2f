use crate::parsing::stream::StreamInfo;

/// How far breaks are folded into the surrounding stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakdownMode {
    /// Every run and every break longer than one measure, e.g. `16 (4) 8 8`.
    Detailed,
    /// Breaks become symbols, e.g. `16-8'8`.
    Symbols,
    /// One-measure breaks join the stream around them, e.g. `16-17*`.
    Partial,
    /// Breaks under five measures join the stream too, e.g. `36*`.
    Simplified,
}

const MODES: [BreakdownMode; 4] = [
    BreakdownMode::Detailed,
    BreakdownMode::Symbols,
    BreakdownMode::Partial,
    BreakdownMode::Simplified,
];

/// Text for the stream layout of a chart: the most detailed form that fits
/// in `max_parts` parts, then the stream BPM for anything other than 16ths.
pub fn generate_breakdown(info: &StreamInfo, max_parts: usize) -> String {
    if info.segments.is_empty() {
        return "No streams".to_string();
    }

    let mut breakdown = MODES
        .iter()
        .find_map(|&mode| breakdown_in_mode(info, mode, max_parts))
        .unwrap_or_else(|| format!("{} total", info.total_stream));

    if info.quantization != 16 {
        if let Some((lo, hi)) = info.bpm_range {
            let multiplier = multiplier(info);
            let lo_adj = (lo * multiplier).round_ties_even() as i64;
            let hi_adj = (hi * multiplier).round_ties_even() as i64;
            if lo_adj == hi_adj || hi - lo < 1e-9 {
                breakdown.push_str(&format!(" @ {}", hi_adj));
            } else {
                breakdown.push_str(&format!(" @ {}-{}", lo_adj, hi_adj));
            }
        }
    }
    breakdown
}

/// The breakdown in one mode, or `None` if it needs more than `max_parts` parts.
pub fn breakdown_in_mode(
    info: &StreamInfo,
    mode: BreakdownMode,
    max_parts: usize,
) -> Option<String> {
    match mode {
        BreakdownMode::Detailed => detailed_breakdown(info, max_parts),
        _ => simplified_breakdown(info, mode, max_parts),
    }
}

fn multiplier(info: &StreamInfo) -> f64 {
    info.quantization as f64 / 16.0
}

fn detailed_breakdown(info: &StreamInfo, max_parts: usize) -> Option<String> {
    if info.segments.len() > max_parts {
        return None;
    }
    let multiplier = multiplier(info);
    let parts: Vec<String> = info
        .segments
        .iter()
        .map(|&seg| {
            let length = (seg.unsigned_abs() as f64 * multiplier).floor() as u64;
            if seg > 0 {
                length.to_string()
            } else {
                format!("({})", length)
            }
        })
        .collect();
    Some(parts.join(" "))
}

#[inline]
pub fn break_symbol(scaled_length: f64) -> &'static str {
    if scaled_length < 2.0 {
        "'"
    } else if scaled_length < 5.0 {
        "-"
    } else if scaled_length < 32.0 {
        "/"
    } else {
        " | "
    }
}

struct PartBuilder {
    multiplier: f64,
    parts: Vec<String>,
    /// Stream measures so far, unscaled.
    stream: u64,
    broken: bool,
}

impl PartBuilder {
    fn finish_part(&mut self, scaled_break: Option<f64>) {
        let mut part = ((self.stream as f64 * self.multiplier).floor() as u64).to_string();
        if self.broken {
            part.push('*');
        }
        if let Some(length) = scaled_break {
            part.push_str(break_symbol(length));
        }
        self.parts.push(part);
        self.stream = 0;
        self.broken = false;
    }
}

fn simplified_breakdown(
    info: &StreamInfo,
    mode: BreakdownMode,
    max_parts: usize,
) -> Option<String> {
    let segs = &info.segments;
    let mut builder = PartBuilder {
        multiplier: multiplier(info),
        parts: Vec::new(),
        stream: 0,
        broken: false,
    };

    for (i, &seg) in segs.iter().enumerate() {
        // One more part always follows the loop.
        if builder.parts.len() >= max_parts {
            return None;
        }
        if seg > 0 {
            if i > 0 && segs[i - 1] > 0 {
                if mode == BreakdownMode::Symbols {
                    builder.finish_part(Some(builder.multiplier));
                } else {
                    builder.stream += 1;
                    builder.broken = true;
                }
            }
            builder.stream += seg as u64;
        } else {
            let length = seg.unsigned_abs() as u64;
            let scaled = length as f64 * builder.multiplier;
            if mode == BreakdownMode::Simplified && scaled < 5.0 {
                builder.stream += length;
                builder.broken = true;
            } else {
                builder.finish_part(Some(scaled));
            }
        }
    }

    if builder.parts.len() == max_parts {
        return None;
    }
    builder.finish_part(None);
    Some(builder.parts.concat())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(segments: &[i32], quantization: u32, bpm_range: Option<(f64, f64)>) -> StreamInfo {
        let total_stream = segments.iter().filter(|&&s| s > 0).sum::<i32>() as u32;
        StreamInfo {
            segments: segments.to_vec(),
            quantization,
            bpm_range,
            total_stream,
            total_break: 0,
        }
    }

    #[test]
    fn empty_is_no_streams() {
        assert_eq!(generate_breakdown(&info(&[], 24, Some((150.0, 150.0))), 24), "No streams");
    }

    #[test]
    fn detailed_when_it_fits() {
        let i = info(&[16, -4, 8, 8], 16, Some((140.0, 140.0)));
        assert_eq!(generate_breakdown(&i, 24), "16 (4) 8 8");
    }

    #[test]
    fn lengths_scale_with_quantization() {
        let i = info(&[3, -2, 5], 24, Some((150.0, 150.0)));
        assert_eq!(generate_breakdown(&i, 24), "4 (3) 7 @ 225");
    }

    #[test]
    fn symbol_levels() {
        let i = info(&[16, -3, 8, 8, -40, 4], 16, None);
        assert_eq!(
            breakdown_in_mode(&i, BreakdownMode::Symbols, 24).unwrap(),
            "16-8'8 | 4"
        );
        assert_eq!(
            breakdown_in_mode(&i, BreakdownMode::Partial, 24).unwrap(),
            "16-17* | 4"
        );
        assert_eq!(
            breakdown_in_mode(&i, BreakdownMode::Simplified, 24).unwrap(),
            "36* | 4"
        );
    }

    #[test]
    fn falls_back_as_parts_run_out() {
        let i = info(&[16, -3, 8, 8, -40, 4], 16, None);
        // 6 segments: the detailed form needs 6 parts, symbols need 4.
        assert_eq!(generate_breakdown(&i, 5), "16-8'8 | 4");
        assert_eq!(generate_breakdown(&i, 3), "16-17* | 4");
        assert_eq!(generate_breakdown(&i, 2), "36* | 4");
        assert_eq!(generate_breakdown(&i, 1), "36 total");
    }

    #[test]
    fn bpm_suffix() {
        let range = info(&[4], 20, Some((150.0, 180.0)));
        assert_eq!(generate_breakdown(&range, 24), "5 @ 188-225");
        // 0.5 rounds to even on both ends.
        let tie = info(&[4], 32, Some((120.25, 120.25)));
        assert_eq!(generate_breakdown(&tie, 24), "8 @ 240");
        let sixteenths = info(&[4], 16, Some((150.0, 180.0)));
        assert_eq!(generate_breakdown(&sixteenths, 24), "4");
    }

    #[test]
    fn break_symbols() {
        assert_eq!(break_symbol(1.5), "'");
        assert_eq!(break_symbol(2.0), "-");
        assert_eq!(break_symbol(4.99), "-");
        assert_eq!(break_symbol(5.0), "/");
        assert_eq!(break_symbol(32.0), " | ");
    }
}

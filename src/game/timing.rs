use crate::parsing::bpm::parse_segments;
use crate::error::{Error, Result};
use log::{debug, warn};
use num_rational::Ratio;

/// An exact position in a chart. One measure is four beats.
pub type Beat = Ratio<i64>;

/// Rows per beat in StepMania. Segment beats snap to this grid.
pub const ROWS_PER_BEAT: i64 = 48;

const FALLBACK_BPM: f64 = 120.0;

/// Slack used when comparing a beat's time against the latest time already
/// reached, so float drift at the end of a negative region stays hittable.
const CATCH_UP_EPSILON: f64 = 1e-6;

#[inline]
pub fn beat_from_int(beat: i64) -> Beat {
    Ratio::from_integer(beat)
}

#[inline]
pub fn beat_to_f64(beat: Beat) -> f64 {
    *beat.numer() as f64 / *beat.denom() as f64
}

/// Snaps a beat to the nearest 1/48 beat.
pub fn snap_to_row(beat: Beat) -> Beat {
    let scaled = beat * ROWS_PER_BEAT;
    Ratio::new(scaled.round().to_integer(), ROWS_PER_BEAT)
}

/// A `{beat, value}` pair. BPM changes, stops, delays, warps and fake regions
/// all share this shape.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Segment {
    pub beat: Beat,
    pub value: Ratio<i64>,
}

impl Segment {
    pub fn new(beat: Beat, value: Ratio<i64>) -> Self {
        Self { beat, value }
    }

    #[inline]
    pub fn value_f64(&self) -> f64 {
        beat_to_f64(self.value)
    }
}

/// The raw segment lists a timing model is built from.
#[derive(Clone, Debug, Default)]
pub struct TimingSegments {
    pub bpms: Vec<Segment>,
    pub stops: Vec<Segment>,
    pub delays: Vec<Segment>,
    pub warps: Vec<Segment>,
    /// `#OFFSET`, in seconds.
    pub offset: f64,
}

impl TimingSegments {
    /// Parses timing tag text. Blank tags are empty lists.
    pub fn from_tags(
        bpms: &str,
        stops: &str,
        delays: &str,
        warps: &str,
        offset: &str,
    ) -> Result<Self> {
        let offset = if offset.trim().is_empty() {
            0.0
        } else {
            offset
                .trim()
                .parse::<f64>()
                .map_err(|_| Error::timing("OFFSET", offset))?
        };
        Ok(Self {
            bpms: parse_segments(bpms, "BPMS")?,
            stops: parse_segments(stops, "STOPS")?,
            delays: parse_segments(delays, "DELAYS")?,
            warps: parse_segments(warps, "WARPS")?,
            offset,
        })
    }
}

#[derive(Debug, Clone, Copy)]
struct Breakpoint {
    beat: Beat,
    /// Time at `beat` from BPMs and warps alone (no stops, delays or offset).
    base_time: f64,
    bpm: f64,
    warped: bool,
}

/// Converts beats to seconds and decides which beats a player can reach.
#[derive(Debug, Clone)]
pub struct TimingModel {
    breakpoints: Vec<Breakpoint>,
    /// Stops sorted by beat, with `stop_sums[i]` the total of the first `i` stops.
    stops: Vec<(Beat, f64)>,
    stop_sums: Vec<f64>,
    delays: Vec<(Beat, f64)>,
    delay_sums: Vec<f64>,
    /// Explicit warps as `[start, end)` beat spans.
    warps: Vec<(Beat, Beat)>,
    offset: f64,
    /// `(beat, latest time reached on [0, beat])` at every beat where the
    /// time curve can bend or jump.
    peaks: Vec<(Beat, f64)>,
}

impl Default for TimingModel {
    fn default() -> Self {
        TimingModel::new(TimingSegments::default())
    }
}

impl TimingModel {
    pub fn from_tags(
        bpms: &str,
        stops: &str,
        delays: &str,
        warps: &str,
        offset: &str,
    ) -> Result<Self> {
        Ok(Self::new(TimingSegments::from_tags(bpms, stops, delays, warps, offset)?))
    }

    pub fn new(segments: TimingSegments) -> Self {
        let mut bpms: Vec<Segment> = segments
            .bpms
            .into_iter()
            .filter(|seg| *seg.value.numer() != 0)
            .collect();
        bpms.sort_by(|a, b| a.beat.cmp(&b.beat));
        if bpms.is_empty() {
            warn!("No usable BPM segments, falling back to {} BPM.", FALLBACK_BPM);
        }

        let warps: Vec<(Beat, Beat)> = segments
            .warps
            .iter()
            .filter(|seg| seg.value > Ratio::from_integer(0))
            .map(|seg| (seg.beat, seg.beat + seg.value))
            .collect();

        let zero = beat_from_int(0);
        let mut points: Vec<Beat> = std::iter::once(zero)
            .chain(bpms.iter().map(|seg| seg.beat))
            .chain(warps.iter().flat_map(|&(start, end)| [start, end]))
            .filter(|beat| *beat >= zero)
            .collect();
        points.sort();
        points.dedup();

        let bpm_at = |beat: Beat| -> f64 {
            match bpms.iter().rposition(|seg| seg.beat <= beat) {
                Some(i) => bpms[i].value_f64(),
                None => bpms.first().map_or(FALLBACK_BPM, Segment::value_f64),
            }
        };

        let mut breakpoints: Vec<Breakpoint> = Vec::with_capacity(points.len());
        for beat in points {
            let base_time = match breakpoints.last() {
                Some(prev) => prev.base_time + span_seconds(prev, beat),
                None => 0.0,
            };
            breakpoints.push(Breakpoint {
                beat,
                base_time,
                bpm: bpm_at(beat),
                warped: warps.iter().any(|&(start, end)| start <= beat && beat < end),
            });
        }

        let (stops, stop_sums) = timed_points(&segments.stops);
        let (delays, delay_sums) = timed_points(&segments.delays);

        let mut model = Self {
            breakpoints,
            stops,
            stop_sums,
            delays,
            delay_sums,
            warps,
            offset: segments.offset,
            peaks: Vec::new(),
        };
        model.peaks = model.compute_peaks();
        debug!(
            "TimingModel built: {} breakpoints, {} stops, {} delays, {} warps.",
            model.breakpoints.len(),
            model.stops.len(),
            model.delays.len(),
            model.warps.len()
        );
        model
    }

    /// Seconds from the start of the music to `beat`. Stops on `beat` are not
    /// included yet; delays on `beat` are.
    pub fn time_at(&self, beat: Beat) -> f64 {
        -self.offset + self.base_time(beat) + self.stops_before(beat) + self.delays_through(beat)
    }

    /// The BPM in effect at `beat`.
    pub fn bpm_at(&self, beat: Beat) -> f64 {
        self.breakpoint_for(beat).bpm
    }

    /// Whether a note on `beat` can be hit.
    pub fn hittable(&self, beat: Beat) -> bool {
        if self.in_warp(beat) && !self.has_stop_or_delay_at(beat) {
            return false;
        }
        if self.bpm_at(beat) < 0.0 {
            return false;
        }
        match self.peak_before(beat) {
            Some(peak) => self.time_at(beat) >= peak - CATCH_UP_EPSILON,
            None => true,
        }
    }

    fn in_warp(&self, beat: Beat) -> bool {
        self.warps.iter().any(|&(start, end)| start <= beat && beat < end)
    }

    fn has_stop_or_delay_at(&self, beat: Beat) -> bool {
        self.stops.iter().chain(self.delays.iter()).any(|(b, _)| *b == beat)
    }

    fn breakpoint_for(&self, beat: Beat) -> &Breakpoint {
        let idx = self.breakpoints.partition_point(|bp| bp.beat <= beat);
        &self.breakpoints[idx.saturating_sub(1)]
    }

    fn base_time(&self, beat: Beat) -> f64 {
        let bp = self.breakpoint_for(beat);
        if beat < bp.beat {
            // Before beat 0: extrapolate with the opening tempo.
            return bp.base_time + beat_to_f64(beat - bp.beat) * 60.0 / bp.bpm;
        }
        bp.base_time + span_seconds(bp, beat)
    }

    fn stops_before(&self, beat: Beat) -> f64 {
        self.stop_sums[self.stops.partition_point(|(b, _)| *b < beat)]
    }

    fn delays_through(&self, beat: Beat) -> f64 {
        self.delay_sums[self.delays.partition_point(|(b, _)| *b <= beat)]
    }

    fn peak_before(&self, beat: Beat) -> Option<f64> {
        let idx = self.peaks.partition_point(|(b, _)| *b < beat);
        idx.checked_sub(1).map(|i| self.peaks[i].1)
    }

    fn compute_peaks(&self) -> Vec<(Beat, f64)> {
        let mut beats: Vec<Beat> = self
            .breakpoints
            .iter()
            .map(|bp| bp.beat)
            .chain(self.stops.iter().map(|(b, _)| *b))
            .chain(self.delays.iter().map(|(b, _)| *b))
            .filter(|b| *b >= beat_from_int(0))
            .collect();
        beats.sort();
        beats.dedup();

        let mut peaks = Vec::with_capacity(beats.len());
        let mut running = f64::NEG_INFINITY;
        for beat in beats {
            let at = self.time_at(beat);
            let delay_here: f64 = sum_at(&self.delays, beat);
            let stop_here: f64 = sum_at(&self.stops, beat);
            // Approaching `beat`, landing on it, and leaving it after its stop.
            running = running.max(at - delay_here).max(at).max(at + stop_here);
            peaks.push((beat, running));
        }
        peaks
    }
}

fn span_seconds(from: &Breakpoint, to: Beat) -> f64 {
    if from.warped {
        0.0
    } else {
        beat_to_f64(to - from.beat) * 60.0 / from.bpm
    }
}

fn timed_points(segments: &[Segment]) -> (Vec<(Beat, f64)>, Vec<f64>) {
    let mut points: Vec<(Beat, f64)> = segments
        .iter()
        .map(|seg| (seg.beat, seg.value_f64()))
        .collect();
    points.sort_by(|a, b| a.0.cmp(&b.0));
    let mut sums = Vec::with_capacity(points.len() + 1);
    sums.push(0.0);
    for (_, secs) in &points {
        let last = sums[sums.len() - 1];
        sums.push(last + secs);
    }
    (points, sums)
}

fn sum_at(points: &[(Beat, f64)], beat: Beat) -> f64 {
    points.iter().filter(|(b, _)| *b == beat).map(|(_, s)| s).sum()
}

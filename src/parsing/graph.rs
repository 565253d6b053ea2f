use crate::analysis::group::NoteGroup;
use crate::config::AnalysisConfig;
use crate::game::timing::{TimingModel, beat_from_int};
use log::debug;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DensityPoint {
    /// Seconds from the start of the music.
    pub time: f64,
    /// Notes per second from this point on.
    pub nps: f64,
}

/// Groups per 4-beat measure, from measure 0 through the measure of the last
/// group. No groups gives `[0]`.
pub fn notes_per_measure(groups: &[NoteGroup]) -> Vec<u32> {
    let mut counts: Vec<u32> = Vec::new();
    for group in groups {
        let measure = (group.beat() / 4).floor().to_integer().max(0) as usize;
        if counts.len() <= measure {
            counts.resize(measure + 1, 0);
        }
        counts[measure] += 1;
    }
    if counts.is_empty() {
        counts.push(0);
    }
    counts
}

/// Relative closeness with a 1e-9 tolerance and no absolute floor.
fn is_close(a: f64, b: f64) -> bool {
    a == b || (a - b).abs() <= 1e-9 * a.abs().max(b.abs())
}

struct Graph {
    points: Vec<DensityPoint>,
}

impl Graph {
    /// Three points in a row at the same density collapse: the last one
    /// slides forward instead.
    fn push(&mut self, time: f64, nps: f64) {
        let n = self.points.len();
        if n >= 2
            && is_close(nps, self.points[n - 1].nps)
            && is_close(nps, self.points[n - 2].nps)
        {
            self.points[n - 1].time = time;
        } else {
            self.points.push(DensityPoint { time, nps });
        }
    }

    fn last_time(&self) -> f64 {
        self.points.last().map_or(f64::NEG_INFINITY, |p| p.time)
    }
}

/// Notes-per-second curve over the chart. A measure that lasts no longer
/// than `min_measure_seconds` (or runs backwards) passes its notes on to the
/// next one. The curve drops to zero after the last measure and, when the
/// song runs on, again at `chart_len`.
pub fn density_graph(
    notes_per_measure: &[u32],
    timing: &TimingModel,
    chart_len: f64,
    config: &AnalysisConfig,
) -> Vec<DensityPoint> {
    let mut graph = Graph {
        points: Vec::with_capacity(notes_per_measure.len() + 2),
    };

    let mut start_time = timing.time_at(beat_from_int(0));
    let mut deferred = 0u32;
    for (i, &count) in notes_per_measure.iter().enumerate() {
        let end_time = timing.time_at(beat_from_int((i as i64 + 1) * 4));
        let measure_len = end_time - start_time;
        if measure_len > config.min_measure_seconds {
            graph.push(start_time, (count + deferred) as f64 / measure_len);
            deferred = 0;
            start_time = end_time;
        } else {
            deferred += count;
        }
    }
    if deferred > 0 {
        debug!("Dropping {} deferred notes at the end of the density graph.", deferred);
    }

    let end_beat = beat_from_int(notes_per_measure.len() as i64 * 4);
    graph.push(timing.time_at(end_beat), 0.0);
    if chart_len > graph.last_time() + config.graph_tail_slack {
        graph.push(chart_len, 0.0);
    }
    graph.points
}

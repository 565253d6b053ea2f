use crate::config::AnalysisConfig;
use crate::game::timing::{TimingModel, beat_from_int};
use log::debug;
use serde::Serialize;

/// Quantizations tried for stream, densest first.
pub const QUANTIZATIONS: [u32; 4] = [32, 24, 20, 16];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StreamRun {
    pub start_measure: usize,
    pub length: usize,
}

impl StreamRun {
    fn end_measure(&self) -> usize {
        self.start_measure + self.length
    }
}

/// Stream runs of a chart at one quantization, summarized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamInfo {
    /// Run lengths in measures, with a negative entry for every break longer
    /// than one measure. Two positive entries in a row have a one-measure
    /// break between them.
    pub segments: Vec<i32>,
    pub quantization: u32,
    /// Lowest and highest BPM over the stream measures.
    pub bpm_range: Option<(f64, f64)>,
    pub total_stream: u32,
    pub total_break: u32,
}

/// Maximal runs of measures holding at least `quantization` note rows.
pub fn stream_runs(notes_per_measure: &[u32], quantization: u32) -> Vec<StreamRun> {
    let mut runs: Vec<StreamRun> = Vec::new();
    let mut current: Option<StreamRun> = None;
    for (measure, &count) in notes_per_measure.iter().enumerate() {
        if count >= quantization {
            match current.as_mut() {
                Some(run) => run.length += 1,
                None => {
                    current = Some(StreamRun {
                        start_measure: measure,
                        length: 1,
                    })
                }
            }
        } else if let Some(run) = current.take() {
            runs.push(run);
        }
    }
    runs.extend(current);
    runs
}

/// Picks the densest quantization whose stream measures make up at least
/// `stream_ratio` of the chart (16ths if none does) and summarizes its runs.
pub fn stream_info(
    notes_per_measure: &[u32],
    timing: &TimingModel,
    config: &AnalysisConfig,
) -> StreamInfo {
    let total_measures = notes_per_measure.len().max(1) as f64;
    let (quantization, runs) = QUANTIZATIONS
        .iter()
        .map(|&q| (q, stream_runs(notes_per_measure, q)))
        .find(|(_, runs)| {
            let stream_measures: usize = runs.iter().map(|r| r.length).sum();
            stream_measures as f64 / total_measures >= config.stream_ratio
        })
        .unwrap_or_else(|| (16, stream_runs(notes_per_measure, 16)));

    let (Some(first), Some(last)) = (runs.first(), runs.last()) else {
        debug!("No stream runs found.");
        return StreamInfo {
            segments: Vec::new(),
            quantization,
            bpm_range: None,
            total_stream: 0,
            total_break: 0,
        };
    };

    let mut segments = Vec::with_capacity(runs.len() * 2);
    let mut prev_end: Option<usize> = None;
    for run in &runs {
        if let Some(end) = prev_end {
            let gap = run.start_measure - end;
            if gap > 1 {
                segments.push(-(gap as i32));
            }
        }
        segments.push(run.length as i32);
        prev_end = Some(run.end_measure());
    }

    let total_stream: usize = runs.iter().map(|r| r.length).sum();
    let total_break = last.end_measure() - first.start_measure - total_stream;

    let bpm_range = runs
        .iter()
        .flat_map(|run| run.start_measure..run.end_measure())
        .filter_map(|measure| {
            let start = timing.time_at(beat_from_int(measure as i64 * 4));
            let end = timing.time_at(beat_from_int((measure as i64 + 1) * 4));
            let seconds = end - start;
            (seconds > 0.0).then(|| 240.0 / seconds)
        })
        .fold(None, |acc: Option<(f64, f64)>, bpm| match acc {
            None => Some((bpm, bpm)),
            Some((lo, hi)) => Some((lo.min(bpm), hi.max(bpm))),
        });

    debug!(
        "Stream at {}ths: {} runs, {} stream / {} break measures.",
        quantization,
        runs.len(),
        total_stream,
        total_break
    );
    StreamInfo {
        segments,
        quantization,
        bpm_range,
        total_stream: total_stream as u32,
        total_break: total_break as u32,
    }
}

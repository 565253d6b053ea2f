pub mod filter;
pub mod group;

use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::game::note::{Note, NoteKinds};
use crate::game::timing::{Beat, TimingModel};
use crate::parsing::bpm::{DisplayBpm, parse_segments};
use crate::parsing::breakdown::generate_breakdown;
use crate::parsing::graph::{DensityPoint, density_graph, notes_per_measure};
use crate::parsing::hash::chart_hash;
use crate::parsing::notes::{NoteData, infer_columns};
use crate::parsing::simfile::{ChartData, ChartKey, SimfileData, column_count};
use crate::parsing::stats::{ChartCounts, step_groups};
use crate::parsing::stream::{StreamInfo, stream_info};
use filter::{FakeRegions, HittableBeats, hittable_notes};
use group::{NoteGroup, restrict};
use log::{debug, info, warn};
use once_cell::unsync::OnceCell;
use serde::Serialize;
use std::collections::HashSet;
use std::rc::Rc;

const DEFAULT_COLUMNS: usize = 4;

/// Everything computed for one chart, ready to store.
#[derive(Debug, Clone, Serialize)]
pub struct ChartAnalysis {
    pub counts: ChartCounts,
    pub density_graph: Vec<DensityPoint>,
    pub stream_info: StreamInfo,
    pub breakdown: String,
    pub hash: String,
}

impl ChartAnalysis {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Analyzes the charts of one song. Owns the simfile; per-chart work is
/// cached in each `ChartAnalyzer`.
pub struct SongAnalyzer {
    sim: Rc<SimfileData>,
    config: Rc<AnalysisConfig>,
    charts: Vec<ChartAnalyzer>,
    chart_len: OnceCell<f64>,
}

impl SongAnalyzer {
    pub fn new(sim: SimfileData) -> Self {
        Self::with_config(sim, AnalysisConfig::default())
    }

    pub fn with_config(sim: SimfileData, config: AnalysisConfig) -> Self {
        let sim = Rc::new(sim);
        let config = Rc::new(config);
        let charts = (0..sim.charts.len())
            .map(|index| ChartAnalyzer::new(Rc::clone(&sim), index, Rc::clone(&config)))
            .collect();
        Self {
            sim,
            config,
            charts,
            chart_len: OnceCell::new(),
        }
    }

    pub fn simfile(&self) -> &SimfileData {
        &self.sim
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn charts(&self) -> &[ChartAnalyzer] {
        &self.charts
    }

    pub fn chart(&self, index: usize) -> Option<&ChartAnalyzer> {
        self.charts.get(index)
    }

    /// Where the song's charts end: the later of `#LASTSECONDHINT` and the
    /// last note of every chart. Edit charts only count when they are the
    /// song's only chart.
    pub fn chart_len(&self) -> f64 {
        *self.chart_len.get_or_init(|| {
            let single_chart = self.charts.len() == 1;
            let mut end = self.sim.last_second_hint();
            for chart in &self.charts {
                if chart.is_edit() && !single_chart {
                    continue;
                }
                match chart.last_note_time() {
                    Ok(Some(time)) => end = end.max(time),
                    Ok(None) => {}
                    Err(e) => warn!("Skipping chart {} for chart length: {}", chart.index, e),
                }
            }
            debug!("Song chart length: {:.3}s", end);
            end
        })
    }

    /// The song's BPM as shown to players.
    pub fn display_bpm(&self) -> Result<Option<DisplayBpm>> {
        let bpms = parse_segments(&self.sim.bpms, "BPMS")?;
        Ok(DisplayBpm::resolve(self.sim.display_bpm.as_deref(), &bpms))
    }

    /// Full analysis of the chart at `index`.
    pub fn analyze(&self, index: usize) -> Option<Result<ChartAnalysis>> {
        self.charts.get(index).map(|chart| chart.analyze(self.chart_len()))
    }

    /// The first chart for each chart slot. Later charts for a slot that is
    /// already taken are skipped; charts that can't be keyed are returned as
    /// errors so the caller can decide what to do with them.
    pub fn unique_charts(&self) -> Vec<Result<(ChartKey, &ChartAnalyzer)>> {
        let mut seen: HashSet<ChartKey> = HashSet::new();
        let mut unique = Vec::new();
        for chart in &self.charts {
            match ChartKey::new(chart.chart(), self.config.difficulty_fallback) {
                Ok(key) => {
                    if seen.insert(key.clone()) {
                        unique.push(Ok((key, chart)));
                    } else {
                        debug!("Skipping duplicate chart {} for {:?}.", chart.index, key);
                    }
                }
                Err(e) => unique.push(Err(e)),
            }
        }
        unique
    }
}

/// The analysis pipeline of one chart. Intermediate results are computed on
/// first use and kept.
pub struct ChartAnalyzer {
    sim: Rc<SimfileData>,
    index: usize,
    config: Rc<AnalysisConfig>,
    note_data: OnceCell<NoteData>,
    timing: OnceCell<TimingModel>,
    fakes: OnceCell<FakeRegions>,
    hittables: OnceCell<Vec<Note>>,
    step_groups: OnceCell<Vec<NoteGroup>>,
    notes_per_measure: OnceCell<Vec<u32>>,
}

impl ChartAnalyzer {
    fn new(sim: Rc<SimfileData>, index: usize, config: Rc<AnalysisConfig>) -> Self {
        Self {
            sim,
            index,
            config,
            note_data: OnceCell::new(),
            timing: OnceCell::new(),
            fakes: OnceCell::new(),
            hittables: OnceCell::new(),
            step_groups: OnceCell::new(),
            notes_per_measure: OnceCell::new(),
        }
    }

    pub fn chart(&self) -> &ChartData {
        &self.sim.charts[self.index]
    }

    pub fn index(&self) -> usize {
        self.index
    }

    fn is_edit(&self) -> bool {
        self.chart().difficulty.trim().eq_ignore_ascii_case("edit")
    }

    pub fn note_data(&self) -> &NoteData {
        self.note_data.get_or_init(|| {
            let chart = self.chart();
            let columns = column_count(&chart.stepstype)
                .or_else(|| infer_columns(&chart.notes))
                .unwrap_or_else(|| {
                    warn!(
                        "Unknown steps type '{}' and no notes, assuming {} columns.",
                        chart.stepstype, DEFAULT_COLUMNS
                    );
                    DEFAULT_COLUMNS
                });
            NoteData::parse(&chart.notes, columns)
        })
    }

    pub fn timing(&self) -> Result<&TimingModel> {
        self.timing.get_or_try_init(|| -> Result<TimingModel> {
            Ok(TimingModel::new(self.sim.timing_for(self.chart())?))
        })
    }

    pub fn fake_regions(&self) -> Result<&FakeRegions> {
        self.fakes.get_or_try_init(|| -> Result<FakeRegions> {
            let segments = parse_segments(self.sim.fakes_for(self.chart()), "FAKES")?;
            Ok(FakeRegions::new(&segments, self.config.fake_min_length))
        })
    }

    pub fn hittables(&self) -> Result<&[Note]> {
        self.hittables
            .get_or_try_init(|| -> Result<Vec<Note>> {
                Ok(hittable_notes(self.note_data().notes(), self.timing()?, self.fake_regions()?))
            })
            .map(Vec::as_slice)
    }

    /// Same-beat groups of hittable taps, hold and roll heads and lifts.
    pub fn step_groups(&self) -> Result<&[NoteGroup]> {
        self.step_groups
            .get_or_try_init(|| -> Result<Vec<NoteGroup>> {
                Ok(step_groups(self.hittables()?))
            })
            .map(Vec::as_slice)
    }

    /// Rows of taps, hold and roll heads per measure.
    pub fn notes_per_measure(&self) -> Result<&[u32]> {
        self.notes_per_measure
            .get_or_try_init(|| -> Result<Vec<u32>> {
                let arrows = restrict(self.step_groups()?, NoteKinds::ARROWS);
                let counts = notes_per_measure(&arrows);
                debug!("Chart {}: {} measures.", self.index, counts.len());
                Ok(counts)
            })
            .map(Vec::as_slice)
    }

    pub fn last_note_beat(&self) -> Option<Beat> {
        self.note_data().last_beat()
    }

    pub fn last_note_time(&self) -> Result<Option<f64>> {
        match self.last_note_beat() {
            Some(beat) => Ok(Some(self.timing()?.time_at(beat))),
            None => Ok(None),
        }
    }

    pub fn counts(&self) -> Result<ChartCounts> {
        let timing = self.timing()?;
        let mut beats = HittableBeats::new(timing, self.fake_regions()?);
        Ok(ChartCounts::compute(
            self.note_data().notes(),
            self.hittables()?,
            self.step_groups()?,
            |beat| beats.check(beat),
        ))
    }

    /// `chart_len` is the song-wide end time, see [`SongAnalyzer::chart_len`].
    pub fn density_graph(&self, chart_len: f64) -> Result<Vec<DensityPoint>> {
        Ok(density_graph(self.notes_per_measure()?, self.timing()?, chart_len, &self.config))
    }

    pub fn stream_info(&self) -> Result<StreamInfo> {
        Ok(stream_info(self.notes_per_measure()?, self.timing()?, &self.config))
    }

    pub fn breakdown(&self) -> Result<String> {
        Ok(generate_breakdown(&self.stream_info()?, self.config.max_breakdown_parts))
    }

    pub fn hash(&self) -> Result<String> {
        chart_hash(&self.chart().notes, self.sim.bpms_for(self.chart()))
    }

    pub fn analyze(&self, chart_len: f64) -> Result<ChartAnalysis> {
        let chart = self.chart();
        let stream_info = self.stream_info()?;
        let analysis = ChartAnalysis {
            counts: self.counts()?,
            density_graph: self.density_graph(chart_len)?,
            breakdown: generate_breakdown(&stream_info, self.config.max_breakdown_parts),
            stream_info,
            hash: self.hash()?,
        };
        info!(
            "Analyzed {} {} ({}): {} steps, breakdown '{}'.",
            chart.stepstype.trim(),
            chart.difficulty.trim(),
            chart.meter.trim(),
            analysis.counts.steps,
            analysis.breakdown
        );
        Ok(analysis)
    }
}

use crate::error::{Error, Result};
use crate::parsing::bpm::parse_rational;
use crate::parsing::simfile::{Difficulty, DifficultyFallback, MeterThresholds};
use configparser::ini::Ini;
use log::debug;
use num_rational::Ratio;
use serde::Deserialize;

const SECTION: &str = "analysis";

/// Tunables for chart analysis. The defaults match StepMania.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Fake regions shorter than this many beats are ignored.
    pub fake_min_length: Ratio<i64>,
    /// Measures this short or shorter hand their notes to the next measure
    /// in the density graph.
    pub min_measure_seconds: f64,
    /// A final zero point is added at the chart end only past this much slack.
    pub graph_tail_slack: f64,
    /// Share of measures that must be stream for a quantization to be picked.
    pub stream_ratio: f64,
    pub max_breakdown_parts: usize,
    pub difficulty_fallback: DifficultyFallback,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            fake_min_length: Ratio::new(1, 96),
            min_measure_seconds: 0.12,
            graph_tail_slack: 0.1,
            stream_ratio: 0.20,
            max_breakdown_parts: 24,
            difficulty_fallback: DifficultyFallback::default(),
        }
    }
}

impl AnalysisConfig {
    /// Reads the `[analysis]` section of INI text. Missing keys keep their
    /// defaults; present but unreadable values are an error.
    pub fn from_ini_str(text: &str) -> Result<Self> {
        let mut ini = Ini::new();
        ini.read(text.to_string()).map_err(Error::Config)?;

        let mut config = AnalysisConfig::default();
        if let Some(v) = ini.get(SECTION, "FakeMinLength") {
            config.fake_min_length =
                parse_fraction(&v).ok_or_else(|| bad_value("FakeMinLength", &v))?;
        }
        if let Some(v) = ini.get(SECTION, "MinMeasureSeconds") {
            config.min_measure_seconds = parse_f64("MinMeasureSeconds", &v)?;
        }
        if let Some(v) = ini.get(SECTION, "GraphTailSlack") {
            config.graph_tail_slack = parse_f64("GraphTailSlack", &v)?;
        }
        if let Some(v) = ini.get(SECTION, "StreamRatio") {
            config.stream_ratio = parse_f64("StreamRatio", &v)?;
        }
        if let Some(v) = ini.get(SECTION, "MaxBreakdownParts") {
            config.max_breakdown_parts =
                v.trim().parse::<usize>().map_err(|_| bad_value("MaxBreakdownParts", &v))?;
        }

        let mut thresholds = MeterThresholds::default();
        for (key, slot) in [
            ("BeginnerMaxMeter", &mut thresholds.beginner),
            ("EasyMaxMeter", &mut thresholds.easy),
            ("MediumMaxMeter", &mut thresholds.medium),
        ] {
            if let Some(v) = ini.get(SECTION, key) {
                *slot = v.trim().parse::<i32>().map_err(|_| bad_value(key, &v))?;
            }
        }

        config.difficulty_fallback = match ini.get(SECTION, "DifficultyFallback") {
            None => DifficultyFallback::FromMeter(thresholds),
            Some(v) => match v.trim().to_ascii_lowercase().as_str() {
                "reject" => DifficultyFallback::Reject,
                "meter" => DifficultyFallback::FromMeter(thresholds),
                other => DifficultyFallback::Slot(
                    Difficulty::parse(other).ok_or_else(|| bad_value("DifficultyFallback", &v))?,
                ),
            },
        };

        debug!("Loaded analysis config: {:?}", config);
        Ok(config)
    }
}

fn bad_value(key: &str, value: &str) -> Error {
    Error::Config(format!("[{}] {}: unreadable value '{}'", SECTION, key, value))
}

fn parse_f64(key: &str, value: &str) -> Result<f64> {
    value.trim().parse::<f64>().map_err(|_| bad_value(key, value))
}

/// `n/d` or a plain decimal.
fn parse_fraction(value: &str) -> Option<Ratio<i64>> {
    match value.split_once('/') {
        Some((n, d)) => {
            let n = n.trim().parse::<i64>().ok()?;
            let d = d.trim().parse::<i64>().ok()?;
            (d != 0).then(|| Ratio::new(n, d))
        }
        None => parse_rational(value),
    }
}

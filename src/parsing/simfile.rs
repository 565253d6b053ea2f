use crate::error::{Error, Result};
use crate::game::timing::TimingSegments;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One chart of a simfile, as raw tag text. Timing fields are the SSC
/// per-chart overrides; `None` or blank means "use the song's".
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChartData {
    pub stepstype: String,
    pub description: String,
    pub difficulty: String,
    pub meter: String,
    pub notes: String,
    pub bpms: Option<String>,
    pub stops: Option<String>,
    pub delays: Option<String>,
    pub warps: Option<String>,
    pub fakes: Option<String>,
    pub offset: Option<String>,
}

/// Song-level tag text plus its charts.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SimfileData {
    pub bpms: String,
    pub stops: String,
    pub delays: String,
    pub warps: String,
    pub fakes: String,
    pub offset: String,
    pub last_second_hint: Option<String>,
    pub display_bpm: Option<String>,
    pub charts: Vec<ChartData>,
}

/// The chart's value for a tag when it has a non-blank one, else the song's.
fn field_or<'a>(chart: Option<&'a String>, song: &'a str) -> &'a str {
    match chart {
        Some(value) if !value.trim().is_empty() => value.as_str(),
        _ => song,
    }
}

impl SimfileData {
    pub fn bpms_for<'a>(&'a self, chart: &'a ChartData) -> &'a str {
        field_or(chart.bpms.as_ref(), &self.bpms)
    }

    pub fn fakes_for<'a>(&'a self, chart: &'a ChartData) -> &'a str {
        field_or(chart.fakes.as_ref(), &self.fakes)
    }

    /// Timing segments in effect for `chart`, each tag resolved separately.
    pub fn timing_for(&self, chart: &ChartData) -> Result<TimingSegments> {
        TimingSegments::from_tags(
            self.bpms_for(chart),
            field_or(chart.stops.as_ref(), &self.stops),
            field_or(chart.delays.as_ref(), &self.delays),
            field_or(chart.warps.as_ref(), &self.warps),
            field_or(chart.offset.as_ref(), &self.offset),
        )
    }

    /// `#LASTSECONDHINT` in seconds; absent or unreadable is 0.
    pub fn last_second_hint(&self) -> f64 {
        let Some(text) = self.last_second_hint.as_deref().map(str::trim) else {
            return 0.0;
        };
        if text.is_empty() {
            return 0.0;
        }
        text.parse::<f64>().unwrap_or_else(|_| {
            warn!("Unreadable #LASTSECONDHINT '{}', using 0.", text);
            0.0
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StepsType {
    #[serde(rename = "dance-single")]
    DanceSingle,
    #[serde(rename = "dance-double")]
    DanceDouble,
}

impl StepsType {
    pub fn parse(stepstype: &str) -> Result<Self> {
        match stepstype.trim().to_ascii_lowercase().as_str() {
            "dance-single" => Ok(StepsType::DanceSingle),
            "dance-double" => Ok(StepsType::DanceDouble),
            _ => Err(Error::UnsupportedStepsType(stepstype.trim().to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StepsType::DanceSingle => "dance-single",
            StepsType::DanceDouble => "dance-double",
        }
    }
}

impl fmt::Display for StepsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Panel count for a `#STEPSTYPE`, if it is a known play style.
pub fn column_count(stepstype: &str) -> Option<usize> {
    let columns = match stepstype.trim().to_ascii_lowercase().as_str() {
        "dance-single" => 4,
        "dance-double" | "dance-couple" | "dance-routine" => 8,
        "dance-solo" => 6,
        "dance-threepanel" => 3,
        "pump-single" => 5,
        "pump-halfdouble" => 6,
        "pump-double" | "pump-couple" | "pump-routine" => 10,
        "kb7-single" => 7,
        _ => return None,
    };
    Some(columns)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    Easy,
    Medium,
    Hard,
    Challenge,
    Edit,
}

impl Difficulty {
    /// Case-insensitive, accepting the old DDR/ITG slot names.
    pub fn parse(text: &str) -> Option<Self> {
        let difficulty = match text.trim().to_ascii_lowercase().as_str() {
            "beginner" => Difficulty::Beginner,
            "easy" | "basic" | "light" => Difficulty::Easy,
            "medium" | "another" | "trick" | "standard" | "difficult" => Difficulty::Medium,
            "hard" | "ssr" | "maniac" | "heavy" => Difficulty::Hard,
            "challenge" | "smaniac" | "expert" | "oni" => Difficulty::Challenge,
            "edit" => Difficulty::Edit,
            _ => return None,
        };
        Some(difficulty)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
            Difficulty::Challenge => "challenge",
            Difficulty::Edit => "edit",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Highest meter mapped to each slot when a difficulty is derived from the meter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct MeterThresholds {
    pub beginner: i32,
    pub easy: i32,
    pub medium: i32,
}

impl Default for MeterThresholds {
    fn default() -> Self {
        Self {
            beginner: 1,
            easy: 3,
            medium: 6,
        }
    }
}

impl MeterThresholds {
    pub fn slot_for(&self, meter: i32) -> Difficulty {
        if meter <= self.beginner {
            Difficulty::Beginner
        } else if meter <= self.easy {
            Difficulty::Easy
        } else if meter <= self.medium {
            Difficulty::Medium
        } else {
            Difficulty::Hard
        }
    }
}

/// What to do with a chart whose difficulty and description name no slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyFallback {
    Reject,
    FromMeter(MeterThresholds),
    Slot(Difficulty),
}

impl Default for DifficultyFallback {
    fn default() -> Self {
        DifficultyFallback::FromMeter(MeterThresholds::default())
    }
}

/// Integer meter, or -1 when the text is not a number.
pub fn parse_meter(meter: &str) -> i32 {
    meter.trim().parse::<i32>().unwrap_or(-1)
}

pub fn resolve_difficulty(
    difficulty: &str,
    description: &str,
    meter: &str,
    fallback: DifficultyFallback,
) -> Result<Difficulty> {
    if let Some(d) = Difficulty::parse(difficulty) {
        return Ok(d);
    }
    if let Some(d) = Difficulty::parse(description) {
        debug!("Difficulty '{}' taken from description '{}'.", difficulty, description);
        return Ok(d);
    }
    match fallback {
        DifficultyFallback::FromMeter(thresholds) => {
            let d = thresholds.slot_for(parse_meter(meter));
            warn!("Unknown difficulty '{}', meter {} puts it in {}.", difficulty, meter.trim(), d);
            Ok(d)
        }
        DifficultyFallback::Slot(d) => {
            warn!("Unknown difficulty '{}', using {}.", difficulty, d);
            Ok(d)
        }
        DifficultyFallback::Reject => Err(Error::UnresolvedDifficulty {
            difficulty: difficulty.to_string(),
            description: description.to_string(),
            meter: meter.to_string(),
        }),
    }
}

/// Identifies a chart slot within a song. Edit charts are further told
/// apart by their description.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ChartKey {
    pub steps_type: StepsType,
    pub difficulty: Difficulty,
    pub edit_label: Option<String>,
}

impl ChartKey {
    pub fn new(chart: &ChartData, fallback: DifficultyFallback) -> Result<Self> {
        let steps_type = StepsType::parse(&chart.stepstype)?;
        let difficulty =
            resolve_difficulty(&chart.difficulty, &chart.description, &chart.meter, fallback)?;
        let edit_label =
            (difficulty == Difficulty::Edit).then(|| chart.description.trim().to_string());
        Ok(Self {
            steps_type,
            difficulty,
            edit_label,
        })
    }
}

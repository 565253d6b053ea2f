//! Chart analysis for StepMania/ITG simfiles: note counts, density graphs,
//! stream breakdowns and chart hashes.

pub mod analysis;
pub mod config;
pub mod error;
pub mod game;
pub mod parsing;

pub use analysis::{ChartAnalysis, ChartAnalyzer, SongAnalyzer};
pub use config::AnalysisConfig;
pub use error::{Error, Result};
pub use game::note::{Note, NoteKind, NoteKinds};
pub use game::timing::{Beat, TimingModel};
pub use parsing::bpm::DisplayBpm;
pub use parsing::graph::DensityPoint;
pub use parsing::simfile::{
    ChartData, ChartKey, Difficulty, DifficultyFallback, SimfileData, StepsType,
};
pub use parsing::stats::ChartCounts;
pub use parsing::stream::StreamInfo;

pub mod bpm;
pub mod breakdown;
pub mod graph;
pub mod hash;
pub mod notes;
pub mod simfile;
pub mod stats;
pub mod stream;

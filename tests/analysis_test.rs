//! Integration tests for whole-chart analysis.

use stepstats::{
    AnalysisConfig, ChartCounts, ChartData, Difficulty, DifficultyFallback, Error, SimfileData,
    SongAnalyzer, StepsType,
};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn chart(difficulty: &str, notes: &str) -> ChartData {
    ChartData {
        stepstype: "dance-single".to_string(),
        difficulty: difficulty.to_string(),
        meter: "9".to_string(),
        notes: notes.to_string(),
        ..Default::default()
    }
}

fn song(bpms: &str, charts: Vec<ChartData>) -> SimfileData {
    SimfileData {
        bpms: bpms.to_string(),
        charts,
        ..Default::default()
    }
}

/// A 4-beat measure of `rows` rows, every row a tap on column 0.
fn stream_measure(rows: usize) -> String {
    "1000\n".repeat(rows)
}

fn measures(parts: &[String]) -> String {
    parts.join(",\n")
}

/// Every note kind, including a hold, a roll, an orphaned head and a keysound.
const ALL_KINDS: &str = "\
1000
0200
1010
0300
,
M00L
4000
0F0K
3011
,
0002
0000
0000
0000
";

/// Test the hand-checked counts of a chart that uses every note kind.
#[test]
fn test_counts_for_every_note_kind() {
    init_logger();
    let analyzer = SongAnalyzer::new(song("0=120", vec![chart("Hard", ALL_KINDS)]));
    let counts = analyzer.charts()[0].counts().unwrap();
    assert_eq!(
        counts,
        ChartCounts {
            objects: 11,
            steps: 7,
            combo: 9,
            jumps: 2,
            mines: 1,
            hands: 2,
            holds: 1,
            rolls: 1,
            lifts: 1,
            fakes: 1,
        }
    );
}

/// Test that notes inside a fake region still count as objects but not as steps.
#[test]
fn test_fake_region_hides_steps() {
    init_logger();
    let mut sim = song("0=120", vec![chart("Hard", "1100\n0M10\n0001\nF000\n")]);
    sim.fakes = "0=4".to_string();
    let analyzer = SongAnalyzer::new(sim);
    let counts = analyzer.charts()[0].counts().unwrap();
    assert_eq!(counts.steps, 0);
    assert_eq!(counts.combo, 0);
    assert_eq!(counts.mines, 0);
    assert_eq!(counts.hands, 0);
    assert_eq!(counts.objects, 6);
    assert_eq!(counts.fakes, 1);
}

/// Test that holds starting together are no hand, but an arrow under two holds is.
#[test]
fn test_hands_with_active_holds() {
    let sim = song("0=120", vec![chart("Hard", "2200\n0010\n3300\n0000\n")]);
    let analyzer = SongAnalyzer::new(sim);
    let counts = analyzer.charts()[0].counts().unwrap();
    assert_eq!(counts.hands, 1);
    assert_eq!(counts.jumps, 1);
    assert_eq!(counts.steps, 2);
    assert_eq!(counts.holds, 2);
}

/// Test that a hold or roll loses its count when its head can't be hit.
#[test]
fn test_unhittable_heads_drop_holds() {
    let mut sim = song("0=120", vec![chart("Hard", "2000\n0200\n3300\n0000\n")]);
    sim.fakes = "0=1".to_string();
    let counts = SongAnalyzer::new(sim).charts()[0].counts().unwrap();
    assert_eq!(counts.holds, 1);
    assert_eq!(counts.steps, 1);
    assert_eq!(counts.hands, 0);

    let mut sim = song("0=120", vec![chart("Hard", "4000\n0100\n3000\n0000\n")]);
    sim.warps = "0=1".to_string();
    let counts = SongAnalyzer::new(sim).charts()[0].counts().unwrap();
    assert_eq!(counts.rolls, 0);
    assert_eq!(counts.steps, 1);
    assert_eq!(counts.objects, 2);
}

/// Test that commas and semicolons inside comments leave the grid alone.
#[test]
fn test_comments_do_not_split_measures() {
    let notes = "// intro, part 1; slow\n1000\n0100\n0010\n0001\n,\n1000\n";
    let analyzer = SongAnalyzer::new(song("0=120", vec![chart("Hard", notes)]));
    let chart = &analyzer.charts()[0];
    assert_eq!(chart.note_data().measures, 2);
    assert_eq!(chart.notes_per_measure().unwrap(), &[4, 1]);
    assert_eq!(chart.stream_info().unwrap().total_stream, 0);
}

/// Test that overlapping fake regions take the later region's end.
#[test]
fn test_overlapping_fake_regions() {
    let mut sim = song("0=120", vec![chart("Hard", "1000\n")]);
    sim.fakes = "0=4,2=10".to_string();
    let analyzer = SongAnalyzer::new(sim);
    let regions = analyzer.charts()[0].fake_regions().unwrap();
    assert_eq!(regions.regions().len(), 1);
    assert_eq!(regions.regions()[0].1, stepstats::game::timing::beat_from_int(12));
}

/// Test that a chart-level #FAKES replaces the song's.
#[test]
fn test_chart_fakes_override_song_fakes() {
    let mut c = chart("Hard", "1000\n0100\n0010\n0001\n");
    c.fakes = Some("2=2".to_string());
    let mut sim = song("0=120", vec![c]);
    sim.fakes = "0=4".to_string();
    let counts = SongAnalyzer::new(sim).charts()[0].counts().unwrap();
    assert_eq!(counts.steps, 2);
}

/// Test that warped notes are not hittable unless a stop sits on them.
#[test]
fn test_warps_and_stops() {
    let mut sim = song("0=120", vec![chart("Hard", "1000\n0100\n0010\n0001\n")]);
    sim.warps = "1=2".to_string();
    let analyzer = SongAnalyzer::new(sim.clone());
    assert_eq!(analyzer.charts()[0].counts().unwrap().steps, 2);

    sim.stops = "1=0.5".to_string();
    let analyzer = SongAnalyzer::new(sim);
    assert_eq!(analyzer.charts()[0].counts().unwrap().steps, 3);
}

/// Test that malformed timing only fails the chart that uses it.
#[test]
fn test_invalid_timing_is_per_chart() {
    let mut bad = chart("Hard", "1000\n");
    bad.bpms = Some("0=fast".to_string());
    let analyzer = SongAnalyzer::new(song("0=120", vec![chart("Easy", "1000\n"), bad]));
    assert!(analyzer.analyze(0).unwrap().is_ok());
    assert!(matches!(
        analyzer.analyze(1).unwrap(),
        Err(Error::InvalidTimingData { .. })
    ));
    assert!(analyzer.analyze(2).is_none());
}

/// Test the chart length rules for edit charts and #LASTSECONDHINT.
#[test]
fn test_chart_length() {
    // 120 BPM: beat 12 is at 6 seconds, beat 60 at 30.
    let short = measures(&[
        stream_measure(4),
        stream_measure(4),
        stream_measure(4),
        stream_measure(1),
    ]);
    let long = format!("{}1000\n", "0000\n,\n".repeat(15));

    let sim = song("0=120", vec![chart("Hard", &short), chart("Edit", &long)]);
    let analyzer = SongAnalyzer::new(sim);
    assert!((analyzer.chart_len() - 6.0).abs() < 1e-9);

    let analyzer = SongAnalyzer::new(song("0=120", vec![chart("Edit", &long)]));
    assert!((analyzer.chart_len() - 30.0).abs() < 1e-9);

    let mut sim = song("0=120", vec![chart("Hard", &short)]);
    sim.last_second_hint = Some("95.25".to_string());
    assert_eq!(SongAnalyzer::new(sim).chart_len(), 95.25);
}

/// Test that the density graph ends at the song's chart length.
#[test]
fn test_density_graph_shape() {
    init_logger();
    let notes = measures(&[stream_measure(16), stream_measure(8), stream_measure(16)]);
    let mut sim = song("0=120", vec![chart("Hard", &notes)]);
    sim.last_second_hint = Some("20".to_string());
    let analyzer = SongAnalyzer::new(sim);
    let graph = analyzer.charts()[0].density_graph(analyzer.chart_len()).unwrap();

    assert!(!graph.is_empty());
    assert!(graph.iter().all(|p| p.nps >= 0.0));
    let last = graph.last().unwrap();
    assert_eq!((last.time, last.nps), (20.0, 0.0));
    assert!(graph.iter().all(|p| p.time <= last.time));
    assert_eq!((graph[0].time, graph[0].nps), (0.0, 8.0));
    assert_eq!((graph[1].time, graph[1].nps), (2.0, 4.0));
    assert_eq!((graph[2].time, graph[2].nps), (4.0, 8.0));
    assert_eq!((graph[3].time, graph[3].nps), (6.0, 0.0));
}

/// Test that #OFFSET shifts every graph point.
#[test]
fn test_offset_shifts_graph() {
    let mut sim = song("0=120", vec![chart("Hard", &stream_measure(8))]);
    sim.offset = "0.25".to_string();
    let analyzer = SongAnalyzer::new(sim);
    let graph = analyzer.charts()[0].density_graph(0.0).unwrap();
    assert_eq!((graph[0].time, graph[0].nps), (-0.25, 4.0));
    assert_eq!(graph[1].time, 1.75);
}

/// Test stream detection and breakdown text for a 16th-note chart.
#[test]
fn test_sixteenth_stream_breakdown() {
    let notes = measures(&[
        stream_measure(16),
        stream_measure(16),
        stream_measure(16),
        stream_measure(16),
        stream_measure(4),
        stream_measure(16),
        stream_measure(16),
        stream_measure(4),
        stream_measure(4),
        stream_measure(4),
        stream_measure(16),
    ]);
    let analyzer = SongAnalyzer::new(song("0=150", vec![chart("Hard", &notes)]));
    let chart = &analyzer.charts()[0];
    let info = chart.stream_info().unwrap();
    assert_eq!(info.quantization, 16);
    assert_eq!(info.segments, vec![4, 2, -3, 1]);
    assert_eq!(info.total_stream, 7);
    assert_eq!(info.total_break, 4);
    assert_eq!(chart.breakdown().unwrap(), "4 2 (3) 1");
}

/// Test that denser stream is reported with its adjusted BPM.
#[test]
fn test_twenty_fourth_stream_breakdown() {
    let notes = measures(&[
        stream_measure(24),
        stream_measure(24),
        stream_measure(4),
        stream_measure(4),
        stream_measure(4),
    ]);
    let analyzer = SongAnalyzer::new(song("0=150", vec![chart("Hard", &notes)]));
    let chart = &analyzer.charts()[0];
    let info = chart.stream_info().unwrap();
    assert_eq!(info.quantization, 24);
    assert_eq!(info.segments, vec![2]);
    assert_eq!(chart.breakdown().unwrap(), "3 @ 225");
}

/// Test the breakdown of a chart without stream.
#[test]
fn test_no_streams() {
    let analyzer = SongAnalyzer::new(song("0=120", vec![chart("Hard", "")]));
    let chart = &analyzer.charts()[0];
    assert_eq!(chart.note_data().measures, 4);
    assert!(chart.stream_info().unwrap().segments.is_empty());
    assert_eq!(chart.breakdown().unwrap(), "No streams");
    assert_eq!(chart.counts().unwrap(), ChartCounts::default());
}

/// Test that only the first chart per slot is kept and unsupported charts are reported.
#[test]
fn test_unique_charts() {
    let mut pump = chart("Hard", "10000\n");
    pump.stepstype = "pump-single".to_string();
    let mut edit_a = chart("Edit", "1000\n");
    edit_a.description = "Mine ".to_string();
    let mut edit_b = chart("Edit", "0100\n");
    edit_b.description = "Other".to_string();
    let mut novice = chart("Novice", "1000\n");
    novice.meter = "2".to_string();

    let sim = song(
        "0=120",
        vec![chart("Hard", "1000\n"), chart("hard", "0100\n"), pump, edit_a, edit_b, novice],
    );
    let analyzer = SongAnalyzer::new(sim);
    let unique = analyzer.unique_charts();
    assert_eq!(unique.len(), 5);
    assert!(matches!(unique[1], Err(Error::UnsupportedStepsType(_))));

    let keys: Vec<_> = unique
        .iter()
        .filter_map(|r| r.as_ref().ok())
        .map(|(k, c)| (k.clone(), c.index()))
        .collect();
    assert_eq!(keys[0].0.difficulty, Difficulty::Hard);
    assert_eq!(keys[0].0.steps_type, StepsType::DanceSingle);
    assert_eq!(keys[0].1, 0);
    assert_eq!(keys[1].0.edit_label.as_deref(), Some("Mine"));
    assert_eq!(keys[2].0.edit_label.as_deref(), Some("Other"));
    assert_eq!(keys[3].0.difficulty, Difficulty::Easy);
}

/// Test that the configured difficulty fallback is used when keying charts.
#[test]
fn test_reject_unknown_difficulty() {
    let config = AnalysisConfig {
        difficulty_fallback: DifficultyFallback::Reject,
        ..Default::default()
    };
    let sim = song("0=120", vec![chart("Novice", "1000\n")]);
    let analyzer = SongAnalyzer::with_config(sim, config);
    assert!(matches!(
        analyzer.unique_charts()[0],
        Err(Error::UnresolvedDifficulty { .. })
    ));
}

/// Test that the hash uses the chart's own BPMs when it has them.
#[test]
fn test_hash_uses_chart_bpms() {
    let plain = chart("Hard", "1000\n0100\n0010\n0001\n");
    let mut split = plain.clone();
    split.bpms = Some("0=120.000".to_string());
    let analyzer = SongAnalyzer::new(song("0=150", vec![plain, split]));
    let a = analyzer.charts()[0].hash().unwrap();
    let b = analyzer.charts()[1].hash().unwrap();
    assert_ne!(a, b);
    assert_eq!(b, "995f5aeb1187a4a4bfd4e29d73d80d57f26a9fe0");
}

/// Test the display BPM with and without a #DISPLAYBPM tag.
#[test]
fn test_display_bpm() {
    let mut sim = song("0=120,32=180,64=0", vec![]);
    let shown = |sim: &SimfileData| {
        SongAnalyzer::new(sim.clone()).display_bpm().unwrap().unwrap().to_string()
    };
    assert_eq!(shown(&sim), "120 - 180");
    sim.display_bpm = Some("*".to_string());
    assert_eq!(shown(&sim), "???");
    sim.display_bpm = Some("150".to_string());
    assert_eq!(shown(&sim), "150");
}

/// Test the serialized layout of a full analysis.
#[test]
fn test_analysis_json_shape() {
    init_logger();
    let analyzer = SongAnalyzer::new(song("0=120", vec![chart("Hard", ALL_KINDS)]));
    let analysis = analyzer.analyze(0).unwrap().unwrap();
    let value: serde_json::Value = serde_json::from_str(&analysis.to_json().unwrap()).unwrap();

    assert_eq!(value["counts"]["steps"], 7);
    assert_eq!(value["counts"]["hands"], 2);
    assert!(value["density_graph"].is_array());
    assert!(value["density_graph"][0]["time"].is_number());
    assert!(value["density_graph"][0]["nps"].is_number());
    assert_eq!(value["stream_info"]["segments"], serde_json::json!([]));
    assert_eq!(value["stream_info"]["quantization"], 16);
    assert!(value["stream_info"]["bpm_range"].is_null());
    assert_eq!(value["breakdown"], "No streams");
    assert_eq!(value["hash"].as_str().unwrap().len(), 40);
}

//! Viewer host tests: config files on disk and the async event feed.

use std::io::Write;

use arena_state::{GameConfig, PageNodeType, TaskStateEngine};
use arena_viewer::config::SimulationConfig;
use arena_viewer::{drive, EventFeed, LinkGraph, Report, Simulation, ViewerConfig, ViewerError};

const REPLAY: &str = r#"{"type":"CONNECTION_ESTABLISHED","game_id":"g1"}
{"type":"GAME_MOVE_COMPLETED","game_id":"g1","move":{"step":1,"from_page_title":"A","to_page_title":"B"},"status":"in_progress"}

this line is not json
{"type":"GAME_MOVE_COMPLETED","game_id":"g2","move":{"step":1,"from_page_title":"A","to_page_title":"C"},"status":"in_progress"}
{"type":"GAME_MOVE_COMPLETED","game_id":"g1","move":{"step":2,"from_page_title":"B","to_page_title":"Z"},"status":"won"}
{"type":"OPTIMAL_PATHS_UPDATED","game_id":"g1","to_page_title":"B","optimal_paths":[["B","Z"]],"optimal_path_length":1}
{"type":"GAME_MOVE_COMPLETED","game_id":"stale","move":{"step":1,"from_page_title":"A","to_page_title":"Q"},"status":"in_progress"}
{"type":"GAME_ENDED","game_id":"g1","final_status":"won"}
{"type":"TASK_ENDED","game_id":""}
"#;

fn engine_for(games: &[&str]) -> TaskStateEngine {
    let configs: Vec<GameConfig> = games.iter().map(|id| GameConfig::new(id, "A", "Z")).collect();
    let mut engine = TaskStateEngine::new();
    engine.create_task(&configs);
    engine
}

#[test]
fn test_config_loads_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[log]\nlevel = \"debug\"\n\n[simulation]\ngames = 5\nsolver_lag = 3").unwrap();

    let config = ViewerConfig::load(Some(file.path())).unwrap();
    assert_eq!(config.log.level, "debug");
    assert_eq!(config.simulation.games, 5);
    assert_eq!(config.simulation.solver_lag, 3);
    assert_eq!(config.feed.channel_capacity, 256, "untouched section keeps defaults");
}

#[test]
fn test_explicit_missing_config_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = ViewerConfig::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
    assert!(matches!(err, ViewerError::ConfigRead { .. }));
}

#[tokio::test]
async fn test_replay_feed_drives_engine() {
    let mut engine = engine_for(&["g1", "g2"]);
    let mut feed = EventFeed::spawn(REPLAY.as_bytes(), 2);

    let stats = drive(&mut engine, &mut feed).await;
    let feed_stats = feed.finish().await.unwrap();

    assert_eq!(feed_stats.skipped, 1, "the non-json line");
    assert_eq!(feed_stats.forwarded, 8);
    assert_eq!(stats.applied, 7);
    assert_eq!(stats.ignored, 1, "the stale game");

    let task = engine.get_task().unwrap();
    assert!(task.task_ended);
    assert_eq!(task.current_page_index(), 2);
    assert_eq!(task.game("g1").unwrap().status, "won");

    let graph = engine.get_visualization_data();
    assert_eq!(graph.page("Z").unwrap().node_type, PageNodeType::Target);
    assert_eq!(graph.page("B").unwrap().distance_to_target, Some(1));
    assert!(graph.page("Q").is_none());
}

#[tokio::test]
async fn test_simulated_race_through_feed() {
    let graph = LinkGraph::sample();
    let config = SimulationConfig {
        games: 2,
        max_steps: 6,
        seed: Some(99),
        solver_lag: 1,
        max_paths: 2,
    };
    let race = Simulation::new(&graph, &config).run("Potato", "Philosophy").unwrap();
    let total = race.events.len();

    let mut engine = TaskStateEngine::new();
    engine.create_task(&race.configs);
    let mut feed = EventFeed::from_events(race.events, 4);
    let stats = drive(&mut engine, &mut feed).await;
    feed.finish().await.unwrap();

    assert_eq!(stats.applied, total);
    let report = Report::capture(&engine).unwrap();
    assert!(report.task_ended);
    assert_eq!(report.progress.len(), 2);
    assert!(report.progress.iter().all(|p| p.finished));
}

#[tokio::test]
async fn test_handshake_without_envelope_id_rebuilds_its_game() {
    let handshake = r#"{"type":"CONNECTION_ESTABLISHED","timestamp":"yesterday","complete_state":{"game":{"game_id":"g1","config":{"start_page_title":"A","target_page_title":"Z"},"status":"in_progress","move_history":[{"step":1,"from_page_title":"A","to_page_title":"B"},{"step":2,"from_page_title":"B","to_page_title":"C"}]}}}
{"type":"GAME_MOVE_COMPLETED","move":{"step":3,"from_page_title":"C","to_page_title":"D"},"status":"in_progress"}
"#;
    let mut engine = engine_for(&["g1"]);
    let mut feed = EventFeed::spawn(handshake.as_bytes(), 1);

    let stats = drive(&mut engine, &mut feed).await;
    let feed_stats = feed.finish().await.unwrap();

    assert_eq!(feed_stats.skipped, 1, "a move must name its game");
    assert_eq!(stats.applied, 1, "unreadable timestamp does not block the handshake");
    assert_eq!(stats.ignored, 0);

    let task = engine.get_task().unwrap();
    assert_eq!(task.game("g1").unwrap().page_states().len(), 3);
    assert_eq!(task.current_page_index(), 2);
}

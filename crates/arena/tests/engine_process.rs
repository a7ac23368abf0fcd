//! 実プロセス越しの EngineProcess / play_game

use std::path::{Path, PathBuf};
use std::time::Duration;

use arena::error::{ProtocolError, RefereeError};
use arena::referee::{
    Color, EngineConfig, EngineLink, EnginePair, EngineProcess, GameConfig, Player, Seating,
    SilentObserver, Termination, play_game,
};

fn scripted(params: &str) -> EngineConfig {
    EngineConfig::new(env!("CARGO_BIN_EXE_scripted_engine"), params).expect("engine params")
}

fn spawn(params: &str) -> EngineProcess {
    EngineProcess::spawn(&scripted(params), "t".to_string(), Some(Duration::from_secs(10)))
        .expect("spawn scripted engine")
}

#[test]
fn round_trips_commands_and_streams() {
    let mut engine = spawn("");
    assert_eq!(engine.send_command("limit time total 5000").unwrap(), None);
    assert_eq!(engine.send_command("gen").unwrap().as_deref(), Some("a1"));
    assert_eq!(engine.send_command("play a1").unwrap(), None);
    assert_eq!(engine.send_command("history").unwrap().as_deref(), Some("a1"));

    let board = engine.send_command("board").unwrap().unwrap();
    let rows: Vec<&str> = board.lines().collect();
    assert_eq!(rows.len(), 15);
    assert_eq!(rows[14], "X..............");
}

#[test]
fn unknown_command_is_rejected() {
    let mut engine = spawn("");
    match engine.send_command("ponder on") {
        Err(ProtocolError::Rejected { message, .. }) => {
            assert!(message.contains("unknown command"), "{message}")
        }
        other => panic!("unexpected: {other:?}"),
    }
    // 拒否後も通信は続けられる
    assert_eq!(engine.send_command("gen").unwrap().as_deref(), Some("a1"));
}

#[test]
fn terminate_stops_a_stalled_engine() {
    let mut engine = spawn("--stall-at 0");
    let err = engine
        .request("gen", Some(Duration::from_millis(100)), None)
        .unwrap_err();
    assert!(matches!(err, ProtocolError::Timeout { .. }), "{err}");
    engine.terminate();
    assert!(engine.is_terminated());
    assert!(matches!(
        engine.send_command("history"),
        Err(ProtocolError::Terminated { .. })
    ));
}

#[test]
fn spawn_failure_names_the_path() {
    let cfg = EngineConfig::new(PathBuf::from("/nonexistent/engine-binary"), "").unwrap();
    let err = match EngineProcess::spawn(&cfg, "x".to_string(), None) {
        Err(e) => e,
        Ok(_) => panic!("spawn should fail"),
    };
    assert!(matches!(err, RefereeError::Spawn { .. }));
    assert!(err.to_string().contains("/nonexistent/engine-binary"));
}

#[test]
fn play_game_scores_a_declared_win() {
    let engines = EnginePair {
        a: scripted("--finish-after 5"),
        b: scripted("--finish-after 5"),
    };
    let record = play_game(
        &engines,
        Seating::new(Color::White),
        &GameConfig::default(),
        &mut SilentObserver,
    )
    .unwrap();
    assert_eq!(record.winner(), Some(Color::Black));
    assert_eq!(record.winning_player(), Some(Player::B));
    assert_eq!(record.termination(), Termination::Declared);
    assert_eq!(record.turns(), 5);
    assert_eq!(record.history(), "a1 b1 c1 d1 e1");
    assert!(record.remaining_ms(Player::A) > 0);
}

#[test]
fn play_game_identical_engines_are_reproducible() {
    let engines = EnginePair {
        a: scripted("--finish-after 11 --winner draw"),
        b: scripted("--finish-after 11 --winner draw"),
    };
    let play = || {
        let record = play_game(
            &engines,
            Seating::new(Color::Black),
            &GameConfig::default(),
            &mut SilentObserver,
        )
        .unwrap();
        (
            record.winner(),
            record.termination(),
            record.turns(),
            record.history().to_string(),
            record.board().to_string(),
        )
    };
    let first = play();
    assert_eq!(first.0, None);
    assert_eq!(first, play());
}

/// `--pid-file` 付きの設定と、その pid ファイルのパス
#[cfg(target_os = "linux")]
fn scripted_with_pid(dir: &Path, name: &str, params: &str) -> (EngineConfig, PathBuf) {
    let pid_file = dir.join(format!("{name}.pid"));
    let cfg = scripted(&format!("--pid-file '{}' {params}", pid_file.display()));
    (cfg, pid_file)
}

#[cfg(target_os = "linux")]
fn assert_exited(pid_file: &Path) {
    let pid = std::fs::read_to_string(pid_file).expect("engine wrote its pid");
    let proc_dir = PathBuf::from(format!("/proc/{}", pid.trim()));
    assert!(!proc_dir.exists(), "engine {} is still running", pid.trim());
}

#[cfg(target_os = "linux")]
#[test]
fn engines_exit_when_winner_disagreement_aborts_the_game() {
    let dir = tempfile::tempdir().unwrap();
    let (a, a_pid) = scripted_with_pid(dir.path(), "a", "--finish-after 3");
    let (b, b_pid) = scripted_with_pid(dir.path(), "b", "--finish-after 5");
    let err = play_game(
        &EnginePair { a, b },
        Seating::new(Color::Black),
        &GameConfig::default(),
        &mut SilentObserver,
    )
    .unwrap_err();
    assert!(matches!(err, RefereeError::WinnerMismatch { turn: 3, .. }), "{err}");
    assert_exited(&a_pid);
    assert_exited(&b_pid);
}

#[cfg(target_os = "linux")]
#[test]
fn engines_exit_when_a_command_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let (a, a_pid) = scripted_with_pid(dir.path(), "a", "--reject gen");
    let (b, b_pid) = scripted_with_pid(dir.path(), "b", "");
    let err = play_game(
        &EnginePair { a, b },
        Seating::new(Color::Black),
        &GameConfig::default(),
        &mut SilentObserver,
    )
    .unwrap_err();
    assert!(
        matches!(err, RefereeError::Protocol(ProtocolError::Rejected { .. })),
        "{err}"
    );
    assert_exited(&a_pid);
    assert_exited(&b_pid);
}

#[cfg(target_os = "linux")]
#[test]
fn stalled_engine_is_killed_after_losing_on_time() {
    let dir = tempfile::tempdir().unwrap();
    let (a, a_pid) = scripted_with_pid(dir.path(), "a", "--stall-at 0");
    let (b, b_pid) = scripted_with_pid(dir.path(), "b", "");
    let config = GameConfig {
        timeout_margin_ms: Some(200),
        ..GameConfig::default()
    };
    let record = play_game(
        &EnginePair { a, b },
        Seating::new(Color::Black),
        &config,
        &mut SilentObserver,
    )
    .unwrap();
    assert_eq!(record.termination(), Termination::Timeout);
    assert_eq!(record.winning_player(), Some(Player::B));
    assert_exited(&a_pid);
    assert_exited(&b_pid);
}

//! `arena` バイナリを scripted_engine 同士で走らせる結合テスト

use std::process::{Command, Output};
use std::time::{Duration, Instant};

use arena::report::parse_arena_finished;

const ENGINE: &str = env!("CARGO_BIN_EXE_scripted_engine");

fn run_arena(a_params: &str, b_params: &str, extra: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_arena"))
        .args(["--a-path", ENGINE])
        .arg(format!("--a-params={a_params}"))
        .args(["--b-path", ENGINE])
        .arg(format!("--b-params={b_params}"))
        .args(extra)
        .env("RUST_LOG", "warn")
        .output()
        .expect("failed to run arena")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn declared_wins_alternate_with_colors() {
    let output = run_arena("--finish-after 9", "--finish-after 9", &["--num-games", "2"]);
    let out = stdout(&output);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    assert!(out.contains("[1/2] Game Finished: a=black, b=white, win=black, reason=declared"));
    assert!(out.contains("[2/2] Game Finished: a=white, b=black, win=black, reason=declared"));
    assert!(out.contains("[1/2] ELO Updated: a+16, b-16, a=1016, b=984"));
    assert!(out.contains("Game History: a1 b1 c1 d1 e1 f1 g1 h1 i1"));

    let last = out.lines().last().unwrap_or_default();
    assert!(
        last.contains("Arena Finished: total=2, a_wins=1, b_wins=1, draws=0, black_wins=2"),
        "{last}"
    );
    let ratings = parse_arena_finished(last).expect("final line");
    assert!((ratings.a_elo + ratings.b_elo - 2000.0).abs() < 1e-9);
    assert!(ratings.a_elo < 1000.0);
}

#[test]
fn streamed_board_is_printed() {
    let output = run_arena("--finish-after 3", "--finish-after 3", &["--num-games", "1"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("Game State:\n"));
    assert!(out.contains("XOX............"));
}

#[test]
fn no_legal_move_loses_immediately() {
    let output = run_arena("--none-at 0", "", &["--num-games", "1"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("win=white, reason=no_legal_move, turns=1"), "{out}");
    assert!(out.contains("Game History: "));
    assert!(out.contains("a_wins=0, b_wins=1"));
}

#[test]
fn turn_ceiling_is_a_draw() {
    let output = run_arena("", "", &["--num-games", "1", "--max-turns", "6"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("win=draw, reason=turn_limit, turns=6"), "{out}");
    let ratings = parse_arena_finished(&out).expect("final line");
    assert_eq!(ratings.a_elo, 1000.0);
    assert_eq!(ratings.b_elo, 1000.0);
}

#[test]
fn stalled_mover_loses_on_time() {
    let started = Instant::now();
    let output = run_arena(
        "",
        "--stall-at 1",
        &["--num-games", "1", "--turn-time", "50", "--timeout-margin-ms", "200"],
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("win=black, reason=timeout, turns=2"), "{out}");
    assert!(out.contains("Game History: a1"));
    assert!(started.elapsed() < Duration::from_secs(20));
}

#[test]
fn slow_move_within_response_timeout_is_not_a_loss() {
    let output = run_arena(
        "--think-ms 300 --finish-after 2",
        "--think-ms 300 --finish-after 2",
        &["--num-games", "1", "--turn-time", "50"],
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("win=white, reason=declared, turns=2"), "{out}");
}

#[test]
fn quoted_engine_params_keep_their_spaces() {
    let params = r#"--finish-after 3 --winner "nobody, it is even""#;
    let output = run_arena(params, params, &["--num-games", "1"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("win=draw, reason=declared, turns=3"), "{out}");

    let output = run_arena(r#"--winner "unterminated"#, "", &["--num-games", "1"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("invalid --a-params"), "{}", stderr(&output));
}

#[test]
fn winner_disagreement_aborts_with_error() {
    let output = run_arena("--finish-after 3", "--finish-after 5", &["--num-games", "3"]);
    assert!(!output.status.success());
    let err = stderr(&output);
    assert!(err.contains("game 1/3 failed"), "{err}");
    assert!(err.contains("disagree on the winner"), "{err}");
    assert!(!stdout(&output).contains("Arena Finished"));
}

#[test]
fn rejected_command_aborts_with_error() {
    let output = run_arena("", "--reject history", &["--num-games", "2"]);
    assert!(output.status.success(), "history is only read from A");

    let output = run_arena("--reject gen", "", &["--num-games", "1"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("command `gen` rejected"));
}

#[test]
fn solution_lines_are_echoed_with_game_tag() {
    let output = run_arena("--chatter --finish-after 1", "--finish-after 1", &["--num-games", "1"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("[1/1] a: solution: pos=a1, total=600000"), "{out}");
    assert!(!out.contains("info depth"));
}

#[test]
fn records_are_written_as_jsonl() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("games.jsonl");
    let path_arg = path.display().to_string();
    let output = run_arena(
        "--finish-after 4",
        "--finish-after 4",
        &["--num-games", "2", "--out", &path_arg],
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let text = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<serde_json::Value> =
        text.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0]["type"], "meta");
    assert_eq!(lines[0]["num_games"], 2);
    assert_eq!(lines[1]["winner"], "white");
    assert_eq!(lines[1]["winner_player"], "B");
    assert_eq!(lines[2]["winner_player"], "A");
    assert_eq!(lines[2]["turns"], 4);
}

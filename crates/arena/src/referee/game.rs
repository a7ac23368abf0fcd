use std::time::{Duration, Instant};

use log::debug;
use serde::Serialize;

use super::engine::{EngineConfig, EngineProcess};
use super::protocol::EngineLink;
use super::time_control::{Clock, ClockSettings};
use super::types::{Color, GameRecord, Player, Seating, Termination, duration_to_millis};
use crate::error::{ProtocolError, RefereeError, RefereeResult};
use crate::report::parse_declared_winner;

/// `gen` 以外のコマンドに対する応答期限の既定値
pub const DEFAULT_RESPONSE_TIMEOUT_MS: u64 = 30_000;

/// ゲーム設定
#[derive(Clone, Debug, Serialize)]
pub struct GameConfig {
    pub a_clock: ClockSettings,
    pub b_clock: ClockSettings,
    /// 引き分けとする手数上限。`None` なら無制限
    pub max_turns: Option<u32>,
    /// 指定時は `gen` の待ち時間を turn 予算 + このマージンに絞る。
    /// `None` なら turn 予算は通知のみで、`gen` も `response_timeout_ms` まで待つ
    pub timeout_margin_ms: Option<u64>,
    pub response_timeout_ms: u64,
    /// observer へ転送する診断行の接頭辞。空ならすべて転送する
    pub echo_prefixes: Vec<String>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            a_clock: ClockSettings::default(),
            b_clock: ClockSettings::default(),
            max_turns: Some(225),
            timeout_margin_ms: None,
            response_timeout_ms: DEFAULT_RESPONSE_TIMEOUT_MS,
            echo_prefixes: vec!["solution".to_string()],
        }
    }
}

impl GameConfig {
    fn clock_settings(&self, player: Player) -> ClockSettings {
        match player {
            Player::A => self.a_clock,
            Player::B => self.b_clock,
        }
    }

    /// 1回の `gen` を待つ上限。超えた側は時間切れ負け
    fn move_timeout(&self, clock: &Clock) -> Duration {
        match self.timeout_margin_ms {
            Some(margin) => Duration::from_millis(clock.turn_budget().saturating_add(margin)),
            None => Duration::from_millis(self.response_timeout_ms),
        }
    }

    fn echoes(&self, line: &str) -> bool {
        self.echo_prefixes.is_empty() || self.echo_prefixes.iter().any(|p| line.starts_with(p.as_str()))
    }
}

/// 1手ごとに通知されるイベント
pub struct MoveEvent<'a> {
    pub turn: u32,
    pub player: Player,
    pub color: Color,
    pub token: &'a str,
    pub elapsed_ms: u64,
    /// 消費後・加算前の残り時間
    pub remaining_ms: u64,
}

/// 対局の進行を外から観察するフック。
pub trait GameObserver {
    fn on_move(&mut self, _event: &MoveEvent<'_>) {}

    fn on_diagnostic(&mut self, _player: Player, _line: &str) {}
}

/// 何もしない observer
pub struct SilentObserver;

impl GameObserver for SilentObserver {}

/// 対局する2エンジンの起動設定
#[derive(Clone, Debug, Serialize)]
pub struct EnginePair {
    pub a: EngineConfig,
    pub b: EngineConfig,
}

/// 2プロセスを起動して1局を実行する。
///
/// 正常終了・エラーいずれの経路でも両プロセスは drop により終了する。
pub fn play_game(
    engines: &EnginePair,
    seating: Seating,
    config: &GameConfig,
    observer: &mut dyn GameObserver,
) -> RefereeResult<GameRecord> {
    let timeout = Some(Duration::from_millis(config.response_timeout_ms));
    let mut a = EngineProcess::spawn(&engines.a, "a".to_string(), timeout)?;
    let mut b = EngineProcess::spawn(&engines.b, "b".to_string(), timeout)?;
    run_game(&mut a, &mut b, seating, config, observer)
}

fn configure<E: EngineLink>(engine: &mut E, clock: &Clock) -> Result<(), ProtocolError> {
    for command in clock.limit_commands() {
        engine.send_command(&command)?;
    }
    Ok(())
}

/// 起動済みの2エンジンで1局を進める。
///
/// 黒番から開始し、`gen` → 両者へ `play` → 勝敗確認 → 持ち時間更新 を繰り返す。
pub fn run_game<E: EngineLink>(
    a: &mut E,
    b: &mut E,
    seating: Seating,
    config: &GameConfig,
    observer: &mut dyn GameObserver,
) -> RefereeResult<GameRecord> {
    let mut clocks = [
        Clock::new(config.clock_settings(Player::A)),
        Clock::new(config.clock_settings(Player::B)),
    ];
    configure(a, &clocks[Player::A.index()])?;
    configure(b, &clocks[Player::B.index()])?;

    let mut color = Color::Black;
    let mut turn = 0u32;

    let (winner, termination) = loop {
        turn += 1;
        let mover = seating.player_of(color);
        let (player, opponent) = match mover {
            Player::A => (&mut *a, &mut *b),
            Player::B => (&mut *b, &mut *a),
        };
        let clock = &mut clocks[mover.index()];
        let move_timeout = config.move_timeout(clock);

        let start = Instant::now();
        let reply = {
            let mut echo = |line: &str| {
                if config.echoes(line) {
                    observer.on_diagnostic(mover, line);
                }
            };
            player.request("gen", Some(move_timeout), Some(&mut echo))
        };
        let elapsed_ms = duration_to_millis(start.elapsed());
        clock.consume(elapsed_ms);

        let token = match reply {
            Ok(Some(token)) => token,
            Ok(None) => {
                return Err(RefereeError::EmptyMove {
                    engine: player.label().to_string(),
                    turn,
                });
            }
            Err(ProtocolError::Timeout { .. }) => {
                player.terminate();
                break (Some(color.flip()), Termination::Timeout);
            }
            Err(e) => return Err(e.into()),
        };
        debug!("turn {turn}: {} ({color}) -> {token} in {elapsed_ms}ms", player.label());

        if token == "none" {
            break (Some(color.flip()), Termination::NoLegalMove);
        }

        let play = format!("play {token}");
        let mover_winner = player.send_command(&play)?;
        let opponent_winner = opponent.send_command(&play)?;
        if mover_winner != opponent_winner {
            return Err(RefereeError::WinnerMismatch {
                turn,
                token,
                mover: player.label().to_string(),
                mover_winner,
                opponent: opponent.label().to_string(),
                opponent_winner,
            });
        }

        observer.on_move(&MoveEvent {
            turn,
            player: mover,
            color,
            token: &token,
            elapsed_ms,
            remaining_ms: clock.total_remaining(),
        });

        if let Some(text) = mover_winner {
            break (parse_declared_winner(&text), Termination::Declared);
        }

        clock.apply_increment();
        player.send_command(&clock.remaining_command())?;

        if config.max_turns.is_some_and(|limit| turn >= limit) {
            break (None, Termination::TurnLimit);
        }
        color = color.flip();
    };

    // 時間切れで止めたエンジンからは読めないので生きている側に問い合わせる
    let reader = if a.is_terminated() { &mut *b } else { &mut *a };
    let history = reader.send_command("history")?.unwrap_or_default();
    let board = reader.send_command("board")?.unwrap_or_default();

    Ok(GameRecord::new(
        seating,
        winner,
        termination,
        turn,
        history,
        board,
        [
            clocks[Player::A.index()].total_remaining(),
            clocks[Player::B.index()].total_remaining(),
        ],
    ))
}

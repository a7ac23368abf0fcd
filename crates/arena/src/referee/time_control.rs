use serde::{Deserialize, Serialize};

/// 1プレイヤー分の持ち時間設定（ミリ秒）。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockSettings {
    pub total_ms: u64,
    pub increment_ms: u64,
    pub turn_ms: u64,
}

impl Default for ClockSettings {
    fn default() -> Self {
        Self {
            total_ms: 600_000,
            increment_ms: 10_000,
            turn_ms: 100,
        }
    }
}

/// 1局分の持ち時間管理。
///
/// `turn_budget` はエンジンへ通知するだけで、ここでは強制しない。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Clock {
    total_remaining: u64,
    increment: u64,
    turn_budget: u64,
}

impl Clock {
    pub fn new(settings: ClockSettings) -> Self {
        Self {
            total_remaining: settings.total_ms,
            increment: settings.increment_ms,
            turn_budget: settings.turn_ms,
        }
    }

    /// 消費時間を差し引く。0 未満にはならない。
    pub fn consume(&mut self, elapsed_ms: u64) {
        self.total_remaining = self.total_remaining.saturating_sub(elapsed_ms);
    }

    pub fn apply_increment(&mut self) {
        self.total_remaining = self.total_remaining.saturating_add(self.increment);
    }

    pub fn total_remaining(&self) -> u64 {
        self.total_remaining
    }

    pub fn increment(&self) -> u64 {
        self.increment
    }

    pub fn turn_budget(&self) -> u64 {
        self.turn_budget
    }

    /// 対局開始時に送る `limit time` コマンド群
    pub fn limit_commands(&self) -> [String; 3] {
        [
            format!("limit time total {}", self.total_remaining),
            format!("limit time increment {}", self.increment),
            format!("limit time turn {}", self.turn_budget),
        ]
    }

    /// 手番終了後に残り時間を通知するコマンド
    pub fn remaining_command(&self) -> String {
        format!("limit time total {}", self.total_remaining)
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// 手番の色。先手は常に黒。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Black,
    White,
}

impl Color {
    pub fn flip(self) -> Self {
        match self {
            Color::Black => Color::White,
            Color::White => Color::Black,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Color::Black => "black",
            Color::White => "white",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// トーナメントを通して固定のエンジン枠。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Player {
    A,
    B,
}

impl Player {
    pub fn other(self) -> Self {
        match self {
            Player::A => Player::B,
            Player::B => Player::A,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Player::A => 0,
            Player::B => 1,
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Player::A => "a",
            Player::B => "b",
        })
    }
}

/// 1局の色割り当て。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seating {
    pub a_color: Color,
}

impl Seating {
    pub fn new(a_color: Color) -> Self {
        Self { a_color }
    }

    pub fn color_of(self, player: Player) -> Color {
        match player {
            Player::A => self.a_color,
            Player::B => self.a_color.flip(),
        }
    }

    pub fn player_of(self, color: Color) -> Player {
        if color == self.a_color { Player::A } else { Player::B }
    }
}

/// 終局理由
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// `gen` が `none` を返した（手番側の負け）
    NoLegalMove,
    /// `play` の応答で勝敗が宣言された
    Declared,
    /// 手数上限による引き分け
    TurnLimit,
    /// `gen` が期限内に応答しなかった（手番側の負け）
    Timeout,
}

impl Termination {
    pub fn label(self) -> &'static str {
        match self {
            Termination::NoLegalMove => "no_legal_move",
            Termination::Declared => "declared",
            Termination::TurnLimit => "turn_limit",
            Termination::Timeout => "timeout",
        }
    }
}

/// 1局の結果。構築後は変更しない。
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GameRecord {
    seating: Seating,
    winner: Option<Color>,
    termination: Termination,
    turns: u32,
    history: String,
    board: String,
    remaining_ms: [u64; 2],
}

impl GameRecord {
    pub fn new(
        seating: Seating,
        winner: Option<Color>,
        termination: Termination,
        turns: u32,
        history: String,
        board: String,
        remaining_ms: [u64; 2],
    ) -> Self {
        Self {
            seating,
            winner,
            termination,
            turns,
            history,
            board,
            remaining_ms,
        }
    }

    pub fn seating(&self) -> Seating {
        self.seating
    }

    pub fn color_of(&self, player: Player) -> Color {
        self.seating.color_of(player)
    }

    /// `None` は引き分け
    pub fn winner(&self) -> Option<Color> {
        self.winner
    }

    pub fn winning_player(&self) -> Option<Player> {
        self.winner.map(|c| self.seating.player_of(c))
    }

    pub fn termination(&self) -> Termination {
        self.termination
    }

    pub fn turns(&self) -> u32 {
        self.turns
    }

    pub fn history(&self) -> &str {
        &self.history
    }

    pub fn board(&self) -> &str {
        &self.board
    }

    /// 終局時点の残り持ち時間
    pub fn remaining_ms(&self, player: Player) -> u64 {
        self.remaining_ms[player.index()]
    }

    /// 指定プレイヤー視点の得点（勝ち 1.0 / 引き分け 0.5 / 負け 0.0）
    pub fn score_for(&self, player: Player) -> f64 {
        match self.winner {
            None => 0.5,
            Some(c) if c == self.color_of(player) => 1.0,
            Some(_) => 0.0,
        }
    }
}

pub fn duration_to_millis(d: Duration) -> u64 {
    d.as_millis().min(u128::from(u64::MAX)) as u64
}

//! Elo レーティング

use serde::Serialize;

use crate::referee::Player;

pub const DEFAULT_RATING: f64 = 1000.0;
pub const DEFAULT_K_FACTOR: f64 = 32.0;

/// `rating` 側から見た期待得点
pub fn expected_score(rating: f64, opponent: f64) -> f64 {
    1.0 / (1.0 + 10f64.powf((opponent - rating) / 400.0))
}

/// 実得点 `actual`（0.0 / 0.5 / 1.0）に対するレーティング変化量
pub fn rating_delta(rating: f64, opponent: f64, actual: f64, k_factor: f64) -> f64 {
    k_factor * (actual - expected_score(rating, opponent))
}

/// 1局ぶんの変化量。`delta_b` は常に `-delta_a`
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct RatingUpdate {
    pub delta_a: f64,
    pub delta_b: f64,
}

/// トーナメント中の両者のレーティング。メモリ上のみで保持する。
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Ratings {
    pub a: f64,
    pub b: f64,
    pub k_factor: f64,
}

impl Default for Ratings {
    fn default() -> Self {
        Self::new(DEFAULT_RATING, DEFAULT_RATING, DEFAULT_K_FACTOR)
    }
}

impl Ratings {
    pub fn new(a: f64, b: f64, k_factor: f64) -> Self {
        Self { a, b, k_factor }
    }

    pub fn get(&self, player: Player) -> f64 {
        match player {
            Player::A => self.a,
            Player::B => self.b,
        }
    }

    /// A の得点で両者を更新する。床・天井は設けない。
    pub fn update(&mut self, a_score: f64) -> RatingUpdate {
        let delta_a = rating_delta(self.a, self.b, a_score, self.k_factor);
        self.a += delta_a;
        self.b -= delta_a;
        RatingUpdate {
            delta_a,
            delta_b: -delta_a,
        }
    }
}

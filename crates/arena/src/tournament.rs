//! 2エンジン間の連続対局と集計

use anyhow::{Context, Result};
use log::{info, warn};
use serde::Serialize;

use crate::error::RefereeResult;
use crate::rating::{RatingUpdate, Ratings};
use crate::referee::{Color, GameRecord, Player, Seating};

/// 勝敗の累計
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Standings {
    pub games: u32,
    pub a_wins: u32,
    pub b_wins: u32,
    pub draws: u32,
    pub black_wins: u32,
    pub white_wins: u32,
}

impl Standings {
    pub fn record(&mut self, record: &GameRecord) {
        self.games += 1;
        match record.winning_player() {
            Some(Player::A) => self.a_wins += 1,
            Some(Player::B) => self.b_wins += 1,
            None => self.draws += 1,
        }
        match record.winner() {
            Some(Color::Black) => self.black_wins += 1,
            Some(Color::White) => self.white_wins += 1,
            None => {}
        }
    }

    /// `count` の対局数に対する割合（%）
    pub fn rate(&self, count: u32) -> f64 {
        if self.games == 0 {
            0.0
        } else {
            f64::from(count) / f64::from(self.games) * 100.0
        }
    }
}

/// 1局終了ごとに渡される集計スナップショット
pub struct GameSummary<'a> {
    /// 0 始まり
    pub game_no: u32,
    pub num_games: u32,
    pub record: &'a GameRecord,
    pub update: RatingUpdate,
    pub ratings: Ratings,
    pub standings: Standings,
}

pub struct Tournament {
    num_games: u32,
    ratings: Ratings,
    standings: Standings,
}

impl Tournament {
    pub fn new(num_games: u32, ratings: Ratings) -> Self {
        Self {
            num_games,
            ratings,
            standings: Standings::default(),
        }
    }

    pub fn num_games(&self) -> u32 {
        self.num_games
    }

    pub fn ratings(&self) -> Ratings {
        self.ratings
    }

    pub fn standings(&self) -> Standings {
        self.standings
    }

    /// 偶数局は A が黒（先手）、奇数局は白。
    pub fn seating(game_no: u32) -> Seating {
        if game_no % 2 == 0 { Seating::new(Color::Black) } else { Seating::new(Color::White) }
    }

    /// 結果を集計へ反映し、レーティング変化量を返す。
    pub fn record(&mut self, record: &GameRecord) -> RatingUpdate {
        let update = self.ratings.update(record.score_for(Player::A));
        self.standings.record(record);
        update
    }

    /// 全局を順に実行する。
    ///
    /// `play` が失敗した時点で中断し、それまでの集計はそのまま残す。
    pub fn run<F, G>(&mut self, mut play: F, mut on_game: G) -> Result<()>
    where
        F: FnMut(u32, Seating) -> RefereeResult<GameRecord>,
        G: FnMut(&GameSummary<'_>) -> Result<()>,
    {
        for game_no in self.standings.games..self.num_games {
            let seating = Self::seating(game_no);
            let record = match play(game_no, seating) {
                Ok(record) => record,
                Err(e) => {
                    let s = self.standings;
                    warn!(
                        "aborting after {} games: abd={}-{}-{}, a={}, b={}",
                        s.games, s.a_wins, s.b_wins, s.draws, self.ratings.a, self.ratings.b
                    );
                    return Err(e)
                        .with_context(|| format!("game {}/{} failed", game_no + 1, self.num_games));
                }
            };
            let update = self.record(&record);
            on_game(&GameSummary {
                game_no,
                num_games: self.num_games,
                record: &record,
                update,
                ratings: self.ratings,
                standings: self.standings,
            })?;
        }
        info!("tournament finished: {} games", self.standings.games);
        Ok(())
    }
}

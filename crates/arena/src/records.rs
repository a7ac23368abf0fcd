//! 対局結果の JSONL 出力
//!
//! 先頭に `meta` 行を1行、以降1局ごとに `result` 行を1行書く。

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;

use crate::rating::Ratings;
use crate::referee::{Color, EnginePair, GameConfig, Player, Termination};
use crate::tournament::GameSummary;

#[derive(Serialize)]
struct MetaEntry<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    timestamp: String,
    num_games: u32,
    engines: &'a EnginePair,
    game: &'a GameConfig,
    ratings: Ratings,
}

#[derive(Serialize)]
struct ResultEntry<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    game_id: u32,
    a_color: Color,
    winner: Option<Color>,
    winner_player: Option<Player>,
    reason: Termination,
    turns: u32,
    history: &'a str,
    board: &'a str,
    a_remaining_ms: u64,
    b_remaining_ms: u64,
    a_elo: f64,
    b_elo: f64,
}

pub struct RecordWriter {
    writer: BufWriter<File>,
}

impl RecordWriter {
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let file =
            File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    fn write_json(&mut self, value: &impl Serialize) -> Result<()> {
        serde_json::to_writer(&mut self.writer, value)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }

    pub fn write_meta(
        &mut self,
        num_games: u32,
        engines: &EnginePair,
        game: &GameConfig,
        ratings: Ratings,
    ) -> Result<()> {
        self.write_json(&MetaEntry {
            kind: "meta",
            timestamp: Utc::now().to_rfc3339(),
            num_games,
            engines,
            game,
            ratings,
        })
    }

    pub fn write_result(&mut self, summary: &GameSummary<'_>) -> Result<()> {
        let record = summary.record;
        self.write_json(&ResultEntry {
            kind: "result",
            game_id: summary.game_no + 1,
            a_color: record.seating().a_color,
            winner: record.winner(),
            winner_player: record.winning_player(),
            reason: record.termination(),
            turns: record.turns(),
            history: record.history(),
            board: record.board(),
            a_remaining_ms: record.remaining_ms(Player::A),
            b_remaining_ms: record.remaining_ms(Player::B),
            a_elo: summary.ratings.a,
            b_elo: summary.ratings.b,
        })
    }
}

//! 標準出力向けの結果行と、その逆変換
//!
//! 最終行 `Arena Finished: ...` はパラメータ探索側がレーティングを読み戻すのに使うため、
//! 書式を変える場合は [`parse_arena_finished`] も合わせて更新すること。

use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;

use crate::rating::Ratings;
use crate::referee::Color;
use crate::tournament::{GameSummary, Standings};

/// `[2024-01-01T00:00:00Z]`
pub fn datetime_prefix() -> String {
    format!("[{}]", Utc::now().format("%Y-%m-%dT%H:%M:%SZ"))
}

/// `[i/N]`（i は 1 始まり）
pub fn game_tag(game_no: u32, num_games: u32) -> String {
    format!("[{}/{}]", game_no + 1, num_games)
}

fn winner_label(winner: Option<Color>) -> &'static str {
    winner.map_or("draw", Color::label)
}

/// 1局分の出力行（タイムスタンプなし）
pub fn game_lines(summary: &GameSummary<'_>) -> Vec<String> {
    let tag = game_tag(summary.game_no, summary.num_games);
    let record = summary.record;
    let s = &summary.standings;
    let seating = record.seating();
    vec![
        format!("{tag} Game State:\n{}", record.board()),
        format!("{tag} Game History: {}", record.history()),
        format!(
            "{tag} Game Finished: a={}, b={}, win={}, reason={}, turns={}, abd={}-{}-{}, bw={}-{}",
            seating.a_color,
            seating.a_color.flip(),
            winner_label(record.winner()),
            record.termination().label(),
            record.turns(),
            s.a_wins,
            s.b_wins,
            s.draws,
            s.black_wins,
            s.white_wins,
        ),
        format!(
            "{tag} ELO Updated: a{:+}, b{:+}, a={}, b={}",
            summary.update.delta_a, summary.update.delta_b, summary.ratings.a, summary.ratings.b
        ),
    ]
}

/// 最終集計行（タイムスタンプなし）
pub fn arena_finished_line(standings: &Standings, ratings: &Ratings) -> String {
    format!(
        "Arena Finished: total={}, a_wins={}, b_wins={}, draws={}, black_wins={}, white_wins={}, \
         a_win_rate={:.1}%, b_win_rate={:.1}%, draw_rate={:.1}%, a_elo={}, b_elo={}",
        standings.games,
        standings.a_wins,
        standings.b_wins,
        standings.draws,
        standings.black_wins,
        standings.white_wins,
        standings.rate(standings.a_wins),
        standings.rate(standings.b_wins),
        standings.rate(standings.draws),
        ratings.a,
        ratings.b,
    )
}

/// `play` 応答の勝者テキストから色を読む。色名を含まなければ `None`（引き分け扱い）
pub fn parse_declared_winner(text: &str) -> Option<Color> {
    let lower = text.to_ascii_lowercase();
    if lower.contains("black") {
        Some(Color::Black)
    } else if lower.contains("white") {
        Some(Color::White)
    } else {
        None
    }
}

/// 最終行から読み戻した両者のレーティング
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FinalRatings {
    pub a_elo: f64,
    pub b_elo: f64,
}

static ARENA_FINISHED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Arena Finished:.*\ba_elo=(-?\d+(?:\.\d+)?),\s*b_elo=(-?\d+(?:\.\d+)?)")
        .expect("valid regex")
});

/// `Arena Finished:` 行なら両者のレーティングを返す。タイムスタンプ等の前置きは無視する。
pub fn parse_arena_finished(line: &str) -> Option<FinalRatings> {
    let caps = ARENA_FINISHED_RE.captures(line)?;
    Some(FinalRatings {
        a_elo: caps[1].parse().ok()?,
        b_elo: caps[2].parse().ok()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rating::RatingUpdate;
    use crate::referee::{GameRecord, Seating, Termination};

    #[test]
    fn declared_winner_is_case_insensitive() {
        assert_eq!(parse_declared_winner("black"), Some(Color::Black));
        assert_eq!(parse_declared_winner("BLACK WINS"), Some(Color::Black));
        assert_eq!(parse_declared_winner("winner: White"), Some(Color::White));
        assert_eq!(parse_declared_winner("wHiTe"), Some(Color::White));
    }

    #[test]
    fn declared_winner_without_color_is_none() {
        assert_eq!(parse_declared_winner(""), None);
        assert_eq!(parse_declared_winner("draw"), None);
        assert_eq!(parse_declared_winner("blk"), None);
    }

    #[test]
    fn final_line_parses_with_timestamp_prefix() {
        let line = "[2024-05-01T12:00:00Z] Arena Finished: total=4, a_wins=3, b_wins=1, draws=0, \
                    black_wins=2, white_wins=2, a_win_rate=75.0%, b_win_rate=25.0%, \
                    draw_rate=0.0%, a_elo=1031.2345, b_elo=968.7655";
        assert_eq!(
            parse_arena_finished(line),
            Some(FinalRatings {
                a_elo: 1031.2345,
                b_elo: 968.7655
            })
        );
    }

    #[test]
    fn final_line_accepts_integers_and_negatives() {
        assert_eq!(
            parse_arena_finished("Arena Finished: total=1, a_elo=1016, b_elo=-3.5"),
            Some(FinalRatings {
                a_elo: 1016.0,
                b_elo: -3.5
            })
        );
    }

    #[test]
    fn other_lines_do_not_parse() {
        assert_eq!(parse_arena_finished("[1/2] ELO Updated: a+16, b-16, a=1016, b=984"), None);
        assert_eq!(parse_arena_finished("Arena Finished: total=0"), None);
        assert_eq!(parse_arena_finished("a_elo=1000, b_elo=1000"), None);
        assert_eq!(parse_arena_finished(""), None);
    }

    #[test]
    fn final_line_round_trips_ratings() {
        let mut ratings = Ratings::default();
        for score in [1.0, 0.0, 0.5, 1.0, 1.0, 0.0, 0.5] {
            ratings.update(score);
        }
        let standings = Standings {
            games: 7,
            a_wins: 3,
            b_wins: 2,
            draws: 2,
            black_wins: 3,
            white_wins: 2,
        };
        let line = format!("{} {}", datetime_prefix(), arena_finished_line(&standings, &ratings));
        let parsed = parse_arena_finished(&line).unwrap();
        assert_eq!(parsed.a_elo, ratings.a);
        assert_eq!(parsed.b_elo, ratings.b);
        assert!(line.contains("a_win_rate=42.9%"));
    }

    #[test]
    fn game_lines_report_colors_and_deltas() {
        let record = GameRecord::new(
            Seating::new(Color::White),
            Some(Color::Black),
            Termination::NoLegalMove,
            12,
            "h8 h9".to_string(),
            "board".to_string(),
            [0, 0],
        );
        let mut standings = Standings::default();
        standings.record(&record);
        let summary = GameSummary {
            game_no: 1,
            num_games: 10,
            record: &record,
            update: RatingUpdate {
                delta_a: -16.0,
                delta_b: 16.0,
            },
            ratings: Ratings::new(984.0, 1016.0, 32.0),
            standings,
        };
        let lines = game_lines(&summary);
        assert_eq!(lines[0], "[2/10] Game State:\nboard");
        assert_eq!(lines[1], "[2/10] Game History: h8 h9");
        assert_eq!(
            lines[2],
            "[2/10] Game Finished: a=white, b=black, win=black, reason=no_legal_move, turns=12, \
             abd=0-1-0, bw=1-0"
        );
        assert_eq!(lines[3], "[2/10] ELO Updated: a-16, b+16, a=984, b=1016");
    }

    #[test]
    fn timestamp_has_fixed_shape() {
        let prefix = datetime_prefix();
        assert_eq!(prefix.len(), "[2024-01-01T00:00:00Z]".len());
        assert!(prefix.starts_with("[20") && prefix.ends_with("Z]"));
    }
}

/// 決定的な応答を返すテスト用エンジン。
///
/// 15x15 の盤を左下から順に埋めるだけで、勝敗・手詰まり・無応答などを
/// オプションで再現できる。`arena` の動作確認と結合テストに使う。
///
/// ```shell
/// cargo run -p arena --bin arena -- \
///   --a-path target/debug/scripted_engine --a-params "--finish-after 9" \
///   --b-path target/debug/scripted_engine --b-params "--finish-after 9" \
///   --num-games 2
/// ```
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

const BOARD_SIZE: usize = 15;

#[derive(Parser, Debug)]
#[command(about = "Deterministic engine speaking the arena line protocol")]
struct Cli {
    /// この手数が打たれた時点で play の応答に勝者を返す
    #[arg(long)]
    finish_after: Option<usize>,

    /// 返す勝者テキスト（未指定時は最後に打った側の色）
    #[arg(long)]
    winner: Option<String>,

    /// この手数に達したら gen に none を返す
    #[arg(long)]
    none_at: Option<usize>,

    /// この手数に達したら gen に応答しない
    #[arg(long)]
    stall_at: Option<usize>,

    /// gen 1回ごとの思考時間(ms)
    #[arg(long, default_value_t = 0)]
    think_ms: u64,

    /// gen の前に診断行を出す
    #[arg(long)]
    chatter: bool,

    /// このコマンドに `?` で応答する
    #[arg(long)]
    reject: Option<String>,

    /// 起動時に自身の pid を書き出す
    #[arg(long)]
    pid_file: Option<PathBuf>,
}

struct Engine {
    cli: Cli,
    moves: Vec<String>,
    total_ms: u64,
}

impl Engine {
    fn coordinate(index: usize) -> String {
        let col = (b'a' + (index % BOARD_SIZE) as u8) as char;
        format!("{}{}", col, index / BOARD_SIZE + 1)
    }

    fn color_of_ply(ply: usize) -> &'static str {
        if ply % 2 == 1 { "black" } else { "white" }
    }

    fn board(&self) -> String {
        let mut rows = Vec::with_capacity(BOARD_SIZE);
        for row in (0..BOARD_SIZE).rev() {
            let line: String = (0..BOARD_SIZE)
                .map(|col| {
                    let cell = Self::coordinate(row * BOARD_SIZE + col);
                    match self.moves.iter().position(|m| *m == cell) {
                        Some(i) if i % 2 == 0 => 'X',
                        Some(_) => 'O',
                        None => '.',
                    }
                })
                .collect();
            rows.push(line);
        }
        rows.join("\n")
    }

    /// `Ok(None)` は応答なし（無応答の再現）
    fn execute(
        &mut self,
        command: &str,
        args: &[&str],
        out: &mut impl Write,
    ) -> Result<Option<String>> {
        if self.cli.reject.as_deref() == Some(command) {
            return Ok(Some(format!("? {command} is not available")));
        }
        let reply = match command {
            "limit" => {
                if let ["time", "total", ms] = args {
                    self.total_ms = ms.parse().unwrap_or(self.total_ms);
                }
                "=".to_string()
            }
            "gen" => {
                let ply = self.moves.len();
                if self.cli.stall_at == Some(ply) {
                    return Ok(None);
                }
                if self.cli.none_at == Some(ply) {
                    return Ok(Some("= none".to_string()));
                }
                if self.cli.think_ms > 0 {
                    thread::sleep(Duration::from_millis(self.cli.think_ms));
                }
                let mv = Self::coordinate(ply);
                if self.cli.chatter {
                    writeln!(out, "info depth 1 nodes {}", ply + 1)?;
                    writeln!(out, "solution: pos={mv}, total={}", self.total_ms)?;
                }
                format!("= {mv}")
            }
            "play" => {
                let Some(mv) = args.first() else {
                    return Ok(Some("? missing move".to_string()));
                };
                self.moves.push(mv.to_string());
                let ply = self.moves.len();
                if self.cli.finish_after == Some(ply) {
                    let winner = self
                        .cli
                        .winner
                        .clone()
                        .unwrap_or_else(|| format!("{} wins", Self::color_of_ply(ply)));
                    format!("= {winner}")
                } else {
                    "=".to_string()
                }
            }
            "history" => format!("= {}", self.moves.join(" ")),
            "board" => format!("=\u{2}{}\n\u{3}", self.board()),
            _ => format!("? unknown command: {command}"),
        };
        Ok(Some(reply))
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    if let Some(path) = &cli.pid_file {
        fs::write(path, std::process::id().to_string())
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    let mut engine = Engine {
        cli,
        moves: Vec::new(),
        total_ms: 0,
    };
    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();

    for line in stdin.lock().lines() {
        let line = line?;
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some((&command, args)) = parts.split_first() else {
            continue;
        };
        if command == "quit" {
            break;
        }
        match engine.execute(command, args, &mut stdout)? {
            Some(reply) => {
                writeln!(stdout, "{reply}")?;
                stdout.flush()?;
            }
            None => {
                stdout.flush()?;
                // 強制終了されるまで黙る
                loop {
                    thread::sleep(Duration::from_secs(60));
                }
            }
        }
    }
    Ok(())
}

/// 2エンジン間の連続対局と Elo 集計。
///
/// 偶数局は A が黒、奇数局は B が黒。1局ごとに盤面・棋譜・勝敗・レーティング変化を、
/// 最後に `Arena Finished:` 行を標準出力へ書く。
///
/// # 使用例
///
/// ```shell
/// cargo run -p arena --release --bin arena -- \
///   --a-path target/release/engine-new --a-params "--hash 64" \
///   --b-path target/release/engine-old \
///   --num-games 20 --total-time 60000 --increment-time 1000 --turn-time 500 \
///   --out runs/arena/new-vs-old.jsonl
/// ```
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::info;

use arena::rating::{DEFAULT_K_FACTOR, DEFAULT_RATING, Ratings};
use arena::records::RecordWriter;
use arena::referee::{
    ClockSettings, EngineConfig, EnginePair, GameConfig, GameObserver, MoveEvent, Player,
    play_game,
};
use arena::report::{arena_finished_line, datetime_prefix, game_lines, game_tag};
use arena::tournament::Tournament;

#[derive(Parser, Debug)]
#[command(author, version, about = "Elo arena for two text-protocol game engines")]
struct Cli {
    /// エンジン A の実行ファイル
    #[arg(long)]
    a_path: PathBuf,

    /// エンジン A の引数（空白区切り）
    #[arg(long, default_value = "", allow_hyphen_values = true)]
    a_params: String,

    /// エンジン B の実行ファイル
    #[arg(long)]
    b_path: PathBuf,

    /// エンジン B の引数（空白区切り）
    #[arg(long, default_value = "", allow_hyphen_values = true)]
    b_params: String,

    #[arg(long, default_value_t = 100)]
    num_games: u32,

    /// 持ち時間(ms)
    #[arg(long, default_value_t = 600_000)]
    total_time: u64,

    /// 1手ごとの加算(ms)
    #[arg(long, default_value_t = 10_000)]
    increment_time: u64,

    /// 1手の目安時間(ms)。エンジンへ通知する（--timeout-margin-ms 指定時は gen の待ち時間の基準）
    #[arg(long, default_value_t = 100)]
    turn_time: u64,

    #[arg(long, default_value_t = DEFAULT_RATING, allow_hyphen_values = true)]
    a_elo: f64,

    #[arg(long, default_value_t = DEFAULT_RATING, allow_hyphen_values = true)]
    b_elo: f64,

    #[arg(long, default_value_t = DEFAULT_K_FACTOR)]
    elo_k_factor: f64,

    /// この手数に達したら引き分け（0 で無制限）
    #[arg(long, default_value_t = 225)]
    max_turns: u32,

    /// 指定すると gen の待ち時間を turn-time + このマージン(ms) に絞る。
    /// 未指定なら turn-time は通知のみ
    #[arg(long)]
    timeout_margin_ms: Option<u64>,

    /// gen 中の診断行のうち表示する接頭辞（複数指定可、"" で全て）
    #[arg(long = "echo-prefix", default_value = "solution", num_args = 1)]
    echo_prefixes: Vec<String>,

    /// JSONL 形式の対局記録
    #[arg(long)]
    out: Option<PathBuf>,
}

/// gen 中の診断行を対局タグ付きで表示する
struct EchoObserver {
    tag: String,
}

impl GameObserver for EchoObserver {
    fn on_move(&mut self, event: &MoveEvent<'_>) {
        log::debug!(
            "{} turn {} {} ({}): {} [{}ms, {}ms left]",
            self.tag,
            event.turn,
            event.player,
            event.color,
            event.token,
            event.elapsed_ms,
            event.remaining_ms
        );
    }

    fn on_diagnostic(&mut self, player: Player, line: &str) {
        println!("{} {} {}: {}", datetime_prefix(), self.tag, player, line);
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();
    if cli.num_games == 0 {
        bail!("--num-games must be >= 1");
    }

    let clock = ClockSettings {
        total_ms: cli.total_time,
        increment_ms: cli.increment_time,
        turn_ms: cli.turn_time,
    };
    let game_cfg = GameConfig {
        a_clock: clock,
        b_clock: clock,
        max_turns: (cli.max_turns > 0).then_some(cli.max_turns),
        timeout_margin_ms: cli.timeout_margin_ms,
        echo_prefixes: cli.echo_prefixes.into_iter().filter(|p| !p.is_empty()).collect(),
        ..GameConfig::default()
    };
    let engines = EnginePair {
        a: EngineConfig::new(&cli.a_path, &cli.a_params).context("invalid --a-params")?,
        b: EngineConfig::new(&cli.b_path, &cli.b_params).context("invalid --b-params")?,
    };
    let ratings = Ratings::new(cli.a_elo, cli.b_elo, cli.elo_k_factor);

    let mut writer = match &cli.out {
        Some(path) => {
            let mut w = RecordWriter::create(path)?;
            w.write_meta(cli.num_games, &engines, &game_cfg, ratings)?;
            Some(w)
        }
        None => None,
    };

    info!(
        "arena: a={} b={} games={} total={}ms inc={}ms turn={}ms",
        engines.a.path.display(),
        engines.b.path.display(),
        cli.num_games,
        clock.total_ms,
        clock.increment_ms,
        clock.turn_ms
    );

    let mut tournament = Tournament::new(cli.num_games, ratings);
    tournament.run(
        |game_no, seating| {
            let mut observer = EchoObserver {
                tag: game_tag(game_no, cli.num_games),
            };
            play_game(&engines, seating, &game_cfg, &mut observer)
        },
        |summary| {
            for line in game_lines(summary) {
                println!("{} {}", datetime_prefix(), line);
            }
            if let Some(w) = writer.as_mut() {
                w.write_result(summary)?;
            }
            Ok(())
        },
    )?;

    println!(
        "{} {}",
        datetime_prefix(),
        arena_finished_line(&tournament.standings(), &tournament.ratings())
    );
    if let Some(path) = &cli.out {
        info!("records: {}", path.display());
    }
    Ok(())
}

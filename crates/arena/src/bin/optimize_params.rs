/// 1パラメータの山登り探索。
///
/// 候補値ごとにビルドコマンドを走らせ、現在の最適値のビルドと `arena` で対戦させる。
///
/// # 使用例
///
/// ```shell
/// cargo build --release -p arena && \
/// cargo run -p arena --release --bin optimize_params -- \
///   --target-param MAX_DEPTH --start 2 --step 1 --end 8 --num-games 40 \
///   --build-command "cargo build --release -p engine" \
///   --build-artifact target/release/engine
/// ```
///
/// ビルドコマンドには `{param}` / `{value}` を埋め込めるほか、環境変数
/// `TUNE_PARAM` / `TUNE_VALUE` でも値を受け取れる。
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};

use arena::rating::DEFAULT_K_FACTOR;
use arena::referee::ClockSettings;
use arena::search::arena_run::default_arena_path;
use arena::search::settings::SearchFile;
use arena::search::{
    ArenaSettings, BuildSettings, CommandBuilder, HillClimb, SearchRange, SubprocessArena,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Hill-climbing search over one engine build parameter")]
struct Cli {
    /// 設定ファイル（TOML）。コマンドライン指定が優先される
    #[arg(long)]
    config: Option<PathBuf>,

    /// 両エンジン共通の引数（空白区切り）
    #[arg(long, allow_hyphen_values = true)]
    engine_params: Option<String>,

    /// 探索対象のパラメータ名
    #[arg(long)]
    target_param: Option<String>,

    #[arg(long, allow_hyphen_values = true)]
    start: Option<f64>,

    #[arg(long)]
    step: Option<f64>,

    #[arg(long, allow_hyphen_values = true)]
    end: Option<f64>,

    /// 1回の対戦あたりの対局数
    #[arg(long)]
    num_games: Option<u32>,

    /// 受け付けるが未使用（対戦は常に逐次実行）
    #[arg(long, default_value_t = 1)]
    num_concurrency: usize,

    #[arg(long)]
    build_command: Option<String>,

    #[arg(long)]
    build_artifact: Option<PathBuf>,

    /// 値ごとの成果物コピー先（`{param}` / `{value}` を含められる）
    #[arg(long)]
    build_output: Option<String>,

    #[arg(long)]
    build_workdir: Option<PathBuf>,

    /// `arena` 実行ファイル（未指定時: このバイナリと同じディレクトリ）
    #[arg(long)]
    arena_path: Option<PathBuf>,

    #[arg(long, default_value_t = 600_000)]
    total_time: u64,

    #[arg(long, default_value_t = 10_000)]
    increment_time: u64,

    #[arg(long, default_value_t = 100)]
    turn_time: u64,

    #[arg(long, default_value_t = DEFAULT_K_FACTOR)]
    elo_k_factor: f64,

    /// `arena` へそのまま渡す追加引数
    #[arg(long = "arena-arg", num_args = 1, allow_hyphen_values = true)]
    arena_args: Vec<String>,
}

/// 設定ファイルの `[build]` を土台に、コマンドラインで指定された項目だけを上書きする。
fn build_settings(cli: &Cli, file: Option<BuildSettings>) -> Result<BuildSettings> {
    let mut settings = match file {
        Some(file) => file,
        None => {
            let (Some(command), Some(artifact)) = (&cli.build_command, &cli.build_artifact) else {
                anyhow::bail!(
                    "--build-command and --build-artifact (or a [build] table) are required"
                );
            };
            BuildSettings::new(command.clone(), artifact.clone())
        }
    };
    if let Some(command) = &cli.build_command {
        settings.command = command.clone();
    }
    if let Some(artifact) = &cli.build_artifact {
        settings.artifact = artifact.clone();
    }
    if let Some(output) = &cli.build_output {
        settings.output = output.clone();
    }
    if let Some(dir) = &cli.build_workdir {
        settings.workdir = Some(dir.clone());
    }
    Ok(settings)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();
    let file = match &cli.config {
        Some(path) => SearchFile::load(path)?,
        None => SearchFile::default(),
    };
    let search = file.search;

    if cli.num_concurrency > 1 {
        warn!("--num-concurrency={} is ignored; arenas run one at a time", cli.num_concurrency);
    }

    let target_param = cli
        .target_param
        .clone()
        .or(search.target_param)
        .context("--target-param is required")?;
    let range = SearchRange {
        start: cli.start.or(search.start).context("--start is required")?,
        step: cli.step.or(search.step).context("--step is required")?,
        end: cli.end.or(search.end).context("--end is required")?,
    };
    range.validate()?;

    let arena_path = match cli.arena_path.clone().or(search.arena_path) {
        Some(path) => path,
        None => default_arena_path()?,
    };
    let arena = SubprocessArena::new(ArenaSettings {
        arena_path,
        engine_params: cli.engine_params.clone().or(search.engine_params).unwrap_or_default(),
        num_games: cli.num_games.or(search.num_games).unwrap_or(100),
        clock: ClockSettings {
            total_ms: cli.total_time,
            increment_ms: cli.increment_time,
            turn_ms: cli.turn_time,
        },
        k_factor: cli.elo_k_factor,
        extra_args: cli.arena_args.clone(),
    });
    let builder = CommandBuilder::new(build_settings(&cli, file.build)?, &target_param);

    info!(
        "search {}: start={} step={} end={} ({} candidates)",
        target_param,
        range.start,
        range.step,
        range.end,
        range.candidates().len()
    );

    let outcome = HillClimb::new(range, builder, arena).run()?;

    println!("Search Finished: param={}, optimal={}", target_param, outcome.optimal_value);
    for (value, rating) in outcome.table.iter() {
        let marker = if value == outcome.optimal_value { " *" } else { "" };
        println!("  {target_param}={value}: elo={rating}{marker}");
    }
    Ok(())
}

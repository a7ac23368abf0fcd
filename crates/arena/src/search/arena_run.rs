//! `arena` バイナリを子プロセスとして走らせ、最終行からレーティングを読み戻す

use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::process::{Command, Stdio};

use anyhow::{Context, Result, bail};
use log::debug;

use super::{ArenaOutcome, ArenaRunner, Contestant};
use crate::referee::ClockSettings;
use crate::report::parse_arena_finished;

/// 同じディレクトリにある `arena` 実行ファイル
pub fn default_arena_path() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("failed to locate current executable")?;
    Ok(exe.with_file_name(format!("arena{}", std::env::consts::EXE_SUFFIX)))
}

#[derive(Clone, Debug)]
pub struct ArenaSettings {
    pub arena_path: PathBuf,
    /// 両エンジン共通のパラメータ文字列
    pub engine_params: String,
    pub num_games: u32,
    pub clock: ClockSettings,
    pub k_factor: f64,
    /// `arena` へそのまま渡す追加引数
    pub extra_args: Vec<String>,
}

pub struct SubprocessArena {
    settings: ArenaSettings,
}

impl SubprocessArena {
    pub fn new(settings: ArenaSettings) -> Self {
        Self { settings }
    }

    /// A がベースライン、B が候補
    pub fn command_args(&self, baseline: &Contestant, target: &Contestant) -> Vec<String> {
        let s = &self.settings;
        let mut args = vec![
            "--a-path".to_string(),
            baseline.path.display().to_string(),
            format!("--a-params={}", s.engine_params),
            "--b-path".to_string(),
            target.path.display().to_string(),
            format!("--b-params={}", s.engine_params),
            "--total-time".to_string(),
            s.clock.total_ms.to_string(),
            "--increment-time".to_string(),
            s.clock.increment_ms.to_string(),
            "--turn-time".to_string(),
            s.clock.turn_ms.to_string(),
            "--num-games".to_string(),
            s.num_games.to_string(),
            "--a-elo".to_string(),
            baseline.rating.to_string(),
            "--b-elo".to_string(),
            target.rating.to_string(),
            "--elo-k-factor".to_string(),
            s.k_factor.to_string(),
        ];
        args.extend(s.extra_args.iter().cloned());
        args
    }
}

impl ArenaRunner for SubprocessArena {
    fn race(&mut self, baseline: &Contestant, target: &Contestant) -> Result<ArenaOutcome> {
        let args = self.command_args(baseline, target);
        debug!("{} {}", self.settings.arena_path.display(), args.join(" "));
        let mut child = Command::new(&self.settings.arena_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .with_context(|| format!("failed to spawn {}", self.settings.arena_path.display()))?;

        let stdout = child.stdout.take().context("arena stdout is not piped")?;
        let mut finished = None;
        for line in BufReader::new(stdout).lines() {
            let line = line.context("failed to read arena output")?;
            println!("{line}");
            if let Some(ratings) = parse_arena_finished(&line) {
                finished = Some(ratings);
            }
        }

        let status = child.wait().context("failed to wait for arena")?;
        if !status.success() {
            bail!("arena exited with {status}");
        }
        let ratings = finished.context("arena output has no `Arena Finished` line")?;
        Ok(ArenaOutcome {
            baseline_elo: ratings.a_elo,
            target_elo: ratings.b_elo,
        })
    }
}

//! 外部ビルドコマンドの実行
//!
//! コマンドと出力先には `{param}` / `{value}` を埋め込める。ビルド後の成果物は
//! 値ごとの出力先へコピーし、ベースラインと候補のバイナリを並存させる。

use std::fs;
use std::path::PathBuf;
use std::process::Command;

use anyhow::{Context, Result, bail};
use log::info;
use serde::{Deserialize, Serialize};

use super::EngineBuilder;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BuildSettings {
    /// ビルドコマンド（シェル風の引用符で空白を含む引数を書ける）
    pub command: String,
    /// ビルドが生成する実行ファイル
    pub artifact: PathBuf,
    /// 値ごとのコピー先
    #[serde(default = "default_output")]
    pub output: String,
    #[serde(default)]
    pub workdir: Option<PathBuf>,
}

fn default_output() -> String {
    "target/tune/engine-{param}-{value}".to_string()
}

impl BuildSettings {
    /// 出力先・作業ディレクトリは既定値
    pub fn new(command: impl Into<String>, artifact: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            artifact: artifact.into(),
            output: default_output(),
            workdir: None,
        }
    }
}

pub struct CommandBuilder {
    settings: BuildSettings,
    param: String,
}

impl CommandBuilder {
    pub fn new(settings: BuildSettings, param: impl Into<String>) -> Self {
        Self {
            settings,
            param: param.into(),
        }
    }

    fn expand(&self, template: &str, value: f64) -> String {
        template.replace("{param}", &self.param).replace("{value}", &value.to_string())
    }

    pub fn output_path(&self, value: f64) -> PathBuf {
        PathBuf::from(self.expand(&self.settings.output, value))
    }
}

impl EngineBuilder for CommandBuilder {
    fn build(&mut self, value: f64) -> Result<PathBuf> {
        let command = self.expand(&self.settings.command, value);
        let argv = shlex::split(&command)
            .with_context(|| format!("unbalanced quotes in build command `{command}`"))?;
        let Some((program, args)) = argv.split_first() else {
            bail!("build command is empty");
        };

        info!("building {}={}: {}", self.param, value, command);
        let mut cmd = Command::new(program);
        cmd.args(args)
            .env("TUNE_PARAM", &self.param)
            .env("TUNE_VALUE", value.to_string());
        if let Some(dir) = &self.settings.workdir {
            cmd.current_dir(dir);
        }
        let status = cmd.status().with_context(|| format!("failed to run `{command}`"))?;
        if !status.success() {
            bail!("`{command}` exited with {status}");
        }

        let dest = self.output_path(value);
        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        fs::copy(&self.settings.artifact, &dest).with_context(|| {
            format!(
                "failed to copy {} to {}",
                self.settings.artifact.display(),
                dest.display()
            )
        })?;
        Ok(dest)
    }
}

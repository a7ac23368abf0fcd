//! 1次元パラメータの山登り探索
//!
//! 候補値ごとにエンジンをビルドし、その時点の最適値のビルドと対戦させる。
//! 候補のレーティングが上回れば最適値を置き換える。後戻りはしない。

pub mod arena_run;
pub mod build;
pub mod settings;

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use log::info;
use serde::{Deserialize, Serialize};

use crate::rating::DEFAULT_RATING;

pub use arena_run::{ArenaSettings, SubprocessArena};
pub use build::{BuildSettings, CommandBuilder};

/// 探索範囲。候補は `start + k * step`（k = 1, 2, ...）で `end` を超えない範囲。
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchRange {
    pub start: f64,
    pub step: f64,
    pub end: f64,
}

impl SearchRange {
    /// 1回の探索で扱う候補数の上限
    pub const MAX_CANDIDATES: u64 = 100_000;

    pub fn validate(&self) -> Result<()> {
        if !(self.start.is_finite() && self.step.is_finite() && self.end.is_finite()) {
            bail!("search range must be finite: {self:?}");
        }
        if self.step <= 0.0 {
            bail!("step must be positive (got {})", self.step);
        }
        if self.end < self.start {
            bail!("end ({}) must not be below start ({})", self.end, self.start);
        }
        if self.start + self.step == self.start {
            bail!("step {} is below the precision of start {}", self.step, self.start);
        }
        let count = ((self.end - self.start) / self.step).floor();
        if count > Self::MAX_CANDIDATES as f64 {
            bail!("range yields {count} candidates (limit {})", Self::MAX_CANDIDATES);
        }
        Ok(())
    }

    /// 開始値を除く候補列。累積誤差を避けるため毎回 `start + k * step` で求める。
    /// 値が増えなくなった時点と上限件数で打ち切る。
    pub fn candidates(&self) -> Vec<f64> {
        let tolerance = self.step * 1e-9;
        let mut values = Vec::new();
        let mut last = self.start;
        for k in 1..=Self::MAX_CANDIDATES {
            let value = self.start + k as f64 * self.step;
            if value > self.end + tolerance || value <= last {
                break;
            }
            values.push(value);
            last = value;
        }
        values
    }
}

/// 浮動小数のパラメータ値を順序付きキーとして扱うためのラッパ
#[derive(Clone, Copy, Debug)]
struct ParamKey(f64);

impl PartialEq for ParamKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ParamKey {}

impl PartialOrd for ParamKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ParamKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// 試した値 → 直近に観測したレーティング
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParameterTable {
    ratings: BTreeMap<ParamKey, f64>,
}

impl ParameterTable {
    pub fn seeded(value: f64, rating: f64) -> Self {
        let mut table = Self::default();
        table.set(value, rating);
        table
    }

    pub fn get(&self, value: f64) -> Option<f64> {
        self.ratings.get(&ParamKey(value)).copied()
    }

    pub fn set(&mut self, value: f64, rating: f64) {
        self.ratings.insert(ParamKey(value), rating);
    }

    pub fn len(&self) -> usize {
        self.ratings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ratings.is_empty()
    }

    /// 値の昇順
    pub fn iter(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.ratings.iter().map(|(k, r)| (k.0, *r))
    }
}

/// 対戦に出す1ビルド
#[derive(Clone, Debug, PartialEq)]
pub struct Contestant {
    pub value: f64,
    pub path: PathBuf,
    /// トーナメント開始時のレーティング
    pub rating: f64,
}

/// 1回のトーナメントで得られた両者の最終レーティング
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ArenaOutcome {
    pub baseline_elo: f64,
    pub target_elo: f64,
}

/// パラメータ値を埋め込んだエンジンを用意する。戻り値は実行ファイルのパス。
pub trait EngineBuilder {
    fn build(&mut self, value: f64) -> Result<PathBuf>;
}

/// 2ビルド間でトーナメントを1回実行する。
pub trait ArenaRunner {
    fn race(&mut self, baseline: &Contestant, target: &Contestant) -> Result<ArenaOutcome>;
}

#[derive(Clone, Debug, PartialEq)]
pub struct SearchOutcome {
    pub optimal_value: f64,
    pub table: ParameterTable,
}

pub struct HillClimb<B, R> {
    range: SearchRange,
    builder: B,
    runner: R,
}

impl<B: EngineBuilder, R: ArenaRunner> HillClimb<B, R> {
    pub fn new(range: SearchRange, builder: B, runner: R) -> Self {
        Self {
            range,
            builder,
            runner,
        }
    }

    pub fn run(&mut self) -> Result<SearchOutcome> {
        self.range.validate()?;
        let start = self.range.start;
        let mut table = ParameterTable::seeded(start, DEFAULT_RATING);

        let path = self
            .builder
            .build(start)
            .with_context(|| format!("failed to build baseline for value {start}"))?;
        let mut optimal = Contestant {
            value: start,
            path,
            rating: DEFAULT_RATING,
        };

        let candidates = self.range.candidates();
        for (step_no, value) in candidates.iter().copied().enumerate() {
            let path = self
                .builder
                .build(value)
                .with_context(|| format!("failed to build candidate for value {value}"))?;
            optimal.rating = table.get(optimal.value).unwrap_or(DEFAULT_RATING);
            let target = Contestant {
                value,
                path,
                rating: table.get(value).unwrap_or(optimal.rating),
            };
            info!(
                "[{}/{}] {} ({}) vs {} ({})",
                step_no + 1,
                candidates.len(),
                optimal.value,
                optimal.rating,
                target.value,
                target.rating
            );

            let outcome = self.runner.race(&optimal, &target).with_context(|| {
                format!("arena failed for {} vs {}", optimal.value, target.value)
            })?;
            table.set(optimal.value, outcome.baseline_elo);
            table.set(target.value, outcome.target_elo);

            if outcome.target_elo > outcome.baseline_elo {
                info!(
                    "new optimal value {} ({} > {})",
                    target.value, outcome.target_elo, outcome.baseline_elo
                );
                optimal = Contestant {
                    rating: outcome.target_elo,
                    ..target
                };
            } else {
                optimal.rating = outcome.baseline_elo;
            }
        }

        Ok(SearchOutcome {
            optimal_value: optimal.value,
            table,
        })
    }
}

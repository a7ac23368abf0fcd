//! 対局管理で発生するエラー型
//!
//! いずれも対局内では回復不能として扱い、呼び出し側へそのまま伝播する。

use std::path::PathBuf;
use std::time::Duration;

/// エンジンとの1往復で発生するエラー
#[derive(thiserror::Error, Debug)]
pub enum ProtocolError {
    /// `?<message>` 応答
    #[error("{engine}: command `{command}` rejected: {message}")]
    Rejected {
        engine: String,
        command: String,
        message: String,
    },

    /// 応答待ちの間に標準出力が閉じられた
    #[error("{engine}: engine closed its output while waiting for `{command}`")]
    Disconnected { engine: String, command: String },

    /// 応答期限切れ
    #[error("{engine}: no response to `{command}` within {}ms", .timeout.as_millis())]
    Timeout {
        engine: String,
        command: String,
        timeout: Duration,
    },

    /// 既に停止させたエンジンへの送信
    #[error("{engine}: engine already terminated")]
    Terminated { engine: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// 1局の進行中に発生するエラー
#[derive(thiserror::Error, Debug)]
pub enum RefereeError {
    #[error("failed to spawn engine at {}: {source}", .path.display())]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// エンジン引数の引用符が閉じていない
    #[error("unbalanced quotes in engine params: {params}")]
    InvalidParams { params: String },

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// `gen` が空の応答を返した
    #[error("{engine}: empty reply to `gen` at turn {turn}")]
    EmptyMove { engine: String, turn: u32 },

    /// 両エンジンの勝敗認識が食い違った
    #[error(
        "engines disagree on the winner after `play {token}` (turn {turn}): \
         {mover}={mover_winner:?}, {opponent}={opponent_winner:?}"
    )]
    WinnerMismatch {
        turn: u32,
        token: String,
        mover: String,
        mover_winner: Option<String>,
        opponent: String,
        opponent_winner: Option<String>,
    },
}

/// 対局層の Result 型
pub type RefereeResult<T> = Result<T, RefereeError>;

use std::path::PathBuf;
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use log::{debug, warn};
use serde::Serialize;

use super::protocol::{EngineLine, EngineLink, LineObserver, ProtocolClient, spawn_line_reader};
use crate::error::{ProtocolError, RefereeError};

/// `quit` 送信後、強制終了に切り替えるまでの猶予
pub const ENGINE_QUIT_TIMEOUT: Duration = Duration::from_secs(3);
pub const ENGINE_QUIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// エンジンプロセス起動時の設定。
#[derive(Clone, Debug, Serialize)]
pub struct EngineConfig {
    pub path: PathBuf,
    pub args: Vec<String>,
}

impl EngineConfig {
    /// パラメータ文字列をシェル風に分割して構築する。引用符で囲めば空白を含む引数も渡せる。
    pub fn new(path: impl Into<PathBuf>, params: &str) -> Result<Self, RefereeError> {
        let args = shlex::split(params).ok_or_else(|| RefereeError::InvalidParams {
            params: params.to_string(),
        })?;
        Ok(Self {
            path: path.into(),
            args,
        })
    }
}

/// 1本のエンジンプロセス。drop 時に必ず終了させる。
pub struct EngineProcess {
    child: Child,
    client: ProtocolClient<ChildStdin>,
    exited: bool,
}

impl EngineProcess {
    /// プロセスを起動する。`response_timeout` は期限を明示しないコマンドに適用される。
    pub fn spawn(
        cfg: &EngineConfig,
        label: String,
        response_timeout: Option<Duration>,
    ) -> Result<Self, RefereeError> {
        let spawn_error = |source| RefereeError::Spawn {
            path: cfg.path.clone(),
            source,
        };
        let mut child = Command::new(&cfg.path)
            .args(&cfg.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_error)?;

        let (Some(stdin), Some(stdout), Some(stderr)) =
            (child.stdin.take(), child.stdout.take(), child.stderr.take())
        else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(spawn_error(std::io::Error::other("engine stdio is not piped")));
        };

        // stdout と stderr を同じチャネルへ流す。stderr はログ用途のみ。
        let (tx, rx) = mpsc::channel();
        spawn_line_reader(stdout, tx.clone(), EngineLine::Stdout);
        spawn_line_reader(stderr, tx, EngineLine::Stderr);

        debug!("{}: spawned {} (pid {})", label, cfg.path.display(), child.id());
        Ok(Self {
            child,
            client: ProtocolClient::new(label, stdin, rx).with_default_timeout(response_timeout),
            exited: false,
        })
    }

    fn kill(&mut self) {
        if self.exited {
            return;
        }
        self.client.close();
        let _ = self.child.kill();
        let _ = self.child.wait();
        self.exited = true;
    }

    /// `quit` を送り、猶予内に終了しなければ kill する。
    fn shutdown(&mut self) {
        if self.exited {
            return;
        }
        if !self.client.is_terminated() {
            let _ = self.client.write_line("quit");
        }
        self.client.close();
        let deadline = Instant::now() + ENGINE_QUIT_TIMEOUT;
        while Instant::now() < deadline {
            if let Ok(Some(_)) = self.child.try_wait() {
                self.exited = true;
                return;
            }
            std::thread::sleep(ENGINE_QUIT_POLL_INTERVAL);
        }
        warn!("{}: did not exit after quit, killing", self.client.label());
        self.kill();
    }
}

impl EngineLink for EngineProcess {
    fn label(&self) -> &str {
        self.client.label()
    }

    fn request(
        &mut self,
        command: &str,
        timeout: Option<Duration>,
        observer: Option<&mut LineObserver<'_>>,
    ) -> Result<Option<String>, ProtocolError> {
        self.client.request(command, timeout, observer)
    }

    /// 応答しないエンジン向け。猶予を置かずに kill する。
    fn terminate(&mut self) {
        warn!("{}: terminating engine process", self.client.label());
        self.kill();
    }

    fn is_terminated(&self) -> bool {
        self.exited || self.client.is_terminated()
    }
}

impl Drop for EngineProcess {
    fn drop(&mut self) {
        self.shutdown();
    }
}

//! エンジンとの行指向コマンドプロトコル
//!
//! 1コマンド送信ごとに終端行が来るまで読み続ける。
//!
//! - `=` : 成功（ペイロードなし）
//! - `=<payload>` / `= <payload>` : 成功
//! - `?<message>` : 失敗
//! - `=\x02...` : 複数行ストリーム。`\x03` を含む行までを連結して返す
//!
//! それ以外の行はエンジンの診断出力として observer に渡すだけで制御には使わない。

use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

use log::debug;

use crate::error::ProtocolError;

pub const STREAM_START: char = '\u{2}';
pub const STREAM_END: char = '\u{3}';

/// reader スレッドから届く1行
pub enum EngineLine {
    Stdout(String),
    Stderr(String),
}

/// 診断行を受け取るコールバック
pub type LineObserver<'a> = dyn FnMut(&str) + 'a;

/// 対局管理から見たエンジン1本分の通信路。
pub trait EngineLink {
    fn label(&self) -> &str;

    /// コマンドを送り、終端行まで読む。`timeout` が `None` なら既定の期限を使う。
    fn request(
        &mut self,
        command: &str,
        timeout: Option<Duration>,
        observer: Option<&mut LineObserver<'_>>,
    ) -> Result<Option<String>, ProtocolError>;

    fn send_command(&mut self, command: &str) -> Result<Option<String>, ProtocolError> {
        self.request(command, None, None)
    }

    /// 以降の通信を打ち切る。プロセスであれば強制終了する。
    fn terminate(&mut self);

    fn is_terminated(&self) -> bool;
}

enum Reply<'a> {
    Blank,
    Empty,
    Payload(&'a str),
    Stream(&'a str),
    Rejected(&'a str),
    Diagnostic(&'a str),
}

fn classify(line: &str) -> Reply<'_> {
    let line = line.trim();
    if line.is_empty() {
        return Reply::Blank;
    }
    if let Some(rest) = line.strip_prefix('?') {
        return Reply::Rejected(rest.trim());
    }
    if let Some(rest) = line.strip_prefix('=') {
        let rest = rest.strip_prefix(' ').unwrap_or(rest);
        if let Some(body) = rest.strip_prefix(STREAM_START) {
            return Reply::Stream(body);
        }
        let payload = rest.trim();
        return if payload.is_empty() { Reply::Empty } else { Reply::Payload(payload) };
    }
    Reply::Diagnostic(line)
}

/// 任意の reader を行単位で読み、チャネルへ流すスレッドを起動する。
pub fn spawn_line_reader<R, F>(reader: R, tx: Sender<EngineLine>, wrap: F)
where
    R: Read + Send + 'static,
    F: Fn(String) -> EngineLine + Send + 'static,
{
    std::thread::spawn(move || {
        let reader = BufReader::new(reader);
        for line in reader.lines().map_while(Result::ok) {
            if tx.send(wrap(line)).is_err() {
                break;
            }
        }
    });
}

/// 同期的なコマンド/応答クライアント。
pub struct ProtocolClient<W: Write> {
    writer: Option<BufWriter<W>>,
    rx: Receiver<EngineLine>,
    label: String,
    default_timeout: Option<Duration>,
}

impl<W: Write> ProtocolClient<W> {
    pub fn new(label: impl Into<String>, writer: W, rx: Receiver<EngineLine>) -> Self {
        Self {
            writer: Some(BufWriter::new(writer)),
            rx,
            label: label.into(),
            default_timeout: None,
        }
    }

    pub fn from_reader<R>(label: impl Into<String>, writer: W, reader: R) -> Self
    where
        R: Read + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        spawn_line_reader(reader, tx, EngineLine::Stdout);
        Self::new(label, writer, rx)
    }

    pub fn with_default_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// 送信済みバイト列の参照（テスト用途）
    pub fn writer(&self) -> Option<&W> {
        self.writer.as_ref().map(BufWriter::get_ref)
    }

    pub fn write_line(&mut self, msg: &str) -> Result<(), ProtocolError> {
        let Some(writer) = self.writer.as_mut() else {
            return Err(ProtocolError::Terminated {
                engine: self.label.clone(),
            });
        };
        debug!("{} <- {}", self.label, msg);
        writer.write_all(msg.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }

    /// 標準入力を閉じる。エンジン側には EOF として見える。
    pub fn close(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            let _ = writer.flush();
        }
    }

    fn recv_line(
        &self,
        command: &str,
        deadline: Option<Instant>,
        timeout: Option<Duration>,
    ) -> Result<String, ProtocolError> {
        loop {
            let received = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    self.rx.recv_timeout(remaining).map_err(|e| match e {
                        RecvTimeoutError::Timeout => ProtocolError::Timeout {
                            engine: self.label.clone(),
                            command: command.to_string(),
                            timeout: timeout.unwrap_or_default(),
                        },
                        RecvTimeoutError::Disconnected => self.disconnected(command),
                    })?
                }
                None => self.rx.recv().map_err(|_| self.disconnected(command))?,
            };
            match received {
                EngineLine::Stdout(line) => {
                    debug!("{} -> {}", self.label, line);
                    return Ok(line);
                }
                EngineLine::Stderr(line) => debug!("{} (stderr) {}", self.label, line),
            }
        }
    }

    fn disconnected(&self, command: &str) -> ProtocolError {
        ProtocolError::Disconnected {
            engine: self.label.clone(),
            command: command.to_string(),
        }
    }

    fn read_stream(
        &self,
        command: &str,
        first: &str,
        deadline: Option<Instant>,
        timeout: Option<Duration>,
    ) -> Result<String, ProtocolError> {
        let mut lines: Vec<String> = Vec::new();
        let mut current = first.to_string();
        let mut opening = true;
        loop {
            if let Some(end) = current.find(STREAM_END) {
                if !current[..end].is_empty() {
                    lines.push(current[..end].to_string());
                }
                break;
            }
            // 開始行が `=\x02` だけの場合は空行として数えない
            if !(opening && current.is_empty()) {
                lines.push(current);
            }
            opening = false;
            let mut next = self.recv_line(command, deadline, timeout)?;
            if next.ends_with('\r') {
                next.pop();
            }
            current = next;
        }
        Ok(lines.join("\n"))
    }
}

impl<W: Write> EngineLink for ProtocolClient<W> {
    fn label(&self) -> &str {
        &self.label
    }

    fn request(
        &mut self,
        command: &str,
        timeout: Option<Duration>,
        mut observer: Option<&mut LineObserver<'_>>,
    ) -> Result<Option<String>, ProtocolError> {
        let timeout = timeout.or(self.default_timeout);
        self.write_line(command)?;
        let deadline = timeout.map(|t| Instant::now() + t);

        loop {
            let line = self.recv_line(command, deadline, timeout)?;
            match classify(&line) {
                Reply::Blank => {}
                Reply::Empty => return Ok(None),
                Reply::Payload(payload) => return Ok(Some(payload.to_string())),
                Reply::Stream(first) => {
                    let first = first.to_string();
                    return self.read_stream(command, &first, deadline, timeout).map(Some);
                }
                Reply::Rejected(message) => {
                    return Err(ProtocolError::Rejected {
                        engine: self.label.clone(),
                        command: command.to_string(),
                        message: message.to_string(),
                    });
                }
                Reply::Diagnostic(text) => {
                    if let Some(cb) = observer.as_mut() {
                        cb(text);
                    }
                }
            }
        }
    }

    fn terminate(&mut self) {
        self.close();
    }

    fn is_terminated(&self) -> bool {
        self.writer.is_none()
    }
}

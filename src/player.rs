use std::path::PathBuf;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};

use crate::board::Board;
use crate::channel::{SubprocessChannel, DEFAULT_DEADLINE};
use crate::error::{ChannelError, ErrorKind};
use crate::protocol::sanitize;

/// Opaque hooks used when the referee is embedded in a chat front-end (§1 "chat-bridge
/// input/output hooks"). The core neither knows nor cares what's on the other end: `ask` is
/// polled instead of stdin when present, `tell` is invoked instead of a println when present.
pub type InputHook = Box<dyn Fn() -> Option<String> + Send + Sync>;
pub type OutputHook = Box<dyn Fn(&str) + Send + Sync>;

#[derive(Default)]
pub struct ChatHooks {
    pub ask: Option<InputHook>,
    pub tell: Option<OutputHook>,
}

/// A player specification (§3): colour, kind, display name, liveness, and (for subprocesses) the
/// program path. `alive` starts `true` and is flipped exactly once by the match engine.
#[derive(Debug, Clone)]
pub struct PlayerSpec {
    pub no: u32,
    pub display_name: String,
    pub source_path: Option<PathBuf>,
    pub alive: bool,
}

impl PlayerSpec {
    pub fn human(no: u32, display_name: String) -> Self {
        Self { no, display_name, source_path: None, alive: true }
    }

    pub fn subprocess(no: u32, display_name: String, source_path: PathBuf) -> Self {
        Self { no, display_name, source_path: Some(source_path), alive: true }
    }

    pub fn basename(&self) -> String {
        match &self.source_path {
            Some(path) => path.file_stem().and_then(|s| s.to_str()).unwrap_or(&self.display_name).to_string(),
            None => self.display_name.clone(),
        }
    }
}

/// The two player kinds, modelled as a closed tagged variant rather than a trait object, per the
/// teacher's polymorphism-over-variants design (§9).
pub enum PlayerAdapter {
    Human(HumanAdapter),
    Subprocess(SubprocessAdapter),
}

pub struct HumanAdapter {
    pub spec: PlayerSpec,
    hooks: ChatHooks,
    stdin: Option<tokio::io::Lines<BufReader<tokio::io::Stdin>>>,
}

pub struct SubprocessAdapter {
    pub spec: PlayerSpec,
    channel: Option<SubprocessChannel>,
    deadline: Duration,
    debug: bool,
}

impl PlayerAdapter {
    pub fn human(spec: PlayerSpec, hooks: ChatHooks) -> Self {
        PlayerAdapter::Human(HumanAdapter { spec, hooks, stdin: None })
    }

    pub fn subprocess(spec: PlayerSpec, deadline: Duration, debug: bool) -> Self {
        PlayerAdapter::Subprocess(SubprocessAdapter { spec, channel: None, deadline, debug })
    }

    pub fn spec(&self) -> &PlayerSpec {
        match self {
            PlayerAdapter::Human(h) => &h.spec,
            PlayerAdapter::Subprocess(s) => &s.spec,
        }
    }

    pub fn spec_mut(&mut self) -> &mut PlayerSpec {
        match self {
            PlayerAdapter::Human(h) => &mut h.spec,
            PlayerAdapter::Subprocess(s) => &mut s.spec,
        }
    }

    /// Initialises the player for a new match. For a subprocess this spawns the child and writes
    /// the handshake line; for a human it's a cheap reset.
    pub async fn start_game(&mut self, width: usize, height: usize, n: u32) -> Result<(), ErrorKind> {
        match self {
            PlayerAdapter::Human(h) => {
                if h.hooks.ask.is_none() {
                    h.stdin = Some(BufReader::new(tokio::io::stdin()).lines());
                }
                Ok(())
            }
            PlayerAdapter::Subprocess(s) => {
                let path = s.spec.source_path.clone().expect("subprocess player has a source path");
                let mut channel = SubprocessChannel::spawn(&path).map_err(channel_err_to_kind)?;
                channel.send_handshake(width, height, n, s.spec.no).await.map_err(channel_err_to_kind)?;
                s.channel = Some(channel);
                Ok(())
            }
        }
    }

    /// Obtains the next move, re-prompting a human on a recoverable error but treating a single
    /// failed attempt from a subprocess as terminal (§4.4 step 2).
    pub async fn ask_move(&mut self, board: &Board) -> Result<(usize, usize), ErrorKind> {
        match self {
            PlayerAdapter::Human(h) => loop {
                let line = h.read_line().await;
                match sanitize(board, line.trim()) {
                    Ok(mv) => return Ok(mv),
                    Err(kind) if kind.human_recoverable() => {
                        h.tell(&format!("Invalid move: {kind}. Try again."));
                        continue;
                    }
                    Err(kind) => return Err(kind),
                }
            },
            PlayerAdapter::Subprocess(s) => {
                let debug_name = s.spec.display_name.clone();
                let debug = s.debug;
                let channel = s.channel.as_mut().expect("start_game must run before ask_move");
                let line = channel
                    .read_move(s.deadline, |debug_line| {
                        if debug {
                            eprintln!("[{debug_name}] {debug_line}");
                        }
                    })
                    .await
                    .map_err(channel_err_to_kind)?;
                sanitize(board, line.trim())
            }
        }
    }

    /// Informs this player that `col` was just played elsewhere (or `-1` for a skip). For Human,
    /// a no-op unless a front-end hook is installed (§4.2) — the board is already re-rendered
    /// before every turn, so there's nothing to announce on the bare terminal.
    pub async fn tell_move(&mut self, col: i64) {
        match self {
            PlayerAdapter::Human(h) => h.notify_move(&col.to_string()),
            PlayerAdapter::Subprocess(s) => {
                if let Some(channel) = s.channel.as_mut() {
                    let _ = channel.send_line(&col.to_string()).await;
                }
            }
        }
    }

    /// Marks this player eliminated and releases any subprocess resources.
    pub async fn lose_game(&mut self) {
        self.spec_mut().alive = false;
        if let PlayerAdapter::Subprocess(s) = self {
            if let Some(channel) = s.channel.take() {
                channel.stop().await;
            }
        }
    }

    /// Cooperative end-of-match teardown; idempotent (a player that already lost has no channel
    /// left to stop).
    pub async fn stop_game(&mut self) {
        if let PlayerAdapter::Subprocess(s) = self {
            if let Some(channel) = s.channel.take() {
                channel.stop().await;
            }
        }
    }
}

fn channel_err_to_kind(err: ChannelError) -> ErrorKind {
    match err {
        ChannelError::Timeout => ErrorKind::Timeout,
        ChannelError::StreamClosed => ErrorKind::Timeout,
        ChannelError::RuntimeError(_) => ErrorKind::RuntimeError,
        ChannelError::Io(_) => ErrorKind::RuntimeError,
    }
}

impl HumanAdapter {
    async fn read_line(&mut self) -> String {
        if let Some(ask) = self.hooks.ask.as_ref() {
            loop {
                if let Some(line) = ask() {
                    return line;
                }
                tokio::task::yield_now().await;
            }
        }
        match self.stdin.as_mut().expect("start_game initialises stdin").next_line().await {
            Ok(Some(line)) => line,
            _ => "stop".to_string(),
        }
    }

    /// Used for the "invalid move, try again" re-prompt, which must reach the player one way or
    /// another: through the hook if installed, or stdout otherwise.
    fn tell(&self, msg: &str) {
        if let Some(tell) = self.hooks.tell.as_ref() {
            tell(msg);
        } else {
            println!("{msg}");
        }
    }

    /// Used for `tell_move`, which is a no-op without a hook installed (§4.2).
    fn notify_move(&self, msg: &str) {
        if let Some(tell) = self.hooks.tell.as_ref() {
            tell(msg);
        }
    }
}

/// Default display name for a human player with no name supplied, mirroring the teacher's
/// `PlayerBuilder::build_human`.
pub fn default_human_name() -> String {
    whoami::realname().unwrap_or("Human".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basename_uses_source_path_stem_for_subprocess_players() {
        let spec = PlayerSpec::subprocess(1, "Alice".to_string(), PathBuf::from("ai/alice.py"));
        assert_eq!(spec.basename(), "alice");
    }

    #[test]
    fn basename_uses_display_name_for_human_players() {
        let spec = PlayerSpec::human(1, "Bob".to_string());
        assert_eq!(spec.basename(), "Bob");
    }
}

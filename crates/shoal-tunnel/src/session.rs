//! Interactive session launch over the tunnel.
//!
//! The launcher builds a structured remote command, opens a session to the
//! leader through the tunnel dialer, and wires the local process's standard
//! streams to it full-duplex until the remote side exits. The wire protocol
//! is a length-delimited frame stream: one JSON header frame, then tagged
//! data frames. Terminal raw-mode handling belongs to the remote shell
//! service, not this layer.

use std::collections::VecDeque;
use std::net::{IpAddr, SocketAddr};
use std::sync::Mutex;

use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::bytes::{BufMut, Bytes, BytesMut};
use tokio_util::codec::{Framed, LengthDelimitedCodec};

use crate::dialer::Dial;
use crate::error::{Result, TunnelError};

/// Frame carrying local stdin bytes to the remote command.
const FRAME_STDIN: u8 = 0x00;
/// Frame carrying remote stdout bytes.
const FRAME_STDOUT: u8 = 0x01;
/// Frame carrying remote stderr bytes.
const FRAME_STDERR: u8 = 0x02;
/// Frame carrying the remote exit status as a big-endian `i32`.
const FRAME_EXIT: u8 = 0x03;

/// A remote command built from discrete arguments.
///
/// Arguments are handed to the transport as separate argv elements, never
/// joined by naive concatenation; values containing whitespace or shell
/// metacharacters survive intact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCommand {
    program: String,
    args: Vec<String>,
}

impl SessionCommand {
    /// Creates a command with no arguments.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Appends one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Builds the Postgres console command for the given credentials.
    ///
    /// An absent password is passed as an empty argument; the remote
    /// console treats it as "prompt or trust".
    #[must_use]
    pub fn postgres_connect(database: &str, user: &str, password: &str) -> Self {
        Self::new("connect").arg(database).arg(user).arg(password)
    }

    /// Returns the full argv, program first.
    #[must_use]
    pub fn argv(&self) -> Vec<String> {
        let mut argv = Vec::with_capacity(self.args.len() + 1);
        argv.push(self.program.clone());
        argv.extend(self.args.iter().cloned());
        argv
    }

    /// Renders the command as a single shell line with every argument
    /// quoted.
    ///
    /// Only for transports (and logs) that need a flat string; the framed
    /// transport sends the argv as-is.
    #[must_use]
    pub fn render(&self) -> String {
        self.argv()
            .iter()
            .map(|arg| shell_quote(arg))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Quotes one argument for a POSIX shell.
fn shell_quote(arg: &str) -> String {
    let safe = !arg.is_empty()
        && arg
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"_@%+=:,./-".contains(&b));
    if safe {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', "'\\''"))
    }
}

/// Everything the session transport needs to run one interactive session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionParams {
    /// The leader's session endpoint.
    pub target: SocketAddr,
    /// The remote command to run.
    pub command: SessionCommand,
    /// Local terminal type, if known.
    pub term: Option<String>,
}

/// Header frame sent once at session start.
#[derive(Debug, Serialize, Deserialize)]
struct SessionHello {
    command: Vec<String>,
    term: Option<String>,
}

/// Remote session transport.
///
/// Runs the interactive session and resolves with the remote command's
/// exit status once the session ends.
pub trait SessionTransport: Send + Sync {
    /// Runs one interactive session.
    fn connect(&self, params: &SessionParams) -> impl Future<Output = Result<i32>> + Send;
}

/// Session transport over the tunnel dialer using the framed shell
/// protocol.
#[derive(Debug, Clone)]
pub struct FramedShellTransport<D> {
    dialer: D,
}

impl<D: Dial> FramedShellTransport<D> {
    /// Creates a transport over the given dialer.
    #[must_use]
    pub fn new(dialer: D) -> Self {
        Self { dialer }
    }
}

impl<D: Dial> SessionTransport for FramedShellTransport<D> {
    fn connect(&self, params: &SessionParams) -> impl Future<Output = Result<i32>> + Send {
        async move {
            let stream = self.dialer.dial(params.target).await?;
            run_session(
                stream,
                params,
                tokio::io::stdin(),
                tokio::io::stdout(),
                tokio::io::stderr(),
            )
            .await
        }
    }
}

/// Drives one framed session to completion.
///
/// Generic over the stream and the stdio endpoints so the protocol can be
/// exercised without a terminal.
async fn run_session<T, R, W, E>(
    stream: T,
    params: &SessionParams,
    mut stdin: R,
    mut stdout: W,
    mut stderr: E,
) -> Result<i32>
where
    T: AsyncRead + AsyncWrite + Unpin,
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    E: AsyncWrite + Unpin,
{
    let mut framed = Framed::new(stream, LengthDelimitedCodec::new());

    let hello = SessionHello {
        command: params.command.argv(),
        term: params.term.clone(),
    };
    let header = serde_json::to_vec(&hello)
        .map_err(|e| TunnelError::session(format!("could not encode session header: {e}")))?;
    framed
        .send(Bytes::from(header))
        .await
        .map_err(|e| TunnelError::session(format!("could not send session header: {e}")))?;

    let mut input = [0u8; 4096];
    let mut input_open = true;
    loop {
        tokio::select! {
            frame = framed.next() => {
                let Some(frame) = frame else {
                    // Remote closed without an exit frame; treat as a clean
                    // end of session.
                    return Ok(0);
                };
                let frame =
                    frame.map_err(|e| TunnelError::session(format!("transport error: {e}")))?;
                match frame.first().copied() {
                    Some(FRAME_STDOUT) => {
                        stdout.write_all(&frame[1..]).await?;
                        stdout.flush().await?;
                    }
                    Some(FRAME_STDERR) => {
                        stderr.write_all(&frame[1..]).await?;
                        stderr.flush().await?;
                    }
                    Some(FRAME_EXIT) => return decode_exit(&frame[1..]),
                    Some(tag) => {
                        return Err(TunnelError::session(format!(
                            "unexpected frame tag {tag:#04x}"
                        )));
                    }
                    None => return Err(TunnelError::session("empty frame")),
                }
            }
            read = stdin.read(&mut input), if input_open => {
                let n = read?;
                let mut frame = BytesMut::with_capacity(n + 1);
                frame.put_u8(FRAME_STDIN);
                if n == 0 {
                    // A zero-length stdin frame signals local EOF; keep the
                    // session open for remote output.
                    input_open = false;
                } else {
                    frame.put_slice(&input[..n]);
                }
                framed
                    .send(frame.freeze())
                    .await
                    .map_err(|e| TunnelError::session(format!("could not forward stdin: {e}")))?;
            }
        }
    }
}

fn decode_exit(payload: &[u8]) -> Result<i32> {
    let bytes: [u8; 4] = payload
        .try_into()
        .map_err(|_| TunnelError::session("malformed exit frame"))?;
    Ok(i32::from_be_bytes(bytes))
}

/// Opens the interactive session to the leader and blocks until it ends.
///
/// # Errors
///
/// Propagates transport errors; a non-zero remote exit status surfaces as
/// [`TunnelError::SessionExit`] so the caller can mirror it in the process
/// exit code.
pub async fn launch_session<T: SessionTransport>(
    transport: &T,
    leader: IpAddr,
    port: u16,
    command: SessionCommand,
) -> Result<()> {
    let params = SessionParams {
        target: SocketAddr::new(leader, port),
        command,
        term: std::env::var("TERM").ok(),
    };
    match transport.connect(&params).await? {
        0 => Ok(()),
        code => Err(TunnelError::session_exit(code)),
    }
}

/// Scripted session transport for tests.
#[derive(Debug, Default)]
pub struct FakeSessionTransport {
    exit_codes: Mutex<VecDeque<i32>>,
    failure: Option<String>,
    sessions: Mutex<Vec<SessionParams>>,
}

impl FakeSessionTransport {
    /// Creates a transport whose sessions exit with status 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the exit status of the next session.
    #[must_use]
    pub fn with_exit_code(self, code: i32) -> Self {
        if let Ok(mut codes) = self.exit_codes.lock() {
            codes.push_back(code);
        }
        self
    }

    /// Makes every session fail before starting.
    #[must_use]
    pub fn with_failure(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// Returns the parameters of every session run so far.
    #[must_use]
    pub fn sessions(&self) -> Vec<SessionParams> {
        self.sessions
            .lock()
            .map(|sessions| sessions.clone())
            .unwrap_or_default()
    }
}

impl SessionTransport for FakeSessionTransport {
    fn connect(&self, params: &SessionParams) -> impl Future<Output = Result<i32>> + Send {
        if let Ok(mut sessions) = self.sessions.lock() {
            sessions.push(params.clone());
        }
        let result = match &self.failure {
            Some(message) => Err(TunnelError::session(message.clone())),
            None => Ok(self
                .exit_codes
                .lock()
                .ok()
                .and_then(|mut codes| codes.pop_front())
                .unwrap_or(0)),
        };
        async move { result }
    }
}

//! SSH front door.
//!
//! Any password is accepted; the login name becomes the player's name. Each connection gets
//! one session channel. Keystrokes go through a [`LineEditor`] (the client's pty expects the
//! server to echo), finished lines are piped into the same [`LineReader`] the telnet side
//! uses, and the session's output is piped back out as channel data.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use maoxian::world::SharedWorld;
use mudio::edit::LineEditor;
use mudio::line::LineReader;
use russh::server::{self, Auth, Msg, Session};
use russh::{Channel, ChannelId, CryptoVec, MethodSet, Pty};
use russh_keys::key::KeyPair;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

/// Host key location, relative to the working directory.
pub const HOST_KEY_PATH: &str = "tmp/id_rsa";

const PIPE_CAPACITY: usize = 4096;

pub fn load_host_key(path: &Path) -> anyhow::Result<KeyPair> {
    let pem = std::fs::read_to_string(path).with_context(|| {
        format!(
            "read host key {} (create one with `ssh-keygen -t ed25519 -N '' -f {}`)",
            path.display(),
            path.display()
        )
    })?;
    russh_keys::decode_secret_key(&pem, None)
        .with_context(|| format!("parse host key {}", path.display()))
}

pub fn server_config(key: KeyPair) -> Arc<server::Config> {
    Arc::new(server::Config {
        methods: MethodSet::PASSWORD,
        auth_rejection_time: Duration::from_secs(1),
        auth_rejection_time_initial: Some(Duration::ZERO),
        keys: vec![key],
        ..Default::default()
    })
}

pub async fn serve(listener: TcpListener, config: Arc<server::Config>, world: SharedWorld) {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(v) => v,
            Err(e) => {
                warn!(err = %e, "ssh accept failed");
                continue;
            }
        };
        if let Err(e) = stream.set_nodelay(true) {
            debug!(peer = %peer, err = %e, "set_nodelay failed");
        }
        let config = config.clone();
        let conn = SshConn::new(peer, world.clone());
        tokio::spawn(async move {
            let res = async {
                let running = server::run_stream(config, stream, conn).await?;
                running.await
            }
            .await;
            if let Err(e) = res {
                warn!(peer = %peer, err = %e, "ssh connection ended with error");
            }
        });
    }
}

struct SshConn {
    peer: SocketAddr,
    world: SharedWorld,
    user: Option<String>,
    channel: Option<ChannelId>,
    editor: LineEditor,
    // Write end of the pipe the session reads lines from. Dropping it ends the session.
    input: Option<DuplexStream>,
}

impl SshConn {
    fn new(peer: SocketAddr, world: SharedWorld) -> Self {
        Self {
            peer,
            world,
            user: None,
            channel: None,
            editor: LineEditor::new(),
            input: None,
        }
    }

    fn login(&mut self, user: &str) -> bool {
        let name = crate::sanitize_name(user);
        if name.is_empty() {
            return false;
        }
        self.user = Some(name);
        true
    }

    /// Start the game session for `name`; returns the pipe its output comes out of.
    fn start(&mut self, name: String) -> DuplexStream {
        let (input_wr, input_rd) = tokio::io::duplex(PIPE_CAPACITY);
        let (out_wr, out_rd) = tokio::io::duplex(PIPE_CAPACITY);
        self.input = Some(input_wr);

        let world = self.world.clone();
        let peer = self.peer;
        tokio::spawn(async move {
            let lines = LineReader::new(input_rd);
            if let Err(e) = maoxian::session::run(world, name.clone(), peer, lines, out_wr).await {
                warn!(peer = %peer, user = %name, err = %e, "session ended with error");
            }
        });
        out_rd
    }

    /// Run keystrokes through the editor and pass finished lines to the session. Returns
    /// what to echo.
    async fn keystrokes(&mut self, keys: &[u8]) -> Vec<u8> {
        let edit = self.editor.feed(keys);
        if let Some(input) = self.input.as_mut() {
            if !edit.lines.is_empty() && input.write_all(&edit.lines).await.is_err() {
                self.input = None;
            }
        }
        if edit.hangup {
            self.input = None;
        }
        edit.echo
    }
}

#[async_trait]
impl server::Handler for SshConn {
    type Error = anyhow::Error;

    async fn auth_password(&mut self, user: &str, _password: &str) -> Result<Auth, Self::Error> {
        if self.login(user) {
            Ok(Auth::Accept)
        } else {
            info!(peer = %self.peer, "ssh login with unusable name");
            Ok(Auth::Reject {
                proceed_with_methods: None,
            })
        }
    }

    async fn channel_open_session(
        &mut self,
        channel: Channel<Msg>,
        _session: &mut Session,
    ) -> Result<bool, Self::Error> {
        if self.channel.is_some() {
            return Ok(false);
        }
        self.channel = Some(channel.id());
        Ok(true)
    }

    #[allow(clippy::too_many_arguments)]
    async fn pty_request(
        &mut self,
        channel: ChannelId,
        _term: &str,
        _col_width: u32,
        _row_height: u32,
        _pix_width: u32,
        _pix_height: u32,
        _modes: &[(Pty, u32)],
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        session.channel_success(channel);
        Ok(())
    }

    async fn shell_request(
        &mut self,
        channel: ChannelId,
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        let name = match &self.user {
            Some(name) if self.channel == Some(channel) && self.input.is_none() => name.clone(),
            _ => {
                session.channel_failure(channel);
                return Ok(());
            }
        };
        session.channel_success(channel);

        let out = self.start(name);
        tokio::spawn(forward_output(out, session.handle(), channel));
        Ok(())
    }

    async fn data(
        &mut self,
        channel: ChannelId,
        data: &[u8],
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        if self.channel != Some(channel) {
            return Ok(());
        }
        let echo = self.keystrokes(data).await;
        if !echo.is_empty() {
            session.data(channel, CryptoVec::from_slice(&echo));
        }
        Ok(())
    }

    async fn channel_eof(
        &mut self,
        _channel: ChannelId,
        _session: &mut Session,
    ) -> Result<(), Self::Error> {
        self.input = None;
        Ok(())
    }

    async fn channel_close(
        &mut self,
        _channel: ChannelId,
        _session: &mut Session,
    ) -> Result<(), Self::Error> {
        self.input = None;
        Ok(())
    }
}

/// Copy session output to the channel, then close it so the client exits.
async fn forward_output(mut out: DuplexStream, handle: server::Handle, channel: ChannelId) {
    let mut buf = vec![0u8; PIPE_CAPACITY];
    loop {
        let n = match out.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        if handle
            .data(channel, CryptoVec::from_slice(&buf[..n]))
            .await
            .is_err()
        {
            return;
        }
    }
    if handle.eof(channel).await.is_err() || handle.close(channel).await.is_err() {
        debug!("ssh channel already closed");
    }
}

//! Plain TCP front door for telnet clients. Off unless `MAOXIAN_TELNET_PORT` is set.

use std::net::SocketAddr;

use maoxian::world::SharedWorld;
use mudio::line::LineReader;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

const NAME_PROMPT: &[u8] = b"By what name are you known? ";
const NAME_ATTEMPTS: usize = 3;

pub async fn serve(listener: TcpListener, world: SharedWorld) {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(v) => v,
            Err(e) => {
                warn!(err = %e, "telnet accept failed");
                continue;
            }
        };
        let world = world.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_conn(stream, peer, world).await {
                warn!(peer = %peer, err = %e, "connection ended with error");
            }
        });
    }
}

async fn handle_conn(
    stream: TcpStream,
    peer: SocketAddr,
    world: SharedWorld,
) -> anyhow::Result<()> {
    if let Err(e) = stream.set_nodelay(true) {
        debug!(peer = %peer, err = %e, "set_nodelay failed");
    }
    let (rd, mut wr) = stream.into_split();
    let mut lines = LineReader::new(rd);

    let Some(name) = ask_name(&mut lines, &mut wr).await? else {
        info!(peer = %peer, "left before naming");
        return Ok(());
    };
    maoxian::session::run(world, name, peer, lines, wr).await
}

/// Prompt until the peer offers a usable name. `None` if they hang up or never do.
async fn ask_name<R, W>(lines: &mut LineReader<R>, wr: &mut W) -> anyhow::Result<Option<String>>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    for _ in 0..NAME_ATTEMPTS {
        wr.write_all(NAME_PROMPT).await?;
        let line = lines.read_line().await?;
        let replies = lines.take_replies();
        if !replies.is_empty() {
            wr.write_all(&replies).await?;
        }
        let Some(line) = line else {
            return Ok(None);
        };
        let name = crate::sanitize_name(&line);
        if !name.is_empty() {
            return Ok(Some(name));
        }
        wr.write_all(b"Names use letters, digits, '_' and '-'.\r\n").await?;
    }
    wr.write_all(b"Goodbye.\r\n").await?;
    Ok(None)
}

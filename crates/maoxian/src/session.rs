//! One connected player, from arrival to departure.
//!
//! The input loop reads a line, runs it with the world locked, and queues the reply on the
//! player's own mailbox. A delivery task owns the output side and writes out everything
//! that lands in that mailbox, whether it came from this player or from someone else.

use std::net::SocketAddr;

use mudio::crlf;
use mudio::line::LineReader;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::command;
use crate::mailbox::{self, Delivery, Inbox, Mailbox};
use crate::player::PlayerId;
use crate::world::SharedWorld;

/// Run a session for `name` until the peer goes away or quits.
///
/// The player is in the world for exactly the duration of this call. A read error is
/// returned after the player has been taken out of the world.
pub async fn run<R, W>(
    world: SharedWorld,
    name: String,
    peer: SocketAddr,
    mut lines: LineReader<R>,
    out: W,
) -> anyhow::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (mailbox, inbox) = mailbox::mailbox();
    let (raw_tx, raw_rx) = mpsc::channel::<Vec<u8>>(8);
    let delivery = tokio::spawn(deliver(inbox, raw_rx, out));

    // The welcome is queued before the lock is released, so nothing another player does can
    // reach this mailbox ahead of it. A fresh queue always has room.
    let id = {
        let mut w = world.lock().await;
        let id = w.join(&name, mailbox.clone());
        let greeting = welcome(&name, &w.render_room(id));
        if mailbox.notify(greeting) != Delivery::Queued {
            debug!(peer = %peer, user = %name, "welcome not queued");
        }
        id
    };
    info!(peer = %peer, user = %name, player = %id, "connected");

    let res = input_loop(&world, id, &name, peer, &mut lines, &mailbox, &raw_tx).await;

    drop(world.lock().await.leave(id));
    match &res {
        Ok(()) => info!(peer = %peer, user = %name, "disconnected"),
        Err(e) => info!(peer = %peer, user = %name, err = %e, "disconnected"),
    }

    // The delivery task stops once the last mailbox handle is gone and the queue is empty.
    drop(mailbox);
    drop(raw_tx);
    match delivery.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!(peer = %peer, user = %name, err = %e, "output closed early"),
        Err(e) => debug!(peer = %peer, user = %name, err = %e, "delivery task failed"),
    }
    res
}

async fn input_loop<R: AsyncRead + Unpin>(
    world: &SharedWorld,
    id: PlayerId,
    name: &str,
    peer: SocketAddr,
    lines: &mut LineReader<R>,
    mailbox: &Mailbox,
    raw_tx: &mpsc::Sender<Vec<u8>>,
) -> anyhow::Result<()> {
    while let Some(line) = lines.read_line().await? {
        let replies = lines.take_replies();
        if !replies.is_empty() && raw_tx.send(replies).await.is_err() {
            break;
        }

        info!(peer = %peer, user = %name, line = %line, "ran command");
        let outcome = {
            let mut w = world.lock().await;
            command::execute(&mut w, id, &line)
        };
        let Some(outcome) = outcome else {
            continue;
        };

        if !mailbox.send(frame_reply(&outcome.reply)).await || outcome.quit {
            break;
        }
    }
    Ok(())
}

/// Command output sits between blank lines. A command with nothing to say still leaves
/// exactly one blank line.
fn frame_reply(reply: &str) -> String {
    let reply = reply.trim_end_matches('\n');
    if reply.is_empty() {
        "\n".to_string()
    } else {
        format!("\n{reply}\n")
    }
}

fn welcome(name: &str, view: &str) -> String {
    format!(
        "Welcome {name}!\n\n\
You have just entered the world of Maoxian, a multiplayer text adventure.\n\
Type `help` (followed by enter) to see what basic commands you can perform.\n\n\
{}",
        view.trim_end_matches('\n')
    )
}

async fn deliver<W: AsyncWrite + Unpin>(
    mut inbox: Inbox,
    mut raw: mpsc::Receiver<Vec<u8>>,
    mut out: W,
) -> std::io::Result<()> {
    loop {
        tokio::select! {
            msg = inbox.recv() => {
                let Some(msg) = msg else {
                    break;
                };
                let mut text = crlf(&msg);
                text.push_str("\r\n");
                out.write_all(text.as_bytes()).await?;
            }
            Some(b) = raw.recv() => out.write_all(&b).await?,
        }
    }
    out.flush().await?;
    out.shutdown().await
}

#[cfg(test)]
mod tests {
    use super::{frame_reply, welcome};

    #[test]
    fn welcome_ends_with_the_room() {
        let s = welcome("alice", "A snug cabin.\n");
        assert!(s.starts_with("Welcome alice!\n\n"));
        assert!(s.ends_with("Type `help` (followed by enter) to see what basic commands you can perform.\n\nA snug cabin."));
    }

    #[test]
    fn silent_commands_leave_a_single_blank_line() {
        assert_eq!(frame_reply(""), "\n");
        assert_eq!(frame_reply("\n"), "\n");
        assert_eq!(frame_reply("You are alice"), "\nYou are alice\n");
        assert_eq!(frame_reply("Moved to field.\nA field.\n"), "\nMoved to field.\nA field.\n");
    }
}

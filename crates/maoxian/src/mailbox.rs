//! Per-player outbound queue.
//!
//! Other sessions enqueue notices with [`Mailbox::notify`] while they hold the world lock,
//! so it never waits: when the queue is full the newest notice is dropped and the caller
//! logs it. The owning session sends its own command output with [`Mailbox::send`] after
//! releasing the lock; that path waits for room instead of dropping.
//!
//! The queue closes once every [`Mailbox`] handle is gone. The delivery task then drains
//! what is left and stops.

use tokio::sync::mpsc;

pub const MAILBOX_CAPACITY: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Queued,
    Full,
    Closed,
}

#[derive(Debug, Clone)]
pub struct Mailbox {
    tx: mpsc::Sender<String>,
}

#[derive(Debug)]
pub struct Inbox {
    rx: mpsc::Receiver<String>,
}

pub fn mailbox() -> (Mailbox, Inbox) {
    let (tx, rx) = mpsc::channel(MAILBOX_CAPACITY);
    (Mailbox { tx }, Inbox { rx })
}

impl Mailbox {
    pub fn notify(&self, msg: impl Into<String>) -> Delivery {
        match self.tx.try_send(msg.into()) {
            Ok(()) => Delivery::Queued,
            Err(mpsc::error::TrySendError::Full(_)) => Delivery::Full,
            Err(mpsc::error::TrySendError::Closed(_)) => Delivery::Closed,
        }
    }

    /// Returns false once the delivery side is gone.
    pub async fn send(&self, msg: impl Into<String>) -> bool {
        self.tx.send(msg.into()).await.is_ok()
    }
}

impl Inbox {
    pub async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    /// Everything queued right now, without waiting.
    pub fn drain(&mut self) -> Vec<String> {
        let mut out = Vec::new();
        while let Ok(msg) = self.rx.try_recv() {
            out.push(msg);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overflow_drops_newest() {
        let (mb, mut inbox) = mailbox();
        for i in 0..MAILBOX_CAPACITY {
            assert_eq!(mb.notify(format!("m{i}")), Delivery::Queued);
        }
        assert_eq!(mb.notify("late"), Delivery::Full);

        let got = inbox.drain();
        assert_eq!(got.len(), MAILBOX_CAPACITY);
        assert_eq!(got.first().map(String::as_str), Some("m0"));
        assert_eq!(got.last().map(String::as_str), Some("m99"));
    }

    #[test]
    fn closed_after_inbox_dropped() {
        let (mb, inbox) = mailbox();
        drop(inbox);
        assert_eq!(mb.notify("x"), Delivery::Closed);
    }

    #[tokio::test]
    async fn recv_ends_when_every_handle_is_gone() {
        let (mb, mut inbox) = mailbox();
        let other = mb.clone();
        assert!(mb.send("a").await);
        drop(mb);
        other.notify("b");
        drop(other);

        assert_eq!(inbox.recv().await.as_deref(), Some("a"));
        assert_eq!(inbox.recv().await.as_deref(), Some("b"));
        assert_eq!(inbox.recv().await, None);
    }
}

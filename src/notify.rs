//! User-facing notices.
//!
//! Every controller outcome worth telling the user about is published as a
//! `Notice` on a `watch` channel. A view layer renders the latest value; the
//! controller keeps no history.

use tokio::sync::watch;

use crate::error::ControllerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    /// Error code for error notices (`E_VALIDATION`, `E_SERVER`, ...).
    pub code: Option<&'static str>,
}

impl Notice {
    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Info, message: message.into(), code: None }
    }

    #[must_use]
    pub fn error(err: &ControllerError) -> Self {
        Self { level: NoticeLevel::Error, message: err.to_string(), code: Some(err.code()) }
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.level == NoticeLevel::Error
    }
}

/// Publishing side of the notice channel.
#[derive(Debug)]
pub struct Notifier {
    tx: watch::Sender<Option<Notice>>,
}

impl Notifier {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// Publish a notice. Having no subscribers is fine.
    pub fn publish(&self, notice: Notice) {
        self.tx.send_replace(Some(notice));
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<Notice>> {
        self.tx.subscribe()
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

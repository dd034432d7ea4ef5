//! Per-channel pairing of history and copypasta detection.
//!
//! A [`Channel`] owns one [`EventLedger`] and one [`DuplicateWindow`].
//! [`Channels`] hands out shared handles by name so that ingestion,
//! dashboards and moderation for one channel never wait on another.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::config::{ChannelConfig, ProjectConfig};
use crate::error::{Error, NotCopypasta};
use crate::ledger::{EventLedger, Records};
use crate::message::Message;
use crate::window::DuplicateWindow;

/// Outcome of feeding one message through a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ingested {
    /// Stored in history only; learning is off.
    Ignored,
    /// Stored in history and counted, not copypasta.
    Recorded,
    /// Stored in history and newly recognized as copypasta.
    Flagged,
}

impl Ingested {
    #[must_use]
    pub const fn is_flagged(self) -> bool {
        matches!(self, Self::Flagged)
    }
}

/// State kept for one chat channel.
#[derive(Debug)]
pub struct Channel {
    name: String,
    history: EventLedger<String>,
    memes: DuplicateWindow,
    learning: AtomicBool,
}

impl Channel {
    #[must_use]
    pub fn new(name: impl Into<String>, config: &ChannelConfig) -> Self {
        Self {
            name: name.into(),
            history: EventLedger::new(),
            memes: DuplicateWindow::new(config.need, config.within),
            learning: AtomicBool::new(config.learn),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Store `msg` in history and, while learning, check it for copypasta.
    pub fn ingest(&self, msg: &Message) -> Ingested {
        self.history
            .add(msg.at, msg.id.as_str(), msg.sender.as_str(), msg.text.clone());

        if !self.is_learning() {
            trace!(channel = %self.name, id = %msg.id, "ingested without learning");
            return Ingested::Ignored;
        }

        match self.memes.check(msg.at, &msg.sender, &msg.text) {
            Ok(()) => {
                info!(channel = %self.name, id = %msg.id, sender = %msg.sender, "copypasta");
                Ingested::Flagged
            }
            Err(NotCopypasta) => Ingested::Recorded,
        }
    }

    /// Suppress `text` without waiting for it to reach the threshold.
    pub fn block(&self, at: DateTime<Utc>, text: &str) {
        debug!(channel = %self.name, "moderator block");
        self.memes.block(at, text);
    }

    /// Oldest-to-newest traversal of recent messages.
    #[must_use]
    pub fn history(&self) -> Records<'_, String> {
        self.history.all()
    }

    #[must_use]
    pub const fn detector(&self) -> &DuplicateWindow {
        &self.memes
    }

    pub fn set_learning(&self, learning: bool) {
        self.learning.store(learning, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_learning(&self) -> bool {
        self.learning.load(Ordering::Relaxed)
    }
}

/// Registry of channels keyed by name.
///
/// The registry lock is held only to look up or insert a handle; all
/// per-message work happens on the returned [`Arc<Channel>`].
#[derive(Debug, Default)]
pub struct Channels {
    config: ProjectConfig,
    channels: RwLock<HashMap<String, Arc<Channel>>>,
}

impl Channels {
    #[must_use]
    pub fn new(config: ProjectConfig) -> Self {
        Self {
            config,
            channels: RwLock::new(HashMap::new()),
        }
    }

    #[must_use]
    pub const fn config(&self) -> &ProjectConfig {
        &self.config
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<Channel>> {
        self.channels
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Return the channel named `name`, creating it from config if needed.
    ///
    /// # Errors
    ///
    /// Fails when the channel's configured threshold or window is invalid.
    pub fn get_or_insert(&self, name: &str) -> Result<Arc<Channel>, Error> {
        if let Some(channel) = self.get(name) {
            return Ok(channel);
        }

        let settings = self.config.channel(name)?;
        let mut channels = self.channels.write().unwrap_or_else(PoisonError::into_inner);
        let channel = channels
            .entry(name.to_string())
            .or_insert_with(|| {
                debug!(channel = name, need = settings.need, "channel created");
                Arc::new(Channel::new(name, &settings))
            })
            .clone();
        Ok(channel)
    }

    /// Names of all known channels, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .channels
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort_unstable();
        names
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.channels
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

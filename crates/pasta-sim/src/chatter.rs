use serde::{Deserialize, Serialize};

use crate::rng::DeterministicRng;

/// Stable identifier for a simulated chatter.
pub type ChatterId = usize;

/// How a chatter decides what to say.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Temper {
    /// Picks lines from the shared vocabulary.
    Casual,
    /// Copies whatever was said most recently.
    Echo,
    /// Says the same catchphrase every time.
    Parrot,
}

/// A simulated chat participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chatter {
    id: ChatterId,
    temper: Temper,
    catchphrase: String,
    rng: DeterministicRng,
    sent: u64,
}

impl Chatter {
    #[must_use]
    pub fn new(id: ChatterId, temper: Temper, rng: DeterministicRng) -> Self {
        Self {
            id,
            temper,
            catchphrase: format!("catchphrase of chatter {id}"),
            rng,
            sent: 0,
        }
    }

    #[must_use]
    pub const fn id(&self) -> ChatterId {
        self.id
    }

    #[must_use]
    pub const fn temper(&self) -> Temper {
        self.temper
    }

    #[must_use]
    pub fn name(&self) -> String {
        format!("chatter{}", self.id)
    }

    /// Whether the chatter speaks this round.
    pub fn speaks(&mut self, talk_percent: u8) -> bool {
        self.rng.percent(talk_percent)
    }

    /// Compose the next message text and its identifier.
    pub fn compose(&mut self, vocabulary: &[String], last_said: Option<&str>) -> (String, String) {
        let text = match (self.temper, last_said) {
            (Temper::Echo, Some(last)) => last.to_string(),
            (Temper::Parrot, _) => self.catchphrase.clone(),
            _ => self
                .rng
                .pick(vocabulary)
                .cloned()
                .unwrap_or_else(|| self.catchphrase.clone()),
        };
        let id = format!("{}-{}", self.name(), self.sent);
        self.sent = self.sent.saturating_add(1);
        (id, text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocab() -> Vec<String> {
        vec!["madoka".to_string(), "homura".to_string()]
    }

    #[test]
    fn parrot_repeats_itself() {
        let mut c = Chatter::new(3, Temper::Parrot, DeterministicRng::new(1));
        let (_, a) = c.compose(&vocab(), Some("sayaka"));
        let (_, b) = c.compose(&vocab(), None);
        assert_eq!(a, b);
    }

    #[test]
    fn echo_copies_last_line() {
        let mut c = Chatter::new(0, Temper::Echo, DeterministicRng::new(1));
        assert_eq!(c.compose(&vocab(), Some("sayaka")).1, "sayaka");
    }

    #[test]
    fn casual_uses_vocabulary_and_ids_are_unique() {
        let mut c = Chatter::new(1, Temper::Casual, DeterministicRng::new(1));
        let (id_a, text) = c.compose(&vocab(), Some("sayaka"));
        let (id_b, _) = c.compose(&vocab(), None);
        assert!(vocab().contains(&text));
        assert_ne!(id_a, id_b);
    }
}

//! Short-term conversation memory
//!
//! A rolling transcript of the latest turns per user, stored under
//! `mem:<uid>` as newline-separated `User: ...` / `AI: ...` lines. It only
//! gives the next prompt some continuity; it is not chat history.

use std::sync::Arc;
use std::time::Duration;

use crate::config::settings::MemorySettings;
use crate::store::{KvStore, StoreError};

/// Anonymous users share this uid and never get memory
pub const GUEST_UID: &str = "guest";

pub struct ShortTermMemory {
    store: Arc<dyn KvStore>,
    max_lines: usize,
    ttl: Duration,
}

impl ShortTermMemory {
    pub fn new(store: Arc<dyn KvStore>, settings: &MemorySettings) -> Self {
        Self {
            store,
            max_lines: settings.max_lines,
            ttl: settings.ttl(),
        }
    }

    fn key(uid: &str) -> String {
        format!("mem:{}", uid)
    }

    /// Load the transcript for `uid`, empty when there is none
    pub async fn load(&self, uid: &str) -> Result<String, StoreError> {
        if uid == GUEST_UID {
            return Ok(String::new());
        }
        Ok(self.store.get(&Self::key(uid)).await?.unwrap_or_default())
    }

    /// Append one exchange to `prior` and store the trimmed result.
    ///
    /// Read-modify-write without a lock: concurrent requests for the same
    /// uid race and the last write wins.
    pub async fn remember(
        &self,
        uid: &str,
        prior: &str,
        message: &str,
        reply: &str,
    ) -> Result<(), StoreError> {
        if uid == GUEST_UID {
            return Ok(());
        }
        let updated = append_exchange(prior, message, reply, self.max_lines);
        self.store.put(&Self::key(uid), &updated, self.ttl).await
    }
}

/// Collapse a turn onto one line so each stored line is one `User:`/`AI:` turn
fn single_line(text: &str) -> String {
    text.split(['\r', '\n'])
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Append `User:`/`AI:` lines to a transcript and keep only the newest
/// `max_lines` lines
pub fn append_exchange(prior: &str, message: &str, reply: &str, max_lines: usize) -> String {
    let combined = format!(
        "{}\nUser: {}\nAI: {}",
        prior,
        single_line(message),
        single_line(reply)
    );

    let lines: Vec<&str> = combined.split('\n').collect();
    if lines.len() <= max_lines {
        return combined;
    }

    lines[lines.len() - max_lines..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryKvStore;

    fn memory(store: Arc<dyn KvStore>) -> ShortTermMemory {
        ShortTermMemory::new(store, &MemorySettings::default())
    }

    #[test]
    fn test_append_to_empty() {
        let out = append_exchange("", "Explain photosynthesis", "Photosynthesis is...", 20);
        assert_eq!(out, "\nUser: Explain photosynthesis\nAI: Photosynthesis is...");
    }

    #[test]
    fn test_trim_keeps_newest_lines() {
        let mut transcript = String::new();
        for i in 0..15 {
            transcript = append_exchange(&transcript, &format!("q{}", i), &format!("a{}", i), 20);
        }

        let lines: Vec<&str> = transcript.split('\n').collect();
        assert_eq!(lines.len(), 20);
        assert_eq!(lines[0], "User: q5");
        assert_eq!(lines[19], "AI: a14");
        assert!(!transcript.contains("q4"));
    }

    #[test]
    fn test_multi_line_turns_stay_on_one_line() {
        let reply = (1..=25)
            .map(|i| format!("- point {}", i))
            .collect::<Vec<_>>()
            .join("\n");

        let out = append_exchange("", "List points\r\nplease", &reply, 20);
        assert_eq!(
            out,
            format!(
                "\nUser: List points please\nAI: {}",
                reply.replace('\n', " ")
            )
        );
        assert!(out
            .split('\n')
            .filter(|l| !l.is_empty())
            .all(|l| l.starts_with("User: ") || l.starts_with("AI: ")));
    }

    #[tokio::test]
    async fn test_round_trip() {
        let store: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
        let memory = memory(store.clone());

        assert_eq!(memory.load("u1").await.unwrap(), "");

        memory.remember("u1", "", "hi", "hello").await.unwrap();
        let prior = memory.load("u1").await.unwrap();
        assert_eq!(prior, "\nUser: hi\nAI: hello");

        memory.remember("u1", &prior, "and?", "more").await.unwrap();
        assert_eq!(
            store.get("mem:u1").await.unwrap().as_deref(),
            Some("\nUser: hi\nAI: hello\nUser: and?\nAI: more")
        );
    }

    #[tokio::test]
    async fn test_guest_is_never_stored() {
        let store: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
        store
            .put("mem:guest", "User: leaked", Duration::from_secs(60))
            .await
            .unwrap();
        let memory = memory(store.clone());

        assert_eq!(memory.load(GUEST_UID).await.unwrap(), "");
        memory.remember(GUEST_UID, "", "hi", "hello").await.unwrap();
        assert_eq!(
            store.get("mem:guest").await.unwrap().as_deref(),
            Some("User: leaked")
        );
    }
}

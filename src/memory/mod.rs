//! Conversation memory.
//!
//! Maps a thread id to its transcript with a sliding time-to-live. Each
//! operation is an atomic read-modify-write per key; threads are
//! independent, and concurrent writers to the same thread are
//! last-write-wins by contract.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::llm::{ChatTurn, Transcript};

pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[async_trait]
pub trait ConversationMemory: Send + Sync {
    /// Transcript for the thread; empty if absent or expired.
    async fn get(&self, thread_id: &str) -> Transcript;

    /// Overwrite the transcript and reset the TTL.
    async fn save(&self, thread_id: &str, transcript: Transcript);

    /// Read-modify-write convenience; resets the TTL.
    async fn append(&self, thread_id: &str, turn: ChatTurn);

    /// Immediate eviction.
    async fn clear(&self, thread_id: &str);

    async fn exists(&self, thread_id: &str) -> bool;
}

struct Entry {
    transcript: Transcript,
    deadline: Instant,
}

/// In-process memory store with lazy eviction on read and an opportunistic
/// sweep on write.
pub struct InMemoryTtlMemory {
    entries: Mutex<HashMap<String, Entry>>,
    ttl: Duration,
}

impl InMemoryTtlMemory {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }
}

impl Default for InMemoryTtlMemory {
    fn default() -> Self {
        Self::new()
    }
}

fn sweep(entries: &mut HashMap<String, Entry>, now: Instant) {
    entries.retain(|_, entry| entry.deadline > now);
}

#[async_trait]
impl ConversationMemory for InMemoryTtlMemory {
    async fn get(&self, thread_id: &str) -> Transcript {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        match entries.get(thread_id) {
            Some(entry) if entry.deadline > now => entry.transcript.clone(),
            Some(_) => {
                entries.remove(thread_id);
                Vec::new()
            }
            None => Vec::new(),
        }
    }

    async fn save(&self, thread_id: &str, transcript: Transcript) {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        sweep(&mut entries, now);
        entries.insert(
            thread_id.to_string(),
            Entry {
                transcript,
                deadline: now + self.ttl,
            },
        );
    }

    async fn append(&self, thread_id: &str, turn: ChatTurn) {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        sweep(&mut entries, now);
        let entry = entries.entry(thread_id.to_string()).or_insert_with(|| Entry {
            transcript: Vec::new(),
            deadline: now + self.ttl,
        });
        entry.transcript.push(turn);
        entry.deadline = now + self.ttl;
    }

    async fn clear(&self, thread_id: &str) {
        self.entries.lock().await.remove(thread_id);
    }

    async fn exists(&self, thread_id: &str) -> bool {
        let entries = self.entries.lock().await;
        entries
            .get(thread_id)
            .map(|entry| entry.deadline > Instant::now())
            .unwrap_or(false)
    }
}

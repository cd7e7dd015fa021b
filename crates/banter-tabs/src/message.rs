//! Messages and the per-tab message log
//!
//! Every tab keeps its transcript in memory and mirrors it to a named cache
//! in local storage. Logs are append-only and come back in insertion order
//! on construction. Storage failures are logged and swallowed; the
//! in-memory transcript is the source of truth for the UI.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use banter_storage::Database;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
}

impl Sender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Sender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Sender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Sender::User),
            "assistant" => Ok(Sender::Assistant),
            _ => Err(format!("Unknown sender: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    Code,
    File,
    Image,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Text => "text",
            MessageKind::Code => "code",
            MessageKind::File => "file",
            MessageKind::Image => "image",
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for MessageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(MessageKind::Text),
            "code" => Ok(MessageKind::Code),
            "file" => Ok(MessageKind::File),
            "image" => Ok(MessageKind::Image),
            _ => Err(format!("Unknown message kind: {}", s)),
        }
    }
}

/// One transcript entry.
///
/// Ids are millisecond timestamps rendered as strings; they identify a
/// message for display purposes only and are not unique under rapid
/// appends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub content: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
    pub kind: MessageKind,
    /// Hosted URL for image messages
    pub image_url: Option<String>,
    /// Prompt that produced an image message
    pub prompt: Option<String>,
}

impl Message {
    pub fn new(content: impl Into<String>, sender: Sender) -> Self {
        let now = Utc::now();
        Self {
            id: now.timestamp_millis().to_string(),
            content: content.into(),
            sender,
            timestamp: now,
            kind: MessageKind::Text,
            image_url: None,
            prompt: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(content, Sender::User)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(content, Sender::Assistant)
    }

    pub fn with_kind(mut self, kind: MessageKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_image_url(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }
}

pub struct MessageLog {
    /// Cache name this log is mirrored under
    cache: &'static str,
    /// In-memory transcript
    messages: Arc<RwLock<Vec<Message>>>,
    db: Database,
}

impl MessageLog {
    /// Opens the named cache and restores its transcript. A failed restore
    /// starts the log empty rather than failing the tab.
    pub fn new(db: Database, cache: &'static str) -> Self {
        let messages = match Self::load(&db, cache) {
            Ok(messages) => messages,
            Err(e) => {
                tracing::error!(cache = cache, error = %e, "Failed to restore message log");
                Vec::new()
            }
        };

        tracing::debug!(cache = cache, count = messages.len(), "Restored message log");

        Self {
            cache,
            messages: Arc::new(RwLock::new(messages)),
            db,
        }
    }

    fn load(db: &Database, cache: &str) -> banter_storage::Result<Vec<Message>> {
        db.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, content, sender, kind, image_url, prompt, created_at
                 FROM messages WHERE cache = ?1 ORDER BY seq",
            )?;

            let messages: Vec<Message> = stmt
                .query_map([cache], |row| {
                    let sender_str: String = row.get(2)?;
                    let kind_str: String = row.get(3)?;
                    let created_str: String = row.get(6)?;

                    let sender: Sender = sender_str.parse().unwrap_or(Sender::Assistant);
                    let kind: MessageKind = kind_str.parse().unwrap_or(MessageKind::Text);
                    let timestamp = DateTime::parse_from_rfc3339(&created_str)
                        .map(|dt| dt.with_timezone(&Utc))
                        .unwrap_or_else(|_| Utc::now());

                    Ok(Message {
                        id: row.get(0)?,
                        content: row.get(1)?,
                        sender,
                        timestamp,
                        kind,
                        image_url: row.get(4)?,
                        prompt: row.get(5)?,
                    })
                })?
                .filter_map(|r| r.ok())
                .collect();

            Ok(messages)
        })
    }

    /// Appends to the transcript and mirrors the entry to storage.
    pub fn append(&self, message: Message) {
        if let Err(e) = self.persist(&message) {
            tracing::error!(cache = self.cache, error = %e, "Failed to persist message");
        }
        self.messages.write().push(message);
    }

    fn persist(&self, message: &Message) -> banter_storage::Result<()> {
        self.db.with_connection(|conn| {
            conn.execute(
                "INSERT INTO messages (id, cache, content, sender, kind, image_url, prompt, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![
                    message.id,
                    self.cache,
                    message.content,
                    message.sender.as_str(),
                    message.kind.as_str(),
                    message.image_url,
                    message.prompt,
                    message.timestamp.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
    }

    /// Snapshot of the transcript.
    pub fn messages(&self) -> Vec<Message> {
        self.messages.read().clone()
    }

    pub fn last(&self) -> Option<Message> {
        self.messages.read().last().cloned()
    }

    pub fn len(&self) -> usize {
        self.messages.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.read().is_empty()
    }
}

impl Clone for MessageLog {
    fn clone(&self) -> Self {
        Self {
            cache: self.cache,
            messages: Arc::clone(&self.messages),
            db: self.db.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_preserves_content_sender_timestamp() {
        let db = Database::open_in_memory().unwrap();

        let log = MessageLog::new(db.clone(), "roundtrip-cache");
        log.append(Message::user("hello"));
        log.append(Message::assistant("hi there"));
        let original = log.messages();

        let restored = MessageLog::new(db, "roundtrip-cache");
        let messages = restored.messages();

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, "hello");
        assert_eq!(messages[0].sender, Sender::User);
        assert_eq!(messages[1].content, "hi there");
        assert_eq!(messages[1].sender, Sender::Assistant);
        for (restored, original) in messages.iter().zip(original.iter()) {
            assert_eq!(
                restored.timestamp.timestamp(),
                original.timestamp.timestamp()
            );
        }
    }

    #[test]
    fn test_restore_preserves_insertion_order() {
        let db = Database::open_in_memory().unwrap();

        let log = MessageLog::new(db.clone(), "order-cache");
        for i in 0..5 {
            log.append(Message::user(format!("message {}", i)));
        }

        let restored = MessageLog::new(db, "order-cache");
        let contents: Vec<String> = restored
            .messages()
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(
            contents,
            vec![
                "message 0",
                "message 1",
                "message 2",
                "message 3",
                "message 4"
            ]
        );
    }

    #[test]
    fn test_image_fields_survive_restore() {
        let db = Database::open_in_memory().unwrap();

        let log = MessageLog::new(db.clone(), "image-cache");
        log.append(
            Message::assistant("Generated image for: a sunset")
                .with_kind(MessageKind::Image)
                .with_image_url("https://img.example/sunset.png")
                .with_prompt("a sunset"),
        );

        let restored = MessageLog::new(db, "image-cache");
        let message = restored.last().unwrap();
        assert_eq!(message.kind, MessageKind::Image);
        assert_eq!(
            message.image_url.as_deref(),
            Some("https://img.example/sunset.png")
        );
        assert_eq!(message.prompt.as_deref(), Some("a sunset"));
    }

    #[test]
    fn test_caches_are_isolated() {
        let db = Database::open_in_memory().unwrap();

        let chat = MessageLog::new(db.clone(), "cache-a");
        let image = MessageLog::new(db.clone(), "cache-b");
        chat.append(Message::user("chat message"));
        image.append(Message::user("image message"));

        assert_eq!(MessageLog::new(db.clone(), "cache-a").len(), 1);
        assert_eq!(
            MessageLog::new(db, "cache-b").last().unwrap().content,
            "image message"
        );
    }

    #[test]
    fn test_sender_and_kind_parse() {
        assert_eq!("user".parse::<Sender>().unwrap(), Sender::User);
        assert_eq!("assistant".parse::<Sender>().unwrap(), Sender::Assistant);
        assert!("robot".parse::<Sender>().is_err());

        assert_eq!("image".parse::<MessageKind>().unwrap(), MessageKind::Image);
        assert!("video".parse::<MessageKind>().is_err());
    }
}

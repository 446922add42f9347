//! Message ledger: the admin inbox of received form submissions.
//!
//! The whole inbox is one [`MessageLog`] document under
//! [`ContentKey::Messages`]. Every mutation is a read-modify-write of that
//! document without locking; concurrent writers race and the last write wins.
//!
//! Entries that no longer parse are carried through writes untouched. A
//! stored value that is not a list at all is never overwritten.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::pipeline::{Inquiry, InquiryKind};
use crate::store::content::{ContentDocument, ContentKey, ContentStore};

/// One received message as shown in the admin panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminMessage {
    pub id: String,
    pub name: String,
    pub email: String,
    pub message: String,
    pub received_at: DateTime<Utc>,
}

impl AdminMessage {
    /// A message received now, with a fresh id.
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            email: email.into(),
            message: message.into(),
            received_at: Utc::now(),
        }
    }

    /// Ledger entry for a form submission. Project inquiries fold their
    /// title, idea and AI suggestions into the message text.
    pub fn from_inquiry(inquiry: &Inquiry) -> Self {
        let message = match inquiry.kind {
            InquiryKind::GeneralContact => inquiry.message.clone(),
            InquiryKind::ProjectServiceInquiry => {
                let mut parts = Vec::new();
                if let Some(title) = inquiry.project_title() {
                    parts.push(format!("Project: {title}"));
                }
                parts.push(inquiry.idea_or_message().to_string());
                if let Some(ideas) = inquiry.ai_ideas() {
                    let list: Vec<String> = ideas.iter().map(|idea| format!("- {idea}")).collect();
                    parts.push(format!("AI suggested ideas:\n{}", list.join("\n")));
                }
                parts.join("\n\n")
            }
        };
        Self::new(inquiry.name.clone(), inquiry.email.clone(), message)
    }
}

/// The stored inbox, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageLog(pub Vec<AdminMessage>);

impl ContentDocument for MessageLog {
    const KEY: ContentKey = ContentKey::Messages;
}

/// The stored list, split into entries that parse and raw ones that don't.
#[derive(Debug, Default)]
struct StoredLog {
    messages: Vec<AdminMessage>,
    unreadable: Vec<Value>,
}

impl StoredLog {
    fn from_value(value: Value) -> Result<Self, DatabaseError> {
        let Value::Array(entries) = value else {
            return Err(DatabaseError::Serialization(format!(
                "stored {} is not a list",
                MessageLog::KEY
            )));
        };

        let mut log = Self::default();
        for entry in entries {
            match AdminMessage::deserialize(&entry) {
                Ok(message) => log.messages.push(message),
                Err(e) => {
                    warn!(error = %e, "Unreadable ledger entry kept as-is");
                    log.unreadable.push(entry);
                }
            }
        }
        log.sort();
        Ok(log)
    }

    fn sort(&mut self) {
        self.messages.sort_by(|a, b| b.received_at.cmp(&a.received_at));
    }

    fn to_value(&self) -> Result<Value, DatabaseError> {
        let mut entries = Vec::with_capacity(self.messages.len() + self.unreadable.len());
        for message in &self.messages {
            entries.push(
                serde_json::to_value(message)
                    .map_err(|e| DatabaseError::Serialization(e.to_string()))?,
            );
        }
        entries.extend(self.unreadable.iter().cloned());
        Ok(Value::Array(entries))
    }
}

#[derive(Clone)]
pub struct MessageLedger {
    content: ContentStore,
}

impl MessageLedger {
    pub fn new(content: ContentStore) -> Self {
        Self { content }
    }

    async fn read(&self) -> Result<StoredLog, DatabaseError> {
        match self.content.kv().get(MessageLog::KEY.as_str()).await? {
            Some(value) => StoredLog::from_value(value),
            None => Ok(StoredLog::default()),
        }
    }

    async fn write(&self, log: &StoredLog) -> Result<(), DatabaseError> {
        self.content
            .kv()
            .set(MessageLog::KEY.as_str(), &log.to_value()?)
            .await
    }

    /// All readable messages, `received_at` descending.
    pub async fn list(&self) -> Result<Vec<AdminMessage>, DatabaseError> {
        Ok(self.read().await?.messages)
    }

    pub async fn append(&self, message: AdminMessage) -> Result<AdminMessage, DatabaseError> {
        let mut log = self.read().await?;
        log.messages.push(message.clone());
        log.sort();
        self.write(&log).await?;
        info!(id = %message.id, from = %message.email, "Message recorded");
        Ok(message)
    }

    pub async fn record_inquiry(&self, inquiry: &Inquiry) -> Result<AdminMessage, DatabaseError> {
        self.append(AdminMessage::from_inquiry(inquiry)).await
    }

    /// Remove one message. Returns whether it existed.
    pub async fn remove(&self, id: &str) -> Result<bool, DatabaseError> {
        let mut log = self.read().await?;
        let before = log.messages.len();
        log.messages.retain(|m| m.id != id);
        if log.messages.len() == before {
            return Ok(false);
        }
        self.write(&log).await?;
        info!(id, "Message removed");
        Ok(true)
    }

    /// Delete every message.
    pub async fn clear(&self) -> Result<(), DatabaseError> {
        self.content.reset(ContentKey::Messages).await?;
        info!("Message ledger cleared");
        Ok(())
    }
}

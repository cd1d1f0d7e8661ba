use chrono::Utc;
use tracing::{info, instrument};
use uuid::Uuid;

use super::Service;
use crate::contract::model::{Message, NewMessage, User};
use crate::domain::error::DomainError;
use crate::domain::repo::MessageFilter;

const MAX_SUBJECT_LEN: usize = 200;

impl Service {
    #[instrument(
        name = "academy.service.send_message",
        skip(self, sender, new),
        fields(sender_id = %sender.id, recipient_id = %new.recipient_id)
    )]
    pub async fn send_message(&self, sender: &User, new: NewMessage) -> Result<Message, DomainError> {
        if new.subject.trim().is_empty() {
            return Err(DomainError::validation("subject", "cannot be empty"));
        }
        if new.subject.chars().count() > MAX_SUBJECT_LEN {
            return Err(DomainError::validation(
                "subject",
                format!("too long (max: {MAX_SUBJECT_LEN})"),
            ));
        }
        if new.body.trim().is_empty() {
            return Err(DomainError::validation("body", "cannot be empty"));
        }
        Self::ensure_exists(&self.store.users, new.recipient_id).await?;

        let now = Utc::now();
        let message = Message {
            id: Uuid::new_v4(),
            sender_id: sender.id,
            recipient_id: new.recipient_id,
            subject: new.subject.trim().to_string(),
            body: new.body,
            read_at: None,
            created_at: now,
            updated_at: now,
        };
        self.store.messages.insert(message.clone()).await?;
        info!("Message {} sent", message.id);
        Ok(message)
    }

    #[instrument(name = "academy.service.inbox", skip(self, user), fields(user_id = %user.id))]
    pub async fn inbox(&self, user: &User) -> Result<Vec<Message>, DomainError> {
        Ok(self
            .store
            .messages
            .list(&MessageFilter {
                recipient_id: Some(user.id),
                ..Default::default()
            })
            .await?)
    }

    #[instrument(name = "academy.service.sent_messages", skip(self, user), fields(user_id = %user.id))]
    pub async fn sent_messages(&self, user: &User) -> Result<Vec<Message>, DomainError> {
        Ok(self
            .store
            .messages
            .list(&MessageFilter {
                sender_id: Some(user.id),
                ..Default::default()
            })
            .await?)
    }

    /// Only the recipient can mark a message read; marking twice keeps the first time.
    #[instrument(name = "academy.service.mark_message_read", skip(self, user), fields(message_id = %id))]
    pub async fn mark_message_read(&self, user: &User, id: Uuid) -> Result<Message, DomainError> {
        let mut message = Self::load(&self.store.messages, id).await?;
        if message.recipient_id != user.id {
            return Err(DomainError::forbidden(
                "only the recipient can mark a message as read",
            ));
        }
        if message.read_at.is_some() {
            return Ok(message);
        }
        let now = Utc::now();
        message.read_at = Some(now);
        message.updated_at = now;
        Self::replace(&self.store.messages, message).await
    }

    #[instrument(name = "academy.service.delete_message", skip(self, user), fields(message_id = %id))]
    pub async fn delete_message(&self, user: &User, id: Uuid) -> Result<(), DomainError> {
        let message = Self::load(&self.store.messages, id).await?;
        if message.sender_id != user.id && message.recipient_id != user.id {
            return Err(DomainError::forbidden(
                "only the sender or recipient can delete a message",
            ));
        }
        Self::remove(&self.store.messages, id).await
    }
}

//! Message entity and the local form draft

use crate::auth::User;
use crate::store::{DocumentId, DocumentSnapshot, FieldValue, Fields, Timestamp};

/// Document field names
pub mod field {
    pub const COMMENT: &str = "comment";
    pub const USER: &str = "user";
    pub const AVATAR: &str = "avatar";
    pub const USERNAME: &str = "username";
    pub const EMAIL: &str = "email";
    pub const TIMESTAMP: &str = "timestamp";
}

/// A persisted guestbook message
///
/// `user`, `avatar`, `username` and `email` are copies of the author's
/// profile taken at write time.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: DocumentId,
    pub comment: String,
    pub user: Option<String>,
    pub avatar: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub timestamp: Option<Timestamp>,
}

impl Message {
    /// Map a stored document to `{id, ..fields}`
    pub fn from_snapshot(doc: &DocumentSnapshot) -> Self {
        let text = |name: &str| doc.get_str(name).map(str::to_string);
        Self {
            id: doc.id.clone(),
            comment: text(field::COMMENT).unwrap_or_default(),
            user: text(field::USER),
            avatar: text(field::AVATAR),
            username: text(field::USERNAME),
            email: text(field::EMAIL),
            timestamp: doc.get(field::TIMESTAMP).and_then(FieldValue::as_timestamp),
        }
    }

    /// Feed line: `<username>: <comment>`
    pub fn display_line(&self) -> String {
        format!(
            "{}: {}",
            self.username.as_deref().unwrap_or_default(),
            self.comment
        )
    }
}

/// Local form state
///
/// A draft without an `id` creates a new message on submit; one with an
/// `id` updates that message in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageDraft {
    pub id: Option<DocumentId>,
    pub comment: String,
}

impl MessageDraft {
    pub fn new(comment: impl Into<String>) -> Self {
        Self {
            id: None,
            comment: comment.into(),
        }
    }

    pub fn editing(id: DocumentId, comment: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            comment: comment.into(),
        }
    }
}

/// Fields written when creating a message
pub fn create_payload(comment: &str, author: &User) -> Fields {
    let mut fields = Fields::new();
    fields.insert(field::COMMENT.to_string(), FieldValue::from(comment));
    fields.insert(field::TIMESTAMP.to_string(), FieldValue::ServerTimestamp);
    fields.insert(field::USER.to_string(), FieldValue::from(author.uid.as_str()));
    fields.insert(field::AVATAR.to_string(), author.photo_url.clone().into());
    fields.insert(field::USERNAME.to_string(), author.display_name.clone().into());
    fields.insert(field::EMAIL.to_string(), author.email.clone().into());
    fields
}

/// Fields written when editing a message: the comment and a fresh timestamp
pub fn update_payload(comment: &str) -> Fields {
    let mut fields = Fields::new();
    fields.insert(field::COMMENT.to_string(), FieldValue::from(comment));
    fields.insert(field::TIMESTAMP.to_string(), FieldValue::ServerTimestamp);
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_payload_copies_profile() {
        let author = User::new("u1")
            .display_name("Ada")
            .photo_url("https://img/ada.png")
            .email("ada@example.com");
        let fields = create_payload("hello", &author);

        assert_eq!(fields[field::COMMENT], FieldValue::from("hello"));
        assert_eq!(fields[field::USER], FieldValue::from("u1"));
        assert_eq!(fields[field::AVATAR], FieldValue::from("https://img/ada.png"));
        assert_eq!(fields[field::USERNAME], FieldValue::from("Ada"));
        assert_eq!(fields[field::EMAIL], FieldValue::from("ada@example.com"));
        assert_eq!(fields[field::TIMESTAMP], FieldValue::ServerTimestamp);
    }

    #[test]
    fn test_missing_profile_fields_are_null() {
        let fields = create_payload("hi", &User::new("u1"));
        assert!(fields[field::AVATAR].is_null());
        assert!(fields[field::USERNAME].is_null());
    }

    #[test]
    fn test_update_payload_is_explicit() {
        let fields = update_payload("edited");
        assert_eq!(fields.len(), 2);
        assert!(fields.contains_key(field::COMMENT));
        assert!(fields.contains_key(field::TIMESTAMP));
    }

    #[test]
    fn test_from_snapshot_and_display() {
        let author = User::new("u1").display_name("Ada");
        let mut fields = create_payload("hello", &author);
        fields.insert(
            field::TIMESTAMP.to_string(),
            Timestamp::from_micros(42).into(),
        );
        let doc = DocumentSnapshot {
            id: DocumentId::parse("m1").unwrap(),
            fields,
        };

        let message = Message::from_snapshot(&doc);
        assert_eq!(message.id.as_str(), "m1");
        assert_eq!(message.user.as_deref(), Some("u1"));
        assert_eq!(message.avatar, None);
        assert_eq!(message.timestamp, Some(Timestamp::from_micros(42)));
        assert_eq!(message.display_line(), "Ada: hello");
    }
}

use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};

use chatsite_types::models::{Conversation, Message};
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use tracing::{debug, warn};

use crate::{Result, Store, StoreError, read_document, write_document};

/// `-` separates the pair in a file name, so it is escaped inside each email.
const NAME_ESCAPES: &AsciiSet = &CONTROLS.add(b'-').add(b'%');

/// Sorted participant pair identifying a conversation.
pub fn conversation_key(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

/// Emails become part of a file name, so anything that could escape the
/// directory is refused.
fn check_participant(email: &str) -> Result<()> {
    if email.is_empty()
        || email.contains(['/', '\\', '\0'])
        || email.starts_with('.')
    {
        return Err(StoreError::InvalidParticipant(email.to_string()));
    }
    Ok(())
}

fn name_part(email: &str) -> Cow<'_, str> {
    utf8_percent_encode(email, NAME_ESCAPES).into()
}

fn belongs_to(conv: &Conversation, first: &str, second: &str) -> bool {
    conv.participants.is_empty() || conv.participants == [first, second]
}

/// Read a conversation file and make sure it is the pair's own.
fn read_conversation(path: &Path, first: &str, second: &str) -> Result<Conversation> {
    let conv: Conversation = read_document(path)?;
    if !belongs_to(&conv, first, second) {
        return Err(StoreError::ConversationMismatch(path.display().to_string()));
    }
    Ok(conv)
}

impl Store {
    // -- Private conversations --

    /// `<a>-<b>.json` for the sorted pair, with `-` and `%` escaped in each
    /// email. Files written before escaping are still used when their
    /// participants match.
    pub fn conversation_path(&self, a: &str, b: &str) -> Result<PathBuf> {
        check_participant(a)?;
        check_participant(b)?;
        let (first, second) = conversation_key(a, b);

        let dir = self.private_dir();
        let path = dir.join(format!("{}-{}.json", name_part(&first), name_part(&second)));
        if !path.exists() {
            let legacy = dir.join(format!("{first}-{second}.json"));
            let owned = match read_document::<Conversation>(&legacy) {
                Ok(conv) => !conv.participants.is_empty() && belongs_to(&conv, &first, &second),
                Err(_) => false,
            };
            if legacy != path && owned {
                return Ok(legacy);
            }
        }
        Ok(path)
    }

    /// Messages between two users, oldest first. Empty if they never talked.
    pub fn get_private_messages(&self, a: &str, b: &str) -> Result<Vec<Message>> {
        let path = self.conversation_path(a, b)?;
        let (first, second) = conversation_key(a, b);
        Ok(read_conversation(&path, &first, &second)?.messages)
    }

    /// Append to the pair's conversation, creating the file on first message.
    pub fn add_private_message(&self, a: &str, b: &str, message: Message) -> Result<()> {
        let (first, second) = conversation_key(a, b);
        self.with_write_lock(|| {
            let path = self.conversation_path(a, b)?;
            let mut conv = read_conversation(&path, &first, &second)?;
            if conv.participants.is_empty() {
                debug!("Starting conversation {} / {}", first, second);
                conv.participants = vec![first.clone(), second.clone()];
            }
            conv.messages.push(message);
            write_document(&path, &conv)
        })
    }

    /// Everyone `email` has a conversation file with, sorted.
    pub fn list_conversation_partners(&self, email: &str) -> Result<Vec<String>> {
        let mut partners = Vec::new();

        for entry in fs::read_dir(self.private_dir())? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if !name.ends_with(".json") {
                continue;
            }

            let conv: Conversation = match read_document(&entry.path()) {
                Ok(conv) => conv,
                Err(e) => {
                    warn!("Skipping unreadable conversation {}: {}", name, e);
                    continue;
                }
            };
            if let Some(partner) = conv.partner_of(email) {
                partners.push(partner.to_string());
            }
        }

        partners.sort();
        partners.dedup();
        Ok(partners)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::temp_store;

    #[test]
    fn key_is_order_independent() {
        assert_eq!(
            conversation_key("zed@x.io", "amy@x.io"),
            ("amy@x.io".to_string(), "zed@x.io".to_string())
        );
        assert_eq!(conversation_key("amy@x.io", "zed@x.io"), conversation_key("zed@x.io", "amy@x.io"));
    }

    #[test]
    fn either_side_writes_the_same_file() {
        let t = temp_store();
        t.store
            .add_private_message("zed@x.io", "amy@x.io", Message::new("zed@x.io".into(), "hi amy".into()))
            .unwrap();
        t.store
            .add_private_message("amy@x.io", "zed@x.io", Message::new("amy@x.io".into(), "hi zed".into()))
            .unwrap();

        let path = t.dir.join(crate::PRIVATE_DIR).join("amy@x.io-zed@x.io.json");
        assert!(path.exists());

        let raw = fs::read_to_string(&path).unwrap();
        let conv: Conversation = serde_json::from_str(&raw).unwrap();
        assert_eq!(conv.participants, ["amy@x.io", "zed@x.io"]);
        assert_eq!(conv.messages.len(), 2);

        let msgs = t.store.get_private_messages("zed@x.io", "amy@x.io").unwrap();
        assert_eq!(msgs[0].content, "hi amy");
        assert_eq!(msgs[1].content, "hi zed");
    }

    #[test]
    fn missing_conversation_is_empty() {
        let t = temp_store();
        assert!(t.store.get_private_messages("a@x.io", "b@x.io").unwrap().is_empty());
    }

    #[test]
    fn path_escape_is_refused() {
        let t = temp_store();
        let msg = Message::new("a@x.io".into(), "x".into());
        assert!(matches!(
            t.store.add_private_message("a@x.io", "../../etc/passwd", msg),
            Err(StoreError::InvalidParticipant(_))
        ));
    }

    fn conversation(participants: [&str; 2], texts: &[&str]) -> Conversation {
        Conversation {
            participants: participants.iter().map(|p| p.to_string()).collect(),
            messages: texts
                .iter()
                .map(|t| Message::new(participants[0].into(), (*t).into()))
                .collect(),
        }
    }

    #[test]
    fn dashed_emails_do_not_share_a_file() {
        let t = temp_store();
        t.store
            .add_private_message("a@x-b", "c@y", Message::new("a@x-b".into(), "secret for a@x-b".into()))
            .unwrap();
        assert!(t.store.get_private_messages("a@x", "b-c@y").unwrap().is_empty());

        t.store
            .add_private_message("a@x", "b-c@y", Message::new("a@x".into(), "hello b-c".into()))
            .unwrap();

        let first = t.store.get_private_messages("c@y", "a@x-b").unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].content, "secret for a@x-b");
        let second = t.store.get_private_messages("b-c@y", "a@x").unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].content, "hello b-c");

        let dir = t.dir.join(crate::PRIVATE_DIR);
        assert!(dir.join("a@x%2Db-c@y.json").exists());
        assert!(dir.join("a@x-b%2Dc@y.json").exists());
    }

    #[test]
    fn unescaped_file_is_used_only_by_its_pair() {
        let t = temp_store();
        let dir = t.dir.join(crate::PRIVATE_DIR);
        let old = dir.join("a@x-b-c@y.json");
        write_document(&old, &conversation(["a@x-b", "c@y"], &["from before"])).unwrap();

        assert_eq!(t.store.get_private_messages("a@x-b", "c@y").unwrap().len(), 1);
        assert!(t.store.get_private_messages("a@x", "b-c@y").unwrap().is_empty());

        t.store
            .add_private_message("c@y", "a@x-b", Message::new("c@y".into(), "still here".into()))
            .unwrap();
        let conv: Conversation = read_document(&old).unwrap();
        assert_eq!(conv.messages.len(), 2);
        assert!(!dir.join("a@x%2Db-c@y.json").exists());
    }

    #[test]
    fn foreign_participants_are_refused() {
        let t = temp_store();
        let path = t.dir.join(crate::PRIVATE_DIR).join("amy@x.io-zed@x.io.json");
        write_document(&path, &conversation(["bea@x.io", "zed@x.io"], &["not yours"])).unwrap();

        assert!(matches!(
            t.store.get_private_messages("amy@x.io", "zed@x.io"),
            Err(StoreError::ConversationMismatch(_))
        ));
        let msg = Message::new("amy@x.io".into(), "hi".into());
        assert!(matches!(
            t.store.add_private_message("zed@x.io", "amy@x.io", msg),
            Err(StoreError::ConversationMismatch(_))
        ));
    }

    #[test]
    fn partners_are_listed() {
        let t = temp_store();
        for other in ["zed@x.io", "bea@x.io"] {
            t.store
                .add_private_message("amy@x.io", other, Message::new("amy@x.io".into(), "yo".into()))
                .unwrap();
        }
        t.store
            .add_private_message("bea@x.io", "zed@x.io", Message::new("bea@x.io".into(), "yo".into()))
            .unwrap();

        assert_eq!(t.store.list_conversation_partners("amy@x.io").unwrap(), ["bea@x.io", "zed@x.io"]);
        assert_eq!(t.store.list_conversation_partners("zed@x.io").unwrap(), ["amy@x.io", "bea@x.io"]);
        assert!(t.store.list_conversation_partners("nobody@x.io").unwrap().is_empty());
    }
}

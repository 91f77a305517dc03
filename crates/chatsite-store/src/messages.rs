use chatsite_types::models::{Message, MessagesDocument};

use crate::{Result, Store, read_document, write_document};

impl Store {
    // -- Public messages --

    pub fn list_public_messages(&self) -> Result<Vec<Message>> {
        let doc: MessagesDocument = read_document(&self.messages_path())?;
        Ok(doc.messages)
    }

    pub fn get_public_message(&self, id: &str) -> Result<Option<Message>> {
        Ok(self.list_public_messages()?.into_iter().find(|m| m.id == id))
    }

    pub fn add_public_message(&self, message: Message) -> Result<()> {
        self.with_write_lock(|| {
            let path = self.messages_path();
            let mut doc: MessagesDocument = read_document(&path)?;
            doc.messages.push(message);
            write_document(&path, &doc)
        })
    }

    /// Replace a message's content and mark it edited. Returns false if no
    /// message has that id.
    pub fn update_public_message(&self, id: &str, content: &str) -> Result<bool> {
        self.with_write_lock(|| {
            let path = self.messages_path();
            let mut doc: MessagesDocument = read_document(&path)?;

            let Some(message) = doc.messages.iter_mut().find(|m| m.id == id) else {
                return Ok(false);
            };
            message.content = content.to_string();
            message.edited = true;

            write_document(&path, &doc)?;
            Ok(true)
        })
    }

    /// Returns false if no message has that id.
    pub fn delete_public_message(&self, id: &str) -> Result<bool> {
        self.with_write_lock(|| {
            let path = self.messages_path();
            let mut doc: MessagesDocument = read_document(&path)?;

            let before = doc.messages.len();
            doc.messages.retain(|m| m.id != id);
            if doc.messages.len() == before {
                return Ok(false);
            }

            write_document(&path, &doc)?;
            Ok(true)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::temp_store;

    #[test]
    fn append_keeps_order() {
        let t = temp_store();
        for text in ["one", "two", "three"] {
            t.store
                .add_public_message(Message::new("a@x.io".into(), text.into()))
                .unwrap();
        }
        let contents: Vec<String> = t
            .store
            .list_public_messages()
            .unwrap()
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(contents, ["one", "two", "three"]);
    }

    #[test]
    fn edit_sets_flag() {
        let t = temp_store();
        let msg = Message::new("a@x.io".into(), "typo".into());
        let id = msg.id.clone();
        t.store.add_public_message(msg).unwrap();

        assert!(t.store.update_public_message(&id, "fixed").unwrap());
        let stored = t.store.get_public_message(&id).unwrap().unwrap();
        assert_eq!(stored.content, "fixed");
        assert!(stored.edited);

        assert!(!t.store.update_public_message("missing", "x").unwrap());
    }

    #[test]
    fn delete_removes_only_target() {
        let t = temp_store();
        let keep = Message::new("a@x.io".into(), "keep".into());
        let doomed = Message::new("a@x.io".into(), "drop".into());
        let doomed_id = doomed.id.clone();
        t.store.add_public_message(keep).unwrap();
        t.store.add_public_message(doomed).unwrap();

        assert!(t.store.delete_public_message(&doomed_id).unwrap());
        assert!(!t.store.delete_public_message(&doomed_id).unwrap());

        let remaining = t.store.list_public_messages().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].content, "keep");
    }
}

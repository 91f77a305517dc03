use std::path::Path;

use chatsite_types::models::{MessagesDocument, UsersDocument};
use tracing::info;

use crate::{MESSAGES_FILE, Result, USERS_FILE, write_document};

/// Create the top-level documents if they do not exist yet.
pub fn run(dir: &Path) -> Result<()> {
    let users = dir.join(USERS_FILE);
    if !users.exists() {
        write_document(&users, &UsersDocument::default())?;
        info!("Seeded {}", users.display());
    }

    let messages = dir.join(MESSAGES_FILE);
    if !messages.exists() {
        write_document(&messages, &MessagesDocument::default())?;
        info!("Seeded {}", messages.display());
    }

    Ok(())
}

//! Run one command as a logged-in user.

use anyhow::{anyhow, Context};
use futures::future::BoxFuture;

use phpbb_sl::{ClientConfig, Folder, ForumClient, Message, PhpbbResult};

use crate::config::Settings;

/// Log in, run `f`, then log out and close, whatever `f` returned.
///
/// A rejected login is an error here: every command needs an account.
pub async fn logged_in<T, F>(
    settings: &Settings,
    config: ClientConfig,
    f: F,
) -> anyhow::Result<T>
where
    T: Send + 'static,
    F: for<'c> FnOnce(&'c mut ForumClient) -> BoxFuture<'c, PhpbbResult<T>> + Send + 'static,
{
    let client = ForumClient::with_config(&settings.host, config)
        .with_context(|| format!("opening {}", settings.host))?;
    tracing::info!("Session for {} on {}", settings.username, settings.host);

    let username = settings.username.clone();
    let password = settings.password.clone();
    let outcome = client
        .with_session(move |forum| {
            Box::pin(async move {
                if !forum.login(&username, &password).await? {
                    return Ok(None);
                }
                f(forum).await.map(Some)
            })
        })
        .await
        .with_context(|| format!("talking to {}", settings.host))?;

    match outcome {
        Some(value) => {
            tracing::info!("Session for {} closed", settings.username);
            Ok(value)
        }
        None => Err(anyhow!("login rejected for {}", settings.username)),
    }
}

/// Whether `message` was exchanged with `name`.
///
/// Inbox messages are matched on their sender, sentbox messages on their
/// receiver.
pub fn exchanged_with(message: &Message, folder: Folder, name: &str) -> bool {
    if folder.is_inbox() {
        message.sender == name
    } else {
        message.receiver.as_deref() == Some(name)
    }
}

/// Delete the messages of each folder, optionally only those exchanged with
/// one member. Returns how many were deleted.
pub async fn clean(
    forum: &mut ForumClient,
    folders: &[Folder],
    with: Option<&str>,
) -> PhpbbResult<usize> {
    let mut deleted = 0;
    for &folder in folders {
        let messages = forum.fetch_messages(folder).await?;
        let mut in_folder = 0;
        for message in &messages {
            if with.is_some_and(|name| !exchanged_with(message, folder, name)) {
                continue;
            }
            forum.delete_message(message).await?;
            in_folder += 1;
        }
        tracing::info!("{folder:?}: deleted {in_folder} of {} message(s)", messages.len());
        deleted += in_folder;
    }
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(sender: &str, receiver: Option<&str>) -> Message {
        Message {
            id: 11850,
            subject: "Token".into(),
            url: "./ucp.php?i=pm&mode=view&f=0&p=11850".into(),
            sender: sender.into(),
            receiver: receiver.map(String::from),
            content: None,
            unread: false,
        }
    }

    #[test]
    fn test_inbox_matches_sender() {
        let m = message("Foobar", Some("alice"));
        assert!(exchanged_with(&m, Folder::Unread, "Foobar"));
        assert!(exchanged_with(&m, Folder::Read, "Foobar"));
        assert!(!exchanged_with(&m, Folder::Read, "alice"));
    }

    #[test]
    fn test_sentbox_matches_receiver() {
        let m = message("alice", Some("Foobar"));
        assert!(exchanged_with(&m, Folder::Sent, "Foobar"));
        assert!(!exchanged_with(&m, Folder::Sent, "alice"));
        assert!(!exchanged_with(&message("alice", None), Folder::Sent, "Foobar"));
    }
}

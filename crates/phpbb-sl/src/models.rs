//! Plain data produced by the client.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{PhpbbError, PhpbbResult};

/// A private message.
///
/// Treated as an immutable value: reading returns a new `Message`, and a
/// deleted message is simply no longer valid on the forum side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Post number, taken from the `p=` part of the URL.
    pub id: u64,
    pub subject: String,
    /// Relative view URL, e.g. `./ucp.php?i=pm&mode=view&f=0&p=11850`.
    pub url: String,
    pub sender: String,
    pub receiver: Option<String>,
    /// Body text, `None` until the message has been read.
    pub content: Option<String>,
    pub unread: bool,
}

impl Message {
    /// Folder and post numbers encoded in the message URL.
    pub fn locator(&self) -> PhpbbResult<MessageLocator> {
        MessageLocator::parse(&self.url)
    }
}

/// The `(folder, post)` pair phpBB uses to address a private message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageLocator {
    /// Folder number. Negative for the outbox/sentbox (`-1`, `-2`).
    pub folder: i64,
    pub post: u64,
}

fn locator_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"f=(-?\d+)&p=(\d+)").expect("locator regex is valid"))
}

impl MessageLocator {
    /// Extract `f` and `p` from a message URL.
    pub fn parse(url: &str) -> PhpbbResult<Self> {
        let caps = locator_re()
            .captures(url)
            .ok_or_else(|| PhpbbError::MessageUrl(url.to_string()))?;
        let folder = caps[1]
            .parse()
            .map_err(|_| PhpbbError::MessageUrl(url.to_string()))?;
        let post = caps[2]
            .parse()
            .map_err(|_| PhpbbError::MessageUrl(url.to_string()))?;
        Ok(Self { folder, post })
    }
}

/// Which private-message list to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Folder {
    Unread,
    Read,
    Sent,
}

impl Folder {
    /// Value of the `folder` query parameter.
    pub fn box_name(&self) -> &'static str {
        match self {
            Folder::Unread | Folder::Read => "inbox",
            Folder::Sent => "sentbox",
        }
    }

    /// CSS class of the `<dl>` rows belonging to this folder.
    pub fn row_class(&self) -> &'static str {
        match self {
            Folder::Unread => "pm_unread",
            Folder::Read | Folder::Sent => "pm_read",
        }
    }

    pub fn is_inbox(&self) -> bool {
        self.box_name() == "inbox"
    }
}

/// A sub-forum link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubForum {
    pub name: String,
    pub url: String,
}

/// A topic link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub name: String,
    pub url: String,
}

/// A member listed in today's birthdays. `age` is 0 when the member hides it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Birthday {
    pub name: String,
    pub age: u32,
}

/// What the profile page says about a member.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberInfo {
    pub user_id: Option<u32>,
    pub rank: Option<String>,
}

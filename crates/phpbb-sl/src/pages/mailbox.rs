//! Private message list (`ucp.php?i=pm&folder=inbox|sentbox`).

use scraper::Html;

use super::{selector, text_of, PageModel};
use crate::error::{PhpbbError, PhpbbResult};
use crate::models::Folder;

/// One row of a message list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailboxEntry {
    pub subject: String,
    pub url: String,
    /// The other party: sender in the inbox, recipient in the sentbox.
    pub correspondent: String,
    /// Row carries the `pm_unread` class.
    pub unread: bool,
}

/// Every message row on a folder page, in page order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mailbox {
    pub entries: Vec<MailboxEntry>,
}

impl Mailbox {
    /// Rows whose CSS class matches the folder.
    pub fn rows(&self, folder: Folder) -> impl Iterator<Item = &MailboxEntry> {
        let want_unread = folder == Folder::Unread;
        self.entries.iter().filter(move |e| e.unread == want_unread)
    }
}

impl PageModel for Mailbox {
    fn parse(document: &Html) -> PhpbbResult<Self> {
        let row_sel = selector("dl.pm_unread, dl.pm_read");
        let title_sel = selector("a.topictitle");
        let user_sel = selector(
            "a.username, a.username-coloured, span.username, span.username-coloured",
        );

        let mut entries = Vec::new();
        for row in document.select(&row_sel) {
            let title = row
                .select(&title_sel)
                .next()
                .ok_or_else(|| PhpbbError::Markup("message row without a.topictitle".into()))?;
            let url = title
                .value()
                .attr("href")
                .ok_or_else(|| PhpbbError::Markup("message title without href".into()))?;
            let user = row
                .select(&user_sel)
                .next()
                .ok_or_else(|| PhpbbError::Markup("message row without username".into()))?;

            entries.push(MailboxEntry {
                subject: text_of(&title),
                url: url.to_string(),
                correspondent: text_of(&user),
                unread: row.value().classes().any(|c| c == "pm_unread"),
            });
        }

        tracing::debug!("mailbox page: {} rows", entries.len());
        Ok(Self { entries })
    }
}

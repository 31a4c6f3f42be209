//! Page models: one reader per phpBB page type.
//!
//! Each model turns a parsed document into owned values and knows nothing
//! about HTTP. When the board's markup changes, only the matching model has
//! to follow, and its tests run against saved HTML fixtures.
//!
//! Models return [`PhpbbError::Markup`](crate::PhpbbError::Markup) when an
//! element they cannot do without is missing, and `None`/empty values when
//! the page legitimately has nothing to show.

pub mod compose;
pub mod forum;
pub mod index;
pub mod mailbox;
pub mod message;
pub mod profile;

use scraper::{ElementRef, Html, Selector};

use crate::error::PhpbbResult;

pub use compose::RecipientConfirmation;
pub use forum::ForumListing;
pub use index::{parse_age, BirthdayList};
pub use mailbox::{Mailbox, MailboxEntry};
pub use message::MessageView;
pub use profile::MemberProfile;

/// A typed reading of one kind of page.
pub trait PageModel: Sized {
    fn parse(document: &Html) -> PhpbbResult<Self>;
}

/// Compile a selector that is part of the source code.
pub(crate) fn selector(css: &'static str) -> Selector {
    Selector::parse(css).expect("static selector is valid")
}

/// Visible text of an element with whitespace collapsed.
pub(crate) fn text_of(el: &ElementRef<'_>) -> String {
    el.text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

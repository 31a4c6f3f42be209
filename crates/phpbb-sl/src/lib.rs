//! phpbb-sl drives a phpBB forum through its HTML forms: login, private
//! messages, birthdays, member profiles and forum listings.

pub mod browser;
pub mod client;
pub mod config;
pub mod error;
pub mod form;
pub mod identity;
pub mod models;
pub mod pages;

pub use browser::{Browser, CookiePair, Page};
pub use client::ForumClient;
pub use config::{ClientConfig, RetryPolicy, SubmitLabels};
pub use error::{PhpbbError, PhpbbResult};
pub use form::{extract_form, Form, FormPayload};
pub use identity::{AuthState, CookieSource, GUEST_USER_ID};
pub use models::{Birthday, Folder, MemberInfo, Message, MessageLocator, SubForum, Topic};
pub use pages::{ForumListing, PageModel};

//! Forum action client.
//!
//! Replays what a person would do in the web UI, one request after the
//! other: load a page, scrape its form, fill in a few fields, post it back.
//! Whether we are logged in is never stored; it is read from the cookie jar
//! each time it matters.
//!
//! ```text
//!   Anonymous ──login()──▶ Authenticated ──logout()──▶ Anonymous
//! ```
//!
//! Message and profile actions assume the authenticated state but do not
//! check it. A guest simply gets the board's "please log in" page back, which
//! then surfaces as a missing form or missing markup.

use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use url::Url;

use crate::browser::{Browser, Page};
use crate::config::ClientConfig;
use crate::error::{PhpbbError, PhpbbResult};
use crate::form::FormPayload;
use crate::identity::{self, AuthState};
use crate::models::{Birthday, Folder, MemberInfo, Message, MessageLocator, SubForum, Topic};
use crate::pages::{
    BirthdayList, ForumListing, Mailbox, MailboxEntry, MemberProfile, MessageView,
    RecipientConfirmation,
};

const UCP: &str = "ucp.php";
const INDEX: &str = "index.php";
const MEMBERLIST: &str = "memberlist.php";

const LOGIN_FORM: &str = "form#login";
const COMPOSE_FORM: &str = "form#postform";
const CONFIRM_FORM: &str = "form#confirm";

/// Font size field phpBB's compose form expects back.
const BBCODE_FONT_SIZE: u32 = 100;

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

/// Make sure relative paths resolve under the forum root, not next to it.
fn normalize_base(host: &str) -> PhpbbResult<Url> {
    let mut url = Url::parse(host)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

/// A logged-in (or not) session on one phpBB board.
///
/// Each client owns its own cookie jar, so two clients can act as two
/// different users at the same time. A single client is strictly sequential.
pub struct ForumClient {
    host: Url,
    browser: Browser,
    config: ClientConfig,
    /// Result of the latest `fetch_messages`, searched by `find_by_sender`.
    last_fetched: Vec<Message>,
    username: Option<String>,
}

impl ForumClient {
    /// Client for the forum at `host` with default settings.
    pub fn new(host: &str) -> PhpbbResult<Self> {
        Self::with_config(host, ClientConfig::default())
    }

    pub fn with_config(host: &str, config: ClientConfig) -> PhpbbResult<Self> {
        let host = normalize_base(host)?;
        let browser = Browser::new(host.clone(), &config)?;
        tracing::debug!("forum client for {host}");
        Ok(Self {
            host,
            browser,
            config,
            last_fetched: Vec::new(),
            username: None,
        })
    }

    pub fn host(&self) -> &Url {
        &self.host
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn browser(&self) -> &Browser {
        &self.browser
    }

    /// Name used for the last successful login.
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    fn url(&self, path: &str) -> PhpbbResult<Url> {
        Ok(self.host.join(path)?)
    }

    // ── Identity ────────────────────────────────────────────────────────

    pub fn auth_state(&self) -> AuthState {
        AuthState::from_cookies(&self.browser)
    }

    pub fn is_authenticated(&self) -> bool {
        identity::is_authenticated(&self.browser)
    }

    pub fn current_user_id(&self) -> Option<u32> {
        identity::current_user_id(&self.browser)
    }

    pub fn session_token(&self) -> Option<String> {
        identity::current_session_token(&self.browser)
    }

    // ── Session lifecycle ───────────────────────────────────────────────

    /// Log in through the board's login form.
    ///
    /// Returns `Ok(false)` when the board did not accept the credentials.
    /// Errors are reserved for transport failures and unexpected markup.
    pub async fn login(&mut self, username: &str, password: &str) -> PhpbbResult<bool> {
        let ucp = self.url(UCP)?;
        let page = self.browser.fetch(&ucp, &[("mode", "login")]).await?;

        let mut form = page.form(LOGIN_FORM)?;
        form.fields
            .set("username", username)
            .set("password", password)
            .set("login", &self.config.labels.login);
        let action = form.action_url(&page.url)?;

        pause(self.config.login_delay).await;
        self.browser.submit_form(&action, &[], &form.fields).await?;

        match self.auth_state() {
            AuthState::Authenticated { user_id } => {
                tracing::info!("user is logged : {user_id}");
                self.username = Some(username.to_string());
                Ok(true)
            }
            AuthState::Anonymous => {
                tracing::warn!("login failed for {username}");
                Ok(false)
            }
        }
    }

    /// Log out, echoing the session id as phpBB requires.
    ///
    /// Returns `true` when the cookies no longer name a registered user.
    pub async fn logout(&mut self) -> PhpbbResult<bool> {
        let ucp = self.url(UCP)?;
        let sid = self.session_token().unwrap_or_default();
        self.browser
            .submit_form(&ucp, &[("mode", "logout"), ("sid", sid.as_str())], &FormPayload::new())
            .await?;

        let logged_out = !self.is_authenticated();
        if logged_out {
            tracing::info!("Signed out");
            self.username = None;
        } else {
            tracing::warn!("Still logged in : {:?}", self.current_user_id());
        }
        Ok(logged_out)
    }

    /// Release the HTTP connection. Safe to call more than once.
    pub fn close(&mut self) {
        self.browser.close();
    }

    /// Best-effort logout (if logged in), then close.
    ///
    /// A failing logout is logged and does not stop the close.
    pub async fn shutdown(&mut self) {
        if !self.browser.is_closed() && self.is_authenticated() {
            if let Err(e) = self.logout().await {
                tracing::warn!("logout during shutdown failed: {e}");
            }
        }
        self.close();
    }

    /// Run `f` against this client, then shut it down whatever `f` returned.
    ///
    /// A panic inside `f` is held until the shutdown has run, then resumed.
    ///
    /// ```no_run
    /// # async fn demo() -> phpbb_sl::PhpbbResult<()> {
    /// use phpbb_sl::ForumClient;
    ///
    /// let client = ForumClient::new("https://forum.example.org/")?;
    /// let sent = client
    ///     .with_session(|forum| {
    ///         Box::pin(async move {
    ///             forum.login("alice", "secret").await?;
    ///             forum.send_private_message("bob", "Hi", "Hello Bob").await
    ///         })
    ///     })
    ///     .await?;
    /// # let _ = sent;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn with_session<T, F>(mut self, f: F) -> PhpbbResult<T>
    where
        F: for<'c> FnOnce(&'c mut ForumClient) -> BoxFuture<'c, PhpbbResult<T>>,
    {
        let outcome = AssertUnwindSafe(f(&mut self)).catch_unwind().await;
        self.shutdown().await;
        match outcome {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }

    // ── Private messages ────────────────────────────────────────────────

    /// Send a private message in two round trips.
    ///
    /// First the recipient name is submitted with "add recipient" so the
    /// board resolves it to a user id; then the compose form is loaded again
    /// and posted with subject, body and that id. Returns `Ok(false)` when
    /// the board does not know the recipient.
    pub async fn send_private_message(
        &self,
        receiver: &str,
        subject: &str,
        body: &str,
    ) -> PhpbbResult<bool> {
        tracing::info!("Trying to send private message to {receiver}");
        let labels = &self.config.labels;

        let ucp = self.url(UCP)?;
        let page = self
            .browser
            .fetch(&ucp, &[("i", "pm"), ("mode", "compose")])
            .await?;
        let mut form = page.form(COMPOSE_FORM)?;
        form.fields
            .set("username_list", receiver)
            .set("add_to", &labels.add_recipient)
            .set("addbbcode20", BBCODE_FONT_SIZE);
        form.fields.remove("icon");
        let compose_url = form.action_url(&page.url)?;

        pause(self.config.politeness_delay).await;
        let response = self
            .browser
            .submit_form(&compose_url, &[], &form.fields)
            .await?;

        let Some(receiver_id) = response.parse::<RecipientConfirmation>()?.user_id else {
            tracing::warn!("Can't add receiver {receiver}, probably not a valid username");
            return Ok(false);
        };

        pause(self.config.politeness_delay).await;
        let page = self.browser.fetch(&compose_url, &[]).await?;
        let mut form = page.form(COMPOSE_FORM)?;
        form.fields
            .set("subject", subject)
            .set("message", body)
            .set("addbbcode20", BBCODE_FONT_SIZE)
            .set(format!("address_list[u][{receiver_id}]"), "to")
            .set("icon", 0)
            .set("post", &labels.send);
        let send_url = form.action_url(&page.url)?;

        self.browser.submit_form(&send_url, &[], &form.fields).await?;
        tracing::info!("private message sent to {receiver} (u={receiver_id})");
        Ok(true)
    }

    /// List a private message folder.
    ///
    /// Messages come back without content. The list replaces the one
    /// [`find_by_sender`](Self::find_by_sender) searches.
    pub async fn fetch_messages(&mut self, folder: Folder) -> PhpbbResult<Vec<Message>> {
        let ucp = self.url(UCP)?;
        let page = self
            .browser
            .fetch(&ucp, &[("i", "pm"), ("folder", folder.box_name())])
            .await?;
        let mailbox: Mailbox = page.parse()?;

        let me = self.username.as_deref();
        let messages = mailbox
            .rows(folder)
            .map(|entry| message_from_entry(entry, folder, me))
            .collect::<PhpbbResult<Vec<_>>>()?;

        tracing::info!("{} message(s) in {folder:?}", messages.len());
        self.last_fetched = messages.clone();
        Ok(messages)
    }

    pub async fn fetch_unread_messages(&mut self) -> PhpbbResult<Vec<Message>> {
        self.fetch_messages(Folder::Unread).await
    }

    pub async fn fetch_read_messages(&mut self) -> PhpbbResult<Vec<Message>> {
        self.fetch_messages(Folder::Read).await
    }

    pub async fn fetch_sent_messages(&mut self) -> PhpbbResult<Vec<Message>> {
        self.fetch_messages(Folder::Sent).await
    }

    /// Messages returned by the latest folder fetch.
    pub fn last_fetched(&self) -> &[Message] {
        &self.last_fetched
    }

    /// First message from `sender` in the latest folder fetch.
    pub fn find_by_sender(&self, sender: &str) -> Option<&Message> {
        self.last_fetched.iter().find(|m| m.sender == sender)
    }

    /// Open a message and return a copy with its content, marked read.
    ///
    /// The board marks it read on its side as a consequence of the visit.
    pub async fn read_message(&self, message: &Message) -> PhpbbResult<Message> {
        let url = self.url(&message.url)?;
        let page = self.browser.fetch(&url, &[]).await?;
        let view: MessageView = page.parse()?;

        Ok(Message {
            content: Some(view.content),
            unread: false,
            ..message.clone()
        })
    }

    /// Delete a message through the board's confirmation page.
    ///
    /// Fails with [`PhpbbError::MessageUrl`] if the message URL carries no
    /// `f=..&p=..` pair.
    pub async fn delete_message(&self, message: &Message) -> PhpbbResult<bool> {
        let MessageLocator { folder, post } = message.locator()?;
        let (f, p) = (folder.to_string(), post.to_string());

        let ucp = self.url(UCP)?;
        let page = self
            .browser
            .fetch(
                &ucp,
                &[
                    ("i", "pm"),
                    ("mode", "compose"),
                    ("action", "delete"),
                    ("f", f.as_str()),
                    ("p", p.as_str()),
                ],
            )
            .await?;
        let mut form = page.form(CONFIRM_FORM)?;
        form.fields.set("confirm", &self.config.labels.confirm);
        let action = form.action_url(&page.url)?;

        self.browser.submit_form(&action, &[], &form.fields).await?;
        tracing::info!("message deleted : f={folder} p={post}");
        Ok(true)
    }

    // ── Board pages ─────────────────────────────────────────────────────

    /// Today's birthdays from the board index.
    pub async fn fetch_birthdays(&self) -> PhpbbResult<Vec<Birthday>> {
        let index = self.url(INDEX)?;
        let page = self.browser.fetch(&index, &[]).await?;
        Ok(page.parse::<BirthdayList>()?.birthdays)
    }

    /// Id and rank of a member, looked up by name.
    ///
    /// An unknown member gives an empty [`MemberInfo`], not an error.
    pub async fn member_info(&self, name: &str) -> PhpbbResult<MemberInfo> {
        let memberlist = self.url(MEMBERLIST)?;
        let page = match self
            .browser
            .fetch(&memberlist, &[("mode", "viewprofile"), ("un", name)])
            .await
        {
            Ok(page) => page,
            // phpBB answers NO_USER with a 404 page.
            Err(PhpbbError::Status { status: 404, .. }) => {
                tracing::debug!("member {name} not found");
                return Ok(MemberInfo::default());
            }
            Err(e) => return Err(e),
        };
        Ok(page.parse::<MemberProfile>()?.into())
    }

    pub async fn member_id(&self, name: &str) -> PhpbbResult<Option<u32>> {
        Ok(self.member_info(name).await?.user_id)
    }

    pub async fn member_rank(&self, name: &str) -> PhpbbResult<Option<String>> {
        Ok(self.member_info(name).await?.rank)
    }

    /// One page of a forum, e.g. `viewforum.php?f=11`.
    pub async fn fetch_forum(&self, path: &str) -> PhpbbResult<ForumListing> {
        let url = self.url(path)?;
        self.fetch_with_retry(&url, &[]).await?.parse()
    }

    pub async fn fetch_sub_forums(&self, path: &str) -> PhpbbResult<Vec<SubForum>> {
        Ok(self.fetch_forum(path).await?.sub_forums)
    }

    /// Every topic of a forum, walking its pages with `start=`.
    pub async fn fetch_all_topics(&self, path: &str) -> PhpbbResult<Vec<Topic>> {
        let url = self.url(path)?;
        let first: ForumListing = self.fetch_with_retry(&url, &[]).await?.parse()?;
        let per_page = self.config.topics_per_page.max(1);

        let mut topics = first.topics;
        let mut start = per_page;
        while start < first.topic_count {
            let offset = start.to_string();
            let listing: ForumListing = self
                .fetch_with_retry(&url, &[("start", offset.as_str())])
                .await?
                .parse()?;
            if listing.topics.is_empty() {
                tracing::warn!("{url}: empty page at start={start}, stopping");
                break;
            }
            topics.extend(listing.topics);
            start += per_page;
        }

        tracing::debug!("{url}: {} topic(s) of {}", topics.len(), first.topic_count);
        Ok(topics)
    }

    /// GET with bounded retries and exponential backoff on transient errors.
    async fn fetch_with_retry(&self, url: &Url, query: &[(&str, &str)]) -> PhpbbResult<Page> {
        let policy = self.config.retry;
        let mut attempt = 0;
        loop {
            match self.browser.fetch(url, query).await {
                Ok(page) => return Ok(page),
                Err(e) if e.is_transient() && attempt < policy.max_retries => {
                    attempt += 1;
                    let delay = policy.delay_for(attempt);
                    tracing::warn!(
                        "GET {url} failed ({e}), retry {attempt}/{} in {delay:?}",
                        policy.max_retries
                    );
                    pause(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn message_from_entry(
    entry: &MailboxEntry,
    folder: Folder,
    me: Option<&str>,
) -> PhpbbResult<Message> {
    let locator = MessageLocator::parse(&entry.url)?;
    let (sender, receiver) = if folder.is_inbox() {
        (entry.correspondent.clone(), me.map(String::from))
    } else {
        (
            me.unwrap_or_default().to_string(),
            Some(entry.correspondent.clone()),
        )
    };

    Ok(Message {
        id: locator.post,
        subject: entry.subject.clone(),
        url: entry.url.clone(),
        sender,
        receiver,
        content: None,
        unread: folder == Folder::Unread,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_close() {
        let mut client = ForumClient::new("http://dummy.io").unwrap();
        assert!(!client.is_authenticated());
        client.close();
        client.close();
        assert!(client.browser().is_closed());
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let client = ForumClient::new("https://forum.test/board").unwrap();
        assert_eq!(client.host().as_str(), "https://forum.test/board/");
        assert_eq!(
            client.url("ucp.php").unwrap().as_str(),
            "https://forum.test/board/ucp.php"
        );
    }

    #[test]
    fn test_invalid_host() {
        assert!(matches!(
            ForumClient::new("not a url"),
            Err(PhpbbError::Url(_))
        ));
    }

    #[test]
    fn test_find_by_sender_before_fetch() {
        let client = ForumClient::new("http://dummy.io").unwrap();
        assert!(client.find_by_sender("Foobar").is_none());
        assert!(client.last_fetched().is_empty());
    }

    #[test]
    fn test_sentbox_entry_names_the_receiver() {
        let entry = MailboxEntry {
            subject: "Token".into(),
            url: "./ucp.php?i=pm&mode=view&f=-1&p=11852".into(),
            correspondent: "Bob".into(),
            unread: false,
        };
        let msg = message_from_entry(&entry, Folder::Sent, Some("Alice")).unwrap();
        assert_eq!(msg.id, 11852);
        assert_eq!(msg.sender, "Alice");
        assert_eq!(msg.receiver.as_deref(), Some("Bob"));
        assert!(!msg.unread);
        assert!(msg.content.is_none());
    }

    #[test]
    fn test_inbox_entry_names_the_sender() {
        let entry = MailboxEntry {
            subject: "Hello".into(),
            url: "./ucp.php?i=pm&mode=view&f=0&p=11850".into(),
            correspondent: "Bob".into(),
            unread: true,
        };
        let msg = message_from_entry(&entry, Folder::Unread, Some("Alice")).unwrap();
        assert_eq!(msg.sender, "Bob");
        assert_eq!(msg.receiver.as_deref(), Some("Alice"));
        assert!(msg.unread);
    }
}

//! Async HTTP browser wrapping reqwest.
//!
//! Not a real browser: GET and url-encoded POST with a cookie jar, redirects
//! and a fixed timeout. Responses come back as [`Page`] values that can be
//! parsed into a `scraper` document on demand.

use std::sync::Arc;

use reqwest::cookie::{CookieStore, Jar};
use scraper::Html;
use serde::Serialize;
use url::Url;

use crate::config::ClientConfig;
use crate::error::{PhpbbError, PhpbbResult};
use crate::form::{self, Form, FormPayload};
use crate::identity::CookieSource;
use crate::pages::PageModel;

/// One cookie as seen by the forum: name and raw value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CookiePair {
    pub name: String,
    pub value: String,
}

impl CookiePair {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A fetched page.
#[derive(Debug, Clone)]
pub struct Page {
    /// Final URL after redirects.
    pub url: Url,
    /// HTTP status code.
    pub status: u16,
    /// Response body as text.
    pub body: String,
}

impl Page {
    /// Parse the body into a queryable document.
    pub fn document(&self) -> Html {
        Html::parse_document(&self.body)
    }

    /// Extract the form matching `selector`.
    pub fn form(&self, selector: &str) -> PhpbbResult<Form> {
        form::extract_form(&self.document(), selector)
    }

    /// Read this page through a page model.
    pub fn parse<P: PageModel>(&self) -> PhpbbResult<P> {
        P::parse(&self.document())
    }

    /// Resolve a link found on this page.
    pub fn join(&self, href: &str) -> PhpbbResult<Url> {
        Ok(self.url.join(href)?)
    }
}

/// HTTP session against one forum.
///
/// Owns the connection pool and the cookie jar. The pool is released by
/// [`Browser::close`]; the jar stays readable afterwards.
pub struct Browser {
    client: Option<reqwest::Client>,
    jar: Arc<Jar>,
    base: Url,
}

impl Browser {
    /// Create a browser rooted at the forum's base URL.
    pub fn new(base: Url, config: &ClientConfig) -> PhpbbResult<Self> {
        let jar = Arc::new(Jar::default());
        let client = reqwest::Client::builder()
            .cookie_provider(Arc::clone(&jar))
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(PhpbbError::Client)?;

        Ok(Self {
            client: Some(client),
            jar,
            base,
        })
    }

    /// The forum root every relative path is resolved against.
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// GET a page.
    pub async fn fetch(&self, url: &Url, query: &[(&str, &str)]) -> PhpbbResult<Page> {
        let client = self.client()?;
        tracing::debug!("GET {url} {query:?}");
        let request = client.get(url.clone()).query(query);
        self.send(url, request).await
    }

    /// POST a url-encoded form.
    pub async fn submit_form(
        &self,
        url: &Url,
        query: &[(&str, &str)],
        payload: &FormPayload,
    ) -> PhpbbResult<Page> {
        let client = self.client()?;
        tracing::debug!("POST {url} {query:?} ({} fields)", payload.len());
        let request = client
            .post(url.clone())
            .query(query)
            .form(payload.as_pairs());
        self.send(url, request).await
    }

    async fn send(&self, url: &Url, request: reqwest::RequestBuilder) -> PhpbbResult<Page> {
        let transport = |source| PhpbbError::Transport {
            url: url.to_string(),
            source,
        };

        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        let final_url = response.url().clone();

        if !status.is_success() {
            return Err(PhpbbError::Status {
                url: final_url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(transport)?;
        Ok(Page {
            url: final_url,
            status: status.as_u16(),
            body,
        })
    }

    fn client(&self) -> PhpbbResult<&reqwest::Client> {
        self.client.as_ref().ok_or(PhpbbError::Closed)
    }

    /// Current cookies for the forum base URL.
    pub fn list_cookies(&self) -> Vec<CookiePair> {
        let Some(header) = self.jar.cookies(&self.base) else {
            return Vec::new();
        };
        let Ok(header) = header.to_str() else {
            return Vec::new();
        };
        cookie::Cookie::split_parse(header)
            .filter_map(Result::ok)
            .map(|c| CookiePair::new(c.name(), c.value()))
            .collect()
    }

    /// Release the HTTP client. Calling it again does nothing.
    pub fn close(&mut self) {
        if self.client.take().is_some() {
            tracing::info!("Browser closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.client.is_none()
    }
}

impl CookieSource for Browser {
    fn cookie_pairs(&self) -> Vec<CookiePair> {
        self.list_cookies()
    }
}

impl Drop for Browser {
    fn drop(&mut self) {
        if self.client.is_some() {
            tracing::debug!("Browser for {} dropped without close", self.base);
        }
    }
}

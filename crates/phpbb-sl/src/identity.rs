//! Who is logged in, derived from cookies alone.
//!
//! phpBB never says "login succeeded". It sets `<prefix>_u` (user id) and
//! `<prefix>_sid` (session id) cookies, where the prefix is chosen at board
//! installation (`phpbb3_x4f2a`, `phpbb_pth98`, ...). Guests get user id `1`.
//! Nothing here is cached: login and logout rewrite the cookies behind our
//! back, so every question is answered from the live jar.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::browser::CookiePair;

/// User id phpBB assigns to anonymous visitors.
pub const GUEST_USER_ID: u32 = 1;

/// Anything that can enumerate its current cookies.
pub trait CookieSource {
    fn cookie_pairs(&self) -> Vec<CookiePair>;
}

impl CookieSource for [CookiePair] {
    fn cookie_pairs(&self) -> Vec<CookiePair> {
        self.to_vec()
    }
}

impl CookieSource for Vec<CookiePair> {
    fn cookie_pairs(&self) -> Vec<CookiePair> {
        self.clone()
    }
}

fn user_cookie_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^phpbb\d?_.+_u$").expect("user cookie regex is valid"))
}

fn sid_cookie_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^phpbb\d?_.+_sid$").expect("sid cookie regex is valid"))
}

fn find_cookie<S: CookieSource + ?Sized>(cookies: &S, pattern: &Regex) -> Option<String> {
    cookies
        .cookie_pairs()
        .into_iter()
        .find(|c| pattern.is_match(&c.name))
        .map(|c| c.value)
}

/// Id of the user the cookies belong to.
///
/// `None` when no user cookie is set or its value is not a number.
pub fn current_user_id<S: CookieSource + ?Sized>(cookies: &S) -> Option<u32> {
    find_cookie(cookies, user_cookie_re())?.trim().parse().ok()
}

/// The phpBB session id, echoed back on logout.
pub fn current_session_token<S: CookieSource + ?Sized>(cookies: &S) -> Option<String> {
    find_cookie(cookies, sid_cookie_re())
}

/// True iff a user id is present and it is not the guest id.
pub fn is_authenticated<S: CookieSource + ?Sized>(cookies: &S) -> bool {
    AuthState::from_cookies(cookies).is_authenticated()
}

/// Authentication state as implied by the cookies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AuthState {
    Anonymous,
    Authenticated { user_id: u32 },
}

impl AuthState {
    pub fn from_cookies<S: CookieSource + ?Sized>(cookies: &S) -> Self {
        match current_user_id(cookies) {
            Some(id) if id != GUEST_USER_ID => AuthState::Authenticated { user_id: id },
            _ => AuthState::Anonymous,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::Authenticated { .. })
    }

    pub fn user_id(&self) -> Option<u32> {
        match self {
            AuthState::Authenticated { user_id } => Some(*user_id),
            AuthState::Anonymous => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cookies() -> Vec<CookiePair> {
        vec![
            CookiePair::new("phpbb_pth98_u", "43533"),
            CookiePair::new("phpbb_pth98_k", ""),
            CookiePair::new("phpbb_pth98_sid", "ffac899f2ff73"),
        ]
    }

    fn not_logged_cookies() -> Vec<CookiePair> {
        vec![
            CookiePair::new("phpbb_pth98_u", "1"),
            CookiePair::new("phpbb_pth98_k", ""),
        ]
    }

    #[test]
    fn test_get_user_id() {
        assert_eq!(current_user_id(&cookies()), Some(43533));
    }

    #[test]
    fn test_get_sid() {
        assert_eq!(
            current_session_token(&cookies()).as_deref(),
            Some("ffac899f2ff73")
        );
    }

    #[test]
    fn test_is_logged() {
        assert!(is_authenticated(&cookies()));
        assert_eq!(
            AuthState::from_cookies(&cookies()),
            AuthState::Authenticated { user_id: 43533 }
        );
    }

    #[test]
    fn test_guest_is_not_logged() {
        let jar = not_logged_cookies();
        assert_eq!(current_user_id(&jar), Some(GUEST_USER_ID));
        assert!(!is_authenticated(&jar));
        assert_eq!(current_session_token(&jar), None);
    }

    #[test]
    fn test_no_cookies_is_anonymous() {
        let empty: Vec<CookiePair> = Vec::new();
        assert_eq!(current_user_id(&empty), None);
        assert_eq!(AuthState::from_cookies(&empty), AuthState::Anonymous);
    }

    #[test]
    fn test_non_numeric_user_id_is_absent() {
        let jar = [CookiePair::new("phpbb3_abcd_u", "not-a-number")];
        assert_eq!(current_user_id(&jar[..]), None);
        assert!(!is_authenticated(&jar[..]));
    }

    #[test]
    fn test_versioned_prefix_and_unrelated_cookies() {
        let jar = vec![
            CookiePair::new("style_cookie", "prosilver"),
            CookiePair::new("phpbb3_x4f2a_sid", "0123abcd"),
            CookiePair::new("phpbb3_x4f2a_u", "42"),
        ];
        assert_eq!(current_user_id(&jar), Some(42));
        assert_eq!(current_session_token(&jar).as_deref(), Some("0123abcd"));
        assert_eq!(AuthState::from_cookies(&jar).user_id(), Some(42));
    }
}

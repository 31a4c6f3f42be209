//! Compose page as returned after "add recipient".

use std::sync::OnceLock;

use regex::Regex;
use scraper::Html;

use super::{selector, PageModel};
use crate::error::PhpbbResult;

fn address_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"address_list\[u\]\[(\d+)\]").expect("address regex is valid"))
}

/// The user id phpBB resolved for the recipient, if it accepted the name.
///
/// A confirmed recipient shows up as a hidden input named
/// `address_list[u][<id>]`. An unknown username produces no such input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecipientConfirmation {
    pub user_id: Option<u32>,
}

impl PageModel for RecipientConfirmation {
    fn parse(document: &Html) -> PhpbbResult<Self> {
        let input_sel = selector(r#"input[name^="address_list"]"#);
        let user_id = document
            .select(&input_sel)
            .filter_map(|el| el.value().attr("name"))
            .find_map(|name| address_re().captures(name)?[1].parse().ok());

        Ok(Self { user_id })
    }
}

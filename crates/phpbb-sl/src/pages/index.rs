//! Board index, read for its birthday widget.

use std::sync::OnceLock;

use regex::Regex;
use scraper::{ElementRef, Html};

use super::{selector, text_of, PageModel};
use crate::error::PhpbbResult;
use crate::models::Birthday;

fn age_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\((\d+)\)").expect("age regex is valid"))
}

/// Age printed right after a username in the birthday list.
///
/// The board writes `Name (27),` when the member shows a birth year and just
/// `Name,` otherwise. Missing or unreadable ages are 0.
pub fn parse_age(user: ElementRef<'_>) -> u32 {
    user.next_sibling()
        .and_then(|node| node.value().as_text().map(|t| (**t).to_owned()))
        .and_then(|text| age_re().captures(&text)?[1].parse().ok())
        .unwrap_or(0)
}

/// Members whose birthday is today.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BirthdayList {
    pub birthdays: Vec<Birthday>,
}

impl PageModel for BirthdayList {
    fn parse(document: &Html) -> PhpbbResult<Self> {
        let user_sel =
            selector(".birthday-list a.username, .birthday-list a.username-coloured");
        let birthdays = document
            .select(&user_sel)
            .map(|user| Birthday {
                name: text_of(&user),
                age: parse_age(user),
            })
            .collect();

        Ok(Self { birthdays })
    }
}

//! Forum listing (`viewforum.php?f=<id>`): sub-forums, topics, pagination.

use std::sync::OnceLock;

use regex::Regex;
use scraper::Html;

use super::{selector, text_of, PageModel};
use crate::error::PhpbbResult;
use crate::models::{SubForum, Topic};

fn topic_count_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(\d+)\s+(?:sujets?|topics?)\b").expect("topic count regex is valid")
    })
}

/// One page of a forum.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForumListing {
    pub sub_forums: Vec<SubForum>,
    /// Topics shown on this page only.
    pub topics: Vec<Topic>,
    /// Total topics in the forum according to the pagination bar, 0 if absent.
    pub topic_count: u32,
    /// Page is a category index showing "active topics" instead of a listing.
    pub active_topics: bool,
}

impl PageModel for ForumListing {
    fn parse(document: &Html) -> PhpbbResult<Self> {
        let forum_sel = selector("a.forumtitle");
        let topic_sel = selector("a.topictitle");
        let pagination_sel = selector("div.pagination");
        let active_sel = selector("#active_topics");

        let sub_forums = document
            .select(&forum_sel)
            .map(|a| SubForum {
                name: text_of(&a),
                url: a.value().attr("href").unwrap_or_default().to_string(),
            })
            .collect();

        let topics = document
            .select(&topic_sel)
            .map(|a| Topic {
                name: text_of(&a),
                url: a.value().attr("href").unwrap_or_default().to_string(),
            })
            .collect();

        let topic_count = document
            .select(&pagination_sel)
            .next()
            .map(|p| text_of(&p))
            .and_then(|text| topic_count_re().captures(&text)?[1].parse().ok())
            .unwrap_or(0);

        Ok(Self {
            sub_forums,
            topics,
            topic_count,
            active_topics: document.select(&active_sel).next().is_some(),
        })
    }
}

//! Plain-text and JSON rendering of command results.

use std::fmt::Write as _;

use serde::Serialize;

use phpbb_sl::{Birthday, MemberInfo, Message, SubForum, Topic};

/// Print `value` as pretty JSON, or as the text `render` makes of it.
pub fn emit<T, R>(value: &T, json: bool, render: R) -> anyhow::Result<()>
where
    T: Serialize + ?Sized,
    R: FnOnce(&T) -> String,
{
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        print!("{}", render(value));
    }
    Ok(())
}

/// One line per message: id, unread marker, sender, subject.
pub fn message_list(messages: &[Message]) -> String {
    if messages.is_empty() {
        return "no messages\n".to_string();
    }
    let mut out = String::new();
    for m in messages {
        let marker = if m.unread { '*' } else { ' ' };
        let _ = writeln!(out, "{:>8} {marker} {:<20} {}", m.id, m.sender, m.subject);
    }
    out
}

/// Header and body of read messages.
pub fn message_bodies(messages: &[Message]) -> String {
    let mut out = String::new();
    for m in messages {
        let _ = writeln!(out, "From: {}\nSubject: {}\n", m.sender, m.subject);
        let _ = writeln!(out, "{}\n", m.content.as_deref().unwrap_or_default());
    }
    out
}

pub fn birthdays(list: &[Birthday]) -> String {
    if list.is_empty() {
        return "no birthdays today\n".to_string();
    }
    let mut out = String::new();
    for b in list {
        match b.age {
            0 => {
                let _ = writeln!(out, "{}", b.name);
            }
            age => {
                let _ = writeln!(out, "{} ({age})", b.name);
            }
        }
    }
    out
}

pub fn member(name: &str, info: &MemberInfo) -> String {
    match info.user_id {
        None => format!("{name}: no such member\n"),
        Some(id) => format!(
            "{name}: id {id}, rank {}\n",
            info.rank.as_deref().unwrap_or("-")
        ),
    }
}

/// Result of `explore`.
#[derive(Debug, Clone, Serialize)]
pub struct Exploration {
    pub sub_forums: Vec<SubForum>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topics: Option<Vec<Topic>>,
}

pub fn exploration(found: &Exploration) -> String {
    let mut out = String::new();
    for f in &found.sub_forums {
        let _ = writeln!(out, "[forum] {}  {}", f.name, f.url);
    }
    for t in found.topics.iter().flatten() {
        let _ = writeln!(out, "[topic] {}  {}", t.name, t.url);
    }
    out
}

//! Member profile page (`memberlist.php?mode=viewprofile&un=<name>`).

use std::sync::OnceLock;

use regex::Regex;
use scraper::Html;

use super::{selector, text_of, PageModel};
use crate::error::PhpbbResult;
use crate::models::MemberInfo;

fn user_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"&u=(\d+)").expect("user id regex is valid"))
}

/// Id and rank as shown on a profile page. Either may be missing, e.g. when
/// the member does not exist and the board shows an error page instead.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberProfile {
    pub user_id: Option<u32>,
    pub rank: Option<String>,
}

impl PageModel for MemberProfile {
    fn parse(document: &Html) -> PhpbbResult<Self> {
        let canonical_sel = selector(r#"link[rel="canonical"]"#);
        let user_id = document
            .select(&canonical_sel)
            .next()
            .and_then(|link| link.value().attr("href"))
            .and_then(|href| user_id_re().captures(href)?[1].parse().ok());

        let dd_sel = selector("dd");
        let rank = document
            .select(&dd_sel)
            .next()
            .map(|dd| text_of(&dd))
            .filter(|r| !r.is_empty());

        Ok(Self { user_id, rank })
    }
}

impl From<MemberProfile> for MemberInfo {
    fn from(p: MemberProfile) -> Self {
        MemberInfo {
            user_id: p.user_id,
            rank: p.rank,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROFILE: &str = r#"
    <html><head>
      <link rel="canonical" href="https://forum.test/memberlist.php?mode=viewprofile&amp;u=43533">
    </head><body>
      <form method="post" action="./memberlist.php?mode=group" id="viewprofile">
        <dl class="left-box">
          <dd style="text-align: center;">Modérateur</dd>
        </dl>
        <dl class="left-box details profile-details">
          <dt>Nom d’utilisateur :</dt>
          <dd><span>Foobar</span></dd>
        </dl>
      </form>
    </body></html>"#;

    #[test]
    fn test_parse_profile() {
        let profile = MemberProfile::parse(&Html::parse_document(PROFILE)).unwrap();
        assert_eq!(profile.user_id, Some(43533));
        assert_eq!(profile.rank.as_deref(), Some("Modérateur"));
    }

    #[test]
    fn test_unknown_member_gives_nothing() {
        let html = r#"<html><body><div class="panel"><p>L’utilisateur demandé n’existe pas.</p></div></body></html>"#;
        let profile = MemberProfile::parse(&Html::parse_document(html)).unwrap();
        assert_eq!(profile, MemberProfile::default());
        let info: MemberInfo = profile.into();
        assert_eq!(info.user_id, None);
        assert_eq!(info.rank, None);
    }
}

//! Single private message view (`ucp.php?i=pm&mode=view&f=..&p=..`).

use scraper::{ElementRef, Html, Node};

use super::{selector, PageModel};
use crate::error::{PhpbbError, PhpbbResult};

/// The body of a displayed message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageView {
    pub content: String,
}

impl PageModel for MessageView {
    fn parse(document: &Html) -> PhpbbResult<Self> {
        let content_sel = selector("div.content");
        let content = document
            .select(&content_sel)
            .next()
            .ok_or_else(|| PhpbbError::Markup("message page without div.content".into()))?;

        Ok(Self {
            content: body_text(content),
        })
    }
}

/// Text of a post body, with `<br>` turned back into newlines.
fn body_text(el: ElementRef<'_>) -> String {
    let mut out = String::new();
    for node in el.descendants() {
        match node.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(e) if e.name() == "br" => out.push('\n'),
            _ => {}
        }
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_message_body() {
        let html = r#"
        <div id="post-11850" class="post pm">
          <h3 class="first">Sent by python.</h3>
          <div class="content">
            3f1e9a0c<br />second line
          </div>
        </div>"#;
        let view = MessageView::parse(&Html::parse_document(html)).unwrap();
        assert_eq!(view.content, "3f1e9a0c\nsecond line");
    }

    #[test]
    fn test_inline_markup_is_flattened() {
        let html = r#"<div class="content">Hello <strong>world</strong>!</div>"#;
        let view = MessageView::parse(&Html::parse_document(html)).unwrap();
        assert_eq!(view.content, "Hello world!");
    }

    #[test]
    fn test_missing_body_is_markup_error() {
        let html = r#"<div class="panel">Le message demandé n’existe pas.</div>"#;
        let err = MessageView::parse(&Html::parse_document(html)).unwrap_err();
        assert!(matches!(err, PhpbbError::Markup(_)));
    }
}

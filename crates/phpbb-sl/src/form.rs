//! HTML form extraction.
//!
//! phpBB embeds its anti-CSRF material (`form_token`, `creation_time`, `sid`)
//! as hidden inputs, and checks that they come back unchanged. So every
//! action starts by scraping the live form and only then overwrites the
//! fields it cares about.

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::{PhpbbError, PhpbbResult};

/// Input types that trigger a submission instead of carrying data.
const NON_DATA_INPUT_TYPES: &[&str] = &["submit", "button", "image", "reset", "file"];

/// Ordered form fields. Setting an existing name replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormPayload {
    fields: Vec<(String, String)>,
}

impl FormPayload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Set a field, replacing any previous value. Numbers are welcome.
    pub fn set(&mut self, name: impl Into<String>, value: impl ToString) -> &mut Self {
        let name = name.into();
        let value = value.to_string();
        match self.fields.iter_mut().find(|(k, _)| *k == name) {
            Some((_, v)) => *v = value,
            None => self.fields.push((name, value)),
        }
        self
    }

    /// Remove a field, returning its value if it was present.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        let idx = self.fields.iter().position(|(k, _)| k == name)?;
        Some(self.fields.remove(idx).1)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// The fields as url-encodable pairs.
    pub fn as_pairs(&self) -> &[(String, String)] {
        &self.fields
    }
}

impl<K: Into<String>, V: ToString> FromIterator<(K, V)> for FormPayload {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut payload = FormPayload::new();
        for (k, v) in iter {
            payload.set(k, v);
        }
        payload
    }
}

/// A scraped form: where it posts to and what it would send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Form {
    /// Raw `action` attribute, usually relative (`./ucp.php?i=pm&mode=compose`).
    pub action: String,
    pub fields: FormPayload,
}

impl Form {
    /// Resolve the action against the URL of the page the form came from.
    pub fn action_url(&self, page_url: &Url) -> PhpbbResult<Url> {
        Ok(page_url.join(&self.action)?)
    }
}

fn parse_selector(selector: &str) -> PhpbbResult<Selector> {
    Selector::parse(selector).map_err(|e| PhpbbError::InvalidSelector(format!("{selector}: {e:?}")))
}

/// Extract the first form matching `selector` with its current field values.
///
/// Values follow what a browser would submit, minus the submit button:
/// named inputs (checkboxes and radios only when checked), textarea
/// contents, and the selected option of each select.
pub fn extract_form(document: &Html, selector: &str) -> PhpbbResult<Form> {
    let form_sel = parse_selector(selector)?;
    let form = document
        .select(&form_sel)
        .next()
        .ok_or_else(|| PhpbbError::FormNotFound {
            selector: selector.to_string(),
        })?;

    let action = form
        .value()
        .attr("action")
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .ok_or_else(|| PhpbbError::MissingAction {
            selector: selector.to_string(),
        })?
        .to_string();

    let field_sel = Selector::parse("input, textarea, select").expect("field selector is valid");
    let mut fields = FormPayload::new();

    for field in form.select(&field_sel) {
        let Some(name) = field.value().attr("name").filter(|n| !n.is_empty()) else {
            continue;
        };
        if let Some(value) = field_value(&field) {
            fields.set(name, value);
        }
    }

    Ok(Form { action, fields })
}

/// The value a browser would submit for one field, if any.
fn field_value(field: &ElementRef<'_>) -> Option<String> {
    let element = field.value();
    match element.name() {
        "textarea" => Some(field.text().collect()),
        "select" => {
            let option_sel = Selector::parse("option").expect("option selector is valid");
            let mut options = field.select(&option_sel);
            let first = options.next()?;
            let chosen = std::iter::once(first)
                .chain(options)
                .find(|o| o.value().attr("selected").is_some())
                .unwrap_or(first);
            Some(
                chosen
                    .value()
                    .attr("value")
                    .map(String::from)
                    .unwrap_or_else(|| chosen.text().collect::<String>().trim().to_string()),
            )
        }
        _ => {
            let input_type = element.attr("type").unwrap_or("text").to_ascii_lowercase();
            if NON_DATA_INPUT_TYPES.contains(&input_type.as_str()) {
                return None;
            }
            if matches!(input_type.as_str(), "checkbox" | "radio") {
                if element.attr("checked").is_none() {
                    return None;
                }
                return Some(element.attr("value").unwrap_or("on").to_string());
            }
            Some(element.attr("value").unwrap_or("").to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMPOSE: &str = r#"
    <html><body>
      <form id="postform" method="post" action="./ucp.php?i=pm&amp;mode=compose&amp;sid=abc">
        <input type="text" name="username_list" value="" />
        <input type="submit" name="add_to" value="Ajouter" />
        <input type="text" name="subject" value="Re: hello" />
        <input type="radio" name="icon" value="0" checked="checked" />
        <input type="radio" name="icon" value="1" />
        <input type="checkbox" name="disable_smilies" />
        <input type="checkbox" name="attach_sig" checked="checked" />
        <textarea name="message">Quoted text</textarea>
        <select name="addbbcode20">
          <option value="50">Tiny</option>
          <option value="100" selected="selected">Normal</option>
        </select>
        <input type="hidden" name="creation_time" value="1700000000" />
        <input type="hidden" name="form_token" value="deadbeef" />
        <input type="submit" name="post" value="Envoyer" />
      </form>
    </body></html>
    "#;

    #[test]
    fn test_extract_compose_form() {
        let doc = Html::parse_document(COMPOSE);
        let form = extract_form(&doc, "form#postform").unwrap();

        assert_eq!(form.action, "./ucp.php?i=pm&mode=compose&sid=abc");
        assert_eq!(form.fields.get("form_token"), Some("deadbeef"));
        assert_eq!(form.fields.get("creation_time"), Some("1700000000"));
        assert_eq!(form.fields.get("username_list"), Some(""));
        assert_eq!(form.fields.get("icon"), Some("0"));
        assert_eq!(form.fields.get("attach_sig"), Some("on"));
        assert_eq!(form.fields.get("message"), Some("Quoted text"));
        assert_eq!(form.fields.get("addbbcode20"), Some("100"));
    }

    #[test]
    fn test_submit_inputs_are_excluded() {
        let doc = Html::parse_document(COMPOSE);
        let form = extract_form(&doc, "form#postform").unwrap();
        assert!(!form.fields.contains("add_to"));
        assert!(!form.fields.contains("post"));
        assert!(!form.fields.contains("disable_smilies"));
    }

    #[test]
    fn test_form_not_found() {
        let doc = Html::parse_document(COMPOSE);
        let err = extract_form(&doc, "form#login").unwrap_err();
        assert!(matches!(err, PhpbbError::FormNotFound { .. }));
    }

    #[test]
    fn test_missing_action() {
        let doc = Html::parse_document(
            r#"<form id="confirm" method="post"><input type="hidden" name="sess" value="x"></form>"#,
        );
        let err = extract_form(&doc, "form#confirm").unwrap_err();
        assert!(matches!(err, PhpbbError::MissingAction { .. }));
    }

    #[test]
    fn test_invalid_selector() {
        let doc = Html::parse_document(COMPOSE);
        let err = extract_form(&doc, "form[").unwrap_err();
        assert!(matches!(err, PhpbbError::InvalidSelector(_)));
    }

    #[test]
    fn test_action_url_resolution() {
        let doc = Html::parse_document(COMPOSE);
        let form = extract_form(&doc, "form#postform").unwrap();
        let page = Url::parse("https://forum.test/board/ucp.php?i=pm&mode=compose").unwrap();
        assert_eq!(
            form.action_url(&page).unwrap().as_str(),
            "https://forum.test/board/ucp.php?i=pm&mode=compose&sid=abc"
        );
    }

    #[test]
    fn test_payload_set_replaces_in_place() {
        let mut payload: FormPayload = [("a", "1"), ("b", "2")].into_iter().collect();
        payload.set("a", 10).set("c", "3");
        let names: Vec<&str> = payload.iter().map(|(k, _)| k).collect();
        assert_eq!(names, ["a", "b", "c"]);
        assert_eq!(payload.get("a"), Some("10"));
        assert_eq!(payload.remove("b"), Some("2".to_string()));
        assert_eq!(payload.remove("b"), None);
        assert_eq!(payload.len(), 2);
    }
}

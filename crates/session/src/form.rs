//! HTML scraping for the login form and the page-embedded CSRF token.
//!
//! `scraper::Html` is not `Send`, so everything here is synchronous and returns owned data
//! before the caller awaits again.

use scraper::{ElementRef, Html, Selector};
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FormError {
    #[error("invalid CSS selector `{selector}`")]
    Selector { selector: String },
    #[error("no form containing a `{field}` input was found")]
    LoginFormMissing { field: String },
}

/// The login form as served, reduced to what a POST needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoginForm {
    pub action: Option<String>,
    pub username_name: String,
    pub password_name: String,
    pub hidden_fields: Vec<(String, String)>,
}

impl LoginForm {
    /// Hidden inputs followed by the credentials.
    pub fn fields(&self, username: &str, password: &str) -> Vec<(String, String)> {
        let mut fields = self.hidden_fields.clone();
        fields.push((self.username_name.clone(), username.to_string()));
        fields.push((self.password_name.clone(), password.to_string()));
        fields
    }
}

fn selector(raw: &str) -> Result<Selector, FormError> {
    Selector::parse(raw).map_err(|_| FormError::Selector { selector: raw.to_string() })
}

/// Matches an input by `name` first, then by `id`.
fn find_input<'a>(form: ElementRef<'a>, inputs: &Selector, field: &str) -> Option<ElementRef<'a>> {
    form.select(inputs)
        .find(|input| input.value().attr("name") == Some(field))
        .or_else(|| form.select(inputs).find(|input| input.value().id() == Some(field)))
}

pub fn parse_login_form(
    html: &str,
    username_field: &str,
    password_field: &str,
) -> Result<LoginForm, FormError> {
    let document = Html::parse_document(html);
    let forms = selector("form")?;
    let inputs = selector("input")?;

    for form in document.select(&forms) {
        let Some(username) = find_input(form, &inputs, username_field) else {
            continue;
        };
        let username_name = username.value().attr("name").unwrap_or(username_field).to_string();
        let password_name = find_input(form, &inputs, password_field)
            .and_then(|input| input.value().attr("name"))
            .unwrap_or(password_field)
            .to_string();

        let hidden_fields = form
            .select(&inputs)
            .filter(|input| {
                input
                    .value()
                    .attr("type")
                    .map(|kind| kind.eq_ignore_ascii_case("hidden"))
                    .unwrap_or(false)
            })
            .filter_map(|input| {
                let name = input.value().attr("name")?;
                Some((name.to_string(), input.value().attr("value").unwrap_or_default().to_string()))
            })
            .collect();

        return Ok(LoginForm {
            action: form
                .value()
                .attr("action")
                .map(str::trim)
                .filter(|action| !action.is_empty())
                .map(str::to_string),
            username_name,
            password_name,
            hidden_fields,
        });
    }

    Err(FormError::LoginFormMissing { field: username_field.to_string() })
}

/// Whether the page still shows a password input, i.e. the login did not go through.
pub fn shows_login_form(html: &str, password_field: &str) -> bool {
    let document = Html::parse_document(html);
    let Ok(inputs) = selector("input") else {
        return false;
    };
    // Bound so the `Select` temporary is dropped before `document`.
    let found = document.select(&inputs).any(|input| {
        input.value().attr("name") == Some(password_field)
            || input.value().id() == Some(password_field)
    });
    found
}

/// First non-empty `value` (inputs) or `content` (meta tags) of an element matching `raw_selector`.
pub fn extract_token(html: &str, raw_selector: &str) -> Result<Option<String>, FormError> {
    let document = Html::parse_document(html);
    let selector = selector(raw_selector)?;

    let token = document
        .select(&selector)
        .filter_map(|element| {
            element.value().attr("value").or_else(|| element.value().attr("content"))
        })
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(str::to_string);
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::{extract_token, parse_login_form, shows_login_form, FormError};

    const LOGIN_PAGE: &str = r#"
<html><body>
  <form id="search" action="/search"><input name="q"></form>
  <form id="sign-in-form" method="post" action="/account/en-GB/login">
    <input type="hidden" name="_csrf" value="login-csrf">
    <input type="hidden" name="state" value="abc">
    <input type="email" id="username" name="username">
    <input type="password" id="password" name="password">
    <button type="submit">Sign in</button>
  </form>
</body></html>"#;

    #[test]
    fn login_form_keeps_hidden_inputs_and_field_names() {
        let form = parse_login_form(LOGIN_PAGE, "username", "password").expect("form");

        assert_eq!(form.action.as_deref(), Some("/account/en-GB/login"));
        assert_eq!(
            form.hidden_fields,
            vec![
                ("_csrf".to_string(), "login-csrf".to_string()),
                ("state".to_string(), "abc".to_string()),
            ]
        );
        let fields = form.fields("me@example.com", "pw");
        assert_eq!(fields[2], ("username".to_string(), "me@example.com".to_string()));
        assert_eq!(fields[3], ("password".to_string(), "pw".to_string()));
    }

    #[test]
    fn login_form_matches_fields_by_id() {
        let html = r#"<form><input id="user" name="login[email]"><input id="pass" name="login[secret]"></form>"#;
        let form = parse_login_form(html, "user", "pass").expect("form");

        assert_eq!(form.action, None);
        assert_eq!(form.username_name, "login[email]");
        assert_eq!(form.password_name, "login[secret]");
    }

    #[test]
    fn missing_login_form_is_reported() {
        let error = parse_login_form("<p>maintenance</p>", "username", "password")
            .expect_err("no form");
        assert_eq!(error, FormError::LoginFormMissing { field: "username".to_string() });
    }

    #[test]
    fn token_is_read_from_input_or_meta() {
        let input = r#"<input type="hidden" name="_csrf" value=" slot-token ">"#;
        let meta = r#"<head><meta name="_csrf" content="meta-token"></head>"#;

        assert_eq!(extract_token(input, "[name=_csrf]").expect("ok").as_deref(), Some("slot-token"));
        assert_eq!(extract_token(meta, "[name=_csrf]").expect("ok").as_deref(), Some("meta-token"));
        assert_eq!(extract_token("<p></p>", "[name=_csrf]").expect("ok"), None);
    }

    #[test]
    fn bad_selector_is_an_error() {
        let error = extract_token("<p></p>", "[[").expect_err("bad selector");
        assert!(matches!(error, FormError::Selector { .. }));
    }

    #[test]
    fn detects_login_page_after_submit() {
        assert!(shows_login_form(LOGIN_PAGE, "password"));
        assert!(!shows_login_form("<h1>Your account</h1>", "password"));
    }
}

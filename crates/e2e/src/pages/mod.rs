//! Page objects
//!
//! One type per screen. Getters return a [`Locator`]; actions return the
//! fixed sequence of browser steps that performs them. Specs reach page
//! objects by name: `{ page: article, get: article_title }` for getters and
//! `call: create_article.publish_article` for actions.

mod article;
mod create_article;
mod home;
mod login;
mod profile;
mod sign_up;

pub use article::ArticlePage;
pub use create_article::CreateArticlePage;
pub use home::HomePage;
pub use login::LoginPage;
pub use profile::ProfilePage;
pub use sign_up::SignUpPage;

use crate::error::{E2eError, E2eResult};
use crate::locator::Locator;
use crate::spec::{Target, TestStep};

/// Elements present on every screen
pub trait BasePage {
    fn header(&self) -> Locator {
        Locator::css(".navbar-light")
    }

    fn footer(&self) -> Locator {
        Locator::css("footer > div.container")
    }

    fn banner(&self) -> Locator {
        Locator::css(".banner")
    }

    fn user_icon(&self) -> Locator {
        Locator::css(".user-pic")
    }

    fn new_article_btn(&self) -> Locator {
        Locator::with_text("a", "New Article")
    }

    fn user_name_in_header(&self, username: &str) -> Locator {
        Locator::with_text("a", username)
    }

    fn settings_btn(&self) -> Locator {
        Locator::css(r#"a[href="/settings"]"#)
    }

    fn sign_in_header_btn(&self) -> Locator {
        Locator::css(r#"a[href="/login"]"#)
    }

    /// Assert a footer link with the given text is visible
    fn check_footer_link_text(&self, text: &str) -> Vec<TestStep> {
        vec![
            log("Verifying that footer contains expected link text..."),
            TestStep::Assert {
                target: self.footer().find("a").contains(text).into(),
                visible: Some(true),
                exists: None,
                text_contains: None,
                value: None,
                attribute: None,
            },
        ]
    }
}

/// Name-based access used by spec files
pub trait PageObject: BasePage + Sync {
    fn name(&self) -> &'static str;

    fn locate(&self, getter: &str, args: &[String]) -> E2eResult<Locator>;

    fn perform(&self, action: &str, args: &[String]) -> E2eResult<Vec<TestStep>>;
}

/// Look up a page object by the name used in spec files
pub fn page_object(name: &str) -> E2eResult<&'static dyn PageObject> {
    match name {
        "home" => Ok(&HomePage),
        "article" => Ok(&ArticlePage),
        "create_article" | "editor" => Ok(&CreateArticlePage),
        "login" => Ok(&LoginPage),
        "sign_up" | "register" => Ok(&SignUpPage),
        "profile" | "settings" => Ok(&ProfilePage),
        other => Err(E2eError::UnknownPageCall(format!("no page named '{}'", other))),
    }
}

/// Resolve a step target to a locator
pub fn resolve_target(target: &Target) -> E2eResult<Locator> {
    match target {
        Target::Page { page, get, args } => page_object(page)?.locate(get, args),
        Target::Selector { selector, text, nth } => {
            let mut locator = Locator::css(selector.clone());
            if let Some(text) = text {
                locator = locator.has_text(text.clone());
            }
            if let Some(index) = nth {
                locator = locator.nth(*index);
            }
            Ok(locator)
        }
        Target::Locator(locator) => Ok(locator.clone()),
    }
}

/// Run a `page.action` call
pub fn perform(call: &str, args: &[String]) -> E2eResult<Vec<TestStep>> {
    let (page, action) = call
        .split_once('.')
        .ok_or_else(|| E2eError::UnknownPageCall(format!("'{}' is not of the form page.action", call)))?;
    page_object(page)?.perform(action, args)
}

/// Replace page-object calls with the steps they stand for
pub fn expand_steps(steps: &[TestStep]) -> E2eResult<Vec<TestStep>> {
    let mut expanded = Vec::with_capacity(steps.len());
    for step in steps {
        match step {
            TestStep::Page { call, args } => expanded.extend(perform(call, args)?),
            other => expanded.push(other.clone()),
        }
    }
    Ok(expanded)
}

/// Getters every page shares
fn locate_base(page: &(impl BasePage + ?Sized), name: &str, getter: &str, args: &[String]) -> E2eResult<Locator> {
    let call = format!("{}.{}", name, getter);
    match getter {
        "header" => Ok(page.header()),
        "footer" => Ok(page.footer()),
        "banner" => Ok(page.banner()),
        "user_icon" => Ok(page.user_icon()),
        "new_article_btn" => Ok(page.new_article_btn()),
        "user_name_in_header" => Ok(page.user_name_in_header(arg(args, 0, &call)?)),
        "settings_btn" => Ok(page.settings_btn()),
        "sign_in_header_btn" => Ok(page.sign_in_header_btn()),
        _ => Err(E2eError::UnknownPageCall(call)),
    }
}

/// Actions every page shares
fn perform_base(page: &(impl BasePage + ?Sized), name: &str, action: &str, args: &[String]) -> E2eResult<Vec<TestStep>> {
    let call = format!("{}.{}", name, action);
    match action {
        "check_footer_link_text" => Ok(page.check_footer_link_text(arg(args, 0, &call)?)),
        _ => Err(E2eError::UnknownPageCall(call)),
    }
}

fn arg<'a>(args: &'a [String], index: usize, call: &str) -> E2eResult<&'a str> {
    args.get(index).map(String::as_str).ok_or_else(|| {
        E2eError::UnknownPageCall(format!("{} expects at least {} argument(s)", call, index + 1))
    })
}

fn index_arg(args: &[String], index: usize, call: &str) -> E2eResult<usize> {
    let raw = arg(args, index, call)?;
    raw.parse()
        .map_err(|_| E2eError::UnknownPageCall(format!("{}: '{}' is not an index", call, raw)))
}

fn log(message: &str) -> TestStep {
    TestStep::Log {
        message: message.to_string(),
    }
}

fn click(locator: Locator) -> TestStep {
    TestStep::Click { target: locator.into() }
}

fn type_into(locator: Locator, text: &str) -> TestStep {
    TestStep::Type {
        target: locator.into(),
        text: text.to_string(),
    }
}

fn fill(locator: Locator, value: &str) -> TestStep {
    TestStep::Fill {
        target: locator.into(),
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_shared_getters_on_every_page() {
        for name in ["home", "article", "create_article", "login", "sign_up", "profile"] {
            let page = page_object(name).unwrap();
            assert_eq!(page.locate("header", &[]).unwrap(), Locator::css(".navbar-light"));
            assert_eq!(
                page.locate("user_name_in_header", &strings(&["alice"])).unwrap(),
                Locator::with_text("a", "alice")
            );
        }
    }

    #[test]
    fn test_unknown_page_and_getter() {
        assert!(matches!(page_object("nowhere"), Err(E2eError::UnknownPageCall(_))));
        assert!(page_object("home").unwrap().locate("missing", &[]).is_err());
        assert!(perform("no_dot", &[]).is_err());
    }

    #[test]
    fn test_missing_argument_is_reported() {
        let err = page_object("article").unwrap().locate("article_title", &[]).unwrap_err();
        assert!(err.to_string().contains("article.article_title"));
    }

    #[test]
    fn test_resolve_selector_target() {
        let target = Target::Selector {
            selector: "li".to_string(),
            text: Some("Invalid email".to_string()),
            nth: Some(0),
        };
        assert_eq!(
            resolve_target(&target).unwrap(),
            Locator::with_text("li", "Invalid email").nth(0)
        );
    }

    #[test]
    fn test_expand_steps_inlines_page_calls() {
        let steps = vec![
            TestStep::Visit { url: "/login".to_string() },
            TestStep::Page {
                call: "login.submit_login_form".to_string(),
                args: strings(&["a@example.com", "password1"]),
            },
        ];
        let expanded = expand_steps(&steps).unwrap();
        assert_eq!(expanded.len(), 6);
        assert!(expanded.iter().all(|s| !matches!(s, TestStep::Page { .. })));
    }

    #[test]
    fn test_footer_link_check() {
        let steps = page_object("home")
            .unwrap()
            .perform("check_footer_link_text", &strings(&["Thinkster"]))
            .unwrap();
        match &steps[1] {
            TestStep::Assert { target: Target::Locator(locator), visible, .. } => {
                assert_eq!(*visible, Some(true));
                assert_eq!(locator, &Locator::css("footer > div.container").find("a").contains("Thinkster"));
            }
            other => panic!("unexpected step {:?}", other),
        }
    }
}

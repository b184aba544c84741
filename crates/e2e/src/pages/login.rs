use super::{arg, click, locate_base, log, perform_base, type_into, BasePage, PageObject};
use crate::error::E2eResult;
use crate::locator::Locator;
use crate::spec::TestStep;

/// Sign-in screen
pub struct LoginPage;

impl BasePage for LoginPage {}

impl LoginPage {
    pub fn email_field(&self) -> Locator {
        Locator::test_id("input-email")
    }

    pub fn password_field(&self) -> Locator {
        Locator::test_id("input-password")
    }

    pub fn sign_in_submit_btn(&self) -> Locator {
        Locator::test_id("btn-submit")
    }

    pub fn error_message(&self, error: &str) -> Locator {
        Locator::css("li").contains(error)
    }

    pub fn submit_login_form(&self, email: &str, password: &str) -> Vec<TestStep> {
        vec![
            log("Filling login form"),
            type_into(self.email_field(), email),
            type_into(self.password_field(), password),
            log("Submitting login form"),
            click(self.sign_in_submit_btn()),
        ]
    }
}

impl PageObject for LoginPage {
    fn name(&self) -> &'static str {
        "login"
    }

    fn locate(&self, getter: &str, args: &[String]) -> E2eResult<Locator> {
        match getter {
            "email_field" => Ok(self.email_field()),
            "password_field" => Ok(self.password_field()),
            "sign_in_submit_btn" => Ok(self.sign_in_submit_btn()),
            "error_message" => Ok(self.error_message(arg(args, 0, "login.error_message")?)),
            _ => locate_base(self, self.name(), getter, args),
        }
    }

    fn perform(&self, action: &str, args: &[String]) -> E2eResult<Vec<TestStep>> {
        match action {
            "submit_login_form" => {
                let call = "login.submit_login_form";
                Ok(self.submit_login_form(arg(args, 0, call)?, arg(args, 1, call)?))
            }
            _ => perform_base(self, self.name(), action, args),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_login_form_types_then_clicks() {
        let steps = LoginPage.submit_login_form("a@example.com", "secret");
        assert_eq!(steps.len(), 5);
        assert_eq!(
            steps[1],
            TestStep::Type {
                target: Locator::test_id("input-email").into(),
                text: "a@example.com".to_string(),
            }
        );
        assert_eq!(steps[4], TestStep::Click { target: Locator::test_id("btn-submit").into() });
    }
}

use super::{arg, click, locate_base, log, perform_base, type_into, BasePage, PageObject};
use crate::error::E2eResult;
use crate::locator::Locator;
use crate::spec::TestStep;

/// Registration screen
pub struct SignUpPage;

impl BasePage for SignUpPage {}

impl SignUpPage {
    pub fn username_field(&self) -> Locator {
        Locator::placeholder("Username")
    }

    pub fn email_field(&self) -> Locator {
        Locator::placeholder("Email")
    }

    pub fn password_field(&self) -> Locator {
        Locator::placeholder("Password")
    }

    pub fn sign_up_button(&self) -> Locator {
        Locator::with_text("button", "Sign up")
    }

    pub fn error_message(&self, error: &str) -> Locator {
        Locator::css("li").contains(error)
    }

    pub fn fill_sign_up_form(&self, username: &str, email: &str, password: &str) -> Vec<TestStep> {
        vec![
            log("Filling sign up form"),
            type_into(self.username_field(), username),
            type_into(self.email_field(), email),
            type_into(self.password_field(), password),
            log("Submitting sign up form"),
            click(self.sign_up_button()),
        ]
    }
}

impl PageObject for SignUpPage {
    fn name(&self) -> &'static str {
        "sign_up"
    }

    fn locate(&self, getter: &str, args: &[String]) -> E2eResult<Locator> {
        match getter {
            "username_field" => Ok(self.username_field()),
            "email_field" => Ok(self.email_field()),
            "password_field" => Ok(self.password_field()),
            "sign_up_button" => Ok(self.sign_up_button()),
            "error_message" => Ok(self.error_message(arg(args, 0, "sign_up.error_message")?)),
            _ => locate_base(self, self.name(), getter, args),
        }
    }

    fn perform(&self, action: &str, args: &[String]) -> E2eResult<Vec<TestStep>> {
        match action {
            "fill_sign_up_form" => {
                let call = "sign_up.fill_sign_up_form";
                Ok(self.fill_sign_up_form(arg(args, 0, call)?, arg(args, 1, call)?, arg(args, 2, call)?))
            }
            _ => perform_base(self, self.name(), action, args),
        }
    }
}

use super::{arg, fill, locate_base, log, perform_base, BasePage, PageObject};
use crate::error::E2eResult;
use crate::locator::Locator;
use crate::spec::TestStep;

/// Settings screen where a user edits their profile
pub struct ProfilePage;

impl BasePage for ProfilePage {}

impl ProfilePage {
    /// Any button by its visible label
    pub fn btn(&self, name: &str) -> Locator {
        Locator::with_text("button", name)
    }

    pub fn username_field(&self) -> Locator {
        Locator::placeholder("Username")
    }

    pub fn bio_field(&self) -> Locator {
        Locator::placeholder("Short bio about you")
    }

    pub fn email_field(&self) -> Locator {
        Locator::placeholder("Email")
    }

    pub fn password_field(&self) -> Locator {
        Locator::placeholder("New Password")
    }

    pub fn error_message(&self, error: &str) -> Locator {
        Locator::css("li").contains(error)
    }

    /// Overwrite every profile field; submitting is left to the caller
    pub fn edit_profile(&self, username: &str, bio: &str, email: &str, password: &str) -> Vec<TestStep> {
        vec![
            log("Editing profile form"),
            fill(self.username_field(), username),
            fill(self.bio_field(), bio),
            fill(self.email_field(), email),
            fill(self.password_field(), password),
        ]
    }
}

impl PageObject for ProfilePage {
    fn name(&self) -> &'static str {
        "profile"
    }

    fn locate(&self, getter: &str, args: &[String]) -> E2eResult<Locator> {
        match getter {
            "btn" => Ok(self.btn(arg(args, 0, "profile.btn")?)),
            "username_field" => Ok(self.username_field()),
            "bio_field" => Ok(self.bio_field()),
            "email_field" => Ok(self.email_field()),
            "password_field" => Ok(self.password_field()),
            "error_message" => Ok(self.error_message(arg(args, 0, "profile.error_message")?)),
            _ => locate_base(self, self.name(), getter, args),
        }
    }

    fn perform(&self, action: &str, args: &[String]) -> E2eResult<Vec<TestStep>> {
        match action {
            "edit_profile" => {
                let call = "profile.edit_profile";
                Ok(self.edit_profile(
                    arg(args, 0, call)?,
                    arg(args, 1, call)?,
                    arg(args, 2, call)?,
                    arg(args, 3, call)?,
                ))
            }
            _ => perform_base(self, self.name(), action, args),
        }
    }
}

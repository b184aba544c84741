use super::{arg, locate_base, perform_base, BasePage, PageObject};
use crate::error::E2eResult;
use crate::locator::Locator;
use crate::spec::TestStep;

/// Global feed
pub struct HomePage;

impl BasePage for HomePage {}

impl HomePage {
    pub fn author_name(&self, author_name: &str) -> Locator {
        Locator::with_text("a", author_name)
    }

    pub fn title(&self, title: &str) -> Locator {
        Locator::with_text("h1", title)
    }

    pub fn description(&self, description: &str) -> Locator {
        Locator::with_text("p", description)
    }

    /// Tag in the popular-tags list
    pub fn tag_by_text(&self, tag_text: &str) -> Locator {
        Locator::css("ul.tag-list").contains(tag_text)
    }

    /// Tag list inside the preview of an article by `user`
    pub fn users_tag(&self, tag_text: &str, user: &str) -> Locator {
        Locator::with_text("div.article-preview", user)
            .find("ul.tag-list")
            .has_text(tag_text)
    }

    /// Favorite button of the article preview by `author_name`.
    ///
    /// The second author link sits in the preview meta block; its
    /// grandparent holds the button.
    pub fn like_btn_by_author_name(&self, author_name: &str) -> Locator {
        Locator::with_text("a", author_name)
            .nth(1)
            .parent()
            .parent()
            .find("button")
    }
}

impl PageObject for HomePage {
    fn name(&self) -> &'static str {
        "home"
    }

    fn locate(&self, getter: &str, args: &[String]) -> E2eResult<Locator> {
        match getter {
            "author_name" => Ok(self.author_name(arg(args, 0, "home.author_name")?)),
            "title" => Ok(self.title(arg(args, 0, "home.title")?)),
            "description" => Ok(self.description(arg(args, 0, "home.description")?)),
            "tag_by_text" => Ok(self.tag_by_text(arg(args, 0, "home.tag_by_text")?)),
            "users_tag" => Ok(self.users_tag(arg(args, 0, "home.users_tag")?, arg(args, 1, "home.users_tag")?)),
            "like_btn_by_author_name" => {
                Ok(self.like_btn_by_author_name(arg(args, 0, "home.like_btn_by_author_name")?))
            }
            _ => locate_base(self, self.name(), getter, args),
        }
    }

    fn perform(&self, action: &str, args: &[String]) -> E2eResult<Vec<TestStep>> {
        perform_base(self, self.name(), action, args)
    }
}

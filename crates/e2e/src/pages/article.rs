use super::{arg, click, index_arg, locate_base, log, perform_base, type_into, BasePage, PageObject};
use crate::error::E2eResult;
use crate::locator::Locator;
use crate::spec::TestStep;

/// Prompt shown before an article is deleted
pub const DELETE_ARTICLE_PROMPT: &str = "Are you sure you want to delete the article?";

/// Single article view with its comments
pub struct ArticlePage;

impl BasePage for ArticlePage {}

impl ArticlePage {
    pub fn article_title(&self, title: &str) -> Locator {
        Locator::with_text("h1", title)
    }

    pub fn article_body(&self, body: &str) -> Locator {
        Locator::with_text("p", body)
    }

    /// Author link; the banner and the comment form both carry one
    pub fn author_name(&self, author_name: &str, index: usize) -> Locator {
        Locator::with_text("a", author_name).nth(index)
    }

    pub fn comment_input(&self) -> Locator {
        Locator::css(r#"textarea[placeholder="Write a comment..."]"#)
    }

    pub fn post_comment_btn(&self) -> Locator {
        Locator::with_text("button", "Post Comment")
    }

    pub fn comment_by_text(&self, comment_text: &str) -> Locator {
        Locator::css("p").contains(comment_text)
    }

    pub fn delete_comment_btn(&self, comment_text: &str) -> Locator {
        Locator::with_text("div.card", comment_text).find(".ion-trash-a")
    }

    pub fn delete_article_btn(&self, index: usize) -> Locator {
        Locator::with_text("button", "Delete Article").nth(index)
    }

    pub fn add_comment(&self, comment_text: &str) -> Vec<TestStep> {
        vec![
            log("Adding a comment..."),
            type_into(self.comment_input(), comment_text),
            click(self.post_comment_btn()),
        ]
    }

    pub fn delete_comment(&self, comment_text: &str) -> Vec<TestStep> {
        vec![log("Deleting a comment..."), click(self.delete_comment_btn(comment_text))]
    }

    /// Click "Delete Article" and confirm the browser prompt
    pub fn delete_article(&self, index: usize) -> Vec<TestStep> {
        vec![
            log("Deleting the article..."),
            TestStep::AcceptDialog {
                message: Some(DELETE_ARTICLE_PROMPT.to_string()),
            },
            click(self.delete_article_btn(index)),
        ]
    }
}

impl PageObject for ArticlePage {
    fn name(&self) -> &'static str {
        "article"
    }

    fn locate(&self, getter: &str, args: &[String]) -> E2eResult<Locator> {
        match getter {
            "article_title" => Ok(self.article_title(arg(args, 0, "article.article_title")?)),
            "article_body" => Ok(self.article_body(arg(args, 0, "article.article_body")?)),
            "author_name" => {
                let call = "article.author_name";
                Ok(self.author_name(arg(args, 0, call)?, index_arg(args, 1, call)?))
            }
            "comment_input" => Ok(self.comment_input()),
            "post_comment_btn" => Ok(self.post_comment_btn()),
            "comment_by_text" => Ok(self.comment_by_text(arg(args, 0, "article.comment_by_text")?)),
            "delete_comment_btn" => Ok(self.delete_comment_btn(arg(args, 0, "article.delete_comment_btn")?)),
            "delete_article_btn" => Ok(self.delete_article_btn(index_arg(args, 0, "article.delete_article_btn")?)),
            _ => locate_base(self, self.name(), getter, args),
        }
    }

    fn perform(&self, action: &str, args: &[String]) -> E2eResult<Vec<TestStep>> {
        match action {
            "add_comment" => Ok(self.add_comment(arg(args, 0, "article.add_comment")?)),
            "delete_comment" => Ok(self.delete_comment(arg(args, 0, "article.delete_comment")?)),
            "delete_article" => Ok(self.delete_article(index_arg(args, 0, "article.delete_article")?)),
            _ => perform_base(self, self.name(), action, args),
        }
    }
}

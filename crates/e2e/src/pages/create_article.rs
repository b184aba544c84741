use super::{arg, click, locate_base, log, perform_base, type_into, BasePage, PageObject};
use crate::error::E2eResult;
use crate::locator::Locator;
use crate::spec::TestStep;

/// Article editor
pub struct CreateArticlePage;

impl BasePage for CreateArticlePage {}

impl CreateArticlePage {
    pub fn article_title_field(&self) -> Locator {
        Locator::placeholder("Article Title")
    }

    pub fn article_about_field(&self) -> Locator {
        Locator::placeholder("What's this article about?")
    }

    pub fn article_text_field(&self) -> Locator {
        Locator::placeholder("Write your article (in markdown)")
    }

    pub fn article_tags_field(&self) -> Locator {
        Locator::placeholder("Enter tags")
    }

    pub fn publish_article_btn(&self) -> Locator {
        Locator::with_text("button", "Publish Article")
    }

    /// Fill out the editor form and publish
    pub fn publish_article(&self, title: &str, about: &str, text: &str, tag: &str) -> Vec<TestStep> {
        vec![
            log("Filling article form..."),
            type_into(self.article_title_field(), title),
            type_into(self.article_about_field(), about),
            type_into(self.article_text_field(), text),
            type_into(self.article_tags_field(), tag),
            log("Submitting article form..."),
            click(self.publish_article_btn()),
        ]
    }
}

impl PageObject for CreateArticlePage {
    fn name(&self) -> &'static str {
        "create_article"
    }

    fn locate(&self, getter: &str, args: &[String]) -> E2eResult<Locator> {
        match getter {
            "article_title_field" => Ok(self.article_title_field()),
            "article_about_field" => Ok(self.article_about_field()),
            "article_text_field" => Ok(self.article_text_field()),
            "article_tags_field" => Ok(self.article_tags_field()),
            "publish_article_btn" => Ok(self.publish_article_btn()),
            _ => locate_base(self, self.name(), getter, args),
        }
    }

    fn perform(&self, action: &str, args: &[String]) -> E2eResult<Vec<TestStep>> {
        match action {
            "publish_article" => {
                let call = "create_article.publish_article";
                Ok(self.publish_article(
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_article_fills_all_fields_in_order() {
        let steps = CreateArticlePage.publish_article("T", "D", "B", "tag");
        let typed: Vec<&str> = steps
            .iter()
            .filter_map(|s| match s {
                TestStep::Type { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(typed, vec!["T", "D", "B", "tag"]);
        assert!(matches!(steps.last(), Some(TestStep::Click { .. })));
    }
}

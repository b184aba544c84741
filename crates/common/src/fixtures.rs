//! Static JSON test-input data
//!
//! Every `*.json` file in the fixtures directory is loaded under its file
//! stem, so `users.json` becomes the `users` namespace. Specs reference
//! values with `{{users.validUsers.1.email}}` placeholders; numeric segments
//! index into arrays.

use crate::{Error, Result};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use tracing::debug;

/// A registrable user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// A user the application must reject, with the reason
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidUser {
    #[serde(flatten)]
    pub user: User,
    pub description: String,
}

/// Contents of `users.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsersFixture {
    pub valid_user: User,
    #[serde(default)]
    pub valid_users: Vec<User>,
    #[serde(default)]
    pub invalid_users: Vec<InvalidUser>,
}

/// Contents of `article.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleFixture {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub tag: String,
}

/// Contents of `profile.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileFixture {
    pub email: String,
    pub username: String,
    pub bio: String,
    pub password: String,
}

/// All fixtures of a run, keyed by file stem
#[derive(Debug, Clone, Default)]
pub struct Fixtures {
    root: Map<String, Value>,
}

impl Fixtures {
    /// Load every JSON file in a directory
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let mut root = Map::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                let Some(stem) = path.file_stem().map(|s| s.to_string_lossy().to_string()) else {
                    continue;
                };
                let content = std::fs::read_to_string(&path)?;
                let value: Value = serde_json::from_str(&content).map_err(|e| {
                    Error::Fixture(format!("{}: {}", path.display(), e))
                })?;
                debug!("Loaded fixture '{}' from {}", stem, path.display());
                root.insert(stem, value);
            }
        }
        Ok(Self { root })
    }

    /// Build fixtures from an in-memory object
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(root) => Ok(Self { root }),
            other => Err(Error::Fixture(format!("fixture root must be an object, got {}", other))),
        }
    }

    /// Deserialize one fixture file
    pub fn get<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let value = self
            .root
            .get(name)
            .ok_or_else(|| Error::not_found("fixture", name))?;
        serde_json::from_value(value.clone())
            .map_err(|e| Error::Fixture(format!("fixture '{}': {}", name, e)))
    }

    pub fn users(&self) -> Result<UsersFixture> {
        self.get("users")
    }

    pub fn article(&self) -> Result<ArticleFixture> {
        self.get("article")
    }

    pub fn profile(&self) -> Result<ProfileFixture> {
        self.get("profile")
    }

    /// Look up a dotted path such as `users.invalidUsers.2.email`
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let mut current = self.root.get(segments.next()?)?;
        for segment in segments {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Resolve placeholders in a string. A string that is exactly one
    /// placeholder resolves to the referenced value itself, so whole
    /// fixture objects can be passed to tasks.
    pub fn resolve(&self, text: &str) -> Result<Value> {
        let re = placeholder_regex()?;

        if let Some(caps) = re.captures(text) {
            if caps.get(0).map(|m| m.as_str().len()) == Some(text.len()) {
                return self.lookup_required(&caps[1]).cloned();
            }
        }
        Ok(Value::String(self.interpolate(text)?))
    }

    /// Replace every placeholder in a string with the referenced value
    pub fn interpolate(&self, text: &str) -> Result<String> {
        let re = placeholder_regex()?;
        let mut out = String::with_capacity(text.len());
        let mut last = 0;

        for caps in re.captures_iter(text) {
            let Some(whole) = caps.get(0) else { continue };
            out.push_str(&text[last..whole.start()]);
            match self.lookup_required(&caps[1])? {
                Value::String(s) => out.push_str(s),
                other => out.push_str(&other.to_string()),
            }
            last = whole.end();
        }
        out.push_str(&text[last..]);
        Ok(out)
    }

    fn lookup_required(&self, path: &str) -> Result<&Value> {
        self.lookup(path)
            .ok_or_else(|| Error::Fixture(format!("unknown fixture path '{}'", path)))
    }
}

fn placeholder_regex() -> Result<Regex> {
    Regex::new(r"\{\{\s*([A-Za-z0-9_.\-]+)\s*\}\}")
        .map_err(|e| Error::Fixture(format!("placeholder pattern: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Fixtures {
        Fixtures::from_value(json!({
            "users": {
                "validUser": { "email": "a@example.com", "username": "alice", "password": "password1" },
                "validUsers": [
                    { "email": "b@example.com", "username": "bob", "password": "password2" },
                    { "email": "c@example.com", "username": "carol", "password": "password3" }
                ],
                "invalidUsers": [
                    { "email": "d@example.com", "username": "dan", "password": "short", "description": "password too short" }
                ]
            },
            "article": { "title": "T", "description": "D", "body": "B", "tag": "x" }
        }))
        .unwrap()
    }

    #[test]
    fn test_typed_fixtures() {
        let fixtures = sample();
        let users = fixtures.users().unwrap();
        assert_eq!(users.valid_user.username, "alice");
        assert_eq!(users.valid_users[1].email, "c@example.com");
        assert_eq!(users.invalid_users[0].description, "password too short");
        assert_eq!(users.invalid_users[0].user.password, "short");
        assert_eq!(fixtures.article().unwrap().tag, "x");
        assert!(matches!(fixtures.profile(), Err(Error::NotFound { .. })));
    }

    #[test]
    fn test_interpolate_paths_and_indices() {
        let fixtures = sample();
        let text = fixtures
            .interpolate("login {{ users.validUsers.1.email }} / {{article.title}}")
            .unwrap();
        assert_eq!(text, "login c@example.com / T");
    }

    #[test]
    fn test_resolve_whole_placeholder_keeps_structure() {
        let fixtures = sample();
        let value = fixtures.resolve("{{users.validUsers.0}}").unwrap();
        assert_eq!(value["username"], "bob");

        let plain = fixtures.resolve("no placeholders").unwrap();
        assert_eq!(plain, Value::String("no placeholders".to_string()));
    }

    #[test]
    fn test_unknown_path_is_an_error() {
        let fixtures = sample();
        assert!(fixtures.interpolate("{{users.validUsers.9.email}}").is_err());
        assert!(fixtures.resolve("{{nope}}").is_err());
    }

    #[test]
    fn test_load_dir_keys_by_stem() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("article.json"), r#"{"title":"A","description":"B","body":"C","tag":"D"}"#).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let fixtures = Fixtures::load_dir(dir.path()).unwrap();
        assert_eq!(fixtures.article().unwrap().title, "A");
        assert!(fixtures.lookup("notes").is_none());
    }
}

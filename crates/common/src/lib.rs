//! Conduit E2E common library
//!
//! Fixtures and the seeding store shared by the runner and the CLI.

pub mod db;
pub mod error;
pub mod fixtures;

pub use db::{Database, NewArticle, NewUser, DATABASE_URL_ENV, DEFAULT_DATABASE_URL};
pub use error::{Error, Result};
pub use fixtures::{ArticleFixture, Fixtures, InvalidUser, ProfileFixture, User, UsersFixture};

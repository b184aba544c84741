//! SQLite store for seeding and cleaning up Conduit test data

use crate::{Error, Result};
use parking_lot::Mutex;
use regex::Regex;
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Environment variable holding the connection string
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

/// Connection string used when the environment does not provide one
pub const DEFAULT_DATABASE_URL: &str = "file:./dev.db";

/// bcrypt cost for seeded passwords
const PASSWORD_HASH_COST: u32 = 10;

/// Resolve the connection string from the environment
pub fn database_url_from_env(var: &str) -> String {
    std::env::var(var)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string())
}

/// Turn a connection string into a filesystem path.
///
/// Accepts `file:<path>`, `sqlite:<path>`, `sqlite://<path>` and bare paths.
pub fn database_path_from_url(url: &str) -> Result<PathBuf> {
    let url = url.trim();
    let path = if let Some(rest) = url.strip_prefix("sqlite://") {
        rest
    } else if let Some(rest) = url.strip_prefix("sqlite:") {
        rest
    } else if let Some(rest) = url.strip_prefix("file:") {
        rest
    } else if url.contains("://") {
        return Err(Error::InvalidConfig(format!(
            "unsupported database url '{}': only sqlite/file urls are supported",
            url
        )));
    } else {
        url
    };

    // Drop query parameters such as `?connection_limit=1`
    let path = path.split('?').next().unwrap_or_default();
    if path.is_empty() {
        return Err(Error::InvalidConfig(format!("database url '{}' has no path", url)));
    }
    Ok(PathBuf::from(path))
}

/// A user as stored in the database. Ids are read as text so both
/// integer and string primary keys fit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRow {
    pub id: String,
    pub email: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub bio: Option<String>,
}

/// Input for creating a user
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub email: &'a str,
    pub username: &'a str,
    pub password: &'a str,
    pub bio: Option<&'a str>,
}

/// An article as stored in the database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleRow {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub body: String,
    pub author_id: String,
    /// Milliseconds since the epoch, the way Prisma stores `DateTime` in SQLite
    pub created_at: i64,
}

/// Input for creating an article
#[derive(Debug, Clone)]
pub struct NewArticle<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub body: &'a str,
    pub tags: &'a [String],
}

/// Database wrapper for seeding and cleanup
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path.as_ref())?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.init_schema()?;

        debug!("Opened database at {:?}", path.as_ref());
        Ok(db)
    }

    /// Open the database a connection string points at
    pub fn open_url(url: &str) -> Result<Self> {
        Self::open(database_path_from_url(url)?)
    }

    /// Open in-memory database (for testing)
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.init_schema()?;
        Ok(db)
    }

    /// Create the application's tables when they are missing, using the
    /// names Prisma gives the Conduit models and their implicit relations.
    /// Tables that already exist are left untouched, indexes included.
    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS "User" (
                "id" INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
                "email" TEXT NOT NULL UNIQUE,
                "username" TEXT NOT NULL UNIQUE,
                "password" TEXT NOT NULL,
                "image" TEXT,
                "bio" TEXT
            );

            CREATE TABLE IF NOT EXISTS "Article" (
                "id" INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
                "slug" TEXT NOT NULL UNIQUE,
                "title" TEXT NOT NULL,
                "description" TEXT NOT NULL,
                "body" TEXT NOT NULL,
                "createdAt" DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                "updatedAt" DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                "authorId" INTEGER NOT NULL REFERENCES "User"("id") ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS "Tag" (
                "id" INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
                "name" TEXT NOT NULL UNIQUE
            );

            CREATE TABLE IF NOT EXISTS "Comment" (
                "id" INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
                "body" TEXT NOT NULL,
                "createdAt" DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                "updatedAt" DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                "articleId" INTEGER NOT NULL REFERENCES "Article"("id") ON DELETE CASCADE,
                "authorId" INTEGER NOT NULL REFERENCES "User"("id") ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS "_ArticleToTag" (
                "A" INTEGER NOT NULL REFERENCES "Article"("id") ON DELETE CASCADE,
                "B" INTEGER NOT NULL REFERENCES "Tag"("id") ON DELETE CASCADE,
                UNIQUE ("A", "B")
            );

            CREATE TABLE IF NOT EXISTS "_UserFavorites" (
                "A" INTEGER NOT NULL REFERENCES "Article"("id") ON DELETE CASCADE,
                "B" INTEGER NOT NULL REFERENCES "User"("id") ON DELETE CASCADE,
                UNIQUE ("A", "B")
            );

            CREATE TABLE IF NOT EXISTS "_UserFollows" (
                "A" INTEGER NOT NULL REFERENCES "User"("id") ON DELETE CASCADE,
                "B" INTEGER NOT NULL REFERENCES "User"("id") ON DELETE CASCADE,
                UNIQUE ("A", "B")
            );
            "#,
        )?;

        Ok(())
    }

    // ========================================================================
    // Users
    // ========================================================================

    /// Find a user by its unique email
    pub fn find_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                r#"SELECT CAST("id" AS TEXT), "email", "username", "password", "bio"
                   FROM "User" WHERE "email" = ?1"#,
                params![email],
                |row| {
                    Ok(UserRow {
                        id: row.get(0)?,
                        email: row.get(1)?,
                        username: row.get(2)?,
                        password_hash: row.get(3)?,
                        bio: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    /// Create a user with a bcrypt-hashed password
    pub fn create_user(&self, user: &NewUser<'_>) -> Result<UserRow> {
        if user.email.trim().is_empty() {
            return Err(Error::InvalidInput("email is required".to_string()));
        }

        let password_hash = bcrypt::hash(user.password, PASSWORD_HASH_COST)?;

        let conn = self.conn.lock();
        let given_id = client_generated_id(&conn, "User")?;
        conn.execute(
            r#"INSERT INTO "User" ("id", "email", "username", "password", "bio")
               VALUES (?1, ?2, ?3, ?4, ?5)"#,
            params![given_id, user.email, user.username, password_hash, user.bio],
        )?;
        let id = given_id.unwrap_or_else(|| conn.last_insert_rowid().to_string());

        info!("Created user {} ({})", user.email, id);
        Ok(UserRow {
            id,
            email: user.email.to_string(),
            username: user.username.to_string(),
            password_hash,
            bio: user.bio.map(String::from),
        })
    }

    /// Delete a user and everything it authored. Returns the number of
    /// user rows removed, 0 when no user has that email.
    pub fn delete_user_by_email(&self, email: &str) -> Result<usize> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        let id: Option<String> = tx
            .query_row(
                r#"SELECT CAST("id" AS TEXT) FROM "User" WHERE "email" = ?1"#,
                params![email],
                |row| row.get(0),
            )
            .optional()?;
        let Some(id) = id else {
            debug!("No user with email {}, nothing to delete", email);
            return Ok(0);
        };

        let articles = delete_articles_where(&tx, r#""authorId" = ?1"#, &id)?;
        tx.execute(r#"DELETE FROM "Comment" WHERE "authorId" = ?1"#, params![id])?;
        tx.execute(r#"DELETE FROM "_UserFavorites" WHERE "B" = ?1"#, params![id])?;
        tx.execute(r#"DELETE FROM "_UserFollows" WHERE "A" = ?1 OR "B" = ?1"#, params![id])?;
        let removed = tx.execute(r#"DELETE FROM "User" WHERE "id" = ?1"#, params![id])?;
        tx.commit()?;

        info!("Deleted user {} ({} article(s) removed with it)", email, articles);
        Ok(removed)
    }

    // ========================================================================
    // Articles
    // ========================================================================

    /// Create an article for an existing author
    pub fn create_article(&self, author_id: &str, article: &NewArticle<'_>) -> Result<ArticleRow> {
        if article.title.trim().is_empty() {
            return Err(Error::InvalidInput("title is required".to_string()));
        }

        let slug = slugify(article.title, &uuid::Uuid::new_v4().to_string());
        let now = chrono::Utc::now().timestamp_millis();

        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let given_id = client_generated_id(&tx, "Article")?;
        tx.execute(
            r#"INSERT INTO "Article" ("id", "slug", "title", "description", "body", "authorId", "createdAt", "updatedAt")
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"#,
            params![
                given_id,
                slug,
                article.title,
                article.description,
                article.body,
                author_id,
                now,
                now
            ],
        )?;
        let id = given_id.unwrap_or_else(|| tx.last_insert_rowid().to_string());

        for tag in article.tags.iter().filter(|t| !t.trim().is_empty()) {
            tx.execute(r#"INSERT OR IGNORE INTO "Tag" ("name") VALUES (?1)"#, params![tag])?;
            tx.execute(
                r#"INSERT OR IGNORE INTO "_ArticleToTag" ("A", "B")
                   SELECT ?1, "id" FROM "Tag" WHERE "name" = ?2"#,
                params![id, tag],
            )?;
        }
        tx.commit()?;

        info!("Created article '{}' ({})", article.title, slug);
        Ok(ArticleRow {
            id,
            slug,
            title: article.title.to_string(),
            description: article.description.to_string(),
            body: article.body.to_string(),
            author_id: author_id.to_string(),
            created_at: now,
        })
    }

    /// List articles carrying an exact title
    pub fn find_articles_by_title(&self, title: &str) -> Result<Vec<ArticleRow>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            r#"SELECT CAST("id" AS TEXT), "slug", "title", "description", "body",
                      CAST("authorId" AS TEXT), "createdAt"
               FROM "Article" WHERE "title" = ?1 ORDER BY "createdAt""#,
        )?;
        let rows = stmt
            .query_map(params![title], |row| {
                Ok(ArticleRow {
                    id: row.get(0)?,
                    slug: row.get(1)?,
                    title: row.get(2)?,
                    description: row.get(3)?,
                    body: row.get(4)?,
                    author_id: row.get(5)?,
                    created_at: row.get(6)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Delete every article with an exact title
    pub fn delete_articles_by_title(&self, title: &str) -> Result<usize> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let removed = delete_articles_where(&tx, r#""title" = ?1"#, title)?;
        tx.commit()?;

        debug!("Deleted {} article(s) titled '{}'", removed, title);
        Ok(removed)
    }

    /// Delete every article whose title matches a SQL LIKE pattern
    pub fn delete_articles_matching(&self, pattern: &str) -> Result<usize> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let removed = delete_articles_where(&tx, r#""title" LIKE ?1"#, pattern)?;
        tx.commit()?;

        debug!("Deleted {} article(s) matching '{}'", removed, pattern);
        Ok(removed)
    }

    /// Count rows of a table (used by tests and diagnostics)
    pub fn count(&self, table: &str) -> Result<i64> {
        let conn = self.conn.lock();
        let count = conn.query_row(&format!(r#"SELECT COUNT(*) FROM "{}""#, table), [], |row| row.get(0))?;
        Ok(count)
    }
}

/// A fresh id when `table` keys rows by a client-generated string, `None`
/// when SQLite assigns an integer rowid.
fn client_generated_id(conn: &Connection, table: &str) -> Result<Option<String>> {
    let mut stmt = conn.prepare(&format!(r#"PRAGMA table_info("{}")"#, table))?;
    let columns = stmt
        .query_map([], |row| Ok((row.get::<_, String>(1)?, row.get::<_, String>(2)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let integer_key = columns
        .iter()
        .find(|(name, _)| name == "id")
        .map(|(_, ty)| ty.to_ascii_uppercase().contains("INT"))
        .unwrap_or(true);
    Ok((!integer_key).then(|| uuid::Uuid::new_v4().to_string()))
}

/// Remove articles selected by `clause` together with their dependent rows
fn delete_articles_where(tx: &Transaction<'_>, clause: &str, param: &str) -> Result<usize> {
    let selection = format!(r#"SELECT "id" FROM "Article" WHERE {}"#, clause);
    for (dependent, column) in [("_ArticleToTag", "A"), ("Comment", "articleId"), ("_UserFavorites", "A")] {
        tx.execute(
            &format!(r#"DELETE FROM "{}" WHERE "{}" IN ({})"#, dependent, column, selection),
            params![param],
        )?;
    }
    let removed = tx.execute(&format!(r#"DELETE FROM "Article" WHERE {}"#, clause), params![param])?;
    Ok(removed)
}

fn slugify(title: &str, salt: &str) -> String {
    let lowered = title.to_lowercase();
    let base = match Regex::new(r"[^a-z0-9]+") {
        Ok(re) => re.replace_all(&lowered, "-").trim_matches('-').to_string(),
        Err(_) => lowered,
    };
    let suffix: String = salt.chars().filter(|c| *c != '-').take(8).collect();
    if base.is_empty() {
        suffix
    } else {
        format!("{}-{}", base, suffix)
    }
}

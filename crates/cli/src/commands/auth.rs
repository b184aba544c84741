//! Auth Commands
//!
//! Exercise the app's login and registration procedures directly.

use anyhow::Result;
use clap::Subcommand;
use serde::Serialize;

use conduit_e2e::session::{AuthClient, TrpcUser};
use conduit_e2e::RunnerConfig;

use crate::output::{print_item, OutputFormat, TableDisplay};

const TOKEN_DISPLAY_LENGTH: usize = 16;

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Log in and show the returned user
    Login {
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
    },

    /// Register a user
    Register {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
    },
}

/// User display wrapper; the password is never shown
#[derive(Serialize)]
pub struct UserDisplay {
    pub email: String,
    pub username: String,
    pub token: String,
}

impl From<TrpcUser> for UserDisplay {
    fn from(user: TrpcUser) -> Self {
        Self {
            email: user.email,
            username: user.username,
            token: user.token,
        }
    }
}

impl TableDisplay for UserDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["Email", "Username", "Token"]
    }

    fn row(&self) -> Vec<String> {
        let token = if self.token.chars().count() > TOKEN_DISPLAY_LENGTH {
            format!("{}…", self.token.chars().take(TOKEN_DISPLAY_LENGTH).collect::<String>())
        } else {
            self.token.clone()
        };
        vec![self.email.clone(), self.username.clone(), token]
    }
}

pub async fn execute(cmd: AuthCommands, config: &RunnerConfig, format: OutputFormat) -> Result<bool> {
    let client = AuthClient::new(&config.base_url)?;
    let user = match cmd {
        AuthCommands::Login { email, password } => client.login(&email, &password).await?,
        AuthCommands::Register {
            username,
            email,
            password,
        } => client.register(&username, &email, &password).await?,
    };
    print_item(&UserDisplay::from(user), format)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_long_token_is_shortened() {
        let user = UserDisplay {
            email: "e2e.bob@example.com".to_string(),
            username: "e2e_bob".to_string(),
            token: "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9.payload".to_string(),
        };
        assert_eq!(user.row()[2], "eyJhbGciOiJIUzI1…");
    }
}

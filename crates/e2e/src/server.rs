//! App management - optionally spawning the app under test and waiting for it

use std::process::{Child, Command, Stdio};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::error::{E2eError, E2eResult};

/// Handle to the application under test
pub struct AppHandle {
    /// Present only when this handle started the app
    child: Option<Child>,
    base_url: String,
}

impl AppHandle {
    /// Start the app if a command is configured, then wait until it answers
    pub async fn start(config: &AppConfig, base_url: &str) -> E2eResult<Self> {
        let child = match config.command.split_first() {
            Some((program, args)) => {
                info!("Starting app: {}", config.command.join(" "));
                let child = Command::new(program)
                    .args(args)
                    .stdout(Stdio::null())
                    .stderr(Stdio::inherit())
                    .spawn()
                    .map_err(|e| E2eError::AppStartup(format!("Failed to spawn {}: {}", program, e)))?;
                Some(child)
            }
            None => None,
        };

        let handle = AppHandle {
            child,
            base_url: base_url.trim_end_matches('/').to_string(),
        };

        handle
            .wait_until_ready(&config.ready_path, Duration::from_secs(config.ready_timeout_secs))
            .await?;

        info!("App is ready at {}", handle.base_url);
        Ok(handle)
    }

    /// Poll the readiness path until it answers with a non-server-error status
    async fn wait_until_ready(&self, ready_path: &str, timeout_duration: Duration) -> E2eResult<()> {
        let ready_url = readiness_url(&self.base_url, ready_path);
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()?;

        let start = std::time::Instant::now();
        let mut attempts = 0;

        while start.elapsed() < timeout_duration {
            attempts += 1;

            match client.get(&ready_url).send().await {
                Ok(resp) if !resp.status().is_server_error() => return Ok(()),
                Ok(resp) => {
                    warn!("Readiness check returned {}", resp.status());
                }
                Err(e) => {
                    if attempts == 1 {
                        info!("Waiting for app at {}...", ready_url);
                    }
                    // Connection refused is expected while the app boots
                    if !e.is_connect() {
                        warn!("Readiness check error: {}", e);
                    }
                }
            }

            sleep(Duration::from_millis(250)).await;
        }

        Err(E2eError::AppHealthCheck(attempts))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whether this handle owns the app process
    pub fn is_spawned(&self) -> bool {
        self.child.is_some()
    }

    /// Stop a spawned app; attached apps are left alone
    pub fn stop(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };
        info!("Stopping app (pid: {})", child.id());

        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            let pid = Pid::from_raw(child.id() as i32);
            if kill(pid, Signal::SIGTERM).is_ok() {
                std::thread::sleep(Duration::from_millis(500));
            }
        }

        let _ = child.kill();
        let _ = child.wait();
    }
}

impl Drop for AppHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

fn readiness_url(base_url: &str, ready_path: &str) -> String {
    if ready_path.is_empty() {
        return base_url.to_string();
    }
    format!("{}/{}", base_url.trim_end_matches('/'), ready_path.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn app_config(ready_path: &str, timeout_secs: u64) -> AppConfig {
        AppConfig {
            command: Vec::new(),
            ready_path: ready_path.to_string(),
            ready_timeout_secs: timeout_secs,
        }
    }

    #[test]
    fn test_readiness_url_joins_paths() {
        assert_eq!(readiness_url("http://localhost:3000/", "/"), "http://localhost:3000/");
        assert_eq!(readiness_url("http://localhost:3000", "api/health"), "http://localhost:3000/api/health");
        assert_eq!(readiness_url("http://localhost:3000", ""), "http://localhost:3000");
    }

    #[tokio::test]
    async fn test_attach_to_running_app() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let handle = AppHandle::start(&app_config("/", 5), &server.uri()).await.unwrap();
        assert!(!handle.is_spawned());
        assert_eq!(handle.base_url(), server.uri());
    }

    #[tokio::test]
    async fn test_unreachable_app_times_out() {
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let err = AppHandle::start(&app_config("/", 1), &base_url).await.err().unwrap();
        assert!(matches!(err, E2eError::AppHealthCheck(n) if n > 0));
    }

    #[tokio::test]
    async fn test_missing_program_is_startup_error() {
        let mut config = app_config("/", 1);
        config.command = vec!["/nonexistent/conduit-app".to_string()];
        let err = AppHandle::start(&config, "http://127.0.0.1:9").await.err().unwrap();
        assert!(matches!(err, E2eError::AppStartup(_)));
    }
}

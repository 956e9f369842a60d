//! Owned `kiwix-serve` process handle.
//!
//! [`KiwixServer::ensure_running`] starts a local server when none answers at
//! the configured URL. The returned handle owns the child process: `stop()`
//! terminates it, and dropping the handle kills it.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use reqwest::Client;
use tokio::process::{Child, Command};

use crate::error::{IndexError, Result};

const BINARY_NAME: &str = "kiwix-serve";

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Settings for locating and starting kiwix-serve.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// URL the server should answer at.
    pub url: String,
    /// Explicit binary path, tried before the standard locations.
    pub binary: Option<PathBuf>,
    /// Extra directories searched for `.zim` archives, before the defaults.
    pub zim_dirs: Vec<PathBuf>,
    /// Number of readiness polls after spawning.
    pub poll_attempts: u32,
    /// Delay between readiness polls.
    pub poll_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: crate::kiwix::DEFAULT_KIWIX_URL.to_string(),
            binary: None,
            zim_dirs: Vec::new(),
            poll_attempts: 10,
            poll_interval: Duration::from_millis(500),
        }
    }
}

impl ServerConfig {
    /// Port to listen on, taken from the URL.
    pub fn port(&self) -> u16 {
        reqwest::Url::parse(&self.url)
            .ok()
            .and_then(|u| u.port_or_known_default())
            .unwrap_or(8080)
    }

    /// Binary candidates in search order, excluding `PATH`.
    fn binary_candidates(&self) -> Vec<PathBuf> {
        let mut candidates: Vec<PathBuf> = self.binary.iter().cloned().collect();
        if let Some(home) = dirs::home_dir() {
            candidates.push(home.join(".local/bin").join(BINARY_NAME));
        }
        candidates.push(PathBuf::from("/usr/local/bin").join(BINARY_NAME));
        candidates.push(PathBuf::from("/usr/bin").join(BINARY_NAME));
        candidates
    }

    /// ZIM directories in search order.
    pub fn zim_search_dirs(&self) -> Vec<PathBuf> {
        let mut searched = self.zim_dirs.clone();
        if let Some(home) = dirs::home_dir() {
            searched.push(home.join("wikipedia-offline"));
            searched.push(home.join("Downloads"));
        }
        searched.push(PathBuf::from("/data/wikipedia"));
        searched.push(PathBuf::from("/var/lib/kiwix"));
        searched
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Discovery
// ─────────────────────────────────────────────────────────────────────────────

/// First existing file among `candidates`, then the first match on `PATH`.
pub fn find_binary(candidates: &[PathBuf]) -> Option<PathBuf> {
    candidates.iter().find(|p| p.is_file()).cloned().or_else(|| {
        let path = std::env::var_os("PATH")?;
        std::env::split_paths(&path)
            .map(|dir| dir.join(BINARY_NAME))
            .find(|p| p.is_file())
    })
}

/// ZIM archives in the first directory that contains any.
pub fn find_zim_files(dirs: &[PathBuf]) -> Option<Vec<PathBuf>> {
    dirs.iter().find_map(|dir| {
        let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
            .ok()?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "zim"))
            .collect();
        files.sort();
        (!files.is_empty()).then_some(files)
    })
}

/// True if something answers successfully at `url`.
pub async fn is_reachable(url: &str) -> bool {
    let Ok(client) = Client::builder().timeout(Duration::from_secs(2)).build() else {
        return false;
    };
    client
        .get(url)
        .send()
        .await
        .is_ok_and(|r| r.status().is_success())
}

// ─────────────────────────────────────────────────────────────────────────────
// Server Handle
// ─────────────────────────────────────────────────────────────────────────────

/// A kiwix-serve process started by this program.
#[derive(Debug)]
pub struct KiwixServer {
    child: Child,
    url: String,
    zim_files: Vec<PathBuf>,
}

impl KiwixServer {
    /// Make sure a server answers at `config.url`.
    ///
    /// Returns `Ok(None)` if one is already running, or a handle to the
    /// server that was started.
    pub async fn ensure_running(config: &ServerConfig) -> Result<Option<Self>> {
        if is_reachable(&config.url).await {
            tracing::info!(url = %config.url, "Kiwix server already running");
            return Ok(None);
        }

        let binary = find_binary(&config.binary_candidates()).ok_or(IndexError::BinaryNotFound)?;
        let searched = config.zim_search_dirs();
        let zim_files =
            find_zim_files(&searched).ok_or(IndexError::NoZimFiles { searched })?;

        Self::spawn(&binary, &zim_files, config).await.map(Some)
    }

    async fn spawn(binary: &Path, zim_files: &[PathBuf], config: &ServerConfig) -> Result<Self> {
        let port = config.port();
        tracing::info!(
            binary = %binary.display(),
            port,
            archives = zim_files.len(),
            "Starting kiwix-serve"
        );

        let child = Command::new(binary)
            .arg("--port")
            .arg(port.to_string())
            .args(zim_files)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(IndexError::Spawn)?;

        let mut server = Self {
            child,
            url: config.url.clone(),
            zim_files: zim_files.to_vec(),
        };

        for _ in 0..config.poll_attempts {
            tokio::time::sleep(config.poll_interval).await;
            if is_reachable(&server.url).await {
                tracing::info!(url = %server.url, "Kiwix server started");
                return Ok(server);
            }
            if let Ok(Some(status)) = server.child.try_wait() {
                tracing::warn!(%status, "kiwix-serve exited during startup");
                break;
            }
        }

        server.stop().await;
        Err(IndexError::NotReady { url: config.url.clone() })
    }

    /// URL the server answers at.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Archives the server was started with.
    pub fn zim_files(&self) -> &[PathBuf] {
        &self.zim_files
    }

    /// Terminate the server and wait for it to exit.
    pub async fn stop(mut self) {
        if let Err(e) = self.child.kill().await {
            tracing::debug!(error = %e, "kiwix-serve already exited");
        } else {
            tracing::info!(url = %self.url, "Stopped kiwix-serve");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_from_url() {
        let config = ServerConfig {
            url: "http://localhost:9454".to_string(),
            ..Default::default()
        };
        assert_eq!(config.port(), 9454);
        assert_eq!(ServerConfig::default().port(), 8080);

        let no_port = ServerConfig {
            url: "http://localhost".to_string(),
            ..Default::default()
        };
        assert_eq!(no_port.port(), 80);
    }

    #[test]
    fn test_configured_binary_first() {
        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("kiwix-serve");
        std::fs::write(&bin, "").unwrap();

        let config = ServerConfig {
            binary: Some(bin.clone()),
            ..Default::default()
        };
        let candidates = config.binary_candidates();
        assert_eq!(candidates[0], bin);
        assert_eq!(find_binary(&candidates), Some(bin));
    }

    #[test]
    fn test_find_zim_files_first_nonempty_dir() {
        let empty = tempfile::tempdir().unwrap();
        let full = tempfile::tempdir().unwrap();
        std::fs::write(full.path().join("b.zim"), "").unwrap();
        std::fs::write(full.path().join("a.zim"), "").unwrap();
        std::fs::write(full.path().join("notes.txt"), "").unwrap();

        let dirs = vec![
            PathBuf::from("/nonexistent/tome-test"),
            empty.path().to_path_buf(),
            full.path().to_path_buf(),
        ];
        let files = find_zim_files(&dirs).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("a.zim"));

        assert!(find_zim_files(&dirs[..2]).is_none());
    }

    #[test]
    fn test_configured_zim_dirs_searched_first() {
        let config = ServerConfig {
            zim_dirs: vec![PathBuf::from("/srv/zims")],
            ..Default::default()
        };
        let dirs = config.zim_search_dirs();
        assert_eq!(dirs[0], PathBuf::from("/srv/zims"));
        assert!(dirs.contains(&PathBuf::from("/var/lib/kiwix")));
    }

    #[tokio::test]
    async fn test_unreachable_url() {
        assert!(!is_reachable("http://127.0.0.1:1").await);
    }
}

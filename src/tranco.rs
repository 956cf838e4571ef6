//! Tranco ranking lists, downloaded once per list id and cached on disk.

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// A ranking list available as a local `rank,domain` CSV file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankingList {
    pub list_id: String,
    pub path: PathBuf,
}

pub struct TrancoClient {
    client: Client,
    base_url: String,
    cache_dir: PathBuf,
    list_size: usize,
}

impl TrancoClient {
    pub fn new(base_url: &str, cache_dir: &Path, list_size: usize) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self::with_client(client, base_url, cache_dir, list_size))
    }

    pub fn with_client(client: Client, base_url: &str, cache_dir: &Path, list_size: usize) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            cache_dir: cache_dir.to_path_buf(),
            list_size,
        }
    }

    pub fn cached_list_path(&self, list_id: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.csv", list_id))
    }

    pub fn latest_list_id(&self) -> Result<String> {
        let url = format!("{}/top-1m-id", self.base_url);
        let id = self
            .client
            .get(&url)
            .send()
            .and_then(|response| response.error_for_status())
            .and_then(|response| response.text())
            .with_context(|| format!("Failed to fetch latest list id from {}", url))?
            .trim()
            .to_string();

        if id.is_empty() {
            anyhow::bail!("Ranking provider returned an empty list id");
        }
        Ok(id)
    }

    /// Latest list, with stale cached lists removed. Falls back to the newest
    /// cached list when the provider cannot be reached.
    pub fn latest_list(&self) -> Result<RankingList> {
        let list_id = match self.latest_list_id() {
            Ok(id) => id,
            Err(e) => {
                warn!(action = "resolve", component = "tranco", error = %e, "Could not resolve latest list, trying cache");
                return self
                    .newest_cached()?
                    .with_context(|| format!("No cached ranking list in {:?}", self.cache_dir));
            }
        };

        let removed = self.clear_stale(&list_id)?;
        if removed > 0 {
            info!(action = "clear", component = "tranco", removed, "Removed stale cached lists");
        }

        self.list_for_id(&list_id)
    }

    /// The cached list for `list_id`, downloading it only when absent.
    pub fn list_for_id(&self, list_id: &str) -> Result<RankingList> {
        let path = self.cached_list_path(list_id);
        if path.exists() {
            info!(action = "load", component = "tranco", list_id = list_id, path = ?path, "Using cached ranking list");
        } else {
            self.download(list_id, &path)?;
        }

        Ok(RankingList {
            list_id: list_id.to_string(),
            path,
        })
    }

    fn download(&self, list_id: &str, path: &Path) -> Result<()> {
        let start_time = Instant::now();
        let url = format!("{}/download/{}/{}", self.base_url, list_id, self.list_size);
        info!(action = "start", component = "tranco", url = %url, "Downloading ranking list");

        let body = self
            .client
            .get(&url)
            .send()
            .and_then(|response| response.error_for_status())
            .and_then(|response| response.bytes())
            .with_context(|| format!("Failed to download ranking list from {}", url))?;

        fs::create_dir_all(&self.cache_dir)
            .with_context(|| format!("Failed to create cache directory {:?}", self.cache_dir))?;

        // A partial download must never look like a cached list.
        let partial = path.with_extension("csv.part");
        fs::write(&partial, &body).with_context(|| format!("Failed to write {:?}", partial))?;
        fs::rename(&partial, path).with_context(|| format!("Failed to move list into {:?}", path))?;

        info!(
            action = "complete",
            component = "tranco",
            bytes = body.len(),
            duration_ms = start_time.elapsed().as_millis(),
            "Ranking list downloaded"
        );
        Ok(())
    }

    fn cached_lists(&self) -> Result<Vec<PathBuf>> {
        if !self.cache_dir.exists() {
            return Ok(Vec::new());
        }

        let mut lists = Vec::new();
        for entry in fs::read_dir(&self.cache_dir)
            .with_context(|| format!("Failed to read cache directory {:?}", self.cache_dir))?
        {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "csv") {
                lists.push(path);
            }
        }
        Ok(lists)
    }

    /// Removes every cached list except `keep_id`, returning how many went.
    pub fn clear_stale(&self, keep_id: &str) -> Result<usize> {
        let keep = self.cached_list_path(keep_id);
        let mut removed = 0;
        for path in self.cached_lists()? {
            if path != keep {
                fs::remove_file(&path).with_context(|| format!("Failed to remove {:?}", path))?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    pub fn newest_cached(&self) -> Result<Option<RankingList>> {
        let mut newest: Option<(std::time::SystemTime, PathBuf)> = None;
        for path in self.cached_lists()? {
            let modified = fs::metadata(&path)?.modified()?;
            if newest.as_ref().map_or(true, |(time, _)| modified > *time) {
                newest = Some((modified, path));
            }
        }

        Ok(newest.and_then(|(_, path)| {
            let list_id = path.file_stem()?.to_str()?.to_string();
            Some(RankingList { list_id, path })
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockHttp;
    use tempfile::TempDir;

    fn client_for(base: &str, dir: &Path) -> TrancoClient {
        let client = Client::builder().no_proxy().build().unwrap();
        TrancoClient::with_client(client, base, dir, 1000)
    }

    #[test]
    fn test_cached_list_needs_no_network() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("ABCD.csv"), "1,a.com\n").unwrap();

        let server = MockHttp::start();
        let tranco = client_for(&server.uri(), temp_dir.path());
        let list = tranco.list_for_id("ABCD").unwrap();

        assert_eq!(list.list_id, "ABCD");
        assert_eq!(fs::read_to_string(list.path).unwrap(), "1,a.com\n");
        assert_eq!(server.request_count(), 0);
    }

    #[test]
    fn test_latest_list_downloads_and_clears_stale() {
        let temp_dir = TempDir::new().unwrap();
        let cache = temp_dir.path().join("cache");
        fs::create_dir_all(&cache).unwrap();
        fs::write(cache.join("OLD1.csv"), "1,old.com\n").unwrap();
        fs::write(cache.join("notes.txt"), "keep me").unwrap();

        let server = MockHttp::start();
        server.mock_get("/top-1m-id", 200, "NEW9\n");
        server.mock_get("/download/NEW9/1000", 200, "1,google.com\n2,youtube.com\n");
        let tranco = client_for(&server.uri(), &cache);

        let list = tranco.latest_list().unwrap();
        assert_eq!(list.list_id, "NEW9");
        assert_eq!(
            fs::read_to_string(&list.path).unwrap(),
            "1,google.com\n2,youtube.com\n"
        );
        assert!(!cache.join("OLD1.csv").exists());
        assert!(cache.join("notes.txt").exists());
        assert!(!cache.join("NEW9.csv.part").exists());
    }

    #[test]
    fn test_unavailable_provider_falls_back_to_cache() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("Z1.csv"), "1,a.com\n").unwrap();

        let server = MockHttp::start();
        server.mock_get("/top-1m-id", 503, "maintenance");
        let tranco = client_for(&server.uri(), temp_dir.path());

        let list = tranco.latest_list().unwrap();
        assert_eq!(list.list_id, "Z1");
    }

    #[test]
    fn test_unavailable_provider_without_cache_fails() {
        let temp_dir = TempDir::new().unwrap();
        let server = MockHttp::start();
        server.mock_get("/top-1m-id", 503, "maintenance");
        let tranco = client_for(&server.uri(), temp_dir.path());

        assert!(tranco.latest_list().is_err());
    }

    #[test]
    fn test_empty_list_id_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let server = MockHttp::start();
        server.mock_get("/top-1m-id", 200, "  \n");
        let tranco = client_for(&server.uri(), temp_dir.path());

        assert!(tranco.latest_list_id().is_err());
    }

    #[test]
    fn test_failed_download_leaves_no_list() {
        let temp_dir = TempDir::new().unwrap();
        let server = MockHttp::start();
        server.mock_get("/download/X/1000", 500, "boom");
        let tranco = client_for(&server.uri(), temp_dir.path());

        assert!(tranco.list_for_id("X").is_err());
        assert!(!tranco.cached_list_path("X").exists());
    }
}

//! Season file loader
//!
//! Fetches season CSVs over HTTP or from local paths, optionally through an
//! on-disk cache, and concatenates them into one [`MatchTable`].

use std::path::{Path, PathBuf};

use crate::data::season::parse_season_csv;
use crate::data::MatchTable;
use crate::{FootballError, Result};

/// Loader for football-data.co.uk season files
pub struct SeasonLoader {
    client: reqwest::blocking::Client,
    /// Optional cache directory for downloaded CSV files
    cache_dir: Option<PathBuf>,
    /// If true, only use cache (no network requests)
    offline_only: bool,
    /// If true, ignore cached copies and download again
    refresh: bool,
}

impl SeasonLoader {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent("football-predictor/0.1")
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(SeasonLoader {
            client,
            cache_dir: None,
            offline_only: false,
            refresh: false,
        })
    }

    /// Create loader with a cache directory
    pub fn with_cache<P: AsRef<Path>>(mut self, cache_dir: P) -> Self {
        self.cache_dir = Some(cache_dir.as_ref().to_path_buf());
        self
    }

    /// Set offline-only mode (no network requests, cache must exist)
    pub fn offline_only(mut self, offline: bool) -> Self {
        self.offline_only = offline;
        self
    }

    /// Re-download remote sources even when cached
    pub fn refresh(mut self, refresh: bool) -> Self {
        self.refresh = refresh;
        self
    }

    /// Get the cache file path for a URL
    fn cache_path(&self, url: &str) -> Option<PathBuf> {
        self.cache_dir.as_ref().map(|dir| {
            let filename = url
                .replace("https://", "")
                .replace("http://", "")
                .replace(['/', '?'], "_");
            let filename = if filename.ends_with(".csv") {
                filename
            } else {
                filename + ".csv"
            };
            dir.join(filename)
        })
    }

    fn load_from_cache(&self, url: &str) -> Option<Vec<u8>> {
        let path = self.cache_path(url)?;
        if path.exists() {
            log::debug!("Loading from cache: {}", path.display());
            std::fs::read(&path).ok()
        } else {
            None
        }
    }

    fn save_to_cache(&self, url: &str, bytes: &[u8]) -> Result<()> {
        if let Some(path) = self.cache_path(url) {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, bytes)?;
            log::debug!("Saved to cache: {}", path.display());
        }
        Ok(())
    }

    /// Retrieve the raw bytes of one source
    pub fn fetch_source(&self, source: &str) -> Result<Vec<u8>> {
        if !is_remote(source) {
            return std::fs::read(source).map_err(|e| FootballError::SourceUnavailable {
                source_id: source.to_string(),
                message: e.to_string(),
            });
        }

        if !self.refresh || self.offline_only {
            if let Some(bytes) = self.load_from_cache(source) {
                return Ok(bytes);
            }
        }

        if self.offline_only {
            return Err(FootballError::SourceUnavailable {
                source_id: source.to_string(),
                message: "not cached and offline mode is enabled".to_string(),
            });
        }

        log::info!("Fetching {}", source);
        let response = self
            .client
            .get(source)
            .send()
            .map_err(|e| FootballError::SourceUnavailable {
                source_id: source.to_string(),
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(FootballError::SourceUnavailable {
                source_id: source.to_string(),
                message: format!("server returned {}", response.status()),
            });
        }

        let bytes = response
            .bytes()
            .map_err(|e| FootballError::SourceUnavailable {
                source_id: source.to_string(),
                message: format!("failed reading response body: {}", e),
            })?
            .to_vec();
        self.save_to_cache(source, &bytes)?;
        Ok(bytes)
    }

    /// Fetch and parse every source, concatenated in the given order.
    ///
    /// The first failing source aborts the whole load.
    pub fn load_all(&self, sources: &[String]) -> Result<MatchTable> {
        let mut seasons = Vec::with_capacity(sources.len());
        for source in sources {
            let bytes = self.fetch_source(source)?;
            seasons.push(parse_season_csv(bytes, &season_label(source))?);
        }

        let table = MatchTable::concat(seasons);
        log::info!(
            "Loaded {} matches from {} season files",
            table.len(),
            sources.len()
        );
        Ok(table)
    }
}

fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Short label for a source: the season code for football-data URLs
/// (`.../mmz4281/2425/E0.csv` -> `2425`), the file stem otherwise
pub fn season_label(source: &str) -> String {
    let parts: Vec<&str> = source.trim_end_matches('/').split('/').collect();
    if is_remote(source) && parts.len() >= 2 {
        return parts[parts.len() - 2].to_string();
    }
    Path::new(source)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| source.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_season_label() {
        assert_eq!(
            season_label("https://www.football-data.co.uk/mmz4281/2425/E0.csv"),
            "2425"
        );
        assert_eq!(season_label("fixtures/season_a.csv"), "season_a");
    }

    #[test]
    fn test_cache_path() {
        let loader = SeasonLoader::new().unwrap().with_cache("cache");
        let path = loader
            .cache_path("https://www.football-data.co.uk/mmz4281/2425/E0.csv")
            .unwrap();
        assert_eq!(
            path,
            PathBuf::from("cache/www.football-data.co.uk_mmz4281_2425_E0.csv")
        );
    }

    #[test]
    fn test_offline_without_cache_fails() {
        let dir = tempfile::tempdir().unwrap();
        let loader = SeasonLoader::new()
            .unwrap()
            .with_cache(dir.path())
            .offline_only(true);

        let err = loader
            .load_all(&["https://www.football-data.co.uk/mmz4281/2425/E0.csv".to_string()])
            .unwrap_err();
        assert!(matches!(err, FootballError::SourceUnavailable { .. }));
    }

    #[test]
    fn test_loads_local_files_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("b.csv");
        let second = dir.path().join("a.csv");
        std::fs::write(&first, "HomeTeam,AwayTeam,FTHG,FTAG\nLeeds,Everton,1,1\n").unwrap();
        std::fs::write(&second, "HomeTeam,AwayTeam,FTHG,FTAG\nEverton,Leeds,3,0\nLeeds,Everton,1,1\n").unwrap();

        let loader = SeasonLoader::new().unwrap();
        let table = loader
            .load_all(&[
                first.to_string_lossy().into_owned(),
                second.to_string_lossy().into_owned(),
            ])
            .unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(table.records()[0].season, "b");
        assert_eq!(table.records()[1].home_goals, 3);
    }

    #[test]
    fn test_cached_copy_is_used_offline() {
        let dir = tempfile::tempdir().unwrap();
        let url = "https://www.football-data.co.uk/mmz4281/1920/E0.csv";
        let loader = SeasonLoader::new()
            .unwrap()
            .with_cache(dir.path())
            .offline_only(true);
        loader
            .save_to_cache(url, b"HomeTeam,AwayTeam,FTHG,FTAG\nLiverpool,Norwich,4,1\n")
            .unwrap();

        let table = loader.load_all(&[url.to_string()]).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.records()[0].season, "1920");
    }

    #[test]
    fn test_truncated_download_is_unavailable() {
        use std::io::{Read, Write};

        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/mmz4281/2425/E0.csv", listener.local_addr().unwrap());
        let server = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = [0u8; 1024];
            let _ = stream.read(&mut request);
            // Promises 100 bytes, sends 8, then hangs up
            stream
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\nHomeTeam")
                .unwrap();
        });

        let dir = tempfile::tempdir().unwrap();
        let loader = SeasonLoader::new().unwrap().with_cache(dir.path());
        let err = loader.fetch_source(&url).unwrap_err();
        server.join().unwrap();

        match err {
            FootballError::SourceUnavailable { source_id, .. } => assert_eq!(source_id, url),
            other => panic!("expected SourceUnavailable, got {:?}", other),
        }
        assert!(loader.load_from_cache(&url).is_none());
    }

    #[test]
    fn test_missing_local_file() {
        let loader = SeasonLoader::new().unwrap();
        let err = loader.fetch_source("/nonexistent/E0.csv").unwrap_err();
        assert!(matches!(err, FootballError::SourceUnavailable { .. }));
    }
}

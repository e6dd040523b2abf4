use std::{path::PathBuf, time::Duration};

/// Where the backend lives and how long a call may take.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub scheme: String,
    pub host: String,
    pub port: Option<u16>,
    /// Only development builds talk to a backend on a custom port.
    pub include_port: bool,
    pub request_timeout: Duration,
    pub resource_timeout: Duration,
}

impl ServerConfig {
    pub const DEFAULT_SCHEME: &'static str = "https";
    pub const DEFAULT_HOST: &'static str = "api.travel.example";
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            scheme: Self::DEFAULT_SCHEME.into(),
            host: Self::DEFAULT_HOST.into(),
            port: None,
            include_port: cfg!(debug_assertions),
            request_timeout: Self::DEFAULT_TIMEOUT,
            resource_timeout: Self::DEFAULT_TIMEOUT,
        }
    }
}

/// Locations of the file-backed collaborators under one data directory.
#[derive(Debug, Clone, PartialEq)]
pub struct DataPaths {
    pub session_file: PathBuf,
    pub cache_root: PathBuf,
}

impl DataPaths {
    pub fn under(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            session_file: data_dir.join("session.json"),
            cache_root: data_dir.join("cache"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_use_sixty_second_timeouts() {
        let config = ServerConfig::default();
        assert_eq!(config.request_timeout, Duration::from_secs(60));
        assert_eq!(config.resource_timeout, Duration::from_secs(60));
        assert_eq!(config.port, None);
    }

    #[test]
    fn data_paths_share_a_root() {
        let paths = DataPaths::under("/tmp/travel");
        assert_eq!(paths.session_file, PathBuf::from("/tmp/travel/session.json"));
        assert_eq!(paths.cache_root, PathBuf::from("/tmp/travel/cache"));
    }
}

//! Command-line and environment configuration

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "determination-api")]
#[command(about = "Report drafts and reportability determinations")]
pub struct Config {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "3001")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: IpAddr,

    /// SQLite connection string; defaults to the platform data directory
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn database_url(&self) -> String {
        self.database_url.clone().unwrap_or_else(|| {
            let data_dir = dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("determination-api");
            std::fs::create_dir_all(&data_dir).ok();
            format!("sqlite:{}/reports.db?mode=rwc", data_dir.display())
        })
    }
}

/// Platform data directory
mod dirs {
    use std::path::PathBuf;

    pub fn data_dir() -> Option<PathBuf> {
        #[cfg(target_os = "macos")]
        {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join("Library/Application Support"))
        }
        #[cfg(target_os = "linux")]
        {
            std::env::var("XDG_DATA_HOME")
                .ok()
                .map(PathBuf::from)
                .or_else(|| {
                    std::env::var("HOME")
                        .ok()
                        .map(|h| PathBuf::from(h).join(".local/share"))
                })
        }
        #[cfg(target_os = "windows")]
        {
            std::env::var("APPDATA").ok().map(PathBuf::from)
        }
        #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
        {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_flag() {
        let config = Config::try_parse_from(["determination-api"]).unwrap();
        assert!(!config.verbose);
        let config = Config::try_parse_from(["determination-api", "-v"]).unwrap();
        assert!(config.verbose);
    }

    #[test]
    fn test_explicit_database_url_wins() {
        let config = Config::try_parse_from([
            "determination-api",
            "--database-url",
            "sqlite::memory:",
            "--host",
            "127.0.0.1",
            "-p",
            "8080",
        ])
        .unwrap();
        assert_eq!(config.database_url(), "sqlite::memory:");
        assert_eq!(config.bind_addr().to_string(), "127.0.0.1:8080");
    }
}

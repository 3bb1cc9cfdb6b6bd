use std::path::PathBuf;

use clap::Parser;

use crate::level::{Level, LevelError};

pub const DEFAULT_PORT: u16 = 8888;

#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about = "Five-player Pacman match server")]
pub struct ServerArgs {
    /// Listen port. Falls back to $PORT, then 8888.
    #[arg(long)]
    pub port: Option<u16>,
    /// Level file. Falls back to $LEVEL_PATH, then the built-in maze.
    #[arg(long)]
    pub level: Option<PathBuf>,
    /// Directory with a browser client. Falls back to $STATIC_DIR.
    #[arg(long)]
    pub static_dir: Option<PathBuf>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    pub level_path: Option<PathBuf>,
    pub static_dir: Option<PathBuf>,
}

impl ServerConfig {
    pub fn from_args(args: ServerArgs) -> Self {
        Self::resolve(args, |key| std::env::var(key).ok())
    }

    fn resolve(args: ServerArgs, env: impl Fn(&str) -> Option<String>) -> Self {
        let port = args
            .port
            .or_else(|| env("PORT").and_then(|value| value.parse::<u16>().ok()))
            .unwrap_or(DEFAULT_PORT);
        let level_path = args
            .level
            .or_else(|| env("LEVEL_PATH").filter(|value| !value.is_empty()).map(PathBuf::from));
        let static_dir = args
            .static_dir
            .or_else(|| env("STATIC_DIR").filter(|value| !value.is_empty()).map(PathBuf::from));
        Self {
            port,
            level_path,
            static_dir,
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }

    pub fn load_level(&self) -> Result<Level, LevelError> {
        match &self.level_path {
            Some(path) => Level::load(path),
            None => Level::classic(),
        }
    }

    /// The static root is only served when it holds an `index.html`.
    pub fn resolve_static_dir(&self) -> Option<PathBuf> {
        self.static_dir
            .clone()
            .filter(|path| path.join("index.html").is_file())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_without_flags_or_env() {
        let config = ServerConfig::resolve(ServerArgs::default(), env_of(&[]));
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.level_path, None);
        assert_eq!(config.static_dir, None);
        assert_eq!(config.bind_addr(), "0.0.0.0:8888");
    }

    #[test]
    fn env_fills_in_missing_flags() {
        let config = ServerConfig::resolve(
            ServerArgs::default(),
            env_of(&[("PORT", "9000"), ("LEVEL_PATH", "levels/custom.txt")]),
        );
        assert_eq!(config.port, 9000);
        assert_eq!(config.level_path, Some(PathBuf::from("levels/custom.txt")));
    }

    #[test]
    fn flags_win_over_env() {
        let args = ServerArgs::parse_from(["server", "--port", "7000", "--static-dir", "web"]);
        let config = ServerConfig::resolve(
            args,
            env_of(&[("PORT", "9000"), ("STATIC_DIR", "elsewhere")]),
        );
        assert_eq!(config.port, 7000);
        assert_eq!(config.static_dir, Some(PathBuf::from("web")));
    }

    #[test]
    fn unparsable_port_falls_back_to_default() {
        let config = ServerConfig::resolve(ServerArgs::default(), env_of(&[("PORT", "http")]));
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[test]
    fn built_in_level_is_used_without_a_path() {
        let config = ServerConfig::resolve(ServerArgs::default(), env_of(&[]));
        let level = config.load_level().expect("built-in level should load");
        assert_eq!(level.grid.width(), 28);
        assert!(config.resolve_static_dir().is_none());
    }

    #[test]
    fn missing_level_file_is_an_io_error() {
        let config = ServerConfig::resolve(
            ServerArgs::default(),
            env_of(&[("LEVEL_PATH", "/definitely/not/here.txt")]),
        );
        assert!(matches!(config.load_level(), Err(LevelError::Io(_))));
    }
}

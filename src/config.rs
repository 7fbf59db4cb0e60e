//! Graph configuration loaded from a properties file
//!
//! The file uses the familiar `key=value` properties syntax. Recognised keys:
//!
//! | key                    | values                          | default    |
//! |------------------------|---------------------------------|------------|
//! | `storage.backend`      | `inmemory`, `local`             | `inmemory` |
//! | `storage.directory`    | path, required for `local`      |            |
//! | `storage.transactions` | `true` / `false`                | `true`     |
//! | `schema.default`       | `default`, `none`               | `default`  |
//! | `index.search.backend` | backend name, enables mixed indexes |        |
//! | `graph.graphname`      | display name                    | `graphapp` |
//!
//! Unknown keys are kept and can be read with [`GraphConfig::get`].

use crate::schema::SchemaDefault;
use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const STORAGE_BACKEND: &str = "storage.backend";
pub const STORAGE_DIRECTORY: &str = "storage.directory";
pub const STORAGE_TRANSACTIONS: &str = "storage.transactions";
pub const SCHEMA_DEFAULT: &str = "schema.default";
pub const INDEX_SEARCH_BACKEND: &str = "index.search.backend";
pub const GRAPH_NAME: &str = "graph.graphname";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read properties file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Missing required property '{0}'")]
    Missing(&'static str),

    #[error("Invalid value '{value}' for property '{key}'")]
    Invalid { key: String, value: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Where committed graph data lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    /// Process memory only; gone when the graph is closed
    InMemory,
    /// Snapshot file under a directory, reloaded on open
    Local(PathBuf),
}

/// Parsed graph configuration
#[derive(Debug, Clone, Default)]
pub struct GraphConfig {
    properties: IndexMap<String, String>,
    /// Directory relative paths resolve against
    base_dir: Option<PathBuf>,
}

impl GraphConfig {
    /// Configuration for a transactional in-memory graph
    pub fn in_memory() -> Self {
        GraphConfig::default().with(STORAGE_BACKEND, "inmemory")
    }

    /// Configuration for a snapshot-backed graph under `dir`
    pub fn local(dir: impl AsRef<Path>) -> Self {
        GraphConfig::default()
            .with(STORAGE_BACKEND, "local")
            .with(STORAGE_DIRECTORY, dir.as_ref().to_string_lossy())
    }

    /// Read and parse a properties file
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::parse(&text);
        config.base_dir = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    /// Parse properties text
    pub fn parse(text: &str) -> Self {
        GraphConfig {
            properties: parse_properties(text),
            base_dir: None,
        }
    }

    /// Builder-style setter
    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.properties.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(|v| v.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(|k| k.as_str())
    }

    pub fn storage_backend(&self) -> ConfigResult<StorageBackend> {
        match self.get(STORAGE_BACKEND).unwrap_or("inmemory") {
            "inmemory" => Ok(StorageBackend::InMemory),
            "local" => {
                let dir = self
                    .get(STORAGE_DIRECTORY)
                    .ok_or(ConfigError::Missing(STORAGE_DIRECTORY))?;
                Ok(StorageBackend::Local(self.resolve_path(dir)))
            }
            other => Err(invalid(STORAGE_BACKEND, other)),
        }
    }

    pub fn transactions_enabled(&self) -> ConfigResult<bool> {
        self.bool_value(STORAGE_TRANSACTIONS, true)
    }

    pub fn schema_default(&self) -> ConfigResult<SchemaDefault> {
        match self.get(SCHEMA_DEFAULT).map(|v| v.to_ascii_lowercase()) {
            None => Ok(SchemaDefault::Default),
            Some(v) if v == "default" => Ok(SchemaDefault::Default),
            Some(v) if v == "none" => Ok(SchemaDefault::None),
            Some(v) => Err(invalid(SCHEMA_DEFAULT, &v)),
        }
    }

    /// Name of the search backend, when mixed indexes are enabled
    pub fn search_backend(&self) -> Option<&str> {
        self.get(INDEX_SEARCH_BACKEND).filter(|v| !v.is_empty())
    }

    pub fn graph_name(&self) -> &str {
        self.get(GRAPH_NAME).unwrap_or("graphapp")
    }

    fn bool_value(&self, key: &'static str, default: bool) -> ConfigResult<bool> {
        match self.get(key) {
            None => Ok(default),
            Some(v) if v.eq_ignore_ascii_case("true") => Ok(true),
            Some(v) if v.eq_ignore_ascii_case("false") => Ok(false),
            Some(v) => Err(invalid(key, v)),
        }
    }

    fn resolve_path(&self, value: &str) -> PathBuf {
        let path = PathBuf::from(value);
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path,
        }
    }
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::Invalid {
        key: key.to_string(),
        value: value.to_string(),
    }
}

/// Parse `.properties` syntax into ordered key/value pairs
fn parse_properties(text: &str) -> IndexMap<String, String> {
    let mut properties = IndexMap::new();
    let mut logical = String::new();

    for raw in text.lines() {
        // continuation lines drop their indentation too
        let line = raw.trim_start();
        let comment = line.starts_with('#') || line.starts_with('!');
        if logical.is_empty() && (line.is_empty() || comment) {
            continue;
        }
        if ends_with_continuation(line) {
            logical.push_str(&line[..line.len() - 1]);
            continue;
        }
        logical.push_str(line);
        let (key, value) = split_entry(&logical);
        properties.insert(key, value);
        logical.clear();
    }
    if !logical.is_empty() {
        let (key, value) = split_entry(&logical);
        properties.insert(key, value);
    }
    properties
}

/// An odd run of trailing backslashes continues the line
fn ends_with_continuation(line: &str) -> bool {
    line.chars().rev().take_while(|c| *c == '\\').count() % 2 == 1
}

fn split_entry(line: &str) -> (String, String) {
    let chars: Vec<char> = line.chars().collect();
    let mut i = 0;
    let mut escaped = false;
    while i < chars.len() {
        let c = chars[i];
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == '=' || c == ':' || c.is_whitespace() {
            break;
        }
        i += 1;
    }
    let key: String = chars[..i].iter().collect();

    // skip whitespace, at most one separator, then whitespace again
    let mut j = i;
    while j < chars.len() && chars[j].is_whitespace() {
        j += 1;
    }
    if j < chars.len() && (chars[j] == '=' || chars[j] == ':') {
        j += 1;
    }
    while j < chars.len() && chars[j].is_whitespace() {
        j += 1;
    }
    let value: String = chars[j..].iter().collect();
    (unescape(&key), unescape(&value))
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\u{c}'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => out.push(decoded),
                    None => {
                        out.push_str("\\u");
                        out.push_str(&hex);
                    }
                }
            }
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_separators_and_comments() {
        let config = GraphConfig::parse(
            "# comment\n\
             ! also a comment\n\
             \n\
             storage.backend=inmemory\n\
             graph.graphname : gods\n\
             index.search.backend   search\n",
        );
        assert_eq!(config.get("storage.backend"), Some("inmemory"));
        assert_eq!(config.get("graph.graphname"), Some("gods"));
        assert_eq!(config.search_backend(), Some("search"));
        assert_eq!(config.keys().count(), 3);
    }

    #[test]
    fn test_parse_continuations_and_escapes() {
        let config = GraphConfig::parse(
            "greeting = hello \\\n    world\n\
             path=C:\\\\data\\\\graph\n\
             key\\ with\\ spaces=x\\ty\n\
             unicode=\\u0041BC\n\
             trailing=\\\\\n",
        );
        assert_eq!(config.get("greeting"), Some("hello world"));
        assert_eq!(config.get("path"), Some("C:\\data\\graph"));
        assert_eq!(config.get("key with spaces"), Some("x\ty"));
        assert_eq!(config.get("unicode"), Some("ABC"));
        assert_eq!(config.get("trailing"), Some("\\"));
    }

    #[test]
    fn test_trailing_whitespace_is_kept() {
        let config = GraphConfig::parse("padded=b  \n\
             escaped=b\\ \n\
             graph.graphname = gods\t\n");
        assert_eq!(config.get("padded"), Some("b  "));
        assert_eq!(config.get("escaped"), Some("b "));
        assert_eq!(config.get("graph.graphname"), Some("gods\t"));
    }

    #[test]
    fn test_later_keys_win_and_empty_values() {
        let config = GraphConfig::parse("a=1\na=2\nb=\nc\n");
        assert_eq!(config.get("a"), Some("2"));
        assert_eq!(config.get("b"), Some(""));
        assert_eq!(config.get("c"), Some(""));
    }

    #[test]
    fn test_defaults() {
        let config = GraphConfig::parse("");
        assert_eq!(config.storage_backend().unwrap(), StorageBackend::InMemory);
        assert!(config.transactions_enabled().unwrap());
        assert_eq!(config.schema_default().unwrap(), SchemaDefault::Default);
        assert!(config.search_backend().is_none());
        assert_eq!(config.graph_name(), "graphapp");
    }

    #[test]
    fn test_invalid_values() {
        let config = GraphConfig::parse(
            "storage.backend=cassandra\nstorage.transactions=maybe\nschema.default=strict",
        );
        assert!(matches!(config.storage_backend(), Err(ConfigError::Invalid { .. })));
        assert!(matches!(config.transactions_enabled(), Err(ConfigError::Invalid { .. })));
        assert!(matches!(config.schema_default(), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_local_backend_requires_directory() {
        let config = GraphConfig::parse("storage.backend=local");
        assert!(matches!(config.storage_backend(), Err(ConfigError::Missing(STORAGE_DIRECTORY))));
    }

    #[test]
    fn test_relative_directory_resolves_against_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("graph.properties");
        std::fs::write(&file, "storage.backend=local\nstorage.directory=data/gods\n").unwrap();

        let config = GraphConfig::from_file(&file).unwrap();
        assert_eq!(
            config.storage_backend().unwrap(),
            StorageBackend::Local(dir.path().join("data/gods"))
        );
    }

    #[test]
    fn test_missing_file() {
        let err = GraphConfig::from_file("/definitely/not/here.properties").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}

//! Environment resolution.
//!
//! Combines the ambient process environment with an optional `.env` file
//! into one key/value map. The process environment is never mutated, so
//! callers (and tests) can resolve as many synthetic environments as they
//! like.

use std::collections::{BTreeMap, BTreeSet};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::db::DATABASE_URL_VAR;

/// File name looked up in the working directory.
pub const ENV_FILE_NAME: &str = ".env";

/// Outcome of the env file load attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvFileStatus {
    /// No file was consulted.
    NotRequested,
    /// The file was read; `vars` counts the entries it defined.
    Loaded { path: PathBuf, vars: usize },
    /// The file could not be read or parsed.
    Failed { path: PathBuf, reason: String },
}

/// The effective environment after merging ambient variables with the env file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEnv {
    vars: BTreeMap<String, String>,
    /// Ambient keys whose values are not valid UTF-8. They still shadow the file.
    non_utf8: BTreeSet<String>,
    file: EnvFileStatus,
}

impl ResolvedEnv {
    /// Uses `vars` as the whole environment, without consulting any file.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: vars
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            non_utf8: BTreeSet::new(),
            file: EnvFileStatus::NotRequested,
        }
    }

    /// Merges `env_file` into `ambient`.
    ///
    /// Ambient values always win: a key already present in `ambient` (even
    /// with an empty value) is never replaced by the file. A missing or
    /// malformed file is reported through [`EnvFileStatus::Failed`] and a
    /// warning; it never aborts resolution. Entries parsed before a syntax
    /// error are kept.
    pub fn load<I, K, V>(ambient: I, env_file: &Path) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::from_vars(ambient).merge_env_file(env_file)
    }

    /// Like [`ResolvedEnv::load`], over raw OS strings.
    ///
    /// Keys that are not valid UTF-8 cannot appear in an env file and are
    /// dropped. A UTF-8 key with a non-UTF-8 value is remembered so the file
    /// cannot override it; [`ResolvedEnv::get`] reports it as unset and
    /// [`ResolvedEnv::is_non_utf8`] flags it.
    pub fn load_os<I>(ambient: I, env_file: &Path) -> Self
    where
        I: IntoIterator<Item = (OsString, OsString)>,
    {
        let mut resolved = Self::from_vars(std::iter::empty::<(String, String)>());
        for (key, value) in ambient {
            let Ok(key) = key.into_string() else {
                continue;
            };
            match value.into_string() {
                Ok(value) => {
                    resolved.vars.insert(key, value);
                }
                Err(_) => {
                    warn!(key = %key, "env_var=non_utf8, value ignored");
                    resolved.non_utf8.insert(key);
                }
            }
        }
        resolved.merge_env_file(env_file)
    }

    fn merge_env_file(mut self, env_file: &Path) -> Self {
        let ambient_has_url = self.is_ambient(DATABASE_URL_VAR);

        let failure = match dotenvy::from_path_iter(env_file) {
            Ok(iter) => {
                let mut count = 0;
                let mut parse_error = None;
                for item in iter {
                    match item {
                        Ok((key, value)) => {
                            count += 1;
                            if !self.non_utf8.contains(&key) {
                                self.vars.entry(key).or_insert(value);
                            }
                        }
                        Err(e) => {
                            parse_error = Some(e.to_string());
                            break;
                        }
                    }
                }
                match parse_error {
                    Some(reason) => Some(reason),
                    None => {
                        debug!(path = %env_file.display(), vars = count, "env_file=loaded");
                        self.file = EnvFileStatus::Loaded {
                            path: env_file.to_path_buf(),
                            vars: count,
                        };
                        None
                    }
                }
            }
            Err(e) => Some(e.to_string()),
        };

        if let Some(reason) = failure {
            if ambient_has_url {
                warn!(
                    path = %env_file.display(),
                    reason = %reason,
                    "env_file=unavailable, continuing with the process environment"
                );
            } else {
                warn!(
                    path = %env_file.display(),
                    reason = %reason,
                    "env_file=unavailable and {DATABASE_URL_VAR} is not exported; verify that the {ENV_FILE_NAME} file exists"
                );
            }
            self.file = EnvFileStatus::Failed {
                path: env_file.to_path_buf(),
                reason,
            };
        }

        self
    }

    fn is_ambient(&self, key: &str) -> bool {
        self.vars.contains_key(key) || self.non_utf8.contains(key)
    }

    /// Resolves the real process environment plus `<cwd>/.env`.
    pub fn from_process() -> Self {
        Self::load_os(std::env::vars_os(), &default_env_file_path())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Parses `key`, falling back to `default` when unset or unparseable.
    pub fn get_parsed_or<T: std::str::FromStr>(&self, key: &str, default: T) -> T {
        self.get(key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    /// True when `key` is set in the ambient environment to a non-UTF-8 value.
    pub fn is_non_utf8(&self, key: &str) -> bool {
        self.non_utf8.contains(key)
    }

    pub fn file_status(&self) -> &EnvFileStatus {
        &self.file
    }

    /// Reason the env file could not be used, if it failed.
    pub fn file_error(&self) -> Option<&str> {
        match &self.file {
            EnvFileStatus::Failed { reason, .. } => Some(reason),
            _ => None,
        }
    }
}

/// `<cwd>/.env`, or a relative `.env` when the working directory is unknown.
pub fn default_env_file_path() -> PathBuf {
    std::env::current_dir()
        .map(|dir| dir.join(ENV_FILE_NAME))
        .unwrap_or_else(|_| PathBuf::from(ENV_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_vars_does_not_touch_files() {
        let env = ResolvedEnv::from_vars([("A", "1")]);
        assert_eq!(env.get("A"), Some("1"));
        assert_eq!(env.get("B"), None);
        assert_eq!(env.file_status(), &EnvFileStatus::NotRequested);
        assert!(env.file_error().is_none());
    }

    #[test]
    fn test_get_parsed_or_falls_back() {
        let env = ResolvedEnv::from_vars([("PORT", "8080"), ("BAD", "eighty")]);
        assert_eq!(env.get_parsed_or("PORT", 3001u16), 8080);
        assert_eq!(env.get_parsed_or("BAD", 3001u16), 3001);
        assert_eq!(env.get_parsed_or("MISSING", 3001u16), 3001);
    }

    #[test]
    fn test_default_env_file_path_ends_with_dotenv() {
        assert!(default_env_file_path().ends_with(ENV_FILE_NAME));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_ambient_value_still_shadows_file() {
        use std::os::unix::ffi::OsStringExt;

        let fixture = backend_test_support::EnvFixture::with_file(
            "DATABASE_URL=postgres://file:f@filehost/file_db\nOTHER=from_file\n",
        );

        let ambient = [(
            OsString::from(DATABASE_URL_VAR),
            OsString::from_vec(b"postgres://u:p\xff@h/ambient_db".to_vec()),
        )];
        let env = ResolvedEnv::load_os(ambient, &fixture.env_path());

        assert!(env.is_non_utf8(DATABASE_URL_VAR));
        assert_eq!(env.get(DATABASE_URL_VAR), None);
        assert_eq!(env.get("OTHER"), Some("from_file"));
        assert!(matches!(env.file_status(), EnvFileStatus::Loaded { vars: 2, .. }));
    }
}

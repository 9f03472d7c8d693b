use crate::error::Result;
use std::env;
use std::path::PathBuf;

/// Environment variable naming the store directory.
pub const STORE_DIR_ENV: &str = "TESTDRAFT_STORE_DIR";

/// Store directory relative to the working directory when nothing else is set.
pub const DEFAULT_STORE_DIR: &str = ".testdraft/tests";

/// Where test records live.
///
/// Resolution order: an explicit directory ([`StoreConfig::with_dir`]), then
/// `$TESTDRAFT_STORE_DIR` (picked up by [`StoreConfig::from_env`]), then
/// [`DEFAULT_STORE_DIR`] under the base directory (the current directory
/// unless [`StoreConfig::with_base`] says otherwise).
#[derive(Debug, Clone, Default)]
pub struct StoreConfig {
    dir: Option<PathBuf>,
    base: Option<PathBuf>,
}

impl StoreConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        Self {
            dir: env::var_os(STORE_DIR_ENV)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            base: None,
        }
    }

    pub fn with_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.dir = Some(dir.into());
        self
    }

    pub fn with_base<P: Into<PathBuf>>(mut self, base: P) -> Self {
        self.base = Some(base.into());
        self
    }

    pub fn store_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.dir {
            return Ok(dir.clone());
        }
        let base = match self.base {
            Some(ref base) => base.clone(),
            None => env::current_dir()?,
        };
        Ok(base.join(DEFAULT_STORE_DIR))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_dir_wins() {
        let c = StoreConfig::new().with_base("/base").with_dir("/explicit");
        assert_eq!(c.store_dir().unwrap(), PathBuf::from("/explicit"));
    }

    #[test]
    fn test_default_under_base() {
        let c = StoreConfig::new().with_base("/base");
        assert_eq!(
            c.store_dir().unwrap(),
            PathBuf::from("/base").join(DEFAULT_STORE_DIR)
        );
    }

    #[test]
    fn test_default_under_current_dir() {
        let c = StoreConfig::new();
        let cwd = env::current_dir().unwrap();
        assert_eq!(c.store_dir().unwrap(), cwd.join(DEFAULT_STORE_DIR));
    }
}

//! Session state files shared by the `session`, `edit`, and `store`
//! subcommands.
//!
//! Each file holds one [`DraftSession`] plus a little bookkeeping. Writes are
//! atomic (temp file in the same directory, then rename).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use testdraft::v1::{DraftSession, FunctionDescriptor};
use testdraft_store::{DirStore, StoreConfig};

pub const SESSION_PREFIX: &str = "draft-";

const SESSION_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionFile {
    pub version: u32,
    pub created_at: String,
    pub session: DraftSession,
}

impl SessionFile {
    pub fn new(session: DraftSession) -> Self {
        Self {
            version: SESSION_VERSION,
            created_at: now_iso8601(),
            session,
        }
    }
}

// ============================================================================
// Paths
// ============================================================================

pub fn now_iso8601() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

pub fn session_dir(explicit: Option<&PathBuf>) -> PathBuf {
    explicit.cloned().unwrap_or_else(std::env::temp_dir)
}

/// A fresh `draft-<ts>-<pid>[-n].json` path in `dir`.
pub fn new_session_path(dir: &Path) -> PathBuf {
    let ts = chrono::Utc::now().format("%Y%m%dT%H%M%S");
    let pid = std::process::id();
    let mut path = dir.join(format!("{SESSION_PREFIX}{ts}-{pid}.json"));
    let mut n = 2u32;
    while path.exists() {
        path = dir.join(format!("{SESSION_PREFIX}{ts}-{pid}-{n}.json"));
        n += 1;
    }
    path
}

// ============================================================================
// Load / save
// ============================================================================

pub fn load_session(path: &Path) -> Result<SessionFile> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read session file: {}", path.display()))?;
    let file: SessionFile = serde_json::from_str(&data)
        .with_context(|| format!("failed to parse session file: {}", path.display()))?;
    if file.version != SESSION_VERSION {
        anyhow::bail!(
            "unsupported session version {} in {}",
            file.version,
            path.display()
        );
    }
    Ok(file)
}

pub fn save_session(path: &Path, file: &SessionFile) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create session directory: {}", dir.display()))?;
    let tmp = tempfile::NamedTempFile::new_in(dir)
        .context("failed to create temp file for atomic write")?;
    serde_json::to_writer_pretty(&tmp, file).context("failed to serialize session")?;
    tmp.persist(path)
        .with_context(|| format!("failed to persist session file: {}", path.display()))?;
    Ok(())
}

/// Load, mutate, and save a session. Nothing is written if `f` fails.
pub fn with_session<T>(
    path: &Path,
    f: impl FnOnce(&mut DraftSession) -> Result<T>,
) -> Result<T> {
    let mut file = load_session(path)?;
    let out = f(&mut file.session)?;
    save_session(path, &file)?;
    Ok(out)
}

// ============================================================================
// Inputs and outputs
// ============================================================================

pub fn read_stdin() -> Result<String> {
    let mut buf = String::new();
    io::stdin()
        .read_to_string(&mut buf)
        .context("failed to read stdin")?;
    Ok(buf)
}

/// Read a file, or stdin when `path` is `-`.
pub fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        return read_stdin();
    }
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

/// Parse inline JSON, falling back to stdin when none was given.
pub fn json_arg(inline: Option<String>, what: &str) -> Result<serde_json::Value> {
    let text = match inline {
        Some(text) => text,
        None => read_stdin()?,
    };
    serde_json::from_str(&text).with_context(|| format!("failed to parse {what} JSON"))
}

pub fn read_function(path: &Path) -> Result<FunctionDescriptor> {
    let data = read_input(path)?;
    serde_json::from_str(&data)
        .with_context(|| format!("failed to parse function descriptor: {}", path.display()))
}

pub fn open_store(store_dir: Option<PathBuf>) -> Result<DirStore> {
    let config = match store_dir {
        Some(dir) => StoreConfig::new().with_dir(dir),
        None => StoreConfig::from_env(),
    };
    DirStore::from_config(&config).context("failed to open test store")
}

pub fn format_json<T: Serialize + ?Sized>(value: &T, pretty: bool) -> Result<String> {
    if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .context("failed to serialize output")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use testdraft::v1::{Command, ParameterPattern as P};

    fn session() -> DraftSession {
        DraftSession::fresh(
            FunctionDescriptor::new("/p", "src/f.js", "f")
                .with_parameters("f", vec![P::identifier("a")]),
        )
    }

    #[test]
    fn test_save_then_load() {
        let tmp = TempDir::new().unwrap();
        let path = new_session_path(tmp.path());
        assert!(
            path.file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with(SESSION_PREFIX)
        );

        save_session(&path, &SessionFile::new(session())).unwrap();
        let loaded = load_session(&path).unwrap();
        assert_eq!(loaded.version, SESSION_VERSION);
        assert_eq!(loaded.session.draft(), session().draft());
    }

    #[test]
    fn test_new_session_path_avoids_collisions() {
        let tmp = TempDir::new().unwrap();
        let first = new_session_path(tmp.path());
        std::fs::write(&first, "{}").unwrap();
        let second = new_session_path(tmp.path());
        assert_ne!(first, second);
    }

    #[test]
    fn test_with_session_skips_save_on_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("draft-x.json");
        save_session(&path, &SessionFile::new(session())).unwrap();

        let result: Result<()> = with_session(&path, |s| {
            s.apply(&Command::rename("changed"))?;
            anyhow::bail!("nope")
        });
        assert!(result.is_err());
        assert_eq!(load_session(&path).unwrap().session.draft().custom_name, "");

        with_session(&path, |s| {
            s.apply(&Command::rename("kept"))?;
            Ok(())
        })
        .unwrap();
        assert_eq!(
            load_session(&path).unwrap().session.draft().custom_name,
            "kept"
        );
    }

    #[test]
    fn test_load_rejects_unknown_version() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("draft-x.json");
        let mut file = SessionFile::new(session());
        file.version = 99;
        save_session(&path, &file).unwrap();
        let err = load_session(&path).unwrap_err();
        assert!(err.to_string().contains("unsupported session version"));
    }

    #[test]
    fn test_read_function_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("f.json");
        std::fs::write(
            &path,
            r#"{"pathToProject":"/p","fileId":"a.js","functionId":"g",
                "arguments":[{"functionName":"g","body":{"type":"Identifier","name":"x"}}]}"#,
        )
        .unwrap();
        let f = read_function(&path).unwrap();
        assert_eq!(f.function_id, "g");
        assert_eq!(f.arguments.len(), 1);
    }

    #[test]
    fn test_format_json() {
        let v = serde_json::json!({"a": 1});
        assert_eq!(format_json(&v, false).unwrap(), r#"{"a":1}"#);
        assert!(format_json(&v, true).unwrap().contains('\n'));
    }
}

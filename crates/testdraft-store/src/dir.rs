use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::{NewTest, TestFilter, TestRecord, TestStore};
use chrono::Utc;
use std::path::{Path, PathBuf};
use testdraft::v1::ModuleMap;

/// One pretty-printed JSON file per test, named `<id>.json`.
///
/// Writes go to a temp file in the same directory and are renamed into
/// place, so a crash never leaves a half-written record.
#[derive(Debug, Clone)]
pub struct DirStore {
    dir: PathBuf,
}

impl DirStore {
    /// Use `dir`, creating it if needed.
    pub fn open<P: Into<PathBuf>>(dir: P) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        Self::open(config.store_dir()?)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, id: &str) -> Result<PathBuf> {
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StoreError::InvalidId(id.to_string()));
        }
        Ok(self.dir.join(format!("{id}.json")))
    }

    fn next_id(&self) -> Result<String> {
        let ts = Utc::now().format("%Y%m%dT%H%M%S");
        let mut n = 1u32;
        loop {
            let id = format!("test-{ts}-{n}");
            if !self.record_path(&id)?.exists() {
                return Ok(id);
            }
            n += 1;
        }
    }

    fn read(&self, id: &str) -> Result<TestRecord> {
        let path = self.record_path(id)?;
        let data = match std::fs::read_to_string(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(id.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&data)?)
    }

    fn write(&self, record: &TestRecord) -> Result<()> {
        let path = self.record_path(&record.id)?;
        let tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        serde_json::to_writer_pretty(&tmp, record)?;
        tmp.persist(&path)?;
        Ok(())
    }
}

impl TestStore for DirStore {
    fn create(&self, test: NewTest) -> Result<TestRecord> {
        let now = Utc::now();
        let record = TestRecord {
            id: self.next_id()?,
            path_to_project: test.path_to_project,
            file_id: test.file_id,
            function_id: test.function_id,
            custom_name: test.custom_name.unwrap_or_default(),
            module_data: test.module_data,
            created_at: now,
            updated_at: now,
        };
        self.write(&record)?;
        tracing::debug!(id = %record.id, function = %record.function_id, "test created");
        Ok(record)
    }

    fn update(&self, id: &str, module_data: &ModuleMap, custom_name: &str) -> Result<TestRecord> {
        let mut record = self.read(id)?;
        record.module_data = module_data.clone();
        record.custom_name = custom_name.to_string();
        record.updated_at = Utc::now();
        self.write(&record)?;
        tracing::debug!(id, "test updated");
        Ok(record)
    }

    fn delete(&self, id: &str) -> Result<()> {
        let path = self.record_path(id)?;
        match std::fs::remove_file(&path) {
            Ok(()) => {
                tracing::debug!(id, "test deleted");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn get(&self, id: &str) -> Result<TestRecord> {
        self.read(id)
    }

    fn list(&self, filter: &TestFilter) -> Result<Vec<TestRecord>> {
        let mut records = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let parsed = std::fs::read_to_string(&path)
                .map_err(StoreError::from)
                .and_then(|data| serde_json::from_str::<TestRecord>(&data).map_err(Into::into));
            match parsed {
                Ok(record) if filter.matches(&record) => records.push(record),
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable record");
                }
            }
        }
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(records)
    }
}

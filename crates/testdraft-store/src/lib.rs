#![doc = include_str!("../README.md")]

pub mod config;
pub mod dir;
pub mod error;

pub use config::StoreConfig;
pub use dir::DirStore;
pub use error::{Result, StoreError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use testdraft::v1::{ModuleMap, TestDraft};

// ── Records ──────────────────────────────────────────────────────────

/// A persisted test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestRecord {
    pub id: String,
    pub path_to_project: String,
    pub file_id: String,
    pub function_id: String,
    #[serde(default)]
    pub custom_name: String,
    #[serde(default)]
    pub module_data: ModuleMap,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TestRecord {
    /// The record as a draft, ready to be edited or used as the snapshot
    /// that discarding restores.
    pub fn to_draft(&self) -> TestDraft {
        TestDraft {
            id: Some(self.id.clone()),
            path_to_project: self.path_to_project.clone(),
            file_id: self.file_id.clone(),
            function_id: self.function_id.clone(),
            custom_name: self.custom_name.clone(),
            module_data: self.module_data.clone(),
        }
    }
}

/// Everything needed to create a record; the store assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTest {
    pub path_to_project: String,
    pub file_id: String,
    pub function_id: String,
    pub module_data: ModuleMap,
    pub custom_name: Option<String>,
}

impl NewTest {
    pub fn from_draft(draft: &TestDraft) -> Self {
        Self {
            path_to_project: draft.path_to_project.clone(),
            file_id: draft.file_id.clone(),
            function_id: draft.function_id.clone(),
            module_data: draft.module_data.clone(),
            custom_name: Some(draft.custom_name.clone()).filter(|n| !n.is_empty()),
        }
    }
}

/// Narrows [`TestStore::list`]; `None` fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestFilter {
    pub path_to_project: Option<String>,
    pub file_id: Option<String>,
    pub function_id: Option<String>,
}

impl TestFilter {
    pub fn matches(&self, record: &TestRecord) -> bool {
        fn field(want: &Option<String>, have: &str) -> bool {
            want.as_deref().is_none_or(|w| w == have)
        }
        field(&self.path_to_project, &record.path_to_project)
            && field(&self.file_id, &record.file_id)
            && field(&self.function_id, &record.function_id)
    }
}

// ── Gateway ──────────────────────────────────────────────────────────

/// Storage for committed test records.
pub trait TestStore {
    /// Persist a new test and assign its id.
    fn create(&self, test: NewTest) -> Result<TestRecord>;

    /// Overwrite a test's module data and name.
    fn update(&self, id: &str, module_data: &ModuleMap, custom_name: &str) -> Result<TestRecord>;

    fn delete(&self, id: &str) -> Result<()>;

    fn get(&self, id: &str) -> Result<TestRecord>;

    /// Records matching `filter`, oldest first.
    fn list(&self, filter: &TestFilter) -> Result<Vec<TestRecord>>;
}

/// Create or update depending on whether the draft has an id. Returns the
/// persisted form, which should replace the draft and become its snapshot.
pub fn save_draft<S: TestStore + ?Sized>(store: &S, draft: &TestDraft) -> Result<TestDraft> {
    let record = match &draft.id {
        Some(id) => store.update(id, &draft.module_data, &draft.custom_name)?,
        None => store.create(NewTest::from_draft(draft))?,
    };
    Ok(record.to_draft())
}

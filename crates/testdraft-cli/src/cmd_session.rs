use crate::session_file::{
    SESSION_PREFIX, SessionFile, format_json, json_arg, load_session, new_session_path,
    open_store, read_function, save_session, session_dir, with_session,
};
use anyhow::{Context, Result};
use clap::Subcommand;
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use testdraft::v1::{Command, DraftSession, ModuleName, TestDraft};
use testdraft_store::TestStore;

// ============================================================================
// CLI argument types
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum SessionOp {
    /// Start an unsaved draft for an analyzed function; prints the session path
    New {
        /// Function descriptor JSON (use - for stdin)
        #[arg(long)]
        function: PathBuf,

        /// Initial custom name for the test
        #[arg(long)]
        name: Option<String>,

        /// Directory for session files (default: $TMPDIR)
        #[arg(long)]
        session_dir: Option<PathBuf>,
    },

    /// Resume editing a persisted test; prints the session path
    Load {
        /// Function descriptor JSON the test belongs to (use - for stdin)
        #[arg(long)]
        function: PathBuf,

        /// Id of the persisted test
        #[arg(long)]
        id: String,

        /// Test store directory (default: $TESTDRAFT_STORE_DIR or .testdraft/tests)
        #[arg(long)]
        store_dir: Option<PathBuf>,

        /// Directory for session files (default: $TMPDIR)
        #[arg(long)]
        session_dir: Option<PathBuf>,
    },

    /// Print the current draft
    Show {
        #[arg(long)]
        session: PathBuf,
    },

    /// Apply command envelopes ({"kind", "tag", "payload"}) to the draft.
    /// Accepts one envelope or an array; all apply or none do.
    Apply {
        #[arg(long)]
        session: PathBuf,

        /// Envelope JSON (default: read from stdin)
        #[arg(long)]
        command: Option<String>,
    },

    /// Restore the draft to its last persisted version
    Discard {
        #[arg(long)]
        session: PathBuf,
    },

    /// Summarize the session: dirty state, modules, selected tab, open editors
    Status {
        #[arg(long)]
        session: PathBuf,
    },

    /// List session files
    List {
        /// Directory to scan (default: $TMPDIR)
        #[arg(long)]
        session_dir: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete the session file
    Close {
        #[arg(long)]
        session: PathBuf,

        /// Close even if the draft has unsaved changes
        #[arg(long)]
        force: bool,
    },
}

// ============================================================================
// Output types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionStatus {
    id: Option<String>,
    function_id: String,
    custom_name: String,
    dirty: bool,
    enabled_modules: Vec<ModuleName>,
    selected: Option<String>,
    open_editors: Vec<String>,
}

impl SessionStatus {
    fn of(session: &DraftSession) -> Self {
        let draft = session.draft();
        Self {
            id: draft.id.clone(),
            function_id: draft.function_id.clone(),
            custom_name: draft.custom_name.clone(),
            dirty: session.is_dirty(),
            enabled_modules: draft.module_data.enabled(),
            selected: session.selected(),
            open_editors: session
                .navigator()
                .frames()
                .iter()
                .map(|f| f.label.clone())
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionSummary {
    session_file: String,
    function_id: String,
    id: Option<String>,
    dirty: bool,
    created_at: String,
}

// ============================================================================
// Core logic
// ============================================================================

fn create_session(session: DraftSession, dir: Option<&PathBuf>) -> Result<PathBuf> {
    let path = new_session_path(&session_dir(dir));
    save_session(&path, &SessionFile::new(session))?;
    Ok(path)
}

fn new_session(function: &Path, name: Option<String>, dir: Option<&PathBuf>) -> Result<PathBuf> {
    let mut session = DraftSession::fresh(read_function(function)?);
    if let Some(name) = name {
        session.apply(&Command::rename(name))?;
    }
    create_session(session, dir)
}

fn load_persisted<S: TestStore + ?Sized>(
    store: &S,
    function: &Path,
    id: &str,
    dir: Option<&PathBuf>,
) -> Result<PathBuf> {
    let function = read_function(function)?;
    let record = store
        .get(id)
        .with_context(|| format!("failed to load test {id}"))?;
    if record.function_id != function.function_id || record.file_id != function.file_id {
        anyhow::bail!(
            "test {id} belongs to {}:{}, not {}:{}",
            record.file_id,
            record.function_id,
            function.file_id,
            function.function_id
        );
    }
    create_session(DraftSession::from_persisted(function, record.to_draft()), dir)
}

/// Apply one envelope or an array of them.
fn apply_envelopes(session: &mut DraftSession, input: &Value) -> Result<TestDraft> {
    let envelopes = match input {
        Value::Array(items) => items.as_slice(),
        single => std::slice::from_ref(single),
    };
    for (i, envelope) in envelopes.iter().enumerate() {
        session
            .dispatch(envelope)
            .with_context(|| format!("command {i} failed"))?;
    }
    Ok(session.draft().clone())
}

fn list_sessions(dir: &Path) -> Result<Vec<SessionSummary>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?;

    let mut sessions = Vec::new();
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name();
        let name_str = name.to_string_lossy();
        if name_str.starts_with(SESSION_PREFIX)
            && name_str.ends_with(".json")
            && let Ok(file) = load_session(&entry.path())
        {
            let draft = file.session.draft();
            sessions.push(SessionSummary {
                session_file: entry.path().to_string_lossy().to_string(),
                function_id: draft.function_id.clone(),
                id: draft.id.clone(),
                dirty: file.session.is_dirty(),
                created_at: file.created_at,
            });
        }
    }
    sessions.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    Ok(sessions)
}

fn close_session(path: &Path, force: bool) -> Result<()> {
    let file = load_session(path)?;
    if file.session.is_dirty() {
        if !force {
            anyhow::bail!(
                "session has unsaved changes (save it with `testdraft store save` or pass --force)"
            );
        }
        tracing::warn!(session = %path.display(), "discarding unsaved changes");
    }
    std::fs::remove_file(path)
        .with_context(|| format!("failed to delete session file: {}", path.display()))
}

// ============================================================================
// Subcommand implementations
// ============================================================================

fn print_draft(draft: &TestDraft, pretty: bool) -> Result<()> {
    println!("{}", format_json(draft, pretty)?);
    Ok(())
}

fn run_list(dir: Option<PathBuf>, json: bool) -> Result<()> {
    let sessions = list_sessions(&session_dir(dir.as_ref()))?;
    if json {
        println!("{}", format_json(&sessions, true)?);
    } else if sessions.is_empty() {
        println!("No draft sessions.");
    } else {
        for s in &sessions {
            println!(
                "{} | {} | {} | {} | {}",
                s.session_file,
                s.function_id,
                s.id.as_deref().unwrap_or("(unsaved)"),
                if s.dirty { "modified" } else { "clean" },
                s.created_at,
            );
        }
    }
    Ok(())
}

pub fn run(op: SessionOp, pretty: bool) -> Result<()> {
    match op {
        SessionOp::New {
            function,
            name,
            session_dir,
        } => {
            let path = new_session(&function, name, session_dir.as_ref())?;
            println!("{}", path.display());
            Ok(())
        }
        SessionOp::Load {
            function,
            id,
            store_dir,
            session_dir,
        } => {
            let store = open_store(store_dir)?;
            let path = load_persisted(&store, &function, &id, session_dir.as_ref())?;
            println!("{}", path.display());
            Ok(())
        }
        SessionOp::Show { session } => {
            let file = load_session(&session)?;
            print_draft(file.session.draft(), pretty)
        }
        SessionOp::Apply { session, command } => {
            let input = json_arg(command, "command")?;
            let draft = with_session(&session, |s| apply_envelopes(s, &input))?;
            print_draft(&draft, pretty)
        }
        SessionOp::Discard { session } => {
            let draft = with_session(&session, |s| {
                Ok(s.apply(&Command::DiscardModuleDataChanges)?.clone())
            })?;
            print_draft(&draft, pretty)
        }
        SessionOp::Status { session } => {
            let file = load_session(&session)?;
            println!("{}", format_json(&SessionStatus::of(&file.session), pretty)?);
            Ok(())
        }
        SessionOp::List { session_dir, json } => run_list(session_dir, json),
        SessionOp::Close { session, force } => close_session(&session, force),
    }
}

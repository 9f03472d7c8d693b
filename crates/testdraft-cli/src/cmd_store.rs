use crate::session_file::{format_json, open_store, with_session};
use anyhow::{Context, Result};
use clap::Subcommand;
use std::path::PathBuf;
use testdraft::v1::{DraftSession, TestDraft};
use testdraft_store::{TestFilter, TestRecord, TestStore, save_draft};

#[derive(Subcommand, Debug)]
pub enum StoreOp {
    /// Persist a session's draft (create or update); prints the saved draft
    Save {
        #[arg(long)]
        session: PathBuf,

        /// Test store directory (default: $TESTDRAFT_STORE_DIR or .testdraft/tests)
        #[arg(long)]
        store_dir: Option<PathBuf>,
    },

    /// List persisted tests
    List {
        #[arg(long)]
        store_dir: Option<PathBuf>,

        #[arg(long)]
        project: Option<String>,

        #[arg(long)]
        file_id: Option<String>,

        #[arg(long)]
        function_id: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print one persisted test
    Get {
        #[arg(long)]
        id: String,

        #[arg(long)]
        store_dir: Option<PathBuf>,
    },

    /// Delete a persisted test
    Delete {
        #[arg(long)]
        id: String,

        #[arg(long)]
        store_dir: Option<PathBuf>,
    },
}

/// Save the draft and make the result the session's new snapshot.
fn save_session_draft<S: TestStore + ?Sized>(
    store: &S,
    session: &mut DraftSession,
) -> Result<TestDraft> {
    let saved = save_draft(store, session.draft()).context("failed to save test")?;
    session.mark_persisted(saved.clone());
    Ok(saved)
}

fn print_records(records: &[TestRecord]) {
    if records.is_empty() {
        println!("No tests.");
        return;
    }
    for r in records {
        let name = if r.custom_name.is_empty() {
            "(unnamed)"
        } else {
            r.custom_name.as_str()
        };
        println!(
            "{} | {}:{} | {} | {}",
            r.id,
            r.file_id,
            r.function_id,
            name,
            r.updated_at.format("%Y-%m-%dT%H:%M:%SZ"),
        );
    }
}

pub fn run(op: StoreOp, pretty: bool) -> Result<()> {
    match op {
        StoreOp::Save { session, store_dir } => {
            let store = open_store(store_dir)?;
            let saved = with_session(&session, |s| save_session_draft(&store, s))?;
            println!("{}", format_json(&saved, pretty)?);
            Ok(())
        }
        StoreOp::List {
            store_dir,
            project,
            file_id,
            function_id,
            json,
        } => {
            let store = open_store(store_dir)?;
            let filter = TestFilter {
                path_to_project: project,
                file_id,
                function_id,
            };
            let records = store.list(&filter).context("failed to list tests")?;
            if json {
                println!("{}", format_json(&records, true)?);
            } else {
                print_records(&records);
            }
            Ok(())
        }
        StoreOp::Get { id, store_dir } => {
            let store = open_store(store_dir)?;
            let record = store
                .get(&id)
                .with_context(|| format!("failed to load test {id}"))?;
            println!("{}", format_json(&record, pretty)?);
            Ok(())
        }
        StoreOp::Delete { id, store_dir } => {
            let store = open_store(store_dir)?;
            store
                .delete(&id)
                .with_context(|| format!("failed to delete test {id}"))?;
            tracing::info!(%id, "test deleted");
            Ok(())
        }
    }
}

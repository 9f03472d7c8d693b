use crate::session_file::{format_json, json_arg, load_session, with_session};
use anyhow::Result;
use clap::Subcommand;
use serde::Serialize;
use std::path::PathBuf;
use testdraft::v1::{DraftSession, EditorFrame};

#[derive(Subcommand, Debug)]
pub enum EditOp {
    /// Open the editor for an object/array return value
    OpenReturn {
        #[arg(long)]
        session: PathBuf,
    },

    /// Open the editor for an object/array argument slot
    OpenArgument {
        #[arg(long)]
        session: PathBuf,

        /// (Sub-)function the argument belongs to
        #[arg(long)]
        function_name: String,

        #[arg(long)]
        argument: String,
    },

    /// Open a child editor for a composite field of an open editor
    OpenField {
        #[arg(long)]
        session: PathBuf,

        /// Label of the editor holding the field
        #[arg(long)]
        parent: String,

        /// Property name, or index for arrays
        #[arg(long)]
        key: String,
    },

    /// Replace an editor's working value
    Set {
        #[arg(long)]
        session: PathBuf,

        #[arg(long)]
        label: String,

        /// Value JSON (default: read from stdin)
        #[arg(long)]
        value: Option<String>,
    },

    /// Write an editor's working value back and close it; prints the draft
    Commit {
        #[arg(long)]
        session: PathBuf,

        #[arg(long)]
        label: String,
    },

    /// Close an editor (and its children) without committing
    Close {
        #[arg(long)]
        session: PathBuf,

        #[arg(long)]
        label: String,
    },

    /// Select an editor tab (a module name or an editor label)
    Select {
        #[arg(long)]
        session: PathBuf,

        #[arg(long)]
        tab: String,
    },

    /// Print the open editors and the selected tab
    Frames {
        #[arg(long)]
        session: PathBuf,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FrameListing {
    selected: Option<String>,
    frames: Vec<FrameSummary>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FrameSummary {
    #[serde(flatten)]
    frame: EditorFrame,
    modified: bool,
}

impl FrameListing {
    fn of(session: &DraftSession) -> Self {
        Self {
            selected: session.selected(),
            frames: session
                .navigator()
                .frames()
                .iter()
                .map(|f| FrameSummary {
                    modified: f.is_modified(),
                    frame: f.clone(),
                })
                .collect(),
        }
    }
}

fn print<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    println!("{}", format_json(value, pretty)?);
    Ok(())
}

pub fn run(op: EditOp, pretty: bool) -> Result<()> {
    match op {
        EditOp::OpenReturn { session } => {
            let frame = with_session(&session, |s| Ok(s.open_return_value_editor()?.clone()))?;
            print(&frame, pretty)
        }
        EditOp::OpenArgument {
            session,
            function_name,
            argument,
        } => {
            let frame = with_session(&session, |s| {
                Ok(s.open_argument_editor(&function_name, &argument)?.clone())
            })?;
            print(&frame, pretty)
        }
        EditOp::OpenField {
            session,
            parent,
            key,
        } => {
            let frame = with_session(&session, |s| Ok(s.open_field_editor(&parent, &key)?.clone()))?;
            print(&frame, pretty)
        }
        EditOp::Set {
            session,
            label,
            value,
        } => {
            let value = json_arg(value, "value")?;
            let listing = with_session(&session, |s| {
                s.set_frame_value(&label, value)?;
                Ok(FrameListing::of(s))
            })?;
            print(&listing, pretty)
        }
        EditOp::Commit { session, label } => {
            let draft = with_session(&session, |s| Ok(s.commit_frame(&label)?.clone()))?;
            print(&draft, pretty)
        }
        EditOp::Close { session, label } => {
            let listing = with_session(&session, |s| {
                if s.close_frame(&label).is_none() {
                    anyhow::bail!("no open editor labelled {label:?}");
                }
                Ok(FrameListing::of(s))
            })?;
            print(&listing, pretty)
        }
        EditOp::Select { session, tab } => {
            let listing = with_session(&session, |s| {
                s.select(tab);
                Ok(FrameListing::of(s))
            })?;
            print(&listing, pretty)
        }
        EditOp::Frames { session } => {
            let file = load_session(&session)?;
            print(&FrameListing::of(&file.session), pretty)
        }
    }
}

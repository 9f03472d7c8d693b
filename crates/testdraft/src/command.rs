//! Reducer commands and their JSON envelope.
//!
//! An envelope looks like `{"kind": "returnValue", "tag": "updateReturnValue",
//! "payload": {...}}`. Kinds form an open set: an unknown kind parses to
//! [`ParsedCommand::Ignored`]. Tags within a known kind form a closed set: an
//! unknown tag is a [`CommandError::UnknownTag`].

use crate::error::CommandError;
use crate::types::{ExpectedException, FlattenedArgument, ModuleName, ReturnValue, TestDraft};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

/// A fully decoded reducer command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Replace the whole draft (switching the active test)
    SetModuleData(Box<TestDraft>),
    /// Regenerate module data from the active function and drop the id
    ClearModuleData,
    /// Restore module data from the last persisted snapshot
    DiscardModuleDataChanges,
    ModuleData(ModuleDataCommand),
    ArgumentList(ArgumentListCommand),
    ReturnValue(ReturnValueCommand),
    Exception(ExceptionCommand),
    CustomName(CustomNameCommand),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ModuleDataCommand {
    AddModule(ModuleName),
    RemoveModule(ModuleName),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArgumentListCommand {
    ChangeArgument(FlattenedArgument),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReturnValueCommand {
    UpdateReturnValue(ReturnValue),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExceptionCommand {
    UpdateException(ExpectedException),
}

#[derive(Debug, Clone, PartialEq)]
pub enum CustomNameCommand {
    Rename(String),
}

/// Result of decoding an envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedCommand {
    Command(Command),
    /// The kind is not one this engine handles; the draft stays unchanged.
    Ignored { kind: String },
}

#[derive(Deserialize)]
struct Envelope {
    kind: String,
    #[serde(default)]
    tag: Option<String>,
    #[serde(default)]
    payload: Value,
}

impl Envelope {
    fn tag(&self) -> Result<&str, CommandError> {
        self.tag.as_deref().ok_or_else(|| CommandError::MissingTag {
            kind: self.kind.clone(),
        })
    }

    fn unknown_tag(&self, tag: &str) -> CommandError {
        CommandError::UnknownTag {
            kind: self.kind.clone(),
            tag: tag.to_string(),
        }
    }

    fn payload<T: DeserializeOwned>(&self, tag: &str) -> Result<T, CommandError> {
        T::deserialize(&self.payload).map_err(|source| CommandError::Payload {
            kind: self.kind.clone(),
            tag: tag.to_string(),
            source,
        })
    }
}

impl Command {
    /// Decode a JSON envelope.
    pub fn parse(value: &Value) -> Result<ParsedCommand, CommandError> {
        let env = Envelope::deserialize(value).map_err(CommandError::Envelope)?;

        let command = match env.kind.as_str() {
            "setModuleData" => Command::SetModuleData(Box::new(env.payload("")?)),
            "clearModuleData" => Command::ClearModuleData,
            "discardModuleDataChanges" => Command::DiscardModuleDataChanges,
            "moduleData" => {
                let tag = env.tag()?;
                let module = || -> Result<ModuleName, CommandError> { env.payload(tag) };
                Command::ModuleData(match tag {
                    "addModule" => ModuleDataCommand::AddModule(module()?),
                    "removeModule" => ModuleDataCommand::RemoveModule(module()?),
                    other => return Err(env.unknown_tag(other)),
                })
            }
            "argumentList" => {
                let tag = env.tag()?;
                Command::ArgumentList(match tag {
                    "changeArgument" => ArgumentListCommand::ChangeArgument(env.payload(tag)?),
                    other => return Err(env.unknown_tag(other)),
                })
            }
            "returnValue" => {
                let tag = env.tag()?;
                Command::ReturnValue(match tag {
                    "updateReturnValue" => ReturnValueCommand::UpdateReturnValue(env.payload(tag)?),
                    other => return Err(env.unknown_tag(other)),
                })
            }
            "exception" => {
                let tag = env.tag()?;
                Command::Exception(match tag {
                    "updateException" => ExceptionCommand::UpdateException(env.payload(tag)?),
                    other => return Err(env.unknown_tag(other)),
                })
            }
            "customName" => {
                let tag = env.tag()?;
                Command::CustomName(match tag {
                    "rename" => CustomNameCommand::Rename(env.payload(tag)?),
                    other => return Err(env.unknown_tag(other)),
                })
            }
            _ => return Ok(ParsedCommand::Ignored { kind: env.kind }),
        };

        Ok(ParsedCommand::Command(command))
    }

    /// Parse a JSON envelope from a string
    pub fn from_json(json: &str) -> Result<ParsedCommand, CommandError> {
        let value: Value = serde_json::from_str(json).map_err(CommandError::Envelope)?;
        Self::parse(&value)
    }

    /// Top-level kind, as it appears in the envelope.
    pub fn kind(&self) -> &'static str {
        match self {
            Command::SetModuleData(_) => "setModuleData",
            Command::ClearModuleData => "clearModuleData",
            Command::DiscardModuleDataChanges => "discardModuleDataChanges",
            Command::ModuleData(_) => "moduleData",
            Command::ArgumentList(_) => "argumentList",
            Command::ReturnValue(_) => "returnValue",
            Command::Exception(_) => "exception",
            Command::CustomName(_) => "customName",
        }
    }

    /// Tag within the kind, if the kind has sub-commands.
    pub fn tag(&self) -> Option<&'static str> {
        match self {
            Command::SetModuleData(_)
            | Command::ClearModuleData
            | Command::DiscardModuleDataChanges => None,
            Command::ModuleData(ModuleDataCommand::AddModule(_)) => Some("addModule"),
            Command::ModuleData(ModuleDataCommand::RemoveModule(_)) => Some("removeModule"),
            Command::ArgumentList(ArgumentListCommand::ChangeArgument(_)) => {
                Some("changeArgument")
            }
            Command::ReturnValue(ReturnValueCommand::UpdateReturnValue(_)) => {
                Some("updateReturnValue")
            }
            Command::Exception(ExceptionCommand::UpdateException(_)) => Some("updateException"),
            Command::CustomName(CustomNameCommand::Rename(_)) => Some("rename"),
        }
    }

    /// Encode as a JSON envelope accepted by [`Command::parse`].
    pub fn to_envelope(&self) -> Value {
        let payload = match self {
            Command::SetModuleData(draft) => json!(draft),
            Command::ClearModuleData | Command::DiscardModuleDataChanges => Value::Null,
            Command::ModuleData(
                ModuleDataCommand::AddModule(m) | ModuleDataCommand::RemoveModule(m),
            ) => json!(m),
            Command::ArgumentList(ArgumentListCommand::ChangeArgument(slot)) => json!(slot),
            Command::ReturnValue(ReturnValueCommand::UpdateReturnValue(rv)) => json!(rv),
            Command::Exception(ExceptionCommand::UpdateException(e)) => json!(e),
            Command::CustomName(CustomNameCommand::Rename(name)) => json!(name),
        };

        let mut env = json!({ "kind": self.kind() });
        if let Some(tag) = self.tag() {
            env["tag"] = json!(tag);
        }
        if !payload.is_null() {
            env["payload"] = payload;
        }
        env
    }

    // Shorthand constructors.

    pub fn add_module(module: ModuleName) -> Self {
        Command::ModuleData(ModuleDataCommand::AddModule(module))
    }

    pub fn remove_module(module: ModuleName) -> Self {
        Command::ModuleData(ModuleDataCommand::RemoveModule(module))
    }

    pub fn change_argument(slot: FlattenedArgument) -> Self {
        Command::ArgumentList(ArgumentListCommand::ChangeArgument(slot))
    }

    pub fn update_return_value(rv: ReturnValue) -> Self {
        Command::ReturnValue(ReturnValueCommand::UpdateReturnValue(rv))
    }

    pub fn update_exception(e: ExpectedException) -> Self {
        Command::Exception(ExceptionCommand::UpdateException(e))
    }

    pub fn rename(name: impl Into<String>) -> Self {
        Command::CustomName(CustomNameCommand::Rename(name.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeTag;

    fn parsed(v: Value) -> Command {
        match Command::parse(&v).unwrap() {
            ParsedCommand::Command(c) => c,
            ParsedCommand::Ignored { kind } => panic!("unexpectedly ignored: {kind}"),
        }
    }

    // ── Known kinds ────────────────────────────────────────────────────

    #[test]
    fn test_parse_add_module() {
        let c = parsed(json!({"kind": "moduleData", "tag": "addModule", "payload": "returnValue"}));
        assert_eq!(c, Command::add_module(ModuleName::ReturnValue));
    }

    #[test]
    fn test_parse_change_argument() {
        let c = parsed(json!({
            "kind": "argumentList",
            "tag": "changeArgument",
            "payload": {"subFunctionName": "f", "argument": "b", "type": "number", "value": 2}
        }));
        let expected = FlattenedArgument::new("f", "b").with_value(TypeTag::Number, Some(json!(2)));
        assert_eq!(c, Command::change_argument(expected));
    }

    #[test]
    fn test_parse_kinds_without_tag() {
        assert_eq!(parsed(json!({"kind": "clearModuleData"})), Command::ClearModuleData);
        assert_eq!(
            parsed(json!({"kind": "discardModuleDataChanges"})),
            Command::DiscardModuleDataChanges
        );
    }

    #[test]
    fn test_parse_rename() {
        let c = parsed(json!({"kind": "customName", "tag": "rename", "payload": "foo"}));
        assert_eq!(c, Command::rename("foo"));
    }

    #[test]
    fn test_envelope_roundtrip_all_kinds() {
        let draft = TestDraft {
            id: Some("t1".into()),
            path_to_project: "/p".into(),
            file_id: "a.js".into(),
            function_id: "f".into(),
            custom_name: "n".into(),
            module_data: Default::default(),
        };
        let commands = vec![
            Command::SetModuleData(Box::new(draft)),
            Command::ClearModuleData,
            Command::DiscardModuleDataChanges,
            Command::add_module(ModuleName::Exception),
            Command::remove_module(ModuleName::ArgumentList),
            Command::change_argument(FlattenedArgument::new("f", "a")),
            Command::update_return_value(ReturnValue::new(TypeTag::String, Some(json!("x")))),
            Command::update_exception(ExpectedException::default()),
            Command::rename("bar"),
        ];
        for c in commands {
            assert_eq!(parsed(c.to_envelope()), c, "kind {}", c.kind());
        }
    }

    // ── Open kinds, closed tags ────────────────────────────────────────

    #[test]
    fn test_unknown_kind_is_ignored() {
        let p = Command::parse(&json!({"kind": "setCoverage", "tag": "whatever"})).unwrap();
        assert_eq!(
            p,
            ParsedCommand::Ignored {
                kind: "setCoverage".into()
            }
        );
    }

    #[test]
    fn test_unknown_tag_is_fatal() {
        let err = Command::parse(&json!({"kind": "returnValue", "tag": "resetReturnValue"}))
            .unwrap_err();
        match err {
            CommandError::UnknownTag { kind, tag } => {
                assert_eq!(kind, "returnValue");
                assert_eq!(tag, "resetReturnValue");
            }
            other => panic!("expected UnknownTag, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_tag_is_fatal() {
        let err = Command::parse(&json!({"kind": "moduleData"})).unwrap_err();
        assert!(matches!(err, CommandError::MissingTag { .. }));
    }

    #[test]
    fn test_bad_payload_is_fatal() {
        let err = Command::parse(&json!({
            "kind": "moduleData", "tag": "addModule", "payload": "coverage"
        }))
        .unwrap_err();
        assert!(matches!(err, CommandError::Payload { .. }));
        assert!(err.to_string().contains("moduleData/addModule"));
    }

    #[test]
    fn test_envelope_without_kind() {
        let err = Command::parse(&json!({"tag": "rename"})).unwrap_err();
        assert!(matches!(err, CommandError::Envelope(_)));
        assert!(Command::from_json("not json").is_err());
    }
}

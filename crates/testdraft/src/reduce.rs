//! The draft state machine.

use crate::command::{
    ArgumentListCommand, Command, CustomNameCommand, ExceptionCommand, ModuleDataCommand,
    ParsedCommand, ReturnValueCommand,
};
use crate::error::{ReduceError, Result};
use crate::flatten::default_arguments;
use crate::types::{
    ExpectedException, FlattenedArgument, FunctionDescriptor, ModuleMap, ModuleName, ReturnValue,
    TestDraft,
};
use serde_json::Value;

/// Inputs a transition may need besides the draft itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReduceContext<'a> {
    /// The function whose parameter structure seeds `argumentList`.
    pub function: Option<&'a FunctionDescriptor>,
    /// The last persisted version of the draft being edited.
    pub persisted: Option<&'a TestDraft>,
}

impl<'a> ReduceContext<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_function(mut self, function: &'a FunctionDescriptor) -> Self {
        self.function = Some(function);
        self
    }

    pub fn with_persisted(mut self, persisted: Option<&'a TestDraft>) -> Self {
        self.persisted = persisted;
        self
    }

    fn function(&self) -> std::result::Result<&'a FunctionDescriptor, ReduceError> {
        self.function.ok_or(ReduceError::MissingFunction)
    }
}

/// Module data for a freshly chosen function: default argument slots and an
/// `undefined` return value.
pub fn default_module_data(function: &FunctionDescriptor) -> ModuleMap {
    ModuleMap {
        argument_list: Some(default_arguments(&function.arguments)),
        return_value: Some(ReturnValue::default()),
        exception: None,
    }
}

/// A new unsaved draft for `function` with default module data.
///
/// # Examples
///
/// ```
/// use testdraft::v1::{FunctionDescriptor, ParameterPattern as P, TypeTag, initial_draft};
///
/// let g = FunctionDescriptor::new("/work/app", "src/g.js", "g").with_parameters(
///     "g",
///     vec![
///         P::identifier("x"),
///         P::object(vec![P::property("y")]),
///         P::rest(P::identifier("z")),
///     ],
/// );
///
/// let draft = initial_draft(&g);
/// let args = draft.module_data.argument_list.as_ref().unwrap();
/// let names: Vec<&str> = args.iter().map(|a| a.argument.as_str()).collect();
/// assert_eq!(names, ["x", "y", "RestElement"]);
/// assert_eq!(draft.module_data.return_value.unwrap().type_tag, TypeTag::Undefined);
/// ```
pub fn initial_draft(function: &FunctionDescriptor) -> TestDraft {
    TestDraft {
        module_data: default_module_data(function),
        ..TestDraft::for_function(function)
    }
}

/// Apply one command, returning the next draft. The input is never modified.
pub fn reduce(
    draft: &TestDraft,
    command: &Command,
    ctx: &ReduceContext<'_>,
) -> std::result::Result<TestDraft, ReduceError> {
    tracing::debug!(kind = command.kind(), tag = command.tag(), "reducing command");

    match command {
        Command::SetModuleData(next) => Ok(next.as_ref().clone()),
        Command::ClearModuleData => {
            let function = ctx.function()?;
            Ok(TestDraft {
                id: None,
                module_data: default_module_data(function),
                ..draft.clone()
            })
        }
        Command::DiscardModuleDataChanges => Ok(discard_changes(draft, ctx)),
        Command::ModuleData(c) => reduce_module_data(draft, c, ctx),
        Command::ArgumentList(c) => reduce_argument_list(draft, c),
        Command::ReturnValue(c) => reduce_return_value(draft, c),
        Command::Exception(c) => reduce_exception(draft, c),
        Command::CustomName(CustomNameCommand::Rename(name)) => Ok(TestDraft {
            custom_name: name.clone(),
            ..draft.clone()
        }),
    }
}

/// Decode a JSON envelope and apply it. Unknown kinds leave the draft as is.
pub fn apply(draft: &TestDraft, envelope: &Value, ctx: &ReduceContext<'_>) -> Result<TestDraft> {
    match Command::parse(envelope)? {
        ParsedCommand::Command(command) => Ok(reduce(draft, &command, ctx)?),
        ParsedCommand::Ignored { kind } => {
            tracing::debug!(%kind, "ignoring unknown command kind");
            Ok(draft.clone())
        }
    }
}

fn discard_changes(draft: &TestDraft, ctx: &ReduceContext<'_>) -> TestDraft {
    match ctx.persisted {
        Some(persisted) if persisted.id.is_some() && persisted.id == draft.id => TestDraft {
            module_data: persisted.module_data.clone(),
            ..draft.clone()
        },
        _ => {
            tracing::debug!(id = ?draft.id, "no persisted snapshot to restore");
            draft.clone()
        }
    }
}

fn reduce_module_data(
    draft: &TestDraft,
    command: &ModuleDataCommand,
    ctx: &ReduceContext<'_>,
) -> std::result::Result<TestDraft, ReduceError> {
    match command {
        ModuleDataCommand::AddModule(module) => {
            if draft.module_data.contains(*module) {
                return Ok(draft.clone());
            }
            let mut next = draft.clone();
            match module {
                ModuleName::ArgumentList => {
                    let function = ctx.function()?;
                    next.module_data.argument_list = Some(default_arguments(&function.arguments));
                }
                ModuleName::ReturnValue => {
                    next.module_data.return_value = Some(ReturnValue::default());
                }
                ModuleName::Exception => {
                    next.module_data.exception = Some(ExpectedException::default());
                }
            }
            Ok(next)
        }
        ModuleDataCommand::RemoveModule(module) => {
            if !draft.module_data.contains(*module) {
                return Ok(draft.clone());
            }
            let mut next = draft.clone();
            next.module_data.remove(*module);
            Ok(next)
        }
    }
}

fn reduce_argument_list(
    draft: &TestDraft,
    command: &ArgumentListCommand,
) -> std::result::Result<TestDraft, ReduceError> {
    let ArgumentListCommand::ChangeArgument(slot) = command;

    let slots = draft
        .module_data
        .argument_list
        .as_ref()
        .ok_or(ReduceError::ModuleDisabled(ModuleName::ArgumentList))?;
    let index = slots
        .iter()
        .position(|s| s.same_slot(slot))
        .ok_or_else(|| ReduceError::SlotNotFound {
            sub_function_name: slot.sub_function_name.clone(),
            argument: slot.argument.clone(),
        })?;

    let mut replaced: Vec<FlattenedArgument> = slots.clone();
    replaced[index] = slot
        .clone()
        .with_value(slot.type_tag, slot.value.clone());

    let mut next = draft.clone();
    next.module_data.argument_list = Some(replaced);
    Ok(next)
}

fn reduce_return_value(
    draft: &TestDraft,
    command: &ReturnValueCommand,
) -> std::result::Result<TestDraft, ReduceError> {
    let ReturnValueCommand::UpdateReturnValue(rv) = command;
    if !draft.module_data.contains(ModuleName::ReturnValue) {
        return Err(ReduceError::ModuleDisabled(ModuleName::ReturnValue));
    }
    let mut next = draft.clone();
    next.module_data.return_value = Some(rv.clone().normalized());
    Ok(next)
}

fn reduce_exception(
    draft: &TestDraft,
    command: &ExceptionCommand,
) -> std::result::Result<TestDraft, ReduceError> {
    let ExceptionCommand::UpdateException(e) = command;
    if !draft.module_data.contains(ModuleName::Exception) {
        return Err(ReduceError::ModuleDisabled(ModuleName::Exception));
    }
    let mut next = draft.clone();
    next.module_data.exception = Some(e.clone());
    Ok(next)
}

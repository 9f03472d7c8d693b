use crate::command::{Command, ParsedCommand};
use crate::error::{NavError, Result};
use crate::navigator::{EditorFrame, FieldKey, Navigator};
use crate::reduce::{ReduceContext, initial_draft, reduce};
use crate::types::{FunctionDescriptor, TestDraft};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Everything a front end needs to edit one test: the active function, the
/// draft, the last persisted version of it, and the open nested editors.
///
/// Every draft change goes through the reducer and is followed by a
/// [`Navigator::reconcile`], so editors never outlive their targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftSession {
    function: FunctionDescriptor,
    draft: TestDraft,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    persisted: Option<TestDraft>,
    #[serde(default)]
    navigator: Navigator,
}

impl DraftSession {
    /// Start an unsaved draft with default module data.
    pub fn fresh(function: FunctionDescriptor) -> Self {
        Self {
            draft: initial_draft(&function),
            function,
            persisted: None,
            navigator: Navigator::new(),
        }
    }

    /// Resume editing a persisted test.
    pub fn from_persisted(function: FunctionDescriptor, persisted: TestDraft) -> Self {
        Self {
            function,
            draft: persisted.clone(),
            persisted: Some(persisted),
            navigator: Navigator::new(),
        }
    }

    pub fn function(&self) -> &FunctionDescriptor {
        &self.function
    }

    pub fn draft(&self) -> &TestDraft {
        &self.draft
    }

    pub fn persisted(&self) -> Option<&TestDraft> {
        self.persisted.as_ref()
    }

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    /// True when the draft differs from its persisted version, or has none.
    pub fn is_dirty(&self) -> bool {
        self.persisted.as_ref() != Some(&self.draft)
    }

    pub fn apply(&mut self, command: &Command) -> Result<&TestDraft> {
        let ctx = ReduceContext {
            function: Some(&self.function),
            persisted: self.persisted.as_ref(),
        };
        let next = reduce(&self.draft, command, &ctx)?;
        self.replace_draft(next);
        Ok(&self.draft)
    }

    /// Decode and apply a JSON command envelope.
    pub fn dispatch(&mut self, envelope: &Value) -> Result<&TestDraft> {
        match Command::parse(envelope)? {
            ParsedCommand::Command(command) => self.apply(&command),
            ParsedCommand::Ignored { kind } => {
                tracing::debug!(%kind, "ignoring unknown command kind");
                Ok(&self.draft)
            }
        }
    }

    /// Record a successful save: `saved` becomes both the draft and the
    /// snapshot that discarding restores.
    pub fn mark_persisted(&mut self, saved: TestDraft) {
        self.persisted = Some(saved.clone());
        self.replace_draft(saved);
    }

    fn replace_draft(&mut self, next: TestDraft) {
        self.draft = next;
        self.navigator.reconcile(&self.draft);
    }

    // ── Nested editors ───────────────────────────────────────────────

    pub fn open_return_value_editor(&mut self) -> Result<&EditorFrame> {
        Ok(self.navigator.open_return_value(&self.draft)?)
    }

    pub fn open_argument_editor(
        &mut self,
        sub_function_name: &str,
        argument: &str,
    ) -> Result<&EditorFrame> {
        Ok(self
            .navigator
            .open_argument(&self.draft, sub_function_name, argument)?)
    }

    /// Open a child editor for `raw_key` of an open frame. Numeric keys
    /// address array elements when the parent holds an array.
    pub fn open_field_editor(&mut self, parent_label: &str, raw_key: &str) -> Result<&EditorFrame> {
        let parent = self
            .navigator
            .frame(parent_label)
            .ok_or_else(|| NavError::UnknownFrame(parent_label.to_string()))?;
        let key = FieldKey::for_value(&parent.value, raw_key);
        Ok(self.navigator.open_field(parent_label, key, &self.draft)?)
    }

    pub fn set_frame_value(&mut self, label: &str, value: Value) -> Result<()> {
        Ok(self.navigator.set_value(label, value)?)
    }

    /// Commit a frame's working value into its target.
    pub fn commit_frame(&mut self, label: &str) -> Result<&TestDraft> {
        let value = self
            .navigator
            .frame(label)
            .map(|f| f.value.clone())
            .ok_or_else(|| NavError::UnknownFrame(label.to_string()))?;
        let ctx = ReduceContext {
            function: Some(&self.function),
            persisted: self.persisted.as_ref(),
        };
        let next = self.navigator.commit(label, value, &self.draft, &ctx)?;
        self.replace_draft(next);
        Ok(&self.draft)
    }

    /// Close a frame without committing it.
    pub fn close_frame(&mut self, label: &str) -> Option<EditorFrame> {
        self.navigator.pop_frame(label)
    }

    pub fn select(&mut self, key: impl Into<String>) {
        self.navigator.select(key);
    }

    /// Selected editor tab, see [`Navigator::selected`].
    pub fn selected(&self) -> Option<String> {
        self.navigator.selected(&self.draft)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, ReduceError};
    use crate::navigator::{ARGUMENT_EDITOR, RETURN_VALUE_EDITOR};
    use crate::types::{
        FlattenedArgument, ModuleName, ParameterPattern as P, ReturnValue, TypeTag,
    };
    use serde_json::json;

    fn function() -> FunctionDescriptor {
        FunctionDescriptor::new("/p", "src/g.js", "g").with_parameters(
            "g",
            vec![
                P::identifier("x"),
                P::object(vec![P::property("y")]),
                P::rest(P::identifier("z")),
            ],
        )
    }

    #[test]
    fn test_fresh_session_is_dirty_and_unsaved() {
        let s = DraftSession::fresh(function());
        assert!(s.is_dirty());
        assert!(s.draft().id.is_none());
        assert_eq!(s.selected().as_deref(), Some("argumentList"));
    }

    #[test]
    fn test_persisted_session_discard() {
        let saved = crate::reduce::initial_draft(&function()).with_id("t1");
        let mut s = DraftSession::from_persisted(function(), saved.clone());
        assert!(!s.is_dirty());

        s.apply(&Command::remove_module(ModuleName::ReturnValue))
            .unwrap();
        assert!(s.is_dirty());

        s.apply(&Command::DiscardModuleDataChanges).unwrap();
        assert_eq!(s.draft(), &saved);
        assert!(!s.is_dirty());
    }

    #[test]
    fn test_dispatch_ignores_unknown_kind() {
        let mut s = DraftSession::fresh(function());
        let before = s.draft().clone();
        s.dispatch(&json!({"kind": "somethingNew"})).unwrap();
        assert_eq!(s.draft(), &before);
    }

    #[test]
    fn test_dispatch_surfaces_missing_slot() {
        let mut s = DraftSession::fresh(function());
        let err = s
            .dispatch(&json!({
                "kind": "argumentList",
                "tag": "changeArgument",
                "payload": {"subFunctionName": "g", "argument": "nope", "type": "number", "value": 1}
            }))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Reduce(ReduceError::SlotNotFound { .. })
        ));
    }

    #[test]
    fn test_nested_edit_roundtrip_through_session() {
        let mut s = DraftSession::fresh(function());
        s.apply(&Command::update_return_value(ReturnValue::new(
            TypeTag::Object,
            Some(json!({"items": [{"id": 1}]})),
        )))
        .unwrap();

        s.open_return_value_editor().unwrap();
        s.open_field_editor(RETURN_VALUE_EDITOR, "items").unwrap();
        let label = "Return value.items";
        s.open_field_editor(label, "0").unwrap();
        s.set_frame_value("Return value.items[0]", json!({"id": 2}))
            .unwrap();
        s.commit_frame("Return value.items[0]").unwrap();
        s.commit_frame(label).unwrap();
        s.commit_frame(RETURN_VALUE_EDITOR).unwrap();

        assert_eq!(
            s.draft().module_data.return_value.as_ref().unwrap().value,
            Some(json!({"items": [{"id": 2}]}))
        );
        assert!(s.navigator().frames().is_empty());
        assert_eq!(s.selected().as_deref(), Some("returnValue"));
    }

    #[test]
    fn test_scalar_over_open_field_discards_child_editor() {
        let mut s = DraftSession::fresh(function());
        s.apply(&Command::update_return_value(ReturnValue::new(
            TypeTag::Object,
            Some(json!({"inner": {"x": 1}})),
        )))
        .unwrap();
        s.open_return_value_editor().unwrap();
        s.open_field_editor(RETURN_VALUE_EDITOR, "inner").unwrap();

        s.set_frame_value(RETURN_VALUE_EDITOR, json!({"inner": 5}))
            .unwrap();
        assert_eq!(s.navigator().frames().len(), 1);
        assert!(s.commit_frame("Return value.inner").is_err());

        s.commit_frame(RETURN_VALUE_EDITOR).unwrap();
        assert_eq!(
            s.draft().module_data.return_value.as_ref().unwrap().value,
            Some(json!({"inner": 5}))
        );
    }

    #[test]
    fn test_type_change_through_session_closes_editor() {
        let mut s = DraftSession::fresh(function());
        s.apply(&Command::change_argument(
            FlattenedArgument::new("g", "y").with_value(TypeTag::Array, Some(json!([]))),
        ))
        .unwrap();
        s.open_argument_editor("g", "y").unwrap();
        assert_eq!(s.navigator().frames().len(), 1);

        s.apply(&Command::change_argument(
            FlattenedArgument::new("g", "y").with_value(TypeTag::Number, Some(json!(3))),
        ))
        .unwrap();
        assert!(s.navigator().frame(ARGUMENT_EDITOR).is_none());
    }

    #[test]
    fn test_mark_persisted_sets_snapshot() {
        let mut s = DraftSession::fresh(function());
        s.apply(&Command::rename("adds")).unwrap();
        let saved = s.draft().clone().with_id("t7");
        s.mark_persisted(saved.clone());
        assert_eq!(s.persisted(), Some(&saved));
        assert!(!s.is_dirty());
    }

    #[test]
    fn test_session_serde_roundtrip() {
        let mut s = DraftSession::fresh(function());
        s.apply(&Command::update_return_value(ReturnValue::new(
            TypeTag::Array,
            Some(json!([1])),
        )))
        .unwrap();
        s.open_return_value_editor().unwrap();

        let json = serde_json::to_string(&s).unwrap();
        let parsed: DraftSession = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, s);
    }
}

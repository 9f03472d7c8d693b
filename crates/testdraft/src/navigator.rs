//! Nested editing sessions for `object`/`array` values.
//!
//! Each open session is an [`EditorFrame`]. Frames are kept in insertion
//! order, so a parent always precedes its children, and looked up by label
//! with a linear scan.

use crate::command::Command;
use crate::error::{NavError, ReduceError};
use crate::reduce::{ReduceContext, reduce};
use crate::types::{ModuleName, ReturnValue, TestDraft, TypeTag};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Label of the return value's child editor.
pub const RETURN_VALUE_EDITOR: &str = "Return value";
/// Label of an argument slot's child editor.
pub const ARGUMENT_EDITOR: &str = "Argument";

/// A position inside a composite value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldKey {
    Index(usize),
    Property(String),
}

impl FieldKey {
    /// Interpret `raw` against the value it indexes into: numeric keys address
    /// array elements, everything else is an object property.
    pub fn for_value(parent: &Value, raw: &str) -> Self {
        match (parent, raw.parse::<usize>()) {
            (Value::Array(_), Ok(i)) => FieldKey::Index(i),
            _ => FieldKey::Property(raw.to_string()),
        }
    }

    fn get<'v>(&self, value: &'v Value) -> Option<&'v Value> {
        match (self, value) {
            (FieldKey::Index(i), Value::Array(items)) => items.get(*i),
            (FieldKey::Property(k), Value::Object(map)) => map.get(k),
            _ => None,
        }
    }

    /// Suffix a child frame's label adds to its parent's: `.name` for plain
    /// property names, `[i]` for indices, `["..."]` (JSON-quoted) for any
    /// property that could be mistaken for a path. Distinct paths never
    /// share a label.
    pub fn label_segment(&self) -> String {
        match self {
            FieldKey::Index(i) => format!("[{i}]"),
            FieldKey::Property(k)
                if !k.is_empty() && !k.contains(['.', '[', ']', '"']) =>
            {
                format!(".{k}")
            }
            FieldKey::Property(k) => format!("[{}]", Value::String(k.clone())),
        }
    }

    fn get_mut<'v>(&self, value: &'v mut Value) -> Option<&'v mut Value> {
        match (self, value) {
            (FieldKey::Index(i), Value::Array(items)) => items.get_mut(*i),
            (FieldKey::Property(k), Value::Object(map)) => map.get_mut(k),
            _ => None,
        }
    }
}

impl std::fmt::Display for FieldKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldKey::Index(i) => write!(f, "{}", i),
            FieldKey::Property(k) => write!(f, "{}", k),
        }
    }
}

/// Where a frame's value goes when it is committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FrameTarget {
    /// `returnValue/updateReturnValue`
    ReturnValue,
    /// `argumentList/changeArgument` on this slot
    #[serde(rename_all = "camelCase")]
    Argument {
        sub_function_name: String,
        argument: String,
    },
    /// A field of the parent frame's working value
    Field { key: FieldKey },
}

/// One open nested editing session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorFrame {
    pub label: String,
    pub initial_value: Value,
    /// Working copy, edited with [`Navigator::set_value`].
    pub value: Value,
    /// A module name or the label of the parent frame.
    pub parent_event_key: String,
    pub target: FrameTarget,
}

impl EditorFrame {
    pub fn new(
        label: impl Into<String>,
        parent_event_key: impl Into<String>,
        target: FrameTarget,
        initial_value: Value,
    ) -> Self {
        Self {
            label: label.into(),
            value: initial_value.clone(),
            initial_value,
            parent_event_key: parent_event_key.into(),
            target,
        }
    }

    pub fn is_modified(&self) -> bool {
        self.value != self.initial_value
    }
}

/// Registry of open editor frames plus the selected editor tab.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use testdraft::v1::*;
///
/// let f = FunctionDescriptor::new("/p", "a.js", "f");
/// let ctx = ReduceContext::new().with_function(&f);
/// let draft = reduce(
///     &initial_draft(&f),
///     &Command::update_return_value(ReturnValue::new(TypeTag::Object, Some(json!({})))),
///     &ctx,
/// )
/// .unwrap();
///
/// let mut nav = Navigator::new();
/// nav.open_return_value(&draft).unwrap();
/// let draft = nav
///     .commit(RETURN_VALUE_EDITOR, json!({"ok": true}), &draft, &ctx)
///     .unwrap();
///
/// assert_eq!(draft.module_data.return_value.unwrap().value, Some(json!({"ok": true})));
/// assert!(nav.frames().is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Navigator {
    frames: Vec<EditorFrame>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    selected: Option<String>,
}

impl Navigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open frames in insertion order.
    pub fn frames(&self) -> &[EditorFrame] {
        &self.frames
    }

    pub fn frame(&self, label: &str) -> Option<&EditorFrame> {
        self.frames.iter().find(|f| f.label == label)
    }

    fn position(&self, label: &str) -> Option<usize> {
        self.frames.iter().position(|f| f.label == label)
    }

    /// `label` and every frame nested under it, or nothing if it is not open.
    fn subtree(&self, label: &str) -> Vec<String> {
        let mut labels = Vec::new();
        if self.position(label).is_none() {
            return labels;
        }
        labels.push(label.to_string());
        for f in &self.frames {
            if labels.contains(&f.parent_event_key) {
                labels.push(f.label.clone());
            }
        }
        labels
    }

    fn parent_is_live(&self, key: &str, draft: &TestDraft) -> bool {
        match ModuleName::parse(key) {
            Some(module) => draft.module_data.contains(module),
            None => self.position(key).is_some(),
        }
    }

    /// Register a frame and select it.
    ///
    /// Labels of top-level editors are fixed per slot kind, so opening a
    /// second editor of the same kind replaces the first one.
    ///
    /// A rejected frame leaves the registry untouched.
    pub fn push_frame(&mut self, frame: EditorFrame, draft: &TestDraft) -> Result<(), NavError> {
        let replaced = self.subtree(&frame.label);
        if replaced.contains(&frame.parent_event_key)
            || !self.parent_is_live(&frame.parent_event_key, draft)
        {
            return Err(NavError::OrphanFrame {
                label: frame.label,
                parent: frame.parent_event_key,
            });
        }
        if !replaced.is_empty() {
            tracing::warn!(label = %frame.label, "editor label already open, replacing it");
            self.pop_frame(&frame.label);
        }
        tracing::debug!(label = %frame.label, parent = %frame.parent_event_key, "editor opened");
        self.selected = Some(frame.label.clone());
        self.frames.push(frame);
        Ok(())
    }

    /// Open the child editor of an `object`/`array` return value.
    pub fn open_return_value(&mut self, draft: &TestDraft) -> Result<&EditorFrame, NavError> {
        let rv = draft
            .module_data
            .return_value
            .as_ref()
            .ok_or(ReduceError::ModuleDisabled(ModuleName::ReturnValue))?;
        let initial = composite_value(rv.type_tag, rv.value.as_ref())
            .ok_or_else(|| NavError::NotComposite(ModuleName::ReturnValue.to_string()))?;

        let frame = EditorFrame::new(
            RETURN_VALUE_EDITOR,
            ModuleName::ReturnValue.as_str(),
            FrameTarget::ReturnValue,
            initial,
        );
        self.push_and_get(frame, draft)
    }

    /// Open the child editor of an `object`/`array` argument slot.
    pub fn open_argument(
        &mut self,
        draft: &TestDraft,
        sub_function_name: &str,
        argument: &str,
    ) -> Result<&EditorFrame, NavError> {
        if !draft.module_data.contains(ModuleName::ArgumentList) {
            return Err(ReduceError::ModuleDisabled(ModuleName::ArgumentList).into());
        }
        let slot = draft
            .module_data
            .argument(sub_function_name, argument)
            .ok_or_else(|| ReduceError::SlotNotFound {
                sub_function_name: sub_function_name.to_string(),
                argument: argument.to_string(),
            })?;
        let initial = composite_value(slot.type_tag, slot.value.as_ref())
            .ok_or_else(|| NavError::NotComposite(format!("{sub_function_name}.{argument}")))?;

        let frame = EditorFrame::new(
            ARGUMENT_EDITOR,
            ModuleName::ArgumentList.as_str(),
            FrameTarget::Argument {
                sub_function_name: sub_function_name.to_string(),
                argument: argument.to_string(),
            },
            initial,
        );
        self.push_and_get(frame, draft)
    }

    /// Open an editor for a composite field of an open frame's working value.
    pub fn open_field(
        &mut self,
        parent_label: &str,
        key: FieldKey,
        draft: &TestDraft,
    ) -> Result<&EditorFrame, NavError> {
        let parent = self
            .frame(parent_label)
            .ok_or_else(|| NavError::UnknownFrame(parent_label.to_string()))?;
        let field = key.get(&parent.value).ok_or_else(|| NavError::MissingField {
            label: parent_label.to_string(),
            key: key.to_string(),
        })?;
        let label = format!("{parent_label}{}", key.label_segment());
        if !TypeTag::of_value(field).is_composite() {
            return Err(NavError::NotComposite(label));
        }

        let frame = EditorFrame::new(label, parent_label, FrameTarget::Field { key }, field.clone());
        self.push_and_get(frame, draft)
    }

    fn push_and_get(
        &mut self,
        frame: EditorFrame,
        draft: &TestDraft,
    ) -> Result<&EditorFrame, NavError> {
        self.push_frame(frame, draft)?;
        Ok(&self.frames[self.frames.len() - 1])
    }

    /// Replace a frame's working value.
    ///
    /// Child editors whose field is gone from the new value, or no longer an
    /// object or array, are closed.
    pub fn set_value(&mut self, label: &str, value: Value) -> Result<(), NavError> {
        let frame = self
            .frames
            .iter_mut()
            .find(|f| f.label == label)
            .ok_or_else(|| NavError::UnknownFrame(label.to_string()))?;
        frame.value = value;

        let closed = self.close_stale_fields();
        if !closed.is_empty() {
            tracing::debug!(label, ?closed, "closed editors of replaced fields");
            if self.selected.as_ref().is_some_and(|s| closed.contains(s)) {
                self.selected = Some(label.to_string());
            }
        }
        Ok(())
    }

    fn close_stale_fields(&mut self) -> Vec<String> {
        let mut kept: Vec<EditorFrame> = Vec::with_capacity(self.frames.len());
        let mut closed = Vec::new();
        for frame in self.frames.drain(..) {
            let alive = match &frame.target {
                FrameTarget::Field { key } => field_is_composite(&kept, &frame.parent_event_key, key),
                _ => true,
            };
            if alive {
                kept.push(frame);
            } else {
                closed.push(frame.label);
            }
        }
        self.frames = kept;
        closed
    }

    /// Close a frame and every frame nested under it.
    pub fn pop_frame(&mut self, label: &str) -> Option<EditorFrame> {
        let idx = self.position(label)?;
        let closed = self.subtree(label);
        let frame = self.frames.remove(idx);
        self.frames.retain(|f| !closed.contains(&f.label));

        if self.selected.as_ref().is_some_and(|s| closed.contains(s)) {
            self.selected = Some(frame.parent_event_key.clone());
        }
        tracing::debug!(label, closed = closed.len(), "editor closed");
        Some(frame)
    }

    /// Fold `value` into the frame's target and close the frame.
    ///
    /// Top-level frames go through the reducer; field frames write into the
    /// parent frame's working value and leave the draft as it was.
    pub fn commit(
        &mut self,
        label: &str,
        value: Value,
        draft: &TestDraft,
        ctx: &ReduceContext<'_>,
    ) -> Result<TestDraft, NavError> {
        let (target, parent_label) = self
            .frame(label)
            .map(|f| (f.target.clone(), f.parent_event_key.clone()))
            .ok_or_else(|| NavError::UnknownFrame(label.to_string()))?;

        let next = match &target {
            FrameTarget::ReturnValue => {
                let rv = draft
                    .module_data
                    .return_value
                    .as_ref()
                    .ok_or(ReduceError::ModuleDisabled(ModuleName::ReturnValue))?;
                let command =
                    Command::update_return_value(ReturnValue::new(rv.type_tag, Some(value)));
                reduce(draft, &command, ctx)?
            }
            FrameTarget::Argument {
                sub_function_name,
                argument,
            } => {
                let slot = draft
                    .module_data
                    .argument(sub_function_name, argument)
                    .ok_or_else(|| ReduceError::SlotNotFound {
                        sub_function_name: sub_function_name.clone(),
                        argument: argument.clone(),
                    })?;
                let command =
                    Command::change_argument(slot.clone().with_value(slot.type_tag, Some(value)));
                reduce(draft, &command, ctx)?
            }
            FrameTarget::Field { key } => {
                let parent = self
                    .frames
                    .iter_mut()
                    .find(|f| f.label == parent_label)
                    .ok_or_else(|| NavError::UnknownFrame(parent_label.clone()))?;
                let slot = key
                    .get_mut(&mut parent.value)
                    .ok_or_else(|| NavError::MissingField {
                        label: parent_label.clone(),
                        key: key.to_string(),
                    })?;
                if !TypeTag::of_value(slot).is_composite() {
                    return Err(NavError::NotComposite(label.to_string()));
                }
                *slot = value;
                draft.clone()
            }
        };

        self.pop_frame(label);
        Ok(next)
    }

    /// Select an editor tab: a module name or a frame label.
    pub fn select(&mut self, key: impl Into<String>) {
        self.selected = Some(key.into());
    }

    /// The selected tab, falling back to the first enabled module when the
    /// selection no longer exists.
    pub fn selected(&self, draft: &TestDraft) -> Option<String> {
        if let Some(key) = &self.selected
            && self.parent_is_live(key, draft)
        {
            return Some(key.clone());
        }
        let fallback = draft.module_data.enabled().first().map(|m| m.to_string());
        if let Some(stale) = &self.selected {
            tracing::warn!(%stale, fallback = ?fallback, "selected editor no longer exists");
        }
        fallback
    }

    /// Close frames whose target disappeared or stopped being composite.
    /// Returns the labels that were closed.
    pub fn reconcile(&mut self, draft: &TestDraft) -> Vec<String> {
        let mut kept: Vec<EditorFrame> = Vec::with_capacity(self.frames.len());
        let mut closed = Vec::new();

        for frame in self.frames.drain(..) {
            let alive = match &frame.target {
                FrameTarget::ReturnValue => draft
                    .module_data
                    .return_value
                    .as_ref()
                    .is_some_and(|rv| rv.type_tag.is_composite()),
                FrameTarget::Argument {
                    sub_function_name,
                    argument,
                } => draft
                    .module_data
                    .argument(sub_function_name, argument)
                    .is_some_and(|slot| slot.type_tag.is_composite()),
                FrameTarget::Field { key } => {
                    field_is_composite(&kept, &frame.parent_event_key, key)
                }
            };
            let parent_alive = match ModuleName::parse(&frame.parent_event_key) {
                Some(module) => draft.module_data.contains(module),
                None => kept.iter().any(|p| p.label == frame.parent_event_key),
            };

            if alive && parent_alive {
                kept.push(frame);
            } else {
                closed.push(frame.label);
            }
        }

        self.frames = kept;
        if !closed.is_empty() {
            tracing::debug!(?closed, "closed editors with stale targets");
        }
        closed
    }
}

/// Whether `key` of the open frame `parent_label` still holds an object or
/// array.
fn field_is_composite(frames: &[EditorFrame], parent_label: &str, key: &FieldKey) -> bool {
    frames
        .iter()
        .find(|p| p.label == parent_label)
        .and_then(|p| key.get(&p.value))
        .is_some_and(|v| TypeTag::of_value(v).is_composite())
}

/// Starting value for a composite editor, or `None` when `type_tag` is not
/// composite.
fn composite_value(type_tag: TypeTag, value: Option<&Value>) -> Option<Value> {
    match (type_tag, value) {
        (TypeTag::Object, Some(v @ Value::Object(_))) | (TypeTag::Array, Some(v @ Value::Array(_))) => {
            Some(v.clone())
        }
        (TypeTag::Object, _) => Some(Value::Object(Default::default())),
        (TypeTag::Array, _) => Some(Value::Array(Vec::new())),
        _ => None,
    }
}

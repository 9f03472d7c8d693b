use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// ============================================================================
// Analyzer output
// ============================================================================

/// How a function destructures one of its inputs, as reported by the
/// static analyzer.
///
/// The JSON form is internally tagged by `"type"`:
///
/// ```json
/// { "type": "ObjectPattern", "properties": [
///     { "type": "PropertyBinding", "keyName": "b" },
///     { "type": "PropertyBinding", "keyName": "c" }
/// ] }
/// ```
///
/// Node kinds the analyzer may emit but this crate does not model
/// (default-value assignments, for instance) decode to
/// [`ParameterPattern::Unrecognized`] and contribute no argument slots. So do
/// known kinds with missing or mistyped fields: decoding is node by node and
/// never fails.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum ParameterPattern {
    Identifier {
        name: String,
    },
    PropertyBinding {
        #[serde(rename = "keyName")]
        key_name: String,
    },
    ObjectPattern {
        properties: Vec<ParameterPattern>,
    },
    /// `null` elements are array holes (`[, b]`).
    ArrayPattern {
        elements: Vec<Option<ParameterPattern>>,
    },
    RestElement {
        inner: Box<ParameterPattern>,
    },
    Unrecognized,
}

impl ParameterPattern {
    pub fn identifier(name: impl Into<String>) -> Self {
        Self::Identifier { name: name.into() }
    }

    pub fn property(key_name: impl Into<String>) -> Self {
        Self::PropertyBinding {
            key_name: key_name.into(),
        }
    }

    pub fn object(properties: Vec<ParameterPattern>) -> Self {
        Self::ObjectPattern { properties }
    }

    pub fn array(elements: Vec<ParameterPattern>) -> Self {
        Self::ArrayPattern {
            elements: elements.into_iter().map(Some).collect(),
        }
    }

    pub fn rest(inner: ParameterPattern) -> Self {
        Self::RestElement {
            inner: Box::new(inner),
        }
    }

    /// Decode one analyzer node. Anything that does not fit a modeled kind
    /// becomes [`ParameterPattern::Unrecognized`]; children are decoded the
    /// same way, so one bad node never hides its siblings.
    pub fn from_node(node: &Value) -> Self {
        let text = |key: &str| node.get(key).and_then(Value::as_str);
        let children = |key: &str| {
            node.get(key)
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default()
        };

        let decoded = match text("type") {
            Some("Identifier") => text("name").map(Self::identifier),
            Some("PropertyBinding") => text("keyName").map(Self::property),
            Some("ObjectPattern") => Some(Self::ObjectPattern {
                properties: children("properties").iter().map(Self::from_node).collect(),
            }),
            Some("ArrayPattern") => Some(Self::ArrayPattern {
                elements: children("elements")
                    .iter()
                    .map(|e| (!e.is_null()).then(|| Self::from_node(e)))
                    .collect(),
            }),
            // The inner binding never surfaces as a slot name.
            Some("RestElement") => {
                let inner = node.get("inner").or_else(|| node.get("argument"));
                Some(Self::RestElement {
                    inner: Box::new(inner.map(Self::from_node).unwrap_or(Self::Unrecognized)),
                })
            }
            _ => None,
        };

        decoded.unwrap_or_else(|| {
            tracing::debug!(kind = ?text("type"), "skipping unrecognized parameter node");
            Self::Unrecognized
        })
    }
}

impl<'de> Deserialize<'de> for ParameterPattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self::from_node(&Value::deserialize(deserializer)?))
    }
}

/// The parameter list of one (sub-)function inside an analyzed function.
///
/// `body` holds one pattern per declared parameter. A bare pattern in JSON is
/// accepted as a one-element list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterTree {
    #[serde(alias = "name")]
    pub function_name: String,
    #[serde(default, deserialize_with = "one_or_many")]
    pub body: Vec<ParameterPattern>,
}

impl ParameterTree {
    pub fn new(function_name: impl Into<String>, body: Vec<ParameterPattern>) -> Self {
        Self {
            function_name: function_name.into(),
            body,
        }
    }
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<ParameterPattern>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(nodes) => nodes.iter().map(ParameterPattern::from_node).collect(),
        Value::Null => Vec::new(),
        node => vec![ParameterPattern::from_node(&node)],
    })
}

/// A function discovered by the analyzer, with its parameter structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionDescriptor {
    pub path_to_project: String,
    pub file_id: String,
    pub function_id: String,
    #[serde(default)]
    pub arguments: Vec<ParameterTree>,
}

impl FunctionDescriptor {
    pub fn new(
        path_to_project: impl Into<String>,
        file_id: impl Into<String>,
        function_id: impl Into<String>,
    ) -> Self {
        Self {
            path_to_project: path_to_project.into(),
            file_id: file_id.into(),
            function_id: function_id.into(),
            arguments: Vec::new(),
        }
    }

    /// Add a (sub-)function parameter list
    pub fn with_parameters(
        mut self,
        function_name: impl Into<String>,
        body: Vec<ParameterPattern>,
    ) -> Self {
        self.arguments.push(ParameterTree::new(function_name, body));
        self
    }
}

/// Output of the flattener for one (sub-)function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlattenedParameters {
    pub function_name: String,
    pub arguments: Vec<String>,
}

// ============================================================================
// Values
// ============================================================================

/// Type of a fixture value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeTag {
    #[default]
    Undefined,
    Null,
    Boolean,
    Number,
    String,
    Array,
    Object,
}

impl TypeTag {
    /// Tag describing a JSON value. JSON has no `undefined`, so this never
    /// returns [`TypeTag::Undefined`].
    pub fn of_value(value: &Value) -> Self {
        match value {
            Value::Null => TypeTag::Null,
            Value::Bool(_) => TypeTag::Boolean,
            Value::Number(_) => TypeTag::Number,
            Value::String(_) => TypeTag::String,
            Value::Array(_) => TypeTag::Array,
            Value::Object(_) => TypeTag::Object,
        }
    }

    /// `array` and `object` values are edited through nested editors.
    pub fn is_composite(self) -> bool {
        matches!(self, TypeTag::Array | TypeTag::Object)
    }

    /// `undefined` and `null` never carry a value.
    pub fn carries_value(self) -> bool {
        !matches!(self, TypeTag::Undefined | TypeTag::Null)
    }
}

impl std::fmt::Display for TypeTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TypeTag::Undefined => "undefined",
            TypeTag::Null => "null",
            TypeTag::Boolean => "boolean",
            TypeTag::Number => "number",
            TypeTag::String => "string",
            TypeTag::Array => "array",
            TypeTag::Object => "object",
        };
        f.write_str(s)
    }
}

// ============================================================================
// Modules
// ============================================================================

/// One editable argument slot.
///
/// Identity is `(sub_function_name, argument)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlattenedArgument {
    pub sub_function_name: String,
    pub argument: String,
    #[serde(rename = "type", default)]
    pub type_tag: TypeTag,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl FlattenedArgument {
    /// A fresh slot of type `undefined`
    pub fn new(sub_function_name: impl Into<String>, argument: impl Into<String>) -> Self {
        Self {
            sub_function_name: sub_function_name.into(),
            argument: argument.into(),
            type_tag: TypeTag::Undefined,
            value: None,
        }
    }

    /// Set type and value; the value is dropped for `undefined`/`null`.
    pub fn with_value(mut self, type_tag: TypeTag, value: Option<Value>) -> Self {
        self.type_tag = type_tag;
        self.value = value.filter(|_| type_tag.carries_value());
        self
    }

    pub fn same_slot(&self, other: &FlattenedArgument) -> bool {
        self.is_slot(&other.sub_function_name, &other.argument)
    }

    pub fn is_slot(&self, sub_function_name: &str, argument: &str) -> bool {
        self.sub_function_name == sub_function_name && self.argument == argument
    }
}

/// Expected return value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReturnValue {
    #[serde(rename = "type", default)]
    pub type_tag: TypeTag,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl ReturnValue {
    pub fn new(type_tag: TypeTag, value: Option<Value>) -> Self {
        Self {
            type_tag,
            value: value.filter(|_| type_tag.carries_value()),
        }
    }

    /// Re-apply the `value` absent for `undefined`/`null` rule
    pub fn normalized(self) -> Self {
        Self::new(self.type_tag, self.value)
    }
}

/// Expected exception.
///
/// A `None` `value` or `message` means that aspect is not checked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpectedException {
    pub equal: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Default for ExpectedException {
    fn default() -> Self {
        Self {
            equal: true,
            value: Some(String::new()),
            message: None,
        }
    }
}

/// Names of the optional test modules, in canonical display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ModuleName {
    ArgumentList,
    ReturnValue,
    Exception,
}

impl ModuleName {
    pub const ALL: [ModuleName; 3] = [
        ModuleName::ArgumentList,
        ModuleName::ReturnValue,
        ModuleName::Exception,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ModuleName::ArgumentList => "argumentList",
            ModuleName::ReturnValue => "returnValue",
            ModuleName::Exception => "exception",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == s)
    }
}

impl std::fmt::Display for ModuleName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The enabled modules of a draft and their payloads.
///
/// A module is enabled exactly when its field is `Some`, so the JSON object
/// only carries keys for enabled modules.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleMap {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub argument_list: Option<Vec<FlattenedArgument>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_value: Option<ReturnValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception: Option<ExpectedException>,
}

impl ModuleMap {
    pub fn contains(&self, module: ModuleName) -> bool {
        match module {
            ModuleName::ArgumentList => self.argument_list.is_some(),
            ModuleName::ReturnValue => self.return_value.is_some(),
            ModuleName::Exception => self.exception.is_some(),
        }
    }

    /// Enabled modules in canonical order.
    pub fn enabled(&self) -> Vec<ModuleName> {
        ModuleName::ALL
            .into_iter()
            .filter(|m| self.contains(*m))
            .collect()
    }

    pub fn remove(&mut self, module: ModuleName) -> bool {
        match module {
            ModuleName::ArgumentList => self.argument_list.take().is_some(),
            ModuleName::ReturnValue => self.return_value.take().is_some(),
            ModuleName::Exception => self.exception.take().is_some(),
        }
    }

    /// Look up an argument slot by identity key
    pub fn argument(&self, sub_function_name: &str, argument: &str) -> Option<&FlattenedArgument> {
        self.argument_list
            .as_deref()?
            .iter()
            .find(|a| a.is_slot(sub_function_name, argument))
    }
}

// ============================================================================
// Draft
// ============================================================================

/// An in-progress test fixture for one analyzed function.
///
/// `id` is only present once the draft has been persisted.
///
/// # JSON shape
///
/// ```json
/// {
///   "pathToProject": "/work/app",
///   "fileId": "src/math.js",
///   "functionId": "add",
///   "customName": "adds two numbers",
///   "moduleData": {
///     "argumentList": [
///       { "subFunctionName": "add", "argument": "a", "type": "number", "value": 1 }
///     ],
///     "returnValue": { "type": "number", "value": 3 }
///   }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub path_to_project: String,
    pub file_id: String,
    pub function_id: String,
    #[serde(default)]
    pub custom_name: String,
    #[serde(default)]
    pub module_data: ModuleMap,
}

impl TestDraft {
    /// An empty, unsaved draft targeting `function`. No module is enabled;
    /// see [`initial_draft`](crate::v1::initial_draft) for a draft with defaults.
    pub fn for_function(function: &FunctionDescriptor) -> Self {
        Self {
            id: None,
            path_to_project: function.path_to_project.clone(),
            file_id: function.file_id.clone(),
            function_id: function.function_id.clone(),
            custom_name: String::new(),
            module_data: ModuleMap::default(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_custom_name(mut self, name: impl Into<String>) -> Self {
        self.custom_name = name.into();
        self
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Parse a draft from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // ── ParameterPattern ───────────────────────────────────────────────

    #[test]
    fn test_pattern_deserialize_nested() {
        let p: ParameterPattern = serde_json::from_value(json!({
            "type": "ObjectPattern",
            "properties": [
                { "type": "PropertyBinding", "keyName": "b" },
                { "type": "ArrayPattern", "elements": [null, { "type": "Identifier", "name": "d" }] }
            ]
        }))
        .unwrap();

        assert_eq!(
            p,
            ParameterPattern::object(vec![
                ParameterPattern::property("b"),
                ParameterPattern::ArrayPattern {
                    elements: vec![None, Some(ParameterPattern::identifier("d"))],
                },
            ])
        );
    }

    #[test]
    fn test_pattern_unknown_kind_is_unrecognized() {
        let p: ParameterPattern = serde_json::from_value(json!({
            "type": "AssignmentPattern",
            "left": { "type": "Identifier", "name": "a" },
            "right": 1
        }))
        .unwrap();
        assert_eq!(p, ParameterPattern::Unrecognized);
    }

    #[test]
    fn test_pattern_missing_fields_degrade_per_node() {
        let p: ParameterPattern = serde_json::from_value(json!({
            "type": "ObjectPattern",
            "properties": [
                { "type": "Identifier" },
                { "type": "PropertyBinding", "keyName": "b" },
                { "type": "PropertyBinding", "keyName": 7 },
                "garbage"
            ]
        }))
        .unwrap();
        assert_eq!(
            p,
            ParameterPattern::object(vec![
                ParameterPattern::Unrecognized,
                ParameterPattern::property("b"),
                ParameterPattern::Unrecognized,
                ParameterPattern::Unrecognized,
            ])
        );
    }

    #[test]
    fn test_rest_element_without_inner() {
        let bare: ParameterPattern =
            serde_json::from_value(json!({ "type": "RestElement" })).unwrap();
        assert_eq!(bare, ParameterPattern::rest(ParameterPattern::Unrecognized));

        let estree: ParameterPattern = serde_json::from_value(json!({
            "type": "RestElement",
            "argument": { "type": "Identifier", "name": "z" }
        }))
        .unwrap();
        assert_eq!(estree, ParameterPattern::rest(ParameterPattern::identifier("z")));
    }

    #[test]
    fn test_array_pattern_with_non_list_elements() {
        let p: ParameterPattern =
            serde_json::from_value(json!({ "type": "ArrayPattern", "elements": 3 })).unwrap();
        assert_eq!(p, ParameterPattern::ArrayPattern { elements: vec![] });
    }

    #[test]
    fn test_pattern_serialize_reads_back() {
        let p = ParameterPattern::object(vec![
            ParameterPattern::rest(ParameterPattern::identifier("r")),
            ParameterPattern::Unrecognized,
        ]);
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["properties"][0]["type"], "RestElement");
        assert_eq!(serde_json::from_value::<ParameterPattern>(json).unwrap(), p);
    }

    #[test]
    fn test_function_descriptor_keeps_parsing_around_bad_nodes() {
        let f: FunctionDescriptor = serde_json::from_value(json!({
            "pathToProject": "/p",
            "fileId": "a.js",
            "functionId": "g",
            "arguments": [{ "functionName": "g", "body": [
                { "type": "Identifier", "name": "x" },
                { "type": "RestElement", "argument": { "type": "Identifier", "name": "z" } },
                { "name": "no-type" }
            ] }, { "functionName": "h" }]
        }))
        .unwrap();
        assert_eq!(f.arguments[0].body.len(), 3);
        assert_eq!(f.arguments[0].body[2], ParameterPattern::Unrecognized);
        assert!(f.arguments[1].body.is_empty());
    }

    #[test]
    fn test_parameter_tree_accepts_single_body_and_name_alias() {
        let t: ParameterTree = serde_json::from_value(json!({
            "name": "f",
            "body": { "type": "Identifier", "name": "a" }
        }))
        .unwrap();
        assert_eq!(t.function_name, "f");
        assert_eq!(t.body, vec![ParameterPattern::identifier("a")]);
    }

    #[test]
    fn test_function_descriptor_json() {
        let f: FunctionDescriptor = serde_json::from_value(json!({
            "pathToProject": "/p",
            "fileId": "a.js",
            "functionId": "f",
            "arguments": [{ "functionName": "f", "body": [] }]
        }))
        .unwrap();
        assert_eq!(f.function_id, "f");
        assert_eq!(f.arguments.len(), 1);
        assert!(f.arguments[0].body.is_empty());
    }

    // ── TypeTag ────────────────────────────────────────────────────────

    #[test]
    fn test_type_tag_serde_lowercase() {
        assert_eq!(serde_json::to_string(&TypeTag::Undefined).unwrap(), "\"undefined\"");
        let t: TypeTag = serde_json::from_str("\"object\"").unwrap();
        assert_eq!(t, TypeTag::Object);
        assert_eq!(t.to_string(), "object");
    }

    #[test]
    fn test_type_tag_of_value() {
        assert_eq!(TypeTag::of_value(&json!(null)), TypeTag::Null);
        assert_eq!(TypeTag::of_value(&json!(true)), TypeTag::Boolean);
        assert_eq!(TypeTag::of_value(&json!(1.5)), TypeTag::Number);
        assert_eq!(TypeTag::of_value(&json!("s")), TypeTag::String);
        assert_eq!(TypeTag::of_value(&json!([])), TypeTag::Array);
        assert_eq!(TypeTag::of_value(&json!({})), TypeTag::Object);
    }

    #[test]
    fn test_type_tag_predicates() {
        assert!(TypeTag::Array.is_composite());
        assert!(TypeTag::Object.is_composite());
        assert!(!TypeTag::String.is_composite());
        assert!(!TypeTag::Undefined.carries_value());
        assert!(!TypeTag::Null.carries_value());
        assert!(TypeTag::Boolean.carries_value());
    }

    // ── Modules ────────────────────────────────────────────────────────

    #[test]
    fn test_return_value_drops_value_for_undefined_and_null() {
        let rv = ReturnValue::new(TypeTag::Null, Some(json!(1)));
        assert!(rv.value.is_none());
        let rv = ReturnValue::new(TypeTag::Number, Some(json!(1)));
        assert_eq!(rv.value, Some(json!(1)));
    }

    #[test]
    fn test_return_value_json_omits_absent_value() {
        let json = serde_json::to_string(&ReturnValue::default()).unwrap();
        assert_eq!(json, r#"{"type":"undefined"}"#);
    }

    #[test]
    fn test_exception_default() {
        let e = ExpectedException::default();
        assert!(e.equal);
        assert_eq!(e.value.as_deref(), Some(""));
        assert!(e.message.is_none());
    }

    #[test]
    fn test_module_map_keys_only_for_enabled_modules() {
        let m = ModuleMap {
            return_value: Some(ReturnValue::default()),
            ..Default::default()
        };
        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json, json!({ "returnValue": { "type": "undefined" } }));
        assert_eq!(m.enabled(), vec![ModuleName::ReturnValue]);
    }

    #[test]
    fn test_module_map_remove() {
        let mut m = ModuleMap {
            exception: Some(ExpectedException::default()),
            ..Default::default()
        };
        assert!(m.remove(ModuleName::Exception));
        assert!(!m.remove(ModuleName::Exception));
        assert!(m.enabled().is_empty());
    }

    #[test]
    fn test_module_name_parse() {
        assert_eq!(ModuleName::parse("returnValue"), Some(ModuleName::ReturnValue));
        assert_eq!(ModuleName::parse("argumentList"), Some(ModuleName::ArgumentList));
        assert_eq!(ModuleName::parse("nope"), None);
    }

    #[test]
    fn test_flattened_argument_slot_identity() {
        let a = FlattenedArgument::new("f", "b");
        let b = FlattenedArgument::new("f", "b").with_value(TypeTag::Number, Some(json!(2)));
        let c = FlattenedArgument::new("g", "b");
        assert!(a.same_slot(&b));
        assert!(!a.same_slot(&c));
    }

    // ── TestDraft ──────────────────────────────────────────────────────

    #[test]
    fn test_draft_json_shape() {
        let f = FunctionDescriptor::new("/p", "a.js", "f");
        let draft = TestDraft::for_function(&f).with_custom_name("works");
        let json = draft.to_json().unwrap();
        assert!(json.contains("\"pathToProject\":\"/p\""));
        assert!(json.contains("\"customName\":\"works\""));
        assert!(!json.contains("\"id\""));

        let parsed = TestDraft::from_json(&json).unwrap();
        assert_eq!(parsed, draft);
        assert!(!parsed.is_persisted());
    }

    #[test]
    fn test_draft_from_json_invalid() {
        assert!(TestDraft::from_json("not json").is_err());
    }
}

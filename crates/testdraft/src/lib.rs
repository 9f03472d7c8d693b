#![doc = include_str!("../README.md")]

mod command;
mod error;
mod flatten;
mod navigator;
mod reduce;
mod session;
mod types;

pub mod v1 {
    //! Versioned public API for the draft engine.
    //!
    //! Everything you need is re-exported from this module. Types are organized
    //! into four groups:
    //!
    //! # Analyzer input
    //!
    //! - [`FunctionDescriptor`] — a function and its parameter lists
    //! - [`ParameterTree`] — the parameter list of one (sub-)function
    //! - [`ParameterPattern`] — one destructuring node
    //! - [`FlattenedParameters`] — flattener output
    //!
    //! # Drafts
    //!
    //! - [`TestDraft`] — the fixture being edited
    //! - [`ModuleMap`], [`ModuleName`] — the optional test modules
    //! - [`FlattenedArgument`], [`ReturnValue`], [`ExpectedException`] — module payloads
    //! - [`TypeTag`] — the type of a fixture value
    //!
    //! # Commands
    //!
    //! - [`Command`] and its per-kind sub-commands
    //! - [`ParsedCommand`] — a decoded envelope, possibly ignored
    //! - [`reduce`], [`apply`], [`ReduceContext`] — the state machine
    //!
    //! # Nested editing
    //!
    //! - [`Navigator`], [`EditorFrame`], [`FrameTarget`], [`FieldKey`]
    //! - [`DraftSession`] — function + draft + persisted snapshot + navigator
    //!
    //! # Example — edit a draft through JSON commands
    //!
    //! ```
    //! use serde_json::json;
    //! use testdraft::v1::*;
    //!
    //! let g = FunctionDescriptor::new("/work/app", "src/g.js", "g")
    //!     .with_parameters("g", vec![ParameterPattern::identifier("x")]);
    //!
    //! let mut session = DraftSession::fresh(g);
    //! session
    //!     .dispatch(&json!({
    //!         "kind": "returnValue",
    //!         "tag": "updateReturnValue",
    //!         "payload": { "type": "number", "value": 42 }
    //!     }))
    //!     .unwrap();
    //!
    //! // Unknown kinds are ignored, unknown tags are not.
    //! session.dispatch(&json!({ "kind": "coverage" })).unwrap();
    //! assert!(session.dispatch(&json!({ "kind": "returnValue", "tag": "reset" })).is_err());
    //!
    //! let rv = session.draft().module_data.return_value.as_ref().unwrap();
    //! assert_eq!(rv.type_tag, TypeTag::Number);
    //! assert_eq!(rv.value, Some(json!(42)));
    //! ```

    /// Parameter structure flattening.
    ///
    /// # Example
    ///
    /// ```
    /// use testdraft::v1::{ParameterPattern as P, flatten};
    ///
    /// let leaves = flatten::flatten_args(&[
    ///     P::identifier("a"),
    ///     P::object(vec![P::property("b"), P::property("c")]),
    /// ]);
    /// assert_eq!(leaves, ["a", "b", "c"]);
    /// ```
    pub mod flatten {
        pub use crate::flatten::{default_arguments, flatten, flatten_args};
    }
    pub use crate::command::{
        ArgumentListCommand, Command, CustomNameCommand, ExceptionCommand, ModuleDataCommand,
        ParsedCommand, ReturnValueCommand,
    };
    pub use crate::error::{CommandError, Error, NavError, ReduceError, Result};
    pub use crate::navigator::{
        ARGUMENT_EDITOR, EditorFrame, FieldKey, FrameTarget, Navigator, RETURN_VALUE_EDITOR,
    };
    pub use crate::reduce::{ReduceContext, apply, default_module_data, initial_draft, reduce};
    pub use crate::session::DraftSession;
    pub use crate::types::{
        ExpectedException, FlattenedArgument, FlattenedParameters, FunctionDescriptor, ModuleMap,
        ModuleName, ParameterPattern, ParameterTree, ReturnValue, TestDraft, TypeTag,
    };
}

//! Flattening of parameter structure trees into ordered argument slots.

use crate::types::{FlattenedArgument, FlattenedParameters, ParameterPattern, ParameterTree};
use std::collections::HashSet;

/// Flatten every (sub-)function's parameter list.
///
/// Leaves are emitted depth-first, left to right. Rest elements become the
/// literal `"RestElement"` and unrecognized nodes contribute nothing.
///
/// # Examples
///
/// ```
/// use testdraft::v1::{ParameterPattern as P, ParameterTree, flatten};
///
/// // f(a, {b, c}, [d, e], ...rest)
/// let tree = ParameterTree::new("f", vec![
///     P::identifier("a"),
///     P::object(vec![P::property("b"), P::property("c")]),
///     P::array(vec![P::identifier("d"), P::identifier("e")]),
///     P::rest(P::identifier("rest")),
/// ]);
///
/// let flat = flatten::flatten(&[tree]);
/// assert_eq!(flat[0].function_name, "f");
/// assert_eq!(flat[0].arguments, ["a", "b", "c", "d", "e", "RestElement"]);
/// ```
pub fn flatten(trees: &[ParameterTree]) -> Vec<FlattenedParameters> {
    trees
        .iter()
        .map(|t| FlattenedParameters {
            function_name: t.function_name.clone(),
            arguments: flatten_args(&t.body),
        })
        .collect()
}

/// Flatten a list of pattern nodes into leaf binding names.
pub fn flatten_args(nodes: &[ParameterPattern]) -> Vec<String> {
    let mut out = Vec::new();
    for node in nodes {
        collect(node, &mut out);
    }
    out
}

fn collect(node: &ParameterPattern, out: &mut Vec<String>) {
    match node {
        ParameterPattern::Identifier { name } => out.push(name.clone()),
        ParameterPattern::PropertyBinding { key_name } => out.push(key_name.clone()),
        ParameterPattern::ObjectPattern { properties } => {
            for p in properties {
                collect(p, out);
            }
        }
        ParameterPattern::ArrayPattern { elements } => {
            for e in elements.iter().flatten() {
                collect(e, out);
            }
        }
        // The captured name is deliberately not surfaced.
        ParameterPattern::RestElement { .. } => out.push("RestElement".to_string()),
        ParameterPattern::Unrecognized => {}
    }
}

/// Default `argumentList` for a function: one `undefined` slot per leaf.
///
/// Slots sharing an identity key with an earlier slot are dropped; the first
/// occurrence keeps its position.
pub fn default_arguments(trees: &[ParameterTree]) -> Vec<FlattenedArgument> {
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut slots = Vec::new();

    for flat in flatten(trees) {
        for argument in flat.arguments {
            let key = (flat.function_name.clone(), argument);
            if !seen.insert(key.clone()) {
                tracing::warn!(
                    sub_function = %key.0,
                    argument = %key.1,
                    "duplicate argument slot dropped"
                );
                continue;
            }
            slots.push(FlattenedArgument::new(key.0, key.1));
        }
    }

    slots
}

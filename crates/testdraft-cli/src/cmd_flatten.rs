use crate::session_file::{format_json, read_input};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use testdraft::v1::{FunctionDescriptor, ParameterTree, flatten};

/// Either a full function descriptor or just its parameter trees.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FlattenInput {
    Function(FunctionDescriptor),
    Trees(Vec<ParameterTree>),
}

impl FlattenInput {
    fn into_trees(self) -> Vec<ParameterTree> {
        match self {
            FlattenInput::Function(f) => f.arguments,
            FlattenInput::Trees(trees) => trees,
        }
    }
}

fn parse_input(data: &str) -> Result<Vec<ParameterTree>> {
    let input: FlattenInput =
        serde_json::from_str(data).context("expected a function descriptor or parameter trees")?;
    Ok(input.into_trees())
}

pub fn run(input: PathBuf, pretty: bool) -> Result<()> {
    let trees = parse_input(&read_input(&input)?)?;
    let flat = flatten::flatten(&trees);
    println!("{}", format_json(&flat, pretty)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_input() {
        let trees = parse_input(
            r#"{"pathToProject":"/p","fileId":"a.js","functionId":"f","arguments":[
                {"functionName":"f","body":[
                    {"type":"Identifier","name":"a"},
                    {"type":"ObjectPattern","properties":[{"type":"PropertyBinding","keyName":"b"}]}
                ]}]}"#,
        )
        .unwrap();
        let flat = flatten::flatten(&trees);
        assert_eq!(flat[0].function_name, "f");
        assert_eq!(flat[0].arguments, vec!["a", "b"]);
    }

    #[test]
    fn test_bare_trees_input() {
        let trees = parse_input(
            r#"[{"functionName":"g","body":{"type":"RestElement","inner":{"type":"Identifier","name":"r"}}}]"#,
        )
        .unwrap();
        assert_eq!(flatten::flatten(&trees)[0].arguments, vec!["RestElement"]);
    }

    #[test]
    fn test_rejects_other_json() {
        assert!(parse_input(r#"{"nope": 1}"#).is_err());
    }
}

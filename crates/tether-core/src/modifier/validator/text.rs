use crate::{
    context::Context,
    error::{DefinitionError, ValidationError},
    graph::Runtime,
    modifier::Modifier,
    value::Value,
};
use regex::Regex;

///
/// OneOf
///

#[derive(Clone, Debug)]
pub struct OneOf {
    choices: Vec<Value>,
}

impl OneOf {
    pub fn new(choices: Vec<Value>) -> Result<Self, DefinitionError> {
        if choices.is_empty() {
            return Err(DefinitionError::invalid_argument(
                "one_of",
                "at least one choice is required",
            ));
        }

        Ok(Self { choices })
    }
}

impl Modifier for OneOf {
    fn name(&self) -> &'static str {
        "one_of"
    }

    fn validate(&self, cx: &Context<'_>, _rt: &mut Runtime<'_>) -> Result<(), ValidationError> {
        if self.choices.contains(cx.value()) {
            return Ok(());
        }

        let allowed = self
            .choices
            .iter()
            .map(|c| c.to_json().to_string())
            .collect::<Vec<_>>()
            .join(", ");

        Err(cx.issue(format!("must be one of {allowed}")))
    }
}

///
/// Pattern
/// Compiled once when the chain is built.
///

#[derive(Clone, Debug)]
pub struct Pattern {
    regex: Regex,
}

impl Pattern {
    pub fn new(pattern: &str) -> Result<Self, DefinitionError> {
        let regex = Regex::new(pattern)
            .map_err(|e| DefinitionError::invalid_argument("pattern", e.to_string()))?;

        Ok(Self { regex })
    }
}

impl Modifier for Pattern {
    fn name(&self) -> &'static str {
        "pattern"
    }

    fn validate(&self, cx: &Context<'_>, _rt: &mut Runtime<'_>) -> Result<(), ValidationError> {
        match cx.value().as_str() {
            Some(s) if !self.regex.is_match(s) => Err(cx.issue(format!(
                "does not match pattern {}",
                self.regex.as_str()
            ))),
            _ => Ok(()),
        }
    }
}

///
/// TESTS
///

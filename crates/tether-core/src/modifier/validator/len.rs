use crate::{
    context::Context, error::DefinitionError, error::ValidationError, graph::Runtime,
    modifier::Modifier,
};

///
/// Length
///
/// Bounds on text length (in chars) or collection size.
/// Values without a length are left to the type node.
///

#[derive(Clone, Copy, Debug)]
pub struct Length {
    min: Option<usize>,
    max: Option<usize>,
}

impl Length {
    #[must_use]
    pub const fn min(min: usize) -> Self {
        Self {
            min: Some(min),
            max: None,
        }
    }

    #[must_use]
    pub const fn max(max: usize) -> Self {
        Self {
            min: None,
            max: Some(max),
        }
    }

    #[must_use]
    pub const fn exact(len: usize) -> Self {
        Self {
            min: Some(len),
            max: Some(len),
        }
    }

    pub fn between(min: usize, max: usize) -> Result<Self, DefinitionError> {
        if min > max {
            return Err(DefinitionError::invalid_argument(
                "length_between",
                format!("minimum {min} exceeds maximum {max}"),
            ));
        }

        Ok(Self {
            min: Some(min),
            max: Some(max),
        })
    }
}

impl Modifier for Length {
    fn name(&self) -> &'static str {
        match (self.min, self.max) {
            (Some(a), Some(b)) if a == b => "length",
            (Some(_), Some(_)) => "length_between",
            (Some(_), None) => "min_length",
            _ => "max_length",
        }
    }

    fn validate(&self, cx: &Context<'_>, _rt: &mut Runtime<'_>) -> Result<(), ValidationError> {
        let Some(len) = cx.value().len() else {
            return Ok(());
        };

        match (self.min, self.max) {
            (Some(a), Some(b)) if a == b && len != a => Err(cx.issue(format!(
                "length ({len}) is not equal to {a}"
            ))),
            (Some(min), _) if len < min => Err(cx.issue(format!(
                "length ({len}) is lower than minimum of {min}"
            ))),
            (_, Some(max)) if len > max => Err(cx.issue(format!(
                "length ({len}) is greater than maximum of {max}"
            ))),
            _ => Ok(()),
        }
    }
}

///
/// TESTS
///

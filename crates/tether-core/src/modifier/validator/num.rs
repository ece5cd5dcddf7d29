use crate::{
    context::Context,
    error::{DefinitionError, ValidationError},
    graph::Runtime,
    modifier::Modifier,
};

///
/// Bound
/// Inclusive numeric bounds; integers compare by widening to `f64`.
///

#[derive(Clone, Copy, Debug)]
pub struct Bound {
    min: Option<f64>,
    max: Option<f64>,
}

impl Bound {
    #[must_use]
    pub const fn min(min: f64) -> Self {
        Self {
            min: Some(min),
            max: None,
        }
    }

    #[must_use]
    pub const fn max(max: f64) -> Self {
        Self {
            min: None,
            max: Some(max),
        }
    }

    pub fn range(min: f64, max: f64) -> Result<Self, DefinitionError> {
        if min.is_nan() || max.is_nan() || min > max {
            return Err(DefinitionError::invalid_argument(
                "range",
                format!("invalid bounds {min}..={max}"),
            ));
        }

        Ok(Self {
            min: Some(min),
            max: Some(max),
        })
    }
}

impl Modifier for Bound {
    fn name(&self) -> &'static str {
        match (self.min, self.max) {
            (Some(_), Some(_)) => "range",
            (Some(_), None) => "min",
            _ => "max",
        }
    }

    fn validate(&self, cx: &Context<'_>, _rt: &mut Runtime<'_>) -> Result<(), ValidationError> {
        let Some(n) = cx.value().as_f64() else {
            return Ok(());
        };

        if let Some(min) = self.min
            && n < min
        {
            return Err(cx.issue(format!("{n} is lower than minimum of {min}")));
        }
        if let Some(max) = self.max
            && n > max
        {
            return Err(cx.issue(format!("{n} is greater than maximum of {max}")));
        }

        Ok(())
    }
}

///
/// TESTS
///

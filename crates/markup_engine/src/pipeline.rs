//! # Pipeline evaluation
//!
//! Applies a directive's filter chain to a value, left to right. A step
//! that names an unknown filter or whose filter fails is handled according
//! to the [`FilterErrorPolicy`]: by default the value from before that step
//! carries on through the rest of the chain.
//!
//! The capture step `set>name` is handled here rather than in the registry
//! because it writes into the run's captures.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::directive::FilterCall;
use crate::errors::{FilterError, RenderError};
use crate::filters::FilterRegistry;
use crate::value::{Map, Value};

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;

/// Name of the pipeline step that stores its input as a captured value.
pub const CAPTURE_FILTER: &str = "set";

/// What to do when a filter step cannot be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterErrorPolicy {
    /// Skip the failing step and continue with the previous value.
    #[default]
    Passthrough,
    /// Abort the render with [`RenderError::Filter`].
    Propagate,
}

/// Filter chain evaluator bound to a registry and an error policy.
#[derive(Debug, Clone, Copy)]
pub struct Pipeline<'a> {
    registry: &'a FilterRegistry,
    policy: FilterErrorPolicy,
}

impl<'a> Pipeline<'a> {
    pub fn new(registry: &'a FilterRegistry, policy: FilterErrorPolicy) -> Self {
        Self { registry, policy }
    }

    /// Runs `value` through every step of `chain`.
    ///
    /// `captures` receives values stored with `set>name`.
    pub fn apply(
        &self,
        value: Value,
        chain: &[FilterCall],
        captures: &mut Map,
    ) -> Result<Value, RenderError> {
        chain.iter().try_fold(value, |value, call| {
            match self.apply_step(&value, call, captures) {
                Ok(next) => Ok(next),
                Err(source) => self.recover(value, call, source),
            }
        })
    }

    fn apply_step(
        &self,
        value: &Value,
        call: &FilterCall,
        captures: &mut Map,
    ) -> Result<Value, FilterError> {
        if call.name == CAPTURE_FILTER {
            let key = call
                .args
                .first()
                .map(|key| key.trim())
                .filter(|key| !key.is_empty())
                .ok_or_else(|| FilterError::MissingArgument {
                    filter: CAPTURE_FILTER.to_string(),
                    position: 1,
                })?;
            captures.insert(key.to_string(), value.clone());
            return Ok(Value::String(String::new()));
        }

        let filter = self
            .registry
            .get(&call.name)
            .ok_or_else(|| FilterError::Unknown {
                name: call.name.clone(),
            })?;
        filter.apply(value, &call.args)
    }

    fn recover(
        &self,
        value: Value,
        call: &FilterCall,
        source: FilterError,
    ) -> Result<Value, RenderError> {
        match self.policy {
            FilterErrorPolicy::Passthrough => {
                if matches!(source, FilterError::Unknown { .. }) {
                    debug!(filter = %call.name, "Skipping unknown filter");
                } else {
                    warn!(filter = %call.name, error = %source, "Filter failed, passing value through");
                }
                Ok(value)
            }
            FilterErrorPolicy::Propagate => Err(RenderError::Filter {
                filter: call.name.clone(),
                source,
            }),
        }
    }
}

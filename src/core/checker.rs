//! Caller-supplied predicates comparing expected and actual output.
//!
//! Predicates are Rhai functions. The engine has no module resolution, no
//! `eval`, no printing, and runs under operation, depth and wall-clock limits,
//! so a predicate can only compute over the two values it is given.

use std::time::Instant;

use rhai::module_resolvers::DummyModuleResolver;
use rhai::{Dynamic, Engine, Scope};

use crate::config::CheckerLimits;
use crate::constants::{
    CHECKER_NON_BOOL_MSG, CHECKER_RETURN_MSG, CHECKER_RUNTIME_MSG, CHECKER_SIGNATURE,
    CHECKER_SIGNATURE_MSG,
};
use crate::core::domain::CheckerDefinition;

const ENTRY_POINT: &str = "checker";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CheckerError {
    #[error("{}", CHECKER_SIGNATURE_MSG)]
    InvalidSignature,
    #[error("{}", CHECKER_RETURN_MSG)]
    MissingReturn,
    #[error("{msg}: {details}", msg = CHECKER_RUNTIME_MSG)]
    Runtime { details: String },
    #[error("{}", CHECKER_NON_BOOL_MSG)]
    NonBoolean,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Checker {
    limits: CheckerLimits,
}

impl Checker {
    pub fn new(limits: CheckerLimits) -> Self {
        Checker { limits }
    }

    pub fn validate(&self, definition: &CheckerDefinition) -> Result<(), CheckerError> {
        let source = definition.source();
        if !source.starts_with(CHECKER_SIGNATURE) {
            return Err(CheckerError::InvalidSignature);
        }
        if !source.contains("return") {
            return Err(CheckerError::MissingReturn);
        }
        Ok(())
    }

    /// Runs the predicate with `expected` and `actual` bound. An absent
    /// `actual` is passed as unit.
    #[tracing::instrument(skip(self, definition))]
    pub fn evaluate(
        &self,
        definition: &CheckerDefinition,
        expected: &str,
        actual: Option<&str>,
    ) -> Result<bool, CheckerError> {
        self.validate(definition)?;

        // Strings the size of the compared values must stay buildable.
        let longest = expected.len().max(actual.map_or(0, str::len));
        let engine = self.engine(self.limits.max_string_size.max(2 * longest));
        let ast = engine
            .compile(definition.source())
            .map_err(|e| CheckerError::Runtime {
                details: e.to_string(),
            })?;

        let actual = actual.map_or(Dynamic::UNIT, |value| Dynamic::from(value.to_string()));
        let value: Dynamic = engine
            .call_fn(&mut Scope::new(), &ast, ENTRY_POINT, (expected.to_string(), actual))
            .map_err(|e| CheckerError::Runtime {
                details: e.to_string(),
            })?;

        tracing::debug!("Checker returned {:?}", value);
        value.as_bool().map_err(|_| CheckerError::NonBoolean)
    }

    fn engine(&self, max_string_size: usize) -> Engine {
        let mut engine = Engine::new();
        engine
            .set_module_resolver(DummyModuleResolver::new())
            .set_strict_variables(true)
            .set_max_operations(self.limits.max_operations)
            .set_max_call_levels(32)
            .set_max_expr_depths(64, 32)
            .set_max_string_size(max_string_size)
            .set_max_array_size(1 << 16)
            .set_max_map_size(1 << 16)
            .on_print(|_| {})
            .on_debug(|_, _, _| {});
        engine.disable_symbol("eval");

        let deadline = Instant::now() + self.limits.timeout;
        engine.on_progress(move |_| {
            if Instant::now() >= deadline {
                Some(Dynamic::from("checker timed out".to_string()))
            } else {
                None
            }
        });

        engine
    }
}

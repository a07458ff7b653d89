use std::path::PathBuf;

use uuid::Uuid;

/// Paired source/binary identity allocated per submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Artifact {
    pub id: Uuid,
    pub source_path: PathBuf,
    pub binary_path: PathBuf,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExecutionOutcome {
    pub result: Option<String>,
    pub error: Option<String>,
}

impl ExecutionOutcome {
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            result: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TestOutcome {
    pub result: Option<String>,
    pub error: Option<String>,
    pub passed: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestCase {
    pub input: String,
    pub expected_output: String,
    pub outcome: TestOutcome,
}

impl TestCase {
    pub fn new(input: &str, expected_output: &str) -> Self {
        TestCase {
            input: input.to_string(),
            expected_output: expected_output.to_string(),
            outcome: TestOutcome::default(),
        }
    }

    pub fn fail_with(&mut self, error: &str) {
        self.outcome = TestOutcome {
            result: None,
            error: Some(error.to_string()),
            passed: false,
        };
    }
}

/// Source text of the caller's `checker` predicate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckerDefinition(pub String);

impl CheckerDefinition {
    pub fn new(source: &str) -> Self {
        CheckerDefinition(source.to_string())
    }

    pub fn source(&self) -> &str {
        &self.0
    }
}

#[derive(Clone, Debug)]
pub struct DebugRequest {
    pub code: String,
    pub input: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DebugResult {
    pub result: Option<String>,
    pub error: Option<String>,
}

impl From<ExecutionOutcome> for DebugResult {
    fn from(outcome: ExecutionOutcome) -> Self {
        DebugResult {
            result: outcome.result,
            error: outcome.error,
        }
    }
}

#[derive(Clone, Debug)]
pub struct TestingRequest {
    pub code: String,
    pub checker: CheckerDefinition,
    pub tests: Vec<TestCase>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestingResult {
    pub tests: Vec<TestCase>,
}

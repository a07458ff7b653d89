use crate::core::{
    artifacts::StagedArtifact,
    domain::{Artifact, CheckerDefinition, TestCase, TestOutcome, TestingRequest, TestingResult},
    pipeline::{Pipeline, SubmissionError},
};

impl Pipeline {
    /// Compiles the code once, then runs and checks every test case in order.
    ///
    /// A checker fault aborts the remaining cases and is returned as an error.
    #[tracing::instrument(skip(self, request), fields(tests = request.tests.len()))]
    pub async fn testing(&self, request: TestingRequest) -> Result<TestingResult, SubmissionError> {
        let TestingRequest {
            code,
            checker,
            mut tests,
        } = request;
        let artifact = StagedArtifact::new(&self.store, self.store.stage(&code).await?);

        let result = self.run_tests(&artifact, &checker, &mut tests).await;

        artifact.release().await;
        result?;

        tracing::info!(
            passed = tests.iter().filter(|t| t.outcome.passed).count(),
            total = tests.len(),
            "Testing run finished"
        );
        Ok(TestingResult { tests })
    }

    async fn run_tests(
        &self,
        artifact: &Artifact,
        checker: &CheckerDefinition,
        tests: &mut [TestCase],
    ) -> Result<(), SubmissionError> {
        if let Some(error) = self.compile(artifact).await? {
            tests.iter_mut().for_each(|test| test.fail_with(&error));
            return Ok(());
        }

        for (test_idx, test) in tests.iter_mut().enumerate() {
            tracing::debug!("Running test {}", test_idx);
            let outcome = self.execute(artifact, &test.input).await;

            let passed = match outcome.error {
                Some(_) => false,
                None => {
                    self.check(checker, &test.expected_output, outcome.result.as_deref())
                        .await?
                }
            };

            test.outcome = TestOutcome {
                result: outcome.result,
                error: outcome.error,
                passed,
            };
        }

        Ok(())
    }
}

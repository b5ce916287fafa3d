//! Test Service collaborator.

use async_trait::async_trait;
use eyre::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::collaborators::process;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub name: String,
    pub passed: bool,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TestValidation {
    pub success: bool,
    pub failed_tests: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestRunConfig {
    pub scope: String,
    pub coverage: bool,
    #[serde(with = "duration_millis")]
    pub timeout: Duration,
}

impl Default for TestRunConfig {
    fn default() -> Self {
        Self {
            scope: "all".to_string(),
            coverage: true,
            timeout: Duration::from_secs(5 * 60),
        }
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

#[async_trait]
pub trait TestService: Send + Sync {
    async fn run_smoke_tests(&self, project_path: &str, language: &str) -> Result<Vec<TestResult>>;
    fn validate_test_results(&self, results: &[TestResult]) -> TestValidation;
    async fn run_tests(&self, project_path: &str, config: &TestRunConfig) -> Result<Vec<TestResult>>;
}

/// Runs a per-language test command, parsing only the exit code: the
/// core does not understand any particular test runner's output format.
pub struct ProcessTestService {
    commands: HashMap<String, String>,
}

impl ProcessTestService {
    pub fn new(commands: HashMap<String, String>) -> Self {
        Self { commands }
    }
}

#[async_trait]
impl TestService for ProcessTestService {
    async fn run_smoke_tests(&self, project_path: &str, language: &str) -> Result<Vec<TestResult>> {
        let Some(command) = self.commands.get(language) else {
            return Ok(vec![TestResult {
                name: format!("{language}-smoke"),
                passed: false,
                message: format!("no test command configured for language {language}"),
            }]);
        };
        let output = process::run(command, Path::new(project_path), Duration::from_secs(5 * 60)).await?;
        Ok(vec![TestResult {
            name: format!("{language}-smoke"),
            passed: output.success,
            message: if output.success { output.stdout } else { output.stderr },
        }])
    }

    fn validate_test_results(&self, results: &[TestResult]) -> TestValidation {
        let failed_tests = results.iter().filter(|r| !r.passed).count() as u32;
        TestValidation {
            success: failed_tests == 0,
            failed_tests,
        }
    }

    async fn run_tests(&self, project_path: &str, config: &TestRunConfig) -> Result<Vec<TestResult>> {
        let mut results = Vec::new();
        for language in self.commands.keys() {
            let output = process::run(
                self.commands.get(language).unwrap(),
                Path::new(project_path),
                config.timeout,
            )
            .await?;
            results.push(TestResult {
                name: format!("{language}-{}", config.scope),
                passed: output.success,
                message: if output.success { output.stdout } else { output.stderr },
            });
        }
        Ok(results)
    }
}

// ── Best-effort teardown ──
//
// Teardown runs every step even when earlier ones fail. Each failure is
// logged and kept in the report so the caller can decide what to do.

use std::future::Future;

use tracing::{debug, warn};

use crate::error::CoreError;

#[derive(Debug)]
pub struct StepOutcome {
    pub step: String,
    pub result: Result<(), CoreError>,
}

#[derive(Debug, Default)]
pub struct TeardownReport {
    outcomes: Vec<StepOutcome>,
}

impl TeardownReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Await `step` and record its outcome.
    pub async fn run_step<F>(&mut self, name: impl Into<String>, step: F)
    where
        F: Future<Output = Result<(), CoreError>>,
    {
        let result = step.await;
        self.record(name, result);
    }

    pub fn record(&mut self, name: impl Into<String>, result: Result<(), CoreError>) {
        let step = name.into();
        match &result {
            Ok(()) => debug!(%step, "teardown step done"),
            Err(e) => warn!(%step, error = %e, "teardown step failed, continuing"),
        }
        self.outcomes.push(StepOutcome { step, result });
    }

    /// Fold another report's outcomes into this one.
    pub fn merge(&mut self, other: Self) {
        self.outcomes.extend(other.outcomes);
    }

    pub fn outcomes(&self) -> &[StepOutcome] {
        &self.outcomes
    }

    pub fn failures(&self) -> impl Iterator<Item = &StepOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }

    pub fn is_clean(&self) -> bool {
        self.failures().next().is_none()
    }

    /// The first failure, if any.
    pub fn into_result(self) -> Result<(), CoreError> {
        self.outcomes
            .into_iter()
            .find_map(|o| o.result.err())
            .map_or(Ok(()), Err)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn failures_do_not_stop_later_steps() {
        let mut report = TeardownReport::new();
        report
            .run_step("remove vmk1", async { Err(CoreError::missing("vmk1")) })
            .await;
        report.run_step("leave vds", async { Ok(()) }).await;

        assert_eq!(report.outcomes().len(), 2);
        assert!(!report.is_clean());
        assert_eq!(report.failures().count(), 1);
        assert!(matches!(
            report.into_result(),
            Err(CoreError::MissingData { .. })
        ));
    }

    #[test]
    fn empty_report_is_clean() {
        let report = TeardownReport::new();
        assert!(report.is_clean());
        assert!(report.into_result().is_ok());
    }

    #[test]
    fn merged_reports_keep_step_order() {
        let mut first = TeardownReport::new();
        first.record("switch tor-a", Ok(()));

        let mut second = TeardownReport::new();
        tokio_test::block_on(second.run_step("switch tor-b", async {
            Err(CoreError::missing("uplinks"))
        }));

        first.merge(second);
        let steps: Vec<&str> = first.outcomes().iter().map(|o| o.step.as_str()).collect();
        assert_eq!(steps, ["switch tor-a", "switch tor-b"]);
        assert_eq!(first.failures().count(), 1);
    }
}

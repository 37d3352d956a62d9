//! Gate run orchestration.
//!
//! The orchestrator builds the configured checks once, then for each pull
//! request runs them through the [`CheckRunner`] under one run deadline and
//! collects exactly one result per check, in configured order.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, Instrument};
use uuid::Uuid;

use crate::check::{
    AiReviewCheck, Check, SecretRuleSet, SecretScanCheck, StaticAnalysisCheck,
    TicketValidationCheck,
};
use crate::collaborators::{ReviewModel, TicketTracker};
use crate::config::{ConfigError, GateConfig};
use crate::decision::DecisionEngine;
use crate::domain::{CheckKind, CheckResult, PrContext, Verdict};
use crate::obs;
use crate::report::{Report, ReportRenderer};
use crate::runner::{diagnostic, CheckRunner};

/// External services the checks talk to. Absent ones disable their check.
#[derive(Clone, Default)]
pub struct Collaborators {
    pub tracker: Option<Arc<dyn TicketTracker>>,
    pub model: Option<Arc<dyn ReviewModel>>,
    /// Secret rules; the built-in set when `None`.
    pub secret_rules: Option<Arc<SecretRuleSet>>,
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators")
            .field("tracker", &self.tracker.is_some())
            .field("model", &self.model.as_ref().map(|m| m.model_id().to_string()))
            .field("secret_rules", &self.secret_rules.as_ref().map(|r| r.version.clone()))
            .finish()
    }
}

impl Collaborators {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tracker(mut self, tracker: Arc<dyn TicketTracker>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    pub fn with_model(mut self, model: Arc<dyn ReviewModel>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn with_secret_rules(mut self, rules: Arc<SecretRuleSet>) -> Self {
        self.secret_rules = Some(rules);
        self
    }
}

/// Results of one gate run.
#[derive(Debug, Clone, Serialize)]
pub struct GateRun {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    results: Vec<CheckResult>,
}

impl GateRun {
    /// One result per scheduled check, in configured order.
    pub fn results(&self) -> &[CheckResult] {
        &self.results
    }

    pub fn result(&self, kind: CheckKind) -> Option<&CheckResult> {
        self.results.iter().find(|r| r.check() == kind)
    }
}

/// A finished run with its verdict and rendered report.
#[derive(Debug, Clone, Serialize)]
pub struct Evaluation {
    pub run: GateRun,
    pub verdict: Verdict,
    pub report: Report,
}

/// Drives checks for pull requests.
#[derive(Debug)]
pub struct Orchestrator {
    config: GateConfig,
    checks: Vec<Check>,
    runner: CheckRunner,
    engine: DecisionEngine,
    renderer: ReportRenderer,
}

impl Orchestrator {
    /// Validate the configuration and build the check set.
    ///
    /// Ticket validation is skipped without a tracker, AI review without a
    /// model. A model whose id differs from `config.ai.model` is rejected.
    pub fn new(config: GateConfig, collaborators: Collaborators) -> Result<Self, ConfigError> {
        config.validate()?;

        let rules = match collaborators.secret_rules {
            Some(rules) => rules,
            None => Arc::new(SecretRuleSet::builtin().map_err(|e| ConfigError::Invalid {
                name: "secret rules",
                reason: e.to_string(),
            })?),
        };
        let renderer = ReportRenderer::new(rules.version.clone());

        let mut checks = Vec::with_capacity(config.checks.len());
        for kind in &config.checks {
            let check = match kind {
                CheckKind::SecretScan => Check::SecretScan(SecretScanCheck::new(Arc::clone(&rules))),
                CheckKind::StaticAnalysis => Check::StaticAnalysis(StaticAnalysisCheck::new()),
                CheckKind::TicketValidation => {
                    let Some(tracker) = collaborators.tracker.clone() else {
                        debug!(check = %kind, "no ticket tracker configured, skipping");
                        continue;
                    };
                    let project_key = config
                        .ticket
                        .project_key
                        .clone()
                        .filter(|k| !k.trim().is_empty())
                        .ok_or(ConfigError::MissingProjectKey)?;
                    Check::TicketValidation(TicketValidationCheck::new(
                        tracker,
                        project_key,
                        config.ticket.allowed_statuses.clone(),
                    ))
                }
                CheckKind::AiReview => {
                    let Some(model) = collaborators.model.clone() else {
                        debug!(check = %kind, "no review model configured, skipping");
                        continue;
                    };
                    if model.model_id() != config.ai.model.trim() {
                        return Err(ConfigError::ModelMismatch {
                            configured: config.ai.model.clone(),
                            actual: model.model_id().to_string(),
                        });
                    }
                    Check::AiReview(AiReviewCheck::new(model, config.ai.diff_size_cap))
                }
            };
            checks.push(check);
        }

        Ok(Self {
            runner: config.runner(),
            engine: DecisionEngine::new(config.decision.clone()),
            renderer,
            config,
            checks,
        })
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub fn checks(&self) -> &[Check] {
        &self.checks
    }

    pub fn engine(&self) -> &DecisionEngine {
        &self.engine
    }

    pub fn renderer(&self) -> &ReportRenderer {
        &self.renderer
    }

    /// Scheduled check kinds, in order.
    pub fn scheduled(&self) -> Vec<CheckKind> {
        self.checks.iter().map(Check::kind).collect()
    }

    /// Run every scheduled check against one pull request.
    pub async fn run(&self, ctx: PrContext) -> GateRun {
        let run_id = Uuid::new_v4().to_string();
        let span = obs::run_span(&run_id, ctx.number);
        self.run_inner(run_id, ctx).instrument(span).await
    }

    /// Run, decide and render in one go.
    pub async fn evaluate(&self, ctx: PrContext) -> Evaluation {
        let run = self.run(ctx).await;
        let verdict = self.engine.evaluate(run.results());
        let report = self.renderer.render(run.results(), &verdict);
        obs::emit_verdict_rendered(&run.run_id, &verdict, run.duration_ms);
        Evaluation {
            run,
            verdict,
            report,
        }
    }

    async fn run_inner(&self, run_id: String, ctx: PrContext) -> GateRun {
        let started_at = Utc::now();
        let started = Instant::now();
        let scheduled = self.scheduled();
        obs::emit_run_started(&run_id, &scheduled);

        let deadline = self
            .config
            .effective_deadline(&scheduled)
            .map(|budget| started + budget);
        let ctx = Arc::new(ctx);
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent.max(1)));

        let handles: Vec<(CheckKind, JoinHandle<CheckResult>)> = self
            .checks
            .iter()
            .map(|check| {
                let check = check.clone();
                let runner = self.runner.clone();
                let ctx = Arc::clone(&ctx);
                let semaphore = Arc::clone(&semaphore);
                let kind = check.kind();
                let handle = tokio::spawn(
                    async move {
                        let _permit = semaphore.acquire_owned().await;
                        runner.run(&check, ctx).await
                    }
                    .in_current_span(),
                );
                (kind, handle)
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for (kind, mut handle) in handles {
            let joined = match deadline {
                Some(at) => match tokio::time::timeout_at(at, &mut handle).await {
                    Ok(joined) => joined,
                    Err(_) => {
                        handle.abort();
                        let result = CheckResult::error(kind, "run deadline exceeded");
                        obs::emit_check_finished(&result, started.elapsed().as_millis() as u64, 0);
                        results.push(result);
                        continue;
                    }
                },
                None => handle.await,
            };
            results.push(match joined {
                Ok(result) => result,
                Err(err) => CheckResult::error(kind, diagnostic(&format!("check task failed: {err}"))),
            });
        }

        GateRun {
            run_id,
            started_at,
            duration_ms: started.elapsed().as_millis() as u64,
            results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::TicketInfo;
    use crate::fakes::{ScriptedReviewModel, StaticTicketTracker};

    fn tracker() -> Arc<dyn TicketTracker> {
        Arc::new(StaticTicketTracker::new().with_ticket("PROJ-1", TicketInfo::found("PROJ", "Done")))
    }

    fn config() -> GateConfig {
        let mut config = GateConfig::default();
        config.ticket.project_key = Some("PROJ".to_string());
        config
    }

    #[test]
    fn test_missing_collaborators_skip_checks() {
        let orch = Orchestrator::new(config(), Collaborators::new()).unwrap();
        assert_eq!(
            orch.scheduled(),
            vec![CheckKind::SecretScan, CheckKind::StaticAnalysis]
        );
    }

    #[test]
    fn test_tracker_requires_project_key() {
        let err = Orchestrator::new(
            GateConfig::default(),
            Collaborators::new().with_tracker(tracker()),
        )
        .unwrap_err();
        assert_eq!(err, ConfigError::MissingProjectKey);
    }

    #[test]
    fn test_model_must_match_configured_id() {
        let err = Orchestrator::new(
            config(),
            Collaborators::new()
                .with_model(Arc::new(ScriptedReviewModel::approving().with_model_id("gpt-4o"))),
        )
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::ModelMismatch {
                configured: "gpt-4o-mini".to_string(),
                actual: "gpt-4o".to_string(),
            }
        );

        let mut config = config();
        config.ai.model = "gpt-4o".to_string();
        let orch = Orchestrator::new(
            config,
            Collaborators::new()
                .with_model(Arc::new(ScriptedReviewModel::approving().with_model_id("gpt-4o"))),
        )
        .unwrap();
        assert!(orch.scheduled().contains(&CheckKind::AiReview));
    }

    #[test]
    fn test_configured_order_is_kept() {
        let mut config = config();
        config.checks = vec![CheckKind::AiReview, CheckKind::SecretScan];
        let orch = Orchestrator::new(
            config,
            Collaborators::new().with_model(Arc::new(ScriptedReviewModel::approving())),
        )
        .unwrap();
        assert_eq!(orch.scheduled(), vec![CheckKind::AiReview, CheckKind::SecretScan]);
    }

    #[tokio::test]
    async fn test_run_yields_one_result_per_check_in_order() {
        let orch = Orchestrator::new(
            config(),
            Collaborators::new()
                .with_tracker(tracker())
                .with_model(Arc::new(ScriptedReviewModel::approving())),
        )
        .unwrap();

        let ctx = PrContext::new("feature/PROJ-1-login", "Add login").with_diff(
            "diff --git a/a.rs b/a.rs\n--- a/a.rs\n+++ b/a.rs\n@@ -0,0 +1 @@\n+let x = 1;\n",
        );
        let run = orch.run(ctx).await;

        let kinds: Vec<CheckKind> = run.results().iter().map(|r| r.check()).collect();
        assert_eq!(kinds, CheckKind::ALL.to_vec());
        assert!(run.results().iter().all(|r| r.is_pass()));
        assert!(Uuid::parse_str(&run.run_id).is_ok());
    }

    #[tokio::test]
    async fn test_sequential_run_matches_parallel() {
        let ctx = PrContext::new("PROJ-1", "t")
            .with_diff("diff --git a/a.js b/a.js\n--- a/a.js\n+++ b/a.js\n@@ -0,0 +1 @@\n+console.log(1)\n");

        let mut sequential = config();
        sequential.max_concurrent = 1;
        let a = Orchestrator::new(sequential, Collaborators::new()).unwrap().run(ctx.clone()).await;
        let b = Orchestrator::new(config(), Collaborators::new()).unwrap().run(ctx).await;
        assert_eq!(a.results(), b.results());
    }
}

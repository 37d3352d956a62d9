//! prgate Core Library
//!
//! Runs gatekeeping checks against a pull request, reduces their results to a
//! single merge verdict and renders the per-check feedback. Network access is
//! behind the traits in [`collaborators`]; HTTP implementations live in
//! `prgate-clients`.

pub mod check;
pub mod collaborators;
pub mod config;
pub mod decision;
pub mod diff;
pub mod domain;
pub mod fakes;
pub mod obs;
pub mod orchestrator;
pub mod publish;
pub mod report;
pub mod runner;
pub mod telemetry;

pub use check::{
    AiReviewCheck, Check, SecretRule, SecretRuleSet, SecretScanCheck, StaticAnalysisCheck,
    TicketValidationCheck,
};
pub use collaborators::{
    CollaboratorResult, CommentAction, PullRequestHost, ReviewModel, TicketInfo, TicketTracker,
};
pub use config::{AiConfig, ConfigError, GateConfig, TicketConfig};
pub use decision::{DecisionEngine, DecisionPolicy};
pub use domain::{
    BlockingReason, ChangedFile, CheckError, CheckKind, CheckOutcome, CheckResult, CheckStatus,
    CollaboratorError, Finding, Outcome, PrContext, Severity, Verdict,
};
pub use orchestrator::{Collaborators, Evaluation, GateRun, Orchestrator};
pub use publish::{publish, PublishOutcome};
pub use report::{CommentPayload, Report, ReportRenderer};
pub use runner::{CheckRunner, RetryPolicy};
pub use telemetry::init_tracing;

/// Crate version, reported by the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

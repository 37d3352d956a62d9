//! Ticket linkage validation.

use std::fmt;
use std::sync::{Arc, OnceLock};

use regex::Regex;

use crate::collaborators::TicketTracker;
use crate::domain::{CheckKind, CheckOutcome, CheckResult, Finding, PrContext, Severity};

fn ticket_id_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[A-Z]+-[0-9]+").expect("valid ticket regex"))
}

/// First ticket id in the branch name, then in the title.
pub fn extract_ticket_id(ctx: &PrContext) -> Option<String> {
    [ctx.branch_name(), ctx.title.as_str()]
        .into_iter()
        .find_map(|text| ticket_id_pattern().find(text))
        .map(|m| m.as_str().to_string())
}

/// Requires a tracker ticket in the expected project and an allowed status.
#[derive(Clone)]
pub struct TicketValidationCheck {
    tracker: Arc<dyn TicketTracker>,
    project_key: String,
    allowed_statuses: Vec<String>,
}

impl fmt::Debug for TicketValidationCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TicketValidationCheck")
            .field("project_key", &self.project_key)
            .field("allowed_statuses", &self.allowed_statuses)
            .finish_non_exhaustive()
    }
}

impl TicketValidationCheck {
    pub fn new(
        tracker: Arc<dyn TicketTracker>,
        project_key: impl Into<String>,
        allowed_statuses: Vec<String>,
    ) -> Self {
        Self {
            tracker,
            project_key: project_key.into(),
            allowed_statuses,
        }
    }

    pub fn project_key(&self) -> &str {
        &self.project_key
    }

    pub fn is_allowed_status(&self, status: &str) -> bool {
        let status = status.trim();
        self.allowed_statuses
            .iter()
            .any(|allowed| allowed.trim().eq_ignore_ascii_case(status))
    }

    pub async fn execute(&self, ctx: &PrContext) -> CheckOutcome<CheckResult> {
        let Some(ticket_id) = extract_ticket_id(ctx) else {
            let finding = Finding::new(
                Severity::High,
                format!(
                    "No ticket id found in branch `{}` or title `{}`",
                    ctx.branch_name(),
                    ctx.title
                ),
            )
            .with_suggestion(format!(
                "Name the branch like `feature/{key}-1234-description` or put `{key}-1234` in the title",
                key = self.project_key
            ));
            return Ok(CheckResult::from_findings(
                CheckKind::TicketValidation,
                vec![finding],
            ));
        };

        let info = self.tracker.fetch_ticket(&ticket_id).await?;

        if !info.exists {
            let finding = Finding::new(
                Severity::High,
                format!("Ticket {ticket_id} does not exist in the tracker"),
            )
            .with_suggestion("Reference an existing ticket in the branch name or title");
            return Ok(CheckResult::from_findings(
                CheckKind::TicketValidation,
                vec![finding],
            ));
        }

        let mut findings = Vec::new();
        if !info.project_key.eq_ignore_ascii_case(&self.project_key) {
            findings.push(
                Finding::new(
                    Severity::High,
                    format!(
                        "Ticket {ticket_id} belongs to project {}, expected {}",
                        info.project_key, self.project_key
                    ),
                )
                .with_suggestion(format!("Use a {} ticket", self.project_key)),
            );
        }
        if !self.is_allowed_status(&info.status) {
            let target = match self.tracker.ticket_url(&ticket_id) {
                Some(url) => format!("{ticket_id} ({url})"),
                None => ticket_id.clone(),
            };
            findings.push(
                Finding::new(
                    Severity::High,
                    format!(
                        "Ticket {ticket_id} is in status '{}', allowed: {}",
                        info.status.trim(),
                        self.allowed_statuses.join(", ")
                    ),
                )
                .with_suggestion(format!(
                    "Move {target} to an allowed status and re-run the checks"
                )),
            );
        }

        Ok(CheckResult::from_findings(
            CheckKind::TicketValidation,
            findings,
        ))
    }
}

//! Domain model: check results, verdicts, PR context and error taxonomy.

pub mod context;
pub mod error;
pub mod result;
pub mod verdict;

pub use context::{ChangedFile, PrContext};
pub use error::{CheckError, CheckOutcome, CollaboratorError};
pub use result::{CheckKind, CheckResult, CheckStatus, Finding, Severity};
pub use verdict::{BlockingReason, Outcome, Verdict};

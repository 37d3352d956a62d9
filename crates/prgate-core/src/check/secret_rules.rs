//! Built-in secret detection rules.
//!
//! The rule set is static data, versioned independently of the engine. Bump
//! [`SecretRuleSet::BUILTIN_VERSION`] whenever a pattern changes.

use regex::Regex;

use crate::domain::CheckError;

/// One kind of secret, recognized by any of its patterns.
#[derive(Debug, Clone)]
pub struct SecretRule {
    pub id: &'static str,
    pub description: &'static str,
    patterns: Vec<Regex>,
}

impl SecretRule {
    pub fn new(
        id: &'static str,
        description: &'static str,
        patterns: &[&str],
    ) -> Result<Self, regex::Error> {
        let patterns = patterns
            .iter()
            .map(|p| Regex::new(p))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            id,
            description,
            patterns,
        })
    }

    /// Whether any pattern of this rule matches the line.
    pub fn is_match(&self, line: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(line))
    }

    /// Replace every match of this rule in `line`.
    pub fn mask(&self, line: &str, replacement: &str) -> String {
        self.patterns
            .iter()
            .fold(line.to_string(), |acc, p| p.replace_all(&acc, replacement).into_owned())
    }
}

/// Versioned collection of secret rules.
#[derive(Debug, Clone)]
pub struct SecretRuleSet {
    pub version: String,
    rules: Vec<SecretRule>,
}

impl SecretRuleSet {
    pub const BUILTIN_VERSION: &'static str = "2024.1";

    pub fn new(version: impl Into<String>, rules: Vec<SecretRule>) -> Self {
        Self {
            version: version.into(),
            rules,
        }
    }

    pub fn rules(&self) -> &[SecretRule] {
        &self.rules
    }

    /// Rules matching a line, in rule-set order.
    pub fn matching<'a>(&'a self, line: &'a str) -> impl Iterator<Item = &'a SecretRule> + 'a {
        self.rules.iter().filter(move |r| r.is_match(line))
    }

    /// The built-in rules: cloud keys, tokens, private keys and credential
    /// assignments.
    pub fn builtin() -> Result<Self, CheckError> {
        let rules = vec![
            SecretRule::new(
                "aws_access_key",
                "AWS Access Key ID detected",
                &[r"(?i)AKIA[0-9A-Z]{16}"],
            ),
            SecretRule::new(
                "aws_secret_key",
                "AWS Secret Access Key detected",
                &[r#"(?i)aws[_\s-]?secret[_\s-]?access[_\s-]?key\s*[:=]\s*["']?([A-Za-z0-9/+=]{40})["']?"#],
            ),
            SecretRule::new(
                "jwt",
                "JWT token detected",
                &[r"(?i)eyJ[A-Za-z0-9_=-]+\.eyJ[A-Za-z0-9_=-]+\.?[A-Za-z0-9_.+/=-]*"],
            ),
            SecretRule::new(
                "private_key",
                "Private key detected",
                &[r"(?i)-----BEGIN\s+(RSA|DSA|EC|OPENSSH|PGP)\s+PRIVATE\s+KEY-----"],
            ),
            SecretRule::new(
                "password",
                "Hardcoded password detected",
                &[
                    r#"(?i)password\s*[:=]\s*["']([^"']{8,})["']"#,
                    r#"(?i)pwd\s*[:=]\s*["']([^"']{8,})["']"#,
                    r#"(?i)passwd\s*[:=]\s*["']([^"']{8,})["']"#,
                ],
            ),
            SecretRule::new(
                "api_token",
                "API token detected",
                &[
                    r#"(?i)api[_\s-]?key\s*[:=]\s*["']([A-Za-z0-9_-]{20,})["']"#,
                    r#"(?i)api[_\s-]?token\s*[:=]\s*["']([A-Za-z0-9_-]{20,})["']"#,
                    r#"(?i)apikey\s*[:=]\s*["']([A-Za-z0-9_-]{20,})["']"#,
                    r"(?i)apikey\s*[:=]\s*([A-Za-z0-9_-]{5,})",
                    r"(?i)api[_\s-]?key\s*[:=]\s*([A-Za-z0-9_-]{5,})",
                ],
            ),
            SecretRule::new(
                "github_pat",
                "GitHub Personal Access Token detected",
                &[r"(?i)gh[pousr]_[A-Za-z0-9]{36}"],
            ),
            SecretRule::new(
                "slack_token",
                "Slack token detected",
                &[
                    r"(?i)xox[baprs]-[0-9a-zA-Z-]{10,}",
                    r#"(?i)slack[_\s-]?token\s*[:=]\s*["']([A-Za-z0-9_-]{20,})["']"#,
                ],
            ),
            SecretRule::new(
                "google_api_key",
                "Google API key detected",
                &[r"(?i)AIza[0-9A-Za-z_-]{35}"],
            ),
            SecretRule::new(
                "generic_secret",
                "Generic secret detected",
                &[
                    r#"(?i)secret\s*[:=]\s*["']([A-Za-z0-9/+=_-]{20,})["']"#,
                    r#"(?i)private[_\s-]?key\s*[:=]\s*["']([A-Za-z0-9/+=_-]{40,})["']"#,
                    r#"(?i)access[_\s-]?token\s*[:=]\s*["']([A-Za-z0-9/+=_-]{20,})["']"#,
                ],
            ),
        ]
        .into_iter()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| CheckError::Internal(format!("invalid secret rule: {e}")))?;

        Ok(Self::new(Self::BUILTIN_VERSION, rules))
    }
}

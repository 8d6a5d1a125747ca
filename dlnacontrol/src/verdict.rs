use crate::discovery::DiscoveredPeer;
use std::fmt;

/// Résultat global pour un pair. L'ordre permet l'escalade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Outcome {
    Pass,
    Warn,
    Fail,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Outcome::Pass => "PASS",
            Outcome::Warn => "WARN",
            Outcome::Fail => "FAIL",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity, self.message)
    }
}

/// Verdict terminal pour un pair
#[derive(Debug, Clone)]
pub struct Verdict {
    pub peer: DiscoveredPeer,
    pub outcome: Outcome,
    pub diagnostics: Vec<Diagnostic>,
}

impl Verdict {
    pub fn new(peer: DiscoveredPeer) -> Self {
        Self {
            peer,
            outcome: Outcome::Pass,
            diagnostics: Vec::new(),
        }
    }

    fn push(&mut self, severity: Severity, outcome: Outcome, message: impl Into<String>) {
        self.outcome = self.outcome.max(outcome);
        self.diagnostics.push(Diagnostic {
            severity,
            message: message.into(),
        });
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(Severity::Info, Outcome::Pass, message);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.push(Severity::Warning, Outcome::Warn, message);
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.push(Severity::Error, Outcome::Fail, message);
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer() -> DiscoveredPeer {
        DiscoveredPeer {
            address: "10.0.0.2:1900".parse().unwrap(),
            server_header: "PHPDLNA".to_string(),
            advertised_services: Vec::new(),
        }
    }

    #[test]
    fn test_outcome_only_escalates() {
        let mut verdict = Verdict::new(peer());
        verdict.info("description fetched");
        assert_eq!(verdict.outcome, Outcome::Pass);
        verdict.fail("boom");
        verdict.warn("later warning");
        assert_eq!(verdict.outcome, Outcome::Fail);
        assert_eq!(verdict.warnings().count(), 1);
        assert_eq!(verdict.diagnostics[1].to_string(), "[error] boom");
    }
}

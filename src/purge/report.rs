//! Human-readable summaries of a [`PurgeOutcome`].

use std::fmt;

use serde::Serialize;

use super::outcome::{BackendEntry, Classification, PurgeOutcome};

const FLUSH_DELAY_DISCLAIMER: &str = "It could take a few minutes to be visible at the frontend.";

/// Messages for one dispatch call. Pure data, ready for a UI notice, log line or CLI output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PurgeReport {
    pub success_message: Option<String>,
    pub failure_message: Option<String>,
    pub warning_messages: Vec<String>,
}

impl PurgeReport {
    pub fn is_empty(&self) -> bool {
        self.success_message.is_none()
            && self.failure_message.is_none()
            && self.warning_messages.is_empty()
    }
}

impl fmt::Display for PurgeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines = self
            .success_message
            .iter()
            .chain(self.failure_message.iter())
            .chain(self.warning_messages.iter());
        for (index, line) in lines.enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            f.write_str(line)?;
        }
        Ok(())
    }
}

/// Build the success and failure sentences for `outcome`.
pub fn format(outcome: &PurgeOutcome) -> PurgeReport {
    let success_message = sentence(outcome, Classification::Success).map(|(body, delayed)| {
        if delayed {
            format!("Successfully purged {body}. {FLUSH_DELAY_DISCLAIMER}")
        } else {
            format!("Successfully purged {body}.")
        }
    });
    let failure_message = sentence(outcome, Classification::Failure)
        .map(|(body, _)| format!("Failed to purge {body}."));

    PurgeReport {
        success_message,
        failure_message,
        warning_messages: outcome.warnings().iter().map(ToString::to_string).collect(),
    }
}

/// Join items as "A", "A and B" or "A, B and C".
pub fn list_to_sentence<S: AsRef<str>>(items: &[S]) -> String {
    match items {
        [] => String::new(),
        [only] => only.as_ref().to_string(),
        [head @ .., last] => {
            let head: Vec<&str> = head.iter().map(AsRef::as_ref).collect();
            format!("{} and {}", head.join(", "), last.as_ref())
        }
    }
}

fn sentence(outcome: &PurgeOutcome, class: Classification) -> Option<(String, bool)> {
    let entries: Vec<&BackendEntry> = outcome
        .entries(class)
        .filter(|entry| !entry.hosts.is_empty())
        .collect();
    if entries.is_empty() {
        return None;
    }

    let delayed = entries.iter().any(|entry| entry.flush_may_be_delayed);
    let parts: Vec<String> = entries
        .iter()
        .map(|entry| format!("{} cache ({})", entry.backend, list_to_sentence(entry.hosts.as_slice())))
        .collect();
    Some((list_to_sentence(parts.as_slice()), delayed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::purge::backend::BackendId;
    use crate::purge::outcome::PurgeWarning;

    #[test]
    fn list_to_sentence_forms() {
        assert_eq!(list_to_sentence::<&str>(&[]), "");
        assert_eq!(list_to_sentence(&["A"]), "A");
        assert_eq!(list_to_sentence(&["A", "B"]), "A and B");
        assert_eq!(list_to_sentence(&["A", "B", "C"]), "A, B and C");
    }

    #[test]
    fn success_message_lists_hosts_per_backend() {
        let mut outcome = PurgeOutcome::new();
        outcome.record(Classification::Success, BackendId::FastCgi, "hostA", "*");
        outcome.record(Classification::Success, BackendId::FastCgi, "hostB", "*");

        let report = format(&outcome);

        let message = report.success_message.expect("success message");
        assert!(message.contains("fastcgi cache (hostA and hostB)"));
        assert!(message.starts_with("Successfully purged "));
        assert!(message.ends_with(FLUSH_DELAY_DISCLAIMER));
        assert!(report.failure_message.is_none());
    }

    #[test]
    fn three_hosts_and_two_backends() {
        let mut outcome = PurgeOutcome::new();
        for host in ["A", "B", "C"] {
            outcome.record(Classification::Success, BackendId::PageSpeed, host, "blog");
        }
        outcome.record(Classification::Success, BackendId::FastCgi, "A", "blog");

        let message = format(&outcome).success_message.expect("success message");

        assert_eq!(
            message,
            format!(
                "Successfully purged fastcgi cache (A) and pagespeed cache (A, B and C). {FLUSH_DELAY_DISCLAIMER}"
            )
        );
    }

    #[test]
    fn immediate_flushes_omit_disclaimer() {
        let mut outcome = PurgeOutcome::new();
        outcome.record_with_delay(Classification::Success, BackendId::FastCgi, "A", "*", false);
        outcome.record_with_delay(Classification::Success, BackendId::PageSpeed, "B", "*", false);

        let message = format(&outcome).success_message.expect("success message");

        assert_eq!(
            message,
            "Successfully purged fastcgi cache (A) and pagespeed cache (B)."
        );
        assert!(!message.contains(FLUSH_DELAY_DISCLAIMER));
    }

    #[test]
    fn one_delayed_entry_adds_disclaimer() {
        let mut outcome = PurgeOutcome::new();
        outcome.record_with_delay(Classification::Success, BackendId::FastCgi, "A", "*", false);
        outcome.record_with_delay(Classification::Success, BackendId::PageSpeed, "B", "*", true);

        let message = format(&outcome).success_message.expect("success message");

        assert_eq!(
            message,
            format!(
                "Successfully purged fastcgi cache (A) and pagespeed cache (B). {FLUSH_DELAY_DISCLAIMER}"
            )
        );
    }

    #[test]
    fn failure_message_has_no_disclaimer() {
        let mut outcome = PurgeOutcome::new();
        outcome.record(Classification::Failure, BackendId::FastCgi, "host2", "blog");

        let report = format(&outcome);

        assert_eq!(
            report.failure_message.as_deref(),
            Some("Failed to purge fastcgi cache (host2).")
        );
        assert!(report.success_message.is_none());
    }

    #[test]
    fn warnings_are_rendered() {
        let outcome = PurgeOutcome::with_warning(PurgeWarning::NothingToPurge);

        let report = format(&outcome);

        assert!(report.success_message.is_none());
        assert_eq!(report.warning_messages.len(), 1);
        assert!(report.warning_messages[0].starts_with("Nothing is purged."));
        assert_eq!(report.to_string(), report.warning_messages[0]);
    }

    #[test]
    fn empty_outcome_yields_empty_report() {
        assert!(format(&PurgeOutcome::new()).is_empty());
    }
}

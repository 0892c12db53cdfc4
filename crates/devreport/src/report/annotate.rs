//! Positional free-text annotations applied to generated tasks.

use super::types::Task;

/// Per-task notes supplied by the user, matched to tasks by position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Annotations {
    pub challenges: Vec<String>,
    pub support_required: Vec<String>,
    pub support_from: Vec<String>,
    pub follow_up: Vec<String>,
}

impl Annotations {
    /// Build from comma-separated inputs; see [`parse_comma_list`].
    pub fn from_lists(
        challenges: &str,
        support_required: &str,
        support_from: &str,
        follow_up: &str,
    ) -> Self {
        Self {
            challenges: parse_comma_list(challenges),
            support_required: parse_comma_list(support_required),
            support_from: parse_comma_list(support_from),
            follow_up: parse_comma_list(follow_up),
        }
    }
}

/// Split `input` on commas and trim each entry.
///
/// An entry containing `|` becomes a newline-separated bullet list, one
/// `• item` per non-empty segment.
pub fn parse_comma_list(input: &str) -> Vec<String> {
    if input.is_empty() {
        return Vec::new();
    }

    input
        .split(',')
        .map(str::trim)
        .map(|part| {
            if part.contains('|') {
                part.split('|')
                    .map(str::trim)
                    .filter(|b| !b.is_empty())
                    .map(|b| format!("• {b}"))
                    .collect::<Vec<_>>()
                    .join("\n")
            } else {
                part.to_string()
            }
        })
        .collect()
}

/// Copy the i-th entry of each annotation list onto the i-th task.
///
/// Tasks beyond the end of a list keep their existing value.
pub fn annotate(tasks: &mut [Task], annotations: &Annotations) {
    for (i, task) in tasks.iter_mut().enumerate() {
        if let Some(v) = annotations.challenges.get(i) {
            task.challenges = v.clone();
        }
        if let Some(v) = annotations.support_required.get(i) {
            task.support_required = v.clone();
        }
        if let Some(v) = annotations.support_from.get(i) {
            task.support_from = v.clone();
        }
        if let Some(v) = annotations.follow_up.get(i) {
            task.follow_up = v.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn parse_comma_list_trims_and_expands_bullets() {
        assert!(parse_comma_list("").is_empty());
        assert_eq!(parse_comma_list(" a , b"), vec!["a", "b"]);
        assert_eq!(
            parse_comma_list("slow CI | flaky test |, none"),
            vec!["• slow CI\n• flaky test", "none"]
        );
    }

    #[test]
    fn annotate_applies_by_position() {
        let at = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let mut tasks = vec![Task::new("1", "one", at), Task::new("2", "two", at)];
        tasks[1].follow_up = "keep".to_string();

        let annotations = Annotations::from_lists("blocked", "", "", "ship it");
        annotate(&mut tasks, &annotations);

        assert_eq!(tasks[0].challenges, "blocked");
        assert_eq!(tasks[0].follow_up, "ship it");
        assert_eq!(tasks[1].challenges, "");
        assert_eq!(tasks[1].follow_up, "keep");
    }
}

//! Fixed-width summary tables.
//!
//! One row per user in input order, right-aligned numeric columns, and a
//! totals row summing only the successful records. Failed rows show an
//! ERROR placeholder instead of numbers; an all-error input still gets a
//! totals row of zeros.

use crate::models::{Metric, MetricCounts, MetricRecord};

const NARROW_WIDTH: usize = 50;
const WIDE_WIDTH: usize = 70;

/// Renders the summary table for one metric's records.
///
/// `request_label` is the platform's name for pull/merge requests
/// ("PRs" or "MRs"), used in the comment table header.
pub fn render_summary(metric: Metric, records: &[MetricRecord], request_label: &str) -> String {
    match metric {
        Metric::Issues => issue_table(records),
        Metric::MergeRequests => merge_request_table(records),
        Metric::Commits => commit_table(records),
        Metric::Comments => comment_table(records, request_label),
    }
}

fn header(title: &str, width: usize) -> String {
    format!("\n{0}\n{1}\n{0}\n", "=".repeat(width), title)
}

fn issue_table(records: &[MetricRecord]) -> String {
    let mut out = header("ISSUE SUMMARY", NARROW_WIDTH);

    for record in records {
        match &record.counts {
            MetricCounts::Issues { issue_count } if record.is_success() => {
                out.push_str(&format!(
                    "{:<20} {:>6} issues\n",
                    record.username, issue_count
                ));
            }
            _ => out.push_str(&format!("{:<20} {:>6}\n", record.username, "ERROR")),
        }
    }

    let total: u64 = records
        .iter()
        .filter(|r| r.is_success())
        .filter_map(|r| match r.counts {
            MetricCounts::Issues { issue_count } => Some(issue_count),
            _ => None,
        })
        .sum();
    out.push_str(&format!("\n{:<20} {:>6} issues\n", "Total", total));
    out
}

fn merge_rate(merged: u64, opened: u64) -> String {
    if opened > 0 {
        format!("{:.1}%", merged as f64 / opened as f64 * 100.0)
    } else {
        "N/A".to_string()
    }
}

fn merge_request_table(records: &[MetricRecord]) -> String {
    let mut out = header("MERGE REQUEST SUMMARY", WIDE_WIDTH);
    out.push_str(&format!(
        "{:<20} {:>10} {:>10} {:>15}\n",
        "Username", "Opened", "Merged", "Merge Rate"
    ));
    out.push_str(&format!("{}\n", "-".repeat(WIDE_WIDTH)));

    for record in records {
        match &record.counts {
            MetricCounts::MergeRequests { opened, merged } if record.is_success() => {
                out.push_str(&format!(
                    "{:<20} {:>10} {:>10} {:>15}\n",
                    record.username,
                    opened,
                    merged,
                    merge_rate(*merged, *opened)
                ));
            }
            _ => out.push_str(&format!(
                "{:<20} {:>10} {:>10} {:>15}\n",
                record.username, "ERROR", "ERROR", "ERROR"
            )),
        }
    }

    let (total_opened, total_merged) = records
        .iter()
        .filter(|r| r.is_success())
        .filter_map(|r| match r.counts {
            MetricCounts::MergeRequests { opened, merged } => Some((opened, merged)),
            _ => None,
        })
        .fold((0, 0), |(o, m), (opened, merged)| (o + opened, m + merged));

    out.push_str(&format!("{}\n", "-".repeat(WIDE_WIDTH)));
    out.push_str(&format!(
        "{:<20} {:>10} {:>10} {:>15}\n",
        "Total",
        total_opened,
        total_merged,
        merge_rate(total_merged, total_opened)
    ));
    out
}

fn commit_table(records: &[MetricRecord]) -> String {
    // GitHub reports authored/committed; GitLab a single events-derived
    // total. Pick the table that matches the records at hand.
    let detailed = records
        .iter()
        .any(|r| matches!(r.counts, MetricCounts::Commits { .. }));
    if detailed {
        detailed_commit_table(records)
    } else {
        simple_commit_table(records)
    }
}

fn detailed_commit_table(records: &[MetricRecord]) -> String {
    let mut out = header("COMMIT SUMMARY", WIDE_WIDTH);
    out.push_str(&format!(
        "{:<20} {:>12} {:>12}\n",
        "Username", "Authored", "Committed"
    ));
    out.push_str(&format!("{}\n", "-".repeat(WIDE_WIDTH)));

    for record in records {
        match &record.counts {
            MetricCounts::Commits {
                authored,
                committed,
            } if record.is_success() => {
                out.push_str(&format!(
                    "{:<20} {:>12} {:>12}\n",
                    record.username, authored, committed
                ));
            }
            _ => out.push_str(&format!(
                "{:<20} {:>12} {:>12}\n",
                record.username, "ERROR", "ERROR"
            )),
        }
    }

    let (total_authored, total_committed) = records
        .iter()
        .filter(|r| r.is_success())
        .filter_map(|r| match r.counts {
            MetricCounts::Commits {
                authored,
                committed,
            } => Some((authored, committed)),
            _ => None,
        })
        .fold((0, 0), |(a, c), (authored, committed)| {
            (a + authored, c + committed)
        });

    out.push_str(&format!("{}\n", "-".repeat(WIDE_WIDTH)));
    out.push_str(&format!(
        "{:<20} {:>12} {:>12}\n",
        "Total", total_authored, total_committed
    ));
    out
}

fn simple_commit_table(records: &[MetricRecord]) -> String {
    let mut out = header("COMMIT SUMMARY", NARROW_WIDTH);

    for record in records {
        match &record.counts {
            MetricCounts::CommitTotal { commit_count } if record.is_success() => {
                out.push_str(&format!(
                    "{:<20} {:>6} commits\n",
                    record.username, commit_count
                ));
            }
            _ => out.push_str(&format!("{:<20} {:>6}\n", record.username, "ERROR")),
        }
    }

    let total: u64 = records
        .iter()
        .filter(|r| r.is_success())
        .filter_map(|r| match r.counts {
            MetricCounts::CommitTotal { commit_count } => Some(commit_count),
            _ => None,
        })
        .sum();
    out.push_str(&format!("\n{:<20} {:>6} commits\n", "Total", total));
    out
}

fn comment_table(records: &[MetricRecord], request_label: &str) -> String {
    let mut out = header("COMMENT SUMMARY", WIDE_WIDTH);
    out.push_str(&format!(
        "{:<20} {:>12} {:>12} {:>12}\n",
        "Username", "Issues", request_label, "Total"
    ));
    out.push_str(&format!("{}\n", "-".repeat(WIDE_WIDTH)));

    for record in records {
        match &record.counts {
            MetricCounts::Comments {
                issues_commented,
                requests_commented,
            } if record.is_success() => {
                out.push_str(&format!(
                    "{:<20} {:>12} {:>12} {:>12}\n",
                    record.username,
                    issues_commented,
                    requests_commented,
                    issues_commented + requests_commented
                ));
            }
            _ => out.push_str(&format!(
                "{:<20} {:>12} {:>12} {:>12}\n",
                record.username, "ERROR", "ERROR", "ERROR"
            )),
        }
    }

    let (total_issues, total_requests) = records
        .iter()
        .filter(|r| r.is_success())
        .filter_map(|r| match r.counts {
            MetricCounts::Comments {
                issues_commented,
                requests_commented,
            } => Some((issues_commented, requests_commented)),
            _ => None,
        })
        .fold((0, 0), |(i, q), (issues, requests)| {
            (i + issues, q + requests)
        });

    out.push_str(&format!("{}\n", "-".repeat(WIDE_WIDTH)));
    out.push_str(&format!(
        "{:<20} {:>12} {:>12} {:>12}\n",
        "Total",
        total_issues,
        total_requests,
        total_issues + total_requests
    ));
    out
}

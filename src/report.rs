use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::models::{Complaint, ComplaintStatus, Priority};
use crate::sla;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSummary {
    pub status: ComplaintStatus,
    pub count: usize,
}

pub fn summarize_by_status<'a>(
    complaints: impl IntoIterator<Item = &'a Complaint>,
) -> Vec<StatusSummary> {
    let mut counts: std::collections::HashMap<ComplaintStatus, usize> =
        std::collections::HashMap::new();

    for complaint in complaints {
        *counts.entry(complaint.status).or_insert(0) += 1;
    }

    let mut summaries: Vec<StatusSummary> = ComplaintStatus::ALL
        .into_iter()
        .filter_map(|status| {
            counts
                .get(&status)
                .map(|count| StatusSummary { status, count: *count })
        })
        .collect();

    // Stable sort keeps lifecycle order among equal counts.
    summaries.sort_by(|a, b| b.count.cmp(&a.count));
    summaries
}

pub fn render_card(complaint: &Complaint, now: DateTime<Utc>) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "[{}]", complaint.id);
    let _ = writeln!(output, "Status: {}", complaint.status);
    let _ = writeln!(output, "Priority: {}", complaint.priority);
    let _ = writeln!(output, "Admin Remark: {}", complaint.admin_remark);
    if complaint.status.is_open() {
        let _ = writeln!(
            output,
            "SLA: {} ({})",
            complaint.sla_deadline.format("%Y-%m-%d %H:%M"),
            sla::describe_remaining(complaint.sla_deadline, now)
        );
    }
    output
}

pub fn render_table<'a>(complaints: impl IntoIterator<Item = &'a Complaint>) -> String {
    let mut output = String::new();
    let _ = writeln!(
        output,
        "{:<8} {:<18} {:<14} {:<8} {:<10} {:<16} {:<16} {:<20} {}",
        "ID", "Student", "Category", "Priority", "Status", "Submitted", "SLA Deadline",
        "Attachment", "Remark"
    );

    for complaint in complaints {
        let _ = writeln!(
            output,
            "{:<8} {:<18} {:<14} {:<8} {:<10} {:<16} {:<16} {:<20} {}",
            complaint.id,
            complaint.student_name,
            complaint.category.to_string(),
            complaint.priority.to_string(),
            complaint.status.to_string(),
            complaint.submitted_at.format("%Y-%m-%d %H:%M").to_string(),
            complaint.sla_deadline.format("%Y-%m-%d %H:%M").to_string(),
            complaint.attachment_name.as_deref().unwrap_or("-"),
            complaint.admin_remark
        );
    }

    output
}

pub fn build_report(complaints: &[Complaint], now: DateTime<Utc>) -> String {
    let summaries = summarize_by_status(complaints);
    let mut output = String::new();

    let _ = writeln!(output, "# CampusCure Grievance Report");
    let _ = writeln!(
        output,
        "Generated {} covering {} complaints",
        now.format("%Y-%m-%d %H:%M UTC"),
        complaints.len()
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Status Mix");

    if summaries.is_empty() {
        let _ = writeln!(output, "No complaints recorded this session.");
    } else {
        for summary in summaries.iter() {
            let _ = writeln!(output, "- {}: {}", summary.status, summary.count);
        }
    }

    let overdue: Vec<&Complaint> = complaints
        .iter()
        .filter(|complaint| sla::is_overdue(complaint, now))
        .collect();
    let _ = writeln!(output);
    let _ = writeln!(output, "## Past SLA");

    if overdue.is_empty() {
        let _ = writeln!(output, "No open complaints past their deadline.");
    } else {
        for complaint in overdue {
            let _ = writeln!(
                output,
                "- {} ({}, {}): {}",
                complaint.id,
                complaint.student_name,
                complaint.status,
                sla::describe_remaining(complaint.sla_deadline, now)
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## High Priority");
    let high: Vec<&Complaint> = complaints
        .iter()
        .filter(|complaint| complaint.priority == Priority::High)
        .collect();

    if high.is_empty() {
        let _ = writeln!(output, "No high-priority complaints.");
    } else {
        for complaint in high {
            let _ = writeln!(
                output,
                "- {} [{}] {} ({}): {}",
                complaint.id,
                complaint.category,
                complaint.student_name,
                complaint.status,
                complaint.description
            );
        }
    }

    let mut recent: Vec<&Complaint> = complaints.iter().collect();
    recent.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Submissions");

    if recent.is_empty() {
        let _ = writeln!(output, "No complaints recorded this session.");
    } else {
        for complaint in recent.iter().take(5) {
            let _ = writeln!(
                output,
                "- {} on {}: {}",
                complaint.id,
                complaint.submitted_at.format("%Y-%m-%d"),
                complaint.description
            );
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::TransitionPolicy;
    use crate::models::Category;
    use crate::registry::Registry;
    use chrono::Duration;

    fn seeded(now: DateTime<Utc>) -> Registry {
        let mut registry = Registry::new(TransitionPolicy::Permissive);
        registry
            .create_at("Ravi", Category::Hostel, "urgent: no water", None, now - Duration::days(4))
            .unwrap();
        registry
            .create_at("Meera", Category::Academic, "marks missing", Some("marksheet.png"), now)
            .unwrap();
        registry
            .create_at("Ravi", Category::Transport, "bus late", None, now - Duration::hours(1))
            .unwrap();
        registry.update("CMP003", ComplaintStatus::Resolved, "Route fixed").unwrap();
        registry
    }

    #[test]
    fn status_mix_sorted_by_count() {
        let registry = seeded(Utc::now());
        let summaries = summarize_by_status(registry.all());
        assert_eq!(
            summaries,
            vec![
                StatusSummary { status: ComplaintStatus::Pending, count: 2 },
                StatusSummary { status: ComplaintStatus::Resolved, count: 1 },
            ]
        );
    }

    #[test]
    fn card_shows_sla_only_while_open() {
        let now = Utc::now();
        let registry = seeded(now);

        let open = render_card(registry.find_by_id("CMP002").unwrap(), now);
        assert!(open.contains("Status: Pending"));
        assert!(open.contains("Admin Remark: Not Reviewed Yet"));
        assert!(open.contains("left)"));

        let closed = render_card(registry.find_by_id("CMP003").unwrap(), now);
        assert!(closed.contains("Status: Resolved"));
        assert!(!closed.contains("SLA:"));
    }

    #[test]
    fn table_lists_rows_in_submission_order() {
        let registry = seeded(Utc::now());
        let table = render_table(registry.all());
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[1].starts_with("CMP001"));
        assert!(lines[2].contains("marksheet.png"));
        assert!(lines[3].starts_with("CMP003"));
    }

    #[test]
    fn report_flags_overdue_and_high_priority() {
        let now = Utc::now();
        let registry = seeded(now);
        let report = build_report(registry.all(), now);

        assert!(report.contains("## Past SLA\n- CMP001 (Ravi, Pending): overdue by 1d 0h"));
        assert!(report.contains("- CMP001 [Hostel] Ravi (Pending): urgent: no water"));
        assert!(report.contains("- Resolved: 1"));
    }

    #[test]
    fn empty_report_has_placeholders() {
        let report = build_report(&[], Utc::now());
        assert!(report.contains("No complaints recorded this session."));
        assert!(report.contains("No open complaints past their deadline."));
        assert!(report.contains("No high-priority complaints."));
    }
}

use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::models::Incident;

pub fn badge_category(severity: &str) -> &'static str {
    match severity {
        "Low" => "info",
        "Medium" => "warning",
        "High" => "danger",
        _ => "neutral",
    }
}

pub fn format_reported(reported_at: DateTime<Utc>) -> String {
    reported_at.format("%b %-d, %Y").to_string()
}

pub fn toggle_label(expanded: bool) -> &'static str {
    if expanded {
        "Hide Details"
    } else {
        "View Details"
    }
}

/// Renders a single incident. The description is only shown when expanded.
pub fn render_card(incident: &Incident, expanded: bool) -> String {
    let severity = incident.severity().label();
    let mut output = String::new();

    let _ = writeln!(output, "#{} {}", incident.id(), incident.title());
    let _ = writeln!(
        output,
        "   [{} Severity | {}]  Reported: {}  ({})",
        severity,
        badge_category(severity),
        format_reported(incident.reported_at()),
        toggle_label(expanded)
    );

    if expanded {
        let _ = writeln!(output, "   Description");
        for line in incident.description().lines() {
            let _ = writeln!(output, "     {line}");
        }
    }

    output
}

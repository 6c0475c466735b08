use std::fmt::Write;

use crate::card;
use crate::dashboard::{Dashboard, FormState};
use crate::models::{Incident, SeverityFilter};
use crate::validation::Field;

pub fn count_label(count: usize) -> String {
    let noun = if count == 1 { "incident" } else { "incidents" };
    format!("{count} {noun} found")
}

fn render_form(output: &mut String, dashboard: &Dashboard) {
    let form = dashboard.form();
    let draft = form.draft();
    let errors = form.errors();

    let _ = writeln!(output, "## Report New Incident");
    if dashboard.form_state() == FormState::Invalid {
        let _ = writeln!(output, "Please fix the highlighted fields and submit again.");
    }
    let fields = [
        (Field::Title, "Title", draft.title.as_str()),
        (Field::Description, "Description", draft.description.as_str()),
        (Field::Severity, "Severity Level", draft.severity.as_str()),
    ];
    for (field, label, value) in fields {
        let _ = writeln!(output, "{label} *: {value}");
        if let Some(message) = errors.get(field) {
            let _ = writeln!(output, "  ! {message}");
        }
    }
    let _ = writeln!(output);
}

/// Renders the full dashboard view from the current state.
pub fn render(dashboard: &Dashboard) -> String {
    let visible = dashboard.visible_incidents();
    let filter = dashboard.severity_filter();
    let mut output = String::new();

    let _ = writeln!(output, "# AI Safety Incident Dashboard");
    let _ = writeln!(
        output,
        "Filter: {}  Sort: {}  Tracked: {}  [{}]",
        match filter {
            SeverityFilter::All => "All Severities".to_string(),
            SeverityFilter::Only(sev) => sev.to_string(),
        },
        dashboard.sort_order().label(),
        dashboard.records().len(),
        match dashboard.form_state() {
            FormState::Hidden => "Report New Incident",
            FormState::Editing | FormState::Invalid => "Hide Report Form",
        }
    );
    let _ = writeln!(output);

    if dashboard.is_form_visible() {
        render_form(&mut output, dashboard);
    }

    match filter {
        SeverityFilter::All => {
            let _ = write!(output, "## Incidents");
        }
        SeverityFilter::Only(sev) => {
            let _ = write!(output, "## Incidents ({sev} Severity)");
        }
    }
    let _ = writeln!(output, "  {}", count_label(visible.len()));

    if visible.is_empty() {
        let _ = writeln!(output, "No incidents found matching your criteria.");
    } else {
        for incident in visible {
            let _ = write!(
                output,
                "{}",
                card::render_card(incident, dashboard.is_expanded(incident.id()))
            );
        }
    }

    output
}

pub fn render_json(dashboard: &Dashboard) -> serde_json::Result<String> {
    let visible: Vec<&Incident> = dashboard.visible_incidents();
    serde_json::to_string_pretty(&visible)
}

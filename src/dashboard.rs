use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::form::IncidentForm;
use crate::models::{Incident, IncidentId, NewIncident, SeverityFilter, SortOrder};
use crate::validation::FieldErrors;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormState {
    Hidden,
    Editing,
    Invalid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Created(IncidentId),
    Rejected(FieldErrors),
}

#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    #[error("the report form is hidden; open it before submitting")]
    FormHidden,
    #[error("no incident ids left after {0}")]
    IdsExhausted(IncidentId),
}

/// Owns the incident collection and every piece of view state derived from it.
#[derive(Debug, Default)]
pub struct Dashboard {
    records: Vec<Incident>,
    severity_filter: SeverityFilter,
    sort_order: SortOrder,
    expanded_ids: HashSet<IncidentId>,
    form_visible: bool,
    form: IncidentForm,
}

impl Dashboard {
    pub fn new(records: Vec<Incident>) -> Self {
        Self {
            records,
            ..Self::default()
        }
    }

    pub fn records(&self) -> &[Incident] {
        &self.records
    }

    pub fn get(&self, id: IncidentId) -> Option<&Incident> {
        self.records.iter().find(|incident| incident.id() == id)
    }

    pub fn severity_filter(&self) -> SeverityFilter {
        self.severity_filter
    }

    pub fn sort_order(&self) -> SortOrder {
        self.sort_order
    }

    pub fn form(&self) -> &IncidentForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut IncidentForm {
        &mut self.form
    }

    pub fn is_form_visible(&self) -> bool {
        self.form_visible
    }

    pub fn form_state(&self) -> FormState {
        if !self.form_visible {
            FormState::Hidden
        } else if self.form.has_errors() {
            FormState::Invalid
        } else {
            FormState::Editing
        }
    }

    pub fn is_expanded(&self, id: IncidentId) -> bool {
        self.expanded_ids.contains(&id)
    }

    /// One past the largest id in use, or 1 for an empty dashboard.
    pub fn next_id(&self) -> Result<IncidentId, DashboardError> {
        let max = self
            .records
            .iter()
            .map(|incident| incident.id().0)
            .max()
            .unwrap_or(0);
        max.checked_add(1)
            .map(IncidentId)
            .ok_or(DashboardError::IdsExhausted(IncidentId(max)))
    }

    pub fn add_incident(&mut self, new: NewIncident) -> Result<IncidentId, DashboardError> {
        self.add_incident_at(new, Utc::now())
    }

    pub fn add_incident_at(
        &mut self,
        new: NewIncident,
        now: DateTime<Utc>,
    ) -> Result<IncidentId, DashboardError> {
        let id = self.next_id()?;
        let severity = new.severity;
        self.records.push(Incident::new(
            id,
            new.title,
            new.description,
            severity,
            now,
        ));
        self.form_visible = false;
        info!(%id, %severity, "incident reported");
        Ok(id)
    }

    /// Filtered then sorted view of the records. Recomputed on every call.
    pub fn visible_incidents(&self) -> Vec<&Incident> {
        let mut visible: Vec<&Incident> = self
            .records
            .iter()
            .filter(|incident| self.severity_filter.matches(incident.severity()))
            .collect();

        // sort_by is stable: equal timestamps keep insertion order
        match self.sort_order {
            SortOrder::Newest => visible.sort_by(|a, b| b.reported_at().cmp(&a.reported_at())),
            SortOrder::Oldest => visible.sort_by(|a, b| a.reported_at().cmp(&b.reported_at())),
        }
        visible
    }

    /// Flips the expanded flag for `id` and returns the new value.
    pub fn toggle_details(&mut self, id: IncidentId) -> bool {
        let expanded = if self.expanded_ids.remove(&id) {
            false
        } else {
            self.expanded_ids.insert(id);
            true
        };
        debug!(%id, expanded, "toggled details");
        expanded
    }

    pub fn set_severity_filter(&mut self, filter: SeverityFilter) {
        debug!(%filter, "severity filter changed");
        self.severity_filter = filter;
    }

    pub fn set_sort_order(&mut self, order: SortOrder) {
        debug!(order = order.label(), "sort order changed");
        self.sort_order = order;
    }

    pub fn toggle_form_visibility(&mut self) -> bool {
        self.form_visible = !self.form_visible;
        self.form_visible
    }

    pub fn submit_form(&mut self) -> Result<SubmitOutcome, DashboardError> {
        if !self.form_visible {
            return Err(DashboardError::FormHidden);
        }
        // fail before the form hands over and clears its draft
        self.next_id()?;

        match self.form.submit() {
            Some(new) => Ok(SubmitOutcome::Created(self.add_incident(new)?)),
            None => {
                warn!(errors = self.form.errors().len(), "incident report incomplete");
                Ok(SubmitOutcome::Rejected(self.form.errors().clone()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Severity;
    use crate::seed;
    use crate::validation::Field;
    use chrono::TimeZone;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, day, 12, 0, 0).unwrap()
    }

    fn incident(id: u64, severity: Severity, day: u32) -> Incident {
        Incident::new(IncidentId(id), format!("incident {id}"), "details", severity, at(day))
    }

    fn new_incident(title: &str, severity: Severity) -> NewIncident {
        NewIncident {
            title: title.to_string(),
            description: "details".to_string(),
            severity,
        }
    }

    fn ids(list: &[&Incident]) -> Vec<u64> {
        list.iter().map(|incident| incident.id().0).collect()
    }

    #[test]
    fn ids_continue_from_the_maximum() {
        let mut dashboard = Dashboard::new(vec![
            incident(4, Severity::Low, 1),
            incident(9, Severity::Low, 2),
        ]);
        let id = dashboard
            .add_incident_at(new_incident("n", Severity::High), at(3))
            .unwrap();
        assert_eq!(id, IncidentId(10));
    }

    #[test]
    fn first_id_in_an_empty_dashboard_is_one() {
        let mut dashboard = Dashboard::default();
        let id = dashboard.add_incident(new_incident("n", Severity::High)).unwrap();
        assert_eq!(id, IncidentId(1));
        assert_eq!(dashboard.records().len(), 1);
    }

    #[test]
    fn filter_keeps_matching_records_in_order() {
        let mut dashboard = Dashboard::new(vec![
            incident(1, Severity::High, 1),
            incident(2, Severity::Low, 2),
            incident(3, Severity::High, 3),
        ]);
        dashboard.set_severity_filter(SeverityFilter::Only(Severity::High));
        dashboard.set_sort_order(SortOrder::Oldest);
        assert_eq!(ids(&dashboard.visible_incidents()), vec![1, 3]);
        assert_eq!(dashboard.records().len(), 3);
    }

    #[test]
    fn sort_orders_by_timestamp() {
        let mut dashboard = Dashboard::new(vec![
            incident(1, Severity::Low, 2),
            incident(2, Severity::Low, 3),
            incident(3, Severity::Low, 1),
        ]);
        assert_eq!(ids(&dashboard.visible_incidents()), vec![2, 1, 3]);
        dashboard.set_sort_order(SortOrder::Oldest);
        assert_eq!(ids(&dashboard.visible_incidents()), vec![3, 1, 2]);
    }

    #[test]
    fn equal_timestamps_keep_insertion_order() {
        let mut dashboard = Dashboard::new(vec![
            incident(1, Severity::Low, 5),
            incident(2, Severity::Medium, 5),
            incident(3, Severity::High, 5),
        ]);
        assert_eq!(ids(&dashboard.visible_incidents()), vec![1, 2, 3]);
        dashboard.set_sort_order(SortOrder::Oldest);
        assert_eq!(ids(&dashboard.visible_incidents()), vec![1, 2, 3]);
    }

    #[test]
    fn toggling_twice_restores_state() {
        let mut dashboard = Dashboard::new(seed::seed_incidents().unwrap());
        assert!(dashboard.toggle_details(IncidentId(2)));
        assert!(dashboard.is_expanded(IncidentId(2)));
        assert!(!dashboard.toggle_details(IncidentId(2)));
        assert!(!dashboard.is_expanded(IncidentId(2)));
    }

    #[test]
    fn expansion_survives_filter_and_sort_changes() {
        let mut dashboard = Dashboard::new(seed::seed_incidents().unwrap());
        dashboard.toggle_details(IncidentId(1));
        dashboard.set_severity_filter(SeverityFilter::Only(Severity::High));
        dashboard.set_sort_order(SortOrder::Oldest);
        dashboard.set_severity_filter(SeverityFilter::All);
        assert!(dashboard.is_expanded(IncidentId(1)));
    }

    #[test]
    fn medium_filter_on_seed_returns_two_newest_first() {
        let mut dashboard = Dashboard::new(seed::seed_incidents().unwrap());
        dashboard.set_severity_filter(SeverityFilter::Only(Severity::Medium));
        let visible = dashboard.visible_incidents();
        assert_eq!(ids(&visible), vec![4, 1]);
        assert!(visible
            .iter()
            .all(|incident| incident.severity() == Severity::Medium));
    }

    #[test]
    fn valid_submission_appends_and_hides_form() {
        let mut dashboard = Dashboard::new(seed::seed_incidents().unwrap());
        assert_eq!(dashboard.form_state(), FormState::Hidden);
        dashboard.toggle_form_visibility();
        assert_eq!(dashboard.form_state(), FormState::Editing);

        let form = dashboard.form_mut();
        form.set_title("X");
        form.set_description("Y");
        form.set_severity("Low");

        let before = Utc::now();
        let outcome = dashboard.submit_form().unwrap();
        let after = Utc::now();
        assert_eq!(outcome, SubmitOutcome::Created(IncidentId(6)));

        let added = dashboard.records().last().unwrap();
        assert_eq!(added.id(), IncidentId(6));
        assert_eq!(added.title(), "X");
        assert_eq!(added.severity(), Severity::Low);
        assert!(added.reported_at() >= before && added.reported_at() <= after);
        assert_eq!(dashboard.form_state(), FormState::Hidden);
        assert_eq!(dashboard.form().draft().title, "");
    }

    #[test]
    fn invalid_submission_keeps_form_open() {
        let mut dashboard = Dashboard::new(seed::seed_incidents().unwrap());
        dashboard.toggle_form_visibility();
        dashboard.form_mut().set_description("Y");
        dashboard.form_mut().set_severity("Low");

        let outcome = dashboard.submit_form().unwrap();
        let SubmitOutcome::Rejected(errors) = outcome else {
            panic!("expected rejection, got {outcome:?}");
        };
        assert_eq!(errors.get(Field::Title), Some("Title is required"));
        assert_eq!(dashboard.records().len(), 5);
        assert_eq!(dashboard.form_state(), FormState::Invalid);
        assert_eq!(dashboard.form().draft().description, "Y");
        assert_eq!(dashboard.form().draft().severity, "Low");

        // repeated invalid submits stay invalid
        dashboard.submit_form().unwrap();
        assert_eq!(dashboard.form_state(), FormState::Invalid);
    }

    #[test]
    fn hiding_the_form_keeps_the_draft() {
        let mut dashboard = Dashboard::default();
        dashboard.toggle_form_visibility();
        dashboard.form_mut().set_title("half written");
        dashboard.toggle_form_visibility();
        assert_eq!(dashboard.form_state(), FormState::Hidden);
        dashboard.toggle_form_visibility();
        assert_eq!(dashboard.form().draft().title, "half written");
    }

    #[test]
    fn reopening_an_invalid_form_shows_its_errors_again() {
        let mut dashboard = Dashboard::default();
        dashboard.toggle_form_visibility();
        dashboard.form_mut().set_description("Y");
        dashboard.submit_form().unwrap();
        assert_eq!(dashboard.form_state(), FormState::Invalid);

        dashboard.toggle_form_visibility();
        assert_eq!(dashboard.form_state(), FormState::Hidden);
        dashboard.toggle_form_visibility();
        assert_eq!(dashboard.form_state(), FormState::Invalid);
        assert_eq!(
            dashboard.form().errors().get(Field::Title),
            Some("Title is required")
        );
        assert_eq!(dashboard.form().draft().description, "Y");
    }

    #[test]
    fn exhausted_ids_refuse_submission_and_keep_the_draft() {
        let mut dashboard = Dashboard::new(vec![incident(u64::MAX, Severity::High, 1)]);
        assert!(matches!(
            dashboard.add_incident(new_incident("n", Severity::Low)),
            Err(DashboardError::IdsExhausted(_))
        ));

        dashboard.toggle_form_visibility();
        let form = dashboard.form_mut();
        form.set_title("X");
        form.set_description("Y");
        form.set_severity("Low");

        assert!(matches!(
            dashboard.submit_form(),
            Err(DashboardError::IdsExhausted(IncidentId(u64::MAX)))
        ));
        assert_eq!(dashboard.records().len(), 1);
        assert_eq!(dashboard.form_state(), FormState::Editing);
        assert_eq!(dashboard.form().draft().title, "X");
        assert_eq!(dashboard.form().draft().severity, "Low");
    }

    #[test]
    fn submitting_a_hidden_form_is_refused() {
        let mut dashboard = Dashboard::default();
        assert!(matches!(
            dashboard.submit_form(),
            Err(DashboardError::FormHidden)
        ));
    }
}

use tracing::debug;

use crate::models::{IncidentDraft, NewIncident};
use crate::validation::{self, FieldErrors};

/// The "report new incident" form. Owns the draft and the last validation result.
///
/// Editing a field leaves any shown error in place; errors are only
/// recomputed by the next `submit`.
#[derive(Debug, Default)]
pub struct IncidentForm {
    draft: IncidentDraft,
    errors: FieldErrors,
}

impl IncidentForm {
    pub fn draft(&self) -> &IncidentDraft {
        &self.draft
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn set_title(&mut self, value: impl Into<String>) {
        self.draft.title = value.into();
    }

    pub fn set_description(&mut self, value: impl Into<String>) {
        self.draft.description = value.into();
    }

    pub fn set_severity(&mut self, value: impl Into<String>) {
        self.draft.severity = value.into();
    }

    /// Validates the draft. On success the completed incident is returned and the
    /// form resets; on failure the errors are stored and the draft is kept.
    pub fn submit(&mut self) -> Option<NewIncident> {
        let errors = validation::validate(&self.draft);
        if !errors.is_empty() {
            debug!(errors = errors.len(), "form submission rejected");
            self.errors = errors;
            return None;
        }

        let draft = std::mem::take(&mut self.draft);
        self.errors = FieldErrors::default();
        // validate() already accepted the severity text
        let severity = draft.severity.parse().ok()?;

        Some(NewIncident {
            title: draft.title,
            description: draft.description,
            severity,
        })
    }
}

use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, Utc};

use crate::models::{Incident, IncidentId, Severity};

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("failed to open seed file {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("seed row {row}: {source}")]
    Row {
        row: usize,
        #[source]
        source: csv::Error,
    },
    #[error("seed row {row}: {message}")]
    Invalid { row: usize, message: String },
    #[error("seed row {row}: duplicate incident id {id}")]
    DuplicateId { row: usize, id: IncidentId },
}

/// The built-in incident set loaded when no seed file is given.
pub fn seed_incidents() -> anyhow::Result<Vec<Incident>> {
    let seeds = [
        (
            1,
            "Biased Recommendation Algorithm",
            "Algorithm consistently favored certain demographics in job recommendations, leading to unequal opportunity distribution across user groups. The issue was traced to training data imbalances.",
            Severity::Medium,
            "2025-03-15T10:00:00Z",
        ),
        (
            2,
            "LLM Hallucination in Critical Info",
            "LLM provided incorrect safety procedure information when asked about emergency protocols in a chemical plant. This could have led to dangerous situations if followed in a real emergency.",
            Severity::High,
            "2025-04-01T14:30:00Z",
        ),
        (
            3,
            "Minor Data Leak via Chatbot",
            "Chatbot inadvertently exposed non-sensitive user metadata in its responses. While no critical information was leaked, it revealed system architecture details that should have remained private.",
            Severity::Low,
            "2025-03-20T09:15:00Z",
        ),
        (
            4,
            "Facial Recognition False Positives",
            "Security system incorrectly identified multiple individuals as persons of interest, leading to unnecessary security escalations. The error rate was particularly high for certain ethnic groups.",
            Severity::Medium,
            "2025-03-25T16:45:00Z",
        ),
        (
            5,
            "Autonomous Vehicle Navigation Error",
            "Test vehicle repeatedly misinterpreted road markings in construction zones, attempting unsafe lane changes. No accidents occurred, but the behavior revealed a critical edge case in the perception system.",
            Severity::High,
            "2025-04-05T11:20:00Z",
        ),
    ];

    let mut incidents = Vec::with_capacity(seeds.len());
    for (id, title, description, severity, reported_at) in seeds {
        let reported_at = DateTime::parse_from_rfc3339(reported_at)
            .with_context(|| format!("invalid seed timestamp {reported_at:?}"))?
            .with_timezone(&Utc);
        incidents.push(Incident::new(
            IncidentId(id),
            title,
            description,
            severity,
            reported_at,
        ));
    }
    Ok(incidents)
}

pub fn load_csv(path: &Path) -> Result<Vec<Incident>, SeedError> {
    let file = File::open(path).map_err(|source| SeedError::Open {
        path: path.display().to_string(),
        source,
    })?;
    read_csv(file)
}

/// Parses `id,title,description,severity,reported_at` rows. Ids must be unique.
pub fn read_csv<R: Read>(input: R) -> Result<Vec<Incident>, SeedError> {
    let mut reader = csv::Reader::from_reader(input);

    #[derive(serde::Deserialize)]
    struct CsvRow {
        id: u64,
        title: String,
        description: String,
        severity: String,
        reported_at: DateTime<Utc>,
    }

    let mut incidents = Vec::new();
    let mut seen = HashSet::new();

    for (index, result) in reader.deserialize::<CsvRow>().enumerate() {
        // header is line 1
        let row = index + 2;
        let record = result.map_err(|source| SeedError::Row { row, source })?;

        if record.title.trim().is_empty() || record.description.trim().is_empty() {
            return Err(SeedError::Invalid {
                row,
                message: "title and description must not be empty".to_string(),
            });
        }
        let severity = record
            .severity
            .parse::<Severity>()
            .map_err(|err| SeedError::Invalid {
                row,
                message: err.to_string(),
            })?;
        // the dashboard assigns max id + 1 to new reports
        if record.id == u64::MAX {
            return Err(SeedError::Invalid {
                row,
                message: format!("incident id {} leaves no room for new reports", record.id),
            });
        }
        let id = IncidentId(record.id);
        if !seen.insert(id) {
            return Err(SeedError::DuplicateId { row, id });
        }

        incidents.push(Incident::new(
            id,
            record.title,
            record.description,
            severity,
            record.reported_at,
        ));
    }

    Ok(incidents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_seed_has_five_distinct_incidents() {
        let incidents = seed_incidents().unwrap();
        assert_eq!(incidents.len(), 5);
        let ids: HashSet<IncidentId> = incidents.iter().map(Incident::id).collect();
        assert_eq!(ids.len(), 5);
        let medium = incidents
            .iter()
            .filter(|incident| incident.severity() == Severity::Medium)
            .count();
        assert_eq!(medium, 2);
        assert_eq!(
            incidents[1].reported_at().to_rfc3339(),
            "2025-04-01T14:30:00+00:00"
        );
    }

    #[test]
    fn reads_rows_from_csv() {
        let data = "\
id,title,description,severity,reported_at
10,Prompt injection,Tool call leaked secrets,high,2025-02-01T08:00:00Z
11,Drift,Model quality regressed,Low,2025-02-03T09:30:00Z
";
        let incidents = read_csv(data.as_bytes()).unwrap();
        assert_eq!(incidents.len(), 2);
        assert_eq!(incidents[0].id(), IncidentId(10));
        assert_eq!(incidents[0].severity(), Severity::High);
        assert_eq!(incidents[1].title(), "Drift");
    }

    #[test]
    fn rejects_duplicate_ids() {
        let data = "\
id,title,description,severity,reported_at
1,A,a,Low,2025-02-01T08:00:00Z
1,B,b,High,2025-02-02T08:00:00Z
";
        let err = read_csv(data.as_bytes()).unwrap_err();
        assert!(matches!(err, SeedError::DuplicateId { row: 3, .. }));
    }

    #[test]
    fn rejects_an_id_with_no_successor() {
        let data = "\
id,title,description,severity,reported_at
18446744073709551615,A,a,Low,2025-02-01T08:00:00Z
";
        let err = read_csv(data.as_bytes()).unwrap_err();
        assert!(matches!(err, SeedError::Invalid { row: 2, .. }));
        assert!(err.to_string().contains("leaves no room"));

        let data = "\
id,title,description,severity,reported_at
18446744073709551614,A,a,Low,2025-02-01T08:00:00Z
";
        let incidents = read_csv(data.as_bytes()).unwrap();
        assert_eq!(incidents[0].id(), IncidentId(u64::MAX - 1));
    }

    #[test]
    fn rejects_unknown_severity() {
        let data = "\
id,title,description,severity,reported_at
1,A,a,Severe,2025-02-01T08:00:00Z
";
        let err = read_csv(data.as_bytes()).unwrap_err();
        assert!(matches!(err, SeedError::Invalid { row: 2, .. }));
    }

    #[test]
    fn reports_row_of_bad_timestamp() {
        let data = "\
id,title,description,severity,reported_at
1,A,a,Low,yesterday
";
        let err = read_csv(data.as_bytes()).unwrap_err();
        assert!(matches!(err, SeedError::Row { row: 2, .. }));
    }
}

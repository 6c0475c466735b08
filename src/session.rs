use std::collections::BTreeSet;
use std::io::{BufRead, Write};
use std::str::FromStr;

use anyhow::Context;
use tracing::{debug, warn};

use crate::dashboard::{Dashboard, SubmitOutcome};
use crate::models::{
    IncidentId, ParseSeverityError, ParseSortOrderError, SeverityFilter, SortOrder,
};
use crate::report;

const HELP: &str = "\
commands:
  filter <all|low|medium|high>   filter incidents by severity
  sort <newest|oldest>           order incidents by report date
  toggle <id>                    show or hide an incident's description
  form                           show or hide the report form
  title <text>                   set the draft title
  description <text>             set the draft description
  severity <low|medium|high>     set the draft severity
  submit                         submit the report form
  show                           render the dashboard
  json                           print the visible incidents as JSON
  help                           print this message
  quit                           leave the dashboard";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Filter(SeverityFilter),
    Sort(SortOrder),
    Toggle(IncidentId),
    Form,
    Title(String),
    Description(String),
    Severity(String),
    Submit,
    Show,
    Json,
    Help,
    Quit,
}

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("unknown command {0:?}; type `help` for a list")]
    Unknown(String),
    #[error("`{0}` needs an argument")]
    MissingArgument(&'static str),
    #[error("invalid incident id {0:?}")]
    InvalidId(String),
    #[error("no incident with id {0}")]
    UnknownIncident(IncidentId),
    #[error(transparent)]
    Severity(#[from] ParseSeverityError),
    #[error(transparent)]
    SortOrder(#[from] ParseSortOrderError),
}

fn required<'a>(name: &'static str, rest: &'a str) -> Result<&'a str, CommandError> {
    if rest.is_empty() {
        Err(CommandError::MissingArgument(name))
    } else {
        Ok(rest)
    }
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim_start().trim_end_matches(['\r', '\n']);
        // one separator after the command word; draft text keeps everything after it
        let (name, text) = match line.split_once(char::is_whitespace) {
            Some((name, text)) => (name, text),
            None => (line, ""),
        };
        let arg = text.trim();

        let command = match name.to_ascii_lowercase().as_str() {
            "filter" => Command::Filter(required("filter", arg)?.parse()?),
            "sort" => Command::Sort(required("sort", arg)?.parse()?),
            "toggle" => {
                let raw = required("toggle", arg)?;
                let id = raw
                    .parse::<u64>()
                    .map_err(|_| CommandError::InvalidId(raw.to_string()))?;
                Command::Toggle(IncidentId(id))
            }
            "form" => Command::Form,
            // draft fields accept empty text so a field can be cleared
            "title" => Command::Title(text.to_string()),
            "description" => Command::Description(text.to_string()),
            "severity" => Command::Severity(text.to_string()),
            "submit" => Command::Submit,
            "show" => Command::Show,
            "json" => Command::Json,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            _ => return Err(CommandError::Unknown(name.to_string())),
        };
        Ok(command)
    }
}

/// Expands each listed incident once. Fails without changing anything if an id is unknown.
pub fn expand_incidents(
    dashboard: &mut Dashboard,
    ids: impl IntoIterator<Item = u64>,
) -> Result<(), CommandError> {
    let ids: BTreeSet<IncidentId> = ids.into_iter().map(IncidentId).collect();
    if let Some(missing) = ids.iter().find(|id| dashboard.get(**id).is_none()) {
        return Err(CommandError::UnknownIncident(*missing));
    }
    for id in ids {
        if !dashboard.is_expanded(id) {
            dashboard.toggle_details(id);
        }
    }
    Ok(())
}

/// Applies one command. Returns `false` once the session should end.
pub fn apply<W: Write>(
    dashboard: &mut Dashboard,
    command: Command,
    out: &mut W,
) -> anyhow::Result<bool> {
    debug!(?command, "applying command");
    let mut rerender = true;

    match command {
        Command::Filter(filter) => dashboard.set_severity_filter(filter),
        Command::Sort(order) => dashboard.set_sort_order(order),
        Command::Toggle(id) => {
            if dashboard.get(id).is_none() {
                writeln!(out, "{}", CommandError::UnknownIncident(id))?;
                rerender = false;
            } else {
                dashboard.toggle_details(id);
            }
        }
        Command::Form => {
            dashboard.toggle_form_visibility();
        }
        Command::Title(text) => dashboard.form_mut().set_title(text),
        Command::Description(text) => dashboard.form_mut().set_description(text),
        Command::Severity(text) => dashboard.form_mut().set_severity(text),
        Command::Submit => match dashboard.submit_form() {
            Ok(SubmitOutcome::Created(id)) => writeln!(out, "incident #{id} reported")?,
            Ok(SubmitOutcome::Rejected(errors)) => {
                for (field, message) in errors.iter() {
                    writeln!(out, "{field}: {message}")?;
                }
            }
            Err(err) => {
                writeln!(out, "{err}")?;
                rerender = false;
            }
        },
        Command::Show => {}
        Command::Json => {
            let json = report::render_json(dashboard).context("failed to encode incidents")?;
            writeln!(out, "{json}")?;
            rerender = false;
        }
        Command::Help => {
            writeln!(out, "{HELP}")?;
            rerender = false;
        }
        Command::Quit => return Ok(false),
    }

    if rerender {
        write!(out, "{}", report::render(dashboard))?;
    }
    Ok(true)
}

/// Reads commands line by line until `quit` or end of input.
pub fn run<R: BufRead, W: Write>(
    dashboard: &mut Dashboard,
    input: R,
    out: &mut W,
) -> anyhow::Result<()> {
    write!(out, "{}", report::render(dashboard))?;
    writeln!(out, "type `help` for commands")?;

    for line in input.lines() {
        let line = line.context("failed to read command")?;
        if line.trim().is_empty() {
            continue;
        }

        match line.parse::<Command>() {
            Ok(command) => {
                if !apply(dashboard, command, out)? {
                    break;
                }
            }
            Err(err) => {
                warn!(%err, "rejected command");
                writeln!(out, "error: {err}")?;
            }
        }
        out.flush()?;
    }

    Ok(())
}

//! `console run`: start the shell over a set of plugins, apply state
//! changes in order and report which controllers are live afterwards.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgMatches, Args};
use console_plugins::{PredicateTable, SyncReport};
use console_shell::{
    Application, BusEvent, Controller, ControllerFactory, MessageKind, ShellConfig, ShellContext,
    ShellError,
};
use serde_json::{Value, json};

use crate::input::{parse_assignment, parse_submission};
use crate::opts::GlobalOpts;
use crate::output::print_success;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Plugin descriptor files, applied in order (env: CONSOLE_PLUGINS, comma separated)
    #[arg(
        short,
        long,
        required = true,
        num_args = 1..,
        env = "CONSOLE_PLUGINS",
        value_delimiter = ','
    )]
    pub plugins: Vec<PathBuf>,

    /// Persisted state file (env: CONSOLE_STATE_FILE)
    #[arg(long)]
    pub state_file: Option<PathBuf>,

    /// Namespace used to qualify short controller ids (env: CONSOLE_APP_NAMESPACE)
    #[arg(long)]
    pub namespace: Option<String>,

    /// State seeded before the first sync, as KEY=JSON (repeatable)
    #[arg(long = "state", value_name = "KEY=JSON")]
    pub initial: Vec<String>,

    /// State change applied after start, as KEY=JSON (repeatable)
    #[arg(long = "set", value_name = "KEY=JSON")]
    pub changes: Vec<String>,

    /// State key removed after start (repeatable)
    #[arg(long = "unset", value_name = "KEY")]
    pub removals: Vec<String>,

    /// Settings form submitted after start, as FORM=JSON (repeatable)
    #[arg(long = "submit", value_name = "FORM=JSON")]
    pub submissions: Vec<String>,
}

/// One post-start action, in the order it appeared on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step<'a> {
    Set(&'a str),
    Unset(&'a str),
    Submit(&'a str),
}

/// Interleaves `--set`, `--unset` and `--submit` by their argv positions.
fn ordered_steps<'a>(args: &'a RunArgs, matches: &ArgMatches) -> Vec<Step<'a>> {
    let mut steps: Vec<(usize, Step<'a>)> = Vec::new();
    let mut collect = |id: &str, values: &'a [String], step: fn(&'a str) -> Step<'a>| {
        let indices = matches.indices_of(id).into_iter().flatten();
        steps.extend(indices.zip(values).map(|(index, value)| (index, step(value.as_str()))));
    };
    collect("changes", args.changes.as_slice(), Step::Set);
    collect("removals", args.removals.as_slice(), Step::Unset);
    collect("submissions", args.submissions.as_slice(), Step::Submit);
    steps.sort_by_key(|(index, _)| *index);
    steps.into_iter().map(|(_, step)| step).collect()
}

pub fn cmd_run(opts: &GlobalOpts, args: &RunArgs, matches: &ArgMatches) -> Result<()> {
    let mut config = ShellConfig::from_env();
    if let Some(path) = &args.state_file {
        config.state_path = Some(path.clone());
    }
    if let Some(namespace) = &args.namespace {
        config.app_namespace = namespace.clone();
    }

    let descriptors = super::load_plugins(&args.plugins)?;
    let factory = ControllerFactory::builtin().with_fallback(|id| Box::new(LoggingController::new(id)));
    let mut app = Application::new(config, &descriptors, &PredicateTable::with_builtins(), factory)
        .context("create application")?;

    for raw in &args.initial {
        let (key, value) = parse_assignment(raw)?;
        app.set_state(key, value)?;
    }

    let mut passes = vec![pass_json("start", &app.start()?)];
    for step in ordered_steps(args, matches) {
        let (trigger, report) = match step {
            Step::Set(raw) => {
                let (key, value) = parse_assignment(raw)?;
                (format!("set {key}"), app.set_state(key, value)?)
            }
            Step::Unset(key) => (format!("unset {key}"), app.remove_state(key)?),
            Step::Submit(raw) => {
                let (form, data) = parse_submission(raw)?;
                (format!("submit {form}"), app.dispatch(BusEvent::settings_submitted(form, data))?)
            }
        };
        if let Some(report) = report {
            passes.push(pass_json(&trigger, &report));
        }
    }

    let features: Vec<_> = app
        .visible_features()
        .iter()
        .map(|f| json!({ "mode": f.mode, "path": f.path, "view": f.view }))
        .collect();
    let data = json!({
        "live": app.active_controllers(),
        "features": features,
        "state": serde_json::to_value(app.state().snapshot())?,
        "passes": passes,
    });
    let warnings = app
        .messages()
        .iter()
        .filter(|m| matches!(m.kind, MessageKind::Warning | MessageKind::Danger))
        .map(|m| m.text.clone())
        .collect();

    app.shutdown();
    print_success(opts, data, warnings)
}

fn pass_json(trigger: &str, report: &SyncReport) -> Value {
    let failures: Vec<_> = report
        .failures
        .iter()
        .map(|f| json!({ "id": f.id, "stage": f.stage.to_string(), "message": f.message }))
        .collect();
    json!({
        "trigger": trigger,
        "created": report.created,
        "destroyed": report.destroyed,
        "failures": failures,
    })
}

/// Stand-in for controllers without a built-in implementation; it only
/// logs its lifecycle.
struct LoggingController {
    id: String,
}

impl LoggingController {
    fn new(id: &str) -> Self {
        Self { id: id.to_string() }
    }
}

impl Controller for LoggingController {
    fn init(&mut self, _ctx: &mut ShellContext<'_>) -> Result<(), ShellError> {
        tracing::info!(controller = %self.id, "init");
        Ok(())
    }

    fn on_launch(&mut self, _ctx: &mut ShellContext<'_>) -> Result<(), ShellError> {
        tracing::info!(controller = %self.id, "launch");
        Ok(())
    }

    fn finish_init(&mut self, _ctx: &mut ShellContext<'_>) -> Result<(), ShellError> {
        tracing::info!(controller = %self.id, "finish init");
        Ok(())
    }

    fn on_destroy(&mut self, _ctx: &mut ShellContext<'_>) -> Result<(), ShellError> {
        tracing::info!(controller = %self.id, "destroy");
        Ok(())
    }
}

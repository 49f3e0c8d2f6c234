use crate::cli::{
    actions::Action, commands, commands::logging::level_for, dispatch::handler,
    globals::GlobalArgs, telemetry,
};
use anyhow::Result;

/// Parses the command line, installs logging and returns what to run.
///
/// # Errors
/// Returns an error if telemetry cannot be initialized or the arguments are
/// inconsistent.
pub fn start() -> Result<(Action, GlobalArgs)> {
    let matches = commands::new().get_matches();

    let verbosity = matches.get_one::<u8>("verbosity").map_or(0, |&v| v);
    telemetry::init(level_for(verbosity))?;

    handler(&matches)
}

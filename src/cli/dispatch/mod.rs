use crate::{
    cli::{
        actions::{Action, CbtAction, MoodAction, SubscriptionAction},
        commands::DEFAULT_STATE_DIR,
        globals::GlobalArgs,
    },
    client::DEFAULT_API_BASE_URL,
    features::{mood::Mood, navigation::NavigationType},
};
use anyhow::{anyhow, Context, Result};
use secrecy::SecretString;
use std::time::Duration;

fn globals(matches: &clap::ArgMatches) -> GlobalArgs {
    let api_url = matches
        .get_one::<String>("api-url")
        .cloned()
        .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
    let state_dir = matches
        .get_one::<String>("state-dir")
        .cloned()
        .unwrap_or_else(|| DEFAULT_STATE_DIR.to_string());
    let timeout = matches.get_one::<u64>("timeout").copied().unwrap_or(10);
    GlobalArgs::new(api_url, state_dir, Duration::from_secs(timeout))
}

fn string(matches: &clap::ArgMatches, name: &str) -> Option<String> {
    matches.get_one::<String>(name).cloned()
}

fn secret(matches: &clap::ArgMatches, name: &str) -> Option<SecretString> {
    matches
        .get_one::<String>(name)
        .map(|value| SecretString::from(value.clone()))
}

fn days(matches: &clap::ArgMatches) -> u32 {
    matches.get_one::<u32>("days").copied().unwrap_or(30)
}

/// # Errors
/// Returns an error if a subcommand or one of its values is missing or invalid.
pub fn handler(matches: &clap::ArgMatches) -> Result<(Action, GlobalArgs)> {
    let globals = globals(matches);

    let (name, sub_m) = matches.subcommand().context("missing subcommand")?;
    let action = match name {
        "login" => Action::Login {
            email: string(sub_m, "email"),
            password: secret(sub_m, "password"),
            back: sub_m.get_flag("back"),
        },
        "register" => Action::Register {
            email: string(sub_m, "email"),
            password: secret(sub_m, "password"),
            back: sub_m.get_flag("back"),
        },
        "logout" => Action::Logout,
        "whoami" => Action::Whoami,
        "open" => Action::Open {
            path: string(sub_m, "path").context("missing required argument: <path>")?,
        },
        "resume" => Action::Resume {
            path: string(sub_m, "path").unwrap_or_else(|| "/".to_string()),
            navigation: sub_m
                .get_one::<String>("navigation")
                .map_or("reload", String::as_str)
                .parse::<NavigationType>()
                .map_err(|e| anyhow!(e))?,
        },
        "mood" => Action::Mood(mood(sub_m)?),
        "cbt" => Action::Cbt(match sub_m.subcommand_name() {
            Some("content") => CbtAction::Content,
            Some("progress") => CbtAction::Progress,
            other => return Err(anyhow!("unknown cbt command: {other:?}")),
        }),
        "subscription" => Action::Subscription(match sub_m.subcommand_name() {
            Some("status") => SubscriptionAction::Status,
            Some("upgrade") => SubscriptionAction::Upgrade,
            Some("cancel") => SubscriptionAction::Cancel,
            other => return Err(anyhow!("unknown subscription command: {other:?}")),
        }),
        "analytics" => Action::Analytics { days: days(sub_m) },
        "crisis" => Action::Crisis,
        other => return Err(anyhow!("unknown command: {other}")),
    };

    Ok((action, globals))
}

fn mood(matches: &clap::ArgMatches) -> Result<MoodAction> {
    match matches.subcommand() {
        Some(("record", record)) => Ok(MoodAction::Record {
            mood: record
                .get_one::<String>("mood")
                .context("missing required argument: <mood>")?
                .parse::<Mood>()
                .map_err(|e| anyhow!(e))?,
            intensity: record.get_one::<u8>("intensity").copied().unwrap_or(8),
            notes: string(record, "notes"),
        }),
        Some(("timeline", timeline)) => Ok(MoodAction::Timeline {
            days: days(timeline),
        }),
        other => Err(anyhow!(
            "unknown mood command: {:?}",
            other.map(|(name, _)| name)
        )),
    }
}

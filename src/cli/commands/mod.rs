pub mod logging;

use crate::client::DEFAULT_API_BASE_URL;
use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    Arg, ArgAction, ColorChoice, Command,
};

pub const DEFAULT_STATE_DIR: &str = ".newme";

fn long_version() -> &'static str {
    Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    )
}

fn days_arg() -> Arg {
    Arg::new("days")
        .short('d')
        .long("days")
        .help("Number of days to include")
        .default_value("30")
        .value_parser(clap::value_parser!(u32).range(1..=365))
}

fn mood_command() -> Command {
    Command::new("mood")
        .about("Record a mood or show the mood timeline")
        .subcommand_required(true)
        .subcommand(
            Command::new("record")
                .about("Record how you feel")
                .arg(
                    Arg::new("mood")
                        .help("happy, neutral, sad, anxious, angry or calm")
                        .required(true),
                )
                .arg(
                    Arg::new("intensity")
                        .short('i')
                        .long("intensity")
                        .help("Intensity from 1 to 10")
                        .default_value("8")
                        .value_parser(clap::value_parser!(u8).range(1..=10)),
                )
                .arg(Arg::new("notes").short('n').long("notes").help("Free text notes")),
        )
        .subcommand(
            Command::new("timeline")
                .about("Show recorded moods")
                .arg(days_arg()),
        )
}

fn cbt_command() -> Command {
    Command::new("cbt")
        .about("Browse CBT programs and progress")
        .subcommand_required(true)
        .subcommand(Command::new("content").about("List programs and lessons"))
        .subcommand(Command::new("progress").about("Show your progress"))
}

fn subscription_command() -> Command {
    Command::new("subscription")
        .about("Show or change your plan")
        .subcommand_required(true)
        .subcommand(Command::new("status").about("Show plan, limits and feature access"))
        .subcommand(Command::new("upgrade").about("Upgrade to premium"))
        .subcommand(Command::new("cancel").about("Cancel the subscription"))
}

pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    Command::new("newme")
        .about("Mood journal client")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version())
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .arg(
            Arg::new("api-url")
                .short('a')
                .long("api-url")
                .help("API base URL")
                .default_value(DEFAULT_API_BASE_URL)
                .env("NEWME_API_URL")
                .global(true),
        )
        .arg(
            Arg::new("state-dir")
                .short('s')
                .long("state-dir")
                .help("Directory holding cookies and session state")
                .default_value(DEFAULT_STATE_DIR)
                .env("NEWME_STATE_DIR")
                .global(true),
        )
        .arg(
            Arg::new("timeout")
                .short('t')
                .long("timeout")
                .help("Request timeout in seconds")
                .default_value("10")
                .env("NEWME_TIMEOUT")
                .global(true)
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(logging::verbosity())
        .subcommand(
            Command::new("login")
                .about("Sign in; resumes an unfinished sign-in")
                .arg(Arg::new("email").short('e').long("email").help("Account email"))
                .arg(
                    Arg::new("password")
                        .short('p')
                        .long("password")
                        .help("Account password")
                        .env("NEWME_PASSWORD")
                        .hide_env_values(true),
                )
                .arg(
                    Arg::new("back")
                        .long("back")
                        .help("Return to the email step")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("register")
                .about("Create an account; resumes an unfinished registration")
                .arg(Arg::new("email").short('e').long("email").help("Account email"))
                .arg(
                    Arg::new("password")
                        .short('p')
                        .long("password")
                        .help("Password, at least 8 characters")
                        .env("NEWME_PASSWORD")
                        .hide_env_values(true),
                )
                .arg(
                    Arg::new("back")
                        .long("back")
                        .help("Return to the email step")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(Command::new("logout").about("Sign out"))
        .subcommand(Command::new("whoami").about("Show the signed-in user"))
        .subcommand(
            Command::new("open")
                .about("Open a page: resolves access and records it as the last page")
                .arg(Arg::new("path").help("Page path, e.g. /mood").required(true)),
        )
        .subcommand(
            Command::new("resume")
                .about("Simulate a page load and restore the last page")
                .arg(
                    Arg::new("path")
                        .help("Path the page loads on")
                        .default_value("/"),
                )
                .arg(
                    Arg::new("navigation")
                        .short('n')
                        .long("navigation")
                        .help("navigate, reload, back_forward or prerender")
                        .default_value("reload"),
                ),
        )
        .subcommand(mood_command())
        .subcommand(cbt_command())
        .subcommand(subscription_command())
        .subcommand(
            Command::new("analytics")
                .about("Show the wellness dashboard")
                .arg(days_arg()),
        )
        .subcommand(Command::new("crisis").about("List crisis support resources"))
}

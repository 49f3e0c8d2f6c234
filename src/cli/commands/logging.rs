use clap::{builder::ValueParser, Arg};

/// Accepts `0..=5` or a level name and maps it to the `-v` count.
pub fn validator_log_level() -> ValueParser {
    ValueParser::from(move |level: &str| -> std::result::Result<u8, String> {
        if let Ok(parsed) = level.parse::<u8>() {
            if parsed <= 5 {
                return Ok(parsed);
            }
        }

        match level.to_lowercase().as_str() {
            "error" => Ok(0),
            "warn" => Ok(1),
            "info" => Ok(2),
            "debug" => Ok(3),
            "trace" => Ok(4),
            _ => Err("invalid log level".to_string()),
        }
    })
}

pub fn verbosity() -> Arg {
    Arg::new("verbosity")
        .short('v')
        .long("verbose")
        .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
        .env("NEWME_LOG_LEVEL")
        .global(true)
        .action(clap::ArgAction::Count)
        .value_parser(validator_log_level())
}

#[must_use]
pub fn level_for(count: u8) -> tracing::Level {
    match count {
        0 => tracing::Level::ERROR,
        1 => tracing::Level::WARN,
        2 => tracing::Level::INFO,
        3 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_map_to_levels() {
        assert_eq!(level_for(0), tracing::Level::ERROR);
        assert_eq!(level_for(2), tracing::Level::INFO);
        assert_eq!(level_for(9), tracing::Level::TRACE);
    }
}

use std::io::Write;

use hookshaper_config::logger::{LogLevel, LoggerConfig, LoggerFormat};

const WHITELISTED_CRATES: &[&str] = &[
    "hookshaper",
    "hookshaper_config",
    "hookshaper_engine",
    "hookshaper_client",
    "hookshaper_syntax",
];

pub(crate) fn default_env_filter(level: &str) -> String {
    let mut filters: Vec<String> = WHITELISTED_CRATES
        .iter()
        .map(|crate_name| format!("{crate_name}={level}"))
        .collect();

    // Set default level for all other crates to warn
    filters.insert(0, "warn".to_string());

    filters.join(",")
}

/// Effective level: `-q`/`-v` on top of the configured level, errors only
/// when logging is disabled
pub(crate) fn effective_level(cfg: &LoggerConfig, verbose: u8, quiet: bool) -> LogLevel {
    if cfg.enabled {
        cfg.level.adjusted(verbose, quiet)
    } else {
        LogLevel::Error
    }
}

pub(crate) fn init_cli_logger(cfg: &LoggerConfig, verbose: u8, quiet: bool) {
    let level = effective_level(cfg, verbose, quiet);

    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_env_filter(level.as_str())),
    );

    builder.write_style(if cfg.colors {
        env_logger::WriteStyle::Auto
    } else {
        env_logger::WriteStyle::Never
    });

    // For INFO and above in compact mode, only tag WARN and ERROR records
    if cfg.format == LoggerFormat::Compact && level >= LogLevel::Info {
        builder.format(|buf, record| {
            if record.level() == tracing::log::Level::Info {
                writeln!(buf, "{}", record.args())
            } else {
                let log_style = buf.default_level_style(record.level());
                writeln!(
                    buf,
                    "{log_style}[{}]{log_style:#} {}",
                    record.level(),
                    record.args()
                )
            }
        });
    }

    if let Err(e) = builder.try_init() {
        eprintln!("hookshaper: Failed initializing env_logger: {e:?}");
    }
}

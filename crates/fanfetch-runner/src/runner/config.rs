use super::input;
use anyhow::{Context, bail};
use clap::{Parser, ValueEnum};
use core::time::Duration;
use fanfetch::{
    DEFAULT_MAX_CONCURRENCY, DispatcherConfig, FetchMode, Route, memory::DEFAULT_MAX_BATCH_SIZE,
};
use std::{collections::HashSet, path::PathBuf};

/// Runtime configuration for the `fanfetch-runner` binary.
///
/// Every value can be given as a CLI flag or an environment variable (a `.env`
/// file is loaded first). Routes come from `ROUTES`, `ROUTES_FILE` or both, in
/// that order.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "fanfetch-runner",
    version,
    about = "Dispatches in-memory topics through fanfetch worker groups"
)]
pub struct CliArgs {
    /// Routes per worker group. The dispatcher runs `routes / MAX_CONCURRENCY`
    /// groups (at least one) and spreads the remainder over them.
    ///
    /// Environment variable: `MAX_CONCURRENCY`
    #[arg(long, env = "MAX_CONCURRENCY", default_value_t = DEFAULT_MAX_CONCURRENCY)]
    pub max_concurrency: usize,

    /// Upper bound, in milliseconds, a source waits for messages on one poll.
    ///
    /// Environment variable: `POLL_TIMEOUT_MS`
    #[arg(long, env = "POLL_TIMEOUT_MS", default_value_t = 100)]
    pub poll_timeout_ms: u64,

    /// Maximum number of messages returned by one poll.
    ///
    /// Environment variable: `MAX_BATCH_SIZE`
    #[arg(long, env = "MAX_BATCH_SIZE", default_value_t = DEFAULT_MAX_BATCH_SIZE)]
    pub max_batch_size: usize,

    /// Comma separated topics, each subscribed in the default group.
    ///
    /// Environment variable: `ROUTES`
    #[arg(long, env = "ROUTES", value_delimiter = ',')]
    pub routes: Vec<String>,

    /// JSON file holding an array of routes, e.g.
    /// `[{"topic": "orders", "group": "billing"}]`.
    ///
    /// Environment variable: `ROUTES_FILE`
    #[arg(long, env = "ROUTES_FILE")]
    pub routes_file: Option<PathBuf>,

    /// JSON-lines file of messages published before dispatching. Each line is
    /// `{"topic": "...", "key": "...", "payload": ...}`; `key` is optional.
    ///
    /// Environment variable: `INPUT`
    #[arg(long, env = "INPUT")]
    pub input: Option<PathBuf>,

    /// `once` runs a single pass; `forever` loops until shutdown or until every
    /// topic is closed and drained.
    ///
    /// Environment variable: `MODE`
    #[arg(long, env = "MODE", value_enum, default_value_t = Mode::Once)]
    pub mode: Mode,

    /// Close every routed topic after seeding the input, so `forever` exits
    /// once the input is consumed.
    ///
    /// Environment variable: `CLOSE_AFTER_INPUT`
    #[arg(long, env = "CLOSE_AFTER_INPUT", default_value_t = false)]
    pub close_after_input: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    Once,
    Forever,
}

impl From<Mode> for FetchMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Once => Self::Once,
            Mode::Forever => Self::Forever,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub dispatcher: DispatcherConfig,
    pub poll_timeout: Duration,
    pub max_batch_size: usize,
    pub routes: Vec<Route>,
    pub input: Option<PathBuf>,
    pub mode: FetchMode,
    pub close_after_input: bool,
}

impl TryFrom<CliArgs> for RunnerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.max_concurrency == 0 {
            bail!("MAX_CONCURRENCY must be greater than 0");
        }
        if args.poll_timeout_ms == 0 {
            bail!("POLL_TIMEOUT_MS must be greater than 0");
        }
        if args.max_batch_size == 0 {
            bail!("MAX_BATCH_SIZE must be greater than 0");
        }

        let mut routes: Vec<Route> = args
            .routes
            .iter()
            .map(|topic| topic.trim())
            .filter(|topic| !topic.is_empty())
            .map(Route::new)
            .collect();

        if let Some(path) = &args.routes_file {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read ROUTES_FILE `{}`", path.display()))?;
            routes.extend(input::parse_routes(&raw)?);
        }

        if routes.is_empty() {
            bail!("At least one route is required (set ROUTES or ROUTES_FILE)");
        }

        let mut seen = HashSet::with_capacity(routes.len());
        for route in &routes {
            if !seen.insert(route) {
                bail!("Route `{route}` is configured more than once");
            }
        }

        Ok(Self {
            dispatcher: DispatcherConfig::new(args.max_concurrency),
            poll_timeout: Duration::from_millis(args.poll_timeout_ms),
            max_batch_size: args.max_batch_size,
            routes,
            input: args.input,
            mode: args.mode.into(),
            close_after_input: args.close_after_input,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> CliArgs {
        let mut argv = vec!["fanfetch-runner"];
        argv.extend_from_slice(extra);
        CliArgs::try_parse_from(argv).unwrap()
    }

    #[test]
    fn parses_routes_and_defaults() {
        let config = RunnerConfig::try_from(args(&["--routes", "orders, payments,,"])).unwrap();

        assert_eq!(config.routes, [Route::new("orders"), Route::new("payments")]);
        assert_eq!(config.dispatcher.max_concurrency, DEFAULT_MAX_CONCURRENCY);
        assert_eq!(config.poll_timeout, Duration::from_millis(100));
        assert_eq!(config.max_batch_size, DEFAULT_MAX_BATCH_SIZE);
        assert!(matches!(config.mode, FetchMode::Once));
        assert!(!config.close_after_input);
    }

    #[test]
    fn parses_forever_mode() {
        let config = RunnerConfig::try_from(args(&[
            "--routes",
            "a",
            "--mode",
            "forever",
            "--close-after-input",
        ]))
        .unwrap();

        assert!(matches!(config.mode, FetchMode::Forever));
        assert!(config.close_after_input);
    }

    #[test]
    fn rejects_zero_limits() {
        for flag in ["--max-concurrency", "--poll-timeout-ms", "--max-batch-size"] {
            let err = RunnerConfig::try_from(args(&["--routes", "a", flag, "0"])).unwrap_err();
            assert!(err.to_string().contains("must be greater than 0"), "{flag}: {err}");
        }
    }

    #[test]
    fn requires_a_route() {
        let err = RunnerConfig::try_from(args(&["--routes", " , "])).unwrap_err();
        assert!(err.to_string().starts_with("At least one route is required"));
    }

    #[test]
    fn rejects_duplicate_routes() {
        let err = RunnerConfig::try_from(args(&["--routes", "a,b,a"])).unwrap_err();
        assert_eq!(err.to_string(), "Route `fanfetch/a` is configured more than once");
    }

    #[test]
    fn missing_routes_file_is_reported() {
        let err = RunnerConfig::try_from(args(&["--routes-file", "/definitely/not/here.json"]))
            .unwrap_err();
        assert!(err.to_string().contains("failed to read ROUTES_FILE"));
    }
}

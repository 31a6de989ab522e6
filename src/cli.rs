use std::time::Duration;

use crate::{app::LogLevel, Error, Result};

pub const DEFAULT_PROBE_SECONDS: u64 = 30;

/// Options shared by the commands that touch hardware; `None` when not given on the CLI.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunOptions {
    pub config_path: Option<String>,
    pub log_level: Option<LogLevel>,
    pub log_file: Option<String>,
    pub refresh_interval: Option<Duration>,
}

/// Parsed command-line intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Run(RunOptions),
    TestPattern(RunOptions),
    TouchProbe { opts: RunOptions, seconds: u64 },
    Stats,
    ShowHelp,
    ShowVersion,
}

impl Command {
    pub fn parse(args: &[String]) -> Result<Self> {
        let mut iter = args.iter();
        match iter.next().map(|s| s.as_str()) {
            None => Ok(Command::Run(RunOptions::default())),
            Some("run") => Ok(Command::Run(parse_run_options(&mut iter)?)),
            Some("test-pattern") => Ok(Command::TestPattern(parse_run_options(&mut iter)?)),
            Some("touch-probe") => parse_touch_probe(&mut iter),
            Some("stats") => match iter.next() {
                None => Ok(Command::Stats),
                Some(extra) => Err(Error::InvalidArgs(format!(
                    "stats takes no arguments, got '{extra}'"
                ))),
            },
            Some("--help") | Some("-h") => Ok(Command::ShowHelp),
            Some("--version") | Some("-V") => Ok(Command::ShowVersion),
            Some(flag) if flag.starts_with('-') => {
                // `run` may be omitted: hand every argument to the run parser.
                Ok(Command::Run(parse_run_options(&mut args.iter())?))
            }
            Some(cmd) => Err(Error::InvalidArgs(format!(
                "unknown command '{cmd}', try --help"
            ))),
        }
    }

    pub fn help() -> &'static str {
        concat!(
            "statpanel - host statistics on an SPI touch LCD\n",
            "\n",
            "USAGE:\n",
            "  statpanel [run] [--config <path>] [--log-level <level>] [--log-file <path>] [--refresh <duration>]\n",
            "  statpanel test-pattern [--config <path>] [--log-level <level>]\n",
            "  statpanel touch-probe [--seconds <n>] [--config <path>] [--log-level <level>]\n",
            "  statpanel stats\n",
            "  statpanel --help\n",
            "  statpanel --version\n",
            "\n",
            "OPTIONS:\n",
            "  --config <path>       Config file (default: $STATPANEL_CONFIG or ~/.config/statpanel/config.toml)\n",
            "  --log-level <level>   error, warn, info, debug or trace (default: info; env STATPANEL_LOG_LEVEL wins)\n",
            "  --log-file <path>     Also append logs to this file\n",
            "  --refresh <duration>  Override refresh_interval, e.g. 500ms or 2s\n",
            "  --seconds <n>         How long touch-probe listens (default: 30)\n",
            "  -h, --help            Show this help\n",
            "  -V, --version         Show version\n",
        )
    }

    pub fn print_help() {
        println!("{}", Self::help());
    }
}

fn parse_run_options(iter: &mut std::slice::Iter<String>) -> Result<RunOptions> {
    let mut opts = RunOptions::default();
    while let Some(flag) = iter.next() {
        if !apply_run_flag(&mut opts, flag, iter)? {
            return Err(Error::InvalidArgs(format!(
                "unknown flag '{flag}', try --help"
            )));
        }
    }
    Ok(opts)
}

fn parse_touch_probe(iter: &mut std::slice::Iter<String>) -> Result<Command> {
    let mut opts = RunOptions::default();
    let mut seconds = DEFAULT_PROBE_SECONDS;
    while let Some(flag) = iter.next() {
        if flag == "--seconds" {
            let raw = take_value(flag, iter)?;
            seconds = raw.parse().map_err(|_| {
                Error::InvalidArgs("seconds must be a positive integer".to_string())
            })?;
        } else if !apply_run_flag(&mut opts, flag, iter)? {
            return Err(Error::InvalidArgs(format!(
                "unknown flag '{flag}', try --help"
            )));
        }
    }
    Ok(Command::TouchProbe { opts, seconds })
}

/// Apply one shared flag; `Ok(false)` when the flag is not one of ours.
fn apply_run_flag(
    opts: &mut RunOptions,
    flag: &str,
    iter: &mut std::slice::Iter<String>,
) -> Result<bool> {
    match flag {
        "--config" => opts.config_path = Some(take_value(flag, iter)?),
        "--log-level" => {
            let raw = take_value(flag, iter)?;
            opts.log_level = Some(raw.parse().map_err(Error::InvalidArgs)?);
        }
        "--log-file" => opts.log_file = Some(take_value(flag, iter)?),
        "--refresh" => {
            let raw = take_value(flag, iter)?;
            opts.refresh_interval = Some(
                humantime::parse_duration(&raw)
                    .map_err(|e| Error::InvalidArgs(format!("invalid --refresh: {e}")))?,
            );
        }
        _ => return Ok(false),
    }
    Ok(true)
}

fn take_value(flag: &str, iter: &mut std::slice::Iter<String>) -> Result<String> {
    iter.next()
        .cloned()
        .ok_or_else(|| Error::InvalidArgs(format!("expected a value after {flag}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parse_defaults_with_no_args() {
        let cmd = Command::parse(&[]).unwrap();
        assert_eq!(cmd, Command::Run(RunOptions::default()));
    }

    #[test]
    fn parse_run_with_overrides() {
        let cmd = Command::parse(&args(&[
            "run",
            "--config",
            "/etc/statpanel.toml",
            "--log-level",
            "debug",
            "--log-file",
            "/tmp/statpanel.log",
            "--refresh",
            "500ms",
        ]))
        .unwrap();
        let expected = RunOptions {
            config_path: Some("/etc/statpanel.toml".into()),
            log_level: Some(LogLevel::Debug),
            log_file: Some("/tmp/statpanel.log".into()),
            refresh_interval: Some(Duration::from_millis(500)),
        };
        assert_eq!(cmd, Command::Run(expected));
    }

    #[test]
    fn parse_run_allows_implicit_subcommand() {
        let cmd = Command::parse(&args(&["--log-level", "warn"])).unwrap();
        let expected = RunOptions {
            log_level: Some(LogLevel::Warn),
            ..RunOptions::default()
        };
        assert_eq!(cmd, Command::Run(expected));
    }

    #[test]
    fn parse_touch_probe_seconds() {
        let cmd = Command::parse(&args(&["touch-probe", "--seconds", "5"])).unwrap();
        assert_eq!(
            cmd,
            Command::TouchProbe {
                opts: RunOptions::default(),
                seconds: 5
            }
        );
        let cmd = Command::parse(&args(&["touch-probe"])).unwrap();
        assert!(matches!(
            cmd,
            Command::TouchProbe {
                seconds: DEFAULT_PROBE_SECONDS,
                ..
            }
        ));
    }

    #[test]
    fn parse_simple_commands() {
        assert_eq!(
            Command::parse(&args(&["test-pattern"])).unwrap(),
            Command::TestPattern(RunOptions::default())
        );
        assert_eq!(Command::parse(&args(&["stats"])).unwrap(), Command::Stats);
        assert_eq!(
            Command::parse(&args(&["--help"])).unwrap(),
            Command::ShowHelp
        );
        assert_eq!(
            Command::parse(&args(&["-V"])).unwrap(),
            Command::ShowVersion
        );
    }

    #[test]
    fn parse_rejects_unknown_flag_and_command() {
        let err = Command::parse(&args(&["--nope"])).unwrap_err();
        assert!(format!("{err}").contains("unknown flag"));
        let err = Command::parse(&args(&["dance"])).unwrap_err();
        assert!(format!("{err}").contains("unknown command"));
        let err = Command::parse(&args(&["run", "--log-level"])).unwrap_err();
        assert!(format!("{err}").contains("expected a value after --log-level"));
        let err = Command::parse(&args(&["run", "--log-level", "loud"])).unwrap_err();
        assert!(format!("{err}").contains("unknown log level"));
    }
}

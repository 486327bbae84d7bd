use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use nodejs::settings::{line_option, SCRIPT_FILE_OPTION, TIMEOUT_OPTION};
use nodejs::{Measure, MAX_LINES};
use rmnode_core::{init_logging, AppDirs, Config, LogLevel, MemoryHost};
use rmnode_script::{parse_call, Locator};
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Parser)]
#[command(name = "rmnode", version, about = "Drive the NodeJS skin plugin outside the host")]
struct Cli {
    /// Debug-level logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Look for the Node.js interpreter the plugin would use
    Locate,
    /// Show the call expression a bang command line renders to
    Parse {
        /// Command line, e.g. greet Alice "Dr. Bob" 7
        #[arg(required = true, num_args = 1.., allow_hyphen_values = true)]
        words: Vec<String>,
    },
    /// Run a measure through reload, updates, commands and finalize
    Run(RunCommand),
}

#[derive(Debug, Args, Clone)]
struct RunCommand {
    /// Script file, relative to the current directory
    #[arg(long, conflicts_with = "line")]
    script_file: Option<PathBuf>,
    /// Inline script line (repeatable, up to 100)
    #[arg(long = "line")]
    line: Vec<String>,
    /// Watchdog per invocation in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,
    /// Section variable for MeterOption getters, e.g. MyMeter:W=120
    #[arg(long = "var", value_name = "NAME=VALUE")]
    vars: Vec<String>,
    /// Number of update cycles
    #[arg(long, default_value_t = 1)]
    updates: usize,
    /// ExecuteBang command (repeatable)
    #[arg(long = "bang")]
    bangs: Vec<String>,
    /// Execute expression (repeatable)
    #[arg(long = "execute")]
    executes: Vec<String>,
    /// Print a JSON summary instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Error, PartialEq, Eq)]
enum RunCommandError {
    #[error("run requires --script-file or at least one --line")]
    MissingSource,
    #[error("at most {max} --line values are read, got {found}")]
    TooManyLines { max: usize, found: usize },
    #[error("invalid --var '{0}', expected NAME=VALUE")]
    InvalidVariable(String),
}

#[derive(Debug, Serialize)]
struct RunReport {
    interpreter: Option<String>,
    state: String,
    updates: Vec<UpdateReport>,
    commands: Vec<CommandReport>,
    bangs: Vec<String>,
    logs: Vec<LogReport>,
}

#[derive(Debug, Serialize)]
struct UpdateReport {
    value: f64,
    string: String,
}

#[derive(Debug, Serialize)]
struct CommandReport {
    surface: &'static str,
    command: String,
    result: Option<String>,
}

#[derive(Debug, Serialize)]
struct LogReport {
    severity: &'static str,
    message: String,
}

impl RunCommand {
    fn host(&self) -> Result<MemoryHost, RunCommandError> {
        let mut host = MemoryHost::new();
        if let Ok(cwd) = std::env::current_dir() {
            host = host.with_base_dir(cwd);
        }

        match &self.script_file {
            Some(path) => {
                host.set_option(SCRIPT_FILE_OPTION, path.to_string_lossy());
            }
            None if self.line.is_empty() => return Err(RunCommandError::MissingSource),
            None if self.line.len() > MAX_LINES => {
                return Err(RunCommandError::TooManyLines {
                    max: MAX_LINES,
                    found: self.line.len(),
                })
            }
            None => {
                for (index, line) in self.line.iter().enumerate() {
                    host.set_option(line_option(index + 1), line.as_str());
                }
            }
        }

        if let Some(ms) = self.timeout_ms {
            host.set_option(TIMEOUT_OPTION, ms.to_string());
        }
        for var in &self.vars {
            let (name, value) = parse_variable(var)?;
            host = host.with_variable(name, value);
        }
        Ok(host)
    }

    fn run(&self, config: &Config) -> Result<RunReport, RunCommandError> {
        let host = self.host()?;
        let mut measure = Measure::initialize(host, config.runner);
        measure.reload();

        let mut updates = Vec::with_capacity(self.updates);
        for _ in 0..self.updates {
            let value = measure.update();
            let string = measure.get_string().to_string();
            updates.push(UpdateReport { value, string });
        }

        let mut commands = Vec::new();
        for bang in &self.bangs {
            measure.execute_bang(bang);
            commands.push(CommandReport {
                surface: "ExecuteBang",
                command: bang.clone(),
                result: None,
            });
        }
        for expression in &self.executes {
            let result = measure.execute(std::slice::from_ref(expression));
            commands.push(CommandReport {
                surface: "Execute",
                command: expression.clone(),
                result: Some(result),
            });
        }

        let interpreter = measure
            .interpreter()
            .map(|path| path.display().to_string());
        measure.finalize();
        let state = format!("{:?}", measure.state());

        let host = measure.host();
        let logs = host
            .logs()
            .into_iter()
            .map(|(severity, message)| LogReport {
                severity: severity.as_str(),
                message,
            })
            .collect();

        Ok(RunReport {
            interpreter,
            state,
            updates,
            commands,
            bangs: host.executed(),
            logs,
        })
    }
}

fn parse_variable(raw: &str) -> Result<(&str, &str), RunCommandError> {
    match raw.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => Ok((name.trim(), value)),
        _ => Err(RunCommandError::InvalidVariable(raw.to_string())),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let dirs = AppDirs::discover()?;
    let mut config = Config::load_or_default(&dirs)?;
    config.logging.stdout = false;
    if cli.verbose {
        config.logging.level = LogLevel::Debug;
    }
    let _logging = init_logging(&config.logging, None)?;

    match cli.command {
        Command::Locate => {
            let locator = Locator::new(config.runner.probe_timeout());
            for candidate in locator.candidates() {
                tracing::debug!(candidate = %candidate.display(), "locator candidate");
            }
            match locator.locate() {
                Some(path) => println!("Found Node.js at {}", path.display()),
                None => anyhow::bail!(
                    "Node.js not found; probed {} candidate(s)",
                    locator.candidates().len()
                ),
            }
        }
        Command::Parse { words } => {
            println!("{}", parse_call(&words.join(" ")));
        }
        Command::Run(run) => {
            let report = run.run(&config)?;
            if run.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
        }
    }

    Ok(())
}

fn print_report(report: &RunReport) {
    match &report.interpreter {
        Some(path) => println!("Interpreter: {path}"),
        None => println!("Interpreter: (not found)"),
    }
    for (index, update) in report.updates.iter().enumerate() {
        println!(
            "Update #{}: {} (string: \"{}\")",
            index + 1,
            update.value,
            update.string
        );
    }
    for command in &report.commands {
        match &command.result {
            Some(result) => println!("{} {} -> \"{}\"", command.surface, command.command, result),
            None => println!("{} {}", command.surface, command.command),
        }
    }
    if !report.bangs.is_empty() {
        println!("Host bangs:");
        for bang in &report.bangs {
            println!("  {bang}");
        }
    }
    if !report.logs.is_empty() {
        println!("Host log:");
        for log in &report.logs {
            println!("  [{}] {}", log.severity, log.message);
        }
    }
    println!("Final state: {}", report.state);
}

#[cfg(test)]
mod tests {
    use super::*;
    use rmnode_core::Host;

    fn run_command(args: &[&str]) -> RunCommand {
        let mut argv = vec!["rmnode", "run"];
        argv.extend_from_slice(args);
        match Cli::try_parse_from(argv).expect("arguments should parse").command {
            Command::Run(run) => run,
            other => panic!("expected run, got {other:?}"),
        }
    }

    #[test]
    fn run_requires_a_source() {
        let run = run_command(&[]);
        assert_eq!(run.host().unwrap_err(), RunCommandError::MissingSource);
    }

    #[test]
    fn script_file_conflicts_with_lines() {
        let result = Cli::try_parse_from(["rmnode", "run", "--script-file", "a.js", "--line", "x"]);
        assert!(result.is_err());
    }

    #[test]
    fn lines_become_numbered_options() {
        let run = run_command(&[
            "--line",
            "function update() {",
            "--line",
            "return 1; }",
            "--timeout-ms",
            "250",
        ]);
        let host = run.host().expect("host");
        assert_eq!(host.read_string("Line", ""), "function update() {");
        assert_eq!(host.read_string("Line2", ""), "return 1; }");
        assert_eq!(host.read_string("Line3", ""), "");
        assert_eq!(host.read_string("Timeout", ""), "250");
    }

    #[test]
    fn variables_feed_section_lookups() {
        let run = run_command(&["--line", "x", "--var", "MyMeter:W=120", "--var", "Other:H="]);
        let host = run.host().expect("host");
        assert_eq!(host.replace_variables("[MyMeter:W]"), "120");
        assert_eq!(host.replace_variables("[Other:H]"), "");
        assert_eq!(host.replace_variables("[Nope:X]"), "[Nope:X]");
    }

    #[test]
    fn malformed_variables_are_rejected() {
        assert_eq!(
            parse_variable("noequals"),
            Err(RunCommandError::InvalidVariable("noequals".into()))
        );
        assert_eq!(
            parse_variable("=5"),
            Err(RunCommandError::InvalidVariable("=5".into()))
        );
        assert_eq!(parse_variable("A:W=1=2"), Ok(("A:W", "1=2")));
    }

    #[test]
    fn too_many_lines_are_rejected() {
        let mut args = Vec::new();
        for _ in 0..=MAX_LINES {
            args.push("--line");
            args.push("x");
        }
        let run = run_command(&args);
        assert_eq!(
            run.host().unwrap_err(),
            RunCommandError::TooManyLines {
                max: MAX_LINES,
                found: MAX_LINES + 1
            }
        );
    }

    #[test]
    fn parse_accepts_raw_words() {
        let cli = Cli::try_parse_from(["rmnode", "parse", "greet", "Alice", "7"]).expect("parse");
        match cli.command {
            Command::Parse { words } => {
                assert_eq!(parse_call(&words.join(" ")), r#"greet("Alice", 7)"#)
            }
            other => panic!("expected parse, got {other:?}"),
        }
    }
}

//! Osiris Descriptor Tooling
//!
//! This is the entry-point of `osiris-descriptor`, a command-line tool to
//! resolve Android build descriptors. Its main input is the descriptor file,
//! plus any number of environment files and definitions supplying the
//! bindings of symbolic references.
//!
//! This CLI is mainly a dispatcher of `osiris_descriptor::resolve()` and the
//! operations in `osiris_descriptor::op::*`. It is a simple clap-based CLI
//! that forwards the arguments to `osiris_descriptor` and visualizes the
//! results. Diagnostics are logged to STDERR via `tracing`, filtered by
//! `RUST_LOG` (default: `warn`).

use clap;
use osiris_descriptor;
use tracing;
use tracing_subscriber;

struct Cli {
    cmd: clap::Command,
}

impl Cli {
    fn new() -> Self {
        let mut cmd;

        cmd = clap::Command::new("osiris-descriptor")
            .propagate_version(true)
            .subcommand_required(true)
            .about("Osiris Descriptor Tooling")
            .long_about("Resolve Android build descriptors into build plans")
            .version(clap::crate_version!());

        cmd = cmd.arg(
            clap::Arg::new("descriptor")
                .long("descriptor")
                .value_name("PATH")
                .help("Path to the build descriptor relative to the working directory")
                .default_value("./osiris-descriptor.toml")
                .value_parser(clap::builder::ValueParser::os_string())
        );

        cmd = cmd.arg(
            clap::Arg::new("env")
                .long("env")
                .value_name("PATH")
                .help("Environment file (TOML or `.properties`) binding symbolic references")
                .action(clap::ArgAction::Append)
                .value_parser(clap::builder::ValueParser::os_string())
        );

        cmd = cmd.arg(
            clap::Arg::new("define")
                .long("define")
                .short('D')
                .value_name("KEY=VALUE")
                .help("Bind a symbolic reference, overriding environment files")
                .action(clap::ArgAction::Append)
        );

        cmd = cmd.subcommand(
            clap::Command::new("resolve")
                .about("Resolve the descriptor and print the build plan")
                .arg(
                    clap::Arg::new("format")
                        .long("format")
                        .value_name("FORMAT")
                        .help("Output format of the build plan")
                        .default_value("json")
                        .value_parser(["json", "descriptor", "gradle"])
                )
        );

        cmd = cmd.subcommand(
            clap::Command::new("emerge")
                .about("Write the resolved build script into a module directory")
                .arg(
                    clap::Arg::new("output")
                        .long("output")
                        .value_name("DIR")
                        .help("Path to the application module directory")
                        .required(true)
                        .value_parser(clap::builder::ValueParser::os_string())
                )
                .arg(
                    clap::Arg::new("update")
                        .long("update")
                        .value_name("BOOL")
                        .help("Whether to allow updating an existing module directory")
                        .default_value("false")
                        .value_parser(clap::builder::ValueParser::bool())
                )
        );

        Self {
            cmd: cmd,
        }
    }

    fn environment(
        &self,
        m: &clap::ArgMatches,
    ) -> Result<osiris_descriptor::environment::Environment, u8> {
        let mut env = osiris_descriptor::environment::Environment::new();

        if let Some(paths) = m.get_many::<std::ffi::OsString>("env") {
            for path in paths {
                match osiris_descriptor::environment::Environment::parse_path(
                    std::path::Path::new(path),
                ) {
                    Err(e) => {
                        eprintln!("Cannot parse environment {:?}: {}", path, e);
                        return Err(1);
                    },
                    Ok(v) => env.extend(v),
                }
            }
        }

        if let Some(definitions) = m.get_many::<String>("define") {
            for definition in definitions {
                if let Err(e) = env.define(definition) {
                    eprintln!("Cannot apply definition: {}", e);
                    return Err(2);
                }
            }
        }

        Ok(env)
    }

    fn plan(
        &self,
        m: &clap::ArgMatches,
    ) -> Result<osiris_descriptor::plan::BuildPlan, u8> {
        let path = m.get_one::<std::ffi::OsString>("descriptor")
            .expect("Descriptor path lacks a value");
        let env = self.environment(m)?;

        let content = std::fs::read_to_string(path).map_err(|e| {
            eprintln!("Cannot read build descriptor {:?}: {}", path, e);
            1u8
        })?;

        let plan = osiris_descriptor::resolve(&content, &env).map_err(|e| {
            eprintln!("Cannot resolve build descriptor {:?}: {}", path, e);
            1u8
        })?;

        for warning in plan.warnings.iter() {
            match warning {
                osiris_descriptor::plan::ConfigWarning::DebugSigning { build_type } => {
                    tracing::warn!(build_type = build_type.as_str(), "build type is signed with the debug identity");
                },
                osiris_descriptor::plan::ConfigWarning::UnconstrainedVersion { coordinate } => {
                    tracing::warn!(coordinate = coordinate.as_str(), "dependency has no version and no platform import");
                },
            }
        }

        Ok(plan)
    }

    fn op_resolve(
        &self,
        m: &clap::ArgMatches,
        m_op: &clap::ArgMatches,
    ) -> Result<(), u8> {
        let plan = self.plan(m)?;
        let format = m_op.get_one::<String>("format").expect("Format-flag lacks a value");

        let output = match format.as_str() {
            "descriptor" => plan.to_descriptor(),
            "gradle" => Ok(osiris_descriptor::gradle::render(&plan)),
            _ => plan.to_json().map(|v| v + "\n"),
        };
        let output = output.map_err(|e| {
            eprintln!("Cannot emit build plan: {}", e);
            1u8
        })?;

        print!("{}", output);
        Ok(())
    }

    fn op_emerge(
        &self,
        m: &clap::ArgMatches,
        m_op: &clap::ArgMatches,
    ) -> Result<(), u8> {
        let plan = self.plan(m)?;
        let output = m_op.get_one::<std::ffi::OsString>("output").expect("Output-flag lacks a value");
        let update = *m_op.get_one("update").expect("Update-flag lacks a value");

        match osiris_descriptor::op::emerge::emerge(
            &plan,
            std::path::Path::new(output),
            update,
        ) {
            Err(e) => {
                eprintln!("Cannot emerge build script: {}", e);
                Err(1)
            },
            Ok(_) => {
                Ok(())
            },
        }
    }

    fn run(mut self) -> Result<(), u8> {
        let (m, r);

        r = self.cmd.try_get_matches_from_mut(
            std::env::args_os(),
        );

        match r {
            Ok(v) => m = v,
            Err(e) => {
                return match e.kind() {
                    clap::error::ErrorKind::DisplayHelp |
                    clap::error::ErrorKind::DisplayVersion => {
                        e.print().expect("Cannot write to STDERR");
                        Ok(())
                    },
                    _ => {
                        e.print().expect("Cannot write to STDERR");
                        Err(2)
                    }
                }
            }
        }

        match m.subcommand() {
            Some(("resolve", m_op)) => self.op_resolve(&m, m_op),
            Some(("emerge", m_op)) => self.op_emerge(&m, m_op),
            _ => std::unreachable!(),
        }
    }
}

fn main() -> std::process::ExitCode {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match Cli::new().run() {
        Ok(()) => 0.into(),
        Err(v) => v.into(),
    }
}

// Copyright 2024-2026 website-operator Contributors
// SPDX-License-Identifier: Apache-2.0

//! CLI argument parsing and help text for website-operator.

use website_operator::config::{OperatorConfig, WatchOutput};

/// Arguments of the `render` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderArgs {
    pub name: String,
    pub namespace: String,
    pub image: String,
    pub replicas: u32,
}

fn value_of<'a>(args: &'a [String], i: usize, flag: &str) -> Result<&'a str, String> {
    args.get(i + 1)
        .map(String::as_str)
        .ok_or_else(|| format!("Missing value for {}", flag))
}

/// Apply `watch` flags (everything after the command) onto `config`.
pub fn apply_watch_args(args: &[String], config: &mut OperatorConfig) -> Result<(), String> {
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--kind" => {
                config.watch.kind = value_of(args, i, "--kind")?.to_string();
                i += 2;
            }
            "--namespace" | "-n" => {
                config.watch.namespace = Some(value_of(args, i, "--namespace")?.to_string());
                i += 2;
            }
            "--all-namespaces" | "-A" => {
                config.watch.namespace = None;
                i += 1;
            }
            "--json" => {
                config.watch.output = WatchOutput::Json;
                i += 1;
            }
            other => return Err(format!("Unknown argument: {}", other)),
        }
    }
    config.watch.resource_kind().map_err(|e| e.to_string())?;
    Ok(())
}

/// Parse `render` flags (everything after the command).
pub fn parse_render_args(args: &[String]) -> Result<RenderArgs, String> {
    let mut name = None;
    let mut namespace = "default".to_string();
    let mut image = None;
    let mut replicas = 1u32;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--name" => name = Some(value_of(args, i, "--name")?.to_string()),
            "--namespace" | "-n" => namespace = value_of(args, i, "--namespace")?.to_string(),
            "--image" => image = Some(value_of(args, i, "--image")?.to_string()),
            "--replicas" => {
                let raw = value_of(args, i, "--replicas")?;
                replicas = raw
                    .parse()
                    .map_err(|_| format!("Invalid value for --replicas: {}", raw))?;
            }
            other => return Err(format!("Unknown argument: {}", other)),
        }
        i += 2;
    }

    match (name, image) {
        (Some(name), Some(image)) => Ok(RenderArgs {
            name,
            namespace,
            image,
            replicas,
        }),
        _ => Err(
            "Usage: website-operator render --name <NAME> --image <IMAGE> [--namespace NS] [--replicas N]"
                .to_string(),
        ),
    }
}

/// Print general usage information.
pub fn print_usage() {
    let version = env!("CARGO_PKG_VERSION");
    eprintln!(
        "website-operator v{}

USAGE:
    website-operator [COMMAND] [OPTIONS]

COMMANDS:
    run          Run the controller and the watch loop (default)
    watch        Run only the watch loop
    render       Print the Deployment and Service generated for a WebSite
    config       Manage configuration (show, defaults, validate)
    version      Show version information
    help         Show this help message

EXAMPLES:
    website-operator                                    # Run the operator
    website-operator watch --kind Pod -n default        # Print Pod changes
    website-operator render --name blog --image nginx   # Show generated children
    website-operator config show                        # Effective configuration

ENVIRONMENT:
    WEBSITE_OPERATOR_CONFIG            TOML configuration file
    WEBSITE_OPERATOR_WORKERS           Reconcile workers (0 = one per CPU)
    WEBSITE_OPERATOR_WATCH_KIND        Kind of the watched collection
    WEBSITE_OPERATOR_WATCH_NAMESPACE   Namespace to watch (empty = all)
    WEBSITE_OPERATOR_LOG_FORMAT        text or json
    WEBSITE_OPERATOR_SEED              JSON file of objects created at startup
    RUST_LOG                           Log filter (overrides log.filter)

EXIT CODES:
    0  Success
    1  Failure
    2  Configuration error
",
        version
    );
}

/// Print detailed help for a specific command.
pub fn print_command_help(command: &str) {
    match command {
        "run" => print_run_help(),
        "watch" => print_watch_help(),
        "render" => print_render_help(),
        "config" => print_config_help(),
        _ => {
            eprintln!(
                "No detailed help available for '{}'. Use 'website-operator help' for general usage.",
                command
            );
        }
    }
}

fn print_run_help() {
    eprintln!(
        "website-operator run - Run the operator

USAGE:
    website-operator run

DESCRIPTION:
    Starts an in-memory store, seeds it from WEBSITE_OPERATOR_SEED when set,
    then runs the WebSite controller and the watch loop until Ctrl+C or
    SIGTERM. Watch events are printed to stdout, logs go to stderr.
"
    );
}

fn print_watch_help() {
    eprintln!(
        "website-operator watch - Print collection changes

USAGE:
    website-operator watch [OPTIONS]

OPTIONS:
    --kind KIND          Kind to watch (default: Pod)
    -n, --namespace NS   Watch one namespace
    -A, --all-namespaces Watch every namespace
    --json               One JSON object per line

EXIT CODES:
    0  Stopped by signal
    1  Watch stream failed
    2  Configuration error
"
    );
}

fn print_render_help() {
    eprintln!(
        "website-operator render - Print generated children

USAGE:
    website-operator render --name <NAME> --image <IMAGE> [OPTIONS]

OPTIONS:
    --name NAME          WebSite name
    --image IMAGE        Container image
    -n, --namespace NS   Namespace (default: default)
    --replicas N         Replica count (default: 1)
"
    );
}

fn print_config_help() {
    eprintln!(
        "website-operator config - Manage configuration

USAGE:
    website-operator config <SUBCOMMAND>

SUBCOMMANDS:
    show           Show current configuration
    validate       Validate configuration file and environment
    defaults       Show default configuration
"
    );
}

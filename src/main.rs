// Copyright 2024-2026 website-operator Contributors
// SPDX-License-Identifier: Apache-2.0

//! website-operator entry point.
//!
//! Loads configuration, initializes logging and dispatches the command.

mod cli_parser;
mod runtime_init;

use std::process::ExitCode;

use website_operator::config::OperatorConfig;
use website_operator::k8s::validation::validate_site;
use website_operator::k8s::{desired_children, WebSite, WebSiteSpec};
use website_operator::logging::init_logging;

const EXIT_CONFIG_ERROR: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(|s| s.as_str()).unwrap_or("run");
    let rest = args.get(2..).unwrap_or_default();

    match command {
        "run" | "" => run(|config| Box::pin(runtime_init::run_operator(config))).await,
        "watch" => {
            let mut config = match load_config() {
                Ok(config) => config,
                Err(code) => return code,
            };
            if let Err(e) = cli_parser::apply_watch_args(rest, &mut config) {
                eprintln!("{}", e);
                cli_parser::print_command_help("watch");
                return ExitCode::from(EXIT_CONFIG_ERROR);
            }
            start(config, |config| Box::pin(runtime_init::run_watch_only(config))).await
        }
        "render" => run_render(rest),
        "config" => run_config_cmd(rest),
        "help" | "--help" | "-h" => {
            if let Some(sub) = rest.first() {
                cli_parser::print_command_help(sub);
            } else {
                cli_parser::print_usage();
            }
            ExitCode::SUCCESS
        }
        "version" | "--version" | "-V" => {
            println!("website-operator {}", website_operator::VERSION);
            ExitCode::SUCCESS
        }
        _ => {
            eprintln!("Unknown command: {}", command);
            cli_parser::print_usage();
            ExitCode::FAILURE
        }
    }
}

type BoxedRun = std::pin::Pin<
    Box<dyn std::future::Future<Output = Result<(), Box<dyn std::error::Error + Send + Sync>>>>,
>;

fn load_config() -> Result<OperatorConfig, ExitCode> {
    OperatorConfig::load().map_err(|e| {
        eprintln!("Configuration error: {}", e);
        ExitCode::from(EXIT_CONFIG_ERROR)
    })
}

async fn run<F>(f: F) -> ExitCode
where
    F: FnOnce(OperatorConfig) -> BoxedRun,
{
    match load_config() {
        Ok(config) => start(config, f).await,
        Err(code) => code,
    }
}

async fn start<F>(config: OperatorConfig, f: F) -> ExitCode
where
    F: FnOnce(OperatorConfig) -> BoxedRun,
{
    init_logging(&config.log);
    website_operator::metrics::register_metrics();
    match f(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "operator failed");
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_render(args: &[String]) -> ExitCode {
    let parsed = match cli_parser::parse_render_args(args) {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let site = WebSite::new(
        parsed.namespace,
        parsed.name,
        WebSiteSpec {
            replicas: parsed.replicas,
            image_name: parsed.image,
        },
    );
    if let Err(e) = validate_site(&site) {
        eprintln!("Invalid WebSite: {}", e);
        return ExitCode::FAILURE;
    }

    match serde_json::to_string_pretty(&desired_children(&site)) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_config_cmd(args: &[String]) -> ExitCode {
    let sub = args.first().map(|s| s.as_str()).unwrap_or("show");
    let config = match sub {
        "show" => match load_config() {
            Ok(config) => config,
            Err(code) => return code,
        },
        "defaults" => OperatorConfig::default(),
        "validate" => {
            return match load_config() {
                Ok(_) => {
                    println!("Configuration is valid");
                    ExitCode::SUCCESS
                }
                Err(code) => code,
            }
        }
        _ => {
            eprintln!("Unknown config subcommand: {}", sub);
            cli_parser::print_command_help("config");
            return ExitCode::FAILURE;
        }
    };

    match config.to_toml_string() {
        Ok(rendered) => {
            print!("{}", rendered);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

use clap::{Parser, Subcommand};

mod commands;
mod output;

use commands::{deploy, revert, GlobalArgs};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "pagegate")]
#[command(version = VERSION)]
#[command(about = "CI release gate for Skuid page deployments")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deploy changed pages, reverting the merge on batch failure
    Deploy(deploy::DeployArgs),
    /// Open a revert pull request for a merge commit
    Revert(revert::RevertArgs),
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    let global = GlobalArgs {};

    let (json_result, exit_code) = match cli.command {
        Commands::Deploy(args) => output::map_cmd_result_to_json(deploy::run(args, &global)),
        Commands::Revert(args) => output::map_cmd_result_to_json(revert::run(args, &global)),
    };

    let _ = output::print_json_result(json_result);
    std::process::ExitCode::from(exit_code_to_u8(exit_code))
}

fn exit_code_to_u8(code: i32) -> u8 {
    if code <= 0 {
        0
    } else if code >= 255 {
        255
    } else {
        code as u8
    }
}

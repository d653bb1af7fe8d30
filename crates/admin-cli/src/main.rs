mod cli;
mod commands;
mod config;
mod observability;
mod output;

use std::sync::Arc;

use admin_client::{AdminConsole, RecordingNavigator};
use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use tokio::sync::broadcast::Receiver;

use cli::{Cli, Commands};
use output::{print_error, print_event};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    observability::init_tracing(cli.log_level.as_deref().unwrap_or("warn"));

    let profile_name = &cli.profile;
    let profile = config::load_profile(profile_name)?;
    let format = config::resolve_format(&cli, &profile);

    if let Commands::Config(args) = &cli.command {
        return match &args.command {
            cli::ConfigCommands::Show => {
                println!("{}: {}", "Profile".cyan(), profile_name);
                println!(
                    "{}: {}",
                    "Server".cyan(),
                    profile.server.as_deref().unwrap_or("(not set)")
                );
                println!(
                    "{}: {}",
                    "Format".cyan(),
                    profile.format.as_deref().unwrap_or("json")
                );
                println!(
                    "{}: {}",
                    "Storage".cyan(),
                    config::home_dir()?.join(profile_name).display()
                );
                Ok(())
            }
            cli::ConfigCommands::Set(set_args) => {
                let mut updated = profile.clone();
                config::set_key(&mut updated, &set_args.key, &set_args.value)?;
                config::save_profile(profile_name, &updated)?;
                output::print_success(&format!("Set {} = {}", set_args.key, set_args.value));
                Ok(())
            }
        };
    }

    let client_config = config::client_config(&cli, &profile)?;
    if cli.log_level.is_none() {
        observability::apply_logging_level(&client_config.logging.level);
    }
    let navigator: Arc<RecordingNavigator> = RecordingNavigator::shared("/");
    let console = AdminConsole::new(client_config, navigator)?;
    let mut events = console.events().subscribe();

    let result = match &cli.command {
        Commands::Login(args) => commands::auth::login(&console, args, format).await,
        Commands::Logout => commands::auth::logout(&console).await,
        Commands::Whoami => commands::auth::whoami(&console, format).await,
        Commands::Captcha => commands::auth::captcha(&console).await,
        Commands::Dict(args) => commands::dict::show(&console, args, format).await,
        Commands::Config(_) => Ok(()),
    };

    drain_events(&mut events);
    result
}

fn drain_events(events: &mut Receiver<admin_client::ClientEvent>) {
    while let Ok(event) = events.try_recv() {
        print_event(&event);
    }
}

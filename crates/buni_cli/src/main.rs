//! `buni` host executable.
//!
//! # Responsibility
//! - Wire the extension runtime against a site directory.
//! - Expose listing, activation, uninstall, theme and scaffold commands.

mod bundled;
mod scaffold;

use buni_core::hook::HOOK_ADMIN_MENU;
use buni_core::{init_logging_from, BoxError, ExtensionRuntime, RuntimeConfig, StartReport};
use clap::{Parser, Subcommand};
use log::warn;
use serde_json::json;
use std::path::PathBuf;
use std::process::ExitCode;

/// Buni CMS extension runtime
#[derive(Parser, Debug)]
#[command(name = "buni")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Site directory holding `buni.json`, plugins and themes
    #[arg(short, long, default_value = ".")]
    site: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List plugins, themes and skipped candidates
    List,
    /// Activate a plugin
    Activate { id: String },
    /// Deactivate a plugin
    Deactivate { id: String },
    /// Deactivate, delete and unload a plugin
    Uninstall { id: String },
    /// Show or select the active theme
    Theme {
        #[command(subcommand)]
        command: ThemeCommand,
    },
    /// Print the admin menu after filters ran
    Menu,
    /// Create a plugin directory with a manifest
    NewPlugin {
        id: String,
        #[arg(long, default_value = "0.1.0")]
        version: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Create a theme directory with a manifest
    NewTheme {
        name: String,
        #[arg(long, default_value = "0.1.0")]
        version: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "")]
        author: String,
    },
}

#[derive(Subcommand, Debug)]
enum ThemeCommand {
    /// Print the active theme
    Show,
    /// Select the active theme
    Set { id: String },
    /// Clear the selection
    Clear,
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), BoxError> {
    let config = RuntimeConfig::load_from_dir(&args.site)?;
    if let Err(err) = init_logging_from(&config.log) {
        eprintln!("warning: logging disabled: {err}");
    }

    match &args.command {
        Command::NewPlugin {
            id,
            version,
            description,
        } => {
            let path = scaffold::new_plugin(&config.plugins_path, id, version, description)?;
            println!("created {}", path.display());
            return Ok(());
        }
        Command::NewTheme {
            name,
            version,
            description,
            author,
        } => {
            let path =
                scaffold::new_theme(&config.themes_path, name, version, description, author)?;
            println!("created {}", path.display());
            return Ok(());
        }
        _ => {}
    }

    let mut runtime = ExtensionRuntime::from_config(
        &config,
        bundled::plugin_factories()?,
        bundled::theme_factories()?,
    )?;
    let report = runtime.start()?;
    for skip in report.plugins.skipped.iter().chain(&report.themes.skipped) {
        warn!("event=cli_skip module=cli status=skip detail={}", skip);
    }

    match args.command {
        Command::List => print_listing(&runtime, &report)?,
        Command::Activate { id } => {
            runtime.enable_plugin(&id)?;
            println!("activated {id}");
        }
        Command::Deactivate { id } => {
            runtime.disable_plugin(&id)?;
            println!("deactivated {id}");
        }
        Command::Uninstall { id } => {
            runtime.uninstall_plugin(&id)?;
            println!("uninstalled {id}");
        }
        Command::Theme { command } => match command {
            ThemeCommand::Show => match runtime.get_active_theme() {
                Some(theme) => println!(
                    "{} layout={} ({})",
                    theme.id(),
                    theme.instance().layout(),
                    theme.instance().description()
                ),
                None => println!("no active theme"),
            },
            ThemeCommand::Set { id } => {
                runtime.set_active_theme(&id)?;
                println!("active theme: {id}");
            }
            ThemeCommand::Clear => {
                runtime.theme_manager_mut().clear_active_theme()?;
                println!("no active theme");
            }
        },
        Command::Menu => {
            let menu = runtime.apply_filters(HOOK_ADMIN_MENU, json!([]), &[])?;
            println!("{}", serde_json::to_string_pretty(&menu)?);
        }
        Command::NewPlugin { .. } | Command::NewTheme { .. } => {}
    }
    Ok(())
}

fn print_listing(runtime: &ExtensionRuntime, report: &StartReport) -> Result<(), BoxError> {
    println!("plugins:");
    for plugin in runtime.installed_plugins()? {
        println!(
            "  [{}] {} {} ({}) {}",
            if plugin.active { "x" } else { " " },
            plugin.id,
            plugin.version,
            plugin.state.as_str(),
            plugin.description
        );
    }

    let active_theme = runtime.theme_manager().active_theme_id();
    println!("themes:");
    for theme in runtime.theme_manager().themes() {
        let manifest = theme.manifest();
        println!(
            "  [{}] {} {} ({})",
            if active_theme == Some(theme.id()) { "x" } else { " " },
            theme.id(),
            manifest.version,
            manifest
                .theme
                .as_ref()
                .map(|info| info.theme_type.as_str())
                .unwrap_or("client")
        );
    }

    let skipped: Vec<_> = report
        .plugins
        .skipped
        .iter()
        .chain(&report.themes.skipped)
        .collect();
    if !skipped.is_empty() {
        println!("skipped:");
        for skip in skipped {
            println!("  {skip}");
        }
    }
    Ok(())
}

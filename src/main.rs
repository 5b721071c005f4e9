//! madb - Run adb commands on multiple Android devices and emulators at once
//!
//! This is the binary entry point. All logic lives in the workspace crates.

mod cli;

use clap::Parser;

use madb_app::commands::{self, manage};
use madb_app::{AdbTool, CommandContext, ConfigStore, OutputOptions};

use cli::{Cli, Command, GroupCommand, NameCommand, UserCommand};

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    madb_core::logging::init()?;

    tracing::debug!("Parsed command line: {:?}", cli);
    run(cli).await?;
    Ok(())
}

/// Commands that never talk to adb
fn needs_adb(command: &Command) -> bool {
    !matches!(
        command,
        Command::Name(_) | Command::Group(_) | Command::User(_) | Command::Version
    )
}

async fn run(cli: Cli) -> madb_core::Result<()> {
    let adb = if needs_adb(&cli.command) {
        AdbTool::locate()?
    } else {
        AdbTool::at("adb")
    };

    let ctx = CommandContext::new(adb, ConfigStore::open_default()?, std::env::current_dir()?)
        .with_filter(cli.device_filter())
        .with_output(OutputOptions::new(cli.prefix))
        .with_mode(cli.dispatch_mode());

    match cli.command {
        Command::Exec { args } => commands::exec(&ctx, &args).await,
        Command::Shell { args } => commands::shell(&ctx, &args).await,
        Command::Extern { args } => commands::extern_command(&ctx, &args).await,
        Command::Start { project, args } => {
            commands::start(&ctx, &args, &project.options(false)).await
        }
        Command::Stop { project, args } => {
            commands::stop(&ctx, &args, &project.options(false)).await
        }
        Command::ClearData { project, args } => {
            commands::clear_data(&ctx, &args, &project.options(false)).await
        }
        Command::Uninstall {
            project,
            keep_data,
            args,
        } => commands::uninstall(&ctx, &args, &project.options(false), keep_data).await,
        Command::Install { project, build } => {
            commands::install(&ctx, &project.options(build)).await
        }
        Command::Resolve { specifiers } => commands::resolve(&ctx, &specifiers).await,
        Command::Version => commands::version(&ctx),

        Command::Name(cmd) => match cmd {
            NameCommand::Set { serial, nickname } => manage::name_set(&ctx, &serial, &nickname),
            NameCommand::Unset { name } => manage::name_unset(&ctx, &name),
            NameCommand::List => manage::name_list(&ctx),
            NameCommand::ClearAll => manage::name_clear_all(&ctx),
        },
        Command::Group(cmd) => match cmd {
            GroupCommand::Add { group, members } => manage::group_add(&ctx, &group, &members),
            GroupCommand::Remove { group, members } => {
                manage::group_remove(&ctx, &group, &members)
            }
            GroupCommand::Delete { groups } => manage::group_delete(&ctx, &groups),
            GroupCommand::Rename { old_name, new_name } => {
                manage::group_rename(&ctx, &old_name, &new_name)
            }
            GroupCommand::List => manage::group_list(&ctx),
            GroupCommand::ClearAll => manage::group_clear_all(&ctx),
        },
        Command::User(cmd) => match cmd {
            UserCommand::Set { serial, user_id } => manage::user_set(&ctx, &serial, &user_id),
            UserCommand::Unset { serial } => manage::user_unset(&ctx, &serial),
            UserCommand::List => manage::user_list(&ctx),
            UserCommand::ClearAll => manage::user_clear_all(&ctx),
        },
    }
}

//! `upkeep`: maintenance script runner.
//!
//! # Usage
//!
//! ```text
//! upkeep                      # open the terminal panel
//! upkeep list
//! upkeep run "Flush DNS"
//! upkeep report --print
//! upkeep scripts new cleanup
//! upkeep settings theme dark
//! ```

mod logging;

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::mpsc::RecvTimeoutError;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};

use upkeep_core::data::{settings, Data};
use upkeep_core::library::ScriptLibrary;
use upkeep_core::types::{ButtonConfig, Interpreter, RunStatus, ThemeName};
use upkeep_core::{OutputStream, SessionController, UpkeepError};

/// Overrides the platform config directory.
const CONFIG_ENV: &str = "UPKEEP_CONFIG_DIR";

#[derive(Parser, Debug)]
#[command(name = "upkeep")]
#[command(about = "Run maintenance scripts and watch their output", long_about = None)]
struct Cli {
    /// Directory holding settings.json, scripts/ and reports/
    #[arg(long, global = true, value_name = "DIR")]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Commands {
    /// Open the interactive button panel (default)
    Panel,
    /// List the panel's commands and their scripts
    List {
        /// Print the command table as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run one command and stream its output
    Run { label: String },
    /// Open the latest diagnostic report
    Report {
        /// Print the report instead of launching the viewer
        #[arg(long)]
        print: bool,
    },
    /// Manage scripts in the scripts directory
    Scripts {
        #[command(subcommand)]
        action: ScriptCommands,
    },
    /// Inspect or change settings
    Settings {
        #[command(subcommand)]
        action: SettingsCommands,
    },
}

#[derive(Subcommand, Debug, PartialEq)]
enum ScriptCommands {
    List,
    Show { name: String },
    /// Create a script from the platform template
    New { name: String },
    /// Replace a script's content from a file, or stdin when no file is given
    Save {
        name: String,
        #[arg(long, value_name = "FILE")]
        from: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug, PartialEq)]
enum SettingsCommands {
    Show,
    /// Set the panel theme (light or dark)
    Theme { theme: String },
    /// Add or replace an extra panel button
    AddButton {
        label: String,
        script: String,
        /// Execute the script directly instead of through the shell
        #[arg(long)]
        direct: bool,
    },
    RemoveButton { label: String },
}


fn main() {
    let cli = Cli::parse();
    let code = match dispatch(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("upkeep: {:#}", e);
            1
        }
    };
    process::exit(code);
}


fn dispatch(cli: Cli) -> Result<i32> {
    let config_dir = resolve_config_dir(cli.config_dir, std::env::var(CONFIG_ENV).ok())?;
    let out = &mut io::stdout();

    match cli.command.unwrap_or(Commands::Panel) {
        Commands::Panel => run_panel(&config_dir),
        Commands::List { json } => {
            let data = load_for_command(&config_dir)?;
            list_commands(&SessionController::from_data(&data), json, out)?;
            Ok(0)
        }
        Commands::Run { label } => {
            let data = load_for_command(&config_dir)?;
            let controller = SessionController::from_data(&data);
            run_command(&controller, &label, out, &mut io::stderr())
        }
        Commands::Report { print } => {
            let data = load_for_command(&config_dir)?;
            report(&SessionController::from_data(&data), print, out)
        }
        Commands::Scripts { action } => {
            let data = load_for_command(&config_dir)?;
            scripts(&ScriptLibrary::new(&data.scripts_dir()), action, out)?;
            Ok(0)
        }
        Commands::Settings { action } => {
            let mut data = load_for_command(&config_dir)?;
            settings_command(&mut data, action, out)?;
            Ok(0)
        }
    }
}


fn run_panel(config_dir: &Path) -> Result<i32> {
    logging::init_file(config_dir)?;
    let data = Data::load(config_dir).context("loading settings")?;
    let controller = SessionController::from_data(&data);
    tracing::info!(config = %config_dir.display(), "panel starting");
    let mut tui = upkeep_tui::tui::Tui::new(controller, data.settings().theme)
        .context("starting panel")?;
    tui.run().context("panel")?;
    Ok(0)
}


fn load_for_command(config_dir: &Path) -> Result<Data> {
    logging::init_stderr();
    Data::load(config_dir).context("loading settings")
}


/// `--config-dir`, then `$UPKEEP_CONFIG_DIR`, then `<platform config>/upkeep`.
fn resolve_config_dir(flag: Option<PathBuf>, env: Option<String>) -> Result<PathBuf> {
    if let Some(dir) = flag {
        return Ok(dir);
    }
    if let Some(dir) = env.filter(|d| !d.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    dirs::config_dir()
        .map(|d| d.join("upkeep"))
        .ok_or_else(|| anyhow!("cannot determine config directory; pass --config-dir"))
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn list_commands(controller: &SessionController, json: bool, out: &mut dyn Write) -> Result<()> {
    let commands = controller.registry().list();
    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(commands)?)?;
        return Ok(());
    }
    let width = commands.iter().map(|c| c.label.len()).max().unwrap_or(0);
    for cmd in commands {
        let marker = if cmd.path().is_file() { "" } else { "  (missing)" };
        writeln!(out, "{:<width$}  {}{}", cmd.label, cmd.path().display(), marker, width = width)?;
    }
    Ok(())
}


/// Run `label` to completion, streaming its lines. Returns the exit code to
/// hand back to the shell.
fn run_command(
    controller: &SessionController,
    label: &str,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> Result<i32> {
    let script = controller.registry().resolve(label)?.script_name();
    let lines = controller.sink().subscribe();
    let handle = controller.run(label)?;

    if let RunStatus::RunnerError { reason } = handle.status() {
        writeln!(err, "Error: {}", reason)?;
        return Ok(1);
    }
    writeln!(out, "Running {}...", script)?;

    let mut print = |line: upkeep_core::OutputLine| -> io::Result<()> {
        if line.run_id != handle.id() {
            return Ok(());
        }
        match line.stream {
            OutputStream::Stdout => writeln!(out, "{}", line.text),
            OutputStream::Stderr => writeln!(err, "{}", line.text),
        }
    };
    loop {
        match lines.recv_timeout(Duration::from_millis(100)) {
            Ok(line) => print(line)?,
            Err(RecvTimeoutError::Timeout) if handle.is_running() => {}
            Err(_) => {
                for line in lines.try_iter() {
                    print(line)?;
                }
                break;
            }
        }
    }

    let status = handle.wait();
    match &status {
        RunStatus::RunnerError { reason } => {
            writeln!(err, "Error: {}", reason)?;
            Ok(1)
        }
        _ => {
            writeln!(out, "Finished running {}", script)?;
            Ok(status.exit_code().unwrap_or(1))
        }
    }
}


fn report(controller: &SessionController, print: bool, out: &mut dyn Write) -> Result<i32> {
    let path = match controller.latest_report() {
        Ok(path) => path,
        Err(UpkeepError::NoneFound { .. }) => {
            writeln!(out, "No diagnostic reports found.")?;
            return Ok(1);
        }
        Err(e) => return Err(e.into()),
    };
    if print {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        write!(out, "{}", content)?;
    } else {
        controller.view_latest_report()?;
        writeln!(out, "Opening {} in {}...", file_name(&path), controller.viewer())?;
    }
    Ok(0)
}


fn scripts(library: &ScriptLibrary, action: ScriptCommands, out: &mut dyn Write) -> Result<()> {
    match action {
        ScriptCommands::List => {
            for name in library.list()? {
                writeln!(out, "{}", name)?;
            }
        }
        ScriptCommands::Show { name } => {
            write!(out, "{}", library.read(&name)?)?;
        }
        ScriptCommands::New { name } => {
            let created = library.create(&name)?;
            writeln!(out, "Created {}", library.dir().join(created).display())?;
        }
        ScriptCommands::Save { name, from } => {
            let content = match from {
                Some(path) => std::fs::read_to_string(&path)
                    .with_context(|| format!("reading {}", path.display()))?,
                None => {
                    let mut buf = String::new();
                    io::stdin().read_to_string(&mut buf).context("reading stdin")?;
                    buf
                }
            };
            library.save(&name, &content)?;
            writeln!(out, "Saved {}", name)?;
        }
    }
    Ok(())
}


fn settings_command(data: &mut Data, action: SettingsCommands, out: &mut dyn Write) -> Result<()> {
    match action {
        SettingsCommands::Show => {
            writeln!(out, "{}", settings::serialize(data.settings())?)?;
            return Ok(());
        }
        SettingsCommands::Theme { theme } => {
            data.settings_mut().theme = parse_theme(&theme)?;
            writeln!(out, "Theme set to {}", theme.to_lowercase())?;
        }
        SettingsCommands::AddButton { label, script, direct } => {
            let interpreter = if direct { Interpreter::None } else { Interpreter::Shell };
            data.upsert_button(ButtonConfig {
                label: label.clone(),
                script,
                interpreter,
            });
            writeln!(out, "Button {:?} saved", label)?;
        }
        SettingsCommands::RemoveButton { label } => {
            if !data.remove_button(&label) {
                bail!("no extra button labelled {:?}", label);
            }
            writeln!(out, "Button {:?} removed", label)?;
        }
    }
    data.save().context("saving settings")?;
    Ok(())
}


fn parse_theme(name: &str) -> Result<ThemeName> {
    match name.to_lowercase().as_str() {
        "light" => Ok(ThemeName::Light),
        "dark" => Ok(ThemeName::Dark),
        other => bail!("unknown theme {:?} (expected light or dark)", other),
    }
}


fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

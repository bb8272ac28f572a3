//! Command line front end: one-shot commands and an interactive shell

use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{debug, error};

use crate::core::{AppState, Diagnostics};

#[derive(Debug, Parser)]
#[command(
    name = "ahk-manager",
    version,
    about = "Group AutoHotkey scripts into libraries and profiles and run them"
)]
pub struct Cli {
    /// Directory holding the database (defaults to the platform data dir)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Interpreter used to run scripts, for this run only
    #[arg(long, global = true)]
    pub executable: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage libraries
    Library {
        #[command(subcommand)]
        command: LibraryCommand,
    },
    /// Manage profiles
    Profile {
        #[command(subcommand)]
        command: ProfileCommand,
    },
    /// View or change settings
    Settings {
        #[command(subcommand)]
        command: SettingsCommand,
    },
    /// Interactive shell that keeps scripts running (default)
    Shell,
}

#[derive(Debug, Subcommand)]
pub enum LibraryCommand {
    /// Track a directory and each of its immediate subdirectories
    Add { path: PathBuf },
    /// Stop and forget a library
    Remove { path: PathBuf },
    /// List libraries and their scripts
    List,
    /// Drop scripts and libraries that vanished from disk
    Refresh,
}

#[derive(Debug, Subcommand)]
pub enum ProfileCommand {
    /// Create a profile (name generated when omitted)
    Add { name: Option<String> },
    /// Remove a profile
    Remove { name: String },
    /// List profiles and their scripts
    List,
    /// Add a script to a profile
    AddScript { profile: String, script: PathBuf },
    /// Remove a script from a profile
    RemoveScript { profile: String, script: PathBuf },
}

#[derive(Debug, Subcommand)]
pub enum SettingsCommand {
    /// Show all current settings
    Show,
    /// Set the script interpreter
    SetExecutable { path: PathBuf },
    /// Recognise another script extension
    AddType { extension: String },
    /// Turn saving of libraries and profiles on or off
    SetSave {
        #[arg(action = clap::ArgAction::Set)]
        enabled: bool,
    },
    /// Turn debug logging on or off (next start)
    SetDebug {
        #[arg(action = clap::ArgAction::Set)]
        enabled: bool,
    },
}

/// One line typed into the shell
#[derive(Debug, Parser)]
#[command(no_binary_name = true, disable_version_flag = true)]
struct ShellLine {
    #[command(subcommand)]
    command: ShellCommand,
}

#[derive(Debug, Subcommand)]
enum ShellCommand {
    Library {
        #[command(subcommand)]
        command: LibraryCommand,
    },
    Profile {
        #[command(subcommand)]
        command: ProfileCommand,
    },
    Settings {
        #[command(subcommand)]
        command: SettingsCommand,
    },
    /// Start a library, script or profile
    Start {
        #[command(subcommand)]
        target: Target,
    },
    /// Stop a library, script, profile, or everything
    Stop {
        #[command(subcommand)]
        target: Target,
    },
    /// Pause a library, script, or everything
    Pause {
        #[command(subcommand)]
        target: Target,
    },
    /// Resume a library, script, or everything
    Resume {
        #[command(subcommand)]
        target: Target,
    },
    /// Restart a script or profile
    Restart {
        #[command(subcommand)]
        target: Target,
    },
    /// Start a script and lock it running
    ForceStart { script: PathBuf },
    /// Open a library or script location in the file manager
    Reveal { path: PathBuf },
    /// Pick up scripts that exited on their own
    Sync,
    /// Stop everything and leave
    #[command(alias = "quit")]
    Exit,
}

#[derive(Debug, Clone, Subcommand)]
enum Target {
    Library { path: PathBuf },
    Script { path: PathBuf },
    Profile { name: String },
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Start,
    Stop,
    Pause,
    Resume,
    Restart,
}

impl Action {
    fn name(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Restart => "restart",
        }
    }
}

/// Run the parsed command line against `state`
pub fn run(cli: Cli, state: &mut AppState, out: &mut impl Write) -> Result<()> {
    match cli.command {
        None | Some(Command::Shell) => {
            let stdin = std::io::stdin();
            run_shell(state, stdin.lock(), out)
        }
        Some(Command::Library { command }) => run_library(state, command, out),
        Some(Command::Profile { command }) => run_profile(state, command, out),
        Some(Command::Settings { command }) => run_settings(state, command, out),
    }
}

/// Read commands line by line until `exit` or end of input, then stop
/// every script so nothing is left running untracked.
pub fn run_shell(state: &mut AppState, input: impl BufRead, out: &mut impl Write) -> Result<()> {
    writeln!(out, "ahk-manager shell, type `help` for commands")?;

    for line in input.lines() {
        let line = line?;
        let args = match split_args(&line) {
            Ok(args) => args,
            Err(e) => {
                writeln!(out, "error: {}", e)?;
                continue;
            }
        };
        if args.is_empty() {
            continue;
        }

        let parsed = match ShellLine::try_parse_from(&args) {
            Ok(parsed) => parsed,
            Err(e) => {
                write!(out, "{}", e.render())?;
                continue;
            }
        };

        debug!("Shell command: {:?}", parsed.command);
        let result = match parsed.command {
            ShellCommand::Exit => break,
            ShellCommand::Library { command } => run_library(state, command, out),
            ShellCommand::Profile { command } => run_profile(state, command, out),
            ShellCommand::Settings { command } => run_settings(state, command, out),
            ShellCommand::Start { target } => run_action(state, Action::Start, target, out),
            ShellCommand::Stop { target } => run_action(state, Action::Stop, target, out),
            ShellCommand::Pause { target } => run_action(state, Action::Pause, target, out),
            ShellCommand::Resume { target } => run_action(state, Action::Resume, target, out),
            ShellCommand::Restart { target } => run_action(state, Action::Restart, target, out),
            ShellCommand::ForceStart { script } => {
                let diagnostics = state.libraries.force_start_script(&script);
                commit(state, &diagnostics, out)
            }
            ShellCommand::Reveal { path } => report(&state.libraries.reveal(&path), out),
            ShellCommand::Sync => {
                let diagnostics = state.libraries.sync();
                report(&diagnostics, out)
            }
        };

        // a failed save or write should not end the session
        if let Err(e) = result {
            error!("Command failed: {:#}", e);
            writeln!(out, "[error] {:#}", e)?;
        }
    }

    let diagnostics = state.stop_all();
    commit(state, &diagnostics, out)
}

fn run_library(state: &mut AppState, command: LibraryCommand, out: &mut impl Write) -> Result<()> {
    let diagnostics = match command {
        LibraryCommand::Add { path } => state.libraries.add(&path),
        LibraryCommand::Remove { path } => state.remove_library(&path),
        LibraryCommand::Refresh => state.refresh(),
        LibraryCommand::List => {
            out.write_all(render_libraries(state).as_bytes())?;
            return Ok(());
        }
    };
    commit(state, &diagnostics, out)
}

fn run_profile(state: &mut AppState, command: ProfileCommand, out: &mut impl Write) -> Result<()> {
    let diagnostics = match command {
        ProfileCommand::Add { name } => {
            let (diagnostics, profile) = state.profiles.add(name.as_deref().unwrap_or_default());
            if let Some(profile) = profile {
                writeln!(out, "Created profile {}", profile.name)?;
            }
            diagnostics
        }
        ProfileCommand::Remove { name } => state.profiles.remove(&name, &mut state.libraries),
        ProfileCommand::AddScript { profile, script } => {
            state
                .profiles
                .add_script(&profile, &script, &mut state.libraries)
        }
        ProfileCommand::RemoveScript { profile, script } => {
            state
                .profiles
                .remove_script_from_profile(&profile, &script, &mut state.libraries)
        }
        ProfileCommand::List => {
            out.write_all(render_profiles(state).as_bytes())?;
            return Ok(());
        }
    };
    commit(state, &diagnostics, out)
}

fn run_settings(state: &mut AppState, command: SettingsCommand, out: &mut impl Write) -> Result<()> {
    match command {
        SettingsCommand::Show => {
            let settings = state.settings()?;
            writeln!(out, "executable:    {}", settings.script_executable.display())?;
            writeln!(out, "file types:    {}", settings.file_types.join(", "))?;
            writeln!(out, "save enabled:  {}", settings.enable_save)?;
            writeln!(out, "debug logging: {}", settings.debug_logging)?;
            return Ok(());
        }
        SettingsCommand::SetExecutable { path } => {
            state.update_settings(|s| s.script_executable = path)?
        }
        SettingsCommand::AddType { extension } => {
            state.update_settings(|s| s.file_types.push(extension))?
        }
        SettingsCommand::SetSave { enabled } => state.update_settings(|s| s.enable_save = enabled)?,
        SettingsCommand::SetDebug { enabled } => {
            state.update_settings(|s| s.debug_logging = enabled)?
        }
    }
    writeln!(out, "Settings saved")?;
    Ok(())
}

fn run_action(
    state: &mut AppState,
    action: Action,
    target: Target,
    out: &mut impl Write,
) -> Result<()> {
    let libraries = &mut state.libraries;
    let diagnostics = match (action, &target) {
        (Action::Start, Target::Library { path }) => libraries.start(path),
        (Action::Stop, Target::Library { path }) => libraries.stop(path),
        (Action::Pause, Target::Library { path }) => libraries.pause(path),
        (Action::Resume, Target::Library { path }) => libraries.resume(path),

        (Action::Start, Target::Script { path }) => libraries.start_script(path),
        (Action::Stop, Target::Script { path }) => libraries.stop_script(path),
        (Action::Pause, Target::Script { path }) => libraries.pause_script(path),
        (Action::Resume, Target::Script { path }) => libraries.resume_script(path),
        (Action::Restart, Target::Script { path }) => libraries.restart_script(path),

        (Action::Start, Target::Profile { name }) => state.profiles.start(name, libraries),
        (Action::Stop, Target::Profile { name }) => state.profiles.stop(name, libraries),
        (Action::Restart, Target::Profile { name }) => state.profiles.restart(name, libraries),

        (Action::Stop, Target::All) => state.stop_all(),
        (Action::Pause, Target::All) => libraries.pause_all(),
        (Action::Resume, Target::All) => libraries.resume_all(),

        (action, target) => Diagnostics::error(format!(
            "Cannot {} {}",
            action.name(),
            target_kind(target)
        )),
    };
    commit(state, &diagnostics, out)
}

fn target_kind(target: &Target) -> &'static str {
    match target {
        Target::Library { .. } => "a library",
        Target::Script { .. } => "a script",
        Target::Profile { .. } => "a profile",
        Target::All => "everything",
    }
}

/// Print the outcome and persist the new state
fn commit(state: &AppState, diagnostics: &Diagnostics, out: &mut impl Write) -> Result<()> {
    report(diagnostics, out)?;
    state.save()
}

fn report(diagnostics: &Diagnostics, out: &mut impl Write) -> Result<()> {
    for message in diagnostics.messages() {
        writeln!(out, "{}", message)?;
    }
    Ok(())
}

pub fn render_libraries(state: &AppState) -> String {
    let mut text = String::new();
    if state.libraries.repository().is_empty() {
        text.push_str("No libraries\n");
    }
    for library in state.libraries.repository().iter() {
        let status = if library.is_running() {
            "running"
        } else if library.is_paused() {
            "paused"
        } else {
            "stopped"
        };
        text.push_str(&format!(
            "{} [{}] {}\n",
            library.name,
            status,
            library.path.display()
        ));
        for script in library.scripts() {
            let mut line = format!("  {:<24} {}", script.name, script.status_label());
            if let Some(process) = script.process() {
                line.push_str(&format!(
                    " (pid {}, up {})",
                    process.pid,
                    process.uptime_string()
                ));
            }
            if script.is_locked() {
                line.push_str(" locked");
            }
            text.push_str(&line);
            text.push('\n');
        }
    }
    text
}

pub fn render_profiles(state: &AppState) -> String {
    let mut text = String::new();
    if state.profiles.repository().is_empty() {
        text.push_str("No profiles\n");
    }
    for profile in state.profiles.repository().iter() {
        let status = if profile.is_running() { "running" } else { "stopped" };
        text.push_str(&format!(
            "{} [{}] {} scripts, started {} times\n",
            profile.name,
            status,
            profile.len(),
            profile.start_count
        ));
        for id in profile.script_ids() {
            let marker = if state.libraries.find_script(id).is_some() {
                ""
            } else {
                " (missing)"
            };
            text.push_str(&format!("  {}{}\n", id.display(), marker));
        }
    }
    text
}

/// Split a shell line on whitespace, keeping double-quoted runs together
pub fn split_args(line: &str) -> Result<Vec<String>> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut pending = false;

    for c in line.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                pending = true;
            }
            c if c.is_whitespace() && !quoted => {
                if pending {
                    args.push(std::mem::take(&mut current));
                    pending = false;
                }
            }
            c => {
                current.push(c);
                pending = true;
            }
        }
    }
    if quoted {
        anyhow::bail!("Unterminated quote in {:?}", line);
    }
    if pending {
        args.push(current);
    }
    Ok(args)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::core::process::testing::FakeLauncher;
    use crate::core::test_support::touch;
    use crate::persistence::Database;

    fn state(launcher: Arc<FakeLauncher>) -> AppState {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        AppState::new(db, launcher).unwrap()
    }

    fn shell(state: &mut AppState, script: &str) -> String {
        let mut out = Vec::new();
        run_shell(state, script.as_bytes(), &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn split_args_handles_quotes() {
        assert_eq!(
            split_args(r#"library add "C:\My Scripts"  x"#).unwrap(),
            ["library", "add", r"C:\My Scripts", "x"]
        );
        assert_eq!(
            split_args(r#"profile add """#).unwrap(),
            ["profile", "add", ""]
        );
        assert!(split_args("   ").unwrap().is_empty());
        assert!(split_args(r#"start script "C:\My Scripts\a.ahk"#).is_err());
    }

    #[test]
    fn cli_parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "ahk-manager",
            "library",
            "add",
            "/scripts",
            "--data-dir",
            "/tmp/x",
        ])
        .unwrap();
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/x")));
        assert!(matches!(
            cli.command,
            Some(Command::Library {
                command: LibraryCommand::Add { .. }
            })
        ));
    }

    #[test]
    fn shell_runs_scripts_and_stops_them_on_exit() {
        let dir = tempfile::tempdir().unwrap();
        let a = touch(dir.path(), "a.ahk");
        let launcher = FakeLauncher::new();
        let mut state = state(launcher.clone());

        let input = format!(
            "library add \"{}\"\nprofile add work\nprofile add-script work \"{}\"\nstart profile work\nexit\nstart profile work\n",
            dir.path().display(),
            a.display()
        );
        let output = shell(&mut state, &input);

        assert!(output.contains("Created profile work"));
        assert_eq!(launcher.launches(), 1);
        assert_eq!(launcher.live_count(), 0);
        assert_eq!(state.running_count(), 0);
    }

    #[test]
    fn shell_reports_bad_input_and_unsupported_targets() {
        let mut state = state(FakeLauncher::new());
        let output = shell(
            &mut state,
            "frobnicate\npause profile work\nstart script /nope.ahk\nstart script \"/a b\n",
        );

        assert!(output.contains("error"));
        assert!(output.contains("Unterminated quote"));
        assert!(output.contains("Cannot pause a profile"));
        assert!(output.contains("Could not find script"));
    }

    #[test]
    fn listings_show_state() {
        let dir = tempfile::tempdir().unwrap();
        let a = touch(dir.path(), "a.ahk");
        let mut state = state(FakeLauncher::new());
        state.libraries.add(dir.path());
        state.libraries.force_start_script(&a);
        state.profiles.add("work");
        state
            .profiles
            .repository_mut()
            .find_mut("work")
            .unwrap()
            .add(dir.path().join("gone.ahk"));

        let libraries = render_libraries(&state);
        assert!(libraries.contains("Running"));
        assert!(libraries.contains("locked"));
        assert!(render_profiles(&state).contains("(missing)"));
    }
}

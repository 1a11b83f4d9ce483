use crate::{
    app::{App, LauncherKind, StartupOptions},
    bundle,
    config::{self, InstallerConfig},
    install::{self, InstallEvent, InstallJob, InstallPhase, InstallPlan},
    paths::LauncherPaths,
    ui,
};
use anyhow::{bail, Context, Result};
use env_logger::{Env, Target};
use std::{fs, path::PathBuf};

const LOG_FILTER: &str = "smp_installer=info";

#[derive(Debug, PartialEq, Eq)]
enum CliAction {
    Ui(StartupOptions),
    Install(HeadlessOptions),
    Paths(StartupOptions),
    Help,
    Version,
}

#[derive(Debug, PartialEq, Eq)]
struct HeadlessOptions {
    launcher: LauncherKind,
    startup: StartupOptions,
    select_profile: bool,
}

pub fn run() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let action = parse_args(&args)?;
    match action {
        CliAction::Ui(options) => {
            init_file_logging();
            let mut app = App::initialize(&options)?;
            ui::run(&mut app)
        }
        CliAction::Install(options) => {
            init_stderr_logging();
            run_headless(options)
        }
        CliAction::Paths(options) => list_paths(&options),
        CliAction::Help => {
            print_help();
            Ok(())
        }
        CliAction::Version => {
            println!("smp-installer v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn parse_args(args: &[String]) -> Result<CliAction> {
    let Some(head) = args.first() else {
        return Ok(CliAction::Ui(StartupOptions::default()));
    };

    match head.as_str() {
        "--help" | "-h" | "help" => Ok(CliAction::Help),
        "--version" | "-V" | "version" => Ok(CliAction::Version),
        "ui" => Ok(CliAction::Ui(parse_options(&args[1..])?.startup)),
        "paths" => Ok(CliAction::Paths(parse_options(&args[1..])?.startup)),
        "install" => Ok(CliAction::Install(parse_options(&args[1..])?)),
        other => bail!("Unknown command: {other} (see --help)"),
    }
}

fn parse_options(args: &[String]) -> Result<HeadlessOptions> {
    let mut options = HeadlessOptions {
        launcher: LauncherKind::Official,
        startup: StartupOptions::default(),
        select_profile: true,
    };
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        let (flag, inline) = match arg.split_once('=') {
            Some((flag, value)) if flag.starts_with("--") => (flag, Some(value.to_string())),
            _ => (arg.as_str(), None),
        };
        let mut value = |name: &str| -> Result<String> {
            match inline.clone().or_else(|| iter.next().cloned()) {
                Some(value) => Ok(value),
                None => bail!("{name} requires a value"),
            }
        };
        match flag {
            "--launcher" => {
                let raw = value("--launcher")?;
                options.launcher = LauncherKind::parse(&raw).with_context(|| {
                    format!("Unknown launcher: {raw} (use official, sklauncher, or advanced)")
                })?;
            }
            "--archive" => options.startup.archive = Some(PathBuf::from(value("--archive")?)),
            "--config" => options.startup.config = Some(PathBuf::from(value("--config")?)),
            "--minecraft-dir" => {
                options.startup.launcher_dir = Some(PathBuf::from(value("--minecraft-dir")?));
            }
            "--no-select" => options.select_profile = false,
            _ => bail!("Unknown option: {arg}"),
        }
    }
    Ok(options)
}

fn run_headless(options: HeadlessOptions) -> Result<()> {
    let mut config = InstallerConfig::load(options.startup.config.as_deref())?;
    if !options.select_profile {
        config.select_profile = false;
    }
    let paths = LauncherPaths::detect(&config.tool_name, options.startup.launcher_dir.as_deref())?;
    let archive = bundle::load_archive(options.startup.archive.as_deref())?;

    let job = if options.launcher.uses_profile_file() {
        InstallJob::Full(InstallPlan::new(&config, &paths))
    } else {
        InstallJob::ExtractOnly {
            target: paths.desktop_dir.clone(),
        }
    };

    let mut phase = InstallPhase::Idle;
    let result = install::run_job(&job, &archive, |event| match event {
        InstallEvent::Phase(next) => phase = next,
        InstallEvent::Line(text) if phase == InstallPhase::Failed => eprintln!("error: {text}"),
        InstallEvent::Line(text) => println!("{text}"),
        InstallEvent::Finished(_) => {}
    });
    result.with_context(|| format!("install of {} failed", config.profile_name))?;

    if let InstallJob::ExtractOnly { target } = &job {
        println!(
            "Files are in {}. Create a Fabric {} profile for Minecraft {} in your launcher and copy them over.",
            target.display(),
            config.loader_version,
            config.game_version
        );
    }
    Ok(())
}

fn list_paths(options: &StartupOptions) -> Result<()> {
    let config = InstallerConfig::load(options.config.as_deref())?;
    let paths = LauncherPaths::detect(&config.tool_name, options.launcher_dir.as_deref())?;
    let loader_id = config.loader_id();
    println!("Launcher dir: {}", paths.launcher_root.display());
    println!("Profiles: {}", paths.profiles_document().display());
    println!("Loader descriptor: {}", paths.loader_descriptor(&loader_id).display());
    println!(
        "Instance: {}",
        paths.installed_content(&config.content_folder).display()
    );
    println!("Staging: {}", paths.staging_root.display());
    println!("Desktop: {}", paths.desktop_dir.display());
    match config::base_data_dir() {
        Ok(dir) => println!("Installer data: {}", dir.display()),
        Err(err) => println!("Warning: {err}"),
    }
    Ok(())
}

fn init_stderr_logging() {
    let _ = env_logger::Builder::from_env(Env::default().default_filter_or("warn")).try_init();
}

/// The TUI owns the terminal, so diagnostics go to a file in the data dir.
fn init_file_logging() {
    let Ok(dir) = config::ensure_data_dir() else {
        return;
    };
    let Ok(file) = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("diagnostics.log"))
    else {
        return;
    };
    let _ = env_logger::Builder::from_env(Env::default().default_filter_or(LOG_FILTER))
        .target(Target::Pipe(Box::new(file)))
        .try_init();
}

fn print_help() {
    println!("smp-installer v{}", env!("CARGO_PKG_VERSION"));
    println!("Usage:");
    println!("  smp-installer                   Launch the installer TUI");
    println!("  smp-installer install           Install without the TUI");
    println!("  smp-installer paths             Show detected paths");
    println!();
    println!("Options:");
    println!("  --launcher <kind>               official | sklauncher | advanced (install only)");
    println!("  --archive <path>                Install from this archive instead of the bundled one");
    println!("  --config <path>                 Read installer settings from this file");
    println!("  --minecraft-dir <path>          Use this launcher directory");
    println!("  --no-select                     Do not make the new profile the selected one");
    println!("  -h, --help                      Show help");
    println!("  -V, --version                   Show version");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn no_arguments_opens_the_tui() {
        assert_eq!(
            parse_args(&[]).unwrap(),
            CliAction::Ui(StartupOptions::default())
        );
    }

    #[test]
    fn install_flags_are_collected() {
        let action = parse_args(&args(&[
            "install",
            "--launcher=advanced",
            "--archive",
            "/tmp/pack.zip",
            "--minecraft-dir",
            "/tmp/mc",
            "--no-select",
        ]))
        .unwrap();

        let CliAction::Install(options) = action else {
            panic!("expected install action");
        };
        assert_eq!(options.launcher, LauncherKind::Advanced);
        assert_eq!(options.startup.archive, Some(PathBuf::from("/tmp/pack.zip")));
        assert_eq!(options.startup.launcher_dir, Some(PathBuf::from("/tmp/mc")));
        assert_eq!(options.startup.config, None);
        assert!(!options.select_profile);
    }

    #[test]
    fn bad_input_is_rejected() {
        assert!(parse_args(&args(&["install", "--launcher", "tlauncher"])).is_err());
        assert!(parse_args(&args(&["install", "--archive"])).is_err());
        assert!(parse_args(&args(&["install", "--force"])).is_err());
        assert!(parse_args(&args(&["uninstall"])).is_err());
    }

    #[test]
    fn help_and_version_short_circuit() {
        assert_eq!(parse_args(&args(&["-h"])).unwrap(), CliAction::Help);
        assert_eq!(parse_args(&args(&["version"])).unwrap(), CliAction::Version);
    }
}

use crate::{
    bundle,
    config::{self, InstallerConfig},
    install::{self, InstallEvent, InstallJob, InstallOutcome, InstallPhase, InstallPlan},
    paths::LauncherPaths,
};
use anyhow::Result;
use arboard::Clipboard;
use std::{
    borrow::Cow,
    fs,
    io::Write,
    path::{Path, PathBuf},
    sync::mpsc::{Receiver, TryRecvError},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LauncherKind {
    Official,
    SkLauncher,
    Advanced,
}

impl LauncherKind {
    pub const ALL: [LauncherKind; 3] = [
        LauncherKind::Official,
        LauncherKind::SkLauncher,
        LauncherKind::Advanced,
    ];

    pub fn label(self) -> &'static str {
        match self {
            LauncherKind::Official => "Normal Minecraft Launcher",
            LauncherKind::SkLauncher => "SKlauncher",
            LauncherKind::Advanced => "Modrinth, CurseForge, Prism, MultiMC, or the likes",
        }
    }

    pub fn short_label(self) -> &'static str {
        match self {
            LauncherKind::Official => "Minecraft Launcher",
            LauncherKind::SkLauncher => "SKlauncher",
            LauncherKind::Advanced => "your launcher",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "official" | "vanilla" | "minecraft" => Some(LauncherKind::Official),
            "sklauncher" | "sk" => Some(LauncherKind::SkLauncher),
            "advanced" | "prism" | "multimc" | "modrinth" | "curseforge" => {
                Some(LauncherKind::Advanced)
            }
            _ => None,
        }
    }

    /// Launchers that read `launcher_profiles.json` get the full install.
    pub fn uses_profile_file(self) -> bool {
        !matches!(self, LauncherKind::Advanced)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    ChooseLauncher,
    Confirm,
    Install,
    ExtractOnly,
}

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartupOptions {
    pub archive: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub launcher_dir: Option<PathBuf>,
}

pub struct App {
    pub config: InstallerConfig,
    pub paths: LauncherPaths,
    pub screen: Screen,
    pub selected: usize,
    pub phase: InstallPhase,
    pub outcome: Option<InstallOutcome>,
    pub logs: Vec<LogEntry>,
    pub log_scroll: usize,
    pub status: String,
    pub should_quit: bool,
    archive: Cow<'static, [u8]>,
    install_rx: Option<Receiver<InstallEvent>>,
    log_path: Option<PathBuf>,
    clipboard: Option<Clipboard>,
}

impl App {
    pub fn initialize(options: &StartupOptions) -> Result<Self> {
        let config = InstallerConfig::load(options.config.as_deref())?;
        let paths = LauncherPaths::detect(&config.tool_name, options.launcher_dir.as_deref())?;
        let archive = bundle::load_archive(options.archive.as_deref())?;
        let log_path = config::ensure_data_dir()
            .ok()
            .map(|dir| dir.join("installer.log"));
        Ok(Self::new(config, paths, archive, log_path))
    }

    pub fn new(
        config: InstallerConfig,
        paths: LauncherPaths,
        archive: Cow<'static, [u8]>,
        log_path: Option<PathBuf>,
    ) -> Self {
        Self {
            config,
            paths,
            screen: Screen::ChooseLauncher,
            selected: 0,
            phase: InstallPhase::Idle,
            outcome: None,
            logs: Vec::new(),
            log_scroll: 0,
            status: "Pick your launcher".to_string(),
            should_quit: false,
            archive,
            install_rx: None,
            log_path,
            clipboard: None,
        }
    }

    pub fn launcher(&self) -> LauncherKind {
        LauncherKind::ALL[self.selected.min(LauncherKind::ALL.len() - 1)]
    }

    pub fn select_next(&mut self) {
        if self.screen == Screen::ChooseLauncher {
            self.selected = (self.selected + 1) % LauncherKind::ALL.len();
        }
    }

    pub fn select_prev(&mut self) {
        if self.screen == Screen::ChooseLauncher {
            self.selected = self
                .selected
                .checked_sub(1)
                .unwrap_or(LauncherKind::ALL.len() - 1);
        }
    }

    pub fn is_running(&self) -> bool {
        self.install_rx.is_some()
    }

    /// Enter on the current screen.
    pub fn accept(&mut self) {
        match self.screen {
            Screen::ChooseLauncher => {
                self.screen = Screen::Confirm;
                self.status = "Confirm or cancel".to_string();
            }
            Screen::Confirm => {
                if self.launcher().uses_profile_file() {
                    self.screen = Screen::Install;
                    self.status = "Press Enter to start installing".to_string();
                } else {
                    self.screen = Screen::ExtractOnly;
                    self.start_extract_only();
                }
            }
            Screen::Install => self.start_install(),
            Screen::ExtractOnly => {}
        }
    }

    /// Esc / cancel. Backing out of the confirmation quits, like closing the window.
    pub fn cancel(&mut self) {
        match self.screen {
            Screen::ChooseLauncher | Screen::Confirm => self.should_quit = true,
            Screen::Install | Screen::ExtractOnly => self.request_quit(),
        }
    }

    pub fn request_quit(&mut self) {
        if self.is_running() {
            self.status = "Installation in progress, please wait for it to finish".to_string();
            return;
        }
        self.should_quit = true;
    }

    pub fn can_start_install(&self) -> bool {
        self.screen == Screen::Install
            && !self.is_running()
            && self.outcome != Some(InstallOutcome::Installed)
    }

    pub fn start_install(&mut self) {
        if !self.can_start_install() {
            return;
        }
        let plan = InstallPlan::new(&self.config, &self.paths);
        self.log_info(format!(
            "Installing {} for {}",
            self.config.profile_name,
            self.launcher().short_label()
        ));
        self.begin(InstallJob::Full(plan));
    }

    fn start_extract_only(&mut self) {
        if self.is_running() {
            return;
        }
        let target = self.paths.desktop_dir.clone();
        self.begin(InstallJob::ExtractOnly { target });
    }

    fn begin(&mut self, job: InstallJob) {
        self.outcome = None;
        self.phase = InstallPhase::Idle;
        self.status = "Installing...".to_string();
        self.install_rx = Some(install::spawn_install(job, self.archive.clone()));
    }

    pub fn poll_install(&mut self) {
        let Some(rx) = self.install_rx.as_ref() else {
            return;
        };
        let mut events = Vec::new();
        let mut disconnected = false;
        loop {
            match rx.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    disconnected = true;
                    break;
                }
            }
        }

        for event in events {
            self.handle_install_event(event);
        }

        if disconnected && self.install_rx.is_some() {
            self.install_rx = None;
            if !self.phase.is_terminal() {
                self.phase = InstallPhase::Failed;
                self.status = "Installer stopped unexpectedly".to_string();
                self.log_error("Installer stopped unexpectedly".to_string());
            }
        }
    }

    pub fn handle_install_event(&mut self, event: InstallEvent) {
        match event {
            InstallEvent::Phase(phase) => {
                self.phase = phase;
                if !phase.is_terminal() {
                    self.status = format!("{}...", phase.label());
                }
            }
            InstallEvent::Line(text) => {
                if self.phase == InstallPhase::Failed {
                    self.log_error(text);
                } else {
                    self.log_info(text);
                }
            }
            InstallEvent::Finished(outcome) => {
                self.install_rx = None;
                match &outcome {
                    InstallOutcome::Installed => {
                        self.status = "Installed. You may close this window now".to_string();
                    }
                    InstallOutcome::Extracted { target } => {
                        self.status = "Files dropped off, the rest is your job".to_string();
                        self.log_info(format!(
                            "Alright, I dropped the files off at {}. The rest is your job.",
                            target.display()
                        ));
                    }
                    InstallOutcome::Failed { phase, .. } => {
                        self.status = format!(
                            "Install failed while {}. Press Enter to retry",
                            phase.label().to_lowercase()
                        );
                    }
                }
                self.outcome = Some(outcome);
            }
        }
    }

    pub fn scroll_log_up(&mut self, lines: usize) {
        self.log_scroll = self.log_scroll.saturating_add(lines);
    }

    pub fn scroll_log_down(&mut self, lines: usize) {
        self.log_scroll = self.log_scroll.saturating_sub(lines);
    }

    pub fn log_info(&mut self, message: String) {
        self.push_log(LogLevel::Info, message);
    }

    pub fn log_warn(&mut self, message: String) {
        self.push_log(LogLevel::Warn, message);
    }

    pub fn log_error(&mut self, message: String) {
        self.push_log(LogLevel::Error, message);
    }

    /// Everything logged so far, one line per entry.
    pub fn log_text(&self) -> String {
        self.logs
            .iter()
            .map(|entry| format!("[{}] {}", log_level_label(entry.level), entry.message))
            .collect::<Vec<String>>()
            .join("\n")
    }

    fn push_log(&mut self, level: LogLevel, message: String) {
        if self.log_scroll > 0 {
            self.log_scroll = self.log_scroll.saturating_add(1);
        }

        if let Some(path) = &self.log_path {
            let _ = append_log_file(path, level, &message);
        }
        self.logs.push(LogEntry { level, message });
    }

    pub fn copy_log_to_clipboard(&mut self) {
        let text = self.log_text();
        if text.is_empty() {
            self.status = "Log is empty".to_string();
            return;
        }
        if self.clipboard.is_none() {
            match Clipboard::new() {
                Ok(clipboard) => self.clipboard = Some(clipboard),
                Err(err) => {
                    self.status = format!("Clipboard unavailable: {err}");
                    return;
                }
            }
        }
        let Some(clipboard) = self.clipboard.as_mut() else {
            return;
        };
        match clipboard.set_text(text) {
            Ok(()) => self.status = "Log copied to clipboard".to_string(),
            Err(err) => {
                self.status = format!("Clipboard copy failed: {err}");
                self.log_warn(format!("Clipboard copy failed: {err}"));
            }
        }
    }

    pub fn prompt(&self) -> String {
        match self.screen {
            Screen::ChooseLauncher => format!(
                "Hello! This installer will put {} on your computer without you having to do much of anything.\n\
                 First of all, which Minecraft launcher are you using?\n\
                 This helps prepare the modpack.",
                self.config.profile_name
            ),
            Screen::Confirm if self.launcher().uses_profile_file() => format!(
                "Confirm to install the modpack for {}.",
                self.launcher().short_label()
            ),
            Screen::Confirm | Screen::ExtractOnly => format!(
                "If you are using an advanced launcher, you know how to do this yourself.\n\
                 The instance files (mods, configs, shaders etc.) go onto your Desktop:\n  {}\n\
                 Create a profile in your launcher (Fabric Loader {}, Minecraft {})\n\
                 and copy all the instance files over yourself.",
                self.paths.desktop_dir.display(),
                self.config.loader_version,
                self.config.game_version
            ),
            Screen::Install => format!(
                "Installing {} into {}",
                self.config.profile_name,
                self.paths.launcher_root.display()
            ),
        }
    }
}

fn log_level_label(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Info => "INFO",
        LogLevel::Warn => "WARN",
        LogLevel::Error => "ERROR",
    }
}

fn append_log_file(path: &Path, level: LogLevel, message: &str) -> std::io::Result<()> {
    let label = log_level_label(level);
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    writeln!(file, "[{label}] {message}")
}

use crate::{
    archive::{self, StageError},
    bundle,
    config::InstallerConfig,
    fetch::{self, FetchError},
    paths::LauncherPaths,
    profiles::{self, MergeError, ProfileRecord},
    relocate::{self, RelocateError, RelocateOutcome},
};
use log::{error, info, warn};
use std::{
    borrow::Cow,
    fs,
    path::{Path, PathBuf},
    sync::mpsc::{self, Receiver},
    thread,
};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallPhase {
    Idle,
    Extracting,
    FetchingMetadata,
    WritingProfile,
    Relocating,
    Done,
    Failed,
}

impl InstallPhase {
    pub fn label(self) -> &'static str {
        match self {
            InstallPhase::Idle => "Waiting",
            InstallPhase::Extracting => "Extracting",
            InstallPhase::FetchingMetadata => "Downloading loader",
            InstallPhase::WritingProfile => "Writing profile",
            InstallPhase::Relocating => "Moving files",
            InstallPhase::Done => "Done",
            InstallPhase::Failed => "Failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, InstallPhase::Done | InstallPhase::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    Installed,
    Extracted { target: PathBuf },
    Failed { phase: InstallPhase, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallEvent {
    Phase(InstallPhase),
    Line(String),
    Finished(InstallOutcome),
}

#[derive(Debug, Error)]
pub enum InstallError {
    #[error("Extraction failed: {0}")]
    Stage(#[from] StageError),
    #[error("Downloading loader metadata failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("Creating launcher profile failed: {0}")]
    Merge(#[from] MergeError),
    #[error("Moving instance files failed: {0}")]
    Relocate(#[from] RelocateError),
}

impl InstallError {
    pub fn phase(&self) -> InstallPhase {
        match self {
            InstallError::Stage(_) => InstallPhase::Extracting,
            InstallError::Fetch(_) => InstallPhase::FetchingMetadata,
            InstallError::Merge(_) => InstallPhase::WritingProfile,
            InstallError::Relocate(_) => InstallPhase::Relocating,
        }
    }
}

/// Everything one full install run needs, resolved up front.
#[derive(Debug, Clone)]
pub struct InstallPlan {
    pub staging_root: PathBuf,
    pub loader_id: String,
    pub loader_url: String,
    pub loader_descriptor: PathBuf,
    pub profiles_document: PathBuf,
    pub profile_id: String,
    pub record: ProfileRecord,
    pub select_profile: bool,
    pub unsaved_profiles: PathBuf,
    pub staged_content: PathBuf,
    pub launcher_root: PathBuf,
}

impl InstallPlan {
    pub fn new(config: &InstallerConfig, paths: &LauncherPaths) -> Self {
        let loader_id = config.loader_id();
        let mut record = ProfileRecord::custom(
            &config.profile_name,
            &loader_id,
            &paths.installed_content(&config.content_folder),
        );
        record.icon = bundle::icon_data_uri();
        record.java_args = config.java_args.clone();
        record.memory_max = config.memory_max;

        Self {
            staging_root: paths.staging_root.clone(),
            loader_url: config.loader_profile_url(),
            loader_descriptor: paths.loader_descriptor(&loader_id),
            loader_id,
            profiles_document: paths.profiles_document(),
            profile_id: config.profile_id.clone(),
            record,
            select_profile: config.select_profile,
            unsaved_profiles: paths.unsaved_profiles(),
            staged_content: paths.staged_content(&config.content_folder),
            launcher_root: paths.launcher_root.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum InstallJob {
    /// Stage, fetch the loader, write the profile, move the instance into place.
    Full(InstallPlan),
    /// Only unpack the archive into `target` for launchers that manage their own instances.
    ExtractOnly { target: PathBuf },
}

/// Runs `job` on a background thread; events arrive on the returned channel.
pub fn spawn_install(job: InstallJob, archive: Cow<'static, [u8]>) -> Receiver<InstallEvent> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = run_job(&job, &archive, |event| {
            let _ = tx.send(event);
        });
    });
    rx
}

pub fn run_job(
    job: &InstallJob,
    archive: &[u8],
    emit: impl FnMut(InstallEvent),
) -> Result<(), InstallError> {
    match job {
        InstallJob::Full(plan) => run_install(plan, archive, emit),
        InstallJob::ExtractOnly { target } => run_extract_only(target.clone(), archive, emit),
    }
}

/// Runs every step in order and stops at the first failure.
///
/// Completed steps are not undone; each step tolerates being repeated, so a
/// failed run can simply be started again.
pub fn run_install(
    plan: &InstallPlan,
    archive: &[u8],
    mut emit: impl FnMut(InstallEvent),
) -> Result<(), InstallError> {
    info!("install of {} started", plan.profile_id);
    match install_steps(plan, archive, &mut emit) {
        Ok(()) => {
            emit(InstallEvent::Phase(InstallPhase::Done));
            emit(line("Finished installing"));
            emit(line(
                "You may close this window now. Your launcher will have a new profile with this modpack installed",
            ));
            emit(InstallEvent::Finished(InstallOutcome::Installed));
            Ok(())
        }
        Err(err) => {
            announce_failure(&err, &mut emit);
            if let InstallError::Merge(merge) = &err {
                if let Some(document) = merge.unsaved_document() {
                    keep_unsaved_document(plan, document, &mut emit);
                }
            }
            finish_failure(&err, &mut emit);
            Err(err)
        }
    }
}

fn install_steps(
    plan: &InstallPlan,
    archive: &[u8],
    emit: &mut impl FnMut(InstallEvent),
) -> Result<(), InstallError> {
    emit(InstallEvent::Phase(InstallPhase::Extracting));
    emit(line("Extracting files..."));
    archive::claim_staging_root(&plan.staging_root)?;
    let staged = archive::stage(archive, &plan.staging_root)?;
    emit(line(format!(
        "Successfully extracted {} files into {}",
        staged.files,
        plan.staging_root.display()
    )));

    emit(InstallEvent::Phase(InstallPhase::FetchingMetadata));
    emit(line(format!("Downloading {}...", plan.loader_id)));
    fetch::fetch_and_store(&plan.loader_url, &plan.loader_descriptor)?;
    emit(line(format!("Downloaded {}", plan.loader_id)));

    emit(InstallEvent::Phase(InstallPhase::WritingProfile));
    emit(line("Creating launcher profile..."));
    profiles::merge_profile(
        &plan.profiles_document,
        &plan.profile_id,
        &plan.record,
        plan.select_profile,
    )?;
    emit(line(format!("Created launcher profile \"{}\"", plan.record.name)));

    emit(InstallEvent::Phase(InstallPhase::Relocating));
    emit(line("Moving mods, shaders and resourcepacks..."));
    match relocate::relocate(&plan.staged_content, &plan.launcher_root)? {
        RelocateOutcome::Moved { destination } => {
            emit(line(format!("Moved everything over to {}", destination.display())));
        }
        RelocateOutcome::AlreadyInstalled { destination } => {
            emit(line(format!(
                "{} is already installed, leaving it as it is",
                destination.display()
            )));
        }
    }
    Ok(())
}

/// Unpacks the archive into `target` and nothing else.
pub fn run_extract_only(
    target: PathBuf,
    archive: &[u8],
    mut emit: impl FnMut(InstallEvent),
) -> Result<(), InstallError> {
    emit(InstallEvent::Phase(InstallPhase::Extracting));
    emit(line(format!("Extracting files to {}...", target.display())));
    match archive::stage(archive, &target) {
        Ok(report) => {
            emit(line(format!("Extracted {} files", report.files)));
            emit(InstallEvent::Phase(InstallPhase::Done));
            emit(InstallEvent::Finished(InstallOutcome::Extracted { target }));
            Ok(())
        }
        Err(err) => {
            let err = InstallError::from(err);
            announce_failure(&err, &mut emit);
            finish_failure(&err, &mut emit);
            Err(err)
        }
    }
}

fn announce_failure(err: &InstallError, emit: &mut impl FnMut(InstallEvent)) {
    error!("{err}");
    emit(InstallEvent::Phase(InstallPhase::Failed));
    emit(line(err.to_string()));
}

fn finish_failure(err: &InstallError, emit: &mut impl FnMut(InstallEvent)) {
    emit(InstallEvent::Finished(InstallOutcome::Failed {
        phase: err.phase(),
        message: err.to_string(),
    }));
}

/// Saves the merged profile document next to the installer data, or prints it
/// into the log when even that fails.
fn keep_unsaved_document(
    plan: &InstallPlan,
    document: &str,
    emit: &mut impl FnMut(InstallEvent),
) {
    match save_copy(&plan.unsaved_profiles, document) {
        Ok(()) => {
            warn!("kept unsaved profiles at {}", plan.unsaved_profiles.display());
            emit(line(format!(
                "The updated launcher profiles were saved to {}. Copy it over {} to finish the profile by hand",
                plan.unsaved_profiles.display(),
                plan.profiles_document.display()
            )));
        }
        Err(err) => {
            warn!(
                "could not keep unsaved profiles at {}: {err}",
                plan.unsaved_profiles.display()
            );
            emit(line(format!(
                "The updated launcher profiles could not be saved either. Put this into {} by hand:",
                plan.profiles_document.display()
            )));
            for text in document.lines() {
                emit(line(text));
            }
        }
    }
}

fn save_copy(path: &Path, document: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, document)
}

fn line(text: impl Into<String>) -> InstallEvent {
    InstallEvent::Line(text.into())
}

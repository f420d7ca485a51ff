use crate::planner::{assemble_entries, split_name, CollisionError, Pairing, PlanEntry, RenamePlan};
use crate::rename_log::{read_log, write_log, LogError, RenameLog};
use crate::scan::{scan_directory, ScanError};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ExecState {
    Planned,
    Staged,
    Committed,
    RolledBack,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StrandedFile {
    pub original: PathBuf,
    pub current: PathBuf,
}

#[derive(Debug, Error)]
pub enum ApplyError {
    #[error(
        "failed to move {} aside to {}; every file was restored",
        .source_path.display(),
        .temp_path.display()
    )]
    Stage {
        source_path: PathBuf,
        temp_path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(
        "failed to rename {} to {}; every file was restored",
        .temp_path.display(),
        .target_path.display()
    )]
    Commit {
        temp_path: PathBuf,
        target_path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(
        "{cause}; {} file(s) could not be restored and need manual attention:\n{}",
        .stranded.len(),
        format_stranded(.stranded)
    )]
    Unrecoverable {
        cause: String,
        stranded: Vec<StrandedFile>,
    },
    #[error("files were renamed but the rename log could not be written")]
    LogWrite(#[source] LogError),
}

#[derive(Debug, Error)]
pub enum UndoError {
    #[error(transparent)]
    Log(#[from] LogError),
    #[error(
        "rename log mixes folders ({} and {})",
        .first.display(),
        .other.display()
    )]
    MixedDirectories { first: PathBuf, other: PathBuf },
    #[error("{} no longer exists; the folder changed after the rename", .0.display())]
    Missing(PathBuf),
    #[error("cannot undo: {0}")]
    Collision(#[from] CollisionError),
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Apply(#[from] ApplyError),
    #[error("files were restored but the rename log {} could not be removed", .path.display())]
    RemoveLog {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyResult {
    pub applied: usize,
    pub unchanged: usize,
    pub log_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UndoResult {
    pub restored: usize,
}

pub fn apply_plan(plan: &RenamePlan) -> Result<ApplyResult, ApplyError> {
    let applied = execute_plan(plan)?;
    let unchanged = plan.entries.len() - applied;
    if applied == 0 {
        return Ok(ApplyResult {
            applied,
            unchanged,
            log_path: None,
        });
    }

    let log = RenameLog::from_plan(plan, Local::now());
    let log_path = write_log(&plan.dir, &log).map_err(ApplyError::LogWrite)?;
    info!(path = %log_path.display(), entries = log.entries.len(), "rename log saved");

    Ok(ApplyResult {
        applied,
        unchanged,
        log_path: Some(log_path),
    })
}

pub fn plan_undo(log_path: &Path) -> Result<RenamePlan, UndoError> {
    let log = read_log(log_path)?;
    let Some(first) = log.entries.first() else {
        return Ok(RenamePlan {
            dir: log_path.parent().unwrap_or(Path::new(".")).to_path_buf(),
            template: None,
            entries: Vec::new(),
        });
    };

    let dir = parent_of(&first.target);
    for entry in &log.entries {
        for path in [&entry.source, &entry.target] {
            let other = parent_of(path);
            if other != dir {
                return Err(UndoError::MixedDirectories {
                    first: dir.clone(),
                    other,
                });
            }
        }
    }

    let listing = scan_directory(&dir)?;
    let mut pairings = Vec::with_capacity(log.entries.len());
    for entry in &log.entries {
        let current = file_name_of(&entry.target);
        if !listing.contains(&current) {
            return Err(UndoError::Missing(entry.target.clone()));
        }
        let (base, extension) = split_name(&file_name_of(&entry.source));
        pairings.push(Pairing {
            source: current,
            base,
            extension,
        });
    }

    Ok(RenamePlan {
        entries: assemble_entries(&dir, pairings, &listing)?,
        dir,
        template: None,
    })
}

// The log goes too, so the folder ends up exactly as it was before the rename.
pub fn undo_from_log(log_path: &Path) -> Result<UndoResult, UndoError> {
    let plan = plan_undo(log_path)?;
    let restored = execute_plan(&plan)?;

    fs::remove_file(log_path).map_err(|source| UndoError::RemoveLog {
        path: log_path.to_path_buf(),
        source,
    })?;
    info!(restored, "undo complete");

    Ok(UndoResult { restored })
}

fn execute_plan(plan: &RenamePlan) -> Result<usize, ApplyError> {
    execute_plan_with(plan, |from, to| fs::rename(from, to))
}

fn execute_plan_with<M>(plan: &RenamePlan, mover: M) -> Result<usize, ApplyError>
where
    M: FnMut(&Path, &Path) -> io::Result<()>,
{
    let entries: Vec<&PlanEntry> = plan.entries.iter().filter(|e| e.changed).collect();
    if entries.is_empty() {
        return Ok(0);
    }

    let mut run = TwoPhase::new(entries, mover);
    run.stage()?;
    run.commit()?;
    Ok(run.committed)
}

// `staged` and `committed` are high-water marks: rollback only replays the
// prefix that actually moved.
struct TwoPhase<'a, M> {
    entries: Vec<&'a PlanEntry>,
    mover: M,
    state: ExecState,
    staged: usize,
    committed: usize,
}

impl<'a, M> TwoPhase<'a, M>
where
    M: FnMut(&Path, &Path) -> io::Result<()>,
{
    fn new(entries: Vec<&'a PlanEntry>, mover: M) -> Self {
        Self {
            entries,
            mover,
            state: ExecState::Planned,
            staged: 0,
            committed: 0,
        }
    }

    // A plain rename replaces an existing destination on most platforms;
    // anything sitting there now appeared after planning.
    fn move_no_clobber(&mut self, from: &Path, to: &Path) -> io::Result<()> {
        if fs::symlink_metadata(to).is_ok() {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} appeared during the rename", to.display()),
            ));
        }
        (self.mover)(from, to)
    }

    fn stage(&mut self) -> Result<(), ApplyError> {
        debug_assert_eq!(self.state, ExecState::Planned);
        while self.staged < self.entries.len() {
            let entry = self.entries[self.staged];
            debug!(
                from = %entry.source_path.display(),
                to = %entry.temp_path.display(),
                "stage"
            );
            if let Err(source) = self.move_no_clobber(&entry.source_path, &entry.temp_path) {
                let error = ApplyError::Stage {
                    source_path: entry.source_path.clone(),
                    temp_path: entry.temp_path.clone(),
                    source,
                };
                return Err(self.roll_back(error));
            }
            self.staged += 1;
        }
        self.state = ExecState::Staged;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), ApplyError> {
        debug_assert_eq!(self.state, ExecState::Staged);
        while self.committed < self.entries.len() {
            let entry = self.entries[self.committed];
            debug!(
                from = %entry.temp_path.display(),
                to = %entry.target_path.display(),
                "commit"
            );
            if let Err(source) = self.move_no_clobber(&entry.temp_path, &entry.target_path) {
                let error = ApplyError::Commit {
                    temp_path: entry.temp_path.clone(),
                    target_path: entry.target_path.clone(),
                    source,
                };
                return Err(self.roll_back(error));
            }
            self.committed += 1;
        }
        self.state = ExecState::Committed;
        info!(renamed = self.committed, "commit complete");
        Ok(())
    }

    fn roll_back(&mut self, error: ApplyError) -> ApplyError {
        warn!(
            staged = self.staged,
            committed = self.committed,
            %error,
            "rolling back"
        );
        let mut stranded = Vec::new();
        let mut at_temp = vec![true; self.staged];

        for index in (0..self.committed).rev() {
            let entry = self.entries[index];
            if let Err(err) = (self.mover)(&entry.target_path, &entry.temp_path) {
                warn!(path = %entry.target_path.display(), %err, "rollback step failed");
                at_temp[index] = false;
                stranded.push(StrandedFile {
                    original: entry.source_path.clone(),
                    current: entry.target_path.clone(),
                });
            }
        }

        for index in (0..self.staged).rev() {
            if !at_temp[index] {
                continue;
            }
            let entry = self.entries[index];
            if let Err(err) = (self.mover)(&entry.temp_path, &entry.source_path) {
                warn!(path = %entry.temp_path.display(), %err, "rollback step failed");
                stranded.push(StrandedFile {
                    original: entry.source_path.clone(),
                    current: entry.temp_path.clone(),
                });
            }
        }

        self.state = ExecState::RolledBack;
        self.staged = 0;
        self.committed = 0;

        if stranded.is_empty() {
            error
        } else {
            ApplyError::Unrecoverable {
                cause: failed_step(&error),
                stranded,
            }
        }
    }
}

// The Stage/Commit messages promise a clean rollback, which no longer holds.
fn failed_step(error: &ApplyError) -> String {
    match error {
        ApplyError::Stage {
            source_path,
            temp_path,
            source,
        } => format!(
            "failed to move {} aside to {}: {source}",
            source_path.display(),
            temp_path.display()
        ),
        ApplyError::Commit {
            temp_path,
            target_path,
            source,
        } => format!(
            "failed to rename {} to {}: {source}",
            temp_path.display(),
            target_path.display()
        ),
        other => other.to_string(),
    }
}

fn format_stranded(stranded: &[StrandedFile]) -> String {
    stranded
        .iter()
        .map(|file| {
            format!(
                "  {} is now at {}",
                file.original.display(),
                file.current.display()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn parent_of(path: &Path) -> PathBuf {
    path.parent().unwrap_or(Path::new(".")).to_path_buf()
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default()
}

use crate::planner::RenamePlan;
use chrono::{DateTime, Local, SubsecRound};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LogError {
    #[error("failed to read rename log {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("rename log {path} is malformed")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize rename log")]
    Serialize(#[source] serde_json::Error),
    #[error("failed to write rename log {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogEntry {
    pub source: PathBuf,
    pub target: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RenameLog {
    pub created_at: DateTime<Local>,
    pub entries: Vec<LogEntry>,
}

impl RenameLog {
    pub fn from_plan(plan: &RenamePlan, created_at: DateTime<Local>) -> Self {
        Self {
            created_at: created_at.trunc_subsecs(0),
            entries: plan
                .entries
                .iter()
                .filter(|entry| entry.changed)
                .map(|entry| LogEntry {
                    source: entry.source_path.clone(),
                    target: entry.target_path.clone(),
                })
                .collect(),
        }
    }

    pub fn file_stem(&self) -> String {
        self.created_at
            .format("rename_log_%Y%m%d_%H%M%S")
            .to_string()
    }
}

pub fn write_log(dir: &Path, log: &RenameLog) -> Result<PathBuf, LogError> {
    let body = serde_json::to_string_pretty(log).map_err(LogError::Serialize)?;
    let stem = log.file_stem();

    let mut n = 0usize;
    loop {
        let name = if n == 0 {
            format!("{stem}.json")
        } else {
            format!("{stem}_{n}.json")
        };
        let path = dir.join(name);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                file.write_all(body.as_bytes())
                    .and_then(|_| file.sync_all())
                    .map_err(|source| LogError::Write {
                        path: path.clone(),
                        source,
                    })?;
                return Ok(path);
            }
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => n += 1,
            Err(source) => return Err(LogError::Write { path, source }),
        }
    }
}

pub fn read_log(path: &Path) -> Result<RenameLog, LogError> {
    let raw = fs::read_to_string(path).map_err(|source| LogError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| LogError::Malformed {
        path: path.to_path_buf(),
        source,
    })
}

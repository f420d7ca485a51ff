use crate::scan::DirListing;
use crate::template::Template;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CollisionError {
    #[error(
        "several files would be renamed to {target} (plan entries {indices:?}); adjust the template, padding or start number"
    )]
    Internal { target: String, indices: Vec<usize> },
    #[error("{target} already exists in the folder and is not one of the files being renamed")]
    External { target: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlanEntry {
    pub source_path: PathBuf,
    pub target_base_name: String,
    pub extension: String,
    pub target_path: PathBuf,
    pub temp_path: PathBuf,
    pub changed: bool,
}

impl PlanEntry {
    pub fn source_name(&self) -> String {
        file_name_of(&self.source_path)
    }

    pub fn target_name(&self) -> String {
        file_name_of(&self.target_path)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenamePlan {
    pub dir: PathBuf,
    pub template: Option<String>,
    pub entries: Vec<PlanEntry>,
}

impl RenamePlan {
    pub fn changed(&self) -> usize {
        self.entries.iter().filter(|e| e.changed).count()
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Pairing {
    pub source: String,
    pub base: String,
    pub extension: String,
}

pub fn plan_renames(
    dir: &Path,
    selected: &[String],
    template: &Template,
    start: u64,
    listing: &DirListing,
) -> Result<RenamePlan, CollisionError> {
    let pairings = selected
        .iter()
        .enumerate()
        .map(|(index, source)| Pairing {
            source: source.clone(),
            base: template.render(start, index as u64),
            extension: split_name(source).1,
        })
        .collect();

    Ok(RenamePlan {
        dir: dir.to_path_buf(),
        template: Some(template.source().to_string()),
        entries: assemble_entries(dir, pairings, listing)?,
    })
}

pub(crate) fn assemble_entries(
    dir: &Path,
    pairings: Vec<Pairing>,
    listing: &DirListing,
) -> Result<Vec<PlanEntry>, CollisionError> {
    let targets: Vec<String> = pairings
        .iter()
        .map(|p| format!("{}{}", p.base, p.extension))
        .collect();

    check_internal_collisions(&targets)?;

    let sources: HashSet<&str> = pairings.iter().map(|p| p.source.as_str()).collect();
    for target in &targets {
        if listing.contains(target) && !sources.contains(target.as_str()) {
            return Err(CollisionError::External {
                target: target.clone(),
            });
        }
    }

    let mut reserved: HashSet<String> = listing.entries.iter().cloned().collect();
    reserved.extend(pairings.iter().map(|p| p.source.clone()));
    reserved.extend(targets.iter().cloned());

    let mut entries = Vec::with_capacity(pairings.len());
    for (index, (pairing, target)) in pairings.into_iter().zip(targets).enumerate() {
        let temp = temp_name_for(index, &mut reserved);
        entries.push(PlanEntry {
            changed: pairing.source != target,
            source_path: dir.join(&pairing.source),
            target_base_name: pairing.base,
            extension: pairing.extension,
            target_path: dir.join(&target),
            temp_path: dir.join(temp),
        });
    }
    Ok(entries)
}

fn check_internal_collisions(targets: &[String]) -> Result<(), CollisionError> {
    let mut seen = BTreeMap::<&str, Vec<usize>>::new();
    for (index, target) in targets.iter().enumerate() {
        seen.entry(target.as_str()).or_default().push(index);
    }

    let duplicate = seen
        .into_iter()
        .filter(|(_, indices)| indices.len() > 1)
        .min_by_key(|(_, indices)| indices[0]);
    match duplicate {
        Some((target, indices)) => Err(CollisionError::Internal {
            target: target.to_string(),
            indices,
        }),
        None => Ok(()),
    }
}

// Fixed-size names: a long source name must not push its temp name past the
// file system's name limit.
fn temp_name_for(index: usize, reserved: &mut HashSet<String>) -> String {
    let mut candidate = format!(".picseq-{}.tmp", index);
    let mut n = 1usize;
    while reserved.contains(&candidate) {
        candidate = format!(".picseq-{}-{}.tmp", index, n);
        n += 1;
    }
    reserved.insert(candidate.clone());
    candidate
}

// Extension keeps its dot and case.
pub(crate) fn split_name(name: &str) -> (String, String) {
    let path = Path::new(name);
    match (path.file_stem(), path.extension()) {
        (Some(stem), Some(ext)) => (
            stem.to_string_lossy().to_string(),
            format!(".{}", ext.to_string_lossy()),
        ),
        _ => (name.to_string(), String::new()),
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default()
}

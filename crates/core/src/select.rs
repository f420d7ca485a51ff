use crate::messy::{contains_cjk, MessyRules};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

const PROPOSAL_EXAMPLES: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionCriteria {
    Prefix { prefixes: Vec<String> },
    Messy { include_cjk: bool },
}

impl SelectionCriteria {
    pub fn from_options(raw_prefixes: &[String], include_cjk: bool) -> Self {
        let prefixes = parse_prefixes(raw_prefixes);
        if prefixes.is_empty() {
            Self::Messy { include_cjk }
        } else {
            Self::Prefix { prefixes }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PrefixProposal {
    pub prefix: String,
    pub candidates: usize,
    pub files: Vec<String>,
    pub examples: Vec<String>,
}

impl PrefixProposal {
    pub fn count(&self) -> usize {
        self.files.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Files(Vec<String>),
    NoCandidates,
    Declined,
}

pub fn parse_prefixes(raw: &[String]) -> Vec<String> {
    raw.iter()
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn sort_filenames(names: &mut [String]) {
    names.sort_by(|a, b| a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b)));
}

pub fn select_by_prefix(images: &[String], prefixes: &[String]) -> Vec<String> {
    let mut selected: Vec<String> = images
        .iter()
        .filter(|name| prefixes.iter().any(|prefix| name.starts_with(prefix.as_str())))
        .cloned()
        .collect();
    sort_filenames(&mut selected);
    selected
}

pub fn messy_candidates(images: &[String], include_cjk: bool, rules: &MessyRules) -> Vec<String> {
    let mut candidates = Vec::new();
    for name in images {
        let stem = stem_of(name);
        if !include_cjk && contains_cjk(&stem) {
            debug!(file = %name, "skipping CJK file name");
            continue;
        }
        if let Some(signal) = rules.classify(&stem) {
            debug!(file = %name, ?signal, "messy file name");
            candidates.push(name.clone());
        }
    }
    sort_filenames(&mut candidates);
    candidates
}

pub fn propose_prefix(
    images: &[String],
    include_cjk: bool,
    rules: &MessyRules,
) -> Option<PrefixProposal> {
    let candidates = messy_candidates(images, include_cjk, rules);
    let stems: Vec<String> = candidates.iter().map(|name| stem_of(name)).collect();
    let prefix = most_common_prefix(&stems)?;

    let files: Vec<String> = candidates
        .iter()
        .zip(&stems)
        .filter(|(_, stem)| stem.starts_with(prefix.as_str()))
        .map(|(name, _)| name.clone())
        .collect();

    Some(PrefixProposal {
        prefix,
        candidates: candidates.len(),
        examples: files.iter().take(PROPOSAL_EXAMPLES).cloned().collect(),
        files,
    })
}

pub fn select_files<F>(
    images: &[String],
    criteria: &SelectionCriteria,
    rules: &MessyRules,
    mut confirm: F,
) -> Result<Selection>
where
    F: FnMut(&PrefixProposal) -> Result<bool>,
{
    match criteria {
        SelectionCriteria::Prefix { prefixes } => {
            let selected = select_by_prefix(images, prefixes);
            if selected.is_empty() {
                return Ok(Selection::NoCandidates);
            }
            Ok(Selection::Files(selected))
        }
        SelectionCriteria::Messy { include_cjk } => {
            let Some(proposal) = propose_prefix(images, *include_cjk, rules) else {
                return Ok(Selection::NoCandidates);
            };
            debug!(prefix = %proposal.prefix, count = proposal.count(), "proposing prefix");
            if confirm(&proposal)? {
                Ok(Selection::Files(proposal.files))
            } else {
                Ok(Selection::Declined)
            }
        }
    }
}

// Candidates are grouped by first character; the biggest groups win and each
// group's prefix is its longest common prefix. Ties go to the shortest, then
// lexicographically smallest prefix.
fn most_common_prefix(stems: &[String]) -> Option<String> {
    let mut groups = BTreeMap::<char, Vec<&str>>::new();
    for stem in stems {
        if let Some(first) = stem.chars().next() {
            groups.entry(first).or_default().push(stem);
        }
    }

    let largest = groups.values().map(Vec::len).max()?;
    groups
        .values()
        .filter(|group| group.len() == largest)
        .map(|group| longest_common_prefix(group))
        .min_by(|a, b| {
            a.chars()
                .count()
                .cmp(&b.chars().count())
                .then_with(|| a.cmp(b))
        })
}

fn longest_common_prefix(stems: &[&str]) -> String {
    let mut prefix: Vec<char> = stems.first().map(|s| s.chars().collect()).unwrap_or_default();
    for stem in stems.iter().skip(1) {
        let shared = prefix
            .iter()
            .zip(stem.chars())
            .take_while(|(a, b)| **a == *b)
            .count();
        prefix.truncate(shared);
    }
    prefix.into_iter().collect()
}

fn stem_of(name: &str) -> String {
    Path::new(name)
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn prefix_mode_matches_any_prefix_sorted() {
        let images = names(&["wx_2.jpg", "IMG_9.png", "keep.jpg", "img_1.JPG", "wx_1.jpg"]);
        let selected = select_by_prefix(&images, &names(&["wx_", "img_"]));
        assert_eq!(selected, names(&["img_1.JPG", "wx_1.jpg", "wx_2.jpg"]));
    }

    #[test]
    fn parse_prefixes_splits_and_trims() {
        let parsed = parse_prefixes(&names(&[" a, b ,,", "c"]));
        assert_eq!(parsed, names(&["a", "b", "c"]));
    }

    #[test]
    fn criteria_falls_back_to_messy_without_prefixes() {
        assert_eq!(
            SelectionCriteria::from_options(&names(&[" , "]), true),
            SelectionCriteria::Messy { include_cjk: true }
        );
        assert_eq!(
            SelectionCriteria::from_options(&names(&["IMG"]), false),
            SelectionCriteria::Prefix {
                prefixes: names(&["IMG"])
            }
        );
    }

    #[test]
    fn cjk_names_are_never_candidates_by_default() {
        let images = names(&["a1b2c3.jpg", "夕阳.jpg", "d4e5f6.jpg"]);
        let rules = MessyRules::default();

        let candidates = messy_candidates(&images, false, &rules);
        assert_eq!(candidates, names(&["a1b2c3.jpg", "d4e5f6.jpg"]));

        let cjk_messy = names(&["微信图片_20240101123456789.jpg"]);
        assert!(messy_candidates(&cjk_messy, false, &rules).is_empty());
        assert_eq!(messy_candidates(&cjk_messy, true, &rules), cjk_messy);
    }

    #[test]
    fn proposal_picks_largest_group_longest_prefix() {
        let images = names(&[
            "mmexport1700000000001.jpg",
            "mmexport1700000000002.jpg",
            "mmexport1700000000103.png",
            "IMG_0001.jpg",
            "IMG_0002.jpg",
            "holiday.jpg",
        ]);
        let proposal =
            propose_prefix(&images, false, &MessyRules::default()).expect("must propose");
        assert_eq!(proposal.prefix, "mmexport1700000000");
        assert_eq!(proposal.candidates, 5);
        assert_eq!(proposal.count(), 3);
    }

    #[test]
    fn proposal_groups_on_shared_leading_text() {
        let images = names(&[
            "mmexport1700000000001.jpg",
            "mmexport1700000000002.jpg",
            "mmexport1800000000003.png",
            "IMG_0001.jpg",
            "IMG_0002.jpg",
        ]);
        let proposal =
            propose_prefix(&images, false, &MessyRules::default()).expect("must propose");
        assert_eq!(proposal.prefix, "mmexport1");
        assert_eq!(
            proposal.files,
            names(&[
                "mmexport1700000000001.jpg",
                "mmexport1700000000002.jpg",
                "mmexport1800000000003.png",
            ])
        );
        assert_eq!(proposal.examples, proposal.files);
    }

    #[test]
    fn proposal_ties_prefer_shorter_then_smaller_prefix() {
        let images = names(&["zz_a1b2c3.jpg", "zz_d4e5f6.jpg", "IMG_0001.jpg", "IMG_0002.jpg"]);
        let proposal =
            propose_prefix(&images, false, &MessyRules::default()).expect("must propose");
        assert_eq!(proposal.prefix, "zz_");
        assert_eq!(proposal.files, names(&["zz_a1b2c3.jpg", "zz_d4e5f6.jpg"]));

        let singles = names(&["d4e5f6.jpg", "a1b2c3.jpg"]);
        let proposal =
            propose_prefix(&singles, false, &MessyRules::default()).expect("must propose");
        assert_eq!(proposal.prefix, "a1b2c3");
        assert_eq!(proposal.files, names(&["a1b2c3.jpg"]));
    }

    #[test]
    fn declined_confirmation_selects_nothing() {
        let images = names(&["a1b2c3.jpg", "a1b2c4.jpg"]);
        let criteria = SelectionCriteria::Messy { include_cjk: false };
        let mut seen = None;
        let selection = select_files(&images, &criteria, &MessyRules::default(), |proposal| {
            seen = Some(proposal.clone());
            Ok(false)
        })
        .expect("selection should succeed");

        assert_eq!(selection, Selection::Declined);
        let seen = seen.expect("confirmation should be asked");
        assert_eq!(seen.prefix, "a1b2c");
        assert_eq!(seen.count(), 2);
    }

    #[test]
    fn confirmed_proposal_selects_its_files() {
        let images = names(&["a1b2c4.jpg", "a1b2c3.jpg", "notes.jpg"]);
        let criteria = SelectionCriteria::Messy { include_cjk: false };
        let selection = select_files(&images, &criteria, &MessyRules::default(), |_| Ok(true))
            .expect("selection should succeed");
        assert_eq!(
            selection,
            Selection::Files(names(&["a1b2c3.jpg", "a1b2c4.jpg"]))
        );
    }

    #[test]
    fn nothing_messy_never_asks() {
        let images = names(&["sunset.jpg", "夕阳.jpg"]);
        let criteria = SelectionCriteria::Messy { include_cjk: false };
        let selection = select_files(&images, &criteria, &MessyRules::default(), |_| {
            panic!("must not ask")
        })
        .expect("selection should succeed");
        assert_eq!(selection, Selection::NoCandidates);
    }
}

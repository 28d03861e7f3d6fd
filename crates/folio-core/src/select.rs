//! Choosing one structural map when a document declares several.

use tracing::{info, warn};

use crate::error::SelectionError;
use crate::models::{FileDescriptor, FileRole, StructuralMap};

/// Score given to a map that references any file that is neither an image nor
/// text, whatever else it contains.
pub const POISONED_SCORE: i64 = -1;

#[derive(Debug, Default)]
pub struct StructMapSelector {
    warnings: Vec<String>,
}

impl StructMapSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn into_warnings(self) -> Vec<String> {
        self.warnings
    }

    /// Index of the map to build the table of contents from.
    ///
    /// A single map is taken as is. Otherwise the map with the most page
    /// files wins; a tie on that count falls back to [`score_map`] among the
    /// tied maps, and a tie on score is an error.
    pub fn select(&mut self, maps: &[StructuralMap]) -> Result<usize, SelectionError> {
        match maps.len() {
            0 => return Err(SelectionError::NoCandidates),
            1 => return Ok(0),
            _ => {}
        }

        let counts: Vec<usize> = maps.iter().map(StructuralMap::file_count).collect();
        let most_files = counts.iter().copied().max().unwrap_or(0);
        let leaders: Vec<usize> = (0..maps.len())
            .filter(|&idx| counts[idx] == most_files)
            .collect();

        if let &[winner] = leaders.as_slice() {
            let discarded: Vec<String> = (0..maps.len())
                .filter(|&idx| idx != winner)
                .map(|idx| format!("{} with {} files", maps[idx].describe(idx), counts[idx]))
                .collect();
            self.warn(format!(
                "using {} with {} files; discarded shortest structural maps: {}",
                maps[winner].describe(winner),
                most_files,
                discarded.join(", ")
            ));
            return Ok(winner);
        }

        let scores: Vec<(usize, i64)> = leaders
            .iter()
            .map(|&idx| (idx, score_map(&maps[idx])))
            .collect();
        let best = scores.iter().map(|(_, score)| *score).max().unwrap_or(POISONED_SCORE);
        let best_maps: Vec<usize> = scores
            .iter()
            .filter(|(_, score)| *score == best)
            .map(|(idx, _)| *idx)
            .collect();

        match best_maps.as_slice() {
            &[winner] => {
                self.warn(format!(
                    "{} structural maps have {} files each; chose {} by heuristic score {}",
                    leaders.len(),
                    most_files,
                    maps[winner].describe(winner),
                    best
                ));
                Ok(winner)
            }
            _ => {
                info!(
                    candidates = leaders.len(),
                    files = most_files,
                    score = best,
                    "structural maps tie on file count and score"
                );
                Err(SelectionError::Undecidable)
            }
        }
    }

    fn warn(&mut self, message: String) {
        warn!("{message}");
        self.warnings.push(message);
    }
}

/// Heuristic preference for a map, from the files its page divisions use.
///
/// Every file of every page adds a role score and a media score. A file that
/// is neither image nor text pins the whole map at [`POISONED_SCORE`].
// NOTE: the poison rule overrides the additive score for the entire map even
// when only one page carries such a file; kept as-is pending a product decision.
pub fn score_map(map: &StructuralMap) -> i64 {
    let mut score = 0;
    let mut poisoned = false;

    for file in map
        .divisions
        .iter()
        .filter(|division| division.is_page)
        .flat_map(|division| division.files.iter())
    {
        score += role_score(&file.role);
        match media_score(file) {
            Some(points) => score += points,
            None => poisoned = true,
        }
    }

    if poisoned { POISONED_SCORE } else { score }
}

fn role_score(role: &FileRole) -> i64 {
    match role {
        FileRole::Reference => 2,
        FileRole::Index => 1,
        FileRole::Archive => 0,
        FileRole::Thumbnail | FileRole::Other(_) => -1,
    }
}

fn media_score(file: &FileDescriptor) -> Option<i64> {
    if file.is_image() {
        Some(2)
    } else if file.is_text() {
        Some(1)
    } else {
        None
    }
}

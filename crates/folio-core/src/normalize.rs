//! Turning a structural map into a clean, page-numbered table of contents.
//!
//! The stages run strictly in order, each on the previous stage's output:
//! materialize, trim buds, mark repeats, dedupe page titles, default chapter
//! titles, number pages. None of them fail; defects become warnings.

use std::collections::{HashMap, HashSet};

use tracing::warn;

use crate::models::{FileDictionary, PageImage, StructuralMap, TocEntry};

pub const DEFAULT_CHAPTER_TITLE: &str = "Chapter";

#[derive(Debug, Default)]
pub struct TocNormalizer {
    warnings: Vec<String>,
    produced: usize,
}

impl TocNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn into_warnings(self) -> Vec<String> {
        self.warnings
    }

    /// Whether the last run produced any entries.
    pub fn is_valid(&self) -> bool {
        self.produced > 0
    }

    pub fn normalize(&mut self, map: &StructuralMap, files: &FileDictionary) -> Vec<TocEntry> {
        let mut entries = self.materialize(map, files);
        trim_buds(&mut entries);
        mark_repeats(&mut entries);
        self.dedupe_page_titles(&mut entries);
        default_chapter_titles(&mut entries);
        number_pages(&mut entries);

        self.produced = entries.len();
        entries
    }

    /// One entry per division: pages for leaves, chapters for the rest.
    fn materialize(&mut self, map: &StructuralMap, files: &FileDictionary) -> Vec<TocEntry> {
        let mut entries = Vec::with_capacity(map.divisions.len());

        for division in &map.divisions {
            let title = division.title.trim();
            if !division.is_page {
                entries.push(TocEntry::chapter(title, division.level));
                continue;
            }

            let image = division
                .file_ids
                .iter()
                .filter_map(|id| files.get(id))
                .find(|file| file.is_image())
                .map(|file| PageImage {
                    filename: file.filename().to_string(),
                    media_type: file.media_type.clone(),
                    file_id: file.id.clone(),
                });
            if image.is_none() {
                self.warn(format!("no associated image file for page {title}"));
            }

            entries.push(TocEntry::page(title, division.level, image));
        }

        entries
    }

    /// Give every page a title, then make titles of distinct pages unique.
    ///
    /// Untitled pages are named after their image (without extension), or
    /// failing that after their ordinal among identical pages. Repeats keep
    /// whatever title they end up with; they never collide.
    fn dedupe_page_titles(&mut self, entries: &mut [TocEntry]) {
        let mut ordinals: HashMap<(String, u32, Option<PageImage>, bool), usize> = HashMap::new();

        for entry in entries.iter_mut() {
            let TocEntry::Page(page) = entry else {
                continue;
            };
            let identity = (
                page.title.clone(),
                page.level,
                page.image.clone(),
                page.is_repeat,
            );
            let ordinal = ordinals.entry(identity).or_insert(0);

            if page.title.is_empty() {
                page.title = match &page.image {
                    Some(image) => file_stem(&image.filename).to_string(),
                    None => ordinal.to_string(),
                };
            }
            *ordinal += 1;
        }

        let mut taken: HashSet<String> = HashSet::new();
        let mut suffixes: HashMap<String, usize> = HashMap::new();
        let mut renamed = Vec::new();

        for entry in entries.iter_mut() {
            let TocEntry::Page(page) = entry else {
                continue;
            };
            if page.is_repeat {
                continue;
            }

            if taken.insert(page.title.clone()) {
                continue;
            }

            let counter = suffixes.entry(page.title.clone()).or_insert(0);
            let unique = loop {
                *counter += 1;
                let candidate = format!("{} ({})", page.title, counter);
                if !taken.contains(&candidate) {
                    break candidate;
                }
            };
            taken.insert(unique.clone());
            page.title = unique.clone();
            renamed.push(unique);
        }

        if !renamed.is_empty() {
            self.warn(format!(
                "disambiguated duplicate page titles: {}",
                renamed.join(", ")
            ));
        }
    }

    fn warn(&mut self, message: String) {
        warn!("{message}");
        self.warnings.push(message);
    }
}

/// Drop a lone top-level wrapper chapter and lift everything under it.
pub fn trim_buds(entries: &mut Vec<TocEntry>) {
    while entries.len() > 1 && is_bud(entries) {
        entries.remove(0);
        for entry in entries.iter_mut() {
            *entry.level_mut() -= 1;
        }
    }
}

fn is_bud(entries: &[TocEntry]) -> bool {
    matches!(&entries[0], TocEntry::Chapter(chapter) if chapter.level == 1)
        && entries[1..].iter().all(|entry| entry.level() > 1)
}

/// Flag every page whose file is shown again by a later page.
pub fn mark_repeats(entries: &mut [TocEntry]) {
    let mut last_seen: HashMap<String, usize> = HashMap::new();
    for (idx, entry) in entries.iter().enumerate() {
        if let Some(file_id) = entry.as_page().and_then(|page| page.file_id()) {
            last_seen.insert(file_id.to_string(), idx);
        }
    }

    for (idx, entry) in entries.iter_mut().enumerate() {
        if let TocEntry::Page(page) = entry {
            let repeat = page
                .file_id()
                .is_some_and(|file_id| last_seen.get(file_id) != Some(&idx));
            page.is_repeat = repeat;
        }
    }
}

pub fn default_chapter_titles(entries: &mut [TocEntry]) {
    for entry in entries.iter_mut() {
        if let TocEntry::Chapter(chapter) = entry {
            if chapter.title.trim().is_empty() {
                chapter.title = DEFAULT_CHAPTER_TITLE.to_string();
            }
        }
    }
}

/// Assign 1-based page numbers.
///
/// Fresh pages take the next number. A repeat takes the number of the page
/// before it and does not advance the count. Chapters take the number of the
/// page that follows them, or the next free number when none does.
// NOTE: a plain running counter handed to every entry would give a repeat the
// number of the *next* fresh page, not the page before it. The two rules
// disagree whenever a repeat follows a fresh page; repeats follow the
// preceding page here, and fresh pages are numbered as the counter would.
pub fn number_pages(entries: &mut [TocEntry]) {
    let mut next = 1;
    let mut previous: Option<u32> = None;

    for entry in entries.iter_mut() {
        let TocEntry::Page(page) = entry else {
            continue;
        };
        page.pagenum = if page.is_repeat {
            previous.unwrap_or(next)
        } else {
            next += 1;
            next - 1
        };
        previous = Some(page.pagenum);
    }

    let mut following = next;
    for entry in entries.iter_mut().rev() {
        match entry {
            TocEntry::Page(page) => following = page.pagenum,
            TocEntry::Chapter(chapter) => chapter.pagenum = following,
        }
    }
}

fn file_stem(filename: &str) -> &str {
    match filename.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => filename,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DivisionNode, FileDescriptor, FileRole};

    fn image(file_id: &str) -> Option<PageImage> {
        Some(PageImage {
            filename: format!("{file_id}.jpg"),
            media_type: "image/jpeg".to_string(),
            file_id: file_id.to_string(),
        })
    }

    fn levels_and_titles(entries: &[TocEntry]) -> Vec<(bool, u32, String)> {
        entries
            .iter()
            .map(|e| (e.is_page(), e.level(), e.title().to_string()))
            .collect()
    }

    fn pagenums(entries: &[TocEntry]) -> Vec<u32> {
        entries.iter().map(TocEntry::pagenum).collect()
    }

    fn repeats(entries: &[TocEntry]) -> Vec<bool> {
        entries
            .iter()
            .map(|e| e.as_page().is_some_and(|p| p.is_repeat))
            .collect()
    }

    fn dictionary(ids: &[(&str, &str)]) -> FileDictionary {
        let mut files = FileDictionary::new();
        for (id, media_type) in ids {
            files.insert(FileDescriptor {
                id: id.to_string(),
                sequence: None,
                media_type: media_type.to_string(),
                role: FileRole::Reference,
                href: format!("scans/{id}.jp2"),
                group_id: None,
            });
        }
        files
    }

    fn division(level: u32, title: &str, is_page: bool, file_ids: &[&str]) -> DivisionNode {
        let mut division = DivisionNode::new(level, title, is_page);
        for id in file_ids {
            division.add_file_id(id);
        }
        division
    }

    // ─── Stages ────────────────────────────────────────────────

    #[test]
    fn test_bud_is_trimmed() {
        let mut entries = vec![
            TocEntry::chapter("Book", 1),
            TocEntry::page("1", 2, None),
            TocEntry::page("2", 2, None),
        ];
        trim_buds(&mut entries);
        assert_eq!(
            levels_and_titles(&entries),
            vec![(true, 1, "1".to_string()), (true, 1, "2".to_string())]
        );
    }

    #[test]
    fn test_nested_buds_are_trimmed_repeatedly() {
        let mut entries = vec![
            TocEntry::chapter("Volume", 1),
            TocEntry::chapter("Book", 2),
            TocEntry::chapter("Part", 3),
            TocEntry::page("1", 4, None),
            TocEntry::chapter("Part 2", 3),
        ];
        trim_buds(&mut entries);
        assert_eq!(
            levels_and_titles(&entries),
            vec![
                (false, 1, "Part".to_string()),
                (true, 2, "1".to_string()),
                (false, 1, "Part 2".to_string()),
            ]
        );
    }

    #[test]
    fn test_no_trim_with_top_level_sibling_or_single_entry() {
        let mut with_sibling = vec![
            TocEntry::chapter("One", 1),
            TocEntry::page("1", 2, None),
            TocEntry::chapter("Two", 1),
        ];
        trim_buds(&mut with_sibling);
        assert_eq!(with_sibling.len(), 3);

        let mut single = vec![TocEntry::chapter("Only", 1)];
        trim_buds(&mut single);
        assert_eq!(single.len(), 1);

        let mut page_first = vec![TocEntry::page("1", 1, None), TocEntry::page("2", 2, None)];
        trim_buds(&mut page_first);
        assert_eq!(page_first.len(), 2);
    }

    #[test]
    fn test_earlier_occurrences_are_repeats() {
        let mut entries = vec![
            TocEntry::page("a", 1, image("f1")),
            TocEntry::chapter("c", 1),
            TocEntry::page("b", 2, image("f1")),
            TocEntry::page("c", 2, image("f2")),
            TocEntry::page("d", 2, None),
        ];
        mark_repeats(&mut entries);
        assert_eq!(repeats(&entries), vec![true, false, false, false, false]);
    }

    #[test]
    fn test_duplicate_titles_get_counters() {
        let mut normalizer = TocNormalizer::new();
        let mut entries = vec![TocEntry::page("5", 1, None), TocEntry::page("5", 1, None)];
        normalizer.dedupe_page_titles(&mut entries);

        let titles: Vec<&str> = entries.iter().map(TocEntry::title).collect();
        assert_eq!(titles, vec!["5", "5 (1)"]);
        assert_eq!(normalizer.warnings().len(), 1);
        assert!(normalizer.warnings()[0].contains("5 (1)"));
    }

    #[test]
    fn test_counter_skips_titles_already_in_use() {
        let mut normalizer = TocNormalizer::new();
        let mut entries = vec![
            TocEntry::page("5", 1, None),
            TocEntry::page("5 (1)", 1, None),
            TocEntry::page("5", 2, None),
        ];
        normalizer.dedupe_page_titles(&mut entries);
        let titles: Vec<&str> = entries.iter().map(TocEntry::title).collect();
        assert_eq!(titles, vec!["5", "5 (1)", "5 (2)"]);
    }

    #[test]
    fn test_untitled_pages_get_default_titles() {
        let mut normalizer = TocNormalizer::new();
        let mut entries = vec![
            TocEntry::page("", 1, image("00000007")),
            TocEntry::page("", 1, None),
            TocEntry::page("", 1, None),
            TocEntry::page("", 2, None),
        ];
        normalizer.dedupe_page_titles(&mut entries);

        let titles: Vec<&str> = entries.iter().map(TocEntry::title).collect();
        // The level-2 page starts its own group at ordinal 0 and then
        // collides with the first untitled page.
        assert_eq!(titles, vec!["00000007", "0", "1", "0 (1)"]);
    }

    #[test]
    fn test_repeats_do_not_collide() {
        let mut normalizer = TocNormalizer::new();
        let mut entries = vec![
            TocEntry::page("", 1, image("f1")),
            TocEntry::page("", 1, image("f1")),
        ];
        mark_repeats(&mut entries);
        normalizer.dedupe_page_titles(&mut entries);

        let titles: Vec<&str> = entries.iter().map(TocEntry::title).collect();
        assert_eq!(titles, vec!["f1", "f1"]);
        assert!(normalizer.warnings().is_empty());
    }

    #[test]
    fn test_chapter_titles_default() {
        let mut entries = vec![TocEntry::chapter("", 1), TocEntry::chapter("Intro", 1)];
        default_chapter_titles(&mut entries);
        assert_eq!(entries[0].title(), DEFAULT_CHAPTER_TITLE);
        assert_eq!(entries[1].title(), "Intro");
    }

    #[test]
    fn test_numbering_plain() {
        let mut entries = vec![
            TocEntry::chapter("c1", 1),
            TocEntry::page("1", 2, None),
            TocEntry::page("2", 2, None),
            TocEntry::chapter("c2", 1),
            TocEntry::page("3", 2, None),
            TocEntry::chapter("end", 1),
        ];
        number_pages(&mut entries);
        assert_eq!(pagenums(&entries), vec![1, 1, 2, 3, 3, 4]);
    }

    #[test]
    fn test_numbering_with_repeats() {
        let mut entries = vec![
            TocEntry::page("1", 1, image("f1")),
            TocEntry::chapter("c", 1),
            TocEntry::page("2", 1, image("f2")),
            TocEntry::chapter("d", 1),
            TocEntry::page("2 again", 1, image("f2")),
            TocEntry::page("3", 1, image("f3")),
        ];
        mark_repeats(&mut entries);
        number_pages(&mut entries);

        assert_eq!(repeats(&entries), vec![false, false, true, false, false, false]);
        assert_eq!(pagenums(&entries), vec![1, 1, 1, 2, 2, 3]);
    }

    #[test]
    fn test_numbering_leading_repeat() {
        let mut entries = vec![
            TocEntry::page("a", 1, image("f1")),
            TocEntry::page("b", 1, image("f1")),
        ];
        mark_repeats(&mut entries);
        number_pages(&mut entries);
        assert_eq!(pagenums(&entries), vec![1, 1]);
    }

    // ─── Pipeline ──────────────────────────────────────────────

    #[test]
    fn test_pipeline() {
        let files = dictionary(&[
            ("img1", "image/jp2"),
            ("img2", "image/jp2"),
            ("ocr2", "text/plain"),
            ("ocr3", "text/plain"),
        ]);
        let map = StructuralMap {
            divisions: vec![
                division(1, "Book", false, &[]),
                division(2, "", false, &[]),
                division(3, " ", true, &["img1"]),
                division(3, "ii", true, &["ocr2", "img2"]),
                division(2, "Appendix", false, &[]),
                division(3, "ii", true, &["ocr3"]),
            ],
            ..StructuralMap::default()
        };

        let mut normalizer = TocNormalizer::new();
        let entries = normalizer.normalize(&map, &files);

        assert!(normalizer.is_valid());
        assert_eq!(
            levels_and_titles(&entries),
            vec![
                (false, 1, "Chapter".to_string()),
                (true, 2, "img1".to_string()),
                (true, 2, "ii".to_string()),
                (false, 1, "Appendix".to_string()),
                (true, 2, "ii (1)".to_string()),
            ]
        );
        assert_eq!(pagenums(&entries), vec![1, 1, 2, 3, 3]);

        let page = entries[2].as_page().unwrap();
        let image = page.image.as_ref().unwrap();
        assert_eq!(image.file_id, "img2");
        assert_eq!(image.filename, "img2.jp2");
        assert_eq!(image.media_type, "image/jp2");
        assert!(entries[4].as_page().unwrap().image.is_none());

        let warnings = normalizer.warnings();
        assert_eq!(warnings.len(), 2);
        assert_eq!(warnings[0], "no associated image file for page ii");
        assert!(warnings[1].contains("ii (1)"));
    }

    #[test]
    fn test_unresolved_reference_leaves_page_without_image() {
        let files = dictionary(&[]);
        let map = StructuralMap {
            divisions: vec![division(1, "1", true, &["missing"])],
            ..StructuralMap::default()
        };
        let mut normalizer = TocNormalizer::new();
        let entries = normalizer.normalize(&map, &files);

        assert!(entries[0].as_page().unwrap().image.is_none());
        assert_eq!(
            normalizer.warnings().to_vec(),
            vec!["no associated image file for page 1".to_string()]
        );
    }

    #[test]
    fn test_empty_map_is_not_valid() {
        let mut normalizer = TocNormalizer::new();
        let entries = normalizer.normalize(&StructuralMap::new(), &FileDictionary::new());
        assert!(entries.is_empty());
        assert!(!normalizer.is_valid());
    }

    #[test]
    fn test_page_numbers_are_monotonic_and_repeats_do_not_advance() {
        let files = dictionary(&[("a", "image/tiff"), ("b", "image/tiff"), ("c", "image/tiff")]);
        let map = StructuralMap {
            divisions: vec![
                division(1, "Part 1", false, &[]),
                division(2, "", true, &["a"]),
                division(2, "", true, &["b"]),
                division(1, "Part 2", false, &[]),
                division(2, "", true, &["b"]),
                division(2, "", true, &["c"]),
                division(1, "", false, &[]),
            ],
            ..StructuralMap::default()
        };
        let entries = TocNormalizer::new().normalize(&map, &files);

        for pair in entries.windows(2) {
            assert!(pair[0].pagenum() <= pair[1].pagenum());
        }

        let mut previous_page = None;
        for entry in &entries {
            if let Some(page) = entry.as_page() {
                if page.is_repeat {
                    assert_eq!(Some(page.pagenum), previous_page);
                }
                previous_page = Some(page.pagenum);
            }
        }
        assert_eq!(repeats(&entries).iter().filter(|r| **r).count(), 1);
    }
}

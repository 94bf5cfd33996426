//! Candidate detection - find pages that describe a listing.
//!
//! Works over linearized document text only. The text carries no page
//! markers, so it is cut into `page_count` equal-length slices by
//! character offset. This is an accepted approximation: slices need not
//! line up with the real page boundaries.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;
use uuid::Uuid;

use crate::types::candidate::{dedup_key, ListingCandidate};

/// What a detection pattern looks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternLabel {
    ListingName,
    Rent,
    Address,
    FloorPlan,
    BuildingAge,
}

struct DetectionPattern {
    label: PatternLabel,
    regex: Regex,
}

impl DetectionPattern {
    fn new(label: PatternLabel, pattern: &str) -> Self {
        Self {
            label,
            regex: Regex::new(pattern).expect("detection pattern must compile"),
        }
    }
}

/// Ordered listing indicator patterns.
static DETECTION_PATTERNS: Lazy<Vec<DetectionPattern>> = Lazy::new(|| {
    vec![
        DetectionPattern::new(PatternLabel::ListingName, r"(?:物件名|建物名)[：:]\s*(.+?)(?:\n|$)"),
        DetectionPattern::new(PatternLabel::Rent, r"(?:賃料|家賃)[：:]\s*([0-9,]+)\s*円"),
        DetectionPattern::new(PatternLabel::Address, r"(?:所在地|住所)[：:]\s*(.+?)(?:\n|$)"),
        DetectionPattern::new(PatternLabel::FloorPlan, r"間取り[：:]\s*([0-9]+[KLDR]+)"),
        DetectionPattern::new(
            PatternLabel::BuildingAge,
            r"(?:築年数?|築)[：:]?\s*([0-9]+年|[0-9]+\.[0-9]+年)",
        ),
    ]
});

/// Splits documents into page slices and emits listing candidates.
#[derive(Debug, Clone)]
pub struct CandidateDetector {
    preview_chars: usize,
}

impl Default for CandidateDetector {
    fn default() -> Self {
        Self::new(500)
    }
}

impl CandidateDetector {
    /// Create a detector keeping `preview_chars` characters of each page.
    pub fn new(preview_chars: usize) -> Self {
        Self { preview_chars }
    }

    /// Detect candidates in one document.
    ///
    /// A page count of zero is treated as one page.
    pub fn detect(
        &self,
        text: &str,
        page_count: usize,
        file_id: Uuid,
        file_name: &str,
    ) -> Vec<ListingCandidate> {
        let candidates: Vec<ListingCandidate> = split_pages(text, page_count)
            .into_iter()
            .enumerate()
            .filter_map(|(page_index, page_text)| {
                self.detect_page(page_text, page_index, file_id, file_name)
            })
            .collect();

        debug!(
            file = %file_name,
            pages = page_count.max(1),
            candidates = candidates.len(),
            "Detected listing candidates"
        );

        candidates
    }

    /// Test one page slice. Returns a candidate iff any pattern matches.
    pub fn detect_page(
        &self,
        page_text: &str,
        page_index: usize,
        file_id: Uuid,
        file_name: &str,
    ) -> Option<ListingCandidate> {
        let mut matched = false;
        let mut name = String::new();
        let mut address = String::new();
        let mut rent = 0;

        for pattern in DETECTION_PATTERNS.iter() {
            let Some(captures) = pattern.regex.captures(page_text) else {
                continue;
            };
            matched = true;

            let captured = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
            match pattern.label {
                PatternLabel::ListingName => name = captured.trim().to_string(),
                PatternLabel::Address => address = captured.trim().to_string(),
                PatternLabel::Rent => rent = parse_rent(captured),
                PatternLabel::FloorPlan | PatternLabel::BuildingAge => {}
            }
        }

        if !matched {
            return None;
        }

        let key = dedup_key(&name, &address, rent);
        let raw_name = if name.is_empty() {
            format!("物件_{}", page_index + 1)
        } else {
            name
        };

        Some(ListingCandidate {
            page_index,
            raw_name,
            raw_address: address,
            raw_rent: rent,
            dedup_key: key,
            preview_text: page_text.chars().take(self.preview_chars).collect(),
            file_id,
            file_name: file_name.to_string(),
        })
    }
}

/// Cut text into `page_count` slices of equal character length.
///
/// Slice `i` spans characters `floor(i * len / n)` to `floor((i + 1) * len / n)`.
pub fn split_pages(text: &str, page_count: usize) -> Vec<&str> {
    let pages = page_count.max(1);
    let offsets: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let char_len = offsets.len() - 1;

    (0..pages)
        .map(|i| {
            let start = i * char_len / pages;
            let end = (i + 1) * char_len / pages;
            &text[offsets[start]..offsets[end]]
        })
        .collect()
}

/// Comma-stripped integer rent, 0 when unparseable.
fn parse_rent(captured: &str) -> i64 {
    captured.replace(',', "").parse().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FLYER: &str = "賃貸物件詳細資料\n物件名: レジデンス新宿\n所在地: 東京都新宿区西新宿4-5-6\n賃料: 98,000円\n間取り: 1LDK\n築年数: 築12年\n";

    fn detect(text: &str, pages: usize) -> Vec<ListingCandidate> {
        CandidateDetector::default().detect(text, pages, Uuid::nil(), "flyer.pdf")
    }

    #[test]
    fn test_detects_labelled_fields() {
        let candidates = detect(FLYER, 1);

        assert_eq!(candidates.len(), 1);
        let c = &candidates[0];
        assert_eq!(c.page_index, 0);
        assert_eq!(c.raw_name, "レジデンス新宿");
        assert_eq!(c.raw_address, "東京都新宿区西新宿4-5-6");
        assert_eq!(c.raw_rent, 98000);
        assert_eq!(c.dedup_key, "レジデンス新宿_東京都新宿区西新宿456_90000");
        assert_eq!(c.file_name, "flyer.pdf");
    }

    #[test]
    fn test_page_without_patterns_is_skipped() {
        let text = format!("{}{}", "会社概要とアクセスのご案内です。".repeat(4), FLYER);
        let candidates = detect(&text, 2);

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].page_index, 1);
    }

    #[test]
    fn test_placeholder_name_keeps_empty_key_part() {
        let candidates = detect("間取り: 2DK\n", 1);

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].raw_name, "物件_1");
        assert_eq!(candidates[0].raw_rent, 0);
        assert_eq!(candidates[0].dedup_key, "__0");
    }

    #[test]
    fn test_unparseable_rent_is_zero() {
        let candidates = detect("賃料: 99999999999999999999999円\n", 1);
        assert_eq!(candidates[0].raw_rent, 0);
    }

    #[test]
    fn test_split_pages_is_proportional() {
        let pages = split_pages("あいうえおかきくけ", 3);
        assert_eq!(pages, vec!["あいう", "えおか", "きくけ"]);

        let uneven = split_pages("abcde", 2);
        assert_eq!(uneven, vec!["ab", "cde"]);

        assert_eq!(split_pages("abc", 0), vec!["abc"]);
        assert_eq!(split_pages("", 2), vec!["", ""]);
    }

    #[test]
    fn test_preview_is_truncated() {
        let long = format!("物件名: A\n{}", "x".repeat(1000));
        let candidates = CandidateDetector::new(500).detect(&long, 1, Uuid::nil(), "a.pdf");
        assert_eq!(candidates[0].preview_text.chars().count(), 500);
    }
}

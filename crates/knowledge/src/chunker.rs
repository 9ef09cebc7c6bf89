//! Fixed-size overlapping windows over the corpus text.
//!
//! Sizes are counted in extended grapheme clusters, so a window never
//! splits a user-perceived character.

use colloquy_core::{AppError, AppResult};
use unicode_segmentation::UnicodeSegmentation;

/// One window of raw text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    pub text: String,

    /// Character offset of the first character
    pub offset: usize,
}

/// Split `text` into windows of at most `chunk_size` characters where each
/// window after the first repeats the last `chunk_overlap` characters of its
/// predecessor.
///
/// Windows cover the text with no gaps and the last one ends at the end of
/// the text. Window text is not trimmed.
pub fn chunk_text(text: &str, chunk_size: usize, chunk_overlap: usize) -> AppResult<Vec<Window>> {
    if chunk_size == 0 {
        return Err(AppError::Config(
            "chunk size must be greater than zero".to_string(),
        ));
    }
    if chunk_overlap >= chunk_size {
        return Err(AppError::Config(format!(
            "chunk overlap ({}) must be less than chunk size ({})",
            chunk_overlap, chunk_size
        )));
    }

    let boundaries: Vec<usize> = text.grapheme_indices(true).map(|(i, _)| i).collect();
    let len = boundaries.len();
    let byte_at = |index: usize| boundaries.get(index).copied().unwrap_or(text.len());

    let step = chunk_size - chunk_overlap;
    let mut windows = Vec::new();
    let mut start = 0;

    while start < len {
        let end = (start + chunk_size).min(len);
        windows.push(Window {
            text: text[byte_at(start)..byte_at(end)].to_string(),
            offset: start,
        });

        if end == len {
            break;
        }
        start += step;
    }

    tracing::debug!(
        "Chunked {} characters into {} windows (size: {}, overlap: {})",
        len,
        windows.len(),
        chunk_size,
        chunk_overlap
    );

    Ok(windows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graphemes(s: &str) -> usize {
        s.graphemes(true).count()
    }

    /// Rebuild the source by dropping each window's overlapping prefix.
    fn reassemble(windows: &[Window], overlap: usize) -> String {
        let mut out = String::new();
        for (i, window) in windows.iter().enumerate() {
            let skip = if i == 0 { 0 } else { overlap };
            out.extend(window.text.graphemes(true).skip(skip));
        }
        out
    }

    #[test]
    fn test_chunk_text_empty() {
        assert!(chunk_text("", 100, 10).unwrap().is_empty());
    }

    #[test]
    fn test_chunk_text_no_overlap() {
        let text = "a".repeat(300);
        let windows = chunk_text(&text, 100, 0).unwrap();

        assert_eq!(windows.len(), 3);
        assert_eq!(windows[2].offset, 200);
    }

    #[test]
    fn test_short_text_is_one_window() {
        let windows = chunk_text("  padded  ", 50, 10).unwrap();
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].text, "  padded  ");
    }

    #[test]
    fn test_consecutive_windows_share_overlap() {
        let text = "abcdefghijklmnopqrstuvwxyz".repeat(10);
        let windows = chunk_text(&text, 50, 10).unwrap();

        for pair in windows.windows(2) {
            let tail: String = pair[0].text.chars().skip(40).collect();
            let head: String = pair[1].text.chars().take(10).collect();
            assert_eq!(tail, head);
            assert_eq!(pair[1].offset - pair[0].offset, 40);
        }
        assert!(text.ends_with(&windows.last().unwrap().text));
    }

    #[test]
    fn test_coverage_and_length_across_sizes() {
        let samples = [
            "The quick brown fox jumps over the lazy dog.\n\nSecond paragraph.".to_string(),
            "x".repeat(1000),
            "Gamedex é um aplicativo 🎮 brasileiro 👩‍👩‍👧 para gerenciar jogos!".to_string(),
        ];

        for text in &samples {
            for (size, overlap) in [(1, 0), (7, 3), (16, 15), (64, 8), (5000, 128)] {
                let windows = chunk_text(text, size, overlap).unwrap();
                assert!(windows.iter().all(|w| graphemes(&w.text) <= size));
                assert_eq!(&reassemble(&windows, overlap), text, "size={size} overlap={overlap}");
            }
        }
    }

    #[test]
    fn test_never_splits_grapheme_clusters() {
        let family = "👩‍👩‍👧";
        let text = family.repeat(5);
        let windows = chunk_text(&text, 2, 1).unwrap();

        for window in &windows {
            assert!(window.text.split(family).all(|rest| rest.is_empty()));
        }
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(matches!(chunk_text("abc", 0, 0), Err(AppError::Config(_))));
        assert!(matches!(chunk_text("abc", 10, 10), Err(AppError::Config(_))));
        assert!(matches!(chunk_text("abc", 10, 11), Err(AppError::Config(_))));
    }
}

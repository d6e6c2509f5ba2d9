// Fixed-size overlapping windows over knowledge-document text
//
// Lengths and offsets are counted in characters, not bytes.
// Windows advance by (size - overlap); the last window stops at the end of
// the text, so no window is fully contained in its predecessor.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChunkingError {
    #[error("chunk size must be greater than zero")]
    ZeroSize,

    #[error("chunk overlap ({overlap}) must be smaller than chunk size ({size})")]
    OverlapTooLarge { size: usize, overlap: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkWindow {
    size: usize,
    overlap: usize,
}

impl ChunkWindow {
    pub fn new(size: usize, overlap: usize) -> Result<Self, ChunkingError> {
        if size == 0 {
            return Err(ChunkingError::ZeroSize);
        }
        if overlap >= size {
            return Err(ChunkingError::OverlapTooLarge { size, overlap });
        }
        Ok(Self { size, overlap })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    fn step(&self) -> usize {
        self.size - self.overlap
    }

    /// Number of windows `split_windows` yields for a text of `len` chars:
    /// ceil((len - overlap) / (size - overlap)), and 1 for 0 < len <= overlap.
    pub fn expected_count(&self, len: usize) -> usize {
        if len == 0 {
            0
        } else if len <= self.overlap {
            1
        } else {
            (len - self.overlap).div_ceil(self.step())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextWindow {
    pub ordinal: usize,
    /// Char offset, inclusive
    pub start: usize,
    /// Char offset, exclusive
    pub end: usize,
    pub text: String,
}

pub fn split_windows(text: &str, window: ChunkWindow) -> Vec<TextWindow> {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();

    let mut windows = Vec::with_capacity(window.expected_count(len));
    let mut start = 0usize;

    while start < len {
        let end = (start + window.size).min(len);
        windows.push(TextWindow {
            ordinal: windows.len(),
            start,
            end,
            text: chars[start..end].iter().collect(),
        });
        if end == len {
            break;
        }
        start += window.step();
    }

    windows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_validation() {
        assert_eq!(ChunkWindow::new(0, 0), Err(ChunkingError::ZeroSize));
        assert_eq!(
            ChunkWindow::new(50, 50),
            Err(ChunkingError::OverlapTooLarge { size: 50, overlap: 50 })
        );
        assert!(ChunkWindow::new(500, 49).is_ok());
    }

    #[test]
    fn test_short_text_is_one_window() {
        let window = ChunkWindow::new(500, 50).unwrap();
        let windows = split_windows("short", window);
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].text, "short");
        assert!(split_windows("", window).is_empty());
    }

    #[test]
    fn test_counts_chars_not_bytes() {
        let window = ChunkWindow::new(4, 1).unwrap();
        let windows = split_windows("äöüßäöü", window);
        let texts: Vec<&str> = windows.iter().map(|w| w.text.as_str()).collect();
        assert_eq!(texts, vec!["äöüß", "ßäöü"]);
    }
}

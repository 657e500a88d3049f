//! Streaming chunk reader
//!
//! Bodies larger than the streaming threshold are read in overlapping
//! chunks so one file never holds more than a chunk of memory. Chunks are
//! split at a line boundary inside the trailing overlap window; the tail
//! after that boundary carries forward as the prefix of the next chunk, so
//! a match on a single line is always seen whole by exactly one chunk.

use crate::error::{FerretError, FerretResult};
use crate::limits::{STREAMING_MAX_FILE_SIZE, STREAMING_OVERLAP};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

/// One chunk of body text with its position in the file.
#[derive(Debug, Clone)]
pub struct TextChunk {
    pub text: String,
    /// 1-based line number of the chunk's first line in the whole file.
    pub first_line: usize,
}

/// Iterator over overlapping line-aligned chunks of a text file.
pub struct ChunkReader {
    path: PathBuf,
    reader: BufReader<File>,
    chunk_size: usize,
    carry: String,
    /// Newlines emitted so far; the next chunk always starts on line
    /// `lines_emitted + 1`, whether or not that line was partially emitted.
    lines_emitted: usize,
    done: bool,
}

impl ChunkReader {
    pub fn open(path: &Path, chunk_size: usize) -> FerretResult<Self> {
        let metadata = std::fs::metadata(path)
            .map_err(|e| FerretError::file_access(path, &e.to_string()))?;
        if metadata.len() > STREAMING_MAX_FILE_SIZE {
            return Err(FerretError::file_too_large(
                path,
                metadata.len(),
                STREAMING_MAX_FILE_SIZE,
            ));
        }
        let file = File::open(path).map_err(|e| FerretError::file_access(path, &e.to_string()))?;
        Ok(Self {
            path: path.to_path_buf(),
            reader: BufReader::new(file),
            chunk_size: chunk_size.max(STREAMING_OVERLAP * 2),
            carry: String::new(),
            lines_emitted: 0,
            done: false,
        })
    }

    fn read_next(&mut self) -> FerretResult<Option<TextChunk>> {
        if self.done {
            return Ok(None);
        }

        let mut buf = vec![0u8; self.chunk_size];
        let mut filled = 0;
        while filled < buf.len() {
            let n = self
                .reader
                .read(&mut buf[filled..])
                .map_err(|e| FerretError::file_access(&self.path, &e.to_string()))?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        buf.truncate(filled);

        let at_eof = filled < self.chunk_size;
        let mut text = std::mem::take(&mut self.carry);
        text.push_str(&String::from_utf8_lossy(&buf));

        if text.is_empty() {
            self.done = true;
            return Ok(None);
        }

        let first_line = self.lines_emitted + 1;

        if at_eof {
            self.done = true;
            return Ok(Some(TextChunk { text, first_line }));
        }

        // Split at the last newline inside the trailing overlap window.
        let mut window_start = text.len().saturating_sub(STREAMING_OVERLAP);
        while !text.is_char_boundary(window_start) {
            window_start -= 1;
        }
        let split = match text[window_start..].rfind('\n') {
            Some(rel) => window_start + rel + 1,
            // No line boundary in the window: split at the window start and
            // carry the whole window so nothing is dropped.
            None => window_start,
        };

        self.carry = text[split..].to_string();
        text.truncate(split);
        self.lines_emitted += text.matches('\n').count();

        Ok(Some(TextChunk { text, first_line }))
    }
}

impl Iterator for ChunkReader {
    type Item = FerretResult<TextChunk>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_next().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn chunks_of(content: &str, chunk_size: usize) -> Vec<TextChunk> {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        ChunkReader::open(f.path(), chunk_size)
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    #[test]
    fn test_small_file_is_one_chunk() {
        let chunks = chunks_of("line one\nline two\n", 4096);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].first_line, 1);
        assert_eq!(chunks[0].text, "line one\nline two\n");
    }

    #[test]
    fn test_no_text_lost_across_chunks() {
        let content: String = (0..500)
            .map(|i| format!("row {:04} with some padding text\n", i))
            .collect();
        let chunks = chunks_of(&content, 2048);
        assert!(chunks.len() > 1);
        let reassembled: String = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(reassembled, content);
    }

    #[test]
    fn test_chunks_split_on_line_boundaries() {
        let content: String = (0..500)
            .map(|i| format!("row {:04} with some padding text\n", i))
            .collect();
        let chunks = chunks_of(&content, 2048);
        for chunk in &chunks[..chunks.len() - 1] {
            assert!(chunk.text.ends_with('\n'));
        }
    }

    #[test]
    fn test_first_line_numbers_are_continuous() {
        let content: String = (0..500)
            .map(|i| format!("row {:04} with some padding text\n", i))
            .collect();
        let chunks = chunks_of(&content, 2048);
        let mut expected = 1;
        for chunk in &chunks {
            assert_eq!(chunk.first_line, expected);
            expected += chunk.text.matches('\n').count();
        }
    }

    #[test]
    fn test_single_huge_line_not_dropped() {
        let content = "x".repeat(10_000);
        let chunks = chunks_of(&content, 3000);
        let reassembled: String = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(reassembled, content);
        // Every chunk continues line 1.
        for chunk in &chunks {
            assert_eq!(chunk.first_line, 1);
        }
    }
}

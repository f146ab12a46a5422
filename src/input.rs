use std::fs::File;
use std::io::{self, BufRead, BufReader};

use crate::conditional::CondFrame;
use crate::lexer::is_name_char;
use crate::EOF;

/// Where a [`FileContext`] reads its bytes from.
pub(crate) enum Source {
    /// The caller-supplied top-level stream.
    Stream(Box<dyn BufRead>),
    /// A file opened by `#include`, owned by its context.
    File(BufReader<File>),
}

impl Source {
    fn reader(&mut self) -> &mut dyn BufRead {
        match self {
            Source::Stream(reader) => reader,
            Source::File(reader) => reader,
        }
    }
}

/// Per-file parsing state: one frame of the include chain.
///
/// Holds the current physical line as raw bytes with a cursor; reading past
/// the end yields the [`EOF`] sentinel, so scanning loops need no separate
/// bounds checks. Conditional state is per file: an include cannot close a
/// conditional opened by its includer.
pub(crate) struct FileContext {
    /// Name as requested (top-level name or the `#include` operand).
    pub file_name: String,
    pub source: Source,
    /// 1-based once the first line is read.
    pub line_number: usize,
    pub line: Vec<u8>,
    pub cursor: usize,
    pub cond: Vec<CondFrame>,
}

impl FileContext {
    pub fn new(file_name: String, source: Source) -> Self {
        Self {
            file_name,
            source,
            line_number: 0,
            line: Vec::new(),
            cursor: 0,
            cond: Vec::new(),
        }
    }

    /// Byte under the cursor, or [`EOF`] past the end of the line.
    pub fn peek(&self) -> u8 {
        self.peek_at(0)
    }

    pub fn peek_at(&self, offset: usize) -> u8 {
        self.line.get(self.cursor + offset).copied().unwrap_or(EOF)
    }

    /// Consume and return the byte under the cursor.
    pub fn take(&mut self) -> u8 {
        let c = self.peek();
        if c != EOF {
            self.cursor += 1;
        }
        c
    }

    pub fn rest(&self) -> &[u8] {
        &self.line[self.cursor.min(self.line.len())..]
    }

    /// Abandon the remainder of the current line.
    pub fn kill_line(&mut self) {
        self.cursor = self.line.len();
    }

    /// The run of name characters starting at the cursor (may be empty).
    pub fn name_run(&self) -> &[u8] {
        let rest = self.rest();
        let len = rest.iter().take_while(|&&c| is_name_char(c)).count();
        &rest[..len]
    }

    pub fn name_run_len(&self) -> usize {
        self.name_run().len()
    }

    /// Read the next physical line into the buffer, newline included.
    /// Returns false at end of input.
    pub fn read_physical_line(&mut self) -> io::Result<bool> {
        self.line.clear();
        self.cursor = 0;
        let n = self.source.reader().read_until(b'\n', &mut self.line)?;
        if n == 0 {
            return Ok(false);
        }
        self.line_number += 1;
        Ok(true)
    }
}

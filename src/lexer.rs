use crate::error::ParseIssue;
use crate::parser::MenuParser;
use crate::{EOF, MAX_NESTED_MACROS};

/// Characters that can form a macro name or plain word.
pub(crate) fn is_name_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_'
}

/// ASCII whitespace, the newline terminating the buffer included.
pub(crate) fn is_space(c: u8) -> bool {
    matches!(c, b' ' | b'\t' | b'\n' | b'\x0b' | b'\x0c' | b'\r')
}

impl MenuParser {
    /// Advance over whitespace, comments and line continuations. Returns
    /// false once the logical line holds no further significant content,
    /// otherwise leaves the cursor on the next significant byte. Closing a
    /// continuation or a `/* */` pulls in further physical lines.
    pub(crate) fn skip_ignorable(&mut self) -> bool {
        loop {
            while is_space(self.cur().peek()) {
                self.cur_mut().cursor += 1;
            }
            let c = self.cur().peek();
            if c == EOF {
                return false;
            }
            if c == b'\\' {
                let next = self.cur().peek_at(1);
                let at_line_end = next == EOF || (next == b'\n' && self.cur().peek_at(2) == EOF);
                if at_line_end {
                    if !self.read_continuation_line() {
                        return false;
                    }
                    continue;
                }
                return true; // escape, token material
            }
            if c == b'/' {
                match self.cur().peek_at(1) {
                    b'/' => return false,
                    b'*' => {
                        if !self.skip_block_comment() {
                            return false;
                        }
                        continue;
                    }
                    _ => return true,
                }
            }
            return true;
        }
    }

    fn read_continuation_line(&mut self) -> bool {
        match self.cur_mut().read_physical_line() {
            Ok(true) => true,
            Ok(false) => {
                self.report(ParseIssue::PrematureContinuation);
                false
            }
            Err(e) => {
                self.report(ParseIssue::ReadFailed {
                    message: e.to_string(),
                });
                false
            }
        }
    }

    /// Scan past a `/* */` comment, which may span physical lines.
    fn skip_block_comment(&mut self) -> bool {
        let start_line = self.cur().line_number;
        self.cur_mut().cursor += 2;
        loop {
            loop {
                let c = self.cur().peek();
                if c == EOF {
                    break;
                }
                if c == b'*' && self.cur().peek_at(1) == b'/' {
                    self.cur_mut().cursor += 2;
                    return true;
                }
                self.cur_mut().cursor += 1;
            }
            match self.cur_mut().read_physical_line() {
                Ok(true) => {}
                Ok(false) => {
                    self.report(ParseIssue::UnterminatedComment { start_line });
                    return false;
                }
                Err(e) => {
                    self.report(ParseIssue::ReadFailed {
                        message: e.to_string(),
                    });
                    return false;
                }
            }
        }
    }

    /// Extract one token from the cursor, expanding macros in place.
    ///
    /// The caller has already positioned the cursor on significant content
    /// via [`Self::skip_ignorable`]. Each expansion splices the replacement
    /// into the line buffer and restarts scanning at the splice point, with
    /// a budget bounding runaway self-reference.
    pub(crate) fn next_token(&mut self) -> Vec<u8> {
        let mut token = Vec::new();
        let mut budget = MAX_NESTED_MACROS;
        loop {
            let c = self.cur().peek();
            if c == EOF || is_space(c) {
                break;
            }
            if c == b'/' && matches!(self.cur().peek_at(1), b'/' | b'*') {
                break;
            }
            if c == b'\\' {
                let next = self.cur().peek_at(1);
                if next == b'\n' || next == EOF {
                    break;
                }
                // escape outside quotes: keep the escaped byte only
                self.cur_mut().cursor += 1;
                token.push(self.cur_mut().take());
                continue;
            }
            if c == b'"' {
                self.read_double_quoted(&mut token);
                continue;
            }
            if c == b'\'' {
                self.read_single_quoted(&mut token);
                continue;
            }
            if is_name_char(c) {
                let run = self.cur().name_run().to_vec();
                if let Some(found) = self.find_macro(&run) {
                    self.expand_macro(&found);
                    if budget > 0 {
                        budget -= 1;
                        continue;
                    }
                    self.report(ParseIssue::TooManyExpansions);
                    let skip = self.cur().name_run_len();
                    self.cur_mut().cursor += skip;
                    break;
                }
                self.cur_mut().cursor += run.len();
                token.extend_from_slice(&run);
                continue;
            }
            token.push(self.cur_mut().take());
        }
        token
    }

    /// Double quotes delimit a run where escapes resolve and macros never
    /// expand; the delimiters are stripped.
    fn read_double_quoted(&mut self, token: &mut Vec<u8>) {
        self.cur_mut().cursor += 1;
        loop {
            let c = self.cur().peek();
            if c == EOF || c == b'\n' {
                self.report(ParseIssue::UnterminatedDoubleQuote);
                return;
            }
            self.cur_mut().cursor += 1;
            match c {
                b'\\' => {
                    let escaped = self.cur().peek();
                    if escaped == EOF || escaped == b'\n' {
                        self.report(ParseIssue::UnterminatedDoubleQuote);
                        return;
                    }
                    self.cur_mut().cursor += 1;
                    token.push(escaped);
                }
                b'"' => return,
                _ => token.push(c),
            }
        }
    }

    /// Single quotes are copied verbatim, delimiters and backslashes
    /// included.
    fn read_single_quoted(&mut self, token: &mut Vec<u8>) {
        token.push(self.cur_mut().take());
        loop {
            let c = self.cur().peek();
            if c == EOF || c == b'\n' {
                self.report(ParseIssue::UnterminatedSingleQuote);
                return;
            }
            self.cur_mut().cursor += 1;
            token.push(c);
            if c == b'\'' {
                return;
            }
        }
    }
}

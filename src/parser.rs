use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{Diagnostic, Error, ParseIssue, Result};
use crate::input::{FileContext, Source};
use crate::lexer::is_space;
use crate::state::State;
use crate::{EOF, MAX_LINE};

/// One preprocessed menu line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MenuEntry {
    pub title: String,
    pub command: Option<String>,
    pub parameter: Option<String>,
    pub shortcut: Option<String>,
}

/// What the next token on the logical line will become.
#[derive(Clone, Copy, PartialEq)]
enum Scan {
    Title,
    Command,
    Shortcut,
    Parameters,
}

/// Preprocessor for one menu file and everything it includes.
///
/// Feed it with [`MenuParser::open`] or any buffered reader and pull
/// entries with [`MenuParser::next_entry`] or the [`Iterator`] impl.
/// Problems in the input never abort the session; they are logged and
/// collected, see [`MenuParser::diagnostics`].
pub struct MenuParser {
    pub(crate) state: State,
    /// Open include chain, outermost first, innermost last. Never empty.
    pub(crate) files: Vec<FileContext>,
}

impl MenuParser {
    /// Parse from a caller-supplied stream. `include_paths` is a
    /// colon-separated directory list consulted by `#include`.
    pub fn new(
        file_name: impl Into<String>,
        input: impl BufRead + 'static,
        include_paths: &str,
    ) -> Self {
        let mut parser = Self {
            state: State::new(include_paths),
            files: vec![FileContext::new(
                file_name.into(),
                Source::Stream(Box::new(input)),
            )],
        };
        crate::macros::register_preset_macros(&mut parser.state);
        parser
    }

    /// Open a menu file for parsing.
    pub fn open(path: impl AsRef<Path>, include_paths: &str) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| Error::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(
            path.display().to_string(),
            BufReader::new(file),
            include_paths,
        ))
    }

    /// Name of the originally opened file.
    pub fn file_name(&self) -> &str {
        &self.files[0].file_name
    }

    /// Everything reported so far, in order of occurrence.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.state.diagnostics
    }

    pub(crate) fn cur(&self) -> &FileContext {
        self.files.last().expect("include chain is never empty")
    }

    pub(crate) fn cur_mut(&mut self) -> &mut FileContext {
        self.files.last_mut().expect("include chain is never empty")
    }

    pub(crate) fn base_file_name(&self) -> &str {
        &self.files[0].file_name
    }

    pub(crate) fn current_file_name(&self) -> &str {
        &self.cur().file_name
    }

    pub(crate) fn current_line(&self) -> usize {
        self.cur().line_number
    }

    pub(crate) fn include_level(&self) -> usize {
        self.files.len() - 1
    }

    /// Record a diagnostic against the innermost open file and log it.
    pub(crate) fn report(&mut self, issue: ParseIssue) {
        let innermost = self.cur();
        let included_from = self.files[..self.files.len() - 1]
            .iter()
            .rev()
            .map(|ctx| (ctx.file_name.clone(), ctx.line_number))
            .collect();
        let diagnostic = Diagnostic {
            file: innermost.file_name.clone(),
            line: innermost.line_number,
            issue,
            included_from,
        };
        log::warn!("{diagnostic}");
        self.state.diagnostics.push(diagnostic);
    }

    /// Produce the next menu line, or `None` at end of input.
    ///
    /// Directives never produce entries; a logical line of plain content
    /// maps to title, command (with the `SHORTCUT` marker detour), then
    /// space-joined parameters.
    pub fn next_entry(&mut self) -> Option<MenuEntry> {
        let mut title: Option<String> = None;
        let mut command: Option<String> = None;
        let mut shortcut: Option<String> = None;
        let mut parameter: Option<String> = None;
        let mut parameter_clipped = false;
        let mut mode = Scan::Title;

        'lines: loop {
            // Only reachable in Title mode: a started entry is delivered
            // at its end of line below, before any further read.
            if !self.advance_to_next_physical_line() {
                return None;
            }
            loop {
                if !self.skip_ignorable() {
                    if mode == Scan::Title {
                        continue 'lines;
                    }
                    break 'lines;
                }
                if mode == Scan::Title && self.cur().peek() == b'#' {
                    self.cur_mut().cursor += 1;
                    self.handle_directive();
                    continue 'lines;
                }
                if self.skipping() {
                    continue 'lines;
                }
                let token = String::from_utf8_lossy(&self.next_token()).into_owned();
                match mode {
                    Scan::Title => {
                        title = Some(token);
                        mode = Scan::Command;
                    }
                    Scan::Command => {
                        if token == "SHORTCUT" {
                            mode = Scan::Shortcut;
                        } else {
                            command = Some(token);
                            mode = Scan::Parameters;
                        }
                    }
                    Scan::Shortcut => {
                        if shortcut.is_some() {
                            self.report(ParseIssue::DuplicateShortcut);
                        }
                        // the later definition wins
                        shortcut = Some(token);
                        mode = Scan::Command;
                    }
                    Scan::Parameters => {
                        let joined = parameter.get_or_insert_with(String::new);
                        if !joined.is_empty() {
                            joined.push(' ');
                        }
                        joined.push_str(&token);
                        if joined.len() > MAX_LINE {
                            truncate_at_boundary(joined, MAX_LINE);
                            parameter_clipped = true;
                        }
                    }
                }
            }
        }
        if parameter_clipped {
            self.report(ParseIssue::ParameterTruncated);
        }
        Some(MenuEntry {
            title: title.unwrap_or_default(),
            command,
            parameter,
            shortcut,
        })
    }

    /// Read the next physical line; at end of an include, resume the
    /// including file. Returns false once the whole input is exhausted.
    fn advance_to_next_physical_line(&mut self) -> bool {
        loop {
            match self.cur_mut().read_physical_line() {
                Ok(true) => return true,
                Ok(false) => {
                    self.report_unterminated_conditionals();
                    if self.files.len() == 1 {
                        return false;
                    }
                    self.files.pop();
                    log::debug!("resuming \"{}\" after include", self.cur().file_name);
                }
                Err(e) => {
                    self.report(ParseIssue::ReadFailed {
                        message: e.to_string(),
                    });
                    self.report_unterminated_conditionals();
                    if self.files.len() == 1 {
                        return false;
                    }
                    self.files.pop();
                }
            }
        }
    }

    /// One report per frame left open at end of file; draining the stack
    /// keeps repeated calls after EOF silent.
    fn report_unterminated_conditionals(&mut self) {
        let frames: Vec<_> = self.cur_mut().cond.drain(..).collect();
        for frame in frames.into_iter().rev() {
            self.report(ParseIssue::UnterminatedConditional {
                directive: frame.directive,
                line: frame.line,
            });
        }
    }

    /// Dispatch the directive following a line-initial `#`.
    fn handle_directive(&mut self) {
        while is_space(self.cur().peek()) {
            self.cur_mut().cursor += 1;
        }
        let mut word = Vec::new();
        loop {
            let c = self.cur().peek();
            if c == EOF {
                break;
            }
            self.cur_mut().cursor += 1;
            if is_space(c) {
                break;
            }
            word.push(c);
        }
        match word.as_slice() {
            b"include" => {
                let Some(child) = self.include_file() else {
                    return;
                };
                self.warn_extra_directive_text();
                log::debug!(
                    "entering include \"{}\" at depth {}",
                    child.file_name,
                    self.files.len()
                );
                self.files.push(child);
                return;
            }
            b"define" => self.define_macro(),
            b"ifdef" => self.condition_ifmacro(true),
            b"ifndef" => self.condition_ifmacro(false),
            b"else" => self.condition_else(),
            b"endif" => self.condition_end(),
            _ => {
                self.report(ParseIssue::UnknownDirective {
                    name: String::from_utf8_lossy(&word).into_owned(),
                });
                return;
            }
        }
        self.warn_extra_directive_text();
    }

    fn warn_extra_directive_text(&mut self) {
        if self.skip_ignorable() {
            let rest = self.cur().rest();
            let sample = String::from_utf8_lossy(&rest[..rest.len().min(16)])
                .trim_end()
                .to_owned();
            self.report(ParseIssue::ExtraDirectiveText { text: sample });
            self.cur_mut().kill_line();
        }
    }
}

impl Iterator for MenuParser {
    type Item = MenuEntry;

    fn next(&mut self) -> Option<MenuEntry> {
        self.next_entry()
    }
}

fn truncate_at_boundary(text: &mut String, max: usize) {
    let mut end = max;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    text.truncate(end);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{entries, issues, parser_for};

    #[test]
    fn full_entry_with_shortcut_and_parameters() {
        let got = entries("XTerm SHORTCUT t exec xterm -bg black\n");
        assert_eq!(
            got,
            vec![MenuEntry {
                title: "XTerm".into(),
                command: Some("exec".into()),
                parameter: Some("xterm -bg black".into()),
                shortcut: Some("t".into()),
            }]
        );
    }

    #[test]
    fn title_only_line() {
        let got = entries("\"Applications\"\n");
        assert_eq!(got[0].title, "Applications");
        assert_eq!(got[0].command, None);
        assert_eq!(got[0].parameter, None);
        assert_eq!(got[0].shortcut, None);
    }

    #[test]
    fn blank_lines_and_comment_lines_produce_nothing() {
        let input = "\n   \n// only a comment\n/* block */\nReal cmd\n";
        let got = entries(input);
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].title, "Real");
    }

    #[test]
    fn duplicate_shortcut_reports_and_later_wins() {
        let got = entries("T SHORTCUT a SHORTCUT b cmd\n");
        assert_eq!(got[0].shortcut.as_deref(), Some("b"));
        assert_eq!(got[0].command.as_deref(), Some("cmd"));
        assert_eq!(
            issues("T SHORTCUT a SHORTCUT b cmd\n"),
            vec![ParseIssue::DuplicateShortcut]
        );
    }

    #[test]
    fn directives_are_only_recognized_at_line_start() {
        // mid-line '#' is ordinary token material
        let got = entries("Title cmd #define X y\n");
        assert_eq!(got[0].parameter.as_deref(), Some("#define X y"));
    }

    #[test]
    fn unknown_directive_is_reported_and_skipped() {
        let input = "#frobnicate all the things\nAfter cmd\n";
        let got = entries(input);
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].title, "After");
        assert_eq!(
            issues(input),
            vec![ParseIssue::UnknownDirective {
                name: "frobnicate".into()
            }]
        );
    }

    #[test]
    fn extra_text_after_directive_is_reported() {
        let input = "#endif trailing junk\n";
        let found = issues(input);
        assert_eq!(found.len(), 2);
        assert_eq!(
            found[0],
            ParseIssue::UnmatchedConditional { directive: "endif" }
        );
        assert_eq!(
            found[1],
            ParseIssue::ExtraDirectiveText {
                text: "trailing junk".into()
            }
        );
    }

    #[test]
    fn overlong_parameter_string_is_truncated_with_report() {
        let words = "word ".repeat(300);
        let input = format!("Title cmd {words}\n");
        let mut parser = parser_for(&input);
        let entry = parser.next_entry().unwrap();
        assert_eq!(entry.parameter.as_ref().map(String::len), Some(MAX_LINE));
        assert!(parser
            .diagnostics()
            .iter()
            .any(|d| d.issue == ParseIssue::ParameterTruncated));
    }

    #[test]
    fn iterator_yields_all_entries() {
        let collected: Vec<_> = parser_for("A one\nB two\nC three\n").collect();
        assert_eq!(collected.len(), 3);
        assert_eq!(collected[2].title, "C");
    }

    #[test]
    fn next_entry_keeps_returning_none_after_eof() {
        let mut parser = parser_for("Only cmd\n");
        assert!(parser.next_entry().is_some());
        assert!(parser.next_entry().is_none());
        assert!(parser.next_entry().is_none());
        assert!(parser.diagnostics().is_empty());
    }
}

use std::env;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::error::ParseIssue;
use crate::input::{FileContext, Source};
use crate::parser::MenuParser;
use crate::{EOF, MAX_NESTED_INCLUDES};

fn expand_tilde(entry: &str) -> PathBuf {
    if let Some(rest) = entry.strip_prefix('~') {
        let mut path = PathBuf::from(env::var("HOME").unwrap_or_default());
        path.push(rest.trim_start_matches('/'));
        return path;
    }
    PathBuf::from(entry)
}

impl MenuParser {
    /// Handle `#include`. Returns the freshly opened child context; the
    /// caller pushes it only after the trailing-text check, so that warning
    /// lands on the including file.
    pub(crate) fn include_file(&mut self) -> Option<FileContext> {
        if !self.skip_ignorable() {
            self.report(ParseIssue::MissingIncludeName);
            return None;
        }
        let closing = match self.cur_mut().take() {
            b'<' => b'>',
            b'"' => b'"',
            _ => {
                self.report(ParseIssue::BadIncludeDelimiter);
                return None;
            }
        };
        let mut requested = Vec::new();
        loop {
            let c = self.cur().peek();
            if c == EOF {
                self.report(ParseIssue::UnterminatedIncludeName {
                    delimiter: closing as char,
                });
                return None;
            }
            self.cur_mut().cursor += 1;
            if c == closing {
                break;
            }
            requested.push(c);
        }
        let requested = String::from_utf8_lossy(&requested).into_owned();

        // syntax checked; a skipped branch opens nothing
        if self.skipping() {
            return None;
        }

        if self.files.len() - 1 >= MAX_NESTED_INCLUDES {
            self.report(ParseIssue::IncludeTooDeep);
            return None;
        }
        match self.resolve_include(&requested) {
            // The child keeps the requested name, so __FILE__ and
            // diagnostics show what the menu author wrote.
            Some(file) => Some(FileContext::new(
                requested,
                Source::File(BufReader::new(file)),
            )),
            None => {
                self.report(ParseIssue::IncludeNotFound { name: requested });
                None
            }
        }
    }

    /// Absolute names open as given. A relative name is first tried next
    /// to the including file (or as-is when that file has no directory
    /// part), then under each configured search directory, with a leading
    /// `~` standing for $HOME. First successful open wins.
    fn resolve_include(&self, requested: &str) -> Option<File> {
        if Path::new(requested).is_absolute() {
            return File::open(requested).ok();
        }
        let beside_includer = match Path::new(&self.cur().file_name).parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.join(requested),
            _ => PathBuf::from(requested),
        };
        if let Ok(file) = File::open(beside_includer) {
            return Some(file);
        }
        for entry in &self.state.search_paths {
            if let Ok(file) = File::open(expand_tilde(entry).join(requested)) {
                return Some(file);
            }
        }
        None
    }
}

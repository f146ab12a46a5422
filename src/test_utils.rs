use std::io::Cursor;

use crate::{MenuEntry, MenuParser, ParseIssue};

/// Parser over an in-memory menu file named `test.menu`, no search paths.
pub(crate) fn parser_for(input: &str) -> MenuParser {
    MenuParser::new("test.menu", Cursor::new(input.to_owned()), "")
}

pub(crate) fn entries(input: &str) -> Vec<MenuEntry> {
    parser_for(input).collect()
}

pub(crate) fn titles(input: &str) -> Vec<String> {
    entries(input).into_iter().map(|entry| entry.title).collect()
}

/// Drain the input and return the reported issues, file context stripped.
pub(crate) fn issues(input: &str) -> Vec<ParseIssue> {
    let mut parser = parser_for(input);
    while parser.next_entry().is_some() {}
    parser
        .diagnostics()
        .iter()
        .map(|diagnostic| diagnostic.issue.clone())
        .collect()
}

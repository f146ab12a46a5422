//! Preprocessor for hierarchical menu-definition files.
//!
//! Menu files carry one entry per logical line (title, command, optional
//! shortcut marker, parameters), plus a small C-preprocessor-like layer:
//! `#define` with parameters, `#ifdef`/`#ifndef`/`#else`/`#endif`,
//! `#include` with a search path, `//` and `/* */` comments and `\`
//! line continuations.
//!
//! ```no_run
//! use menuparse::MenuParser;
//!
//! let mut parser = MenuParser::open("root.menu", "/usr/share/menus")?;
//! parser.register_simple_macro("DISPLAY", ":0");
//! for entry in &mut parser {
//!     println!("{} -> {:?}", entry.title, entry.command);
//! }
//! for diagnostic in parser.diagnostics() {
//!     eprintln!("{diagnostic}");
//! }
//! # Ok::<(), menuparse::Error>(())
//! ```

use std::io::Write;
use std::path::PathBuf;

pub mod error;

mod conditional;
mod include;
mod input;
mod lexer;
mod macros;
mod parser;
mod state;
#[cfg(test)]
mod test_utils;

pub use error::{Diagnostic, Error, ParseIssue, Result};
pub use parser::{MenuEntry, MenuParser};

/// End-of-buffer sentinel; an embedded NUL terminates the logical line.
pub const EOF: u8 = b'\0';

/// Cap for spliced macro expansions and the joined parameter string.
pub const MAX_LINE: usize = 1024;
/// Macro expansions allowed for a single token before giving up.
pub const MAX_NESTED_MACROS: usize = 32;
/// Open `#include` chain depth below the top-level file.
pub const MAX_NESTED_INCLUDES: usize = 16;
/// Parameters of a function-like macro.
pub const MAX_MACRO_ARGS: usize = 32;
/// `#ifdef`/`#ifndef` nesting per file.
pub const MAX_COND_DEPTH: usize = 32;
/// Stored macro-name length; longer names are truncated with a warning.
pub const MACRO_NAME_MAX: usize = 64;
/// Encoded macro-body size; definitions over this limit are rejected.
pub const MACRO_BODY_MAX: usize = 2048;

#[derive(Debug, Clone, Default, clap::Parser)]
#[command(version, about)]
pub struct Args {
    /// Colon-separated directories searched by #include; a leading `~`
    /// expands to the home directory.
    #[arg(short = 'I', long, default_value = "")]
    pub include_path: String,
    /// `name[=val]`
    ///
    /// Define `name` to `val`, or to the empty string if `=val` is
    /// omitted, before parsing starts.
    #[arg(short = 'D', long = "define", value_name = "NAME[=VALUE]")]
    pub define: Vec<String>,
    /// Menu file to preprocess; stdin when omitted.
    pub file: Option<PathBuf>,
}

pub fn run(stdout: &mut impl Write, args: Args) -> Result<()> {
    let mut parser = match &args.file {
        Some(path) => MenuParser::open(path, &args.include_path)?,
        None => MenuParser::new("stdin", std::io::stdin().lock(), &args.include_path),
    };
    for definition in &args.define {
        match definition.split_once('=') {
            Some((name, value)) => parser.register_simple_macro(name, value),
            None => parser.register_simple_macro(definition, ""),
        }
    }
    while let Some(entry) = parser.next_entry() {
        writeln!(stdout, "{}", render(&entry))?;
    }
    Ok(())
}

/// One line per entry, fields quoted, absent fields left out.
fn render(entry: &MenuEntry) -> String {
    let mut out = format!("{:?}", entry.title);
    if let Some(command) = &entry.command {
        out.push(' ');
        out.push_str(&format!("{command:?}"));
    }
    if let Some(parameter) = &entry.parameter {
        out.push(' ');
        out.push_str(&format!("{parameter:?}"));
    }
    if let Some(shortcut) = &entry.shortcut {
        out.push_str(&format!(" shortcut={shortcut:?}"));
    }
    out
}

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Fatal, caller-facing failures. Everything the engine hits while parsing
/// is a [`ParseIssue`] instead: reported, collected, then recovered from so
/// the caller keeps receiving menu lines.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("could not open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// One recoverable problem found while preprocessing a menu file.
///
/// Syntax errors discard the offending construct, resource errors abandon
/// it, capacity overflows truncate; parsing continues in every case.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseIssue {
    #[error("premature end of file while expecting a new line after '\\'")]
    PrematureContinuation,
    #[error("reached end of file while searching '*/' for comment started at line {start_line}")]
    UnterminatedComment { start_line: usize },
    #[error("missing closing double-quote before end-of-line")]
    UnterminatedDoubleQuote,
    #[error("missing closing simple-quote before end-of-line")]
    UnterminatedSingleQuote,
    #[error("too many nested macro expansions, breaking loop")]
    TooManyExpansions,
    #[error("unknown directive '#{name}'")]
    UnknownDirective { name: String },
    #[error("extra text after '#' command is ignored: \"{text}...\"")]
    ExtraDirectiveText { text: String },
    #[error("no file name found for #include")]
    MissingIncludeName,
    #[error("file name must be enclosed in brackets or double-quotes for #include")]
    BadIncludeDelimiter,
    #[error("missing closing '{delimiter}' in filename specification")]
    UnterminatedIncludeName { delimiter: char },
    #[error("too many nested #include's")]
    IncludeTooDeep,
    #[error("could not find file \"{name}\" for #include")]
    IncludeNotFound { name: String },
    #[error("no macro name found for #define")]
    MissingMacroName,
    #[error("name of macro \"{name}\" is too long, truncated")]
    MacroNameTooLong { name: String },
    #[error("premature end of line while reading parameter list for macro \"{name}\"")]
    UnterminatedParameterList { name: String },
    #[error("too many parameters for macro \"{name}\" definition")]
    TooManyParameters { name: String },
    #[error("invalid character '{found}' in parameter list for macro \"{name}\" while expecting {expected}")]
    BadParameterList {
        found: char,
        name: String,
        expected: &'static str,
    },
    #[error("more content than supported for the macro \"{name}\"")]
    MacroBodyTooBig { name: String },
    #[error("macro \"{name}\" already defined, ignoring redefinition")]
    MacroRedefined { name: String },
    #[error("size of value for macro \"{name}\" is too big, truncated")]
    SimpleMacroTruncated { name: String },
    #[error("macro \"{name}\" needs parenthesis for arguments")]
    MacroNeedsArguments { name: String },
    #[error("wrong number of arguments for macro \"{name}\", expected {expected} but got {found}")]
    WrongArgumentCount {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("missing closing quote or double-quote before end-of-line")]
    UnterminatedArgumentQuote,
    #[error("premature end of line while searching for arguments to macro \"{name}\"")]
    UnterminatedArgumentList { name: String },
    #[error("too much data in argument list of macro \"{name}\", truncated")]
    ArgumentsTruncated { name: String },
    #[error("expansion for macro \"{name}\" too big, line truncated")]
    ExpansionTruncated { name: String },
    #[error("missing macro name argument to #{directive}")]
    MissingConditionName { directive: &'static str },
    #[error("too many nested #if sequences")]
    TooManyConditionals,
    #[error("found #{directive} but has no matching #if")]
    UnmatchedConditional { directive: &'static str },
    #[error("missing #endif to match #{directive} at line {line}")]
    UnterminatedConditional {
        directive: &'static str,
        line: usize,
    },
    #[error("multiple SHORTCUT definition not valid")]
    DuplicateShortcut,
    #[error("parameter list too long, truncated")]
    ParameterTruncated,
    #[error("could not determine {what}")]
    CannotDetermine { what: &'static str },
    #[error("read error: {message}")]
    ReadFailed { message: String },
}

/// A [`ParseIssue`] attributed to the innermost open file, with the chain
/// of enclosing `#include`s for context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub file: String,
    pub line: usize,
    pub issue: ParseIssue,
    /// (file, line) of each enclosing include, innermost first.
    pub included_from: Vec<(String, usize)>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.file, self.line, self.issue)?;
        for (file, line) in &self.included_from {
            write!(f, "\n   included from file \"{file}\" at line {line}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_display_carries_include_chain() {
        let diagnostic = Diagnostic {
            file: "colors.menu".into(),
            line: 7,
            issue: ParseIssue::IncludeNotFound {
                name: "missing.menu".into(),
            },
            included_from: vec![("theme.menu".into(), 12), ("root.menu".into(), 3)],
        };
        similar_asserts::assert_eq!(
            diagnostic.to_string(),
            "colors.menu:7: could not find file \"missing.menu\" for #include\n   \
             included from file \"theme.menu\" at line 12\n   \
             included from file \"root.menu\" at line 3"
        );
    }
}

use std::cell::RefCell;
use std::env;
use std::ffi::CStr;
use std::rc::Rc;

use super::{Body, Macro, Segment};
use crate::error::ParseIssue;
use crate::parser::MenuParser;
use crate::state::State;
use crate::MACRO_BODY_MAX;

#[derive(Clone, Copy, Debug)]
enum BuiltinKind {
    BaseFile,
    IncludeLevel,
    CurrentFile,
    CurrentLine,
    Hostname,
    UserName,
    UserId,
}

impl BuiltinKind {
    /// Values that cannot change during one parsing session are computed
    /// once and reused.
    fn cacheable(self) -> bool {
        matches!(
            self,
            Self::BaseFile | Self::Hostname | Self::UserName | Self::UserId
        )
    }
}

/// A built-in macro whose expansion is computed on demand.
pub(crate) struct DynamicMacro {
    kind: BuiltinKind,
    cached: RefCell<Option<Vec<u8>>>,
}

impl DynamicMacro {
    fn new(kind: BuiltinKind) -> Self {
        Self {
            kind,
            cached: RefCell::new(None),
        }
    }

    pub(crate) fn evaluate(&self, parser: &MenuParser) -> (Vec<u8>, Option<ParseIssue>) {
        if self.kind.cacheable() {
            if let Some(value) = self.cached.borrow().as_ref() {
                return (value.clone(), None);
            }
        }
        let (value, issue) = self.compute(parser);
        if self.kind.cacheable() {
            *self.cached.borrow_mut() = Some(value.clone());
        }
        (value, issue)
    }

    fn compute(&self, parser: &MenuParser) -> (Vec<u8>, Option<ParseIssue>) {
        match self.kind {
            BuiltinKind::BaseFile => (quoted(parser.base_file_name()), None),
            BuiltinKind::IncludeLevel => (parser.include_level().to_string().into_bytes(), None),
            BuiltinKind::CurrentFile => (quoted(parser.current_file_name()), None),
            BuiltinKind::CurrentLine => (parser.current_line().to_string().into_bytes(), None),
            BuiltinKind::Hostname => hostname(),
            BuiltinKind::UserName => user_name(),
            BuiltinKind::UserId => (uid().to_string().into_bytes(), None),
        }
    }
}

/// File names expand with surrounding double quotes so names containing
/// spaces stay one token.
fn quoted(name: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(name.len() + 2);
    out.push(b'"');
    out.extend_from_slice(name.as_bytes());
    out.push(b'"');
    out
}

fn uid() -> libc::uid_t {
    unsafe { libc::getuid() }
}

/// $HOSTNAME, then $HOST, then gethostname(2).
fn hostname() -> (Vec<u8>, Option<ParseIssue>) {
    for var in ["HOSTNAME", "HOST"] {
        if let Ok(value) = env::var(var) {
            return (value.into_bytes(), None);
        }
    }
    let mut buf = [0u8; 256];
    let rc = unsafe { libc::gethostname(buf.as_mut_ptr() as *mut libc::c_char, buf.len()) };
    if rc == 0 {
        let len = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
        (buf[..len].to_vec(), None)
    } else {
        (
            b"???".to_vec(),
            Some(ParseIssue::CannotDetermine { what: "HOSTNAME" }),
        )
    }
}

/// getlogin(2), then the passwd entry for the current uid. The numeric id
/// is the last resort, flagged with a diagnostic.
fn user_name() -> (Vec<u8>, Option<ParseIssue>) {
    unsafe {
        let login = libc::getlogin();
        if !login.is_null() {
            return (CStr::from_ptr(login).to_bytes().to_vec(), None);
        }
        let pw = libc::getpwuid(libc::getuid());
        if !pw.is_null() && !(*pw).pw_name.is_null() {
            return (CStr::from_ptr((*pw).pw_name).to_bytes().to_vec(), None);
        }
    }
    (
        uid().to_string().into_bytes(),
        Some(ParseIssue::CannotDetermine { what: "USER" }),
    )
}

/// Pre-defined dynamic macros, registered by the constructor.
pub(crate) fn register_preset_macros(state: &mut State) {
    let presets: [(&[u8], BuiltinKind); 7] = [
        (b"__BASE_FILE__", BuiltinKind::BaseFile),
        (b"__INCLUDE_LEVEL__", BuiltinKind::IncludeLevel),
        (b"__FILE__", BuiltinKind::CurrentFile),
        (b"__LINE__", BuiltinKind::CurrentLine),
        (b"HOST", BuiltinKind::Hostname),
        (b"UID", BuiltinKind::UserId),
        (b"USER", BuiltinKind::UserName),
    ];
    for (name, kind) in presets {
        state.macros.push(Rc::new(Macro {
            name: name.to_vec(),
            arg_count: None,
            body: Body::Dynamic(DynamicMacro::new(kind)),
        }));
    }
}

impl MenuParser {
    /// Register an object-like macro with a fixed value, the way a window
    /// manager injects `__VERSION__`, `DISPLAY` and friends before parsing.
    /// The newest registration of a name wins, shadowing built-ins too.
    pub fn register_simple_macro(&mut self, name: &str, value: &str) {
        let mut bytes = value.as_bytes().to_vec();
        if bytes.len() > MACRO_BODY_MAX {
            bytes.truncate(MACRO_BODY_MAX);
            self.report(ParseIssue::SimpleMacroTruncated {
                name: name.to_owned(),
            });
        }
        let segments = if bytes.is_empty() {
            Vec::new()
        } else {
            vec![Segment::Literal(bytes)]
        };
        self.state.macros.insert(
            0,
            Rc::new(Macro {
                name: name.as_bytes().to_vec(),
                arg_count: None,
                body: Body::Literal(segments),
            }),
        );
    }
}

#[cfg(test)]
mod tests {
    use crate::test_utils::{entries, parser_for};

    #[test]
    fn line_macro_tracks_the_current_line() {
        let got = entries("First __LINE__\nSecond __LINE__\n");
        assert_eq!(got[0].command.as_deref(), Some("1"));
        assert_eq!(got[1].command.as_deref(), Some("2"));
    }

    #[test]
    fn file_macro_names_the_current_file() {
        // expansion carries double quotes, stripped again at token level
        let got = entries("Where __FILE__\n");
        assert_eq!(got[0].command.as_deref(), Some("test.menu"));
    }

    #[test]
    fn include_level_is_zero_at_top_level() {
        let got = entries("Level __INCLUDE_LEVEL__\n");
        assert_eq!(got[0].command.as_deref(), Some("0"));
    }

    #[test]
    fn uid_macro_matches_process_uid() {
        let got = entries("Me UID\n");
        let expected = unsafe { libc::getuid() }.to_string();
        assert_eq!(got[0].command.as_deref(), Some(expected.as_str()));
    }

    #[test]
    fn registered_macro_shadows_builtin() {
        let mut parser = parser_for("Who USER\n");
        parser.register_simple_macro("USER", "nobody");
        let entry = parser.next_entry().unwrap();
        assert_eq!(entry.command.as_deref(), Some("nobody"));
    }

    #[test]
    fn empty_registered_value_expands_to_empty_token() {
        let mut parser = parser_for("Title EMPTY cmd\n");
        parser.register_simple_macro("EMPTY", "");
        let entry = parser.next_entry().unwrap();
        assert_eq!(entry.command.as_deref(), Some(""));
        assert_eq!(entry.parameter.as_deref(), Some("cmd"));
    }
}

mod builtin;
mod define;
mod expand;

use std::rc::Rc;

pub(crate) use builtin::{register_preset_macros, DynamicMacro};

use crate::parser::MenuParser;

/// One entry of the macro table.
pub(crate) struct Macro {
    pub name: Vec<u8>,
    /// `None` for an object-like macro (a bare word, no invocation syntax);
    /// `Some(n)` for a function-like macro taking exactly n arguments.
    pub arg_count: Option<usize>,
    pub body: Body,
}

pub(crate) enum Body {
    /// `#define`d or registered text, pre-split at parameter references.
    Literal(Vec<Segment>),
    /// Built-in whose value is computed at expansion time.
    Dynamic(DynamicMacro),
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Segment {
    Literal(Vec<u8>),
    /// Index into the invocation's argument list.
    Param(usize),
}

impl Macro {
    pub fn display_name(&self) -> String {
        String::from_utf8_lossy(&self.name).into_owned()
    }
}

impl MenuParser {
    /// Exact-name lookup; callers pass a full identifier run so boundary
    /// checking is implicit.
    pub(crate) fn find_macro(&self, name: &[u8]) -> Option<Rc<Macro>> {
        if name.is_empty() {
            return None;
        }
        self.state
            .macros
            .iter()
            .find(|entry| entry.name.as_slice() == name)
            .cloned()
    }
}

use std::rc::Rc;

use crate::error::Diagnostic;
use crate::macros::Macro;

/// State shared across the whole include chain: the macro table, the
/// `#include` search directories and every diagnostic reported so far.
pub(crate) struct State {
    /// Linear-scan table; menu files define a handful of macros at most.
    pub macros: Vec<Rc<Macro>>,
    pub search_paths: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
}

impl State {
    pub fn new(include_paths: &str) -> Self {
        Self {
            macros: Vec::new(),
            search_paths: include_paths
                .split(':')
                .filter(|path| !path.is_empty())
                .map(str::to_owned)
                .collect(),
            diagnostics: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_search_path_segments_are_dropped() {
        let state = State::new("");
        assert!(state.search_paths.is_empty());
        let state = State::new("/usr/share/menus::~/.config/menus:");
        assert_eq!(
            state.search_paths,
            vec!["/usr/share/menus".to_owned(), "~/.config/menus".to_owned()]
        );
    }
}

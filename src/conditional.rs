use crate::error::ParseIssue;
use crate::parser::MenuParser;
use crate::MAX_COND_DEPTH;

/// One `#ifdef`/`#ifndef` frame. Innermost frames sit at the end of the
/// per-file stack.
#[derive(Debug, Clone)]
pub(crate) struct CondFrame {
    pub skip: bool,
    /// Which directive opened the frame, for the missing-#endif report.
    pub directive: &'static str,
    pub line: usize,
}

impl MenuParser {
    /// True while the innermost conditional branch is inactive.
    pub(crate) fn skipping(&self) -> bool {
        self.cur().cond.last().is_some_and(|frame| frame.skip)
    }

    /// `#ifdef` / `#ifndef`: test whether the named macro exists and push a
    /// frame. A branch opened inside a skipped region is skipped outright,
    /// without consulting the macro table.
    pub(crate) fn condition_ifmacro(&mut self, check_exists: bool) {
        let directive = if check_exists { "ifdef" } else { "ifndef" };
        if !self.skip_ignorable() {
            self.report(ParseIssue::MissingConditionName { directive });
            return;
        }
        let name = self.cur().name_run().to_vec();
        self.cur_mut().cursor += name.len();

        if self.cur().cond.len() >= MAX_COND_DEPTH {
            self.report(ParseIssue::TooManyConditionals);
            return;
        }
        let skip = if self.skipping() {
            true
        } else {
            self.find_macro(&name).is_some() != check_exists
        };
        let line = self.cur().line_number;
        self.cur_mut().cond.push(CondFrame {
            skip,
            directive,
            line,
        });
    }

    /// `#else` flips the innermost branch, except when the directly
    /// enclosing frame is skipped, in which case the branch stays off.
    /// Only that one enclosing frame is consulted; skip state already
    /// propagates inward at push time.
    pub(crate) fn condition_else(&mut self) {
        let ctx = self.cur_mut();
        let depth = ctx.cond.len();
        if depth == 0 {
            self.report(ParseIssue::UnmatchedConditional { directive: "else" });
            return;
        }
        if depth > 1 && ctx.cond[depth - 2].skip {
            ctx.cond[depth - 1].skip = true;
        } else {
            ctx.cond[depth - 1].skip = !ctx.cond[depth - 1].skip;
        }
    }

    pub(crate) fn condition_end(&mut self) {
        if self.cur_mut().cond.pop().is_none() {
            self.report(ParseIssue::UnmatchedConditional { directive: "endif" });
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::error::ParseIssue;
    use crate::test_utils::{issues, titles};

    #[test]
    fn undefined_macro_skips_ifdef_branch() {
        let input = "\
#ifdef NOPE
Hidden cmd
#endif
Visible cmd
";
        assert_eq!(titles(input), vec!["Visible"]);
    }

    #[test]
    fn ifndef_selects_branch_when_macro_is_missing() {
        let input = "\
#ifndef NOPE
Shown cmd
#else
Hidden cmd
#endif
";
        assert_eq!(titles(input), vec!["Shown"]);
    }

    #[test]
    fn else_flips_the_branch() {
        let input = "\
#define COLOR
#ifdef COLOR
First cmd
#else
Second cmd
#endif
#ifndef COLOR
Third cmd
#else
Fourth cmd
#endif
";
        assert_eq!(titles(input), vec!["First", "Fourth"]);
    }

    #[test]
    fn nested_branch_inherits_outer_skip() {
        let input = "\
#define YES
#ifdef NOPE
#ifdef YES
Hidden cmd
#endif
#endif
Visible cmd
";
        assert_eq!(titles(input), vec!["Visible"]);
    }

    #[test]
    fn else_under_skipped_parent_stays_skipped() {
        // The inner #else consults only the directly enclosing frame; with
        // that frame skipped the branch never activates.
        let input = "\
#ifdef NOPE
#ifdef ALSO_NOPE
A cmd
#else
B cmd
#endif
#else
C cmd
#endif
";
        assert_eq!(titles(input), vec!["C"]);
    }

    #[test]
    fn endif_restores_enclosing_skip_state() {
        let input = "\
#define YES
#ifdef YES
Before cmd
#ifdef NOPE
Hidden cmd
#endif
After cmd
#endif
";
        assert_eq!(titles(input), vec!["Before", "After"]);
    }

    #[test]
    fn unmatched_else_and_endif_are_reported() {
        let found = issues("#else\n#endif\nEntry cmd\n");
        assert_eq!(
            found,
            vec![
                ParseIssue::UnmatchedConditional { directive: "else" },
                ParseIssue::UnmatchedConditional { directive: "endif" },
            ]
        );
    }

    #[test]
    fn unterminated_conditional_reported_once_at_eof() {
        let mut parser = crate::test_utils::parser_for("#ifdef NOPE\nHidden cmd\n");
        assert!(parser.next_entry().is_none());
        assert_eq!(
            parser
                .diagnostics()
                .iter()
                .map(|d| d.issue.clone())
                .collect::<Vec<_>>(),
            vec![ParseIssue::UnterminatedConditional {
                directive: "ifdef",
                line: 1
            }]
        );
        // Draining the stack keeps later calls quiet.
        assert!(parser.next_entry().is_none());
        assert_eq!(parser.diagnostics().len(), 1);
    }

    #[test]
    fn conditional_nesting_beyond_the_bound_is_reported() {
        let mut input = String::new();
        for _ in 0..=crate::MAX_COND_DEPTH {
            input.push_str("#ifdef NOPE\n");
        }
        input.push_str("Hidden cmd\n");
        // only MAX_COND_DEPTH frames were pushed; the last #ifdef was refused
        for _ in 0..crate::MAX_COND_DEPTH {
            input.push_str("#endif\n");
        }
        input.push_str("After cmd\n");
        assert_eq!(titles(&input), vec!["After"]);
        assert_eq!(issues(&input), vec![ParseIssue::TooManyConditionals]);
    }

    #[test]
    fn missing_condition_name_is_reported() {
        assert_eq!(
            issues("#ifdef\n"),
            vec![ParseIssue::MissingConditionName { directive: "ifdef" }]
        );
    }
}

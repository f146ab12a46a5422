use std::rc::Rc;

use super::{Body, Macro, Segment};
use crate::error::ParseIssue;
use crate::lexer::{is_name_char, is_space};
use crate::parser::MenuParser;
use crate::{EOF, MACRO_BODY_MAX, MACRO_NAME_MAX, MAX_MACRO_ARGS};

/// Body unit classes. Whitespace between two units collapses to a single
/// space, except between a double-quoted chunk and a parameter reference,
/// which splice tightly around the substituted argument.
#[derive(Clone, Copy, PartialEq)]
enum Unit {
    None,
    Name,
    Param,
    Quote,
    Punct,
}

fn keep_separator(prev: Unit, next: Unit) -> bool {
    !matches!(
        (prev, next),
        (Unit::Quote, Unit::Param) | (Unit::Param, Unit::Quote)
    )
}

fn param_index(params: &[Vec<u8>], run: &[u8]) -> Option<usize> {
    params.iter().position(|p| p.as_slice() == run)
}

fn flush(segments: &mut Vec<Segment>, literal: &mut Vec<u8>) {
    if !literal.is_empty() {
        segments.push(Segment::Literal(std::mem::take(literal)));
    }
}

impl MenuParser {
    /// Handle `#define`: name, optional parameter list, body. A syntax
    /// error discards the whole definition; inside a skipped conditional
    /// branch the definition is syntax-checked but never recorded.
    pub(crate) fn define_macro(&mut self) {
        if !self.skip_ignorable() {
            self.report(ParseIssue::MissingMacroName);
            return;
        }
        let mut name = self.cur().name_run().to_vec();
        self.cur_mut().cursor += name.len();
        if name.is_empty() {
            self.report(ParseIssue::MissingMacroName);
            self.cur_mut().kill_line();
            return;
        }
        if name.len() > MACRO_NAME_MAX {
            name.truncate(MACRO_NAME_MAX);
            self.report(ParseIssue::MacroNameTooLong {
                name: String::from_utf8_lossy(&name).into_owned(),
            });
        }
        let display = String::from_utf8_lossy(&name).into_owned();

        // parameter list only when '(' directly follows the name
        let params = if self.cur().peek() == b'(' {
            self.cur_mut().cursor += 1;
            match self.read_parameter_names(&display) {
                Some(list) => Some(list),
                None => return,
            }
        } else {
            None
        };

        if self.skipping() {
            self.cur_mut().kill_line();
            return;
        }

        self.skip_ignorable();
        let Some(segments) = self.read_macro_body(&display, params.as_deref()) else {
            return;
        };

        if self.find_macro(&name).is_some() {
            self.report(ParseIssue::MacroRedefined { name: display });
            return;
        }
        self.state.macros.push(Rc::new(Macro {
            name,
            arg_count: params.map(|p| p.len()),
            body: Body::Literal(segments),
        }));
    }

    fn read_parameter_names(&mut self, name: &str) -> Option<Vec<Vec<u8>>> {
        let mut params: Vec<Vec<u8>> = Vec::new();
        loop {
            if !self.skip_ignorable() {
                self.report(ParseIssue::UnterminatedParameterList {
                    name: name.to_owned(),
                });
                return None;
            }
            if self.cur().peek() == b')' {
                self.cur_mut().cursor += 1;
                return Some(params);
            }
            if params.len() >= MAX_MACRO_ARGS {
                self.report(ParseIssue::TooManyParameters {
                    name: name.to_owned(),
                });
                self.cur_mut().kill_line();
                return None;
            }
            if !is_name_char(self.cur().peek()) {
                self.report(ParseIssue::BadParameterList {
                    found: self.cur().peek() as char,
                    name: name.to_owned(),
                    expected: "a parameter name",
                });
                self.cur_mut().kill_line();
                return None;
            }
            let run = self.cur().name_run().to_vec();
            self.cur_mut().cursor += run.len();
            params.push(run);

            if !self.skip_ignorable() {
                self.report(ParseIssue::UnterminatedParameterList {
                    name: name.to_owned(),
                });
                return None;
            }
            match self.cur().peek() {
                b')' => {
                    self.cur_mut().cursor += 1;
                    return Some(params);
                }
                b',' => {
                    self.cur_mut().cursor += 1;
                }
                other => {
                    self.report(ParseIssue::BadParameterList {
                        found: other as char,
                        name: name.to_owned(),
                        expected: "',' or ')'",
                    });
                    self.cur_mut().kill_line();
                    return None;
                }
            }
        }
    }

    /// Encode the body as literal/parameter segments, collapsing the
    /// whitespace between units.
    fn read_macro_body(&mut self, name: &str, params: Option<&[Vec<u8>]>) -> Option<Vec<Segment>> {
        let params = params.unwrap_or(&[]);
        let mut segments: Vec<Segment> = Vec::new();
        let mut literal: Vec<u8> = Vec::new();
        let mut total = 0usize;
        let mut prev = Unit::None;

        loop {
            let mut pending_space = {
                let c = self.cur().peek();
                is_space(c) || (c == b'\\' && self.cur().peek_at(1) == b'\n')
            };
            if !self.skip_ignorable() {
                break;
            }
            let c = self.cur().peek();
            let unit = if c == b'"' {
                Unit::Quote
            } else if is_name_char(c) {
                if param_index(params, self.cur().name_run()).is_some() {
                    Unit::Param
                } else {
                    Unit::Name
                }
            } else {
                Unit::Punct
            };
            if prev == Unit::None {
                pending_space = false;
            }
            if pending_space && keep_separator(prev, unit) {
                literal.push(b' ');
                total += 1;
            }

            match unit {
                Unit::Quote => self.copy_quoted_chunk(params, &mut segments, &mut literal, &mut total),
                Unit::Param => {
                    let run = self.cur().name_run().to_vec();
                    self.cur_mut().cursor += run.len();
                    let index = param_index(params, &run).unwrap_or(0);
                    flush(&mut segments, &mut literal);
                    segments.push(Segment::Param(index));
                }
                Unit::Name => {
                    let run = self.cur().name_run().to_vec();
                    self.cur_mut().cursor += run.len();
                    total += run.len();
                    literal.extend_from_slice(&run);
                }
                Unit::Punct => loop {
                    let d = self.cur().peek();
                    if d == EOF || is_space(d) || is_name_char(d) || d == b'"' {
                        break;
                    }
                    if d == b'/' && matches!(self.cur().peek_at(1), b'/' | b'*') {
                        break;
                    }
                    if d == b'\\' && matches!(self.cur().peek_at(1), b'\n' | EOF) {
                        break;
                    }
                    literal.push(d);
                    total += 1;
                    self.cur_mut().cursor += 1;
                },
                Unit::None => unreachable!(),
            }
            prev = unit;

            if total > MACRO_BODY_MAX {
                self.report(ParseIssue::MacroBodyTooBig {
                    name: name.to_owned(),
                });
                self.cur_mut().kill_line();
                return None;
            }
        }
        flush(&mut segments, &mut literal);
        Some(segments)
    }

    /// Copy a double-quoted body chunk verbatim, delimiters and interior
    /// spacing included, substituting parameter names inside it.
    fn copy_quoted_chunk(
        &mut self,
        params: &[Vec<u8>],
        segments: &mut Vec<Segment>,
        literal: &mut Vec<u8>,
        total: &mut usize,
    ) {
        literal.push(b'"');
        *total += 1;
        self.cur_mut().cursor += 1;
        loop {
            let c = self.cur().peek();
            if c == EOF || c == b'\n' {
                // left unterminated here; the tokenizer complains at use
                return;
            }
            if c == b'\\' {
                literal.push(c);
                *total += 1;
                self.cur_mut().cursor += 1;
                let escaped = self.cur().peek();
                if escaped != EOF && escaped != b'\n' {
                    literal.push(escaped);
                    *total += 1;
                    self.cur_mut().cursor += 1;
                }
                continue;
            }
            if is_name_char(c) {
                let run = self.cur().name_run().to_vec();
                self.cur_mut().cursor += run.len();
                if let Some(index) = param_index(params, &run) {
                    flush(segments, literal);
                    segments.push(Segment::Param(index));
                } else {
                    literal.extend_from_slice(&run);
                    *total += run.len();
                }
                continue;
            }
            literal.push(c);
            *total += 1;
            self.cur_mut().cursor += 1;
            if c == b'"' {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::error::ParseIssue;
    use crate::test_utils::{entries, issues, titles};

    #[test]
    fn object_macro_substitutes_its_value() {
        let input = "#define TERMINAL xterm\nTerminal TERMINAL\n";
        let got = entries(input);
        assert_eq!(got[0].command.as_deref(), Some("xterm"));
    }

    #[test]
    fn function_macro_substitutes_arguments() {
        let input = "#define EXEC(cmd) exec cmd\nTerminal EXEC(xterm)\n";
        let got = entries(input);
        assert_eq!(got[0].command.as_deref(), Some("exec"));
        assert_eq!(got[0].parameter.as_deref(), Some("xterm"));
    }

    #[test]
    fn quoted_chunks_splice_tightly_around_parameters() {
        let input = "#define M(a) \"A\" a \"B\"\nM(hello) cmd\n";
        assert_eq!(titles(input), vec!["AhelloB"]);
    }

    #[test]
    fn parameters_substitute_inside_quoted_chunks() {
        let input = "#define GREET(who) \"hello who!\"\nGREET(world) cmd\n";
        assert_eq!(titles(input), vec!["hello world!"]);
    }

    #[test]
    fn body_whitespace_collapses_to_single_spaces() {
        let input = "#define RUN(c)   exec \t  c   -geometry \\\n 80x24\nTitle RUN(xv)\n";
        let got = entries(input);
        assert_eq!(got[0].command.as_deref(), Some("exec"));
        assert_eq!(got[0].parameter.as_deref(), Some("xv -geometry 80x24"));
    }

    #[test]
    fn comments_in_body_are_not_separators() {
        let input = "#define JOIN foo/* glue */bar\nTitle JOIN\n";
        let got = entries(input);
        assert_eq!(got[0].command.as_deref(), Some("foobar"));
    }

    #[test]
    fn empty_body_defines_an_empty_macro() {
        let input = "#define FLAG\n#ifdef FLAG\nShown cmd\n#endif\n";
        assert_eq!(titles(input), vec!["Shown"]);
    }

    #[test]
    fn redefinition_is_rejected_and_reported() {
        let input = "#define A one\n#define A two\nTitle A\n";
        let got = entries(input);
        assert_eq!(got[0].command.as_deref(), Some("one"));
        assert_eq!(
            issues(input),
            vec![ParseIssue::MacroRedefined { name: "A".into() }]
        );
    }

    #[test]
    fn definition_in_skipped_branch_is_discarded() {
        let input = "\
#ifdef NOPE
#define GHOST haunt
#endif
#ifdef GHOST
Hidden cmd
#endif
Visible cmd
";
        assert_eq!(titles(input), vec!["Visible"]);
    }

    #[test]
    fn bad_parameter_list_kills_the_definition() {
        let input = "#define BAD(a-b) body\nTitle BAD\n";
        let found = issues(input);
        assert!(
            matches!(found[0], ParseIssue::BadParameterList { found: '-', .. }),
            "{found:?}"
        );
    }

    #[test]
    fn unterminated_parameter_list_is_reported() {
        let input = "#define OPEN(a,\n";
        let found = issues(input);
        assert!(
            found.contains(&ParseIssue::UnterminatedParameterList {
                name: "OPEN".into()
            }),
            "{found:?}"
        );
    }

    #[test]
    fn overlong_name_is_truncated_with_a_warning() {
        let long = "N".repeat(70);
        let input = format!("#define {long} value\nTitle {}\n", &long[..64]);
        let got = entries(&input);
        assert_eq!(got[0].command.as_deref(), Some("value"));
        assert!(issues(&input)
            .iter()
            .any(|i| matches!(i, ParseIssue::MacroNameTooLong { .. })));
    }

    #[test]
    fn oversized_body_aborts_the_definition() {
        let big = "x".repeat(3000);
        let input = format!("#define BIG {big}\n#ifndef BIG\nAbsent cmd\n#endif\n");
        assert_eq!(titles(&input), vec!["Absent"]);
        assert!(issues(&input)
            .iter()
            .any(|i| matches!(i, ParseIssue::MacroBodyTooBig { .. })));
    }

    #[test]
    fn nested_macro_in_body_expands_at_use() {
        let input = "\
#define INNER xterm
#define OUTER exec INNER
Title OUTER
";
        let got = entries(input);
        assert_eq!(got[0].command.as_deref(), Some("exec"));
        assert_eq!(got[0].parameter.as_deref(), Some("xterm"));
    }
}

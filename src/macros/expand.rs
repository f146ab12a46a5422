use std::rc::Rc;

use super::{Body, Macro, Segment};
use crate::error::ParseIssue;
use crate::lexer::is_space;
use crate::parser::MenuParser;
use crate::{EOF, MAX_LINE};

impl MenuParser {
    /// One expansion step: consume the invocation at the cursor, splice the
    /// replacement plus the remainder of the line back into the buffer and
    /// leave the cursor at the start of the spliced text. The tokenizer
    /// rescans from there, so nested macro references expand on the next
    /// rounds of its loop.
    pub(crate) fn expand_macro(&mut self, found: &Rc<Macro>) {
        let name = found.display_name();
        log::debug!("expanding macro \"{name}\"");
        self.cur_mut().cursor += found.name.len();

        let args = match found.arg_count {
            Some(expected) => {
                self.skip_ignorable();
                match self.read_macro_args(&name, expected) {
                    Some(args) => args,
                    None => return, // reported, invocation dropped
                }
            }
            None => Vec::new(),
        };

        let mut expansion = match &found.body {
            Body::Dynamic(dynamic) => {
                let (value, issue) = dynamic.evaluate(self);
                if let Some(issue) = issue {
                    self.report(issue);
                }
                value
            }
            Body::Literal(segments) => {
                let mut out = Vec::new();
                for segment in segments {
                    match segment {
                        Segment::Literal(text) => out.extend_from_slice(text),
                        Segment::Param(index) => {
                            if let Some(arg) = args.get(*index) {
                                out.extend_from_slice(arg);
                            }
                        }
                    }
                }
                out
            }
        };

        let truncated = {
            let ctx = self.cur_mut();
            expansion.extend_from_slice(&ctx.line[ctx.cursor.min(ctx.line.len())..]);
            let truncated = expansion.len() > MAX_LINE;
            if truncated {
                expansion.truncate(MAX_LINE);
            }
            ctx.line = expansion;
            ctx.cursor = 0;
            truncated
        };
        if truncated {
            self.report(ParseIssue::ExpansionTruncated { name });
        }
    }

    /// Read a parenthesised argument list. Nested parentheses group, quoted
    /// substrings are copied verbatim (delimiters included) and whitespace
    /// runs collapse to a single space, which may leave one space at either
    /// end of an argument.
    fn read_macro_args(&mut self, name: &str, expected: usize) -> Option<Vec<Vec<u8>>> {
        if self.cur().peek() != b'(' {
            self.report(ParseIssue::MacroNeedsArguments {
                name: name.to_owned(),
            });
            return None;
        }
        self.cur_mut().cursor += 1;
        self.skip_ignorable();

        let mut args: Vec<Vec<u8>> = Vec::new();
        let mut current: Vec<u8> = Vec::new();
        let mut paren_depth = 0usize;
        loop {
            let c = self.cur().peek();
            if c == EOF {
                self.report(ParseIssue::UnterminatedArgumentList {
                    name: name.to_owned(),
                });
                return None;
            }
            if c == b'(' {
                paren_depth += 1;
                current.push(c);
                self.cur_mut().cursor += 1;
                continue;
            }
            if (c == b',' || c == b')') && paren_depth == 0 {
                args.push(std::mem::take(&mut current));
                self.cur_mut().cursor += 1;
                if c == b')' {
                    break;
                }
                continue;
            }
            if c == b')' {
                paren_depth -= 1;
                current.push(c);
                self.cur_mut().cursor += 1;
                continue;
            }
            if c == b'"' || c == b'\'' {
                current.push(c);
                self.cur_mut().cursor += 1;
                loop {
                    let d = self.cur().peek();
                    if d == EOF {
                        self.report(ParseIssue::UnterminatedArgumentQuote);
                        return None;
                    }
                    current.push(d);
                    self.cur_mut().cursor += 1;
                    if d == c {
                        break;
                    }
                }
                continue;
            }
            if is_space(c) {
                // comments and continuations may sit inside the list
                current.push(b' ');
                self.skip_ignorable();
                continue;
            }
            current.push(c);
            self.cur_mut().cursor += 1;
        }

        // `M()` yields one empty argument; only a zero-parameter macro
        // reads that as "no arguments at all".
        if expected == 0 && args.len() == 1 && args[0].is_empty() {
            args.clear();
        }
        if args.len() != expected {
            self.report(ParseIssue::WrongArgumentCount {
                name: name.to_owned(),
                expected,
                found: args.len(),
            });
            return None;
        }

        let mut budget = MAX_LINE;
        let mut clipped = false;
        for arg in &mut args {
            if arg.len() > budget {
                arg.truncate(budget);
                clipped = true;
            }
            budget -= arg.len();
        }
        if clipped {
            self.report(ParseIssue::ArgumentsTruncated {
                name: name.to_owned(),
            });
        }
        Some(args)
    }
}

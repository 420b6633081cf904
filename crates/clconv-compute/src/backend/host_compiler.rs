//! Front-end checks for kernel source run by the host runtime.
//!
//! This is not an OpenCL C compiler. It validates what the host runtime needs
//! to know about a program (comment and string termination, balanced
//! delimiters, kernel signatures) and reports problems in the
//! `<source>:line:col: error: ...` form real drivers use, so build logs look
//! the same whichever backend produced them.

use std::fmt;

/// A `__kernel` function found in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct KernelDecl {
    pub name: String,
    pub params: Vec<String>,
    /// Tokens of the whole definition, qualifier through closing brace.
    pub tokens: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Pos {
    line: usize,
    col: usize,
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

#[derive(Debug)]
struct Diagnostic {
    pos: Pos,
    message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Tok {
    Ident(String),
    Punct(char),
}

impl fmt::Display for Tok {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ident(s) => f.write_str(s),
            Self::Punct(c) => write!(f, "{c}"),
        }
    }
}

/// Checks `source` and returns its kernel declarations, or the build log.
pub(crate) fn compile(source: &str) -> Result<Vec<KernelDecl>, String> {
    let mut diags = Vec::new();
    let stripped = match strip_comments(source) {
        Ok(s) => s,
        Err(d) => return Err(render(&[d])),
    };
    let tokens = lex(&stripped);

    check_delimiters(&tokens, &mut diags);
    if !diags.is_empty() {
        return Err(render(&diags));
    }

    let kernels = collect_kernels(&tokens, &mut diags);
    if diags.is_empty() && kernels.is_empty() {
        diags.push(Diagnostic {
            pos: Pos { line: 1, col: 1 },
            message: "program contains no kernel functions".into(),
        });
    }
    if diags.is_empty() {
        Ok(kernels)
    } else {
        Err(render(&diags))
    }
}

fn render(diags: &[Diagnostic]) -> String {
    let mut log = String::new();
    for d in diags {
        log.push_str(&format!("<source>:{}: error: {}\n", d.pos, d.message));
    }
    let n = diags.len();
    log.push_str(&format!("{n} error{} generated.\n", if n == 1 { "" } else { "s" }));
    log
}

/// Blanks out comments and string/char literals, keeping line/column layout.
fn strip_comments(source: &str) -> Result<String, Diagnostic> {
    #[derive(Clone, Copy)]
    enum State {
        Code,
        Line,
        Block(Pos),
        Str(char, Pos),
    }

    let mut out = String::with_capacity(source.len());
    let mut state = State::Code;
    let mut pos = Pos { line: 1, col: 1 };
    let mut chars = source.chars().peekable();

    while let Some(c) = chars.next() {
        let here = pos;
        if c == '\n' {
            pos.line += 1;
            pos.col = 1;
        } else {
            pos.col += 1;
        }

        state = match state {
            State::Code => match c {
                '/' if chars.peek() == Some(&'/') => {
                    chars.next();
                    pos.col += 1;
                    out.push_str("  ");
                    State::Line
                }
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    pos.col += 1;
                    out.push_str("  ");
                    State::Block(here)
                }
                '"' | '\'' => {
                    out.push(' ');
                    State::Str(c, here)
                }
                _ => {
                    out.push(c);
                    State::Code
                }
            },
            State::Line => {
                out.push(if c == '\n' { '\n' } else { ' ' });
                if c == '\n' { State::Code } else { State::Line }
            }
            State::Block(start) => {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    pos.col += 1;
                    out.push_str("  ");
                    State::Code
                } else {
                    out.push(if c == '\n' { '\n' } else { ' ' });
                    State::Block(start)
                }
            }
            State::Str(quote, start) => {
                if c == '\\' {
                    out.push(' ');
                    if let Some(escaped) = chars.next() {
                        if escaped == '\n' {
                            pos.line += 1;
                            pos.col = 1;
                            out.push('\n');
                        } else {
                            pos.col += 1;
                            out.push(' ');
                        }
                    }
                    State::Str(quote, start)
                } else if c == quote {
                    out.push(' ');
                    State::Code
                } else if c == '\n' {
                    return Err(Diagnostic {
                        pos: start,
                        message: "missing terminating quote character".into(),
                    });
                } else {
                    out.push(' ');
                    State::Str(quote, start)
                }
            }
        };
    }

    match state {
        State::Block(start) => Err(Diagnostic {
            pos: start,
            message: "unterminated /* comment".into(),
        }),
        State::Str(_, start) => Err(Diagnostic {
            pos: start,
            message: "missing terminating quote character".into(),
        }),
        State::Code | State::Line => Ok(out),
    }
}

fn lex(text: &str) -> Vec<(Tok, Pos)> {
    let mut tokens = Vec::new();
    let mut ident = String::new();
    let mut start = Pos { line: 1, col: 1 };
    let mut pos = Pos { line: 1, col: 1 };

    for c in text.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            if ident.is_empty() {
                start = pos;
            }
            ident.push(c);
        } else {
            if !ident.is_empty() {
                tokens.push((Tok::Ident(std::mem::take(&mut ident)), start));
            }
            if !c.is_whitespace() {
                tokens.push((Tok::Punct(c), pos));
            }
        }
        if c == '\n' {
            pos.line += 1;
            pos.col = 1;
        } else {
            pos.col += 1;
        }
    }
    if !ident.is_empty() {
        tokens.push((Tok::Ident(ident), start));
    }
    tokens
}

fn check_delimiters(tokens: &[(Tok, Pos)], diags: &mut Vec<Diagnostic>) {
    let mut stack: Vec<(char, Pos)> = Vec::new();
    for (tok, pos) in tokens {
        let Tok::Punct(c) = tok else { continue };
        match c {
            '(' | '[' | '{' => stack.push((*c, *pos)),
            ')' | ']' | '}' => {
                let open = match c {
                    ')' => '(',
                    ']' => '[',
                    _ => '{',
                };
                match stack.pop() {
                    Some((o, _)) if o == open => {}
                    Some((o, opened)) => {
                        diags.push(Diagnostic {
                            pos: *pos,
                            message: format!("expected '{}' to match '{o}' at {opened}, found '{c}'", closer(o)),
                        });
                        return;
                    }
                    None => {
                        diags.push(Diagnostic {
                            pos: *pos,
                            message: format!("extraneous closing '{c}'"),
                        });
                        return;
                    }
                }
            }
            _ => {}
        }
    }
    if let Some((o, opened)) = stack.pop() {
        diags.push(Diagnostic {
            pos: opened,
            message: format!("expected '{}' at end of input to match this '{o}'", closer(o)),
        });
    }
}

fn closer(open: char) -> char {
    match open {
        '(' => ')',
        '[' => ']',
        _ => '}',
    }
}

fn is_ident(tok: Option<&(Tok, Pos)>, word: &str) -> bool {
    matches!(tok, Some((Tok::Ident(s), _)) if s == word)
}

/// Index just past the delimited group starting at `i`, which must open
/// with `(`, `[` or `{`.
fn skip_group(tokens: &[(Tok, Pos)], mut i: usize) -> usize {
    let open = match tokens.get(i) {
        Some((Tok::Punct(c @ ('(' | '[' | '{')), _)) => *c,
        _ => return i,
    };
    let close = closer(open);
    let mut depth = 0usize;
    while i < tokens.len() {
        match tokens[i].0 {
            Tok::Punct(c) if c == open => depth += 1,
            Tok::Punct(c) if c == close => {
                depth -= 1;
                if depth == 0 {
                    return i + 1;
                }
            }
            _ => {}
        }
        i += 1;
    }
    i
}

fn collect_kernels(tokens: &[(Tok, Pos)], diags: &mut Vec<Diagnostic>) -> Vec<KernelDecl> {
    let mut kernels: Vec<KernelDecl> = Vec::new();
    let mut i = 0;

    while i < tokens.len() {
        let (tok, pos) = &tokens[i];
        let is_qualifier = matches!(tok, Tok::Ident(s) if s == "__kernel" || s == "kernel");
        if !is_qualifier {
            i += 1;
            continue;
        }
        let start = i;
        i += 1;

        // __attribute__((reqd_work_group_size(16, 16, 1))) and friends
        while is_ident(tokens.get(i), "__attribute__") {
            i = skip_group(tokens, i + 1);
        }

        if !is_ident(tokens.get(i), "void") {
            diags.push(Diagnostic {
                pos: tokens.get(i).map_or(*pos, |t| t.1),
                message: "kernel functions must have a 'void' return type".into(),
            });
            continue;
        }
        i += 1;

        let name = match tokens.get(i) {
            Some((Tok::Ident(name), _)) => name.clone(),
            other => {
                diags.push(Diagnostic {
                    pos: other.map_or(*pos, |t| t.1),
                    message: "expected kernel function name".into(),
                });
                continue;
            }
        };
        let name_pos = tokens[i].1;
        i += 1;

        if !matches!(tokens.get(i), Some((Tok::Punct('('), _))) {
            diags.push(Diagnostic {
                pos: tokens.get(i).map_or(name_pos, |t| t.1),
                message: format!("expected '(' after kernel name '{name}'"),
            });
            continue;
        }
        let end = skip_group(tokens, i);
        let params = split_params(&tokens[i + 1..end.saturating_sub(1)]);
        i = end;

        match tokens.get(i) {
            Some((Tok::Punct('{'), _)) => {}
            // prototype only
            Some((Tok::Punct(';'), _)) => continue,
            other => {
                diags.push(Diagnostic {
                    pos: other.map_or(name_pos, |t| t.1),
                    message: format!("expected function body after declaration of '{name}'"),
                });
                continue;
            }
        }

        let body_end = skip_group(tokens, i);
        let definition = tokens[start..body_end].iter().map(|(t, _)| t.to_string()).collect();
        i = body_end;

        if kernels.iter().any(|k| k.name == name) {
            diags.push(Diagnostic {
                pos: name_pos,
                message: format!("redefinition of kernel '{name}'"),
            });
            continue;
        }
        kernels.push(KernelDecl {
            name,
            params,
            tokens: definition,
        });
    }

    kernels
}

fn split_params(tokens: &[(Tok, Pos)]) -> Vec<String> {
    let mut params = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut depth = 0usize;

    for (tok, _) in tokens {
        match tok {
            Tok::Punct(',') if depth == 0 => {
                params.push(current.join(" "));
                current.clear();
            }
            Tok::Punct(c) => {
                match c {
                    '(' | '[' => depth += 1,
                    ')' | ']' => depth = depth.saturating_sub(1),
                    _ => {}
                }
                current.push(c.to_string());
            }
            Tok::Ident(s) => current.push(s.clone()),
        }
    }
    if !current.is_empty() {
        params.push(current.join(" "));
    }
    // `void f(void)` takes nothing
    if params.len() == 1 && params[0] == "void" {
        params.clear();
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;

    const IDENTITY: &str = r#"
        // passthrough
        __kernel void identity(__read_only image2d_t input,
                               __write_only image2d_t output,
                               sampler_t sampler, int width, int height)
        {
            int2 pos = (int2)(get_global_id(0), get_global_id(1));
            if (pos.x >= width || pos.y >= height) return;
            write_imagef(output, pos, read_imagef(input, sampler, pos));
        }
    "#;

    #[test]
    fn test_finds_kernel_and_params() {
        let kernels = compile(IDENTITY).unwrap();
        assert_eq!(kernels.len(), 1);
        assert_eq!(kernels[0].name, "identity");
        assert_eq!(kernels[0].params.len(), 5);
        assert_eq!(kernels[0].params[3], "int width");
    }

    #[test]
    fn test_definition_tokens_ignore_layout_and_comments() {
        let compact = "__kernel void k(int a) { if (a) { return; } }";
        let spread = "/* entry */\n__kernel void k(int a)\n{\n    // guard\n    if (a) {\n        return;\n    }\n}\n";
        let a = compile(compact).unwrap();
        let b = compile(spread).unwrap();
        assert_eq!(a[0].tokens, b[0].tokens);
        assert_eq!(a[0].tokens.first().map(String::as_str), Some("__kernel"));
        assert_eq!(a[0].tokens.last().map(String::as_str), Some("}"));

        let other = compile("__kernel void k(int a) { if (a) { a = 1; } }").unwrap();
        assert_ne!(a[0].tokens, other[0].tokens);
    }

    #[test]
    fn test_unbalanced_brace_reports_position() {
        let src = "__kernel void k(int a)\n{\n    if (a) {\n}\n";
        let log = compile(src).unwrap_err();
        assert!(log.contains("<source>:2:1: error: expected '}'"), "{log}");
        assert!(log.ends_with("1 error generated.\n"));
    }

    #[test]
    fn test_mismatched_delimiter() {
        let log = compile("__kernel void k(int a] {}").unwrap_err();
        assert!(log.contains("expected ')' to match '('"), "{log}");
    }

    #[test]
    fn test_unterminated_comment() {
        let log = compile("/* never closed\n__kernel void k() {}").unwrap_err();
        assert!(log.contains("<source>:1:1: error: unterminated /* comment"), "{log}");
    }

    #[test]
    fn test_delimiters_in_comments_and_strings_ignored() {
        let src = "// }\n/* ( */ __kernel void k(void) { printf(\"{\"); }";
        let kernels = compile(src).unwrap();
        assert_eq!(kernels[0].name, "k");
        assert!(kernels[0].params.is_empty());
    }

    #[test]
    fn test_no_kernels() {
        let log = compile("float helper(float x) { return x; }").unwrap_err();
        assert!(log.contains("no kernel functions"));
    }

    #[test]
    fn test_non_void_kernel() {
        let log = compile("__kernel int k() { return 0; }").unwrap_err();
        assert!(log.contains("'void' return type"));
    }

    #[test]
    fn test_attribute_and_prototype() {
        let src = "__kernel void a(int x);\n\
                   __kernel __attribute__((reqd_work_group_size(16, 16, 1))) void a(int x) {}";
        let kernels = compile(src).unwrap();
        assert_eq!(kernels.len(), 1);
        assert_eq!(kernels[0].params, vec!["int x".to_string()]);
    }

    #[test]
    fn test_redefinition() {
        let log = compile("kernel void a() {} kernel void a() {}").unwrap_err();
        assert!(log.contains("redefinition of kernel 'a'"));
    }
}

//! `$(NAME)` variable expansion.
//!
//! Syntax:
//! - `$(NAME)` - the value of `NAME`
//! - `$(NAME:-fallback)` - `fallback` when `NAME` is not in scope
//! - `$(LIB_$(ARCH))` - references nest; inner ones expand first
//! - `$$` - a literal `$`
//!
//! Escapes are kept as `$$` through loading so that text meant for the
//! downstream build tool (`$$(CC)`) can never be mistaken for an unexpanded
//! reference. [`unescape`] turns them into `$` once a target is resolved.

use crate::core::scope::Lookup;
use crate::core::value::Value;
use crate::expr::ExprError;

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Ref {
        name: Vec<Segment>,
        default: Option<Vec<Segment>>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Stop {
    End,
    Name,
    Default,
}

struct Parser<'a> {
    src: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Parser {
            src,
            chars: src.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn parse(mut self) -> Result<Vec<Segment>, ExprError> {
        self.segments(Stop::End)
    }

    fn segments(&mut self, stop: Stop) -> Result<Vec<Segment>, ExprError> {
        let mut out = Vec::new();
        let mut literal = String::new();

        loop {
            let Some(c) = self.peek(0) else {
                if stop != Stop::End {
                    return Err(ExprError::syntax(self.src, "unterminated `$(`"));
                }
                break;
            };

            match (c, stop) {
                (')', Stop::Name | Stop::Default) => break,
                (':', Stop::Name) if self.peek(1) == Some('-') => break,
                ('$', _) if self.peek(1) == Some('$') => {
                    literal.push_str("$$");
                    self.pos += 2;
                }
                ('$', _) if self.peek(1) == Some('(') => {
                    if !literal.is_empty() {
                        out.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    self.pos += 2;
                    out.push(self.reference()?);
                }
                _ => {
                    literal.push(c);
                    self.pos += 1;
                }
            }
        }

        if !literal.is_empty() {
            out.push(Segment::Literal(literal));
        }
        Ok(out)
    }

    fn reference(&mut self) -> Result<Segment, ExprError> {
        let name = self.segments(Stop::Name)?;
        if name.is_empty() {
            return Err(ExprError::syntax(self.src, "empty variable name"));
        }

        let default = if self.peek(0) == Some(':') {
            self.pos += 2;
            Some(self.segments(Stop::Default)?)
        } else {
            None
        };

        // Closing paren
        self.pos += 1;
        Ok(Segment::Ref { name, default })
    }
}

/// Expand every reference in `raw`.
///
/// A string consisting of exactly one reference yields the variable's value
/// unchanged (a list stays a list). Anything else is concatenated into a
/// scalar, with lists joined by spaces.
pub fn expand_str(raw: &str, scope: &impl Lookup) -> Result<Value, ExprError> {
    if !raw.contains("$(") {
        return Ok(Value::Scalar(raw.to_string()));
    }

    let segments = Parser::new(raw).parse()?;
    match segments.as_slice() {
        [reference @ Segment::Ref { .. }] => resolve_ref(reference, scope),
        _ => Ok(Value::Scalar(concat(&segments, scope)?)),
    }
}

/// Expand list items, splicing elements that expand to a list.
pub fn expand_list<'a>(
    items: impl IntoIterator<Item = &'a str>,
    scope: &impl Lookup,
) -> Result<Vec<Value>, ExprError> {
    let mut out = Vec::new();
    for item in items {
        match expand_str(item, scope)? {
            Value::List(spliced) => out.extend(spliced),
            other => out.push(other),
        }
    }
    Ok(out)
}

fn concat(segments: &[Segment], scope: &impl Lookup) -> Result<String, ExprError> {
    let mut out = String::new();
    for segment in segments {
        match segment {
            Segment::Literal(s) => out.push_str(s),
            reference => out.push_str(&resolve_ref(reference, scope)?.to_scalar_string()),
        }
    }
    Ok(out)
}

fn resolve_ref(segment: &Segment, scope: &impl Lookup) -> Result<Value, ExprError> {
    let Segment::Ref { name, default } = segment else {
        return Ok(Value::Scalar(String::new()));
    };

    let name = concat(name, scope)?;
    let name = name.trim();
    if let Some(value) = scope.lookup(name) {
        return Ok(value.clone());
    }

    match default {
        Some(default) => match default.as_slice() {
            [reference @ Segment::Ref { .. }] => resolve_ref(reference, scope),
            other => Ok(Value::Scalar(concat(other, scope)?)),
        },
        None => Err(ExprError::UnresolvedVariable {
            name: name.to_string(),
        }),
    }
}

/// Check whether `s` still holds an unexpanded `$(` reference.
///
/// `$$` escapes are skipped.
pub fn contains_reference(s: &str) -> bool {
    let bytes = s.as_bytes();
    let mut i = 0;
    while i + 1 < bytes.len() {
        match (bytes[i], bytes[i + 1]) {
            (b'$', b'$') => i += 2,
            (b'$', b'(') => return true,
            _ => i += 1,
        }
    }
    false
}

/// Turn `$$` escapes into literal `$`.
pub fn unescape(s: &str) -> String {
    s.replace("$$", "$")
}

/// Escape a literal so it passes through expansion unchanged.
pub fn escape_literal(s: &str) -> String {
    s.replace('$', "$$")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::scope::Scope;

    fn scope() -> std::sync::Arc<Scope> {
        Scope::from_bindings([
            ("X".to_string(), Value::scalar("foo")),
            ("ARCH".to_string(), Value::scalar("x64")),
            ("LIB_x64".to_string(), Value::scalar("lib64")),
            ("SRCS".to_string(), Value::list(["a.c", "b.c"])),
            ("DEBUG".to_string(), Value::Bool(true)),
        ])
    }

    #[test]
    fn test_concatenates_literal_and_variable() {
        assert_eq!(expand_str("$(X)bar", &scope()).unwrap(), Value::scalar("foobar"));
    }

    #[test]
    fn test_missing_variable_fails() {
        let err = expand_str("$(Y)", &scope()).unwrap_err();
        assert_eq!(
            err,
            ExprError::UnresolvedVariable {
                name: "Y".to_string()
            }
        );
    }

    #[test]
    fn test_inline_default() {
        assert_eq!(
            expand_str("$(Y:-none)", &scope()).unwrap(),
            Value::scalar("none")
        );
        assert_eq!(
            expand_str("-O$(LEVEL:-$(X))", &scope()).unwrap(),
            Value::scalar("-Ofoo")
        );
    }

    #[test]
    fn test_nested_reference() {
        assert_eq!(
            expand_str("$(LIB_$(ARCH))", &scope()).unwrap(),
            Value::scalar("lib64")
        );
    }

    #[test]
    fn test_whole_reference_keeps_variant() {
        assert_eq!(
            expand_str("$(SRCS)", &scope()).unwrap(),
            Value::list(["a.c", "b.c"])
        );
        assert_eq!(expand_str("$(DEBUG)", &scope()).unwrap(), Value::Bool(true));
        assert_eq!(
            expand_str("files: $(SRCS)", &scope()).unwrap(),
            Value::scalar("files: a.c b.c")
        );
    }

    #[test]
    fn test_list_context_splices() {
        let items = expand_list(["main.c", "$(SRCS)", "$(X).c"], &scope()).unwrap();
        assert_eq!(
            items,
            vec![
                Value::scalar("main.c"),
                Value::scalar("a.c"),
                Value::scalar("b.c"),
                Value::scalar("foo.c"),
            ]
        );
    }

    #[test]
    fn test_escape_survives_expansion() {
        let expanded = expand_str("$$(CC) $(X)", &scope()).unwrap();
        assert_eq!(expanded, Value::scalar("$$(CC) foo"));
        let s = expanded.to_scalar_string();
        assert!(!contains_reference(&s));
        assert_eq!(unescape(&s), "$(CC) foo");
    }

    #[test]
    fn test_unterminated_reference_is_syntax_error() {
        let err = expand_str("$(X", &scope()).unwrap_err();
        assert!(matches!(err, ExprError::Syntax { .. }));
    }

    #[test]
    fn test_contains_reference() {
        assert!(contains_reference("a$(B)"));
        assert!(!contains_reference("a$$(B)"));
        assert!(!contains_reference("$"));
        assert!(!contains_reference("plain"));
    }
}

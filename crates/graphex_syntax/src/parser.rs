//! Recursive descent parser for GraphQL request documents.
//!
//! Only the executable subset of the grammar is accepted. The parser stops at
//! the first error; the diagnostic explains what was expected.

use crate::ast::*;
use crate::lexer::Lexer;
use crate::token::{Token, TokenKind};
use graphex_core::{diagnostics::codes, DiagnosticBag, Span};
use rustc_hash::FxHashSet;

const TYPE_SYSTEM_KEYWORDS: &[&str] = &[
    "schema",
    "scalar",
    "type",
    "interface",
    "union",
    "enum",
    "input",
    "directive",
    "extend",
];

/// Parser for GraphQL request documents.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    diagnostics: DiagnosticBag,
}

/// Result of parsing.
pub struct ParseResult {
    pub document: Document,
    pub diagnostics: DiagnosticBag,
}

/// Parses a source string into a document.
#[must_use]
pub fn parse(source: &str) -> ParseResult {
    let mut parser = Parser::new(source);
    let document = parser.parse_document();
    ParseResult {
        document,
        diagnostics: parser.diagnostics,
    }
}

impl<'a> Parser<'a> {
    /// Creates a new parser.
    #[must_use]
    pub fn new(source: &'a str) -> Self {
        let mut lexer = Lexer::new(source);
        let current = lexer.next_token();
        let mut parser = Self {
            lexer,
            current,
            diagnostics: DiagnosticBag::new(),
        };
        parser.check_token();
        parser
    }

    #[inline]
    fn at(&self) -> TokenKind {
        self.current.kind
    }

    #[inline]
    fn at_kind(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    /// Returns true if the current token is the given contextual keyword.
    fn at_keyword(&self, keyword: &str) -> bool {
        self.at_kind(TokenKind::Name) && self.current_text() == keyword
    }

    /// Returns true while parsing may continue.
    #[inline]
    fn ok(&self) -> bool {
        !self.diagnostics.has_errors()
    }

    /// Returns true if a list delimited by `close` has more items.
    fn more_before(&self, close: TokenKind) -> bool {
        self.ok() && !self.at_kind(close) && !self.at_kind(TokenKind::Eof)
    }

    fn advance(&mut self) {
        self.current = self.lexer.next_token();
        self.check_token();
    }

    /// Reports lexer error tokens as soon as they become current.
    fn check_token(&mut self) {
        if self.at_kind(TokenKind::Error) && self.ok() {
            let text = self.current_text();
            let message = if text.starts_with('"') {
                "unterminated string".to_string()
            } else {
                format!("unexpected character sequence `{text}`")
            };
            self.diagnostics
                .error(codes::INVALID_TOKEN, message, self.current.span);
        }
    }

    fn expect(&mut self, kind: TokenKind) -> bool {
        if self.at_kind(kind) {
            self.advance();
            true
        } else {
            self.error_expected(&kind.to_string());
            false
        }
    }

    fn current_text(&self) -> &'a str {
        self.lexer.span_text(self.current.span)
    }

    fn error(&mut self, code: &'static str, message: impl Into<String>) {
        if self.ok() {
            self.diagnostics.error(code, message, self.current.span);
        }
    }

    fn error_expected(&mut self, expected: &str) {
        let (code, found) = match self.at() {
            TokenKind::Eof => (codes::UNEXPECTED_EOF, "<EOF>".to_string()),
            TokenKind::Name => (
                codes::UNEXPECTED_TOKEN,
                format!("\"{}\"", self.current_text()),
            ),
            kind => (codes::UNEXPECTED_TOKEN, kind.to_string()),
        };
        self.error(code, format!("expected {expected}, found {found}"));
    }

    /// Parses a document.
    pub fn parse_document(&mut self) -> Document {
        let start = self.current.span.start;
        let mut definitions = Vec::new();

        while self.ok() && !self.at_kind(TokenKind::Eof) {
            if let Some(def) = self.parse_definition() {
                definitions.push(def);
            }
        }

        if self.ok() {
            self.check_fragment_names(&definitions);
        }

        Document {
            definitions,
            span: Span::new(start, self.current.span.end),
        }
    }

    fn check_fragment_names(&mut self, definitions: &[Definition]) {
        let mut seen = FxHashSet::default();
        for definition in definitions {
            if let Definition::Fragment(fragment) = definition {
                if !seen.insert(fragment.name.as_str()) {
                    self.diagnostics.error(
                        codes::DUPLICATE_FRAGMENT,
                        format!("There can be only one fragment named \"{}\"", fragment.name.value),
                        fragment.name.span,
                    );
                    return;
                }
            }
        }
    }

    fn parse_definition(&mut self) -> Option<Definition> {
        match self.at() {
            TokenKind::LBrace => Some(Definition::Operation(self.parse_operation())),
            TokenKind::Name => match self.current_text() {
                "query" | "mutation" | "subscription" => {
                    Some(Definition::Operation(self.parse_operation()))
                }
                "fragment" => Some(Definition::Fragment(self.parse_fragment_definition())),
                keyword if TYPE_SYSTEM_KEYWORDS.contains(&keyword) => {
                    self.error(
                        codes::UNSUPPORTED_DEFINITION,
                        format!("type system definition `{keyword}` is not allowed in a request document"),
                    );
                    None
                }
                _ => {
                    self.error_expected("definition");
                    None
                }
            },
            TokenKind::StringLiteral | TokenKind::BlockStringLiteral => {
                self.error(
                    codes::UNSUPPORTED_DEFINITION,
                    "descriptions are only allowed on type system definitions",
                );
                None
            }
            _ => {
                self.error_expected("definition");
                None
            }
        }
    }

    fn parse_name(&mut self) -> Name {
        let span = self.current.span;
        if self.at_kind(TokenKind::Name) {
            let value = self.current_text().to_string();
            self.advance();
            Name::new(value, span)
        } else {
            self.error_expected("Name");
            Name::new(String::new(), span)
        }
    }

    fn parse_operation(&mut self) -> OperationDefinition {
        let start = self.current.span.start;

        if self.at_kind(TokenKind::LBrace) {
            let selection_set = self.parse_selection_set();
            return OperationDefinition {
                operation: OperationType::Query,
                name: None,
                variables: Vec::new(),
                directives: Vec::new(),
                span: Span::new(start, selection_set.span.end),
                selection_set,
            };
        }

        let operation = match self.current_text() {
            "mutation" => OperationType::Mutation,
            "subscription" => OperationType::Subscription,
            _ => OperationType::Query,
        };
        self.advance();

        let name = if self.at_kind(TokenKind::Name) {
            Some(self.parse_name())
        } else {
            None
        };

        let variables = if self.at_kind(TokenKind::LParen) {
            self.parse_variable_definitions()
        } else {
            Vec::new()
        };

        let directives = self.parse_directives(false);
        let selection_set = self.parse_selection_set();

        OperationDefinition {
            operation,
            name,
            variables,
            directives,
            span: Span::new(start, selection_set.span.end),
            selection_set,
        }
    }

    fn parse_variable_definitions(&mut self) -> Vec<VariableDefinition> {
        self.advance(); // (
        let mut vars = Vec::new();
        while self.more_before(TokenKind::RParen) {
            vars.push(self.parse_variable_definition());
        }
        if vars.is_empty() && self.ok() {
            self.error_expected("variable definition");
        }
        self.expect(TokenKind::RParen);
        vars
    }

    fn parse_variable_definition(&mut self) -> VariableDefinition {
        let start = self.current.span.start;
        self.expect(TokenKind::Dollar);
        let name = self.parse_name();
        self.expect(TokenKind::Colon);
        let ty = self.parse_type();

        let default_value = if self.at_kind(TokenKind::Eq) {
            self.advance();
            Some(self.parse_value(true))
        } else {
            None
        };

        let end = default_value.as_ref().map_or(ty.span().end, |v| v.span().end);
        VariableDefinition {
            name,
            ty,
            default_value,
            span: Span::new(start, end),
        }
    }

    fn parse_type(&mut self) -> Type {
        let start = self.current.span.start;
        let ty = if self.at_kind(TokenKind::LBracket) {
            self.advance();
            let inner = self.parse_type();
            let end = self.current.span.end;
            self.expect(TokenKind::RBracket);
            Type::List(Box::new(inner), Span::new(start, end))
        } else {
            Type::Named(self.parse_name())
        };

        if self.at_kind(TokenKind::Bang) {
            let end = self.current.span.end;
            self.advance();
            Type::NonNull(Box::new(ty), Span::new(start, end))
        } else {
            ty
        }
    }

    fn parse_fragment_definition(&mut self) -> FragmentDefinition {
        let start = self.current.span.start;
        self.advance(); // fragment

        if self.at_keyword("on") {
            self.error_expected("fragment name");
        }
        let name = self.parse_name();
        if self.at_keyword("on") {
            self.advance();
        } else {
            self.error_expected("\"on\"");
        }
        let type_condition = self.parse_name();
        let directives = self.parse_directives(false);
        let selection_set = self.parse_selection_set();

        FragmentDefinition {
            name,
            type_condition,
            directives,
            span: Span::new(start, selection_set.span.end),
            selection_set,
        }
    }

    fn parse_selection_set(&mut self) -> SelectionSet {
        let start = self.current.span.start;
        self.expect(TokenKind::LBrace);

        let mut selections = Vec::new();
        while self.more_before(TokenKind::RBrace) {
            selections.push(self.parse_selection());
        }
        if selections.is_empty() {
            self.error_expected("selection");
        }

        let end = self.current.span.end;
        self.expect(TokenKind::RBrace);
        SelectionSet {
            selections,
            span: Span::new(start, end),
        }
    }

    fn parse_selection(&mut self) -> Selection {
        if !self.at_kind(TokenKind::Spread) {
            return Selection::Field(self.parse_field());
        }

        let start = self.current.span.start;
        self.advance(); // ...

        if self.at_keyword("on") {
            self.advance();
            let type_condition = Some(self.parse_name());
            let directives = self.parse_directives(false);
            let selection_set = self.parse_selection_set();
            Selection::InlineFragment(InlineFragment {
                type_condition,
                directives,
                span: Span::new(start, selection_set.span.end),
                selection_set,
            })
        } else if self.at_kind(TokenKind::LBrace) || self.at_kind(TokenKind::At) {
            let directives = self.parse_directives(false);
            let selection_set = self.parse_selection_set();
            Selection::InlineFragment(InlineFragment {
                type_condition: None,
                directives,
                span: Span::new(start, selection_set.span.end),
                selection_set,
            })
        } else {
            let name = self.parse_name();
            let directives = self.parse_directives(false);
            let end = directives.last().map_or(name.span.end, |d| d.span.end);
            Selection::FragmentSpread(FragmentSpread {
                name,
                directives,
                span: Span::new(start, end),
            })
        }
    }

    fn parse_field(&mut self) -> Field {
        let start = self.current.span.start;

        let first_name = self.parse_name();
        let (alias, name) = if self.at_kind(TokenKind::Colon) {
            self.advance();
            (Some(first_name), self.parse_name())
        } else {
            (None, first_name)
        };

        let mut end = name.span.end;
        let arguments = if self.at_kind(TokenKind::LParen) {
            let (args, args_end) = self.parse_arguments(false);
            end = args_end;
            args
        } else {
            Vec::new()
        };

        let directives = self.parse_directives(false);
        if let Some(last) = directives.last() {
            end = last.span.end;
        }

        let selection_set = if self.at_kind(TokenKind::LBrace) {
            let set = self.parse_selection_set();
            end = set.span.end;
            Some(set)
        } else {
            None
        };

        Field {
            alias,
            name,
            arguments,
            directives,
            selection_set,
            span: Span::new(start, end),
        }
    }

    fn parse_directives(&mut self, constant: bool) -> Vec<Directive> {
        let mut directives = Vec::new();
        while self.ok() && self.at_kind(TokenKind::At) {
            directives.push(self.parse_directive(constant));
        }
        directives
    }

    fn parse_directive(&mut self, constant: bool) -> Directive {
        let start = self.current.span.start;
        self.advance(); // @

        let name = self.parse_name();
        let mut end = name.span.end;
        let arguments = if self.at_kind(TokenKind::LParen) {
            let (args, args_end) = self.parse_arguments(constant);
            end = args_end;
            args
        } else {
            Vec::new()
        };

        Directive {
            name,
            arguments,
            span: Span::new(start, end),
        }
    }

    /// Parses a parenthesized argument list, returning it with its end offset.
    fn parse_arguments(&mut self, constant: bool) -> (Vec<Argument>, u32) {
        self.advance(); // (
        let mut args = Vec::new();
        while self.more_before(TokenKind::RParen) {
            let start = self.current.span.start;
            let name = self.parse_name();
            self.expect(TokenKind::Colon);
            let value = self.parse_value(constant);
            args.push(Argument {
                name,
                span: Span::new(start, value.span().end),
                value,
            });
        }
        if args.is_empty() {
            self.error_expected("argument");
        }
        let end = self.current.span.end;
        self.expect(TokenKind::RParen);
        (args, end)
    }

    /// Parses a value. Variables are rejected when `constant` is set.
    fn parse_value(&mut self, constant: bool) -> Value {
        let span = self.current.span;

        match self.at() {
            TokenKind::Dollar if !constant => {
                self.advance();
                Value::Variable(self.parse_name())
            }
            TokenKind::IntLiteral => {
                let text = self.current_text();
                let value = text.parse::<i64>();
                if let Ok(value) = value {
                    self.advance();
                    Value::Int(value, span)
                } else {
                    self.error(
                        codes::INVALID_SYNTAX,
                        format!("Int literal `{text}` is out of range"),
                    );
                    Value::Null(span)
                }
            }
            TokenKind::FloatLiteral => {
                let value = self.current_text().parse().unwrap_or(f64::NAN);
                self.advance();
                Value::Float(value, span)
            }
            TokenKind::StringLiteral => {
                let raw = self.current_text();
                match decode_string(&raw[1..raw.len() - 1]) {
                    Ok(value) => {
                        self.advance();
                        Value::String(value, span)
                    }
                    Err(message) => {
                        self.error(codes::INVALID_TOKEN, message);
                        Value::Null(span)
                    }
                }
            }
            TokenKind::BlockStringLiteral => {
                let raw = self.current_text();
                let value = block_string_value(&raw[3..raw.len() - 3]);
                self.advance();
                Value::String(value, span)
            }
            TokenKind::Name => match self.current_text() {
                "true" => {
                    self.advance();
                    Value::Boolean(true, span)
                }
                "false" => {
                    self.advance();
                    Value::Boolean(false, span)
                }
                "null" => {
                    self.advance();
                    Value::Null(span)
                }
                _ => Value::Enum(self.parse_name()),
            },
            TokenKind::LBracket => {
                self.advance();
                let mut values = Vec::new();
                while self.more_before(TokenKind::RBracket) {
                    values.push(self.parse_value(constant));
                }
                let end = self.current.span.end;
                self.expect(TokenKind::RBracket);
                Value::List(values, Span::new(span.start, end))
            }
            TokenKind::LBrace => {
                self.advance();
                let mut fields = Vec::new();
                while self.more_before(TokenKind::RBrace) {
                    let name = self.parse_name();
                    self.expect(TokenKind::Colon);
                    let value = self.parse_value(constant);
                    fields.push((name, value));
                }
                let end = self.current.span.end;
                self.expect(TokenKind::RBrace);
                Value::Object(fields, Span::new(span.start, end))
            }
            TokenKind::Dollar => {
                self.error(
                    codes::INVALID_SYNTAX,
                    "variables are not allowed in constant values",
                );
                Value::Null(span)
            }
            _ => {
                self.error_expected("value");
                Value::Null(span)
            }
        }
    }
}

/// Decodes the escape sequences of a quoted string body.
fn decode_string(raw: &str) -> Result<String, String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some('/') => out.push('/'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('u') => {
                let high = read_hex4(&mut chars)?;
                let code = if (0xD800..0xDC00).contains(&high) {
                    // Surrogate pair.
                    if chars.next() != Some('\\') || chars.next() != Some('u') {
                        return Err("invalid unicode surrogate pair".to_string());
                    }
                    let low = read_hex4(&mut chars)?;
                    if !(0xDC00..0xE000).contains(&low) {
                        return Err("invalid unicode surrogate pair".to_string());
                    }
                    0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00)
                } else {
                    high
                };
                let ch = char::from_u32(code)
                    .ok_or_else(|| format!("invalid unicode escape \\u{code:04X}"))?;
                out.push(ch);
            }
            Some(other) => return Err(format!("invalid escape sequence \\{other}")),
            None => return Err("unterminated escape sequence".to_string()),
        }
    }
    Ok(out)
}

fn read_hex4(chars: &mut std::str::Chars<'_>) -> Result<u32, String> {
    let digits: String = chars.by_ref().take(4).collect();
    if digits.len() != 4 {
        return Err("invalid unicode escape".to_string());
    }
    u32::from_str_radix(&digits, 16).map_err(|_| format!("invalid unicode escape \\u{digits}"))
}

/// Computes the value of a block string: common indentation and leading and
/// trailing blank lines are removed.
fn block_string_value(raw: &str) -> String {
    let raw = raw.replace("\\\"\"\"", "\"\"\"");
    let lines: Vec<&str> = raw.split("\r\n").flat_map(|l| l.split(['\n', '\r'])).collect();

    let common_indent = lines
        .iter()
        .skip(1)
        .filter_map(|line| {
            let indent = line.len() - line.trim_start_matches([' ', '\t']).len();
            (indent < line.len()).then_some(indent)
        })
        .min()
        .unwrap_or(0);

    let mut lines: Vec<&str> = lines
        .into_iter()
        .enumerate()
        .map(|(index, line)| {
            if index == 0 {
                line
            } else if line.len() >= common_indent {
                &line[common_indent..]
            } else {
                line.trim_start_matches([' ', '\t'])
            }
        })
        .collect();

    let is_blank = |line: &&str| line.trim_start_matches([' ', '\t']).is_empty();
    while lines.first().is_some_and(is_blank) {
        lines.remove(0);
    }
    while lines.last().is_some_and(is_blank) {
        lines.pop();
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(source: &str) -> Document {
        let result = parse(source);
        if let Some(error) = result.diagnostics.first_error() {
            panic!("unexpected parse error: {}", error.message);
        }
        result.document
    }

    fn parse_err(source: &str) -> String {
        let result = parse(source);
        result
            .diagnostics
            .first_error()
            .map(|d| d.message.clone())
            .expect("expected a parse error")
    }

    fn first_field(document: &Document) -> &Field {
        match &document.definitions[0] {
            Definition::Operation(op) => match &op.selection_set.selections[0] {
                Selection::Field(field) => field,
                other => panic!("expected field, got {other:?}"),
            },
            Definition::Fragment(_) => panic!("expected operation"),
        }
    }

    #[test]
    fn test_parse_anonymous_query() {
        let document = parse_ok("{ film { title } }");
        assert_eq!(document.definitions.len(), 1);
        let Definition::Operation(op) = &document.definitions[0] else {
            panic!("expected operation");
        };
        assert_eq!(op.operation, OperationType::Query);
        assert!(op.name.is_none());
    }

    #[test]
    fn test_parse_empty_document() {
        assert!(parse_ok("").definitions.is_empty());
        assert!(parse_ok("  # just a comment\n").definitions.is_empty());
    }

    #[test]
    fn test_parse_named_operations_with_variables() {
        let document = parse_ok(
            r#"
            query FindFilm($id: ID!, $tags: [String!] = ["a", "b"]) { film(id: $id) { title } }
            mutation AddActor { createActor(name: "Brad", age: 55) { name } }
            "#,
        );
        assert_eq!(document.definitions.len(), 2);
        let Definition::Operation(query) = &document.definitions[0] else {
            panic!("expected operation");
        };
        assert_eq!(query.name.as_ref().unwrap().as_str(), "FindFilm");
        assert_eq!(query.variables.len(), 2);
        assert_eq!(query.variables[0].ty.to_string(), "ID!");
        assert_eq!(query.variables[1].ty.to_string(), "[String!]");
        assert!(query.variables[1].default_value.is_some());

        let Definition::Operation(mutation) = &document.definitions[1] else {
            panic!("expected operation");
        };
        assert_eq!(mutation.operation, OperationType::Mutation);
    }

    #[test]
    fn test_parse_alias_arguments_and_directives() {
        let document = parse_ok(r#"{ best: film(rating: 5, kind: DRAMA) @include(if: $all) { title } }"#);
        let field = first_field(&document);
        assert_eq!(field.response_key(), "best");
        assert_eq!(field.name.as_str(), "film");
        assert_eq!(field.arguments.len(), 2);
        assert!(matches!(field.arguments[1].value, Value::Enum(ref n) if n.as_str() == "DRAMA"));
        assert_eq!(field.directives[0].name.as_str(), "include");
        assert!(field.directives[0].arguments[0].value.has_variables());
    }

    #[test]
    fn test_parse_fragments() {
        let document = parse_ok(
            r"
            { favourite { ...ActorParts ... on Director { name } ... @skip(if: true) { id } } }
            fragment ActorParts on Actor { name age }
            ",
        );
        assert_eq!(document.definitions.len(), 2);
        let field = first_field(&document);
        let selections = &field.selection_set.as_ref().unwrap().selections;
        assert!(matches!(selections[0], Selection::FragmentSpread(_)));
        assert!(
            matches!(&selections[1], Selection::InlineFragment(f) if f.type_condition.as_ref().unwrap().as_str() == "Director")
        );
        assert!(
            matches!(&selections[2], Selection::InlineFragment(f) if f.type_condition.is_none())
        );
    }

    #[test]
    fn test_parse_string_escapes() {
        let document = parse_ok(r#"{ echo(text: "a\"b\\c\ndé😀") }"#);
        let field = first_field(&document);
        assert!(
            matches!(&field.arguments[0].value, Value::String(s, _) if s == "a\"b\\c\ndé😀")
        );
    }

    #[test]
    fn test_block_string_value() {
        let document = parse_ok("{ echo(text: \"\"\"\n    first\n      second\n\n  \"\"\") }");
        let field = first_field(&document);
        assert!(matches!(&field.arguments[0].value, Value::String(s, _) if s == "first\n  second"));
    }

    #[test]
    fn test_value_display() {
        let document = parse_ok(r#"{ f(a: {x: [1, "two", ENUM], y: null}) }"#);
        let field = first_field(&document);
        assert_eq!(
            field.arguments[0].value.to_string(),
            r#"{x: [1, "two", ENUM], y: null}"#
        );
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse_err("{ film "), "expected \"}\", found <EOF>");
        assert_eq!(parse_err("{ }"), "expected selection, found \"}\"");
        assert_eq!(parse_err("{ f(a: ) }"), "expected value, found \")\"");
        assert_eq!(parse_err("{ f(a: \"open) }"), "unterminated string");
        assert!(parse_err("type Query { a: Int }").contains("not allowed in a request document"));
        assert_eq!(
            parse_err("query Q($a: Int = $b) { f }"),
            "variables are not allowed in constant values"
        );
        assert_eq!(parse_err("{ f } @skip"), "expected definition, found \"@\"");
    }

    #[test]
    fn test_duplicate_fragment() {
        let result = parse("{ ...A } fragment A on Q { a } fragment A on Q { b }");
        let error = result.diagnostics.first_error().unwrap();
        assert_eq!(error.code, codes::DUPLICATE_FRAGMENT);
    }

    #[test]
    fn test_parse_is_deterministic() {
        let source = "query Q($x: Int) { a(x: $x) { b c } ...F } fragment F on T { d }";
        assert_eq!(parse(source).document, parse(source).document);
    }
}

//! Token kinds and structures for GraphQL request documents.

use graphex_core::Span;

/// The kind of a token in a request document.
///
/// GraphQL keywords (`query`, `fragment`, `on`, `true`, ...) are contextual,
/// so they are lexed as [`TokenKind::Name`] and recognised by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TokenKind {
    // Special tokens
    Eof,
    Error,

    // Literals
    Name,
    IntLiteral,
    FloatLiteral,
    StringLiteral,
    BlockStringLiteral,

    // Punctuation
    Bang,
    Dollar,
    Amp,
    LParen,
    RParen,
    Spread,
    Colon,
    Eq,
    At,
    LBracket,
    RBracket,
    LBrace,
    Pipe,
    RBrace,
}

impl TokenKind {
    #[must_use]
    pub const fn is_punctuator(self) -> bool {
        matches!(
            self,
            Self::Bang
                | Self::Dollar
                | Self::Amp
                | Self::LParen
                | Self::RParen
                | Self::Spread
                | Self::Colon
                | Self::Eq
                | Self::At
                | Self::LBracket
                | Self::RBracket
                | Self::LBrace
                | Self::Pipe
                | Self::RBrace
        )
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Eof => "<EOF>",
            Self::Error => "<error>",
            Self::Name => "Name",
            Self::IntLiteral => "Int",
            Self::FloatLiteral => "Float",
            Self::StringLiteral => "String",
            Self::BlockStringLiteral => "BlockString",
            Self::Bang => "!",
            Self::Dollar => "$",
            Self::Amp => "&",
            Self::LParen => "(",
            Self::RParen => ")",
            Self::Spread => "...",
            Self::Colon => ":",
            Self::Eq => "=",
            Self::At => "@",
            Self::LBracket => "[",
            Self::RBracket => "]",
            Self::LBrace => "{",
            Self::Pipe => "|",
            Self::RBrace => "}",
        }
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_punctuator() {
            write!(f, "\"{}\"", self.as_str())
        } else {
            write!(f, "{}", self.as_str())
        }
    }
}

/// A token with its kind and source span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    #[must_use]
    #[inline]
    pub const fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    #[must_use]
    #[inline]
    pub const fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }

    #[must_use]
    #[inline]
    pub const fn len(&self) -> u32 {
        self.span.len()
    }

    #[must_use]
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.span.is_empty()
    }
}

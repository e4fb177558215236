//! The token definition for the CQL filter language.

use std::fmt;

/// A token is a single unit of the language, with a specific kind and location.
#[derive(Debug, Clone, PartialEq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    /// The matched text, exactly as it appears in the input.
    pub text: &'a str,
    pub span: Span,
    /// Byte offset where the next token starts (trailing whitespace skipped).
    pub remainder_offset: usize,
}

/// The kind of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Operands
    Property, // "title" or title
    Value,    // 'text' or 12.5
    Boolean,  // true / false
    Relative, // 'RELATIVE(PT1H)'
    Time,     // 2020-01-01T00:00:00Z
    TimePeriod,
    Geometry, // POINT(1 2)

    // Operators
    Comparison, // = <> < <= > >= LIKE ILIKE
    IsNull,     // IS NULL
    Logical,    // AND OR
    Not,
    Between,
    Before,
    After,
    During,
    Spatial,            // BBOX INTERSECTS DWITHIN WITHIN CONTAINS
    FilterFunctionName, // "proximity(", the opening paren included

    // Punctuation
    Comma,
    LParen,
    RParen,
    Units, // meters

    // Special
    End,
}

/// Token kinds an expression may start with.
pub const START: &[TokenKind] = &[
    TokenKind::Not,
    TokenKind::Geometry,
    TokenKind::Spatial,
    TokenKind::FilterFunctionName,
    TokenKind::Property,
    TokenKind::LParen,
];

impl TokenKind {
    /// The kinds that may legally follow this one, in the order the lexer tries them.
    pub fn follows(self) -> &'static [TokenKind] {
        use TokenKind::*;
        match self {
            Property => &[
                Comparison, Between, Comma, IsNull, Before, After, During, RParen,
            ],
            Comparison => &[Relative, Value, Boolean],
            IsNull => &[Logical, Comma, RParen, End],
            Comma => &[
                FilterFunctionName,
                Geometry,
                Value,
                Boolean,
                Units,
                Not,
                Spatial,
                Property,
                LParen,
            ],
            Logical => &[Not, Spatial, FilterFunctionName, Value, Property, LParen],
            Value | Boolean | Relative => &[Logical, Comma, RParen, End],
            LParen => &[Not, Geometry, Spatial, FilterFunctionName, Property, LParen],
            RParen => &[Logical, Comparison, Between, IsNull, Comma, RParen, End],
            Spatial => &[LParen],
            Units => &[RParen],
            Not => &[Spatial, FilterFunctionName, Property, LParen],
            Between => &[Value],
            Before | After => &[Time],
            During => &[TimePeriod],
            Time | TimePeriod => &[Logical, Comma, RParen, End],
            Geometry => &[Comma, RParen],
            FilterFunctionName => &[
                FilterFunctionName,
                Geometry,
                Value,
                Boolean,
                Not,
                Spatial,
                Property,
                LParen,
                RParen,
            ],
            End => &[],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TokenKind::Property => "PROPERTY",
            TokenKind::Value => "VALUE",
            TokenKind::Boolean => "BOOLEAN",
            TokenKind::Relative => "RELATIVE",
            TokenKind::Time => "TIME",
            TokenKind::TimePeriod => "TIME_PERIOD",
            TokenKind::Geometry => "GEOMETRY",
            TokenKind::Comparison => "COMPARISON",
            TokenKind::IsNull => "IS_NULL",
            TokenKind::Logical => "LOGICAL",
            TokenKind::Not => "NOT",
            TokenKind::Between => "BETWEEN",
            TokenKind::Before => "BEFORE",
            TokenKind::After => "AFTER",
            TokenKind::During => "DURING",
            TokenKind::Spatial => "SPATIAL",
            TokenKind::FilterFunctionName => "FILTER_FUNCTION_NAME",
            TokenKind::Comma => "COMMA",
            TokenKind::LParen => "LPAREN",
            TokenKind::RParen => "RPAREN",
            TokenKind::Units => "UNITS",
            TokenKind::End => "END",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Represents a span in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// The starting byte offset.
    pub start: usize,
    /// The ending byte offset.
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_follow_set() {
        let follows = TokenKind::Property.follows();
        for kind in [
            TokenKind::Comparison,
            TokenKind::Between,
            TokenKind::Comma,
            TokenKind::IsNull,
            TokenKind::Before,
            TokenKind::After,
            TokenKind::During,
        ] {
            assert!(follows.contains(&kind), "{kind} should follow PROPERTY");
        }
    }

    #[test]
    fn test_only_end_has_empty_follow_set() {
        use TokenKind::*;
        let all = [
            Property, Value, Boolean, Relative, Time, TimePeriod, Geometry, Comparison, IsNull,
            Logical, Not, Between, Before, After, During, Spatial, FilterFunctionName, Comma,
            LParen, RParen, Units, End,
        ];
        for kind in all {
            assert_eq!(kind.follows().is_empty(), kind == End, "{kind}");
        }
    }

    #[test]
    fn test_keyword_like_kinds_precede_property() {
        // 关键字必须先于 PROPERTY 尝试, 否则会被当作属性名
        for kind in [TokenKind::Comma, TokenKind::Logical, TokenKind::FilterFunctionName] {
            let follows = kind.follows();
            let property = follows.iter().position(|k| *k == TokenKind::Property).unwrap();
            for keyword in [TokenKind::Not, TokenKind::Spatial, TokenKind::FilterFunctionName] {
                if let Some(pos) = follows.iter().position(|k| *k == keyword) {
                    assert!(pos < property, "{keyword} after PROPERTY in {kind}");
                }
            }
        }
    }
}

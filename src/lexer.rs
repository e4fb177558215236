//! CQL 的词法分析器
//!
//! 词法分析和语法校验在同一遍完成: 每一步只尝试当前"期望集合"中的 token 类型,
//! 按声明顺序逐个匹配 (第一个匹配者胜出, 而不是最长匹配), 匹配成功后期望集合
//! 被替换为该类型的 follow 集合。

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{CqlError, Result};
use crate::token::{Span, Token, TokenKind, START};

const TIME: &str = r"\d{4}(?:-\d{2}(?:-\d{2}(?:[Tt]\d{2}:\d{2}(?::\d{2}(?:\.\d+)?)?(?:[Zz]|[-+]\d{2}:\d{2})?)?)?)?";

/// WKT 几何类型关键字, 匹配时不区分大小写
const GEOMETRY_TYPES: &[&str] = &[
    "GEOMETRYCOLLECTION",
    "MULTILINESTRING",
    "MULTIPOLYGON",
    "MULTIPOINT",
    "LINESTRING",
    "POLYGON",
    "POINT",
];

/// 预编译的正则表达式, 每个都锚定在剩余输入的开头
struct Patterns {
    property: Regex,
    comparison: Regex,
    is_null: Regex,
    logical: Regex,
    value: Regex,
    boolean: Regex,
    relative: Regex,
    spatial: Regex,
    units: Regex,
    not: Regex,
    between: Regex,
    before: Regex,
    after: Regex,
    during: Regex,
    time: Regex,
    time_period: Regex,
    filter_function: Regex,
}

impl Patterns {
    fn compile() -> Self {
        let re = |pattern: &str| Regex::new(pattern).expect("invalid token pattern");
        Self {
            property: re(r#"^(?:"[^"]+"|[_a-zA-Z]\w*)"#),
            comparison: re(r"^(?:<>|<=|>=|=|<|>|(?i:ILIKE|LIKE)\b)"),
            is_null: re(r"^(?i:IS\s+NULL)\b"),
            logical: re(r"^(?i:AND|OR)\b"),
            value: re(r"^(?:'(?:[^']|'')*'|-?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][-+]?\d+)?)"),
            boolean: re(r"^(?i:true|false)\b"),
            relative: re(r"^'(?i:RELATIVE)\([A-Za-z0-9.]*\)'"),
            spatial: re(r"^(?i:BBOX|INTERSECTS|DWITHIN|WITHIN|CONTAINS)\b"),
            units: re(r"^(?i:meters)\b"),
            not: re(r"^(?i:NOT)\b"),
            between: re(r"^(?i:BETWEEN)\b"),
            before: re(r"^(?i:BEFORE)\b"),
            after: re(r"^(?i:AFTER)\b"),
            during: re(r"^(?i:DURING)\b"),
            time: re(&format!("^{TIME}")),
            time_period: re(&format!("^{TIME}/{TIME}")),
            filter_function: re(r"^[a-z]\w*\("),
        }
    }

    /// 返回 `kind` 在 `rest` 开头匹配到的字节长度
    fn match_len(&self, kind: TokenKind, rest: &str) -> Option<usize> {
        let regex = match kind {
            TokenKind::Property => &self.property,
            TokenKind::Comparison => &self.comparison,
            TokenKind::IsNull => &self.is_null,
            TokenKind::Logical => &self.logical,
            TokenKind::Value => &self.value,
            TokenKind::Boolean => &self.boolean,
            TokenKind::Relative => &self.relative,
            TokenKind::Spatial => &self.spatial,
            TokenKind::Units => &self.units,
            TokenKind::Not => &self.not,
            TokenKind::Between => &self.between,
            TokenKind::Before => &self.before,
            TokenKind::After => &self.after,
            TokenKind::During => &self.during,
            TokenKind::Time => &self.time,
            TokenKind::TimePeriod => &self.time_period,
            TokenKind::FilterFunctionName => &self.filter_function,
            TokenKind::Geometry => return match_geometry(rest),
            TokenKind::Comma => return rest.starts_with(',').then_some(1),
            TokenKind::LParen => return rest.starts_with('(').then_some(1),
            TokenKind::RParen => return rest.starts_with(')').then_some(1),
            TokenKind::End => return rest.is_empty().then_some(0),
        };
        regex.find(rest).map(|m| m.end())
    }
}

static PATTERNS: LazyLock<Patterns> = LazyLock::new(Patterns::compile);

/// WKT 几何体中嵌套的括号无法用正则界定, 这里手工计数括号深度直到回到零
fn match_geometry(rest: &str) -> Option<usize> {
    let keyword = GEOMETRY_TYPES.iter().find(|t| {
        rest.get(..t.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(t))
    })?;
    let after_keyword = &rest[keyword.len()..];
    let open = keyword.len() + (after_keyword.len() - after_keyword.trim_start().len());
    if !rest[open..].starts_with('(') {
        return None;
    }

    let mut depth = 0usize;
    for (idx, c) in rest[open..].char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + idx + 1);
                }
            }
            _ => {}
        }
    }
    None
}

pub struct Lexer<'a> {
    input: &'a str,
    /// 输入字符串中的当前位置（字节索引）
    position: usize,
    /// 下一个 token 允许的类型
    expected: &'static [TokenKind],
    finished: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        let mut lexer = Lexer {
            input,
            position: 0,
            expected: START,
            finished: false,
        };
        lexer.skip_whitespace();
        lexer
    }

    /// 跳过空白字符
    fn skip_whitespace(&mut self) {
        let rest = &self.input[self.position..];
        self.position += rest.len() - rest.trim_start().len();
    }

    /// 按期望集合的声明顺序尝试匹配下一个 token
    fn next_token(&mut self) -> Result<Token<'a>> {
        let rest = &self.input[self.position..];
        let patterns = &*PATTERNS;

        for &kind in self.expected {
            let Some(len) = patterns.match_len(kind, rest) else {
                continue;
            };
            let start = self.position;
            self.position += len;
            let span = Span::new(start, self.position);
            self.skip_whitespace();

            tracing::trace!(kind = kind.name(), text = &rest[..len], offset = start, "matched token");
            self.expected = kind.follows();
            return Ok(Token {
                kind,
                text: &rest[..len],
                span,
                remainder_offset: self.position,
            });
        }

        Err(CqlError::Grammar {
            offset: self.position,
            text: rest.to_string(),
            expected: self.expected.to_vec(),
        })
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<Token<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let result = self.next_token();
        match &result {
            Ok(token) => self.finished = token.kind == TokenKind::End,
            Err(_) => self.finished = true,
        }
        Some(result)
    }
}

/// 将 CQL 文本切分为 token 序列, 最后一个 token 总是 END
pub fn tokenize(text: &str) -> Result<Vec<Token<'_>>> {
    let tokens = Lexer::new(text).collect::<Result<Vec<_>>>()?;
    tracing::debug!(tokens = tokens.len(), "tokenized cql");
    Ok(tokens)
}

//! CQL 的语法分析器
//!
//! ## 解析流程图
//!
//! ```text
//! read()
//!   ├─ tokenize()                      词法分析 + follow 集合校验
//!   └─ build_ast()
//!        ├─ Parser::into_postfix()     调度场算法, 中缀 → 后缀
//!        │    ├─ 操作数 (PROPERTY / VALUE / GEOMETRY / TIME ...) → 直接输出
//!        │    ├─ 比较 / 逻辑运算符 → 按优先级弹栈后入栈
//!        │    ├─ BETWEEN 之后的 AND → 作为 BETWEEN 的内部标记入栈
//!        │    ├─ SPATIAL / NOT / "(" → 直接入栈
//!        │    ├─ "name(" → 函数 + 隐式 "(" 入栈
//!        │    ├─ ")" → 弹栈到 "(", 若栈顶是 SPATIAL 或函数则一并输出
//!        │    └─ "," → 弹出当前括号内的运算符, 记录参数个数
//!        │
//!        └─ TreeBuilder::build()       按各运算符的元数消费后缀序列
//!             ├─ LOGICAL: 两个过滤条件
//!             ├─ NOT: 一个过滤条件
//!             ├─ BETWEEN: AND 标记, 上界, 下界, 属性
//!             ├─ BEFORE / AFTER / DURING: 时间, 属性
//!             ├─ SPATIAL: BBOX 五个, DWITHIN 三个, 其余两个
//!             └─ 过滤函数: 注册表中登记的参数个数
//! ```
//!
//! ## 语法优先级（从高到低）
//!
//! 1. **括号分组** `(expression)`
//! 2. **比较操作** `=`, `<>`, `LIKE`, `BETWEEN`, `IS NULL`, `BEFORE`, `AFTER`, `DURING`
//! 3. **AND / OR操作** 同级, 从左到右结合
//! 4. **NOT操作** `NOT expression`, 作用到所在括号的结尾 (或输入结尾)
//!
//! 树的构建使用显式的操作数栈, 不随嵌套深度递归。

use std::sync::LazyLock;

use chrono::{DateTime, Utc};

use crate::ast::{
    BinaryOperator, BoundingBox, Comparison, Filter, FilterFunction, Geometry, Literal, Logical,
    LogicalOperator, Operand, Predicate, Spatial, SpatialOperator, SpatialPredicate, Subject,
    Temporal, TemporalPredicate,
};
use crate::config::{FunctionRegistry, ReaderConfig};
use crate::error::{CqlError, Result};
use crate::lexer::tokenize;
use crate::parse_error;
use crate::temporal::parse_instant;
use crate::token::{Token, TokenKind};

static DEFAULT_CONFIG: LazyLock<ReaderConfig> = LazyLock::new(ReaderConfig::default);

const COMPARISON_RANK: u8 = 1;
const LOGICAL_RANK: u8 = 2;

/// 运算符优先级: LOGICAL 2, COMPARISON 1, BETWEEN / IS NULL / BEFORE / AFTER / DURING
/// 与 COMPARISON 同级。")" 不入栈, 它总是弹出到匹配的 "(" 为止。
fn precedence(kind: TokenKind) -> Option<u8> {
    match kind {
        TokenKind::Logical => Some(LOGICAL_RANK),
        TokenKind::Comparison
        | TokenKind::Between
        | TokenKind::IsNull
        | TokenKind::Before
        | TokenKind::After
        | TokenKind::During => Some(COMPARISON_RANK),
        _ => None,
    }
}

/// 解析 CQL 文本, 使用默认配置
pub fn read(text: &str) -> Result<Filter> {
    read_with(text, &DEFAULT_CONFIG)
}

pub fn read_with(text: &str, config: &ReaderConfig) -> Result<Filter> {
    let tokens = tokenize(text)?;
    build_ast_with(&tokens, config)
}

/// 从 token 序列构建过滤树, 使用默认配置
pub fn build_ast(tokens: &[Token<'_>]) -> Result<Filter> {
    build_ast_with(tokens, &DEFAULT_CONFIG)
}

pub fn build_ast_with(tokens: &[Token<'_>], config: &ReaderConfig) -> Result<Filter> {
    let postfix = Parser::new(tokens, config).into_postfix()?;
    tracing::debug!(
        tokens = tokens.len(),
        postfix = postfix.len(),
        "converted tokens to postfix order"
    );
    TreeBuilder::new(&config.functions).build(postfix)
}

/// 运算符栈上的条目
#[derive(Debug, Clone, Copy)]
enum Pending<'t> {
    Operator(&'t Token<'t>),
    /// BETWEEN 的 "AND", 不是逻辑运算符
    BetweenAnd,
    Function(&'t Token<'t>),
    Group {
        /// 进入括号时输出序列的长度, 用来判断参数列表是否为空
        output_len: usize,
        commas: usize,
    },
}

impl Pending<'_> {
    /// 优先级为 `rank` 的运算符入栈前, 此条目是否应先出栈
    fn yields_to(&self, rank: u8) -> bool {
        match self {
            // NOT 和 SPATIAL 没有优先级, 只在所属括号闭合时出栈
            Pending::Operator(token) => precedence(token.kind).is_some_and(|p| p <= rank),
            Pending::BetweenAnd => COMPARISON_RANK <= rank,
            Pending::Function(_) | Pending::Group { .. } => false,
        }
    }
}

/// 后缀序列中的元素
#[derive(Debug, Clone, Copy)]
enum Postfix<'t> {
    Token(&'t Token<'t>),
    BetweenAnd,
    Function { token: &'t Token<'t>, arity: usize },
    /// 空间运算符, 附带括号内产生的操作数个数 (含属性)
    Spatial { token: &'t Token<'t>, operands: usize },
}

struct Parser<'t, 'c> {
    tokens: &'t [Token<'t>],
    config: &'c ReaderConfig,
    stack: Vec<Pending<'t>>,
    output: Vec<Postfix<'t>>,
    depth: usize,
}

impl<'t, 'c> Parser<'t, 'c> {
    fn new(tokens: &'t [Token<'t>], config: &'c ReaderConfig) -> Self {
        Self {
            tokens,
            config,
            stack: Vec::new(),
            output: Vec::with_capacity(tokens.len()),
            depth: 0,
        }
    }

    fn into_postfix(mut self) -> Result<Vec<Postfix<'t>>> {
        let tokens = self.tokens;
        for token in tokens {
            match token.kind {
                TokenKind::Property
                | TokenKind::Geometry
                | TokenKind::Value
                | TokenKind::Boolean
                | TokenKind::Relative
                | TokenKind::Time
                | TokenKind::TimePeriod => self.output.push(Postfix::Token(token)),
                TokenKind::Comparison
                | TokenKind::Between
                | TokenKind::IsNull
                | TokenKind::Logical
                | TokenKind::Before
                | TokenKind::After
                | TokenKind::During => self.push_operator(token),
                TokenKind::Spatial | TokenKind::Not => self.stack.push(Pending::Operator(token)),
                TokenKind::LParen => self.open_group(token)?,
                TokenKind::FilterFunctionName => {
                    // 函数名 token 已经吃掉了它的 "(", 这里补一个隐式的
                    self.stack.push(Pending::Function(token));
                    self.open_group(token)?;
                }
                TokenKind::RParen => self.close_group(token)?,
                TokenKind::Comma => self.separate(token)?,
                TokenKind::Units | TokenKind::End => {}
            }
        }

        while let Some(entry) = self.stack.pop() {
            match entry {
                Pending::Operator(token) => self.output.push(Postfix::Token(token)),
                Pending::BetweenAnd => self.output.push(Postfix::BetweenAnd),
                Pending::Function(_) | Pending::Group { .. } => {
                    return Err(parse_error!("unbalanced parentheses: missing ')'"));
                }
            }
        }
        Ok(self.output)
    }

    fn push_operator(&mut self, token: &'t Token<'t>) {
        let awaiting_bounds = matches!(
            self.stack.last(),
            Some(Pending::Operator(top)) if top.kind == TokenKind::Between
        );
        if awaiting_bounds
            && token.kind == TokenKind::Logical
            && token.text.eq_ignore_ascii_case("AND")
        {
            self.stack.push(Pending::BetweenAnd);
            return;
        }

        let rank = precedence(token.kind).unwrap_or(COMPARISON_RANK);
        while let Some(top) = self.stack.last().copied() {
            if !top.yields_to(rank) {
                break;
            }
            self.stack.pop();
            self.emit(top);
        }
        self.stack.push(Pending::Operator(token));
    }

    /// 把出栈的运算符写入输出; 括号和函数只在 close_group 中处理
    fn emit(&mut self, entry: Pending<'t>) {
        match entry {
            Pending::Operator(token) => self.output.push(Postfix::Token(token)),
            Pending::BetweenAnd => self.output.push(Postfix::BetweenAnd),
            Pending::Function(_) | Pending::Group { .. } => {}
        }
    }

    fn open_group(&mut self, token: &Token<'_>) -> Result<()> {
        self.depth += 1;
        if let Some(max) = self.config.max_depth {
            if self.depth > max {
                return Err(parse_error!(
                    "nesting depth exceeds the limit of {} at offset {}",
                    max,
                    token.span.start
                ));
            }
        }
        self.stack.push(Pending::Group {
            output_len: self.output.len(),
            commas: 0,
        });
        Ok(())
    }

    fn close_group(&mut self, token: &Token<'_>) -> Result<()> {
        loop {
            match self.stack.pop() {
                Some(Pending::Group { output_len, commas }) => {
                    self.depth -= 1;
                    match self.stack.last().copied() {
                        Some(Pending::Operator(top)) if top.kind == TokenKind::Spatial => {
                            self.stack.pop();
                            self.output.push(Postfix::Spatial {
                                token: top,
                                operands: self.output.len() - output_len,
                            });
                        }
                        Some(Pending::Function(function)) => {
                            self.stack.pop();
                            let arity = if commas == 0 && self.output.len() == output_len {
                                0
                            } else {
                                commas + 1
                            };
                            self.output.push(Postfix::Function {
                                token: function,
                                arity,
                            });
                        }
                        _ => {}
                    }
                    return Ok(());
                }
                Some(Pending::Function(_)) | None => {
                    return Err(parse_error!(
                        "unbalanced parentheses: unexpected ')' at offset {}",
                        token.span.start
                    ));
                }
                Some(entry) => self.emit(entry),
            }
        }
    }

    /// 逗号本身不输出, 只结束当前参数
    fn separate(&mut self, token: &Token<'_>) -> Result<()> {
        loop {
            match self.stack.last().copied() {
                Some(Pending::Group { output_len, commas }) => {
                    if let Some(top) = self.stack.last_mut() {
                        *top = Pending::Group {
                            output_len,
                            commas: commas + 1,
                        };
                    }
                    return Ok(());
                }
                Some(Pending::Function(_)) | None => {
                    return Err(parse_error!(
                        "unexpected ',' outside of an argument list at offset {}",
                        token.span.start
                    ));
                }
                Some(entry) => {
                    self.stack.pop();
                    self.emit(entry);
                }
            }
        }
    }
}

/// 操作数栈上的值
#[derive(Debug)]
enum Node {
    Filter(Filter),
    Literal(Literal),
    Property(String),
    Instant(DateTime<Utc>),
    Period(DateTime<Utc>, DateTime<Utc>),
    BetweenAnd,
}

impl Node {
    fn describe(&self) -> &'static str {
        match self {
            Node::Filter(_) => "filter",
            Node::Literal(_) => "literal",
            Node::Property(_) => "property",
            Node::Instant(_) => "time",
            Node::Period(..) => "time period",
            Node::BetweenAnd => "AND marker",
        }
    }
}

struct TreeBuilder<'c> {
    functions: &'c FunctionRegistry,
    operands: Vec<Node>,
}

impl<'c> TreeBuilder<'c> {
    fn new(functions: &'c FunctionRegistry) -> Self {
        Self {
            functions,
            operands: Vec::new(),
        }
    }

    fn build(mut self, postfix: Vec<Postfix<'_>>) -> Result<Filter> {
        for item in postfix {
            let node = match item {
                Postfix::Token(token) => self.apply(token)?,
                Postfix::BetweenAnd => Node::BetweenAnd,
                Postfix::Function { token, arity } => self.call(token, arity)?,
                Postfix::Spatial { token, operands } => self.spatial(token, operands)?,
            };
            self.operands.push(node);
        }

        let root = self
            .operands
            .pop()
            .ok_or_else(|| parse_error!("empty expression"))?;
        if !self.operands.is_empty() {
            return Err(CqlError::TrailingTokens {
                remaining: self.operands.len(),
            });
        }
        match root {
            Node::Filter(filter) => Ok(filter),
            other => Err(parse_error!(
                "expression is a {}, not a filter",
                other.describe()
            )),
        }
    }

    fn apply(&mut self, token: &Token<'_>) -> Result<Node> {
        let node = match token.kind {
            TokenKind::Property => Node::Property(unquote_property(token.text)),
            TokenKind::Value => Node::Literal(parse_value(token.text)?),
            TokenKind::Boolean => Node::Literal(Literal::Boolean(
                token.text.eq_ignore_ascii_case("true"),
            )),
            TokenKind::Relative => Node::Literal(Literal::Relative(relative_duration(token.text))),
            TokenKind::Geometry => Node::Literal(Literal::Geometry(Geometry(token.text.to_string()))),
            TokenKind::Time => Node::Instant(instant(token.text)?),
            TokenKind::TimePeriod => {
                let (from, to) = token
                    .text
                    .split_once('/')
                    .ok_or_else(|| parse_error!("invalid time period: {}", token.text))?;
                Node::Period(instant(from)?, instant(to)?)
            }
            TokenKind::Logical => {
                let operator = if token.text.eq_ignore_ascii_case("AND") {
                    LogicalOperator::And
                } else {
                    LogicalOperator::Or
                };
                let right = self.pop_filter(operator.as_str())?;
                let left = self.pop_filter(operator.as_str())?;
                Node::Filter(Filter::Logical(Logical {
                    operator,
                    children: vec![left, right],
                }))
            }
            TokenKind::Not => Node::Filter(Filter::not(self.pop_filter("NOT")?)),
            TokenKind::Comparison => {
                let operator = BinaryOperator::from_keyword(token.text)
                    .ok_or_else(|| parse_error!("unknown comparison operator: {}", token.text))?;
                let value = self.pop_literal(operator.as_str())?;
                let property = self.pop_subject(operator.as_str())?;
                Node::Filter(Filter::Comparison(Comparison {
                    property,
                    predicate: Predicate::Binary { operator, value },
                }))
            }
            TokenKind::Between => {
                match self.pop("BETWEEN")? {
                    Node::BetweenAnd => {}
                    other => {
                        return Err(parse_error!(
                            "BETWEEN expects 'AND' between its bounds, found {}",
                            other.describe()
                        ))
                    }
                }
                let upper = self.pop_literal("BETWEEN")?;
                let lower = self.pop_literal("BETWEEN")?;
                let property = self.pop_subject("BETWEEN")?;
                Node::Filter(Filter::Comparison(Comparison {
                    property,
                    predicate: Predicate::Between { lower, upper },
                }))
            }
            TokenKind::IsNull => {
                let property = self.pop_subject("IS NULL")?;
                Node::Filter(Filter::Comparison(Comparison {
                    property,
                    predicate: Predicate::IsNull,
                }))
            }
            TokenKind::Before | TokenKind::After => {
                let before = token.kind == TokenKind::Before;
                let context = if before { "BEFORE" } else { "AFTER" };
                let instant = match self.pop(context)? {
                    Node::Instant(instant) => instant,
                    other => return Err(mismatch(context, "time", &other)),
                };
                let property = self.pop_property(context)?;
                let predicate = if before {
                    TemporalPredicate::Before { instant }
                } else {
                    TemporalPredicate::After { instant }
                };
                Node::Filter(Filter::Temporal(Temporal {
                    property,
                    predicate,
                }))
            }
            TokenKind::During => {
                let (from, to) = match self.pop("DURING")? {
                    Node::Period(from, to) => (from, to),
                    other => return Err(mismatch("DURING", "time period", &other)),
                };
                let property = self.pop_property("DURING")?;
                Node::Filter(Filter::Temporal(Temporal {
                    property,
                    predicate: TemporalPredicate::During { from, to },
                }))
            }
            TokenKind::Spatial
            | TokenKind::FilterFunctionName
            | TokenKind::Comma
            | TokenKind::LParen
            | TokenKind::RParen
            | TokenKind::Units
            | TokenKind::End => {
                return Err(parse_error!("unexpected {} in postfix sequence", token.kind));
            }
        };
        Ok(node)
    }

    fn spatial(&mut self, token: &Token<'_>, operands: usize) -> Result<Node> {
        let operator = SpatialOperator::from_keyword(token.text)
            .ok_or_else(|| parse_error!("unknown spatial operator: {}", token.text))?;
        let context = operator.as_str();
        let expected = spatial_operands(operator);
        if operands > expected {
            return Err(CqlError::TrailingTokens {
                remaining: operands - expected,
            });
        }
        let predicate = match operator {
            SpatialOperator::BBox => {
                let max_y = self.pop_number(context)?;
                let max_x = self.pop_number(context)?;
                let min_y = self.pop_number(context)?;
                let min_x = self.pop_number(context)?;
                SpatialPredicate::BBox(BoundingBox {
                    min_x,
                    min_y,
                    max_x,
                    max_y,
                })
            }
            SpatialOperator::Intersects => SpatialPredicate::Intersects {
                geometry: self.pop_geometry(context)?,
            },
            SpatialOperator::Within => SpatialPredicate::Within {
                geometry: self.pop_geometry(context)?,
            },
            SpatialOperator::Contains => SpatialPredicate::Contains {
                geometry: self.pop_geometry(context)?,
            },
            SpatialOperator::DWithin => {
                let distance = self.pop_number(context)?;
                let geometry = self.pop_geometry(context)?;
                SpatialPredicate::DWithin { geometry, distance }
            }
        };
        let property = self.pop_property(context)?;
        Ok(Node::Filter(Filter::Spatial(Spatial {
            property,
            predicate,
        })))
    }

    fn call(&mut self, token: &Token<'_>, arity: usize) -> Result<Node> {
        let name = token.text.trim_end_matches('(');
        let expected = self
            .functions
            .arity(name)
            .ok_or_else(|| CqlError::UnsupportedFilterFunction(name.to_string()))?;
        if expected != arity {
            return Err(parse_error!(
                "{name} takes {expected} parameter(s), found {arity}"
            ));
        }
        if self.operands.len() < arity {
            return Err(parse_error!("{name} is missing an operand"));
        }

        let params = self
            .operands
            .split_off(self.operands.len() - arity)
            .into_iter()
            .map(|node| match node {
                Node::Literal(literal) => Ok(Operand::Literal(literal)),
                Node::Property(property) => Ok(Operand::Property(property)),
                Node::Filter(filter) => Ok(Operand::Filter(filter)),
                other => Err(mismatch(name, "parameter", &other)),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Node::Filter(Filter::Function(FilterFunction {
            name: name.to_string(),
            params,
        })))
    }

    fn pop(&mut self, context: &str) -> Result<Node> {
        self.operands
            .pop()
            .ok_or_else(|| parse_error!("{context} is missing an operand"))
    }

    fn pop_filter(&mut self, context: &str) -> Result<Filter> {
        match self.pop(context)? {
            Node::Filter(filter) => Ok(filter),
            other => Err(mismatch(context, "filter", &other)),
        }
    }

    fn pop_literal(&mut self, context: &str) -> Result<Literal> {
        match self.pop(context)? {
            Node::Literal(literal) => Ok(literal),
            other => Err(mismatch(context, "literal", &other)),
        }
    }

    fn pop_property(&mut self, context: &str) -> Result<String> {
        match self.pop(context)? {
            Node::Property(property) => Ok(property),
            other => Err(mismatch(context, "property", &other)),
        }
    }

    /// 属性名, 或者代替属性出现的过滤函数
    fn pop_subject(&mut self, context: &str) -> Result<Subject> {
        match self.pop(context)? {
            Node::Property(property) => Ok(Subject::Property(property)),
            Node::Filter(Filter::Function(function)) => Ok(Subject::Function(function)),
            other => Err(mismatch(context, "property", &other)),
        }
    }

    fn pop_number(&mut self, context: &str) -> Result<f64> {
        match self.pop(context)? {
            Node::Literal(Literal::Number(n)) => Ok(n),
            other => Err(mismatch(context, "number", &other)),
        }
    }

    fn pop_geometry(&mut self, context: &str) -> Result<Geometry> {
        match self.pop(context)? {
            Node::Literal(Literal::Geometry(geometry)) => Ok(geometry),
            other => Err(mismatch(context, "geometry", &other)),
        }
    }
}

/// 空间运算符消费的操作数个数, 包括属性本身
fn spatial_operands(operator: SpatialOperator) -> usize {
    match operator {
        SpatialOperator::BBox => 5,
        SpatialOperator::DWithin => 3,
        SpatialOperator::Intersects | SpatialOperator::Within | SpatialOperator::Contains => 2,
    }
}

fn mismatch(context: &str, expected: &str, found: &Node) -> CqlError {
    parse_error!(
        "{context} expects a {expected} operand, found {}",
        found.describe()
    )
}

/// 去掉属性名两侧的双引号
fn unquote_property(text: &str) -> String {
    text.strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(text)
        .to_string()
}

/// 单引号包围的是字符串 (`''` 表示一个单引号), 否则是数字
fn parse_value(text: &str) -> Result<Literal> {
    if let Some(inner) = text.strip_prefix('\'').and_then(|t| t.strip_suffix('\'')) {
        return Ok(Literal::String(inner.replace("''", "'")));
    }
    text.parse::<f64>()
        .map(Literal::Number)
        .map_err(|_| parse_error!("invalid number: {text}"))
}

/// `'RELATIVE(PT1H)'` → `PT1H`
fn relative_duration(text: &str) -> String {
    let prefix = "'RELATIVE(".len();
    let suffix = ")'".len();
    text.get(prefix..text.len().saturating_sub(suffix))
        .unwrap_or_default()
        .to_string()
}

fn instant(text: &str) -> Result<DateTime<Utc>> {
    parse_instant(text).ok_or_else(|| parse_error!("invalid timestamp: {text}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Span;
    use chrono::TimeZone;

    fn string(value: &str) -> Literal {
        Literal::String(value.to_string())
    }

    fn eq(property: &str, value: Literal) -> Filter {
        Filter::compare(property, BinaryOperator::Eq, value)
    }

    #[test]
    fn test_simple_comparison() {
        let filter = read(r#""title" = 'hello'"#).unwrap();
        assert_eq!(filter, eq("title", string("hello")));
    }

    #[test]
    fn test_unquoted_property_and_number() {
        let filter = read("depth >= 2.5").unwrap();
        assert_eq!(filter, Filter::compare("depth", BinaryOperator::Gte, Literal::Number(2.5)));

        let filter = read("depth < 1.5e3").unwrap();
        assert_eq!(filter, Filter::compare("depth", BinaryOperator::Lt, Literal::Number(1500.0)));
    }

    #[test]
    fn test_escaped_quote_in_string() {
        let filter = read(r#""title" LIKE 'it''s%'"#).unwrap();
        assert_eq!(filter, Filter::compare("title", BinaryOperator::Like, string("it's%")));
    }

    #[test]
    fn test_and_or_nest_left_to_right() {
        let filter = read("a = 1 OR b = 2 AND c = 3").unwrap();
        assert_eq!(
            filter,
            Filter::and(
                Filter::or(eq("a", 1.0.into()), eq("b", 2.0.into())),
                eq("c", 3.0.into())
            )
        );
    }

    #[test]
    fn test_parentheses_override_order() {
        let filter = read("a = 1 OR (b = 2 AND c = 3)").unwrap();
        assert_eq!(
            filter,
            Filter::or(
                eq("a", 1.0.into()),
                Filter::and(eq("b", 2.0.into()), eq("c", 3.0.into()))
            )
        );
    }

    #[test]
    fn test_chained_or_is_binary_before_simplify() {
        let filter =
            read(r#"(("created" = 'X') OR ("modified" = 'X') OR ("effective" = 'X'))"#).unwrap();
        assert_eq!(
            filter,
            Filter::or(
                Filter::or(eq("created", string("X")), eq("modified", string("X"))),
                eq("effective", string("X"))
            )
        );
    }

    #[test]
    fn test_not_covers_rest_of_group() {
        let expected = Filter::not(Filter::and(eq("a", 1.0.into()), eq("b", 2.0.into())));
        assert_eq!(read(r#"NOT "a" = 1 AND "b" = 2"#).unwrap(), expected);
        assert_eq!(read("NOT (a = 1) AND b = 2").unwrap(), expected);

        let filter = read("NOT a = 1").unwrap();
        assert_eq!(filter, Filter::not(eq("a", 1.0.into())));
    }

    #[test]
    fn test_not_ends_at_enclosing_paren() {
        let filter = read("(NOT a = 1) AND b = 2").unwrap();
        assert_eq!(
            filter,
            Filter::and(Filter::not(eq("a", 1.0.into())), eq("b", 2.0.into()))
        );

        let filter = read("a = 1 OR NOT b = 2 AND c = 3").unwrap();
        assert_eq!(
            filter,
            Filter::or(
                eq("a", 1.0.into()),
                Filter::not(Filter::and(eq("b", 2.0.into()), eq("c", 3.0.into())))
            )
        );
    }

    #[test]
    fn test_not_ends_at_argument_comma() {
        let mut config = ReaderConfig::default();
        config.functions.register("matches", 2);
        let filter = read_with(r#"matches(NOT "a" = 1, 2)"#, &config).unwrap();
        let Filter::Function(function) = filter else {
            panic!("Expected filter function");
        };
        assert_eq!(
            function.params,
            vec![
                Operand::Filter(Filter::not(eq("a", 1.0.into()))),
                Operand::Literal(Literal::Number(2.0)),
            ]
        );
    }

    #[test]
    fn test_between() {
        let filter = read(r#""depth" BETWEEN 1 AND 5"#).unwrap();
        assert_eq!(
            filter,
            Filter::Comparison(Comparison {
                property: Subject::Property("depth".into()),
                predicate: Predicate::Between {
                    lower: 1.0.into(),
                    upper: 5.0.into()
                },
            })
        );
    }

    #[test]
    fn test_between_followed_by_logical() {
        let filter = read("depth BETWEEN 1 AND 5 AND title = 'x' OR id IS NULL").unwrap();
        let between = Filter::Comparison(Comparison {
            property: Subject::Property("depth".into()),
            predicate: Predicate::Between {
                lower: 1.0.into(),
                upper: 5.0.into(),
            },
        });
        let is_null = Filter::Comparison(Comparison {
            property: Subject::Property("id".into()),
            predicate: Predicate::IsNull,
        });
        assert_eq!(
            filter,
            Filter::or(Filter::and(between, eq("title", string("x"))), is_null)
        );
    }

    #[test]
    fn test_between_without_and_is_parse_error() {
        let err = read("depth BETWEEN 1 OR 5").unwrap_err();
        assert!(matches!(err, CqlError::Parse(_)), "{err:?}");
    }

    #[test]
    fn test_is_null_followed_by_logical() {
        let filter = read(r#""a" IS NULL AND "b" = 1"#).unwrap();
        let is_null = Filter::Comparison(Comparison {
            property: Subject::Property("a".into()),
            predicate: Predicate::IsNull,
        });
        assert_eq!(filter, Filter::and(is_null, eq("b", 1.0.into())));
    }

    #[test]
    fn test_temporal_filters() {
        let filter = read(r#""created" BEFORE 2020-01-01T00:00:00.000Z"#).unwrap();
        assert_eq!(
            filter,
            Filter::Temporal(Temporal {
                property: "created".into(),
                predicate: TemporalPredicate::Before {
                    instant: Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()
                },
            })
        );

        let filter =
            read(r#""modified" DURING 2020-01-01T00:00:00Z/2020-02-01T12:00:00Z"#).unwrap();
        assert_eq!(
            filter,
            Filter::Temporal(Temporal {
                property: "modified".into(),
                predicate: TemporalPredicate::During {
                    from: Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
                    to: Utc.with_ymd_and_hms(2020, 2, 1, 12, 0, 0).unwrap(),
                },
            })
        );
    }

    #[test]
    fn test_temporal_followed_by_logical() {
        let filter = read("created AFTER 2020-01-01 AND depth = 1").unwrap();
        let logical = filter.as_logical().unwrap();
        assert_eq!(logical.operator, LogicalOperator::And);
        assert!(matches!(logical.children[0], Filter::Temporal(_)));
    }

    #[test]
    fn test_invalid_timestamp_is_parse_error() {
        let err = read("created BEFORE 2020-13-01").unwrap_err();
        assert_eq!(err, CqlError::Parse("invalid timestamp: 2020-13-01".into()));
    }

    #[test]
    fn test_relative_value() {
        let filter = read(r#""modified" = 'RELATIVE(PT1H)'"#).unwrap();
        assert_eq!(filter, eq("modified", Literal::Relative("PT1H".into())));
    }

    #[test]
    fn test_bbox() {
        let filter = read(r#"BBOX("anyGeo", -10, -5.5, 10, 5)"#).unwrap();
        assert_eq!(
            filter,
            Filter::Spatial(Spatial {
                property: "anyGeo".into(),
                predicate: SpatialPredicate::BBox(BoundingBox {
                    min_x: -10.0,
                    min_y: -5.5,
                    max_x: 10.0,
                    max_y: 5.0
                }),
            })
        );
    }

    #[test]
    fn test_intersects_polygon() {
        let filter = read(r#"INTERSECTS("anyGeo", POLYGON((1 2, 3 4, 5 6, 1 2)))"#).unwrap();
        assert_eq!(
            filter,
            Filter::Spatial(Spatial {
                property: "anyGeo".into(),
                predicate: SpatialPredicate::Intersects {
                    geometry: Geometry("POLYGON((1 2, 3 4, 5 6, 1 2))".into())
                },
            })
        );
    }

    #[test]
    fn test_dwithin() {
        let filter = read(r#"DWITHIN("anyGeo", POINT(1 2), 250.5, meters)"#).unwrap();
        assert_eq!(
            filter,
            Filter::Spatial(Spatial {
                property: "anyGeo".into(),
                predicate: SpatialPredicate::DWithin {
                    geometry: Geometry("POINT(1 2)".into()),
                    distance: 250.5
                },
            })
        );
    }

    #[test]
    fn test_spatial_inside_logical() {
        let filter =
            read(r#"(WITHIN("anyGeo", POINT(1 2))) AND (CONTAINS("anyGeo", POINT(3 4)))"#)
                .unwrap();
        let logical = filter.as_logical().unwrap();
        assert_eq!(logical.children.len(), 2);
        assert!(matches!(
            &logical.children[1],
            Filter::Spatial(Spatial { predicate: SpatialPredicate::Contains { .. }, .. })
        ));
    }

    #[test]
    fn test_bbox_with_extra_bound_is_trailing() {
        let err = read(r#"BBOX("anyGeo", 1, 2, 3, 4, 5)"#).unwrap_err();
        assert_eq!(err, CqlError::TrailingTokens { remaining: 1 });

        let err = read(r#"BBOX("anyGeo", 1, 2, 3, 4, 5, 6, 7)"#).unwrap_err();
        assert_eq!(err, CqlError::TrailingTokens { remaining: 3 });
    }

    #[test]
    fn test_spatial_extra_operands_are_trailing() {
        let err = read(r#"INTERSECTS("anyGeo", POINT(1 2), POINT(3 4))"#).unwrap_err();
        assert_eq!(err, CqlError::TrailingTokens { remaining: 1 });

        let err = read(r#"DWITHIN("anyGeo", POINT(1 2), 10, 20, meters)"#).unwrap_err();
        assert_eq!(err, CqlError::TrailingTokens { remaining: 1 });

        // meters 不产生操作数
        assert!(read(r#"DWITHIN("anyGeo", POINT(1 2), 10, meters)"#).is_ok());
    }

    #[test]
    fn test_bbox_with_missing_bound() {
        let err = read(r#"BBOX("anyGeo", 1, 2, 3)"#).unwrap_err();
        assert!(matches!(err, CqlError::Parse(_)), "{err:?}");
    }

    #[test]
    fn test_filter_function() {
        let filter = read("proximity('anyText',3,'cat dog')").unwrap();
        assert_eq!(
            filter,
            Filter::Function(FilterFunction {
                name: "proximity".into(),
                params: vec![
                    Operand::Literal(string("anyText")),
                    Operand::Literal(Literal::Number(3.0)),
                    Operand::Literal(string("cat dog")),
                ],
            })
        );
    }

    #[test]
    fn test_zero_arity_function_parameter() {
        let filter = read("proximity('anyText', pi(),'cat dog')").unwrap();
        let Filter::Function(function) = filter else {
            panic!("Expected filter function");
        };
        assert_eq!(
            function.params[1],
            Operand::Filter(Filter::Function(FilterFunction {
                name: "pi".into(),
                params: vec![],
            }))
        );
    }

    #[test]
    fn test_function_in_property_position() {
        let filter = read("(proximity('anyText',3,'cat dog') = true)").unwrap();
        let Filter::Comparison(comparison) = filter else {
            panic!("Expected comparison");
        };
        let Subject::Function(function) = &comparison.property else {
            panic!("Expected function subject");
        };
        assert_eq!(function.name, "proximity");
        assert_eq!(
            comparison.predicate,
            Predicate::Binary {
                operator: BinaryOperator::Eq,
                value: Literal::Boolean(true)
            }
        );
    }

    #[test]
    fn test_comparison_as_function_parameter() {
        let mut config = ReaderConfig::default();
        config.functions.register("matches", 2);
        let filter = read_with(r#"matches("title" = 'x', 2)"#, &config).unwrap();
        let Filter::Function(function) = filter else {
            panic!("Expected filter function");
        };
        assert_eq!(
            function.params,
            vec![
                Operand::Filter(eq("title", string("x"))),
                Operand::Literal(Literal::Number(2.0)),
            ]
        );
    }

    #[test]
    fn test_unknown_function() {
        let err = read("abcdefg('anyText', 3, 'cat dog')").unwrap_err();
        assert_eq!(err, CqlError::UnsupportedFilterFunction("abcdefg".into()));
    }

    #[test]
    fn test_function_arity_mismatch() {
        let err = read("proximity('anyText', 3)").unwrap_err();
        assert_eq!(
            err,
            CqlError::Parse("proximity takes 3 parameter(s), found 2".into())
        );
    }

    #[test]
    fn test_unbalanced_parentheses() {
        assert!(matches!(read("(a = 1"), Err(CqlError::Parse(_))));
        assert!(matches!(read("(a = 1))"), Err(CqlError::Parse(_))));
    }

    #[test]
    fn test_comma_outside_arguments() {
        let err = read("a = 1, b = 2").unwrap_err();
        assert!(matches!(err, CqlError::Parse(_)), "{err:?}");
    }

    #[test]
    fn test_comparison_needs_property() {
        let err = read("(a = 1) = 2").unwrap_err();
        assert_eq!(
            err,
            CqlError::Parse("= expects a property operand, found filter".into())
        );
    }

    #[test]
    fn test_root_must_be_a_filter() {
        let tokens = [
            Token {
                kind: TokenKind::Property,
                text: "\"title\"",
                span: Span::new(0, 7),
                remainder_offset: 7,
            },
            Token {
                kind: TokenKind::End,
                text: "",
                span: Span::new(7, 7),
                remainder_offset: 7,
            },
        ];
        let err = build_ast(&tokens).unwrap_err();
        assert_eq!(err, CqlError::Parse("expression is a property, not a filter".into()));
        assert_eq!(build_ast(&[]).unwrap_err(), CqlError::Parse("empty expression".into()));
    }

    #[test]
    fn test_max_depth() {
        let config = ReaderConfig {
            max_depth: Some(2),
            ..ReaderConfig::default()
        };
        assert!(read_with("((a = 1))", &config).is_ok());
        let err = read_with("(((a = 1)))", &config).unwrap_err();
        assert!(matches!(err, CqlError::Parse(ref m) if m.contains("nesting depth")), "{err:?}");
    }

    #[test]
    fn test_custom_registry() {
        let mut config = ReaderConfig::default();
        config.functions.register("strLength", 1);
        let filter = read_with(r#"strLength("title") > 3"#, &config).unwrap();
        let Filter::Comparison(comparison) = filter else {
            panic!("Expected comparison");
        };
        assert_eq!(
            comparison.property,
            Subject::Function(FilterFunction {
                name: "strLength".into(),
                params: vec![Operand::Property("title".into())],
            })
        );
        assert!(matches!(
            read(r#"strLength("title") > 3"#),
            Err(CqlError::UnsupportedFilterFunction(_))
        ));
    }

    #[test]
    fn test_deep_nesting_does_not_recurse() {
        let depth = 2_000;
        let text = format!("{}a = 1{}", "(".repeat(depth), ")".repeat(depth));
        assert_eq!(read(&text).unwrap(), eq("a", 1.0.into()));
    }
}

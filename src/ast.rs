//! 过滤树 (AST) 的类型定义
//!
//! 过滤树是不可变的值树: 每个节点独占其子节点, 没有回指, 没有环。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 过滤树的节点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Filter {
    /// 属性比较, 例如：`"title" LIKE 'plan%'`
    Comparison(Comparison),
    /// AND / OR / NOT 组合
    Logical(Logical),
    /// 几何属性上的空间谓词, 例如：`BBOX("anyGeo", 1, 2, 3, 4)`
    Spatial(Spatial),
    /// 时间属性上的谓词, 例如：`"created" BEFORE 2020-01-01T00:00:00.000Z`
    Temporal(Temporal),
    /// 过滤函数调用, 例如：`proximity('anyText',3,'cat dog')`
    Function(FilterFunction),
}

impl Filter {
    pub fn and(left: Filter, right: Filter) -> Self {
        Filter::Logical(Logical {
            operator: LogicalOperator::And,
            children: vec![left, right],
        })
    }

    pub fn or(left: Filter, right: Filter) -> Self {
        Filter::Logical(Logical {
            operator: LogicalOperator::Or,
            children: vec![left, right],
        })
    }

    pub fn not(child: Filter) -> Self {
        Filter::Logical(Logical {
            operator: LogicalOperator::Not,
            children: vec![child],
        })
    }

    /// 二元比较的简写
    pub fn compare(property: &str, operator: BinaryOperator, value: Literal) -> Self {
        Filter::Comparison(Comparison {
            property: Subject::Property(property.to_string()),
            predicate: Predicate::Binary { operator, value },
        })
    }

    pub fn as_logical(&self) -> Option<&Logical> {
        match self {
            Filter::Logical(logical) => Some(logical),
            _ => None,
        }
    }
}

/// 比较运算的左侧: 属性名, 或者代替属性出现的过滤函数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subject {
    Property(String),
    Function(FilterFunction),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub property: Subject,
    pub predicate: Predicate,
}

impl Comparison {
    /// 运算符在 CQL 中的写法
    pub fn operator(&self) -> &'static str {
        match &self.predicate {
            Predicate::Binary { operator, .. } => operator.as_str(),
            Predicate::Between { .. } => "BETWEEN",
            Predicate::IsNull => "IS NULL",
        }
    }
}

/// 比较运算的右侧, 形状由运算符决定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Predicate {
    Binary { operator: BinaryOperator, value: Literal },
    Between { lower: Literal, upper: Literal },
    IsNull,
}

/// 二元比较运算符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOperator {
    Eq,    // =
    NotEq, // <>
    Lt,    // <
    Lte,   // <=
    Gt,    // >
    Gte,   // >=
    Like,
    #[serde(rename = "ilike")]
    ILike,
}

impl BinaryOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOperator::Eq => "=",
            BinaryOperator::NotEq => "<>",
            BinaryOperator::Lt => "<",
            BinaryOperator::Lte => "<=",
            BinaryOperator::Gt => ">",
            BinaryOperator::Gte => ">=",
            BinaryOperator::Like => "LIKE",
            BinaryOperator::ILike => "ILIKE",
        }
    }

    pub fn from_keyword(text: &str) -> Option<Self> {
        match text.to_ascii_uppercase().as_str() {
            "=" => Some(BinaryOperator::Eq),
            "<>" => Some(BinaryOperator::NotEq),
            "<" => Some(BinaryOperator::Lt),
            "<=" => Some(BinaryOperator::Lte),
            ">" => Some(BinaryOperator::Gt),
            ">=" => Some(BinaryOperator::Gte),
            "LIKE" => Some(BinaryOperator::Like),
            "ILIKE" => Some(BinaryOperator::ILike),
            _ => None,
        }
    }
}

/// 逻辑组合。NOT 恰好一个子节点; AND/OR 解析后两个, 化简后至少两个
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Logical {
    pub operator: LogicalOperator,
    pub children: Vec<Filter>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalOperator {
    And,
    Or,
    Not,
}

impl LogicalOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            LogicalOperator::And => "AND",
            LogicalOperator::Or => "OR",
            LogicalOperator::Not => "NOT",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spatial {
    pub property: String,
    pub predicate: SpatialPredicate,
}

impl Spatial {
    pub fn operator(&self) -> SpatialOperator {
        match self.predicate {
            SpatialPredicate::BBox(_) => SpatialOperator::BBox,
            SpatialPredicate::Intersects { .. } => SpatialOperator::Intersects,
            SpatialPredicate::DWithin { .. } => SpatialOperator::DWithin,
            SpatialPredicate::Within { .. } => SpatialOperator::Within,
            SpatialPredicate::Contains { .. } => SpatialOperator::Contains,
        }
    }
}

/// 空间谓词; 只有 DWITHIN 带距离 (单位: 米)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SpatialPredicate {
    #[serde(rename = "bbox")]
    BBox(BoundingBox),
    Intersects { geometry: Geometry },
    #[serde(rename = "dwithin")]
    DWithin { geometry: Geometry, distance: f64 },
    Within { geometry: Geometry },
    Contains { geometry: Geometry },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpatialOperator {
    #[serde(rename = "bbox")]
    BBox,
    Intersects,
    #[serde(rename = "dwithin")]
    DWithin,
    Within,
    Contains,
}

impl SpatialOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            SpatialOperator::BBox => "BBOX",
            SpatialOperator::Intersects => "INTERSECTS",
            SpatialOperator::DWithin => "DWITHIN",
            SpatialOperator::Within => "WITHIN",
            SpatialOperator::Contains => "CONTAINS",
        }
    }

    pub fn from_keyword(text: &str) -> Option<Self> {
        match text.to_ascii_uppercase().as_str() {
            "BBOX" => Some(SpatialOperator::BBox),
            "INTERSECTS" => Some(SpatialOperator::Intersects),
            "DWITHIN" => Some(SpatialOperator::DWithin),
            "WITHIN" => Some(SpatialOperator::Within),
            "CONTAINS" => Some(SpatialOperator::Contains),
            _ => None,
        }
    }
}

/// WKT 文本, 原样保存
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Geometry(pub String);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Temporal {
    pub property: String,
    pub predicate: TemporalPredicate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TemporalPredicate {
    Before { instant: DateTime<Utc> },
    After { instant: DateTime<Utc> },
    During { from: DateTime<Utc>, to: DateTime<Utc> },
}

impl TemporalPredicate {
    pub fn keyword(&self) -> &'static str {
        match self {
            TemporalPredicate::Before { .. } => "BEFORE",
            TemporalPredicate::After { .. } => "AFTER",
            TemporalPredicate::During { .. } => "DURING",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterFunction {
    pub name: String,
    pub params: Vec<Operand>,
}

/// 过滤函数的参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operand {
    Literal(Literal),
    Property(String),
    /// 嵌套的过滤函数或比较
    Filter(Filter),
}

/// 字面量值; 只能作为操作数出现, 不能单独作为过滤条件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Literal {
    String(String),
    Number(f64),
    Boolean(bool),
    Geometry(Geometry),
    /// ISO-8601 时长, 例如 `PT1H`, 写作 `'RELATIVE(PT1H)'`
    Relative(String),
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::String(value.to_string())
    }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Self {
        Literal::Number(value)
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Literal::Boolean(value)
    }
}

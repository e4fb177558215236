//! 把过滤树写回 CQL 文本
//!
//! 输出是规范形式: 属性名总是带双引号, 逻辑子句总是带括号,
//! 时间统一写成 UTC 毫秒精度。写出的文本可以被 `read` 重新解析成相同的树。
//!
//! ## 示例
//!
//! ```text
//! AND[title LIKE 'plan%', NOT(depth > 2)]
//!   → ("title" LIKE 'plan%') AND (NOT ("depth" > 2))
//! ```

use std::sync::LazyLock;

use regex::Regex;

use crate::ast::{
    Comparison, Filter, FilterFunction, Geometry, Literal, Logical, LogicalOperator, Operand,
    Predicate, Spatial, SpatialPredicate, Subject, Temporal, TemporalPredicate,
};
use crate::error::Result;
use crate::temporal::format_instant;
use crate::unencodable;

static FUNCTION_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z]\w*$").expect("invalid regex"));

/// 把过滤树写成 CQL 文本
pub fn write(filter: &Filter) -> Result<String> {
    let mut writer = Writer::default();
    writer.filter(filter)?;
    Ok(writer.out)
}

#[derive(Default)]
struct Writer {
    out: String,
}

impl Writer {
    fn filter(&mut self, filter: &Filter) -> Result<()> {
        match filter {
            Filter::Comparison(comparison) => self.comparison(comparison),
            Filter::Logical(logical) => self.logical(logical),
            Filter::Spatial(spatial) => self.spatial(spatial),
            Filter::Temporal(temporal) => self.temporal(temporal),
            Filter::Function(function) => self.function(function),
        }
    }

    fn logical(&mut self, logical: &Logical) -> Result<()> {
        let children = &logical.children;
        if logical.operator == LogicalOperator::Not {
            let [child] = children.as_slice() else {
                return Err(unencodable!("NOT with {} children", children.len()));
            };
            self.out.push_str("NOT (");
            self.filter(child)?;
            self.out.push(')');
            return Ok(());
        }

        if children.len() < 2 {
            return Err(unencodable!(
                "{} with {} children",
                logical.operator.as_str(),
                children.len()
            ));
        }
        for (i, child) in children.iter().enumerate() {
            if i > 0 {
                self.out.push(' ');
                self.out.push_str(logical.operator.as_str());
                self.out.push(' ');
            }
            self.out.push('(');
            self.filter(child)?;
            self.out.push(')');
        }
        Ok(())
    }

    fn comparison(&mut self, comparison: &Comparison) -> Result<()> {
        match &comparison.property {
            Subject::Property(name) => self.property(name)?,
            Subject::Function(function) => self.function(function)?,
        }
        self.out.push(' ');
        self.out.push_str(comparison.operator());
        match &comparison.predicate {
            Predicate::Binary { value, .. } => {
                if let Literal::Geometry(_) = value {
                    return Err(unencodable!("geometry as comparison value"));
                }
                self.out.push(' ');
                self.literal(value)?;
            }
            Predicate::Between { lower, upper } => {
                self.out.push(' ');
                self.bound(lower)?;
                self.out.push_str(" AND ");
                self.bound(upper)?;
            }
            Predicate::IsNull => {}
        }
        Ok(())
    }

    /// BETWEEN 的上下界只能是字符串或数字
    fn bound(&mut self, value: &Literal) -> Result<()> {
        match value {
            Literal::String(_) | Literal::Number(_) => self.literal(value),
            other => Err(unencodable!("BETWEEN bound {other:?}")),
        }
    }

    fn spatial(&mut self, spatial: &Spatial) -> Result<()> {
        self.out.push_str(spatial.operator().as_str());
        self.out.push('(');
        self.property(&spatial.property)?;
        match &spatial.predicate {
            SpatialPredicate::BBox(bbox) => {
                for bound in [bbox.min_x, bbox.min_y, bbox.max_x, bbox.max_y] {
                    self.out.push(',');
                    self.number(bound)?;
                }
            }
            SpatialPredicate::Intersects { geometry }
            | SpatialPredicate::Within { geometry }
            | SpatialPredicate::Contains { geometry } => {
                self.out.push_str(", ");
                self.geometry(geometry)?;
            }
            SpatialPredicate::DWithin { geometry, distance } => {
                self.out.push_str(", ");
                self.geometry(geometry)?;
                self.out.push_str(", ");
                self.number(*distance)?;
                self.out.push_str(", meters");
            }
        }
        self.out.push(')');
        Ok(())
    }

    fn temporal(&mut self, temporal: &Temporal) -> Result<()> {
        self.property(&temporal.property)?;
        self.out.push(' ');
        self.out.push_str(temporal.predicate.keyword());
        self.out.push(' ');
        match &temporal.predicate {
            TemporalPredicate::Before { instant } | TemporalPredicate::After { instant } => {
                self.out.push_str(&format_instant(instant));
            }
            TemporalPredicate::During { from, to } => {
                self.out.push_str(&format_instant(from));
                self.out.push('/');
                self.out.push_str(&format_instant(to));
            }
        }
        Ok(())
    }

    fn function(&mut self, function: &FilterFunction) -> Result<()> {
        if !FUNCTION_NAME.is_match(&function.name) {
            return Err(unencodable!("function name {:?}", function.name));
        }
        self.out.push_str(&function.name);
        self.out.push('(');
        for (i, param) in function.params.iter().enumerate() {
            if i > 0 {
                self.out.push(',');
            }
            match param {
                Operand::Literal(Literal::Relative(_)) => {
                    return Err(unencodable!("relative time as function parameter"));
                }
                Operand::Literal(literal) => self.literal(literal)?,
                Operand::Property(name) => self.property(name)?,
                Operand::Filter(filter) => self.filter(filter)?,
            }
        }
        self.out.push(')');
        Ok(())
    }

    fn property(&mut self, name: &str) -> Result<()> {
        if name.is_empty() || name.contains('"') {
            return Err(unencodable!("property name {name:?}"));
        }
        self.out.push('"');
        self.out.push_str(name);
        self.out.push('"');
        Ok(())
    }

    fn literal(&mut self, literal: &Literal) -> Result<()> {
        match literal {
            Literal::String(value) => {
                self.out.push('\'');
                self.out.push_str(&value.replace('\'', "''"));
                self.out.push('\'');
            }
            Literal::Number(n) => self.number(*n)?,
            Literal::Boolean(b) => self.out.push_str(if *b { "true" } else { "false" }),
            Literal::Geometry(geometry) => self.geometry(geometry)?,
            Literal::Relative(duration) => {
                self.out.push_str("'RELATIVE(");
                self.out.push_str(duration);
                self.out.push_str(")'");
            }
        }
        Ok(())
    }

    fn number(&mut self, n: f64) -> Result<()> {
        if !n.is_finite() {
            return Err(unencodable!("number {n}"));
        }
        self.out.push_str(&format!("{n}"));
        Ok(())
    }

    fn geometry(&mut self, geometry: &Geometry) -> Result<()> {
        if geometry.0.trim().is_empty() {
            return Err(unencodable!("empty geometry"));
        }
        self.out.push_str(&geometry.0);
        Ok(())
    }
}

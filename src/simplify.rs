//! 过滤树化简: 合并同类的 AND / OR 嵌套
//!
//! `(a OR b) OR c` 与 `a OR (b OR c)` 都化简为 `OR[a, b, c]`。
//! NOT 只有一个子节点, 不参与合并; 其余节点原样保留。

use crate::ast::{Filter, Logical, LogicalOperator};

/// 返回化简后的新树, 输入不变
///
/// 自底向上合并, 任意深度的同类嵌套都会被完全展开, 结果再次化简时不再变化。
pub fn simplify(filter: &Filter) -> Filter {
    let simplified = simplify_node(filter);
    tracing::debug!(changed = simplified != *filter, "simplified filter");
    simplified
}

fn simplify_node(filter: &Filter) -> Filter {
    match filter {
        Filter::Logical(logical) => Filter::Logical(simplify_logical(logical)),
        other => other.clone(),
    }
}

fn simplify_logical(logical: &Logical) -> Logical {
    let operator = logical.operator;
    let mut children = Vec::with_capacity(logical.children.len());
    for child in &logical.children {
        match simplify_node(child) {
            Filter::Logical(inner) if mergeable(operator, inner.operator) => {
                children.extend(inner.children)
            }
            simplified => children.push(simplified),
        }
    }
    Logical { operator, children }
}

fn mergeable(parent: LogicalOperator, child: LogicalOperator) -> bool {
    parent == child && parent != LogicalOperator::Not
}

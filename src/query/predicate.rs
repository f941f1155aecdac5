// ==========================================
// 数据管理平台 - 谓词树
// ==========================================
// 职责: AND / OR 结构的过滤条件，由查询引擎消费
// 来源: ConditionTranslator 转换结果，或调用方直接构建
// ==========================================

use crate::domain::{ConditionalType, FieldValue};
use std::fmt;

/// 谓词树
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// 单字段判断
    Leaf {
        field: String,
        operator: ConditionalType,
        value: FieldValue,
    },
    /// 子节点全部成立（空集合恒真）
    And(Vec<Predicate>),
    /// 任一子节点成立（空集合恒假）
    Or(Vec<Predicate>),
}

impl Predicate {
    pub fn leaf(field: &str, operator: ConditionalType, value: impl Into<FieldValue>) -> Self {
        Predicate::Leaf {
            field: field.to_string(),
            operator,
            value: value.into(),
        }
    }

    /// 恒真条件（匹配全部行）
    pub fn all() -> Self {
        Predicate::And(Vec::new())
    }

    pub fn eq(field: &str, value: impl Into<FieldValue>) -> Self {
        Self::leaf(field, ConditionalType::Equal, value)
    }

    pub fn ne(field: &str, value: impl Into<FieldValue>) -> Self {
        Self::leaf(field, ConditionalType::NotEqual, value)
    }

    pub fn gt(field: &str, value: impl Into<FieldValue>) -> Self {
        Self::leaf(field, ConditionalType::GreaterThan, value)
    }

    pub fn ge(field: &str, value: impl Into<FieldValue>) -> Self {
        Self::leaf(field, ConditionalType::GreaterThanOrEqual, value)
    }

    pub fn lt(field: &str, value: impl Into<FieldValue>) -> Self {
        Self::leaf(field, ConditionalType::LessThan, value)
    }

    pub fn le(field: &str, value: impl Into<FieldValue>) -> Self {
        Self::leaf(field, ConditionalType::LessThanOrEqual, value)
    }

    pub fn like(field: &str, pattern: &str) -> Self {
        Self::leaf(field, ConditionalType::Like, pattern)
    }

    pub fn in_list(field: &str, values: impl Into<FieldValue>) -> Self {
        Self::leaf(field, ConditionalType::In, values)
    }

    pub fn is_null(field: &str) -> Self {
        Self::leaf(field, ConditionalType::IsNull, FieldValue::Null)
    }

    pub fn is_not_null(field: &str) -> Self {
        Self::leaf(field, ConditionalType::IsNotNull, FieldValue::Null)
    }

    /// AND 组合（同为 And 时展开，保持顺序）
    pub fn and(self, other: Predicate) -> Self {
        match self {
            Predicate::And(mut children) => {
                children.push(other);
                Predicate::And(children)
            }
            leaf => Predicate::And(vec![leaf, other]),
        }
    }

    /// OR 组合（同为 Or 时展开，保持顺序）
    pub fn or(self, other: Predicate) -> Self {
        match self {
            Predicate::Or(mut children) => {
                children.push(other);
                Predicate::Or(children)
            }
            leaf => Predicate::Or(vec![leaf, other]),
        }
    }

    /// 叶子谓词数量
    pub fn leaf_count(&self) -> usize {
        match self {
            Predicate::Leaf { .. } => 1,
            Predicate::And(children) | Predicate::Or(children) => {
                children.iter().map(Predicate::leaf_count).sum()
            }
        }
    }

    /// 遍历全部叶子（深度优先，保持输入顺序）
    pub fn visit_leaves<'a>(&'a self, f: &mut impl FnMut(&'a str, ConditionalType, &'a FieldValue)) {
        match self {
            Predicate::Leaf {
                field,
                operator,
                value,
            } => f(field.as_str(), *operator, value),
            Predicate::And(children) | Predicate::Or(children) => {
                for child in children {
                    child.visit_leaves(f);
                }
            }
        }
    }

    /// 是否匹配全部行（空 And）
    pub fn is_trivial(&self) -> bool {
        matches!(self, Predicate::And(children) if children.is_empty())
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Leaf {
                field,
                operator,
                value,
            } => {
                if operator.is_null_check() {
                    write!(f, "{} {}", field, operator)
                } else {
                    write!(f, "{} {} {}", field, operator, value)
                }
            }
            Predicate::And(children) => write_group(f, children, " AND ", "TRUE"),
            Predicate::Or(children) => write_group(f, children, " OR ", "FALSE"),
        }
    }
}

// 单个子节点直接展示；多个子节点各自加括号
fn write_group(
    f: &mut fmt::Formatter<'_>,
    children: &[Predicate],
    separator: &str,
    empty: &str,
) -> fmt::Result {
    match children {
        [] => f.write_str(empty),
        [only] => write!(f, "{}", only),
        _ => {
            for (idx, child) in children.iter().enumerate() {
                if idx > 0 {
                    f.write_str(separator)?;
                }
                write!(f, "({})", child)?;
            }
            Ok(())
        }
    }
}

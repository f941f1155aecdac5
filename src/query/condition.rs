// ==========================================
// 数据管理平台 - 查询条件转换
// ==========================================
// 职责: Condition 列表 → 谓词树
// 规则:
// - 多字段条件 → OR 子树（共享运算符与值）
// - 顶层条件之间 AND
// - 保持输入顺序（生成的查询文本稳定，便于缓存与对照测试）
// ==========================================

use crate::domain::{Condition, ConditionalType, FieldValue};
use crate::query::identifier::ensure_identifier;
use crate::query::predicate::Predicate;
use crate::repository::error::{DataError, DataResult};

/// 条件转换器
pub struct ConditionTranslator;

impl ConditionTranslator {
    /// 转换条件列表
    ///
    /// # 返回
    /// - Ok(Predicate::And(..)): 每个输入条件对应一个子节点
    /// - Err(InvalidCondition): 字段集合为空 / 运算符与值类型不匹配
    /// - Err(InvalidFieldName): 字段名不符合标识符规则
    pub fn translate(conditions: &[Condition]) -> DataResult<Predicate> {
        let children = conditions
            .iter()
            .map(Self::translate_one)
            .collect::<DataResult<Vec<_>>>()?;
        Ok(Predicate::And(children))
    }

    fn translate_one(condition: &Condition) -> DataResult<Predicate> {
        if condition.field_names.is_empty() {
            return Err(DataError::InvalidCondition(format!(
                "条件字段为空 (运算符 {:?})",
                condition.operator
            )));
        }
        check_value(condition.operator, &condition.value)?;

        let mut leaves = condition
            .field_names
            .iter()
            .map(|field| {
                ensure_identifier(field)?;
                Ok(Predicate::leaf(
                    field,
                    condition.operator,
                    condition.value.clone(),
                ))
            })
            .collect::<DataResult<Vec<_>>>()?;

        if leaves.len() == 1 {
            Ok(leaves.remove(0))
        } else {
            Ok(Predicate::Or(leaves))
        }
    }
}

/// 运算符与值类型兼容性校验
fn check_value(operator: ConditionalType, value: &FieldValue) -> DataResult<()> {
    if operator.is_null_check() {
        return Ok(());
    }

    if operator.is_collection() {
        return match value {
            FieldValue::List(items) if items.iter().any(FieldValue::is_list) => Err(
                DataError::InvalidCondition(format!("{:?} 的值不允许嵌套列表", operator)),
            ),
            FieldValue::List(_) => Ok(()),
            other => Err(DataError::InvalidCondition(format!(
                "{:?} 需要列表值，实际为 {}",
                operator,
                other.type_name()
            ))),
        };
    }

    if value.is_list() {
        return Err(DataError::InvalidCondition(format!(
            "{:?} 不接受列表值",
            operator
        )));
    }

    if operator.is_pattern() && value.as_str().is_none() {
        return Err(DataError::InvalidCondition(format!(
            "{:?} 需要文本值，实际为 {}",
            operator,
            value.type_name()
        )));
    }

    if operator.is_ordering() && value.is_null() {
        return Err(DataError::InvalidCondition(format!(
            "{:?} 不能与 NULL 比较",
            operator
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multi_field_expands_to_or() {
        let p = ConditionTranslator::translate(&[Condition::eq("a,b", 5)]).unwrap();
        assert_eq!(p.to_string(), "(a = 5) OR (b = 5)");
    }

    #[test]
    fn test_or_group_anded_with_siblings() {
        let p = ConditionTranslator::translate(&[
            Condition::eq("a,b", 5),
            Condition::new("c", ConditionalType::GreaterThan, 1),
        ])
        .unwrap();
        assert_eq!(p.to_string(), "((a = 5) OR (b = 5)) AND (c > 1)");
        assert_eq!(p.leaf_count(), 3);
    }

    #[test]
    fn test_preserves_input_order() {
        let p = ConditionTranslator::translate(&[
            Condition::eq("z", 1),
            Condition::eq("a", 2),
            Condition::eq("m", 3),
        ])
        .unwrap();
        assert_eq!(p.to_string(), "(z = 1) AND (a = 2) AND (m = 3)");
    }

    #[test]
    fn test_empty_list_is_trivial() {
        let p = ConditionTranslator::translate(&[]).unwrap();
        assert!(p.is_trivial());
    }

    #[test]
    fn test_empty_field_set_rejected() {
        let err = ConditionTranslator::translate(&[Condition::eq("", 1)]).unwrap_err();
        assert!(matches!(err, DataError::InvalidCondition(_)));
    }

    #[test]
    fn test_in_requires_collection() {
        let err = ConditionTranslator::translate(&[Condition::new("id", ConditionalType::In, 1)])
            .unwrap_err();
        assert!(matches!(err, DataError::InvalidCondition(_)));

        let ok = ConditionTranslator::translate(&[Condition::in_list("id", vec![1, 2])]).unwrap();
        assert_eq!(ok.to_string(), "id IN (1, 2)");
    }

    #[test]
    fn test_list_rejected_for_scalar_operator() {
        let err = ConditionTranslator::translate(&[Condition::eq("id", vec![1, 2])]).unwrap_err();
        assert!(matches!(err, DataError::InvalidCondition(_)));
    }

    #[test]
    fn test_like_requires_text() {
        let err = ConditionTranslator::translate(&[Condition::new("name", ConditionalType::Like, 3)])
            .unwrap_err();
        assert!(matches!(err, DataError::InvalidCondition(_)));
    }

    #[test]
    fn test_ordering_rejects_null() {
        let err = ConditionTranslator::translate(&[Condition::new(
            "age",
            ConditionalType::LessThan,
            FieldValue::Null,
        )])
        .unwrap_err();
        assert!(matches!(err, DataError::InvalidCondition(_)));
    }

    #[test]
    fn test_injection_in_field_name_rejected() {
        let err = ConditionTranslator::translate(&[Condition::eq("name,1=1 --", "x")]).unwrap_err();
        assert!(matches!(err, DataError::InvalidFieldName { .. }));
    }

    #[test]
    fn test_blank_segment_rejected() {
        let err = ConditionTranslator::translate(&[Condition::eq("a,,b", 1)]).unwrap_err();
        assert!(matches!(err, DataError::InvalidFieldName { .. }));
    }

    #[test]
    fn test_null_check_ignores_value() {
        let p = ConditionTranslator::translate(&[Condition::new(
            "deleted_at",
            ConditionalType::IsNull,
            FieldValue::Null,
        )])
        .unwrap();
        assert_eq!(p.to_string(), "deleted_at IS NULL");
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn field_name() -> impl Strategy<Value = String> {
            "[a-z_][a-z0-9_]{0,8}"
        }

        fn condition() -> impl Strategy<Value = Condition> {
            (prop::collection::vec(field_name(), 1..5), any::<i64>()).prop_map(|(fields, v)| {
                Condition {
                    field_names: fields,
                    operator: ConditionalType::Equal,
                    value: FieldValue::Integer(v),
                }
            })
        }

        proptest! {
            #[test]
            fn leaf_count_matches_field_count(conds in prop::collection::vec(condition(), 0..8)) {
                let expected: usize = conds.iter().map(|c| c.field_names.len()).sum();
                let predicate = ConditionTranslator::translate(&conds).unwrap();
                prop_assert_eq!(predicate.leaf_count(), expected);
            }
        }
    }
}

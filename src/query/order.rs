// ==========================================
// 数据管理平台 - 排序转换
// ==========================================
// 职责: OrderClause 列表 → 规范化排序子句 ("name asc,age desc")
// 红线: 字段名拼接进 SQL 文本，必须先做标识符校验
// ==========================================

use crate::domain::OrderClause;
use crate::query::identifier::ensure_identifier;
use crate::repository::error::DataResult;

/// 排序转换器
pub struct OrderTranslator;

impl OrderTranslator {
    /// 转换排序列表
    ///
    /// # 返回
    /// - Ok(""): 输入为空（本层不强加默认排序）
    /// - Ok("name asc,age desc"): 按输入顺序逗号拼接
    /// - Err(InvalidFieldName): 字段名为空或含非法字符
    pub fn translate(order_bys: &[OrderClause]) -> DataResult<String> {
        let fragments = order_bys
            .iter()
            .map(|clause| {
                let field = ensure_identifier(clause.field_name.trim())?;
                Ok(format!("{} {}", field, clause.direction.keyword()))
            })
            .collect::<DataResult<Vec<_>>>()?;

        Ok(fragments.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::error::DataError;

    #[test]
    fn test_translate_order_list() {
        let clause = OrderTranslator::translate(&[OrderClause::asc("name"), OrderClause::desc("age")])
            .unwrap();
        assert_eq!(clause, "name asc,age desc");
    }

    #[test]
    fn test_translate_empty() {
        assert_eq!(OrderTranslator::translate(&[]).unwrap(), "");
    }

    #[test]
    fn test_translate_single_no_trailing_separator() {
        assert_eq!(
            OrderTranslator::translate(&[OrderClause::desc("created_at")]).unwrap(),
            "created_at desc"
        );
    }

    #[test]
    fn test_empty_field_rejected() {
        let err = OrderTranslator::translate(&[OrderClause::asc("")]).unwrap_err();
        assert!(matches!(err, DataError::InvalidFieldName { .. }));
    }

    #[test]
    fn test_injection_rejected() {
        let err = OrderTranslator::translate(&[
            OrderClause::asc("name"),
            OrderClause::desc("id; DROP TABLE users"),
        ])
        .unwrap_err();
        assert!(matches!(err, DataError::InvalidFieldName { field } if field.contains("DROP")));
    }
}

// ==========================================
// 数据管理平台 - 标识符校验
// ==========================================
// 红线: 字段名/表名会拼接进 SQL 文本（非参数化），必须先通过白名单校验
// 允许: [A-Za-z_][A-Za-z0-9_]*，可用 '.' 分隔限定名（如 t.name）
// ==========================================

use crate::repository::error::{DataError, DataResult};

/// 校验标识符，失败返回 InvalidFieldName
pub fn ensure_identifier(ident: &str) -> DataResult<&str> {
    if is_valid_identifier(ident) {
        Ok(ident)
    } else {
        Err(DataError::invalid_field(ident))
    }
}

pub fn is_valid_identifier(ident: &str) -> bool {
    if ident.is_empty() {
        return false;
    }
    ident.split('.').all(is_valid_segment)
}

fn is_valid_segment(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

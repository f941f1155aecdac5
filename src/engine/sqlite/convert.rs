// ==========================================
// 数据管理平台 - SQLite 值转换
// ==========================================
// 职责: FieldValue ⇄ rusqlite 值，查询结果 → Row
// 约束: Bool 以 0/1 整数绑定；List 不可直接绑定（由 IN 子句展开）
// ==========================================

use crate::domain::{FieldValue, Row};
use rusqlite::types::{ToSql, ToSqlOutput, Value, ValueRef};
use rusqlite::{params_from_iter, Connection};

impl ToSql for FieldValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            FieldValue::Null => ToSqlOutput::Owned(Value::Null),
            FieldValue::Bool(b) => ToSqlOutput::Owned(Value::Integer(i64::from(*b))),
            FieldValue::Integer(i) => ToSqlOutput::Owned(Value::Integer(*i)),
            FieldValue::Real(r) => ToSqlOutput::Owned(Value::Real(*r)),
            FieldValue::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            FieldValue::Blob(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
            FieldValue::List(_) => {
                return Err(rusqlite::Error::ToSqlConversionFailure(
                    "列表值不能绑定为单个参数".into(),
                ))
            }
        })
    }
}

/// 单列值 → FieldValue
pub fn field_value_from_ref(value: ValueRef<'_>) -> FieldValue {
    match value {
        ValueRef::Null => FieldValue::Null,
        ValueRef::Integer(i) => FieldValue::Integer(i),
        ValueRef::Real(r) => FieldValue::Real(r),
        ValueRef::Text(t) => FieldValue::Text(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => FieldValue::Blob(b.to_vec()),
    }
}

/// 结果行 → Row（按列序号读取）
pub fn read_row(row: &rusqlite::Row<'_>, columns: &[String]) -> rusqlite::Result<Row> {
    let mut out = Row::new();
    for (idx, name) in columns.iter().enumerate() {
        out.set(name, field_value_from_ref(row.get_ref(idx)?));
    }
    Ok(out)
}

/// 执行查询并读取全部结果行
pub fn query_rows(conn: &Connection, sql: &str, params: &[FieldValue]) -> rusqlite::Result<Vec<Row>> {
    let mut stmt = conn.prepare(sql)?;
    let columns: Vec<String> = stmt
        .column_names()
        .into_iter()
        .map(|name| name.to_string())
        .collect();

    let rows = stmt
        .query_map(params_from_iter(params.iter()), |row| read_row(row, &columns))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(rows)
}

/// 执行写语句
pub fn execute(conn: &Connection, sql: &str, params: &[FieldValue]) -> rusqlite::Result<usize> {
    conn.execute(sql, params_from_iter(params.iter()))
}

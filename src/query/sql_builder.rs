// ==========================================
// 数据管理平台 - SQL 构建工具模块
// ==========================================
// 职责: 谓词树 / 排序子句 → 参数化 SQL 文本（? 占位符）
// 约束: 值一律参数绑定；标识符在进入本模块前已校验
// ==========================================

use crate::domain::{ConditionalType, FieldValue};
use crate::query::predicate::Predicate;

/// 构建 IN 子句
///
/// # 示例
/// ```
/// use data_manager::query::sql_builder::build_in_clause;
///
/// assert_eq!(build_in_clause("status", 3, false), "status IN (?, ?, ?)");
///
/// // 空列表返回永假条件
/// assert_eq!(build_in_clause("status", 0, false), "1 = 0");
///
/// // NOT IN 空列表返回永真条件
/// assert_eq!(build_in_clause("status", 0, true), "1 = 1");
/// ```
pub fn build_in_clause(column_name: &str, count: usize, negated: bool) -> String {
    if count == 0 {
        // 空列表时返回恒定条件，确保 SQL 语法正确
        return if negated { "1 = 1" } else { "1 = 0" }.to_string();
    }

    let placeholders = vec!["?"; count].join(", ");
    let keyword = if negated { "NOT IN" } else { "IN" };
    format!("{} {} ({})", column_name, keyword, placeholders)
}

/// 渲染谓词树为 WHERE 片段，参数按出现顺序追加到 `params`
pub fn render_predicate(predicate: &Predicate, params: &mut Vec<FieldValue>) -> String {
    match predicate {
        Predicate::Leaf {
            field,
            operator,
            value,
        } => render_leaf(field, *operator, value, params),
        Predicate::And(children) => render_group(children, " AND ", "1 = 1", params),
        Predicate::Or(children) => render_group(children, " OR ", "1 = 0", params),
    }
}

fn render_group(
    children: &[Predicate],
    separator: &str,
    empty: &str,
    params: &mut Vec<FieldValue>,
) -> String {
    match children {
        [] => empty.to_string(),
        [only] => render_predicate(only, params),
        _ => children
            .iter()
            .map(|child| format!("({})", render_predicate(child, params)))
            .collect::<Vec<_>>()
            .join(separator),
    }
}

fn render_leaf(
    field: &str,
    operator: ConditionalType,
    value: &FieldValue,
    params: &mut Vec<FieldValue>,
) -> String {
    match operator {
        ConditionalType::IsNull => format!("{} IS NULL", field),
        ConditionalType::IsNotNull => format!("{} IS NOT NULL", field),
        ConditionalType::Equal if value.is_null() => format!("{} IS NULL", field),
        ConditionalType::NotEqual if value.is_null() => format!("{} IS NOT NULL", field),
        ConditionalType::In | ConditionalType::NotIn => {
            let items = match value {
                FieldValue::List(items) => items.clone(),
                other => vec![other.clone()],
            };
            let clause = build_in_clause(field, items.len(), operator == ConditionalType::NotIn);
            params.extend(items);
            clause
        }
        ConditionalType::Like | ConditionalType::NotLike => {
            params.push(like_pattern(value, "%", "%"));
            format!("{} {} ? ESCAPE '\\'", field, operator.symbol())
        }
        ConditionalType::LikeLeft => {
            params.push(like_pattern(value, "", "%"));
            format!("{} LIKE ? ESCAPE '\\'", field)
        }
        ConditionalType::LikeRight => {
            params.push(like_pattern(value, "%", ""));
            format!("{} LIKE ? ESCAPE '\\'", field)
        }
        _ => {
            params.push(value.clone());
            format!("{} {} ?", field, operator.symbol())
        }
    }
}

/// LIKE 转义符，与片段中的 ESCAPE '\' 对应
const LIKE_ESCAPE: char = '\\';

/// 用户值按字面匹配：转义 `%`、`_` 与转义符本身，再加通配前后缀
fn like_pattern(value: &FieldValue, prefix: &str, suffix: &str) -> FieldValue {
    let text = match value {
        FieldValue::Text(s) => s.clone(),
        other => other.to_string(),
    };
    let mut pattern = String::with_capacity(prefix.len() + text.len() + suffix.len());
    pattern.push_str(prefix);
    for ch in text.chars() {
        if matches!(ch, '%' | '_') || ch == LIKE_ESCAPE {
            pattern.push(LIKE_ESCAPE);
        }
        pattern.push(ch);
    }
    pattern.push_str(suffix);
    FieldValue::Text(pattern)
}

/// 构建 INSERT 语句
pub fn build_insert_sql(table: &str, columns: &[&str]) -> String {
    let placeholders = vec!["?"; columns.len()].join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table,
        columns.join(", "),
        placeholders
    )
}

/// SQL 查询构建器（流式 API）
///
/// # 示例
/// ```
/// use data_manager::query::sql_builder::SqlQueryBuilder;
/// use data_manager::query::Predicate;
///
/// let (sql, params) = SqlQueryBuilder::new("SELECT * FROM article")
///     .filter(&Predicate::eq("status", 1).and(Predicate::like("title", "rust")))
///     .order_by("created_at desc")
///     .limit(10)
///     .offset(20)
///     .build();
///
/// assert_eq!(
///     sql,
///     "SELECT * FROM article WHERE (status = ?) AND (title LIKE ? ESCAPE '\\') ORDER BY created_at desc LIMIT 10 OFFSET 20"
/// );
/// assert_eq!(params.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct SqlQueryBuilder {
    select_clause: String,
    where_clauses: Vec<String>,
    params: Vec<FieldValue>,
    order_by_clause: Option<String>,
    limit_clause: Option<u64>,
    offset_clause: Option<u64>,
}

impl SqlQueryBuilder {
    /// 创建新的 SQL 查询构建器
    pub fn new(select: &str) -> Self {
        Self {
            select_clause: select.to_string(),
            where_clauses: Vec::new(),
            params: Vec::new(),
            order_by_clause: None,
            limit_clause: None,
            offset_clause: None,
        }
    }

    /// 添加 WHERE 条件（无参数）
    pub fn where_clause(mut self, condition: &str) -> Self {
        self.where_clauses.push(condition.to_string());
        self
    }

    /// 添加谓词树（恒真谓词不产生 WHERE）
    pub fn filter(mut self, predicate: &Predicate) -> Self {
        if !predicate.is_trivial() {
            let clause = render_predicate(predicate, &mut self.params);
            self.where_clauses.push(clause);
        }
        self
    }

    /// 条件添加谓词树
    pub fn filter_if(self, predicate: Option<&Predicate>) -> Self {
        match predicate {
            Some(p) => self.filter(p),
            None => self,
        }
    }

    /// 添加 ORDER BY 子句（空串忽略）
    pub fn order_by(mut self, order: &str) -> Self {
        if !order.trim().is_empty() {
            self.order_by_clause = Some(order.to_string());
        }
        self
    }

    /// 添加 LIMIT 子句
    pub fn limit(mut self, n: u64) -> Self {
        self.limit_clause = Some(n);
        self
    }

    /// 添加 OFFSET 子句
    pub fn offset(mut self, n: u64) -> Self {
        self.offset_clause = Some(n);
        self
    }

    /// 构建最终的 SQL 语句与绑定参数
    pub fn build(&self) -> (String, Vec<FieldValue>) {
        let mut sql = self.select_clause.clone();

        // 添加 WHERE 条件
        if !self.where_clauses.is_empty() {
            sql.push_str(" WHERE ");
            if self.where_clauses.len() == 1 {
                sql.push_str(&self.where_clauses[0]);
            } else {
                let wrapped: Vec<String> =
                    self.where_clauses.iter().map(|c| format!("({})", c)).collect();
                sql.push_str(&wrapped.join(" AND "));
            }
        }

        // 添加 ORDER BY
        if let Some(order) = &self.order_by_clause {
            sql.push_str(" ORDER BY ");
            sql.push_str(order);
        }

        // 添加 LIMIT / OFFSET（SQLite 要求 OFFSET 前必须有 LIMIT）
        match (self.limit_clause, self.offset_clause) {
            (Some(limit), Some(offset)) => {
                sql.push_str(&format!(" LIMIT {} OFFSET {}", limit, offset))
            }
            (Some(limit), None) => sql.push_str(&format!(" LIMIT {}", limit)),
            (None, Some(offset)) => sql.push_str(&format!(" LIMIT -1 OFFSET {}", offset)),
            (None, None) => {}
        }

        (sql, self.params.clone())
    }
}

// ==========================================
// 单元测试
// ==========================================

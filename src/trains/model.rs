// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

/// 一条列车记录。`id` 只有在写入数据库之后才存在。
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Train {
    line: Option<String>,
    route: Option<String>,
    run_number: Option<String>,
    operator_id: Option<String>,
    id: Option<i64>,
}

impl Train {
    pub fn new(line: &str, route: &str, run_number: &str, operator_id: &str) -> Self {
        Self {
            line: Some(line.to_string()),
            route: Some(route.to_string()),
            run_number: Some(run_number.to_string()),
            operator_id: Some(operator_id.to_string()),
            id: None,
        }
    }

    /// 各字段均可缺失，缺失的字段读取时为空字符串
    pub fn from_parts(
        line: Option<String>,
        route: Option<String>,
        run_number: Option<String>,
        operator_id: Option<String>,
        id: Option<i64>,
    ) -> Self {
        Self {
            line,
            route,
            run_number,
            operator_id,
            id,
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn line(&self) -> &str {
        self.line.as_deref().unwrap_or_default()
    }

    pub fn route(&self) -> &str {
        self.route.as_deref().unwrap_or_default()
    }

    pub fn run_number(&self) -> &str {
        self.run_number.as_deref().unwrap_or_default()
    }

    pub fn operator_id(&self) -> &str {
        self.operator_id.as_deref().unwrap_or_default()
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    /// 已持久化的记录才有 id
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        let train = Train::new("El", "Brown Line", "1234", "op-7").with_id(3);
        assert_eq!(train.line(), "El");
        assert_eq!(train.route(), "Brown Line");
        assert_eq!(train.run_number(), "1234");
        assert_eq!(train.operator_id(), "op-7");
        assert_eq!(train.id(), Some(3));
        assert!(train.is_persisted());
    }

    #[test]
    fn test_missing_fields_read_as_empty() {
        let train = Train::from_parts(None, None, None, None, None);
        assert_eq!(train.line(), "");
        assert_eq!(train.route(), "");
        assert_eq!(train.run_number(), "");
        assert_eq!(train.operator_id(), "");
        assert_eq!(train.id(), None);
        assert!(!train.is_persisted());
    }
}

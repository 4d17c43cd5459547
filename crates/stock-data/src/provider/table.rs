//! 데이터 제공자의 컬럼/행 테이블 응답.
//!
//! 제공자는 API마다 컬럼을 생략하거나 순서를 바꿀 수 있으므로 값은 항상 컬럼
//! 이름으로 꺼냅니다. 없거나, null이거나, 타입이 다른 값은 에러 대신 기본값
//! (빈 문자열, 0)으로 해석합니다.

use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// `data` 필드의 테이블.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RemoteTable {
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default)]
    pub items: Vec<Vec<Value>>,
}

impl RemoteTable {
    pub fn new(fields: Vec<String>, items: Vec<Vec<Value>>) -> Self {
        Self { fields, items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// 컬럼 이름으로 값을 읽는 행 반복자.
    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> + '_ {
        let index: HashMap<&str, usize> = self
            .fields
            .iter()
            .enumerate()
            .map(|(i, name)| (name.as_str(), i))
            .collect();
        let index = Arc::new(index);

        self.items.iter().map(move |values| Row {
            index: index.clone(),
            values,
        })
    }
}

/// 테이블의 한 행.
#[derive(Debug, Clone)]
pub struct Row<'a> {
    index: Arc<HashMap<&'a str, usize>>,
    values: &'a [Value],
}

impl<'a> Row<'a> {
    fn value(&self, column: &str) -> Option<&'a Value> {
        self.index.get(column).and_then(|&i| self.values.get(i))
    }

    /// 문자열 컬럼. 문자열이 아니면 빈 문자열.
    pub fn get_str(&self, column: &str) -> String {
        match self.value(column) {
            Some(Value::String(s)) => s.clone(),
            _ => String::new(),
        }
    }

    /// 숫자 컬럼. 숫자가 아니면 0.0.
    pub fn get_f64(&self, column: &str) -> f64 {
        self.value(column).and_then(Value::as_f64).unwrap_or(0.0)
    }

    /// 정수 컬럼. 실수는 소수점 버림, 숫자가 아니면 0.
    pub fn get_i64(&self, column: &str) -> i64 {
        match self.value(column) {
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .unwrap_or(0),
            _ => 0,
        }
    }
}

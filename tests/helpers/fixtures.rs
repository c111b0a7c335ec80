/// Common test fixtures and data structures
///
/// Defines the record type migrated in integration tests.
use super::{Deserialize, KeySchema, Serialize};

/// A todo entry, keyed by owner and id
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
pub struct Todo {
    pub owner: String,
    pub id: String,
    pub title: String,
    pub done: bool,
    pub priority: u32,
    pub tags: Vec<String>,
}

impl Todo {
    pub fn key_schema() -> KeySchema {
        KeySchema::composite("owner", "id")
    }
}

/// `count` todos spread over a handful of owners
pub fn todos(count: usize) -> Vec<Todo> {
    (0..count)
        .map(|n| Todo {
            owner: format!("user_{}", n % 7),
            id: format!("{n:05}"),
            title: format!("todo number {n}"),
            done: n % 3 == 0,
            priority: (n % 5) as u32,
            tags: if n % 2 == 0 {
                vec!["home".into(), "weekly".into()]
            } else {
                Vec::new()
            },
        })
        .collect()
}

//! Text rendering of user records for tool output

use serde_json::Value;

use crate::user_client::UserRecord;

pub const NO_USERS_FOUND: &str = "No users found matching the search criteria";

/// One user as a fenced block of `  key: value` lines.
pub fn format_user(user: &UserRecord) -> String {
    let mut rendered = String::from("```\n");
    for (key, value) in user {
        rendered.push_str("  ");
        rendered.push_str(key);
        rendered.push_str(": ");
        rendered.push_str(&render_value(value));
        rendered.push('\n');
    }
    rendered.push_str("```\n");
    rendered
}

pub fn format_search_results(users: &[UserRecord]) -> String {
    if users.is_empty() {
        return NO_USERS_FOUND.to_string();
    }

    let blocks: String = users.iter().map(format_user).collect();
    format!("Found {} user(s):\n{blocks}", users.len())
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn record(value: Value) -> UserRecord {
        match value {
            Value::Object(map) => map,
            _ => panic!("test record must be an object"),
        }
    }

    #[test]
    fn formats_user_as_fenced_block() {
        let user = record(json!({"id": 7, "name": "John", "address": null}));

        let rendered = format_user(&user);

        assert!(rendered.starts_with("```\n"));
        assert!(rendered.ends_with("```\n"));
        assert!(rendered.contains("  id: 7\n"));
        assert!(rendered.contains("  name: John\n"));
        assert!(rendered.contains("  address: null\n"));
    }

    #[test]
    fn empty_search_reads_as_no_matches() {
        assert_eq!(format_search_results(&[]), NO_USERS_FOUND);
    }

    #[test]
    fn search_results_are_counted() {
        let users = vec![
            record(json!({"id": 1, "name": "John"})),
            record(json!({"id": 2, "name": "Jane"})),
        ];

        let rendered = format_search_results(&users);

        assert!(rendered.starts_with("Found 2 user(s):\n```\n"));
        assert_eq!(rendered.matches("```\n").count(), 4);
    }
}

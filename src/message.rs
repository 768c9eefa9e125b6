/*!
 * Chat message types consumed by the trimmer
 */

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Author role of a chat message
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A role-tagged chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Who wrote the message
    pub role: Role,
    /// Message text
    pub content: String,
    /// Optional participant name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Identifier of the tool call this message answers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    /// Create a message with the given role and content
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            name: None,
            tool_call_id: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Create a tool result message answering `tool_call_id`
    pub fn tool(content: impl Into<String>, tool_call_id: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.into()),
            ..Self::new(Role::Tool, content)
        }
    }

    /// Set the participant name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_uses_lowercase_roles_and_skips_empty_fields() {
        let json = serde_json::to_string(&Message::user("hi")).unwrap();
        assert_eq!(json, r#"{"role":"user","content":"hi"}"#);

        let json = serde_json::to_value(Message::tool("42", "call_1")).unwrap();
        assert_eq!(json["role"], "tool");
        assert_eq!(json["tool_call_id"], "call_1");
    }

    #[test]
    fn test_deserialize_with_optional_fields() {
        let messages: Vec<Message> = serde_json::from_str(
            r#"[
                {"role": "system", "content": "be brief"},
                {"role": "user", "content": "hello", "name": "ana"}
            ]"#,
        )
        .unwrap();

        assert_eq!(messages[0], Message::system("be brief"));
        assert_eq!(messages[1], Message::user("hello").with_name("ana"));
    }

    #[test]
    fn test_unknown_role_is_rejected() {
        let result: Result<Message, _> =
            serde_json::from_str(r#"{"role": "narrator", "content": "x"}"#);
        assert!(result.is_err());
    }
}

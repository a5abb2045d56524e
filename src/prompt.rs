use crate::config::PromptSettings;
use crate::domains::message::{Message, Role};
use crate::store;

/// Flattens the trailing history window plus the incoming prompt into the
/// single-turn text sent to the model.
///
/// Layout, one entry per line:
///
/// ```text
/// System: <system prompt>
/// User: <history>
/// Assistant: <history>
/// User: <prompt>
/// Assistant:
/// ```
pub fn serialize(history: &[Message], prompt: &str, settings: &PromptSettings) -> String {
    let window = store::trailing(history, settings.history_window);

    let mut lines = Vec::with_capacity(window.len() + 3);
    lines.push(format!("System: {}", settings.system_prompt));

    for message in window {
        let text = if settings.redact_privacy && message.privacy {
            settings.redaction_marker.as_str()
        } else {
            message.text.as_str()
        };
        lines.push(format!("{}: {text}", speaker(message.role)));
    }

    lines.push(format!("User: {prompt}"));
    lines.push("Assistant:".to_string());
    lines.join("\n")
}

fn speaker(role: Role) -> &'static str {
    match role {
        Role::User => "User",
        Role::Assistant => "Assistant",
    }
}

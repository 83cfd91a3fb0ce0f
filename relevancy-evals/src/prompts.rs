// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Chat prompts and the question generation template

use serde::{Deserialize, Serialize};

/// One-shot template asking the model for the question behind an answer.
///
/// The PSLV-C56 pair is the worked example; `{answer}` is substituted once.
pub const QUESTION_GEN_TEMPLATE: &str = "
Generate question for the given answer.
Answer:
The PSLV-C56 mission is scheduled to be launched on Sunday, 30 July 2023 at 06:30 IST / 01:00 UTC. It will be launched from the Satish Dhawan Space Centre, Sriharikota, Andhra Pradesh, India 
Question: When is the scheduled launch date and time for the PSLV-C56 mission, and where will it be launched from?

Answer:{answer}
Question:
";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }
}

/// Ordered chat messages sent as one generation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatPrompt {
    pub messages: Vec<ChatMessage>,
}

impl ChatPrompt {
    pub fn from_messages(messages: Vec<ChatMessage>) -> Self {
        Self { messages }
    }

    /// System message content, joined with blank lines when there are several
    pub fn system_text(&self) -> Option<String> {
        let parts: Vec<&str> = self
            .messages
            .iter()
            .filter(|m| m.role == ChatRole::System)
            .map(|m| m.content.as_str())
            .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join("\n\n"))
        }
    }
}

/// Single human-message prompt asking for the question `answer` responds to
pub fn question_generation_prompt(answer: &str) -> ChatPrompt {
    let content = QUESTION_GEN_TEMPLATE.replacen("{answer}", answer, 1);
    ChatPrompt::from_messages(vec![ChatMessage::user(content)])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_prompt_embeds_answer_once() {
        let prompt = question_generation_prompt("Paris is the capital of France.");

        assert_eq!(prompt.messages.len(), 1);
        assert_eq!(prompt.messages[0].role, ChatRole::User);

        let content = &prompt.messages[0].content;
        assert!(content.contains("PSLV-C56"));
        assert!(content.ends_with("Answer:Paris is the capital of France.\nQuestion:\n"));
        assert!(!content.contains("{answer}"));
        assert!(content.contains("Andhra Pradesh, India \nQuestion: When is"));
    }

    #[test]
    fn test_answer_with_braces_is_not_reexpanded() {
        let prompt = question_generation_prompt("literal {answer} text");
        assert!(prompt.messages[0]
            .content
            .contains("Answer:literal {answer} text\n"));
    }

    #[test]
    fn test_role_serialization() {
        let json = serde_json::to_string(&ChatMessage::user("hi")).unwrap();
        assert_eq!(json, r#"{"role":"user","content":"hi"}"#);
    }

    #[test]
    fn test_system_text() {
        let prompt = ChatPrompt::from_messages(vec![
            ChatMessage::system("be brief"),
            ChatMessage::user("hello"),
        ]);
        assert_eq!(prompt.system_text().as_deref(), Some("be brief"));
        assert_eq!(question_generation_prompt("x").system_text(), None);
    }
}

//! Prompt types.
//!
//! A conversation prompt is a system template, the session history, and a
//! human template, rendered in that order.

use serde::{Deserialize, Serialize};

/// One system + human template pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptDefinition {
    /// Template for the leading system message
    pub system: String,

    /// Template for the trailing human message
    pub human: String,
}

/// The two prompts a conversation turn needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptTemplates {
    /// Turns a follow-up question into a standalone one.
    /// Variables: `question`
    pub rephrase: PromptDefinition,

    /// Answers the standalone question from retrieved context.
    /// Variables: `context`, `standalone_question`
    pub answer: PromptDefinition,
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self {
            rephrase: PromptDefinition {
                system: crate::defaults::REPHRASE_SYSTEM.to_string(),
                human: crate::defaults::REPHRASE_HUMAN.to_string(),
            },
            answer: PromptDefinition {
                system: crate::defaults::ANSWER_SYSTEM.to_string(),
                human: crate::defaults::ANSWER_HUMAN.to_string(),
            },
        }
    }
}

/// On-disk override file. Omitted sections keep their built-in templates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptFile {
    /// API version for schema evolution
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rephrase: Option<PromptDefinition>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<PromptDefinition>,
}

impl PromptFile {
    /// Overlay the sections present in this file onto `base`.
    pub fn apply_to(self, mut base: PromptTemplates) -> PromptTemplates {
        if let Some(rephrase) = self.rephrase {
            base.rephrase = rephrase;
        }
        if let Some(answer) = self.answer {
            base.answer = answer;
        }
        base
    }
}

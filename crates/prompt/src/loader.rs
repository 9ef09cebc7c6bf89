//! Loader for YAML prompt overrides.

use crate::types::{PromptDefinition, PromptFile, PromptTemplates};
use colloquy_core::{AppError, AppResult};
use std::path::Path;

/// Load prompt templates, applying the override file if one is given.
///
/// Without a file the built-in templates are returned. A file may override
/// either prompt or both.
///
/// # Example
/// ```no_run
/// use colloquy_prompt::load_templates;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let templates = load_templates(Some(Path::new(".colloquy/prompts.yml")))?;
/// println!("Answer persona: {}", templates.answer.system);
/// # Ok(())
/// # }
/// ```
pub fn load_templates(path: Option<&Path>) -> AppResult<PromptTemplates> {
    let Some(path) = path else {
        return Ok(PromptTemplates::default());
    };

    tracing::debug!("Loading prompt overrides from: {:?}", path);

    if !path.exists() {
        return Err(AppError::Prompt(format!("Prompt file not found: {:?}", path)));
    }

    let contents = std::fs::read_to_string(path)
        .map_err(|e| AppError::Prompt(format!("Failed to read prompt file {:?}: {}", path, e)))?;

    let file: PromptFile = serde_yaml::from_str(&contents)
        .map_err(|e| AppError::Prompt(format!("Failed to parse prompt YAML {:?}: {}", path, e)))?;

    validate_file(&file)?;

    let overridden: Vec<&str> = [
        file.rephrase.as_ref().map(|_| "rephrase"),
        file.answer.as_ref().map(|_| "answer"),
    ]
    .into_iter()
    .flatten()
    .collect();
    tracing::info!("Loaded prompt overrides: {}", overridden.join(", "));

    Ok(file.apply_to(PromptTemplates::default()))
}

fn validate_file(file: &PromptFile) -> AppResult<()> {
    if file.api_version.is_empty() {
        return Err(AppError::Prompt(
            "Prompt apiVersion cannot be empty".to_string(),
        ));
    }

    if !file.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            file.api_version
        )));
    }

    if let Some(rephrase) = &file.rephrase {
        validate_definition("rephrase", rephrase, &["question"])?;
    }
    if let Some(answer) = &file.answer {
        validate_definition("answer", answer, &["context", "standalone_question"])?;
    }

    Ok(())
}

/// The system template must be non-empty and the human template must use
/// every variable the pipeline supplies.
fn validate_definition(name: &str, def: &PromptDefinition, required: &[&str]) -> AppResult<()> {
    if def.system.trim().is_empty() {
        return Err(AppError::Prompt(format!(
            "Prompt {} system template cannot be empty",
            name
        )));
    }

    for variable in required {
        if !def.human.contains(variable) {
            return Err(AppError::Prompt(format!(
                "Prompt {} human template must reference {{{{{}}}}}",
                name, variable
            )));
        }
    }

    Ok(())
}

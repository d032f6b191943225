//! Prompt loader for YAML prompt definitions.

use crate::defaults;
use crate::types::PromptDefinition;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use switchboard_core::config::STATE_DIR;
use switchboard_core::{AppError, AppResult};

/// Directory holding workspace prompt overrides.
pub fn prompts_dir(workspace_path: &Path) -> PathBuf {
    workspace_path.join(STATE_DIR).join("prompts")
}

/// Load a prompt definition by ID.
///
/// Searches `.switchboard/prompts/<id>.yml` in the workspace first and falls
/// back to the built-in definition of the same id.
///
/// # Arguments
/// * `workspace_path` - Root workspace directory containing `.switchboard/`
/// * `prompt_id` - Prompt identifier (e.g., "agent.answer")
///
/// # Example
/// ```no_run
/// use switchboard_prompt::load_prompt;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let prompt = load_prompt(Path::new("."), "agent.answer")?;
/// println!("Loaded prompt: {}", prompt.title);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt(workspace_path: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    let prompt_file = prompts_dir(workspace_path).join(format!("{}.yml", prompt_id));

    let definition = if prompt_file.exists() {
        tracing::debug!("Loading prompt from: {:?}", prompt_file);
        let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
            AppError::Prompt(format!(
                "Failed to read prompt file {:?}: {}",
                prompt_file, e
            ))
        })?;
        parse_prompt(&contents, &prompt_file.display().to_string())?
    } else if let Some(yaml) = defaults::builtin_yaml(prompt_id) {
        parse_prompt(yaml, "built-in")?
    } else {
        return Err(AppError::Prompt(format!(
            "Prompt not found: {} (looked in {:?})",
            prompt_id, prompt_file
        )));
    };

    if definition.id != prompt_id {
        return Err(AppError::Prompt(format!(
            "Prompt id mismatch: file for '{}' declares '{}'",
            prompt_id, definition.id
        )));
    }

    tracing::debug!("Loaded prompt: {} ({})", definition.id, definition.title);
    Ok(definition)
}

/// Load `preferred` if the workspace defines it, otherwise `fallback`.
///
/// `preferred` is never taken from the built-ins; it exists only as a
/// workspace override (e.g. `agent.answer.finance`).
pub fn load_prompt_or(
    workspace_path: &Path,
    preferred: &str,
    fallback: &str,
) -> AppResult<PromptDefinition> {
    let preferred_file = prompts_dir(workspace_path).join(format!("{}.yml", preferred));
    if preferred_file.exists() {
        load_prompt(workspace_path, preferred)
    } else {
        load_prompt(workspace_path, fallback)
    }
}

/// Where a listed prompt is loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptOrigin {
    Builtin,
    Workspace,
}

/// One prompt id the loader can resolve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptListing {
    pub id: String,
    pub origin: PromptOrigin,
}

/// List all available prompts: built-ins plus workspace overrides, sorted by
/// id. A workspace file shadows the built-in of the same id.
pub fn list_prompts(workspace_path: &Path) -> AppResult<Vec<PromptListing>> {
    let mut prompts: BTreeMap<String, PromptOrigin> = defaults::builtin_ids()
        .map(|id| (id.to_string(), PromptOrigin::Builtin))
        .collect();

    let dir = prompts_dir(workspace_path);
    if dir.exists() {
        for entry in walkdir::WalkDir::new(&dir).max_depth(1) {
            let entry = entry.map_err(|e| {
                AppError::Prompt(format!("Failed to read prompts in {:?}: {}", dir, e))
            })?;
            let path = entry.path();
            if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("yml") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    prompts.insert(stem.to_string(), PromptOrigin::Workspace);
                }
            }
        }
    }

    Ok(prompts
        .into_iter()
        .map(|(id, origin)| PromptListing { id, origin })
        .collect())
}

fn parse_prompt(contents: &str, origin: &str) -> AppResult<PromptDefinition> {
    let definition: PromptDefinition = serde_yaml::from_str(contents)
        .map_err(|e| AppError::Prompt(format!("Failed to parse prompt YAML {}: {}", origin, e)))?;
    validate_prompt(&definition)?;
    Ok(definition)
}

/// Validate a prompt definition.
fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.title.is_empty() {
        return Err(AppError::Prompt("Prompt title cannot be empty".to_string()));
    }

    if def.template.is_empty() {
        return Err(AppError::Prompt(
            "Prompt template cannot be empty".to_string(),
        ));
    }

    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_prompt(dir: &Path, id: &str, template: &str) {
        let dir = prompts_dir(dir);
        fs::create_dir_all(&dir).unwrap();

        let content = format!(
            r#"
id: {}
title: "Override"
apiVersion: "1.0"
template: "{}"
output:
  format: text
"#,
            id, template
        );
        fs::write(dir.join(format!("{}.yml", id)), content).unwrap();
    }

    #[test]
    fn test_builtin_prompt_without_workspace_files() {
        let temp_dir = TempDir::new().unwrap();
        let prompt = load_prompt(temp_dir.path(), "agent.answer").unwrap();
        assert_eq!(prompt.id, "agent.answer");
        assert!(prompt.template.contains("{{question}}"));
    }

    #[test]
    fn test_workspace_override_wins() {
        let temp_dir = TempDir::new().unwrap();
        write_prompt(temp_dir.path(), "agent.answer", "Q: {{question}}");

        let prompt = load_prompt(temp_dir.path(), "agent.answer").unwrap();
        assert_eq!(prompt.title, "Override");
        assert_eq!(prompt.template, "Q: {{question}}");
    }

    #[test]
    fn test_load_nonexistent_prompt() {
        let temp_dir = TempDir::new().unwrap();
        let result = load_prompt(temp_dir.path(), "nonexistent");
        assert!(matches!(result, Err(AppError::Prompt(_))));
    }

    #[test]
    fn test_load_invalid_yaml() {
        let temp_dir = TempDir::new().unwrap();
        let dir = prompts_dir(temp_dir.path());
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("agent.answer.yml"), "invalid: yaml: content:").unwrap();

        let result = load_prompt(temp_dir.path(), "agent.answer");
        assert!(result.is_err());
    }

    #[test]
    fn test_id_mismatch_rejected() {
        let temp_dir = TempDir::new().unwrap();
        write_prompt(temp_dir.path(), "agent.answer", "x");
        fs::rename(
            prompts_dir(temp_dir.path()).join("agent.answer.yml"),
            prompts_dir(temp_dir.path()).join("agent.answer.hr.yml"),
        )
        .unwrap();

        let result = load_prompt(temp_dir.path(), "agent.answer.hr");
        assert!(result.is_err());
    }

    #[test]
    fn test_domain_prompt_falls_back_to_shared() {
        let temp_dir = TempDir::new().unwrap();
        let prompt = load_prompt_or(temp_dir.path(), "agent.answer.hr", "agent.answer").unwrap();
        assert_eq!(prompt.id, "agent.answer");

        write_prompt(temp_dir.path(), "agent.answer.hr", "HR: {{question}}");
        let prompt = load_prompt_or(temp_dir.path(), "agent.answer.hr", "agent.answer").unwrap();
        assert_eq!(prompt.id, "agent.answer.hr");
    }

    #[test]
    fn test_list_prompts_merges_overrides() {
        let temp_dir = TempDir::new().unwrap();
        write_prompt(temp_dir.path(), "agent.answer.tech", "T: {{question}}");
        write_prompt(temp_dir.path(), "agent.answer", "A: {{question}}");

        let prompts = list_prompts(temp_dir.path()).unwrap();
        let ids: Vec<&str> = prompts.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "agent.answer",
                "agent.answer.tech",
                "agent.answer.ungrounded",
                "evaluator.score",
                "orchestrator.route",
            ]
        );

        let origin = |id: &str| prompts.iter().find(|p| p.id == id).unwrap().origin;
        assert_eq!(origin("agent.answer"), PromptOrigin::Workspace);
        assert_eq!(origin("agent.answer.tech"), PromptOrigin::Workspace);
        assert_eq!(origin("evaluator.score"), PromptOrigin::Builtin);
    }
}

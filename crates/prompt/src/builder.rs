//! Prompt builder for rendering templates.

use crate::types::{BuiltPrompt, PromptDefinition};
use handlebars::Handlebars;
use std::collections::HashMap;
use switchboard_core::{AppError, AppResult};

/// Build a prompt from a definition and input variables.
///
/// This function:
/// 1. Checks that every variable listed in `input.variables` is supplied
/// 2. Renders the system and user templates with Handlebars
/// 3. Returns a `BuiltPrompt` ready for LLM execution
///
/// # Example
/// ```no_run
/// use switchboard_prompt::{build_prompt, PromptDefinition};
/// use std::collections::HashMap;
///
/// # fn example(def: PromptDefinition) -> Result<(), Box<dyn std::error::Error>> {
/// let mut vars = HashMap::new();
/// vars.insert("question".to_string(), "How do I apply for parental leave?".to_string());
///
/// let built = build_prompt(&def, vars)?;
/// println!("User prompt: {}", built.user);
/// # Ok(())
/// # }
/// ```
pub fn build_prompt(
    definition: &PromptDefinition,
    variables: HashMap<String, String>,
) -> AppResult<BuiltPrompt> {
    tracing::debug!("Building prompt: {}", definition.id);

    let missing: Vec<&str> = definition
        .input
        .variables
        .iter()
        .filter(|name| !variables.contains_key(name.as_str()))
        .map(String::as_str)
        .collect();
    if !missing.is_empty() {
        return Err(AppError::Prompt(format!(
            "Prompt '{}' is missing variables: {}",
            definition.id,
            missing.join(", ")
        )));
    }

    let system = definition
        .system
        .as_deref()
        .map(|template| render_template(template, &variables))
        .transpose()?;
    let user = render_template(&definition.template, &variables)?;

    Ok(BuiltPrompt::new(
        system,
        user,
        definition.id.clone(),
        variables,
    ))
}

/// Render a Handlebars template with variables.
fn render_template(template: &str, variables: &HashMap<String, String>) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Retrieved documents are plain text
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("prompt", template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    let rendered = handlebars
        .render("prompt", &variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))?;

    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PromptBehavior, PromptInputSpec, PromptOutputSpec};

    fn create_test_definition(system: Option<&str>) -> PromptDefinition {
        PromptDefinition {
            id: "test.prompt".to_string(),
            title: "Test".to_string(),
            api_version: "1.0".to_string(),
            created_by: "test".to_string(),
            behavior: PromptBehavior::default(),
            input: PromptInputSpec {
                variables: vec!["question".to_string()],
            },
            system: system.map(str::to_string),
            template: "Question: {{question}}".to_string(),
            output: PromptOutputSpec {
                format: "text".to_string(),
            },
        }
    }

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_render_simple_template() {
        let result = render_template("Question: {{prompt}}", &vars(&[("prompt", "Hello")]));
        assert_eq!(result.unwrap(), "Question: Hello");
    }

    #[test]
    fn test_render_does_not_escape() {
        let result = render_template("{{context}}", &vars(&[("context", "<b>R&D</b>")]));
        assert_eq!(result.unwrap(), "<b>R&D</b>");
    }

    #[test]
    fn test_build_prompt_renders_system() {
        let def = create_test_definition(Some("You are the {{agent_type}} assistant"));
        let built = build_prompt(
            &def,
            vars(&[("question", "Where is the VPN guide?"), ("agent_type", "Tech")]),
        )
        .unwrap();

        assert_eq!(built.system.as_deref(), Some("You are the Tech assistant"));
        assert_eq!(built.user, "Question: Where is the VPN guide?");
        assert_eq!(built.metadata.source_prompt_id, "test.prompt");
    }

    #[test]
    fn test_build_prompt_missing_variable() {
        let def = create_test_definition(None);
        let result = build_prompt(&def, HashMap::new());
        match result {
            Err(AppError::Prompt(msg)) => assert!(msg.contains("question")),
            other => panic!("Expected prompt error, got {:?}", other.map(|b| b.user)),
        }
    }

    #[test]
    fn test_builtin_evaluator_prompt_optional_context() {
        let def: PromptDefinition =
            serde_yaml::from_str(crate::defaults::builtin_yaml("evaluator.score").unwrap())
                .unwrap();

        let without = build_prompt(&def, vars(&[("query", "q"), ("response", "r")])).unwrap();
        assert!(!without.user.contains("Reference material"));

        let with = build_prompt(
            &def,
            vars(&[("query", "q"), ("response", "r"), ("context", "policy text")]),
        )
        .unwrap();
        assert!(with.user.contains("policy text"));
    }
}

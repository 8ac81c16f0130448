//! Workflow template loading and per-request parameterization.
//!
//! A workflow is a ComfyUI prompt graph: a JSON object keyed by node id,
//! each node carrying an `inputs` object. The builder reads the template
//! from disk, substitutes the `{{GOOD_PROMPT}}`/`{{BAD_PROMPT}}` placeholders
//! from configuration, and then writes the caller's prompt, width, and
//! height into the three well-known nodes. The seed is always overwritten
//! with a fresh random draw so identical prompts still diverge.
use std::path::PathBuf;

use rand::Rng;
use serde_json::Value;
use tokio::fs;

use crate::config::{Config, NodeIds};
use crate::error::{AppError, AppResult};

/// Caller-supplied overrides for one generation request.
#[derive(Debug, Default, Clone, Copy)]
pub struct GenerationParams<'a> {
    pub prompt: Option<&'a str>,
    pub width: Option<i64>,
    pub height: Option<i64>,
}

pub struct WorkflowBuilder {
    template_path: PathBuf,
    good_prompt: String,
    bad_prompt: String,
    node_ids: NodeIds,
}

impl WorkflowBuilder {
    pub fn new(template_path: impl Into<PathBuf>, good_prompt: String, bad_prompt: String, node_ids: NodeIds) -> Self {
        WorkflowBuilder {
            template_path: template_path.into(),
            good_prompt,
            bad_prompt,
            node_ids,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.workflow_file.clone(),
            config.good_prompt.clone(),
            config.bad_prompt.clone(),
            config.node_ids.clone(),
        )
    }

    /// Read and parse the workflow template.
    ///
    /// Placeholder substitution happens on the raw text, before parsing, so
    /// the configured strings may span any JSON string position in the
    /// template. A missing file or invalid JSON fails the request.
    pub async fn load(&self) -> AppResult<Value> {
        let raw = fs::read_to_string(&self.template_path).await.map_err(|e| {
            AppError::Workflow(format!(
                "Failed to read workflow template {}: {}",
                self.template_path.display(),
                e
            ))
        })?;
        let substituted = raw
            .replace("{{GOOD_PROMPT}}", &self.good_prompt)
            .replace("{{BAD_PROMPT}}", &self.bad_prompt);
        serde_json::from_str(&substituted)
            .map_err(|e| AppError::Workflow(format!("Workflow template is not valid JSON: {}", e)))
    }

    /// Apply per-request parameters to a loaded workflow.
    ///
    /// Prompt, width, and height are only written when provided; the seed
    /// node is always overwritten with a uniform draw from [1, u64::MAX].
    /// Returns the drawn seed. Width and height are passed through without
    /// range checks; ComfyUI rejects values it cannot handle.
    pub fn parameterize(&self, workflow: &mut Value, params: GenerationParams<'_>) -> AppResult<u64> {
        if let Some(text) = params.prompt {
            set_node_input(workflow, &self.node_ids.text, "text", Value::String(text.to_string()))?;
        }
        if let Some(width) = params.width {
            set_node_input(workflow, &self.node_ids.latent_image, "width", Value::from(width))?;
        }
        if let Some(height) = params.height {
            set_node_input(workflow, &self.node_ids.latent_image, "height", Value::from(height))?;
        }
        let seed = rand::thread_rng().gen_range(1..=u64::MAX);
        set_node_input(workflow, &self.node_ids.seed, "seed", Value::from(seed))?;
        Ok(seed)
    }
}

fn set_node_input(workflow: &mut Value, node_id: &str, key: &str, value: Value) -> AppResult<()> {
    let node = workflow
        .get_mut(node_id)
        .ok_or_else(|| AppError::Workflow(format!("Workflow has no node '{}'", node_id)))?;
    let inputs = node
        .get_mut("inputs")
        .and_then(|i| i.as_object_mut())
        .ok_or_else(|| AppError::Workflow(format!("Workflow node '{}' has no inputs object", node_id)))?;
    inputs.insert(key.to_string(), value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::io::Write;

    fn node_ids() -> NodeIds {
        NodeIds {
            text: "6".to_string(),
            latent_image: "5".to_string(),
            seed: "3".to_string(),
        }
    }

    fn sample_workflow() -> Value {
        json!({
            "3": {"class_type": "KSampler", "inputs": {"seed": 1, "steps": 20}},
            "5": {"class_type": "EmptyLatentImage", "inputs": {"width": 64, "height": 64, "batch_size": 1}},
            "6": {"class_type": "CLIPTextEncode", "inputs": {"text": "placeholder"}},
            "9": {"class_type": "SaveImage", "inputs": {"filename_prefix": "out"}}
        })
    }

    fn builder_for(path: impl Into<PathBuf>) -> WorkflowBuilder {
        WorkflowBuilder::new(path, "pretty".to_string(), "ugly".to_string(), node_ids())
    }

    fn write_template(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[tokio::test]
    async fn load_substitutes_placeholders_before_parsing() {
        let file = write_template(r#"{"6": {"inputs": {"text": "{{GOOD_PROMPT}}, {{BAD_PROMPT}}"}}}"#);
        let builder = builder_for(file.path());

        let workflow = builder.load().await.unwrap();
        assert_eq!(workflow["6"]["inputs"]["text"], json!("pretty, ugly"));
    }

    #[tokio::test]
    async fn load_is_idempotent() {
        let file = write_template(r#"{"3": {"inputs": {"seed": 0}}, "note": "{{GOOD_PROMPT}}"}"#);
        let builder = builder_for(file.path());

        let first = builder.load().await.unwrap();
        let second = builder.load().await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn load_rejects_missing_file() {
        let builder = builder_for("/nonexistent/workflow.json");
        let err = builder.load().await.unwrap_err();
        assert!(matches!(err, AppError::Workflow(_)));
    }

    #[tokio::test]
    async fn load_rejects_invalid_json() {
        let file = write_template("not json at all");
        let builder = builder_for(file.path());
        let err = builder.load().await.unwrap_err();
        assert!(matches!(err, AppError::Workflow(_)));
    }

    #[test]
    fn parameterize_writes_only_the_configured_inputs() {
        let builder = builder_for("unused.json");
        let mut workflow = sample_workflow();
        let untouched = workflow.clone();

        builder
            .parameterize(
                &mut workflow,
                GenerationParams {
                    prompt: Some("a cat"),
                    width: Some(512),
                    height: Some(768),
                },
            )
            .unwrap();

        assert_eq!(workflow["6"]["inputs"]["text"], json!("a cat"));
        assert_eq!(workflow["5"]["inputs"]["width"], json!(512));
        assert_eq!(workflow["5"]["inputs"]["height"], json!(768));
        assert!(workflow["3"]["inputs"]["seed"].as_u64().unwrap() >= 1);

        // Everything outside the three touched inputs stays as loaded.
        assert_eq!(workflow["3"]["inputs"]["steps"], untouched["3"]["inputs"]["steps"]);
        assert_eq!(workflow["5"]["inputs"]["batch_size"], untouched["5"]["inputs"]["batch_size"]);
        assert_eq!(workflow["9"], untouched["9"]);
        assert_eq!(workflow["3"]["class_type"], untouched["3"]["class_type"]);
    }

    #[test]
    fn parameterize_skips_absent_params_but_always_reseeds() {
        let builder = builder_for("unused.json");
        let mut workflow = sample_workflow();

        let seed = builder.parameterize(&mut workflow, GenerationParams::default()).unwrap();

        assert_eq!(workflow["6"]["inputs"]["text"], json!("placeholder"));
        assert_eq!(workflow["5"]["inputs"]["width"], json!(64));
        assert_eq!(workflow["3"]["inputs"]["seed"], json!(seed));
    }

    #[test]
    fn consecutive_seeds_differ() {
        let builder = builder_for("unused.json");
        let mut a = sample_workflow();
        let mut b = sample_workflow();

        let seed_a = builder.parameterize(&mut a, GenerationParams::default()).unwrap();
        let seed_b = builder.parameterize(&mut b, GenerationParams::default()).unwrap();

        assert!(seed_a >= 1 && seed_b >= 1);
        assert_ne!(seed_a, seed_b);
    }

    #[test]
    fn parameterize_fails_on_missing_node() {
        let builder = builder_for("unused.json");
        let mut workflow = json!({"6": {"inputs": {"text": ""}}, "5": {"inputs": {}}});

        let err = builder.parameterize(&mut workflow, GenerationParams::default()).unwrap_err();
        assert!(err.to_string().contains("no node '3'"));
    }

    #[test]
    fn parameterize_fails_on_node_without_inputs() {
        let builder = builder_for("unused.json");
        let mut workflow = json!({"3": {"class_type": "KSampler"}});

        let err = builder.parameterize(&mut workflow, GenerationParams::default()).unwrap_err();
        assert!(err.to_string().contains("inputs"));
    }
}

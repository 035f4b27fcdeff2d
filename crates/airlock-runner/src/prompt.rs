//! Prompt template loading and rendering via `minijinja`.
//!
//! Four templates ship with the crate: `system.j2` (persona and rules) and
//! one user template per phase (`movement.j2`, `discussion.j2`, `vote.j2`).
//! A template directory may override any of them, so operators can tune
//! agent behaviour without recompiling.

use std::path::Path;

use minijinja::Environment;
use tracing::debug;

use crate::error::RunnerError;

const BUILTIN: [(&str, &str); 4] = [
    ("system", include_str!("../templates/system.j2")),
    ("movement", include_str!("../templates/movement.j2")),
    ("discussion", include_str!("../templates/discussion.j2")),
    ("vote", include_str!("../templates/vote.j2")),
];

/// Which user template to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    /// A movement-phase decision.
    Movement,
    /// A discussion utterance.
    Discussion,
    /// A ballot.
    Vote,
}

impl PromptKind {
    const fn template(self) -> &'static str {
        match self {
            Self::Movement => "movement",
            Self::Discussion => "discussion",
            Self::Vote => "vote",
        }
    }
}

/// Manages prompt templates and renders them.
#[derive(Debug)]
pub struct PromptEngine {
    env: Environment<'static>,
}

/// The complete rendered prompt ready to send to an LLM backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPrompt {
    /// System message: persona and rules.
    pub system: String,
    /// User message: the phase-specific situation and instructions.
    pub user: String,
}

impl PromptEngine {
    /// Create an engine with the built-in templates, overriding any that
    /// exist as `<name>.j2` in `templates_dir`.
    pub fn new(templates_dir: Option<&Path>) -> Result<Self, RunnerError> {
        let mut env = Environment::new();
        for (name, builtin) in BUILTIN {
            let override_path = templates_dir.map(|dir| dir.join(format!("{name}.j2")));
            let added = match override_path.filter(|path| path.is_file()) {
                Some(path) => {
                    let source = std::fs::read_to_string(&path).map_err(|e| {
                        RunnerError::Template(format!("failed to read {}: {e}", path.display()))
                    })?;
                    debug!(template = name, path = %path.display(), "using template override");
                    env.add_template_owned(name, source)
                }
                None => env.add_template(name, builtin),
            };
            added.map_err(|e| {
                RunnerError::Template(format!("failed to add {name} template: {e}"))
            })?;
        }
        Ok(Self { env })
    }

    /// Engine with the built-in templates only.
    pub fn builtin() -> Result<Self, RunnerError> {
        Self::new(None)
    }

    /// Render the system prompt and the `kind` user prompt against `context`.
    pub fn render(
        &self,
        kind: PromptKind,
        context: &serde_json::Value,
    ) -> Result<RenderedPrompt, RunnerError> {

        Ok(RenderedPrompt {
            system: self.render_one("system", context)?,
            user: self.render_one(kind.template(), context)?,
        })
    }

    fn render_one(&self, name: &str, context: &serde_json::Value) -> Result<String, RunnerError> {
        self.env
            .get_template(name)
            .map_err(|e| RunnerError::Template(format!("missing {name} template: {e}")))?
            .render(context)
            .map_err(|e| RunnerError::Template(format!("{name} render failed: {e}")))
    }
}

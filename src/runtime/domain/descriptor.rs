//! Build descriptor synthesis and validation.

use crate::registry::domain::BotRuntime;
use minijinja::{Environment, context};
use thiserror::Error;

/// File name of the build descriptor inside a bot's code directory.
pub const DESCRIPTOR_FILE_NAME: &str = "Dockerfile";

const DEFAULT_DESCRIPTOR_TEMPLATE: &str = r#"FROM {{ base_image }}

WORKDIR /app
{% if manifest %}
COPY {{ manifest }} ./
RUN {{ install_command }}
{% endif %}
COPY . .

CMD {{ command }}
"#;

/// Errors raised while rendering or checking a build descriptor.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DescriptorError {
    /// The descriptor has no instructions.
    #[error("Dockerfile contains no instructions")]
    Empty,

    /// The first instruction is not `FROM`.
    #[error("Dockerfile must start with FROM, found '{0}'")]
    MissingFrom(String),

    /// The default template failed to render.
    #[error("failed to render default Dockerfile: {0}")]
    Render(String),
}

/// Dependency manifest a runtime installs from, with its install command.
#[must_use]
pub const fn dependency_manifest(runtime: BotRuntime) -> (&'static str, &'static str) {
    match runtime {
        BotRuntime::Python => (
            "requirements.txt",
            "pip install --no-cache-dir -r requirements.txt",
        ),
        BotRuntime::Node => ("package.json", "npm install --omit=dev"),
    }
}

/// Renders the default descriptor for a runtime.
///
/// `has_manifest` controls whether the dependency install step is emitted.
///
/// # Errors
///
/// Returns [`DescriptorError::Render`] when template rendering fails.
pub fn render_default_descriptor(
    runtime: BotRuntime,
    has_manifest: bool,
) -> Result<String, DescriptorError> {
    let (manifest, install_command) = dependency_manifest(runtime);
    let command = serde_json::to_string(runtime.default_command())
        .map_err(|err| DescriptorError::Render(err.to_string()))?;

    let environment = Environment::new();
    let mut rendered = environment
        .render_str(
            DEFAULT_DESCRIPTOR_TEMPLATE,
            context! {
                base_image => runtime.base_image(),
                manifest => has_manifest.then_some(manifest),
                install_command => install_command,
                command => command,
            },
        )
        .map_err(|err| DescriptorError::Render(err.to_string()))?;
    rendered.push('\n');
    Ok(rendered)
}

/// Checks that the first instruction, after blank lines, comments, and
/// `ARG` declarations, is `FROM`.
///
/// # Errors
///
/// Returns [`DescriptorError::Empty`] or [`DescriptorError::MissingFrom`].
pub fn validate_descriptor(contents: &str) -> Result<(), DescriptorError> {
    let first_instruction = contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .find(|line| !is_instruction(line, "ARG"));

    match first_instruction {
        None => Err(DescriptorError::Empty),
        Some(line) if is_instruction(line, "FROM") => Ok(()),
        Some(line) => Err(DescriptorError::MissingFrom(line.to_owned())),
    }
}

fn is_instruction(line: &str, keyword: &str) -> bool {
    line.split_whitespace()
        .next()
        .is_some_and(|word| word.eq_ignore_ascii_case(keyword))
}

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::catalog::Catalog;
use crate::flows::engine::{ReplyTemplates, TurnEngine};
use crate::prompt::{ChatTemplate, PromptBuilder, DEFAULT_INSTRUCTIONS};
use crate::sanitize::{ReasoningMarkers, ResponseSanitizer};

pub const DEFAULT_OFFERINGS: [&str; 5] = [
    "SilentTroll 1–3hp (electric)",
    "RiverLite 2–6hp (portable)",
    "HarborMax 8–20hp (mid-range)",
    "BlueWater 25–60hp (family)",
    "OceanPro 75–150hp (offshore)",
];

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub generation: GenerationConfig,
    pub template: ChatTemplate,
    pub reasoning: ReasoningMarkers,
    pub assistant: AssistantConfig,
    pub replies: ReplyTemplates,
    pub logging: LoggingConfig,
}

/// Sampling parameters sent with every generation request.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GenerationConfig {
    pub max_new_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssistantConfig {
    pub instructions: String,
    pub offerings: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub max_new_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub offerings: Option<Vec<String>>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            generation: GenerationConfig { max_new_tokens: 512, temperature: 0.3, top_p: 0.9 },
            template: ChatTemplate::default(),
            reasoning: ReasoningMarkers::default(),
            assistant: AssistantConfig {
                instructions: DEFAULT_INSTRUCTIONS.to_string(),
                offerings: DEFAULT_OFFERINGS.iter().map(|name| name.to_string()).collect(),
            },
            replies: ReplyTemplates::default(),
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("tiller.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn catalog(&self) -> Catalog {
        Catalog::from_names(self.assistant.offerings.iter().cloned())
    }

    pub fn prompt_builder(&self) -> PromptBuilder {
        PromptBuilder::new(self.assistant.instructions.clone(), self.catalog(), self.template.clone())
    }

    pub fn turn_engine(&self) -> TurnEngine {
        TurnEngine::new(ResponseSanitizer::new(self.reasoning.clone()), self.replies.clone())
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(generation) = patch.generation {
            if let Some(max_new_tokens) = generation.max_new_tokens {
                self.generation.max_new_tokens = max_new_tokens;
            }
            if let Some(temperature) = generation.temperature {
                self.generation.temperature = temperature;
            }
            if let Some(top_p) = generation.top_p {
                self.generation.top_p = top_p;
            }
        }

        if let Some(template) = patch.template {
            if let Some(system_prefix) = template.system_prefix {
                self.template.system_prefix = system_prefix;
            }
            if let Some(user_prefix) = template.user_prefix {
                self.template.user_prefix = user_prefix;
            }
            if let Some(assistant_prefix) = template.assistant_prefix {
                self.template.assistant_prefix = assistant_prefix;
            }
            if let Some(turn_suffix) = template.turn_suffix {
                self.template.turn_suffix = turn_suffix;
            }
            if let Some(reasoning_directive) = template.reasoning_directive {
                self.template.reasoning_directive = reasoning_directive;
            }
        }

        if let Some(reasoning) = patch.reasoning {
            if let Some(open_marker) = reasoning.open_marker {
                self.reasoning.open = open_marker;
            }
            if let Some(close_marker) = reasoning.close_marker {
                self.reasoning.close = close_marker;
            }
        }

        if let Some(assistant) = patch.assistant {
            if let Some(instructions) = assistant.instructions {
                self.assistant.instructions = instructions;
            }
            if let Some(offerings) = assistant.offerings {
                self.assistant.offerings = offerings;
            }
        }

        if let Some(replies) = patch.replies {
            if let Some(placeholder) = replies.placeholder {
                self.replies.placeholder = placeholder;
            }
            if let Some(parse_failure) = replies.parse_failure {
                self.replies.parse_failure = parse_failure;
            }
            if let Some(non_json_prefix) = replies.non_json_prefix {
                self.replies.non_json_prefix = non_json_prefix;
            }
            if let Some(generation_failure_prefix) = replies.generation_failure_prefix {
                self.replies.generation_failure_prefix = generation_failure_prefix;
            }
            if let Some(preview_chars) = replies.preview_chars {
                self.replies.preview_chars = preview_chars;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("TILLER_GENERATION_MAX_NEW_TOKENS") {
            self.generation.max_new_tokens = parse_u32("TILLER_GENERATION_MAX_NEW_TOKENS", &value)?;
        }
        if let Some(value) = read_env("TILLER_GENERATION_TEMPERATURE") {
            self.generation.temperature = parse_f32("TILLER_GENERATION_TEMPERATURE", &value)?;
        }
        if let Some(value) = read_env("TILLER_GENERATION_TOP_P") {
            self.generation.top_p = parse_f32("TILLER_GENERATION_TOP_P", &value)?;
        }

        if let Some(value) = read_env("TILLER_REASONING_OPEN_MARKER") {
            self.reasoning.open = value;
        }
        if let Some(value) = read_env("TILLER_REASONING_CLOSE_MARKER") {
            self.reasoning.close = value;
        }

        // Offering names may contain commas, so the list separator is `;`.
        if let Some(value) = read_env("TILLER_ASSISTANT_OFFERINGS") {
            self.assistant.offerings =
                value.split(';').map(|name| name.trim().to_string()).collect();
        }

        let log_level = read_env("TILLER_LOGGING_LEVEL").or_else(|| read_env("TILLER_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("TILLER_LOGGING_FORMAT").or_else(|| read_env("TILLER_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(max_new_tokens) = overrides.max_new_tokens {
            self.generation.max_new_tokens = max_new_tokens;
        }
        if let Some(temperature) = overrides.temperature {
            self.generation.temperature = temperature;
        }
        if let Some(top_p) = overrides.top_p {
            self.generation.top_p = top_p;
        }
        if let Some(offerings) = overrides.offerings {
            self.assistant.offerings = offerings;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_generation(&self.generation)?;
        validate_template(&self.template)?;
        validate_reasoning(&self.reasoning)?;
        validate_assistant(&self.assistant)?;
        validate_replies(&self.replies)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("tiller.toml"), PathBuf::from("config/tiller.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_generation(generation: &GenerationConfig) -> Result<(), ConfigError> {
    if generation.max_new_tokens == 0 || generation.max_new_tokens > 8192 {
        return Err(ConfigError::Validation(
            "generation.max_new_tokens must be in range 1..=8192".to_string(),
        ));
    }

    if !(0.0..=2.0).contains(&generation.temperature) {
        return Err(ConfigError::Validation(
            "generation.temperature must be in range 0.0..=2.0".to_string(),
        ));
    }

    if !(generation.top_p > 0.0 && generation.top_p <= 1.0) {
        return Err(ConfigError::Validation(
            "generation.top_p must be greater than 0.0 and at most 1.0".to_string(),
        ));
    }

    Ok(())
}

fn validate_template(template: &ChatTemplate) -> Result<(), ConfigError> {
    let prefixes = [
        ("template.system_prefix", &template.system_prefix),
        ("template.user_prefix", &template.user_prefix),
        ("template.assistant_prefix", &template.assistant_prefix),
    ];
    for (key, value) in prefixes {
        if value.is_empty() {
            return Err(ConfigError::Validation(format!("{key} must not be empty")));
        }
    }

    Ok(())
}

fn validate_reasoning(reasoning: &ReasoningMarkers) -> Result<(), ConfigError> {
    if reasoning.open.is_empty() || reasoning.close.is_empty() {
        return Err(ConfigError::Validation(
            "reasoning.open_marker and reasoning.close_marker must not be empty".to_string(),
        ));
    }
    if reasoning.open == reasoning.close {
        return Err(ConfigError::Validation(
            "reasoning.open_marker and reasoning.close_marker must differ".to_string(),
        ));
    }

    Ok(())
}

fn validate_assistant(assistant: &AssistantConfig) -> Result<(), ConfigError> {
    if assistant.instructions.trim().is_empty() {
        return Err(ConfigError::Validation("assistant.instructions must not be blank".to_string()));
    }

    if assistant.offerings.is_empty() {
        return Err(ConfigError::Validation(
            "assistant.offerings must list at least one product line".to_string(),
        ));
    }

    for (index, offering) in assistant.offerings.iter().enumerate() {
        if offering.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "assistant.offerings[{index}] must not be blank"
            )));
        }
        if assistant.offerings[..index].contains(offering) {
            return Err(ConfigError::Validation(format!(
                "assistant.offerings lists `{offering}` more than once"
            )));
        }
    }

    Ok(())
}

fn validate_replies(replies: &ReplyTemplates) -> Result<(), ConfigError> {
    if replies.placeholder.trim().is_empty() || replies.parse_failure.trim().is_empty() {
        return Err(ConfigError::Validation(
            "replies.placeholder and replies.parse_failure must not be blank".to_string(),
        ));
    }

    if replies.preview_chars == 0 {
        return Err(ConfigError::Validation(
            "replies.preview_chars must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.trim().parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_f32(key: &str, value: &str) -> Result<f32, ConfigError> {
    value.trim().parse::<f32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    generation: Option<GenerationPatch>,
    template: Option<TemplatePatch>,
    reasoning: Option<ReasoningPatch>,
    assistant: Option<AssistantPatch>,
    replies: Option<RepliesPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct GenerationPatch {
    max_new_tokens: Option<u32>,
    temperature: Option<f32>,
    top_p: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
struct TemplatePatch {
    system_prefix: Option<String>,
    user_prefix: Option<String>,
    assistant_prefix: Option<String>,
    turn_suffix: Option<String>,
    reasoning_directive: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ReasoningPatch {
    open_marker: Option<String>,
    close_marker: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AssistantPatch {
    instructions: Option<String>,
    offerings: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct RepliesPatch {
    placeholder: Option<String>,
    parse_failure: Option<String>,
    non_json_prefix: Option<String>,
    generation_failure_prefix: Option<String>,
    preview_chars: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

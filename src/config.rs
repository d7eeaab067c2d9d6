use crate::error::{Error, Result};
use crate::token::TokenizerKind;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_INPUT_FILE: &str = "input_code.txt";
const DEFAULT_OUTPUT_FILE: &str = "output_code.txt";
const DEFAULT_ENV_FILE: &str = ".env";
const DEFAULT_API_KEY_VAR: &str = "CHATGPT_API_KEY";
const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "text-davinci-003";
const DEFAULT_MAX_PROMPT_TOKENS: usize = 3_500;
const DEFAULT_MAX_COMPLETION_TOKENS: usize = 3_500;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const MAX_TEMPERATURE: f32 = 2.0;

/// Instruction prepended to the input file contents.
pub const DEFAULT_INSTRUCTION: &str = "Given this code, check if context is passed as a parameter. If it's missing, add context as a parameter and provide the correct code:\n\n";

/// Configuration for a code generation run.
///
/// Use [`Config::builder()`] to construct a new configuration. Every field
/// defaults to the values the tool has always used, so `Config::default()`
/// reproduces a bare invocation.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct Config {
    /// File holding the code to send
    pub input_path: PathBuf,

    /// File receiving the streamed completion (truncated on each run)
    pub output_path: PathBuf,

    /// Optional `KEY=VALUE` settings file seeding the environment
    pub env_file: PathBuf,

    /// Environment variable holding the API key
    pub api_key_var: String,

    /// Base URL of the completion API
    pub api_base: String,

    /// Completion model
    pub model: String,

    /// Instruction prepended to the input
    pub instruction: String,

    /// Maximum tokens allowed in the payload
    pub max_prompt_tokens: usize,

    /// `max_tokens` sent with the request
    pub max_completion_tokens: usize,

    /// Sampling temperature
    pub temperature: f32,

    /// Deadline for the whole completion call
    pub timeout: Duration,

    /// Encoding used to count tokens
    pub tokenizer: TokenizerKind,

    /// Count tokens and stop before calling the API
    pub dry_run: bool,
}

impl Config {
    /// Creates a new configuration builder.
    ///
    /// # Examples
    ///
    /// ```
    /// use llm_codegen::Config;
    ///
    /// let config = Config::builder()
    ///     .input_path("main.go")
    ///     .max_prompt_tokens(2_000)
    ///     .build()
    ///     .expect("valid configuration");
    /// ```
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Token limits or the timeout are zero
    /// - The instruction, model or credential variable name is empty
    /// - Input and output point at the same file
    /// - Temperature is outside `0.0..=2.0`
    pub fn validate(&self) -> Result<()> {
        if self.max_prompt_tokens == 0 {
            return Err(Error::config("max_prompt_tokens must be greater than 0"));
        }

        if self.max_completion_tokens == 0 {
            return Err(Error::config("max_completion_tokens must be greater than 0"));
        }

        if self.timeout.is_zero() {
            return Err(Error::config("timeout must be greater than 0"));
        }

        if self.instruction.is_empty() {
            return Err(Error::config("instruction must not be empty"));
        }

        if self.model.trim().is_empty() {
            return Err(Error::config("model must not be empty"));
        }

        if self.api_key_var.trim().is_empty() {
            return Err(Error::config("api_key_var must not be empty"));
        }

        if self.input_path == self.output_path {
            return Err(Error::config(format!(
                "input and output must be different files: {}",
                self.input_path.display()
            )));
        }

        if !(0.0..=MAX_TEMPERATURE).contains(&self.temperature) {
            return Err(Error::config(format!(
                "temperature ({}) must be between 0 and {MAX_TEMPERATURE}",
                self.temperature
            )));
        }

        Ok(())
    }

    /// Completions endpoint derived from `api_base`.
    #[must_use]
    pub fn completions_url(&self) -> String {
        format!("{}/completions", self.api_base.trim_end_matches('/'))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from(DEFAULT_INPUT_FILE),
            output_path: PathBuf::from(DEFAULT_OUTPUT_FILE),
            env_file: PathBuf::from(DEFAULT_ENV_FILE),
            api_key_var: DEFAULT_API_KEY_VAR.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            instruction: DEFAULT_INSTRUCTION.to_string(),
            max_prompt_tokens: DEFAULT_MAX_PROMPT_TOKENS,
            max_completion_tokens: DEFAULT_MAX_COMPLETION_TOKENS,
            temperature: 0.0,
            timeout: DEFAULT_TIMEOUT,
            tokenizer: TokenizerKind::default(),
            dry_run: false,
        }
    }
}

/// Builder for creating a [`Config`].
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    input_path: Option<PathBuf>,
    output_path: Option<PathBuf>,
    env_file: Option<PathBuf>,
    api_key_var: Option<String>,
    api_base: Option<String>,
    model: Option<String>,
    instruction: Option<String>,
    max_prompt_tokens: Option<usize>,
    max_completion_tokens: Option<usize>,
    temperature: Option<f32>,
    timeout: Option<Duration>,
    tokenizer: Option<TokenizerKind>,
    dry_run: bool,
}

impl ConfigBuilder {
    /// Sets the input file.
    #[must_use]
    pub fn input_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.input_path = Some(path.into());
        self
    }

    /// Sets the output file.
    #[must_use]
    pub fn output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    /// Sets the settings file loaded into the environment.
    #[must_use]
    pub fn env_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.env_file = Some(path.into());
        self
    }

    /// Sets the environment variable holding the API key.
    #[must_use]
    pub fn api_key_var(mut self, var: impl Into<String>) -> Self {
        self.api_key_var = Some(var.into());
        self
    }

    /// Sets the API base URL, e.g. `https://api.openai.com/v1`.
    #[must_use]
    pub fn api_base(mut self, url: impl Into<String>) -> Self {
        self.api_base = Some(url.into());
        self
    }

    /// Sets the completion model.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Replaces the built-in instruction.
    #[must_use]
    pub fn instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = Some(instruction.into());
        self
    }

    /// Sets the payload token limit.
    #[must_use]
    pub fn max_prompt_tokens(mut self, tokens: usize) -> Self {
        self.max_prompt_tokens = Some(tokens);
        self
    }

    /// Sets the completion token limit sent with the request.
    #[must_use]
    pub fn max_completion_tokens(mut self, tokens: usize) -> Self {
        self.max_completion_tokens = Some(tokens);
        self
    }

    /// Sets the sampling temperature.
    #[must_use]
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Sets the completion deadline.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the token encoding.
    #[must_use]
    pub fn tokenizer(mut self, kind: TokenizerKind) -> Self {
        self.tokenizer = Some(kind);
        self
    }

    /// Enables dry run mode (no API call, no output file).
    #[must_use]
    pub fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails.
    pub fn build(self) -> Result<Config> {
        let defaults = Config::default();
        let config = Config {
            input_path: self.input_path.unwrap_or(defaults.input_path),
            output_path: self.output_path.unwrap_or(defaults.output_path),
            env_file: self.env_file.unwrap_or(defaults.env_file),
            api_key_var: self.api_key_var.unwrap_or(defaults.api_key_var),
            api_base: self.api_base.unwrap_or(defaults.api_base),
            model: self.model.unwrap_or(defaults.model),
            instruction: self.instruction.unwrap_or(defaults.instruction),
            max_prompt_tokens: self.max_prompt_tokens.unwrap_or(defaults.max_prompt_tokens),
            max_completion_tokens: self
                .max_completion_tokens
                .unwrap_or(defaults.max_completion_tokens),
            temperature: self.temperature.unwrap_or(defaults.temperature),
            timeout: self.timeout.unwrap_or(defaults.timeout),
            tokenizer: self.tokenizer.unwrap_or(defaults.tokenizer),
            dry_run: self.dry_run,
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::builder().build().unwrap();

        assert_eq!(config.input_path, PathBuf::from("input_code.txt"));
        assert_eq!(config.output_path, PathBuf::from("output_code.txt"));
        assert_eq!(config.max_prompt_tokens, 3_500);
        assert_eq!(config.max_completion_tokens, 3_500);
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.temperature, 0.0);
        assert_eq!(config.api_key_var, "CHATGPT_API_KEY");
        assert!(config.instruction.starts_with("Given this code"));
        assert!(config.instruction.ends_with(":\n\n"));
    }

    #[test]
    fn test_zero_token_limit() {
        let result = Config::builder().max_prompt_tokens(0).build();
        assert!(result.unwrap_err().is_config());
    }

    #[test]
    fn test_zero_timeout() {
        let result = Config::builder().timeout(Duration::ZERO).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_instruction() {
        let result = Config::builder().instruction("").build();
        assert!(result.is_err());
    }

    #[test]
    fn test_same_input_and_output() {
        let result = Config::builder()
            .input_path("code.txt")
            .output_path("code.txt")
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_temperature_range() {
        assert!(Config::builder().temperature(-0.5).build().is_err());
        assert!(Config::builder().temperature(2.5).build().is_err());
        assert!(Config::builder().temperature(1.0).build().is_ok());
    }

    #[test]
    fn test_completions_url() {
        let config = Config::builder()
            .api_base("http://localhost:8080/v1/")
            .build()
            .unwrap();
        assert_eq!(config.completions_url(), "http://localhost:8080/v1/completions");
    }
}

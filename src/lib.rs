//! # llm-codegen
//!
//! Sends a source file, prefixed with an instruction, to an LLM completion API
//! and streams the answer into an output file.
//!
//! ## Quick Start
//!
//! ```no_run
//! use llm_codegen::Config;
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = Config::builder()
//!     .input_path("input_code.txt")
//!     .output_path("output_code.txt")
//!     .build()?;
//!
//! let report = llm_codegen::run(config)?;
//! println!("{} tokens sent", report.prompt_tokens);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! A run is a straight line; the first failure ends it:
//! 1. **Credentials**: reads the API key from the environment (seeded from `.env`)
//! 2. **Prompt**: reads the input file and prefixes the instruction
//! 3. **Tokenizer**: counts payload tokens and enforces the limit
//! 4. **Client**: streams one completion, writing each chunk as it arrives

#![warn(
    missing_docs,
    rust_2018_idioms,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery
)]
#![allow(clippy::module_name_repetitions)]

mod client;
mod config;
mod credentials;
mod error;
mod pipeline;
mod prompt;
mod sse;
mod stream;
mod token;

pub use client::{
    ChunkStream, Choice, CompletionChunk, CompletionClient, CompletionRequest, Deadline,
    OpenAiClient, decode_frame,
};
pub use config::{Config, ConfigBuilder, DEFAULT_INSTRUCTION};
pub use credentials::{ApiKey, load_api_key};
pub use error::{Error, Result};
pub use pipeline::{Pipeline, RunReport};
pub use prompt::{Payload, read_instruction, read_payload};
pub use sse::SseReader;
pub use stream::{StreamStats, write_stream};
pub use token::{TiktokenEstimator, TokenBudget, TokenEstimator, TokenizerKind};

/// Runs a complete code generation against the `OpenAI` API.
///
/// The API key is loaded before anything else, so a missing key fails
/// without touching the input file or the network.
///
/// # Errors
///
/// Returns an error if:
/// - The settings file is malformed or the API key is missing
/// - The input file cannot be read
/// - The payload exceeds the token limit
/// - The output file cannot be created or written
/// - The API call fails or times out
///
/// # Examples
///
/// ```no_run
/// use llm_codegen::{Config, run};
///
/// # fn main() -> anyhow::Result<()> {
/// run(Config::default())?;
/// # Ok(())
/// # }
/// ```
pub fn run(config: Config) -> Result<RunReport> {
    config.validate()?;
    let api_key = load_api_key(&config.env_file, &config.api_key_var)?;
    let client = OpenAiClient::new(&config, api_key)?;
    Pipeline::new(config, client)?.run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    #[test]
    fn test_missing_key_fails_before_reading_input() {
        let temp = assert_fs::TempDir::new().unwrap();

        let config = Config::builder()
            .input_path(temp.path().join("does_not_exist.txt"))
            .output_path(temp.path().join("output_code.txt"))
            .env_file(temp.path().join(".env"))
            .api_key_var("LLM_CODEGEN_TEST_RUN_NO_KEY_5E21")
            .api_base("http://127.0.0.1:9")
            .build()
            .unwrap();

        let err = run(config).unwrap_err();

        assert!(matches!(err, Error::MissingCredential { .. }));
        assert!(!temp.child("output_code.txt").exists());
    }

    #[test]
    fn test_run_end_to_end() {
        use httpmock::prelude::*;

        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("input_code.txt")
            .write_str("func Fetch(url string) error")
            .unwrap();
        temp.child(".env")
            .write_str("LLM_CODEGEN_TEST_RUN_KEY_A830=sk-e2e\n")
            .unwrap();

        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/v1/completions")
                .header("authorization", "Bearer sk-e2e")
                .json_body_partial(format!(
                    r#"{{"prompt": [{}]}}"#,
                    serde_json::to_string(&format!("{DEFAULT_INSTRUCTION}func Fetch(url string) error"))
                        .unwrap()
                ));
            then.status(200).body(concat!(
                "data: {\"choices\":[{\"text\":\"func Fetch(\",\"index\":0}]}\n\n",
                "data: {\"choices\":[{\"text\":\"ctx context.Context, \",\"index\":0}]}\n\n",
                "data: {\"choices\":[{\"text\":\"url string) error\",\"index\":0}]}\n\n",
                "data: [DONE]\n\n"
            ));
        });

        let config = Config::builder()
            .input_path(temp.path().join("input_code.txt"))
            .output_path(temp.path().join("output_code.txt"))
            .env_file(temp.path().join(".env"))
            .api_key_var("LLM_CODEGEN_TEST_RUN_KEY_A830")
            .api_base(server.url("/v1"))
            .build()
            .unwrap();

        let report = run(config).unwrap();

        mock.assert_hits(1);
        temp.child("output_code.txt")
            .assert("func Fetch(ctx context.Context, url string) error");
        assert_eq!(report.chunks_written, 3);
    }
}

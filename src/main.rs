use anyhow::Context;
use clap::Parser;
use llm_codegen::{Config, TokenizerKind};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "llm-codegen",
    version,
    author,
    about = "Send a source file to an LLM and stream the rewritten code to disk",
    long_about = "Send a source file to an LLM and stream the rewritten code to disk.\n\n\
    The input is prefixed with an instruction, checked against a token limit, and sent \
    as a single streaming completion request. Each streamed fragment is appended to \
    the output file as it arrives.\n\n\
    The API key is read from the environment (CHATGPT_API_KEY by default), which is \
    seeded from a .env file when one is present.\n\n\
    USAGE EXAMPLES:\n  \
      # Rewrite input_code.txt into output_code.txt\n  \
      llm-codegen\n\n  \
      # Check the token count without calling the API\n  \
      llm-codegen --input main.go --dry-run\n\n  \
      # Use a custom instruction and a longer deadline\n  \
      llm-codegen --instruction-file ./add-docs.txt --timeout 120"
)]
struct Cli {
    /// File containing the code to send
    #[arg(short, long, default_value = "input_code.txt", value_name = "FILE")]
    input: PathBuf,

    /// File receiving the completion (overwritten)
    #[arg(short, long, default_value = "output_code.txt", value_name = "FILE")]
    output: PathBuf,

    /// Settings file loaded into the environment if present
    #[arg(long, env = "LLM_CODEGEN_ENV_FILE", default_value = ".env", value_name = "FILE")]
    env_file: PathBuf,

    /// Environment variable holding the API key
    #[arg(long, env = "LLM_CODEGEN_API_KEY_VAR", default_value = "CHATGPT_API_KEY")]
    api_key_var: String,

    /// Maximum tokens allowed in the instruction plus input
    #[arg(long, default_value_t = 3_500)]
    max_tokens: usize,

    /// Deadline for the completion request, in seconds
    #[arg(long, default_value_t = 60, value_name = "SECONDS")]
    timeout: u64,

    /// Completion model
    #[arg(short, long, default_value = "text-davinci-003")]
    model: String,

    /// Base URL of the completion API
    #[arg(long, default_value = "https://api.openai.com/v1", value_name = "URL")]
    api_base: String,

    /// Encoding used to count tokens
    #[arg(long, value_enum, default_value = "cl100k")]
    tokenizer: CliTokenizer,

    /// Replace the built-in instruction with the contents of FILE
    ///
    /// The file is used byte-for-byte, so end it with blank lines if the
    /// code should be separated from the instruction.
    #[arg(long, value_name = "FILE")]
    instruction_file: Option<PathBuf>,

    /// Count tokens and stop before calling the API
    #[arg(long)]
    dry_run: bool,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliTokenizer {
    /// GPT-3.5/GPT-4 encoding
    #[value(name = "cl100k")]
    Cl100k,
    /// text-davinci-002/003 encoding
    #[value(name = "p50k")]
    P50k,
    /// Original GPT-3 encoding
    #[value(name = "r50k")]
    R50k,
    /// GPT-4o encoding
    #[value(name = "o200k")]
    O200k,
}

impl From<CliTokenizer> for TokenizerKind {
    fn from(t: CliTokenizer) -> Self {
        match t {
            CliTokenizer::Cl100k => Self::Cl100kBase,
            CliTokenizer::P50k => Self::P50kBase,
            CliTokenizer::R50k => Self::R50kBase,
            CliTokenizer::O200k => Self::O200kBase,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_tracing(cli.verbose);

    let mut builder = Config::builder()
        .input_path(cli.input)
        .output_path(cli.output)
        .env_file(cli.env_file)
        .api_key_var(cli.api_key_var)
        .max_prompt_tokens(cli.max_tokens)
        .timeout(Duration::from_secs(cli.timeout))
        .model(cli.model)
        .api_base(cli.api_base)
        .tokenizer(cli.tokenizer.into())
        .dry_run(cli.dry_run);

    if let Some(path) = cli.instruction_file {
        let instruction = llm_codegen::read_instruction(&path)
            .context("Failed to read instruction file")?;
        builder = builder.instruction(instruction);
    }

    let config = builder.build().context("Failed to build configuration")?;

    let report = llm_codegen::run(config).context("Code generation failed")?;

    match report.output_path {
        Some(path) => println!(
            "Code generation completed successfully. Output saved to {}",
            path.display()
        ),
        None => println!(
            "Dry run: payload has {} tokens (limit {}). No request sent.",
            report.prompt_tokens, report.token_limit
        ),
    }

    Ok(())
}

fn setup_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => EnvFilter::new("llm_codegen=info"),
        1 => EnvFilter::new("llm_codegen=debug"),
        _ => EnvFilter::new("llm_codegen=trace"),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

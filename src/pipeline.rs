use crate::{
    client::{CompletionClient, CompletionRequest, Deadline},
    config::Config,
    error::{Error, Result},
    prompt,
    stream::{self, StreamStats},
    token::TokenBudget,
};
use serde::Serialize;
use std::fs::File;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// Outcome of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Token count of the payload
    pub prompt_tokens: usize,

    /// Token limit the payload was checked against
    pub token_limit: usize,

    /// Streamed chunks written; zero on a dry run
    pub chunks_written: usize,

    /// Bytes written to the output file; zero on a dry run
    pub bytes_written: usize,

    /// Output file, `None` on a dry run
    pub output_path: Option<PathBuf>,

    /// Total execution time
    pub duration: Duration,
}

impl RunReport {
    /// Returns true if the API was not called.
    #[must_use]
    pub const fn is_dry_run(&self) -> bool {
        self.output_path.is_none()
    }
}

/// Runs read -> count -> check -> stream against a completion client.
pub struct Pipeline<C> {
    config: Config,
    client: C,
}

impl<C: CompletionClient> Pipeline<C> {
    /// Creates a pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration validation fails.
    pub fn new(config: Config, client: C) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, client })
    }

    /// Executes the run.
    ///
    /// # Process
    ///
    /// 1. **Read**: loads the input file and prefixes the instruction
    /// 2. **Count**: tokenizes the payload and enforces the token limit
    /// 3. **Stream**: creates the output file, sends one completion request
    ///    and writes each chunk as it arrives
    ///
    /// Nothing is sent if the payload is over the limit. A dry run stops after
    /// step 2.
    ///
    /// # Errors
    ///
    /// Returns the first error from any stage.
    #[instrument(skip(self), fields(input = %self.config.input_path.display()))]
    pub fn run(self) -> Result<RunReport> {
        let start_time = Instant::now();
        let budget = TokenBudget::new(self.config.max_prompt_tokens);

        // Stage 1: Reading
        let payload = prompt::read_payload(&self.config.input_path, &self.config.instruction)?;
        debug!("Payload is {} bytes", payload.as_str().len());

        // Stage 2: Counting
        let prompt_tokens = self.client.count_tokens(payload.as_str())?;
        info!(
            "Payload has {} tokens (limit {})",
            prompt_tokens,
            budget.limit()
        );
        budget.check(prompt_tokens)?;

        if self.config.dry_run {
            warn!("Dry run mode enabled - skipping completion request");
            return Ok(RunReport {
                prompt_tokens,
                token_limit: budget.limit(),
                chunks_written: 0,
                bytes_written: 0,
                output_path: None,
                duration: start_time.elapsed(),
            });
        }

        // Stage 3: Streaming
        let deadline = Deadline::after(self.config.timeout);
        let output_path = self.config.output_path.clone();
        let mut output =
            File::create(&output_path).map_err(|e| Error::io(&output_path, e))?;

        let request = CompletionRequest::new(&self.config, payload.into_string());
        let stats = self.stream_to(&request, deadline, &mut output)?;

        output.sync_all().map_err(|e| Error::io(&output_path, e))?;
        drop(output);

        let duration = start_time.elapsed();
        info!(
            "✓ Wrote {} bytes in {} chunks to {} in {:.2}s",
            stats.bytes,
            stats.chunks,
            output_path.display(),
            duration.as_secs_f64()
        );

        Ok(RunReport {
            prompt_tokens,
            token_limit: budget.limit(),
            chunks_written: stats.chunks,
            bytes_written: stats.bytes,
            output_path: Some(output_path),
            duration,
        })
    }

    /// Opens the completion stream and drains it into `output`.
    fn stream_to(
        &self,
        request: &CompletionRequest,
        deadline: Deadline,
        output: &mut File,
    ) -> Result<StreamStats> {
        let chunks = self.client.stream_completion(request, deadline)?;

        stream::write_stream(chunks, output, &self.config.output_path, deadline).inspect_err(
            |e| warn!("Completion stream aborted, request cancelled: {e}"),
        )
    }
}

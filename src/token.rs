use crate::error::{Error, Result};
use tiktoken_rs::CoreBPE;
use tracing::debug;

/// BPE encoding used to count tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenizerKind {
    /// `cl100k_base`, used by the GPT-3.5/GPT-4 family
    #[default]
    Cl100kBase,
    /// `p50k_base`, used by `text-davinci-002/003`
    P50kBase,
    /// `r50k_base`, used by the original GPT-3 models
    R50kBase,
    /// `o200k_base`, used by the GPT-4o family
    O200kBase,
}

impl TokenizerKind {
    /// Returns the encoding name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Cl100kBase => "cl100k_base",
            Self::P50kBase => "p50k_base",
            Self::R50kBase => "r50k_base",
            Self::O200kBase => "o200k_base",
        }
    }

    /// Loads a tokenizer for this encoding.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Tokenizer`] if the encoding tables fail to load.
    pub fn create(self) -> Result<TiktokenEstimator> {
        TiktokenEstimator::new(self)
    }
}

/// Counts the tokens a model would consume for a text.
pub trait TokenEstimator {
    /// Returns the number of tokens in `text`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Tokenizer`] if encoding fails.
    fn count(&self, text: &str) -> Result<usize>;
}

/// Token counter backed by `tiktoken-rs`.
///
/// The encoding is loaded once; counting reuses it.
pub struct TiktokenEstimator {
    kind: TokenizerKind,
    bpe: CoreBPE,
}

impl TiktokenEstimator {
    /// Loads the encoding for `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Tokenizer`] if the encoding tables fail to load.
    pub fn new(kind: TokenizerKind) -> Result<Self> {
        let bpe = match kind {
            TokenizerKind::Cl100kBase => tiktoken_rs::cl100k_base(),
            TokenizerKind::P50kBase => tiktoken_rs::p50k_base(),
            TokenizerKind::R50kBase => tiktoken_rs::r50k_base(),
            TokenizerKind::O200kBase => tiktoken_rs::o200k_base(),
        }
        .map_err(|e| Error::tokenizer(format!("failed to load {}: {e}", kind.name())))?;

        debug!("Loaded {} encoding", kind.name());
        Ok(Self { kind, bpe })
    }

    /// Returns the encoding in use.
    #[must_use]
    pub const fn kind(&self) -> TokenizerKind {
        self.kind
    }
}

impl std::fmt::Debug for TiktokenEstimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TiktokenEstimator")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl TokenEstimator for TiktokenEstimator {
    fn count(&self, text: &str) -> Result<usize> {
        Ok(self.bpe.encode_with_special_tokens(text).len())
    }
}

/// Upper bound on payload tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenBudget {
    limit: usize,
}

impl TokenBudget {
    /// Creates a budget of `limit` tokens.
    #[must_use]
    pub const fn new(limit: usize) -> Self {
        Self { limit }
    }

    /// Returns the limit.
    #[must_use]
    pub const fn limit(self) -> usize {
        self.limit
    }

    /// Accepts `count` if it does not exceed the limit.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TokenLimitExceeded`] with both counts otherwise.
    pub const fn check(self, count: usize) -> Result<()> {
        if count > self.limit {
            return Err(Error::TokenLimitExceeded {
                actual: count,
                limit: self.limit,
            });
        }
        Ok(())
    }
}

//! `!TOKEN!` command-script templates.
//!
//! A template is a SQL script containing placeholders of the form
//! `!TOKEN!`. Tokens are matched between exact `!` delimiters, so
//! `!SCHEMA!` never matches inside `!SCHEMA_EXT!`. Rendering is a pure
//! function over the text and a parameter map, and fails loudly when a
//! token has no value — a literal placeholder must never reach the store.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{ConfigError, TemplateError};
use crate::params::{ParamKey, ParamMap};

/// Uppercase token between `!` delimiters.
static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!([A-Z][A-Z0-9_]*)!").expect("token regex"));

/// A parsed command-script template.
#[derive(Debug, Clone)]
pub struct Template {
    text: String,
    tokens: BTreeSet<String>,
}

impl Template {
    /// Parse template text, recording the set of tokens it references.
    pub fn parse(text: impl Into<String>) -> Self {
        let text = text.into();
        let tokens = TOKEN_RE
            .captures_iter(&text)
            .map(|c| c[1].to_string())
            .collect();
        Self { text, tokens }
    }

    /// The distinct tokens referenced by this template.
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(String::as_str)
    }

    /// Check every token against the keys permitted for `operation`.
    ///
    /// Called once at repository load time so that a stray token is a
    /// configuration error rather than a render-time failure mid-batch.
    pub fn validate(&self, operation: &str, allowed: &[ParamKey]) -> Result<(), ConfigError> {
        for token in &self.tokens {
            let recognized = ParamKey::from_token(token)
                .map(|key| allowed.contains(&key))
                .unwrap_or(false);
            if !recognized {
                return Err(ConfigError::UnknownToken {
                    operation: operation.to_string(),
                    token: token.clone(),
                });
            }
        }
        Ok(())
    }

    /// Substitute every token with its parameter value.
    ///
    /// Substitution is textual and order-independent. A token absent from
    /// the map is an error; parameters without a matching token are fine.
    pub fn render(&self, params: &ParamMap) -> Result<String, TemplateError> {
        let mut out = String::with_capacity(self.text.len());
        let mut last = 0;
        for m in TOKEN_RE.find_iter(&self.text) {
            let token = m.as_str().trim_matches('!');
            let key = ParamKey::from_token(token)
                .ok_or_else(|| TemplateError::UnknownToken(token.to_string()))?;
            let value = params.require(key)?;

            out.push_str(&self.text[last..m.start()]);
            out.push_str(value);
            last = m.end();
        }
        out.push_str(&self.text[last..]);
        Ok(out)
    }
}

/// The command templates a repository's workers execute, keyed by
/// operation. Both operations are mandatory; the descriptor fails to load
/// without them.
#[derive(Debug, Clone)]
pub struct TemplateSet {
    preprocess: Template,
    postprocess: Template,
}

impl TemplateSet {
    /// Build a validated template set from raw script text.
    pub fn new(
        preprocess: impl Into<String>,
        postprocess: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let preprocess = Template::parse(preprocess);
        preprocess.validate("preprocess", crate::params::BATCH_KEYS)?;
        let postprocess = Template::parse(postprocess);
        postprocess.validate("postprocess", crate::params::IMAGE_KEYS)?;
        Ok(Self {
            preprocess,
            postprocess,
        })
    }

    /// Batch-level DDL executed once per store endpoint.
    pub fn preprocess(&self) -> &Template {
        &self.preprocess
    }

    /// Per-image transactional commit script.
    pub fn postprocess(&self) -> &Template {
        &self.postprocess
    }
}

//! `converge classify`: show which outcome kind a signal maps to.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use crate::cli::display::{colorize_outcome, format_ms, DetailView};
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::{Config, OutcomeKind, RawSignal};
use crate::domain::ports::{BackoffPolicy, OutcomeClassifier};
use crate::services::{SignalClassifier, StandardBackoff};

#[derive(Args, Debug)]
pub struct ClassifyArgs {
    /// Response text or body to classify
    pub text: Option<String>,

    /// HTTP status code that accompanied the text
    #[arg(short, long)]
    pub status: Option<u16>,
}

impl ClassifyArgs {
    fn signal(&self) -> RawSignal {
        match (self.status, &self.text) {
            (Some(code), text) => RawSignal::status(code, text.clone().unwrap_or_default()),
            (None, Some(text)) => RawSignal::text(text.clone()),
            (None, None) => RawSignal::None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ClassifyOutput {
    pub signal: String,
    pub kind: OutcomeKind,
    pub consumes_budget: bool,
    /// Wait the controller would apply after this outcome on the first attempt.
    pub wait_ms: u64,
}

impl CommandOutput for ClassifyOutput {
    fn to_human(&self) -> String {
        DetailView::new("Classification")
            .field("signal", &self.signal)
            .field("outcome", colorize_outcome(self.kind))
            .field("consumes budget", self.consumes_budget)
            .field("next wait", format_ms(self.wait_ms))
            .render()
    }
}

pub fn classify(args: &ClassifyArgs, config: &Config) -> Result<ClassifyOutput> {
    let classifier = SignalClassifier::from_config(&config.classifier)
        .context("Failed to compile classifier patterns")?;
    let backoff = StandardBackoff::new(config.backoff.clone());

    let signal = args.signal();
    let kind = classifier.classify(&signal);
    let wait = backoff.compute_wait(kind, u32::from(kind.consumes_budget()));

    Ok(ClassifyOutput {
        signal: signal.summary(),
        kind,
        consumes_budget: kind.consumes_budget(),
        wait_ms: u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
    })
}

#[allow(clippy::unused_async)]
pub async fn execute(args: ClassifyArgs, config: Config, json_mode: bool) -> Result<()> {
    let result = classify(&args, &config)?;
    output(&result, json_mode);
    Ok(())
}

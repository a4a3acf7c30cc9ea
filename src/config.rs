use anyhow::Context;
use std::{env, path::PathBuf};

pub const DEFAULT_BANK: &str = "final.json";

/// Environment-sourced settings, resolved once at startup.
pub struct Config {
    /// Bot token used for both the gateway and the REST client.
    pub token: String,
    /// Path to the question bank file.
    pub bank: PathBuf,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let token = env::var("DISCORD_TOKEN").context("environment variable `DISCORD_TOKEN` is not set")?;
        let bank = env::var("QUESTION_BANK").map_or_else(|_| PathBuf::from(DEFAULT_BANK), PathBuf::from);
        Ok(Self { token, bank })
    }
}

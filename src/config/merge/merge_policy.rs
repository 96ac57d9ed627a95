//! Merge rules: defaults first, later sources override earlier ones key by key.

use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("provider.provider_type", "groq")?
        .set_default("generation.max_attempts", 3_i64)?
        .set_default("generation.pacing_ms", 300_i64)?
        .set_default("generation.enhance", true)?
        .set_default("logging.output", "stderr")
}

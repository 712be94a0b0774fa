//! Environment source: `WAYPOST_<SECTION>__<KEY>` overrides.

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::ConfigError;
use config::Environment;
use config::Map;

pub const ENV_PREFIX: &str = "WAYPOST";

/// Add environment overrides. `vars` replaces the process environment when
/// given.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
    vars: Option<Map<String, String>>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Ok(builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
            .source(vars),
    ))
}

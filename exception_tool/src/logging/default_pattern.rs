//! Defines a `"default"` [`PatternEncoder`].
//!
//! Console and file appenders share this pattern, so it is only spelled out
//! here.

use log4rs::config::Deserialize;
use log4rs::encode::Encode;
use log4rs::encode::pattern::PatternEncoder;

fn default_true() -> bool {
    true
}

#[derive(Debug, serde::Deserialize)]
pub struct DefaultPatternConfig {
    /// Prefix each line with the UTC time.
    #[serde(default = "default_true")]
    time: bool,
    /// Include the log target, usually the module path.
    #[serde(default)]
    target: bool,
}

pub struct DefaultPatternDeserializer;

impl Deserialize for DefaultPatternDeserializer {
    type Trait = dyn Encode;
    type Config = DefaultPatternConfig;

    fn deserialize(
        &self,
        config: Self::Config,
        _deserializers: &log4rs::config::Deserializers,
    ) -> anyhow::Result<Box<Self::Trait>> {
        Ok(Box::new(PatternEncoder::new(pattern(&config))))
    }
}

fn pattern(config: &DefaultPatternConfig) -> &'static str {
    match (config.time, config.target) {
        (true, true) => "[{d(%Y-%m-%d %H:%M:%S)(utc)} {h({l:<5})} {t}] {m}{n}",
        (true, false) => "[{d(%Y-%m-%d %H:%M:%S)(utc)} {h({l:<5})}] {m}{n}",
        (false, true) => "[{h({l:<5})} {t}] {m}{n}",
        (false, false) => "[{h({l:<5})}] {m}{n}",
    }
}

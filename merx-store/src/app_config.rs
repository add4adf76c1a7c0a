use rust_decimal::Decimal;
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    /// Without brokers, integration events are only logged.
    #[serde(default)]
    pub kafka: Option<KafkaConfig>,
    #[serde(default)]
    pub ledger: LedgerRules,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct LedgerRules {
    /// Read as a decimal so `0.1` stays exactly one tenth.
    #[serde(default = "default_tax_rate")]
    pub tax_rate: Decimal,
    #[serde(default = "default_currency")]
    pub currency: String,
}

impl Default for LedgerRules {
    fn default() -> Self {
        Self {
            tax_rate: default_tax_rate(),
            currency: default_currency(),
        }
    }
}

fn default_tax_rate() -> Decimal { Decimal::new(8, 2) }

fn default_currency() -> String { merx_shared::DEFAULT_CURRENCY.to_string() }

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 { 5 }

#[derive(Debug, Deserialize, Clone)]
pub struct KafkaConfig {
    pub brokers: String,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // per-environment overrides are optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // never checked in
            .add_source(config::File::with_name("config/local").required(false))
            // e.g. `MERX__DATABASE__URL=postgres://...`
            .add_source(config::Environment::with_prefix("MERX").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;
    use rust_decimal_macros::dec;

    fn parse(toml: &str) -> Config {
        config::Config::builder()
            .add_source(config::File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_defaults_applied() {
        let config = parse(
            r#"
            [server]
            port = 8080

            [database]
            url = "postgres://localhost/merx"
            "#,
        );

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.max_connections, 5);
        assert!(config.kafka.is_none());
        assert_eq!(config.ledger, LedgerRules::default());
        assert_eq!(config.ledger.tax_rate, dec!(0.08));
        assert_eq!(config.ledger.currency, "USD");
    }

    #[test]
    fn test_overrides() {
        let config = parse(
            r#"
            [server]
            port = 9000

            [database]
            url = "postgres://db/merx"
            max_connections = 20

            [kafka]
            brokers = "kafka:9092"

            [ledger]
            tax_rate = 0.1
            currency = "EUR"
            "#,
        );

        assert_eq!(config.database.max_connections, 20);
        assert_eq!(config.kafka.unwrap().brokers, "kafka:9092");
        assert_eq!(config.ledger.tax_rate, dec!(0.1));
        assert_eq!(config.ledger.currency, "EUR");
    }

    #[test]
    fn test_tax_rate_is_exact() {
        let config = parse(
            r#"
            [server]
            port = 8080

            [database]
            url = "postgres://localhost/merx"

            [ledger]
            tax_rate = "0.0725"
            "#,
        );

        assert_eq!(config.ledger.tax_rate, dec!(0.0725));
        assert_eq!(dec!(100) * config.ledger.tax_rate, dec!(7.25));
    }
}

use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};
use serde_json::Value;

use crate::app_config::LedgerRules;

#[derive(Clone)]
pub struct DbClient {
    pub pool: Pool<Postgres>,
}

impl DbClient {
    pub async fn new(connection_string: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(connection_string)
            .await?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations...");
        sqlx::migrate!("../migrations")
            .run(&self.pool)
            .await?;
        info!("Migrations completed successfully.");
        Ok(())
    }

    /// Let rows of `ledger_rules` override the configured defaults.
    pub async fn fetch_ledger_rules(&self, defaults: LedgerRules) -> Result<LedgerRules, sqlx::Error> {
        let rows: Vec<(String, Value)> = sqlx::query_as("SELECT rule_key, rule_value FROM ledger_rules")
            .fetch_all(&self.pool)
            .await?;

        Ok(apply_rule_rows(defaults, rows))
    }
}

/// Rows are `{"value": <number|string>}`; unknown keys and mistyped values are ignored.
fn apply_rule_rows(defaults: LedgerRules, rows: Vec<(String, Value)>) -> LedgerRules {
    let mut rules = defaults;

    for (key, value) in rows {
        let Some(v) = value.get("value") else {
            warn!("ledger rule {} has no value", key);
            continue;
        };

        match key.as_str() {
            "tax_rate" => {
                match rate_from(v) {
                    Some(rate) => rules.tax_rate = rate,
                    None => warn!("ledger rule tax_rate is not a decimal: {}", v),
                }
            }
            "currency" => {
                if let Some(s) = v.as_str() {
                    rules.currency = s.to_string();
                }
            }
            _ => {}
        }
    }

    rules
}

/// JSON numbers go through their text form so no binary float rounding sneaks in.
fn rate_from(v: &Value) -> Option<Decimal> {
    match v {
        Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_rule_rows_override_defaults() {
        let rules = apply_rule_rows(
            LedgerRules::default(),
            vec![
                ("tax_rate".to_string(), json!({"value": 0.065})),
                ("currency".to_string(), json!({"value": "CAD"})),
                ("unknown".to_string(), json!({"value": 1})),
            ],
        );

        assert_eq!(rules.tax_rate, dec!(0.065));
        assert_eq!(rules.currency, "CAD");
    }

    #[test]
    fn test_malformed_rows_ignored() {
        let rules = apply_rule_rows(
            LedgerRules::default(),
            vec![
                ("tax_rate".to_string(), json!({"value": "high"})),
                ("currency".to_string(), json!({"amount": "CAD"})),
            ],
        );

        assert_eq!(rules, LedgerRules::default());
    }

    #[test]
    fn test_tax_rate_rows_keep_exact_digits() {
        let rules = apply_rule_rows(
            LedgerRules::default(),
            vec![("tax_rate".to_string(), json!({"value": 0.1}))],
        );
        assert_eq!(rules.tax_rate, dec!(0.1));

        let rules = apply_rule_rows(
            LedgerRules::default(),
            vec![("tax_rate".to_string(), json!({"value": "0.0725"}))],
        );
        assert_eq!(rules.tax_rate, dec!(0.0725));
    }
}

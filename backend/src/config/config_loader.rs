use anyhow::{Context, Result};
use tourops_core::payments::payhere::{
    DEFAULT_CURRENCY, DEFAULT_ORDER_PREFIX, PayHereSettings, SANDBOX_CHECKOUT_URL,
};
use url::Url;

use super::{
    config_model::{AdminAuth, BackendServer, Database, DotEnvyConfig},
    stage::Stage,
};

/// Reads the process environment. `.env` is loaded once by the binary before this runs.
pub fn load() -> Result<DotEnvyConfig> {
    load_from(|key| std::env::var(key).ok())
}

pub fn load_from<F>(lookup: F) -> Result<DotEnvyConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let required = |key: &str| -> Result<String> {
        lookup(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .with_context(|| format!("{key} is invalid"))
    };
    let optional = |key: &str, default: &str| -> String {
        lookup(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| default.to_string())
    };
    let parse_url = |key: &str, raw: &str| -> Result<Url> {
        Url::parse(raw).with_context(|| format!("{key} is not a valid URL"))
    };

    let backend_server = BackendServer {
        port: required("SERVER_PORT")?
            .parse()
            .context("SERVER_PORT is invalid")?,
        body_limit: required("SERVER_BODY_LIMIT")?
            .parse()
            .context("SERVER_BODY_LIMIT is invalid")?,
        timeout: required("SERVER_TIMEOUT")?
            .parse()
            .context("SERVER_TIMEOUT is invalid")?,
    };

    let database = Database {
        url: required("DATABASE_URL")?,
        max_connections: optional("DATABASE_MAX_CONNECTIONS", "10")
            .parse()
            .context("DATABASE_MAX_CONNECTIONS is invalid")?,
    };

    let public_base_url = parse_url("PUBLIC_BASE_URL", &required("PUBLIC_BASE_URL")?)?;
    let api_base_url = match lookup("API_BASE_URL").filter(|value| !value.trim().is_empty()) {
        Some(raw) => parse_url("API_BASE_URL", raw.trim())?,
        None => public_base_url.clone(),
    };

    let payhere = PayHereSettings {
        merchant_id: required("PAYHERE_MERCHANT_ID")?,
        merchant_secret: required("PAYHERE_MERCHANT_SECRET")?,
        checkout_url: parse_url(
            "PAYHERE_CHECKOUT_URL",
            &optional("PAYHERE_CHECKOUT_URL", SANDBOX_CHECKOUT_URL),
        )?,
        currency: optional("PAYHERE_CURRENCY", DEFAULT_CURRENCY),
        order_prefix: optional("PAYHERE_ORDER_PREFIX", DEFAULT_ORDER_PREFIX),
        public_base_url,
        api_base_url,
    };

    let admin_auth = AdminAuth {
        jwt_secret: required("ADMIN_JWT_SECRET")?,
    };

    let stage = Stage::try_from(optional("STAGE", "local").as_str())?;

    Ok(DotEnvyConfig {
        backend_server,
        database,
        payhere,
        admin_auth,
        stage,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("SERVER_PORT", "8080"),
            ("SERVER_BODY_LIMIT", "10"),
            ("SERVER_TIMEOUT", "30"),
            ("DATABASE_URL", "postgres://localhost:5432/tourops"),
            ("PAYHERE_MERCHANT_ID", "1211149"),
            ("PAYHERE_MERCHANT_SECRET", "MERCHANT_SECRET_TEST"),
            ("PUBLIC_BASE_URL", "https://tours.example.lk"),
            ("ADMIN_JWT_SECRET", "supersecretjwtsecretforunittesting123"),
        ])
    }

    fn load_with(env: &HashMap<&'static str, &'static str>) -> Result<DotEnvyConfig> {
        load_from(|key| env.get(key).map(|value| value.to_string()))
    }

    #[test]
    fn applies_payhere_defaults() {
        let config = load_with(&base_env()).unwrap();

        assert_eq!(config.backend_server.port, 8080);
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.payhere.currency, "LKR");
        assert_eq!(config.payhere.order_prefix, "TO");
        assert_eq!(config.payhere.checkout_url.as_str(), SANDBOX_CHECKOUT_URL);
        assert_eq!(config.payhere.api_base_url, config.payhere.public_base_url);
        assert_eq!(config.stage, Stage::Local);
    }

    #[test]
    fn reads_overrides() {
        let mut env = base_env();
        env.insert("API_BASE_URL", "https://api.tours.example.lk");
        env.insert("PAYHERE_CHECKOUT_URL", "https://www.payhere.lk/pay/checkout");
        env.insert("STAGE", "production");
        env.insert("DATABASE_MAX_CONNECTIONS", "4");

        let config = load_with(&env).unwrap();

        assert_eq!(config.payhere.api_base_url.as_str(), "https://api.tours.example.lk/");
        assert_eq!(
            config.payhere.checkout_url.as_str(),
            "https://www.payhere.lk/pay/checkout"
        );
        assert_eq!(config.stage, Stage::Production);
        assert_eq!(config.database.max_connections, 4);
    }

    #[test]
    fn missing_secret_names_the_variable() {
        let mut env = base_env();
        env.remove("PAYHERE_MERCHANT_SECRET");

        let err = load_with(&env).unwrap_err();

        assert!(err.to_string().contains("PAYHERE_MERCHANT_SECRET"));
    }

    #[test]
    fn rejects_bad_port_and_stage() {
        let mut env = base_env();
        env.insert("SERVER_PORT", "eighty");
        assert!(load_with(&env).is_err());

        let mut env = base_env();
        env.insert("STAGE", "qa");
        assert!(load_with(&env).is_err());
    }
}

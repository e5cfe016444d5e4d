use super::parsing::{
    env_optional, env_or_default, parse_bool, parse_cors_origins, parse_environment,
    parse_positive_u64, parse_store_backend, parse_u16, parse_u64,
};
use super::types::{
    ApiSettings, ConfigError, CorsSettings, ExamApiSettings, RedisSettings, RuntimeSettings,
    ServerHost, ServerPort, ServerSettings, SessionSettings, Settings, StoreBackend,
    StoreSettings, TelemetrySettings,
};

const DEFAULT_EXAM_API_URL: &str = "http://localhost:8000";

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let host = env_or_default("PROCTOR_HOST", "0.0.0.0");
        let port = env_or_default("PROCTOR_PORT", "8100");

        let environment = parse_environment(
            env_optional("PROCTOR_ENV").or_else(|| env_optional("ENVIRONMENT")),
        );
        let strict_config =
            env_optional("PROCTOR_STRICT_CONFIG").map(|value| parse_bool(&value)).unwrap_or(false)
                || environment.is_production();

        let project_name = env_or_default("PROJECT_NAME", "Proctor Session API");
        let version = env_or_default("VERSION", env!("CARGO_PKG_VERSION"));
        let api_v1_str = env_or_default("API_V1_STR", "/api/v1");

        let cors_origins = parse_cors_origins(env_optional("BACKEND_CORS_ORIGINS"))?;

        let exam_api_url = env_or_default("EXAM_API_URL", DEFAULT_EXAM_API_URL);
        let exam_api_timeout = parse_positive_u64(
            "EXAM_API_TIMEOUT_SECONDS",
            env_or_default("EXAM_API_TIMEOUT_SECONDS", "30"),
        )?;

        let store_backend = parse_store_backend(env_optional("PROCTOR_STORE"))?;
        let state_ttl_seconds = parse_u64(
            "PROCTOR_STATE_TTL_SECONDS",
            env_or_default("PROCTOR_STATE_TTL_SECONDS", "86400"),
        )?;

        let redis_host = env_or_default("REDIS_HOST", "localhost");
        let redis_port = parse_u16("REDIS_PORT", env_or_default("REDIS_PORT", "6379"))?;
        let redis_db = parse_u16("REDIS_DB", env_or_default("REDIS_DB", "0"))?;
        let redis_password = env_or_default("REDIS_PASSWORD", "");

        let tick_interval_ms =
            parse_positive_u64("TICK_INTERVAL_MS", env_or_default("TICK_INTERVAL_MS", "1000"))?;
        let violation_debounce_ms = parse_u64(
            "VIOLATION_DEBOUNCE_MS",
            env_or_default("VIOLATION_DEBOUNCE_MS", "100"),
        )?;
        let visibility_grace_ms =
            parse_u64("VISIBILITY_GRACE_MS", env_or_default("VISIBILITY_GRACE_MS", "500"))?;

        let log_level = env_or_default("PROCTOR_LOG_LEVEL", "info");
        let json = env_optional("PROCTOR_LOG_JSON").map(|value| parse_bool(&value)).unwrap_or(false);
        let prometheus_enabled =
            env_optional("PROMETHEUS_ENABLED").map(|value| parse_bool(&value)).unwrap_or(false);

        let settings = Self {
            server: ServerSettings {
                host: ServerHost::parse(host)?,
                port: ServerPort::parse(port)?,
            },
            runtime: RuntimeSettings { environment, strict_config },
            api: ApiSettings { project_name, version, api_v1_str },
            cors: CorsSettings { origins: cors_origins },
            exam_api: ExamApiSettings {
                base_url: exam_api_url.trim_end_matches('/').to_string(),
                request_timeout_seconds: exam_api_timeout,
            },
            store: StoreSettings { backend: store_backend, state_ttl_seconds },
            redis: RedisSettings {
                host: redis_host,
                port: redis_port,
                db: redis_db,
                password: redis_password,
            },
            session: SessionSettings { tick_interval_ms, violation_debounce_ms, visibility_grace_ms },
            telemetry: TelemetrySettings { log_level, json, prometheus_enabled },
        };

        settings.validate()?;

        Ok(settings)
    }

    pub(crate) fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host.0, self.server.port.0)
    }

    pub(crate) fn server_host(&self) -> &str {
        &self.server.host.0
    }

    pub(crate) fn server_port(&self) -> u16 {
        self.server.port.0
    }

    pub(crate) fn api(&self) -> &ApiSettings {
        &self.api
    }

    pub(crate) fn cors(&self) -> &CorsSettings {
        &self.cors
    }

    pub(crate) fn exam_api(&self) -> &ExamApiSettings {
        &self.exam_api
    }

    pub(crate) fn store(&self) -> &StoreSettings {
        &self.store
    }

    pub(crate) fn redis(&self) -> &RedisSettings {
        &self.redis
    }

    pub(crate) fn session(&self) -> &SessionSettings {
        &self.session
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !self.exam_api.base_url.starts_with("http://")
            && !self.exam_api.base_url.starts_with("https://")
        {
            return Err(ConfigError::InvalidValue {
                field: "EXAM_API_URL",
                value: self.exam_api.base_url.clone(),
            });
        }

        if !self.runtime.strict_config {
            return Ok(());
        }

        if env_optional("EXAM_API_URL").is_none() {
            return Err(ConfigError::MissingSetting("EXAM_API_URL"));
        }

        if self.store.backend != StoreBackend::Redis {
            return Err(ConfigError::InvalidValue {
                field: "PROCTOR_STORE",
                value: self.store.backend.as_str().to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;

    #[tokio::test]
    async fn load_uses_defaults_in_test_env() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();

        let settings = Settings::load().expect("settings");
        assert_eq!(settings.store().backend, StoreBackend::Memory);
        assert_eq!(settings.session().tick_interval_ms, 1000);
        assert_eq!(settings.session().violation_debounce_ms, 100);
        assert_eq!(settings.api().api_v1_str, "/api/v1");
        assert_eq!(settings.exam_api().base_url, "http://exam-api.test");
    }

    #[tokio::test]
    async fn strict_config_requires_redis_store() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        std::env::set_var("PROCTOR_STRICT_CONFIG", "1");

        let result = Settings::load();
        std::env::set_var("PROCTOR_STRICT_CONFIG", "0");

        assert!(matches!(result, Err(ConfigError::InvalidValue { field: "PROCTOR_STORE", .. })));
    }

    #[tokio::test]
    async fn rejects_non_http_exam_api_url() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        std::env::set_var("EXAM_API_URL", "ftp://exam");

        let result = Settings::load();
        test_support::set_test_env();

        assert!(matches!(result, Err(ConfigError::InvalidValue { field: "EXAM_API_URL", .. })));
    }
}

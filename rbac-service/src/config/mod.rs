use secrecy::Secret;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

#[derive(Debug, Clone)]
pub struct RbacConfig {
    pub common: core_config::Config,
    pub mongodb: MongoConfig,
    pub identity: IdentityConfig,
    pub http: HttpConfig,
}

#[derive(Debug, Clone)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
}

/// Settings for the external identity provider: token verification material
/// and the management API used to send invitations. The superadmin subject id
/// is configuration, never data; see `middleware::auth`.
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    pub issuer: String,
    pub public_key_path: String,
    pub superadmin_subject: String,
    pub api_base_url: String,
    pub api_key: Secret<String>,
}

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub cors_origin: String,
}

impl RbacConfig {
    pub fn load() -> Result<Self, AppError> {
        // Common config handles .env and the APP__ prefix.
        let common = core_config::Config::load()?;

        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";

        Ok(RbacConfig {
            common,
            mongodb: MongoConfig {
                uri: get_env("MONGODB_URI", Some("mongodb://localhost:27017"), is_prod)?,
                database: get_env("MONGODB_DATABASE", Some("rbac_db"), is_prod)?,
            },
            identity: IdentityConfig {
                issuer: get_env("IDENTITY_ISSUER", Some("http://localhost:8081"), is_prod)?,
                public_key_path: get_env(
                    "IDENTITY_PUBLIC_KEY_PATH",
                    Some("keys/identity_public.pem"),
                    is_prod,
                )?,
                superadmin_subject: get_env(
                    "SUPERADMIN_SUBJECT",
                    Some("user_superadmin_dev"),
                    is_prod,
                )?,
                api_base_url: get_env(
                    "IDENTITY_API_URL",
                    Some("http://localhost:8081/v1"),
                    is_prod,
                )?,
                api_key: Secret::new(get_env("IDENTITY_API_KEY", Some(""), is_prod)?),
            },
            http: HttpConfig {
                cors_origin: get_env(
                    "CORS_ALLOWED_ORIGIN",
                    Some("http://localhost:5173"),
                    is_prod,
                )?,
            },
        })
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required in production but not set",
                    key
                ))))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required but not set",
                    key
                ))))
            }
        }
    }
}

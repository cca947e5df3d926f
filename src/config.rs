use std::env;

/// How outgoing email leaves the process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailTransport {
    /// Deliver through an SMTP relay
    Smtp,
    /// Write messages to the log instead of sending them (local development)
    Log,
}

/// Outgoing email settings
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub transport: MailTransport,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub from_address: String,
}

impl MailConfig {
    /// Check that the selected transport has everything it needs.
    ///
    /// Called at startup so a misconfigured relay stops the server instead of
    /// failing on the first signup.
    pub fn validate(&self) -> Result<(), String> {
        if self.transport == MailTransport::Smtp {
            let mut missing = Vec::new();
            if self.smtp_username.as_deref().map_or(true, str::is_empty) {
                missing.push("SMTP_USERNAME");
            }
            if self.smtp_password.as_deref().map_or(true, str::is_empty) {
                missing.push("SMTP_PASSWORD");
            }
            if !missing.is_empty() {
                return Err(format!(
                    "Email service is not configured. Missing environment variables: {}",
                    missing.join(", ")
                ));
            }
        }

        if self.from_address.trim().is_empty() {
            return Err("MAIL_FROM must not be empty".to_string());
        }

        Ok(())
    }
}

/// Argon2 cost parameters for password hashing
#[derive(Debug, Clone, Copy)]
pub struct PasswordHashingConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for PasswordHashingConfig {
    fn default() -> Self {
        Self {
            memory_kib: 19 * 1024,
            iterations: 2,
            parallelism: 1,
        }
    }
}

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub database_path: String,
    pub allowed_origins: Vec<String>,
    pub environment: String,
    pub otp_secret: String,
    pub mail: MailConfig,
    pub password_hashing: PasswordHashingConfig,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        // Load .env file if it exists (development)
        dotenvy::dotenv().ok();

        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|_| "Invalid SERVER_PORT")?;

        let database_path =
            env::var("DATABASE_PATH").unwrap_or_else(|_| "./data/homeconnect.db".to_string());

        let allowed_origins = env::var("ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let otp_secret = env::var("OTP_SECRET")
            .map_err(|_| "OTP_SECRET must be set for passcode hashing")?;
        if otp_secret.is_empty() {
            return Err("OTP_SECRET must not be empty".to_string());
        }

        let transport = match env::var("MAIL_TRANSPORT")
            .unwrap_or_else(|_| "smtp".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "smtp" => MailTransport::Smtp,
            "log" => MailTransport::Log,
            other => return Err(format!("Invalid MAIL_TRANSPORT: {}", other)),
        };

        let smtp_host = env::var("SMTP_HOST").unwrap_or_else(|_| "smtp.gmail.com".to_string());
        let smtp_port = env::var("SMTP_PORT")
            .unwrap_or_else(|_| "587".to_string())
            .parse()
            .map_err(|_| "Invalid SMTP_PORT")?;
        let smtp_username = env::var("SMTP_USERNAME").ok();
        let smtp_password = env::var("SMTP_PASSWORD").ok();

        let from_address = env::var("MAIL_FROM")
            .ok()
            .or_else(|| smtp_username.clone())
            .unwrap_or_else(|| "HomeConnect <no-reply@homeconnect.com>".to_string());

        let mail = MailConfig {
            transport,
            smtp_host,
            smtp_port,
            smtp_username,
            smtp_password,
            from_address,
        };
        mail.validate()?;

        let defaults = PasswordHashingConfig::default();
        let password_hashing = PasswordHashingConfig {
            memory_kib: parse_or("ARGON2_MEMORY_KIB", defaults.memory_kib)?,
            iterations: parse_or("ARGON2_ITERATIONS", defaults.iterations)?,
            parallelism: parse_or("ARGON2_PARALLELISM", defaults.parallelism)?,
        };

        Ok(Config {
            server_host,
            server_port,
            database_path,
            allowed_origins,
            environment,
            otp_secret,
            mail,
            password_hashing,
        })
    }

    /// Get server address as string
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

fn parse_or(key: &str, default: u32) -> Result<u32, String> {
    match env::var(key) {
        Ok(value) => value.parse().map_err(|_| format!("Invalid {}", key)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn smtp_config() -> MailConfig {
        MailConfig {
            transport: MailTransport::Smtp,
            smtp_host: "smtp.example.com".to_string(),
            smtp_port: 587,
            smtp_username: Some("mailer@example.com".to_string()),
            smtp_password: Some("app-password".to_string()),
            from_address: "HomeConnect <no-reply@example.com>".to_string(),
        }
    }

    #[test]
    fn test_smtp_config_valid() {
        assert!(smtp_config().validate().is_ok());
    }

    #[test]
    fn test_smtp_config_missing_credentials() {
        let mut config = smtp_config();
        config.smtp_username = None;
        config.smtp_password = Some(String::new());

        let err = config.validate().unwrap_err();
        assert!(err.contains("SMTP_USERNAME"));
        assert!(err.contains("SMTP_PASSWORD"));
    }

    #[test]
    fn test_log_transport_needs_no_credentials() {
        let mut config = smtp_config();
        config.transport = MailTransport::Log;
        config.smtp_username = None;
        config.smtp_password = None;

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_from_address_rejected() {
        let mut config = smtp_config();
        config.from_address = "  ".to_string();

        assert!(config.validate().is_err());
    }
}

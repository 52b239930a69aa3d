use serde::{Deserialize, Serialize};
use sqlx::mysql::{MySqlConnectOptions, MySqlSslMode};

fn default_mysql_port() -> u16 {
    3306
}

/// TLS setting as stored with the credentials: either a boolean or a token such as `"disable"`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TlsFlag {
    Bool(bool),
    Token(String),
}

/// Stored credentials for an external MySQL data source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalCredentials {
    pub host: String,
    #[serde(default = "default_mysql_port")]
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    #[serde(default)]
    pub ssl: Option<TlsFlag>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TlsPolicy {
    /// Plaintext connection
    Disabled,
    /// Secure transport when the server offers it, certificates are not verified
    Opportunistic,
    /// TLS required, certificate and host name verified
    VerifyFull,
}

impl TlsPolicy {
    pub fn from_flag(flag: Option<&TlsFlag>) -> Self {
        match flag {
            None => TlsPolicy::Disabled,
            Some(TlsFlag::Token(token)) if token == "disable" => TlsPolicy::Disabled,
            Some(TlsFlag::Bool(true)) => TlsPolicy::VerifyFull,
            // Any other present value, including `false` and `""`, still turns TLS on
            Some(TlsFlag::Bool(false)) | Some(TlsFlag::Token(_)) => TlsPolicy::Opportunistic,
        }
    }

    fn ssl_mode(self) -> MySqlSslMode {
        match self {
            TlsPolicy::Disabled => MySqlSslMode::Disabled,
            TlsPolicy::Opportunistic => MySqlSslMode::Preferred,
            TlsPolicy::VerifyFull => MySqlSslMode::VerifyIdentity,
        }
    }
}

/// Connection descriptor handed to the external pool. Opening it is the pool's job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalConnection {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
    pub tls: TlsPolicy,
}

impl ExternalConnection {
    pub fn connect_options(&self) -> MySqlConnectOptions {
        MySqlConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.username)
            .password(&self.password)
            .database(&self.database)
            .ssl_mode(self.tls.ssl_mode())
    }
}

pub fn build_external_connection(credentials: &ExternalCredentials) -> ExternalConnection {
    ExternalConnection {
        host: credentials.host.clone(),
        port: credentials.port,
        username: credentials.user.clone(),
        password: credentials.password.clone(),
        database: credentials.database.clone(),
        tls: TlsPolicy::from_flag(credentials.ssl.as_ref()),
    }
}

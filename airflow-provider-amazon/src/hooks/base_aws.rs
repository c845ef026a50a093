use std::env;

use airflow_common::utils::SecretString;
use serde::Deserialize;

/// The connection id used when none is given.
pub static DEFAULT_CONN_ID: &str = "aws_default";

#[derive(thiserror::Error, Debug)]
pub enum AwsConnectionError {
    #[error("Invalid connection {0}: {1}")]
    InvalidJson(String, serde_json::Error),
}

/// Static AWS credentials.
#[derive(Debug, Clone, PartialEq)]
pub struct AwsCredentials {
    access_key_id: String,
    secret_access_key: SecretString,
    session_token: Option<SecretString>,
}

impl AwsCredentials {
    pub fn new(access_key_id: &str, secret_access_key: &str) -> Self {
        AwsCredentials {
            access_key_id: access_key_id.to_string(),
            secret_access_key: SecretString::from(secret_access_key),
            session_token: None,
        }
    }

    pub fn with_session_token(mut self, session_token: Option<&str>) -> Self {
        self.session_token = session_token.map(SecretString::from);
        self
    }

    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    pub fn secret_access_key(&self) -> &SecretString {
        &self.secret_access_key
    }

    pub fn session_token(&self) -> Option<&SecretString> {
        self.session_token.as_ref()
    }
}

/// An Airflow AWS connection.
///
/// Only holds what the connection sets explicitly. Region, credentials and endpoint it leaves
/// open are resolved by the default chains of the AWS SDK, so `AWS_PROFILE`, shared config
/// files and instance or container roles work as usual.
#[derive(Debug, Clone, PartialEq)]
pub struct AwsConnection {
    conn_id: String,
    region_name: Option<String>,
    endpoint_url: Option<String>,
    profile_name: Option<String>,
    credentials: Option<AwsCredentials>,
}

#[derive(Debug, Deserialize)]
struct ConnectionJson {
    login: Option<String>,
    password: Option<String>,
    #[serde(default)]
    extra: ConnectionExtra,
}

#[derive(Debug, Default, Deserialize)]
struct ConnectionExtra {
    region_name: Option<String>,
    endpoint_url: Option<String>,
    profile_name: Option<String>,
    aws_session_token: Option<String>,
}

impl AwsConnection {
    pub fn new(conn_id: &str) -> Self {
        AwsConnection {
            conn_id: conn_id.to_string(),
            region_name: None,
            endpoint_url: None,
            profile_name: None,
            credentials: None,
        }
    }

    pub fn with_region_name(mut self, region_name: &str) -> Self {
        self.region_name = Some(region_name.to_string());
        self
    }

    pub fn with_endpoint_url(mut self, endpoint_url: &str) -> Self {
        self.endpoint_url = Some(endpoint_url.trim_end_matches('/').to_string());
        self
    }

    /// A profile of the shared AWS config files.
    pub fn with_profile_name(mut self, profile_name: &str) -> Self {
        self.profile_name = Some(profile_name.to_string());
        self
    }

    pub fn with_credentials(mut self, credentials: AwsCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn conn_id(&self) -> &str {
        &self.conn_id
    }

    pub fn region_name(&self) -> Option<&str> {
        self.region_name.as_deref()
    }

    pub fn endpoint_url(&self) -> Option<&str> {
        self.endpoint_url.as_deref()
    }

    pub fn profile_name(&self) -> Option<&str> {
        self.profile_name.as_deref()
    }

    pub fn credentials(&self) -> Option<&AwsCredentials> {
        self.credentials.as_ref()
    }

    /// Resolve a connection from `AIRFLOW_CONN_{CONN_ID}`.
    ///
    /// Without the variable the connection is empty and everything is left to the AWS SDK.
    pub fn from_env(conn_id: &str) -> Result<Self, AwsConnectionError> {
        Self::from_env_with(conn_id, |name| env::var(name).ok())
    }

    /// Resolve a connection with a custom variable lookup.
    pub fn from_env_with<F>(conn_id: &str, lookup: F) -> Result<Self, AwsConnectionError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = format!("AIRFLOW_CONN_{}", conn_id.to_uppercase());
        match lookup(&var) {
            Some(json) => Self::from_airflow_json(conn_id, &json),
            None => Ok(Self::new(conn_id)),
        }
    }

    /// Parse a connection in Airflow's JSON format.
    ///
    /// ```json
    /// {"login": "AKID", "password": "secret", "extra": {"region_name": "eu-west-1"}}
    /// ```
    fn from_airflow_json(conn_id: &str, json: &str) -> Result<Self, AwsConnectionError> {
        let parsed: ConnectionJson = serde_json::from_str(json)
            .map_err(|e| AwsConnectionError::InvalidJson(conn_id.to_string(), e))?;
        let extra = parsed.extra;

        let mut connection = Self::new(conn_id);
        if let Some(region_name) = non_empty(extra.region_name) {
            connection = connection.with_region_name(&region_name);
        }
        if let Some(endpoint_url) = non_empty(extra.endpoint_url) {
            connection = connection.with_endpoint_url(&endpoint_url);
        }
        if let Some(profile_name) = non_empty(extra.profile_name) {
            connection = connection.with_profile_name(&profile_name);
        }
        // a login alone is not enough to sign requests
        if let (Some(login), Some(password)) = (non_empty(parsed.login), parsed.password) {
            let credentials = AwsCredentials::new(&login, &password)
                .with_session_token(extra.aws_session_token.as_deref());
            connection = connection.with_credentials(credentials);
        }
        Ok(connection)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

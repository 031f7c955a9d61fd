#[derive(serde::Deserialize, Debug, Clone)]
pub struct SnowflakeConfig {
    #[serde(rename = "snowflake_account", alias = "SNOWFLAKE_ACCOUNT")]
    pub account: Box<str>,
    #[serde(rename = "snowflake_user", alias = "SNOWFLAKE_USER")]
    pub user: Box<str>,
    #[serde(rename = "snowflake_warehouse", alias = "SNOWFLAKE_WAREHOUSE")]
    pub warehouse: Box<str>,
    #[serde(rename = "snowflake_database", alias = "SNOWFLAKE_DATABASE")]
    pub database: Box<str>,
    #[serde(rename = "snowflake_schema", alias = "SNOWFLAKE_SCHEMA")]
    pub schema: Box<str>,
    #[serde(default, rename = "snowflake_role", alias = "SNOWFLAKE_ROLE")]
    pub role: Option<Box<str>>,
    /// PEM private key registered for the user's key-pair authentication.
    #[serde(rename = "rsa_key_path", alias = "RSA_KEY_PATH")]
    pub private_key_path: Box<str>,
}

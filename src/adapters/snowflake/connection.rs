use chrono::Utc;
use error_stack::{report, ResultExt};
use tracing::{error, info, instrument, warn};

use crate::{
    config::snowflake_config::SnowflakeConfig,
    domain::result_table::ResultTable,
    ports::warehouse::{Warehouse, WarehouseError},
};

use super::{
    client::SnowflakeClient,
    errors::SnowflakeError,
    jwt::{account_identifier, KeyPairJwt},
    key_material::PrivateKeyMaterial,
    query,
    session::{KeyPairCredentials, LoginOptions, Session},
};

/// A logged-in Snowflake session bound to the configured warehouse.
#[derive(Debug)]
pub struct SnowflakeConnection {
    client: SnowflakeClient,
    session: Option<Session>,
}

impl SnowflakeConnection {
    /// Authenticates with key-pair JWT and activates the configured warehouse.
    #[instrument(
        name = "SnowflakeConnection::connect",
        skip_all,
        fields(account = %config.account, user = %config.user)
    )]
    pub async fn connect(
        config: &SnowflakeConfig,
        key_material: &PrivateKeyMaterial,
    ) -> error_stack::Result<Self, WarehouseError> {
        let result = Self::open(config, key_material).await;
        match &result {
            Ok(_) => info!("Snowflake connection established."),
            Err(report) => error!("Error initializing Snowflake: {:?}", report),
        }
        result
    }

    async fn open(
        config: &SnowflakeConfig,
        key_material: &PrivateKeyMaterial,
    ) -> error_stack::Result<Self, WarehouseError> {
        let client =
            SnowflakeClient::new(&config.account).change_context(WarehouseError::Connection)?;
        Self::open_with(client, config, key_material).await
    }

    async fn open_with(
        client: SnowflakeClient,
        config: &SnowflakeConfig,
        key_material: &PrivateKeyMaterial,
    ) -> error_stack::Result<Self, WarehouseError> {
        let jwt = KeyPairJwt::new(&config.account, &config.user, key_material)
            .change_context(WarehouseError::Connection)?
            .issue(Utc::now())
            .change_context(WarehouseError::Connection)?;

        let credentials = KeyPairCredentials {
            account_name: account_identifier(&config.account),
            login_name: config.user.to_string(),
            jwt,
        };
        let session = Session::login(&client, credentials, login_options(config))
            .await
            .change_context(WarehouseError::Connection)?;

        let mut connection = Self {
            client,
            session: Some(session),
        };

        let use_warehouse = format!("USE WAREHOUSE {}", config.warehouse);
        if let Err(report) = connection.run(&use_warehouse).await {
            if let Err(close_report) = connection.close().await {
                warn!("Failed to close Snowflake session: {:?}", close_report);
            }
            return Err(report.change_context(WarehouseError::Connection))
                .attach_printable_lazy(|| format!("Warehouse: {}", config.warehouse));
        }

        Ok(connection)
    }

    async fn run(&self, sql: &str) -> error_stack::Result<ResultTable, SnowflakeError> {
        let session = self
            .session
            .as_ref()
            .ok_or_else(|| report!(SnowflakeError::SessionClosed))?;
        query::query(&self.client, session, sql).await
    }
}

fn login_options(config: &SnowflakeConfig) -> LoginOptions {
    LoginOptions {
        database_name: Some(config.database.to_string()),
        schema_name: Some(config.schema.to_string()),
        warehouse: Some(config.warehouse.to_string()),
        role_name: config.role.as_deref().map(str::to_string),
    }
}

#[async_trait::async_trait]
impl Warehouse for SnowflakeConnection {
    #[instrument(name = "SnowflakeConnection::execute", skip_all)]
    async fn execute(&self, query: &str) -> error_stack::Result<ResultTable, WarehouseError> {
        info!("Fetching data from Snowflake...");
        let result = self
            .run(query)
            .await
            .change_context(WarehouseError::Query);
        match &result {
            Ok(table) => info!(
                rows = table.row_count(),
                columns = table.column_count(),
                "Fetched data from Snowflake."
            ),
            Err(report) => error!("Error fetching data from Snowflake: {:?}", report),
        }
        result
    }

    #[instrument(name = "SnowflakeConnection::close", skip_all)]
    async fn close(&mut self) -> error_stack::Result<(), WarehouseError> {
        let Some(session) = self.session.take() else {
            return Ok(());
        };
        session
            .close(&self.client)
            .await
            .change_context(WarehouseError::Close)?;
        info!("Snowflake connection closed.");
        Ok(())
    }
}

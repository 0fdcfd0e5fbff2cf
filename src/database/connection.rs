//! Connection setup for SQL Server data sources.

use crate::config::DataSourceConfig;
use crate::error::ConsoleError;
use tiberius::{AuthMethod, Client, Config, EncryptionLevel};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::debug;

/// A raw tiberius connection.
pub type RawConnection = Client<Compat<TcpStream>>;

/// Build the tiberius configuration for a data source, credentials included.
pub fn create_config(source: &DataSourceConfig) -> Config {
    let mut config = Config::new();

    config.host(&source.host);
    config.port(source.port);

    if let Some(ref database) = source.database {
        config.database(database);
    }

    if source.encrypt {
        config.encryption(EncryptionLevel::Required);
    } else {
        config.encryption(EncryptionLevel::Off);
    }

    if source.trust_server_certificate {
        config.trust_cert();
    }

    config.application_name(&source.application_name);
    config.authentication(AuthMethod::sql_server(
        &source.credentials.username,
        &source.credentials.password,
    ));

    config
}

/// Open a connection: TCP connect, then TDS handshake and login.
pub async fn create_connection(source: &DataSourceConfig) -> Result<RawConnection, ConsoleError> {
    let config = create_config(source);
    let address = format!("{}:{}", source.host, source.port);
    debug!(data_source = %source.name, "Connecting to {}", address);

    let tcp = TcpStream::connect(&address).await.map_err(|e| {
        ConsoleError::connection_with_source(format!("Failed to connect to {}", address), e)
    })?;

    tcp.set_nodelay(true)
        .map_err(|e| ConsoleError::connection_with_source("Failed to set TCP_NODELAY", e))?;

    let client = Client::connect(config, tcp.compat_write())
        .await
        .map_err(|e| {
            ConsoleError::connection_with_source(
                format!("Failed to log in to SQL Server data source '{}'", source.name),
                e,
            )
        })?;

    debug!(data_source = %source.name, "Connection established");
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SqlCredentials;

    #[test]
    fn test_create_config() {
        let source = DataSourceConfig {
            name: "LOCALHOST".to_string(),
            host: "localhost".to_string(),
            port: 1433,
            database: Some("master".to_string()),
            credentials: SqlCredentials {
                username: "sa".to_string(),
                password: "test".to_string(),
            },
            enabled: true,
            encrypt: false,
            trust_server_certificate: true,
            application_name: "test".to_string(),
        };
        let config = create_config(&source);
        assert_eq!(config.get_addr(), "localhost:1433");
    }
}

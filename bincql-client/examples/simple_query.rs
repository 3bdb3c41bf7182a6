//! Connects to a CQL server, lists its supported options, and runs a
//! few queries.
//!
//! Usage: `simple_query [host:port]` (defaults to 127.0.0.1:9042).

use bincql_client::{Client, ClientError, ConnectionConfig};
use bincql_protocol::{Consistency, QueryResult};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:9042".to_string())
        .parse()?;

    let client = Client::new(ConnectionConfig::new(addr));
    client.connect().await?;

    for (option, values) in client.supported_options().await? {
        println!("{option}: {}", values.join(", "));
    }

    match client
        .query(
            "SELECT keyspace_name FROM system.schema_keyspaces",
            Consistency::One,
        )
        .await
    {
        Ok(QueryResult::Rows { rows, .. }) => {
            for row in &rows {
                println!("keyspace: {:?}", row.get("keyspace_name"));
            }
        }
        Ok(other) => println!("unexpected result: {other:?}"),
        Err(ClientError::Server(err)) => println!("server rejected the query: {err}"),
        Err(err) => return Err(err.into()),
    }

    client.close().await?;
    Ok(())
}

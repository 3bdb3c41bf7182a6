//! High-level client API.

use crate::connection::{Connection, ConnectionConfig};
use crate::error::ClientError;
use bincql_protocol::{
    Consistency, QueryResult, Request, Response, ResponseBody, RowMetadata,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A statement prepared on the server, executable by id.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedStatement {
    pub id: Vec<u8>,
    pub metadata: RowMetadata,
}

/// High-level client for a CQL native protocol server.
///
/// STARTUP negotiation runs lazily before the first query; only
/// `supported_options` may be called without it, as the OPTIONS request
/// is valid on a fresh connection.
pub struct Client {
    conn: Arc<Connection>,
    ready: AtomicBool,
}

impl Client {
    /// Creates a new client with the given configuration.
    pub fn new(config: ConnectionConfig) -> Self {
        Self::from_connection(Connection::new(config))
    }

    /// Creates a client over a pre-built connection, for attaching
    /// capture or compression hooks.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(conn),
            ready: AtomicBool::new(false),
        }
    }

    /// Connects to the server.
    pub async fn connect(&self) -> Result<(), ClientError> {
        self.ready.store(false, Ordering::SeqCst);
        self.conn.connect().await
    }

    /// Returns whether the client is connected.
    pub async fn is_connected(&self) -> bool {
        self.conn.is_connected().await
    }

    /// Closes the connection.
    pub async fn close(&self) -> Result<(), ClientError> {
        self.ready.store(false, Ordering::SeqCst);
        self.conn.close().await
    }

    async fn call(&self, request: Request) -> Result<Response, ClientError> {
        self.conn.call(request.into_frame()).await
    }

    /// Sends STARTUP once per connection, before the first query.
    async fn ensure_ready(&self) -> Result<(), ClientError> {
        if self.ready.load(Ordering::SeqCst) {
            return Ok(());
        }

        tracing::debug!("Sending STARTUP");
        let options = self.conn.config().startup_options.clone();
        let response = self.call(Request::startup(&options)?).await?;
        match response.body {
            ResponseBody::Ready => {
                self.ready.store(true, Ordering::SeqCst);
                Ok(())
            }
            ResponseBody::Authenticate(authenticator) => {
                Err(ClientError::AuthenticationRequired(authenticator))
            }
            ResponseBody::Error(err) => Err(ClientError::Server(err)),
            other => Err(ClientError::UnexpectedResponse(format!(
                "to STARTUP: {other:?}"
            ))),
        }
    }

    /// Asks the server which startup options it supports. Valid before
    /// STARTUP, so this never triggers the lazy handshake.
    pub async fn supported_options(&self) -> Result<Vec<(String, Vec<String>)>, ClientError> {
        let response = self.call(Request::options()).await?;
        match response.body {
            ResponseBody::Supported(options) => Ok(options),
            ResponseBody::Error(err) => Err(ClientError::Server(err)),
            other => Err(ClientError::UnexpectedResponse(format!(
                "to OPTIONS: {other:?}"
            ))),
        }
    }

    fn expect_result(response: Response, what: &str) -> Result<QueryResult, ClientError> {
        match response.body {
            ResponseBody::Result(result) => Ok(result),
            ResponseBody::Error(err) => Err(ClientError::Server(err)),
            other => Err(ClientError::UnexpectedResponse(format!("to {what}: {other:?}"))),
        }
    }

    /// Runs a query and returns its decoded result.
    pub async fn query(
        &self,
        text: &str,
        consistency: Consistency,
    ) -> Result<QueryResult, ClientError> {
        self.ensure_ready().await?;
        let response = self.call(Request::query(text, consistency)?).await?;
        Self::expect_result(response, "QUERY")
    }

    /// Prepares a statement on the server.
    pub async fn prepare(&self, text: &str) -> Result<PreparedStatement, ClientError> {
        self.ensure_ready().await?;
        let response = self.call(Request::prepare(text)?).await?;
        match Self::expect_result(response, "PREPARE")? {
            QueryResult::Prepared { query_id, metadata } => Ok(PreparedStatement {
                id: query_id,
                metadata,
            }),
            other => Err(ClientError::UnexpectedResponse(format!(
                "to PREPARE: {other:?}"
            ))),
        }
    }

    /// Executes a prepared statement with the given bound values; `None`
    /// binds null.
    pub async fn execute(
        &self,
        statement: &PreparedStatement,
        values: &[Option<Vec<u8>>],
        consistency: Consistency,
    ) -> Result<QueryResult, ClientError> {
        self.ensure_ready().await?;
        let response = self
            .call(Request::execute(&statement.id, values, consistency)?)
            .await?;
        Self::expect_result(response, "EXECUTE")
    }
}

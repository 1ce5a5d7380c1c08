use std::sync::Arc;
use std::time::Instant;

use arrow_array::RecordBatch;
use arrow_flight::decode::FlightRecordBatchStream;
use arrow_flight::FlightClient;
use arrow_schema::{Schema, SchemaRef};
use futures::TryStreamExt;
use tonic::transport::{ClientTlsConfig, Endpoint};
use tracing::{debug, info};

use crate::error::{ProbeError, Result};
use crate::location::{parse_endpoint, Location, Transport};
use crate::request::RequestDescriptor;

/// An open Flight connection to a single endpoint.
///
/// Dropping the probe closes the channel.
pub struct FlightProbe {
    location: Location,
    client: FlightClient,
}

/// Everything the server sent back, held in memory.
#[derive(Debug, Clone)]
pub struct ResultSet {
    /// Column layout as announced by the server.
    pub schema: SchemaRef,
    /// The record batches in arrival order.
    pub batches: Vec<RecordBatch>,
    /// Total number of rows across all batches.
    pub total_rows: usize,
}

impl ResultSet {
    /// Create a result set from the announced schema and the received batches.
    pub fn new(schema: SchemaRef, batches: Vec<RecordBatch>) -> Self {
        let total_rows = batches.iter().map(|b| b.num_rows()).sum();
        Self {
            schema,
            batches,
            total_rows,
        }
    }

    /// Total number of rows across all batches.
    pub fn num_rows(&self) -> usize {
        self.total_rows
    }

    /// Number of columns in the schema, even when no rows arrived.
    pub fn num_columns(&self) -> usize {
        self.schema.fields().len()
    }

    /// Check if the result has no rows.
    pub fn is_empty(&self) -> bool {
        self.total_rows == 0
    }
}

impl FlightProbe {
    /// Open a channel to `location`.
    ///
    /// Waits as long as the transport does; no timeout is imposed here.
    pub async fn connect(location: &Location) -> Result<Self> {
        let endpoint = Endpoint::from_shared(location.channel_uri())
            .map_err(|e| ProbeError::invalid_address(&location.to_string(), e.to_string()))?;
        let endpoint = match location.transport() {
            Transport::Plaintext => endpoint,
            Transport::Tls => endpoint
                .tls_config(ClientTlsConfig::new().with_native_roots())
                .map_err(|source| ProbeError::Connection {
                    endpoint: location.to_string(),
                    source,
                })?,
        };

        info!(endpoint = %location, "connecting");
        let channel = endpoint
            .connect()
            .await
            .map_err(|source| ProbeError::Connection {
                endpoint: location.to_string(),
                source,
            })?;
        info!(endpoint = %location, "connected");

        Ok(Self {
            location: location.clone(),
            client: FlightClient::new(channel),
        })
    }

    /// The location this probe is connected to.
    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Send `request` as a `DoGet` ticket and return the response stream.
    pub async fn submit_request(
        &mut self,
        request: &RequestDescriptor,
    ) -> Result<FlightRecordBatchStream> {
        match request.as_str() {
            Some(text) => debug!(ticket = text, "submitting request"),
            None => debug!(bytes = request.payload().len(), "submitting binary request"),
        }
        self.client
            .do_get(request.to_ticket())
            .await
            .map_err(ProbeError::Request)
    }

    /// Submit `request` and read the whole response.
    pub async fn fetch(&mut self, request: &RequestDescriptor) -> Result<ResultSet> {
        let stream = self.submit_request(request).await?;
        materialize_all(stream).await
    }
}

/// Drain `stream` into a single [`ResultSet`].
///
/// The first stream error discards everything read so far.
pub async fn materialize_all(mut stream: FlightRecordBatchStream) -> Result<ResultSet> {
    let mut batches = Vec::new();
    while let Some(batch) = stream.try_next().await.map_err(ProbeError::StreamRead)? {
        debug!(rows = batch.num_rows(), "received batch");
        batches.push(batch);
    }

    let schema = stream
        .schema()
        .cloned()
        .or_else(|| batches.first().map(|b| b.schema()))
        .unwrap_or_else(|| Arc::new(Schema::empty()));

    Ok(ResultSet::new(schema, batches))
}

/// Parse, connect, submit and materialize, in that order.
///
/// The connection is released before this returns, whatever the outcome.
pub async fn run_probe(address: &str, request: &RequestDescriptor) -> Result<ResultSet> {
    let location = parse_endpoint(address)?;
    let start = Instant::now();

    let mut probe = FlightProbe::connect(&location).await?;
    let result = probe.fetch(request).await?;

    info!(
        endpoint = %probe.location(),
        rows = result.total_rows,
        columns = result.num_columns(),
        batches = result.batches.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "result materialized"
    );
    drop(probe);
    Ok(result)
}

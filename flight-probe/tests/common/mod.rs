//! In-process Flight server serving a small payroll table.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use arrow_array::{Float64Array, Int64Array, RecordBatch, StringArray};
use arrow_flight::encode::FlightDataEncoderBuilder;
use arrow_flight::error::FlightError;
use arrow_flight::flight_service_server::{FlightService, FlightServiceServer};
use arrow_flight::{
    Action, ActionType, Criteria, Empty, FlightData, FlightDescriptor, FlightInfo,
    HandshakeRequest, HandshakeResponse, PollInfo, PutResult, SchemaResult, Ticket,
};
use arrow_schema::{DataType, Field, Schema, SchemaRef};
use futures::stream::{self, BoxStream};
use futures::{StreamExt, TryStreamExt};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;
use tonic::{Request, Response, Status, Streaming};

pub fn payroll_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("job_title", DataType::Utf8, false),
        Field::new("base_pay", DataType::Float64, true),
    ]))
}

pub fn payroll_batch() -> RecordBatch {
    RecordBatch::try_new(
        payroll_schema(),
        vec![
            Arc::new(StringArray::from(vec!["Teacher", "Software Engineer", "Nurse"])),
            Arc::new(Float64Array::from(vec![52_000.0, 98_500.0, 61_250.0])),
        ],
    )
    .expect("payroll batch")
}

fn summary_batch() -> RecordBatch {
    let schema = Arc::new(Schema::new(vec![
        Field::new("job_title", DataType::Utf8, false),
        Field::new("total_emp", DataType::Int64, false),
        Field::new("total_spend", DataType::Float64, true),
    ]));
    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(StringArray::from(vec!["Software Engineer", "Nurse"])),
            Arc::new(Int64Array::from(vec![1, 1])),
            Arc::new(Float64Array::from(vec![98_500.0, 61_250.0])),
        ],
    )
    .expect("summary batch")
}

type BatchResult = Result<RecordBatch, FlightError>;

/// Routes JSON tickets the way the payroll server does.
#[derive(Clone, Default)]
pub struct PayrollFlightService {
    requests: Arc<AtomicUsize>,
}

impl PayrollFlightService {
    fn route(&self, ticket: &[u8]) -> Result<(SchemaRef, Vec<BatchResult>), Status> {
        let command: Value = serde_json::from_slice(ticket)
            .map_err(|e| Status::invalid_argument(format!("ticket is not JSON: {e}")))?;
        let action = command
            .get("action")
            .and_then(Value::as_str)
            .ok_or_else(|| Status::invalid_argument("ticket has no action"))?;

        match action {
            "get_all" => Ok((payroll_schema(), vec![Ok(payroll_batch())])),
            "get_split" => {
                let batch = payroll_batch();
                Ok((
                    payroll_schema(),
                    vec![Ok(batch.slice(0, 1)), Ok(batch.slice(1, 2))],
                ))
            }
            "get_empty" => Ok((payroll_schema(), vec![])),
            "filter_dept" => {
                let dept = command
                    .get("department")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_lowercase();
                let batch = payroll_batch();
                let titles = batch
                    .column(0)
                    .as_any()
                    .downcast_ref::<StringArray>()
                    .ok_or_else(|| Status::internal("job_title is not utf8"))?;
                let pays = batch
                    .column(1)
                    .as_any()
                    .downcast_ref::<Float64Array>()
                    .ok_or_else(|| Status::internal("base_pay is not float64"))?;
                let (kept_titles, kept_pays): (Vec<&str>, Vec<f64>) = (0..batch.num_rows())
                    .filter(|&i| titles.value(i).to_lowercase().contains(&dept))
                    .map(|i| (titles.value(i), pays.value(i)))
                    .unzip();
                let filtered = RecordBatch::try_new(
                    payroll_schema(),
                    vec![
                        Arc::new(StringArray::from(kept_titles)),
                        Arc::new(Float64Array::from(kept_pays)),
                    ],
                )
                .map_err(|e| Status::internal(e.to_string()))?;
                Ok((payroll_schema(), vec![Ok(filtered)]))
            }
            "summary_stats" => {
                let batch = summary_batch();
                Ok((batch.schema(), vec![Ok(batch)]))
            }
            "fail_midstream" => Ok((
                payroll_schema(),
                vec![
                    Ok(payroll_batch()),
                    Err(FlightError::ExternalError("storage went away".into())),
                ],
            )),
            other => Err(Status::invalid_argument(format!("Unknown action: {other}"))),
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

type TonicStream<T> = BoxStream<'static, Result<T, Status>>;

#[tonic::async_trait]
impl FlightService for PayrollFlightService {
    type HandshakeStream = TonicStream<HandshakeResponse>;
    type ListFlightsStream = TonicStream<FlightInfo>;
    type DoGetStream = TonicStream<FlightData>;
    type DoPutStream = TonicStream<PutResult>;
    type DoActionStream = TonicStream<arrow_flight::Result>;
    type ListActionsStream = TonicStream<ActionType>;
    type DoExchangeStream = TonicStream<FlightData>;

    async fn handshake(
        &self,
        _request: Request<Streaming<HandshakeRequest>>,
    ) -> Result<Response<Self::HandshakeStream>, Status> {
        Err(Status::unimplemented("handshake"))
    }

    async fn list_flights(
        &self,
        _request: Request<Criteria>,
    ) -> Result<Response<Self::ListFlightsStream>, Status> {
        Err(Status::unimplemented("list_flights"))
    }

    async fn get_flight_info(
        &self,
        _request: Request<FlightDescriptor>,
    ) -> Result<Response<FlightInfo>, Status> {
        Err(Status::unimplemented("get_flight_info"))
    }

    async fn poll_flight_info(
        &self,
        _request: Request<FlightDescriptor>,
    ) -> Result<Response<PollInfo>, Status> {
        Err(Status::unimplemented("poll_flight_info"))
    }

    async fn get_schema(
        &self,
        _request: Request<FlightDescriptor>,
    ) -> Result<Response<SchemaResult>, Status> {
        Err(Status::unimplemented("get_schema"))
    }

    async fn do_get(
        &self,
        request: Request<Ticket>,
    ) -> Result<Response<Self::DoGetStream>, Status> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let ticket = request.into_inner().ticket;
        let (schema, batches) = self.route(&ticket)?;

        let stream = FlightDataEncoderBuilder::new()
            .with_schema(schema)
            .build(stream::iter(batches))
            .map_err(Status::from);
        Ok(Response::new(stream.boxed()))
    }

    async fn do_put(
        &self,
        _request: Request<Streaming<FlightData>>,
    ) -> Result<Response<Self::DoPutStream>, Status> {
        Err(Status::unimplemented("do_put"))
    }

    async fn do_action(
        &self,
        _request: Request<Action>,
    ) -> Result<Response<Self::DoActionStream>, Status> {
        Err(Status::unimplemented("do_action"))
    }

    async fn list_actions(
        &self,
        _request: Request<Empty>,
    ) -> Result<Response<Self::ListActionsStream>, Status> {
        Err(Status::unimplemented("list_actions"))
    }

    async fn do_exchange(
        &self,
        _request: Request<Streaming<FlightData>>,
    ) -> Result<Response<Self::DoExchangeStream>, Status> {
        Err(Status::unimplemented("do_exchange"))
    }
}

/// Serve `service` on an ephemeral localhost port for the rest of the test.
pub async fn spawn_server(service: PayrollFlightService) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("listener address");

    tokio::spawn(async move {
        Server::builder()
            .add_service(FlightServiceServer::new(service))
            .serve_with_incoming(TcpListenerStream::new(listener))
            .await
            .expect("test flight server");
    });
    addr
}

/// A localhost port with nothing listening on it.
pub async fn unused_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind scratch listener");
    listener.local_addr().expect("listener address").port()
}

pub fn endpoint(addr: SocketAddr) -> String {
    format!("grpc://{addr}")
}

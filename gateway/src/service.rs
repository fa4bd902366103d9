use crate::errors::GatewayError;
use crate::routes::{Route, RouteTable};
use http_body_util::BodyExt;
use http_body_util::combinators::BoxBody;
use hyper::body::{Body, Bytes, Incoming};
use hyper::service::Service;
use hyper::{Method, Request, Response, StatusCode};
use megaverse::Megaverse;
use megaverse::bulk::GridPlan;
use megaverse::types::{Attributes, BulkOperation, ObjectType, Position, RunSummary};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use shared::http::make_json_response;
use std::fmt::Display;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Action {
    CreateObject,
    DeleteObject,
    ResetGrid,
    RunBulk,
    RunPlan,
}

/// Route table of the public API. Fixed paths precede `/api/{object_type}`.
pub fn api_routes() -> RouteTable<Action> {
    RouteTable::new(vec![
        Route::new(Method::POST, "/api/reset", Action::ResetGrid),
        Route::new(Method::POST, "/api/bulk", Action::RunBulk),
        Route::new(Method::POST, "/api/plan", Action::RunPlan),
        Route::new(Method::POST, "/api/{object_type}", Action::CreateObject),
        Route::new(Method::DELETE, "/api/{object_type}", Action::DeleteObject),
    ])
}

#[derive(Debug, Deserialize)]
struct ObjectRequest {
    #[serde(flatten)]
    position: Position,
    color: Option<String>,
    direction: Option<String>,
}

impl ObjectRequest {
    /// Only the attribute belonging to `object_type` is parsed.
    fn attributes(&self, object_type: ObjectType) -> Result<Attributes, GatewayError> {
        let attributes = match (object_type, &self.color, &self.direction) {
            (ObjectType::Soloon, Some(color), _) => Attributes::color(color.parse()?),
            (ObjectType::Cometh, _, Some(direction)) => Attributes::direction(direction.parse()?),
            _ => Attributes::default(),
        };
        Ok(attributes)
    }
}

#[derive(Debug, Default, Deserialize)]
struct ResetRequest {
    grid_size: Option<u32>,
    delay_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct BulkRequest {
    operations: Vec<BulkOperation>,
    delay_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct PlanRequest {
    goal: GridPlan,
    delay_ms: Option<u64>,
}

#[derive(Debug, Serialize)]
struct MessageBody {
    message: String,
    #[serde(flatten)]
    summary: Option<RunSummary>,
}

impl MessageBody {
    fn new(message: impl Into<String>) -> Self {
        MessageBody {
            message: message.into(),
            summary: None,
        }
    }

    fn with_summary(message: impl Into<String>, summary: RunSummary) -> Self {
        MessageBody {
            message: message.into(),
            summary: Some(summary),
        }
    }
}

async fn read_body<B>(body: B) -> Result<Bytes, GatewayError>
where
    B: Body,
    B::Error: Display,
{
    body.collect()
        .await
        .map(|collected| collected.to_bytes())
        .map_err(|e| GatewayError::RequestBody(e.to_string()))
}

fn parse_json<T: DeserializeOwned>(bytes: &Bytes) -> Result<T, GatewayError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// An empty body is read as the default value.
fn parse_json_or_default<T: DeserializeOwned + Default>(bytes: &Bytes) -> Result<T, GatewayError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    parse_json(bytes)
}

pub(crate) async fn handle<B, E>(
    megaverse: &Megaverse,
    routes: &RouteTable<Action>,
    request: Request<B>,
) -> Result<Response<BoxBody<Bytes, E>>, GatewayError>
where
    B: Body,
    B::Error: Display,
{
    let (action, object_type) = match routes.resolve(&request) {
        Some(route_match) => {
            let object_type = route_match.params.get("object_type").map(|s| s.to_string());
            (*route_match.action, object_type)
        }
        None if routes.path_exists(request.uri().path()) => {
            return Err(GatewayError::MethodNotAllowed);
        }
        None => return Err(GatewayError::NotFound(request.uri().path().to_string())),
    };

    let bytes = read_body(request.into_body()).await?;

    let body = match action {
        Action::CreateObject | Action::DeleteObject => {
            let object_type: ObjectType = object_type.unwrap_or_default().parse()?;
            let object_request: ObjectRequest = parse_json(&bytes)?;
            let position = object_request.position;

            if action == Action::CreateObject {
                let attributes = object_request.attributes(object_type)?;
                megaverse
                    .create_object(object_type, position, attributes)
                    .await?;
                MessageBody::new(format!("{} created successfully.", object_type.name()))
            } else {
                megaverse.delete_object(object_type, position).await?;
                MessageBody::new(format!("{} deleted successfully.", object_type.name()))
            }
        }
        Action::ResetGrid => {
            let reset: ResetRequest = parse_json_or_default(&bytes)?;
            let summary = megaverse
                .reset_grid(reset.grid_size, reset.delay_ms.map(Duration::from_millis))
                .await?;
            MessageBody::with_summary("Grid reset successfully.", summary)
        }
        Action::RunBulk => {
            let bulk: BulkRequest = parse_json(&bytes)?;
            let summary = megaverse
                .run_bulk_operations(&bulk.operations, bulk.delay_ms.map(Duration::from_millis))
                .await?;
            MessageBody::with_summary("Bulk operations completed successfully.", summary)
        }
        Action::RunPlan => {
            let plan: PlanRequest = parse_json(&bytes)?;
            let summary = megaverse
                .run_grid_plan(&plan.goal, plan.delay_ms.map(Duration::from_millis))
                .await?;
            MessageBody::with_summary("Plan applied successfully.", summary)
        }
    };

    Ok(make_json_response(StatusCode::OK, &body))
}

/// Main listener service translating JSON requests into megaverse calls.
pub struct GatewayService {
    megaverse: Megaverse,
    routes: Arc<RouteTable<Action>>,
}

impl GatewayService {
    pub fn new(megaverse: Megaverse) -> Self {
        GatewayService {
            megaverse,
            routes: Arc::new(api_routes()),
        }
    }
}

impl Service<Request<Incoming>> for GatewayService {
    type Response = Response<BoxBody<Bytes, GatewayError>>;
    type Error = GatewayError;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, request: Request<Incoming>) -> Self::Future {
        let megaverse = self.megaverse.clone();
        let routes = self.routes.clone();

        Box::pin(async move {
            let method = request.method().clone();
            let path = request.uri().path().to_string();

            match handle(&megaverse, &routes, request).await {
                Ok(response) => {
                    tracing::debug!(%method, %path, "Request handled");
                    Ok(response)
                }
                Err(error) => {
                    let status = error.status();
                    if status.is_server_error() {
                        tracing::error!(%method, %path, %status, error = %error, "Request failed");
                    } else {
                        tracing::info!(%method, %path, %status, error = %error, "Request rejected");
                    }
                    Ok(error.into_response())
                }
            }
        })
    }
}

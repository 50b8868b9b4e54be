use std::convert::Infallible;
use std::sync::Arc;

use log::error;
use warp::{http::StatusCode, reply, Filter, Rejection, Reply};

use super::types::{ColorUpdate, DataQuery, DataResponse, MessageResponse};
use crate::error_handling::types::QueryError;
use crate::query_service::{QueryService, SummaryQuery};
use crate::storage::types::{NewApplication, Session};

/// Largest accepted JSON body, batches from the collector included.
const MAX_BODY_BYTES: u64 = 4 * 1024 * 1024;

pub fn status_for(err: &QueryError) -> StatusCode {
    match err {
        QueryError::Validation { .. } => StatusCode::BAD_REQUEST,
        QueryError::NotFound(_) => StatusCode::NOT_FOUND,
        QueryError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        QueryError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
    }
}

fn error_reply(err: QueryError) -> reply::Response {
    let status = status_for(&err);
    if status.is_server_error() {
        error!("Request failed: {}", err);
    }
    reply::with_status(reply::json(&MessageResponse::new(err.to_string())), status).into_response()
}

fn message_reply(message: &str) -> reply::Response {
    reply::with_status(reply::json(&MessageResponse::new(message)), StatusCode::OK).into_response()
}

fn data_reply<T: serde::Serialize>(data: T) -> reply::Response {
    reply::with_status(reply::json(&DataResponse { data }), StatusCode::OK).into_response()
}

fn with_service(
    service: Arc<QueryService>,
) -> impl Filter<Extract = (Arc<QueryService>,), Error = Infallible> + Clone {
    warp::any().map(move || service.clone())
}

pub async fn handle_data(query: DataQuery, service: Arc<QueryService>) -> Result<reply::Response, Rejection> {
    Ok(match service.get_data(query.start.as_deref(), query.end.as_deref()).await {
        Ok(groups) => data_reply(groups),
        Err(e) => error_reply(e),
    })
}

pub async fn handle_summary(query: SummaryQuery, service: Arc<QueryService>) -> Result<reply::Response, Rejection> {
    Ok(match service.get_summary(&query).await {
        Ok(summary) => data_reply(summary),
        Err(e) => error_reply(e),
    })
}

pub async fn handle_list_applications(service: Arc<QueryService>) -> Result<reply::Response, Rejection> {
    Ok(match service.list_applications().await {
        Ok(apps) => data_reply(apps),
        Err(e) => error_reply(e),
    })
}

pub async fn handle_set_color(update: ColorUpdate, service: Arc<QueryService>) -> Result<reply::Response, Rejection> {
    Ok(match service.set_application_color(&update.name, &update.color_hex).await {
        Ok(()) => message_reply("Application color updated."),
        Err(e) => error_reply(e),
    })
}

pub async fn handle_register_applications(
    batch: Vec<NewApplication>,
    service: Arc<QueryService>,
) -> Result<reply::Response, Rejection> {
    Ok(match service.register_applications(&batch).await {
        Ok(()) => message_reply(&format!("{} applications registered.", batch.len())),
        Err(e) => error_reply(e),
    })
}

pub async fn handle_record_sessions(batch: Vec<Session>, service: Arc<QueryService>) -> Result<reply::Response, Rejection> {
    Ok(match service.record_sessions(&batch).await {
        Ok(()) => message_reply(&format!("{} sessions recorded.", batch.len())),
        Err(e) => error_reply(e),
    })
}

/// Turns warp's own rejections (unknown path, bad JSON, ...) into `{message}` bodies.
pub async fn handle_rejection(err: Rejection) -> Result<reply::Response, Infallible> {
    let (status, message) = if let Some(e) = err.find::<warp::filters::cors::CorsForbidden>() {
        (StatusCode::FORBIDDEN, e.to_string())
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, format!("Invalid body: {}", e))
    } else if let Some(e) = err.find::<warp::reject::InvalidQuery>() {
        (StatusCode::BAD_REQUEST, e.to_string())
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, "Payload too large".to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed".to_string())
    } else if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not found".to_string())
    } else {
        error!("Unhandled rejection: {:?}", err);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
    };
    Ok(reply::with_status(reply::json(&MessageResponse::new(message)), status).into_response())
}

/// GET /
pub fn dashboard_route() -> impl Filter<Extract = (reply::Response,), Error = Rejection> + Clone {
    warp::path::end()
        .and(warp::get())
        .map(|| message_reply("Server operating normally."))
}

/// GET /data?start=..&end=..
pub fn data_route(service: Arc<QueryService>) -> impl Filter<Extract = (reply::Response,), Error = Rejection> + Clone {
    warp::path("data")
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::query::<DataQuery>())
        .and(with_service(service))
        .and_then(handle_data)
}

/// GET /summary?start=..&end=..&interval=..&metric=..&unit=..
pub fn summary_route(service: Arc<QueryService>) -> impl Filter<Extract = (reply::Response,), Error = Rejection> + Clone {
    warp::path("summary")
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::query::<SummaryQuery>())
        .and(with_service(service))
        .and_then(handle_summary)
}

/// GET, PUT and POST /applications
pub fn applications_route(
    service: Arc<QueryService>,
) -> impl Filter<Extract = (reply::Response,), Error = Rejection> + Clone {
    let base = warp::path("applications").and(warp::path::end());
    let list = base
        .and(warp::get())
        .and(with_service(service.clone()))
        .and_then(handle_list_applications);
    let set_color = base
        .and(warp::put())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json::<ColorUpdate>())
        .and(with_service(service.clone()))
        .and_then(handle_set_color);
    let register = base
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json::<Vec<NewApplication>>())
        .and(with_service(service))
        .and_then(handle_register_applications);
    list.or(set_color).unify().or(register).unify()
}

/// POST /sessions
pub fn sessions_route(service: Arc<QueryService>) -> impl Filter<Extract = (reply::Response,), Error = Rejection> + Clone {
    warp::path("sessions")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json::<Vec<Session>>())
        .and(with_service(service))
        .and_then(handle_record_sessions)
}

/// Every route, with CORS for `allowed_origins` and request logging.
pub fn routes(
    service: Arc<QueryService>,
    allowed_origins: &[String],
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let cors = warp::cors()
        .allow_origins(allowed_origins.iter().map(String::as_str))
        .allow_methods(vec!["GET", "PUT", "POST"])
        .allow_header("content-type");

    dashboard_route()
        .or(data_route(service.clone()))
        .unify()
        .or(summary_route(service.clone()))
        .unify()
        .or(applications_route(service.clone()))
        .unify()
        .or(sessions_route(service))
        .unify()
        .with(cors)
        .recover(handle_rejection)
        .with(warp::log("omnis::http"))
}

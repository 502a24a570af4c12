//! Admin HTTP Server
//!
//! Serves SQL generation, confirmed execution and schema management over
//! plain HTTP/1.1 using tokio directly.

use nlsql_admin::api::{ExecuteRequest, ExecuteResponse, GenerateRequest};
use nlsql_admin::{AdminError, AdminService, Settings};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{timeout, Duration};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

const READ_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_REQUEST_BYTES: usize = 1024 * 1024;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Body of the schema and connection endpoints
#[derive(Deserialize)]
struct DatabaseRequest {
    db_name: String,
}

#[derive(Serialize)]
struct SchemaResponse {
    success: bool,
    db_name: String,
    schema: String,
    tables: Vec<String>,
    table_count: usize,
}

#[derive(Serialize)]
struct InvalidateResponse {
    success: bool,
    db_name: String,
    invalidated: bool,
}

struct HttpRequest {
    method: String,
    path: String,
    body: String,
}

struct HttpResponse {
    status: u16,
    body: String,
}

impl HttpResponse {
    fn json<T: Serialize>(status: u16, value: &T) -> Self {
        match serde_json::to_string(value) {
            Ok(body) => Self { status, body },
            Err(e) => Self::error(500, &e.to_string()),
        }
    }

    fn error(status: u16, message: &str) -> Self {
        let body = serde_json::json!({ "error": message }).to_string();
        Self { status, body }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = Settings::load()?;
    let bind_addr = settings.api_bind_addr();
    let service = Arc::new(AdminService::new(settings));

    info!("🚀 Starting admin API server on {}", bind_addr);
    let listener = TcpListener::bind(&bind_addr).await?;
    info!("✅ Server listening on {}", bind_addr);

    loop {
        let (stream, addr) = listener.accept().await?;
        let service = service.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, service).await {
                error!("Error handling connection from {}: {}", addr, e);
            }
        });
    }
}

async fn handle_connection(mut stream: TcpStream, service: Arc<AdminService>) -> anyhow::Result<()> {
    let request = match timeout(READ_TIMEOUT, read_request(&mut stream)).await {
        Ok(Ok(Some(request))) => request,
        Ok(Ok(None)) => {
            return write_response(&mut stream, HttpResponse::error(400, "Invalid request")).await
        }
        Ok(Err(e)) => return Err(e.into()),
        Err(_) => {
            return write_response(&mut stream, HttpResponse::error(408, "Request timeout")).await
        }
    };

    let request_id = Uuid::new_v4();
    info!("[{}] {} {}", request_id, request.method, request.path);
    let response = route(&request, &service).await;
    info!("[{}] -> {}", request_id, response.status);

    write_response(&mut stream, response).await
}

/// Read headers, then the body up to Content-Length
async fn read_request(stream: &mut TcpStream) -> std::io::Result<Option<HttpRequest>> {
    let mut buffer = Vec::new();
    let mut temp_buf = [0; 8192];

    let header_end = loop {
        let n = stream.read(&mut temp_buf).await?;
        if n == 0 {
            return Ok(None);
        }
        buffer.extend_from_slice(&temp_buf[..n]);
        if let Some(pos) = find_header_end(&buffer) {
            break pos;
        }
        if buffer.len() > MAX_REQUEST_BYTES {
            return Ok(None);
        }
    };

    let head = String::from_utf8_lossy(&buffer[..header_end]).to_string();
    let mut lines = head.lines();
    let Some(request_line) = lines.next() else {
        return Ok(None);
    };
    let parts: Vec<&str> = request_line.split_whitespace().collect();
    if parts.len() < 2 {
        return Ok(None);
    }

    let mut headers = HashMap::new();
    for line in lines {
        if let Some((key, value)) = line.split_once(':') {
            headers.insert(key.trim().to_lowercase(), value.trim().to_string());
        }
    }

    let content_length = headers
        .get("content-length")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(0)
        .min(MAX_REQUEST_BYTES);
    let body_start = header_end + 4;
    while buffer.len() < body_start + content_length {
        let n = stream.read(&mut temp_buf).await?;
        if n == 0 {
            break;
        }
        buffer.extend_from_slice(&temp_buf[..n]);
    }
    let body_end = buffer.len().min(body_start + content_length);
    let body = String::from_utf8_lossy(&buffer[body_start.min(body_end)..body_end]).to_string();

    let path = parts[1].split('?').next().unwrap_or("/");
    let path = match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    };

    Ok(Some(HttpRequest {
        method: parts[0].to_string(),
        path: path.to_string(),
        body,
    }))
}

fn find_header_end(buffer: &[u8]) -> Option<usize> {
    buffer.windows(4).position(|w| w == b"\r\n\r\n")
}

async fn route(request: &HttpRequest, service: &AdminService) -> HttpResponse {
    match (request.method.as_str(), request.path.as_str()) {
        ("OPTIONS", _) => HttpResponse {
            status: 204,
            body: String::new(),
        },
        ("GET", "/health") | ("GET", "/") => HttpResponse::json(
            200,
            &HealthResponse {
                status: "healthy",
                service: "nlsql-admin",
                version: env!("CARGO_PKG_VERSION"),
            },
        ),
        ("POST", "/admin/smart/generate") => match parse_body::<GenerateRequest>(&request.body) {
            Ok(req) => HttpResponse::json(200, &service.generate(&req.db_name, &req.query).await),
            Err(resp) => resp,
        },
        ("POST", "/admin/smart/execute") => match parse_body::<ExecuteRequest>(&request.body) {
            Ok(req) => execute(service, req).await,
            Err(resp) => resp,
        },
        ("POST", "/schema/extract") => match parse_body::<DatabaseRequest>(&request.body) {
            Ok(req) => match service.describe_schema(&req.db_name).await {
                Ok(report) => HttpResponse::json(
                    200,
                    &SchemaResponse {
                        success: true,
                        schema: report.to_string(),
                        tables: report.table_names(),
                        table_count: report.tables.len(),
                        db_name: req.db_name,
                    },
                ),
                Err(e) => {
                    warn!("Schema extraction failed for {}: {}", req.db_name, e);
                    HttpResponse::json(500, &ErrorResponse { error: e.to_string() })
                }
            },
            Err(resp) => resp,
        },
        ("POST", "/schema/invalidate") => match parse_body::<DatabaseRequest>(&request.body) {
            Ok(req) => {
                let invalidated = service.invalidate_schema(&req.db_name);
                HttpResponse::json(
                    200,
                    &InvalidateResponse {
                        success: true,
                        db_name: req.db_name,
                        invalidated,
                    },
                )
            }
            Err(resp) => resp,
        },
        ("POST", "/test-connection") => match parse_body::<DatabaseRequest>(&request.body) {
            Ok(req) => {
                let check = service.test_connection(&req.db_name).await;
                let status = if check.success { 200 } else { 503 };
                HttpResponse::json(status, &check)
            }
            Err(resp) => resp,
        },
        _ => HttpResponse::error(404, "Not found"),
    }
}

async fn execute(service: &AdminService, req: ExecuteRequest) -> HttpResponse {
    match service.execute(&req.db_name, &req.sql, req.confirm).await {
        Ok(response) => HttpResponse::json(200, &response),
        Err(AdminError::ConfirmationRequired) => HttpResponse::error(
            400,
            "Execution requires confirmation. Set 'confirm' to true.",
        ),
        Err(e) => HttpResponse::json(
            e.status_code(),
            &ExecuteResponse::failure(e.to_string(), None),
        ),
    }
}

fn parse_body<T: serde::de::DeserializeOwned>(body: &str) -> Result<T, HttpResponse> {
    serde_json::from_str(body)
        .map_err(|e| HttpResponse::error(400, &format!("Invalid request body: {}", e)))
}

async fn write_response(stream: &mut TcpStream, response: HttpResponse) -> anyhow::Result<()> {
    let raw = format!(
        "HTTP/1.1 {} {}\r\n\
         Content-Type: application/json\r\n\
         Access-Control-Allow-Origin: *\r\n\
         Access-Control-Allow-Methods: GET, POST, OPTIONS\r\n\
         Access-Control-Allow-Headers: Content-Type\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\
         \r\n\
         {}",
        response.status,
        status_text(response.status),
        response.body.len(),
        response.body
    );
    stream.write_all(raw.as_bytes()).await?;
    stream.flush().await?;
    Ok(())
}

fn status_text(status: u16) -> &'static str {
    match status {
        200 => "OK",
        204 => "No Content",
        400 => "Bad Request",
        404 => "Not Found",
        408 => "Request Timeout",
        409 => "Conflict",
        503 => "Service Unavailable",
        _ => "Internal Server Error",
    }
}

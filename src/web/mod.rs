//! Interactive web frontend
//!
//! A synchronous `tiny_http` server exposing the upload form, style
//! selection, previews and downloads. Requests are handled one at a time;
//! each visitor gets an isolated [`crate::session::SessionContext`].

pub mod form;
pub mod multipart;
pub mod render;
pub mod routes;
pub mod state;

pub use self::routes::{dispatch, WebRequest, WebResponse};
pub use self::state::AppState;

use crate::{
    config::ProcessorConfig,
    error::{Result, StyleTransferError},
    inference::StyleModel,
    processor::StyleTransferProcessor,
};
use std::io::{Cursor, Read};
use tiny_http::{Header, Request, Response, Server, StatusCode};

/// Serve the frontend on `addr` until the listener shuts down
pub fn serve(addr: &str, config: ProcessorConfig, model: Box<dyn StyleModel>) -> Result<()> {
    let processor = StyleTransferProcessor::new(config, model)?;
    let mut state = AppState::new(processor)?;

    let server = Server::http(addr).map_err(|e| {
        StyleTransferError::internal(format!("Failed to bind HTTP server on {}: {}", addr, e))
    })?;
    log::info!("Serving on http://{}", addr);
    tracing::info!(
        addr,
        backend = state.processor.model_name(),
        staging_root = %state.config().staging_root.display(),
        "web frontend started"
    );

    for mut request in server.incoming_requests() {
        let limit = state.config().max_file_size;
        let web_request = read_request(&mut request, limit);
        let response = dispatch(&mut state, &web_request);
        log::debug!(
            "{} {} -> {}",
            web_request.method,
            web_request.path,
            response.status
        );
        if let Err(e) = request.respond(into_tiny_response(response)) {
            log::warn!("Failed to send response: {}", e);
        }
    }

    state.shutdown();
    Ok(())
}

fn header_value(request: &Request, name: &'static str) -> Option<String> {
    request
        .headers()
        .iter()
        .find(|h| h.field.equiv(name))
        .map(|h| h.value.as_str().to_owned())
}

/// Reads at most `limit` plus framing slack; larger bodies are left unread
/// and reported through `content_length`.
fn read_request(request: &mut Request, limit: u64) -> WebRequest {
    let url = request.url().to_owned();
    let path = url.split('?').next().unwrap_or("/").to_owned();
    let max_body = limit.saturating_add(routes::MULTIPART_OVERHEAD);

    let declared = request.body_length().map(|n| n as u64);
    let mut body = Vec::new();
    let content_length = match declared {
        Some(n) if n > max_body => Some(n),
        _ => {
            if let Err(e) = request
                .as_reader()
                .take(max_body.saturating_add(1))
                .read_to_end(&mut body)
            {
                log::warn!("Failed to read request body: {}", e);
            }
            Some(body.len() as u64)
        },
    };

    WebRequest {
        method: request.method().clone(),
        path,
        content_type: header_value(request, "Content-Type").unwrap_or_default(),
        cookie: header_value(request, "Cookie"),
        content_length,
        body,
    }
}

fn into_tiny_response(response: WebResponse) -> Response<Cursor<Vec<u8>>> {
    let len = response.body.len();
    let headers = response
        .headers
        .iter()
        .filter_map(|(name, value)| Header::from_bytes(name.as_bytes(), value.as_bytes()).ok())
        .collect();
    Response::new(
        StatusCode(response.status),
        headers,
        Cursor::new(response.body),
        Some(len),
        None,
    )
}

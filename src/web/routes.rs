//! Request dispatch for the upload / stylize / download flow
//!
//! Handlers work on [`WebRequest`] and return [`WebResponse`], so the whole
//! flow can be driven without a socket. The server loop translates to and
//! from `tiny_http` at the edge.

use super::{
    form::{cookie_value, form_get, parse_form, percent_encode},
    multipart::{extract_boundary, extract_file},
    render::render_page,
    state::AppState,
};
use crate::{
    config::OutputFormat,
    error::StyleTransferError,
    services::OutputFormatHandler,
    styles::Style,
    types::Upload,
};
use image::DynamicImage;
use tiny_http::Method;
use uuid::Uuid;

/// Cookie carrying the session id
pub const SESSION_COOKIE: &str = "painterly_session";

/// Slack allowed on top of the file limit for multipart framing
pub const MULTIPART_OVERHEAD: u64 = 64 * 1024;

/// Transport-independent view of an incoming request
#[derive(Debug, Clone)]
pub struct WebRequest {
    pub method: Method,
    pub path: String,
    pub content_type: String,
    pub cookie: Option<String>,
    /// Declared body length, when the client sent one
    pub content_length: Option<u64>,
    pub body: Vec<u8>,
}

impl WebRequest {
    #[must_use]
    pub fn get(path: &str) -> Self {
        Self {
            method: Method::Get,
            path: path.to_string(),
            content_type: String::new(),
            cookie: None,
            content_length: None,
            body: Vec::new(),
        }
    }

    /// POST with an `application/x-www-form-urlencoded` body
    #[must_use]
    pub fn post_form(path: &str, body: &str) -> Self {
        Self {
            method: Method::Post,
            path: path.to_string(),
            content_type: "application/x-www-form-urlencoded".to_string(),
            cookie: None,
            content_length: Some(body.len() as u64),
            body: body.as_bytes().to_vec(),
        }
    }

    /// POST with a pre-built multipart body
    #[must_use]
    pub fn post_multipart(path: &str, boundary: &str, body: Vec<u8>) -> Self {
        Self {
            method: Method::Post,
            path: path.to_string(),
            content_type: format!("multipart/form-data; boundary={}", boundary),
            cookie: None,
            content_length: Some(body.len() as u64),
            body,
        }
    }

    #[must_use]
    pub fn with_session(mut self, id: Uuid) -> Self {
        self.cookie = Some(format!("{}={}", SESSION_COOKIE, id));
        self
    }

    /// Session id from the cookie header, if well formed
    #[must_use]
    pub fn session_id(&self) -> Option<Uuid> {
        let header = self.cookie.as_deref()?;
        cookie_value(header, SESSION_COOKIE).and_then(|v| Uuid::parse_str(v).ok())
    }
}

/// Transport-independent response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebResponse {
    pub status: u16,
    pub headers: Vec<(&'static str, String)>,
    pub body: Vec<u8>,
}

impl WebResponse {
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    fn with_header(mut self, name: &'static str, value: String) -> Self {
        self.headers.push((name, value));
        self
    }
}

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

#[must_use]
pub fn html_response(body: String) -> WebResponse {
    WebResponse {
        status: 200,
        headers: vec![("Content-Type", "text/html; charset=utf-8".to_string())],
        body: body.into_bytes(),
    }
}

#[must_use]
pub fn redirect(location: &str) -> WebResponse {
    WebResponse {
        status: 303,
        headers: vec![("Location", location.to_string())],
        body: Vec::new(),
    }
}

#[must_use]
pub fn image_response(bytes: Vec<u8>, format: OutputFormat) -> WebResponse {
    WebResponse {
        status: 200,
        headers: vec![
            ("Content-Type", OutputFormatHandler::content_type(format).to_string()),
            ("Cache-Control", "no-store".to_string()),
        ],
        body: bytes,
    }
}

#[must_use]
pub fn download_response(bytes: Vec<u8>, format: OutputFormat, filename: &str) -> WebResponse {
    let fallback: String = filename
        .chars()
        .map(|c| if c.is_ascii_graphic() && c != '"' && c != '\\' { c } else { '_' })
        .collect();
    let disposition = if fallback == filename {
        format!("attachment; filename=\"{}\"", filename)
    } else {
        format!(
            "attachment; filename=\"{}\"; filename*=UTF-8''{}",
            fallback,
            percent_encode(filename)
        )
    };
    image_response(bytes, format).with_header("Content-Disposition", disposition)
}

#[must_use]
pub fn not_found() -> WebResponse {
    text_response(404, "404 Not Found")
}

fn text_response(status: u16, text: &str) -> WebResponse {
    WebResponse {
        status,
        headers: vec![("Content-Type", "text/plain; charset=utf-8".to_string())],
        body: text.as_bytes().to_vec(),
    }
}

fn session_cookie(id: Uuid) -> String {
    format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, id)
}

// ---------------------------------------------------------------------------
// Request dispatcher
// ---------------------------------------------------------------------------

/// Routes a request to its handler.
///
/// Requests without a live session cookie get a fresh session, announced
/// through `Set-Cookie` on the response.
pub fn dispatch(state: &mut AppState, request: &WebRequest) -> WebResponse {
    state.evict_idle();

    let known = request.session_id().filter(|id| state.session(*id).is_some());
    let (session_id, is_new) = match known {
        Some(id) => (id, false),
        None => (state.open_session(), true),
    };

    let response = match (&request.method, request.path.as_str()) {
        (Method::Get, "/") => handle_page(state, session_id),
        (Method::Post, "/upload") => handle_upload(state, session_id, request),
        (Method::Post, "/process") => handle_process(state, session_id, request),
        (Method::Post, "/lang") => handle_language(state, session_id, request),
        (Method::Get, "/image/original") => handle_original(state, session_id),
        (Method::Get, "/image/styled") => handle_styled(state, session_id),
        (Method::Get, "/download/png") => handle_download(state, session_id, OutputFormat::Png),
        (Method::Get, "/download/jpeg") => handle_download(state, session_id, OutputFormat::Jpeg),
        _ => not_found(),
    };

    if is_new {
        response.with_header("Set-Cookie", session_cookie(session_id))
    } else {
        response
    }
}

// ---------------------------------------------------------------------------
// GET /
// ---------------------------------------------------------------------------

fn handle_page(state: &mut AppState, id: Uuid) -> WebResponse {
    let Some((processor, translator, session)) = state.parts(id) else {
        return redirect("/");
    };
    let page = render_page(translator, processor.config(), session);
    // Errors are shown once
    session.clear_error();
    html_response(page)
}

// ---------------------------------------------------------------------------
// POST /upload
// ---------------------------------------------------------------------------

fn handle_upload(state: &mut AppState, id: Uuid, request: &WebRequest) -> WebResponse {
    let Some((processor, _, session)) = state.parts(id) else {
        return redirect("/");
    };
    let limit = processor.config().max_file_size;

    if let Some(length) = request.content_length {
        if length > limit.saturating_add(MULTIPART_OVERHEAD) {
            session.fail(&StyleTransferError::FileTooLarge {
                size_bytes: length,
                limit_bytes: limit,
            });
            return redirect("/");
        }
    }

    let part = extract_boundary(&request.content_type)
        .filter(|_| request.content_type.starts_with("multipart/form-data"))
        .and_then(|boundary| extract_file(&request.body, &boundary, "image"))
        .filter(|part| !part.bytes.is_empty());

    match part {
        Some(part) => {
            let upload = Upload::new(part.file_name, part.bytes);
            // Failures are recorded on the session for display
            let _ = session.upload(processor, &upload);
        },
        None => session.fail(&StyleTransferError::unreadable("no image file was uploaded")),
    }
    redirect("/")
}

// ---------------------------------------------------------------------------
// POST /process
// ---------------------------------------------------------------------------

fn handle_process(state: &mut AppState, id: Uuid, request: &WebRequest) -> WebResponse {
    let Some((processor, _, session)) = state.parts(id) else {
        return redirect("/");
    };

    let body = String::from_utf8_lossy(&request.body);
    let pairs = parse_form(&body);
    let requested = form_get(&pairs, "style").unwrap_or(session.style.key());

    match requested.parse::<Style>() {
        Ok(style) => {
            let _ = session.process(processor, style);
        },
        Err(err) => session.fail(&err),
    }
    redirect("/")
}

// ---------------------------------------------------------------------------
// POST /lang
// ---------------------------------------------------------------------------

fn handle_language(state: &mut AppState, id: Uuid, request: &WebRequest) -> WebResponse {
    let Some((_, translator, session)) = state.parts(id) else {
        return redirect("/");
    };

    let body = String::from_utf8_lossy(&request.body);
    let pairs = parse_form(&body);
    if let Some(locale) = form_get(&pairs, "locale") {
        if translator.has_locale(locale) {
            session.set_locale(locale);
        } else {
            log::warn!("Ignoring unknown locale '{}'", locale);
        }
    }
    redirect("/")
}

// ---------------------------------------------------------------------------
// Image previews and downloads
// ---------------------------------------------------------------------------

fn handle_original(state: &mut AppState, id: Uuid) -> WebResponse {
    let Some(session) = state.session(id) else {
        return not_found();
    };
    match &session.prepared {
        Some(prepared) => png_preview(&prepared.original),
        None => not_found(),
    }
}

fn handle_styled(state: &mut AppState, id: Uuid) -> WebResponse {
    let Some(session) = state.session(id) else {
        return not_found();
    };
    match &session.result {
        Some(result) => png_preview(&result.image),
        None => not_found(),
    }
}

fn png_preview(image: &DynamicImage) -> WebResponse {
    match OutputFormatHandler::encode(image, OutputFormat::Png, 100) {
        Ok(bytes) => image_response(bytes, OutputFormat::Png),
        Err(e) => {
            log::error!("Failed to encode preview: {}", e);
            text_response(500, "500 Internal Server Error")
        },
    }
}

fn handle_download(state: &mut AppState, id: Uuid, format: OutputFormat) -> WebResponse {
    let quality = state.config().download_jpeg_quality;
    let Some(session) = state.session(id) else {
        return not_found();
    };
    let Some(result) = &session.result else {
        return not_found();
    };

    match result.to_bytes(format, quality) {
        Ok(bytes) => download_response(bytes, format, &result.download_name(format)),
        Err(e) => {
            log::error!("Failed to encode {} download: {}", format, e);
            text_response(500, "500 Internal Server Error")
        },
    }
}

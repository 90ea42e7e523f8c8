#![forbid(unsafe_code)]

//! Read-only HTTP API over the Snow-Town ecosystem.

pub mod api;
pub mod config;
pub mod ecosystem;
pub mod error;
pub mod health;
mod http;
pub mod nodes;

pub use api::ApiState;
pub use config::{SourcePaths, ViewerConfig};
pub use error::ApiError;

use http::{normalize_path, read_request, write_response};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info};

const JSON: &str = "application/json; charset=utf-8";

/// Accept loop. Connections are served one at a time until `shutdown` is set.
pub fn serve(
    listener: TcpListener,
    state: ApiState,
    shutdown: Arc<AtomicBool>,
) -> std::io::Result<()> {
    listener.set_nonblocking(true)?;
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "viewer listening");
    }
    while !shutdown.load(Ordering::Relaxed) {
        match listener.accept() {
            Ok((stream, peer)) => {
                if let Err(err) = handle_connection(stream, &state) {
                    debug!(%peer, error = %err, "connection ended with error");
                }
            }
            Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                std::thread::sleep(Duration::from_millis(25));
            }
            Err(err) => debug!(error = %err, "accept failed"),
        }
    }
    info!("viewer stopped");
    Ok(())
}

fn handle_connection(mut stream: TcpStream, state: &ApiState) -> std::io::Result<()> {
    stream.set_nonblocking(false)?;
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let Some(request) = read_request(&mut stream)? else {
        return Ok(());
    };
    let started = Instant::now();
    let head_only = request.method == "HEAD";
    let path = normalize_path(&request.target);

    let result = if request.method == "GET" || head_only {
        api::dispatch(state, &path, &request.target)
    } else {
        Err(ApiError::method_not_allowed(&request.method))
    };

    let (status, body) = match result {
        Ok(value) => ("200 OK", value.to_string()),
        Err(err) => {
            debug!(code = err.code, message = %err.message, "request rejected");
            (err.status_line(), err.to_json().to_string())
        }
    };
    let tag = http::etag(body.as_bytes());
    let not_modified = status == "200 OK" && request.if_none_match.as_deref() == Some(tag.as_str());

    debug!(
        method = %request.method,
        %path,
        status,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "request served"
    );
    if not_modified {
        return write_response(&mut stream, "304 Not Modified", JSON, b"", Some(&tag), true);
    }
    write_response(&mut stream, status, JSON, body.as_bytes(), Some(&tag), head_only)
}

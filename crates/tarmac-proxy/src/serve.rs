// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! The accept loop and per-request forwarding.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::header::{self, HeaderMap, HeaderValue};
use hyper::service::service_fn;
use hyper::upgrade::OnUpgrade;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use tarmac_types::SECRET_HEADER;

use crate::classify::{Backend, INTERNAL_PREFIX, classify_host, secret_allows};
use crate::client::send_over_unix;
use crate::error::Error;

const FORWARDED_HOST: &str = "x-forwarded-host";
const FORWARDED_PROTO: &str = "x-forwarded-proto";

/// Forwarded upstream bodies and locally generated plain text share one
/// body type.
type ProxyBody = BoxBody<Bytes, hyper::Error>;

/// Front-door configuration.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Hostname whose traffic goes to the admin socket.
    pub admin_host: String,
    /// Secret required on the internal prefix.
    pub secret: String,
    /// Admin API socket.
    pub admin_socket: PathBuf,
    /// Worker-runtime socket.
    pub engine_socket: PathBuf,
}

/// A running front door bound to a TCP port.
///
/// Shutdown stops the accept loop; connections already accepted finish in
/// the background.
pub struct Proxy {
    server_handle: JoinHandle<()>,
    shutdown_tx: watch::Sender<bool>,
    local_addr: SocketAddr,
}

impl Proxy {
    /// Start accepting on an already-bound listener.
    pub fn start(listener: TcpListener, config: ProxyConfig) -> std::io::Result<Self> {
        let local_addr = listener.local_addr()?;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let server_handle = tokio::spawn(run_front_door(listener, Arc::new(config), shutdown_rx));

        info!(addr = %local_addr, "Front door started");

        Ok(Self {
            server_handle,
            shutdown_tx,
            local_addr,
        })
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Whether the accept loop is still running.
    pub fn is_running(&self) -> bool {
        !self.server_handle.is_finished()
    }

    /// Stop accepting and wait for the accept loop to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(err) = self.server_handle.await {
            error!("Front door task panicked: {}", err);
        }
        info!("Front door stopped");
    }
}

async fn run_front_door(
    listener: TcpListener,
    config: Arc<ProxyConfig>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            biased;

            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    info!("Front door received shutdown signal");
                    break;
                }
            }

            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, remote_addr)) => {
                        debug!(%remote_addr, "Accepted connection");
                        let config = config.clone();
                        tokio::spawn(async move {
                            let service =
                                service_fn(move |request| handle_request(request, config.clone()));
                            let connection = hyper::server::conn::http1::Builder::new()
                                .serve_connection(TokioIo::new(stream), service)
                                .with_upgrades();
                            if let Err(err) = connection.await {
                                debug!("Connection error: {}", err);
                            }
                        });
                    }
                    Err(err) => {
                        debug!("Failed to accept connection: {}", err);
                    }
                }
            }
        }
    }
}

/// One request, one decision. The secret gate answers locally; everything
/// else is forwarded to the socket the host classification picks.
async fn handle_request(
    request: Request<Incoming>,
    config: Arc<ProxyConfig>,
) -> Result<Response<ProxyBody>, Infallible> {
    if request.uri().path().starts_with(INTERNAL_PREFIX) {
        let presented = request
            .headers()
            .get(SECRET_HEADER)
            .and_then(|value| value.to_str().ok());
        if !secret_allows(presented, &config.secret) {
            debug!(path = request.uri().path(), "Denied internal-prefix request");
            return Ok(text_response(StatusCode::FORBIDDEN, "Forbidden"));
        }
    }

    let host = request
        .headers()
        .get(header::HOST)
        .and_then(|value| value.to_str().ok());
    let socket = match classify_host(host, &config.admin_host) {
        Backend::Admin => &config.admin_socket,
        Backend::Engine => &config.engine_socket,
    };

    match forward(request, socket).await {
        Ok(response) => Ok(response),
        Err(err) => {
            error!("Forwarding failed: {}", err);
            Ok(text_response(StatusCode::BAD_GATEWAY, "Bad Gateway"))
        }
    }
}

/// Forward a request over a fresh upstream connection, bridging an upgrade
/// when the upstream answers 101.
async fn forward(mut request: Request<Incoming>, socket: &Path) -> Result<Response<ProxyBody>, Error> {
    inject_forwarded_headers(request.headers_mut());

    // Taken before forwarding; resolves only if we later answer 101
    // downstream.
    let downstream_upgrade = hyper::upgrade::on(&mut request);

    let mut response = send_over_unix(socket, request).await?;

    if response.status() == StatusCode::SWITCHING_PROTOCOLS {
        let upstream_upgrade = hyper::upgrade::on(&mut response);
        tokio::spawn(bridge_upgrade(downstream_upgrade, upstream_upgrade));
    }

    Ok(response.map(|body| body.boxed()))
}

fn inject_forwarded_headers(headers: &mut HeaderMap) {
    if !headers.contains_key(FORWARDED_HOST) {
        if let Some(host) = headers.get(header::HOST).cloned() {
            headers.insert(FORWARDED_HOST, host);
        }
    }
    if !headers.contains_key(FORWARDED_PROTO) {
        headers.insert(FORWARDED_PROTO, HeaderValue::from_static("http"));
    }
}

async fn bridge_upgrade(downstream: OnUpgrade, upstream: OnUpgrade) {
    let (downstream, upstream) = match tokio::try_join!(downstream, upstream) {
        Ok(pair) => pair,
        Err(err) => {
            debug!("Upgrade did not complete on both legs: {}", err);
            return;
        }
    };

    let mut downstream = TokioIo::new(downstream);
    let mut upstream = TokioIo::new(upstream);
    match tokio::io::copy_bidirectional(&mut downstream, &mut upstream).await {
        Ok((from_client, from_backend)) => {
            debug!(from_client, from_backend, "Upgraded connection closed");
        }
        Err(err) => {
            debug!("Upgraded connection error: {}", err);
        }
    }
}

fn text_response(status: StatusCode, message: &'static str) -> Response<ProxyBody> {
    let body = Full::new(Bytes::from_static(message.as_bytes()))
        .map_err(|never| match never {})
        .boxed();
    let mut response = Response::new(body);
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

//! Shared-key access control
//!
//! Loopback clients are trusted. Everyone else must send the key in the
//! `x-api-key` header or the `api_key` query parameter.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use axum::{
    extract::{ConnectInfo, Query, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::error::ApiError;
use crate::state::AppState;

pub const API_KEY_HEADER: &str = "x-api-key";
pub const API_KEY_QUERY: &str = "api_key";

/// `127.0.0.1`, `::1` and the IPv4-mapped `::ffff:127.0.0.1`
pub fn is_loopback(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4 == std::net::Ipv4Addr::LOCALHOST,
        IpAddr::V6(v6) => {
            v6 == std::net::Ipv6Addr::LOCALHOST
                || v6.to_ipv4_mapped() == Some(std::net::Ipv4Addr::LOCALHOST)
        }
    }
}

pub async fn access_control(State(state): State<AppState>, request: Request, next: Next) -> Response {
    // No connection info means the peer is unknown; treat it as remote
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    if peer.map_or(false, |addr| is_loopback(addr.ip())) {
        return next.run(request).await;
    }

    if presented_key(&request).as_deref() == Some(&*state.api_key) {
        return next.run(request).await;
    }

    match peer {
        Some(addr) => warn!("Unauthorized access attempt from {}", addr.ip()),
        None => warn!("Unauthorized access attempt from unknown peer"),
    }
    ApiError::Forbidden.into_response()
}

fn presented_key(request: &Request) -> Option<String> {
    if let Some(value) = request.headers().get(API_KEY_HEADER) {
        return value.to_str().ok().map(str::to_string);
    }
    Query::<HashMap<String, String>>::try_from_uri(request.uri())
        .ok()
        .and_then(|Query(params)| params.get(API_KEY_QUERY).cloned())
}

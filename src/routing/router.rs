//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Send image-prefix paths to the current frame (or 404 when empty)
//! - Send every other path, and malformed requests, to the viewer page
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - The viewer page is rendered once; each response shares it
//! - The method is not inspected

use std::sync::Arc;

use crate::config::GatewayConfig;
use crate::frame::FrameCache;
use crate::http::viewer::render_viewer_page;
use crate::http::{HttpResponse, ParsedRequest};
use crate::routing::matcher::PathPrefixMatcher;

/// Which handler produced a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    Viewer,
    Image,
}

impl RouteKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteKind::Viewer => "viewer",
            RouteKind::Image => "image",
        }
    }
}

/// Maps parsed requests to responses.
#[derive(Debug, Clone)]
pub struct ResponseRouter {
    image: PathPrefixMatcher,
    page: Arc<str>,
    cache: FrameCache,
}

impl ResponseRouter {
    pub fn new(image_route: &str, refresh_fps: f64, cache: FrameCache) -> Self {
        Self {
            image: PathPrefixMatcher::new(image_route),
            page: Arc::from(render_viewer_page(image_route, refresh_fps)),
            cache,
        }
    }

    pub fn from_config(config: &GatewayConfig, cache: FrameCache) -> Self {
        Self::new(&config.viewer.image_route, config.viewer.refresh_fps, cache)
    }

    /// Classify a request without building a response.
    pub fn classify(&self, request: &ParsedRequest) -> RouteKind {
        match request.path() {
            Some(path) if self.image.matches(path) => RouteKind::Image,
            _ => RouteKind::Viewer,
        }
    }

    pub fn route(&self, request: &ParsedRequest) -> (RouteKind, HttpResponse) {
        let kind = self.classify(request);
        let response = match kind {
            RouteKind::Image => match self.cache.load() {
                Some(frame) => HttpResponse::image(frame),
                None => HttpResponse::not_found(),
            },
            RouteKind::Viewer => HttpResponse::html(Arc::clone(&self.page)),
        };
        (kind, response)
    }
}

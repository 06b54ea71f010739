//! Local server with on-demand article generation
//!
//! Generated files are served from the public directory. An article that was
//! not generated at build time is resolved on its first request and written
//! to disk for the next one; while that is in flight, other requests for the
//! same slug get the pending page.

use anyhow::Result;
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, Request, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::generator::{post_output_path, Generator};
use crate::listing::{Listing, NextPage};
use crate::Blog;

/// Server state
pub struct ServerState {
    blog: Blog,
    generator: Generator,
    /// Generate unknown articles on request
    on_demand: bool,
    /// Slugs whose generation is in flight
    in_flight: Mutex<HashSet<String>>,
}

impl ServerState {
    pub fn new(blog: &Blog, generator: Generator, on_demand: bool) -> Self {
        Self {
            blog: blog.clone(),
            generator,
            on_demand,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Mark `slug` as in flight, or `None` if it already is
    fn claim(&self, slug: &str) -> Option<InFlight<'_>> {
        let mut slugs = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if !slugs.insert(slug.to_string()) {
            return None;
        }
        Some(InFlight {
            slugs: &self.in_flight,
            slug: slug.to_string(),
        })
    }
}

/// Releases a claimed slug when dropped, including when the request is
/// dropped mid-fetch
struct InFlight<'a> {
    slugs: &'a Mutex<HashSet<String>>,
    slug: String,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut slugs = self.slugs.lock().unwrap_or_else(|e| e.into_inner());
        slugs.remove(&self.slug);
    }
}

/// Start the server
pub async fn start(blog: &Blog, ip: &str, port: u16, on_demand: bool) -> Result<()> {
    let generator = Generator::new(blog, blog.client()?)?;
    let state = Arc::new(ServerState::new(blog, generator, on_demand));
    let app = router(state);

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    println!("Server running at http://{}:{}", ip, port);
    if on_demand {
        println!("Posts missing from {:?} are generated on request.", blog.public_dir);
    }
    println!("Press Ctrl+C to stop.");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the router for `state`
pub fn router(state: Arc<ServerState>) -> Router {
    let post_dir = state.blog.config.post_dir.trim_matches('/').to_string();

    Router::new()
        .route(&format!("/{}/:slug", post_dir), get(post_handler))
        .route(&format!("/{}/:slug/", post_dir), get(post_handler))
        .route("/page/:page", get(page_handler))
        .route("/page/:page/", get(page_handler))
        .fallback(fallback_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve an article, generating it first if needed
async fn post_handler(State(state): State<Arc<ServerState>>, Path(slug): Path<String>) -> Response {
    let Ok(file_path) = post_output_path(&state.blog, &slug) else {
        return not_found(&state);
    };

    if let Ok(content) = tokio::fs::read_to_string(&file_path).await {
        return Html(content).into_response();
    }
    if !state.on_demand {
        return not_found(&state);
    }

    let Some(_guard) = state.claim(&slug) else {
        tracing::debug!("{} is already being generated", slug);
        return pending(&state);
    };

    match state.generator.generate_post(&slug).await {
        Ok(Some(html)) => {
            tracing::info!("Generated {} on request", slug);
            Html(html).into_response()
        }
        Ok(None) => not_found(&state),
        Err(e) => {
            tracing::error!("Failed to generate {}: {:#}", slug, e);
            (StatusCode::BAD_GATEWAY, "Failed to load post").into_response()
        }
    }
}

/// Serve the listing as it stands after `page - 1` loads
///
/// A failed load renders the posts loaded so far with a retry link.
async fn page_handler(State(state): State<Arc<ServerState>>, Path(page): Path<usize>) -> Response {
    if page == 0 {
        return not_found(&state);
    }

    let config = &state.blog.config;
    let client = state.generator.client();
    let query = Listing::query(&config.source.document_type, config.per_page);
    let mut listing = match Listing::initial_load(client, &query).await {
        Ok(listing) => listing,
        Err(e) => {
            tracing::error!("Failed to load listing: {}", e);
            return (StatusCode::BAD_GATEWAY, "Failed to load posts").into_response();
        }
    };

    for _ in 1..page {
        match listing.handle_next_page(client).await {
            Ok(NextPage::Appended(_)) => {}
            Ok(_) => break,
            Err(e) => {
                tracing::warn!("Failed to load more posts: {}", e);
                break;
            }
        }
    }

    match state.generator.renderer().render_index(&listing, page) {
        Ok(html) => Html(html).into_response(),
        Err(e) => internal_error(e),
    }
}

/// Serve generated files from the public directory
async fn fallback_handler(State(state): State<Arc<ServerState>>, request: Request<Body>) -> Response {
    let mut service = ServeDir::new(&state.blog.public_dir).append_index_html_on_directories(true);
    match service.try_call(request).await {
        Ok(response) if response.status() == StatusCode::NOT_FOUND => not_found(&state),
        Ok(response) => response.into_response(),
        Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response(),
    }
}

fn not_found(state: &ServerState) -> Response {
    match state.generator.renderer().render_not_found() {
        Ok(html) => (StatusCode::NOT_FOUND, Html(html)).into_response(),
        Err(e) => internal_error(e),
    }
}

fn pending(state: &ServerState) -> Response {
    match state.generator.renderer().render_pending() {
        Ok(html) => (
            StatusCode::SERVICE_UNAVAILABLE,
            [(header::RETRY_AFTER, "2")],
            Html(html),
        )
            .into_response(),
        Err(e) => internal_error(e),
    }
}

fn internal_error(e: anyhow::Error) -> Response {
    tracing::error!("Failed to render page: {:#}", e);
    (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response()
}

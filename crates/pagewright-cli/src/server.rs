//! Static file server for the app under test

use crate::error::{CliError, CliResult};
use axum::Router;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Address the app is served on
pub const SERVE_IP: Ipv4Addr = Ipv4Addr::LOCALHOST;

/// URL of the app served on `port`, using the bound address so that it does
/// not depend on how `localhost` resolves
#[must_use]
pub fn app_url(port: u16) -> String {
    format!("http://{SERVE_IP}:{port}")
}

/// Serves a directory over HTTP
#[derive(Debug, Clone)]
pub struct StaticServer {
    directory: PathBuf,
    port: u16,
}

impl StaticServer {
    /// Create a server for `directory` on `port` (0 picks a free port)
    #[must_use]
    pub fn new(directory: impl Into<PathBuf>, port: u16) -> Self {
        Self {
            directory: directory.into(),
            port,
        }
    }

    /// Served directory
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Router serving the directory, `index.html` for directory paths
    pub fn router(&self) -> Router {
        Router::new()
            .fallback_service(ServeDir::new(&self.directory))
            .layer(TraceLayer::new_for_http())
    }

    /// Bind and serve in the background
    pub async fn spawn(&self) -> CliResult<ServerHandle> {
        if !self.directory.is_dir() {
            return Err(CliError::server(format!(
                "directory not found: {}",
                self.directory.display()
            )));
        }

        let addr = SocketAddr::from((SERVE_IP, self.port));
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| CliError::server(format!("cannot bind {addr}: {e}")))?;
        let addr = listener.local_addr()?;

        let (shutdown, signal) = oneshot::channel::<()>();
        let app = self.router();
        let task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = signal.await;
                })
                .await
        });

        tracing::info!(%addr, directory = %self.directory.display(), "static server listening");
        Ok(ServerHandle {
            addr,
            shutdown: Some(shutdown),
            task,
        })
    }
}

/// Handle to a running [`StaticServer`]
#[derive(Debug)]
pub struct ServerHandle {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<std::io::Result<()>>,
}

impl ServerHandle {
    /// Bound address
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Base URL of the served app
    #[must_use]
    pub fn url(&self) -> String {
        app_url(self.addr.port())
    }

    /// Stop accepting connections and wait for in-flight requests
    pub async fn stop(mut self) -> CliResult<()> {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        let result = (&mut self.task)
            .await
            .map_err(|e| CliError::server(format!("server task failed: {e}")))?;
        tracing::info!(addr = %self.addr, "static server stopped");
        result.map_err(CliError::from)
    }

    /// Resolve when the server stops on its own
    pub async fn wait(&mut self) -> CliResult<()> {
        (&mut self.task)
            .await
            .map_err(|e| CliError::server(format!("server task failed: {e}")))?
            .map_err(CliError::from)
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tower::ServiceExt;

    fn app_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>catalog</h1>").unwrap();
        std::fs::create_dir(dir.path().join("js")).unwrap();
        std::fs::write(dir.path().join("js/app.js"), "angular.module('app', []);").unwrap();
        dir
    }

    mod router_tests {
        use super::*;

        #[tokio::test]
        async fn test_serves_index_for_root() {
            let dir = app_dir();
            let response = StaticServer::new(dir.path(), 0)
                .router()
                .oneshot(Request::get("/").body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            let body = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            assert_eq!(&body[..], b"<h1>catalog</h1>");
        }

        #[tokio::test]
        async fn test_serves_nested_file() {
            let dir = app_dir();
            let response = StaticServer::new(dir.path(), 0)
                .router()
                .oneshot(Request::get("/js/app.js").body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        #[tokio::test]
        async fn test_missing_file_is_404() {
            let dir = app_dir();
            let response = StaticServer::new(dir.path(), 0)
                .router()
                .oneshot(Request::get("/nope.css").body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND);
        }
    }

    mod spawn_tests {
        use super::*;

        #[tokio::test]
        async fn test_spawn_and_stop() {
            let dir = app_dir();
            let handle = StaticServer::new(dir.path(), 0).spawn().await.unwrap();
            let addr = handle.addr();
            assert_ne!(addr.port(), 0);
            assert_eq!(handle.url(), format!("http://127.0.0.1:{}", addr.port()));
            assert!(addr.ip().is_loopback());

            let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
            stream
                .write_all(b"GET / HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
                .await
                .unwrap();
            let mut response = String::new();
            stream.read_to_string(&mut response).await.unwrap();
            assert!(response.starts_with("HTTP/1.1 200"));
            assert!(response.ends_with("<h1>catalog</h1>"));

            handle.stop().await.unwrap();
            assert!(tokio::net::TcpStream::connect(addr).await.is_err());
        }

        #[tokio::test]
        async fn test_missing_directory() {
            let err = StaticServer::new("/nonexistent/app", 0)
                .spawn()
                .await
                .unwrap_err();
            assert!(matches!(err, CliError::Server { .. }));
        }

        #[tokio::test]
        async fn test_port_in_use() {
            let dir = app_dir();
            let first = StaticServer::new(dir.path(), 0).spawn().await.unwrap();
            let err = StaticServer::new(dir.path(), first.addr().port())
                .spawn()
                .await
                .unwrap_err();
            assert!(err.to_string().contains("cannot bind"));
            first.stop().await.unwrap();
        }
    }
}

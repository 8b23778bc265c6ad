//! Fixtures shared by the unit tests: generated JPEGs and a local origin

use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use image::codecs::jpeg::JpegEncoder;
use image::{GrayImage, Luma, Rgb, RgbImage};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;

pub fn sample_jpeg(width: u32, height: u32) -> Vec<u8> {
    let image = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    });
    let mut bytes = Vec::new();
    JpegEncoder::new(&mut bytes).encode_image(&image).unwrap();
    bytes
}

pub fn sample_gray_jpeg(width: u32, height: u32) -> Vec<u8> {
    let image = GrayImage::from_fn(width, height, |x, y| Luma([((x * y) % 256) as u8]));
    let mut bytes = Vec::new();
    JpegEncoder::new(&mut bytes).encode_image(&image).unwrap();
    bytes
}

/// A plain-http origin on an ephemeral port that counts the requests it serves
pub struct Origin {
    addr: SocketAddr,
    requests: Arc<AtomicUsize>,
}

impl Origin {
    /// Serves:
    /// - `/images/cat.jpg`: a 400x200 JPEG
    /// - `/images/notes.txt`: plain text
    /// - `/images/garbage.jpg`: non-JPEG bytes labelled as JPEG
    /// - `/images/huge.jpg`: 4 KiB labelled as JPEG
    /// - anything else: 404
    pub async fn spawn() -> Self {
        let requests = Arc::new(AtomicUsize::new(0));
        let cat = sample_jpeg(400, 200);

        let router = Router::new()
            .route(
                "/images/cat.jpg",
                get(move || {
                    let cat = cat.clone();
                    async move { ([(header::CONTENT_TYPE, "image/jpeg")], cat) }
                }),
            )
            .route(
                "/images/notes.txt",
                get(|| async { ([(header::CONTENT_TYPE, "text/plain")], "just text") }),
            )
            .route(
                "/images/garbage.jpg",
                get(|| async { ([(header::CONTENT_TYPE, "image/jpeg")], "not really a jpeg") }),
            )
            .route(
                "/images/huge.jpg",
                get(|| async { ([(header::CONTENT_TYPE, "image/jpeg")], vec![0u8; 4096]) }),
            )
            .layer(middleware::from_fn_with_state(
                Arc::clone(&requests),
                count_requests,
            ));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self { addr, requests }
    }

    /// Scheme-less source for a path on this origin
    pub fn source(&self, path: &str) -> String {
        format!("{}/{}", self.addr, path.trim_start_matches('/'))
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

async fn count_requests(
    State(requests): State<Arc<AtomicUsize>>,
    request: Request,
    next: Next,
) -> Response {
    requests.fetch_add(1, Ordering::SeqCst);
    next.run(request).await.into_response()
}

//! Artifact store adapters

mod http;

pub use http::HttpAssetUploader;

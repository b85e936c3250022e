//! Utility functions
//!
use std::{
    fs::File,
    io::Cursor,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use reqwest::Client;

/// Name of the cache directory for downloaded models.
const CACHE_DIR_NAME: &str = "fashion_classifier";

/// Download a file from a URL to a given filepath.
///
/// The body is staged in a `.part` sibling and only moved to `filepath` once complete, so an
/// interrupted download never leaves a truncated file behind.
pub async fn download_file(client: &Client, url: &str, filepath: impl AsRef<Path>) -> Result<()> {
    let filepath = filepath.as_ref();
    let part_path = part_path(filepath);

    let result = download_to(client, url, &part_path).await;
    if result.is_err() {
        std::fs::remove_file(&part_path).ok();
    }
    result?;

    std::fs::rename(&part_path, filepath)?;

    Ok(())
}

async fn download_to(client: &Client, url: &str, filepath: &Path) -> Result<()> {
    let resp = client.get(url).send().await?.error_for_status()?;
    let mut content = Cursor::new(resp.bytes().await?);

    let mut file = File::create(filepath)?;
    std::io::copy(&mut content, &mut file)?;
    file.sync_all()?;

    Ok(())
}

fn part_path(filepath: &Path) -> PathBuf {
    let mut name = filepath.file_name().unwrap_or_default().to_owned();
    name.push(".part");
    filepath.with_file_name(name)
}

/// Resolve the model file, downloading it to the cache directory if a URL is given.
///
/// An existing file at `path` always wins. Otherwise the model is fetched from `url` once and
/// reused from the cache on later starts.
pub async fn ensure_model(path: &Path, url: Option<&str>) -> Result<PathBuf> {
    if path.exists() {
        return Ok(path.to_owned());
    }

    let cache_dir = dirs::cache_dir()
        .context("no cache directory available")?
        .join(CACHE_DIR_NAME);

    ensure_model_in(path, url, &cache_dir).await
}

async fn ensure_model_in(path: &Path, url: Option<&str>, cache_dir: &Path) -> Result<PathBuf> {
    let Some(url) = url else {
        bail!("model file {} not found and no URL given", path.display());
    };

    let file_name = path.file_name().context("model path has no file name")?;
    std::fs::create_dir_all(cache_dir)?;

    let cached = cache_dir.join(file_name);
    if cached.exists() {
        log::info!("Using cached model {}", cached.display());
        return Ok(cached);
    }

    log::info!("Downloading model from {} to {}", url, cached.display());
    download_file(&Client::new(), url, &cached)
        .await
        .with_context(|| format!("failed to download model from {url}"))?;

    Ok(cached)
}

#[cfg(test)]
mod test {
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
    };

    use super::*;

    /// Answer one request per entry of `responses`, closing the connection afterwards.
    async fn serve_responses(responses: Vec<&'static str>) -> Result<String> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        tokio::spawn(async move {
            for response in responses {
                let (mut socket, _) = listener.accept().await?;

                let mut request = Vec::new();
                let mut buf = [0_u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    let n = socket.read(&mut buf).await?;
                    if n == 0 {
                        break;
                    }
                    request.extend_from_slice(&buf[..n]);
                }

                socket.write_all(response.as_bytes()).await?;
                socket.shutdown().await?;
            }
            Ok::<_, std::io::Error>(())
        });

        Ok(format!("http://{addr}/fashion_mnist.onnx"))
    }

    #[tokio::test]
    async fn test_existing_path_is_used() -> Result<()> {
        let path = std::env::temp_dir().join("fashion_server_existing_model.onnx");
        File::create(&path)?;

        let resolved = ensure_model(&path, Some("http://127.0.0.1:9/unused")).await?;
        assert_eq!(resolved, path);

        std::fs::remove_file(&path)?;
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_without_url() {
        let path = Path::new("definitely/missing/model.onnx");
        assert!(ensure_model(path, None).await.is_err());
    }

    #[tokio::test]
    async fn test_interrupted_download_is_not_cached() -> Result<()> {
        let cache_dir = std::env::temp_dir().join("fashion_server_download_cache");
        std::fs::remove_dir_all(&cache_dir).ok();
        let path = Path::new("missing/fashion_mnist.onnx");
        let cached = cache_dir.join("fashion_mnist.onnx");

        let url = serve_responses(vec![
            "HTTP/1.1 200 OK\r\nContent-Length: 100000\r\n\r\nabc",
            "HTTP/1.1 200 OK\r\nContent-Length: 5\r\nConnection: close\r\n\r\nmodel",
        ])
        .await?;

        // Connection drops mid-body
        assert!(ensure_model_in(path, Some(&url), &cache_dir).await.is_err());
        assert!(!cached.exists());
        assert!(!part_path(&cached).exists());

        // Next start downloads again instead of reusing a truncated file
        let resolved = ensure_model_in(path, Some(&url), &cache_dir).await?;
        assert_eq!(resolved, cached);
        assert_eq!(std::fs::read(&cached)?, b"model");

        // Complete downloads are reused
        let resolved = ensure_model_in(path, Some(&url), &cache_dir).await?;
        assert_eq!(resolved, cached);

        std::fs::remove_dir_all(&cache_dir)?;
        Ok(())
    }

    #[tokio::test]
    async fn test_http_error_is_not_cached() -> Result<()> {
        let cache_dir = std::env::temp_dir().join("fashion_server_error_cache");
        std::fs::remove_dir_all(&cache_dir).ok();
        let path = Path::new("missing/fashion_mnist.onnx");

        let url = serve_responses(vec![
            "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        ])
        .await?;

        assert!(ensure_model_in(path, Some(&url), &cache_dir).await.is_err());
        assert!(!cache_dir.join("fashion_mnist.onnx").exists());

        std::fs::remove_dir_all(&cache_dir)?;
        Ok(())
    }
}

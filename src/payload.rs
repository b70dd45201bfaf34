use std::path::Path;

use rand::distr::Alphanumeric;
use rand::Rng;

pub const DEFAULT_PAYLOAD: &str = "./fileForInsert.txt";

/// Name the payload is stored under in the blob bucket.
pub fn blob_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "fileForInsert.txt".to_string())
}

/// Size of the payload file; errors when it is missing or not a regular file.
pub async fn check_payload(path: &Path) -> std::io::Result<u64> {
    let metadata = tokio::fs::metadata(path).await?;
    if !metadata.is_file() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("{} is not a regular file", path.display()),
        ));
    }
    Ok(metadata.len())
}

/// Writes `size` random alphanumeric bytes to `path`.
pub fn generate_payload(path: &Path, size: usize) -> std::io::Result<()> {
    let content: Vec<u8> = rand::rng().sample_iter(Alphanumeric).take(size).collect();
    std::fs::write(path, content)
}

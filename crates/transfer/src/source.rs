use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use crate::TransferError;

/// Where upload bytes come from.
///
/// In-memory sources are sliced without copying. File sources are sized
/// from metadata and read lazily, so a multipart worker only ever loads
/// its own part.
#[derive(Debug, Clone)]
pub enum UploadSource {
    Bytes(Bytes),
    Path(PathBuf),
}

impl UploadSource {
    /// Total size in bytes.
    pub async fn size(&self) -> Result<u64, TransferError> {
        match self {
            Self::Bytes(data) => Ok(data.len() as u64),
            Self::Path(path) => Ok(tokio::fs::metadata(path).await?.len()),
        }
    }

    /// Reads the whole source.
    pub async fn read_all(&self) -> Result<Bytes, TransferError> {
        match self {
            Self::Bytes(data) => Ok(data.clone()),
            Self::Path(path) => Ok(Bytes::from(tokio::fs::read(path).await?)),
        }
    }

    /// Reads `[start, end)`.
    pub async fn read_range(&self, start: u64, end: u64) -> Result<Bytes, TransferError> {
        match self {
            Self::Bytes(data) => {
                let len = data.len() as u64;
                if start > end || end > len {
                    return Err(TransferError::RangeOutOfBounds { start, end, len });
                }
                Ok(data.slice(start as usize..end as usize))
            }
            Self::Path(path) => {
                if start > end {
                    return Err(TransferError::RangeOutOfBounds {
                        start,
                        end,
                        len: self.size().await?,
                    });
                }
                let mut file = tokio::fs::File::open(path).await?;
                file.seek(SeekFrom::Start(start)).await?;
                let mut buf = vec![0u8; (end - start) as usize];
                file.read_exact(&mut buf).await?;
                Ok(Bytes::from(buf))
            }
        }
    }
}

impl From<Bytes> for UploadSource {
    fn from(data: Bytes) -> Self {
        Self::Bytes(data)
    }
}

impl From<Vec<u8>> for UploadSource {
    fn from(data: Vec<u8>) -> Self {
        Self::Bytes(Bytes::from(data))
    }
}

impl From<&'static [u8]> for UploadSource {
    fn from(data: &'static [u8]) -> Self {
        Self::Bytes(Bytes::from_static(data))
    }
}

impl From<PathBuf> for UploadSource {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&Path> for UploadSource {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

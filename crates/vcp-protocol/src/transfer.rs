//! Chunked file streaming over a connected stream.
//!
//! A file travels as an 8-byte big-endian size header followed by exactly
//! that many raw bytes. The size header establishes the total, so the
//! content is not frame-wrapped.

use std::path::{Path, PathBuf};

use tokio::fs::{self, File};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::error::{ProtocolError, TransferError, TransferResult};
use crate::names::PARTIAL_SUFFIX;

/// Bytes moved per read/write call.
pub const CHUNK_SIZE: usize = 8192;

/// Observer for interactive progress display. Never affects the protocol.
pub trait Progress {
    fn update(&mut self, transferred: u64, total: u64);
}

impl<F: FnMut(u64, u64)> Progress for F {
    fn update(&mut self, transferred: u64, total: u64) {
        self(transferred, total)
    }
}

/// Progress sink that reports nothing.
pub struct Silent;

impl Progress for Silent {
    fn update(&mut self, _transferred: u64, _total: u64) {}
}

/// A local file opened and sized, ready to be streamed.
///
/// Opening is split from sending so callers can announce the file (for
/// example with a path frame) only once it is known to be readable.
#[derive(Debug)]
pub struct OutgoingFile {
    path: PathBuf,
    file: File,
    len: u64,
}

impl OutgoingFile {
    pub async fn open(path: impl AsRef<Path>) -> TransferResult<Self> {
        let path = path.as_ref().to_path_buf();
        let open_err = |source| TransferError::Open {
            path: path.clone(),
            source,
        };
        let file = File::open(&path).await.map_err(open_err)?;
        let meta = file.metadata().await.map_err(open_err)?;
        if !meta.is_file() {
            return Err(open_err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "not a regular file",
            )));
        }
        Ok(Self {
            len: meta.len(),
            path,
            file,
        })
    }

    /// Size announced in the header.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the size header and the content in chunks of at most
    /// [`CHUNK_SIZE`] bytes.
    pub async fn send<W, P>(mut self, writer: &mut W, progress: &mut P) -> TransferResult<u64>
    where
        W: AsyncWrite + Unpin + ?Sized,
        P: Progress + ?Sized,
    {
        writer
            .write_all(&self.len.to_be_bytes())
            .await
            .map_err(ProtocolError::from)?;

        let mut buf = vec![0u8; CHUNK_SIZE];
        let mut sent = 0u64;
        while sent < self.len {
            let want = (self.len - sent).min(CHUNK_SIZE as u64) as usize;
            let n = self
                .file
                .read(&mut buf[..want])
                .await
                .map_err(|source| TransferError::Source {
                    path: self.path.clone(),
                    source,
                })?;
            if n == 0 {
                return Err(TransferError::SourceTruncated {
                    path: self.path,
                    sent,
                    expected: self.len,
                });
            }
            writer
                .write_all(&buf[..n])
                .await
                .map_err(ProtocolError::from)?;
            sent += n as u64;
            progress.update(sent, self.len);
        }
        writer.flush().await.map_err(ProtocolError::from)?;
        debug!(path = %self.path.display(), bytes = sent, "file sent");
        Ok(sent)
    }
}

/// Open `path` and stream it to `writer`.
pub async fn send_file<W, P>(writer: &mut W, path: &Path, progress: &mut P) -> TransferResult<u64>
where
    W: AsyncWrite + Unpin + ?Sized,
    P: Progress + ?Sized,
{
    OutgoingFile::open(path).await?.send(writer, progress).await
}

async fn read_size_header<R>(reader: &mut R) -> TransferResult<u64>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut header = [0u8; 8];
    reader
        .read_exact(&mut header)
        .await
        .map_err(ProtocolError::from)?;
    Ok(u64::from_be_bytes(header))
}

/// Destination being filled. The partial file is removed on drop unless
/// [`PartialFile::commit`] renamed it into place.
struct PartialFile {
    part: PathBuf,
    file: Option<File>,
}

impl PartialFile {
    async fn create(dest: &Path) -> std::io::Result<Self> {
        let name = dest.file_name().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "destination has no file name")
        })?;
        if let Some(parent) = dest.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let mut part_name = name.to_os_string();
        part_name.push(PARTIAL_SUFFIX);
        let part = dest.with_file_name(part_name);
        let file = File::create(&part).await?;
        Ok(Self {
            part,
            file: Some(file),
        })
    }

    async fn write(&mut self, data: &[u8]) -> std::io::Result<()> {
        match self.file.as_mut() {
            Some(file) => file.write_all(data).await,
            None => Ok(()),
        }
    }

    async fn commit(mut self, dest: &Path) -> std::io::Result<()> {
        if let Some(mut file) = self.file.take() {
            file.flush().await?;
            file.sync_all().await?;
        }
        fs::rename(&self.part, dest).await?;
        self.part = PathBuf::new();
        Ok(())
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if !self.part.as_os_str().is_empty() {
            let _ = std::fs::remove_file(&self.part);
        }
    }
}

/// Read a size header and exactly that many bytes into `save_path`.
///
/// Parent directories are created as needed. Content lands in a sibling
/// partial file that is renamed over `save_path` only once every declared
/// byte has arrived; on any failure the partial file is removed.
///
/// A local write failure does not stop the read loop: the remaining bytes
/// are consumed and discarded so the stream stays aligned, and
/// [`TransferError::Storage`] is returned.
pub async fn recv_file<R, P>(reader: &mut R, save_path: &Path, progress: &mut P) -> TransferResult<u64>
where
    R: AsyncRead + Unpin + ?Sized,
    P: Progress + ?Sized,
{
    let total = read_size_header(reader).await?;

    let mut local_err = None;
    let mut sink = match PartialFile::create(save_path).await {
        Ok(sink) => Some(sink),
        Err(e) => {
            local_err = Some(e);
            None
        }
    };

    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut received = 0u64;
    while received < total {
        let want = (total - received).min(CHUNK_SIZE as u64) as usize;
        let n = reader
            .read(&mut buf[..want])
            .await
            .map_err(ProtocolError::from)?;
        if n == 0 {
            return Err(ProtocolError::ConnectionClosed.into());
        }
        if let Some(file) = sink.as_mut() {
            if let Err(e) = file.write(&buf[..n]).await {
                local_err = Some(e);
                sink = None;
            }
        }
        received += n as u64;
        progress.update(received, total);
    }

    if let Some(source) = local_err {
        return Err(TransferError::Storage {
            path: save_path.to_path_buf(),
            source,
        });
    }
    if let Some(file) = sink {
        file.commit(save_path)
            .await
            .map_err(|source| TransferError::Storage {
                path: save_path.to_path_buf(),
                source,
            })?;
    }
    debug!(path = %save_path.display(), bytes = total, "file received");
    Ok(total)
}

/// Consume one file stream without storing it.
pub async fn drain_file<R>(reader: &mut R) -> TransferResult<u64>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let total = read_size_header(reader).await?;
    let mut limited = reader.take(total);
    let copied = tokio::io::copy(&mut limited, &mut tokio::io::sink())
        .await
        .map_err(ProtocolError::from)?;
    if copied < total {
        return Err(ProtocolError::ConnectionClosed.into());
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tokio::io::duplex;

    async fn roundtrip(content: &[u8], pipe: usize) -> Vec<u8> {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src.bin");
        let dest = dir.path().join("out/nested/dest.bin");
        std::fs::write(&src, content).unwrap();

        let (mut a, mut b) = duplex(pipe);
        let sender = {
            let src = src.clone();
            tokio::spawn(async move { send_file(&mut a, &src, &mut Silent).await })
        };
        let n = recv_file(&mut b, &dest, &mut Silent).await.unwrap();
        assert_eq!(sender.await.unwrap().unwrap(), n);
        std::fs::read(&dest).unwrap()
    }

    #[tokio::test]
    async fn zero_length_file() {
        assert!(roundtrip(b"", 64).await.is_empty());
    }

    #[tokio::test]
    async fn multi_chunk_file_with_small_pipe() {
        let content: Vec<u8> = (0..(CHUNK_SIZE * 3 + 17)).map(|i| (i % 256) as u8).collect();
        assert_eq!(roundtrip(&content, 100).await, content);
    }

    #[tokio::test]
    async fn size_header_is_eight_bytes_big_endian() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("five");
        std::fs::write(&src, b"hello").unwrap();
        let mut out = Vec::new();
        send_file(&mut out, &src, &mut Silent).await.unwrap();
        assert_eq!(&out[..8], &5u64.to_be_bytes());
        assert_eq!(&out[8..], b"hello");
    }

    #[tokio::test]
    async fn missing_source_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut out = Vec::new();
        let err = send_file(&mut out, &dir.path().join("missing"), &mut Silent)
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::Open { .. }));
        assert!(!err.is_fatal());
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn short_stream_discards_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("dest.bin");
        let (mut a, mut b) = duplex(64);
        a.write_all(&10u64.to_be_bytes()).await.unwrap();
        a.write_all(b"abc").await.unwrap();
        drop(a);

        let err = recv_file(&mut b, &dest, &mut Silent).await.unwrap_err();
        assert!(err.is_fatal());
        assert!(!dest.exists());
        let leftovers: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert!(leftovers.is_empty(), "partial file left behind");
    }

    #[tokio::test]
    async fn storage_failure_still_consumes_declared_bytes() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where a parent directory is needed.
        std::fs::write(dir.path().join("blocker"), b"").unwrap();
        let dest = dir.path().join("blocker/child.txt");

        let mut wire = Vec::new();
        wire.extend_from_slice(&4u64.to_be_bytes());
        wire.extend_from_slice(b"data");
        wire.extend_from_slice(b"NEXT");
        let mut reader = &wire[..];

        let err = recv_file(&mut reader, &dest, &mut Silent).await.unwrap_err();
        assert!(matches!(err, TransferError::Storage { .. }));
        assert!(!err.is_fatal());
        assert_eq!(reader, b"NEXT");
    }

    #[tokio::test]
    async fn progress_reaches_total() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("p");
        std::fs::write(&src, vec![1u8; CHUNK_SIZE + 1]).unwrap();
        let mut last = (0, 0);
        let mut out = Vec::new();
        send_file(&mut out, &src, &mut |done: u64, total: u64| last = (done, total))
            .await
            .unwrap();
        assert_eq!(last, (CHUNK_SIZE as u64 + 1, CHUNK_SIZE as u64 + 1));
    }

    #[tokio::test]
    async fn drain_skips_exactly_one_file() {
        let mut wire = Vec::new();
        wire.extend_from_slice(&3u64.to_be_bytes());
        wire.extend_from_slice(b"xyzREST");
        let mut reader = &wire[..];
        assert_eq!(drain_file(&mut reader).await.unwrap(), 3);
        assert_eq!(reader, b"REST");
    }

    #[tokio::test]
    async fn drain_reports_short_stream() {
        let mut wire = Vec::new();
        wire.extend_from_slice(&9u64.to_be_bytes());
        wire.extend_from_slice(b"xy");
        let mut reader = &wire[..];
        assert!(drain_file(&mut reader).await.unwrap_err().is_fatal());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn any_file_roundtrips(content in proptest::collection::vec(any::<u8>(), 0..20_000)) {
            let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
            let got = rt.block_on(roundtrip(&content, 1024));
            prop_assert_eq!(got, content);
        }
    }
}

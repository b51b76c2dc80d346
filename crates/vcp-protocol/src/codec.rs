use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{ProtocolError, ProtocolResult};

/// Largest frame payload a receiver will allocate for.
///
/// Frames carry command names, tokens, project names, and paths; a larger
/// declared length is treated as a malformed frame.
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

/// Ack value for success.
pub const ACK_OK: u32 = 1;
/// Ack value for failure. Any value other than [`ACK_OK`] reads as failure.
pub const ACK_FAIL: u32 = 0;

/// Write one frame: `[4 bytes BE length][payload]`.
pub async fn send_frame<W>(writer: &mut W, payload: &[u8]) -> ProtocolResult<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    if payload.len() > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge {
            size: payload.len(),
            max: MAX_FRAME_LEN,
        });
    }
    let mut buf = Vec::with_capacity(4 + payload.len());
    buf.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    buf.extend_from_slice(payload);
    writer.write_all(&buf).await?;
    writer.flush().await?;
    Ok(())
}

/// Write the zero-length frame that terminates a list.
pub async fn send_end<W>(writer: &mut W) -> ProtocolResult<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    send_frame(writer, &[]).await
}

/// Read exactly one frame and return its payload.
pub async fn recv_frame<R>(reader: &mut R) -> ProtocolResult<Vec<u8>>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await?;
    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge {
            size: len,
            max: MAX_FRAME_LEN,
        });
    }
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Ok(payload)
}

/// Read one frame and decode it as UTF-8.
pub async fn recv_string<R>(reader: &mut R) -> ProtocolResult<String>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let payload = recv_frame(reader).await?;
    String::from_utf8(payload).map_err(|_| ProtocolError::InvalidUtf8)
}

/// Write a bare 4-byte acknowledgement.
pub async fn send_ack<W>(writer: &mut W, ok: bool) -> ProtocolResult<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let value = if ok { ACK_OK } else { ACK_FAIL };
    writer.write_all(&value.to_be_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

/// Read a bare 4-byte acknowledgement.
pub async fn recv_ack<R>(reader: &mut R) -> ProtocolResult<bool>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf).await?;
    Ok(u32::from_be_bytes(buf) == ACK_OK)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tokio::io::duplex;

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn frame_wire_layout() {
        let (mut a, mut b) = duplex(64);
        send_frame(&mut a, b"LIST").await.unwrap();
        let mut raw = [0u8; 8];
        b.read_exact(&mut raw).await.unwrap();
        assert_eq!(raw, [0, 0, 0, 4, b'L', b'I', b'S', b'T']);
    }

    #[tokio::test]
    async fn empty_frame_roundtrip() {
        let (mut a, mut b) = duplex(64);
        send_end(&mut a).await.unwrap();
        assert!(recv_frame(&mut b).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn frame_larger_than_pipe_buffer() {
        // The duplex buffer is smaller than the frame, so both sides must
        // loop over partial transfers.
        let (mut a, mut b) = duplex(7);
        let payload: Vec<u8> = (0..5000u32).map(|i| (i % 251) as u8).collect();
        let expected = payload.clone();
        let writer = tokio::spawn(async move { send_frame(&mut a, &payload).await });
        let got = recv_frame(&mut b).await.unwrap();
        writer.await.unwrap().unwrap();
        assert_eq!(got, expected);
    }

    #[tokio::test]
    async fn truncated_frame_is_connection_closed() {
        let (mut a, mut b) = duplex(64);
        a.write_all(&[0, 0, 0, 10, b'x', b'y']).await.unwrap();
        drop(a);
        let err = recv_frame(&mut b).await.unwrap_err();
        assert!(matches!(err, ProtocolError::ConnectionClosed));
    }

    #[tokio::test]
    async fn closed_before_length_is_connection_closed() {
        let (a, mut b) = duplex(64);
        drop(a);
        assert!(matches!(
            recv_frame(&mut b).await.unwrap_err(),
            ProtocolError::ConnectionClosed
        ));
    }

    #[tokio::test]
    async fn oversized_length_is_rejected_without_allocating() {
        let (mut a, mut b) = duplex(64);
        a.write_all(&u32::MAX.to_be_bytes()).await.unwrap();
        let err = recv_frame(&mut b).await.unwrap_err();
        assert!(matches!(err, ProtocolError::FrameTooLarge { .. }));
    }

    #[tokio::test]
    async fn oversized_payload_is_not_sent() {
        let (mut a, _b) = duplex(64);
        let big = vec![0u8; MAX_FRAME_LEN + 1];
        assert!(matches!(
            send_frame(&mut a, &big).await.unwrap_err(),
            ProtocolError::FrameTooLarge { .. }
        ));
    }

    #[tokio::test]
    async fn non_utf8_string_is_rejected() {
        let (mut a, mut b) = duplex(64);
        send_frame(&mut a, &[0xff, 0xfe]).await.unwrap();
        assert!(matches!(
            recv_string(&mut b).await.unwrap_err(),
            ProtocolError::InvalidUtf8
        ));
    }

    #[tokio::test]
    async fn ack_values() {
        let (mut a, mut b) = duplex(64);
        send_ack(&mut a, true).await.unwrap();
        send_ack(&mut a, false).await.unwrap();
        a.write_all(&7u32.to_be_bytes()).await.unwrap();
        assert!(recv_ack(&mut b).await.unwrap());
        assert!(!recv_ack(&mut b).await.unwrap());
        assert!(!recv_ack(&mut b).await.unwrap());
    }

    #[tokio::test]
    async fn ack_is_exactly_four_bytes() {
        let (mut a, mut b) = duplex(64);
        send_ack(&mut a, true).await.unwrap();
        drop(a);
        let mut raw = Vec::new();
        b.read_to_end(&mut raw).await.unwrap();
        assert_eq!(raw, vec![0, 0, 0, 1]);
    }

    proptest! {
        #[test]
        fn any_bytes_roundtrip(payload in proptest::collection::vec(any::<u8>(), 0..4096)) {
            let got = runtime().block_on(async {
                let (mut a, mut b) = duplex(512);
                let sent = payload.clone();
                let writer = tokio::spawn(async move { send_frame(&mut a, &sent).await });
                let got = recv_frame(&mut b).await.unwrap();
                writer.await.unwrap().unwrap();
                got
            });
            prop_assert_eq!(got, payload);
        }
    }
}

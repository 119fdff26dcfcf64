// mmo_world_server/server/src/network/codec.rs
use crate::core::constants::FRAME_HEAD_LEN;
use crate::core::error::{ServerError, ServerResult};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io::ErrorKind;
use tokio::io::{AsyncRead, AsyncReadExt};

/// One framed message: `[data_len: u32 LE][msg_id: u32 LE][data]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: u32,
    pub data: Bytes,
}

impl Message {
    pub fn new(id: u32, data: impl Into<Bytes>) -> Self {
        Message { id, data: data.into() }
    }
}

pub fn pack(msg_id: u32, data: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(FRAME_HEAD_LEN + data.len());
    buf.put_u32_le(data.len() as u32);
    buf.put_u32_le(msg_id);
    buf.put_slice(data);
    buf.freeze()
}

/// Parses a frame header into `(data_len, msg_id)`.
pub fn unpack_head(mut head: &[u8], max_packet_size: usize) -> ServerResult<(usize, u32)> {
    if head.len() < FRAME_HEAD_LEN {
        return Err(ServerError::DecodeError(format!(
            "frame header needs {} bytes, got {}",
            FRAME_HEAD_LEN,
            head.len()
        )));
    }
    let data_len = head.get_u32_le() as usize;
    let msg_id = head.get_u32_le();
    if data_len > max_packet_size {
        return Err(ServerError::PacketTooLarge { size: data_len, limit: max_packet_size });
    }
    Ok((data_len, msg_id))
}

/// Reads the next frame. `Ok(None)` means the peer closed the stream cleanly
/// between frames.
pub async fn read_message<R>(reader: &mut R, max_packet_size: usize) -> ServerResult<Option<Message>>
where
    R: AsyncRead + Unpin,
{
    let mut head = [0u8; FRAME_HEAD_LEN];
    match reader.read_exact(&mut head).await {
        Ok(_) => {}
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let (data_len, msg_id) = unpack_head(&head, max_packet_size)?;
    let mut data = vec![0u8; data_len];
    if data_len > 0 {
        reader.read_exact(&mut data).await?;
    }
    Ok(Some(Message::new(msg_id, data)))
}

//! Length-prefixed framing over a byte stream.
//!
//! A frame is `size[4] type[1] payload`, `size` little endian and counting
//! itself. The decoder yields the frame body (`type` and payload); the
//! encoder takes a body and prepends the size.

use {
    crate::{
        error::FrameError,
        fcall::{DEFAULT_MSIZE, MIN_FRAME_SIZE},
    },
    bytes::{Buf, BufMut, Bytes, BytesMut},
    tokio_util::codec::{Decoder, Encoder},
};

const SIZE_FIELD: usize = 4;

/// `tokio_util` codec cutting a stream into 9P frames.
///
/// The same ceiling bounds frames in both directions. It is adjusted with
/// [`set_max_frame_size`](Self::set_max_frame_size) after each version
/// negotiation.
#[derive(Clone, Debug)]
pub struct FrameCodec {
    max_frame_size: u32,
}

impl FrameCodec {
    pub fn new(max_frame_size: u32) -> FrameCodec {
        FrameCodec { max_frame_size }
    }

    pub fn max_frame_size(&self) -> u32 {
        self.max_frame_size
    }

    pub fn set_max_frame_size(&mut self, max_frame_size: u32) {
        self.max_frame_size = max_frame_size;
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        FrameCodec::new(DEFAULT_MSIZE)
    }
}

impl Decoder for FrameCodec {
    type Item = BytesMut;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<BytesMut>, FrameError> {
        if src.len() < SIZE_FIELD {
            return Ok(None);
        }

        let mut prefix = [0u8; SIZE_FIELD];
        prefix.copy_from_slice(&src[..SIZE_FIELD]);
        let size = u32::from_le_bytes(prefix);
        if size < MIN_FRAME_SIZE || size > self.max_frame_size {
            return Err(FrameError::BadSize {
                size,
                max: self.max_frame_size,
            });
        }

        let size = size as usize;
        if src.len() < size {
            src.reserve(size - src.len());
            return Ok(None);
        }

        src.advance(SIZE_FIELD);
        Ok(Some(src.split_to(size - SIZE_FIELD)))
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<BytesMut>, FrameError> {
        match self.decode(buf)? {
            Some(frame) => Ok(Some(frame)),
            None if buf.is_empty() => Ok(None),
            None => Err(FrameError::Truncated),
        }
    }
}

impl Encoder<Bytes> for FrameCodec {
    type Error = FrameError;

    fn encode(&mut self, body: Bytes, dst: &mut BytesMut) -> Result<(), FrameError> {
        let size = SIZE_FIELD + body.len();
        if size > self.max_frame_size as usize {
            return Err(FrameError::BadSize {
                size: u32::try_from(size).unwrap_or(u32::MAX),
                max: self.max_frame_size,
            });
        }

        dst.reserve(size);
        let start = dst.len();
        // Placeholder, patched once the body is in place
        dst.put_u32_le(0);
        dst.extend_from_slice(&body);
        let written = (dst.len() - start) as u32;
        dst[start..start + SIZE_FIELD].copy_from_slice(&written.to_le_bytes());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(size: u32, body: &[u8]) -> BytesMut {
        let mut b = BytesMut::new();
        b.put_u32_le(size);
        b.extend_from_slice(body);
        b
    }

    #[test]
    fn decodes_complete_frame() {
        let mut src = frame(7, &[120, 1, 0]);
        src.extend_from_slice(&[0xaa]);
        let body = FrameCodec::default().decode(&mut src).unwrap().unwrap();
        assert_eq!(&body[..], &[120, 1, 0]);
        // Next frame's first byte stays buffered
        assert_eq!(&src[..], &[0xaa]);
    }

    #[test]
    fn waits_for_more_bytes() {
        let mut codec = FrameCodec::default();
        let mut src = BytesMut::from(&[9u8, 0][..]);
        assert!(codec.decode(&mut src).unwrap().is_none());
        let mut src = frame(9, &[100, 0]);
        assert!(codec.decode(&mut src).unwrap().is_none());
        assert_eq!(src.len(), 6);
    }

    #[test]
    fn rejects_small_sizes_from_prefix_alone() {
        for size in 0..MIN_FRAME_SIZE {
            let mut src = frame(size, &[]);
            let err = FrameCodec::default().decode(&mut src).unwrap_err();
            assert!(matches!(err, FrameError::BadSize { size: s, .. } if s == size));
        }
        let mut src = frame(5, &[121]);
        assert_eq!(&FrameCodec::default().decode(&mut src).unwrap().unwrap()[..], &[121]);
    }

    #[test]
    fn rejects_frames_above_ceiling() {
        let mut codec = FrameCodec::new(200);
        let mut src = frame(201, &[]);
        assert!(matches!(
            codec.decode(&mut src),
            Err(FrameError::BadSize { size: 201, max: 200 })
        ));

        codec.set_max_frame_size(4000);
        let mut src = frame(201, &[0; 197]);
        assert_eq!(codec.decode(&mut src).unwrap().unwrap().len(), 197);
    }

    #[test]
    fn eof_inside_frame_is_truncated() {
        let mut codec = FrameCodec::default();
        let mut src = BytesMut::from(&[7u8, 0, 0][..]);
        assert!(matches!(codec.decode_eof(&mut src), Err(FrameError::Truncated)));

        let mut src = frame(10, &[100, 0, 0]);
        assert!(matches!(codec.decode_eof(&mut src), Err(FrameError::Truncated)));

        let mut src = BytesMut::new();
        assert!(codec.decode_eof(&mut src).unwrap().is_none());
    }

    #[test]
    fn encoder_prefixes_total_length() {
        let mut dst = BytesMut::new();
        FrameCodec::default()
            .encode(Bytes::from_static(&[121, 0x34, 0x12]), &mut dst)
            .unwrap();
        assert_eq!(&dst[..], &[7, 0, 0, 0, 121, 0x34, 0x12]);

    }

    #[test]
    fn encoder_respects_ceiling() {
        let mut codec = FrameCodec::new(268);
        assert_eq!(codec.max_frame_size(), 268);

        let mut dst = BytesMut::new();
        codec.encode(Bytes::from(vec![26u8; 264]), &mut dst).unwrap();
        assert_eq!(dst.len(), 268);
        assert_eq!(&dst[..4], &268u32.to_le_bytes());

        let mut dst = BytesMut::new();
        assert!(matches!(
            codec.encode(Bytes::from(vec![26u8; 265]), &mut dst),
            Err(FrameError::BadSize { size: 269, max: 268 })
        ));
        assert!(dst.is_empty());

        codec.set_max_frame_size(4096);
        codec.encode(Bytes::from(vec![26u8; 265]), &mut dst).unwrap();
        assert_eq!(dst.len(), 269);
    }
}

//! Append-only byte sink.

/// Growable little-endian byte sink.
///
/// Only the codec writes into it; callers get the bytes back once the whole
/// value encoded successfully.
#[derive(Debug, Default, Clone)]
pub struct ByteBuffer {
    bytes: Vec<u8>,
}

impl ByteBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
        }
    }

    pub fn write_u8(&mut self, value: u8) {
        self.bytes.push(value);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u64(&mut self, value: u64) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_i8(&mut self, value: i8) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_i16(&mut self, value: i16) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_i32(&mut self, value: i32) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_i64(&mut self, value: i64) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_f64(&mut self, value: f64) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    /// Unsigned LEB128: 7 bits per byte, high bit set on every byte but the last.
    pub fn write_varint(&mut self, mut value: u64) {
        loop {
            let byte = (value & 0x7f) as u8;
            value >>= 7;
            if value == 0 {
                self.bytes.push(byte);
                return;
            }
            self.bytes.push(byte | 0x80);
        }
    }

    /// Raw bytes, no length prefix.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.bytes.extend_from_slice(bytes);
    }

    /// Varint length followed by the bytes.
    pub fn write_prefixed(&mut self, bytes: &[u8]) {
        self.write_varint(bytes.len() as u64);
        self.write_bytes(bytes);
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn varint(value: u64) -> String {
        let mut buf = ByteBuffer::new();
        buf.write_varint(value);
        hex::encode(buf.as_slice())
    }

    #[test]
    fn test_varint_boundaries() {
        assert_eq!(varint(0), "00");
        assert_eq!(varint(127), "7f");
        assert_eq!(varint(128), "8001");
        assert_eq!(varint(300), "ac02");
        assert_eq!(varint(16384), "808001");
        assert_eq!(varint(u64::MAX).len(), 20);
    }

    #[test]
    fn test_fixed_width_little_endian() {
        let mut buf = ByteBuffer::new();
        buf.write_u16(1234);
        buf.write_u32(1_122_334_455);
        buf.write_i64(-1);
        assert_eq!(hex::encode(buf.as_slice()), "d204f776e542ffffffffffffffff");
    }

    #[test]
    fn test_prefixed_bytes() {
        let mut buf = ByteBuffer::new();
        buf.write_prefixed(b"test");
        assert_eq!(buf.into_vec(), vec![4, b't', b'e', b's', b't']);
    }
}

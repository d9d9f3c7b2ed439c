use byteorder::{BigEndian, ByteOrder};

/// Width in bytes of an integer stored in a page, and of the length prefix
/// in front of a byte or string field.
pub const INT_SIZE: usize = 4;

/// In-memory image of one disk block.
///
/// A page is a fixed-size byte buffer with typed accessors at caller-chosen
/// offsets. It owns its buffer exclusively and knows nothing about files or
/// blocks; which block the bytes belong to is tracked by the caller.
///
/// Integers are stored as 4-byte big-endian `i32`. Variable-length fields
/// (bytes, strings) are stored as a 4-byte big-endian length prefix followed
/// by the raw bytes. Strings use one byte per character, so only ASCII-range
/// text is supported at this layer.
///
/// Offsets are not range-checked beyond the buffer itself: an access whose
/// footprint runs past the end of the buffer is a programmer error and
/// panics via the slice bounds check rather than silently truncating.
pub struct Page {
    buf: Box<[u8]>,
}

impl Page {
    /// Create a zero-filled page for a block of the given size.
    pub fn new(block_size: usize) -> Self {
        Self {
            buf: vec![0u8; block_size].into_boxed_slice(),
        }
    }

    /// Wrap an existing byte buffer. The caller guarantees its length
    /// matches the block size expected by whoever reads the page.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            buf: bytes.into_boxed_slice(),
        }
    }

    pub fn get_int(&self, offset: usize) -> i32 {
        BigEndian::read_i32(&self.buf[offset..offset + INT_SIZE])
    }

    pub fn set_int(&mut self, offset: usize, val: i32) {
        BigEndian::write_i32(&mut self.buf[offset..offset + INT_SIZE], val);
    }

    /// Read the length-prefixed byte field at `offset`. The returned slice
    /// borrows from the page; copy it if it must outlive the page.
    pub fn get_bytes(&self, offset: usize) -> &[u8] {
        let len = BigEndian::read_u32(&self.buf[offset..offset + INT_SIZE]) as usize;
        let start = offset + INT_SIZE;
        &self.buf[start..start + len]
    }

    /// Write `data` at `offset` as a 4-byte length prefix followed by the
    /// raw bytes. Total footprint is `INT_SIZE + data.len()`.
    pub fn set_bytes(&mut self, offset: usize, data: &[u8]) {
        BigEndian::write_u32(&mut self.buf[offset..offset + INT_SIZE], data.len() as u32);
        let start = offset + INT_SIZE;
        self.buf[start..start + data.len()].copy_from_slice(data);
    }

    pub fn get_string(&self, offset: usize) -> String {
        String::from_utf8_lossy(self.get_bytes(offset)).into_owned()
    }

    pub fn set_string(&mut self, offset: usize, s: &str) {
        debug_assert!(s.is_ascii(), "page strings are single-byte characters only");
        self.set_bytes(offset, s.as_bytes());
    }

    /// Exact buffer footprint of a `strlen`-character string stored via
    /// [`set_string`](Self::set_string). Callers use this to lay out
    /// adjacent fields without collision.
    pub fn max_length(strlen: usize) -> usize {
        INT_SIZE + strlen
    }

    /// The raw underlying buffer. Together with
    /// [`contents_mut`](Self::contents_mut), this is the only byte path
    /// between a page and the file manager.
    pub fn contents(&self) -> &[u8] {
        &self.buf
    }

    pub fn contents_mut(&mut self) -> &mut [u8] {
        &mut self.buf
    }
}

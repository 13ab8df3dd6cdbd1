//! Backing file header structure.

use byteorder::{BigEndian, ByteOrder};

use super::INITIAL_CAPACITY;

/// Magic bytes identifying a stowage backing file.
pub const MAGIC: [u8; 15] = [
    0x00, 0x00, 0x0d, 0x01, 0x0e, 0x05, 0x00, 0x0f, 0x0d, 0x00, 0x00, 0x0d, 0x0a, 0x0d, 0x05,
];

/// Current on-disk format version.
pub const FORMAT_VERSION: u8 = 1;

/// Fixed size of the file header in bytes.
pub const HEADER_SIZE: usize = 40;

/// Versioned description of the on-disk header layout.
///
/// The codec takes the layout as an explicit argument rather than reading
/// module constants, so a format revision is a new descriptor value and old
/// files remain decodable for inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderLayout {
    /// Magic bytes every file of this layout must start with.
    pub magic: [u8; 15],
    /// Format version recorded at byte 15.
    pub version: u8,
}

impl HeaderLayout {
    /// The layout written by this build.
    pub const CURRENT: Self = Self {
        magic: MAGIC,
        version: FORMAT_VERSION,
    };
}

/// Backing file header.
///
/// Stored big-endian in the first [`HEADER_SIZE`] bytes of every backing
/// file:
///
/// ```text
/// offset  width  field
///      0     15  magic
///     15      1  version
///     16      8  capacity (total file size, header included)
///     24     16  reserved, written as zero
/// ```
///
/// The reserved tail pads the header so the payload region starts at a
/// fixed offset; decoding never interprets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    /// Magic bytes for file identification.
    pub magic: [u8; 15],
    /// On-disk format version.
    pub version: u8,
    /// Total capacity of the backing file in bytes.
    pub capacity: u64,
}

impl FileHeader {
    /// Create a header for a file of the given total capacity.
    pub fn new(layout: &HeaderLayout, capacity: u64) -> Self {
        Self {
            magic: layout.magic,
            version: layout.version,
            capacity,
        }
    }

    /// Encode the header into its fixed on-disk representation.
    ///
    /// Reserved bytes are always written as zero.
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[..15].copy_from_slice(&self.magic);
        buf[15] = self.version;
        BigEndian::write_u64(&mut buf[16..24], self.capacity);
        buf
    }

    /// Decode a header from the start of a mapped region.
    ///
    /// Parses fields only; correctness checks live in [`Self::validate`].
    /// Trailing bytes past [`HEADER_SIZE`] are ignored.
    pub fn decode(bytes: &[u8]) -> Result<Self, String> {
        if bytes.len() < HEADER_SIZE {
            return Err(format!(
                "file shorter than header: {} < {} bytes",
                bytes.len(),
                HEADER_SIZE
            ));
        }

        let mut magic = [0u8; 15];
        magic.copy_from_slice(&bytes[..15]);

        Ok(Self {
            magic,
            version: bytes[15],
            capacity: BigEndian::read_u64(&bytes[16..24]),
        })
    }

    /// Validate the header against a layout and the actually mapped length.
    ///
    /// Returns a cause string naming the failed check; the caller attaches
    /// the file path.
    pub fn validate(&self, layout: &HeaderLayout, mapped_len: u64) -> Result<(), String> {
        if self.magic != layout.magic {
            return Err(format!(
                "magic mismatch: expected {:02x?}, found {:02x?}",
                layout.magic, self.magic
            ));
        }
        if self.version != layout.version {
            return Err(format!(
                "unsupported format version: expected {}, found {}",
                layout.version, self.version
            ));
        }
        if self.capacity != mapped_len {
            return Err(format!(
                "recorded capacity {} does not match mapped length {}",
                self.capacity, mapped_len
            ));
        }
        if mapped_len < INITIAL_CAPACITY {
            return Err(format!(
                "mapped length {} below minimum capacity {}",
                mapped_len, INITIAL_CAPACITY
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_roundtrip() {
        let header = FileHeader::new(&HeaderLayout::CURRENT, 1024 * 1024);

        let bytes = header.encode();
        let restored = FileHeader::decode(&bytes).unwrap();

        assert_eq!(restored, header);
        assert_eq!(restored.magic, MAGIC);
        assert_eq!(restored.version, FORMAT_VERSION);
        assert_eq!(restored.capacity, 1024 * 1024);
    }

    #[test]
    fn encoding_matches_layout_table() {
        let header = FileHeader::new(&HeaderLayout::CURRENT, 0x0102_0304_0506_0708);
        let bytes = header.encode();

        assert_eq!(&bytes[..15], &MAGIC);
        assert_eq!(bytes[15], FORMAT_VERSION);
        // Capacity is big-endian at offset 16.
        assert_eq!(
            &bytes[16..24],
            &[0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08]
        );
        // Reserved tail is zero.
        assert!(bytes[24..].iter().all(|&b| b == 0));
    }

    #[test]
    fn decode_rejects_short_buffer() {
        let err = FileHeader::decode(&[0u8; 10]).unwrap_err();
        assert!(err.contains("shorter than header"));
    }

    #[test]
    fn decode_ignores_trailing_bytes() {
        let header = FileHeader::new(&HeaderLayout::CURRENT, INITIAL_CAPACITY);
        let mut bytes = header.encode().to_vec();
        bytes.extend_from_slice(&[0xab; 64]);

        let restored = FileHeader::decode(&bytes).unwrap();
        assert_eq!(restored, header);
    }

    #[test]
    fn header_validation() {
        let header = FileHeader::new(&HeaderLayout::CURRENT, INITIAL_CAPACITY);
        assert!(header
            .validate(&HeaderLayout::CURRENT, INITIAL_CAPACITY)
            .is_ok());

        let mut bad_magic = header;
        bad_magic.magic[0] = 0xff;
        let err = bad_magic
            .validate(&HeaderLayout::CURRENT, INITIAL_CAPACITY)
            .unwrap_err();
        assert!(err.contains("magic mismatch"));

        let mut bad_version = header;
        bad_version.version = 9;
        let err = bad_version
            .validate(&HeaderLayout::CURRENT, INITIAL_CAPACITY)
            .unwrap_err();
        assert!(err.contains("expected 1, found 9"));

        // Recorded capacity must agree with what was actually mapped.
        let err = header
            .validate(&HeaderLayout::CURRENT, INITIAL_CAPACITY + 512)
            .unwrap_err();
        assert!(err.contains("does not match mapped length"));
    }

    #[test]
    fn validation_rejects_undersized_file() {
        let header = FileHeader::new(&HeaderLayout::CURRENT, 2000);
        let err = header.validate(&HeaderLayout::CURRENT, 2000).unwrap_err();
        assert!(err.contains("below minimum capacity"));
    }

    #[test]
    fn validation_uses_the_given_layout() {
        let layout = HeaderLayout {
            magic: [0x77; 15],
            version: 3,
        };
        let header = FileHeader::new(&layout, INITIAL_CAPACITY);

        assert!(header.validate(&layout, INITIAL_CAPACITY).is_ok());
        assert!(header
            .validate(&HeaderLayout::CURRENT, INITIAL_CAPACITY)
            .is_err());
    }

    #[test]
    fn header_size_is_40() {
        // 24 bytes of fields plus 16 reserved; the capacity field starts at
        // a 16-byte boundary.
        assert_eq!(HEADER_SIZE, 40);
        assert_eq!(FileHeader::new(&HeaderLayout::CURRENT, 0).encode().len(), 40);
    }
}

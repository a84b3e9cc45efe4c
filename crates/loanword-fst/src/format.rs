// Binary automaton format: header parsing, validation, payload encoding.

use crate::FstError;
use crate::fst::VectorFst;

/// Header magic constants (little-endian).
const COOKIE1: u32 = 0x4C57_4653;
const COOKIE2: u32 = 0x0002_71C3;

/// Current payload layout version.
pub const FORMAT_VERSION: u8 = 1;

/// Size of the binary header in bytes.
pub const HEADER_SIZE: usize = 16;

/// Parsed automaton file header.
///
/// The header occupies the first 16 bytes of a serialized automaton:
/// - bytes 0..4: cookie1 (magic number)
/// - bytes 4..8: cookie2 (magic number)
/// - byte 8: format version
/// - byte 9: acceptor flag (0x01 when every arc has equal labels)
/// - bytes 10..16: reserved (zero)
///
/// The bincode-encoded [`VectorFst`] follows the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FstHeader {
    pub version: u8,
    pub acceptor: bool,
}

/// Parses and validates the 16-byte header.
pub fn parse_header(data: &[u8]) -> Result<FstHeader, FstError> {
    if data.len() < HEADER_SIZE {
        return Err(FstError::TooShort {
            expected: HEADER_SIZE,
            actual: data.len(),
        });
    }

    let cookie1 = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
    let cookie2 = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);

    if cookie1 != COOKIE1 || cookie2 != COOKIE2 {
        return Err(FstError::InvalidMagic);
    }

    let version = data[8];
    if version != FORMAT_VERSION {
        return Err(FstError::UnsupportedVersion(version));
    }

    Ok(FstHeader {
        version,
        acceptor: data[9] == 0x01,
    })
}

fn is_acceptor(fst: &VectorFst) -> bool {
    fst.states()
        .all(|s| fst.transitions(s).iter().all(|t| t.ilabel == t.olabel))
}

/// Serializes `fst` behind a header.
pub fn to_bytes(fst: &VectorFst) -> Result<Vec<u8>, FstError> {
    let mut buf = vec![0u8; HEADER_SIZE];
    buf[..4].copy_from_slice(&COOKIE1.to_le_bytes());
    buf[4..8].copy_from_slice(&COOKIE2.to_le_bytes());
    buf[8] = FORMAT_VERSION;
    buf[9] = if is_acceptor(fst) { 0x01 } else { 0x00 };
    bincode::serialize_into(&mut buf, fst)?;
    Ok(buf)
}

/// Reads an automaton written by [`to_bytes`].
pub fn from_bytes(data: &[u8]) -> Result<VectorFst, FstError> {
    parse_header(data)?;
    Ok(bincode::deserialize(&data[HEADER_SIZE..])?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> VectorFst {
        let mut fst = VectorFst::new();
        fst.add_arc(0, 1, 3, 4, 1.5);
        fst.add_arc(1, 1, 2, 2, 0.0);
        fst.set_final(1, 0.25);
        fst
    }

    #[test]
    fn header_fields() {
        let bytes = to_bytes(&sample()).unwrap();
        let header = parse_header(&bytes).unwrap();
        assert_eq!(header.version, FORMAT_VERSION);
        assert!(!header.acceptor);

        let chain = to_bytes(&VectorFst::linear_chain(&[1, 2])).unwrap();
        assert!(parse_header(&chain).unwrap().acceptor);
    }

    #[test]
    fn payload_survives() {
        let fst = sample();
        let back = from_bytes(&to_bytes(&fst).unwrap()).unwrap();
        assert_eq!(back, fst);
    }

    #[test]
    fn reject_too_short() {
        let data = [0u8; 8];
        let err = parse_header(&data).unwrap_err();
        assert!(matches!(
            err,
            FstError::TooShort {
                expected: 16,
                actual: 8
            }
        ));
    }

    #[test]
    fn reject_invalid_magic() {
        let mut data = to_bytes(&sample()).unwrap();
        data[0] = 0xFF; // corrupt cookie1
        assert!(matches!(from_bytes(&data), Err(FstError::InvalidMagic)));
    }

    #[test]
    fn reject_future_version() {
        let mut data = to_bytes(&sample()).unwrap();
        data[8] = FORMAT_VERSION + 1;
        assert!(matches!(
            from_bytes(&data),
            Err(FstError::UnsupportedVersion(v)) if v == FORMAT_VERSION + 1
        ));
    }

    #[test]
    fn reject_truncated_payload() {
        let data = to_bytes(&sample()).unwrap();
        let err = from_bytes(&data[..data.len() - 3]).unwrap_err();
        assert!(matches!(err, FstError::Payload(_)));
    }
}

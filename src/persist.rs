use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::corpus::Corpus;
use crate::embedding::space::EmbeddingSpace;
use crate::error::{RerankError, Result};
use crate::matrix::SimilarityMatrix;

/// File magic
pub const MAGIC: [u8; 4] = *b"TLMR";
/// Current envelope version. Readers accept this version only.
pub const FORMAT_VERSION: u16 = 1;

const HEADER_LEN: usize = MAGIC.len() + 2 + 1;

/// What a persisted payload holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PayloadKind {
    SimilarityMatrix = 1,
    EmbeddingSpace = 2,
    Corpus = 3,
}

impl PayloadKind {
    fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(Self::SimilarityMatrix),
            2 => Some(Self::EmbeddingSpace),
            3 => Some(Self::Corpus),
            _ => None,
        }
    }
}

/// Structures that can be written into the versioned envelope.
pub trait Persist: Serialize + DeserializeOwned {
    const KIND: PayloadKind;
}

impl Persist for SimilarityMatrix {
    const KIND: PayloadKind = PayloadKind::SimilarityMatrix;
}

impl Persist for EmbeddingSpace {
    const KIND: PayloadKind = PayloadKind::EmbeddingSpace;
}

impl Persist for Corpus {
    const KIND: PayloadKind = PayloadKind::Corpus;
}

/// Envelope layout:
/// `MAGIC` | version (u16 LE) | kind (u8) | CBOR payload
pub fn to_bytes<T: Persist>(value: &T) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(HEADER_LEN);
    write_header(&mut out, T::KIND)?;
    serde_cbor::to_writer(&mut out, value)?;
    Ok(out)
}

pub fn from_bytes<T: Persist>(bytes: &[u8]) -> Result<T> {
    if bytes.len() < HEADER_LEN {
        return Err(RerankError::PersistenceFailure(format!(
            "truncated header: {} bytes",
            bytes.len()
        )));
    }
    check_header(&bytes[..HEADER_LEN], T::KIND)?;
    Ok(serde_cbor::from_slice(&bytes[HEADER_LEN..])?)
}

pub fn write_to<T: Persist, W: Write>(value: &T, mut writer: W) -> Result<()> {
    write_header(&mut writer, T::KIND)?;
    serde_cbor::to_writer(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}

pub fn read_from<T: Persist, R: Read>(mut reader: R) -> Result<T> {
    let mut header = [0u8; HEADER_LEN];
    reader.read_exact(&mut header).map_err(|e| {
        RerankError::PersistenceFailure(format!("truncated header: {e}"))
    })?;
    check_header(&header, T::KIND)?;
    Ok(serde_cbor::from_reader(reader)?)
}

/// Write `value` to `path`, replacing any existing file.
pub fn save<T: Persist, P: AsRef<Path>>(value: &T, path: P) -> Result<()> {
    let path = path.as_ref();
    debug!(path = %path.display(), kind = ?T::KIND, "saving");
    let file = File::create(path)?;
    write_to(value, BufWriter::new(file))
}

pub fn load<T: Persist, P: AsRef<Path>>(path: P) -> Result<T> {
    let path = path.as_ref();
    debug!(path = %path.display(), kind = ?T::KIND, "loading");
    let file = File::open(path)?;
    read_from(BufReader::new(file))
}

fn write_header<W: Write>(writer: &mut W, kind: PayloadKind) -> Result<()> {
    writer.write_all(&MAGIC)?;
    writer.write_all(&FORMAT_VERSION.to_le_bytes())?;
    writer.write_all(&[kind as u8])?;
    Ok(())
}

fn check_header(header: &[u8], expected: PayloadKind) -> Result<()> {
    if header[..MAGIC.len()] != MAGIC {
        return Err(RerankError::PersistenceFailure("bad magic".to_string()));
    }
    let version = u16::from_le_bytes([header[4], header[5]]);
    if version != FORMAT_VERSION {
        return Err(RerankError::PersistenceFailure(format!(
            "unsupported format version {version}, expected {FORMAT_VERSION}"
        )));
    }
    match PayloadKind::from_tag(header[6]) {
        Some(kind) if kind == expected => Ok(()),
        Some(kind) => Err(RerankError::PersistenceFailure(format!(
            "payload holds {kind:?}, expected {expected:?}"
        ))),
        None => Err(RerankError::PersistenceFailure(format!(
            "unknown payload tag {}",
            header[6]
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix() -> SimilarityMatrix {
        let mut m = SimilarityMatrix::new();
        m.init("alone");
        m.put("a", "b", 0.25);
        m.put("a", "a", 1.0);
        m
    }

    #[test]
    fn envelope_roundtrip() {
        let m = matrix();
        let bytes = to_bytes(&m).unwrap();
        assert_eq!(&bytes[..4], b"TLMR");
        let back: SimilarityMatrix = from_bytes(&bytes).unwrap();
        assert_eq!(back, m);
        assert_eq!(back.top_k("a", 2), m.top_k("a", 2));
    }

    #[test]
    fn reader_and_writer_agree_with_bytes() {
        let mut space = EmbeddingSpace::new(2);
        space.insert("x", vec![0.5, -0.5]).unwrap();
        let mut buf = Vec::new();
        write_to(&space, &mut buf).unwrap();
        assert_eq!(buf, to_bytes(&space).unwrap());
        let back: EmbeddingSpace = read_from(buf.as_slice()).unwrap();
        assert_eq!(back, space);
    }

    #[test]
    fn wrong_kind_is_rejected() {
        let bytes = to_bytes(&matrix()).unwrap();
        let err = from_bytes::<Corpus>(&bytes).unwrap_err();
        assert!(matches!(err, RerankError::PersistenceFailure(_)));
    }

    #[test]
    fn corrupt_inputs_are_persistence_failures() {
        let mut bytes = to_bytes(&matrix()).unwrap();
        assert!(matches!(from_bytes::<SimilarityMatrix>(&bytes[..3]), Err(RerankError::PersistenceFailure(_))));

        let truncated = &bytes[..bytes.len() - 2];
        assert!(matches!(from_bytes::<SimilarityMatrix>(truncated), Err(RerankError::PersistenceFailure(_))));

        bytes[4] = 9;
        assert!(matches!(from_bytes::<SimilarityMatrix>(&bytes), Err(RerankError::PersistenceFailure(_))));

        bytes[0] = b'X';
        assert!(matches!(read_from::<SimilarityMatrix, _>(bytes.as_slice()), Err(RerankError::PersistenceFailure(_))));
    }
}

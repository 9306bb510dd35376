//! Hive wire format — the framed, typed, compressed envelope exchanged
//! between master and worker.
//!
//! Every payload crossing the wire is preceded by an `EnvelopeHeader`.
//! The receiver can fully describe and route an envelope — kind, job,
//! sizes — before paying any decompression cost.
//!
//! The header is #[repr(C, packed)] for deterministic layout and uses
//! zerocopy derives for safe, allocation-free serialization. There is no
//! unsafe code in this module. Payloads are zstd-compressed uniformly,
//! regardless of size, so all ten message kinds share one format.

use bytes::Bytes;
use static_assertions::assert_eq_size;
use zerocopy::{AsBytes, FromBytes, FromZeroes};

// ── Message Kind ─────────────────────────────────────────────────────────────

/// Tags the payload semantics of an envelope.
///
/// The kind set is closed: every consumer matches exhaustively. Wire values
/// are fixed and must never change for a given kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageKind {
    /// Worker asks the master for the job description.
    JobRequest = 1,
    /// Job metadata acknowledgment.
    JobSync = 2,
    /// Job description payload.
    JobData = 3,
    /// Worker asks for a named input file.
    FileRequest = 4,
    /// File metadata acknowledgment.
    FileSync = 5,
    /// Input file payload.
    FileData = 6,
    /// Worker asks for its next task.
    TaskRequest = 7,
    /// No task available right now — retry later.
    TaskSync = 8,
    /// Task assignment or task result payload.
    TaskData = 9,
    /// Every task is accounted for; the worker can exit its loop.
    JobEnd = 10,
}

impl TryFrom<u8> for MessageKind {
    type Error = EnvelopeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(MessageKind::JobRequest),
            2 => Ok(MessageKind::JobSync),
            3 => Ok(MessageKind::JobData),
            4 => Ok(MessageKind::FileRequest),
            5 => Ok(MessageKind::FileSync),
            6 => Ok(MessageKind::FileData),
            7 => Ok(MessageKind::TaskRequest),
            8 => Ok(MessageKind::TaskSync),
            9 => Ok(MessageKind::TaskData),
            10 => Ok(MessageKind::JobEnd),
            other => Err(EnvelopeError::UnknownKind(other)),
        }
    }
}

impl From<MessageKind> for u8 {
    fn from(kind: MessageKind) -> u8 {
        kind as u8
    }
}

// ── Envelope Header ──────────────────────────────────────────────────────────

/// Precedes every payload on the wire.
///
/// Wire size: 36 bytes.
#[derive(Debug, Clone, AsBytes, FromBytes, FromZeroes)]
#[repr(C, packed)]
pub struct EnvelopeHeader {
    /// Unique message id — BLAKE3 over kind, job id, payload, and a
    /// random nonce, truncated to 16 bytes.
    pub id: [u8; 16],

    /// Id of the job this envelope belongs to.
    pub job_id: u64,

    /// Payload length in bytes before compression.
    pub raw_size: u32,

    /// Payload length in bytes after compression — the number of bytes
    /// following this header. 0 = no payload.
    pub compressed_size: u32,

    /// MessageKind wire value.
    pub kind: u8,

    /// Wire format version. Currently 0x01.
    pub version: u8,

    /// Reserved, must be zero.
    pub reserved: [u8; 2],
}

// Compile-time size guard. If this fails, the wire format has silently changed.
assert_eq_size!(EnvelopeHeader, [u8; 36]);

/// Header length in bytes.
pub const HEADER_LEN: usize = std::mem::size_of::<EnvelopeHeader>();

/// Current envelope format version.
pub const ENVELOPE_VERSION: u8 = 0x01;

/// zstd compression level for envelope payloads.
const COMPRESSION_LEVEL: i32 = 3;

// ── Errors ───────────────────────────────────────────────────────────────────

/// Errors that can arise when encoding or interpreting envelopes.
///
/// None of these are fatal to the receiving side: a malformed envelope is
/// rejected and logged, and the connection it arrived on is kept.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnvelopeError {
    #[error("payload compression failed: {0}")]
    Encoding(String),

    #[error("payload decompression failed: {0}")]
    Decompression(String),

    #[error("unknown message kind: 0x{0:02x}")]
    UnknownKind(u8),

    #[error("unknown envelope version: 0x{0:02x}")]
    UnknownVersion(u8),

    #[error("size mismatch: declared {declared} bytes, found {actual}")]
    Corrupt { declared: usize, actual: usize },

    #[error("envelope truncated: {0} bytes is shorter than the header")]
    Truncated(usize),
}

// ── Envelope ─────────────────────────────────────────────────────────────────

/// A decoded or freshly constructed envelope. Immutable once built.
///
/// The payload stays compressed until [`Envelope::data`] is called, so
/// routing and logging never pay for decompression.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub id: [u8; 16],
    pub job_id: u64,
    pub kind: MessageKind,
    pub raw_size: u32,
    pub compressed_size: u32,
    payload: Option<Bytes>,
}

impl Envelope {
    /// Compress `data` and build an envelope around it, assigning a fresh id.
    ///
    /// Compression is applied even to empty payloads; `None` means the
    /// envelope carries no payload at all (a pure signal).
    pub fn encode(
        kind: MessageKind,
        job_id: u64,
        data: Option<&[u8]>,
    ) -> Result<Self, EnvelopeError> {
        let (payload, raw_size) = match data {
            Some(raw) => {
                let compressed = zstd::encode_all(raw, COMPRESSION_LEVEL)
                    .map_err(|e| EnvelopeError::Encoding(e.to_string()))?;
                (Some(Bytes::from(compressed)), raw.len() as u32)
            }
            None => (None, 0),
        };
        let compressed_size = payload.as_ref().map_or(0, |p| p.len() as u32);

        Ok(Self {
            id: fresh_id(kind, job_id, data),
            job_id,
            kind,
            raw_size,
            compressed_size,
            payload,
        })
    }

    /// Parse an envelope from wire bytes. Verifies the header and that the
    /// payload region matches the declared compressed size, but does not
    /// decompress.
    pub fn decode(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        let header = EnvelopeHeader::read_from_prefix(bytes)
            .ok_or(EnvelopeError::Truncated(bytes.len()))?;

        // Copy packed fields to locals before use.
        let version = header.version;
        if version != ENVELOPE_VERSION {
            return Err(EnvelopeError::UnknownVersion(version));
        }
        let kind = MessageKind::try_from(header.kind)?;
        let job_id = header.job_id;
        let raw_size = header.raw_size;
        let compressed_size = header.compressed_size;

        let body = &bytes[HEADER_LEN..];
        if body.len() != compressed_size as usize {
            return Err(EnvelopeError::Corrupt {
                declared: compressed_size as usize,
                actual: body.len(),
            });
        }

        let payload = if compressed_size > 0 {
            Some(Bytes::copy_from_slice(body))
        } else {
            None
        };

        Ok(Self {
            id: header.id,
            job_id,
            kind,
            raw_size,
            compressed_size,
            payload,
        })
    }

    /// Decompress and return the payload. `None` if the envelope carries no
    /// payload. A decompressed length that disagrees with the recorded raw
    /// size is a corruption error.
    pub fn data(&self) -> Result<Option<Vec<u8>>, EnvelopeError> {
        let Some(payload) = &self.payload else {
            return Ok(None);
        };
        let raw = zstd::decode_all(payload.as_ref())
            .map_err(|e| EnvelopeError::Decompression(e.to_string()))?;
        if raw.len() != self.raw_size as usize {
            return Err(EnvelopeError::Corrupt {
                declared: self.raw_size as usize,
                actual: raw.len(),
            });
        }
        Ok(Some(raw))
    }

    /// Serialize to wire bytes: header followed by the compressed payload.
    pub fn to_bytes(&self) -> Vec<u8> {
        let header = EnvelopeHeader {
            id: self.id,
            job_id: self.job_id,
            raw_size: self.raw_size,
            compressed_size: self.compressed_size,
            kind: self.kind.into(),
            version: ENVELOPE_VERSION,
            reserved: [0; 2],
        };
        let mut bytes = Vec::with_capacity(HEADER_LEN + self.compressed_size as usize);
        bytes.extend_from_slice(header.as_bytes());
        if let Some(payload) = &self.payload {
            bytes.extend_from_slice(payload);
        }
        bytes
    }

    /// Whether this envelope carries a payload.
    pub fn has_payload(&self) -> bool {
        self.payload.is_some()
    }
}

/// Derive a fresh message id. Salted with a random nonce so two envelopes
/// with identical content still get distinct ids.
fn fresh_id(kind: MessageKind, job_id: u64, data: Option<&[u8]>) -> [u8; 16] {
    let nonce: [u8; 16] = rand::random();
    let mut hasher = blake3::Hasher::new();
    hasher.update(&[kind.into()]);
    hasher.update(&job_id.to_le_bytes());
    if let Some(raw) = data {
        hasher.update(raw);
    }
    hasher.update(&nonce);
    let hash = hasher.finalize();
    let mut id = [0u8; 16];
    id.copy_from_slice(&hash.as_bytes()[..16]);
    id
}

// ── Tests ────────────────────────────────────────────────────────────────────

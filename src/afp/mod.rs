//! AFP structured field data model and codec
//!
//! The MO:DCA container format is a flat sequence of structured fields:
//! tagged, length-prefixed binary records. This module carries the field
//! record type, the identifier catalog for the fields the combiner
//! interprets, the 8-byte EBCDIC token name type, and the sequential
//! reader/writer ([`codec`]). Everything the combiner does not interpret is
//! passed through as opaque bytes.

pub mod codec;
pub mod ebcdic;
pub mod fields;
pub mod triplet;

pub use codec::{AfpReader, AfpWriter};
pub use fields::{ObjectType, ResourceKey};

use std::fmt;

/// Structured field identifiers (the 3-byte type code of each record)
pub mod sfid {
    pub const BDT: u32 = 0xD3A8A8; // Begin Document
    pub const EDT: u32 = 0xD3A9A8; // End Document
    pub const BPG: u32 = 0xD3A8AF; // Begin Page
    pub const EPG: u32 = 0xD3A9AF; // End Page
    pub const BRG: u32 = 0xD3A8C6; // Begin Resource Group
    pub const ERG: u32 = 0xD3A9C6; // End Resource Group
    pub const BRS: u32 = 0xD3A8CE; // Begin Resource
    pub const ERS: u32 = 0xD3A9CE; // End Resource
    pub const BFM: u32 = 0xD3A8CD; // Begin Form Map
    pub const EFM: u32 = 0xD3A9CD; // End Form Map
    pub const BMM: u32 = 0xD3A8CC; // Begin Medium Map
    pub const EMM: u32 = 0xD3A9CC; // End Medium Map
    pub const BDG: u32 = 0xD3A8C4; // Begin Document Environment Group
    pub const EDG: u32 = 0xD3A9C4; // End Document Environment Group

    pub const IMM: u32 = 0xD3ABCC; // Invoke Medium Map
    pub const IOB: u32 = 0xD3AFC3; // Include Object
    pub const IPG: u32 = 0xD3AFAF; // Include Page
    pub const IPO: u32 = 0xD3AFD8; // Include Page Overlay
    pub const IPS: u32 = 0xD3AF5F; // Include Page Segment
    pub const MCF: u32 = 0xD3AB8A; // Map Coded Font (format 2)
    pub const MCF1: u32 = 0xD3B18A; // Map Coded Font (format 1)
    pub const MDR: u32 = 0xD3ABC3; // Map Data Resource
    pub const MMO: u32 = 0xD3B1DF; // Map Medium Overlay
    pub const MPG: u32 = 0xD3ABAF; // Map Page
    pub const MPO: u32 = 0xD3ABD8; // Map Page Overlay
    pub const MPS: u32 = 0xD3B15F; // Map Page Segment

    pub const FGD: u32 = 0xD3A645; // Form Environment Group Descriptor
    pub const MMT: u32 = 0xD3AB88; // Map Media Type
    pub const MMD: u32 = 0xD3ABCD; // Map Media Destination
    pub const PGP: u32 = 0xD3B1AF; // Page Position (format 2)
    pub const PGP1: u32 = 0xD3ACAF; // Page Position (format 1)
    pub const MDD: u32 = 0xD3A688; // Medium Descriptor
    pub const MCC: u32 = 0xD3A288; // Medium Copy Count
    pub const MMC: u32 = 0xD3A788; // Medium Modification Control
    pub const PMC: u32 = 0xD3A7AF; // Page Modification Control
    pub const MFC: u32 = 0xD3A088; // Medium Finishing Control
    pub const PEC: u32 = 0xD3A7A8; // Presentation Environment Control

    pub const NOP: u32 = 0xD3EEEE; // No Operation
}

/// One structured field: a tagged, length-prefixed binary record.
///
/// The combiner interprets only a small set of identifiers; for all other
/// fields `data` is opaque pass-through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuredField {
    /// 3-byte field identifier, e.g. `sfid::BRS`
    pub id: u32,
    /// Flag byte from the introducer
    pub flags: u8,
    /// Sequence number from the introducer
    pub seqno: u16,
    /// Field payload (everything after the introducer)
    pub data: Vec<u8>,
}

impl StructuredField {
    /// Create a field with an empty payload
    pub fn new(id: u32) -> Self {
        Self::with_data(id, Vec::new())
    }

    /// Create a field with the given payload
    pub fn with_data(id: u32, data: Vec<u8>) -> Self {
        StructuredField {
            id,
            flags: 0,
            seqno: 0,
            data,
        }
    }
}

/// An 8-byte EBCDIC token name (resource, medium map, document, ...).
///
/// Equality and hashing are on the raw bytes, so padded and unpadded source
/// spellings never alias and no byte of the source is reinterpreted.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Name([u8; 8]);

impl Name {
    /// Take up to 8 raw EBCDIC bytes, padding with blanks
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut raw = [ebcdic::BLANK; 8];
        for (dst, src) in raw.iter_mut().zip(bytes) {
            *dst = *src;
        }
        Name(raw)
    }

    /// Encode an ASCII string, padding with blanks and truncating to 8
    pub fn from_ascii(s: &str) -> Self {
        let mut raw = [ebcdic::BLANK; 8];
        for (dst, c) in raw.iter_mut().zip(s.chars()) {
            *dst = ebcdic::encode_char(c);
        }
        Name(raw)
    }

    /// The raw EBCDIC bytes
    pub fn bytes(&self) -> &[u8; 8] {
        &self.0
    }

    /// Decode to ASCII, trailing blanks trimmed
    pub fn to_ascii(&self) -> String {
        let s: String = self.0.iter().map(|&b| ebcdic::decode_byte(b)).collect();
        s.trim_end().to_string()
    }
}

impl Default for Name {
    /// All blanks
    fn default() -> Self {
        Name([ebcdic::BLANK; 8])
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_ascii())
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({:?})", self.to_ascii())
    }
}

//! Triplet access within structured field payloads
//!
//! A triplet is a typed sub-record: one length byte (counting the whole
//! triplet), one identifier byte, then content. Triplets are patched in
//! place so the enclosing field keeps its exact length and every byte the
//! combiner does not interpret stays untouched.

use super::Name;

/// Fully Qualified Name triplet
pub const FQN: u8 = 0x02;
/// Object Classification triplet, carries the registered object identifier
pub const OBJECT_CLASSIFICATION: u8 = 0x10;
/// Resource Object Type triplet on Begin Resource fields
pub const RESOURCE_OBJECT_TYPE: u8 = 0x21;

/// FQN types the combiner interprets
pub const FQN_REPLACE_FIRST_GID: u8 = 0x01;
pub const FQN_RESOURCE_OBJECT_REF: u8 = 0x84;
pub const FQN_CODE_PAGE_NAME_REF: u8 = 0x85;
pub const FQN_FONT_CHARACTER_SET_NAME_REF: u8 = 0x86;
pub const FQN_CODED_FONT_NAME_REF: u8 = 0x8E;
pub const FQN_OTHER_OBJECT_DATA_REF: u8 = 0xCE;
pub const FQN_DATA_OBJECT_EXTERNAL_RESOURCE_REF: u8 = 0xDE;

/// Position of one triplet inside a field payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TripletRef {
    /// Offset of the length byte within the payload
    pub offset: usize,
    /// Total triplet length in bytes
    pub len: usize,
    /// Triplet identifier
    pub id: u8,
}

/// Walk the triplet chain starting at `from`.
///
/// Stops at the first malformed length rather than erroring; an unparseable
/// tail simply yields no further triplets and is passed through as-is.
pub fn scan(data: &[u8], from: usize) -> Vec<TripletRef> {
    let mut triplets = Vec::new();
    let mut pos = from;
    while pos + 2 <= data.len() {
        let len = data[pos] as usize;
        if len < 2 || pos + len > data.len() {
            break;
        }
        triplets.push(TripletRef {
            offset: pos,
            len,
            id: data[pos + 1],
        });
        pos += len;
    }
    triplets
}

/// FQN type byte, if this is a well-formed FQN triplet
pub fn fqn_type(data: &[u8], t: &TripletRef) -> Option<u8> {
    (t.id == FQN && t.len >= 4).then(|| data[t.offset + 2])
}

/// Name carried by an FQN triplet
pub fn fqn_name(data: &[u8], t: &TripletRef) -> Option<Name> {
    (t.id == FQN && t.len > 4).then(|| Name::from_bytes(&data[t.offset + 4..t.offset + t.len]))
}

/// Overwrite the name carried by an FQN triplet, in place.
///
/// The name region keeps its length: shorter names are blank padded, longer
/// ones truncated.
pub fn set_fqn_name(data: &mut [u8], t: &TripletRef, name: Name) {
    if t.id != FQN || t.len <= 4 || t.offset + t.len > data.len() {
        return;
    }
    let region = &mut data[t.offset + 4..t.offset + t.len];
    for (i, b) in region.iter_mut().enumerate() {
        *b = if i < 8 {
            name.bytes()[i]
        } else {
            super::ebcdic::BLANK
        };
    }
}

/// Registered object identifier from an Object Classification triplet
pub fn reg_obj_id(data: &[u8], t: &TripletRef) -> Option<[u8; 16]> {
    if t.id == OBJECT_CLASSIFICATION && t.len >= 23 {
        data[t.offset + 7..t.offset + 23].try_into().ok()
    } else {
        None
    }
}

/// Object type byte from a Resource Object Type triplet
pub fn object_type(data: &[u8], t: &TripletRef) -> Option<u8> {
    (t.id == RESOURCE_OBJECT_TYPE && t.len >= 3).then(|| data[t.offset + 2])
}

/// Encode a Resource Object Type triplet with zeroed constant data
pub fn resource_object_type(obj_type: u8) -> [u8; 7] {
    [7, RESOURCE_OBJECT_TYPE, obj_type, 0, 0, 0, 0]
}

/// Encode an FQN triplet for tests and synthetic boundary records
pub fn fqn(fqn_type: u8, name: Name) -> Vec<u8> {
    let mut t = vec![12, FQN, fqn_type, 0];
    t.extend_from_slice(name.bytes());
    t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_walks_the_chain() {
        let mut data = vec![0u8; 4]; // fixed prefix the scan skips
        data.extend_from_slice(&resource_object_type(0xFB));
        data.extend_from_slice(&fqn(FQN_REPLACE_FIRST_GID, Name::from_ascii("S1SEG")));

        let triplets = scan(&data, 4);
        assert_eq!(triplets.len(), 2);
        assert_eq!(triplets[0].id, RESOURCE_OBJECT_TYPE);
        assert_eq!(object_type(&data, &triplets[0]), Some(0xFB));
        assert_eq!(triplets[1].id, FQN);
        assert_eq!(fqn_type(&data, &triplets[1]), Some(FQN_REPLACE_FIRST_GID));
        assert_eq!(fqn_name(&data, &triplets[1]), Some(Name::from_ascii("S1SEG")));
    }

    #[test]
    fn test_scan_stops_on_zero_length() {
        let data = [0u8, 0, 0, 0];
        assert!(scan(&data, 0).is_empty());
    }

    #[test]
    fn test_set_fqn_name_keeps_triplet_length() {
        let mut data = fqn(FQN_REPLACE_FIRST_GID, Name::from_ascii("OLDNAME1"));
        let before = data.len();
        let t = scan(&data, 0)[0];
        set_fqn_name(&mut data, &t, Name::from_ascii("NEWNAME1"));
        assert_eq!(data.len(), before);
        assert_eq!(fqn_name(&data, &t), Some(Name::from_ascii("NEWNAME1")));
    }
}

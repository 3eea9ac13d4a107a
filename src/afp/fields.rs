//! Typed views over the structured fields the combiner interprets
//!
//! Fields are kept as raw payloads; these helpers read and patch the few
//! positions the merge cares about (token names, resource keys, the
//! replace-first-GID triplet) without disturbing any other byte.

use super::{sfid, triplet, Name, StructuredField};

/// Offset of the first triplet in a Begin Resource payload
/// (8-byte name, 2 reserved bytes)
pub const BRS_TRIPLETS: usize = 10;
/// Offset of the first triplet in an Invoke Medium Map payload
pub const IMM_TRIPLETS: usize = 8;
/// Offset of the first triplet in an Include Page Segment payload
/// (8-byte name, two 3-byte coordinate offsets)
pub const IPS_TRIPLETS: usize = 14;
/// Offset of the first triplet in an Include Page Overlay payload
pub const IPO_TRIPLETS: usize = 14;
/// Offset of the first triplet in an Include Object payload
pub const IOB_TRIPLETS: usize = 28;
/// Offset of the object type byte in an Include Object payload
pub const IOB_OBJ_TYPE: usize = 10;

/// Resource object types carried by the X'21' triplet on Begin Resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectType {
    Ioca,
    FontCharacterSet,
    CodePage,
    CodedFont,
    ObjectContainer,
    PageSegment,
    Overlay,
    PageDef,
    FormMap,
    Other(u8),
}

impl ObjectType {
    pub fn from_byte(b: u8) -> Self {
        match b {
            0x03 => ObjectType::Ioca,
            0x06 => ObjectType::FontCharacterSet,
            0x07 => ObjectType::CodePage,
            0x08 => ObjectType::CodedFont,
            0x92 => ObjectType::ObjectContainer,
            0xFB => ObjectType::PageSegment,
            0xFC => ObjectType::Overlay,
            0xFD => ObjectType::PageDef,
            0xFE => ObjectType::FormMap,
            other => ObjectType::Other(other),
        }
    }

    pub fn byte(&self) -> u8 {
        match self {
            ObjectType::Ioca => 0x03,
            ObjectType::FontCharacterSet => 0x06,
            ObjectType::CodePage => 0x07,
            ObjectType::CodedFont => 0x08,
            ObjectType::ObjectContainer => 0x92,
            ObjectType::PageSegment => 0xFB,
            ObjectType::Overlay => 0xFC,
            ObjectType::PageDef => 0xFD,
            ObjectType::FormMap => 0xFE,
            ObjectType::Other(other) => *other,
        }
    }
}

/// Value identity of a resource across files.
///
/// Two resources in different files are candidates for the same output slot
/// iff their keys are equal; whether they really are the same is decided by
/// content hash and raw bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceKey {
    pub obj_type: ObjectType,
    pub name: Name,
    /// Registered object id, only meaningful for object containers
    pub obj_id: Option<[u8; 16]>,
}

impl ResourceKey {
    pub fn new(obj_type: ObjectType, name: Name) -> Self {
        ResourceKey {
            obj_type,
            name,
            obj_id: None,
        }
    }

    pub fn with_obj_id(obj_type: ObjectType, name: Name, obj_id: [u8; 16]) -> Self {
        ResourceKey {
            obj_type,
            name,
            obj_id: Some(obj_id),
        }
    }

    /// The same identity under a new name
    pub fn renamed(&self, name: Name) -> Self {
        ResourceKey { name, ..*self }
    }
}

/// The 8-byte token name opening most field payloads
pub fn token_name(sf: &StructuredField) -> Option<Name> {
    sf.data.get(..8).map(Name::from_bytes)
}

/// Overwrite the leading token name, extending a short payload with blanks
/// the way a name-less end record grows when it is assigned a name
pub fn set_token_name(sf: &mut StructuredField, name: Name) {
    if sf.data.len() < 8 {
        sf.data.resize(8, super::ebcdic::BLANK);
    }
    sf.data[..8].copy_from_slice(name.bytes());
}

/// Derive the resource key of a Begin Resource field
pub fn brs_resource_key(sf: &StructuredField) -> ResourceKey {
    let name = token_name(sf).unwrap_or_default();
    let triplets = triplet::scan(&sf.data, BRS_TRIPLETS);
    let mut obj_type = ObjectType::Other(0);
    for t in &triplets {
        if let Some(b) = triplet::object_type(&sf.data, t) {
            obj_type = ObjectType::from_byte(b);
        }
    }
    let obj_id = if obj_type == ObjectType::ObjectContainer {
        triplets
            .iter()
            .find_map(|t| triplet::reg_obj_id(&sf.data, t))
    } else {
        None
    };
    ResourceKey {
        obj_type,
        name,
        obj_id,
    }
}

/// Derive the resource key referenced by an Include Object field
pub fn iob_resource_key(sf: &StructuredField) -> Option<ResourceKey> {
    let name = token_name(sf)?;
    let obj_type = ObjectType::from_byte(*sf.data.get(IOB_OBJ_TYPE)?);
    let obj_id = if obj_type == ObjectType::ObjectContainer {
        triplet::scan(&sf.data, IOB_TRIPLETS)
            .iter()
            .find_map(|t| triplet::reg_obj_id(&sf.data, t))
    } else {
        None
    };
    Some(ResourceKey {
        obj_type,
        name,
        obj_id,
    })
}

/// Patch the first replace-first-GID FQN triplet, if the field carries one
pub fn patch_replace_first_gid(data: &mut Vec<u8>, triplets_from: usize, name: Name) {
    for t in triplet::scan(data, triplets_from) {
        if triplet::fqn_type(data, &t) == Some(triplet::FQN_REPLACE_FIRST_GID) {
            triplet::set_fqn_name(data, &t, name);
            break;
        }
    }
}

/// Two leading all-ones bytes mark a name slot as not set; such a slot must
/// not be read as a real reference
pub fn is_unset_name_sentinel(bytes: &[u8]) -> bool {
    bytes.len() >= 2 && bytes[0] == 0xFF && bytes[1] == 0xFF
}

/// Build a Begin Resource field for the given key
pub fn begin_resource(key: &ResourceKey) -> StructuredField {
    let mut data = Vec::with_capacity(17);
    data.extend_from_slice(key.name.bytes());
    data.extend_from_slice(&[0, 0]);
    data.extend_from_slice(&triplet::resource_object_type(key.obj_type.byte()));
    StructuredField::with_data(sfid::BRS, data)
}

/// Build an End Resource field carrying the given name
pub fn end_resource(name: Name) -> StructuredField {
    StructuredField::with_data(sfid::ERS, name.bytes().to_vec())
}

//! Document content rewriting
//!
//! Streams each file's document content into the output, patching every
//! field that references a resource or medium map by name. Fields the
//! dispatch does not recognize, and recognized fields whose references were
//! not renamed, are copied from the raw read buffer so their bytes stay
//! identical to the source. Patched fields only ever have name bytes
//! overwritten in place; their length never changes.

use std::io::Write;

use tracing::{info, trace, warn};

use crate::afp::{fields, sfid, triplet, AfpReader, AfpWriter, Name, ObjectType, ResourceKey, StructuredField};
use crate::error::Result;

use super::InputFile;

pub(crate) fn write_documents<W: Write>(out: &mut AfpWriter<W>, files: &[InputFile]) -> Result<()> {
    for file in files {
        info!("writing documents from {}", file.path.display());
        let mut reader = AfpReader::open(&file.path)?;
        reader.seek(file.document_start)?;

        while let Some(mut field) = reader.next_field()? {
            if patch_references(file, &mut field) {
                out.write_field(&field)?;
            } else {
                out.write_raw(reader.last_raw())?;
            }
        }
    }
    Ok(())
}

/// Dispatch one document field to its reference patcher.
///
/// Returns whether the field was modified and must be re-serialized.
fn patch_references(file: &InputFile, field: &mut StructuredField) -> bool {
    match field.id {
        sfid::IMM => patch_imm(file, field),
        sfid::IOB => patch_iob(file, field),
        sfid::IPG => false, // page includes carry no renameable reference
        sfid::IPO => patch_include(file, field, ObjectType::Overlay, fields::IPO_TRIPLETS),
        sfid::IPS => patch_include(file, field, ObjectType::PageSegment, fields::IPS_TRIPLETS),
        sfid::MCF => patch_mcf(file, field),
        sfid::MCF1 => patch_mcf1(file, field),
        sfid::MDR => patch_mdr(file, field),
        sfid::MMO => patch_mmo(file, field),
        sfid::MPG => {
            warn!("MPG is not supported, passing through untouched");
            false
        }
        sfid::MPO => patch_mpo(file, field),
        sfid::MPS => patch_mps(file, field),
        _ => false,
    }
}

/// Invoke Medium Map: the name is a medium map reference, not a resource key
fn patch_imm(file: &InputFile, field: &mut StructuredField) -> bool {
    let Some(name) = fields::token_name(field) else {
        return false;
    };
    let Some(&new_name) = file.medium_map_renames.get(&name) else {
        return false;
    };
    fields::set_token_name(field, new_name);
    fields::patch_replace_first_gid(&mut field.data, fields::IMM_TRIPLETS, new_name);
    trace!("rename {}", new_name);
    true
}

/// Include Object: the key is derived from the object name, the object type
/// byte and, for object containers, the classification triplet
fn patch_iob(file: &InputFile, field: &mut StructuredField) -> bool {
    let Some(key) = fields::iob_resource_key(field) else {
        return false;
    };
    let Some(&new_name) = file.renames.get(&key) else {
        return false;
    };
    fields::set_token_name(field, new_name);
    fields::patch_replace_first_gid(&mut field.data, fields::IOB_TRIPLETS, new_name);
    trace!("rename {}", new_name);
    true
}

/// Include Page Overlay / Include Page Segment: a bare leading name of a
/// fixed object type
fn patch_include(
    file: &InputFile,
    field: &mut StructuredField,
    obj_type: ObjectType,
    triplets_from: usize,
) -> bool {
    let Some(name) = fields::token_name(field) else {
        return false;
    };
    let Some(&new_name) = file.renames.get(&ResourceKey::new(obj_type, name)) else {
        return false;
    };
    fields::set_token_name(field, new_name);
    fields::patch_replace_first_gid(&mut field.data, triplets_from, new_name);
    trace!("rename {}", new_name);
    true
}

/// Map Coded Font (format 2): repeating groups of triplets, each group
/// prefixed with its 2-byte length; one font/code page/coded font reference
/// per FQN triplet
fn patch_mcf(file: &InputFile, field: &mut StructuredField) -> bool {
    let mut modified = false;
    for (start, end) in group_spans(&field.data) {
        for t in triplet::scan(&field.data[..end], start + 2) {
            let Some(fqn_type) = triplet::fqn_type(&field.data, &t) else {
                continue;
            };
            let Some(name) = triplet::fqn_name(&field.data, &t) else {
                continue;
            };
            let obj_type = match fqn_type {
                triplet::FQN_FONT_CHARACTER_SET_NAME_REF => ObjectType::FontCharacterSet,
                triplet::FQN_CODE_PAGE_NAME_REF => ObjectType::CodePage,
                triplet::FQN_CODED_FONT_NAME_REF => ObjectType::CodedFont,
                _ => continue,
            };
            if let Some(&new_name) = file.renames.get(&ResourceKey::new(obj_type, name)) {
                triplet::set_fqn_name(&mut field.data, &t, new_name);
                trace!("rename {}", new_name);
                modified = true;
            }
        }
    }
    modified
}

/// Layout of one Map Coded Font format 1 repeating group: local id byte,
/// reserved byte, then the three 8-byte names
const MCF1_GROUPS_FROM: usize = 4;
const MCF1_CODED_FONT: usize = 2;
const MCF1_CODE_PAGE: usize = 10;
const MCF1_CHARACTER_SET: usize = 18;
const MCF1_MIN_GROUP: usize = 26;

/// Map Coded Font (format 1): fixed-length repeating groups; a name slot of
/// two leading all-ones bytes is unset and must not be looked up
fn patch_mcf1(file: &InputFile, field: &mut StructuredField) -> bool {
    if field.data.len() < MCF1_GROUPS_FROM {
        return false;
    }
    let group_len = field.data[0] as usize;
    if group_len < MCF1_MIN_GROUP {
        return false;
    }

    let mut modified = false;
    let mut pos = MCF1_GROUPS_FROM;
    while pos + group_len <= field.data.len() {
        modified |= patch_fixed_name(
            file,
            &mut field.data,
            pos + MCF1_CHARACTER_SET,
            ObjectType::FontCharacterSet,
        );
        modified |= patch_fixed_name(
            file,
            &mut field.data,
            pos + MCF1_CODED_FONT,
            ObjectType::CodedFont,
        );
        modified |= patch_fixed_name(
            file,
            &mut field.data,
            pos + MCF1_CODE_PAGE,
            ObjectType::CodePage,
        );
        pos += group_len;
    }
    modified
}

/// Map Data Resource: repeating groups of triplets; object data references
/// are keyed as object containers with the classification triplet's
/// registered object id
fn patch_mdr(file: &InputFile, field: &mut StructuredField) -> bool {
    let mut modified = false;
    for (start, end) in group_spans(&field.data) {
        let triplets = triplet::scan(&field.data[..end], start + 2);
        let obj_id = triplets
            .iter()
            .find_map(|t| triplet::reg_obj_id(&field.data, t));

        for t in &triplets {
            let Some(fqn_type) = triplet::fqn_type(&field.data, t) else {
                continue;
            };
            let Some(name) = triplet::fqn_name(&field.data, t) else {
                continue;
            };
            let key = match fqn_type {
                triplet::FQN_RESOURCE_OBJECT_REF => ResourceKey::new(ObjectType::Ioca, name),
                triplet::FQN_OTHER_OBJECT_DATA_REF
                | triplet::FQN_DATA_OBJECT_EXTERNAL_RESOURCE_REF => match obj_id {
                    Some(id) => ResourceKey::with_obj_id(ObjectType::ObjectContainer, name, id),
                    None => continue,
                },
                _ => continue,
            };
            if let Some(&new_name) = file.renames.get(&key) {
                triplet::set_fqn_name(&mut field.data, t, new_name);
                trace!("rename {}", new_name);
                modified = true;
            }
        }
    }
    modified
}

/// Layout of one Map Medium Overlay repeating group: local id byte, three
/// reserved bytes, 8-byte overlay name
const MMO_GROUP_LEN: usize = 12;
const MMO_NAME: usize = 4;

fn patch_mmo(file: &InputFile, field: &mut StructuredField) -> bool {
    let mut modified = false;
    let mut pos = 0;
    while pos + MMO_GROUP_LEN <= field.data.len() {
        modified |= patch_fixed_name(file, &mut field.data, pos + MMO_NAME, ObjectType::Overlay);
        pos += MMO_GROUP_LEN;
    }
    modified
}

/// Map Page Overlay: repeating groups of triplets, overlays referenced
/// through resource object reference FQNs
fn patch_mpo(file: &InputFile, field: &mut StructuredField) -> bool {
    let mut modified = false;
    for (start, end) in group_spans(&field.data) {
        for t in triplet::scan(&field.data[..end], start + 2) {
            if triplet::fqn_type(&field.data, &t) != Some(triplet::FQN_RESOURCE_OBJECT_REF) {
                continue;
            }
            let Some(name) = triplet::fqn_name(&field.data, &t) else {
                continue;
            };
            if let Some(&new_name) = file
                .renames
                .get(&ResourceKey::new(ObjectType::Overlay, name))
            {
                triplet::set_fqn_name(&mut field.data, &t, new_name);
                trace!("rename {}", new_name);
                modified = true;
            }
        }
    }
    modified
}

/// Layout of the Map Page Segment payload: 4 header bytes, then fixed
/// repeating groups of four reserved bytes and an 8-byte segment name
const MPS_GROUPS_FROM: usize = 4;
const MPS_GROUP_LEN: usize = 12;
const MPS_NAME: usize = 4;

fn patch_mps(file: &InputFile, field: &mut StructuredField) -> bool {
    let mut modified = false;
    let mut pos = MPS_GROUPS_FROM;
    while pos + MPS_GROUP_LEN <= field.data.len() {
        modified |= patch_fixed_name(
            file,
            &mut field.data,
            pos + MPS_NAME,
            ObjectType::PageSegment,
        );
        pos += MPS_GROUP_LEN;
    }
    modified
}

/// Patch one 8-byte name slot at a fixed payload offset, honoring the unset
/// sentinel
fn patch_fixed_name(
    file: &InputFile,
    data: &mut [u8],
    at: usize,
    obj_type: ObjectType,
) -> bool {
    let Some(raw) = data.get(at..at + 8) else {
        return false;
    };
    if fields::is_unset_name_sentinel(raw) {
        return false;
    }
    let name = Name::from_bytes(raw);
    let Some(&new_name) = file.renames.get(&ResourceKey::new(obj_type, name)) else {
        return false;
    };
    data[at..at + 8].copy_from_slice(new_name.bytes());
    trace!("rename {}", new_name);
    true
}

/// Byte spans of repeating groups prefixed with a 2-byte big-endian length
fn group_spans(data: &[u8]) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut pos = 0;
    while pos + 2 <= data.len() {
        let len = u16::from_be_bytes([data[pos], data[pos + 1]]) as usize;
        if len < 2 || pos + len > data.len() {
            break;
        }
        spans.push((pos, pos + len));
        pos += len;
    }
    spans
}

//! Merged resource group emission
//!
//! Writes the output's single resource group: the merged form definition
//! wrapped in a placeholder resource, then every still-unique resource body
//! copied byte-for-byte from its source file. Only the begin/end boundary
//! records of renamed resources are patched; body bytes are never
//! reinterpreted.

use std::collections::HashSet;
use std::io::Write;

use tracing::{debug, info};

use crate::afp::{fields, sfid, AfpReader, AfpWriter, Name, ObjectType, ResourceKey, StructuredField};
use crate::error::{Error, Result};

use super::InputFile;

/// Reserved name of the placeholder resource that carries the merged
/// form definition
const INLINE_FORMDEF: &str = "F1INLINE";

const COPY_BUF: usize = 8 * 1024;

pub(crate) fn write_resource_group<W: Write>(
    out: &mut AfpWriter<W>,
    files: &[InputFile],
    formdef: &[StructuredField],
) -> Result<()> {
    out.write_field(&StructuredField::new(sfid::BRG))?;

    // the merged formdef travels inline, ahead of every other resource
    let placeholder = ResourceKey::new(ObjectType::FormMap, Name::from_ascii(INLINE_FORMDEF));
    out.write_field(&fields::begin_resource(&placeholder))?;
    for sf in formdef {
        out.write_field(sf)?;
    }
    out.write_field(&StructuredField::new(sfid::ERS))?;

    info!("writing resource group");

    let mut written: HashSet<ResourceKey> = HashSet::new();

    for file in files {
        let mut reader = AfpReader::open(&file.path)?;
        for key in &file.resources {
            if key.obj_type == ObjectType::FormMap {
                debug!("not writing formdef {}", key.name);
                continue;
            }
            let Some(resource) = file.by_key.get(key) else {
                continue;
            };

            reader.seek(resource.start)?;
            let Some(mut brs) = reader.next_field()? else {
                return Err(Error::Truncated(resource.start));
            };

            let renamed = file.renames.get(key).copied();
            if let Some(new_name) = renamed {
                let new_key = key.renamed(new_name);
                if written.contains(&new_key) {
                    debug!("not writing resource {} as {} again", key.name, new_name);
                    continue;
                }
                fields::set_token_name(&mut brs, new_name);
                fields::patch_replace_first_gid(&mut brs.data, fields::BRS_TRIPLETS, new_name);
                written.insert(new_key);
                debug!(
                    "writing resource {} as {} from {}",
                    key.name,
                    new_name,
                    file.path.display()
                );
            } else if written.contains(key) {
                debug!("not writing resource {} again", key.name);
                continue;
            } else {
                written.insert(*key);
                debug!("writing resource {} from {}", key.name, file.path.display());
            }

            out.write_field(&brs)?;
            copy_body(&mut reader, out, resource.ers_pos, file)?;

            let Some(mut ers) = reader.next_field()? else {
                return Err(Error::Truncated(resource.ers_pos));
            };
            if let Some(new_name) = renamed {
                fields::set_token_name(&mut ers, new_name);
            }
            out.write_field(&ers)?;
        }
    }

    out.write_field(&StructuredField::new(sfid::ERG))?;
    Ok(())
}

/// Copy raw bytes from the reader's position up to the end boundary.
///
/// A shortfall means the scan's offsets disagree with the file on disk,
/// which is unrecoverable.
fn copy_body<W: Write>(
    reader: &mut AfpReader<std::io::BufReader<std::fs::File>>,
    out: &mut AfpWriter<W>,
    ers_pos: u64,
    file: &InputFile,
) -> Result<()> {
    let mut buffer = [0u8; COPY_BUF];
    let mut left = ers_pos.saturating_sub(reader.offset());
    while left > 0 {
        let want = left.min(buffer.len() as u64) as usize;
        let n = reader.read_raw(&mut buffer[..want])?;
        if n == 0 {
            break;
        }
        out.write_raw(&buffer[..n])?;
        left -= n as u64;
    }
    if left > 0 {
        return Err(Error::ResourceCopy(file.path.clone()));
    }
    Ok(())
}

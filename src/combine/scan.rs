//! Resource scanning: one forward pass per input file
//!
//! Builds the file's inventory of resources and medium maps, their byte
//! ranges and content hashes, the captured form definition fields and the
//! offset where document content begins. Nothing is seeked or written;
//! truncated input surfaces as an error and no partial inventory is
//! returned.

use std::path::Path;

use tracing::debug;

use crate::afp::{fields, sfid, AfpReader, Name, ObjectType, ResourceKey};
use crate::error::Result;

use super::{DigestAlgorithm, GlobalNames, InputFile, MediumMap, Resource};

pub(crate) fn scan_file(
    path: &Path,
    digest: DigestAlgorithm,
    names: &mut GlobalNames,
) -> Result<InputFile> {
    let mut reader = AfpReader::open(path)?;
    let mut file = InputFile::new(path);

    let mut prev_offset = 0u64;
    // at most one accumulator is open at a time: a resource body or a
    // medium map body, never both
    let mut accumulator: Option<Vec<u8>> = None;
    let mut open_resource: Option<(ResourceKey, u64)> = None;
    let mut open_map: Option<Name> = None;
    let mut processing_formdef = false;
    let mut first_formdef = true;

    while let Some(field) = reader.next_field()? {
        let offset = reader.offset();

        if field.id == sfid::ERG {
            // everything after the resource group is document content
            file.document_start = offset;
            break;
        }

        if field.id == sfid::BRS {
            let key = fields::brs_resource_key(&field);
            if key.obj_type == ObjectType::FormMap {
                // the formdef is captured through its BFM block below, not
                // as an inventory resource
            } else {
                accumulator = Some(Vec::new());
                file.resources.push(key);
                open_resource = Some((key, prev_offset));
            }
        }

        if field.id == sfid::BFM && first_formdef {
            debug!("processing formdef");
            processing_formdef = true;
        }

        if processing_formdef {
            file.formdef.push(field.clone());
        }

        if field.id == sfid::BMM && first_formdef {
            if let Some(name) = fields::token_name(&field) {
                debug!("{}: found medium map {}", path.display(), name);
                file.medium_map_names.push(name);
                file.medium_maps.insert(name, MediumMap::default());
                open_map = Some(name);
                accumulator = Some(Vec::new());
            }
        }

        if processing_formdef {
            if let Some(map) = open_map.and_then(|name| file.medium_maps.get_mut(&name)) {
                map.fields.push(field.clone());
            }
        }

        // end markers are finalized before the raw bytes are appended, so a
        // body hash never covers its own closing marker
        if field.id == sfid::EMM && first_formdef {
            if let Some(name) = open_map.take() {
                if let (Some(content), Some(map)) =
                    (accumulator.take(), file.medium_maps.get_mut(&name))
                {
                    map.hash = digest.hash(&content);
                    map.content = content;
                    names.medium_maps.insert(name);
                    debug!(
                        "{}@..{}: found {}, hash {}",
                        path.display(),
                        offset,
                        name,
                        map.hash
                    );
                }
            }
            accumulator = None;
        } else if field.id == sfid::ERS {
            if accumulator.is_none() {
                // closing an untracked formdef resource; later formdef
                // blocks in this file carry no meaning
                first_formdef = false;
            } else if let (Some((key, start)), Some(content)) =
                (open_resource.take(), accumulator.take())
            {
                let resource = Resource {
                    start,
                    end: offset,
                    ers_pos: prev_offset,
                    hash: digest.hash(&content),
                    content,
                };
                names.resources.insert(key.name);
                debug!(
                    "{}@{}-{}: found {:?}, hash {}",
                    path.display(),
                    resource.start,
                    resource.end,
                    key,
                    resource.hash
                );
                file.by_key.insert(key, resource);
            }
        } else if let Some(buffer) = accumulator.as_mut() {
            buffer.extend_from_slice(reader.last_raw());
        }

        if field.id == sfid::EFM {
            processing_formdef = false;
        }

        prev_offset = offset;
    }

    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::afp::{AfpWriter, StructuredField};
    use tempfile::TempDir;

    fn write_fixture(path: &Path, fields: &[StructuredField]) {
        let mut writer = AfpWriter::create(path).unwrap();
        for sf in fields {
            writer.write_field(sf).unwrap();
        }
        writer.flush().unwrap();
    }

    fn pseg(name: &str) -> ResourceKey {
        ResourceKey::new(ObjectType::PageSegment, Name::from_ascii(name))
    }

    #[test]
    fn test_scan_inventories_resources_and_document_start() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("in.afp");
        let body = StructuredField::with_data(sfid::NOP, vec![1, 2, 3]);
        write_fixture(
            &path,
            &[
                StructuredField::new(sfid::BRG),
                fields::begin_resource(&pseg("S1A")),
                body.clone(),
                fields::end_resource(Name::from_ascii("S1A")),
                StructuredField::new(sfid::ERG),
                StructuredField::with_data(sfid::BDT, Name::from_ascii("DOC").bytes().to_vec()),
                StructuredField::new(sfid::EDT),
            ],
        );

        let mut names = GlobalNames::default();
        let file = scan_file(&path, DigestAlgorithm::Md5, &mut names).unwrap();

        assert_eq!(file.resources, vec![pseg("S1A")]);
        let resource = &file.by_key[&pseg("S1A")];
        // BRG is 9 bytes on disk, so the resource begins right after it
        assert_eq!(resource.start, 9);
        assert!(resource.ers_pos > resource.start);
        assert_eq!(resource.end, file.document_start - 9);
        // the hash covers the begin boundary and the body, not the ERS
        let mut expected = Vec::new();
        {
            let mut w = AfpWriter::new(&mut expected);
            w.write_field(&fields::begin_resource(&pseg("S1A"))).unwrap();
            w.write_field(&body).unwrap();
        }
        assert_eq!(resource.content, expected);
        assert_eq!(resource.hash, DigestAlgorithm::Md5.hash(&expected));
        assert!(names.resources.contains(&Name::from_ascii("S1A")));
    }

    #[test]
    fn test_scan_captures_first_formdef_and_medium_maps() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("in.afp");
        let formdef_key = ResourceKey::new(ObjectType::FormMap, Name::from_ascii("F1FORM"));
        write_fixture(
            &path,
            &[
                StructuredField::new(sfid::BRG),
                fields::begin_resource(&formdef_key),
                StructuredField::new(sfid::BFM),
                StructuredField::new(sfid::BDG),
                StructuredField::with_data(sfid::FGD, vec![9]),
                StructuredField::new(sfid::EDG),
                StructuredField::with_data(sfid::BMM, Name::from_ascii("MM1").bytes().to_vec()),
                StructuredField::with_data(sfid::MMC, vec![1]),
                StructuredField::new(sfid::EMM),
                StructuredField::new(sfid::EFM),
                fields::end_resource(Name::from_ascii("F1FORM")),
                StructuredField::new(sfid::ERG),
            ],
        );

        let mut names = GlobalNames::default();
        let file = scan_file(&path, DigestAlgorithm::Md5, &mut names).unwrap();

        // the formdef is not part of the resource inventory
        assert!(file.resources.is_empty());
        assert_eq!(file.medium_map_names, vec![Name::from_ascii("MM1")]);
        let map = &file.medium_maps[&Name::from_ascii("MM1")];
        assert_eq!(map.fields.len(), 3); // BMM, MMC, EMM
        assert_eq!(map.fields[0].id, sfid::BMM);
        assert!(!map.hash.is_empty());
        assert!(names.medium_maps.contains(&Name::from_ascii("MM1")));
        // formdef capture runs from BFM through EFM
        assert_eq!(file.formdef.first().map(|sf| sf.id), Some(sfid::BFM));
        assert_eq!(file.formdef.last().map(|sf| sf.id), Some(sfid::EFM));
    }

    #[test]
    fn test_scan_ignores_second_formdef_medium_maps() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("in.afp");
        let formdef_key = ResourceKey::new(ObjectType::FormMap, Name::from_ascii("F1FORM"));
        let second_key = ResourceKey::new(ObjectType::FormMap, Name::from_ascii("F2FORM"));
        write_fixture(
            &path,
            &[
                StructuredField::new(sfid::BRG),
                fields::begin_resource(&formdef_key),
                StructuredField::new(sfid::BFM),
                StructuredField::with_data(sfid::BMM, Name::from_ascii("MM1").bytes().to_vec()),
                StructuredField::new(sfid::EMM),
                StructuredField::new(sfid::EFM),
                fields::end_resource(Name::from_ascii("F1FORM")),
                fields::begin_resource(&second_key),
                StructuredField::new(sfid::BFM),
                StructuredField::with_data(sfid::BMM, Name::from_ascii("MM2").bytes().to_vec()),
                StructuredField::new(sfid::EMM),
                StructuredField::new(sfid::EFM),
                fields::end_resource(Name::from_ascii("F2FORM")),
                StructuredField::new(sfid::ERG),
            ],
        );

        let mut names = GlobalNames::default();
        let file = scan_file(&path, DigestAlgorithm::Md5, &mut names).unwrap();

        assert_eq!(file.medium_map_names, vec![Name::from_ascii("MM1")]);
        assert!(!names.medium_maps.contains(&Name::from_ascii("MM2")));
    }
}

//! Merged form definition assembly
//!
//! Collects every file's medium maps into one form definition, deduplicated
//! by final (possibly renamed) name, first writer wins. Attribute fields a
//! medium map does not carry itself are inherited from its file's document
//! environment group, category by category; a map's own instances of a
//! category always win outright, partial sets are never mixed.

use std::collections::HashSet;

use tracing::debug;

use crate::afp::{fields, sfid, Name, StructuredField};

use super::InputFile;

/// Attribute categories a medium map may inherit from the environment
/// group, with the alternate identifier for the category that has two
/// encodings (page position)
const INHERITED: [(u32, Option<u32>); 13] = [
    (sfid::FGD, None),
    (sfid::MMO, None),
    (sfid::MPO, None),
    (sfid::MMT, None),
    (sfid::MMD, None),
    (sfid::MDR, None),
    (sfid::PGP, Some(sfid::PGP1)),
    (sfid::MDD, None),
    (sfid::MCC, None),
    (sfid::MMC, None),
    (sfid::PMC, None),
    (sfid::MFC, None),
    (sfid::PEC, None),
];

pub(crate) fn build_formdef(files: &[InputFile]) -> Vec<StructuredField> {
    let mut merged = vec![StructuredField::new(sfid::BFM)];
    let mut written: HashSet<Name> = HashSet::new();

    for file in files {
        let env = environment_group(&file.formdef);

        for name in &file.medium_map_names {
            let Some(map) = file.medium_maps.get(name) else {
                continue;
            };
            let final_name = file
                .medium_map_renames
                .get(name)
                .copied()
                .unwrap_or(*name);
            if written.contains(&final_name) {
                debug!("not writing medium map {} as {} again", name, final_name);
                continue;
            }
            // the first captured field is the BMM that opened the map; a map
            // announced outside a formdef block captures no fields at all
            // and has nothing to emit
            let Some(first) = map.fields.first() else {
                debug!("medium map {} has no fields, skipping", name);
                continue;
            };
            debug!(
                "writing medium map {} as {} from {}",
                name,
                final_name,
                file.path.display()
            );

            let mut bmm = first.clone();
            if final_name != *name {
                fields::set_token_name(&mut bmm, final_name);
            }
            merged.push(bmm);

            for (id, alt) in INHERITED {
                append_category(&mut merged, &env, &map.fields, id, alt);
            }

            merged.push(StructuredField::new(sfid::EMM));
            written.insert(final_name);
        }
    }

    merged.push(StructuredField::new(sfid::EFM));
    merged
}

/// Fields strictly between the begin/end environment group markers
fn environment_group(formdef: &[StructuredField]) -> Vec<StructuredField> {
    let mut env = Vec::new();
    let mut inside = false;
    for sf in formdef {
        if sf.id == sfid::BDG {
            inside = true;
            continue;
        }
        if sf.id == sfid::EDG {
            inside = false;
        }
        if inside {
            env.push(sf.clone());
        }
    }
    env
}

/// Append the map's own instances of one category, or the environment
/// group's if the map has none
fn append_category(
    dest: &mut Vec<StructuredField>,
    env: &[StructuredField],
    map: &[StructuredField],
    id: u32,
    alt: Option<u32>,
) {
    let matches = |sf: &&StructuredField| sf.id == id || alt == Some(sf.id);
    let own: Vec<StructuredField> = map.iter().filter(matches).cloned().collect();
    if own.is_empty() {
        dest.extend(env.iter().filter(matches).cloned());
    } else {
        dest.extend(own);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combine::MediumMap;
    use std::path::Path;

    fn file_with_map(
        map_name: &str,
        env: Vec<StructuredField>,
        map_fields: Vec<StructuredField>,
        content: &[u8],
    ) -> InputFile {
        let mut file = InputFile::new(Path::new("test.afp"));
        let name = Name::from_ascii(map_name);
        let mut formdef = vec![StructuredField::new(sfid::BFM), StructuredField::new(sfid::BDG)];
        formdef.extend(env);
        formdef.push(StructuredField::new(sfid::EDG));

        let mut fields = vec![StructuredField::with_data(
            sfid::BMM,
            name.bytes().to_vec(),
        )];
        fields.extend(map_fields);
        fields.push(StructuredField::new(sfid::EMM));
        formdef.extend(fields.iter().cloned());
        formdef.push(StructuredField::new(sfid::EFM));

        file.formdef = formdef;
        file.medium_map_names.push(name);
        file.medium_maps.insert(
            name,
            MediumMap {
                fields,
                content: content.to_vec(),
                hash: String::from_utf8_lossy(content).to_string(),
            },
        );
        file
    }

    fn ids(fields: &[StructuredField]) -> Vec<u32> {
        fields.iter().map(|sf| sf.id).collect()
    }

    #[test]
    fn test_own_attributes_beat_environment_group() {
        let env_mmc = StructuredField::with_data(sfid::MMC, vec![1]);
        let own_mmc = StructuredField::with_data(sfid::MMC, vec![2]);
        let file = file_with_map("MM1", vec![env_mmc], vec![own_mmc.clone()], b"x");

        let merged = build_formdef(&[file]);
        let mmc: Vec<&StructuredField> = merged.iter().filter(|sf| sf.id == sfid::MMC).collect();
        assert_eq!(mmc, vec![&own_mmc]);
    }

    #[test]
    fn test_missing_category_falls_back_to_environment_group() {
        let env_fgd = StructuredField::with_data(sfid::FGD, vec![9]);
        let file = file_with_map("MM1", vec![env_fgd.clone()], vec![], b"x");

        let merged = build_formdef(&[file]);
        assert_eq!(
            ids(&merged),
            vec![sfid::BFM, sfid::BMM, sfid::FGD, sfid::EMM, sfid::EFM]
        );
        assert_eq!(merged[2], env_fgd);
    }

    #[test]
    fn test_page_position_alternate_encoding_matches() {
        let pgp1 = StructuredField::with_data(sfid::PGP1, vec![3]);
        let file = file_with_map("MM1", vec![], vec![pgp1.clone()], b"x");

        let merged = build_formdef(&[file]);
        assert!(merged.contains(&pgp1));
    }

    #[test]
    fn test_map_with_no_captured_fields_is_skipped() {
        // a BMM outside any formdef block registers the map name but
        // captures no fields
        let mut file = InputFile::new(Path::new("test.afp"));
        let name = Name::from_ascii("MM1");
        file.medium_map_names.push(name);
        file.medium_maps.insert(name, MediumMap::default());

        let merged = build_formdef(&[file]);
        assert_eq!(ids(&merged), vec![sfid::BFM, sfid::EFM]);
    }

    #[test]
    fn test_duplicate_final_names_written_once() {
        let a = file_with_map("MM1", vec![], vec![], b"same");
        let b = file_with_map("MM1", vec![], vec![], b"same");

        let merged = build_formdef(&[a, b]);
        let bmm_count = merged.iter().filter(|sf| sf.id == sfid::BMM).count();
        assert_eq!(bmm_count, 1);
    }

    #[test]
    fn test_renamed_map_carries_its_final_name() {
        let a = file_with_map("MM1", vec![], vec![], b"one");
        let mut b = file_with_map("MM1", vec![], vec![], b"two");
        b.medium_map_renames
            .insert(Name::from_ascii("MM1"), Name::from_ascii("MM9ABCDE"));

        let merged = build_formdef(&[a, b]);
        let names: Vec<Name> = merged
            .iter()
            .filter(|sf| sf.id == sfid::BMM)
            .filter_map(fields::token_name)
            .collect();
        assert_eq!(
            names,
            vec![Name::from_ascii("MM1"), Name::from_ascii("MM9ABCDE")]
        );
    }
}

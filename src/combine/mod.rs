//! AFP combine engine
//!
//! Merges several AFP files into one output file, keeping a single copy of
//! every embedded resource and medium map that is byte-identical across
//! inputs and renaming the ones that collide on name but differ in content.
//! The merge runs in fixed phases over the inputs, in input order:
//!
//! 1. scan every file's resource group ([`scan`])
//! 2. resolve cross-file name collisions ([`rename`])
//! 3. assemble the shared form definition ([`formdef`])
//! 4. write the merged resource group ([`group`])
//! 5. rewrite every file's document content, patching references
//!    ([`document`])
//!
//! Phases 2-5 depend on all earlier phases having completed; the output file
//! must be discarded if any phase reports an error.

mod document;
mod formdef;
mod group;
mod rename;
mod scan;

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::afp::{AfpWriter, Name, ResourceKey, StructuredField};
use crate::error::{Error, Result};

/// Content hash used to decide resource equality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DigestAlgorithm {
    /// 128-bit MD5, the default
    #[default]
    Md5,
    /// 256-bit SHA-2
    Sha256,
}

impl DigestAlgorithm {
    /// Digest of the given bytes as lowercase hex
    pub fn hash(&self, bytes: &[u8]) -> String {
        match self {
            DigestAlgorithm::Md5 => {
                use md5::{Digest, Md5};
                hex::encode(Md5::digest(bytes))
            }
            DigestAlgorithm::Sha256 => {
                use sha2::{Digest, Sha256};
                hex::encode(Sha256::digest(bytes))
            }
        }
    }
}

impl FromStr for DigestAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "md5" => Ok(DigestAlgorithm::Md5),
            "sha256" => Ok(DigestAlgorithm::Sha256),
            other => Err(Error::UnknownDigest(other.to_string())),
        }
    }
}

/// Options for combining AFP files
#[derive(Debug, Clone)]
pub struct CombineOptions {
    /// Input AFP file paths in the order their documents should appear
    pub input_paths: Vec<PathBuf>,
    /// Output AFP file path (created or truncated)
    pub output_path: PathBuf,
    /// Content hash algorithm for resource equality
    pub digest: DigestAlgorithm,
}

/// One tracked resource occurrence in an input file
pub(crate) struct Resource {
    /// Offset of the Begin Resource field
    pub start: u64,
    /// Offset just past the End Resource field
    pub end: u64,
    /// Offset of the End Resource field, bounding the body copy
    pub ers_pos: u64,
    /// Exact encoded bytes from the begin boundary up to `ers_pos`
    pub content: Vec<u8>,
    /// Content hash over `content`
    pub hash: String,
}

/// One medium map captured from a file's first form definition
#[derive(Default)]
pub(crate) struct MediumMap {
    /// The map's fields in order; the first is always its Begin Medium Map
    pub fields: Vec<StructuredField>,
    /// Exact encoded bytes from the begin marker up to the end marker
    pub content: Vec<u8>,
    /// Content hash over `content`
    pub hash: String,
}

/// Everything the scan learned about one input file, plus the rename
/// decisions later phases attach to it
pub(crate) struct InputFile {
    pub path: PathBuf,
    /// Resource keys in encounter order; this is the write order
    pub resources: Vec<ResourceKey>,
    pub by_key: HashMap<ResourceKey, Resource>,
    /// Final names assigned to this file's colliding resources
    pub renames: HashMap<ResourceKey, Name>,
    /// Final names assigned to this file's colliding medium maps
    pub medium_map_renames: HashMap<Name, Name>,
    /// Offset where document content begins (just past End Resource Group)
    pub document_start: u64,
    /// Fields of the first form definition, in order
    pub formdef: Vec<StructuredField>,
    /// Medium map names in encounter order
    pub medium_map_names: Vec<Name>,
    pub medium_maps: HashMap<Name, MediumMap>,
}

impl InputFile {
    fn new(path: &Path) -> Self {
        InputFile {
            path: path.to_path_buf(),
            resources: Vec::new(),
            by_key: HashMap::new(),
            renames: HashMap::new(),
            medium_map_renames: HashMap::new(),
            document_start: 0,
            formdef: Vec::new(),
            medium_map_names: Vec::new(),
            medium_maps: HashMap::new(),
        }
    }
}

/// Names in use across the whole run, one namespace for resources and one
/// for medium maps. Append-only; synthesized names are checked against and
/// registered here so they stay globally unique.
#[derive(Default)]
pub(crate) struct GlobalNames {
    pub resources: HashSet<Name>,
    pub medium_maps: HashSet<Name>,
}

/// Combine multiple AFP files into a single output file
///
/// # Example
///
/// ```no_run
/// use afp_combine::combine::{combine_files, CombineOptions, DigestAlgorithm};
/// use std::path::PathBuf;
///
/// let options = CombineOptions {
///     input_paths: vec![
///         PathBuf::from("january.afp"),
///         PathBuf::from("february.afp"),
///     ],
///     output_path: PathBuf::from("combined.afp"),
///     digest: DigestAlgorithm::Md5,
/// };
///
/// combine_files(&options).expect("failed to combine AFP files");
/// ```
pub fn combine_files(options: &CombineOptions) -> Result<()> {
    if options.input_paths.is_empty() {
        return Err(Error::General("no input files provided".to_string()));
    }
    for path in &options.input_paths {
        if !path.exists() {
            return Err(Error::FileNotFound(path.clone()));
        }
    }

    let mut names = GlobalNames::default();

    let mut files = Vec::with_capacity(options.input_paths.len());
    for path in &options.input_paths {
        files.push(scan::scan_file(path, options.digest, &mut names)?);
    }

    rename::build_renaming_table(&mut files, &mut names)?;

    let formdef = formdef::build_formdef(&files);

    let mut out = AfpWriter::create(&options.output_path)?;
    group::write_resource_group(&mut out, &files, &formdef)?;
    document::write_documents(&mut out, &files)?;
    out.flush()?;

    Ok(())
}

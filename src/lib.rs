//! AFP Combine Library
//!
//! A library for combining multiple AFP (MO:DCA) print files into one.
//! This library provides functionality to:
//! - Merge the documents of several AFP files into a single output
//! - Share byte-identical embedded resources across inputs
//! - Rename colliding resources and medium maps, patching references
//! - Merge each input's form definition into one shared form definition
//!
//! # Example
//!
//! ```no_run
//! use afp_combine::combine::{combine_files, CombineOptions, DigestAlgorithm};
//! use std::path::PathBuf;
//!
//! let options = CombineOptions {
//!     input_paths: vec![
//!         PathBuf::from("january.afp"),
//!         PathBuf::from("february.afp"),
//!     ],
//!     output_path: PathBuf::from("combined.afp"),
//!     digest: DigestAlgorithm::Md5,
//! };
//!
//! combine_files(&options).expect("Failed to combine AFP files");
//! ```

pub mod afp;
pub mod combine;
pub mod error;

// Re-export commonly used items
pub use error::{Error, Result};

//! Reactive App Source
//!
//! Reads the structural model of a class out of its TypeScript source and
//! applies structural edits back to it.
//!
//! # Layers
//!
//! - [`extract`]: source text → [`rapp_protocol::ExtractedClass`]
//! - [`mutate`]: pure rewrites of a parsed [`SourceFile`]
//! - [`SourceWriter`]: per-path serialized, formatted, atomic writes
//! - [`SourceMutator`]: one persisted operation per editor command
//!
//! # Example
//!
//! ```rust
//! use rapp_source::extract;
//!
//! let source = r#"
//! export class B {
//!   @inject("A") a!: A;
//!   @observable count = 0;
//! }
//! "#;
//! let class = extract(source, "B").unwrap();
//! assert_eq!(class.injectors[0].property_name, "a");
//! assert_eq!(class.observables[0].name, "count");
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod edit;
pub mod error;
pub mod extract;
pub mod format;
pub mod imports;
pub mod mutate;
pub mod mutator;
pub mod syntax;
pub mod writer;

pub use edit::{apply_edits, Rewrite, TextEdit};
pub use error::{SourceError, SourceResult};
pub use extract::{extract, extract_file, scan_members, MemberCategory, TaggedMember};
pub use format::{BasicFormatter, FileKind, FormatOptions, Formatter};
pub use mutate::MutationOptions;
pub use mutator::SourceMutator;
pub use syntax::SourceFile;
pub use writer::{write_atomic, SourceWriter};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for extracting and rewriting class sources
    pub use crate::error::{SourceError, SourceResult};
    pub use crate::extract::extract;
    pub use crate::format::{BasicFormatter, FileKind, FormatOptions, Formatter};
    pub use crate::mutate::MutationOptions;
    pub use crate::mutator::SourceMutator;
    pub use crate::writer::SourceWriter;
}

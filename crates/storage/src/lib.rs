#![forbid(unsafe_code)]

//! Read-side data sources behind the ecosystem API.
//!
//! - [`ContractStore`]: append-only JSONL files, one per contract kind.
//! - [`IdeaReader`]: the idea pipeline's SQLite database, opened read-only.
//! - [`AcademyReader`]: persona definitions stored as `personas/<id>/persona.yaml`.

mod academy;
mod contract_store;
mod error;
mod ideas;

pub use academy::AcademyReader;
pub use contract_store::{ContractKind, ContractStore};
pub use error::StoreError;
pub use ideas::{IdeaFilter, IdeaReader};

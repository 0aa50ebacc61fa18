//! NCBI PubMed via E-utilities (`esearch` + `efetch`).

pub mod client;
pub mod parser;

pub use client::{LiteratureSource, PubMedClient};
pub use parser::{ParsedAuthor, pair_authors_positionally, parse_literature_xml};

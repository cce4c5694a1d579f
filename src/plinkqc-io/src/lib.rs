pub mod fam;
pub use fam::{remove_duplicate_ids, DedupSummary, FamError};

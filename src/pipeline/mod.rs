pub mod table;
pub mod extraction;
pub mod labeling;
pub mod batch_completion; // Resumable label synthesis over a pair list
pub mod corpus; // Document folders to text tables, JD x resume pairing

//! Planning dataset ingestion: CSV rows, coordinate resolution and the
//! split into sites and demand points.

mod locate;
mod rows;

pub use locate::{resolve_proposed_site, ExcludedRow, LocatedDataset, LocatedRow, PROPOSED_SITE_NAME};
pub use rows::{load_csv, load_rows, quantile, InputRow, ReferralQuality};

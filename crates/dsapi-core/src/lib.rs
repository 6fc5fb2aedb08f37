pub mod catalog;
pub mod errors;
pub mod model;
pub mod parse;
pub mod query;
pub mod registry;
pub mod render;
pub mod schema;
pub mod util;

pub use catalog::{ApiSummary, CatalogListing, DatasetFields};
pub use errors::*;
pub use model::*;
pub use parse::parse;
pub use query::*;
pub use registry::{Catalog, Registry};
pub use render::render;

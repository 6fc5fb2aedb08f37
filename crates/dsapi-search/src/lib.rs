pub mod gateway;
pub mod mem;
pub mod service;
pub mod solr;
pub mod traits;

pub use gateway::{GatewayConfig, SearchGateway};
pub use mem::InMemoryBackend;
pub use service::DataService;
pub use solr::SolrBackend;
pub use traits::*;

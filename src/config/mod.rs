//! Configuration module

mod site;

pub use site::SiteConfig;
pub use site::SourceConfig;
pub use site::SourceKind;
pub use site::ENDPOINT_ENV;

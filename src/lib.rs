// Client library for the CareerBuilder job-listing XML API

pub mod cache;
pub mod client;
pub mod config;
pub mod models;
pub mod request;
pub mod transport;
pub mod xml_mapper;

// Re-export key types for convenience
pub use cache::{CacheStats, ResponseCache};
pub use client::{ApiError, CareerBuilderClient, ClientError, JobSearch};
pub use config::ClientConfig;
pub use models::{
    Answer, BlankApplication, Category, CategoryCode, Job, JobId, JobSearchResult, Money,
    Question, ResponseApplication, ServiceError,
};
pub use request::{RequestApplication, Response};
pub use transport::{HttpResponse, ReqwestTransport, Transport};
pub use xml_mapper::{Mapped, MappingError, XmlElement};

pub mod client;
pub mod endpoint;
pub mod service;
pub mod transport;
pub mod types;

mod headers {
    pub const ACCEPT: &str = "Accept";
    pub const AUTHORIZATION: &str = "Authorization";
    pub const CONTENT_TYPE: &str = "Content-Type";
    pub const JSON: &str = "application/json";
}

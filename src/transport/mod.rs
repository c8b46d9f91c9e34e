/// Blocking HTTP agent construction and body helpers.
pub mod http;

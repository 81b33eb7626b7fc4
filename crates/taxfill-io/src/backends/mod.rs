pub mod json;

pub use json::JsonAdapter;

#[cfg(feature = "umya")]
pub mod umya;

#[cfg(feature = "umya")]
pub use umya::UmyaAdapter;

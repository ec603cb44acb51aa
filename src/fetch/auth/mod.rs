mod headers;

pub use headers::StaticHeaders;

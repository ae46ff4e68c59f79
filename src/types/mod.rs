pub mod product;
pub mod request;

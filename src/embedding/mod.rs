pub mod build;
pub mod lsh;
pub mod space;
pub mod vector;

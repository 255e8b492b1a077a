pub mod kctl;
pub mod owner;
pub mod pkg;

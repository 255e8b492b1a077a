pub mod addons;
pub mod initializer;
pub mod joiner;

pub use addons::AddOns;
pub use initializer::Initializer;

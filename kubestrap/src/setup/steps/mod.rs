pub mod disable_swap;
pub mod docker;
pub mod kernel_modules;
pub mod kubes;
pub mod sysctl;

pub use disable_swap::DisableSwap;
pub use docker::Docker;
pub use kernel_modules::KernelModules;
pub use kubes::Kubes;
pub use sysctl::Sysctl;

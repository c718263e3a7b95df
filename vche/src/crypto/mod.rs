pub mod hash;
pub mod modular;
pub mod prf;

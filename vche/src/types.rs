/// 32-byte digest (SHA-256 output).
pub type Hash = [u8; 32];

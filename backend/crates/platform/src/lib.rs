//! Platform Crate - Technical Infrastructure
//!
//! This crate provides shared technical foundations:
//! - Cryptographic utilities (SHA-256, constant-time comparison, hex)
//! - Password hashing (Argon2id, NIST SP 800-63B length rules)
//! - Cookie management
//! - Media upload (Cloudinary-compatible signed uploads)

pub mod cookie;
pub mod crypto;
pub mod media;
pub mod password;

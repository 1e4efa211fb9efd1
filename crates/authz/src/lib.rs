//! Authentication and authorization building blocks: JWT issuing and
//! validation, role names, bearer header parsing, and password hashing.

pub mod password;
pub mod roles;
pub mod token;

pub use password::{PasswordError, PasswordHasher};
pub use roles::{RoleName, UnknownRole};
pub use token::{extract_bearer, Claims, TokenError, TokenService};

mod claims;
mod extractor;
mod jwt;
mod password;

pub use claims::Claims;
pub use extractor::{authenticate, AuthUser, MaybeAuthUser};
pub use jwt::JwtService;
pub use password::{hash_password, verify_password};

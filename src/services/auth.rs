use crate::error::{AppError, Result};
use crate::models::user::User;
use crate::repositories::user::UserRepository;
use crate::validation::auth::Credentials;
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, ParamsBuilder,
};
use chrono::Utc;
use rand::{rngs::OsRng, RngCore};
use uuid::Uuid;
use zeroize::Zeroize;

/// The memory cost for Argon2 in MB.
const ARGON2_MEMORY_MB: u32 = 19;
/// The number of iterations for Argon2.
const ARGON2_ITERATIONS: u32 = 2;
/// The parallelism factor for Argon2.
const ARGON2_PARALLELISM: u32 = 1;

const INVALID_CREDENTIALS: &str = "invalid credentials";
const EMAIL_TAKEN: &str = "email already registered";

/// Hashes a password using Argon2id.
///
/// # Arguments
///
/// * `password` - The password to hash.
///
/// # Returns
///
/// A `Result` containing the PHC-formatted hash.
fn hash_password(password: &str) -> Result<String> {
    let mut password_bytes = password.as_bytes().to_vec();

    let mut salt_bytes = [0u8; 16];
    OsRng.fill_bytes(&mut salt_bytes);

    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| AppError::Internal(format!("Salt encoding error: {}", e)))?;

    let argon2 = Argon2::new(
        argon2::Algorithm::Argon2id,
        argon2::Version::V0x13,
        ParamsBuilder::new()
            .m_cost(ARGON2_MEMORY_MB * 1024)
            .t_cost(ARGON2_ITERATIONS)
            .p_cost(ARGON2_PARALLELISM)
            .build()
            .map_err(|e| AppError::Internal(format!("Argon2 params: {}", e)))?,
    );

    let password_hash = argon2
        .hash_password(&password_bytes, &salt)
        .map_err(|e| AppError::Internal(format!("Argon2 hash error: {}", e)))?
        .to_string();

    password_bytes.zeroize();
    tracing::debug!("Password hashed successfully with Argon2");
    Ok(password_hash)
}

/// Verifies a password against a PHC hash.
fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let mut password_bytes = password.as_bytes().to_vec();
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| AppError::Internal(format!("Hash parse error: {}", e)))?;
    let result = Argon2::default()
        .verify_password(&password_bytes, &parsed_hash)
        .is_ok();

    password_bytes.zeroize();
    Ok(result)
}

/// Creates a new demo account.
///
/// # Returns
///
/// The created `User`, or a validation error if the email is already registered.
pub async fn register(users: &UserRepository, credentials: &Credentials) -> Result<User> {
    let email = credentials.validated_email()?;
    tracing::debug!("🔐 Creating user: {}", email);

    let user = User {
        id: Uuid::new_v4(),
        email,
        password_hash: hash_password(&credentials.password)?,
        created_at: Utc::now(),
    };

    if !users.create(&user).await? {
        tracing::info!("Registration refused, email taken: {}", user.email);
        return Err(AppError::Validation(EMAIL_TAKEN.to_string()));
    }

    tracing::info!("✅ User created with ID: {}", user.id);
    Ok(user)
}

/// Authenticates a demo account. Unknown email and wrong password are indistinguishable.
pub async fn authenticate(users: &UserRepository, credentials: &Credentials) -> Result<User> {
    let email = credentials.validated_email()?;
    tracing::debug!("🔐 Authenticating user: {}", email);

    let user = users
        .find_by_email(&email)
        .await?
        .ok_or_else(|| AppError::Authentication(INVALID_CREDENTIALS.to_string()))?;

    if !verify_password(&credentials.password, &user.password_hash)? {
        return Err(AppError::Authentication(INVALID_CREDENTIALS.to_string()));
    }

    tracing::info!("✅ User authenticated: {}", user.id);
    Ok(user)
}

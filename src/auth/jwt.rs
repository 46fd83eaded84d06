use jsonwebtoken::{DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};

use super::error::{CryptError, CryptResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    /// Session row id, lets sign-out revoke a token before `exp`.
    pub sid: String,
    pub exp: i64,
}

impl UserClaims {
    pub fn user_id(&self) -> CryptResult<uuid::Uuid> {
        self.sub.parse().map_err(|_| CryptError::MalformedClaim {
            claim: "sub",
            value: self.sub.clone(),
        })
    }

    pub fn session_id(&self) -> CryptResult<uuid::Uuid> {
        self.sid.parse().map_err(|_| CryptError::MalformedClaim {
            claim: "sid",
            value: self.sid.clone(),
        })
    }
}

pub fn generate_token<K: AsRef<[u8]>>(
    claims: UserClaims,
    key: K,
) -> jsonwebtoken::errors::Result<String> {
    let header = Header::default();
    let key = EncodingKey::from_secret(key.as_ref());

    let token = jsonwebtoken::encode(&header, &claims, &key)?;
    Ok(token)
}

pub fn process_token<K: AsRef<[u8]>>(
    token: &str,
    key: K,
) -> jsonwebtoken::errors::Result<TokenData<UserClaims>> {
    let validation = Validation::default();
    let key = DecodingKey::from_secret(key.as_ref());

    let claims = jsonwebtoken::decode::<UserClaims>(token, &key, &validation)?;
    Ok(claims)
}

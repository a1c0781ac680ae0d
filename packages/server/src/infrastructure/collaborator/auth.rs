//! プロデューサー認可コラボレーターの実装
//!
//! 本来の認可は外部の ID 基盤が担う。ここでは起動時に設定した共有
//! シークレットとの比較だけを行う。シークレット未設定ならローカル開発用
//! にすべて許可する。

use async_trait::async_trait;

use crate::domain::{AuthError, ProducerAuthorizer, StreamId};

/// 共有シークレットによるプロデューサー認可
pub struct SharedSecretAuthorizer {
    secret: Option<String>,
}

impl SharedSecretAuthorizer {
    /// `secret` が `None` または空文字ならすべての開始を許可する
    pub fn new(secret: Option<String>) -> Self {
        let secret = secret.filter(|s| !s.is_empty());
        Self { secret }
    }
}

#[async_trait]
impl ProducerAuthorizer for SharedSecretAuthorizer {
    async fn authorize(&self, stream_id: &StreamId, token: &str) -> Result<(), AuthError> {
        match &self.secret {
            None => Ok(()),
            Some(secret) if secret == token => Ok(()),
            Some(_) => Err(AuthError::InvalidToken(stream_id.as_str().to_string())),
        }
    }
}

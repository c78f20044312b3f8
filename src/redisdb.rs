use redis::{AsyncCommands, aio::ConnectionManager};
use std::net::IpAddr;

const IP_ATTEMPT_TTL_SECS: u64 = 60 * 60 * 24;
const IDENTIFIER_ATTEMPT_TTL_SECS: u64 = 60 * 60;

/// Redis-backed refresh-token store and login rate limiter.
///
/// ConnectionManager clones are cheap; each call clones to get a mutable
/// handle.
#[derive(Clone)]
pub struct RedisClient {
    pub conn: ConnectionManager,
}

impl RedisClient {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    pub async fn save_refresh_token(
        &self,
        user_id: &str,
        refresh_token: &str,
        expires_in_seconds: i64,
    ) -> redis::RedisResult<()> {
        let key = format!("refresh:{}", user_id);
        let mut conn = self.conn.clone();
        conn.set_ex(key, refresh_token, expires_in_seconds as u64)
            .await
    }

    pub async fn get_refresh_token(&self, user_id: &str) -> redis::RedisResult<Option<String>> {
        let key = format!("refresh:{}", user_id);
        let mut conn = self.conn.clone();
        conn.get(key).await
    }

    pub async fn delete_refresh_token(&self, user_id: &str) -> redis::RedisResult<()> {
        let key = format!("refresh:{}", user_id);
        let mut conn = self.conn.clone();
        conn.del(key).await
    }

    /// Failed login attempts from one IP over the last 24 hours.
    pub async fn get_ip_attempts(&self, ip: IpAddr) -> redis::RedisResult<Option<u32>> {
        let key = format!("login:ip:{}", ip);
        let mut conn = self.conn.clone();
        conn.get(key).await
    }

    /// Failed login attempts for one (IP, identifier) pair over the last hour.
    pub async fn get_identifier_ip_attempts(
        &self,
        ip: IpAddr,
        identifier: &str,
    ) -> redis::RedisResult<Option<u32>> {
        let key = format!("login:id:{}:{}", ip, identifier);
        let mut conn = self.conn.clone();
        conn.get(key).await
    }

    /// Bump both counters after a failed login. TTL is set on first creation
    /// only, so the windows do not slide.
    pub async fn increment_attempts(
        &self,
        ip: IpAddr,
        identifier: &str,
    ) -> redis::RedisResult<()> {
        let ip_key = format!("login:ip:{}", ip);
        let id_key = format!("login:id:{}:{}", ip, identifier);
        let mut conn = self.conn.clone();

        let ip_count: u32 = conn.incr(&ip_key, 1).await?;
        if ip_count == 1 {
            let _: bool = conn.expire(&ip_key, IP_ATTEMPT_TTL_SECS as i64).await?;
        }

        let id_count: u32 = conn.incr(&id_key, 1).await?;
        if id_count == 1 {
            let _: bool = conn
                .expire(&id_key, IDENTIFIER_ATTEMPT_TTL_SECS as i64)
                .await?;
        }

        Ok(())
    }

    /// Clear the per-identifier counter after a successful login.
    pub async fn delete_identifier_ip_attempts(
        &self,
        ip: IpAddr,
        identifier: &str,
    ) -> redis::RedisResult<()> {
        let key = format!("login:id:{}:{}", ip, identifier);
        let mut conn = self.conn.clone();
        conn.del(key).await
    }
}

use crate::error::Error;
use redis::Client as RedisClient;
use shared::rate_limit::{get_rate_limit_key, RateLimitCheck, RateLimitType};
use tracing::warn;

/// Fixed-window counter in Redis. Without Redis, or when Redis is down, the
/// request is allowed.
pub async fn check_rate_limit(
    redis: Option<&RedisClient>,
    limit_type: RateLimitType,
    identifier: &str,
) -> Result<(), Error> {
    let Some(redis) = redis else {
        return Ok(());
    };

    let key = get_rate_limit_key(limit_type, identifier);
    let mut conn = match redis.get_async_connection().await {
        Ok(conn) => conn,
        Err(e) => {
            warn!("Redis unavailable, skipping {:?} rate limit: {}", limit_type, e);
            return Ok(());
        }
    };

    let attempts: u32 = match redis::cmd("INCR").arg(&key).query_async(&mut conn).await {
        Ok(attempts) => attempts,
        Err(e) => {
            warn!("Redis INCR failed for {}: {}", key, e);
            return Ok(());
        }
    };

    if attempts == 1 {
        let expire: Result<(), redis::RedisError> = redis::cmd("EXPIRE")
            .arg(&key)
            .arg(limit_type.get_window().as_secs())
            .query_async(&mut conn)
            .await;
        if let Err(e) = expire {
            warn!("Redis EXPIRE failed for {}: {}", key, e);
        }
    }

    if RateLimitCheck::new(attempts, limit_type).is_locked {
        return Err(Error::RateLimited(limit_type));
    }
    Ok(())
}

//! Fixed cache key namespace.
//!
//! Every key lives under [`PREFIX`] and always holds the same value type:
//!
//! | key | type |
//! |---|---|
//! | `products` | string (JSON list) |
//! | `description:{id}` | string (JSON) |
//! | `processed` | set |
//! | `videos` | set |
//! | `video:{id}` | hash |
//! | `schedules` | list of JSON strings |
//! | `lock:{name}` | string with expiry |

pub const PREFIX: &str = "shopee";

pub fn products() -> String {
    format!("{}:products", PREFIX)
}

pub fn description(product_id: &str) -> String {
    format!("{}:description:{}", PREFIX, product_id)
}

/// Pattern matching every description key.
pub fn description_pattern() -> String {
    format!("{}:description:*", PREFIX)
}

pub fn processed() -> String {
    format!("{}:processed", PREFIX)
}

pub fn videos() -> String {
    format!("{}:videos", PREFIX)
}

pub fn video(video_id: &str) -> String {
    format!("{}:video:{}", PREFIX, video_id)
}

pub fn schedules() -> String {
    format!("{}:schedules", PREFIX)
}

pub fn lock(name: &str) -> String {
    format!("{}:lock:{}", PREFIX, name)
}

/// Lock held while the scheduler runs.
pub const SCHEDULER_LOCK: &str = "scheduler";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_share_prefix() {
        for key in [products(), description("1"), processed(), videos(), video("v"), schedules(), lock("x")] {
            assert!(key.starts_with("shopee:"), "{}", key);
        }
        assert_eq!(description("42"), "shopee:description:42");
        assert_eq!(lock(SCHEDULER_LOCK), "shopee:lock:scheduler");
    }
}

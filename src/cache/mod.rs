pub mod daily_cache;

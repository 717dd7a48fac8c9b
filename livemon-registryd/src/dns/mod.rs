pub mod cloudflare;
pub mod failover;

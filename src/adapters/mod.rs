//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the intake core to external systems:
//! - `redis` - Session store and message claims in Redis
//! - `memory` - In-process stores and a recording chat platform
//! - `lark` - Lark/Feishu REST client and event callback parsing
//! - `extractor` - LLM and rule-based field extractors
//! - `http` - Webhook endpoint

pub mod extractor;
pub mod http;
pub mod lark;
pub mod memory;
pub mod redis;

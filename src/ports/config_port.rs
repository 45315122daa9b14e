//! Configuration access port trait.

/// Raw INI lookups. Typed parsing and defaults live in `EngineConfig::from_port`.
pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
}

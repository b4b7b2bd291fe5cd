//! Default configuration values for memtrace

use crate::hooks::{NATIVE_ALLOCATE_EXPORT, NATIVE_FREE_EXPORT, NATIVE_MODULE};
use serde::{Deserialize, Serialize};

/// Default configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigDefaults {
    pub channel: ChannelDefaults,
    pub hooks: HookDefaults,
    pub logging: LoggingDefaults,
}

/// Default collector channel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelDefaults {
    pub name: String,
    pub greeting: String,
}

/// Default interception targets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HookDefaults {
    pub module: String,
    pub allocate_export: String,
    pub free_export: String,
    pub require_collector: bool,
}

/// Default logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingDefaults {
    pub enabled: bool,
    pub level: String,
    pub file: String,
}

fn default_hooks() -> HookDefaults {
    HookDefaults {
        module: NATIVE_MODULE.to_string(),
        allocate_export: NATIVE_ALLOCATE_EXPORT.to_string(),
        free_export: NATIVE_FREE_EXPORT.to_string(),
        require_collector: true,
    }
}

/// Returns the default configuration
pub fn default_config() -> ConfigDefaults {
    ConfigDefaults {
        channel: ChannelDefaults {
            name: "MemTraceCollectorPipe".to_string(),
            greeting: "hello, sailor".to_string(),
        },
        hooks: default_hooks(),
        logging: LoggingDefaults {
            enabled: false,
            level: "info".to_string(),
            file: "memtrace.log".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = default_config();
        assert_eq!(config.channel.name, "MemTraceCollectorPipe");
        assert_eq!(config.channel.greeting, "hello, sailor");
    }

    #[test]
    fn test_hook_defaults() {
        let config = default_config();
        assert!(config.hooks.require_collector);
        #[cfg(windows)]
        {
            assert_eq!(config.hooks.module, "ntdll.dll");
            assert_eq!(config.hooks.allocate_export, "RtlAllocateHeap");
            assert_eq!(config.hooks.free_export, "RtlFreeHeap");
        }
        #[cfg(not(windows))]
        {
            assert_eq!(config.hooks.module, "libc.so.6");
            assert_eq!(config.hooks.allocate_export, "malloc");
            assert_eq!(config.hooks.free_export, "free");
        }
    }

    #[test]
    fn test_logging_defaults() {
        let config = default_config();
        assert!(!config.logging.enabled);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.file, "memtrace.log");
    }

    #[test]
    fn test_serialization() {
        let config = default_config();
        let serialized = toml::to_string(&config).unwrap();
        assert!(serialized.contains("greeting"));
        assert!(serialized.contains("allocate_export"));

        let deserialized: ConfigDefaults = toml::from_str(&serialized).unwrap();
        assert_eq!(deserialized.channel.name, config.channel.name);
        assert_eq!(deserialized.hooks.module, config.hooks.module);
    }
}

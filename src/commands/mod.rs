//! Command generators
//!
//! A [`CommandGenerator`] answers "which command line runs operation X on
//! this platform" for one indexing engine. Engines form a closed set selected
//! by the [`Engine`] tag in configuration; cscope is the only one today.

mod config;

pub use config::{CommandConfig, CommandOverrides, PlatformIndex, TemplateSet, TemplateSetOverride};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::platform::{current_platform, Platform};

/// Logical operations that map to one template slot each
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    ListFiles,
    BuildDatabase,
    CheckTool,
    FindAllRef,
    FindDefinition,
    FindCallee,
    FindCaller,
    FindText,
    FindPattern,
    FindFile,
    FindIncluder,
}

impl Operation {
    /// The query operations, in cscope field order
    pub const SEARCHES: [Operation; 8] = [
        Operation::FindAllRef,
        Operation::FindDefinition,
        Operation::FindCallee,
        Operation::FindCaller,
        Operation::FindText,
        Operation::FindPattern,
        Operation::FindFile,
        Operation::FindIncluder,
    ];

    pub fn is_search(self) -> bool {
        Self::SEARCHES.contains(&self)
    }

    /// Field name in a template set; `None` for the fixed tool probe
    pub fn field_name(self) -> Option<&'static str> {
        match self {
            Operation::ListFiles => Some("find_cmd"),
            Operation::BuildDatabase => Some("database_cmd"),
            Operation::CheckTool => None,
            Operation::FindAllRef => Some("find_all_ref"),
            Operation::FindDefinition => Some("find_define"),
            Operation::FindCallee => Some("find_callee"),
            Operation::FindCaller => Some("find_caller"),
            Operation::FindText => Some("find_text"),
            Operation::FindPattern => Some("find_pattern"),
            Operation::FindFile => Some("find_file"),
            Operation::FindIncluder => Some("find_include"),
        }
    }

    /// Human-readable description used in headings and messages
    pub fn describe(self) -> &'static str {
        match self {
            Operation::ListFiles => "list source files",
            Operation::BuildDatabase => "build database",
            Operation::CheckTool => "check tool",
            Operation::FindAllRef => "references to",
            Operation::FindDefinition => "definition of",
            Operation::FindCallee => "functions called by",
            Operation::FindCaller => "functions calling",
            Operation::FindText => "text",
            Operation::FindPattern => "egrep pattern",
            Operation::FindFile => "files named",
            Operation::FindIncluder => "files including",
        }
    }
}

/// Indexing engine tag
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    #[default]
    Cscope,
}

impl Engine {
    /// Name used as the key in `config_index` override tables
    pub fn name(self) -> &'static str {
        match self {
            Engine::Cscope => "cscope",
        }
    }

    /// Built-in command table
    pub fn default_commands(self) -> CommandConfig {
        match self {
            Engine::Cscope => CommandConfig::cscope_default(),
        }
    }

    /// File-list artifact written into the database directory
    pub fn file_list_name(self) -> &'static str {
        match self {
            Engine::Cscope => "cscope.files",
        }
    }

    /// Index artifact whose presence means the database is built
    pub fn database_file_name(self) -> &'static str {
        match self {
            Engine::Cscope => "cscope.out",
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Engine {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cscope" => Ok(Engine::Cscope),
            other => Err(format!("unknown engine '{other}' (supported: cscope)")),
        }
    }
}

/// Resolves command templates for one engine on one platform
///
/// Accessors return raw templates; placeholder substitution happens in the
/// search engine.
pub trait CommandGenerator: Send + Sync + fmt::Debug {
    fn engine(&self) -> Engine;

    fn platform(&self) -> Platform;

    /// Template for `op` on this generator's platform
    fn template(&self, op: Operation) -> &str;

    /// Substring the tool probe output must contain
    fn tool_signature(&self) -> &str;

    fn list_files_cmd(&self) -> &str {
        self.template(Operation::ListFiles)
    }

    fn build_database_cmd(&self) -> &str {
        self.template(Operation::BuildDatabase)
    }

    /// Fixed version probe, never taken from user overrides
    fn check_tool_cmd(&self) -> &str {
        self.template(Operation::CheckTool)
    }

    fn find_all_ref_cmd(&self) -> &str {
        self.template(Operation::FindAllRef)
    }

    fn find_definition_cmd(&self) -> &str {
        self.template(Operation::FindDefinition)
    }

    fn find_callee_cmd(&self) -> &str {
        self.template(Operation::FindCallee)
    }

    fn find_caller_cmd(&self) -> &str {
        self.template(Operation::FindCaller)
    }

    fn find_text_cmd(&self) -> &str {
        self.template(Operation::FindText)
    }

    fn find_pattern_cmd(&self) -> &str {
        self.template(Operation::FindPattern)
    }

    fn find_file_cmd(&self) -> &str {
        self.template(Operation::FindFile)
    }

    fn find_includer_cmd(&self) -> &str {
        self.template(Operation::FindIncluder)
    }
}

const CSCOPE_PROBE: &str = "cscope -V";

/// cscope command generator
#[derive(Debug, Clone)]
pub struct CscopeCommands {
    platform: Platform,
    templates: TemplateSet,
}

impl CscopeCommands {
    /// Resolve templates for `platform` with user overrides applied
    pub fn new(platform: Platform, overrides: Option<&CommandOverrides>) -> Self {
        let merged = CommandConfig::merged(Engine::Cscope, overrides);
        let templates = merged
            .for_platform(platform)
            .cloned()
            .unwrap_or_else(TemplateSet::cscope_posix);
        tracing::debug!(platform = %platform, "Resolved cscope command templates");
        Self {
            platform,
            templates,
        }
    }
}

impl CommandGenerator for CscopeCommands {
    fn engine(&self) -> Engine {
        Engine::Cscope
    }

    fn platform(&self) -> Platform {
        self.platform
    }

    fn template(&self, op: Operation) -> &str {
        self.templates.get(op).unwrap_or(CSCOPE_PROBE)
    }

    fn tool_signature(&self) -> &str {
        "cscope"
    }
}

/// Build the generator for `engine` on `platform`
pub fn build(
    engine: Engine,
    platform: Platform,
    overrides: Option<&CommandOverrides>,
) -> Box<dyn CommandGenerator> {
    match engine {
        Engine::Cscope => Box::new(CscopeCommands::new(platform, overrides)),
    }
}

/// Build the generator for `engine` on the running platform
pub fn build_for_host(engine: Engine, overrides: Option<&CommandOverrides>) -> Box<dyn CommandGenerator> {
    build(engine, current_platform(), overrides)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linux_templates() {
        let gen = build(Engine::Cscope, Platform::Linux, None);
        assert!(gen.list_files_cmd().starts_with("find ${src_path} -type f -name *.c"));
        assert_eq!(gen.build_database_cmd(), "cscope -b -q -k");
        assert_eq!(gen.find_all_ref_cmd(), "cscope -q -k -L0 ${text}");
        assert_eq!(gen.find_definition_cmd(), "cscope -q -k -L1 ${text}");
        assert_eq!(gen.find_callee_cmd(), "cscope -q -k -L2 ${text}");
        assert_eq!(gen.find_caller_cmd(), "cscope -q -k -L3 ${text}");
        assert_eq!(gen.find_text_cmd(), "cscope -q -k -L4 ${text}");
        assert_eq!(gen.find_pattern_cmd(), "cscope -q -k -L6 ${text}");
        assert_eq!(gen.find_file_cmd(), "cscope -q -k -L7 ${text}");
        assert_eq!(gen.find_includer_cmd(), "cscope -q -k -L8 ${text}");
    }

    #[test]
    fn test_windows_uses_dir_listing() {
        let gen = build(Engine::Cscope, Platform::Windows, None);
        assert!(gen.list_files_cmd().starts_with("cmd /C dir /s/a/b ${src_path}\\*.c"));
        assert_eq!(gen.find_definition_cmd(), "cscope -q -k -L1 ${text}");
    }

    #[test]
    fn test_mac_and_other_share_posix_slot() {
        let linux = build(Engine::Cscope, Platform::Linux, None);
        for platform in [Platform::MacOs, Platform::Other] {
            let gen = build(Engine::Cscope, platform, None);
            assert_eq!(gen.list_files_cmd(), linux.list_files_cmd());
            assert_eq!(gen.platform(), platform);
        }
    }

    #[test]
    fn test_probe_ignores_overrides() {
        let overrides: CommandOverrides = toml::from_str(
            r#"
            [config_index.cscope]
            linux = 0
            win32 = 0
            mac_os = 0
            others = 0

            [[config]]
            database_cmd = "broken"
            "#,
        )
        .unwrap();
        for platform in Platform::ALL {
            let gen = build(Engine::Cscope, platform, Some(&overrides));
            assert_eq!(gen.check_tool_cmd(), "cscope -V");
            assert_eq!(gen.build_database_cmd(), "broken");
        }
    }

    #[test]
    fn test_override_isolated_to_target_slot() {
        let overrides: CommandOverrides = toml::from_str(
            r#"
            [config_index.cscope]
            win32 = 0

            [[config]]
            find_cmd = "where /r ${src_path} *.c"
            "#,
        )
        .unwrap();
        let win = build(Engine::Cscope, Platform::Windows, Some(&overrides));
        let linux = build(Engine::Cscope, Platform::Linux, Some(&overrides));
        assert_eq!(win.list_files_cmd(), "where /r ${src_path} *.c");
        assert_eq!(win.find_text_cmd(), "cscope -q -k -L4 ${text}");
        assert_eq!(linux.list_files_cmd(), TemplateSet::cscope_posix().find_cmd);
    }

    #[test]
    fn test_engine_parse() {
        assert_eq!("cscope".parse::<Engine>().unwrap(), Engine::Cscope);
        assert_eq!("CSCOPE".parse::<Engine>().unwrap(), Engine::Cscope);
        assert!("gtags".parse::<Engine>().is_err());
    }

    #[test]
    fn test_operation_fields() {
        assert_eq!(Operation::CheckTool.field_name(), None);
        assert!(Operation::SEARCHES.iter().all(|op| op.is_search()));
        assert!(!Operation::ListFiles.is_search());
        assert!(!Operation::BuildDatabase.is_search());
    }
}

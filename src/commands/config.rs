//! Default command tables and user override merging
//!
//! A [`CommandConfig`] is a list of template slots plus a platform → slot
//! mapping. Linux, macOS and "other" share slot 0 by default; Windows uses
//! slot 1.
//!
//! User overrides use the same shape as the editor setting they came from:
//!
//! ```toml
//! [engine_commands.config_index.cscope]
//! linux = 1
//! win32 = 0
//!
//! [[engine_commands.config]]
//! find_cmd = "my windows lister ${src_path}"
//!
//! [[engine_commands.config]]
//! find_cmd = "fd -e c -e h . ${src_path}"
//! ```
//!
//! The slot number on the right of `config_index` points into the *user*
//! `config` list. The fields found there are copied onto the *default* slot
//! that platform maps to, so remapping follows platform identity rather than
//! matching slot numbers between the two lists.
//!
//! Default queries pass `-q -k` like the build, so cscope reads the inverted
//! index it built instead of rebuilding a plain one on first query.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{Engine, Operation};
use crate::platform::Platform;

/// One complete set of templates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateSet {
    pub find_cmd: String,
    pub database_cmd: String,
    pub find_all_ref: String,
    pub find_define: String,
    pub find_callee: String,
    pub find_caller: String,
    pub find_text: String,
    pub find_pattern: String,
    pub find_file: String,
    pub find_include: String,
}

/// Partial template set from user configuration; absent fields keep defaults
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateSetOverride {
    pub find_cmd: Option<String>,
    pub database_cmd: Option<String>,
    pub find_all_ref: Option<String>,
    pub find_define: Option<String>,
    pub find_callee: Option<String>,
    pub find_caller: Option<String>,
    pub find_text: Option<String>,
    pub find_pattern: Option<String>,
    pub find_file: Option<String>,
    pub find_include: Option<String>,
}

impl TemplateSet {
    /// cscope queries shared by every platform
    fn cscope(find_cmd: &str) -> Self {
        Self {
            find_cmd: find_cmd.to_string(),
            database_cmd: "cscope -b -q -k".to_string(),
            find_all_ref: "cscope -q -k -L0 ${text}".to_string(),
            find_define: "cscope -q -k -L1 ${text}".to_string(),
            find_callee: "cscope -q -k -L2 ${text}".to_string(),
            find_caller: "cscope -q -k -L3 ${text}".to_string(),
            find_text: "cscope -q -k -L4 ${text}".to_string(),
            find_pattern: "cscope -q -k -L6 ${text}".to_string(),
            find_file: "cscope -q -k -L7 ${text}".to_string(),
            find_include: "cscope -q -k -L8 ${text}".to_string(),
        }
    }

    /// POSIX slot: `find` based enumeration
    pub fn cscope_posix() -> Self {
        Self::cscope(
            "find ${src_path} -type f -name *.c -o -type f -name *.h -o -type f -name *.cpp \
             -o -type f -name *.cc -o -type f -name *.mm",
        )
    }

    /// Windows slot: `dir` based enumeration
    pub fn cscope_windows() -> Self {
        Self::cscope(
            "cmd /C dir /s/a/b ${src_path}\\*.c ${src_path}\\*.h ${src_path}\\*.cpp \
             ${src_path}\\*.cc ${src_path}\\*.mm",
        )
    }

    /// Template for an operation; `None` for [`Operation::CheckTool`]
    pub fn get(&self, op: Operation) -> Option<&str> {
        let template = match op {
            Operation::ListFiles => &self.find_cmd,
            Operation::BuildDatabase => &self.database_cmd,
            Operation::FindAllRef => &self.find_all_ref,
            Operation::FindDefinition => &self.find_define,
            Operation::FindCallee => &self.find_callee,
            Operation::FindCaller => &self.find_caller,
            Operation::FindText => &self.find_text,
            Operation::FindPattern => &self.find_pattern,
            Operation::FindFile => &self.find_file,
            Operation::FindIncluder => &self.find_include,
            Operation::CheckTool => return None,
        };
        Some(template)
    }

    /// Copy every field present in `custom` onto this set
    pub fn apply(&mut self, custom: &TemplateSetOverride) {
        let pairs = [
            (&mut self.find_cmd, &custom.find_cmd),
            (&mut self.database_cmd, &custom.database_cmd),
            (&mut self.find_all_ref, &custom.find_all_ref),
            (&mut self.find_define, &custom.find_define),
            (&mut self.find_callee, &custom.find_callee),
            (&mut self.find_caller, &custom.find_caller),
            (&mut self.find_text, &custom.find_text),
            (&mut self.find_pattern, &custom.find_pattern),
            (&mut self.find_file, &custom.find_file),
            (&mut self.find_include, &custom.find_include),
        ];
        for (slot, value) in pairs {
            if let Some(value) = value {
                slot.clone_from(value);
            }
        }
    }
}

/// Which template slot each platform uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformIndex {
    pub win32: usize,
    pub linux: usize,
    pub mac_os: usize,
    pub others: usize,
}

impl PlatformIndex {
    pub fn slot(&self, platform: Platform) -> usize {
        match platform {
            Platform::Linux => self.linux,
            Platform::Windows => self.win32,
            Platform::MacOs => self.mac_os,
            Platform::Other => self.others,
        }
    }
}

/// Effective command table for one engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandConfig {
    pub platform_index: PlatformIndex,
    pub config: Vec<TemplateSet>,
}

/// User override table, as read from configuration
///
/// `config_index` maps engine name → platform key → index into `config`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandOverrides {
    pub config_index: BTreeMap<String, BTreeMap<String, i64>>,
    pub config: Vec<TemplateSetOverride>,
}

impl CommandConfig {
    /// Built-in cscope table
    pub fn cscope_default() -> Self {
        Self {
            platform_index: PlatformIndex {
                win32: 1,
                linux: 0,
                mac_os: 0,
                others: 0,
            },
            config: vec![TemplateSet::cscope_posix(), TemplateSet::cscope_windows()],
        }
    }

    /// Defaults for `engine` with `overrides` merged on top.
    ///
    /// Unknown platform keys and out-of-range slot indices are skipped. Keys
    /// are applied in sorted order (`linux`, `mac_os`, `others`, `win32`), so
    /// when two platforms sharing a default slot override the same field, the
    /// later key wins.
    pub fn merged(engine: Engine, overrides: Option<&CommandOverrides>) -> Self {
        let mut current = engine.default_commands();
        let Some(overrides) = overrides else {
            return current;
        };
        let Some(index) = overrides.config_index.get(engine.name()) else {
            return current;
        };

        for (key, &user_slot) in index {
            let Some(platform) = Platform::from_config_key(key) else {
                tracing::debug!(key = %key, "Ignoring unknown platform in command overrides");
                continue;
            };
            let custom = usize::try_from(user_slot)
                .ok()
                .and_then(|i| overrides.config.get(i));
            let Some(custom) = custom else {
                tracing::debug!(platform = %platform, slot = user_slot, "Override slot out of range");
                continue;
            };
            let target = current.platform_index.slot(platform);
            if let Some(set) = current.config.get_mut(target) {
                set.apply(custom);
                tracing::debug!(platform = %platform, from = user_slot, to = target, "Applied command overrides");
            }
        }
        current
    }

    /// Template set for a platform, if its slot exists
    pub fn for_platform(&self, platform: Platform) -> Option<&TemplateSet> {
        self.config.get(self.platform_index.slot(platform))
    }
}

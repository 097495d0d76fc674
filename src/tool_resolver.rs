//! # Runtime Asset Resolver
//!
//! This module finds the transcoder binaries backing the video runtime:
//! - An explicitly configured runtime directory
//! - The `MADACLY_RUNTIME_DIR` environment variable
//! - The per-user data directory (`<data_dir>/madacly/runtime`)
//! - System-installed tools on `PATH`

use std::env;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable overriding the runtime asset directory
pub const RUNTIME_DIR_ENV: &str = "MADACLY_RUNTIME_DIR";

/// Tool path resolver for the runtime assets
#[derive(Debug, Clone)]
pub struct ToolPathResolver {
    /// Directories searched before `PATH`, in priority order
    search_dirs: Vec<PathBuf>,
    /// Whether `PATH` is consulted at all
    use_system_path: bool,
}

impl ToolPathResolver {
    /// Create a resolver honouring the configured directory, environment and data dir
    pub fn new(configured_dir: Option<&Path>) -> Self {
        let mut search_dirs = Vec::new();

        if let Some(dir) = configured_dir {
            search_dirs.push(dir.to_path_buf());
        }
        if let Some(dir) = env::var_os(RUNTIME_DIR_ENV) {
            search_dirs.push(PathBuf::from(dir));
        }
        if let Some(data_dir) = dirs::data_dir() {
            search_dirs.push(data_dir.join("madacly").join("runtime"));
        }

        Self {
            search_dirs,
            use_system_path: true,
        }
    }

    /// Resolver restricted to the given directories (no `PATH` lookup)
    pub fn with_dirs(dirs: Vec<PathBuf>) -> Self {
        Self {
            search_dirs: dirs,
            use_system_path: false,
        }
    }

    pub fn search_dirs(&self) -> &[PathBuf] {
        &self.search_dirs
    }

    /// Resolve the path to a specific tool
    pub fn resolve_tool(&self, tool_name: &str) -> Option<PathBuf> {
        let file_name = executable_name(tool_name);

        for dir in &self.search_dirs {
            for candidate in [dir.join(&file_name), dir.join(tool_name).join(&file_name)] {
                debug!("Checking runtime asset path: {:?}", candidate);
                if candidate.is_file() {
                    debug!("Using bundled tool: {} -> {:?}", tool_name, candidate);
                    return Some(candidate);
                }
            }
        }

        if self.use_system_path {
            if let Some(system_path) = find_in_system_path(&file_name) {
                debug!("Using system tool: {} -> {:?}", tool_name, system_path);
                return Some(system_path);
            }
        }

        warn!("Tool not found: {}", tool_name);
        None
    }

    /// Check if a specific tool is available
    pub fn is_tool_available(&self, tool_name: &str) -> bool {
        self.resolve_tool(tool_name).is_some()
    }

    /// Installation hint shown when the runtime cannot be found
    pub fn install_instructions(tool_name: &str) -> String {
        if cfg!(target_os = "linux") {
            format!("sudo apt-get install {}", tool_name)
        } else if cfg!(target_os = "macos") {
            format!("brew install {}", tool_name)
        } else {
            format!(
                "download a static {} build and point {} at its directory",
                tool_name, RUNTIME_DIR_ENV
            )
        }
    }
}

impl Default for ToolPathResolver {
    fn default() -> Self {
        Self::new(None)
    }
}

fn executable_name(tool_name: &str) -> String {
    if cfg!(windows) {
        format!("{}.exe", tool_name)
    } else {
        tool_name.to_string()
    }
}

/// Find tool in system PATH
fn find_in_system_path(file_name: &str) -> Option<PathBuf> {
    let path = env::var_os("PATH")?;
    env::split_paths(&path)
        .map(|dir| dir.join(file_name))
        .find(|candidate| candidate.is_file())
}

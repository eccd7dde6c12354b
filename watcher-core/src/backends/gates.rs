use crate::traits::PermissionGate;
use std::path::{Path, PathBuf};

/// Always grants access.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl PermissionGate for AllowAll {
    fn has_required_access(&self) -> bool {
        true
    }
}

/// Never grants access. Useful for exercising the denied path.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyAll;

impl PermissionGate for DenyAll {
    fn has_required_access(&self) -> bool {
        false
    }
}

/// 所需的命令行工具必须能在 PATH 中找到
#[derive(Debug, Clone)]
pub struct CommandGate {
    program: String,
}

impl CommandGate {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn find_in(&self, path_var: &std::ffi::OsStr) -> bool {
        std::env::split_paths(path_var).any(|dir| dir.join(&self.program).is_file())
    }
}

impl PermissionGate for CommandGate {
    fn has_required_access(&self) -> bool {
        if self.program.contains('/') {
            return Path::new(&self.program).is_file();
        }
        match std::env::var_os("PATH") {
            Some(path_var) => self.find_in(&path_var),
            None => false,
        }
    }
}

/// 标记文件存在时拒绝访问（类似 rfkill 开关）
#[derive(Debug, Clone)]
pub struct FileGate {
    deny_marker: PathBuf,
}

impl FileGate {
    pub fn new(deny_marker: impl Into<PathBuf>) -> Self {
        Self {
            deny_marker: deny_marker.into(),
        }
    }
}

impl PermissionGate for FileGate {
    fn has_required_access(&self) -> bool {
        !self.deny_marker.exists()
    }
}

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

pub mod commands;
pub mod error;
pub mod git;
pub mod status_parser;

/// Directory whose children are scanned: the provided one, or the parent of
/// the directory holding the executable.
pub fn get_base_dir(provided_dir: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = provided_dir {
        return Ok(dir);
    }

    let exe = env::current_exe().context("Failed to locate the running executable")?;
    exe.parent()
        .and_then(|dir| dir.parent())
        .map(|dir| dir.to_path_buf())
        .ok_or_else(|| anyhow::anyhow!("Executable {} has no parent directory", exe.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provided_dir_wins() {
        let dir = PathBuf::from("/tmp/projects");
        assert_eq!(get_base_dir(Some(dir.clone())).unwrap(), dir);
    }

    #[test]
    fn test_default_is_grandparent_of_executable() {
        let exe = env::current_exe().unwrap();
        let expected = exe.parent().unwrap().parent().unwrap();
        assert_eq!(get_base_dir(None).unwrap(), expected);
    }
}

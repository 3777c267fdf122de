//! `go.mod` discovery and import path resolution.

use std::path::{Component, Path};

use crate::diagnostic::CompilerError;
use crate::ir::GoModule;

/// Finds the nearest `go.mod` at or above `dir`.
pub fn find_module(dir: &Path) -> Result<Option<GoModule>, CompilerError> {
    for candidate in dir.ancestors() {
        let go_mod = candidate.join("go.mod");
        if !go_mod.is_file() {
            continue;
        }
        let content = std::fs::read_to_string(&go_mod).map_err(|e| CompilerError::io(&go_mod, e.to_string()))?;
        return Ok(module_name(&content).map(|name| GoModule {
            name,
            root: candidate.to_path_buf(),
        }));
    }
    Ok(None)
}

/// Reads the `module` directive of a `go.mod` file.
pub fn module_name(content: &str) -> Option<String> {
    content.lines().find_map(|line| {
        let line = line.split("//").next().unwrap_or("").trim();
        let rest = line.strip_prefix("module")?;
        if !rest.starts_with(char::is_whitespace) {
            return None;
        }
        let name = rest.trim().trim_matches('"');
        (!name.is_empty()).then(|| name.to_string())
    })
}

/// Import path of the package in `dir`, or `None` when `dir` is outside the
/// module.
pub fn import_path(module: &GoModule, dir: &Path) -> Option<String> {
    let relative = pathdiff::diff_paths(dir, &module.root)?;
    let mut path = module.name.clone();
    for component in relative.components() {
        match component {
            Component::Normal(part) => {
                path.push('/');
                path.push_str(&part.to_string_lossy());
            }
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_module_name() {
        assert_eq!(
            module_name("// shop\nmodule example.com/shop // main\n\ngo 1.21\n"),
            Some("example.com/shop".to_string())
        );
        assert_eq!(module_name("go 1.21\n"), None);
        assert_eq!(module_name("modules x\n"), None);
    }

    #[test]
    fn test_find_module_and_import_path() {
        let temp = TempDir::new().unwrap();
        let model = temp.path().join("internal").join("domain").join("model");
        std::fs::create_dir_all(&model).unwrap();
        std::fs::write(temp.path().join("go.mod"), "module example.com/shop\n\ngo 1.21\n").unwrap();

        let module = find_module(&model).unwrap().unwrap();
        assert_eq!(module.name, "example.com/shop");
        assert_eq!(
            import_path(&module, &model).as_deref(),
            Some("example.com/shop/internal/domain/model")
        );
        assert_eq!(import_path(&module, temp.path()).as_deref(), Some("example.com/shop"));
    }
}

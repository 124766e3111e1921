//! Labeling context (C7)
//!
//! A small, cheap-to-build summary of a file's location handed to the
//! prompt builder: its path plus its trailing parent directory names,
//! which often carry useful signal (a folder named "Taxes 2023" is a
//! strong hint even before the text is read).

use std::path::Path;

use crate::core::constants::CONTEXT_PARENT_DIR_COUNT;

pub struct LabelingContext {
    pub path: String,
    pub parent_dirs: Vec<String>,
}

impl LabelingContext {
    pub fn build(path: &str) -> Self {
        let parent_dirs = Path::new(path)
            .parent()
            .map(|p| {
                p.components()
                    .rev()
                    .take(CONTEXT_PARENT_DIR_COUNT)
                    .filter_map(|c| c.as_os_str().to_str().map(str::to_string))
                    .collect::<Vec<_>>()
                    .into_iter()
                    .rev()
                    .collect()
            })
            .unwrap_or_default();

        Self {
            path: path.to_string(),
            parent_dirs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_collects_trailing_parent_dirs() {
        let ctx = LabelingContext::build("/a/b/Taxes 2023/invoice.pdf");
        assert_eq!(ctx.parent_dirs, vec!["a", "b", "Taxes 2023"]);
    }

    #[test]
    fn test_build_caps_at_configured_depth() {
        let ctx = LabelingContext::build("/a/b/c/d/e/f/g/file.pdf");
        assert_eq!(ctx.parent_dirs.len(), CONTEXT_PARENT_DIR_COUNT);
        assert_eq!(ctx.parent_dirs.last().unwrap(), "g");
    }

    #[test]
    fn test_build_handles_root_level_file() {
        let ctx = LabelingContext::build("file.pdf");
        assert!(ctx.parent_dirs.is_empty());
    }
}

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::descriptor::{CommonBundle, ModuleDescriptor, SettingsBlock};
use crate::domain::DomainError;

/// Read-only catalog of installable modules, keyed by id.
///
/// Declaration order is preserved; the resolver uses it to break ties.
#[derive(Debug, Clone)]
pub struct Registry {
    root: PathBuf,
    modules: Vec<ModuleDescriptor>,
    index: HashMap<String, usize>,
    commons: Vec<CommonBundle>,
    settings_blocks: Vec<SettingsBlock>,
}

impl Registry {
    /// Build a registry, rejecting duplicate ids.
    pub fn new(
        root: impl Into<PathBuf>,
        modules: Vec<ModuleDescriptor>,
        commons: Vec<CommonBundle>,
        settings_blocks: Vec<SettingsBlock>,
    ) -> Result<Self, DomainError> {
        let mut index = HashMap::with_capacity(modules.len());
        for (i, module) in modules.iter().enumerate() {
            if index.insert(module.id.clone(), i).is_some() {
                return Err(DomainError::DuplicateModule {
                    id: module.id.clone(),
                });
            }
        }
        Ok(Self {
            root: root.into(),
            modules,
            index,
            commons,
            settings_blocks,
        })
    }

    /// Directory the catalog's relative source paths resolve against.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn get(&self, id: &str) -> Option<&ModuleDescriptor> {
        self.index.get(id).map(|&i| &self.modules[i])
    }

    /// Declaration position of a module.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn modules(&self) -> &[ModuleDescriptor] {
        &self.modules
    }

    pub fn common(&self, id: &str) -> Option<&CommonBundle> {
        self.commons.iter().find(|c| c.id == id)
    }

    pub fn commons(&self) -> &[CommonBundle] {
        &self.commons
    }

    pub fn settings_block(&self, id: &str) -> Option<&SettingsBlock> {
        self.settings_blocks.iter().find(|s| s.id == id)
    }

    pub fn settings_blocks(&self) -> &[SettingsBlock] {
        &self.settings_blocks
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::descriptor::fixtures::descriptor;

    #[test]
    fn keeps_declaration_order() {
        let reg = Registry::new(
            "/reg",
            vec![descriptor("zeta", &[]), descriptor("alpha", &[])],
            vec![],
            vec![],
        )
        .unwrap();
        let ids: Vec<&str> = reg.modules().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["zeta", "alpha"]);
        assert_eq!(reg.position("alpha"), Some(1));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let err = Registry::new(
            "/reg",
            vec![descriptor("auth", &[]), descriptor("auth", &[])],
            vec![],
            vec![],
        )
        .unwrap_err();
        assert_eq!(err, DomainError::DuplicateModule { id: "auth".into() });
    }
}

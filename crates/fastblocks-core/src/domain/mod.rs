// ============================================================================
//  CLEAN MODULE BOUNDARIES
// ============================================================================

//! Core domain layer for fastblocks.
//!
//! Pure logic only: the catalog model, dependency ordering and the five
//! aggregator mutators. All I/O goes through ports defined in the
//! application layer.
//!
//! - **No I/O**: mutators map text to text
//! - **Immutable entities**: descriptors and the registry are read-only after load
//! - **Deterministic**: same registry and same project give the same output
pub mod entities;
pub mod error;
pub mod mutators;
pub mod resolver;

mod validation;

pub use entities::{
    BatchCounts, BatchReport, ChangeOutcome, CommonBundle, EnvSection, FileChange, InstallReport,
    InstallStatus, ModuleDescriptor, ModuleState, ProjectLayout, Registry, RouteRegistration,
    RemoveReport, RuntimePackage, SettingsBlock, common::RelativePath,
};
pub use error::{DomainError, ErrorCategory};
pub use mutators::{
    EnvironmentFile, IgnorePattern, MutationResult, MutatorKind, PackageManifest,
    RouteAggregator, SettingsInjection, SourceMutator,
};
pub use resolver::{DependencyResolver, ResolveTarget};
pub use validation::DomainValidator;

#[cfg(test)]
mod tests {
    use super::*;
    use entities::descriptor::fixtures::descriptor;
    use pretty_assertions::assert_eq;

    fn registry() -> Registry {
        let mut auth = descriptor("auth", &[]);
        auth.runtime_packages = vec![RuntimePackage::parse("pyjwt>=2.8")];
        auth.environment = EnvSection {
            section: "Auth".into(),
            variables: vec![("JWT_SECRET".into(), "change-me".into())],
        };
        auth.config_dependencies = vec!["auth".into()];
        Registry::new(
            "/reg",
            vec![auth, descriptor("users", &["auth"])],
            vec![],
            vec![SettingsBlock {
                id: "auth".into(),
                class_name: "AuthSettings".into(),
                field: "auth".into(),
                imports: vec![],
                definition: "class AuthSettings(BaseSettings):\n    jwt_secret: str = \"\"".into(),
            }],
        )
        .unwrap()
    }

    fn all_mutators(reg: &Registry) -> Vec<Box<dyn SourceMutator + '_>> {
        let layout = ProjectLayout::default();
        vec![
            Box::new(RouteAggregator::new(layout.modules_package(), "router.py")),
            Box::new(PackageManifest),
            Box::new(EnvironmentFile::new(".env")),
            Box::new(SettingsInjection::new(reg, "config.py")),
            Box::new(IgnorePattern::new(layout)),
        ]
    }

    fn seed(kind: MutatorKind) -> &'static str {
        match kind {
            MutatorKind::Route => "from fastapi import APIRouter\n\napi_router = APIRouter()\n",
            MutatorKind::Manifest => "fastapi\n",
            MutatorKind::Env => "APP_NAME=demo\n",
            MutatorKind::Settings => {
                "from pydantic_settings import BaseSettings\n\n\nclass Settings(BaseSettings):\n    app_name: str = \"demo\"\n"
            }
            MutatorKind::Ignore => "app/modules/*\n",
        }
    }

    // ========================================================================
    // Mutator Contract Tests
    // ========================================================================

    #[test]
    fn mutators_run_in_fixed_order() {
        let reg = registry();
        let kinds: Vec<MutatorKind> = all_mutators(&reg).iter().map(|m| m.kind()).collect();
        assert_eq!(kinds, MutatorKind::ORDER.to_vec());
    }

    #[test]
    fn every_mutator_is_idempotent() {
        let reg = registry();
        for module in reg.modules() {
            for m in all_mutators(&reg) {
                if !m.applies_to(module) {
                    continue;
                }
                let once = m.apply(seed(m.kind()), module).unwrap();
                let twice = m.apply(&once.new_content, module).unwrap();
                assert!(!twice.changed, "{} not idempotent for {}", m.kind(), module.id);
                assert_eq!(twice.new_content, once.new_content);
            }
        }
    }

    #[test]
    fn mutators_commute_across_modules() {
        let reg = registry();
        let (auth, users) = (&reg.modules()[0], &reg.modules()[1]);
        for m in all_mutators(&reg) {
            let seed = seed(m.kind());
            let ab = m
                .apply(&m.apply(seed, auth).unwrap().new_content, users)
                .unwrap()
                .new_content;
            let ba_then_a = m
                .apply(&m.apply(seed, users).unwrap().new_content, auth)
                .unwrap()
                .new_content;
            // order may differ, content must not be duplicated
            for line in ab.lines().filter(|l| !l.trim().is_empty()) {
                assert_eq!(
                    ab.lines().filter(|x| x == &line).count(),
                    ba_then_a.lines().filter(|x| x == &line).count(),
                    "{} line {:?}",
                    m.kind(),
                    line
                );
            }
        }
    }

    // ========================================================================
    // Resolver + Validation Tests
    // ========================================================================

    #[test]
    fn registry_passes_validation_and_resolves() {
        let reg = registry();
        DomainValidator::validate_registry(&reg).unwrap();
        let order = DependencyResolver::new(&reg)
            .resolve(&ResolveTarget::One("users".into()))
            .unwrap();
        let ids: Vec<&str> = order.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["auth", "users"]);
    }
}

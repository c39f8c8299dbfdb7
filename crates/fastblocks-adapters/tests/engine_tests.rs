//! End-to-end install scenarios against an in-memory project.
//!
//! The project is created with the built-in skeleton, so these tests also
//! pin the skeleton's aggregator files to the shapes the mutators expect.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use fastblocks_adapters::{BuiltinSkeleton, JsonCatalog, MemoryFilesystem};
use fastblocks_core::application::ApplicationError;
use fastblocks_core::domain::{ChangeOutcome, DomainError};
use fastblocks_core::prelude::*;
use pretty_assertions::assert_eq;

const CATALOG: &str = r#"{
  "modules": {
    "auth": {
      "name": "Authentication", "description": "JWT login", "version": "1.0.0",
      "path": "modules/auth", "files": ["__init__.py", "router.py"],
      "dependencies": ["pyjwt>=2.8"],
      "env": { "section": "Auth", "variables": { "JWT_SECRET": "change-me", "JWT_TTL_MINUTES": "30" } },
      "config_dependencies": ["auth"],
      "router_prefix": "/auth", "tags": ["auth"]
    },
    "users": {
      "name": "Users", "description": "User management", "version": "1.0.0",
      "path": "modules/users", "files": ["__init__.py", "router.py"],
      "module_dependencies": ["auth"],
      "common_dependencies": ["pagination"],
      "router_prefix": "/users", "tags": ["users"]
    },
    "notes": {
      "name": "Notes", "description": "Per-user notes", "version": "0.3.0",
      "path": "modules/notes", "files": ["__init__.py", "router.py"],
      "module_dependencies": ["auth", "users"],
      "router_prefix": "/notes", "tags": ["notes"], "optional": true
    },
    "logs": {
      "name": "Logs", "description": "Request logging", "version": "1.0.0",
      "path": "modules/logs", "files": ["__init__.py", "router.py"],
      "router_prefix": "/logs", "tags": ["logs"]
    },
    "health": {
      "name": "Health", "description": "Liveness probes", "version": "1.0.0",
      "path": "modules/health", "files": ["__init__.py", "router.py"],
      "router_prefix": "/healthz", "tags": ["health"]
    }
  },
  "common": {
    "pagination": { "description": "Page helpers", "files": ["pagination.py"] }
  },
  "settings_blocks": {
    "auth": {
      "class_name": "AuthSettings",
      "field": "auth",
      "imports": ["from pydantic import BaseModel"],
      "definition": "class AuthSettings(BaseModel):\n    jwt_secret: str = \"change-me\"\n    jwt_ttl_minutes: int = 30"
    }
  }
}"#;

const MODULES: &[&str] = &["auth", "users", "notes", "logs", "health"];

fn root() -> PathBuf {
    PathBuf::from("/proj")
}

fn registry_files(fs: MemoryFilesystem) -> MemoryFilesystem {
    let fs = MODULES.iter().fold(fs, |fs, id| {
        fs.with_file(format!("/reg/modules/{id}/__init__.py"), "")
            .with_file(
                format!("/reg/modules/{id}/router.py"),
                format!("from fastapi import APIRouter\n\nrouter = APIRouter()  # {id}\n"),
            )
    });
    fs.with_file(
        "/reg/common/pagination/pagination.py",
        "def paginate(items, page, size):\n    return items[(page - 1) * size : page * size]\n",
    )
}

fn installer(fs: &MemoryFilesystem) -> Installer {
    let registry = RegistryManager::load(&JsonCatalog::from_str("/reg", CATALOG)).unwrap();
    Installer::new(registry, Box::new(fs.clone()), ProjectLayout::default())
}

/// Registry files plus a project created by `init`.
fn project() -> (Installer, MemoryFilesystem) {
    let fs = registry_files(MemoryFilesystem::new());
    let init = ProjectInitializer::new(Box::new(fs.clone()), Box::new(BuiltinSkeleton::new()));
    init.init(
        &root(),
        &InitRequest {
            name: "shop".into(),
            description: "Demo shop".into(),
            secret_key: "test-secret".into(),
        },
        false,
    )
    .unwrap();
    (installer(&fs), fs)
}

fn snapshot(fs: &MemoryFilesystem) -> BTreeMap<PathBuf, String> {
    fs.list_files()
        .into_iter()
        .filter(|p| p.starts_with("/proj"))
        .map(|p| {
            let content = fs.read_file(&p).unwrap();
            (p, content)
        })
        .collect()
}

fn read(fs: &MemoryFilesystem, rel: &str) -> String {
    fs.read_file(root().join(rel)).unwrap()
}

fn occurrences(haystack: &str, needle: &str) -> usize {
    haystack.matches(needle).count()
}

// ============================================================================
// Ordering and the A/B/C scenario
// ============================================================================

#[test]
fn resolve_all_follows_dependencies_then_declaration_order() {
    let (installer, _) = project();
    let order: Vec<String> = installer
        .registry()
        .resolve(&ResolveTarget::All)
        .unwrap()
        .iter()
        .map(|m| m.id.clone())
        .collect();
    assert_eq!(order, vec!["auth", "users", "notes", "logs", "health"]);
}

#[test]
fn add_installs_missing_prerequisites_first() {
    let (installer, fs) = project();
    let report = installer
        .install("notes", &root(), &InstallOptions::default())
        .unwrap();

    assert_eq!(report.status, InstallStatus::Installed);
    let prereqs: Vec<&str> = report.prerequisites.iter().map(|r| r.module.as_str()).collect();
    assert_eq!(prereqs, vec!["auth", "users"]);

    for id in ["auth", "users", "notes"] {
        assert!(fs.read_file(format!("/proj/app/modules/{id}/router.py")).is_some());
    }
    assert!(fs.read_file("/proj/app/common/pagination.py").is_some());
    assert!(fs.read_file("/proj/app/common/__init__.py").is_some());

    let router = read(&fs, "app/api/router.py");
    assert!(router.contains("from app.modules.auth.router import router as auth_router"));
    assert!(router.contains("api_router.include_router(users_router, prefix=\"/users\", tags=[\"users\"])"));
    assert!(router.contains("try:\n    from app.modules.notes.router import router as notes_router"));
    assert!(router.contains("except ImportError:"));
}

#[test]
fn re_adding_leaves_the_tree_unchanged() {
    let (installer, fs) = project();
    installer.install("notes", &root(), &InstallOptions::default()).unwrap();
    let before = snapshot(&fs);
    let writes = fs.write_count();

    let report = installer
        .install("notes", &root(), &InstallOptions::default())
        .unwrap();

    assert_eq!(report.status, InstallStatus::Skipped);
    assert!(report.prerequisites.is_empty());
    assert_eq!(fs.write_count(), writes);
    assert_eq!(snapshot(&fs), before);
}

#[test]
fn force_rewrites_only_the_requested_module() {
    let (installer, fs) = project();
    installer.install("notes", &root(), &InstallOptions::default()).unwrap();

    let notes = root().join("app/modules/notes/router.py");
    let auth = root().join("app/modules/auth/router.py");
    let fs_port: &dyn Filesystem = &fs;
    fs_port.write_file(&notes, b"# edited notes\n").unwrap();
    fs_port.write_file(&auth, b"# edited auth\n").unwrap();

    let report = installer
        .install(
            "notes",
            &root(),
            &InstallOptions {
                force: true,
                ..InstallOptions::default()
            },
        )
        .unwrap();

    assert_eq!(report.status, InstallStatus::Installed);
    assert!(report.prerequisites.is_empty());
    assert!(report
        .changes
        .iter()
        .any(|c| c.path == "app/modules/notes/router.py" && c.outcome == ChangeOutcome::Updated));
    assert_eq!(
        fs.read_file(&notes).unwrap(),
        "from fastapi import APIRouter\n\nrouter = APIRouter()  # notes\n"
    );
    assert_eq!(fs.read_file(&auth).unwrap(), "# edited auth\n");
}

// ============================================================================
// Idempotence and merge behavior
// ============================================================================

#[test]
fn install_all_twice_is_idempotent() {
    let (installer, fs) = project();
    let first = installer.install_all(&root(), &InstallOptions::default()).unwrap();
    assert!(first.is_complete());
    assert_eq!(first.counts().installed, MODULES.len());

    let before = snapshot(&fs);
    let second = installer.install_all(&root(), &InstallOptions::default()).unwrap();
    assert_eq!(second.counts().skipped, MODULES.len());
    assert_eq!(snapshot(&fs), before);
}

#[test]
fn registration_is_never_duplicated() {
    let (installer, fs) = project();
    installer.install("users", &root(), &InstallOptions::default()).unwrap();
    installer.install("users", &root(), &InstallOptions::default()).unwrap();
    installer
        .install_many(&["users".to_string(), "logs".to_string()], &root(), &InstallOptions::default())
        .unwrap();
    installer.install_all(&root(), &InstallOptions::default()).unwrap();

    let router = read(&fs, "app/api/router.py");
    assert_eq!(occurrences(&router, "include_router(users_router"), 1);
    assert_eq!(occurrences(&router, "import router as users_router"), 1);

    let config = read(&fs, "app/core/config.py");
    assert_eq!(occurrences(&config, "class AuthSettings(BaseModel):"), 1);
    assert_eq!(occurrences(&config, "auth: AuthSettings = AuthSettings()"), 1);
    assert_eq!(occurrences(&config, "from pydantic import BaseModel"), 1);
}

#[test]
fn existing_entries_are_never_overwritten() {
    let (installer, fs) = project();
    let fs_port: &dyn Filesystem = &fs;
    fs_port
        .write_file(&root().join("requirements.txt"), b"fastapi\nPyJWT==2.0\n")
        .unwrap();
    fs_port
        .write_file(&root().join(".env"), b"JWT_SECRET=mine\n")
        .unwrap();

    installer.install("auth", &root(), &InstallOptions::default()).unwrap();

    assert_eq!(read(&fs, "requirements.txt"), "fastapi\nPyJWT==2.0\n");
    let env = read(&fs, ".env");
    assert!(env.starts_with("JWT_SECRET=mine\n"));
    assert_eq!(occurrences(&env, "JWT_SECRET="), 1);
    assert!(env.contains("# Auth (module 'auth')\nJWT_TTL_MINUTES=30\n"));
}

#[test]
fn dry_run_reports_changes_without_writing() {
    let (installer, fs) = project();
    let before = snapshot(&fs);
    let writes = fs.write_count();

    let report = installer
        .install(
            "users",
            &root(),
            &InstallOptions {
                dry_run: true,
                ..InstallOptions::default()
            },
        )
        .unwrap();

    assert!(report.dry_run);
    assert_eq!(report.prerequisites.len(), 1);
    assert!(report
        .changes
        .iter()
        .any(|c| c.path == "app/api/router.py" && c.outcome == ChangeOutcome::Updated));
    assert_eq!(fs.write_count(), writes);
    assert_eq!(snapshot(&fs), before);
}

// ============================================================================
// Failure handling
// ============================================================================

#[test]
fn batch_isolates_a_failing_module() {
    let (installer, fs) = project();
    fs.fail_on("/proj/app/modules/logs");

    let batch = installer
        .install_many(
            &["auth".to_string(), "logs".to_string(), "health".to_string()],
            &root(),
            &InstallOptions::default(),
        )
        .unwrap();

    assert_eq!(batch.get("auth").unwrap().status, InstallStatus::Installed);
    assert_eq!(batch.get("logs").unwrap().status, InstallStatus::Failed);
    assert_eq!(batch.get("health").unwrap().status, InstallStatus::Installed);
    assert!(!batch.is_complete());
    assert!(!fs.exists(Path::new("/proj/app/modules/logs")));
}

#[test]
fn dependents_of_a_failed_module_are_marked() {
    let (installer, fs) = project();
    fs.fail_on("/proj/app/modules/auth");

    let batch = installer.install_all(&root(), &InstallOptions::default()).unwrap();

    assert_eq!(batch.get("auth").unwrap().status, InstallStatus::Failed);
    assert_eq!(batch.get("users").unwrap().status, InstallStatus::DependencyMissing);
    assert_eq!(batch.get("notes").unwrap().status, InstallStatus::DependencyMissing);
    assert_eq!(batch.get("logs").unwrap().status, InstallStatus::Installed);
    let counts = batch.counts();
    assert_eq!((counts.installed, counts.failed), (2, 3));
}

#[test]
fn no_deps_requires_prerequisites_in_the_tree() {
    let (installer, fs) = project();
    let err = installer
        .install(
            "users",
            &root(),
            &InstallOptions {
                resolve_dependencies: false,
                ..InstallOptions::default()
            },
        )
        .unwrap_err();

    assert!(matches!(
        err,
        BlocksError::Domain(DomainError::MissingDependency { ref missing, .. }) if missing == "auth"
    ));
    assert!(!fs.exists(Path::new("/proj/app/modules/users")));
}

#[test]
fn unknown_module_and_missing_project_are_errors() {
    let (installer, _) = project();
    let err = installer
        .install("ghost", &root(), &InstallOptions::default())
        .unwrap_err();
    assert!(matches!(err, BlocksError::Domain(DomainError::ModuleNotFound { .. })));

    let err = installer
        .install("auth", Path::new("/nowhere"), &InstallOptions::default())
        .unwrap_err();
    assert!(matches!(
        err,
        BlocksError::Application(ApplicationError::ProjectNotFound { .. })
    ));
}

#[test]
fn missing_route_file_is_a_partial_failure() {
    let fs = registry_files(MemoryFilesystem::new()).with_dir("/bare");
    let installer = installer(&fs);

    let report = installer
        .install("logs", Path::new("/bare"), &InstallOptions::default())
        .unwrap();

    assert_eq!(report.status, InstallStatus::PartialFailure);
    assert!(report.details.iter().any(|d| d.contains("no route file found")));
    assert!(fs.read_file("/bare/app/modules/logs/router.py").is_some());
}

#[test]
fn unparsable_route_file_is_left_untouched() {
    let (installer, fs) = project();
    let broken = "from fastapi import APIRouter\n\napi_router = APIRouter(\n";
    let fs_port: &dyn Filesystem = &fs;
    fs_port
        .write_file(&root().join("app/api/router.py"), broken.as_bytes())
        .unwrap();

    let report = installer.install("logs", &root(), &InstallOptions::default()).unwrap();

    assert_eq!(report.status, InstallStatus::PartialFailure);
    assert_eq!(read(&fs, "app/api/router.py"), broken);
    assert!(report
        .changes
        .iter()
        .any(|c| c.path == "app/api/router.py" && c.outcome == ChangeOutcome::Failed));
}

#[test]
fn failed_aggregator_write_keeps_the_report() {
    let (installer, fs) = project();
    fs.fail_on("/proj/requirements.txt");

    let report = installer.install("auth", &root(), &InstallOptions::default()).unwrap();

    assert_eq!(report.status, InstallStatus::PartialFailure);
    assert!(report
        .changes
        .iter()
        .any(|c| c.path == "app/api/router.py" && c.outcome == ChangeOutcome::Updated));
    assert!(report
        .changes
        .iter()
        .any(|c| c.path == "requirements.txt" && c.outcome == ChangeOutcome::Failed));
    assert!(report.details.iter().any(|d| d.contains("requirements.txt")));
    // earlier and later aggregators are still applied
    assert!(read(&fs, "app/api/router.py").contains("auth_router"));
    assert!(read(&fs, ".env").contains("JWT_SECRET=change-me"));
    assert!(!read(&fs, "requirements.txt").contains("pyjwt"));
}

// ============================================================================
// Remove and status
// ============================================================================

#[test]
fn status_is_derived_from_the_tree() {
    let (installer, _) = project();
    installer.install("auth", &root(), &InstallOptions::default()).unwrap();

    let states = installer.status(&root()).unwrap();
    let auth = states.iter().find(|s| s.module == "auth").unwrap();
    let users = states.iter().find(|s| s.module == "users").unwrap();
    assert!(auth.files_present && auth.registered);
    assert!(!users.files_present && !users.registered);
}

#[test]
fn status_reports_an_unparsable_route_file() {
    let (installer, fs) = project();
    let fs_port: &dyn Filesystem = &fs;
    fs_port
        .write_file(&root().join("app/api/router.py"), b"api_router = APIRouter(\n")
        .unwrap();

    let err = installer.status(&root()).unwrap_err();
    assert!(matches!(err, BlocksError::Domain(DomainError::Parse { ref file, .. }) if file == "app/api/router.py"));
}

#[test]
fn remove_deletes_files_and_registration() {
    let (installer, fs) = project();
    installer.install("users", &root(), &InstallOptions::default()).unwrap();

    let report = installer.remove("users", &root(), true).unwrap();

    assert!(report.unregistered);
    assert_eq!(report.removed_dir, "app/modules/users");
    assert!(!fs.exists(Path::new("/proj/app/modules/users")));
    let router = read(&fs, "app/api/router.py");
    assert!(!router.contains("users_router"));
    assert!(router.contains("auth_router"));

    let states = installer.status(&root()).unwrap();
    assert!(!states.iter().find(|s| s.module == "users").unwrap().is_installed());
}

#[test]
fn removing_a_prerequisite_warns_about_dependents() {
    let (installer, _) = project();
    installer.install("users", &root(), &InstallOptions::default()).unwrap();

    let report = installer.remove("auth", &root(), false).unwrap();

    assert!(!report.unregistered);
    assert!(report.details.iter().any(|d| d.contains("'users' depends on 'auth'")));

    let err = installer.remove("auth", &root(), false).unwrap_err();
    assert!(matches!(
        err,
        BlocksError::Application(ApplicationError::ModuleNotInstalled { .. })
    ));
}

#[test]
fn init_refuses_a_non_empty_directory() {
    let (_, fs) = project();
    let init = ProjectInitializer::new(Box::new(fs.clone()), Box::new(BuiltinSkeleton::new()));
    let request = InitRequest {
        name: "shop".into(),
        description: String::new(),
        secret_key: "k".into(),
    };
    let err = init.init(&root(), &request, false).unwrap_err();
    assert!(matches!(
        err,
        BlocksError::Application(ApplicationError::ProjectNotEmpty { .. })
    ));
    assert!(read(&fs, ".env").contains("SECRET_KEY=test-secret"));
}

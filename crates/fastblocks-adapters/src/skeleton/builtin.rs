//! The FastAPI skeleton that ships with fastblocks.
//!
//! `app/api/router.py`, `app/core/config.py`, `requirements.txt`, `.env` and
//! `.gitignore` are the aggregator files modules are wired into.

use fastblocks_core::{
    application::ports::{SkeletonFile, SkeletonStore},
    error::BlocksResult,
};

const MAIN_PY: &str = r#""""{project_name}: {project_description}"""

from fastapi import FastAPI

from app.api.router import api_router
from app.core.config import settings

app = FastAPI(
    title=settings.project_name,
    description=settings.project_description,
    debug=settings.debug,
)

app.include_router(api_router, prefix=settings.api_prefix)


@app.get("/health", tags=["health"])
def health() -> dict[str, str]:
    return {"status": "ok"}
"#;

const ROUTER_PY: &str = r#""""Application router. Installed modules register here."""

from fastapi import APIRouter

api_router = APIRouter()
"#;

const CONFIG_PY: &str = r#""""Application settings, loaded from the environment and `.env`."""

from pydantic_settings import BaseSettings, SettingsConfigDict


class Settings(BaseSettings):
    model_config = SettingsConfigDict(env_file=".env", extra="ignore")

    project_name: str = "{project_name}"
    project_description: str = "{project_description}"
    debug: bool = False
    api_prefix: str = "/api"
    secret_key: str = "change-me"


settings = Settings()
"#;

const REQUIREMENTS_TXT: &str = "\
fastapi>=0.115
uvicorn[standard]>=0.30
pydantic>=2.7
pydantic-settings>=2.3
python-dotenv>=1.0
";

const DEV_REQUIREMENTS_TXT: &str = "\
-r requirements.txt
pytest>=8.0
httpx>=0.27
";

const ENV: &str = "\
# Application
PROJECT_NAME={project_name}
DEBUG=false
SECRET_KEY={secret_key}
";

const GITIGNORE: &str = "\
__pycache__/
*.py[cod]
.venv/
venv/
.env
.pytest_cache/
.mypy_cache/
*.egg-info/
dist/
build/
";

const README_MD: &str = "\
# {project_name}

{project_description}

## Getting started

```bash
python -m venv .venv
source .venv/bin/activate
pip install -r requirements-dev.txt
uvicorn main:app --reload
```

## Adding modules

```bash
fastblocks list
fastblocks add auth
```
";

const PYPROJECT_TOML: &str = r#"[project]
name = "{project_name}"
description = "{project_description}"
version = "0.1.0"
requires-python = ">=3.11"

[tool.pytest.ini_options]
testpaths = ["tests"]
"#;

const TEST_MAIN_PY: &str = r#"from fastapi.testclient import TestClient

from main import app

client = TestClient(app)


def test_health() -> None:
    response = client.get("/health")
    assert response.status_code == 200
    assert response.json() == {"status": "ok"}
"#;

const FILES: &[(&str, &str)] = &[
    ("main.py", MAIN_PY),
    ("requirements.txt", REQUIREMENTS_TXT),
    ("requirements-dev.txt", DEV_REQUIREMENTS_TXT),
    (".env", ENV),
    (".gitignore", GITIGNORE),
    ("README.md", README_MD),
    ("pyproject.toml", PYPROJECT_TOML),
    ("app/__init__.py", ""),
    ("app/api/__init__.py", ""),
    ("app/api/router.py", ROUTER_PY),
    ("app/core/__init__.py", ""),
    ("app/core/config.py", CONFIG_PY),
    ("app/modules/__init__.py", ""),
    ("tests/__init__.py", ""),
    ("tests/test_main.py", TEST_MAIN_PY),
];

#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinSkeleton;

impl BuiltinSkeleton {
    pub fn new() -> Self {
        Self
    }
}

impl SkeletonStore for BuiltinSkeleton {
    fn files(&self) -> BlocksResult<Vec<SkeletonFile>> {
        Ok(FILES
            .iter()
            .map(|(path, content)| SkeletonFile {
                path: (*path).to_string(),
                content: (*content).to_string(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fastblocks_core::domain::{
        EnvironmentFile, PackageManifest, ProjectLayout, RouteAggregator, SourceMutator,
    };

    fn content(path: &str) -> String {
        FILES
            .iter()
            .find(|(p, _)| *p == path)
            .map(|(_, c)| c.to_string())
            .unwrap()
    }

    #[test]
    fn aggregator_files_are_where_the_layout_expects_them() {
        let layout = ProjectLayout::default();
        let paths: Vec<&str> = FILES.iter().map(|(p, _)| *p).collect();
        for file in [
            &layout.route_file,
            &layout.manifest_file,
            &layout.env_file,
            &layout.settings_file,
            &layout.ignore_file,
        ] {
            assert!(paths.contains(&file.as_str()), "{} missing", file);
        }
    }

    #[test]
    fn skeleton_aggregators_parse() {
        let module = fastblocks_core::domain::ModuleDescriptor {
            id: "notes".into(),
            name: "Notes".into(),
            description: String::new(),
            version: "1".into(),
            source_path: fastblocks_core::domain::RelativePath::try_new("modules/notes").unwrap(),
            file_manifest: vec![],
            runtime_packages: vec![],
            module_dependencies: vec![],
            common_dependencies: vec![],
            config_dependencies: vec![],
            environment: Default::default(),
            route: fastblocks_core::domain::RouteRegistration {
                prefix: "/notes".into(),
                tags: vec!["notes".into()],
                optional: false,
            },
            author: None,
            repository: None,
            python_version: None,
        };
        let layout = ProjectLayout::default();
        let route = RouteAggregator::new(layout.modules_package(), "app/api/router.py");
        let out = route.apply(&content("app/api/router.py"), &module).unwrap();
        assert!(out.changed);
        assert!(out
            .new_content
            .contains("api_router.include_router(notes_router, prefix=\"/notes\""));

        assert!(!PackageManifest.apply(&content("requirements.txt"), &module).unwrap().changed);
        assert!(!EnvironmentFile::new(".env").apply(&content(".env"), &module).unwrap().changed);
    }
}

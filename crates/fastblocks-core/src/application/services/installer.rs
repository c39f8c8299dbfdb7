//! Installer - main application orchestrator.
//!
//! Per module, in dependency order:
//! 1. Check that prerequisite modules are present (or planned)
//! 2. Materialize module files and common bundles
//! 3. Run the five aggregator mutators in fixed order
//!
//! Installed state is never persisted; it is derived from the project tree.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

use crate::{
    application::{
        ApplicationError, RegistryManager,
        ports::Filesystem,
        services::materializer::{MaterializeStatus, Materializer},
    },
    domain::{
        BatchReport, ChangeOutcome, DomainError, EnvironmentFile, IgnorePattern, InstallReport,
        InstallStatus, ModuleDescriptor, ModuleState, MutatorKind, PackageManifest,
        ProjectLayout, RemoveReport, ResolveTarget, RouteAggregator, SettingsInjection,
        SourceMutator,
    },
    error::{BlocksError, BlocksResult},
};

/// Knobs for an install run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstallOptions {
    /// Rewrite module files of the requested modules even if present.
    pub force: bool,
    /// Compute every outcome, write nothing.
    pub dry_run: bool,
    /// Install absent prerequisites first instead of failing.
    pub resolve_dependencies: bool,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            force: false,
            dry_run: false,
            resolve_dependencies: true,
        }
    }
}

/// Modules known to be present, or to become present, during one run.
#[derive(Default)]
struct RunState {
    planned: HashSet<String>,
    failed: HashSet<String>,
}

/// Where an aggregator lives, and what to do if it is missing.
enum AggregatorFile {
    Existing(PathBuf, String),
    Create(PathBuf, String),
    Absent(String),
}

pub struct Installer {
    registry: RegistryManager,
    filesystem: Box<dyn Filesystem>,
    layout: ProjectLayout,
}

impl Installer {
    pub fn new(
        registry: RegistryManager,
        filesystem: Box<dyn Filesystem>,
        layout: ProjectLayout,
    ) -> Self {
        Self {
            registry,
            filesystem,
            layout,
        }
    }

    pub fn registry(&self) -> &RegistryManager {
        &self.registry
    }

    pub fn layout(&self) -> &ProjectLayout {
        &self.layout
    }

    /// Install one module. Surfaces the first fatal error.
    ///
    /// With `resolve_dependencies`, absent prerequisites are installed first
    /// (never forced) and reported under `prerequisites`. Without it, every
    /// prerequisite must already be in the tree.
    #[instrument(skip_all, fields(module = %id, root = %root.display()))]
    pub fn install(&self, id: &str, root: &Path, options: &InstallOptions) -> BlocksResult<InstallReport> {
        self.ensure_project(root)?;
        let order = self.registry.resolve(&ResolveTarget::One(id.to_string()))?;
        let mut state = RunState::default();
        let mut prerequisites = Vec::new();

        if options.resolve_dependencies {
            for dep in order.iter().filter(|m| m.id != id) {
                if self.is_present(&dep.id, root, &state) {
                    continue;
                }
                info!(prerequisite = %dep.id, "Installing prerequisite");
                let report = self.install_one(dep, root, false, options.dry_run, &mut state)?;
                prerequisites.push(report);
            }
        }

        let module = self.registry.lookup(id)?;
        let mut report = self.install_one(module, root, options.force, options.dry_run, &mut state)?;
        report.prerequisites = prerequisites;
        Ok(report)
    }

    /// Install several modules in dependency order, isolating failures.
    ///
    /// Resolution errors (unknown id, cycle) are fatal for the whole batch.
    /// `force` applies only to the requested ids.
    #[instrument(skip_all, fields(count = ids.len(), root = %root.display()))]
    pub fn install_many(
        &self,
        ids: &[String],
        root: &Path,
        options: &InstallOptions,
    ) -> BlocksResult<BatchReport> {
        self.ensure_project(root)?;
        let order = self.registry.resolve(&ResolveTarget::Many(ids.to_vec()))?;
        let requested: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let order: Vec<&ModuleDescriptor> = order
            .into_iter()
            .filter(|m| options.resolve_dependencies || requested.contains(m.id.as_str()))
            .collect();
        Ok(self.run_batch(&order, root, options, |m| requested.contains(m.id.as_str())))
    }

    /// Install the whole registry in dependency order, isolating failures.
    #[instrument(skip_all, fields(root = %root.display()))]
    pub fn install_all(&self, root: &Path, options: &InstallOptions) -> BlocksResult<BatchReport> {
        self.ensure_project(root)?;
        let order = self.registry.resolve(&ResolveTarget::All)?;
        Ok(self.run_batch(&order, root, options, |_| true))
    }

    fn run_batch(
        &self,
        order: &[&ModuleDescriptor],
        root: &Path,
        options: &InstallOptions,
        forced: impl Fn(&ModuleDescriptor) -> bool,
    ) -> BatchReport {
        let mut state = RunState::default();
        let mut batch = BatchReport::default();

        for module in order {
            if let Some(dep) = module
                .module_dependencies
                .iter()
                .find(|d| state.failed.contains(d.as_str()))
            {
                warn!(module = %module.id, prerequisite = %dep, "Skipping dependent of failed module");
                state.failed.insert(module.id.clone());
                batch.push(
                    InstallReport::new(&module.id, InstallStatus::DependencyMissing)
                        .with_detail(format!("prerequisite '{}' failed earlier in this run", dep)),
                );
                continue;
            }

            let force = options.force && forced(*module);
            match self.install_one(module, root, force, options.dry_run, &mut state) {
                // partial failures still leave the files in place for dependents
                Ok(report) => batch.push(report),
                Err(e) => {
                    warn!(module = %module.id, error = %e, "Module install failed");
                    state.failed.insert(module.id.clone());
                    let status = match &e {
                        BlocksError::Domain(DomainError::MissingDependency { .. }) => {
                            InstallStatus::DependencyMissing
                        }
                        _ => InstallStatus::Failed,
                    };
                    let mut report = InstallReport::new(&module.id, status).with_detail(e.to_string());
                    report.dry_run = options.dry_run;
                    batch.push(report);
                }
            }
        }

        let counts = batch.counts();
        info!(
            installed = counts.installed,
            skipped = counts.skipped,
            failed = counts.failed,
            "Batch complete"
        );
        batch
    }

    /// The per-module pipeline. Fatal errors are returned; aggregator parse
    /// failures become `PartialFailure` details.
    fn install_one(
        &self,
        module: &ModuleDescriptor,
        root: &Path,
        force: bool,
        dry_run: bool,
        state: &mut RunState,
    ) -> BlocksResult<InstallReport> {
        for dep in &module.module_dependencies {
            if !self.is_present(dep, root, state) {
                return Err(DomainError::MissingDependency {
                    module: module.id.clone(),
                    missing: dep.clone(),
                }
                .into());
            }
        }

        let registry = self.registry.registry();
        let materializer = Materializer::new(self.filesystem.as_ref(), registry, &self.layout);
        let materialized = materializer.materialize(module, root, force, dry_run)?;

        let status = match materialized.status {
            MaterializeStatus::Installed => InstallStatus::Installed,
            MaterializeStatus::SkippedAlreadyPresent => InstallStatus::Skipped,
        };
        let mut report = InstallReport::new(&module.id, status);
        report.dry_run = dry_run;
        report.changes = materialized.changes;
        if status == InstallStatus::Skipped {
            report.details.push(format!(
                "module directory {} already present; use --force to overwrite",
                self.layout.module_dir(&module.id)?
            ));
        }

        let mut partial = false;
        for kind in MutatorKind::ORDER {
            if !self.mutator(kind, "").applies_to(module) {
                continue;
            }
            let (path, label, current, creating) = match self.aggregator_target(kind, root) {
                AggregatorFile::Existing(path, label) => match self.filesystem.read_to_string(&path) {
                    Ok(current) => (path, label, current, false),
                    Err(e) => {
                        warn!(file = %label, error = %e, "Aggregator could not be read");
                        partial = true;
                        report.details.push(e.to_string());
                        report.record(label, ChangeOutcome::Failed);
                        continue;
                    }
                },
                AggregatorFile::Create(path, label) => (path, label, String::new(), true),
                AggregatorFile::Absent(reason) => {
                    if kind == MutatorKind::Ignore {
                        debug!("{}", reason);
                    } else {
                        partial = true;
                        report.details.push(reason);
                    }
                    continue;
                }
            };

            match self.mutator(kind, &label).apply(&current, module) {
                Ok(result) if result.changed => {
                    let outcome = if creating {
                        ChangeOutcome::Created
                    } else {
                        ChangeOutcome::Updated
                    };
                    // earlier aggregators may already be written: record and go on
                    let written = if dry_run {
                        Ok(())
                    } else {
                        self.filesystem.write_file(&path, result.new_content.as_bytes())
                    };
                    match written {
                        Ok(()) => report.record(label, outcome),
                        Err(e) => {
                            warn!(file = %label, error = %e, "Aggregator could not be written");
                            partial = true;
                            report.details.push(e.to_string());
                            report.record(label, ChangeOutcome::Failed);
                        }
                    }
                }
                Ok(_) => report.record(label, ChangeOutcome::Unchanged),
                Err(e) => {
                    warn!(file = %label, error = %e, "Aggregator left untouched");
                    partial = true;
                    report.details.push(e.to_string());
                    report.record(label, ChangeOutcome::Failed);
                }
            }
        }

        if partial {
            report.status = InstallStatus::PartialFailure;
        }
        state.planned.insert(module.id.clone());
        info!(module = %module.id, status = %report.status, "Module processed");
        Ok(report)
    }

    /// `label` names the file in parse errors.
    fn mutator(&self, kind: MutatorKind, label: &str) -> Box<dyn SourceMutator + '_> {
        match kind {
            MutatorKind::Route => Box::new(RouteAggregator::new(self.layout.modules_package(), label)),
            MutatorKind::Manifest => Box::new(PackageManifest),
            MutatorKind::Env => Box::new(EnvironmentFile::new(label)),
            MutatorKind::Settings => {
                Box::new(SettingsInjection::new(self.registry.registry(), label))
            }
            MutatorKind::Ignore => Box::new(IgnorePattern::new(self.layout.clone())),
        }
    }

    fn aggregator_target(&self, kind: MutatorKind, root: &Path) -> AggregatorFile {
        let layout = &self.layout;
        let existing = |rel: &str| {
            let path = root.join(rel);
            self.filesystem
                .exists(&path)
                .then(|| AggregatorFile::Existing(path, rel.to_string()))
        };
        match kind {
            MutatorKind::Route => existing(&layout.route_file)
                .or_else(|| existing(&layout.route_fallback))
                .unwrap_or_else(|| {
                    AggregatorFile::Absent(format!(
                        "no route file found ({} or {}); register the router manually",
                        layout.route_file, layout.route_fallback
                    ))
                }),
            MutatorKind::Manifest => existing(&layout.manifest_file).unwrap_or_else(|| {
                AggregatorFile::Create(root.join(&layout.manifest_file), layout.manifest_file.clone())
            }),
            MutatorKind::Env => existing(&layout.env_file).unwrap_or_else(|| {
                AggregatorFile::Create(root.join(&layout.env_file), layout.env_file.clone())
            }),
            MutatorKind::Settings => existing(&layout.settings_file).unwrap_or_else(|| {
                AggregatorFile::Absent(format!(
                    "settings file {} not found; compose the settings blocks manually",
                    layout.settings_file
                ))
            }),
            MutatorKind::Ignore => existing(&layout.ignore_file).unwrap_or_else(|| {
                AggregatorFile::Absent(format!("no {} in project, nothing to check", layout.ignore_file))
            }),
        }
    }

    fn ensure_project(&self, root: &Path) -> BlocksResult<()> {
        if !self.filesystem.is_dir(root) {
            return Err(ApplicationError::ProjectNotFound {
                path: root.to_path_buf(),
            }
            .into());
        }
        Ok(())
    }

    fn is_present(&self, id: &str, root: &Path, state: &RunState) -> bool {
        if state.planned.contains(id) {
            return true;
        }
        self.layout
            .module_dir(id)
            .map(|d| self.filesystem.is_dir(&root.join(d.as_path())))
            .unwrap_or(false)
    }

    /// Delete a module's directory and (optionally) its route registration.
    #[instrument(skip_all, fields(module = %id, root = %root.display(), unregister))]
    pub fn remove(&self, id: &str, root: &Path, unregister: bool) -> BlocksResult<RemoveReport> {
        self.ensure_project(root)?;
        let module = self.registry.lookup(id)?;
        let dir = self.layout.module_dir(&module.id)?;
        let abs = root.join(dir.as_path());
        if !self.filesystem.is_dir(&abs) {
            return Err(ApplicationError::ModuleNotInstalled {
                module: module.id.clone(),
            }
            .into());
        }

        self.filesystem.remove_dir_all(&abs)?;
        info!(dir = %dir, "Module directory removed");

        let mut report = RemoveReport {
            module: module.id.clone(),
            removed_dir: dir.to_slash(),
            unregistered: false,
            details: Vec::new(),
        };

        if unregister {
            match self.aggregator_target(MutatorKind::Route, root) {
                AggregatorFile::Existing(path, label) => {
                    let current = self.filesystem.read_to_string(&path)?;
                    let route = RouteAggregator::new(self.layout.modules_package(), label);
                    match route.unregister(&current, module) {
                        Ok(result) => {
                            if result.changed {
                                self.filesystem
                                    .write_file(&path, result.new_content.as_bytes())?;
                            }
                            report.unregistered = result.changed;
                        }
                        Err(e) => {
                            warn!(error = %e, "Route file left untouched");
                            report.details.push(e.to_string());
                        }
                    }
                }
                AggregatorFile::Create(..) => {}
                AggregatorFile::Absent(reason) => report.details.push(reason),
            }
        }

        for dependent in self.registry.dependents(&module.id) {
            if self.is_present(&dependent.id, root, &RunState::default()) {
                report.details.push(format!(
                    "installed module '{}' depends on '{}'",
                    dependent.id, module.id
                ));
            }
        }
        Ok(report)
    }

    /// Derived state of every registry module in `root`.
    ///
    /// An unparsable route file is an error rather than "nothing registered".
    pub fn status(&self, root: &Path) -> BlocksResult<Vec<ModuleState>> {
        self.ensure_project(root)?;
        let (route_content, label) = match self.aggregator_target(MutatorKind::Route, root) {
            AggregatorFile::Existing(path, label) => {
                (Some(self.filesystem.read_to_string(&path)?), label)
            }
            _ => (None, self.layout.route_file.clone()),
        };
        let route = RouteAggregator::new(self.layout.modules_package(), label);

        self.registry
            .list()
            .iter()
            .map(|m| {
                let registered = match route_content.as_deref() {
                    Some(content) => route.is_registered(content, m)?,
                    None => false,
                };
                Ok(ModuleState {
                    module: m.id.clone(),
                    files_present: self.is_present(&m.id, root, &RunState::default()),
                    registered,
                })
            })
            .collect()
    }
}

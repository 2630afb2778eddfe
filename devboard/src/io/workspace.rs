//! Workspace layout and scaffolding.
//!
//! ```text
//! <root>/
//!   config.toml
//!   projects/<project>/TASKS.md
//!   projects/<project>/LOG.md
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use tracing::info;

use crate::io::config::{DevboardConfig, write_config};

const TASKS_PLACEHOLDER: &str = "";
const LOG_PLACEHOLDER: &str = "# Work log\n";

/// Canonical paths for a workspace root.
#[derive(Debug, Clone)]
pub struct Workspace {
    pub root: PathBuf,
    pub config_path: PathBuf,
    pub projects_dir: PathBuf,
}

/// Canonical paths for one project inside a workspace.
#[derive(Debug, Clone)]
pub struct ProjectPaths {
    pub dir: PathBuf,
    pub tasks_path: PathBuf,
    pub log_path: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            config_path: root.join("config.toml"),
            projects_dir: root.join("projects"),
            root,
        }
    }

    /// Paths for `project`. Fails on ids that are not safe directory names.
    pub fn project(&self, project: &str) -> Result<ProjectPaths> {
        validate_project_id(project)?;
        let dir = self.projects_dir.join(project);
        Ok(ProjectPaths {
            tasks_path: dir.join("TASKS.md"),
            log_path: dir.join("LOG.md"),
            dir,
        })
    }

    /// Paths for an existing project; a missing directory is an error.
    pub fn existing_project(&self, project: &str) -> Result<ProjectPaths> {
        let paths = self.project(project)?;
        if !paths.dir.is_dir() {
            return Err(anyhow!("project '{project}' not found"));
        }
        Ok(paths)
    }

    /// Project ids with a directory under `projects/`, sorted.
    pub fn list_projects(&self) -> Result<Vec<String>> {
        if !self.projects_dir.exists() {
            return Ok(Vec::new());
        }
        let mut projects = Vec::new();
        let entries = fs::read_dir(&self.projects_dir)
            .with_context(|| format!("read {}", self.projects_dir.display()))?;
        for entry in entries {
            let entry = entry.with_context(|| format!("read {}", self.projects_dir.display()))?;
            if entry.path().is_dir() {
                projects.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        projects.sort();
        Ok(projects)
    }
}

/// Options for `init_project`.
#[derive(Debug, Clone)]
pub struct InitOptions {
    /// If true, overwrite existing documents with empty ones.
    pub force: bool,
}

/// Create the workspace config (if missing) and an empty project.
pub fn init_project(root: &Path, project: &str, options: &InitOptions) -> Result<ProjectPaths> {
    let workspace = Workspace::new(root);
    let paths = workspace.project(project)?;
    if paths.dir.exists() && !options.force {
        return Err(anyhow!(
            "devboard init: project '{project}' already exists (use --force to overwrite)"
        ));
    }

    fs::create_dir_all(&paths.dir)
        .with_context(|| format!("create directory {}", paths.dir.display()))?;
    if !workspace.config_path.exists() {
        write_config(&workspace.config_path, &DevboardConfig::default())?;
    }
    write_file(&paths.tasks_path, TASKS_PLACEHOLDER)?;
    write_file(&paths.log_path, LOG_PLACEHOLDER)?;

    info!(project, dir = %paths.dir.display(), "initialized project");
    Ok(paths)
}

/// Validate that a project id is a plain directory name.
pub fn validate_project_id(id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(anyhow!("project id must not be empty"));
    }
    if id.starts_with('.') {
        return Err(anyhow!("project id must not start with '.'"));
    }
    if id
        .chars()
        .any(|c| !(c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-'))
    {
        return Err(anyhow!(
            "project id must be [A-Za-z0-9._-] only (got '{id}')"
        ));
    }
    Ok(())
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents).with_context(|| format!("write {}", path.display()))
}

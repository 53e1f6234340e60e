//! Source, install, Debian and clean targets for the project.
//!
//! Every target is planned as a list of [`Step`]s before anything runs, so
//! a dry run can show exactly what would happen. External tools are
//! invoked through a [`CommandRunner`]; their failures are returned as is.

use crate::domain::ports::{CommandRunner, CommandSpec};
use crate::utils::error::{CassError, Result};
use regex::Regex;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

pub const DEFAULT_PROJECT: &str = "cassobjects";
pub const DEFAULT_DESTDIR: &str = "/";
pub const DEBIAN_BUILDER: &str = "pdebuild";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum Target {
    /// Print the available targets
    #[default]
    All,
    /// Create a source distribution
    Source,
    /// Install into the destination root
    Install,
    /// Build a Debian package
    Deb,
    /// Remove build artifacts and compiled bytecode
    Clean,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tool {
    /// A Python project driven through its `setup.py`.
    Setuptools { python: PathBuf },
    /// A Rust crate driven through cargo.
    Cargo { cargo: String },
}

impl Tool {
    fn program(&self) -> String {
        match self {
            Self::Setuptools { python } => python.display().to_string(),
            Self::Cargo { cargo } => cargo.clone(),
        }
    }

    fn command<I, A>(&self, args: I) -> CommandSpec
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        let mut all: Vec<String> = Vec::new();
        if matches!(self, Self::Setuptools { .. }) {
            all.push("setup.py".to_string());
        }
        all.extend(args.into_iter().map(Into::into));
        CommandSpec::new(self.program(), all)
    }
}

/// Finds a Python interpreter: the explicit path when given, otherwise the
/// first executable `python3` or `python` on `PATH`.
pub fn detect_python(explicit: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path);
    }
    find_python_in(std::env::var_os("PATH"))
}

fn find_python_in(paths: Option<OsString>) -> Result<PathBuf> {
    let cwd = std::env::current_dir()?;
    let found = which::which_in("python3", paths.as_ref(), &cwd)
        .or_else(|_| which::which_in("python", paths.as_ref(), &cwd))
        .map_err(|_| CassError::MissingConfigError {
            field: "PYTHON".to_string(),
        })?;
    tracing::debug!("Detected interpreter {}", found.display());
    Ok(found)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagingConfig {
    pub project: String,
    pub version: String,
    pub destdir: PathBuf,
    pub builddir: PathBuf,
    /// Project root; commands run here.
    pub root: PathBuf,
    pub tool: Tool,
}

impl PackagingConfig {
    pub fn new(root: impl Into<PathBuf>, tool: Tool) -> Self {
        let root = root.into();
        Self {
            project: DEFAULT_PROJECT.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            destdir: PathBuf::from(DEFAULT_DESTDIR),
            builddir: root.join("debian").join(DEFAULT_PROJECT),
            root,
            tool,
        }
    }

    /// Sets the project name and re-derives the packaging directory.
    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = project.into();
        self.builddir = self.root.join("debian").join(&self.project);
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_destdir(mut self, destdir: impl Into<PathBuf>) -> Self {
        self.destdir = destdir.into();
        self
    }

    pub fn with_builddir(mut self, builddir: impl Into<PathBuf>) -> Self {
        self.builddir = builddir.into();
        self
    }

    fn parent_dir(&self) -> PathBuf {
        self.root.join("..")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Run(CommandSpec),
    /// Renames `<project>-<version>.tar.gz` (or `.crate`) found in `from`
    /// to `<project>_<version>.orig.tar.gz` in `to`, replacing any existing
    /// file.
    RenameArchives {
        from: PathBuf,
        to: PathBuf,
        project: String,
    },
    /// Removes files or directory trees; missing paths are ignored.
    RemovePaths(Vec<PathBuf>),
    /// Deletes every file below `root` with the given extension.
    DeleteByExtension { root: PathBuf, extension: String },
    Print(String),
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Run(command) => match &command.cwd {
                Some(cwd) => write!(f, "(cd {}) {}", cwd.display(), command),
                None => write!(f, "{}", command),
            },
            Self::RenameArchives { from, to, project } => write!(
                f,
                "rename {}/{}-*.tar.gz -> {}/{}_*.orig.tar.gz",
                from.display(),
                project,
                to.display(),
                project
            ),
            Self::RemovePaths(paths) => {
                write!(f, "rm -rf")?;
                for path in paths {
                    write!(f, " {}", path.display())?;
                }
                Ok(())
            }
            Self::DeleteByExtension { root, extension } => {
                write!(f, "delete {}/**/*.{}", root.display(), extension)
            }
            Self::Print(text) => write!(f, "echo {:?}", text),
        }
    }
}

pub fn usage() -> String {
    [
        "source  - Create source package",
        "install - Install on local system",
        "deb     - Generate a deb package",
        "clean   - Get rid of scratch and byte files",
    ]
    .join("\n")
}

/// The steps that make up `target`.
pub fn plan(target: Target, config: &PackagingConfig) -> Vec<Step> {
    let in_root = |command: CommandSpec| Step::Run(command.in_dir(&config.root));
    let tool = &config.tool;

    match target {
        Target::All => vec![Step::Print(usage())],
        Target::Source => vec![in_root(match tool {
            Tool::Setuptools { .. } => tool.command(["sdist"]),
            Tool::Cargo { .. } => tool.command(["package", "--no-verify", "--allow-dirty"]),
        })],
        Target::Install => {
            let destdir = config.destdir.display().to_string();
            vec![in_root(match tool {
                Tool::Setuptools { .. } => tool.command(["install", "--root", destdir.as_str()]),
                Tool::Cargo { .. } => {
                    tool.command(["install", "--path", ".", "--root", destdir.as_str()])
                }
            })]
        }
        Target::Deb => {
            let parent = config.parent_dir();
            let (sdist, archive_dir) = match tool {
                Tool::Setuptools { .. } => (
                    tool.command(["sdist".to_string(), format!("--dist-dir={}", parent.display())]),
                    parent.clone(),
                ),
                Tool::Cargo { .. } => (
                    tool.command(["package", "--no-verify", "--allow-dirty"]),
                    config.root.join("target").join("package"),
                ),
            };
            vec![
                in_root(sdist),
                Step::RenameArchives {
                    from: archive_dir,
                    to: parent,
                    project: config.project.clone(),
                },
                in_root(CommandSpec::new(DEBIAN_BUILDER, ["--pbuilder", "cowbuilder"])),
            ]
        }
        Target::Clean => vec![
            in_root(tool.command(["clean"])),
            Step::RemovePaths(vec![
                config.root.join("build"),
                config.root.join("MANIFEST"),
                config.builddir.clone(),
            ]),
            Step::DeleteByExtension {
                root: config.root.clone(),
                extension: "pyc".to_string(),
            },
        ],
    }
}

/// Runs planned steps in order, stopping at the first failure.
pub async fn execute<R>(steps: &[Step], runner: &R, config: &PackagingConfig) -> Result<()>
where
    R: CommandRunner + ?Sized,
{
    for step in steps {
        tracing::debug!("Step: {}", step);
        match step {
            Step::Run(command) => runner.run(command).await?,
            Step::RenameArchives { from, to, project } => {
                for (version, renamed) in rename_archives(from, to, project)? {
                    if version != config.version {
                        tracing::warn!(
                            "Archive version {} differs from configured version {}",
                            version,
                            config.version
                        );
                    }
                    tracing::info!("Renamed source archive to {}", renamed.display());
                }
            }
            Step::RemovePaths(paths) => remove_paths(paths)?,
            Step::DeleteByExtension { root, extension } => {
                let removed = delete_by_extension(root, extension)?;
                tracing::info!("Deleted {} *.{} files", removed, extension);
            }
            Step::Print(text) => println!("{}", text),
        }
    }
    Ok(())
}

/// Returns `(version, new path)` for every renamed archive.
pub fn rename_archives(from: &Path, to: &Path, project: &str) -> Result<Vec<(String, PathBuf)>> {
    let pattern = format!(r"^{}-(.+)\.(?:tar\.gz|crate)$", regex::escape(project));
    let re = Regex::new(&pattern).map_err(|e| CassError::ConfigError {
        message: format!("invalid project name '{}': {}", project, e),
    })?;

    let mut renamed = Vec::new();
    for entry in std::fs::read_dir(from)? {
        let entry = entry?;
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            continue;
        };
        let Some(caps) = re.captures(name) else {
            continue;
        };
        let version = caps[1].to_string();
        let target = to.join(format!("{}_{}.orig.tar.gz", project, version));
        std::fs::rename(entry.path(), &target)?;
        renamed.push((version, target));
    }

    if renamed.is_empty() {
        tracing::warn!("No {}-*.tar.gz archive found in {}", project, from.display());
    }
    Ok(renamed)
}

fn remove_paths(paths: &[PathBuf]) -> Result<()> {
    for path in paths {
        let removed = if path.is_dir() {
            std::fs::remove_dir_all(path)
        } else {
            std::fs::remove_file(path)
        };
        match removed {
            Ok(()) => tracing::debug!("Removed {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

fn delete_by_extension(root: &Path, extension: &str) -> Result<usize> {
    let mut removed = 0;
    for entry in walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if entry.file_type().is_file()
            && entry.path().extension().is_some_and(|ext| ext == extension)
        {
            std::fs::remove_file(entry.path())?;
            removed += 1;
        }
    }
    Ok(removed)
}

/// A packaging configuration paired with the runner that executes it.
pub struct Packager<R: CommandRunner> {
    config: PackagingConfig,
    runner: R,
}

impl<R: CommandRunner> Packager<R> {
    pub fn new(config: PackagingConfig, runner: R) -> Self {
        Self { config, runner }
    }

    pub fn config(&self) -> &PackagingConfig {
        &self.config
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn plan(&self, target: Target) -> Vec<Step> {
        plan(target, &self.config)
    }

    pub async fn run(&self, target: Target) -> Result<()> {
        tracing::info!(
            "Running target {:?} for {} {}",
            target,
            self.config.project,
            self.config.version
        );
        let steps = self.plan(target);
        execute(&steps, &self.runner, &self.config).await
    }
}

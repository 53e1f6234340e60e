use crate::core::packaging::{detect_python, PackagingConfig, Target, Tool};
use crate::utils::error::Result;
use crate::utils::validation::{validate_non_empty_string, Validate};
use clap::{Args, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Args)]
pub struct SchemaArgs {
    /// Path to the TOML schema file
    #[arg(short, long, default_value = "models.toml")]
    pub config: PathBuf,

    /// Drop and recreate column families that already exist
    #[arg(long)]
    pub force: bool,

    /// Print the CQL statements instead of applying them
    #[arg(long)]
    pub cql: bool,

    /// Column families to treat as already present (with --cql)
    #[arg(long, value_delimiter = ',', requires = "cql")]
    pub existing: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ToolKind {
    /// Python setup.py
    #[default]
    Setuptools,
    /// Rust cargo
    Cargo,
}

#[derive(Debug, Clone, Args)]
pub struct PackageArgs {
    /// Target to run
    #[arg(value_enum, default_value_t = Target::All)]
    pub target: Target,

    #[arg(long, value_enum, default_value_t = ToolKind::Setuptools)]
    pub tool: ToolKind,

    /// Interpreter path; detected from PATH when unset
    #[arg(long, env = "PYTHON")]
    pub python: Option<PathBuf>,

    /// Install root
    #[arg(long, env = "DESTDIR", default_value = crate::core::packaging::DEFAULT_DESTDIR)]
    pub destdir: PathBuf,

    /// Package name
    #[arg(long, env = "PROJECT", default_value = crate::core::packaging::DEFAULT_PROJECT)]
    pub project: String,

    /// Packaging directory; <root>/debian/<project> when unset
    #[arg(long, env = "BUILDIR")]
    pub builddir: Option<PathBuf>,

    /// Version string
    #[arg(long = "pkg-version", env = "VERSION", default_value = env!("CARGO_PKG_VERSION"))]
    pub version: String,

    /// Project root
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// Print the steps without running them
    #[arg(long)]
    pub dry_run: bool,
}

impl PackageArgs {
    pub fn to_config(&self) -> Result<PackagingConfig> {
        self.validate()?;

        let tool = match self.tool {
            ToolKind::Setuptools => Tool::Setuptools {
                python: detect_python(self.python.clone())?,
            },
            ToolKind::Cargo => Tool::Cargo {
                cargo: "cargo".to_string(),
            },
        };

        let mut config = PackagingConfig::new(&self.root, tool)
            .with_project(&self.project)
            .with_version(&self.version)
            .with_destdir(&self.destdir);
        if let Some(builddir) = &self.builddir {
            config = config.with_builddir(builddir);
        }
        Ok(config)
    }
}

impl Validate for PackageArgs {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("PROJECT", &self.project)?;
        validate_non_empty_string("VERSION", &self.version)?;
        validate_non_empty_string("DESTDIR", &self.destdir.to_string_lossy())?;
        Ok(())
    }
}

use cassobjects::config::cli::{PackageArgs, SchemaArgs};
use cassobjects::config::Command;
use cassobjects::core::packaging::Packager;
use cassobjects::utils::{logger, validation::Validate};
use cassobjects::{
    Builder, CassError, CliConfig, CqlScript, MemoryCluster, PoolRegistry, ProcessRunner,
    SchemaConfig,
};
use clap::Parser;

#[tokio::main]
async fn main() {
    let config = CliConfig::parse();

    if config.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(config.verbose);
    }
    tracing::debug!("CLI config: {:?}", config);

    let result = match &config.command {
        Command::Schema(args) => run_schema(args).await,
        Command::Package(args) => run_package(args).await,
    };

    if let Err(e) = result {
        tracing::error!(
            "❌ {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());
        std::process::exit(e.exit_code());
    }
}

async fn run_schema(args: &SchemaArgs) -> Result<(), CassError> {
    tracing::info!("📁 Loading schema from: {}", args.config.display());
    let schema = SchemaConfig::from_file(&args.config)?;
    schema.validate()?;

    let registry = PoolRegistry::new();
    let declarations = schema.declarations(&registry)?;
    tracing::info!(
        "✅ {} models declared in keyspace {}",
        declarations.len(),
        schema.keyspace()
    );

    if args.cql {
        let existing: Vec<&str> = args.existing.iter().map(String::as_str).collect();
        let script = CqlScript::new().with_existing(schema.keyspace(), &existing);
        Builder::create(&script, &declarations, args.force).await?;
        print!("{}", script.render());
        return Ok(());
    }

    let cluster = MemoryCluster::new();
    cluster.create_keyspace(schema.keyspace()).await?;
    let report = Builder::create(&cluster, &declarations, args.force).await?;

    for cf in &report.created {
        let def = cluster.column_family_def(schema.keyspace(), cf).await?;
        println!("column family {} (comparator {})", cf, def.comparator_type);
        for (name, class) in &def.column_validation_classes {
            println!("  {}: {}", name, class);
        }
    }
    for index in &report.indexes {
        println!("index {}", index);
    }
    Ok(())
}

async fn run_package(args: &PackageArgs) -> Result<(), CassError> {
    let config = args.to_config()?;
    let packager = Packager::new(config, ProcessRunner::new());

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - no command will be executed");
        for step in packager.plan(args.target) {
            println!("{}", step);
        }
        return Ok(());
    }

    packager.run(args.target).await
}

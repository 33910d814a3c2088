use anyhow::Result;
use clap::Parser;
use paku::commands;
use paku::runtime::RealRuntime;
use std::path::PathBuf;

/// paku - a simple package manager
///
/// Packages are zip-compatible archives carrying a JSON metadata document.
/// Installed packages live under the store root (--root, PAKU_ROOT, or
/// ~/.paku); remote feeds and local archive directories are configured in
/// the store's sources.list.
///
/// Examples:
///   paku install NUnit            # Install from the configured sources
///   paku install ./Foo-1.0.paku   # Install a local archive
#[derive(Parser, Debug)]
#[command(author, version = env!("PAKU_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Store root directory (overrides defaults; also via PAKU_ROOT)
    #[arg(
        long = "root",
        short = 'r',
        env = "PAKU_ROOT",
        value_name = "PATH",
        global = true
    )]
    pub store_root: Option<PathBuf>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// List installed packages, or a source's catalog
    List(ListArgs),

    /// Search packages by id prefix
    Search(SearchArgs),

    /// Show the highest available version of every package
    Latest(ListArgs),

    /// Install a package from an archive file or the configured sources
    Install(InstallArgs),

    /// Uninstall a package
    Remove(PackageArgs),

    /// Copy a package's archive into a directory
    Fetch(FetchArgs),

    /// Pack a layout directory into an archive
    Pack(PackArgs),

    /// Unpack an archive into a directory
    Unpack(UnpackArgs),

    /// Show the configured sources
    Sources(SourcesArgs),
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Query this source (URL or directory) instead of the store
    #[arg(long, value_name = "TARGET")]
    pub source: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct SearchArgs {
    /// Package id prefix (case-sensitive)
    #[arg(value_name = "PREFIX")]
    pub prefix: String,

    /// Query this source (URL or directory) instead of the store
    #[arg(long, value_name = "TARGET")]
    pub source: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct InstallArgs {
    /// Archive file, package id, or dependency string like "NUnit >= 2.5"
    #[arg(value_name = "PACKAGE")]
    pub package: String,

    /// Resolve against this source only
    #[arg(long, value_name = "TARGET")]
    pub source: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct PackageArgs {
    /// Package id or dependency string
    #[arg(value_name = "PACKAGE")]
    pub package: String,
}

#[derive(clap::Args, Debug)]
pub struct FetchArgs {
    /// Package id or dependency string
    #[arg(value_name = "PACKAGE")]
    pub package: String,

    /// Directory to place the archive in
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub out: PathBuf,

    /// Resolve against this source only
    #[arg(long, value_name = "TARGET")]
    pub source: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct PackArgs {
    /// Layout directory to pack
    #[arg(value_name = "DIR", default_value = ".")]
    pub dir: PathBuf,

    /// Directory to place the archive in
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub out: PathBuf,
}

#[derive(clap::Args, Debug)]
pub struct UnpackArgs {
    /// Archive file to unpack
    #[arg(value_name = "ARCHIVE")]
    pub archive: PathBuf,

    /// Directory to unpack into
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub out: PathBuf,
}

#[derive(clap::Args, Debug)]
pub struct SourcesArgs {}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let runtime = RealRuntime;

    match cli.command {
        Commands::List(args) => commands::list(&runtime, cli.store_root, args.source).await?,
        Commands::Search(args) => {
            commands::search(&runtime, cli.store_root, &args.prefix, args.source).await?
        }
        Commands::Latest(args) => commands::latest(&runtime, cli.store_root, args.source).await?,
        Commands::Install(args) => {
            commands::install(&runtime, cli.store_root, &args.package, args.source).await?
        }
        Commands::Remove(args) => commands::remove(&runtime, cli.store_root, &args.package).await?,
        Commands::Fetch(args) => {
            commands::fetch(&runtime, cli.store_root, &args.package, &args.out, args.source).await?
        }
        Commands::Pack(args) => commands::pack(&runtime, &args.dir, &args.out)?,
        Commands::Unpack(args) => commands::unpack(&runtime, &args.archive, &args.out)?,
        Commands::Sources(_args) => commands::sources(&runtime, cli.store_root)?,
    }
    Ok(())
}

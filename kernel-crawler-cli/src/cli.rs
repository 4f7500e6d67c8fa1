// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {
    clap::{Parser, Subcommand, ValueEnum},
    kernel_crawler::{
        crawler::{canonical_name, crawl_kernels, requires_image},
        fetch::{FetchConfig, HttpFetcher},
        CrawlError, Result,
    },
};

#[derive(Parser)]
#[command(name = "kernel-crawler", version, about = "Crawl kernel headers across distribution mirrors")]
struct Cli {
    /// Enable debug logs.
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Discover kernels and emit build descriptors.
    Crawl(CrawlArgs),
}

#[derive(clap::Args)]
#[command(disable_version_flag = true)]
struct CrawlArgs {
    /// Distribution to crawl, or `*` for all of them.
    #[arg(long)]
    distro: String,

    /// Only emit kernels matching this version or release.
    #[arg(long, default_value = "")]
    version: String,

    /// Target architecture.
    #[arg(long, value_enum, default_value = "x86_64")]
    arch: Arch,

    /// Container image to probe (repeatable); required for
    /// container-probed distributions such as Redhat.
    #[arg(long)]
    image: Vec<String>,

    /// Output format.
    #[arg(long = "out-fmt", alias = "out_fmt", value_enum, default_value = "driverkit")]
    out_fmt: OutputFormat,
}

#[derive(Clone, Copy, ValueEnum)]
enum Arch {
    #[value(name = "x86_64")]
    X86_64,
    #[value(name = "aarch64")]
    Aarch64,
}

impl Arch {
    fn as_str(&self) -> &'static str {
        match self {
            Self::X86_64 => "x86_64",
            Self::Aarch64 => "aarch64",
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Plain,
    Json,
    Driverkit,
}

fn init_logging(debug: bool) {
    let mut builder = env_logger::Builder::from_default_env();

    builder.filter_level(if debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    });
    builder.format_timestamp_secs();
    builder.init();

    log::debug!("debug logging enabled");
}

async fn run_crawl(args: &CrawlArgs) -> Result<()> {
    // surface argument errors before any crawling starts
    match canonical_name(&args.distro) {
        Some(name) if requires_image(name) && args.image.is_empty() => {
            return Err(CrawlError::MissingImage(name));
        }
        None if args.distro != "*" => {
            return Err(CrawlError::UnknownDistro(args.distro.clone()));
        }
        _ => {}
    }

    let fetcher = HttpFetcher::new(FetchConfig::default())?;
    let kernels = crawl_kernels(
        &fetcher,
        &args.distro,
        &args.version,
        args.arch.as_str(),
        &args.image,
    )
    .await?;

    match args.out_fmt {
        OutputFormat::Plain => {
            for (distro, configs) in &kernels {
                println!("{}:", distro);
                for config in configs {
                    println!("  {} ({})", config.kernelrelease, config.target);
                    for url in config.headers.iter().flatten() {
                        println!("    {}", url);
                    }
                }
            }
        }
        OutputFormat::Json | OutputFormat::Driverkit => {
            println!("{}", serde_json::to_string_pretty(&kernels)?);
        }
    }

    Ok(())
}

pub async fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.debug);

    match &cli.command {
        Command::Crawl(args) => run_crawl(args).await,
    }
}

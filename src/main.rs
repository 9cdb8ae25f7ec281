use anyhow::{bail, Context};
use chrono::Local;
use clap::Parser;
use log::warn;
use socks_hunter::{
    save_available, AppConfig, CandidateSource, ConfigEmitter, FofaSource, InboundConfig, Session,
    StaticSource, V2rayProcess, ValidatedOrder, Validator,
};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

/// Find working public SOCKS5 proxies and route a local v2ray through them.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Number of candidates to check; prompts when omitted
    #[arg(short = 'n', long)]
    count: Option<usize>,

    /// Read candidates from a file instead of querying FOFA
    #[arg(long)]
    candidates: Option<PathBuf>,

    /// Order of validated proxies: completion, fastest or random
    #[arg(long)]
    order: Option<ValidatedOrder>,

    /// Leave v2ray running after quitting
    #[arg(long)]
    keep_running: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let mut config = if cli.config.exists() {
        AppConfig::load(&cli.config)
            .with_context(|| format!("loading {}", cli.config.display()))?
    } else {
        warn!("{} not found, using defaults", cli.config.display());
        let mut config = AppConfig::default();
        config.apply_env();
        config
    };
    if let Some(order) = cli.order {
        config.validator.order = order;
    }

    let source: Box<dyn CandidateSource> = match &cli.candidates {
        Some(path) => Box::new(
            StaticSource::from_file(path)
                .await
                .with_context(|| format!("reading {}", path.display()))?,
        ),
        None => Box::new(FofaSource::new(
            &config.fofa.base_url,
            config.api_key()?,
            &config.fofa.query,
        )?),
    };

    let total = source.total_count().await.context("getting total count")?;
    println!(
        "CurrentDate:{} AddressTotal: [{}]",
        Local::now().format("%Y-%m-%d %H:%M:%S"),
        total
    );
    if total == 0 {
        println!("No candidates found.");
        return Ok(());
    }

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut output = io::stdout();

    let count = match cli.count {
        Some(n) if (1..=total).contains(&n) => n,
        Some(n) => {
            warn!("--count {} is outside 1..={}", n, total);
            prompt_count(&mut input, &mut output, total)?
        }
        None => prompt_count(&mut input, &mut output, total)?,
    };

    let candidates = source.fetch(count).await.context("getting proxies")?;
    let validator = Validator::new(config.validator.to_validator_config());
    let validated = validator
        .validate_with(candidates, |proxy| println!("[+] Available: {}", proxy))
        .await;

    if validated.is_empty() {
        println!("No available proxies found.");
        return Ok(());
    }

    let saved = save_available(&config.output.available_dir, &validated)?;
    println!("Available list saved ==> {}", saved.display());
    println!("Socks port: [{}]\n", config.v2ray.port);

    let emitter = ConfigEmitter::new(
        &config.v2ray.config_path,
        InboundConfig { listen: config.v2ray.listen.clone(), port: config.v2ray.port },
    );
    let mut session = Session::new(emitter, V2rayProcess::from_config(&config.v2ray))
        .keep_running(cli.keep_running || config.v2ray.keep_running);
    session.run(&validated, &mut input, &mut output).await?;

    Ok(())
}

fn prompt_count<R: BufRead, W: Write>(input: &mut R, output: &mut W, total: usize) -> anyhow::Result<usize> {
    loop {
        write!(output, "How many proxies do you want to check? (Max: {}): ", total)?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            bail!("no count entered");
        }
        match line.trim().parse::<usize>() {
            Ok(n) if (1..=total).contains(&n) => return Ok(n),
            _ => writeln!(
                output,
                "Invalid input, please enter a number less than or equal to the total size."
            )?,
        }
    }
}

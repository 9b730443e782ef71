use {
    clap::Parser,
    lite9p::{
        DEFAULT_MSIZE, MAX_MSIZE, MIN_MSIZE, config::Config, io_err, provider::DirProvider, res,
        srv::srv_async,
    },
    log::info,
    std::{path::PathBuf, sync::Arc},
    tokio::fs,
};

#[derive(Debug, clap::Parser)]
struct Cli {
    /// proto!address!port
    /// where: proto = tcp | unix
    #[arg(default_value = "tcp!0.0.0.0!1942")]
    address: String,

    /// Directory whose entries are served as resources
    #[arg(default_value = ".")]
    exportdir: PathBuf,

    /// Largest frame size a client may negotiate
    #[arg(long, default_value_t = MAX_MSIZE)]
    max_msize: u32,

    /// Frame size limit before version negotiation
    #[arg(long, default_value_t = DEFAULT_MSIZE)]
    initial_msize: u32,
}

impl Cli {
    fn config(&self) -> Config {
        let max_msize = self.max_msize.clamp(MIN_MSIZE, MAX_MSIZE);
        Config {
            max_msize,
            initial_msize: self.initial_msize.min(max_msize),
        }
    }
}

async fn lite9pd_main(cli: Cli) -> lite9p::Result<i32> {
    let config = cli.config();
    let Cli {
        address, exportdir, ..
    } = cli;

    if !fs::try_exists(&exportdir).await? {
        fs::create_dir_all(&exportdir).await?;
    }
    if !fs::metadata(&exportdir).await?.is_dir() {
        return res!(io_err!(Other, "export must be a directory"));
    }

    info!("Frame size limits: initial {}, max {}", config.initial_msize, config.max_msize);
    let provider = Arc::new(DirProvider::new(exportdir));
    println!("[*] Exporting: {}", provider.root().display());
    println!("[*] Ready to accept clients: {}", address);
    srv_async(provider, config, &address)
        .await
        .and(Ok(0))
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let exit_code = lite9pd_main(Cli::parse()).await.unwrap_or_else(|e| {
        eprintln!("Error: {:?}", e);
        -1
    });

    std::process::exit(exit_code);
}

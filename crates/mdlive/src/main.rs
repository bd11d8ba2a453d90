use clap::Parser;
use cli::{Args, RunCmd};

#[derive(Parser, Debug)]
pub enum Cmd {
    /// Display the current version.
    #[clap(name = "version")]
    Version,

    /// Run mdlive.
    #[clap(flatten)]
    Run(Box<RunCmd>),
}

#[derive(Parser, Debug)]
#[clap(name = "mdlive", disable_version_flag = true)]
pub struct Mdlive {
    #[clap(flatten)]
    pub args: Args,

    #[clap(subcommand)]
    pub cmd: Cmd,
}

#[tokio::main]
async fn main() {
    let mdlive = Mdlive::parse();

    match mdlive.cmd {
        Cmd::Version => {
            println!(
                "mdlive {}, built for {} {}.",
                env!("CARGO_PKG_VERSION"),
                std::env::consts::OS,
                std::env::consts::ARCH,
            );
        }
        Cmd::Run(run_cmd) => {
            if let Err(e) = run_cmd.run(mdlive.args).await {
                eprintln!("error: {e:?}");
                std::process::exit(1);
            }
        }
    }
}

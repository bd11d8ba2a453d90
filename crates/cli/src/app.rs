use crate::command;
use crate::logging;
use anyhow::Result;
use clap::Parser;

#[derive(Parser, Debug)]
pub enum RunCmd {
    /// Start the live preview in the browser.
    #[clap(name = "serve")]
    Serve(command::serve::Serve),
    /// Render a markdown file to a standalone HTML page.
    #[clap(name = "render")]
    Render(command::render::Render),
}

/// Global CLI arguments.
#[derive(Parser, Debug, Default)]
pub struct Args {
    /// Enable the logging system.
    #[clap(long)]
    pub log: Option<std::path::PathBuf>,

    /// Specify the path of the config file.
    #[clap(long)]
    pub config_file: Option<std::path::PathBuf>,
}

impl RunCmd {
    pub async fn run(self, args: Args) -> Result<()> {
        let preview_config::LoadedConfig {
            config,
            file_path,
            maybe_error,
        } = preview_config::load_config(args.config_file);

        let _guard = logging::init(args.log, &config.log)?;

        if let Some(err) = maybe_error {
            let path = file_path.as_deref().unwrap_or(std::path::Path::new("config.toml"));
            eprintln!("warning: ignoring {}: {err}", path.display());
            tracing::warn!(?path, %err, "Invalid config file, using the default config");
        }

        match self {
            Self::Serve(serve) => serve.run(&config).await,
            Self::Render(render) => render.run(&config).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[derive(Parser, Debug)]
    struct TestCli {
        #[clap(flatten)]
        args: Args,
        #[clap(subcommand)]
        cmd: RunCmd,
    }

    #[test]
    fn test_parse_serve() {
        let cli = TestCli::try_parse_from([
            "mdlive",
            "--config-file",
            "/tmp/mdlive.toml",
            "serve",
            "notes.md",
            "--port",
            "8080",
            "--no-browser",
        ])
        .unwrap();

        assert_eq!(cli.args.config_file, Some(PathBuf::from("/tmp/mdlive.toml")));
        let RunCmd::Serve(serve) = cli.cmd else {
            panic!("expected serve");
        };
        assert_eq!(serve.file, Some(PathBuf::from("notes.md")));
        assert_eq!(serve.port, Some(8080));
        assert!(serve.no_browser);
    }

    #[test]
    fn test_parse_render() {
        let cli =
            TestCli::try_parse_from(["mdlive", "--log", "/tmp/mdlive.log", "render", "a.md", "-o", "a.html"])
                .unwrap();

        assert_eq!(cli.args.log, Some(PathBuf::from("/tmp/mdlive.log")));
        let RunCmd::Render(render) = cli.cmd else {
            panic!("expected render");
        };
        assert_eq!(render.file, PathBuf::from("a.md"));
        assert_eq!(render.output, Some(PathBuf::from("a.html")));
    }

    #[test]
    fn test_render_requires_file() {
        assert!(TestCli::try_parse_from(["mdlive", "render"]).is_err());
    }
}

use anyhow::{Context, Result};
use clap::Parser;
use markdown_preview_core::assets::Assets;
use markdown_preview_core::highlight::theme_css;
use preview_config::Config;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Renders a markdown file to a standalone, print-ready HTML page.
#[derive(Parser, Debug, Clone)]
pub struct Render {
    /// Markdown file to render.
    pub file: PathBuf,

    /// Write the page here instead of stdout.
    #[clap(short, long)]
    pub output: Option<PathBuf>,
}

fn page_title(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "preview".to_string())
}

impl Render {
    pub async fn run(self, config: &Config) -> Result<()> {
        let markdown = tokio::fs::read_to_string(&self.file)
            .await
            .with_context(|| format!("failed to read {}", self.file.display()))?;

        let pipeline = super::build_pipeline(config).await;
        let preview = pipeline.render(&markdown).await;

        let page = Assets::build_export_html(
            &page_title(&self.file),
            &preview.html,
            &theme_css(&config.highlight.theme),
        );

        match &self.output {
            Some(output) => {
                tokio::fs::write(output, page)
                    .await
                    .with_context(|| format!("failed to write {}", output.display()))?;
                tracing::info!(output = %output.display(), "Rendered preview");
            }
            None => {
                let mut stdout = std::io::stdout().lock();
                stdout.write_all(page.as_bytes())?;
                stdout.flush()?;
            }
        }

        Ok(())
    }
}

pub mod render;
pub mod serve;

use markdown_preview_core::highlight::DirectoryGrammars;
use markdown_preview_core::{LanguageLoading, PreviewPipeline};
use preview_config::{Config, LanguageLoadingMode};
use std::sync::Arc;

fn language_loading(config: &Config) -> LanguageLoading {
    match config.highlight.loading {
        LanguageLoadingMode::Eager => LanguageLoading::Eager,
        LanguageLoadingMode::Lazy => match &config.highlight.bootstrap_languages {
            Some(bootstrap) => LanguageLoading::Lazy {
                bootstrap: bootstrap.clone(),
            },
            None => LanguageLoading::default(),
        },
    }
}

/// Build the render pipeline described by `config`.
pub async fn build_pipeline(config: &Config) -> PreviewPipeline {
    let mut builder = PreviewPipeline::builder().loading(language_loading(config));

    if !config.math.enabled {
        builder = builder.typesetter(None);
    }

    if let Some(syntaxes_dir) = &config.highlight.syntaxes_dir {
        builder = builder.grammar_source(Arc::new(DirectoryGrammars::new(syntaxes_dir)));
    }

    builder.build().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_loading_from_config() {
        let mut config = Config::default();
        assert_eq!(language_loading(&config), LanguageLoading::default());

        config.highlight.bootstrap_languages = Some(vec!["rust".to_string()]);
        assert_eq!(
            language_loading(&config),
            LanguageLoading::Lazy {
                bootstrap: vec!["rust".to_string()]
            }
        );

        config.highlight.loading = LanguageLoadingMode::Eager;
        assert_eq!(language_loading(&config), LanguageLoading::Eager);
    }

    #[tokio::test]
    async fn test_math_can_be_disabled() {
        let mut config = Config::default();
        config.math.enabled = false;

        let pipeline = build_pipeline(&config).await;
        let preview = pipeline.render(r"\(x\)").await;

        assert_eq!(preview.html, "<p>$x$</p>\n");
    }
}

//! Render orchestration.
//!
//! One render cycle: normalize math delimiters, render markdown, replace the
//! preview, typeset math, run the highlight sweep, commit. Cycles are
//! numbered; a cycle finishing after a newer one has committed is dropped.

use crate::highlight::languages::{canonical_name, DEFAULT_BOOTSTRAP_LANGUAGES};
use crate::highlight::{
    BundledGrammars, Candidates, GrammarSource, HighlightSweep, LanguageLoader, LoadedLanguageSet,
    SyntaxHighlighter, SyntectHighlighter,
};
use crate::html::escape_html;
use crate::math::{normalize_math_delimiters, MathTypesetter, MathmlTypesetter};
use crate::render::{MarkdownRenderer, PulldownRenderer, RenderedPreview};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// How grammars are made available to the highlighter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LanguageLoading {
    /// Register every supported grammar up front; detection considers all
    /// of them.
    Eager,
    /// Register the bootstrap languages up front and the rest when a code
    /// block asks for them; detection only considers the bootstrap set.
    Lazy { bootstrap: Vec<String> },
}

impl Default for LanguageLoading {
    fn default() -> Self {
        Self::Lazy {
            bootstrap: DEFAULT_BOOTSTRAP_LANGUAGES
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

/// The preview region: the latest committed render, observable by clients.
#[derive(Debug)]
pub struct PreviewPane {
    next_generation: AtomicU64,
    preview_tx: watch::Sender<RenderedPreview>,
}

impl Default for PreviewPane {
    fn default() -> Self {
        Self::new()
    }
}

impl PreviewPane {
    pub fn new() -> Self {
        let (preview_tx, _) = watch::channel(RenderedPreview::default());
        Self {
            next_generation: AtomicU64::new(1),
            preview_tx,
        }
    }

    /// Allocate the generation number of a new render cycle.
    pub fn begin(&self) -> u64 {
        self.next_generation.fetch_add(1, Ordering::SeqCst)
    }

    /// Replace the preview with `html` unless a newer generation has already
    /// been committed. Returns whether the preview was replaced.
    pub fn commit(&self, generation: u64, html: String) -> bool {
        self.preview_tx.send_if_modified(|current| {
            if generation < current.generation {
                return false;
            }
            *current = RenderedPreview::new(generation, html);
            true
        })
    }

    pub fn current(&self) -> RenderedPreview {
        self.preview_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<RenderedPreview> {
        self.preview_tx.subscribe()
    }
}

/// Renders markdown into the [`PreviewPane`].
pub struct PreviewPipeline {
    renderer: Arc<dyn MarkdownRenderer>,
    highlighter: Arc<dyn SyntaxHighlighter>,
    typesetter: Option<Arc<dyn MathTypesetter>>,
    loader: Arc<LanguageLoader>,
    sweep: HighlightSweep,
    pane: PreviewPane,
}

impl std::fmt::Debug for PreviewPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreviewPipeline")
            .field("typesetter", &self.typesetter.is_some())
            .field("loader", &self.loader)
            .field("pane", &self.pane)
            .finish()
    }
}

impl PreviewPipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub fn pane(&self) -> &PreviewPane {
        &self.pane
    }

    pub fn loaded_languages(&self) -> &LoadedLanguageSet {
        self.loader.loaded()
    }

    /// Run one render cycle for `text` and return what it produced.
    ///
    /// The returned preview is committed to the pane only if no newer cycle
    /// committed first.
    pub async fn render(&self, text: &str) -> RenderedPreview {
        let generation = self.pane.begin();

        let html = self.render_markdown(text, generation);
        self.pane.commit(generation, html.clone());

        let html = match &self.typesetter {
            Some(typesetter) => match typesetter.typeset(&html).await {
                Ok(typeset) => typeset,
                Err(err) => {
                    tracing::warn!(generation, %err, "Math typesetting failed");
                    html
                }
            },
            None => html,
        };

        let html = self.sweep.run(&html).await;

        if !self.pane.commit(generation, html.clone()) {
            tracing::debug!(generation, "Discarded stale render");
        }

        RenderedPreview::new(generation, html)
    }

    fn render_markdown(&self, text: &str, generation: u64) -> String {
        let normalized = normalize_math_delimiters(text);
        let highlighter = &self.highlighter;
        let highlight = |code: &str, language: Option<&str>| {
            language.and_then(|language| highlighter.highlight_explicit(code, language).ok())
        };

        match self.renderer.parse(&normalized, &highlight) {
            Ok(html) => html,
            Err(err) => {
                tracing::warn!(generation, %err, "Markdown rendering failed");
                format!("<pre class=\"render-error\">{}</pre>\n", escape_html(text))
            }
        }
    }
}

/// Assembles a [`PreviewPipeline`]; every collaborator has a default.
pub struct PipelineBuilder {
    renderer: Option<Arc<dyn MarkdownRenderer>>,
    highlighter: Option<Arc<dyn SyntaxHighlighter>>,
    typesetter: Option<Arc<dyn MathTypesetter>>,
    grammar_sources: Vec<Arc<dyn GrammarSource>>,
    loading: LanguageLoading,
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self {
            renderer: None,
            highlighter: None,
            typesetter: Some(Arc::new(MathmlTypesetter::new())),
            grammar_sources: Vec::new(),
            loading: LanguageLoading::default(),
        }
    }
}

impl PipelineBuilder {
    pub fn renderer(mut self, renderer: Arc<dyn MarkdownRenderer>) -> Self {
        self.renderer.replace(renderer);
        self
    }

    pub fn highlighter(mut self, highlighter: Arc<dyn SyntaxHighlighter>) -> Self {
        self.highlighter.replace(highlighter);
        self
    }

    /// `None` disables typesetting; the sweep then runs right after render.
    pub fn typesetter(mut self, typesetter: Option<Arc<dyn MathTypesetter>>) -> Self {
        self.typesetter = typesetter;
        self
    }

    /// Extra grammar source, consulted after the bundled grammars.
    pub fn grammar_source(mut self, source: Arc<dyn GrammarSource>) -> Self {
        self.grammar_sources.push(source);
        self
    }

    pub fn loading(mut self, loading: LanguageLoading) -> Self {
        self.loading = loading;
        self
    }

    /// Build the pipeline, loading the initial grammars first so the
    /// earliest previews are highlighted.
    pub async fn build(self) -> PreviewPipeline {
        let highlighter = self
            .highlighter
            .unwrap_or_else(|| Arc::new(SyntectHighlighter::new()));

        let mut sources: Vec<Arc<dyn GrammarSource>> = vec![BundledGrammars::shared()];
        sources.extend(self.grammar_sources);

        let loader = Arc::new(LanguageLoader::new(
            highlighter.clone(),
            LoadedLanguageSet::new(),
            sources,
        ));

        let candidates = match self.loading {
            LanguageLoading::Eager => {
                if let Err(err) = loader.load_all().await {
                    tracing::warn!(%err, "Failed to load grammars eagerly");
                }
                Candidates::Registered
            }
            LanguageLoading::Lazy { bootstrap } => {
                loader.bootstrap(&bootstrap).await;
                Candidates::Only(bootstrap.iter().map(|name| canonical_name(name)).collect())
            }
        };

        tracing::debug!(
            languages = ?loader.loaded().names(),
            "Preview pipeline ready"
        );

        PreviewPipeline {
            renderer: self
                .renderer
                .unwrap_or_else(|| Arc::new(PulldownRenderer::default())),
            sweep: HighlightSweep::new(highlighter.clone(), loader.clone(), candidates),
            highlighter,
            typesetter: self.typesetter,
            loader,
            pane: PreviewPane::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::TypesetError;
    use crate::render::{HighlightCallback, RenderError};
    use parking_lot::Mutex;

    #[test]
    fn test_stale_commit_is_discarded() {
        let pane = PreviewPane::new();
        let older = pane.begin();
        let newer = pane.begin();
        assert!(pane.commit(newer, "new".to_string()));
        assert!(!pane.commit(older, "old".to_string()));
        assert_eq!(pane.current(), RenderedPreview::new(newer, "new".to_string()));
    }

    #[test]
    fn test_same_generation_can_commit_twice() {
        let pane = PreviewPane::new();
        let generation = pane.begin();
        assert!(pane.commit(generation, "raw".to_string()));
        assert!(pane.commit(generation, "swept".to_string()));
        assert_eq!(pane.current().html, "swept");
    }

    #[tokio::test]
    async fn test_subscribers_see_commits() {
        let pane = PreviewPane::new();
        let mut rx = pane.subscribe();
        let generation = pane.begin();
        pane.commit(generation, "<p>x</p>".to_string());
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().html, "<p>x</p>");
    }

    /// Records what it is asked to typeset, optionally failing.
    #[derive(Default)]
    struct RecordingTypesetter {
        seen: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl MathTypesetter for RecordingTypesetter {
        async fn typeset(&self, html: &str) -> Result<String, TypesetError> {
            self.seen.lock().push(html.to_string());
            if self.fail {
                Err(TypesetError::Other("boom".to_string()))
            } else {
                Ok(html.replace("$x$", "<math>x</math>"))
            }
        }
    }

    async fn pipeline_with(typesetter: Option<Arc<dyn MathTypesetter>>) -> PreviewPipeline {
        PreviewPipeline::builder()
            .typesetter(typesetter)
            .loading(LanguageLoading::Lazy {
                bootstrap: vec!["python".to_string()],
            })
            .build()
            .await
    }

    #[tokio::test]
    async fn test_empty_input_renders_empty_preview() {
        let pipeline = pipeline_with(None).await;
        let preview = pipeline.render("").await;
        assert!(preview.is_empty());
        assert_eq!(pipeline.pane().current(), preview);
    }

    #[tokio::test]
    async fn test_typesetter_sees_normalized_math() {
        let typesetter = Arc::new(RecordingTypesetter::default());
        let pipeline = pipeline_with(Some(typesetter.clone())).await;
        let preview = pipeline.render(r"inline \(x\) here").await;
        assert_eq!(
            typesetter.seen.lock().as_slice(),
            ["<p>inline $x$ here</p>\n".to_string()]
        );
        assert_eq!(preview.html, "<p>inline <math>x</math> here</p>\n");
    }

    #[tokio::test]
    async fn test_typesetting_failure_still_highlights() {
        let typesetter = Arc::new(RecordingTypesetter {
            fail: true,
            ..Default::default()
        });
        let pipeline = pipeline_with(Some(typesetter)).await;
        let preview = pipeline.render("$x$\n\n```python\nx = 1\n```").await;
        assert!(preview.html.contains("<p>$x$</p>"));
        assert!(preview.html.contains(r#"<span class="language-label">PYTHON</span>"#));
    }

    struct FailingRenderer;

    impl MarkdownRenderer for FailingRenderer {
        fn parse(&self, _: &str, _: HighlightCallback) -> Result<String, RenderError> {
            Err(RenderError::Other("broken".to_string()))
        }
    }

    #[tokio::test]
    async fn test_render_failure_shows_plain_text() {
        let pipeline = PreviewPipeline::builder()
            .renderer(Arc::new(FailingRenderer))
            .typesetter(None)
            .build()
            .await;
        let preview = pipeline.render("a < b").await;
        assert_eq!(preview.html, "<pre class=\"render-error\">a &lt; b</pre>\n");
    }

    #[tokio::test]
    async fn test_generations_increase() {
        let pipeline = pipeline_with(None).await;
        let first = pipeline.render("one").await;
        let second = pipeline.render("two").await;
        assert!(second.generation > first.generation);
        assert_eq!(pipeline.pane().current().html, "<p>two</p>\n");
    }
}

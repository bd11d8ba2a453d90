use crate::debounce::Debouncer;
use crate::pipeline::PreviewPipeline;
use crate::render::RenderedPreview;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Quiet interval after the last keystroke before the preview re-renders.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Change to the document that did not originate from the input control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentEvent {
    /// The document was replaced, e.g. reloaded from disk.
    Replaced(String),
    /// The document was cleared.
    Cleared,
}

/// One live preview: the document text, its debounced re-render and the
/// preview it produces.
#[derive(Debug)]
pub struct PreviewSession {
    pipeline: Arc<PreviewPipeline>,
    document: RwLock<String>,
    debouncer: Debouncer<String>,
    document_events: watch::Sender<Option<DocumentEvent>>,
}

impl PreviewSession {
    /// Must be called within a tokio runtime.
    pub fn new(pipeline: Arc<PreviewPipeline>, debounce: Duration) -> Self {
        let debouncer = Debouncer::spawn(debounce, {
            let pipeline = pipeline.clone();
            move |text: String| {
                let pipeline = pipeline.clone();
                async move {
                    let preview = pipeline.render(&text).await;
                    tracing::debug!(generation = preview.generation, "Debounced render finished");
                }
            }
        });
        let (document_events, _) = watch::channel(None);

        Self {
            pipeline,
            document: RwLock::new(String::new()),
            debouncer,
            document_events,
        }
    }

    pub fn pipeline(&self) -> &Arc<PreviewPipeline> {
        &self.pipeline
    }

    pub fn document(&self) -> String {
        self.document.read().clone()
    }

    /// Text typed into the input control; re-rendered once typing pauses.
    pub fn input(&self, text: String) {
        *self.document.write() = text.clone();
        self.debouncer.call(text);
    }

    /// Replace the document from outside the input control. Clients are told
    /// to update their input and the preview follows the usual debounce.
    pub fn load(&self, text: String) {
        self.input(text.clone());
        self.document_events
            .send_replace(Some(DocumentEvent::Replaced(text)));
    }

    /// Empty the document and render the empty preview right away,
    /// dropping any pending debounced render.
    pub async fn clear(&self) -> RenderedPreview {
        self.document.write().clear();
        self.debouncer.cancel();
        self.document_events.send_replace(Some(DocumentEvent::Cleared));
        self.pipeline.render("").await
    }

    /// Render the current document without waiting for the debounce.
    pub async fn render_now(&self) -> RenderedPreview {
        self.debouncer.cancel();
        let text = self.document();
        self.pipeline.render(&text).await
    }

    pub fn current_preview(&self) -> RenderedPreview {
        self.pipeline.pane().current()
    }

    pub fn subscribe(&self) -> watch::Receiver<RenderedPreview> {
        self.pipeline.pane().subscribe()
    }

    pub fn subscribe_document_events(&self) -> watch::Receiver<Option<DocumentEvent>> {
        self.document_events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::LanguageLoading;

    async fn new_session() -> PreviewSession {
        let pipeline = PreviewPipeline::builder()
            .typesetter(None)
            .loading(LanguageLoading::Lazy {
                bootstrap: Vec::new(),
            })
            .build()
            .await;
        PreviewSession::new(Arc::new(pipeline), DEFAULT_DEBOUNCE)
    }

    #[tokio::test(start_paused = true)]
    async fn test_typing_burst_renders_last_text() {
        let session = new_session().await;
        let mut previews = session.subscribe();

        for text in ["#", "# T", "# Title"] {
            session.input(text.to_string());
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert!(session.current_preview().is_empty());

        previews.changed().await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(session.current_preview().html, "<h1>Title</h1>\n");
        assert_eq!(session.document(), "# Title");
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_cancels_pending_render() {
        let session = new_session().await;
        let mut events = session.subscribe_document_events();

        session.input("some text".to_string());
        let preview = session.clear().await;
        assert!(preview.is_empty());
        assert_eq!(session.document(), "");

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(session.current_preview().is_empty());

        events.changed().await.unwrap();
        assert_eq!(*events.borrow(), Some(DocumentEvent::Cleared));
    }

    #[tokio::test]
    async fn test_load_notifies_clients() {
        let session = new_session().await;
        let mut events = session.subscribe_document_events();

        session.load("*hi*".to_string());
        events.changed().await.unwrap();
        assert_eq!(
            *events.borrow(),
            Some(DocumentEvent::Replaced("*hi*".to_string()))
        );

        let preview = session.render_now().await;
        assert_eq!(preview.html, "<p><em>hi</em></p>\n");
    }
}

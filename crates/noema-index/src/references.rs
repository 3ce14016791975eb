//! Reference resolver — turns a note's references into text fragments.

use std::sync::Arc;

use tracing::{debug, warn};

use noema_core::{NoteReference, VisionBackend};

/// Kind of fragment a reference resolved to, used by the compound text
/// builder to pick the wrapping label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentKind {
    Image,
    Url,
}

/// One resolved reference, in original reference order.
#[derive(Debug, Clone)]
pub struct ReferenceFragment {
    pub kind: FragmentKind,
    pub text: String,
}

/// Resolves a note's raw reference list into descriptive text fragments.
///
/// Image references go through the vision capability with the note text as
/// a context hint; a failed description degrades to the raw URL rather than
/// aborting the note. URL references render from whichever unfurled fields
/// are present and never fail.
pub struct ReferenceResolver {
    vision: Arc<dyn VisionBackend>,
}

impl ReferenceResolver {
    pub fn new(vision: Arc<dyn VisionBackend>) -> Self {
        Self { vision }
    }

    /// Resolve every reference, one fragment per reference, preserving
    /// reference order.
    pub async fn resolve(
        &self,
        references: &[NoteReference],
        note_text: &str,
    ) -> Vec<ReferenceFragment> {
        let context = if note_text.trim().is_empty() {
            None
        } else {
            Some(note_text)
        };

        let mut fragments = Vec::with_capacity(references.len());
        for reference in references {
            let fragment = match reference {
                NoteReference::Image { url } => self.resolve_image(url, context).await,
                NoteReference::Url {
                    url,
                    host_name,
                    title,
                    description,
                    ..
                } => ReferenceFragment {
                    kind: FragmentKind::Url,
                    text: render_url_fields(
                        url,
                        host_name.as_deref(),
                        title.as_deref(),
                        description.as_deref(),
                    ),
                },
            };
            fragments.push(fragment);
        }

        debug!(result_count = fragments.len(), "Resolved note references");
        fragments
    }

    async fn resolve_image(&self, url: &str, context: Option<&str>) -> ReferenceFragment {
        match self.vision.describe_image(url, context).await {
            Ok(description) => ReferenceFragment {
                kind: FragmentKind::Image,
                text: description,
            },
            Err(e) => {
                warn!(
                    url,
                    error = %e,
                    model = self.vision.model_name(),
                    "Image description failed, falling back to raw URL"
                );
                ReferenceFragment {
                    kind: FragmentKind::Image,
                    text: url.to_string(),
                }
            }
        }
    }
}

/// Render whichever URL-reference fields are present as labeled fields.
fn render_url_fields(
    url: &str,
    host_name: Option<&str>,
    title: Option<&str>,
    description: Option<&str>,
) -> String {
    let mut fields = Vec::new();
    if let Some(host) = host_name.filter(|h| !h.is_empty()) {
        fields.push(format!("Site: {}", host));
    }
    if let Some(title) = title.filter(|t| !t.is_empty()) {
        fields.push(format!("Title: {}", title));
    }
    fields.push(format!("URL: {}", url));
    if let Some(description) = description.filter(|d| !d.is_empty()) {
        fields.push(format!("Description: {}", description));
    }
    fields.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use noema_core::{Error, Result};
    use std::sync::Mutex;

    /// Vision stub recording the context hints it was given.
    struct StubVision {
        description: Option<String>,
        contexts: Mutex<Vec<Option<String>>>,
    }

    impl StubVision {
        fn describing(description: &str) -> Self {
            Self {
                description: Some(description.to_string()),
                contexts: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                description: None,
                contexts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl VisionBackend for StubVision {
        async fn describe_image(&self, _url: &str, context: Option<&str>) -> Result<String> {
            self.contexts
                .lock()
                .unwrap()
                .push(context.map(String::from));
            self.description
                .clone()
                .ok_or_else(|| Error::Vision("unreachable".into()))
        }

        fn model_name(&self) -> &str {
            "stub"
        }
    }

    fn image(url: &str) -> NoteReference {
        NoteReference::Image {
            url: url.to_string(),
        }
    }

    #[tokio::test]
    async fn test_image_reference_uses_vision_description() {
        let resolver = ReferenceResolver::new(Arc::new(StubVision::describing("A red barn")));
        let fragments = resolver
            .resolve(&[image("https://cdn/barn.png")], "my barn")
            .await;

        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].kind, FragmentKind::Image);
        assert_eq!(fragments[0].text, "A red barn");
    }

    #[tokio::test]
    async fn test_image_failure_falls_back_to_raw_url() {
        let resolver = ReferenceResolver::new(Arc::new(StubVision::failing()));
        let fragments = resolver
            .resolve(&[image("https://cdn/broken.png")], "")
            .await;

        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].text, "https://cdn/broken.png");
    }

    #[tokio::test]
    async fn test_note_text_passed_as_context_hint() {
        let stub = Arc::new(StubVision::describing("ok"));
        let resolver = ReferenceResolver::new(stub.clone());

        resolver.resolve(&[image("https://cdn/a.png")], "workshop photo").await;
        resolver.resolve(&[image("https://cdn/a.png")], "   ").await;

        let contexts = stub.contexts.lock().unwrap();
        assert_eq!(contexts[0].as_deref(), Some("workshop photo"));
        assert_eq!(contexts[1], None, "blank note text sends no hint");
    }

    #[tokio::test]
    async fn test_url_reference_renders_present_fields() {
        let resolver = ReferenceResolver::new(Arc::new(StubVision::failing()));
        let reference = NoteReference::Url {
            url: "https://example.com/post".to_string(),
            host_name: Some("example.com".to_string()),
            title: Some("A Post".to_string()),
            description: Some("About things".to_string()),
            header_image: None,
        };

        let fragments = resolver.resolve(&[reference], "").await;
        assert_eq!(
            fragments[0].text,
            "Site: example.com, Title: A Post, URL: https://example.com/post, Description: About things"
        );
        assert_eq!(fragments[0].kind, FragmentKind::Url);
    }

    #[tokio::test]
    async fn test_url_reference_missing_fields_never_fails() {
        let resolver = ReferenceResolver::new(Arc::new(StubVision::failing()));
        let reference = NoteReference::Url {
            url: "https://example.com".to_string(),
            host_name: None,
            title: None,
            description: None,
            header_image: None,
        };

        let fragments = resolver.resolve(&[reference], "").await;
        assert_eq!(fragments[0].text, "URL: https://example.com");
    }

    #[tokio::test]
    async fn test_fragments_preserve_reference_order() {
        let resolver = ReferenceResolver::new(Arc::new(StubVision::describing("pic")));
        let references = vec![
            NoteReference::Url {
                url: "https://first.example".to_string(),
                host_name: None,
                title: None,
                description: None,
                header_image: None,
            },
            image("https://cdn/second.png"),
        ];

        let fragments = resolver.resolve(&references, "").await;
        assert_eq!(fragments[0].kind, FragmentKind::Url);
        assert_eq!(fragments[1].kind, FragmentKind::Image);
    }
}

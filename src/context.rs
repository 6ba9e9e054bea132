//! Resolution context
//!
//! The chain of services currently under construction is threaded explicitly
//! through every construction call as a stack of [`Frame`]s, innermost last.
//! Contextual bindings such as the logger name read this stack to find out
//! who is asking.

use crate::ServiceId;

/// Metadata key used for named resolution.
pub const NAME_TAG: &str = "name";

/// One in-progress request in the resolution chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    id: ServiceId,
    /// Explicit name annotation from the injection point that requested `id`
    named: Option<String>,
    /// Metadata attached to the request (tagged resolution or registration tags)
    tags: Vec<(String, String)>,
}

impl Frame {
    #[inline]
    pub fn new(id: ServiceId) -> Self {
        Self {
            id,
            named: None,
            tags: Vec::new(),
        }
    }

    /// Attach an explicit name annotation.
    #[inline]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.named = Some(name.into());
        self
    }

    /// Attach a metadata tag.
    #[inline]
    pub fn tagged(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.push((key.into(), value.into()));
        self
    }

    /// Merge tags, keeping tags already present on the frame.
    pub(crate) fn with_default_tags(mut self, tags: &[(String, String)]) -> Self {
        for (key, value) in tags {
            if self.tag(key).is_none() {
                self.tags.push((key.clone(), value.clone()));
            }
        }
        self
    }

    #[inline]
    pub fn id(&self) -> ServiceId {
        self.id
    }

    #[inline]
    pub fn name_annotation(&self) -> Option<&str> {
        self.named.as_deref()
    }

    /// Value of the first tag with `key`.
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// The chain of requests currently being resolved.
#[derive(Debug, Clone, Default)]
pub struct ResolutionContext {
    frames: Vec<Frame>,
}

impl ResolutionContext {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    #[inline]
    pub(crate) fn pop(&mut self) -> Option<Frame> {
        self.frames.pop()
    }

    /// All frames, outermost first.
    #[inline]
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// The request currently being resolved.
    #[inline]
    pub fn current(&self) -> Option<&Frame> {
        self.ancestor(0)
    }

    /// The request that asked for the current one.
    #[inline]
    pub fn parent(&self) -> Option<&Frame> {
        self.ancestor(1)
    }

    /// The outermost request of the chain.
    #[inline]
    pub fn root(&self) -> Option<&Frame> {
        self.frames.first()
    }

    /// Walk `levels` frames outward from the current one.
    #[inline]
    pub fn ancestor(&self, levels: usize) -> Option<&Frame> {
        self.frames
            .len()
            .checked_sub(levels + 1)
            .and_then(|i| self.frames.get(i))
    }

    /// Whether `id` is already under construction in this chain.
    #[inline]
    pub fn contains(&self, id: ServiceId) -> bool {
        self.frames.iter().any(|f| f.id == id)
    }

    /// Render the chain followed by `next`, e.g. `Symbol(A) -> Symbol(B) -> Symbol(A)`.
    pub fn path_to(&self, next: ServiceId) -> String {
        self.frames
            .iter()
            .map(|f| f.id.to_string())
            .chain(std::iter::once(next.to_string()))
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}

/// Compute the logger name for the current request.
///
/// Resolution order:
/// 1. explicit name annotation on the parent request
/// 2. `name` tag on the root request
/// 3. `name` tag on the requesting service (the grandparent frame)
/// 4. the grandparent's identifier, with `Symbol(...)` stripped
/// 5. the empty string
pub fn logger_name(ctx: &ResolutionContext) -> String {
    if let Some(name) = ctx.parent().and_then(Frame::name_annotation) {
        if !name.is_empty() {
            return name.to_owned();
        }
    }

    if let Some(name) = ctx.root().and_then(|root| root.tag(NAME_TAG)) {
        if !name.is_empty() {
            return name.to_owned();
        }
    }

    let Some(requester) = ctx.ancestor(2) else {
        return String::new();
    };
    match requester.tag(NAME_TAG) {
        Some(name) if !name.is_empty() => name.to_owned(),
        _ => strip_decoration(&requester.id().to_string()).to_owned(),
    }
}

/// Strip a `Symbol(...)` wrapper; any other text is returned unchanged.
pub fn strip_decoration(text: &str) -> &str {
    match text
        .strip_prefix("Symbol(")
        .and_then(|rest| rest.strip_suffix(')'))
    {
        Some(inner) if !inner.is_empty() => inner,
        _ => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALPHA: ServiceId = ServiceId::symbol("Alpha");
    const BETA: ServiceId = ServiceId::symbol("Beta");
    const LOGGER: ServiceId = ServiceId::symbol("Logger");
    const LOGGER_NAME: ServiceId = ServiceId::symbol("Logger_Name");

    fn chain(frames: Vec<Frame>) -> ResolutionContext {
        let mut ctx = ResolutionContext::new();
        for frame in frames {
            ctx.push(frame);
        }
        ctx
    }

    #[test]
    fn test_ancestors() {
        let ctx = chain(vec![Frame::new(BETA), Frame::new(LOGGER), Frame::new(LOGGER_NAME)]);
        assert_eq!(ctx.current().unwrap().id(), LOGGER_NAME);
        assert_eq!(ctx.parent().unwrap().id(), LOGGER);
        assert_eq!(ctx.ancestor(2).unwrap().id(), BETA);
        assert_eq!(ctx.root().unwrap().id(), BETA);
        assert!(ctx.ancestor(3).is_none());
    }

    #[test]
    fn test_path_to() {
        let ctx = chain(vec![Frame::new(ALPHA), Frame::new(BETA)]);
        assert_eq!(ctx.path_to(ALPHA), "Symbol(Alpha) -> Symbol(Beta) -> Symbol(Alpha)");
    }

    #[test]
    fn test_name_annotation_wins() {
        let ctx = chain(vec![
            Frame::new(ALPHA).tagged(NAME_TAG, "FromTag"),
            Frame::new(LOGGER).named("Explicit"),
            Frame::new(LOGGER_NAME),
        ]);
        assert_eq!(logger_name(&ctx), "Explicit");
    }

    #[test]
    fn test_root_tag() {
        let ctx = chain(vec![
            Frame::new(ALPHA).tagged(NAME_TAG, "Alpha"),
            Frame::new(LOGGER),
            Frame::new(LOGGER_NAME),
        ]);
        assert_eq!(logger_name(&ctx), "Alpha");
    }

    #[test]
    fn test_requester_tag_below_root() {
        let ctx = chain(vec![
            Frame::new(BETA),
            Frame::new(ALPHA).tagged(NAME_TAG, "Worker"),
            Frame::new(LOGGER),
            Frame::new(LOGGER_NAME),
        ]);
        assert_eq!(logger_name(&ctx), "Worker");
    }

    #[test]
    fn test_grandparent_identifier() {
        let ctx = chain(vec![Frame::new(BETA), Frame::new(LOGGER), Frame::new(LOGGER_NAME)]);
        assert_eq!(logger_name(&ctx), "Beta");
    }

    #[test]
    fn test_no_ancestry() {
        let ctx = chain(vec![Frame::new(LOGGER), Frame::new(LOGGER_NAME)]);
        assert_eq!(logger_name(&ctx), "");
        assert_eq!(logger_name(&ResolutionContext::new()), "");
    }

    #[test]
    fn test_strip_decoration() {
        assert_eq!(strip_decoration("Symbol(Beta)"), "Beta");
        assert_eq!(strip_decoration("nlu-server"), "nlu-server");
        assert_eq!(strip_decoration("Symbol()"), "Symbol()");
        assert_eq!(strip_decoration(""), "");
    }

    #[test]
    fn test_default_tags_do_not_override() {
        let frame = Frame::new(ALPHA)
            .tagged(NAME_TAG, "request")
            .with_default_tags(&[(NAME_TAG.to_owned(), "registration".to_owned())]);
        assert_eq!(frame.tag(NAME_TAG), Some("request"));
    }
}

//! Element tree access: parsed documents, node paths, selectors, and mutation records.
//!
//! The watcher never touches a live browser DOM. A host hands it markup, and
//! optionally the mutations it observed, and every lookup runs against the
//! parsed [`Document`]. Element handles are [`ElementRef`]s borrowed from the
//! document for the span of a single evaluation.

use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};

use crate::types::{WatchError, WatchResult};

/// A parsed snapshot of the host page.
pub struct Document {
    html: Html,
}

impl Document {
    /// Parse a full HTML document.
    pub fn parse(markup: &str) -> Self {
        Self {
            html: Html::parse_document(markup),
        }
    }

    /// An empty document (used before the host delivers its first snapshot).
    pub fn empty() -> Self {
        Self::parse("<html><head></head><body></body></html>")
    }

    /// The `<html>` element.
    pub fn root(&self) -> ElementRef<'_> {
        self.html.root_element()
    }

    /// First element in document order matching `selector`.
    pub fn query(&self, selector: &Selector) -> Option<ElementRef<'_>> {
        self.html.select(selector).next()
    }

    /// Resolve a path of element-child indices starting at the root element.
    pub fn resolve(&self, path: &NodePath) -> Option<ElementRef<'_>> {
        let mut current = self.root();
        for &index in &path.0 {
            current = element_children(current).nth(index)?;
        }
        Some(current)
    }

    /// Compute the path of `element` relative to the root element.
    pub fn path_of(element: ElementRef<'_>) -> NodePath {
        let mut indices = Vec::new();
        let mut current = element;
        while let Some(parent) = current.parent().and_then(ElementRef::wrap) {
            let index = current
                .prev_siblings()
                .filter(|n| n.value().is_element())
                .count();
            indices.push(index);
            current = parent;
        }
        indices.reverse();
        NodePath(indices)
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("root", &self.root().value().name())
            .finish()
    }
}

/// Location of an element as element-child indices from the root element.
///
/// `[]` is `<html>`, `[1]` is usually `<body>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodePath(pub Vec<usize>);

impl NodePath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn child(&self, index: usize) -> Self {
        let mut indices = self.0.clone();
        indices.push(index);
        Self(indices)
    }
}

impl From<Vec<usize>> for NodePath {
    fn from(indices: Vec<usize>) -> Self {
        Self(indices)
    }
}

/// One observed change to the element tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum MutationRecord {
    /// Children of `target` were added or removed.
    #[serde(rename_all = "camelCase")]
    ChildList {
        target: NodePath,
        #[serde(default)]
        added_nodes: Vec<NodePath>,
    },
    /// An attribute on `target` changed.
    #[serde(rename_all = "camelCase")]
    Attributes {
        target: NodePath,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attribute_name: Option<String>,
    },
}

/// A CSS selector kept together with its source and compile result.
///
/// Compilation failures are deferred: the selector reports the error each
/// time it is used, so one bad selector only disables the lookups that need it.
#[derive(Debug, Clone)]
pub struct CompiledSelector {
    source: String,
    compiled: Result<Selector, String>,
}

impl CompiledSelector {
    pub fn parse(source: &str) -> Self {
        let compiled = Selector::parse(source).map_err(|e| e.to_string());
        Self {
            source: source.to_string(),
            compiled,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_valid(&self) -> bool {
        self.compiled.is_ok()
    }

    /// The compiled selector, or the error that prevented compiling it.
    pub fn get(&self) -> WatchResult<&Selector> {
        self.compiled.as_ref().map_err(|reason| WatchError::Selector {
            selector: self.source.clone(),
            reason: reason.clone(),
        })
    }

    pub fn matches(&self, element: ElementRef<'_>) -> WatchResult<bool> {
        Ok(self.get()?.matches(&element))
    }

    /// First descendant of `scope` (excluding `scope` itself) that matches.
    pub fn query_within<'a>(&self, scope: ElementRef<'a>) -> WatchResult<Option<ElementRef<'a>>> {
        Ok(scope.select(self.get()?).next())
    }

    /// Self-or-ancestor match, like DOM `Element.closest`.
    pub fn closest<'a>(&self, element: ElementRef<'a>) -> WatchResult<Option<ElementRef<'a>>> {
        let selector = self.get()?;
        Ok(std::iter::once(element)
            .chain(element.ancestors().filter_map(ElementRef::wrap))
            .find(|candidate| selector.matches(candidate)))
    }
}

/// Element children of `element`, skipping text and comment nodes.
pub fn element_children<'a>(element: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    element.children().filter_map(ElementRef::wrap)
}

/// Concatenated descendant text, like DOM `textContent`.
pub fn text_content(element: ElementRef<'_>) -> String {
    element.text().collect()
}

/// Text of the element's own text-node children only.
pub fn own_text(element: ElementRef<'_>) -> String {
    element
        .children()
        .filter_map(|n| n.value().as_text().map(|t| &**t))
        .collect()
}

/// Attribute value, if present and non-blank.
pub fn non_blank_attr<'a>(element: ElementRef<'a>, name: &str) -> Option<&'a str> {
    element
        .value()
        .attr(name)
        .filter(|value| !value.trim().is_empty())
}

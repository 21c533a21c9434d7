//! In-memory page used to drive the extractor without an HTML parser.
//!
//! Nodes are appended in document order. Patterns support descendant
//! combinators over compounds made of a tag, `.class` and `[attr]` parts.
//! Rendered sizes are set directly, like a laid-out page would report them.

#![allow(dead_code)]

use newgoods_finder::traits::{PageAccessor, PageElement};
use url::Url;

struct StubNode {
    tag: String,
    attrs: Vec<(String, String)>,
    text: String,
    parent: Option<usize>,
    children: Vec<usize>,
    size: Option<(u32, u32)>,
}

pub struct StubPage {
    nodes: Vec<StubNode>,
    url: Option<Url>,
}

impl StubPage {
    pub const ROOT: usize = 0;

    pub fn new(url: Option<&str>) -> Self {
        Self {
            nodes: vec![StubNode {
                tag: "body".to_string(),
                attrs: Vec::new(),
                text: String::new(),
                parent: None,
                children: Vec::new(),
                size: None,
            }],
            url: url.map(|u| Url::parse(u).unwrap()),
        }
    }

    pub fn add(&mut self, parent: usize, tag: &str, attrs: &[(&str, &str)]) -> usize {
        let id = self.nodes.len();
        self.nodes.push(StubNode {
            tag: tag.to_string(),
            attrs: attrs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            text: String::new(),
            parent: Some(parent),
            children: Vec::new(),
            size: None,
        });
        self.nodes[parent].children.push(id);
        id
    }

    pub fn set_text(&mut self, id: usize, text: &str) {
        self.nodes[id].text = text.to_string();
    }

    pub fn set_size(&mut self, id: usize, width: u32, height: u32) {
        self.nodes[id].size = Some((width, height));
    }

    fn preorder(&self, from: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.nodes[id].children.iter().rev());
        }
        out
    }

    fn matches(&self, id: usize, pattern: &str) -> bool {
        let compounds: Vec<Compound> = pattern.split_whitespace().map(Compound::parse).collect();
        let Some((last, ancestors)) = compounds.split_last() else {
            return false;
        };
        if !last.matches(&self.nodes[id]) {
            return false;
        }

        let mut pending = ancestors.len();
        let mut current = self.nodes[id].parent;
        while pending > 0 {
            let Some(node) = current else {
                break;
            };
            if ancestors[pending - 1].matches(&self.nodes[node]) {
                pending -= 1;
            }
            current = self.nodes[node].parent;
        }
        pending == 0
    }
}

#[derive(Default)]
struct Compound {
    tag: Option<String>,
    classes: Vec<String>,
    attrs: Vec<String>,
}

impl Compound {
    fn parse(raw: &str) -> Self {
        let mut compound = Self::default();
        let mut rest = raw;
        while !rest.is_empty() {
            if let Some(after) = rest.strip_prefix('.') {
                let end = after.find(['.', '[']).unwrap_or(after.len());
                compound.classes.push(after[..end].to_string());
                rest = &after[end..];
            } else if let Some(after) = rest.strip_prefix('[') {
                let end = after.find(']').unwrap_or(after.len());
                compound.attrs.push(after[..end].to_string());
                rest = after.get(end + 1..).unwrap_or("");
            } else {
                let end = rest.find(['.', '[']).unwrap_or(rest.len());
                compound.tag = Some(rest[..end].to_ascii_lowercase());
                rest = &rest[end..];
            }
        }
        compound
    }

    fn matches(&self, node: &StubNode) -> bool {
        let attr = |name: &str| {
            node.attrs
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str())
        };
        self.tag.as_ref().is_none_or(|tag| *tag == node.tag)
            && self.classes.iter().all(|class| {
                attr("class").is_some_and(|list| list.split_whitespace().any(|c| c == class))
            })
            && self.attrs.iter().all(|name| attr(name).is_some())
    }
}

#[derive(Clone, Copy)]
pub struct StubElement<'a> {
    page: &'a StubPage,
    id: usize,
}

impl PageAccessor for StubPage {
    type Element<'a> = StubElement<'a>;

    fn query_all<'a>(&'a self, pattern: &str) -> Vec<StubElement<'a>> {
        self.preorder(Self::ROOT)
            .into_iter()
            .skip(1)
            .filter(|id| self.matches(*id, pattern))
            .map(|id| StubElement { page: self, id })
            .collect()
    }

    fn page_url(&self) -> Option<&Url> {
        self.url.as_ref()
    }
}

impl PageElement for StubElement<'_> {
    fn tag_name(&self) -> &str {
        &self.page.nodes[self.id].tag
    }

    fn attr(&self, name: &str) -> Option<&str> {
        self.page.nodes[self.id]
            .attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    fn parent(&self) -> Option<Self> {
        self.page.nodes[self.id].parent.map(|id| StubElement {
            page: self.page,
            id,
        })
    }

    fn query_first(&self, pattern: &str) -> Option<Self> {
        self.page
            .preorder(self.id)
            .into_iter()
            .skip(1)
            .find(|id| self.page.matches(*id, pattern))
            .map(|id| StubElement {
                page: self.page,
                id,
            })
    }

    fn text(&self) -> String {
        self.page
            .preorder(self.id)
            .into_iter()
            .map(|id| self.page.nodes[id].text.as_str())
            .collect()
    }

    fn rendered_size(&self) -> Option<(u32, u32)> {
        self.page.nodes[self.id].size.filter(|(w, h)| *w > 0 && *h > 0)
    }
}

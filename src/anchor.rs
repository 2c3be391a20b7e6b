//! Heading anchors: GitHub-style slugs, de-duplicated per document.

use std::collections::{HashMap, HashSet};

/// GitHub heading anchor slug generation.
///
/// - lowercase
/// - remove all chars that aren't alphanumeric, space, or hyphen
/// - replace spaces with hyphens
pub fn github_slug(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.to_lowercase().chars() {
        if c.is_alphanumeric() || c == ' ' || c == '-' {
            slug.push(c);
        }
        // All other chars (including ':', '.', '_', '`') are stripped
    }
    slug.replace(' ', "-")
}

/// Hands out unique anchors within one document.
///
/// The first heading with a given slug keeps it; later ones get `-1`, `-2`, ...
/// in the order they are registered, the way GitHub numbers repeated headings.
#[derive(Debug, Default)]
pub struct AnchorRegistry {
    prefix: String,
    used: HashSet<String>,
    next_suffix: HashMap<String, usize>,
}

impl AnchorRegistry {
    pub fn new(prefix: &str) -> Self {
        AnchorRegistry {
            prefix: prefix.to_string(),
            ..AnchorRegistry::default()
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Register a heading and return its unique slug (without prefix).
    pub fn register(&mut self, text: &str) -> String {
        let mut base = github_slug(text);
        if base.is_empty() {
            base = "section".to_string();
        }
        let mut n = self.next_suffix.get(&base).copied().unwrap_or(0);
        loop {
            let candidate = if n == 0 {
                base.clone()
            } else {
                format!("{}-{}", base, n)
            };
            n += 1;
            // A numbered slug can collide with a literal heading ("a-1").
            if self.used.insert(candidate.clone()) {
                self.next_suffix.insert(base, n);
                return candidate;
            }
        }
    }

    /// Render a markdown heading, with an explicit `{#id}` when a prefix is set.
    pub fn heading(&mut self, level: u8, text: &str) -> String {
        let slug = self.register(text);
        let hashes = "#".repeat(level as usize);
        if self.prefix.is_empty() {
            format!("{} {}", hashes, text)
        } else {
            format!("{} {} {{#{}{}}}", hashes, text, self.prefix, slug)
        }
    }
}

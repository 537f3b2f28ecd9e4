// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Hierarchical string properties.
//!
//! Dotted keys (`manager.modules.load_path`) address nodes of a tree. Every node
//! carries a value and a default value; reading a key falls back to the default
//! when no explicit value has been set. The same structure backs manager
//! configuration, component profiles, connector profile properties and
//! configuration sets.
//!
//! # Text format
//!
//! ```text
//! # comment
//! ! comment
//! manager.name: manager
//! logger.log_level = DEBUG
//! naming.formats: %h.host_cxt/%n.rtc, \
//!                 %n.rtc
//! ```
//!
//! Key and value are separated by the first unescaped `:` or `=` (or by
//! whitespace when neither is present). A trailing backslash continues the
//! logical line.

use std::fmt;

/// Hierarchical key/value tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    name: String,
    value: String,
    default_value: String,
    leaf: Vec<Properties>,
}

impl Properties {
    /// Create an empty, unnamed root.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty root with the given node name.
    pub fn with_name(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// Build a tree whose *default* values come from a flat `[key, value, ...]` list.
    pub fn from_defaults(pairs: &[&str]) -> Self {
        let mut prop = Self::new();
        prop.set_defaults(pairs);
        prop
    }

    /// Build a tree from `(key, value)` pairs.
    pub fn from_pairs<K: AsRef<str>, V: AsRef<str>>(pairs: &[(K, V)]) -> Self {
        let mut prop = Self::new();
        for (k, v) in pairs {
            prop.set_property(k.as_ref(), v.as_ref());
        }
        prop
    }

    /// Node name (last key component).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename this node.
    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    /// Own value of this node (falls back to the node default).
    pub fn value(&self) -> &str {
        if self.value.is_empty() {
            &self.default_value
        } else {
            &self.value
        }
    }

    /// Direct children.
    pub fn leaves(&self) -> &[Properties] {
        &self.leaf
    }

    /// True when the tree holds no children and no value.
    pub fn is_empty(&self) -> bool {
        self.leaf.is_empty() && self.value.is_empty() && self.default_value.is_empty()
    }

    /// Value at `key`, or the empty string when absent.
    pub fn get_property(&self, key: &str) -> &str {
        self.find_node(key).map_or("", Properties::value)
    }

    /// Value at `key`, or `default` when absent or empty.
    pub fn get_property_or(&self, key: &str, default: &str) -> String {
        let value = self.get_property(key);
        if value.is_empty() {
            default.to_string()
        } else {
            value.to_string()
        }
    }

    /// Default value recorded at `key`.
    pub fn get_default(&self, key: &str) -> &str {
        self.find_node(key).map_or("", |n| n.default_value.as_str())
    }

    /// Set the value at `key`, creating intermediate nodes. Returns the old value.
    pub fn set_property(&mut self, key: &str, value: &str) -> String {
        let node = self.get_node(key);
        std::mem::replace(&mut node.value, value.to_string())
    }

    /// Set the default value at `key`, creating intermediate nodes.
    pub fn set_default(&mut self, key: &str, value: &str) -> String {
        let node = self.get_node(key);
        std::mem::replace(&mut node.default_value, value.to_string())
    }

    /// Install defaults from a flat `[key, value, key, value, ...]` list.
    pub fn set_defaults(&mut self, pairs: &[&str]) {
        for pair in pairs.chunks_exact(2) {
            self.set_default(pair[0].trim(), pair[1].trim());
        }
    }

    /// Find the node at a dotted key.
    pub fn find_node(&self, key: &str) -> Option<&Properties> {
        if key.is_empty() {
            return None;
        }
        let mut node = self;
        for part in key.split('.') {
            node = node.leaf.iter().find(|c| c.name == part)?;
        }
        Some(node)
    }

    /// Find the node at a dotted key (mutable).
    pub fn find_node_mut(&mut self, key: &str) -> Option<&mut Properties> {
        if key.is_empty() {
            return None;
        }
        let mut node = self;
        for part in key.split('.') {
            node = node.leaf.iter_mut().find(|c| c.name == part)?;
        }
        Some(node)
    }

    /// Get the node at a dotted key, creating it (and its parents) if absent.
    pub fn get_node(&mut self, key: &str) -> &mut Properties {
        let mut node = self;
        for part in key.split('.').filter(|p| !p.is_empty()) {
            let idx = match node.leaf.iter().position(|c| c.name == part) {
                Some(idx) => idx,
                None => {
                    node.leaf.push(Properties::with_name(part));
                    node.leaf.len() - 1
                }
            };
            node = &mut node.leaf[idx];
        }
        node
    }

    /// True when a node exists at the dotted key.
    pub fn has_key(&self, key: &str) -> bool {
        self.find_node(key).is_some()
    }

    /// Detach the direct child called `name`.
    pub fn remove_node(&mut self, name: &str) -> Option<Properties> {
        let idx = self.leaf.iter().position(|c| c.name == name)?;
        Some(self.leaf.remove(idx))
    }

    /// All keys that carry a value, as full dotted paths relative to this node.
    pub fn property_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        for child in &self.leaf {
            child.collect_names(&child.name, &mut names);
        }
        names
    }

    fn collect_names(&self, path: &str, out: &mut Vec<String>) {
        if !self.value.is_empty() || !self.default_value.is_empty() || self.leaf.is_empty() {
            out.push(path.to_string());
        }
        for child in &self.leaf {
            child.collect_names(&format!("{}.{}", path, child.name), out);
        }
    }

    /// Number of keys reported by [`property_names`](Self::property_names).
    pub fn size(&self) -> usize {
        self.property_names().len()
    }

    /// Copy every key of `other` into this tree (values of `other` win).
    pub fn merge(&mut self, other: &Properties) -> &mut Self {
        for key in other.property_names() {
            let value = other.get_property(&key).to_string();
            self.set_property(&key, &value);
        }
        self
    }

    /// Parse `key: value` text and merge it into this tree.
    pub fn load(&mut self, text: &str) {
        let mut pending = String::new();
        for raw in text.lines() {
            let line = raw.trim();
            let comment = line.starts_with('#') || line.starts_with('!');
            if pending.is_empty() && (line.is_empty() || comment) {
                continue;
            }
            if ends_with_continuation(line) {
                pending.push_str(&line[..line.len() - 1]);
                continue;
            }
            pending.push_str(line);
            let logical = std::mem::take(&mut pending);
            if let Some((key, value)) = split_key_value(&logical) {
                if !key.is_empty() {
                    self.set_property(&key, &value);
                }
            }
        }
        if !pending.is_empty() {
            if let Some((key, value)) = split_key_value(&pending) {
                if !key.is_empty() {
                    self.set_property(&key, &value);
                }
            }
        }
    }

    /// Serialize every key as `key: value` lines (inverse of [`load`](Self::load)).
    pub fn store(&self) -> String {
        let mut out = String::new();
        for key in self.property_names() {
            out.push_str(&key);
            out.push_str(": ");
            out.push_str(&escape(self.get_property(&key)));
            out.push('\n');
        }
        out
    }

    /// Parse `key: value` text into a fresh tree.
    pub fn parse(text: &str) -> Self {
        let mut prop = Self::new();
        prop.load(text);
        prop
    }
}

impl fmt::Display for Properties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn dump(node: &Properties, depth: usize, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            for child in &node.leaf {
                write!(f, "{:indent$}- {}", "", child.name, indent = depth * 2)?;
                if !child.value().is_empty() {
                    write!(f, ": {}", child.value())?;
                }
                writeln!(f)?;
                dump(child, depth + 1, f)?;
            }
            Ok(())
        }
        dump(self, 0, f)
    }
}

fn ends_with_continuation(line: &str) -> bool {
    let slashes = line.chars().rev().take_while(|c| *c == '\\').count();
    slashes % 2 == 1
}

fn split_key_value(line: &str) -> Option<(String, String)> {
    let mut escaped = false;
    let mut split_at = None;
    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            ':' | '=' => {
                split_at = Some((i, i + 1));
                break;
            }
            _ => {}
        }
    }
    let (key, value) = match split_at {
        Some((k, v)) => (&line[..k], &line[v..]),
        None => match line.find(char::is_whitespace) {
            Some(i) => (&line[..i], &line[i..]),
            None => (line, ""),
        },
    };
    Some((unescape(key.trim()), unescape(value.trim())))
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\u{c}'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\\' => out.push_str("\\\\"),
            other => out.push(other),
        }
    }
    out
}

/// Interpret YES/NO style flags used throughout the configuration.
pub fn to_bool(value: &str, default: bool) -> bool {
    match value.trim().to_ascii_uppercase().as_str() {
        "YES" | "TRUE" | "ON" | "1" => true,
        "NO" | "FALSE" | "OFF" | "0" => false,
        _ => default,
    }
}

/// Split a comma separated list, trimming blanks and dropping empty items.
pub fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

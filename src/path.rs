// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 路径模型
//!
//! `Path` 是一个不可变的路径片段序列（URL 路径或文件路径均可）。
//! 每个片段单独记录自己前后是否带有 `/`：
//! - 相邻片段之间在渲染时总是恰好一个分隔符；
//! - 第一个片段的前导 `/` 决定绝对/相对路径；
//! - 最后一个片段的结尾 `/` 决定目录形式/文件形式。
//!
//! 所有修改操作都返回新的 `Path`，原值保持不变。

use std::fmt;

use crate::util::{raw_url_encode, url_decode};

pub const PATH_SEPARATOR: char = '/';
pub const EXTENSION_SEPARATOR: char = '.';

/// 路径中的一个片段
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathComponent {
    value: String,
    trailing_slash: bool,
    preceding_slash: bool,
}

impl PathComponent {
    pub fn new(value: &str, trailing_slash: bool, preceding_slash: bool) -> Self {
        Self {
            value: value.to_string(),
            trailing_slash,
            preceding_slash,
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn has_trailing_slash(&self) -> bool {
        self.trailing_slash
    }

    pub fn has_preceding_slash(&self) -> bool {
        self.preceding_slash
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Path {
    components: Vec<PathComponent>,
}

impl Path {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从字符串解析路径，不做百分号解码
    pub fn parse(value: &str) -> Self {
        Self::from_components(parse_components(value, false))
    }

    /// 从 URL 路径解析，每个片段都会被百分号解码
    pub fn from_url_path(url_path: &str) -> Self {
        Self::from_components(parse_components(url_path, true))
    }

    /// 按顺序拼接多个路径
    pub fn join(parts: &[&Path]) -> Self {
        let components = parts
            .iter()
            .flat_map(|p| p.components.iter().cloned())
            .collect();
        Self::from_components(components)
    }

    /// 在当前路径后追加另一个路径
    pub fn concat(&self, other: &Path) -> Self {
        Self::join(&[self, other])
    }

    fn from_components(mut components: Vec<PathComponent>) -> Self {
        // 中间位置的分隔符总是存在，只有首尾两端可以单独控制
        let last = components.len().saturating_sub(1);
        for (index, component) in components.iter_mut().enumerate() {
            if index > 0 {
                component.preceding_slash = true;
            }
            if index < last {
                component.trailing_slash = true;
            }
        }
        Self { components }
    }

    /// 所有片段的值，不暴露内部的分隔符状态
    pub fn components(&self) -> Vec<&str> {
        self.components.iter().map(|c| c.value()).collect()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.components.get(index).map(|c| c.value())
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn last(&self) -> Option<&str> {
        self.components.last().map(|c| c.value())
    }

    /// 空路径视为带结尾斜杠
    pub fn has_trailing_slash(&self) -> bool {
        self.components
            .last()
            .map_or(true, |c| c.has_trailing_slash())
    }

    pub fn has_preceding_slash(&self) -> bool {
        self.components
            .first()
            .map_or(false, |c| c.has_preceding_slash())
    }

    pub fn with_trailing_slash(&self, trailing_slash: bool) -> Self {
        let mut path = self.clone();
        if let Some(last) = path.components.last_mut() {
            last.trailing_slash = trailing_slash;
        }
        path
    }

    pub fn with_preceding_slash(&self, preceding_slash: bool) -> Self {
        let mut path = self.clone();
        if let Some(first) = path.components.first_mut() {
            first.preceding_slash = preceding_slash;
        }
        path
    }

    /// 组装完整路径字符串，`url_encode` 为真时对每个片段做百分号编码
    pub fn full_path(&self, url_encode: bool) -> String {
        let mut path = String::new();
        if self.has_preceding_slash() {
            path.push(PATH_SEPARATOR);
        }
        let end_with_separator = self.has_trailing_slash();
        let last = self.components.len().saturating_sub(1);
        for (index, component) in self.components.iter().enumerate() {
            let value = component.value();
            let value = value.strip_prefix(PATH_SEPARATOR).unwrap_or(value);
            let value = value.strip_suffix(PATH_SEPARATOR).unwrap_or(value);
            if url_encode {
                path.push_str(&raw_url_encode(value));
            } else {
                path.push_str(value);
            }
            if index < last || end_with_separator {
                path.push(PATH_SEPARATOR);
            }
        }
        path
    }

    /// 截断到最多 `length` 个片段
    pub fn truncate(&self, length: usize) -> Self {
        let components = self.components.iter().take(length).cloned().collect();
        Self::from_components(components)
    }

    /// 比较两个路径的片段，`check_separators` 为真时首尾分隔符也必须一致
    pub fn compare(&self, other: &Path, check_separators: bool) -> bool {
        if self.len() != other.len() {
            return false;
        }
        if check_separators
            && (self.has_preceding_slash() != other.has_preceding_slash()
                || self.has_trailing_slash() != other.has_trailing_slash())
        {
            return false;
        }
        self.components() == other.components()
    }

    /// 当前路径是否位于 `parent` 之下。
    ///
    /// `/base/child` 是 `/base` 的子路径；`match_self` 为真时相等也算。
    pub fn is_child_of(&self, parent: &Path, match_self: bool) -> bool {
        if !match_self && self.len() == parent.len() {
            return false;
        }
        if self.len() < parent.len() {
            return false;
        }
        parent.compare(&self.truncate(parent.len()), false)
    }

    /// 最后一个片段的扩展名（不含 `.`），没有扩展名时返回 `None`
    pub fn extension(&self) -> Option<&str> {
        let last = self.last()?;
        match last.rfind(EXTENSION_SEPARATOR) {
            Some(index) if index + 1 < last.len() => Some(&last[index + 1..]),
            _ => None,
        }
    }
}

fn parse_components(value: &str, decode: bool) -> Vec<PathComponent> {
    if value == "/" {
        return vec![PathComponent::new("", true, false)];
    }
    let trailing_slash = value.ends_with(PATH_SEPARATOR);
    let preceding_slash = value.starts_with(PATH_SEPARATOR);
    let split: Vec<&str> = value
        .split(PATH_SEPARATOR)
        .filter(|s| !s.is_empty())
        .collect();
    let last = split.len().saturating_sub(1);
    split
        .iter()
        .enumerate()
        .map(|(index, raw)| {
            let decoded = if decode {
                url_decode(raw)
            } else {
                raw.to_string()
            };
            PathComponent::new(
                &decoded,
                if index == last { trailing_slash } else { true },
                if index == 0 { preceding_slash } else { true },
            )
        })
        .collect()
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_path(false))
    }
}

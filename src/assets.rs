// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 静态资源
//!
//! 页面依赖的样式表与脚本从 `www_root` 目录下读取。文件内容放在一个 LRU 缓存里，
//! 以文件路径为键，并用修改时间判断缓存是否过期。

use std::fs;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};
use std::time::SystemTime;

use bytes::Bytes;
use log::{debug, error, warn};
use lru::LruCache;

use crate::exception::Exception;
use crate::param::{FALLBACK_MIME, MIME_TYPES};
use crate::path::Path;
use crate::response::{CacheDirective, HttpResponse};

#[derive(Clone)]
struct CacheEntry {
    content: Bytes,
    modified_time: SystemTime,
}

pub struct FileCache {
    cache: LruCache<String, CacheEntry>,
}

impl FileCache {
    // 容量为 0 时按 1 处理
    pub fn from_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: LruCache::new(capacity),
        }
    }

    pub fn push(&mut self, filename: &str, bytes: Bytes, modified_time: SystemTime) {
        let entry = CacheEntry {
            content: bytes,
            modified_time,
        };
        self.cache.put(filename.to_string(), entry);
    }

    // 只返回修改时间一致的缓存
    pub fn find(&mut self, filename: &str, current_modified_time: SystemTime) -> Option<Bytes> {
        match self.cache.get(filename) {
            Some(entry) if entry.modified_time == current_modified_time => {
                Some(entry.content.clone())
            }
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.cache.cap().get()
    }
}

/// 由后缀名推断 MIME 类型
pub fn mime_type(path: &Path) -> &'static str {
    path.extension()
        .and_then(|ext| MIME_TYPES.get(ext.to_lowercase().as_str()).copied())
        .unwrap_or(FALLBACK_MIME)
}

pub struct Assets {
    root: PathBuf,
    max_age: i64,
    cache: Mutex<FileCache>,
}

impl Assets {
    pub fn new(root: &str, cache_size: usize, max_age: i64) -> Self {
        Self {
            root: PathBuf::from(root),
            max_age,
            cache: Mutex::new(FileCache::from_capacity(cache_size)),
        }
    }

    /// 把 URL 路径映射到 `www_root` 下的文件。
    ///
    /// 含 `..` 或内嵌分隔符的片段返回 `InvalidPath`，目标不是普通文件时返回 `FileNotFound`。
    pub fn resolve(&self, path: &Path) -> Result<PathBuf, Exception> {
        let mut full_path = self.root.clone();
        let mut pushed = false;
        for component in path.components() {
            if component.is_empty() || component == "." {
                continue;
            }
            if component == ".." || component.contains(['/', '\\', '\0']) {
                return Err(Exception::InvalidPath);
            }
            full_path.push(component);
            pushed = true;
        }
        if pushed && full_path.is_file() {
            Ok(full_path)
        } else {
            Err(Exception::FileNotFound)
        }
    }

    /// 是否存在对应的静态文件
    pub fn contains(&self, path: &Path) -> bool {
        self.resolve(path).is_ok()
    }

    /// 读取文件（优先使用缓存）并构造响应
    pub fn serve(&self, path: &Path, id: u128) -> Result<HttpResponse, Exception> {
        let file_path = self.resolve(path)?;
        let key = file_path.to_string_lossy().to_string();
        let modified_time = match fs::metadata(&file_path).and_then(|meta| meta.modified()) {
            Ok(time) => time,
            Err(e) => {
                error!("[ID{}]无法获取文件{}的修改时间: {}", id, key, e);
                return Err(Exception::FileNotFound);
            }
        };

        let mut cache = self.lock(id);
        let content = match cache.find(&key, modified_time) {
            Some(bytes) => {
                debug!("[ID{}]缓存命中：{}", id, key);
                bytes
            }
            None => {
                let bytes = match fs::read(&file_path) {
                    Ok(data) => Bytes::from(data),
                    Err(e) => {
                        error!("[ID{}]无法读取文件{}: {}", id, key, e);
                        return Err(Exception::FileNotFound);
                    }
                };
                debug!("[ID{}]缓存未命中，已读取{}，{} bytes", id, key, bytes.len());
                cache.push(&key, bytes.clone(), modified_time);
                bytes
            }
        };
        drop(cache);

        let mut response = HttpResponse::new(200);
        response.set_header("Content-Type", mime_type(path))?;
        response
            .set_cache_control(&[CacheDirective::MaxAge(self.max_age)])
            .set_body(content);
        Ok(response)
    }

    fn lock(&self, id: u128) -> MutexGuard<'_, FileCache> {
        match self.cache.lock() {
            Ok(lock) => lock,
            Err(poisoned) => {
                warn!("[ID{}]缓存锁被污染，恢复并继续", id);
                poisoned.into_inner()
            }
        }
    }
}

// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

use serde_derive::Deserialize;
use serde_derive::Serialize;

use log::{error, warn};
use std::fs::File;
use std::io::prelude::*;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    #[serde(default = "default_www_root")]
    www_root: String,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default)]
    worker_threads: usize,
    #[serde(default = "default_local")]
    local: bool,
    #[serde(default = "default_database")]
    database: String,
    #[serde(default = "default_max_body_size")]
    max_body_size: usize,
    #[serde(default = "default_read_timeout_ms")]
    read_timeout_ms: u64,
    #[serde(default = "default_asset_cache_size")]
    asset_cache_size: usize,
    #[serde(default = "default_asset_max_age")]
    asset_max_age: i64,
}

fn default_www_root() -> String {
    "static".to_string()
}

fn default_port() -> u16 {
    7878
}

fn default_local() -> bool {
    true
}

fn default_database() -> String {
    "trains.db".to_string()
}

fn default_max_body_size() -> usize {
    2097152 // 2MB
}

fn default_read_timeout_ms() -> u64 {
    10000
}

fn default_asset_cache_size() -> usize {
    16
}

fn default_asset_max_age() -> i64 {
    86400 // 1天
}

impl Default for Config {
    fn default() -> Self {
        Self {
            www_root: default_www_root(),
            port: default_port(),
            worker_threads: 0,
            local: default_local(),
            database: default_database(),
            max_body_size: default_max_body_size(),
            read_timeout_ms: default_read_timeout_ms(),
            asset_cache_size: default_asset_cache_size(),
            asset_max_age: default_asset_max_age(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// 读取 TOML 配置文件。文件缺失或无法解析时使用默认配置。
    pub fn from_toml(filename: &str) -> Self {
        let mut str_val = String::new();
        let read = File::open(filename).and_then(|mut file| file.read_to_string(&mut str_val));
        if let Err(e) = read {
            error!("无法读取配置文件{}：{}，使用默认配置", filename, e);
            return Config::new().normalized();
        }
        Self::from_toml_str(&str_val)
    }

    pub fn from_toml_str(content: &str) -> Self {
        let raw_config = match toml::from_str::<Config>(content) {
            Ok(t) => t,
            Err(e) => {
                error!("无法成功从配置文件构建配置对象，使用默认配置：{}", e);
                Config::new()
            }
        };
        raw_config.normalized()
    }

    fn normalized(mut self) -> Self {
        if self.worker_threads == 0 {
            self.worker_threads = num_cpus::get();
        }
        if self.asset_cache_size == 0 {
            warn!("asset_cache_size被设置为0，但目前尚不支持禁用缓存，因此该值将被改为16。");
            self.asset_cache_size = default_asset_cache_size();
        }
        self
    }
}

impl Config {
    pub fn www_root(&self) -> &str {
        &self.www_root
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn worker_threads(&self) -> usize {
        self.worker_threads
    }

    pub fn local(&self) -> bool {
        self.local
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn max_body_size(&self) -> usize {
        self.max_body_size
    }

    pub fn read_timeout_ms(&self) -> u64 {
        self.read_timeout_ms
    }

    pub fn asset_cache_size(&self) -> usize {
        self.asset_cache_size
    }

    pub fn asset_max_age(&self) -> i64 {
        self.asset_max_age
    }
}

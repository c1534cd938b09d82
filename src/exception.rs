// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # Exception 模块
//!
//! 该模块定义了站点在请求处理生命周期中可能出现的各类异常情况。
//!
//! ## 错误分类
//! - **协议错误**：请求报文无法解析，对应 `400 Bad Request` 或 `413`。
//! - **配置错误**：非法的响应头字段、无法识别的依赖类型。属于编码错误，直接中止渲染并返回 500。
//! - **解析错误**：CSV 文件不存在或格式不正确。
//! - **存储错误**：数据库连接失败，仅在启动阶段出现。单条 SQL 失败不会产生异常，而是被归约为 `false`。
//!
//! 用户输入错误（例如未选择文件）不在这里，它们以提示文本的形式嵌入页面。

use std::fmt;

/// 站点处理请求过程中发生的异常类型。
///
/// 该枚举通常作为 `Result` 的 `Err` 部分返回，用于指示处理失败的具体原因。
#[derive(Debug, Clone, PartialEq)]
pub enum Exception {
    /// 请求行或请求头无法解析为合法的 UTF-8 字符串。
    RequestIsNotUtf8,
    /// 客户端使用了服务器不认识的 HTTP 方法，或请求行格式不正确。
    UnSupportedRequestMethod,
    /// 客户端使用了服务器不支持的 HTTP 协议版本。
    UnsupportedHttpVersion,
    /// 请求头或请求体格式不正确（例如 multipart 缺少 boundary）。
    MalformedRequest,
    /// 请求体超过了配置中允许的最大长度。对应 `413 Content Too Large`。
    PayloadTooLarge,
    /// 在静态资源目录下未找到所请求的文件。对应 `404 Not Found`。
    FileNotFound,
    /// 请求的路径格式非法或包含越权尝试（如目录遍历攻击）。对应 `400 Bad Request`。
    InvalidPath,
    /// 响应头字段名包含分隔符 `:`，或字段/取值中包含换行符。
    InvalidHeaderField(String),
    /// 页面依赖既不是 `.css` 也不是 `.js` 文件。
    UnrecognizedDependency(String),
    /// 指定路径的 CSV 文件不存在。
    CsvFileNotFound(String),
    /// CSV 第 N 行（从 1 开始计数，含表头）的列数与表头不一致。
    MalformedCsv(usize),
    /// 无法打开或初始化数据库。
    DatabaseUnavailable(String),
}

use Exception::*;

/// 为 `Exception` 实现 `Display` 特性，使其支持字符串格式化输出。
impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestIsNotUtf8 => write!(f, "Request head can't be parsed in UTF-8"),
            UnSupportedRequestMethod => write!(f, "Unsupported request method"),
            UnsupportedHttpVersion => write!(f, "Unsupported HTTP version"),
            MalformedRequest => write!(f, "Malformed request"),
            PayloadTooLarge => write!(f, "Payload too large (413)"),
            FileNotFound => write!(f, "File not found (404)"),
            InvalidPath => write!(f, "Invalid path (400)"),
            InvalidHeaderField(field) => write!(f, "Invalid header field specified: \"{}\"", field),
            UnrecognizedDependency(dep) => {
                write!(f, "Encountered an unrecognized dependency type: {}", dep)
            }
            CsvFileNotFound(path) => write!(f, "CSV File {} not found.", path),
            MalformedCsv(line) => write!(f, "CSV line {} does not match the header", line),
            DatabaseUnavailable(reason) => write!(f, "Database connection error: {}", reason),
        }
    }
}

impl std::error::Error for Exception {}

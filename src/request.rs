// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # HTTP 请求处理模块
//!
//! 负责将 TCP 流中读取的原始字节解析为不可变的 `HttpRequest` 值。它涵盖了：
//! 1. 请求行（Request-Line）的解析（方法、路径、版本）。
//! 2. 请求头的保存与大小写不敏感的查找。
//! 3. 请求参数：JSON、表单、multipart 与查询串。
//! 4. Cookie、Basic 认证凭据以及日志输出前的凭据脱敏。
//!
//! 请求对象在连接处理器中构建一次，然后作为显式参数传给控制器与组件，
//! 不存在进程级的“当前请求”。

use std::collections::HashMap;

use lazy_static::lazy_static;
use log::{debug, error};
use regex::Regex;

use crate::exception::Exception;
use crate::multipart::{boundary_of, parse_multipart, UploadedFile};
use crate::param::*;
use crate::url::{parse_query_string, Origin, ParamValue, Params, Url};
use crate::util::{base64_decode, url_decode};

/// 脱敏时会被替换的参数键
const CREDENTIAL_KEYS: [&str; 2] = ["password", "pass"];

lazy_static! {
    /// 匹配请求体中的 `"password": "..."`、`password=...` 等写法
    static ref CREDENTIAL_PATTERNS: Vec<Regex> = CREDENTIAL_KEYS
        .iter()
        .map(|key| {
            Regex::new(&format!(
                r#"((?:^|[^A-Za-z0-9_])["']?{}["']?[ \t]*[:=][ \t]*)("[^"]*"|'[^']*'|[^&,;}}\s]*)"#,
                key
            ))
            .unwrap()
        })
        .collect();
}

/// 表示一个完整的 HTTP 请求。
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// 全局请求 ID，用于在多线程环境下追踪日志
    id: u128,
    /// 请求的绝对 URL（协议、域名与端口取自请求来源）
    url: Url,
    method: HttpRequestMethod,
    version: HttpVersion,
    /// 按出现顺序保存的请求头
    headers: Vec<(String, String)>,
    body: String,
    params: Params,
    files: Vec<UploadedFile>,
    cookies: HashMap<String, String>,
    client_address: String,
    user: Option<String>,
    password: Option<String>,
    /// 客户端支持的压缩编码列表（按解析顺序排列）
    accept_encoding: Vec<HttpEncoding>,
}

impl HttpRequest {
    /// 从原始字节缓冲区尝试构建 `HttpRequest` 实例。
    ///
    /// # 参数
    /// * `buffer` - 完整的请求报文（请求头 + 请求体）。
    /// * `client_address` - 客户端地址，仅用于记录。
    /// * `server_port` - 监听端口，`Host` 头未带端口时使用。
    /// * `id` - 全局请求 ID。
    ///
    /// # 错误处理
    /// 请求格式不符合 HTTP 规范或使用了不支持的方法/版本时返回相应的 `Exception`。
    pub fn try_from(
        buffer: &[u8],
        client_address: &str,
        server_port: u16,
        id: u128,
    ) -> Result<Self, Exception> {
        // 1. 拆分请求头与请求体，请求头必须是合法的 UTF-8
        let (head_bytes, body_bytes) = match find_head_end(buffer) {
            Some(end) => (&buffer[..end], &buffer[end + 4..]),
            None => (buffer, &buffer[buffer.len()..]),
        };
        let head = match std::str::from_utf8(head_bytes) {
            Ok(head) => head,
            Err(_) => {
                error!("[ID{}]无法解析HTTP请求", id);
                return Err(Exception::RequestIsNotUtf8);
            }
        };
        let mut lines = head.split(CRLF);

        // 2. 解析请求行 (e.g., "GET /index.html HTTP/1.1")
        let request_line = lines.next().unwrap_or_default();
        let parts: Vec<&str> = request_line.split(' ').filter(|s| !s.is_empty()).collect();
        if parts.len() < 3 {
            error!("[ID{}]HTTP请求行格式不正确：{}", id, request_line);
            return Err(Exception::UnSupportedRequestMethod);
        }
        let method = match HttpRequestMethod::parse(parts[0]) {
            Some(method) => method,
            None => {
                error!("[ID{}]不支持的HTTP请求方法：{}", id, parts[0]);
                return Err(Exception::UnSupportedRequestMethod);
            }
        };
        let version_str = parts[parts.len() - 1].to_uppercase();
        let version = match version_str.as_str() {
            "HTTP/1.1" => HttpVersion::V1_1,
            "HTTP/1.0" => HttpVersion::V1_0,
            _ => {
                error!("[ID{}]不支持的HTTP协议版本：{}", id, &version_str);
                return Err(Exception::UnsupportedHttpVersion);
            }
        };
        // 路径中可能混有未编码的空格，尝试用 join 恢复
        let target = parts[1..parts.len() - 1].join(" ");

        // 3. 请求头
        let headers: Vec<(String, String)> = lines
            .filter_map(|line| line.split_once(':'))
            .map(|(field, value)| (field.trim().to_string(), value.trim().to_string()))
            .collect();
        let header = |name: &str| {
            headers
                .iter()
                .find(|(field, _)| field.eq_ignore_ascii_case(name))
                .map(|(_, value)| value.as_str())
        };

        // 4. 请求来源与 URL
        let protocol = match header("X-Forwarded-Proto") {
            Some(proto) if proto.eq_ignore_ascii_case("https") => Protocol::Https,
            _ => Protocol::Http,
        };
        let host = header("Host").unwrap_or_default();
        let port = host
            .rsplit_once(':')
            .and_then(|(_, port)| port.parse::<u16>().ok())
            .unwrap_or(server_port);
        let origin = Origin::new(protocol, host, port);

        let target = target.split_once('#').map_or(target.as_str(), |(t, _)| t);
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, query),
            None => (target, ""),
        };
        let query_params = parse_query_string(query);
        let url = Url::with_origin(path, &origin)
            .with_params(query_params.clone())
            .with_absolute(true);

        // 5. 请求参数与上传文件
        let body = String::from_utf8_lossy(body_bytes).into_owned();
        let content_type = header("Content-Type").unwrap_or_default().to_string();
        let (params, files) = read_params(
            method,
            &content_type,
            &body,
            body_bytes,
            query_params,
            id,
        )?;

        // 6. Cookie 与 Basic 认证
        let cookies = header("Cookie").map(parse_cookies).unwrap_or_default();
        let (user, password) = match header("Authorization").and_then(parse_basic_auth) {
            Some((user, password)) => (Some(user), Some(password)),
            None => (None, None),
        };

        let accept_encoding = header("Accept-Encoding")
            .map(parse_accept_encoding)
            .unwrap_or_default();

        debug!("[ID{}]请求解析完成：{} {}", id, method, path);
        Ok(Self {
            id,
            url,
            method,
            version,
            headers,
            body,
            params,
            files,
            cookies,
            client_address: client_address.to_string(),
            user,
            password,
            accept_encoding,
        })
    }

    /// 返回一个敏感信息已被替换为 `[REDACTED]` 的副本，用于日志输出。
    ///
    /// 覆盖：`password`/`pass` 参数、请求体中的同名字段、Basic 认证密码，
    /// 以及 `Authorization`/`Proxy-Authorization` 头的凭据部分。
    pub fn redact_credentials(&self) -> HttpRequest {
        let mut redacted = self.clone();
        for key in CREDENTIAL_KEYS {
            if redacted.params.contains(key) {
                redacted.params.set(key, ParamValue::Single(REDACTED.to_string()));
            }
        }
        for pattern in CREDENTIAL_PATTERNS.iter() {
            redacted.body = pattern
                .replace_all(&redacted.body, format!("${{1}}{}", REDACTED).as_str())
                .into_owned();
        }
        if redacted.password.is_some() {
            redacted.password = Some(REDACTED.to_string());
        }
        for (field, value) in redacted.headers.iter_mut() {
            if field.eq_ignore_ascii_case("Authorization")
                || field.eq_ignore_ascii_case("Proxy-Authorization")
            {
                *value = match value.split_once(' ') {
                    Some((scheme, _)) => format!("{} {}", scheme, REDACTED),
                    None => REDACTED.to_string(),
                };
            }
        }
        redacted
    }
}

/// 按请求方法与 Content-Type 选择参数来源
fn read_params(
    method: HttpRequestMethod,
    content_type: &str,
    body: &str,
    body_bytes: &[u8],
    query_params: Params,
    id: u128,
) -> Result<(Params, Vec<UploadedFile>), Exception> {
    let media_type = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase();

    if media_type == CONTENT_TYPE_JSON {
        match parse_json_params(body) {
            Some(params) => return Ok((params, Vec::new())),
            None => debug!("[ID{}]请求体不是 JSON 对象，忽略", id),
        }
    }

    match method {
        HttpRequestMethod::Post => {
            if media_type == CONTENT_TYPE_FORM {
                Ok((parse_query_string(body), Vec::new()))
            } else if media_type == CONTENT_TYPE_MULTIPART {
                let boundary = match boundary_of(content_type) {
                    Some(boundary) => boundary,
                    None => {
                        error!("[ID{}]multipart 请求缺少 boundary", id);
                        return Err(Exception::MalformedRequest);
                    }
                };
                parse_multipart(body_bytes, &boundary)
            } else {
                Ok((Params::new(), Vec::new()))
            }
        }
        HttpRequestMethod::Put | HttpRequestMethod::Delete | HttpRequestMethod::Patch => {
            if media_type == CONTENT_TYPE_FORM && !body.is_empty() {
                Ok((parse_query_string(body), Vec::new()))
            } else {
                Ok((query_params, Vec::new()))
            }
        }
        _ => Ok((query_params, Vec::new())),
    }
}

/// JSON 对象的每个顶层字段成为一个参数，数组成为列表参数
fn parse_json_params(body: &str) -> Option<Params> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let object = value.as_object()?;
    let to_string = |v: &serde_json::Value| match v {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    };
    Some(
        object
            .iter()
            .map(|(key, value)| {
                let value = match value {
                    serde_json::Value::Array(items) => {
                        ParamValue::List(items.iter().map(to_string).collect())
                    }
                    other => ParamValue::Single(to_string(other)),
                };
                (key.clone(), value)
            })
            .collect(),
    )
}

fn parse_cookies(header: &str) -> HashMap<String, String> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .map(|(name, value)| (name.trim().to_string(), url_decode(value.trim())))
        .collect()
}

fn parse_basic_auth(header: &str) -> Option<(String, String)> {
    let (scheme, credentials) = header.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("Basic") {
        return None;
    }
    let decoded = String::from_utf8(base64_decode(credentials)?).ok()?;
    let (user, password) = decoded.split_once(':')?;
    Some((user.to_string(), password.to_string()))
}

/// 这里的逻辑比较简单，只要包含关键词即视为支持
fn parse_accept_encoding(header: &str) -> Vec<HttpEncoding> {
    let mut accept_encoding = vec![];
    if header.contains("gzip") {
        accept_encoding.push(HttpEncoding::Gzip);
    }
    if header.contains("deflate") {
        accept_encoding.push(HttpEncoding::Deflate);
    }
    if header.contains("br") {
        accept_encoding.push(HttpEncoding::Br);
    }
    accept_encoding
}

/// 请求头结束位置（`\r\n\r\n` 的起始下标）
pub fn find_head_end(buffer: &[u8]) -> Option<usize> {
    buffer.windows(4).position(|w| w == b"\r\n\r\n")
}

/// 从请求头文本中读取 `Content-Length`
pub fn content_length(head: &str) -> Option<usize> {
    head.split(CRLF)
        .filter_map(|line| line.split_once(':'))
        .find(|(field, _)| field.trim().eq_ignore_ascii_case("Content-Length"))
        .and_then(|(_, value)| value.trim().parse().ok())
}

// --- Getter 访问器实现 ---

impl HttpRequest {
    pub fn id(&self) -> u128 {
        self.id
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// 请求路径（已解码，不含查询串）
    pub fn path(&self) -> String {
        self.url.path().full_path(false)
    }

    pub fn method(&self) -> HttpRequestMethod {
        self.method
    }

    pub fn version(&self) -> &HttpVersion {
        &self.version
    }

    /// 大小写不敏感地查找请求头
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(field, _)| field.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn param(&self, key: &str) -> Option<&ParamValue> {
        self.params.get(key)
    }

    pub fn files(&self) -> &[UploadedFile] {
        &self.files
    }

    /// 按表单字段名查找上传文件
    pub fn file(&self, field_name: &str) -> Option<&UploadedFile> {
        self.files.iter().find(|f| f.field_name() == field_name)
    }

    pub fn cookies(&self) -> &HashMap<String, String> {
        &self.cookies
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(|c| c.as_str())
    }

    pub fn client_address(&self) -> &str {
        &self.client_address
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// 获取用户代理字符串
    pub fn user_agent(&self) -> &str {
        self.header("User-Agent").unwrap_or_default()
    }

    /// 获取客户端支持的压缩算法列表
    pub fn accept_encoding(&self) -> &Vec<HttpEncoding> {
        &self.accept_encoding
    }
}

// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # HTTP 响应构建模块
//!
//! `HttpResponse` 由状态码（或自定义状态码 + 描述）、有序的响应头列表与响应体组成。
//! `send` 消耗响应本身并将其写入连接，写出后的响应无法再次使用。

use std::fmt;
use std::io::{self, Write};

use brotli::enc::{self, backward_references::BrotliEncoderParams};
use bytes::Bytes;
use chrono::prelude::*;
use flate2::{
    write::{DeflateEncoder, GzEncoder},
    Compression,
};
use log::{debug, error};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::exception::Exception;
use crate::param::*;
use crate::request::HttpRequest;
use crate::url::Url;
use crate::util::HtmlBuilder;

/// 查找状态码的描述：标准原因短语 → 同类状态码（x00）的短语 → `Unknown`
pub fn reason_phrase(code: u16) -> String {
    STATUS_CODES
        .get(&code)
        .or_else(|| STATUS_CODES.get(&(code / 100 * 100)))
        .map_or("Unknown", |phrase| *phrase)
        .to_string()
}

/// 不在标准表中的状态码，或需要覆盖默认描述的状态码
#[derive(Debug, Clone, PartialEq)]
pub struct CustomHttpResponseCode {
    code: u16,
    message: String,
}

impl CustomHttpResponseCode {
    pub fn new(code: u16, message: &str) -> Self {
        Self {
            code,
            message: message.to_string(),
        }
    }

    pub fn code(&self) -> u16 {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// `Cache-Control` 指令
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheDirective {
    NoCache,
    NoStore,
    MustRevalidate,
    MaxAge(i64),
}

impl CacheDirective {
    /// 渲染时的固定顺序
    fn rank(&self) -> u8 {
        match self {
            CacheDirective::NoCache => 0,
            CacheDirective::NoStore => 1,
            CacheDirective::MustRevalidate => 2,
            CacheDirective::MaxAge(_) => 3,
        }
    }

    /// 完全禁止缓存所需的指令组合
    pub fn prevention() -> Vec<CacheDirective> {
        vec![
            CacheDirective::NoCache,
            CacheDirective::NoStore,
            CacheDirective::MustRevalidate,
            CacheDirective::MaxAge(0),
        ]
    }

    /// 按固定顺序拼接为 `Cache-Control` 头的取值
    pub fn header_value(directives: &[CacheDirective]) -> String {
        let mut sorted = directives.to_vec();
        sorted.sort_by_key(|d| d.rank());
        sorted.dedup();
        sorted
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for CacheDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheDirective::NoCache => write!(f, "no-cache"),
            CacheDirective::NoStore => write!(f, "no-store"),
            CacheDirective::MustRevalidate => write!(f, "must-revalidate"),
            CacheDirective::MaxAge(seconds) => write!(f, "max-age={}", seconds),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    version: HttpVersion,
    status_code: u16,
    /// 自定义状态描述，为空时使用 `reason_phrase`
    message: Option<String>,
    headers: Vec<(String, String)>,
    content: Option<Bytes>,
    content_encoding: Option<HttpEncoding>,
    date: DateTime<Utc>,
    /// HEAD 请求：保留 Content-Length，但不发送响应体
    head_only: bool,
}

impl HttpResponse {
    pub fn new(code: u16) -> Self {
        Self {
            version: HttpVersion::V1_1,
            status_code: code,
            message: None,
            headers: Vec::new(),
            content: None,
            content_encoding: None,
            date: Utc::now(),
            head_only: false,
        }
    }

    pub fn with_custom_code(code: &CustomHttpResponseCode) -> Self {
        let mut response = Self::new(code.code());
        response.message = Some(code.message().to_string());
        response
    }

    /// 生成一个 HTML 响应，`Content-Type` 为 `text/html;charset=utf-8`
    pub fn html(code: u16, html: String) -> Self {
        let mut response = Self::new(code);
        response.put_header("Content-Type", CONTENT_TYPE_HTML);
        response.content = Some(Bytes::from(html));
        response
    }

    /// 状态码对应的错误页面
    pub fn from_status_code(code: u16, note: Option<&str>) -> Self {
        let note = match (code, note) {
            (_, Some(note)) => Some(note),
            (404, None) => Some(r"<h2>噢！</h2><p>你指定的网页无法找到。</p>"),
            (405, None) => Some(r"<h2>噢！</h2><p>该地址不支持此请求方法。</p>"),
            (500, None) => Some(r"<h2>噢！</h2><p>服务器出现了一个内部错误。</p>"),
            _ => None,
        };
        let mut response = Self::html(code, HtmlBuilder::from_status_code(code, note).build());
        response.set_cache_control(&CacheDirective::prevention());
        if code == 405 {
            response.put_header("Allow", &allowed_methods());
        }
        response
    }

    /// `OPTIONS` 请求的响应
    pub fn options() -> Self {
        let mut response = Self::new(204);
        response.put_header("Allow", &allowed_methods());
        response
    }

    /// 重定向到 `destination`，同时禁止客户端缓存此响应
    pub fn redirect(destination: &Url, code: u16) -> Self {
        let mut response = Self::new(code);
        response.put_header("Location", &destination.build_url(None, false));
        response.set_cache_control(&CacheDirective::prevention());
        response
    }

    /// 设置响应头，同名字段（大小写不敏感）会被替换。
    ///
    /// 字段名包含 `:`，或字段/取值中包含换行符时返回 `InvalidHeaderField`。
    pub fn set_header(&mut self, field: &str, value: &str) -> Result<&mut Self, Exception> {
        let has_line_break = |s: &str| s.contains('\r') || s.contains('\n');
        if field.is_empty() || field.contains(':') || has_line_break(field) || has_line_break(value)
        {
            error!("非法的响应头字段：{:?}: {:?}", field, value);
            return Err(Exception::InvalidHeaderField(field.to_string()));
        }
        self.put_header(field, value);
        Ok(self)
    }

    /// 已知合法的响应头，跳过校验
    fn put_header(&mut self, field: &str, value: &str) {
        match self
            .headers
            .iter_mut()
            .find(|(f, _)| f.eq_ignore_ascii_case(field))
        {
            Some(entry) => entry.1 = value.to_string(),
            None => self.headers.push((field.to_string(), value.to_string())),
        }
    }

    pub fn set_cache_control(&mut self, directives: &[CacheDirective]) -> &mut Self {
        self.put_header("Cache-Control", &CacheDirective::header_value(directives));
        self
    }

    pub fn set_body(&mut self, body: impl Into<Bytes>) -> &mut Self {
        self.content = Some(body.into());
        self.content_encoding = None;
        self
    }

    /// 按请求调整响应：协议版本、内容压缩，以及 HEAD 请求的响应体省略
    pub fn negotiate(&mut self, request: &HttpRequest) -> &mut Self {
        let id = request.id();
        self.version = *request.version();
        self.head_only = request.method() == HttpRequestMethod::Head;

        let compressible = self
            .header("Content-Type")
            .map_or(false, |mime| !should_skip_compression(mime));
        if !compressible || self.content_encoding.is_some() {
            return self;
        }
        let encoding = decide_encoding(request.accept_encoding());
        let Some(content) = self.content.take() else {
            return self;
        };
        match compress(content.to_vec(), encoding) {
            Ok(compressed) => {
                self.content = Some(Bytes::from(compressed));
                self.content_encoding = encoding;
                match encoding {
                    Some(e) => debug!("[ID{}]使用{}压缩编码", id, e),
                    None => debug!("[ID{}]不进行压缩", id),
                }
            }
            Err(e) => {
                error!("[ID{}]压缩响应失败: {}，返回未压缩内容", id, e);
                self.content = Some(content);
            }
        }
        self
    }

    /// 序列化为完整的 HTTP 响应报文
    pub fn as_bytes(&self) -> Vec<u8> {
        let content: &[u8] = match &self.content {
            Some(c) => c,
            None => b"",
        };
        let mut header = String::new();
        header.push_str(&format!(
            "HTTP/{} {} {}{}",
            self.version,
            self.status_code,
            self.information(),
            CRLF
        ));
        for (field, value) in &self.headers {
            header.push_str(&format!("{}: {}{}", field, value, CRLF));
        }
        if let Some(encoding) = self.content_encoding {
            header.push_str(&format!("Content-Encoding: {}{}", encoding, CRLF));
        }
        header.push_str(&format!("Content-Length: {}{}", content.len(), CRLF));
        header.push_str(&format!("Date: {}{}", format_date(&self.date), CRLF));
        header.push_str(&format!("Server: {}{}", SERVER_NAME, CRLF));
        header.push_str(CRLF);

        let mut bytes = header.into_bytes();
        if !self.head_only {
            bytes.extend_from_slice(content);
        }
        bytes
    }

    /// 将响应写入连接。响应在此之后即被消耗，本次交互结束。
    pub async fn send<W>(self, stream: &mut W, id: u128) -> io::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        let bytes = self.as_bytes();
        debug!("[ID{}]发送全量响应，长度: {}", id, bytes.len());
        stream.write_all(&bytes).await?;
        stream.flush().await
    }
}

impl HttpResponse {
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    /// 状态行中的描述文本
    pub fn information(&self) -> String {
        match &self.message {
            Some(message) => message.clone(),
            None => reason_phrase(self.status_code),
        }
    }

    pub fn header(&self, field: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(f, _)| f.eq_ignore_ascii_case(field))
            .map(|(_, v)| v.as_str())
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// 响应体（若已压缩则为压缩后的内容）
    pub fn body(&self) -> Option<&Bytes> {
        self.content.as_ref()
    }

    pub fn content_encoding(&self) -> Option<HttpEncoding> {
        self.content_encoding
    }
}

fn allowed_methods() -> String {
    ALLOWED_METHODS
        .iter()
        .map(|m| m.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_date(date: &DateTime<Utc>) -> String {
    date.to_rfc2822()
}

pub fn compress(data: Vec<u8>, mode: Option<HttpEncoding>) -> io::Result<Vec<u8>> {
    let original_size = data.len();
    let result = match mode {
        Some(HttpEncoding::Gzip) => {
            let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(&data)?;
            encoder.finish()
        }
        Some(HttpEncoding::Deflate) => {
            let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(&data)?;
            encoder.finish()
        }
        Some(HttpEncoding::Br) => {
            let params = BrotliEncoderParams::default();
            let mut output = Vec::new();
            enc::BrotliCompress(&mut io::Cursor::new(data), &mut output, &params)?;
            Ok(output)
        }
        None => Ok(data),
    };

    if let Ok(ref compressed) = result {
        debug!(
            "压缩完成: {:?}, 原始大小: {} bytes, 压缩后: {} bytes",
            mode,
            original_size,
            compressed.len()
        );
    }
    result
}

/// 已经压缩过的格式不再重复压缩
pub fn should_skip_compression(mime_type: &str) -> bool {
    let skip_types = [
        "image/jpeg",
        "image/png",
        "image/gif",
        "image/webp",
        "image/x-icon",
        "application/octet-stream",
        "font/woff",
        "font/woff2",
    ];

    skip_types
        .iter()
        .any(|&skip_type| mime_type.starts_with(skip_type))
}

/// gzip 优先，其次 deflate；brotli 不参与协商
pub fn decide_encoding(accept_encoding: &[HttpEncoding]) -> Option<HttpEncoding> {
    if accept_encoding.contains(&HttpEncoding::Gzip) {
        Some(HttpEncoding::Gzip)
    } else if accept_encoding.contains(&HttpEncoding::Deflate) {
        Some(HttpEncoding::Deflate)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn to_string(response: &HttpResponse) -> String {
        String::from_utf8_lossy(&response.as_bytes()).into_owned()
    }

    fn request(raw: &str) -> HttpRequest {
        HttpRequest::try_from(raw.as_bytes(), "127.0.0.1:1", 7878, 1).unwrap()
    }

    #[test]
    fn test_reason_phrase_fallbacks() {
        assert_eq!(reason_phrase(404), "Not Found");
        assert_eq!(reason_phrase(487), "Bad Request");
        assert_eq!(reason_phrase(599), "Internal Server Error");
        assert_eq!(reason_phrase(799), "Unknown");
    }

    #[test]
    fn test_custom_code_message() {
        let response =
            HttpResponse::with_custom_code(&CustomHttpResponseCode::new(299, "Trains Imported"));
        assert_eq!(response.status_code(), 299);
        assert!(to_string(&response).starts_with("HTTP/1.1 299 Trains Imported\r\n"));
    }

    #[test]
    fn test_response_as_bytes_basic() {
        let response = HttpResponse::new(200);
        let response_str = to_string(&response);

        assert!(response_str.starts_with("HTTP/1.1 200 OK"));
        assert!(response_str.contains("Content-Length: 0"));
        assert!(response_str.contains("Server: trainlist"));
        assert!(response_str.contains("Date: "));
        assert!(response_str.ends_with("\r\n\r\n"));
    }

    #[test]
    fn test_response_as_bytes_with_content() {
        let mut response = HttpResponse::new(200);
        response.set_header("Content-Type", "text/plain").unwrap();
        response.set_body("Hello");
        let response_str = to_string(&response);

        assert!(response_str.contains("Content-Type: text/plain"));
        assert!(response_str.contains("Content-Length: 5"));
        assert!(response_str.ends_with("Hello"));
    }

    #[test]
    fn test_set_header_replaces_case_insensitively() {
        let mut response = HttpResponse::new(200);
        response.set_header("X-Run", "1").unwrap();
        response.set_header("x-run", "2").unwrap();
        assert_eq!(response.headers().len(), 1);
        assert_eq!(response.header("X-RUN"), Some("2"));
    }

    #[test]
    fn test_set_header_rejects_delimiters() {
        let mut response = HttpResponse::new(200);
        assert_eq!(
            response.set_header("X-Bad: Field", "v").unwrap_err(),
            Exception::InvalidHeaderField("X-Bad: Field".to_string())
        );
        assert!(response.set_header("X-Split", "a\r\nInjected: 1").is_err());
        assert!(response.headers().is_empty());
    }

    #[test]
    fn test_cache_directives_canonical_order() {
        let value = CacheDirective::header_value(&[
            CacheDirective::MaxAge(0),
            CacheDirective::MustRevalidate,
            CacheDirective::NoStore,
            CacheDirective::NoCache,
        ]);
        assert_eq!(value, "no-cache, no-store, must-revalidate, max-age=0");
        assert_eq!(
            CacheDirective::header_value(&CacheDirective::prevention()),
            value
        );
        assert_eq!(
            CacheDirective::header_value(&[CacheDirective::MaxAge(900)]),
            "max-age=900"
        );
    }

    #[test]
    fn test_redirect() {
        let destination = Url::new("/").with_param("msg", Some("done".into()));
        let response = HttpResponse::redirect(&destination, 303);
        assert_eq!(response.status_code(), 303);
        assert_eq!(response.header("Location"), Some("/?msg=done"));
        assert_eq!(
            response.header("Cache-Control"),
            Some("no-cache, no-store, must-revalidate, max-age=0")
        );
    }

    #[test]
    fn test_error_pages() {
        let response = HttpResponse::from_status_code(404, None);
        let response_str = to_string(&response);
        assert!(response_str.starts_with("HTTP/1.1 404 Not Found"));
        assert!(response_str.contains("你指定的网页无法找到"));

        let response = HttpResponse::from_status_code(405, None);
        assert_eq!(response.header("Allow"), Some("GET, HEAD, POST, OPTIONS"));
    }

    #[test]
    fn test_options_response() {
        let response = HttpResponse::options();
        assert_eq!(response.status_code(), 204);
        assert!(to_string(&response).contains("Allow: GET, HEAD, POST, OPTIONS"));
    }

    #[test]
    fn test_negotiate_gzip() {
        let mut response = HttpResponse::html(200, "<p>trains</p>".repeat(50));
        response.negotiate(&request(
            "GET / HTTP/1.1\r\nAccept-Encoding: br, gzip\r\n\r\n",
        ));
        assert_eq!(response.content_encoding(), Some(HttpEncoding::Gzip));
        let body = response.body().unwrap();
        assert_eq!(&body[0..2], &[0x1f, 0x8b]);
        assert!(to_string(&response).contains("Content-Encoding: gzip"));
    }

    #[test]
    fn test_negotiate_skips_binary() {
        let mut response = HttpResponse::new(200);
        response.set_header("Content-Type", "image/png").unwrap();
        response.set_body(vec![1u8, 2, 3]);
        response.negotiate(&request("GET / HTTP/1.1\r\nAccept-Encoding: gzip\r\n\r\n"));
        assert_eq!(response.content_encoding(), None);
        assert_eq!(response.body().unwrap().as_ref(), &[1u8, 2, 3]);
    }

    #[test]
    fn test_head_response_keeps_length() {
        let mut response = HttpResponse::html(200, "<!DOCTYPE html><p>x</p>".to_string());
        response.negotiate(&request("HEAD / HTTP/1.1\r\n\r\n"));
        let response_str = to_string(&response);
        assert!(response_str.contains("Content-Length: 23"));
        assert!(!response_str.contains("<!DOCTYPE html>"));
    }

    #[test]
    fn test_compress_none() {
        let data = b"Hello, World!".to_vec();
        assert_eq!(compress(data.clone(), None).unwrap(), data);
    }

    #[test]
    fn test_compress_large_data() {
        let data = vec![b'A'; 10000];
        let result_gzip = compress(data.clone(), Some(HttpEncoding::Gzip)).unwrap();
        let result_deflate = compress(data.clone(), Some(HttpEncoding::Deflate)).unwrap();
        let result_br = compress(data.clone(), Some(HttpEncoding::Br)).unwrap();

        assert!(result_gzip.len() < data.len());
        assert!(result_deflate.len() < data.len());
        assert!(result_br.len() < data.len());
    }

    #[test]
    fn test_decide_encoding() {
        assert_eq!(
            decide_encoding(&[HttpEncoding::Br, HttpEncoding::Gzip]),
            Some(HttpEncoding::Gzip)
        );
        assert_eq!(
            decide_encoding(&[HttpEncoding::Deflate]),
            Some(HttpEncoding::Deflate)
        );
        assert_eq!(decide_encoding(&[HttpEncoding::Br]), None);
        assert_eq!(decide_encoding(&[]), None);
    }

    #[tokio::test]
    async fn test_send_writes_whole_message() {
        let mut response = HttpResponse::new(200);
        response.set_header("Content-Type", "text/plain").unwrap();
        response.set_body("done");
        let mut sink: Vec<u8> = Vec::new();
        response.send(&mut sink, 1).await.unwrap();
        let written = String::from_utf8(sink).unwrap();
        assert!(written.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(written.ends_with("\r\n\r\ndone"));
    }
}

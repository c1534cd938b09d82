// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # URL 构建器
//!
//! `Url` 是一个不可变值类型：每个 `with_*` 方法都返回一个只修改了一个字段的新实例，
//! 原实例与派生实例之间不共享任何可变状态。
//!
//! 协议、域名与端口可以取三类值（见 [`UrlPart`]）：
//! - `MatchRequest`：沿用当前请求的来源（[`Origin`]），由调用方显式注入；
//! - `Default`：协议默认值（`http`，端口 80/443）；
//! - `Value(v)`：显式指定。
//!
//! 渲染时，若端口与协议默认端口一致则不会输出 `:port`。

use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;

use crate::param::Protocol;
use crate::path::{Path, PATH_SEPARATOR};
use crate::request::HttpRequest;
use crate::util::{escape_html, raw_url_decode, raw_url_encode, url_decode};

pub const PROTOCOL_SEPARATOR: &str = "://";
pub const PORT_SEPARATOR: char = ':';
pub const ANCHOR_SEPARATOR: char = '#';
pub const QUERY_STRING_SEPARATOR: char = '?';
pub const QUERY_PARAM_SEPARATOR: char = '&';
pub const QUERY_VALUE_SEPARATOR: char = '=';
/// 列表型参数在查询串中的键后缀
pub const LIST_KEY_SUFFIX: &str = "[]";

lazy_static! {
    static ref ABSOLUTE_URL: Regex = Regex::new(r"(?i)^https?://").unwrap();
    static ref NON_SLUG_CHARS: Regex = Regex::new(r"[^a-zA-Z0-9 -]").unwrap();
    static ref WHITESPACE_RUN: Regex = Regex::new(r"\s+").unwrap();
    static ref HYPHEN_RUN: Regex = Regex::new(r"-+").unwrap();
}

/// 请求参数的取值：单值或列表（`key[]=a&key[]=b`）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Single(String),
    List(Vec<String>),
}

impl ParamValue {
    /// 单值参数的字符串，列表参数返回 `None`
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Single(s) => Some(s),
            ParamValue::List(_) => None,
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Single(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Single(value)
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(values: Vec<String>) -> Self {
        ParamValue::List(values)
    }
}

/// 保持插入顺序的参数表
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Params {
    entries: Vec<(String, ParamValue)>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// 单值参数的字符串形式
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(|v| v.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// 设置参数；已存在的键原位替换，保持原有顺序
    pub fn set(&mut self, key: &str, value: ParamValue) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key.to_string(), value)),
        }
    }

    /// 向列表参数追加一个元素，已有单值会被转换为列表
    pub fn append(&mut self, key: &str, value: String) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, ParamValue::List(list))) => list.push(value),
            Some(entry) => entry.1 = ParamValue::List(vec![value]),
            None => self
                .entries
                .push((key.to_string(), ParamValue::List(vec![value]))),
        }
    }

    pub fn remove(&mut self, key: &str) {
        self.entries.retain(|(k, _)| k != key);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, ParamValue)> for Params {
    fn from_iter<I: IntoIterator<Item = (String, ParamValue)>>(iter: I) -> Self {
        let mut params = Params::new();
        for (key, value) in iter {
            params.set(&key, value);
        }
        params
    }
}

/// 当前请求的来源：协议、主机名与端口
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    protocol: Protocol,
    domain: String,
    port: u16,
}

impl Origin {
    pub fn new(protocol: Protocol, domain: &str, port: u16) -> Self {
        Self {
            protocol,
            domain: remove_port(domain).to_string(),
            port,
        }
    }

    pub fn protocol(&self) -> &Protocol {
        &self.protocol
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// 对外可见的端口。
    ///
    /// TLS 由前置代理终结时，服务端看到的是 80 端口上的 http；
    /// 此时 https 来源上报 443。
    pub fn port(&self) -> u16 {
        if self.protocol == Protocol::Https && Protocol::Http.is_default_port(self.port) {
            443
        } else {
            self.port
        }
    }
}

/// 协议/域名/端口字段的取值方式
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlPart<T> {
    /// 沿用当前请求的来源
    MatchRequest,
    /// 使用协议默认值
    Default,
    /// 显式指定
    Value(T),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Url {
    path: Path,
    params: Params,
    anchor: Option<String>,
    protocol: Protocol,
    domain: String,
    port: Option<u16>,
    absolute: bool,
    origin: Option<Origin>,
}

impl Url {
    /// 创建一个相对 URL，协议为 http、端口为 80，尚未绑定任何请求来源
    pub fn new(path: &str) -> Self {
        Self {
            path: Path::from_url_path(path),
            params: Params::new(),
            anchor: None,
            protocol: Protocol::Http,
            domain: String::new(),
            port: Protocol::Http.default_port(),
            absolute: false,
            origin: None,
        }
    }

    /// 创建一个绑定到请求来源的 URL，协议/域名/端口均沿用来源
    pub fn with_origin(path: &str, origin: &Origin) -> Self {
        Self {
            path: Path::from_url_path(path),
            params: Params::new(),
            anchor: None,
            protocol: origin.protocol().clone(),
            domain: origin.domain().to_string(),
            port: Some(origin.port()),
            absolute: false,
            origin: Some(origin.clone()),
        }
    }

    /// 请求的绝对地址，包括查询参数
    pub fn from_request(request: &HttpRequest) -> Url {
        request.url().clone()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn with_path(&self, path: &str) -> Url {
        self.with_parsed_path(Path::from_url_path(path))
    }

    pub fn with_parsed_path(&self, path: Path) -> Url {
        let mut url = self.clone();
        url.path = path;
        url
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn param(&self, key: &str) -> Option<&ParamValue> {
        self.params.get(key)
    }

    pub fn has_param(&self, key: &str) -> bool {
        self.params.contains(key)
    }

    /// 替换全部参数
    pub fn with_params(&self, params: Params) -> Url {
        let mut url = self.clone();
        url.params = params;
        url
    }

    /// 将给定参数合并到已有参数中，同名参数以新值为准
    pub fn merge_params(&self, params: &Params) -> Url {
        let mut url = self.clone();
        for (key, value) in params.iter() {
            url.params.set(key, value.clone());
        }
        url
    }

    /// 设置单个参数；`None` 表示移除该参数
    pub fn with_param(&self, key: &str, value: Option<ParamValue>) -> Url {
        let mut url = self.clone();
        match value {
            Some(v) => url.params.set(key, v),
            None => url.params.remove(key),
        }
        url
    }

    pub fn remove_params(&self, keys: &[&str]) -> Url {
        let mut url = self.clone();
        for key in keys {
            url.params.remove(key);
        }
        url
    }

    pub fn anchor(&self) -> Option<&str> {
        self.anchor.as_deref()
    }

    pub fn with_anchor(&self, anchor: Option<&str>) -> Url {
        let mut url = self.clone();
        url.anchor = anchor.map(|a| a.to_string());
        url
    }

    pub fn protocol(&self) -> &Protocol {
        &self.protocol
    }

    pub fn with_protocol(&self, protocol: UrlPart<Protocol>) -> Url {
        let mut url = self.clone();
        url.protocol = match protocol {
            UrlPart::Value(p) => p,
            UrlPart::Default => Protocol::Http,
            UrlPart::MatchRequest => self
                .origin
                .as_ref()
                .map_or(Protocol::Http, |o| o.protocol().clone()),
        };
        url
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn with_domain(&self, domain: UrlPart<String>) -> Url {
        let mut url = self.clone();
        url.domain = match domain {
            UrlPart::Value(d) => d,
            UrlPart::Default | UrlPart::MatchRequest => self
                .origin
                .as_ref()
                .map_or_else(String::new, |o| o.domain().to_string()),
        };
        url
    }

    /// 端口；未知协议且未显式指定时为 `None`
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn with_port(&self, port: UrlPart<u16>) -> Url {
        let mut url = self.clone();
        url.port = match port {
            UrlPart::Value(p) => Some(p),
            UrlPart::Default => self.protocol.default_port(),
            UrlPart::MatchRequest => match &self.origin {
                Some(o) => Some(o.port()),
                None => self.protocol.default_port(),
            },
        };
        url
    }

    pub fn is_absolute(&self) -> bool {
        self.absolute
    }

    pub fn with_absolute(&self, absolute: bool) -> Url {
        let mut url = self.clone();
        url.absolute = absolute;
        url
    }

    pub fn has_trailing_slash(&self) -> bool {
        self.path.has_trailing_slash()
    }

    pub fn with_trailing_slash(&self, trailing_slash: bool) -> Url {
        self.with_parsed_path(self.path.with_trailing_slash(trailing_slash))
    }

    /// 生成 URL 字符串。
    ///
    /// * `absolute` - 覆盖实例上的 absolute 设置，`None` 表示沿用
    /// * `escape` - 是否对查询参数做 HTML 属性转义
    pub fn build_url(&self, absolute: Option<bool>, escape: bool) -> String {
        let mut url = String::new();
        if absolute.unwrap_or(self.absolute) {
            url.push_str(&self.protocol.to_string());
            url.push_str(PROTOCOL_SEPARATOR);
            url.push_str(&self.domain);
            if let Some(port) = self.port {
                if !self.protocol.is_default_port(port) {
                    url.push(PORT_SEPARATOR);
                    url.push_str(&port.to_string());
                }
            }
        }

        // 路径总是以 `/` 开头
        let path = self.path.full_path(true);
        if !path.starts_with(PATH_SEPARATOR) {
            url.push(PATH_SEPARATOR);
        }
        url.push_str(&path);

        if !self.params.is_empty() {
            url.push(QUERY_STRING_SEPARATOR);
            url.push_str(&build_query_string(&self.params, escape));
        }
        if let Some(anchor) = &self.anchor {
            url.push(ANCHOR_SEPARATOR);
            url.push_str(&raw_url_encode(anchor));
        }
        url
    }

    /// 让当前 URL 相对于 `base`：拼接路径，并使用 `base` 的协议、域名、端口与 absolute 设置
    pub fn relative_to(&self, base: &Url) -> Url {
        let mut url = self.with_parsed_path(base.path().concat(&self.path));
        url.domain = base.domain.clone();
        url.port = base.port;
        url.protocol = base.protocol.clone();
        url.absolute = base.absolute;
        url
    }

    /// 解析 URL 字符串。
    ///
    /// 以 `http://` 或 `https://` 开头的作为绝对 URL 解析，解析失败返回 `None`；
    /// 其余一律视为相对 URL。各部分按原样拆分，不改变主机名大小写，也不折叠 `.`/`..` 片段。
    pub fn from_url(url: &str) -> Option<Url> {
        let (rest, anchor) = match url.split_once(ANCHOR_SEPARATOR) {
            Some((rest, anchor)) => (rest, Some(raw_url_decode(anchor))),
            None => (url, None),
        };
        let (rest, query) = match rest.split_once(QUERY_STRING_SEPARATOR) {
            Some((rest, query)) => (rest, Some(query)),
            None => (rest, None),
        };
        let params = query.map(parse_query_string).unwrap_or_default();

        if !ABSOLUTE_URL.is_match(rest) {
            return Some(
                Url::new(rest)
                    .with_params(params)
                    .with_anchor(anchor.as_deref())
                    .with_absolute(false),
            );
        }

        // 只用于校验，结果会规范化主机与路径，不能直接取用
        ::url::Url::parse(url).ok()?;

        let (scheme, rest) = rest.split_once(PROTOCOL_SEPARATOR)?;
        let (authority, path) = match rest.find(PATH_SEPARATOR) {
            Some(index) => rest.split_at(index),
            None => (rest, ""),
        };
        // 丢弃 userinfo
        let authority = authority.rsplit_once('@').map_or(authority, |(_, host)| host);
        let (domain, port) = split_host_port(authority);
        if domain.is_empty() {
            return None;
        }
        let protocol = Protocol::parse(scheme);
        let port = match port.filter(|p| !p.is_empty()) {
            Some(port) => Some(port.parse::<u16>().ok()?),
            None => protocol.default_port(),
        };
        Some(Url {
            path: Path::from_url_path(path),
            params,
            anchor,
            protocol,
            domain: domain.to_string(),
            port,
            absolute: true,
            origin: None,
        })
    }

    /// 将任意文本转换为 URL 友好的短名（slug）
    ///
    /// 例如 `"Tom & Jerry's Line"` → `"tom-and-jerrys-line"`
    pub fn sanitize_string(input: Option<&str>) -> Option<String> {
        let input = input.filter(|s| !s.is_empty())?;
        let value = input.trim().replace('&', "-and-").replace('\'', "");
        let value = NON_SLUG_CHARS.replace_all(&value, "-");
        let value = WHITESPACE_RUN.replace_all(&value, "-");
        let value = HYPHEN_RUN.replace_all(&value, "-");
        Some(value.trim_matches('-').to_lowercase())
    }
}

impl fmt::Display for Url {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.build_url(None, true))
    }
}

/// 解析查询串。以 `[]` 结尾的键会累积为列表参数。
pub fn parse_query_string(query: &str) -> Params {
    let mut params = Params::new();
    for component in query.split(QUERY_PARAM_SEPARATOR) {
        if component.is_empty() {
            continue;
        }
        let (key, value) = match component.split_once(QUERY_VALUE_SEPARATOR) {
            Some((k, v)) => (url_decode(k), url_decode(v)),
            None => (url_decode(component), String::new()),
        };
        match key.strip_suffix(LIST_KEY_SUFFIX) {
            Some(list_key) => params.append(list_key, value),
            None => params.set(&key, ParamValue::Single(value)),
        }
    }
    params
}

fn build_query_string(params: &Params, escape: bool) -> String {
    let encode = |value: &str| {
        let encoded = raw_url_encode(value);
        if escape {
            escape_html(&encoded)
        } else {
            encoded
        }
    };
    let mut pairs = Vec::with_capacity(params.len());
    for (key, value) in params.iter() {
        let key = encode(key);
        match value {
            ParamValue::Single(v) => {
                let v = encode(v);
                if v.is_empty() {
                    pairs.push(key);
                } else {
                    pairs.push(format!("{}{}{}", key, QUERY_VALUE_SEPARATOR, v));
                }
            }
            ParamValue::List(values) => {
                for v in values {
                    pairs.push(format!(
                        "{}{}{}{}",
                        key,
                        LIST_KEY_SUFFIX,
                        QUERY_VALUE_SEPARATOR,
                        encode(v)
                    ));
                }
            }
        }
    }
    pairs.join(&QUERY_PARAM_SEPARATOR.to_string())
}

/// 拆分 `host[:port]`，IPv6 字面量以方括号整体作为主机名（`[::1]:7878` → `[::1]`, `7878`）
fn split_host_port(authority: &str) -> (&str, Option<&str>) {
    if authority.starts_with('[') {
        return match authority.find(']') {
            Some(end) => {
                let (host, rest) = authority.split_at(end + 1);
                (host, rest.strip_prefix(PORT_SEPARATOR))
            }
            None => (authority, None),
        };
    }
    match authority.split_once(PORT_SEPARATOR) {
        Some((host, port)) => (host, Some(port)),
        None => (authority, None),
    }
}

/// 去掉主机名中的端口部分（`Host: example.com:8080` → `example.com`）
fn remove_port(hostname: &str) -> &str {
    split_host_port(hostname).0
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn https_url(port: u16) -> Url {
        Url::new("/x")
            .with_protocol(UrlPart::Value(Protocol::Https))
            .with_domain(UrlPart::Value("example.com".to_string()))
            .with_port(UrlPart::Value(port))
            .with_absolute(true)
    }

    #[test]
    fn test_from_request_is_absolute() {
        let request = HttpRequest::try_from(
            b"GET /trains?page=2 HTTP/1.1\r\nHost: example.com:8080\r\n\r\n",
            "",
            7878,
            0,
        )
        .unwrap();
        let url = Url::from_request(&request);
        assert_eq!(url.build_url(None, false), "http://example.com:8080/trains?page=2");
        assert_eq!(url.param("page").and_then(|v| v.as_str()), Some("2"));
    }

    #[test]
    fn test_default_port_suppressed() {
        let url = https_url(443).build_url(None, true);
        assert_eq!(url, "https://example.com/x");
        assert!(!url.contains(":443"));
    }

    #[test]
    fn test_non_default_port_rendered() {
        let url = https_url(8443).build_url(None, true);
        assert_eq!(url, "https://example.com:8443/x");
    }

    #[test]
    fn test_relative_build_ignores_host() {
        let url = https_url(8443).build_url(Some(false), true);
        assert_eq!(url, "/x");
    }

    #[test]
    fn test_setters_do_not_alias() {
        let original = Url::new("/trains").with_param("page", Some("1".into()));
        let derived = original.with_param("page", Some("2".into()));
        assert_eq!(original.params().get_str("page"), Some("1"));
        assert_eq!(derived.params().get_str("page"), Some("2"));

        let removed = derived.with_param("page", None);
        assert!(!removed.has_param("page"));
        assert!(derived.has_param("page"));
    }

    #[test]
    fn test_empty_path_renders_root() {
        assert_eq!(Url::new("").build_url(None, true), "/");
        assert_eq!(Url::new("a/b").build_url(None, true), "/a/b");
    }

    #[test]
    fn test_query_string_encoding() {
        let url = Url::new("/search")
            .with_param("q", Some("a b&c".into()))
            .with_param("flag", Some("".into()))
            .with_param("ids", Some(vec!["1".to_string(), "2".to_string()].into()))
            .with_anchor(Some("top part"));
        assert_eq!(
            url.build_url(None, false),
            "/search?q=a%20b%26c&flag&ids[]=1&ids[]=2#top%20part"
        );
    }

    #[test]
    fn test_merge_and_remove_params() {
        let mut extra = Params::new();
        extra.set("b", "2".into());
        extra.set("a", "9".into());
        let url = Url::new("/")
            .with_param("a", Some("1".into()))
            .merge_params(&extra);
        assert_eq!(url.params().get_str("a"), Some("9"));
        assert_eq!(url.params().get_str("b"), Some("2"));
        let keys: Vec<&str> = url.params().iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert!(url.remove_params(&["a", "b"]).params().is_empty());
    }

    #[test]
    fn test_parse_query_string() {
        let params = parse_query_string("a=1&&b&c=x%20y+z&l[]=p&l[]=q");
        assert_eq!(params.get_str("a"), Some("1"));
        assert_eq!(params.get_str("b"), Some(""));
        assert_eq!(params.get_str("c"), Some("x y z"));
        assert_eq!(
            params.get("l"),
            Some(&ParamValue::List(vec!["p".to_string(), "q".to_string()]))
        );
    }

    #[test]
    fn test_from_url_absolute() {
        let url = Url::from_url("https://Example.com:8443/a/b/?k=v#frag").unwrap();
        assert!(url.is_absolute());
        assert_eq!(url.protocol(), &Protocol::Https);
        assert_eq!(url.domain(), "Example.com");
        assert_eq!(url.port(), Some(8443));
        assert!(url.has_trailing_slash());
        assert_eq!(url.params().get_str("k"), Some("v"));
        assert_eq!(url.anchor(), Some("frag"));
    }

    #[test]
    fn test_from_url_keeps_host_case() {
        let built = https_url(8443)
            .with_domain(UrlPart::Value("Example.com".to_string()))
            .build_url(Some(true), true);
        assert_eq!(built, "https://Example.com:8443/x");
        let reparsed = Url::from_url(&built).unwrap();
        assert_eq!(reparsed.build_url(Some(true), true), built);
    }

    #[test]
    fn test_from_url_keeps_dot_segments() {
        let built = https_url(8443).with_path("/a/../b/./c").build_url(Some(true), true);
        assert_eq!(built, "https://example.com:8443/a/../b/./c");
        let reparsed = Url::from_url(&built).unwrap();
        assert_eq!(reparsed.path().components(), vec!["a", "..", "b", ".", "c"]);
        assert_eq!(reparsed.build_url(Some(true), true), built);
    }

    #[test]
    fn test_from_url_authority_forms() {
        let url = Url::from_url("http://[::1]:7878/trains").unwrap();
        assert_eq!(url.domain(), "[::1]");
        assert_eq!(url.port(), Some(7878));
        assert_eq!(url.build_url(None, true), "http://[::1]:7878/trains");

        let url = Url::from_url("https://user:pw@trains.example").unwrap();
        assert_eq!(url.domain(), "trains.example");
        assert_eq!(url.port(), Some(443));
        assert_eq!(url.build_url(None, true), "https://trains.example/");

        assert!(Url::from_url("http://example.com:99999/").is_none());
    }

    #[test]
    fn test_origin_ipv6_host() {
        let origin = Origin::new(Protocol::Http, "[::1]:7878", 7878);
        assert_eq!(origin.domain(), "[::1]");
        let origin = Origin::new(Protocol::Http, "[::1]", 7878);
        assert_eq!(origin.domain(), "[::1]");
        assert_eq!(remove_port("example.com:8080"), "example.com");
    }

    #[test]
    fn test_from_url_default_port() {
        let url = Url::from_url("http://example.com/x").unwrap();
        assert_eq!(url.port(), Some(80));
        assert_eq!(url.build_url(None, true), "http://example.com/x");
    }

    #[test]
    fn test_from_url_relative() {
        let url = Url::from_url("/trains?sort=run#row-3").unwrap();
        assert!(!url.is_absolute());
        assert_eq!(url.path().components(), vec!["trains"]);
        assert_eq!(url.params().get_str("sort"), Some("run"));
        assert_eq!(url.anchor(), Some("row-3"));

        let url = Url::from_url("/only#anchor").unwrap();
        assert_eq!(url.path().components(), vec!["only"]);
        assert_eq!(url.anchor(), Some("anchor"));
    }

    #[test]
    fn test_from_url_invalid_absolute() {
        assert!(Url::from_url("http://exa mple.com/").is_none());
    }

    #[test]
    fn test_relative_to() {
        let base = Url::from_url("https://example.com:8443/base/").unwrap();
        let url = Url::new("child").with_param("x", Some("1".into()));
        let relative = url.relative_to(&base);
        assert_eq!(
            relative.build_url(None, true),
            "https://example.com:8443/base/child?x=1"
        );
        // 原实例保持不变
        assert_eq!(url.build_url(None, true), "/child?x=1");
    }

    #[test]
    fn test_origin_match_request() {
        let origin = Origin::new(Protocol::Https, "trains.example:80", 80);
        assert_eq!(origin.domain(), "trains.example");
        assert_eq!(origin.port(), 443);

        let url = Url::new("/a")
            .with_protocol(UrlPart::Value(Protocol::Http))
            .with_port(UrlPart::Value(9000));
        let rebound = Url::with_origin("/a", &origin)
            .with_protocol(UrlPart::Value(Protocol::Http))
            .with_protocol(UrlPart::MatchRequest)
            .with_port(UrlPart::MatchRequest)
            .with_domain(UrlPart::MatchRequest)
            .with_absolute(true);
        assert_eq!(rebound.build_url(None, true), "https://trains.example/a");
        // 未绑定来源时，MatchRequest 退化为协议默认值
        assert_eq!(url.with_port(UrlPart::MatchRequest).port(), Some(80));
    }

    #[test]
    fn test_port_default_follows_protocol() {
        let url = Url::new("/")
            .with_protocol(UrlPart::Value(Protocol::Https))
            .with_port(UrlPart::Default);
        assert_eq!(url.port(), Some(443));
        let url = url.with_protocol(UrlPart::Value(Protocol::parse("ftp")));
        assert_eq!(url.with_port(UrlPart::Default).port(), None);
    }

    #[test]
    fn test_escape_html_in_query() {
        let url = Url::new("/").with_param("k", Some("v".into()));
        assert_eq!(url.to_string(), "/?k=v");
    }

    #[test]
    fn test_sanitize_string() {
        assert_eq!(
            Url::sanitize_string(Some("  Tom & Jerry's  Line! ")),
            Some("tom-and-jerrys-line".to_string())
        );
        assert_eq!(Url::sanitize_string(Some("")), None);
        assert_eq!(Url::sanitize_string(None), None);
    }

    fn arb_url() -> impl Strategy<Value = Url> {
        let segment = prop_oneof![
            Just(".".to_string()),
            Just("..".to_string()),
            "[a-zA-Z0-9 _~.-]{1,8}",
        ];
        let key = "[a-z][a-z0-9_]{0,6}";
        let value = "[a-zA-Z0-9 ._~&=-]{0,8}";
        (
            prop_oneof![Just(Protocol::Http), Just(Protocol::Https)],
            "[a-zA-Z]([a-zA-Z0-9-]{0,8}[a-zA-Z0-9])?\\.(com|org|NET|Io)",
            prop_oneof![Just(None), (1024u16..65535).prop_map(Some)],
            prop::collection::vec(segment, 0..4),
            any::<bool>(),
            prop::collection::vec((key, value), 0..4),
            prop::option::of("[a-zA-Z0-9 -]{1,8}"),
        )
            .prop_map(
                |(protocol, domain, port, segments, trailing, params, anchor)| {
                    let path = format!("/{}", segments.join("/"));
                    let mut url = Url::new(&path)
                        .with_protocol(UrlPart::Value(protocol))
                        .with_domain(UrlPart::Value(domain))
                        .with_port(match port {
                            Some(p) => UrlPart::Value(p),
                            None => UrlPart::Default,
                        })
                        .with_absolute(true)
                        .with_anchor(anchor.as_deref());
                    if !segments.is_empty() {
                        url = url.with_trailing_slash(trailing);
                    }
                    for (k, v) in params {
                        url = url.with_param(&k, Some(v.into()));
                    }
                    url
                },
            )
    }

    proptest! {
        #[test]
        fn prop_build_parse_round_trip(url in arb_url()) {
            let built = url.build_url(Some(true), true);
            let reparsed = Url::from_url(&built).unwrap();
            prop_assert_eq!(reparsed.build_url(Some(true), true), built);
        }
    }
}

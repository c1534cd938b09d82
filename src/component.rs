// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 组件系统
//!
//! 页面由组件树组成：
//! - [`Component`]：最小的可显示单元，声明自己依赖的 `<head>` 内容与缓存时长；
//! - [`Container`]：按顺序持有若干子组件，依赖与缓存时长由子组件聚合而来；
//! - [`Page`]：在容器外包裹完整的 HTML 文档，并把依赖解析成 `<link>`/`<script>` 标签。
//!
//! 依赖描述符是不透明的字符串：以 `/` 开头的视为站点内文件路径，其余视为原样输出的标记。

use log::error;

use crate::exception::Exception;
use crate::param::DEFAULT_SHORT_CACHE_LIFETIME;
use crate::path::Path;
use crate::response::{CacheDirective, HttpResponse};
use crate::url::Url;
use crate::util::escape_html;

/// 页面的基本组成单元
pub trait Component {
    /// 生成该组件的 HTML 片段
    fn render(&self) -> String;

    /// 该组件依赖的 `<head>` 内容，例如 `/css/site.css`
    fn dependencies(&self) -> Vec<String> {
        Vec::new()
    }

    /// 缓存时长（秒）
    fn cache_lifetime(&self) -> i64 {
        DEFAULT_SHORT_CACHE_LIFETIME
    }
}

/// 将一组子组件的依赖与缓存时长合并起来
pub trait ComponentAggregation {
    /// 组成该容器的子组件，按渲染顺序排列
    fn components(&self) -> Vec<&dyn Component>;

    /// 容器自身声明的依赖
    fn own_dependencies(&self) -> Vec<String> {
        Vec::new()
    }

    /// 没有子组件时使用的缓存时长
    fn base_lifetime(&self) -> i64 {
        DEFAULT_SHORT_CACHE_LIFETIME
    }

    /// 自身依赖在前，随后按子组件顺序拼接各子组件的依赖，不去重
    fn aggregated_dependencies(&self) -> Vec<String> {
        let mut dependencies = self.own_dependencies();
        for component in self.components() {
            dependencies.extend(component.dependencies());
        }
        dependencies
    }

    /// 所有子组件缓存时长的最小值
    fn minimum_lifetime(&self) -> i64 {
        self.components()
            .iter()
            .map(|c| c.cache_lifetime())
            .min()
            .unwrap_or_else(|| self.base_lifetime())
    }

    /// 依次渲染子组件，不添加分隔符
    fn render_components(&self) -> String {
        self.components().iter().map(|c| c.render()).collect()
    }
}

/// 由若干子组件组成的容器，可选地用一段开闭标记包裹
#[derive(Default)]
pub struct Container {
    components: Vec<Box<dyn Component>>,
    dependencies: Vec<String>,
    lifetime: Option<i64>,
    wrapper: Option<(String, String)>,
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    /// 渲染时在子组件外加上 `open` 与 `close`
    pub fn wrapped(open: &str, close: &str) -> Self {
        Self {
            wrapper: Some((open.to_string(), close.to_string())),
            ..Self::default()
        }
    }

    pub fn with_component(mut self, component: Box<dyn Component>) -> Self {
        self.components.push(component);
        self
    }

    pub fn with_dependency(mut self, dependency: &str) -> Self {
        self.dependencies.push(dependency.to_string());
        self
    }

    /// 没有子组件时使用的缓存时长
    pub fn with_lifetime(mut self, lifetime: i64) -> Self {
        self.lifetime = Some(lifetime);
        self
    }

    pub fn add(&mut self, component: Box<dyn Component>) {
        self.components.push(component);
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

impl ComponentAggregation for Container {
    fn components(&self) -> Vec<&dyn Component> {
        self.components.iter().map(|c| c.as_ref()).collect()
    }

    fn own_dependencies(&self) -> Vec<String> {
        self.dependencies.clone()
    }

    fn base_lifetime(&self) -> i64 {
        self.lifetime.unwrap_or(DEFAULT_SHORT_CACHE_LIFETIME)
    }
}

impl Component for Container {
    fn render(&self) -> String {
        let inner = self.render_components();
        match &self.wrapper {
            Some((open, close)) => format!("{}{}{}", open, inner, close),
            None => inner,
        }
    }

    fn dependencies(&self) -> Vec<String> {
        self.aggregated_dependencies()
    }

    fn cache_lifetime(&self) -> i64 {
        self.minimum_lifetime()
    }
}

/// 一个完整的 HTML 页面
pub struct Page {
    title: String,
    description: String,
    keywords: Option<String>,
    canonical_url: Option<Url>,
    header: Option<Box<dyn Component>>,
    footer: Option<Box<dyn Component>>,
    body: Vec<Box<dyn Component>>,
}

impl Page {
    pub fn new(title: &str, description: &str) -> Self {
        Self {
            title: title.to_string(),
            description: description.to_string(),
            keywords: None,
            canonical_url: None,
            header: None,
            footer: None,
            body: Vec::new(),
        }
    }

    pub fn with_keywords(mut self, keywords: &str) -> Self {
        self.keywords = Some(keywords.to_string());
        self
    }

    pub fn with_canonical_url(mut self, url: Url) -> Self {
        self.canonical_url = Some(url);
        self
    }

    pub fn with_component(mut self, component: Box<dyn Component>) -> Self {
        self.body.push(component);
        self
    }

    /// 页眉总是第一个组件
    pub fn with_header(mut self, header: Box<dyn Component>) -> Self {
        self.header = Some(header);
        self
    }

    /// 页脚总是最后一个组件
    pub fn with_footer(mut self, footer: Box<dyn Component>) -> Self {
        self.footer = Some(footer);
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// 生成完整的 HTML 文档。
    ///
    /// 依赖中出现无法识别的文件类型时返回 `UnrecognizedDependency`。
    pub fn render(&self) -> Result<String, Exception> {
        let mut head = String::new();
        head.push_str("<meta charset=\"UTF-8\">\n");
        head.push_str("<meta http-equiv=\"X-UA-Compatible\" content=\"ie=edge\">\n");
        head.push_str("<meta name=\"viewport\" content=\"width=device-width, user-scalable=no, initial-scale=1\">\n");
        head.push_str(&format!(
            "<meta name=\"description\" content=\"{}\">\n",
            escape_html(&self.description)
        ));
        if let Some(keywords) = &self.keywords {
            head.push_str(&format!(
                "<meta name=\"keywords\" content=\"{}\">\n",
                escape_html(keywords)
            ));
        }
        head.push_str(&format!("<title>{}</title>\n", escape_html(&self.title)));
        if let Some(url) = &self.canonical_url {
            head.push_str(&format!("<link rel=\"canonical\" href=\"{}\">\n", url));
        }
        head.push_str(&resolve_dependencies(&self.aggregated_dependencies())?);

        Ok(format!(
            "<!doctype html>\n<html lang=\"en\">\n<head>\n{}</head>\n<body>\n{}\n</body>\n</html>\n",
            head,
            self.render_components()
        ))
    }

    /// 渲染为 200 响应，`Cache-Control` 取组件树中最短的缓存时长；
    /// 时长不为正数时禁止缓存。
    pub fn to_http_response(&self) -> Result<HttpResponse, Exception> {
        let mut response = HttpResponse::html(200, self.render()?);
        let lifetime = self.minimum_lifetime();
        if lifetime > 0 {
            response.set_cache_control(&[CacheDirective::MaxAge(lifetime)]);
        } else {
            response.set_cache_control(&CacheDirective::prevention());
        }
        Ok(response)
    }
}

impl ComponentAggregation for Page {
    fn components(&self) -> Vec<&dyn Component> {
        let mut components: Vec<&dyn Component> = Vec::with_capacity(self.body.len() + 2);
        if let Some(header) = &self.header {
            components.push(header.as_ref());
        }
        components.extend(self.body.iter().map(|c| c.as_ref()));
        if let Some(footer) = &self.footer {
            components.push(footer.as_ref());
        }
        components
    }
}

/// 去重（保留首次出现的顺序）后，将依赖解析为 `<head>` 中的标记。
///
/// - `/x.css` → `<link rel="stylesheet">`
/// - `/x.js` → `<script defer>`
/// - 其他以 `/` 开头的路径 → `UnrecognizedDependency`
/// - 其余内容原样输出
pub fn resolve_dependencies(dependencies: &[String]) -> Result<String, Exception> {
    let mut seen: Vec<&str> = Vec::new();
    let mut output = String::new();
    for dependency in dependencies {
        if seen.contains(&dependency.as_str()) {
            continue;
        }
        seen.push(dependency);
        if !dependency.starts_with('/') {
            output.push_str(dependency);
            output.push('\n');
            continue;
        }
        let extension = Path::parse(dependency)
            .extension()
            .map(|e| e.to_lowercase());
        match extension.as_deref() {
            Some("css") => output.push_str(&format!(
                "<link rel=\"stylesheet\" type=\"text/css\" href=\"{}\">\n",
                escape_html(dependency)
            )),
            Some("js") => output.push_str(&format!(
                "<script type=\"text/javascript\" src=\"{}\" defer></script>\n",
                escape_html(dependency)
            )),
            _ => {
                error!("无法识别的页面依赖：{}", dependency);
                return Err(Exception::UnrecognizedDependency(dependency.clone()));
            }
        }
    }
    Ok(output)
}

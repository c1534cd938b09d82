// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 控制器
//!
//! MVC 结构中的控制器接口：读取请求参数，执行操作，返回响应。

use crate::exception::Exception;
use crate::param::HttpRequestMethod;
use crate::request::HttpRequest;
use crate::response::HttpResponse;
use crate::url::{ParamValue, Params};

pub const HTTP_PERMANENT_REDIRECT: u16 = 301;

pub trait Controller {
    /// 控制器正在处理的请求
    fn request(&self) -> &HttpRequest;

    /// 处理请求。返回 `Ok(None)` 表示该控制器不响应此请求。
    fn handle_request(&mut self) -> Result<Option<HttpResponse>, Exception>;

    fn parameters(&self) -> &Params {
        self.request().params()
    }

    /// 按优先级依次查找多个候选键，返回第一个存在的参数
    fn parameter(&self, keys: &[&str]) -> Option<&ParamValue> {
        keys.iter().find_map(|key| self.request().param(key))
    }

    /// 单值参数的字符串形式
    fn parameter_str(&self, key: &str) -> Option<&str> {
        self.request().params().get_str(key)
    }

    fn has_parameter(&self, key: &str) -> bool {
        self.request().params().contains(key)
    }

    fn request_method(&self) -> HttpRequestMethod {
        self.request().method()
    }
}
